use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

use crate::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Csv,
}

impl Encoding {
    pub async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Point>> {
        match self {
            Encoding::Json => JsonCodec.decode(reader).await,
            Encoding::Csv => CsvCodec.decode(reader).await,
        }
    }

    pub async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        point: &Point,
    ) -> Result<()> {
        match self {
            Encoding::Json => JsonCodec.encode(writer, point).await,
            Encoding::Csv => CsvCodec.encode(writer, point).await,
        }
    }
}

impl FromStr for Encoding {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Encoding::Json),
            "csv" => Ok(Encoding::Csv),
            _ => eyre::bail!("invalid encoding: {}", s),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Encoding::Json => write!(f, "json"),
            Encoding::Csv => write!(f, "csv"),
        }
    }
}

/// Guesses the encoding of a point stream by peeking at its first
/// non-whitespace byte. Nothing is consumed except leading whitespace.
/// Returns `None` for empty input.
pub async fn detect_encoding<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Encoding>> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                let first = buf[i];
                reader.consume(i);
                return Ok(Some(if first == b'{' {
                    Encoding::Json
                } else {
                    Encoding::Csv
                }));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

// A Codec reads and writes one Point per line.
#[async_trait]
pub trait Codec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        point: &Point,
    ) -> Result<()>;
    // Returns None once the reader is exhausted.
    async fn decode<R: AsyncBufRead + Unpin + Send>(&self, reader: &mut R) -> Result<Option<Point>>;
}

pub struct JsonCodec;

#[async_trait]
impl Codec for JsonCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        point: &Point,
    ) -> Result<()> {
        // serde_json writes NaN and infinities as null, which can't be read back.
        if !is_finite(point) {
            eyre::bail!("cannot encode non-finite point as JSON: {:?}", point);
        }
        writer.write_all(&serde_json::to_vec(point)?).await?;
        writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Point>> {
        let Some(line) = next_line(reader).await? else {
            return Ok(None);
        };
        let point = serde_json::from_str(&line)
            .wrap_err_with(|| format!("invalid JSON point: {}", line))?;
        finite(point, &line).map(Some)
    }
}

pub struct CsvCodec;

#[async_trait]
impl Codec for CsvCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &self,
        writer: &mut W,
        point: &Point,
    ) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.serialize((point.x, point.y))?;
        let buf = wtr.into_inner().map_err(|e| eyre::eyre!(e.to_string()))?;
        writer.write_all(&buf).await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Point>> {
        loop {
            let Some(line) = next_line(reader).await? else {
                return Ok(None);
            };
            if is_csv_header(&line) {
                continue;
            }

            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .trim(csv::Trim::All)
                .from_reader(line.as_bytes());
            let mut record = csv::StringRecord::new();
            if !rdr
                .read_record(&mut record)
                .wrap_err_with(|| format!("invalid CSV point: {}", line))?
            {
                eyre::bail!("no CSV record in line: {}", line);
            }
            if record.len() != 2 {
                eyre::bail!(
                    "invalid CSV point: {}: expected 2 fields, found {}",
                    line,
                    record.len()
                );
            }
            let xy: (f64, f64) = record
                .deserialize(None)
                .wrap_err_with(|| format!("invalid CSV point: {}", line))?;
            return finite(Point::from(xy), &line).map(Some);
        }
    }
}

// Reads the next non-blank line, trimmed. None at EOF.
async fn next_line<R: AsyncBufRead + Unpin + Send>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}

fn is_finite(p: &Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

// Decoded points must be finite in every encoding so they survive transcoding.
fn finite(point: Point, line: &str) -> Result<Point> {
    if !is_finite(&point) {
        eyre::bail!("non-finite coordinate in point: {}", line);
    }
    Ok(point)
}

fn is_csv_header(line: &str) -> bool {
    let mut fields = line.split(',').map(str::trim);
    matches!(
        (fields.next(), fields.next(), fields.next()),
        (Some(x), Some(y), None) if x.eq_ignore_ascii_case("x") && y.eq_ignore_ascii_case("y")
    )
}

/// Decodes points until the reader is exhausted.
pub async fn read_points<R: AsyncBufRead + Unpin + Send>(
    reader: &mut R,
    encoding: Encoding,
) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    while let Some(point) = encoding.decode(reader).await? {
        points.push(point);
    }
    Ok(points)
}

/// Encodes every point and flushes the writer.
pub async fn write_points<W: AsyncWrite + Unpin + Send>(
    writer: &mut W,
    points: &[Point],
    encoding: Encoding,
) -> Result<()> {
    for point in points {
        encoding.encode(writer, point).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn json_lines() {
        let input = b"{\"x\":0,\"y\":1.5}\n\n{\"x\":2.0,\"y\":-3}\n" as &[u8];
        let mut reader = BufReader::new(input);
        let points = read_points(&mut reader, Encoding::Json).await.unwrap();
        assert_eq!(points, vec![Point::new(0.0, 1.5), Point::new(2.0, -3.0)]);
    }

    #[tokio::test]
    async fn csv_lines_with_header() {
        let input = b"X, Y\n0,1.5\n 2.0 , -3\n\n4,5" as &[u8];
        let mut reader = BufReader::new(input);
        let points = read_points(&mut reader, Encoding::Csv).await.unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 1.5),
                Point::new(2.0, -3.0),
                Point::new(4.0, 5.0)
            ]
        );
    }

    #[tokio::test]
    async fn csv_rejects_garbage() {
        let input = b"0,1\nfoo,bar\n" as &[u8];
        let mut reader = BufReader::new(input);
        let err = read_points(&mut reader, Encoding::Csv).await.unwrap_err();
        assert!(format!("{:#}", err).contains("foo,bar"));
    }

    #[tokio::test]
    async fn csv_rejects_extra_fields() {
        let input = b"0,1\n1,2,3\n" as &[u8];
        let mut reader = BufReader::new(input);
        let err = read_points(&mut reader, Encoding::Csv).await.unwrap_err();
        assert!(format!("{:#}", err).contains("1,2,3"));

        let mut single = BufReader::new(b"7\n" as &[u8]);
        assert!(CsvCodec.decode(&mut single).await.is_err());
    }

    #[tokio::test]
    async fn non_finite_points_are_rejected() {
        let mut csv = BufReader::new(b"NaN,inf\n" as &[u8]);
        let err = CsvCodec.decode(&mut csv).await.unwrap_err();
        assert!(format!("{:#}", err).contains("NaN,inf"));

        let mut buf = Vec::new();
        assert!(JsonCodec
            .encode(&mut buf, &Point::new(f64::NAN, 1.0))
            .await
            .is_err());
        let inf = [Point::new(0.0, f64::INFINITY)];
        assert!(write_points(&mut buf, &inf, Encoding::Json).await.is_err());
        assert!(buf.is_empty());

        // Every finite point that decodes from CSV must survive a JSON round trip.
        let mut csv = BufReader::new(b"-1e308,2.5e-300\n" as &[u8]);
        let points = read_points(&mut csv, Encoding::Csv).await.unwrap();
        let mut json = Vec::new();
        write_points(&mut json, &points, Encoding::Json).await.unwrap();
        let mut reader = BufReader::new(json.as_slice());
        assert_eq!(read_points(&mut reader, Encoding::Json).await.unwrap(), points);
    }

    #[tokio::test]
    async fn json_rejects_garbage() {
        let input = b"{\"x\":1}\n" as &[u8];
        let mut reader = BufReader::new(input);
        assert!(JsonCodec.decode(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn encode_then_read_back() {
        let points = vec![Point::new(0.5, 1.0), Point::new(-2.0, 1e-3)];
        for encoding in [Encoding::Json, Encoding::Csv] {
            let mut buf = Vec::new();
            write_points(&mut buf, &points, encoding).await.unwrap();
            let mut reader = BufReader::new(buf.as_slice());
            assert_eq!(detect_encoding(&mut reader).await.unwrap(), Some(encoding));
            assert_eq!(read_points(&mut reader, encoding).await.unwrap(), points);
        }
    }

    #[tokio::test]
    async fn csv_output_shape() {
        let mut buf = Vec::new();
        CsvCodec.encode(&mut buf, &Point::new(1.0, -2.5)).await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1.0,-2.5\n");
    }

    #[tokio::test]
    async fn detect_encoding_of_inputs() {
        let mut empty = BufReader::new(b"" as &[u8]);
        assert_eq!(detect_encoding(&mut empty).await.unwrap(), None);

        let mut blank = BufReader::new(b"  \n\n" as &[u8]);
        assert_eq!(detect_encoding(&mut blank).await.unwrap(), None);

        let mut json = BufReader::new(b"\n {\"x\":1,\"y\":2}\n" as &[u8]);
        assert_eq!(detect_encoding(&mut json).await.unwrap(), Some(Encoding::Json));
        assert_eq!(
            JsonCodec.decode(&mut json).await.unwrap(),
            Some(Point::new(1.0, 2.0))
        );

        let mut csv = BufReader::new(b"1,2\n" as &[u8]);
        assert_eq!(detect_encoding(&mut csv).await.unwrap(), Some(Encoding::Csv));
    }

    #[test]
    fn encoding_names() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("csv".parse::<Encoding>().unwrap(), Encoding::Csv);
        assert!("msgpack".parse::<Encoding>().is_err());
        assert_eq!(Encoding::Csv.to_string(), "csv");
    }
}
