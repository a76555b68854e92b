use eyre::{Result, WrapErr};
use lttb::{detect_encoding, read_points, Encoding, Point};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tracing::{info, warn};

/// Buffered point source: stdin or a file.
pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Buffered point sink: stdout or a file.
pub type Output = Box<dyn AsyncWrite + Unpin + Send>;

// "stdin" is the process input; anything else names a file.
pub async fn open_input(name: &str) -> Result<Input> {
    if name == "stdin" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let f = File::open(name)
        .await
        .wrap_err_with(|| format!("opening {}", name))?;
    Ok(Box::new(BufReader::new(f)))
}

// "stdout" is the process output; anything else is created or truncated.
pub async fn create_output(name: &str) -> Result<Output> {
    if name == "stdout" {
        return Ok(Box::new(BufWriter::new(tokio::io::stdout())));
    }
    let f = File::create(name)
        .await
        .wrap_err_with(|| format!("creating {}", name))?;
    Ok(Box::new(BufWriter::new(f)))
}

/// Input names to read from; stdin when none were given.
pub fn sources(files: &[String]) -> Vec<String> {
    if files.is_empty() {
        vec!["stdin".to_string()]
    } else {
        files.to_vec()
    }
}

/// Points gathered from one or more inputs, in input order.
#[derive(Debug, Default)]
pub struct Series {
    pub points: Vec<Point>,
    // Encoding of the first non-empty input.
    pub encoding: Option<Encoding>,
}

impl Series {
    /// Detects the encoding of `reader` and appends all of its points.
    pub async fn extend_from<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        name: &str,
        reader: &mut R,
    ) -> Result<()> {
        let Some(encoding) = detect_encoding(reader).await? else {
            warn!(source = name, "skipping empty input");
            return Ok(());
        };

        let points = read_points(reader, encoding)
            .await
            .wrap_err_with(|| format!("decoding {}", name))?;
        info!(source = name, %encoding, points = points.len(), "read input");

        self.encoding.get_or_insert(encoding);
        self.points.extend(points);
        Ok(())
    }

    pub async fn read(files: &[String]) -> Result<Self> {
        let mut series = Series::default();
        for source in sources(files) {
            let mut input = open_input(&source).await?;
            series.extend_from(&source, &mut input).await?;
        }
        Ok(series)
    }
}
