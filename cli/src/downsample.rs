use clap::Args;
use eyre::Result;
use lttb::{try_downsample, write_points, Encoding, Point};
use tracing::info;

use crate::io::{create_output, Series};

#[derive(Args, Debug)]
pub struct Opts {
    /// Number of points to keep [0 = keep all]
    #[clap(
        long,
        short = 't',
        env = "LTTB_THRESHOLD",
        default_value_t = 1000,
        allow_negative_numbers = true
    )]
    pub threshold: i64,

    /// Output encoding (json, csv) [default: encoding of the input]
    #[clap(long)]
    pub to: Option<Encoding>,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Sort points by x before downsampling
    #[clap(long, default_value_t = false)]
    pub sort: bool,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn downsample(opts: &Opts) -> Result<()> {
    let mut series = Series::read(&opts.files).await?;

    if opts.sort {
        sort_by_x(&mut series.points);
    }

    let sampled = try_downsample(&series.points, opts.threshold)?;
    info!(
        input = series.points.len(),
        output = sampled.len(),
        threshold = opts.threshold,
        "downsampled"
    );

    let encoding = opts.to.or(series.encoding).unwrap_or(Encoding::Json);
    let mut output = create_output(&opts.output).await?;
    write_points(&mut output, &sampled, encoding).await
}

// Stable, and total over NaN so a bad sample can't abort the sort.
fn sort_by_x(points: &mut [Point]) {
    points.sort_by(|a, b| a.x.total_cmp(&b.x));
}
