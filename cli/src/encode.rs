use clap::Args;
use eyre::Result;
use lttb::{write_points, Encoding};
use tracing::info;

use crate::io::{create_output, Series};

#[derive(Args, Debug)]
pub struct Opts {
    /// Output encoding (json, csv)
    #[clap(long, default_value = "json")]
    pub to: Encoding,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn encode(opts: &Opts) -> Result<()> {
    let series = Series::read(&opts.files).await?;
    info!(points = series.points.len(), to = %opts.to, "transcoding");

    let mut output = create_output(&opts.output).await?;
    write_points(&mut output, &series.points, opts.to).await
}
