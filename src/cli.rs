use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;

use crate::compress::CompressionFormat;
use crate::config::FileLoadingConfig;
use crate::store::LoadOptions;

/// Command-line arguments for askdata
#[derive(Parser, Debug)]
#[command(version, about = "Ask questions about a delimited data file")]
pub struct Args {
    /// Data file to load (CSV or other delimited text, optionally compressed)
    pub path: PathBuf,

    /// Ask a single question and exit instead of starting the prompt loop
    #[arg(short = 'q', long = "question")]
    pub question: Option<String>,

    /// Treat the question as a chart request and render a PNG
    #[arg(long = "chart", action)]
    pub chart: bool,

    /// Where to write the rendered chart
    #[arg(long = "chart-output", default_value = "chart.png")]
    pub chart_output: PathBuf,

    /// Specify the delimiter to use when reading the file
    #[arg(long = "delimiter")]
    pub delimiter: Option<char>,

    /// Specify that the file has no header row
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Skip this many rows when reading the file
    #[arg(long = "skip-rows")]
    pub skip_rows: Option<usize>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Enable debug output (full error chains, request logging)
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Clear the question history and exit
    #[arg(long = "clear-history", action)]
    pub clear_history: bool,
}

fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(eyre!("Delimiter must be a single ASCII character: {}", c))
    }
}

/// Merge CLI arguments with the file-loading section of the config file.
/// Arguments win over the config file.
pub fn load_options(args: &Args, config: &FileLoadingConfig) -> Result<LoadOptions> {
    let mut opts = LoadOptions::new();
    if let Some(delimiter) = args.delimiter.or(config.delimiter) {
        opts = opts.with_delimiter(delimiter_byte(delimiter)?);
    }
    if args.no_header {
        opts = opts.with_has_header(false);
    }
    if let Some(skip_rows) = args.skip_rows {
        opts = opts.with_skip_rows(skip_rows);
    }
    if let Some(compression) = args.compression {
        opts = opts.with_compression(compression);
    }
    if let Some(n) = config.infer_schema_length {
        opts = opts.with_infer_schema_length(n);
    }
    Ok(opts)
}
