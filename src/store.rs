//! Tabular store: loads a delimited file into a Polars DataFrame and runs
//! SQL against it through a `SQLContext` with the frame registered under the
//! fixed table name.

use color_eyre::Result;
use polars::prelude::*;
use polars_sql::SQLContext;
use std::path::Path;
use tracing::debug;

use crate::compress::{self, CompressionFormat};

/// Fixed name the dataset is registered under for SQL execution. Prompts
/// reference this name so the model can target the table.
pub const TABLE_NAME: &str = "df";

/// Options controlling how a delimited file is read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Field delimiter. None = comma.
    pub delimiter: Option<u8>,
    /// Whether the file has a header row. None = Polars default (true).
    pub has_header: Option<bool>,
    /// Skip this many rows before reading.
    pub skip_rows: Option<usize>,
    /// Compression format override. None = auto-detect from extension.
    pub compression: Option<CompressionFormat>,
    /// Number of rows to use when inferring the schema. None = Polars default.
    pub infer_schema_length: Option<usize>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }
}

/// In-memory queryable representation of the uploaded dataset.
pub struct TabularStore {
    df: DataFrame,
}

impl TabularStore {
    /// Read a delimited file (optionally compressed), normalize column names
    /// and coerce date-named columns.
    pub fn open(path: &Path, options: &LoadOptions) -> Result<Self> {
        let df = read_delimited(path, options)?;
        let store = Self::from_frame(df)?;
        debug!(
            rows = store.df.height(),
            columns = store.df.width(),
            "loaded dataset"
        );
        Ok(store)
    }

    /// Build a store from an already-loaded frame, applying the same column
    /// normalization and date coercion as `open`.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        let df = coerce_date_columns(normalize_column_names(df)?)?;
        Ok(Self { df })
    }

    /// The dataset.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Column names joined into the single descriptive string used in prompts.
    pub fn columns_description(&self) -> String {
        self.column_names().join(", ")
    }

    /// Execute a SQL query against the dataset, registered as table `df`.
    pub fn sql(&self, query: &str) -> Result<DataFrame> {
        let mut ctx = SQLContext::new();
        ctx.register(TABLE_NAME, self.df.clone().lazy());
        let out = ctx.execute(query.trim())?.collect()?;
        Ok(out)
    }
}

/// Replace spaces with underscores (and trim) so column names are usable in
/// SQL without quoting.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

fn normalize_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in &names {
        let normalized = normalize_column_name(name);
        if &normalized != name {
            df.rename(name, normalized.as_str().into())?;
        }
    }
    Ok(df)
}

/// Try to detect a date format from a sample string.
fn infer_date_format(sample: &str) -> Option<&'static str> {
    const DATE_FMTS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y",
        "%m-%d-%Y", "%m/%d/%Y",
    ];
    DATE_FMTS
        .iter()
        .find(|fmt| chrono::NaiveDate::parse_from_str(sample, fmt).is_ok())
        .copied()
}

/// Try to detect a datetime format from a sample string.
fn infer_datetime_format(sample: &str) -> Option<&'static str> {
    const DATETIME_FMTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d-%m-%YT%H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    DATETIME_FMTS
        .iter()
        .find(|fmt| chrono::NaiveDateTime::parse_from_str(sample, fmt).is_ok())
        .copied()
}

/// Coerce string columns whose name contains "date" (case-insensitive) to a
/// date or datetime type. The format is inferred from the first non-empty
/// value; a candidate column with no recognizable format is left as-is, and
/// a coercion failure skips coercion rather than failing the load.
fn coerce_date_columns(df: DataFrame) -> Result<DataFrame> {
    let mut candidates = Vec::new();
    let mut exprs = Vec::new();
    for c in df.get_columns() {
        if c.dtype() != &DataType::String || !c.name().to_lowercase().contains("date") {
            continue;
        }
        let ca = c.str()?;
        let Some(sample) = ca.into_iter().flatten().find(|s| !s.trim().is_empty()) else {
            continue;
        };
        let sample = sample.trim();
        let expr = if let Some(fmt) = infer_date_format(sample) {
            let opts = StrptimeOptions {
                format: Some(fmt.into()),
                strict: false,
                exact: false,
                cache: true,
            };
            col(c.name().as_str()).str().to_date(opts)
        } else if let Some(fmt) = infer_datetime_format(sample) {
            let opts = StrptimeOptions {
                format: Some(fmt.into()),
                strict: false,
                exact: false,
                cache: true,
            };
            col(c.name().as_str())
                .str()
                .to_datetime(Some(TimeUnit::Microseconds), None, opts, lit("raise"))
        } else {
            continue;
        };
        candidates.push(c.name().to_string());
        exprs.push(expr);
    }
    if exprs.is_empty() {
        return Ok(df);
    }

    let mut coerced = match df.clone().lazy().with_columns(exprs).collect() {
        Ok(coerced) => coerced,
        Err(e) => {
            debug!(error = %e, "date coercion failed, keeping string columns");
            return Ok(df);
        }
    };
    for name in &candidates {
        let original = df.column(name)?;
        let converted = coerced.column(name)?;
        if converted.null_count() == converted.len() && original.null_count() < original.len() {
            // Nothing parsed; keep the original strings.
            coerced.replace(name, original.as_materialized_series().clone())?;
        }
    }
    Ok(coerced)
}

fn read_delimited(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));

    let mut read_options = CsvReadOptions::default();
    if let Some(skip_rows) = options.skip_rows {
        read_options.skip_rows = skip_rows;
    }
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    if let Some(n) = options.infer_schema_length {
        read_options.infer_schema_length = Some(n);
    }
    let delimiter = options.delimiter;
    // Date parsing is done by coerce_date_columns (name-driven, non-strict),
    // so Polars' own try_parse_dates stays off.
    read_options = read_options.map_parse_options(|opts| {
        let opts = opts.with_try_parse_dates(false);
        match delimiter {
            Some(d) => opts.with_separator(d),
            None => opts,
        }
    });

    let df = if let Some(compression) = compression {
        let decompressed = compress::decompress_to_memory(path, compression)?;
        CsvReader::new(std::io::Cursor::new(decompressed))
            .with_options(read_options)
            .finish()?
    } else {
        read_options
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?
    };
    Ok(df)
}
