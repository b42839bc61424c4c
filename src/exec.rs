//! Execute extracted model payloads against the dataset: SQL for query mode,
//! the plotting script for chart mode.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::chart::{self, ChartSpec};
use crate::chart_data::{self, ChartData};
use crate::chart_export;
use crate::store::TabularStore;

/// Result of running a SQL query: a lone value renders as text, anything
/// else renders as a table.
#[derive(Debug)]
pub enum QueryOutcome {
    Scalar(String),
    Table(DataFrame),
}

fn scalar_text(value: AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Run a SQL query and classify the result frame. A 1x1 frame is a scalar.
pub fn run_query(store: &TabularStore, sql: &str) -> Result<QueryOutcome> {
    debug!(sql = %sql, "executing query");
    let result = store.sql(sql)?;
    if result.shape() == (1, 1) {
        let value = result.get_columns()[0].get(0)?;
        Ok(QueryOutcome::Scalar(scalar_text(value)))
    } else {
        Ok(QueryOutcome::Table(result))
    }
}

/// Run a plotting script: rewrite the display call, parse the figure,
/// evaluate it against the dataset, and render a PNG at `output`.
///
/// Returns the parsed figure so callers can report what was drawn.
pub fn run_chart_script(
    store: &TabularStore,
    script: &str,
    output: &Path,
    size: (u32, u32),
) -> Result<ChartSpec> {
    let rewritten = chart::rewrite_display_call(script);
    let spec = chart::parse_script(&rewritten).map_err(|e| eyre!(e))?;
    let data = prepare(&spec, store)?;
    chart_export::render_chart_png(output, &data, size)?;
    debug!(output = %output.display(), points = data.points.len(), "rendered chart");
    Ok(spec)
}

fn prepare(spec: &ChartSpec, store: &TabularStore) -> Result<ChartData> {
    chart_data::prepare_chart_data(spec, store.frame())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> TabularStore {
        let df = df!(
            "Country" => &["US", "US", "DE"],
            "Total Sales" => &[10.0, 20.0, 5.0],
        )
        .unwrap();
        TabularStore::from_frame(df).unwrap()
    }

    #[test]
    fn test_single_value_is_scalar() {
        let store = sample_store();
        let outcome = run_query(&store, "SELECT SUM(Total_Sales) AS total FROM df").unwrap();
        match outcome {
            QueryOutcome::Scalar(text) => assert_eq!(text, "35.0"),
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_string_scalar_is_unquoted() {
        let store = sample_store();
        let outcome = run_query(
            &store,
            "SELECT Country FROM df WHERE Total_Sales = 5.0",
        )
        .unwrap();
        match outcome {
            QueryOutcome::Scalar(text) => assert_eq!(text, "DE"),
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_rows_is_table() {
        let store = sample_store();
        let outcome = run_query(&store, "SELECT Country, Total_Sales FROM df").unwrap();
        match outcome {
            QueryOutcome::Table(df) => assert_eq!(df.shape(), (3, 2)),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_single_row_multiple_columns_is_table() {
        let store = sample_store();
        let outcome = run_query(
            &store,
            "SELECT SUM(Total_Sales) AS total, COUNT(*) AS n FROM df",
        )
        .unwrap();
        assert!(matches!(outcome, QueryOutcome::Table(_)));
    }

    #[test]
    fn test_invalid_sql_is_error() {
        let store = sample_store();
        assert!(run_query(&store, "SELEC nonsense").is_err());
    }

    #[test]
    fn test_chart_script_with_bad_column_is_error() {
        let store = sample_store();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chart.png");
        let script = "fig = bar(x=Missing, y=Total_Sales)\nfig.show()";
        assert!(run_chart_script(&store, script, &out, (320, 240)).is_err());
    }
}
