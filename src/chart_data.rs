//! Prepare figure data from the dataset: apply the requested aggregation,
//! select x/y, and convert to `(f64, f64)` points for rendering.

use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;

use crate::chart::{Aggregation, ChartSpec, ChartType};

const CHART_ROW_LIMIT: usize = 10_000;

/// Describes how x-axis numeric values map back to labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XAxisKind {
    Numeric,
    /// x = days since Unix epoch
    Date,
    /// x = microseconds since epoch
    DatetimeUs,
    DatetimeMs,
    DatetimeNs,
    /// x = category position; labels carried alongside
    Categorical,
}

/// Figure data ready for rendering.
#[derive(Debug)]
pub struct ChartData {
    pub chart_type: ChartType,
    pub points: Vec<(f64, f64)>,
    pub x_axis_kind: XAxisKind,
    /// Category labels by position (Categorical x only).
    pub x_labels: Vec<String>,
    pub x_label: String,
    pub y_label: String,
    pub title: Option<String>,
}

/// Format a numeric axis tick (y-axis or generic numeric).
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Format an x-axis tick for the given axis kind.
pub fn format_x_axis_label(v: f64, kind: XAxisKind, labels: &[String]) -> String {
    match kind {
        XAxisKind::Numeric => format_axis_label(v),
        XAxisKind::Date => {
            const UNIX_EPOCH_CE_DAYS: i32 = 719_163;
            let days = v.trunc() as i32;
            match NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days)) {
                Some(d) => d.format("%Y-%m-%d").to_string(),
                None => format_axis_label(v),
            }
        }
        XAxisKind::DatetimeUs => DateTime::from_timestamp_micros(v.trunc() as i64)
            .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| format_axis_label(v)),
        XAxisKind::DatetimeMs => DateTime::from_timestamp_millis(v.trunc() as i64)
            .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| format_axis_label(v)),
        XAxisKind::DatetimeNs => {
            let millis = (v.trunc() as i64) / 1_000_000;
            DateTime::from_timestamp_millis(millis)
                .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| format_axis_label(v))
        }
        XAxisKind::Categorical => {
            let idx = v.round() as i64;
            if idx >= 0 && (idx as usize) < labels.len() && (v - idx as f64).abs() < 0.25 {
                labels[idx as usize].clone()
            } else {
                String::new()
            }
        }
    }
}

fn aggregation_expr(agg: Aggregation, y: &str) -> Expr {
    let e = col(y);
    match agg {
        Aggregation::Sum => e.sum(),
        Aggregation::Mean => e.mean(),
        Aggregation::Min => e.min(),
        Aggregation::Max => e.max(),
        Aggregation::Count => e.count(),
    }
}

/// Evaluate a figure against the dataset. Aggregates when requested, drops
/// nulls, limits rows, and sorts by x for bar/line charts.
pub fn prepare_chart_data(spec: &ChartSpec, df: &DataFrame) -> Result<ChartData> {
    for column in [&spec.x, &spec.y] {
        if df.column(column).is_err() {
            return Err(eyre!("Column '{}' is not in the dataset", column));
        }
    }

    let mut lf = df.clone().lazy();
    if let Some(agg) = spec.agg {
        lf = lf
            .group_by([col(spec.x.as_str())])
            .agg([aggregation_expr(agg, &spec.y).alias(spec.y.as_str())]);
    }
    lf = lf
        .select([col(spec.x.as_str()), col(spec.y.as_str())])
        .drop_nulls(None)
        .slice(0, CHART_ROW_LIMIT as u32);
    if spec.chart_type != ChartType::Scatter {
        lf = lf.sort([spec.x.as_str()], Default::default());
    }
    let data = lf.collect()?;

    let x_column = data.column(spec.x.as_str())?;
    let (x_vals, x_axis_kind, x_labels): (Vec<f64>, XAxisKind, Vec<String>) =
        match x_column.dtype() {
            DataType::String => {
                let ca = x_column.str()?;
                let labels: Vec<String> = ca
                    .into_iter()
                    .map(|v| v.unwrap_or("").to_string())
                    .collect();
                let vals = (0..labels.len()).map(|i| i as f64).collect();
                (vals, XAxisKind::Categorical, labels)
            }
            DataType::Date => {
                let casted = x_column.cast(&DataType::Int64)?;
                let vals = casted
                    .i64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(0) as f64)
                    .collect();
                (vals, XAxisKind::Date, Vec::new())
            }
            DataType::Datetime(unit, _) => {
                let kind = match unit {
                    TimeUnit::Nanoseconds => XAxisKind::DatetimeNs,
                    TimeUnit::Microseconds => XAxisKind::DatetimeUs,
                    TimeUnit::Milliseconds => XAxisKind::DatetimeMs,
                };
                let casted = x_column.cast(&DataType::Int64)?;
                let vals = casted
                    .i64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(0) as f64)
                    .collect();
                (vals, kind, Vec::new())
            }
            _ => {
                let casted = x_column.cast(&DataType::Float64)?;
                let vals = casted
                    .f64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect();
                (vals, XAxisKind::Numeric, Vec::new())
            }
        };

    let y_casted = data.column(spec.y.as_str())?.cast(&DataType::Float64)?;
    let y_vals: Vec<f64> = y_casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    let points: Vec<(f64, f64)> = x_vals
        .into_iter()
        .zip(y_vals)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.is_empty() {
        return Err(eyre!("No data to plot"));
    }

    Ok(ChartData {
        chart_type: spec.chart_type,
        points,
        x_axis_kind,
        x_labels,
        x_label: spec.x.clone(),
        y_label: spec.y.clone(),
        title: spec.title.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse_script;

    fn sample_frame() -> DataFrame {
        df!(
            "Country" => &["US", "DE", "US", "DE"],
            "Total_Sales" => &[10.0, 5.0, 20.0, 15.0],
            "Units" => &[1i64, 2, 3, 4],
        )
        .unwrap()
    }

    #[test]
    fn test_bar_with_sum_aggregation_groups_by_x() {
        let spec =
            parse_script("fig = bar(x=Country, y=Total_Sales, agg=sum)\nfig.render()").unwrap();
        let data = prepare_chart_data(&spec, &sample_frame()).unwrap();
        assert_eq!(data.x_axis_kind, XAxisKind::Categorical);
        assert_eq!(data.x_labels, vec!["DE", "US"]); // sorted by x
        assert_eq!(data.points, vec![(0.0, 20.0), (1.0, 30.0)]);
    }

    #[test]
    fn test_count_aggregation() {
        let spec = parse_script("fig = bar(x=Country, y=Units, agg=count)\nfig.render()").unwrap();
        let data = prepare_chart_data(&spec, &sample_frame()).unwrap();
        assert_eq!(data.points, vec![(0.0, 2.0), (1.0, 2.0)]);
    }

    #[test]
    fn test_scatter_without_aggregation_keeps_rows() {
        let spec = parse_script("fig = scatter(x=Units, y=Total_Sales)\nfig.render()").unwrap();
        let data = prepare_chart_data(&spec, &sample_frame()).unwrap();
        assert_eq!(data.x_axis_kind, XAxisKind::Numeric);
        assert_eq!(data.points.len(), 4);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let spec = parse_script("fig = bar(x=Nope, y=Total_Sales)\nfig.render()").unwrap();
        let err = prepare_chart_data(&spec, &sample_frame()).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_format_categorical_labels() {
        let labels = vec!["DE".to_string(), "US".to_string()];
        assert_eq!(
            format_x_axis_label(0.0, XAxisKind::Categorical, &labels),
            "DE"
        );
        assert_eq!(
            format_x_axis_label(1.0, XAxisKind::Categorical, &labels),
            "US"
        );
        // Between categories: no label.
        assert_eq!(format_x_axis_label(0.5, XAxisKind::Categorical, &labels), "");
    }

    #[test]
    fn test_format_date_label() {
        // 2022-01-01 is 18993 days since the Unix epoch.
        assert_eq!(
            format_x_axis_label(18993.0, XAxisKind::Date, &[]),
            "2022-01-01"
        );
    }

    #[test]
    fn test_format_numeric_label() {
        assert_eq!(format_x_axis_label(12.5, XAxisKind::Numeric, &[]), "12.50");
        assert_eq!(format_axis_label(2.5e7), "2.50e7");
    }
}
