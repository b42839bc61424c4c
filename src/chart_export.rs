//! Render prepared figure data to a PNG file via the plotters bitmap backend.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::prelude::*;
use std::path::Path;

use crate::chart::ChartType;
use crate::chart_data::{format_axis_label, format_x_axis_label, ChartData};

pub const DEFAULT_CHART_SIZE: (u32, u32) = (800, 600);

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        // Degenerate range; pad so the axis has extent.
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        (min - pad, max + pad)
    } else {
        (min, max)
    }
}

/// Write the figure to `path` as a PNG of the given pixel size.
pub fn render_chart_png(path: &Path, data: &ChartData, (width, height): (u32, u32)) -> Result<()> {
    if data.points.is_empty() {
        return Err(eyre!("No data to plot"));
    }

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = bounds(data.points.iter().map(|&(x, _)| x));
    let (y_min, y_max) = bounds(data.points.iter().map(|&(_, y)| y));
    // Bars grow from the zero line; keep it inside the plot.
    let (y_min, y_max) = if data.chart_type == ChartType::Bar {
        (y_min.min(0.0), y_max.max(0.0))
    } else {
        (y_min, y_max)
    };
    // Half a bar of slack on each side so edge bars are not clipped.
    let (x_min, x_max) = if data.chart_type == ChartType::Bar {
        (x_min - 0.5, x_max + 0.5)
    } else {
        (x_min, x_max)
    };

    let mut chart = ChartBuilder::on(&root);
    chart
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60);
    if let Some(title) = &data.title {
        chart.caption(title.as_str(), ("sans-serif", 24));
    }
    let mut chart = chart.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let x_kind = data.x_axis_kind;
    let x_labels = data.x_labels.clone();
    chart
        .configure_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .x_label_formatter(&move |v| format_x_axis_label(*v, x_kind, &x_labels))
        .y_label_formatter(&|v| format_axis_label(*v))
        .draw()?;

    let color = BLUE;
    match data.chart_type {
        ChartType::Line => {
            chart.draw_series(LineSeries::new(data.points.iter().copied(), color))?;
        }
        ChartType::Scatter => {
            chart.draw_series(PointSeries::of_element(
                data.points.iter().copied(),
                3,
                color,
                &|c, s, _| EmptyElement::at(c) + Circle::new((0, 0), s, color.filled()),
            ))?;
        }
        ChartType::Bar => {
            let baseline = 0.0_f64.clamp(y_min, y_max);
            chart.draw_series(data.points.iter().map(|&(x, y)| {
                Rectangle::new([(x - 0.3, baseline), (x + 0.3, y)], color.filled())
            }))?;
        }
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_span_values() {
        assert_eq!(bounds([1.0, 4.0, 2.0].into_iter()), (1.0, 4.0));
    }

    #[test]
    fn test_bounds_degenerate_range_is_padded() {
        let (min, max) = bounds([5.0, 5.0].into_iter());
        assert!(min < 5.0 && max > 5.0);
        let (min, max) = bounds([0.0].into_iter());
        assert!(min < 0.0 && max > 0.0);
    }

    #[test]
    fn test_bounds_empty_input() {
        assert_eq!(bounds(std::iter::empty()), (0.0, 1.0));
    }
}
