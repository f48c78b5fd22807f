//! Chart rendering with Plotters: churn histograms, grouped category bars and
//! the transaction scatter

use crate::chart::{
    ChartAttribute, ChartDataset, ContingencyTable, NumericDistribution, ScatterDataset,
};
use crate::data::ChurnLabel;
use crate::error::{ChurnError, Result};
use crate::session::View;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Attrited customers render warm, existing customers cool
const ATTRITED_COLOR: RGBColor = RGBColor(214, 96, 77);
const EXISTING_COLOR: RGBColor = RGBColor(67, 147, 195);

/// Default number of histogram bins
pub const DEFAULT_BINS: usize = 20;

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChurnError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChurnError::Render(err.to_string())
    }
}

fn label_color(label: ChurnLabel) -> RGBColor {
    match label {
        ChurnLabel::Attrited => ATTRITED_COLOR,
        ChurnLabel::Existing => EXISTING_COLOR,
    }
}

/// Equal-width bins over `[lo, hi]` shared by every churn label
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<(ChurnLabel, Vec<usize>)>,
}

impl Histogram {
    pub fn max_count(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|(_, counts)| counts.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Bin a numeric distribution. Values equal to the upper edge fall in the last
/// bin; a degenerate range is widened to one unit around the value.
pub fn histogram(dist: &NumericDistribution, bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (lo, hi) = match dist.range() {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((v, _)) => (v - 0.5, v + 0.5),
        None => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();

    let counts = ChurnLabel::ALL
        .iter()
        .map(|&label| {
            let mut counts = vec![0usize; bins];
            for &v in dist.values_for(label) {
                let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
                counts[idx] += 1;
            }
            (label, counts)
        })
        .collect();

    Histogram { edges, counts }
}

/// Overlaid per-label histogram of a numeric attribute
pub fn render_distribution(dist: &NumericDistribution, output_path: &Path, bins: usize) -> Result<()> {
    let hist = histogram(dist, bins);
    let lo = hist.edges.first().copied().unwrap_or(0.0);
    let hi = hist.edges.last().copied().unwrap_or(1.0);
    let y_max = (hist.max_count().max(1) as f64) * 1.1;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Churn Distribution by {}", dist.attribute), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(dist.attribute.as_str())
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (label, counts) in &hist.counts {
        let color = label_color(*label);
        let bars = counts.iter().enumerate().map(|(i, &count)| {
            Rectangle::new(
                [(hist.edges[i], 0.0), (hist.edges[i + 1], count as f64)],
                color.mix(0.5).filled(),
            )
        });
        chart
            .draw_series(bars)?
            .label(label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!("Distribution chart saved to: {}", output_path.display());
    Ok(())
}

/// Side-by-side bars of churn label counts per category
pub fn render_contingency(table: &ContingencyTable, output_path: &Path) -> Result<()> {
    let n = table.rows.len().max(1);
    let y_max = (table.max_count().max(1) as f64) * 1.1;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Churn Distribution by {}", table.attribute), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

    let categories: Vec<&str> = table.rows.iter().map(|row| row.category.as_str()).collect();
    let category_label = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 {
            categories.get(idx as usize).map(|c| c.to_string()).unwrap_or_default()
        } else {
            String::new()
        }
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&category_label)
        .x_desc(table.attribute.as_str())
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (offset, label) in [(-0.4, ChurnLabel::Attrited), (0.0, ChurnLabel::Existing)] {
        let color = label_color(label);
        let bars = table.rows.iter().enumerate().map(|(i, row)| {
            let x0 = i as f64 + offset;
            Rectangle::new([(x0, 0.0), (x0 + 0.4, row.count(label) as f64)], color.filled())
        });
        chart
            .draw_series(bars)?
            .label(label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!("Category chart saved to: {}", output_path.display());
    Ok(())
}

/// Transaction amount vs count, colored by churn label
pub fn render_scatter(scatter: &ScatterDataset, output_path: &Path) -> Result<()> {
    let (x_max, y_max) = ChurnLabel::ALL
        .iter()
        .flat_map(|&label| scatter.points_for(label).iter())
        .fold((1.0f64, 1.0f64), |(x, y), p| (x.max(p.amount), y.max(p.count)));

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Transaction Amount vs Count", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..x_max * 1.05, 0f64..y_max * 1.05)?;

    chart
        .configure_mesh()
        .x_desc("total_trans_amt")
        .y_desc("total_trans_ct")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for label in ChurnLabel::ALL {
        let color = label_color(label);
        chart
            .draw_series(
                scatter
                    .points_for(label)
                    .iter()
                    .map(|p| Circle::new((p.amount, p.count), 3, color.mix(0.6).filled())),
            )?
            .label(label.as_str())
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!("Scatter chart saved to: {}", output_path.display());
    Ok(())
}

/// Render whichever chart the dataset calls for
pub fn render_chart(dataset: &ChartDataset, output_path: &Path, bins: usize) -> Result<()> {
    match dataset {
        ChartDataset::Distribution(dist) => render_distribution(dist, output_path, bins),
        ChartDataset::Contingency(table) => render_contingency(table, output_path),
    }
}

/// Path of the scatter chart written next to the attribute chart
pub fn scatter_path(base_output_path: &Path) -> PathBuf {
    let stem = base_output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart".to_string());
    base_output_path.with_file_name(format!("{}_scatter.png", stem))
}

/// Render the attribute chart and the scatter for a view, returning the files written
pub fn render_dashboard(
    view: &View,
    attribute: ChartAttribute,
    base_output_path: &Path,
    bins: usize,
) -> Result<Vec<PathBuf>> {
    render_chart(&view.chart(attribute)?, base_output_path, bins)?;

    let scatter_output = scatter_path(base_output_path);
    render_scatter(&view.scatter()?, &scatter_output)?;

    Ok(vec![base_output_path.to_path_buf(), scatter_output])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn distribution(attrited: Vec<f64>, existing: Vec<f64>) -> NumericDistribution {
        let mut values = BTreeMap::new();
        values.insert(ChurnLabel::Attrited, attrited);
        values.insert(ChurnLabel::Existing, existing);
        NumericDistribution {
            attribute: "contacts_count_12_mon".to_string(),
            values,
            missing: BTreeMap::new(),
        }
    }

    #[test]
    fn test_histogram_conserves_counts() {
        let dist = distribution(vec![0.0, 1.0, 6.0, 6.0], vec![2.0, 3.0, 3.0]);
        let hist = histogram(&dist, 6);

        assert_eq!(hist.edges.len(), 7);
        assert_eq!(hist.edges[0], 0.0);
        assert_eq!(hist.edges[6], 6.0);

        let attrited = &hist.counts[0];
        assert_eq!(attrited.0, ChurnLabel::Attrited);
        assert_eq!(attrited.1.iter().sum::<usize>(), 4);
        // the upper edge lands in the last bin
        assert_eq!(attrited.1[5], 2);

        let existing = &hist.counts[1];
        assert_eq!(existing.1, vec![0, 0, 1, 2, 0, 0]);
        assert_eq!(hist.max_count(), 2);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let dist = distribution(vec![4.0], vec![4.0, 4.0]);
        let hist = histogram(&dist, 4);

        assert_eq!(hist.edges[0], 3.5);
        assert_eq!(hist.edges[4], 4.5);
        assert_eq!(hist.counts[1].1.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_histogram_empty() {
        let dist = distribution(vec![], vec![]);
        let hist = histogram(&dist, 0);

        assert_eq!(hist.edges, vec![0.0, 1.0]);
        assert_eq!(hist.max_count(), 0);
    }

    #[test]
    fn test_scatter_path() {
        assert_eq!(
            scatter_path(Path::new("out/churn_chart.png")),
            PathBuf::from("out/churn_chart_scatter.png")
        );
    }
}
