//! Text and JSON reports for a filtered view

use crate::chart::{ChartAttribute, ChartDataset, ScatterDataset};
use crate::data::ChurnLabel;
use crate::error::Result;
use crate::session::View;
use crate::summary::{format_thousands, KpiSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Everything the dashboard shows for one selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub generated_at: String,
    pub source: Option<String>,
    pub selection: BTreeMap<String, Vec<String>>,
    pub summary: KpiSummary,
    pub chart: ChartDataset,
    pub scatter_counts: BTreeMap<ChurnLabel, usize>,
}

/// Descriptive statistics of one numeric sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Describe {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self {
            count: values.len(),
            mean: values.iter().sum::<f64>() / values.len() as f64,
            min,
            max,
        })
    }
}

/// Assemble the serializable report from a view and its already built scatter
pub fn build_report(
    view: &View,
    attribute: ChartAttribute,
    scatter: &ScatterDataset,
    source: Option<&str>,
) -> Result<DashboardReport> {
    let scatter_counts = ChurnLabel::ALL
        .iter()
        .map(|&label| (label, scatter.points_for(label).len()))
        .collect();

    Ok(DashboardReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: source.map(str::to_string),
        selection: view
            .selection()
            .iter()
            .map(|(attr, values)| (attr.to_string(), values.iter().cloned().collect()))
            .collect(),
        summary: view.summary()?,
        chart: view.chart(attribute)?,
        scatter_counts,
    })
}

/// Report as pretty-printed JSON
pub fn render_json(report: &DashboardReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human readable report: KPI panel, chart table and scatter sizes
pub fn render_text(summary: &KpiSummary, chart: &ChartDataset, scatter: &ScatterDataset) -> String {
    let mut out = String::new();

    out.push_str("=== Key Performance Indicators ===\n");
    let _ = writeln!(out, "Total Customers:   {}", format_thousands(summary.total_count));
    let _ = writeln!(out, "Churned Customers: {}", format_thousands(summary.churned_count));
    let _ = writeln!(out, "Churn Rate:        {}", summary.rate_display());

    let _ = writeln!(out, "\n=== Churn Distribution by {} ===", chart.attribute());
    match chart {
        ChartDataset::Distribution(dist) => {
            let _ = writeln!(
                out,
                "  {:<18} | {:>6} | {:>9} | {:>9} | {:>9} | {:>7}",
                "Label", "Count", "Mean", "Min", "Max", "Missing"
            );
            for label in ChurnLabel::ALL {
                let missing = dist.missing.get(&label).copied().unwrap_or(0);
                match Describe::of(dist.values_for(label)) {
                    Some(d) => {
                        let _ = writeln!(
                            out,
                            "  {:<18} | {:>6} | {:>9.2} | {:>9.2} | {:>9.2} | {:>7}",
                            label, d.count, d.mean, d.min, d.max, missing
                        );
                    }
                    None => {
                        let _ = writeln!(
                            out,
                            "  {:<18} | {:>6} | {:>9} | {:>9} | {:>9} | {:>7}",
                            label, 0, "-", "-", "-", missing
                        );
                    }
                }
            }
        }
        ChartDataset::Contingency(table) => {
            let width = table
                .rows
                .iter()
                .map(|row| row.category.len())
                .max()
                .unwrap_or(0)
                .max("Category".len());
            let _ = writeln!(
                out,
                "  {:<width$} | {:>17} | {:>17}",
                "Category",
                ChurnLabel::Attrited,
                ChurnLabel::Existing,
                width = width
            );
            for row in &table.rows {
                let _ = writeln!(
                    out,
                    "  {:<width$} | {:>17} | {:>17}",
                    row.category,
                    row.attrited,
                    row.existing,
                    width = width
                );
            }
            if table.rows.is_empty() {
                out.push_str("  (no records)\n");
            }
        }
    }

    out.push_str("\n=== Transaction Amount vs Count ===\n");
    for label in ChurnLabel::ALL {
        let _ = writeln!(out, "  {}: {} points", label, scatter.points_for(label).len());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NormalizeOptions;
    use crate::filter::{FilterAttribute, Selection};
    use crate::session::Session;
    use polars::prelude::*;

    fn session() -> Session {
        let raw = df!(
            "attrition_flag" => &["Attrited Customer", "Existing Customer", "Existing Customer"],
            "gender" => &["M", "F", "M"],
            "card_category" => &["Blue", "Blue", "Gold"],
            "marital_status" => &["Married", "Single", "Married"],
            "contacts_count_12_mon" => &[3i64, 2, 1],
            "total_trans_amt" => &[1144i64, 1291, 1887],
            "total_trans_ct" => &[42i64, 33, 20]
        )
        .unwrap();
        Session::from_frame(&raw, &NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn test_describe() {
        let d = Describe::of(&[1.0, 2.0, 6.0]).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.mean, 3.0);
        assert_eq!((d.min, d.max), (1.0, 6.0));
        assert!(Describe::of(&[]).is_none());
    }

    #[test]
    fn test_render_text_categorical() {
        let view = session()
            .view(&Selection::all().with(FilterAttribute::Gender, ["M"]))
            .unwrap();
        let text = render_text(
            &view.summary().unwrap(),
            &view.chart(ChartAttribute::MaritalStatus).unwrap(),
            &view.scatter().unwrap(),
        );

        assert!(text.contains("Total Customers:   2"));
        assert!(text.contains("Churn Rate:        50.00%"));
        assert!(text.contains("Churn Distribution by marital_status"));
        assert!(text.contains("Married"));
        assert!(!text.contains("Single"));
        assert!(text.contains("Attrited Customer: 1 points"));
    }

    #[test]
    fn test_render_text_numeric() {
        let view = session().view(&Selection::all()).unwrap();
        let text = render_text(
            &view.summary().unwrap(),
            &view.chart(ChartAttribute::ContactsCount12Mon).unwrap(),
            &view.scatter().unwrap(),
        );

        assert!(text.contains("Mean"));
        assert!(text.contains("Existing Customer"));
    }

    #[test]
    fn test_json_report() {
        let view = session()
            .view(&Selection::all().with(FilterAttribute::CardCategory, ["Blue"]))
            .unwrap();
        let scatter = view.scatter().unwrap();
        let report =
            build_report(&view, ChartAttribute::ContactsCount12Mon, &scatter, Some("bank.csv")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["summary"]["total_count"], 2);
        assert_eq!(json["summary"]["churned_count"], 1);
        assert_eq!(json["chart"]["kind"], "distribution");
        assert_eq!(json["chart"]["values"]["Attrited Customer"][0], 3.0);
        assert_eq!(json["selection"]["card_category"][0], "Blue");
        assert_eq!(json["scatter_counts"]["Existing Customer"], 1);
    }
}
