//! KPI aggregation over a record set

use crate::data::{RecordSet, IS_CHURN};
use crate::error::Result;
use polars::prelude::ChunkAgg;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Headline churn figures for a record set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_count: usize,
    pub churned_count: usize,
    /// Percentage in `[0, 100]`; zero for an empty set
    pub churn_rate: f64,
}

impl KpiSummary {
    pub fn from_counts(total_count: usize, churned_count: usize) -> Self {
        let churn_rate = if total_count > 0 {
            churned_count as f64 / total_count as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_count,
            churned_count,
            churn_rate,
        }
    }

    pub fn retained_count(&self) -> usize {
        self.total_count.saturating_sub(self.churned_count)
    }

    /// Churn rate with two decimals, e.g. `16.07%`
    pub fn rate_display(&self) -> String {
        format!("{:.2}%", self.churn_rate)
    }
}

impl fmt::Display for KpiSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Customers: {} | Churned Customers: {} | Churn Rate: {}",
            format_thousands(self.total_count),
            format_thousands(self.churned_count),
            self.rate_display()
        )
    }
}

/// Count records and churners; `is_churn` holds only 0 and 1, so its sum is the churned count
pub fn summarize(records: &RecordSet) -> Result<KpiSummary> {
    let churned = records.frame().column(IS_CHURN)?.i32()?.sum().unwrap_or(0);
    Ok(KpiSummary::from_counts(records.len(), churned.max(0) as usize))
}

/// Group digits in threes: `10127` becomes `10,127`
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
