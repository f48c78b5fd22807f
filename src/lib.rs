//! churnscope: customer attrition analytics
//!
//! Normalizes heterogeneous churn columns into a canonical `is_churn` /
//! `attrition_flag` pair, filters customers by categorical attributes, and
//! aggregates KPIs and chart data comparing churned with retained customers.

pub mod chart;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod report;
pub mod session;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use chart::{
    chart_data, transaction_scatter, AttributeKind, ChartAttribute, ChartDataset,
    ContingencyTable, NumericDistribution, ScatterDataset,
};
pub use cli::{Args, OutputFormat};
pub use data::{load_and_normalize, load_csv, normalize, ChurnLabel, FlagPolicy, NormalizeOptions, RecordSet};
pub use error::{ChurnError, Result};
pub use filter::{distinct_values, filter, FilterAttribute, Selection};
pub use session::{Session, View};
pub use summary::{summarize, KpiSummary};
