//! Chart data selection: numeric distributions, contingency tables and the
//! transaction scatter, each partitioned by churn label

use crate::data::{numeric_values, ChurnLabel, RecordSet, ATTRITION_FLAG};
use crate::error::{ChurnError, Result};
use polars::prelude::{col, len, DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Attributes offered for the churn comparison chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartAttribute {
    EducationLevel,
    IncomeCategory,
    MaritalStatus,
    ContactsCount12Mon,
}

impl ChartAttribute {
    pub const ALL: [ChartAttribute; 4] = [
        ChartAttribute::EducationLevel,
        ChartAttribute::IncomeCategory,
        ChartAttribute::MaritalStatus,
        ChartAttribute::ContactsCount12Mon,
    ];

    pub fn column(self) -> &'static str {
        match self {
            ChartAttribute::EducationLevel => "education_level",
            ChartAttribute::IncomeCategory => "income_category",
            ChartAttribute::MaritalStatus => "marital_status",
            ChartAttribute::ContactsCount12Mon => "contacts_count_12_mon",
        }
    }
}

impl fmt::Display for ChartAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}

impl FromStr for ChartAttribute {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        ChartAttribute::ALL
            .into_iter()
            .find(|attr| attr.column() == s)
            .ok_or_else(|| ChurnError::UnknownAttribute(s.to_string()))
    }
}

/// Whether an attribute is plotted as a distribution or as category counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Numeric,
    Categorical,
}

impl AttributeKind {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            AttributeKind::Numeric
        } else {
            AttributeKind::Categorical
        }
    }
}

/// Raw numeric values per churn label, in record order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericDistribution {
    pub attribute: String,
    pub values: BTreeMap<ChurnLabel, Vec<f64>>,
    /// Null cells per label, kept out of `values`
    pub missing: BTreeMap<ChurnLabel, usize>,
}

impl NumericDistribution {
    pub fn values_for(&self, label: ChurnLabel) -> &[f64] {
        self.values.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Smallest and largest value across both labels
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.values().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// One category row of a contingency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyRow {
    pub category: String,
    pub attrited: usize,
    pub existing: usize,
}

impl ContingencyRow {
    pub fn count(&self, label: ChurnLabel) -> usize {
        match label {
            ChurnLabel::Attrited => self.attrited,
            ChurnLabel::Existing => self.existing,
        }
    }

    pub fn total(&self) -> usize {
        self.attrited + self.existing
    }
}

/// Record counts by category and churn label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub attribute: String,
    /// Categories in first-appearance order
    pub rows: Vec<ContingencyRow>,
}

impl ContingencyTable {
    pub fn row(&self, category: &str) -> Option<&ContingencyRow> {
        self.rows.iter().find(|row| row.category == category)
    }

    pub fn max_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.attrited.max(row.existing))
            .max()
            .unwrap_or(0)
    }
}

/// Data behind the attribute comparison chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartDataset {
    Distribution(NumericDistribution),
    Contingency(ContingencyTable),
}

impl ChartDataset {
    pub fn kind(&self) -> AttributeKind {
        match self {
            ChartDataset::Distribution(_) => AttributeKind::Numeric,
            ChartDataset::Contingency(_) => AttributeKind::Categorical,
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            ChartDataset::Distribution(d) => &d.attribute,
            ChartDataset::Contingency(t) => &t.attribute,
        }
    }
}

/// A `(total_trans_amt, total_trans_ct)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub amount: f64,
    pub count: f64,
}

/// Transaction amount against transaction count, per churn label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterDataset {
    pub points: BTreeMap<ChurnLabel, Vec<ScatterPoint>>,
}

impl ScatterDataset {
    pub fn points_for(&self, label: ChurnLabel) -> &[ScatterPoint] {
        self.points.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Columns backing the fixed scatter view
pub const SCATTER_X: &str = "total_trans_amt";
pub const SCATTER_Y: &str = "total_trans_ct";

/// Classify an attribute by the dtype of its column
pub fn classify(records: &RecordSet, attribute: ChartAttribute) -> Result<AttributeKind> {
    let series = records
        .column(attribute.column())
        .ok_or_else(|| ChurnError::UnknownAttribute(attribute.column().to_string()))?;
    Ok(AttributeKind::of(series.dtype()))
}

/// Build the comparison dataset for `attribute` over `records`.
///
/// Numeric attributes yield every non-null value per label in record order.
/// Categorical attributes yield a contingency table. A column absent from the
/// schema is rejected rather than substituted.
pub fn chart_data(records: &RecordSet, attribute: ChartAttribute) -> Result<ChartDataset> {
    let name = attribute.column();
    let series = records
        .column(name)
        .ok_or_else(|| ChurnError::UnknownAttribute(name.to_string()))?;
    let kind = AttributeKind::of(series.dtype());
    debug!("Chart attribute '{}' classified as {:?}", name, kind);

    let dataset = match kind {
        AttributeKind::Numeric => {
            let mut values: BTreeMap<ChurnLabel, Vec<f64>> =
                ChurnLabel::ALL.iter().map(|&l| (l, Vec::new())).collect();
            let mut missing: BTreeMap<ChurnLabel, usize> =
                ChurnLabel::ALL.iter().map(|&l| (l, 0)).collect();

            for (label, value) in records.labels()?.into_iter().zip(numeric_values(series)?) {
                match value {
                    Some(v) => values.entry(label).or_default().push(v),
                    None => *missing.entry(label).or_default() += 1,
                }
            }

            ChartDataset::Distribution(NumericDistribution {
                attribute: name.to_string(),
                values,
                missing,
            })
        }
        AttributeKind::Categorical => ChartDataset::Contingency(ContingencyTable {
            attribute: name.to_string(),
            rows: contingency_rows(records, name)?,
        }),
    };

    Ok(dataset)
}

/// Count records per (category, label) pair, categories in first-appearance order
fn contingency_rows(records: &RecordSet, name: &str) -> Result<Vec<ContingencyRow>> {
    let counts: DataFrame = records
        .lazy()
        .filter(col(name).is_not_null())
        .group_by_stable([col(name).cast(DataType::String), col(ATTRITION_FLAG)])
        .agg([len().alias("count")])
        .collect()?;

    let totals = counts.column("count")?.cast(&DataType::UInt64)?;
    let pairs = counts
        .column(name)?
        .str()?
        .into_iter()
        .zip(counts.column(ATTRITION_FLAG)?.str()?)
        .zip(totals.u64()?);

    let mut rows: Vec<ContingencyRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for ((category, label), total) in pairs {
        let (Some(category), Some(total)) = (category, total) else {
            continue;
        };
        let slot = *index.entry(category).or_insert_with(|| {
            rows.push(ContingencyRow {
                category: category.to_string(),
                attrited: 0,
                existing: 0,
            });
            rows.len() - 1
        });
        if label == Some(ChurnLabel::Attrited.as_str()) {
            rows[slot].attrited += total as usize;
        } else {
            rows[slot].existing += total as usize;
        }
    }
    Ok(rows)
}

/// Pair transaction amount and count per record, partitioned by churn label.
/// Rows with a null coordinate are skipped.
pub fn transaction_scatter(records: &RecordSet) -> Result<ScatterDataset> {
    let mut columns = Vec::with_capacity(2);
    for name in [SCATTER_X, SCATTER_Y] {
        let series = records
            .column(name)
            .ok_or_else(|| ChurnError::UnknownAttribute(name.to_string()))?;
        if !series.dtype().is_numeric() {
            return Err(ChurnError::Schema(format!(
                "scatter column '{}' is not numeric ({})",
                name,
                series.dtype()
            )));
        }
        columns.push(numeric_values(series)?);
    }
    let counts = columns.pop().unwrap_or_default();
    let amounts = columns.pop().unwrap_or_default();

    let mut points: BTreeMap<ChurnLabel, Vec<ScatterPoint>> =
        ChurnLabel::ALL.iter().map(|&l| (l, Vec::new())).collect();
    for ((label, amount), count) in records.labels()?.into_iter().zip(amounts).zip(counts) {
        if let (Some(amount), Some(count)) = (amount, count) {
            points
                .entry(label)
                .or_default()
                .push(ScatterPoint { amount, count });
        }
    }

    Ok(ScatterDataset { points })
}
