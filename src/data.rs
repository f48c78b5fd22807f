//! Data loading and churn schema normalization using Polars

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Canonical numeric churn column (0/1)
pub const IS_CHURN: &str = "is_churn";
/// Canonical churn label column
pub const ATTRITION_FLAG: &str = "attrition_flag";

/// Two-valued churn label carried by every normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChurnLabel {
    #[serde(rename = "Attrited Customer")]
    Attrited,
    #[serde(rename = "Existing Customer")]
    Existing,
}

impl ChurnLabel {
    pub const ALL: [ChurnLabel; 2] = [ChurnLabel::Attrited, ChurnLabel::Existing];

    pub fn as_str(self) -> &'static str {
        match self {
            ChurnLabel::Attrited => "Attrited Customer",
            ChurnLabel::Existing => "Existing Customer",
        }
    }

    pub fn from_flag(flag: i32) -> Self {
        if flag == 1 {
            ChurnLabel::Attrited
        } else {
            ChurnLabel::Existing
        }
    }

    pub fn flag(self) -> i32 {
        match self {
            ChurnLabel::Attrited => 1,
            ChurnLabel::Existing => 0,
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How unrecognised churn values are treated during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagPolicy {
    /// Anything that is not an exact churn marker counts as retained
    #[default]
    Lenient,
    /// Unrecognised values abort normalization
    Strict,
}

/// Options controlling how a raw frame becomes a [`RecordSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Candidate numeric churn columns, checked in order after name canonicalization
    pub churn_columns: Vec<String>,
    pub policy: FlagPolicy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            churn_columns: ["is_churn", "churn", "churn_flag", "attrited", "exited", ATTRITION_FLAG]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            policy: FlagPolicy::Lenient,
        }
    }
}

impl NormalizeOptions {
    pub fn strict() -> Self {
        Self {
            policy: FlagPolicy::Strict,
            ..Self::default()
        }
    }
}

/// Normalized, read-only customer records.
///
/// Every row carries `is_churn` (0/1) and an `attrition_flag` label that agrees
/// with it. Only [`normalize`] and the filter engine construct one.
#[derive(Debug, Clone)]
pub struct RecordSet {
    df: DataFrame,
}

impl RecordSet {
    pub(crate) fn from_normalized(df: DataFrame) -> Self {
        Self { df }
    }

    /// Underlying Polars frame
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub(crate) fn column(&self, name: &str) -> Option<&Series> {
        self.df.column(name).ok()
    }

    pub(crate) fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    /// Churn indicator per record, in record order
    pub fn churn_flags(&self) -> Result<Vec<i32>> {
        let series = self.df.column(IS_CHURN)?;
        let ca = series.i32()?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
    }

    /// Churn label per record, in record order
    pub fn labels(&self) -> Result<Vec<ChurnLabel>> {
        Ok(self
            .churn_flags()?
            .into_iter()
            .map(ChurnLabel::from_flag)
            .collect())
    }
}

/// Read a CSV file with a header row into a raw frame
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ChurnError::MissingSource {
        path: path.to_path_buf(),
        source,
    })?;

    let df = CsvReader::new(file).finish()?;
    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Load a CSV file and normalize it in one step
pub fn load_and_normalize<P: AsRef<Path>>(path: P, options: &NormalizeOptions) -> Result<RecordSet> {
    let raw = load_csv(path)?;
    normalize(&raw, options)
}

/// Produce a canonical record set with consistent `is_churn` and `attrition_flag` columns.
///
/// A numeric churn indicator wins over the string label when both exist. The
/// label column is always rewritten from `is_churn`, so it only ever holds the
/// two values of [`ChurnLabel`]. The input frame is left untouched.
///
/// # Errors
/// * [`ChurnError::Schema`] when column names collide after canonicalization or
///   no churn source exists
/// * [`ChurnError::InvalidChurnValue`] under [`FlagPolicy::Strict`]
pub fn normalize(raw: &DataFrame, options: &NormalizeOptions) -> Result<RecordSet> {
    let mut df = canonicalize_columns(raw)?;

    let flags = match find_numeric_indicator(&df, options) {
        Some(name) => {
            debug!("Deriving {} from numeric column '{}'", IS_CHURN, name);
            flags_from_numeric(df.column(&name)?, options.policy)?
        }
        None => match df.column(ATTRITION_FLAG) {
            Ok(series) => {
                debug!("Deriving {} from '{}' labels", IS_CHURN, ATTRITION_FLAG);
                flags_from_labels(series, options.policy)?
            }
            Err(_) => {
                return Err(ChurnError::Schema(format!(
                    "no churn indicator found: expected a numeric column among {:?} or a '{}' label column",
                    options.churn_columns, ATTRITION_FLAG
                )))
            }
        },
    };

    let labels: Vec<&str> = flags
        .iter()
        .map(|&flag| ChurnLabel::from_flag(flag).as_str())
        .collect();
    let churned = flags.iter().filter(|&&flag| flag == 1).count();

    df.with_column(Series::new(IS_CHURN, flags))?;
    df.with_column(Series::new(ATTRITION_FLAG, labels))?;

    info!("Normalized {} records ({} churned)", df.height(), churned);
    Ok(RecordSet::from_normalized(df))
}

/// Lower-case and snake-case a raw column header
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

fn canonicalize_columns(raw: &DataFrame) -> Result<DataFrame> {
    let originals: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let names: Vec<String> = originals.iter().map(|name| canonical_name(name)).collect();

    let mut seen = HashSet::with_capacity(names.len());
    for (original, name) in originals.iter().zip(&names) {
        if !seen.insert(name.as_str()) {
            return Err(ChurnError::Schema(format!(
                "column '{}' collides with another column once canonicalized to '{}'",
                original, name
            )));
        }
    }

    let mut df = raw.clone();
    df.set_column_names(&names)?;
    Ok(df)
}

fn is_indicator_dtype(dtype: &DataType) -> bool {
    dtype.is_numeric() || matches!(dtype, DataType::Boolean)
}

fn find_numeric_indicator(df: &DataFrame, options: &NormalizeOptions) -> Option<String> {
    options
        .churn_columns
        .iter()
        .map(|name| canonical_name(name))
        .find(|name| {
            df.column(name)
                .map(|series| is_indicator_dtype(series.dtype()))
                .unwrap_or(false)
        })
}

fn flags_from_numeric(series: &Series, policy: FlagPolicy) -> Result<Vec<i32>> {
    let values = series.cast(&DataType::Float64)?;
    let mut defaulted = 0usize;
    let mut flags = Vec::with_capacity(values.len());

    for (row, value) in values.f64()?.into_iter().enumerate() {
        let flag = match value {
            Some(v) if v == 1.0 => 1,
            Some(v) if v == 0.0 => 0,
            other => {
                if policy == FlagPolicy::Strict {
                    return Err(ChurnError::InvalidChurnValue {
                        row,
                        value: other.map_or_else(|| "null".to_string(), |v| v.to_string()),
                    });
                }
                defaulted += 1;
                0
            }
        };
        flags.push(flag);
    }

    if defaulted > 0 {
        warn!("{} numeric churn values were neither 0 nor 1 and count as retained", defaulted);
    }
    Ok(flags)
}

fn flags_from_labels(series: &Series, policy: FlagPolicy) -> Result<Vec<i32>> {
    let values = series.cast(&DataType::String)?;
    let mut defaulted = 0usize;
    let mut flags = Vec::with_capacity(values.len());

    for (row, value) in values.str()?.into_iter().enumerate() {
        let flag = match value {
            Some(label) if label == ChurnLabel::Attrited.as_str() => 1,
            Some(label) if label == ChurnLabel::Existing.as_str() => 0,
            other => {
                if policy == FlagPolicy::Strict {
                    return Err(ChurnError::InvalidChurnValue {
                        row,
                        value: other.unwrap_or("null").to_string(),
                    });
                }
                defaulted += 1;
                0
            }
        };
        flags.push(flag);
    }

    if defaulted > 0 {
        warn!("{} churn labels were not recognised and count as retained", defaulted);
    }
    Ok(flags)
}

/// Values of a numeric column as `f64`; nulls stay `None`
pub(crate) fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let values = series.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}
