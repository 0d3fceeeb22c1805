//! Customer input loading: single JSON profiles and batch CSV files via Polars

use crate::features::{CustomerProfile, FeatureVector};
use anyhow::Context;
use polars::prelude::*;
use std::path::Path;

/// Optional identifier column in batch files
pub const CUSTOMER_ID_COLUMN: &str = "Customer_ID";

/// Rows read from a batch CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerBatch {
    /// Identifier per row; the 1-based row number when the file has no id column
    pub customer_ids: Vec<String>,
    /// Feature values per row; empty cells are left out rather than zeroed
    pub rows: Vec<FeatureVector>,
}

impl CustomerBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load a customer CSV whose headers are feature names.
///
/// Only columns listed in `feature_names` are read; any other column except
/// `Customer_ID` is ignored.
pub fn load_customer_batch<S: AsRef<str>>(
    file_path: &str,
    feature_names: &[S],
) -> crate::Result<CustomerBatch> {
    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .finish()
        .with_context(|| format!("failed to open {}", file_path))?
        .collect()
        .with_context(|| format!("failed to read {}", file_path))?;

    if df.height() == 0 {
        anyhow::bail!("No customer rows found in {}", file_path);
    }

    let customer_ids = extract_customer_ids(&df)?;
    let mut rows = vec![FeatureVector::new(); df.height()];
    let mut matched_columns = 0;

    for name in feature_names {
        let name = name.as_ref();
        let Ok(column) = df.column(name) else {
            continue;
        };
        matched_columns += 1;

        let values = column
            .cast(&DataType::Float64)
            .with_context(|| format!("column {} is not numeric", name))?;
        let raw = column.cast(&DataType::String)?;

        // the lenient cast turns unparseable cells into nulls; only empty cells may be null
        let cells = raw.str()?.into_iter().zip(values.f64()?.into_iter());
        for (i, (row, (text, value))) in rows.iter_mut().zip(cells).enumerate() {
            match (text, value) {
                (_, Some(value)) => {
                    row.insert(name.to_string(), value);
                }
                (Some(text), None) if !text.trim().is_empty() => {
                    anyhow::bail!(
                        "{}: column {} row {} (customer {}) has non-numeric value {:?}",
                        file_path,
                        name,
                        i + 1,
                        customer_ids[i],
                        text
                    );
                }
                _ => {}
            }
        }
    }

    if matched_columns == 0 {
        anyhow::bail!("{} has no columns matching the model's features", file_path);
    }

    log::info!(
        "Loaded {} customers with {}/{} feature columns from {}",
        rows.len(),
        matched_columns,
        feature_names.len(),
        file_path
    );

    Ok(CustomerBatch { customer_ids, rows })
}

fn extract_customer_ids(df: &DataFrame) -> crate::Result<Vec<String>> {
    let Ok(column) = df.column(CUSTOMER_ID_COLUMN) else {
        return Ok((1..=df.height()).map(|i| i.to_string()).collect());
    };

    let ids = column.cast(&DataType::String)?;
    Ok(ids
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, id)| id.map(str::to_string).unwrap_or_else(|| (i + 1).to_string()))
        .collect())
}

/// Load a single customer from a JSON object.
///
/// A complete object parses into a validated-shape [`CustomerProfile`]; a
/// partial one falls back to a plain name/value map.
pub fn load_profile_json(path: &Path) -> crate::Result<FeatureVector> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if let Ok(profile) = serde_json::from_str::<CustomerProfile>(&content) {
        return Ok(profile.to_feature_vector());
    }

    let features: FeatureVector = serde_json::from_str(&content).with_context(|| {
        format!(
            "{} must be a JSON object mapping feature names to numbers",
            path.display()
        )
    })?;
    Ok(features)
}
