//! Map sparse named features onto the dense column order a model was fit on

use crate::features::FeatureVector;
use ndarray::Array1;

/// Dense vector plus the expected features that had to be zero-filled
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub vector: Array1<f64>,
    pub imputed: Vec<String>,
}

/// Build the dense vector in `expected_order`.
///
/// Missing names become `0.0`; keys not in `expected_order` are dropped.
/// The column order is load-bearing: a permuted vector still scores, just wrongly.
pub fn align<S: AsRef<str>>(raw: &FeatureVector, expected_order: &[S]) -> Array1<f64> {
    expected_order
        .iter()
        .map(|name| raw.get(name.as_ref()).copied().unwrap_or(0.0))
        .collect()
}

/// Same as [`align`] but also reports which expected features were absent
pub fn align_with_report<S: AsRef<str>>(raw: &FeatureVector, expected_order: &[S]) -> Alignment {
    let mut imputed = Vec::new();
    for name in expected_order {
        let name: &str = name.as_ref();
        if !raw.contains_key(name) {
            imputed.push(name.to_string());
        }
    }

    Alignment {
        vector: align(raw, expected_order),
        imputed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{CustomerProfile, CREDIT_BALANCE, FEATURE_NAMES, MOBILE_APP_USAGE};

    #[test]
    fn test_align_preserves_expected_order() {
        let raw = CustomerProfile::default().to_feature_vector();
        let aligned = align(&raw, &FEATURE_NAMES);

        assert_eq!(aligned.len(), FEATURE_NAMES.len());
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            assert_eq!(aligned[i], raw[*name], "position {} should hold {}", i, name);
        }
    }

    #[test]
    fn test_align_follows_custom_order() {
        let mut raw = FeatureVector::new();
        raw.insert("b".to_string(), 2.0);
        raw.insert("a".to_string(), 1.0);
        raw.insert("c".to_string(), 3.0);

        let aligned = align(&raw, &["c", "a", "b"]);
        assert_eq!(aligned.to_vec(), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_align_zero_fills_missing_and_drops_extras() {
        let mut raw = CustomerProfile::default().to_feature_vector();
        raw.remove(CREDIT_BALANCE);
        raw.remove(MOBILE_APP_USAGE);
        raw.insert("Wishlist_Items".to_string(), 12.0);

        let report = align_with_report(&raw, &FEATURE_NAMES);
        assert_eq!(report.vector.len(), 15);
        assert_eq!(
            report.imputed,
            vec![MOBILE_APP_USAGE.to_string(), CREDIT_BALANCE.to_string()]
        );

        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            match raw.get(*name) {
                Some(value) => assert_eq!(report.vector[i], *value),
                None => assert_eq!(report.vector[i], 0.0),
            }
        }
        assert!(!report.vector.iter().any(|&v| v == 12.0));
    }

    #[test]
    fn test_align_empty_input() {
        let aligned = align(&FeatureVector::new(), &FEATURE_NAMES);
        assert_eq!(aligned.len(), 15);
        assert!(aligned.iter().all(|&v| v == 0.0));
    }
}
