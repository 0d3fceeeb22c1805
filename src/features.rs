//! Customer feature definitions and boundary validation

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse named feature values for one customer
pub type FeatureVector = BTreeMap<String, f64>;

pub const CUSTOMER_SERVICE_CALLS: &str = "Customer_Service_Calls";
pub const LIFETIME_VALUE: &str = "Lifetime_Value";
pub const CART_ABANDONMENT_RATE: &str = "Cart_Abandonment_Rate";
pub const AGE: &str = "Age";
pub const TOTAL_PURCHASES: &str = "Total_Purchases";
pub const DISCOUNT_USAGE_RATE: &str = "Discount_Usage_Rate";
pub const DAYS_SINCE_LAST_PURCHASE: &str = "Days_Since_Last_Purchase";
pub const AVERAGE_ORDER_VALUE: &str = "Average_Order_Value";
pub const EMAIL_OPEN_RATE: &str = "Email_Open_Rate";
pub const SESSION_DURATION_AVG: &str = "Session_Duration_Avg";
pub const PAGES_PER_SESSION: &str = "Pages_Per_Session";
pub const MOBILE_APP_USAGE: &str = "Mobile_App_Usage";
pub const RETURNS_RATE: &str = "Returns_Rate";
pub const LOGIN_FREQUENCY: &str = "Login_Frequency";
pub const CREDIT_BALANCE: &str = "Credit_Balance";

/// The 15 logical features in the order the shipped models were trained on
pub const FEATURE_NAMES: [&str; 15] = [
    CUSTOMER_SERVICE_CALLS,
    LIFETIME_VALUE,
    CART_ABANDONMENT_RATE,
    AGE,
    TOTAL_PURCHASES,
    DISCOUNT_USAGE_RATE,
    DAYS_SINCE_LAST_PURCHASE,
    AVERAGE_ORDER_VALUE,
    EMAIL_OPEN_RATE,
    SESSION_DURATION_AVG,
    PAGES_PER_SESSION,
    MOBILE_APP_USAGE,
    RETURNS_RATE,
    LOGIN_FREQUENCY,
    CREDIT_BALANCE,
];

/// Allowed value range for a known feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureRange {
    /// Any finite value >= 0
    NonNegative,
    /// Finite value within `[min, max]`
    Bounded { min: f64, max: f64 },
}

/// Range constraint for a feature name, or `None` if the name is not one of the 15
pub fn feature_range(name: &str) -> Option<FeatureRange> {
    if !FEATURE_NAMES.contains(&name) {
        return None;
    }
    if name == AGE {
        return Some(FeatureRange::Bounded {
            min: 18.0,
            max: 100.0,
        });
    }
    if name.ends_with("_Rate") || name.ends_with("_Usage") {
        return Some(FeatureRange::Bounded {
            min: 0.0,
            max: 100.0,
        });
    }
    Some(FeatureRange::NonNegative)
}

/// Check every present value against its range.
///
/// Absent features are not an error here; whether they may be zero-filled is
/// decided by the prediction pipeline's missing-feature policy.
pub fn validate_features(features: &FeatureVector) -> Result<(), ValidationError> {
    for (name, &value) in features {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                feature: name.clone(),
            });
        }
        match feature_range(name) {
            None => {}
            Some(FeatureRange::NonNegative) => {
                if value < 0.0 {
                    return Err(ValidationError::Negative {
                        feature: name.clone(),
                        value,
                    });
                }
            }
            Some(FeatureRange::Bounded { min, max }) => {
                if value < min || value > max {
                    return Err(ValidationError::OutOfRange {
                        feature: name.clone(),
                        value,
                        min,
                        max,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Fully specified customer profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerProfile {
    #[serde(rename = "Customer_Service_Calls")]
    pub customer_service_calls: f64,
    #[serde(rename = "Lifetime_Value")]
    pub lifetime_value: f64,
    #[serde(rename = "Cart_Abandonment_Rate")]
    pub cart_abandonment_rate: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Total_Purchases")]
    pub total_purchases: f64,
    #[serde(rename = "Discount_Usage_Rate")]
    pub discount_usage_rate: f64,
    #[serde(rename = "Days_Since_Last_Purchase")]
    pub days_since_last_purchase: f64,
    #[serde(rename = "Average_Order_Value")]
    pub average_order_value: f64,
    #[serde(rename = "Email_Open_Rate")]
    pub email_open_rate: f64,
    #[serde(rename = "Session_Duration_Avg")]
    pub session_duration_avg: f64,
    #[serde(rename = "Pages_Per_Session")]
    pub pages_per_session: f64,
    #[serde(rename = "Mobile_App_Usage")]
    pub mobile_app_usage: f64,
    #[serde(rename = "Returns_Rate")]
    pub returns_rate: f64,
    #[serde(rename = "Login_Frequency")]
    pub login_frequency: f64,
    #[serde(rename = "Credit_Balance")]
    pub credit_balance: f64,
}

impl Default for CustomerProfile {
    /// Defaults match the prefilled values of the prediction form
    fn default() -> Self {
        Self {
            customer_service_calls: 3.0,
            lifetime_value: 2000.0,
            cart_abandonment_rate: 50.0,
            age: 35.0,
            total_purchases: 15.0,
            discount_usage_rate: 40.0,
            days_since_last_purchase: 30.0,
            average_order_value: 120.0,
            email_open_rate: 25.0,
            session_duration_avg: 30.0,
            pages_per_session: 8.0,
            mobile_app_usage: 30.0,
            returns_rate: 5.0,
            login_frequency: 15.0,
            credit_balance: 500.0,
        }
    }
}

impl CustomerProfile {
    /// Named values in `FEATURE_NAMES` order
    pub fn values(&self) -> [(&'static str, f64); 15] {
        [
            (CUSTOMER_SERVICE_CALLS, self.customer_service_calls),
            (LIFETIME_VALUE, self.lifetime_value),
            (CART_ABANDONMENT_RATE, self.cart_abandonment_rate),
            (AGE, self.age),
            (TOTAL_PURCHASES, self.total_purchases),
            (DISCOUNT_USAGE_RATE, self.discount_usage_rate),
            (DAYS_SINCE_LAST_PURCHASE, self.days_since_last_purchase),
            (AVERAGE_ORDER_VALUE, self.average_order_value),
            (EMAIL_OPEN_RATE, self.email_open_rate),
            (SESSION_DURATION_AVG, self.session_duration_avg),
            (PAGES_PER_SESSION, self.pages_per_session),
            (MOBILE_APP_USAGE, self.mobile_app_usage),
            (RETURNS_RATE, self.returns_rate),
            (LOGIN_FREQUENCY, self.login_frequency),
            (CREDIT_BALANCE, self.credit_balance),
        ]
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        self.values()
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_features(&self.to_feature_vector())
    }
}

impl From<&CustomerProfile> for FeatureVector {
    fn from(profile: &CustomerProfile) -> Self {
        profile.to_feature_vector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_ranges() {
        assert_eq!(
            feature_range(AGE),
            Some(FeatureRange::Bounded {
                min: 18.0,
                max: 100.0
            })
        );
        assert_eq!(
            feature_range(MOBILE_APP_USAGE),
            Some(FeatureRange::Bounded {
                min: 0.0,
                max: 100.0
            })
        );
        assert_eq!(
            feature_range(RETURNS_RATE),
            Some(FeatureRange::Bounded {
                min: 0.0,
                max: 100.0
            })
        );
        assert_eq!(feature_range(LIFETIME_VALUE), Some(FeatureRange::NonNegative));
        assert_eq!(feature_range("Wishlist_Items"), None);
    }

    #[test]
    fn test_default_profile_is_valid() {
        let profile = CustomerProfile::default();
        assert!(profile.validate().is_ok());

        let vector = profile.to_feature_vector();
        assert_eq!(vector.len(), 15);
        for name in FEATURE_NAMES {
            assert!(vector.contains_key(name), "missing {}", name);
        }
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut profile = CustomerProfile {
            age: 17.0,
            ..Default::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::OutOfRange { ref feature, .. }) if feature == AGE
        ));

        profile.age = 40.0;
        profile.cart_abandonment_rate = 100.5;
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::OutOfRange { ref feature, .. }) if feature == CART_ABANDONMENT_RATE
        ));

        profile.cart_abandonment_rate = 20.0;
        profile.credit_balance = -1.0;
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::Negative { ref feature, .. }) if feature == CREDIT_BALANCE
        ));
    }

    #[test]
    fn test_validation_rejects_non_finite() {
        let mut features = FeatureVector::new();
        features.insert("Anything".to_string(), f64::NAN);
        assert_eq!(
            validate_features(&features),
            Err(ValidationError::NotFinite {
                feature: "Anything".to_string()
            })
        );
    }

    #[test]
    fn test_profile_deserializes_from_feature_names() {
        let json = r#"{
            "Customer_Service_Calls": 7, "Lifetime_Value": 1200.5,
            "Cart_Abandonment_Rate": 65.0, "Age": 41, "Total_Purchases": 4,
            "Discount_Usage_Rate": 10, "Days_Since_Last_Purchase": 90,
            "Average_Order_Value": 80, "Email_Open_Rate": 12,
            "Session_Duration_Avg": 9, "Pages_Per_Session": 3,
            "Mobile_App_Usage": 5, "Returns_Rate": 2,
            "Login_Frequency": 1, "Credit_Balance": 0
        }"#;
        let profile: CustomerProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.customer_service_calls, 7.0);
        assert_eq!(profile.days_since_last_purchase, 90.0);
        assert!(profile.validate().is_ok());
    }
}
