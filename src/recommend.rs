//! Retention recommendation rules
//!
//! Rules are plain data: a guard, a message and a priority bucket. The engine
//! emits every matching tier-base rule first, then every matching
//! supplementary rule, each group in table order. Adding a rule never touches
//! the evaluation loop.

use crate::features::{
    FeatureVector, CART_ABANDONMENT_RATE, CUSTOMER_SERVICE_CALLS, DAYS_SINCE_LAST_PURCHASE,
};
use crate::risk::RiskTier;
use serde::{Deserialize, Serialize};

/// Ordering bucket for a rule's message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    TierBase,
    Supplementary,
}

/// Condition under which a rule fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    /// Customer falls in exactly this tier
    Tier { tier: RiskTier },
    /// Customer falls in this tier or a more severe one
    TierAtLeast { tier: RiskTier },
    /// Named feature is strictly greater than `threshold`; absent counts as 0
    FeatureAbove { feature: String, threshold: f64 },
    /// Named feature is strictly less than `threshold`; absent counts as 0
    FeatureBelow { feature: String, threshold: f64 },
}

impl Guard {
    pub fn matches(&self, tier: RiskTier, features: &FeatureVector) -> bool {
        let value = |name: &str| features.get(name).copied().unwrap_or(0.0);
        match self {
            Guard::Tier { tier: wanted } => tier == *wanted,
            Guard::TierAtLeast { tier: floor } => tier >= *floor,
            Guard::FeatureAbove { feature, threshold } => value(feature) > *threshold,
            Guard::FeatureBelow { feature, threshold } => value(feature) < *threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub guard: Guard,
    pub message: String,
    pub priority: Priority,
}

impl RecommendationRule {
    pub fn tier_base(tier: RiskTier, message: &str) -> Self {
        Self {
            guard: Guard::Tier { tier },
            message: message.to_string(),
            priority: Priority::TierBase,
        }
    }

    pub fn feature_above(feature: &str, threshold: f64, message: &str) -> Self {
        Self {
            guard: Guard::FeatureAbove {
                feature: feature.to_string(),
                threshold,
            },
            message: message.to_string(),
            priority: Priority::Supplementary,
        }
    }
}

/// Built-in rule table: two base messages per tier, then three feature triggers
pub fn default_rules() -> Vec<RecommendationRule> {
    vec![
        RecommendationRule::tier_base(
            RiskTier::Critical,
            "Immediate action required: offer a VIP discount coupon",
        ),
        RecommendationRule::tier_base(
            RiskTier::Critical,
            "Personal outreach: have the customer service team contact the customer directly",
        ),
        RecommendationRule::tier_base(
            RiskTier::High,
            "Special promotion: present a personalized discount offer",
        ),
        RecommendationRule::tier_base(
            RiskTier::High,
            "Re-engagement campaign: step up targeted email marketing",
        ),
        RecommendationRule::tier_base(
            RiskTier::Moderate,
            "Monitoring: track account activity on a regular schedule",
        ),
        RecommendationRule::tier_base(
            RiskTier::Moderate,
            "Loyalty program: offer point accrual benefits",
        ),
        RecommendationRule::tier_base(
            RiskTier::Low,
            "Retention maintenance: keep current satisfaction levels",
        ),
        RecommendationRule::tier_base(
            RiskTier::Low,
            "Referral request: encourage the customer to refer new customers",
        ),
        RecommendationRule::feature_above(
            CUSTOMER_SERVICE_CALLS,
            5.0,
            "Service improvement: escalate and resolve outstanding complaints",
        ),
        RecommendationRule::feature_above(
            CART_ABANDONMENT_RATE,
            60.0,
            "Checkout improvement: streamline the payment flow to cut cart abandonment",
        ),
        RecommendationRule::feature_above(
            DAYS_SINCE_LAST_PURCHASE,
            60.0,
            "Win-back offer: announce new products with a return discount",
        ),
    ]
}

/// Deterministic evaluator over a rule table
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationEngine {
    rules: Vec<RecommendationRule>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RecommendationEngine {
    pub fn new(rules: Vec<RecommendationRule>) -> Self {
        Self { rules }
    }

    /// Built-in table followed by `extra` rules
    pub fn with_extra_rules(extra: impl IntoIterator<Item = RecommendationRule>) -> Self {
        let mut rules = default_rules();
        rules.extend(extra);
        Self::new(rules)
    }

    pub fn rules(&self) -> &[RecommendationRule] {
        &self.rules
    }

    /// Ordered action list for a customer. Pure: same input, same output.
    pub fn recommend(&self, tier: RiskTier, features: &FeatureVector) -> Vec<String> {
        [Priority::TierBase, Priority::Supplementary]
            .iter()
            .flat_map(|bucket| {
                self.rules
                    .iter()
                    .filter(move |rule| rule.priority == *bucket)
            })
            .filter(|rule| rule.guard.matches(tier, features))
            .map(|rule| rule.message.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(calls: f64, abandonment: f64, days: f64) -> FeatureVector {
        let mut f = FeatureVector::new();
        f.insert(CUSTOMER_SERVICE_CALLS.to_string(), calls);
        f.insert(CART_ABANDONMENT_RATE.to_string(), abandonment);
        f.insert(DAYS_SINCE_LAST_PURCHASE.to_string(), days);
        f
    }

    fn base_messages(tier: RiskTier) -> Vec<String> {
        default_rules()
            .into_iter()
            .filter(|r| r.priority == Priority::TierBase && r.guard == Guard::Tier { tier })
            .map(|r| r.message)
            .collect()
    }

    #[test]
    fn test_every_tier_has_two_base_messages() {
        let engine = RecommendationEngine::default();
        for tier in RiskTier::ALL {
            let base = base_messages(tier);
            assert_eq!(base.len(), 2);
            for f in [features(0.0, 0.0, 0.0), features(9.0, 90.0, 200.0)] {
                let out = engine.recommend(tier, &f);
                assert_eq!(&out[..2], &base[..], "tier {}", tier);
            }
        }
    }

    #[test]
    fn test_no_supplementary_below_thresholds() {
        let engine = RecommendationEngine::default();
        let out = engine.recommend(RiskTier::Moderate, &features(3.0, 50.0, 30.0));
        assert_eq!(out, base_messages(RiskTier::Moderate));
    }

    #[test]
    fn test_thresholds_are_strict() {
        let engine = RecommendationEngine::default();
        let out = engine.recommend(RiskTier::Low, &features(5.0, 60.0, 60.0));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_all_supplementary_in_fixed_order() {
        let engine = RecommendationEngine::default();
        let out = engine.recommend(RiskTier::Critical, &features(7.0, 65.0, 90.0));
        assert_eq!(out.len(), 5);
        assert_eq!(&out[..2], &base_messages(RiskTier::Critical)[..]);
        assert!(out[2].starts_with("Service improvement"));
        assert!(out[3].starts_with("Checkout improvement"));
        assert!(out[4].starts_with("Win-back"));
    }

    #[test]
    fn test_rules_fire_independently() {
        let engine = RecommendationEngine::default();
        let out = engine.recommend(RiskTier::High, &features(0.0, 0.0, 61.0));
        assert_eq!(out.len(), 3);
        assert!(out[2].starts_with("Win-back"));

        let out = engine.recommend(RiskTier::High, &features(0.0, 61.0, 0.0));
        assert_eq!(out.len(), 3);
        assert!(out[2].starts_with("Checkout improvement"));
    }

    #[test]
    fn test_missing_feature_never_fires() {
        let engine = RecommendationEngine::default();
        let out = engine.recommend(RiskTier::Low, &FeatureVector::new());
        assert_eq!(out, base_messages(RiskTier::Low));
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let engine = RecommendationEngine::default();
        let f = features(8.0, 70.0, 10.0);
        for tier in RiskTier::ALL {
            assert_eq!(engine.recommend(tier, &f), engine.recommend(tier, &f));
        }
    }

    #[test]
    fn test_extra_rules_append_after_builtins() {
        let engine = RecommendationEngine::with_extra_rules(vec![
            RecommendationRule::feature_above("Returns_Rate", 20.0, "Review return reasons"),
            RecommendationRule {
                guard: Guard::TierAtLeast {
                    tier: RiskTier::High,
                },
                message: "Assign an account manager".to_string(),
                priority: Priority::TierBase,
            },
        ]);
        let mut f = features(7.0, 0.0, 0.0);
        f.insert("Returns_Rate".to_string(), 25.0);

        let out = engine.recommend(RiskTier::Critical, &f);
        assert_eq!(out.len(), 5);
        assert_eq!(out[2], "Assign an account manager");
        assert!(out[3].starts_with("Service improvement"));
        assert_eq!(out[4], "Review return reasons");

        let out = engine.recommend(RiskTier::Moderate, &f);
        assert!(!out.contains(&"Assign an account manager".to_string()));
    }

    #[test]
    fn test_rule_deserializes_from_json() {
        let json = r#"{
            "guard": {"kind": "feature_below", "feature": "Email_Open_Rate", "threshold": 10},
            "message": "Refresh email content",
            "priority": "supplementary"
        }"#;
        let rule: RecommendationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.priority, Priority::Supplementary);
        assert!(rule.guard.matches(RiskTier::Low, &FeatureVector::new()));
    }
}
