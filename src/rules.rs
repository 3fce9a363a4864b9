//! Threshold rule configuration for the recommendation engine.
//!
//! A [`RuleSet`] is built once at startup, either from the built-in defaults
//! or from a JSON file named by `RULES_PATH`, and validated before the server
//! starts. It is never mutated afterwards.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RuleSetError;
use crate::models::metrics;

// ---

/// One tier of the primary classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    // ---
    /// Inclusive upper bound. `None` marks the open-ended final tier.
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub label: String,
    pub color: String,
    pub text_color: String,
    pub advice: String,
}

/// A secondary threshold check. Fires when `value >= min` or `value <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryRule {
    // ---
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub advice: String,
}

/// The secondary rules for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRules {
    pub metric: String,
    pub rules: Vec<SecondaryRule>,
}

/// Complete engine configuration.
///
/// `secondary` is a list rather than a map so the declared metric order is
/// preserved; it determines the order of the advice produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    // ---
    pub primary_metric: String,
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub secondary: Vec<MetricRules>,
}

impl SecondaryRule {
    // ---
    pub fn min(threshold: f64, advice: &str) -> Self {
        SecondaryRule {
            min: Some(threshold),
            max: None,
            advice: advice.to_string(),
        }
    }

    pub fn max(threshold: f64, advice: &str) -> Self {
        SecondaryRule {
            min: None,
            max: Some(threshold),
            advice: advice.to_string(),
        }
    }

    /// Whether this rule fires for `value`.
    pub fn matches(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value >= min) || self.max.is_some_and(|max| value <= max)
    }
}

impl Tier {
    fn new(upper_bound: Option<f64>, label: &str, color: &str, text_color: &str, advice: &str) -> Self {
        Tier {
            upper_bound,
            label: label.to_string(),
            color: color.to_string(),
            text_color: text_color.to_string(),
            advice: advice.to_string(),
        }
    }
}

impl Default for RuleSet {
    /// PM2.5 classification after the US EPA breakpoints, plus the indoor
    /// comfort rules used by the SmartSense dashboard.
    fn default() -> Self {
        // ---
        let tiers = vec![
            Tier::new(
                Some(12.0),
                "Good",
                "#00e400",
                "white",
                "Air conditions are good. No action required.",
            ),
            Tier::new(
                Some(35.4),
                "Moderate",
                "#ffff00",
                "black",
                "Air quality is acceptable. Consider opening windows for ventilation.",
            ),
            Tier::new(
                Some(55.4),
                "Unhealthy for Sensitive Groups",
                "#ff7e00",
                "white",
                "Ventilate the room to improve air quality. Sensitive individuals should limit prolonged outdoor exertion.",
            ),
            Tier::new(
                None,
                "Hazardous",
                "#8f3f97",
                "white",
                "Avoid staying long, air seriously polluted! Keep windows closed and run an air purifier if available.",
            ),
        ];

        let secondary = vec![
            MetricRules {
                metric: metrics::TEMPERATURE.to_string(),
                rules: vec![
                    SecondaryRule::min(25.0, "Open windows or reduce heating to cool the room."),
                    SecondaryRule::max(18.0, "Increase heating to maintain comfort."),
                ],
            },
            MetricRules {
                metric: metrics::HUMIDITY.to_string(),
                rules: vec![
                    SecondaryRule::min(60.0, "Use a dehumidifier or ventilate to reduce moisture."),
                    SecondaryRule::max(30.0, "Consider using a humidifier."),
                ],
            },
            MetricRules {
                metric: metrics::CO2.to_string(),
                rules: vec![
                    SecondaryRule::min(
                        1400.0,
                        "CO2 is very high. Immediate and prolonged ventilation is highly recommended.",
                    ),
                    SecondaryRule::min(
                        1000.0,
                        "CO2 is high. Ventilate the room (open windows) to improve air quality.",
                    ),
                ],
            },
            MetricRules {
                metric: metrics::VOC_INDEX.to_string(),
                rules: vec![
                    SecondaryRule::min(
                        5.0,
                        "Critical VOC Index detected! Seek immediate ventilation to disperse potential chemical pollutants.",
                    ),
                    SecondaryRule::min(
                        2.0,
                        "High VOC Index detected. Ensure good ventilation to disperse volatile organic compounds.",
                    ),
                ],
            },
        ];

        RuleSet {
            primary_metric: metrics::PM2_5.to_string(),
            tiers,
            secondary,
        }
    }
}

impl RuleSet {
    // ---
    /// Check the configuration invariants the engine relies on.
    ///
    /// Tiers must have finite, strictly ascending bounds; only the last tier
    /// may omit its bound. Every secondary rule needs a comparator.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        // ---
        if self.primary_metric.trim().is_empty() {
            return Err(RuleSetError::EmptyPrimaryMetric);
        }
        if self.tiers.is_empty() {
            return Err(RuleSetError::NoTiers);
        }

        let last = self.tiers.len() - 1;
        let mut previous = f64::NEG_INFINITY;
        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.advice.trim().is_empty() {
                return Err(RuleSetError::EmptyAdvice(format!("tier '{}'", tier.label)));
            }
            match tier.upper_bound {
                None if index != last => return Err(RuleSetError::OpenTierNotLast(index)),
                None => {}
                Some(bound) if !bound.is_finite() || bound <= previous => {
                    return Err(RuleSetError::unordered(index, &tier.label));
                }
                Some(bound) => previous = bound,
            }
        }

        for group in &self.secondary {
            for (index, rule) in group.rules.iter().enumerate() {
                if rule.min.is_none() && rule.max.is_none() {
                    return Err(RuleSetError::RuleWithoutComparator {
                        metric: group.metric.clone(),
                        index,
                    });
                }
                if rule.advice.trim().is_empty() {
                    return Err(RuleSetError::EmptyAdvice(format!(
                        "rule {} for '{}'",
                        index, group.metric
                    )));
                }
            }
        }

        Ok(())
    }

    /// Load and validate a rule set from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        // ---
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule set '{}'", path.display()))?;
        let rules: RuleSet = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse rule set '{}'", path.display()))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Use the file at `path` when given, otherwise the validated defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // ---
        match path {
            Some(path) => {
                tracing::info!("Loading rule set from {}", path.display());
                Self::from_file(path)
            }
            None => {
                tracing::info!("Using built-in rule set");
                let rules = RuleSet::default();
                rules.validate()?;
                Ok(rules)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        // ---
        let rules = RuleSet::default();
        assert_eq!(rules.validate(), Ok(()));
        assert_eq!(rules.primary_metric, "pm2_5");
        assert_eq!(rules.tiers.len(), 4);
        assert_eq!(rules.tiers[3].upper_bound, None);

        let order: Vec<&str> = rules.secondary.iter().map(|m| m.metric.as_str()).collect();
        assert_eq!(order, ["temperature", "humidity", "co2", "voc_index"]);
    }

    #[test]
    fn test_rule_matching() {
        // ---
        let hot = SecondaryRule::min(25.0, "hot");
        assert!(hot.matches(25.0));
        assert!(hot.matches(31.0));
        assert!(!hot.matches(24.9));

        let cold = SecondaryRule::max(18.0, "cold");
        assert!(cold.matches(18.0));
        assert!(cold.matches(-5.0));
        assert!(!cold.matches(18.1));
    }

    #[test]
    fn test_rejects_empty_tiers() {
        // ---
        let rules = RuleSet {
            tiers: Vec::new(),
            ..RuleSet::default()
        };
        assert_eq!(rules.validate(), Err(RuleSetError::NoTiers));
    }

    #[test]
    fn test_rejects_unordered_tiers() {
        // ---
        let mut rules = RuleSet::default();
        rules.tiers[1].upper_bound = Some(10.0);
        assert_eq!(
            rules.validate(),
            Err(RuleSetError::unordered(1, "Moderate"))
        );

        let mut rules = RuleSet::default();
        rules.tiers[0].upper_bound = Some(f64::NAN);
        assert_eq!(rules.validate(), Err(RuleSetError::unordered(0, "Good")));
    }

    #[test]
    fn test_rejects_open_tier_before_last() {
        // ---
        let mut rules = RuleSet::default();
        rules.tiers[1].upper_bound = None;
        assert_eq!(rules.validate(), Err(RuleSetError::OpenTierNotLast(1)));
    }

    #[test]
    fn test_finite_last_tier_is_allowed() {
        // ---
        let mut rules = RuleSet::default();
        rules.tiers[3].upper_bound = Some(500.0);
        assert_eq!(rules.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_rule_without_comparator() {
        // ---
        let mut rules = RuleSet::default();
        rules.secondary[2].rules.push(SecondaryRule {
            min: None,
            max: None,
            advice: "never".to_string(),
        });
        assert_eq!(
            rules.validate(),
            Err(RuleSetError::RuleWithoutComparator {
                metric: "co2".to_string(),
                index: 2,
            })
        );
    }

    #[test]
    fn test_parse_json_rule_set() {
        // ---
        let text = r##"{
            "primary_metric": "pm10",
            "tiers": [
                { "upper_bound": 54.0, "label": "Good", "color": "#00e400", "text_color": "white", "advice": "Fine." },
                { "upper_bound": null, "label": "Bad", "color": "#ff0000", "text_color": "white", "advice": "Stay inside." }
            ],
            "secondary": [
                { "metric": "co2", "rules": [ { "min": 1200, "advice": "Ventilate." } ] }
            ]
        }"##;

        let rules: RuleSet = serde_json::from_str(text).unwrap();
        assert_eq!(rules.validate(), Ok(()));
        assert_eq!(rules.primary_metric, "pm10");
        assert_eq!(rules.tiers[1].upper_bound, None);
        assert_eq!(rules.secondary[0].rules[0], SecondaryRule::min(1200.0, "Ventilate."));
    }

    #[test]
    fn test_load_missing_file_fails() {
        // ---
        let err = RuleSet::load(Some(Path::new("/nonexistent/rules.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read rule set"));
    }
}
