//! Rule-based recommendation engine.
//!
//! Maps one [`Reading`] and a [`RuleSet`] to a headline classification and an
//! ordered, deduplicated list of advice strings. Evaluation is a pure
//! function: nothing is cached between calls and the inputs are never
//! modified.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{EngineError, RuleSetError};
use crate::models::Reading;
use crate::rules::{RuleSet, SecondaryRule, Tier};

// ---

/// Headline air-quality level for the primary metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub label: String,
    pub color: String,
    pub text_color: String,
}

/// Result of evaluating a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub classification: Classification,
    /// Advice of the selected tier, also the first entry of `recommendations`.
    pub advice: String,
    pub recommendations: Vec<String>,
}

/// Pure evaluator holding the rule configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    rules: RuleSet,
}

impl Engine {
    // ---
    /// Validate `rules` and build the engine.
    ///
    /// An invalid table is a deployment error, so it is rejected here rather
    /// than surfacing later as a per-reading failure.
    pub fn new(rules: RuleSet) -> Result<Self, RuleSetError> {
        rules.validate()?;
        Ok(Engine { rules })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate `reading` against the configured rules.
    ///
    /// Fails only when the reading has no value for the primary metric.
    /// Secondary metrics missing from the reading are skipped.
    pub fn evaluate(&self, reading: &Reading) -> Result<Recommendation, EngineError> {
        evaluate(reading, &self.rules)
    }
}

/// `rules` must have passed [`RuleSet::validate`].
fn evaluate(reading: &Reading, rules: &RuleSet) -> Result<Recommendation, EngineError> {
    // ---
    let primary = reading
        .value(&rules.primary_metric)
        .ok_or_else(|| EngineError::MissingPrimaryMetric(rules.primary_metric.clone()))?;

    let Some(tier) = classify(primary, &rules.tiers) else {
        unreachable!("validated rule sets always have at least one tier");
    };

    let mut advice = AdviceList::default();
    advice.push(&tier.advice);

    for group in &rules.secondary {
        let Some(value) = reading.value(&group.metric) else {
            continue;
        };

        for rule in by_severity(&group.rules) {
            if rule.matches(value) {
                tracing::trace!(
                    "Rule fired for {}={} on device {}",
                    group.metric,
                    value,
                    reading.device_id()
                );
                advice.push(&rule.advice);
            }
        }
    }

    Ok(Recommendation {
        classification: Classification {
            label: tier.label.clone(),
            color: tier.color.clone(),
            text_color: tier.text_color.clone(),
        },
        advice: tier.advice.clone(),
        recommendations: advice.into_vec(),
    })
}

/// Select the first tier whose upper bound is `>= value`.
///
/// The last tier is treated as unbounded, so this returns `None` only for an
/// empty table (rejected by [`RuleSet::validate`]).
pub fn classify(value: f64, tiers: &[Tier]) -> Option<&Tier> {
    // ---
    let last = tiers.len().checked_sub(1)?;
    tiers.iter().enumerate().find_map(|(index, tier)| {
        let bound = tier.upper_bound.unwrap_or(f64::INFINITY);
        (value <= bound || index == last).then_some(tier)
    })
}

/// Rules ordered by `min` descending; rules without `min` keep their relative
/// order and come last.
fn by_severity(rules: &[SecondaryRule]) -> Vec<&SecondaryRule> {
    // ---
    let mut sorted: Vec<&SecondaryRule> = rules.iter().collect();
    sorted.sort_by(|a, b| match (a.min, b.min) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

/// Insertion-ordered set of advice strings.
#[derive(Debug, Default)]
struct AdviceList(Vec<String>);

impl AdviceList {
    fn push(&mut self, advice: &str) {
        if !self.0.iter().any(|a| a == advice) {
            self.0.push(advice.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}
