use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::review::signals::is_free_provider;
use crate::review::{AccountSummary, DecisionContext};

/// Fixed feature schema shared by training and prediction.
pub const FEATURE_NAMES: [&str; 9] = [
    "ml_score",
    "has_urls",
    "url_count",
    "clock_diff_minutes",
    "offset_diff_minutes",
    "risk_score_before_learning",
    "positive_signals",
    "uncertainty_signals",
    "email_domain_free_provider",
];

/// Name-to-value mapping over [`FEATURE_NAMES`]. Missing inputs are 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        _ => 0.0,
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl FeatureVector {
    /// Build from the raw account payload and decision context stored with
    /// feedback. Both sides are read leniently.
    pub fn from_raw(account: &Value, context: &Value) -> Self {
        let url_count = account
            .get("item_urls")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        let email = account.get("email").and_then(Value::as_str).unwrap_or_default();
        let email_domain = email
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().to_lowercase())
            .unwrap_or_default();

        let mut values = BTreeMap::new();
        values.insert("ml_score".to_string(), number(account.get("ml_score")));
        values.insert("has_urls".to_string(), flag(url_count > 0));
        values.insert("url_count".to_string(), url_count as f64);
        values.insert(
            "clock_diff_minutes".to_string(),
            number(context.get("clock_diff_minutes")),
        );
        values.insert(
            "offset_diff_minutes".to_string(),
            number(context.get("offset_diff_minutes")),
        );
        values.insert(
            "risk_score_before_learning".to_string(),
            number(context.get("risk_score")),
        );
        values.insert(
            "positive_signals".to_string(),
            number(context.get("positive_signals")),
        );
        values.insert(
            "uncertainty_signals".to_string(),
            number(context.get("uncertainty_signals")),
        );
        values.insert(
            "email_domain_free_provider".to_string(),
            flag(is_free_provider(&email_domain)),
        );
        Self(values)
    }

    pub fn from_account(account: &AccountSummary, context: &DecisionContext) -> Self {
        let account = serde_json::to_value(account).unwrap_or(Value::Null);
        let context = serde_json::to_value(context).unwrap_or(Value::Null);
        Self::from_raw(&account, &context)
    }

    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
