use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::collectors::SignalFinding;

const DEFAULT_ML_SCORE: f64 = 50.0;

/// One observed network address for the reviewed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpObservation {
    pub ip: String,
    #[serde(default)]
    pub country: String,
}

/// Per-review input describing the applicant, the payment instrument, and the
/// network context the account was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_ml_score", deserialize_with = "lenient_score")]
    pub ml_score: f64,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub cc_owner: String,
    #[serde(default)]
    pub cc_country: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub local_time: String,
    #[serde(default)]
    pub network_time: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item_urls: Vec<String>,
    #[serde(default, deserialize_with = "lenient_ips")]
    pub ip_addresses: Vec<IpObservation>,
    #[serde(default)]
    pub email_first_seen: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub email_invalid_flag: bool,
    #[serde(default)]
    pub network_country: Option<String>,
}

fn default_ml_score() -> f64 {
    DEFAULT_ML_SCORE
}

impl AccountSummary {
    /// Parse a raw JSON payload into a normalized account.
    pub fn from_value(payload: Value) -> Result<Self, ReviewError> {
        let account: AccountSummary =
            serde_json::from_value(payload).map_err(|source| ReviewError::InvalidAccount {
                detail: source.to_string(),
            })?;
        Ok(account.normalized())
    }

    /// Trim free-text fields, lower-case the email, drop blank URLs, and give
    /// bare IP observations the network country.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.company_name,
            &mut self.cc_owner,
            &mut self.cc_country,
            &mut self.address,
            &mut self.local_time,
            &mut self.network_time,
        ] {
            *field = field.trim().to_string();
        }
        self.email = self.email.trim().to_lowercase();
        self.item_urls = self
            .item_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        self.network_country = self
            .network_country
            .map(|country| country.trim().to_string())
            .filter(|country| !country.is_empty());

        let fallback = self.network_country.clone().unwrap_or_default();
        self.ip_addresses = self
            .ip_addresses
            .into_iter()
            .filter_map(|observation| {
                let ip = observation.ip.trim().to_string();
                if ip.is_empty() {
                    return None;
                }
                let country = observation.country.trim();
                let country = if country.is_empty() {
                    fallback.clone()
                } else {
                    country.to_string()
                };
                Some(IpObservation { ip, country })
            })
            .collect();

        if self.network_country.is_none() {
            self.network_country = self
                .ip_addresses
                .iter()
                .map(|observation| observation.country.clone())
                .find(|country| !country.is_empty());
        }

        self
    }

    pub fn email_domain(&self) -> &str {
        match self.email.rsplit_once('@') {
            Some((_, domain)) => domain,
            None => "",
        }
    }

    pub fn has_urls(&self) -> bool {
        !self.item_urls.is_empty()
    }
}

fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let score = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(DEFAULT_ML_SCORE),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("ml_score is not a finite number"))?,
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(DEFAULT_ML_SCORE),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("ml_score '{raw}' is not numeric")))?,
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "ml_score must be a number, found {other}"
            )))
        }
    };
    checked_score(score).map_err(serde::de::Error::custom)
}

/// Both auto-gates compare against the score, so it must be a finite 0-100 value.
pub(crate) fn checked_score(score: f64) -> Result<f64, String> {
    if !score.is_finite() {
        return Err(format!("ml_score {score} is not a finite number"));
    }
    if !(0.0..=100.0).contains(&score) {
        return Err(format!("ml_score {score} is outside 0-100"));
    }
    Ok(score)
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(flag),
        Some(Value::Number(number)) => Ok(number.as_f64().unwrap_or(0.0) != 0.0),
        Some(Value::String(raw)) => Ok(matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y"
        )),
        Some(other) => Err(serde::de::Error::custom(format!(
            "email_invalid_flag must be a boolean, found {other}"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIp {
    Bare(String),
    Detailed {
        #[serde(default)]
        ip: String,
        #[serde(default)]
        country: Option<String>,
    },
}

fn lenient_ips<'de, D>(deserializer: D) -> Result<Vec<IpObservation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawIp>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|entry| match entry {
            RawIp::Bare(ip) => IpObservation {
                ip,
                country: String::new(),
            },
            RawIp::Detailed { ip, country } => IpObservation {
                ip,
                country: country.unwrap_or_default(),
            },
        })
        .collect())
}

/// Closed set of review outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Approve")]
    Approve,
    #[serde(rename = "Reject")]
    Reject,
    #[serde(rename = "Route to Human VIP Sales")]
    RouteToVipSales,
    #[serde(rename = "Conditional Approval - Hold for URL Verification")]
    ConditionalHold,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::Approve,
        Verdict::Reject,
        Verdict::RouteToVipSales,
        Verdict::ConditionalHold,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Approve => "Approve",
            Verdict::Reject => "Reject",
            Verdict::RouteToVipSales => "Route to Human VIP Sales",
            Verdict::ConditionalHold => "Conditional Approval - Hold for URL Verification",
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Verdict::Approve => "APPROVE",
            Verdict::Reject => "REJECT",
            Verdict::RouteToVipSales => "VIP_REVIEW",
            Verdict::ConditionalHold => "URL_HOLD",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        Verdict::ALL
            .into_iter()
            .find(|verdict| verdict.label().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownVerdict(value.to_string()))
    }
}

/// A verdict string outside the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported verdict label: {0:?}")]
pub struct UnknownVerdict(pub String);

/// Coarse bucket for the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

/// Which signal group produced a score component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGroup {
    AutoGate,
    Clock,
    Email,
    IdentityPayment,
    Content,
    External,
}

/// Discrete contribution to a decision, kept for audits and rationale text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub group: SignalGroup,
    pub risk: i32,
    pub positive: i32,
    pub uncertainty: i32,
    pub note: String,
}

/// Numeric context captured from a decision and reused as training features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionContext {
    pub clock_diff_minutes: f64,
    pub offset_diff_minutes: f64,
    pub risk_score: f64,
    pub positive_signals: f64,
    pub uncertainty_signals: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAnalysis {
    pub timezone_geo: String,
    pub identity_payment: String,
    pub domain_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub approve_case: String,
    pub reject_case: String,
    pub final_reason: String,
    pub confidence: String,
    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
}

/// Every intermediate value needed to reconstruct a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionDebug {
    pub auto_gate: bool,
    pub hard_reject: bool,
    pub risk_score: i32,
    pub positive_signals: i32,
    pub uncertainty_signals: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_diff_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_diff_minutes: Option<i64>,
    pub reasons: Vec<String>,
    pub components: Vec<ScoreComponent>,
    pub url_findings: Vec<SignalFinding>,
    pub collaborators: BTreeMap<String, Value>,
}

/// Output of the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub verdict: Verdict,
    pub analysis: DecisionAnalysis,
    pub false_positive: String,
    pub decision_summary: DecisionSummary,
    pub internal_note: String,
    pub tags: Vec<String>,
    pub debug: DecisionDebug,
}

impl DecisionResult {
    pub fn risk_score(&self) -> i32 {
        self.debug.risk_score
    }

    pub fn positive_signals(&self) -> i32 {
        self.debug.positive_signals
    }

    pub fn uncertainty_signals(&self) -> i32 {
        self.debug.uncertainty_signals
    }

    pub fn confidence_score(&self) -> u8 {
        self.decision_summary.confidence_score
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.decision_summary.confidence_level
    }

    pub fn reasons(&self) -> &[String] {
        &self.debug.reasons
    }

    /// Context recorded alongside reviewer feedback for training.
    pub fn context(&self) -> DecisionContext {
        DecisionContext {
            clock_diff_minutes: self.debug.clock_diff_minutes.unwrap_or(0) as f64,
            offset_diff_minutes: self.debug.offset_diff_minutes.unwrap_or(0) as f64,
            risk_score: self.debug.risk_score as f64,
            positive_signals: self.debug.positive_signals as f64,
            uncertainty_signals: self.debug.uncertainty_signals as f64,
        }
    }
}

/// Fatal input errors raised while reviewing a single account.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("field {field} has unparseable timestamp {value:?}; expected ISO-8601 with a UTC offset")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("account payload is invalid: {detail}")]
    InvalidAccount { detail: String },
}
