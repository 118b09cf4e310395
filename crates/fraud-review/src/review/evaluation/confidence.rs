use super::super::domain::ConfidenceLevel;

const BASELINE: f64 = 55.0;
const PER_POSITIVE: f64 = 6.0;
const PER_RISK: f64 = 0.45;
const PER_UNCERTAINTY: f64 = 12.0;
const MISSING_URL_PENALTY: f64 = 10.0;
const FLOOR: f64 = 10.0;
const CEILING: f64 = 95.0;

/// Confidence reported for auto-gated decisions, which skip manual scoring.
pub const AUTO_GATE_CONFIDENCE: u8 = 90;

/// Calibration heuristic, not a probability. Monotone in every input.
pub fn confidence_score(positive: i32, risk: i32, uncertainty: i32, has_urls: bool) -> u8 {
    let missing_url = if has_urls { 0.0 } else { MISSING_URL_PENALTY };
    let raw = BASELINE + PER_POSITIVE * f64::from(positive)
        - PER_RISK * f64::from(risk)
        - PER_UNCERTAINTY * f64::from(uncertainty)
        - missing_url;
    raw.clamp(FLOOR, CEILING).floor() as u8
}

pub fn confidence_level(score: u8) -> ConfidenceLevel {
    match score {
        75.. => ConfidenceLevel::High,
        50..=74 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    }
}
