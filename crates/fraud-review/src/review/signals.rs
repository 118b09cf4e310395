//! Pure normalizers that turn raw account fields into atomic signals.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use regex::Regex;

use super::domain::{AccountSummary, ReviewError};

const MINUTES_PER_DAY: i64 = 1440;

/// Known registered-agent addresses that front shell companies.
pub const SHELL_ADDRESSES: [&str; 3] = [
    "1603 capitol ave, cheyenne, wy",
    "30 n gould st, sheridan, wy",
    "251 little falls dr, wilmington, de",
];

/// Network UTC offsets (minutes) of common outsourced-agency hubs.
pub const OUTSOURCED_NETWORK_OFFSETS_MINUTES: [i64; 3] = [330, 420, 480];

pub const FREE_EMAIL_PROVIDERS: [&str; 9] = [
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "pm.me",
    "tutanota.com",
];

pub const ENCRYPTED_EMAIL_PROVIDERS: [&str; 3] = ["protonmail.com", "pm.me", "tutanota.com"];

const WESTERN_ADDRESS_TERMS: [&str; 10] = [
    "usa",
    "united states",
    "uk",
    "united kingdom",
    "canada",
    "australia",
    "new zealand",
    "germany",
    "france",
    "netherlands",
];

/// Parse an ISO-8601 timestamp. A missing offset is read as UTC; anything
/// unparseable is a fatal input error naming the field.
pub fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<FixedOffset>, ReviewError> {
    let trimmed = value.trim();
    let invalid = || ReviewError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed);
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    Err(invalid())
}

pub fn offset_minutes(timestamp: &DateTime<FixedOffset>) -> i64 {
    i64::from(timestamp.offset().local_minus_utc()) / 60
}

/// Absolute difference between two wall-clock readings, wrapped at midnight.
pub fn wall_clock_diff_minutes(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> i64 {
    let minute_of_day = |ts: &DateTime<FixedOffset>| i64::from(ts.hour() * 60 + ts.minute());
    let raw = (minute_of_day(a) - minute_of_day(b)).abs() % MINUTES_PER_DAY;
    raw.min(MINUTES_PER_DAY - raw)
}

pub fn is_natural_offset_diff(diff_minutes: i64) -> bool {
    diff_minutes % 30 == 0
}

pub fn last_name(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .last()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Lower-case and collapse internal whitespace.
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_free_provider(domain: &str) -> bool {
    FREE_EMAIL_PROVIDERS.contains(&domain)
}

pub fn is_encrypted_provider(domain: &str) -> bool {
    ENCRYPTED_EMAIL_PROVIDERS.contains(&domain)
}

/// Root label of at least seven characters with at most one vowel and a digit.
pub fn is_gibberish_domain(domain: &str) -> bool {
    let root = domain.split('.').next().unwrap_or_default();
    if root.chars().count() < 7 {
        return false;
    }
    let vowels = root.chars().filter(|ch| "aeiou".contains(*ch)).count();
    vowels <= 1 && root.chars().any(|ch| ch.is_ascii_digit())
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("static token pattern compiles"))
}

/// Alphanumeric tokens longer than two characters.
pub fn company_tokens(company_name: &str) -> Vec<String> {
    let lowered = company_name.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .filter(|token| token.len() > 2)
        .collect()
}

/// A non-free domain that shares a token with the company, or any non-free
/// domain when the company name carries no usable tokens.
pub fn looks_enterprise_domain(email_domain: &str, company_name: &str) -> bool {
    if is_free_provider(email_domain) {
        return false;
    }
    let tokens = company_tokens(company_name);
    if tokens.is_empty() {
        return true;
    }
    tokens.iter().any(|token| email_domain.contains(token.as_str()))
}

pub fn has_western_address(address: &str) -> bool {
    let lowered = address.to_lowercase();
    WESTERN_ADDRESS_TERMS
        .iter()
        .any(|term| lowered.contains(term))
}

pub fn is_western_business_profile(company_name: &str, address: &str, email_domain: &str) -> bool {
    has_western_address(address) && looks_enterprise_domain(email_domain, company_name)
}

pub fn shell_address_hit(address: &str) -> bool {
    let normalized = normalize_text(address);
    SHELL_ADDRESSES
        .iter()
        .any(|shell| normalized.contains(shell))
}

/// The network country does not appear in the claimed card country.
pub fn is_foreign_card(network_country: Option<&str>, cc_country: &str) -> bool {
    match network_country {
        Some(country) if !cc_country.is_empty() => !cc_country
            .to_lowercase()
            .contains(&country.to_lowercase()),
        _ => false,
    }
}

/// Email history is missing when the provider reports the epoch as first-seen.
pub fn zero_email_history(first_seen: Option<&str>) -> bool {
    first_seen
        .map(|value| value.trim().starts_with("1970"))
        .unwrap_or(false)
}

/// Atomic signals derived from an account, independent of policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSignals {
    pub local_offset_minutes: i64,
    pub network_offset_minutes: i64,
    pub offset_diff_minutes: i64,
    pub clock_diff_minutes: i64,
    pub natural_offset: bool,
    pub outsourced_exemption: bool,
    pub email_domain: String,
    pub encrypted_provider: bool,
    pub gibberish_domain: bool,
    pub enterprise_domain: bool,
    pub email_history_missing: bool,
    pub last_name_match: bool,
    pub card_company_match: bool,
    pub shell_hit: bool,
    pub foreign_card: bool,
}

impl AccountSignals {
    pub fn derive(account: &AccountSummary) -> Result<Self, ReviewError> {
        let local = parse_timestamp("local_time", &account.local_time)?;
        let network = parse_timestamp("network_time", &account.network_time)?;

        let local_offset_minutes = offset_minutes(&local);
        let network_offset_minutes = offset_minutes(&network);
        let offset_diff_minutes = (local_offset_minutes - network_offset_minutes).abs();
        let clock_diff_minutes = wall_clock_diff_minutes(&local, &network);

        let email_domain = account.email_domain().to_string();
        let outsourced_exemption = OUTSOURCED_NETWORK_OFFSETS_MINUTES
            .contains(&network_offset_minutes)
            && is_western_business_profile(&account.company_name, &account.address, &email_domain);

        let applicant_last = last_name(&account.name);
        let last_name_match = !applicant_last.is_empty() && applicant_last == last_name(&account.cc_owner);
        let card_company_match = !account.cc_owner.is_empty()
            && normalize_text(&account.cc_owner) == normalize_text(&account.company_name);

        Ok(Self {
            local_offset_minutes,
            network_offset_minutes,
            offset_diff_minutes,
            clock_diff_minutes,
            natural_offset: is_natural_offset_diff(offset_diff_minutes),
            outsourced_exemption,
            encrypted_provider: is_encrypted_provider(&email_domain),
            gibberish_domain: is_gibberish_domain(&email_domain),
            enterprise_domain: looks_enterprise_domain(&email_domain, &account.company_name),
            email_history_missing: zero_email_history(account.email_first_seen.as_deref())
                || account.email_invalid_flag,
            email_domain,
            last_name_match,
            card_company_match,
            shell_hit: shell_address_hit(&account.address),
            foreign_card: is_foreign_card(account.network_country.as_deref(), &account.cc_country),
        })
    }

    /// Offset delta that is neither natural nor covered by the agency exemption.
    pub fn chaotic_timezone(&self) -> bool {
        !self.natural_offset && !self.outsourced_exemption
    }
}
