use super::super::collectors::{CheckOutcome, SignalFinding};
use super::super::domain::{ScoreComponent, SignalGroup};
use super::super::signals::AccountSignals;
use crate::policy::PolicyConfig;

/// Partial result of one evaluator. The engine sums these in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Contribution {
    pub components: Vec<ScoreComponent>,
    pub tags: Vec<String>,
}

impl Contribution {
    fn push(&mut self, group: SignalGroup, risk: i32, positive: i32, uncertainty: i32, note: String) {
        self.components.push(ScoreComponent {
            group,
            risk,
            positive,
            uncertainty,
            note,
        });
    }

    fn risk(&mut self, group: SignalGroup, points: i32, note: impl Into<String>) {
        self.push(group, points, 0, 0, note.into());
    }

    fn positive(&mut self, group: SignalGroup, signals: i32, note: impl Into<String>) {
        self.push(group, 0, signals, 0, note.into());
    }

    fn uncertain(&mut self, group: SignalGroup, units: i32, note: impl Into<String>) {
        self.push(group, 0, 0, units, note.into());
    }

    fn note(&mut self, group: SignalGroup, note: impl Into<String>) {
        self.push(group, 0, 0, 0, note.into());
    }

    pub fn risk_total(&self) -> i32 {
        self.components.iter().map(|component| component.risk).sum()
    }

    pub fn positive_total(&self) -> i32 {
        self.components.iter().map(|component| component.positive).sum()
    }

    pub fn uncertainty_total(&self) -> i32 {
        self.components.iter().map(|component| component.uncertainty).sum()
    }
}

/// Counts over the sampled URL findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ContentFacts {
    pub inspected: bool,
    pub parked_hits: usize,
    pub safe_page_hits: usize,
    pub bait_hits: usize,
    pub uncertain_findings: usize,
}

impl ContentFacts {
    pub fn from_findings(findings: Option<&[SignalFinding]>) -> Self {
        let Some(findings) = findings else {
            return Self::default();
        };
        Self {
            inspected: true,
            parked_hits: findings.iter().filter(|finding| finding.parked).count(),
            safe_page_hits: findings.iter().filter(|finding| finding.safe_page_template).count(),
            bait_hits: findings.iter().filter(|finding| finding.bait_switch).count(),
            uncertain_findings: findings.iter().filter(|finding| finding.is_uncertain()).count(),
        }
    }

    pub fn cloaking(&self) -> bool {
        self.parked_hits > 0 || self.safe_page_hits > 0 || self.bait_hits > 0
    }
}

pub(crate) fn evaluate_clock(signals: &AccountSignals, policy: &PolicyConfig) -> Contribution {
    let group = SignalGroup::Clock;
    let mut contribution = Contribution::default();

    if signals.clock_diff_minutes > policy.clock_mismatch_minutes_threshold {
        contribution.risk(
            group,
            30,
            format!(
                "Local and network clocks differ by {} minutes (threshold {}).",
                signals.clock_diff_minutes, policy.clock_mismatch_minutes_threshold
            ),
        );
    }

    if signals.chaotic_timezone() {
        contribution.risk(group, 35, "Chaotic timezone delta suggests anti-detect manipulation.");
    } else if signals.outsourced_exemption {
        contribution.positive(
            group,
            2,
            "Timezone mismatch fits outsourced agency pattern (allowed false-positive exemption).",
        );
    } else {
        contribution.positive(group, 1, "Timezone offset relationship appears natural.");
    }
    contribution
}

pub(crate) fn evaluate_email(signals: &AccountSignals) -> Contribution {
    let group = SignalGroup::Email;
    let mut contribution = Contribution::default();

    if signals.encrypted_provider {
        contribution.risk(group, 20, "Encrypted/burner-style mail provider raises account trust risk.");
    }
    if signals.gibberish_domain {
        contribution.risk(group, 20, "Email domain looks synthetic/gibberish.");
    }

    if signals.email_history_missing {
        if signals.enterprise_domain {
            contribution.positive(
                group,
                1,
                "Email API flag ignored due to plausible enterprise domain/firewall behavior.",
            );
        } else {
            contribution.risk(group, 20, "Zero-history/invalid email with non-enterprise domain.");
        }
    } else {
        contribution.positive(group, 1, "Email reputation carries no zero-history or invalid flag.");
    }
    contribution
}

pub(crate) fn evaluate_identity(signals: &AccountSignals) -> Contribution {
    let group = SignalGroup::IdentityPayment;
    let mut contribution = Contribution::default();

    if signals.last_name_match || signals.card_company_match {
        contribution.positive(
            group,
            2,
            "Card ownership is logically connected (family/corporate pattern).",
        );
    } else {
        contribution.risk(group, 20, "Card owner not logically connected to applicant identity/company.");
    }

    match (signals.shell_hit, signals.foreign_card) {
        (true, true) => contribution.risk(group, 35, "Known shell address with foreign card profile."),
        (true, false) => contribution.risk(group, 20, "Known shell address detected."),
        (false, _) => contribution.positive(group, 1, "Address does not match a known shell-company address."),
    }
    contribution
}

pub(crate) fn evaluate_content(
    facts: &ContentFacts,
    findings: &[SignalFinding],
    has_urls: bool,
) -> Contribution {
    let group = SignalGroup::Content;
    let mut contribution = Contribution::default();

    if !facts.inspected {
        contribution.note(group, "URL content inspection was not performed.");
        return contribution;
    }
    if !has_urls {
        contribution.note(group, "No item URLs supplied for content verification.");
        return contribution;
    }

    if facts.parked_hits > 0 {
        contribution.risk(group, 25, "One or more item URLs appear parked/for-sale.");
    }
    if facts.safe_page_hits > 0 {
        contribution.risk(group, 20, "Generic safe-page pattern detected in landing content.");
    }
    if facts.bait_hits > 0 {
        contribution.risk(group, 25, "Domain bait-and-switch/redirect mismatch detected.");
    }
    if !facts.cloaking() {
        contribution.positive(group, 1, "No cloaking or parked-domain indicators in sampled URLs.");
    }

    for finding in findings.iter().filter(|finding| finding.is_uncertain()) {
        let mut caveats = finding.caveats().join(", ");
        if let Some(error) = &finding.error {
            caveats = format!("{caveats} ({error})");
        }
        contribution.uncertain(
            group,
            1,
            format!("URL {} could not be fully verified: {caveats}.", finding.url),
        );
    }
    contribution
}

/// Sum collaborator deltas and union their tags; scoring rules stay with the collaborator.
pub(crate) fn evaluate_external(outcomes: &[CheckOutcome]) -> Contribution {
    let group = SignalGroup::External;
    let mut contribution = Contribution::default();

    for outcome in outcomes {
        let mut notes = outcome.notes.iter();
        let first = notes
            .next()
            .cloned()
            .unwrap_or_else(|| format!("{} check returned no notes.", outcome.name));
        contribution.push(group, outcome.risk_delta, 0, outcome.uncertainty_delta, first);
        for note in notes {
            contribution.note(group, note.clone());
        }
        contribution.tags.extend(outcome.tags.iter().cloned());
    }
    contribution
}
