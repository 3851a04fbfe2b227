//! Deterministic local classification rules
//!
//! Each rule group inspects the trimmed review text and either stays silent or
//! names the signals that fired. Groups are independent: a review may match
//! several and receive several categories in one pass. A group's confidence
//! is a fixed constant, not a measure of signal strength.
//!
//! A review matching no group is left undecided for the remote classifier.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Category, Review};

pub const ADVERTISEMENT_CONFIDENCE: f64 = 0.90;
pub const SPAM_CONFIDENCE: f64 = 0.85;
pub const RANT_CONFIDENCE: f64 = 0.80;
pub const IRRELEVANT_CONFIDENCE: f64 = 0.85;
pub const USEFUL_CONFIDENCE: f64 = 0.80;

/// Reason given when no rule group matched
pub const NO_MATCH_REASON: &str = "No local classification rules matched - will use ML model";

const SHORT_GENERIC_MAX_LEN: usize = 15;
const TOO_SHORT_MAX_LEN: usize = 3;
const GIBBERISH_MAX_LEN: usize = 10;
const LACKS_DETAIL_MIN_LEN: usize = 50;
const DETAILED_MIN_LEN: usize = 100;

const PROMO_WORDS: &[&str] = &["promo", "discount", "% off", "deal"];
const CALL_TO_ACTION: &[&str] = &[
    "click here",
    "call now",
    "shop now",
    "visit our website",
    "get yours",
    "learn more",
];
const NEVER_VISITED: &[&str] = &["never been", "never went", "never visited"];
const HEARSAY: &[&str] = &["heard from", "people say", "my friend said"];

static URL: Lazy<Regex> = Lazy::new(|| compile(r"(?-u)\bwww\.\w+\.\w+|http|\.com\b"));
static PHONE: Lazy<Regex> = Lazy::new(|| compile(r"(?-u)\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b"));
static REPEATED_PUNCTUATION: Lazy<Regex> = Lazy::new(|| compile(r"[!?,.]{4,}"));
static UPPERCASE_RUN: Lazy<Regex> = Lazy::new(|| compile(r"[A-Z]{8,}"));
static SHORT_GENERIC: Lazy<Regex> = Lazy::new(|| compile(r"^(good|bad|great)!*$"));
static EXPERIENTIAL: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?-u)\b(i|we|my|our|ordered|bought|tried|service|staff|food|drink)\b")
});
static TEST_ONLY: Lazy<Regex> = Lazy::new(|| compile(r"^test(ing)?[.!]*$"));
static BARE_QUESTION: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(does anyone know|is this place open|when do you open)\?*$")
});
static NO_LETTERS: Lazy<Regex> = Lazy::new(|| compile(r"^[^a-z]*$"));
static SPECIFICS: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?-u)\b(ordered|tried|bought|service|manager|waiter|waitress|cashier)\b")
});
static RECOMMENDATION: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?-u)\b(recommend|highly recommend|would go back|will be back|loved the)\b")
});
static CONTRAST: Lazy<Regex> = Lazy::new(|| compile(r"(?-u)\b(but|however|although)\b"));
static SENTIMENT: Lazy<Regex> = Lazy::new(|| compile(r"(?-u)\b(good|great|bad|poor)\b"));

/// Patterns prefixed with `(?-u)` use ASCII `\b`, `\d`, `\w` and `\s`.
fn compile(pattern: &str) -> Regex {
    // Patterns are literals above
    Regex::new(pattern).expect("rule pattern must compile")
}

/// Outcome of running every rule group over one review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVerdict {
    pub is_classified: bool,
    /// Matched categories in rule-group order
    pub categories: Vec<Category>,
    /// Highest matched score, 0.0 when undecided
    pub confidence: f64,
    pub scores: BTreeMap<Category, f64>,
    pub reason: String,
}

/// Text views shared by all rule groups
struct Subject<'a> {
    /// Trimmed original text (case preserved)
    original: &'a str,
    /// Trimmed, lowercased text
    lower: String,
    /// Length in characters of `lower`
    len: usize,
}

impl<'a> Subject<'a> {
    fn new(text: &'a str) -> Self {
        let original = text.trim();
        let lower = original.to_lowercase();
        let len = lower.chars().count();
        Self {
            original,
            lower,
            len,
        }
    }

    fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.lower.contains(p))
    }
}

struct RuleGroup {
    category: Category,
    confidence: f64,
    triggers: fn(&Subject) -> Vec<&'static str>,
}

const RULE_GROUPS: [RuleGroup; 5] = [
    RuleGroup {
        category: Category::Advertisements,
        confidence: ADVERTISEMENT_CONFIDENCE,
        triggers: advertisement_triggers,
    },
    RuleGroup {
        category: Category::Spam,
        confidence: SPAM_CONFIDENCE,
        triggers: spam_triggers,
    },
    RuleGroup {
        category: Category::RantWithoutVisit,
        confidence: RANT_CONFIDENCE,
        triggers: rant_triggers,
    },
    RuleGroup {
        category: Category::IrrelevantContent,
        confidence: IRRELEVANT_CONFIDENCE,
        triggers: irrelevant_triggers,
    },
    RuleGroup {
        category: Category::Useful,
        confidence: USEFUL_CONFIDENCE,
        triggers: useful_triggers,
    },
];

fn advertisement_triggers(s: &Subject) -> Vec<&'static str> {
    let mut triggers = Vec::new();
    if URL.is_match(&s.lower) {
        triggers.push("URLs detected");
    }
    if PHONE.is_match(&s.lower) {
        triggers.push("phone numbers detected");
    }
    if s.contains_any(PROMO_WORDS) && s.contains_any(CALL_TO_ACTION) {
        triggers.push("promotional language + call-to-action");
    }
    triggers
}

fn spam_triggers(s: &Subject) -> Vec<&'static str> {
    let mut triggers = Vec::new();
    // Uppercase runs can only be seen before lowercasing
    if REPEATED_PUNCTUATION.is_match(&s.lower) && UPPERCASE_RUN.is_match(s.original) {
        triggers.push("excessive punctuation + caps");
    }
    if s.len < SHORT_GENERIC_MAX_LEN && SHORT_GENERIC.is_match(&s.lower) {
        triggers.push("very short generic text");
    }
    triggers
}

fn rant_triggers(s: &Subject) -> Vec<&'static str> {
    let mut triggers = Vec::new();
    if s.contains_any(NEVER_VISITED) {
        triggers.push("never visited phrases");
    }
    if s.contains_any(HEARSAY) {
        triggers.push("hearsay language");
    }
    if s.len > LACKS_DETAIL_MIN_LEN && !EXPERIENTIAL.is_match(&s.lower) {
        triggers.push("lacks personal details");
    }
    triggers
}

fn irrelevant_triggers(s: &Subject) -> Vec<&'static str> {
    let mut triggers = Vec::new();
    if s.len < TOO_SHORT_MAX_LEN {
        triggers.push("too short");
    }
    if TEST_ONLY.is_match(&s.lower) {
        triggers.push("test content");
    }
    if BARE_QUESTION.is_match(&s.lower) {
        triggers.push("standalone question");
    }
    if s.len < GIBBERISH_MAX_LEN && NO_LETTERS.is_match(&s.lower) {
        triggers.push("gibberish/symbols only");
    }
    triggers
}

fn useful_triggers(s: &Subject) -> Vec<&'static str> {
    if s.len <= DETAILED_MIN_LEN {
        return Vec::new();
    }

    let mut specifics: Vec<&str> = SPECIFICS.find_iter(&s.lower).map(|m| m.as_str()).collect();
    specifics.sort_unstable();
    specifics.dedup();

    let has_specifics = specifics.len() >= 2;
    let has_recommendation = RECOMMENDATION.is_match(&s.lower);
    let has_contrast = CONTRAST.is_match(&s.lower) && SENTIMENT.is_match(&s.lower);

    if !(has_specifics || has_recommendation || has_contrast) {
        return Vec::new();
    }

    let mut triggers = vec!["detailed review"];
    if has_specifics {
        triggers.push("specific details");
    }
    if has_recommendation {
        triggers.push("recommendation language");
    }
    if has_contrast {
        triggers.push("balanced opinion");
    }
    triggers
}

/// Classify review text with the local rules
///
/// Total over all strings and free of side effects beyond debug logging.
pub fn classify_text(text: &str) -> RuleVerdict {
    let subject = Subject::new(text);

    let mut categories = Vec::new();
    let mut scores = BTreeMap::new();
    let mut descriptions = Vec::new();

    for group in &RULE_GROUPS {
        let triggers = (group.triggers)(&subject);
        if triggers.is_empty() {
            continue;
        }
        tracing::debug!(
            category = %group.category,
            triggers = ?triggers,
            "Local rule matched"
        );
        categories.push(group.category);
        scores.insert(group.category, group.confidence);
        descriptions.push(format!("{}: {}", group.category, triggers.join(", ")));
    }

    if categories.is_empty() {
        return RuleVerdict {
            is_classified: false,
            categories,
            confidence: 0.0,
            scores,
            reason: NO_MATCH_REASON.to_string(),
        };
    }

    RuleVerdict {
        is_classified: true,
        confidence: scores.values().copied().fold(0.0, f64::max),
        categories,
        scores,
        reason: descriptions.join(" | "),
    }
}

/// Classify a review with the local rules
///
/// Only the text is inspected; rating and author do not influence the rules.
pub fn classify(review: &Review) -> RuleVerdict {
    classify_text(&review.text)
}
