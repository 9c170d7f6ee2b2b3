// src/relevance.rs
//! Relevance gate: tiered keyword lists, title/body zones and ordered
//! decision tables for local and international sources.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arabic::normalize_arabic;
use crate::ingest::types::{ArticleCandidate, SourceCategory};

/// Context keyword found in the title.
pub const CONTEXT_TITLE_WEIGHT: u32 = 3;
/// Context keyword found only in the body.
pub const CONTEXT_BODY_WEIGHT: u32 = 1;
/// Minimum context score for an international article without tier-A hits.
pub const CONTEXT_SCORE_THRESHOLD: u32 = 4;

/* ----------------------------
Keyword configuration
---------------------------- */

/// The four keyword lists. Immutable once handed to a [`RelevanceClassifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTierSet {
    #[serde(default)]
    pub tier_a_definitive: Vec<String>,
    #[serde(default)]
    pub tier_a_strong: Vec<String>,
    #[serde(default)]
    pub tier_b_context: Vec<String>,
    #[serde(default)]
    pub exclusion_keywords: Vec<String>,
}

impl KeywordTierSet {
    /// Trim entries, drop empties and repeated entries (first occurrence kept).
    pub fn cleaned(self) -> Self {
        Self {
            tier_a_definitive: clean_list(self.tier_a_definitive),
            tier_a_strong: clean_list(self.tier_a_strong),
            tier_b_context: clean_list(self.tier_b_context),
            exclusion_keywords: clean_list(self.exclusion_keywords),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tier_a_definitive.is_empty()
            && self.tier_a_strong.is_empty()
            && self.tier_b_context.is_empty()
            && self.exclusion_keywords.is_empty()
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

/* ----------------------------
Zones and matching
---------------------------- */

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("non-word regex"));

/// Drop every character that is neither a word character nor whitespace, then
/// lowercase.
pub fn normalize_punctuation_and_case(text: &str) -> String {
    RE_NON_WORD.replace_all(text, "").to_lowercase()
}

/// A text region (title, body, or both) in matchable form.
#[derive(Debug, Clone)]
pub struct Zone {
    plain: String,
    folded: String,
}

impl Zone {
    fn from_clean(plain: String) -> Self {
        let folded = normalize_arabic(&plain);
        Self { plain, folded }
    }

    pub fn new(text: &str) -> Self {
        Self::from_clean(normalize_punctuation_and_case(text))
    }

    pub fn as_str(&self) -> &str {
        &self.plain
    }
}

/// A keyword in both its lowercased and Arabic-normalized forms.
#[derive(Debug, Clone)]
struct Keyword {
    raw: String,
    folded: String,
}

impl Keyword {
    fn new(s: &str) -> Option<Self> {
        let raw = s.trim().to_lowercase();
        if raw.is_empty() {
            return None;
        }
        let folded = normalize_arabic(&raw);
        Some(Self { raw, folded })
    }

    /// Either form may match; orthographic variants in the zone are folded too.
    fn found_in(&self, zone: &Zone) -> bool {
        zone.plain.contains(&self.raw)
            || zone.plain.contains(&self.folded)
            || zone.folded.contains(&self.folded)
    }
}

fn compile(list: &[String]) -> Vec<Keyword> {
    list.iter().filter_map(|s| Keyword::new(s)).collect()
}

fn any_in<'a>(mut kws: impl Iterator<Item = &'a Keyword>, zone: &Zone) -> bool {
    kws.any(|k| k.found_in(zone))
}

/* ----------------------------
Decision tables
---------------------------- */

/// Everything the rules look at, computed once per article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    /// Local: any definitive or strong keyword in title+body.
    pub tier_a_in_text: bool,
    /// Local: any context keyword in title+body.
    pub context_in_text: bool,
    pub definitive_in_title: bool,
    pub definitive_in_body: bool,
    pub exclusion_in_title: bool,
    /// International: +3 per context keyword in the title, else +1 if in body.
    pub context_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// rule id → predicate → verdict. Tables are scanned top to bottom and the
/// first matching rule decides.
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub when: fn(&Evidence) -> bool,
    pub verdict: Verdict,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("verdict", &self.verdict)
            .finish()
    }
}

/// Id reported when no rule in the table fires.
pub const NO_MATCH_RULE: &str = "no_match";

fn tier_a_in_text(e: &Evidence) -> bool {
    e.tier_a_in_text
}
fn context_in_text(e: &Evidence) -> bool {
    e.context_in_text
}
fn definitive_in_title(e: &Evidence) -> bool {
    e.definitive_in_title
}
fn definitive_in_body_unexcluded(e: &Evidence) -> bool {
    e.definitive_in_body && !e.exclusion_in_title
}
fn exclusion_in_title(e: &Evidence) -> bool {
    e.exclusion_in_title
}
fn context_score_reached(e: &Evidence) -> bool {
    e.context_score >= CONTEXT_SCORE_THRESHOLD
}

/// Permissive: any tier-A hit, else any context hit.
pub const LOCAL_RULES: &[Rule] = &[
    Rule {
        id: "tier_a_in_text",
        when: tier_a_in_text,
        verdict: Verdict::Accept,
    },
    Rule {
        id: "context_in_text",
        when: context_in_text,
        verdict: Verdict::Accept,
    },
];

/// Strict: a definitive title hit beats exclusions; exclusions veto
/// everything weaker; otherwise the weighted context score decides.
pub const INTERNATIONAL_RULES: &[Rule] = &[
    Rule {
        id: "definitive_in_title",
        when: definitive_in_title,
        verdict: Verdict::Accept,
    },
    Rule {
        id: "definitive_in_body",
        when: definitive_in_body_unexcluded,
        verdict: Verdict::Accept,
    },
    Rule {
        id: "exclusion_in_title",
        when: exclusion_in_title,
        verdict: Verdict::Reject,
    },
    Rule {
        id: "context_score",
        when: context_score_reached,
        verdict: Verdict::Accept,
    },
];

pub fn rules_for(category: SourceCategory) -> &'static [Rule] {
    match category {
        SourceCategory::Local => LOCAL_RULES,
        SourceCategory::International => INTERNATIONAL_RULES,
    }
}

/// Walk a table; `NO_MATCH_RULE` rejects.
pub fn apply_rules(rules: &[Rule], evidence: &Evidence) -> (Verdict, &'static str) {
    rules
        .iter()
        .find(|r| (r.when)(evidence))
        .map(|r| (r.verdict, r.id))
        .unwrap_or((Verdict::Reject, NO_MATCH_RULE))
}

/* ----------------------------
Classifier
---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDecision {
    pub accepted: bool,
    /// Id of the rule that decided, or [`NO_MATCH_RULE`].
    pub rule: &'static str,
    pub context_score: u32,
}

/// Pure and reentrant: owns only the compiled keyword lists.
#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    definitive: Vec<Keyword>,
    strong: Vec<Keyword>,
    context: Vec<Keyword>,
    exclusion: Vec<Keyword>,
}

impl RelevanceClassifier {
    pub fn new(tiers: &KeywordTierSet) -> Self {
        Self {
            definitive: compile(&tiers.tier_a_definitive),
            strong: compile(&tiers.tier_a_strong),
            context: compile(&tiers.tier_b_context),
            exclusion: compile(&tiers.exclusion_keywords),
        }
    }

    pub fn evidence(&self, article: &ArticleCandidate, category: SourceCategory) -> Evidence {
        let title = normalize_punctuation_and_case(&article.headline);
        let body = normalize_punctuation_and_case(&article.description);

        match category {
            SourceCategory::Local => {
                let full = Zone::from_clean(format!("{} {}", title, body));
                Evidence {
                    tier_a_in_text: any_in(self.definitive.iter().chain(&self.strong), &full),
                    context_in_text: any_in(self.context.iter(), &full),
                    ..Evidence::default()
                }
            }
            SourceCategory::International => {
                let title = Zone::from_clean(title);
                let body = Zone::from_clean(body);
                let context_score = self
                    .context
                    .iter()
                    .map(|k| {
                        if k.found_in(&title) {
                            CONTEXT_TITLE_WEIGHT
                        } else if k.found_in(&body) {
                            CONTEXT_BODY_WEIGHT
                        } else {
                            0
                        }
                    })
                    .sum();
                Evidence {
                    definitive_in_title: any_in(self.definitive.iter(), &title),
                    definitive_in_body: any_in(self.definitive.iter(), &body),
                    exclusion_in_title: any_in(self.exclusion.iter(), &title),
                    context_score,
                    ..Evidence::default()
                }
            }
        }
    }

    pub fn decide(&self, article: &ArticleCandidate, category: SourceCategory) -> ClassificationDecision {
        let evidence = self.evidence(article, category);
        let (verdict, rule) = apply_rules(rules_for(category), &evidence);
        let decision = ClassificationDecision {
            accepted: verdict == Verdict::Accept,
            rule,
            context_score: evidence.context_score,
        };
        debug!(
            target: "relevance",
            id = %anon_hash(&article.headline),
            %category,
            rule,
            score = evidence.context_score,
            accepted = decision.accepted,
            "classified"
        );
        decision
    }

    /// `true` if the article is on-topic for a source of this category.
    pub fn classify(&self, article: &ArticleCandidate, category: SourceCategory) -> bool {
        self.decide(article, category).accepted
    }
}

/// Short stable id for log lines; headlines themselves are not logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/* ----------------------------
Tests
---------------------------- */
