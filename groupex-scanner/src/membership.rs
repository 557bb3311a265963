//! Membership classification: does a candidate link belong to a group the user joined?
//!
//! The listing renders joined groups and suggested groups with the same markup.
//! Joined groups carry a "you last visited ... ago" line somewhere in their card,
//! so the default classifier looks for that phrase in the candidate's ancestors.

use crate::dom::{ancestor_elements, visible_text};
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

/// How many ancestors above a candidate are searched for the visit phrase.
pub const MEMBERSHIP_SEARCH_DEPTH: usize = 10;

const LAST_VISITED_PATTERNS: &[&str] = &[
    r"(?i)you\s+last\s+visited\s+(?:this\s+group\s+)?(?:\d+|an?)\s+(?:days?|weeks?|months?|years?)\s+ago",
    r"ביקרת\s+לאחרונה\s+לפני\s+(?:\d+\s+)?(?:ימים|יומיים|יום|שבועות|שבועיים|שבוע|חודשים|חודשיים|חודש|שנים|שנתיים|שנה)",
];

static LAST_VISITED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LAST_VISITED_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).expect("membership pattern is valid"))
        .collect()
});

pub trait MembershipClassifier: Send + Sync {
    fn is_member(&self, candidate: ElementRef<'_>) -> bool;
}

/// Treats every identity-accepted candidate as a membership.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MembershipClassifier for AcceptAll {
    fn is_member(&self, _candidate: ElementRef<'_>) -> bool {
        true
    }
}

/// Walks up to `max_depth` ancestors and matches their rendered text against
/// the "you last visited" phrases in English and Hebrew.
#[derive(Debug, Clone)]
pub struct AncestorTextClassifier {
    patterns: Vec<Regex>,
    max_depth: usize,
}

impl AncestorTextClassifier {
    pub fn new() -> Self {
        Self {
            patterns: LAST_VISITED.clone(),
            max_depth: MEMBERSHIP_SEARCH_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn mentions_last_visit(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }
}

impl Default for AncestorTextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipClassifier for AncestorTextClassifier {
    fn is_member(&self, candidate: ElementRef<'_>) -> bool {
        ancestor_elements(candidate)
            .take(self.max_depth)
            .any(|ancestor| self.mentions_last_visit(&visible_text(ancestor)))
    }
}
