//! Removal of the activity and timestamp phrases the listing appends to group names.
//!
//! Every pattern marks the start of a trailing noise segment. The match and
//! everything after it is cut, and the cascade keeps going on the shortened
//! label, so labels carrying several concatenated segments are fully cleaned.

use regex::Regex;
use std::sync::LazyLock;

const ENGLISH_PATTERNS: &[&str] = &[
    r"last\s+active",
    r"active\s+\d+",
    r"yesterday",
    r"today",
    r"\d+\s+(?:minutes?|hours?|days?|weeks?|months?|years?)\s+ago",
    r"\d+[hm]\s+ago",
    r"just\s+now",
    r"new\s+activity",
    r"\d+\s+new\s+(?:posts?|notifications?)",
    r"you\s+last\s+visited",
];

const HEBREW_PATTERNS: &[&str] = &[
    r"פעילות\s+אחרונה",
    r"פעיל\s+לאחרונה",
    r"אתמול",
    r"היום",
    r"לפני\s+\d+\s+(?:דקות|דקה|שעות|שעה|ימים|יום|שבועות|שבוע|חודשים|חודש|שנים|שנה)",
    r"לפני\s+(?:דקה|שעה|יום|שבוע|חודש|שנה)",
    r"לפני\s+(?:יומיים|שבועיים|חודשיים|שנתיים)",
    r"עכשיו",
    r"הרגע",
    r"פעילות\s+חדשה",
    r"\d+\s+(?:פוסטים|פוסט|התראות|התראה)\s+(?:חדשים|חדשות|חדש|חדשה)",
    r"פוסט\s+חדש",
    r"ביקרת\s+לאחרונה",
];

static DEFAULT_CASCADE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ENGLISH_PATTERNS
        .iter()
        .chain(HEBREW_PATTERNS)
        .map(|pattern| Regex::new(&format!("(?i){}", pattern)).expect("noise pattern is valid"))
        .collect()
});

#[derive(Debug, Clone)]
pub struct NoiseStripper {
    cascade: Vec<Regex>,
}

impl NoiseStripper {
    pub fn new() -> Self {
        Self {
            cascade: DEFAULT_CASCADE.clone(),
        }
    }

    /// Strips every recognized trailing phrase and trims the result.
    ///
    /// An empty return value means the whole label was noise; callers fall
    /// back to the group identifier.
    pub fn strip(&self, raw: &str) -> String {
        let mut label = raw.to_string();
        for pattern in &self.cascade {
            if let Some(found) = pattern.find(&label) {
                label.truncate(found.start());
            }
        }
        label.trim().to_string()
    }

    /// Strips the label and substitutes `fallback` when nothing meaningful is left.
    pub fn strip_or(&self, raw: &str, fallback: &str) -> String {
        let label = self.strip(raw);
        if label.is_empty() {
            fallback.to_string()
        } else {
            label
        }
    }
}

impl Default for NoiseStripper {
    fn default() -> Self {
        Self::new()
    }
}
