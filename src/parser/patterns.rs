//! Order-number pattern cascade.
//!
//! Patterns are plain data ([`PatternDef`]) so the cascade can be loaded
//! from the configuration file. They are tried in list order and the first
//! one that matches anywhere in the text wins, even if a later pattern would
//! also match. Capture group 1 is the order number.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{OrderMatchError, Result};

/// Definition of a single order-number pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDef {
    /// Identifier used in logs and diagnostics.
    pub name: String,

    /// Regex with at least one capture group.
    pub pattern: String,

    /// Match letters regardless of case.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl PatternDef {
    pub fn new(name: &str, pattern: &str, case_insensitive: bool) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            case_insensitive,
        }
    }
}

/// Built-in cascade, highest priority first.
///
/// The German labels are matched case-sensitively, the English fallback
/// is not.
pub fn default_patterns() -> Vec<PatternDef> {
    vec![
        PatternDef::new("bestellung_bt", r"Bestellung\s+BT\s+(\d+)", false),
        PatternDef::new("hofbauer", r"Hofbauer[_-](\d+)", false),
        PatternDef::new("bestellung", r"Bestellung\s+(?:Nr\.\s+)?(\S+)", false),
        PatternDef::new("order_number", r"order[_\s]+number[:\s]+(\S+)", true),
    ]
}

/// A compiled cascade entry.
#[derive(Debug, Clone)]
pub struct OrderPattern {
    pub name: String,
    regex: Regex,
}

impl OrderPattern {
    /// Compile a definition. Fails if the regex is invalid or has no
    /// capture group.
    pub fn build(def: &PatternDef) -> Result<Self> {
        let regex = RegexBuilder::new(&def.pattern)
            .case_insensitive(def.case_insensitive)
            .build()
            .map_err(|e| OrderMatchError::InvalidPattern {
                name: def.name.clone(),
                reason: e.to_string(),
            })?;
        if regex.captures_len() < 2 {
            return Err(OrderMatchError::InvalidPattern {
                name: def.name.clone(),
                reason: "pattern needs a capture group".to_string(),
            });
        }
        Ok(Self {
            name: def.name.clone(),
            regex,
        })
    }

    /// Return the trimmed group-1 capture of the first match, if any.
    pub fn capture(&self, text: &str) -> Option<String> {
        let caps = self.regex.captures(text)?;
        let value = caps.get(1)?.as_str().trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// The result of a successful cascade lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMatch<'p> {
    /// Name of the pattern that matched.
    pub pattern: &'p str,
    /// The captured order number.
    pub value: String,
}

/// An ordered, first-match-wins list of order-number patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<OrderPattern>,
}

impl PatternSet {
    /// Compile every definition, keeping their order.
    pub fn from_defs(defs: &[PatternDef]) -> Result<Self> {
        let patterns = defs
            .iter()
            .map(OrderPattern::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Try each pattern in order; the first that matches wins.
    pub fn find(&self, text: &str) -> Option<OrderMatch<'_>> {
        self.patterns.iter().find_map(|p| {
            p.capture(text).map(|value| OrderMatch {
                pattern: p.name.as_str(),
                value,
            })
        })
    }

    /// Pattern names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::from_defs(&default_patterns()).expect("built-in patterns are valid")
    }
}
