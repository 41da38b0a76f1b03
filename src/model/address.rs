//! Sender identity taken from a `Von:` line.

use once_cell::sync::Lazy;
use regex::Regex;

/// `Von:` label, free-text name, then an address token.
static SENDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Von:\s*(.+?)\s+([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})")
        .expect("valid sender regex")
});

/// A message sender.
///
/// # Examples
/// - `"Von: Max Mustermann max@x.com"` → `name = "Max Mustermann"`, `email = "max@x.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Sender {
    /// Text before the address, trimmed.
    pub name: String,
    /// The bare email address (`user@domain`).
    pub email: String,
}

impl Sender {
    /// Find the first `Von:` sender in a block of text.
    ///
    /// Returns `None` when no line carries both a name and an address.
    pub fn find(text: &str) -> Option<Self> {
        let caps = SENDER_RE.captures(text)?;
        Some(Self {
            name: caps[1].trim().to_string(),
            email: caps[2].trim().to_string(),
        })
    }
}

/// Formats as `"Name <email>"`.
impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
