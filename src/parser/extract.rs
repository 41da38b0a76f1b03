//! Identifier extraction from a single message block.
//!
//! Pulls out the attachment filename, the `Von:` sender and the order
//! number, and produces the cleaned message body.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::model::address::Sender;
use crate::model::mail::{MessageBlock, ParsedMessage};

use super::mailbox::is_block_start;
use super::patterns::PatternSet;

/// `attachment:` and a value on the same line.
static ATTACHMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"attachment:[ \t]*(.*\S)").expect("valid attachment regex"));

/// UUID (8-4-4-4-12 lowercase hex) followed by `:` at the start of a filename.
static UUID_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}:")
        .expect("valid uuid regex")
});

/// Find the attachment filename of a block.
///
/// Uses the first `attachment:` line that carries a value and strips a UUID
/// prefix from it. Returns `None` if there is no such line.
pub fn attachment_name(text: &str) -> Option<String> {
    let caps = ATTACHMENT_RE.captures(text)?;
    let raw = caps[1].trim();
    let name = UUID_PREFIX_RE.replace(raw, "");
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}

/// Block text with every `attachment:` line removed, trimmed.
pub fn clean_body(block: &MessageBlock) -> String {
    block
        .lines
        .iter()
        .filter(|line| !is_block_start(line))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Turns message blocks into [`ParsedMessage`]s.
///
/// The join step fills in `expected_output` later; extraction leaves it
/// `None`.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    patterns: PatternSet,
}

impl Extractor {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Extract identifiers from one block.
    pub fn extract(&self, block: &MessageBlock) -> ParsedMessage {
        let text = block.text();

        let attachment = attachment_name(&text);
        let sender = Sender::find(&text);
        let order_number = match self.patterns.find(&text) {
            Some(m) => {
                trace!(
                    block = block.sequence,
                    pattern = m.pattern,
                    order_number = %m.value,
                    "Order number matched"
                );
                Some(m.value)
            }
            None => {
                debug!(
                    block = block.sequence,
                    line = block.start_line,
                    "No order number found"
                );
                None
            }
        };

        let (sender_name, sender_email) = match sender {
            Some(s) => {
                trace!(block = block.sequence, sender = %s, "Sender found");
                (Some(s.name), Some(s.email))
            }
            None => (None, None),
        };

        ParsedMessage {
            email_content: clean_body(block),
            attachment,
            sender_name,
            sender_email,
            order_number,
            expected_output: None,
        }
    }
}
