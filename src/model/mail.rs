//! Message blocks and the per-message records derived from them.

use super::order::OrderRecord;

/// One message's raw text span inside the mailbox dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    /// Sequential index within the dump (0, 1, 2, …).
    pub sequence: usize,

    /// 1-based line number of the block's first line.
    pub start_line: usize,

    /// Lines in original order, without their `\n` terminators.
    pub lines: Vec<String>,
}

impl MessageBlock {
    /// The block text, lines rejoined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A message with its extracted identifiers and, once joined, its
/// expected order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedMessage {
    /// Block text with `attachment:` lines removed, trimmed.
    pub email_content: String,

    /// Attachment filename with any UUID prefix stripped.
    pub attachment: Option<String>,

    pub sender_name: Option<String>,

    pub sender_email: Option<String>,

    /// Order identifier from the first matching cascade pattern.
    pub order_number: Option<String>,

    /// Filled by the join when `order_number` is a lookup key.
    pub expected_output: Option<OrderRecord>,
}

/// The tabular projection of a [`ParsedMessage`]: one dataset row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetRow {
    pub filename: Option<String>,
    pub email: String,
    pub expected_output: Option<OrderRecord>,
}

impl From<&ParsedMessage> for DatasetRow {
    fn from(message: &ParsedMessage) -> Self {
        Self {
            filename: message.attachment.clone(),
            email: message.email_content.clone(),
            expected_output: message.expected_output.clone(),
        }
    }
}

/// Input half of a dataset item.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemInput {
    /// Attachment filename, resolved against the documents directory.
    pub filename: Option<String>,
    pub email: String,
}

/// One evaluation item: what the extractor sees and what it should produce.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetItem {
    pub input: ItemInput,
    pub expected_output: Option<OrderRecord>,
}

impl From<&ParsedMessage> for DatasetItem {
    fn from(message: &ParsedMessage) -> Self {
        Self {
            input: ItemInput {
                filename: message.attachment.clone(),
                email: message.email_content.clone(),
            },
            expected_output: message.expected_output.clone(),
        }
    }
}
