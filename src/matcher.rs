//! Order lookup and the message ↔ record join.
//!
//! The join is exact string equality on the order number: no case folding,
//! trimming or leading-zero handling beyond what extraction already did.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::mail::ParsedMessage;
use crate::model::order::OrderRecord;
use crate::parser::extract::Extractor;
use crate::parser::mailbox::Segmenter;
use crate::parser::patterns::PatternSet;
use crate::parser::transcript::parse_transcript;

/// Order number → expected record. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct OrderLookup {
    by_number: HashMap<String, OrderRecord>,
    duplicates: Vec<String>,
    unkeyed: usize,
}

impl OrderLookup {
    /// Index records by their `order_number` field.
    ///
    /// A later record with the same number replaces the earlier one; the
    /// number is reported through [`OrderLookup::duplicates`]. Records
    /// without an order number are skipped and counted.
    pub fn build(records: impl IntoIterator<Item = OrderRecord>) -> Self {
        let mut lookup = Self::default();
        for record in records {
            let Some(number) = record.order_number().map(str::to_string) else {
                lookup.unkeyed += 1;
                continue;
            };
            if lookup.by_number.insert(number.clone(), record).is_some() {
                warn!(order_number = %number, "Duplicate order number, keeping the last record");
                if !lookup.duplicates.contains(&number) {
                    lookup.duplicates.push(number);
                }
            }
        }
        if lookup.unkeyed > 0 {
            warn!(count = lookup.unkeyed, "Records without order_number were not indexed");
        }
        lookup
    }

    pub fn get(&self, order_number: &str) -> Option<&OrderRecord> {
        self.by_number.get(order_number)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    /// Order numbers that appeared on more than one record, in the order
    /// the first repeat was seen.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Number of records that had no `order_number` field.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

/// Join statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MatchSummary {
    /// Total messages processed.
    pub messages: usize,
    /// Messages whose order number is a lookup key.
    pub matched: usize,
    /// Messages with an order number that is not in the lookup.
    pub unmatched: usize,
    /// Messages where no pattern produced an order number.
    pub without_number: usize,
    /// Distinct order numbers duplicated in the transcript.
    pub duplicate_keys: usize,
    /// Records in the lookup.
    pub records: usize,
}

/// Attach the expected record to one message. Returns `true` on a hit.
pub fn attach_expected(message: &mut ParsedMessage, lookup: &OrderLookup) -> bool {
    let Some(number) = message.order_number.as_deref() else {
        return false;
    };
    match lookup.get(number) {
        Some(record) => {
            message.expected_output = Some(record.clone());
            true
        }
        None => {
            debug!(order_number = number, "Order number not in transcript");
            false
        }
    }
}

/// Join every message against the lookup, in place.
pub fn join(messages: &mut [ParsedMessage], lookup: &OrderLookup) -> MatchSummary {
    let mut summary = MatchSummary {
        messages: messages.len(),
        duplicate_keys: lookup.duplicates().len(),
        records: lookup.len(),
        ..MatchSummary::default()
    };
    for message in messages.iter_mut() {
        if message.order_number.is_none() {
            summary.without_number += 1;
        } else if attach_expected(message, lookup) {
            summary.matched += 1;
        } else {
            summary.unmatched += 1;
        }
    }
    summary
}

/// Run the whole pipeline over in-memory text.
///
/// Parses the transcript, then hands over to [`match_records`].
pub fn build_dataset(
    transcript: &str,
    mailbox: &str,
    patterns: PatternSet,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<(Vec<ParsedMessage>, MatchSummary)> {
    let records = parse_transcript(transcript)?;
    Ok(match_records(records, mailbox, patterns, progress))
}

/// Segment the mailbox, extract identifiers and join against already
/// parsed records, keeping mailbox order. The progress callback receives
/// `(processed_blocks, total_blocks)`.
pub fn match_records(
    records: impl IntoIterator<Item = OrderRecord>,
    mailbox: &str,
    patterns: PatternSet,
    progress: Option<&dyn Fn(usize, usize)>,
) -> (Vec<ParsedMessage>, MatchSummary) {
    let lookup = OrderLookup::build(records);

    let extractor = Extractor::new(patterns);
    let blocks: Vec<_> = Segmenter::new(mailbox).collect();
    let total = blocks.len();

    let mut messages = Vec::with_capacity(total);
    for (i, block) in blocks.iter().enumerate() {
        messages.push(extractor.extract(block));
        if let Some(cb) = progress {
            cb(i + 1, total);
        }
    }

    let summary = join(&mut messages, &lookup);
    info!(
        messages = summary.messages,
        matched = summary.matched,
        unmatched = summary.unmatched,
        without_number = summary.without_number,
        "Joined mailbox with transcript"
    );
    (messages, summary)
}
