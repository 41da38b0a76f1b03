//! Mailbox dump segmenter.
//!
//! The dump is a flat concatenation of messages. A line starting with
//! `attachment:` opens a new message block and belongs to that block; text
//! before the first marker belongs to the first block. Lines are split on
//! `\n` exactly, so rejoining every block with `\n` reproduces the input.

use std::iter::{Enumerate, Peekable};
use std::str::Split;

use tracing::debug;

use crate::model::mail::MessageBlock;

/// Line prefix that starts a new message block.
pub const ATTACHMENT_MARKER: &str = "attachment:";

/// Check whether a line opens a new block.
pub fn is_block_start(line: &str) -> bool {
    line.starts_with(ATTACHMENT_MARKER)
}

/// Streaming segmenter over an in-memory dump.
///
/// Yields blocks in input order. An empty dump yields nothing.
pub struct Segmenter<'a> {
    lines: Peekable<Enumerate<Split<'a, char>>>,
    sequence: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut lines = text.split('\n').enumerate().peekable();
        if text.is_empty() {
            // `split` yields one empty piece for empty input.
            lines.next();
        }
        Self { lines, sequence: 0 }
    }
}

impl Iterator for Segmenter<'_> {
    type Item = MessageBlock;

    fn next(&mut self) -> Option<MessageBlock> {
        // The first line always belongs to the block, marker or not.
        let (first_idx, first) = self.lines.next()?;
        let mut lines = vec![first.to_string()];
        while let Some((_, line)) = self.lines.next_if(|(_, l)| !is_block_start(l)) {
            lines.push(line.to_string());
        }

        let block = MessageBlock {
            sequence: self.sequence,
            start_line: first_idx + 1,
            lines,
        };
        self.sequence += 1;
        Some(block)
    }
}

/// Split a mailbox dump into message blocks.
pub fn segment(text: &str) -> Vec<MessageBlock> {
    let blocks: Vec<MessageBlock> = Segmenter::new(text).collect();
    debug!(blocks = blocks.len(), "Segmented mailbox");
    blocks
}
