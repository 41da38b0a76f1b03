//! Text parsing: transcript records, mailbox segmentation, and identifier extraction.

pub mod extract;
pub mod mailbox;
pub mod patterns;
pub mod transcript;
