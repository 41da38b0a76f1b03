//! Core data model types for order records, message blocks, and senders.

pub mod address;
pub mod mail;
pub mod order;
