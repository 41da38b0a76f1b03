//! `ordermatch`: build (email, expected order) evaluation datasets.
//!
//! This crate parses a bullet/field order transcript into structured
//! records, splits a plain-text mailbox dump into messages, extracts
//! sender and order identifiers from each message, and joins messages to
//! their expected records by order number.

pub mod config;
pub mod error;
pub mod eval;
pub mod export;
pub mod input;
pub mod matcher;
pub mod model;
pub mod parser;
