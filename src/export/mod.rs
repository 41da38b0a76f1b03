//! Export functionality: dataset CSV and record/dataset JSON.

pub mod csv;
pub mod json;
