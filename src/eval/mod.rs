//! Evaluation support: target schema, response validation, scoring, and
//! the experiment runner around the rendering/extraction collaborators.

pub mod response;
pub mod runner;
pub mod schema;
pub mod score;
