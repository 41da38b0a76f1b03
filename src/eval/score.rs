//! Scoring produced output against expected output.
//!
//! Four slices are scored per item, each in `[0, 1]`: buyer identity, order
//! identity, delivery address (each the fraction of equal fields) and the
//! product list (exact equality). `exact_match` is 1 only when every field
//! and the product list agree. The run-level `avg_score` is the mean of the
//! four slice values over all items.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::mail::DatasetItem;

use super::schema::{scalar_fields, ADDRESS_FIELDS, BUYER_FIELDS, ORDER_FIELDS};

/// Names of the slices that feed `avg_score`.
pub const SLICE_NAMES: [&str; 4] = ["buyer_info", "order_info", "address_info", "products"];

const MISSING_COMMENT: &str = "Missing output or expected output";

/// One named score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub name: String,
    pub value: f64,
    pub comment: String,
}

impl Evaluation {
    fn new(name: &str, value: f64, comment: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value,
            comment: comment.into(),
        }
    }
}

/// Treat `null` and `{}` like an absent object.
fn as_record(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object).filter(|m| !m.is_empty())
}

/// 1 if every scalar field and the product list are equal, else 0.
pub fn exact_match(output: Option<&Value>, expected: Option<&Value>) -> Evaluation {
    let score = match (as_record(output), as_record(expected)) {
        (Some(out), Some(exp)) => {
            let all = scalar_fields()
                .chain(std::iter::once("products"))
                .all(|f| out.get(f) == exp.get(f));
            if all {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    };
    Evaluation::new("exact_match", score, "1 if exact match, 0 if any differences")
}

fn slice_score(
    name: &str,
    label: &str,
    fields: &[&str],
    output: Option<&Value>,
    expected: Option<&Value>,
) -> Evaluation {
    let (Some(out), Some(exp)) = (as_record(output), as_record(expected)) else {
        return Evaluation::new(name, 0.0, MISSING_COMMENT);
    };
    let matches = fields.iter().filter(|f| out.get(**f) == exp.get(**f)).count();
    Evaluation::new(
        name,
        matches as f64 / fields.len() as f64,
        format!("{matches}/{} {label} fields match", fields.len()),
    )
}

pub fn buyer_info(output: Option<&Value>, expected: Option<&Value>) -> Evaluation {
    slice_score("buyer_info", "buyer", &BUYER_FIELDS, output, expected)
}

pub fn order_info(output: Option<&Value>, expected: Option<&Value>) -> Evaluation {
    slice_score("order_info", "order", &ORDER_FIELDS, output, expected)
}

pub fn address_info(output: Option<&Value>, expected: Option<&Value>) -> Evaluation {
    slice_score("address_info", "address", &ADDRESS_FIELDS, output, expected)
}

/// 1 if the product arrays are equal (a missing array counts as empty).
pub fn products(output: Option<&Value>, expected: Option<&Value>) -> Evaluation {
    let (Some(out), Some(exp)) = (as_record(output), as_record(expected)) else {
        return Evaluation::new("products", 0.0, MISSING_COMMENT);
    };
    let empty = Vec::new();
    let out_products = out.get("products").and_then(Value::as_array).unwrap_or(&empty);
    let exp_products = exp.get("products").and_then(Value::as_array).unwrap_or(&empty);
    let equal = out_products == exp_products;
    Evaluation::new(
        "products",
        if equal { 1.0 } else { 0.0 },
        format!(
            "{} products extracted, {} expected, match={equal}",
            out_products.len(),
            exp_products.len()
        ),
    )
}

/// All five item-level evaluations.
pub fn evaluate_item(output: Option<&Value>, expected: Option<&Value>) -> Vec<Evaluation> {
    vec![
        exact_match(output, expected),
        buyer_info(output, expected),
        order_info(output, expected),
        address_info(output, expected),
        products(output, expected),
    ]
}

/// Mean of every slice evaluation across items, `None` if there are none.
pub fn average_score<'a>(
    evaluations: impl IntoIterator<Item = &'a Evaluation>,
) -> Option<Evaluation> {
    let scores: Vec<f64> = evaluations
        .into_iter()
        .filter(|e| SLICE_NAMES.contains(&e.name.as_str()))
        .map(|e| e.value)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    Some(Evaluation::new(
        "avg_score",
        avg,
        format!(
            "Average score across all evaluators: {:.2}% ({} total evaluations)",
            avg * 100.0,
            scores.len()
        ),
    ))
}

/// Scores for one dataset item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemScore {
    pub filename: Option<String>,
    pub evaluations: Vec<Evaluation>,
    /// Why the item produced no output, when extraction failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemScore {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.evaluations
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value)
    }
}

/// Scores for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<ItemScore>,
    pub average: Option<Evaluation>,
}

impl ScoreReport {
    pub fn new(items: Vec<ItemScore>) -> Self {
        let average = average_score(items.iter().flat_map(|i| i.evaluations.iter()));
        Self {
            generated_at: Utc::now(),
            items,
            average,
        }
    }

    /// Mean value of one evaluation over the items that have it.
    pub fn mean_of(&self, name: &str) -> Option<f64> {
        let values: Vec<f64> = self.items.iter().filter_map(|i| i.value(name)).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Number of items whose extraction failed.
    pub fn errors(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_some()).count()
    }
}

/// Score produced outputs, keyed by attachment filename, against a dataset.
///
/// Items with no produced output are scored as missing (all zeros).
pub fn score_outputs(items: &[DatasetItem], outputs: &Map<String, Value>) -> ScoreReport {
    let scored = items
        .iter()
        .map(|item| {
            let expected = item.expected_output.as_ref().map(|r| r.to_value());
            let output = item
                .input
                .filename
                .as_deref()
                .and_then(|f| outputs.get(f));
            ItemScore {
                filename: item.input.filename.clone(),
                evaluations: evaluate_item(output, expected.as_ref()),
                error: None,
            }
        })
        .collect();
    ScoreReport::new(scored)
}
