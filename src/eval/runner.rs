//! Experiment runner over the external collaborators.
//!
//! Rendering documents and calling a vision model live outside this crate.
//! They plug in through [`PageRenderer`] and [`ExtractionService`]; the
//! runner builds the request, validates the response and scores it.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{OrderMatchError, Result};
use crate::model::mail::DatasetItem;

use super::response::parse_response;
use super::schema::{order_schema, SCHEMA_NAME};
use super::score::{evaluate_item, ItemScore, ScoreReport};

/// Used when the configuration does not provide a system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You extract purchase orders from customer emails and \
their attached order documents. Read the email and every page image, then return one JSON \
object that follows the provided schema exactly. Copy values as written in the documents; \
use DD.MM.YYYY for the order date. List every product line in document order.";

/// Turns a document into page images.
pub trait PageRenderer {
    /// Render every page as a base64-encoded PNG, in page order.
    fn render(&self, document: &Path) -> Result<Vec<String>>;
}

/// Sends one extraction request and returns the raw model text.
pub trait ExtractionService {
    fn extract(&self, request: &ExtractionRequest) -> Result<String>;
}

/// Everything an extraction service needs for one item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExtractionRequest {
    pub model: String,
    pub system_prompt: String,
    /// Email text framed with the extraction instruction.
    pub user_text: String,
    /// Page images as `data:image/png;base64,…` URLs.
    pub images: Vec<String>,
    pub schema_name: String,
    pub schema: Value,
    pub max_completion_tokens: u32,
}

impl ExtractionRequest {
    /// Build a request from an email body and rendered pages.
    pub fn new(email: &str, pages: Vec<String>, config: &ServiceConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            user_text: format!(
                "**EMAIL:**\n\n{email}\n\n**Extract the order information from the email above and the PDF images below:**"
            ),
            images: pages
                .into_iter()
                .map(|p| format!("data:image/png;base64,{p}"))
                .collect(),
            schema_name: SCHEMA_NAME.to_string(),
            schema: order_schema(),
            max_completion_tokens: config.max_completion_tokens,
        }
    }
}

/// Run extraction for one item: resolve, render, extract and validate.
pub fn extract_item(
    item: &DatasetItem,
    documents_dir: &Path,
    renderer: &dyn PageRenderer,
    service: &dyn ExtractionService,
    config: &ServiceConfig,
) -> Result<Value> {
    let filename = item
        .input
        .filename
        .as_deref()
        .ok_or_else(|| OrderMatchError::FileNotFound(PathBuf::from("<no attachment>")))?;
    let document = documents_dir.join(filename);
    if !document.exists() {
        return Err(OrderMatchError::FileNotFound(document));
    }

    let pages = renderer.render(&document)?;
    let request = ExtractionRequest::new(&item.input.email, pages, config);
    let raw = service.extract(&request)?;
    parse_response(&raw)
}

/// Run every item through extraction and scoring.
///
/// Documents are looked up under [`ServiceConfig::documents_root`]. A
/// failing item is recorded with its error and no evaluations; the run
/// continues with the next item. The progress callback receives
/// `(processed, total)`.
pub fn run_experiment(
    items: &[DatasetItem],
    renderer: &dyn PageRenderer,
    service: &dyn ExtractionService,
    config: &ServiceConfig,
    progress: Option<&dyn Fn(usize, usize)>,
) -> ScoreReport {
    let total = items.len();
    let documents_dir = config.documents_root();
    let mut scored = Vec::with_capacity(total);

    for (i, item) in items.iter().enumerate() {
        let filename = item.input.filename.clone();
        let score = match extract_item(item, documents_dir, renderer, service, config) {
            Ok(output) => {
                let expected = item.expected_output.as_ref().map(|r| r.to_value());
                ItemScore {
                    filename,
                    evaluations: evaluate_item(Some(&output), expected.as_ref()),
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    filename = filename.as_deref().unwrap_or(""),
                    error = %e,
                    "Extraction failed"
                );
                ItemScore {
                    filename,
                    evaluations: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        scored.push(score);
        if let Some(cb) = progress {
            cb(i + 1, total);
        }
    }

    let report = ScoreReport::new(scored);
    info!(
        items = total,
        errors = report.errors(),
        avg = report.average.as_ref().map(|a| a.value),
        model = %config.model,
        "Experiment finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::ItemInput;
    use crate::model::order::OrderRecord;
    use std::cell::RefCell;

    struct FixedPages(usize);

    impl PageRenderer for FixedPages {
        fn render(&self, _document: &Path) -> Result<Vec<String>> {
            Ok((0..self.0).map(|i| format!("PAGE{i}")).collect())
        }
    }

    /// Returns canned responses in order and records the requests it saw.
    struct Scripted {
        responses: RefCell<Vec<Result<String>>>,
        seen: RefCell<Vec<ExtractionRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: RefCell::new(responses.into_iter().rev().collect()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ExtractionService for Scripted {
        fn extract(&self, request: &ExtractionRequest) -> Result<String> {
            self.seen.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop()
                .unwrap_or(Err(OrderMatchError::Collaborator("no response".to_string())))
        }
    }

    fn output_json() -> Value {
        serde_json::json!({
            "buyer_company_name": "ACME GmbH",
            "buyer_person_name": "Max Mustermann",
            "buyer_email_address": "max@acme.de",
            "order_number": "123",
            "order_date": "01.02.2024",
            "delivery_address_street": "Hauptstr. 1",
            "delivery_address_city": "Wien",
            "delivery_address_postal_code": "1010",
            "products": [{ "position": 1, "article_code": "AB1", "quantity": 2 }]
        })
    }

    fn item(filename: &str) -> DatasetItem {
        let record: OrderRecord = serde_json::from_value(output_json()).unwrap();
        DatasetItem {
            input: ItemInput {
                filename: Some(filename.to_string()),
                email: "Bestellung BT 123".to_string(),
            },
            expected_output: Some(record),
        }
    }

    #[test]
    fn test_request_shape() {
        let req = ExtractionRequest::new(
            "Hallo",
            vec!["AAA".to_string(), "BBB".to_string()],
            &ServiceConfig::default(),
        );
        assert_eq!(
            req.images,
            vec!["data:image/png;base64,AAA", "data:image/png;base64,BBB"]
        );
        assert!(req.user_text.starts_with("**EMAIL:**\n\nHallo\n\n"));
        assert_eq!(req.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(req.schema_name, "order_extraction_schema");
    }

    #[test]
    fn test_run_experiment_scores_and_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();

        let items = vec![item("a.pdf"), item("b.pdf"), item("missing.pdf")];
        let service = Scripted::new(vec![
            Ok(format!("```json\n{}\n```", output_json())),
            Ok("not json".to_string()),
        ]);

        let config = ServiceConfig {
            documents_dir: Some(dir.path().to_path_buf()),
            ..ServiceConfig::default()
        };
        let report = run_experiment(&items, &FixedPages(2), &service, &config, None);

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.items[0].value("exact_match"), Some(1.0));
        assert!(report.items[1].error.as_deref().unwrap().contains("Schema violation"));
        assert!(report.items[2].error.as_deref().unwrap().contains("File not found"));
        assert_eq!(report.errors(), 2);
        assert_eq!(report.average.as_ref().unwrap().value, 1.0);

        let seen = service.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].images.len(), 2);
    }
}
