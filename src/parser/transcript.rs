//! Transcript parser.
//!
//! Turns the bullet/field notation of the expected-output transcript into
//! [`OrderRecord`]s:
//!
//! ```text
//! Buyer:
//! • buyer_company_name: ACME GmbH
//! Order:
//! • order_number: 123
//! Products:
//! • position: 1
//! • article_code: AB1
//! • quantity: 2
//! ```
//!
//! Each `Buyer:` starts a new record. A `position` line opens a product;
//! `article_code` and `quantity` lines fill in the open product. Every other
//! key is an order-level field. Integer fields that do not parse abort the
//! whole parse.

use tracing::{debug, trace};

use crate::error::{OrderMatchError, Result};
use crate::model::order::{OrderRecord, ProductRecord};

/// Bullet glyph that prefixes every data line.
const BULLET: char = '•';

/// Starts a new record.
const BUYER_MARKER: &str = "Buyer:";

/// Section markers that carry no data.
const SECTION_MARKERS: [&str; 3] = ["Order:", "Product:", "Products:"];

/// One classified transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Buyer,
    Section,
    Field { key: &'a str, value: &'a str },
    Other,
}

/// Classify a single raw line. Surrounding whitespace is ignored.
fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line == BUYER_MARKER {
        return Line::Buyer;
    }
    if SECTION_MARKERS.contains(&line) {
        return Line::Section;
    }
    let Some(rest) = line.strip_prefix(BULLET) else {
        return Line::Other;
    };
    match rest.trim().split_once(':') {
        Some((key, value)) => Line::Field {
            key: key.trim(),
            value: value.trim(),
        },
        None => Line::Other,
    }
}

/// Parser state threaded through the line sequence.
///
/// `current` accumulates the open record's scalar fields and `products` its
/// product list; the last element of `products` is the open product.
#[derive(Debug, Default)]
struct TranscriptState {
    records: Vec<OrderRecord>,
    current: OrderRecord,
    products: Vec<ProductRecord>,
}

impl TranscriptState {
    /// Apply one line and return the next state.
    fn apply(mut self, line_no: usize, line: Line<'_>) -> Result<Self> {
        match line {
            Line::Buyer => self.close(),
            Line::Section | Line::Other => {}
            Line::Field { key, value } => self.set_field(line_no, key, value)?,
        }
        Ok(self)
    }

    fn set_field(&mut self, line_no: usize, key: &str, value: &str) -> Result<()> {
        match key {
            "position" => {
                let position = parse_int(line_no, key, value)?;
                self.products.push(ProductRecord::new(position));
            }
            "article_code" | "quantity" => {
                let Some(product) = self.products.last_mut() else {
                    debug!(line = line_no, key, "No open product, dropping field");
                    return Ok(());
                };
                if key == "quantity" {
                    product.quantity = Some(parse_int(line_no, key, value)?);
                } else {
                    product.article_code = Some(value.to_string());
                }
            }
            _ => {
                if !self.current.set(key, value) {
                    debug!(line = line_no, key, "Reserved key, dropping field");
                }
            }
        }
        Ok(())
    }

    /// Move the accumulated record (if any) into the output.
    fn close(&mut self) {
        if self.current.is_empty() && self.products.is_empty() {
            return;
        }
        let mut record = std::mem::take(&mut self.current);
        record.set_products(std::mem::take(&mut self.products));
        trace!(
            order_number = record.order_number().unwrap_or(""),
            products = record.products().len(),
            "Closed record"
        );
        self.records.push(record);
    }

    fn finish(mut self) -> Vec<OrderRecord> {
        self.close();
        self.records
    }
}

fn parse_int(line_no: usize, key: &str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| OrderMatchError::MalformedField {
            line: line_no,
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Parse a whole transcript into records, in file order.
///
/// Fails with [`OrderMatchError::MalformedField`] on the first `position` or
/// `quantity` value that is not an integer; no partial result is returned.
pub fn parse_transcript(text: &str) -> Result<Vec<OrderRecord>> {
    let state = text
        .lines()
        .enumerate()
        .try_fold(TranscriptState::default(), |state, (idx, raw)| {
            state.apply(idx + 1, classify(raw))
        })?;
    let records = state.finish();
    debug!(records = records.len(), "Parsed transcript");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify("Buyer:"), Line::Buyer);
        assert_eq!(classify("  Buyer:  "), Line::Buyer);
        assert_eq!(classify("Order:"), Line::Section);
        assert_eq!(classify("Product:"), Line::Section);
        assert_eq!(classify("Products:"), Line::Section);
        assert_eq!(classify("buyer:"), Line::Other);
        assert_eq!(classify(""), Line::Other);
    }

    #[test]
    fn test_classify_field_splits_on_first_colon() {
        assert_eq!(
            classify("• order_date:  01.02.2024 10:30 "),
            Line::Field {
                key: "order_date",
                value: "01.02.2024 10:30"
            }
        );
        assert_eq!(classify("• no colon here"), Line::Other);
        assert_eq!(classify("- key: value"), Line::Other);
    }

    #[test]
    fn test_single_record_with_product() {
        let text = "Buyer:\n• order_number: 123\nProduct:\n• position: 1\n• article_code: AB1\n• quantity: 2\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.order_number(), Some("123"));
        assert_eq!(
            r.products(),
            &[ProductRecord {
                position: 1,
                article_code: Some("AB1".to_string()),
                quantity: Some(2),
            }]
        );
    }

    #[test]
    fn test_one_record_per_buyer_marker_in_order() {
        let text = "Buyer:\n• order_number: 1\nBuyer:\n• order_number: 2\nBuyer:\n• order_number: 3\n";
        let records = parse_transcript(text).unwrap();
        let numbers: Vec<_> = records.iter().map(|r| r.order_number().unwrap()).collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_products_do_not_leak_between_records() {
        let text = "\
Buyer:
• order_number: 1
Products:
• position: 1
• article_code: A
Buyer:
• order_number: 2
Products:
• quantity: 5
";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].products().len(), 1);
        assert_eq!(records[0].products()[0].quantity, None);
        assert!(records[1].products().is_empty());
    }

    #[test]
    fn test_orphan_product_field_dropped() {
        let text = "Buyer:\n• article_code: X\n• order_number: 7\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("article_code"), None);
        assert!(records[0].products().is_empty());
    }

    #[test]
    fn test_fields_attach_to_last_open_product() {
        let text = "\
Buyer:
• position: 1
• article_code: A
• position: 2
• quantity: 3
• article_code: B
";
        let records = parse_transcript(text).unwrap();
        let p = records[0].products();
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].article_code.as_deref(), Some("A"));
        assert_eq!(p[1].article_code.as_deref(), Some("B"));
        assert_eq!(p[1].quantity, Some(3));
    }

    #[test]
    fn test_order_field_overwrites() {
        let text = "Buyer:\n• order_number: 1\n• order_number: 2\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records[0].order_number(), Some("2"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let text = "Buyer:\n• Position: 1\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records[0].get("Position"), Some("1"));
        assert!(records[0].products().is_empty());
    }

    #[test]
    fn test_malformed_position_is_fatal() {
        let text = "Buyer:\n• order_number: 1\n• position: one\n";
        let err = parse_transcript(text).unwrap_err();
        match err {
            OrderMatchError::MalformedField { line, key, value } => {
                assert_eq!(line, 3);
                assert_eq!(key, "position");
                assert_eq!(value, "one");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_quantity_is_fatal() {
        let text = "Buyer:\n• position: 1\n• quantity: many\n";
        assert!(matches!(
            parse_transcript(text),
            Err(OrderMatchError::MalformedField { line: 3, .. })
        ));
    }

    #[test]
    fn test_orphan_quantity_dropped_before_coercion() {
        let text = "Buyer:\n• quantity: many\n• order_number: 1\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records[0].order_number(), Some("1"));
    }

    #[test]
    fn test_scalar_products_line_never_shadows_product_list() {
        let text = "Buyer:\n• order_number: 1\n• products: x\nProducts:\n• position: 1\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records[0].get("products"), None);
        assert_eq!(
            serde_json::to_string(&records[0]).unwrap(),
            r#"{"order_number":"1","products":[{"position":1}]}"#
        );
    }

    #[test]
    fn test_scalar_products_line_without_products_reloads() {
        let text = "Buyer:\n• order_number: 2\n• products: see PDF\n";
        let records = parse_transcript(text).unwrap();
        let json = serde_json::to_string(&records[0]).unwrap();
        assert_eq!(json, r#"{"order_number":"2"}"#);
        let reloaded: OrderRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, records[0]);
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(parse_transcript("").unwrap().is_empty());
        assert!(parse_transcript("Buyer:\n\nBuyer:\n").unwrap().is_empty());
    }

    #[test]
    fn test_fields_before_first_buyer_form_a_record() {
        let text = "• order_number: 0\nBuyer:\n• order_number: 1\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].order_number(), Some("0"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Buyer:\r\n• order_number: 5\r\nProduct:\r\n• position: 1\r\n";
        let records = parse_transcript(text).unwrap();
        assert_eq!(records[0].order_number(), Some("5"));
        assert_eq!(records[0].products()[0].position, 1);
    }
}
