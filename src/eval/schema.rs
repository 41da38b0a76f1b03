//! JSON schema of the record an extraction model must produce.
//!
//! The schema is derived from [`OrderExtraction`], which mirrors
//! [`OrderRecord`](crate::model::order::OrderRecord): eight required string
//! fields plus a required `products` array. Every object forbids undeclared
//! properties, and a response is validated by deserializing into the same
//! struct.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OrderMatchError, Result};

/// Name under which the schema is sent to the extraction service.
pub const SCHEMA_NAME: &str = "order_extraction_schema";

pub const BUYER_FIELDS: [&str; 3] = [
    "buyer_company_name",
    "buyer_person_name",
    "buyer_email_address",
];

pub const ORDER_FIELDS: [&str; 2] = ["order_number", "order_date"];

pub const ADDRESS_FIELDS: [&str; 3] = [
    "delivery_address_street",
    "delivery_address_city",
    "delivery_address_postal_code",
];

/// All scalar fields compared by the exact-match score, in schema order.
pub fn scalar_fields() -> impl Iterator<Item = &'static str> {
    BUYER_FIELDS
        .into_iter()
        .chain(ORDER_FIELDS)
        .chain(ADDRESS_FIELDS)
}

/// The record an extraction model returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderExtraction {
    /// Name of the buying company
    pub buyer_company_name: String,
    /// Full name of the buyer person
    pub buyer_person_name: String,
    /// Email address of the buyer
    pub buyer_email_address: String,
    /// Order number from the PDF
    pub order_number: String,
    /// Order date in DD.MM.YYYY format
    pub order_date: String,
    /// Delivery street address including house number
    pub delivery_address_street: String,
    /// Delivery city
    pub delivery_address_city: String,
    /// Delivery postal code
    pub delivery_address_postal_code: String,
    /// List of products in the order
    pub products: Vec<Product>,
}

/// One product line of an extracted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Product {
    /// Position number of the product in the order
    pub position: i64,
    /// Article/supplier code for the product
    pub article_code: String,
    /// Quantity ordered
    pub quantity: i64,
}

/// Build the order schema.
pub fn order_schema() -> Value {
    let mut schema =
        serde_json::to_value(schema_for!(OrderExtraction)).expect("derived schema serializes");
    close_objects(&mut schema);
    schema
}

/// Set `additionalProperties: false` on every object schema that does not
/// say otherwise, including nested definitions.
fn close_objects(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            let is_object = map.get("type").and_then(Value::as_str) == Some("object")
                || map.contains_key("properties");
            if is_object && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for key in ["properties", "definitions", "$defs"] {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(close_objects);
                }
            }
            if let Some(items) = map.get_mut("items") {
                close_objects(items);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

/// Check `value` against the order schema by deserializing it into
/// [`OrderExtraction`].
pub fn validate(value: &Value) -> Result<OrderExtraction> {
    OrderExtraction::deserialize(value)
        .map_err(|e| OrderMatchError::SchemaViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
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

    #[test]
    fn test_schema_lists_every_field_as_required() {
        let schema = order_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 9);
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert_eq!(
            schema["properties"]["order_date"]["description"],
            "Order date in DD.MM.YYYY format"
        );
    }

    #[test]
    fn test_nested_product_schema_is_closed() {
        let schema = order_schema();
        let product = &schema["definitions"]["Product"];
        assert_eq!(product["additionalProperties"], Value::Bool(false));
        assert_eq!(product["required"].as_array().unwrap().len(), 3);
        assert_eq!(product["properties"]["quantity"]["type"], "integer");
    }

    #[test]
    fn test_scalar_fields_cover_every_string_property() {
        let schema = order_schema();
        let properties = schema["properties"].as_object().unwrap();
        for field in scalar_fields() {
            assert_eq!(properties[field]["type"], "string", "{field}");
        }
        assert_eq!(scalar_fields().count() + 1, properties.len());
    }

    #[test]
    fn test_valid_record_passes() {
        let parsed = validate(&valid()).unwrap();
        assert_eq!(parsed.order_number, "123");
        assert_eq!(parsed.products[0].quantity, 2);
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut v = valid();
        v.as_object_mut().unwrap().remove("order_date");
        let err = validate(&v).unwrap_err().to_string();
        assert!(err.contains("order_date"), "{err}");
    }

    #[test]
    fn test_extra_field_rejected() {
        let mut v = valid();
        v["comment"] = json!("x");
        assert!(matches!(validate(&v), Err(OrderMatchError::SchemaViolation(_))));
    }

    #[test]
    fn test_extra_product_field_rejected() {
        let mut v = valid();
        v["products"][0]["price"] = json!(3.5);
        let err = validate(&v).unwrap_err().to_string();
        assert!(err.contains("price"), "{err}");
    }

    #[test]
    fn test_wrong_types_rejected() {
        let mut v = valid();
        v["products"][0]["quantity"] = json!("2");
        assert!(validate(&v).is_err());

        let mut v = valid();
        v["order_number"] = json!(123);
        assert!(validate(&v).is_err());

        assert!(validate(&json!([])).is_err());
    }
}
