//! Expected order records parsed from the transcript.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key under which the product list is stored in a serialized record.
pub const PRODUCTS_KEY: &str = "products";

/// One product line of an order.
///
/// `position` opens the product; `article_code` and `quantity` are filled in
/// by the lines that follow it and stay `None` if those lines are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// 1-based position as written in the transcript.
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl ProductRecord {
    /// Open a new product at the given position.
    pub fn new(position: i64) -> Self {
        Self {
            position,
            article_code: None,
            quantity: None,
        }
    }
}

/// A buyer/order/product-list unit.
///
/// Scalar fields keep the order in which they first appeared; setting an
/// existing key overwrites its value in place. Serializes as a flat JSON
/// object, with `products` appended only when at least one product exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct OrderRecord {
    fields: Vec<(String, String)>,
    products: Vec<ProductRecord>,
}

impl OrderRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an order-level field, overwriting any prior value for `key`.
    ///
    /// [`PRODUCTS_KEY`] belongs to the product list; setting it as a scalar
    /// is ignored and returns `false`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if key == PRODUCTS_KEY {
            return false;
        }
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
        true
    }

    /// Look up an order-level field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `order_number` field, the join key.
    pub fn order_number(&self) -> Option<&str> {
        self.get("order_number")
    }

    /// Scalar fields in first-seen order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn set_products(&mut self, products: Vec<ProductRecord>) {
        self.products = products;
    }

    /// `true` when the record has neither fields nor products.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.products.is_empty()
    }

    /// Convert to a JSON value with the same shape as the serialized form.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for OrderRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(!self.products.is_empty());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        if !self.products.is_empty() {
            map.serialize_entry(PRODUCTS_KEY, &self.products)?;
        }
        map.end()
    }
}

impl TryFrom<Map<String, Value>> for OrderRecord {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut record = OrderRecord::new();
        for (key, value) in map {
            if key == PRODUCTS_KEY {
                let products: Vec<ProductRecord> =
                    serde_json::from_value(value).map_err(|e| e.to_string())?;
                record.set_products(products);
                continue;
            }
            match value {
                Value::String(s) => {
                    record.set(key, s);
                }
                other => return Err(format!("field '{key}' must be a string, got {other}")),
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut r = OrderRecord::new();
        r.set("buyer_company_name", "ACME");
        r.set("order_number", "1");
        r.set("buyer_company_name", "ACME GmbH");
        let keys: Vec<&str> = r.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["buyer_company_name", "order_number"]);
        assert_eq!(r.get("buyer_company_name"), Some("ACME GmbH"));
    }

    #[test]
    fn test_serialize_without_products_omits_key() {
        let mut r = OrderRecord::new();
        r.set("order_number", "123");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"order_number":"123"}"#);
    }

    #[test]
    fn test_serialize_products_as_integers() {
        let mut r = OrderRecord::new();
        r.set("order_number", "123");
        r.set_products(vec![ProductRecord {
            position: 1,
            article_code: Some("AB1".to_string()),
            quantity: Some(2),
        }]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"order_number":"123","products":[{"position":1,"article_code":"AB1","quantity":2}]}"#
        );
    }

    #[test]
    fn test_products_key_is_not_a_scalar_field() {
        let mut r = OrderRecord::new();
        r.set("order_number", "1");
        assert!(!r.set(PRODUCTS_KEY, "see PDF"));
        assert_eq!(r.get(PRODUCTS_KEY), None);
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"order_number":"1"}"#);

        r.set_products(vec![ProductRecord::new(1)]);
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"order_number":"1","products":[{"position":1}]}"#
        );
    }

    #[test]
    fn test_deserialize_rejects_non_string_field() {
        let result: Result<OrderRecord, _> = serde_json::from_str(r#"{"order_number": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_reads_products() {
        let r: OrderRecord = serde_json::from_str(
            r#"{"order_number":"9","products":[{"position":2,"quantity":4}]}"#,
        )
        .unwrap();
        assert_eq!(r.order_number(), Some("9"));
        assert_eq!(r.products()[0].position, 2);
        assert_eq!(r.products()[0].article_code, None);
        assert_eq!(r.products()[0].quantity, Some(4));
    }
}
