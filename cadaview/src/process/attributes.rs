//! Attribute cleanup for processed layers.

use serde_json::{Map, Value};

/// Prefix of attributes produced by export tooling and never published.
pub const TOOLING_ATTRIBUTE_PREFIX: &str = "__";

/// Cleans one feature's attributes in place.
///
/// Drops tooling attributes, then, when `keep` is not empty, keeps only the
/// listed attributes in `keep` order. Non-finite numbers become null.
pub fn clean_attributes(properties: &mut Map<String, Value>, keep: &[String]) {
    properties.retain(|key, _| !key.starts_with(TOOLING_ATTRIBUTE_PREFIX));

    if !keep.is_empty() {
        let mut kept = Map::with_capacity(keep.len());
        for key in keep {
            if let Some(value) = properties.remove(key) {
                kept.insert(key.clone(), value);
            }
        }
        *properties = kept;
    }

    for value in properties.values_mut() {
        if let Value::Number(n) = value {
            if n.as_f64().is_some_and(|f| !f.is_finite()) {
                *value = Value::Null;
            }
        }
    }
}
