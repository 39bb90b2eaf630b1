//! Per-schedule-block attributes.
//!
//! Rules communicate tuning decisions to code generation by writing entries
//! into a block's [`AttrStore`]. Keys come from the fixed namespace in
//! [`keys`]; each rule owns a disjoint subset of them (see
//! [`crate::auto_gen_rule::AutoGenRule::owned_attr_keys`]).

use crate::error::{AttrTypeMismatchSnafu, MissingAttrSnafu, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AttrKey(&'static str);

impl AttrKey {
    pub const fn new(name: &'static str) -> Self {
        AttrKey(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for AttrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The attribute namespace shared by all rules and the code generator.
pub mod keys {
    use super::AttrKey;

    /// Upper bound on how far codegen may unroll the annotated loop nest.
    /// Written by [`crate::auto_gen_rule::AutoUnroll`].
    pub const AUTO_UNROLL_MAX_STEP: AttrKey = AttrKey::new("auto_unroll_max_step");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i32),
    Bool(bool),
    String(String),
    IntList(Vec<i32>),
}

impl AttrValue {
    fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Int(_) => "int",
            AttrValue::Bool(_) => "bool",
            AttrValue::String(_) => "string",
            AttrValue::IntList(_) => "int list",
        }
    }

    pub fn as_int(&self, key: AttrKey) -> Result<i32> {
        match self {
            AttrValue::Int(i) => Ok(*i),
            other => AttrTypeMismatchSnafu {
                key,
                expected: "int",
                found: other.type_name(),
            }
            .fail(),
        }
    }

    pub fn as_bool(&self, key: AttrKey) -> Result<bool> {
        match self {
            AttrValue::Bool(b) => Ok(*b),
            other => AttrTypeMismatchSnafu {
                key,
                expected: "bool",
                found: other.type_name(),
            }
            .fail(),
        }
    }

    pub fn as_str(&self, key: AttrKey) -> Result<&str> {
        match self {
            AttrValue::String(s) => Ok(s),
            other => AttrTypeMismatchSnafu {
                key,
                expected: "string",
                found: other.type_name(),
            }
            .fail(),
        }
    }

    pub fn as_int_list(&self, key: AttrKey) -> Result<&[i32]> {
        match self {
            AttrValue::IntList(l) => Ok(l),
            other => AttrTypeMismatchSnafu {
                key,
                expected: "int list",
                found: other.type_name(),
            }
            .fail(),
        }
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<Vec<i32>> for AttrValue {
    fn from(l: Vec<i32>) -> Self {
        AttrValue::IntList(l)
    }
}

/// Keys are unique; iteration order is by key name, never insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttrStore {
    entries: BTreeMap<AttrKey, AttrValue>,
}

impl AttrStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: AttrKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Returns the previous value, if any. Entries are only ever replaced
    /// explicitly; nothing clears them.
    pub fn insert(&mut self, key: AttrKey, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.entries.insert(key, value.into())
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.entries.get(&key)
    }

    pub fn get_int(&self, key: AttrKey) -> Result<i32> {
        match self.entries.get(&key) {
            Some(value) => value.as_int(key),
            None => MissingAttrSnafu { key }.fail(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, &AttrValue)> {
        self.entries.iter()
    }

    /// JSON object form, as handed to code generation.
    /// ```
    /// use autosched::ir::attr::{keys, AttrStore};
    /// let mut attrs = AttrStore::new();
    /// attrs.insert(keys::AUTO_UNROLL_MAX_STEP, 64);
    /// assert_eq!(attrs.to_json().to_string(), r#"{"auto_unroll_max_step":64}"#);
    /// ```
    pub fn to_json(&self) -> Value {
        serde_json::json!(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    const TILE_SIZES: AttrKey = AttrKey::new("tile_sizes");

    #[test]
    fn insert_and_get() {
        let mut attrs = AttrStore::new();
        assert!(attrs.is_empty());
        assert_eq!(attrs.insert(keys::AUTO_UNROLL_MAX_STEP, 16), None);
        assert_eq!(attrs.len(), 1);
        assert!(attrs.contains_key(keys::AUTO_UNROLL_MAX_STEP));
        assert_eq!(attrs.get_int(keys::AUTO_UNROLL_MAX_STEP).unwrap(), 16);

        // Explicit overwrite replaces the old value.
        assert_eq!(
            attrs.insert(keys::AUTO_UNROLL_MAX_STEP, 32),
            Some(AttrValue::Int(16))
        );
        assert_eq!(attrs.get_int(keys::AUTO_UNROLL_MAX_STEP).unwrap(), 32);
    }

    #[test]
    fn type_mismatch() {
        let mut attrs = AttrStore::new();
        attrs.insert(TILE_SIZES, vec![4, 8]);
        match attrs.get_int(TILE_SIZES) {
            Err(Error::AttrTypeMismatch {
                key,
                expected,
                found,
            }) => {
                assert_eq!(key, TILE_SIZES);
                assert_eq!(expected, "int");
                assert_eq!(found, "int list");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            attrs
                .get(TILE_SIZES)
                .unwrap()
                .as_int_list(TILE_SIZES)
                .unwrap(),
            &[4, 8]
        );
        assert!(attrs.get(TILE_SIZES).unwrap().as_bool(TILE_SIZES).is_err());
        assert!(attrs.get(TILE_SIZES).unwrap().as_str(TILE_SIZES).is_err());
    }

    #[test]
    fn missing() {
        let attrs = AttrStore::new();
        assert!(matches!(
            attrs.get_int(keys::AUTO_UNROLL_MAX_STEP),
            Err(Error::MissingAttr { .. })
        ));
    }

    #[test]
    fn to_json() {
        let mut attrs = AttrStore::new();
        attrs.insert(TILE_SIZES, vec![4, 8]);
        attrs.insert(keys::AUTO_UNROLL_MAX_STEP, 128);
        attrs.insert(AttrKey::new("vectorize"), true);
        attrs.insert(AttrKey::new("tag"), "matmul");
        assert_eq!(
            attrs.to_json(),
            json!({
                "auto_unroll_max_step": 128,
                "tile_sizes": [4, 8],
                "vectorize": true,
                "tag": "matmul",
            })
        );
        assert_eq!(serde_json::to_value(&attrs).unwrap(), attrs.to_json());
    }
}
