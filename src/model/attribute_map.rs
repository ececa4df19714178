//! AttributeMap: the free-form key-value payload carried by nodes.

use std::collections::BTreeMap;
use super::Value;

/// Attribute names to values, kept in key order so inspection and export
/// are deterministic.
pub type AttributeMap = BTreeMap<String, Value>;

/// Build an attribute map from (key, value) pairs.
pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> AttributeMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
