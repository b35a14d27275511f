//! Common types used across ADN

use serde_json::{Map, Value};

/// A single parsed record: field name to value.
///
/// Records are produced by a file parser, moved into a batch on arrival and
/// never mutated afterwards. Field shape is not validated anywhere in the
/// batching path.
pub type Record = Map<String, Value>;

/// Build a record from `(field, value)` string pairs.
pub fn record_from_pairs<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Value::String(v.into())))
        .collect()
}
