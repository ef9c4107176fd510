use serde::{Deserialize, Deserializer};

// Custom deserializer distinguishing an absent field from an explicit null.
// With `#[serde(default, deserialize_with = "double_option")]` on an
// Option<Option<T>> field: absent -> None, null -> Some(None),
// value -> Some(Some(v)). Plain serde collapses null into the outer None.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
