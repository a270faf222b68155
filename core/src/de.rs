//! Deserialization helpers shared by the resource types.

use serde::{Deserialize, Deserializer};

/// Decodes an explicit `null` the same as a missing key: as `T::default()`.
/// Pair with `#[serde(default)]` so the key may also be absent.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
