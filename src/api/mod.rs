use serde::{Deserialize, Deserializer};

pub mod attendance;
pub mod leave_request;
pub mod qr_code;
pub mod shift;
pub mod user;

/// Tells an explicit `null` (`Some(None)`) from a missing field (`None`).
/// Use together with `#[serde(default)]`.
pub(crate) fn explicit<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}
