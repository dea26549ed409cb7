use std::borrow::Cow;

use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// `#RRGGBB` into its three channels.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    match parse_hex_color(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("hex_color")
            .with_message(Cow::Borrowed("Color must be a 6-digit hex value such as #1a2b3c"))),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies. Pair with `#[serde(default)]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
