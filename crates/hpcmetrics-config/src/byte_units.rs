// SPDX-License-Identifier: Apache-2.0

//! Support for byte units like "KB / KiB", "MB / MiB", "GB / GiB" in configuration files, used by
//! archive backend upload-buffer-size fields.

use byte_unit::Byte;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Value {
    Number(u64),
    String(String),
}

/// Deserializes an optional byte size that can be specified either as a number (in bytes)
/// or as a string with units (e.g. "1 KB", "2 MiB").
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };

    let (bytes, repr) = match value {
        Value::Number(value) => (u128::from(value), value.to_string()),
        Value::String(text) => {
            let parsed: Byte = text.parse().map_err(DeError::custom)?;
            (u128::from(parsed.as_u64()), text)
        }
    };

    if bytes > u128::from(u32::MAX) {
        return Err(DeError::custom(format!(
            "byte size '{repr}' ({bytes} bytes) exceeds u32::MAX ({} bytes)",
            u32::MAX
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok(Some(bytes as u32))
}
