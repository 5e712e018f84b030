//! Serde helpers for inbound payloads.
//!
//! With the `tracing` feature enabled, payload decoding reports unknown fields and the exact
//! path of a failing field, which is usually the first sign of a backend schema change.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A `serde_as` type that accepts a JSON string or integer as `String`.
///
/// Backend ids arrive as either (`"CH001"`, `42`). Use `#[serde_as(as = "StringFromAny")]`
/// or `#[serde_as(as = "Option<StringFromAny>")]`.
pub struct StringFromAny;

impl<'de> serde_with::DeserializeAs<'de, String> for StringFromAny {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use std::fmt;

        use serde::de::{self, Visitor};

        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an id as string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
                Ok(v.to_owned())
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<String, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
                Ok(v.to_string())
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
                Ok(v.to_string())
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

impl serde_with::SerializeAs<String> for StringFromAny {
    fn serialize_as<S>(source: &String, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(source)
    }
}

/// Decode the payload of inbound event `event`, logging unknown fields.
///
/// Unknown fields never fail decoding. On failure the offending path and value are logged
/// before the error is returned.
#[cfg(feature = "tracing")]
pub fn decode_payload<T: DeserializeOwned>(event: &str, value: Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(event, type_name = %type_name::<T>(), payload = %value, "decoding payload");

    let original = value.clone();
    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        // serde_ignored does not track paths of failures, re-run to find it
        let json = original.to_string();
        let de = &mut serde_json::Deserializer::from_str(&json);
        let path_result: Result<T, _> = serde_path_to_error::deserialize(de);
        if let Err(path_err) = path_result {
            let path = path_err.path().to_string();
            tracing::error!(
                event,
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(&original, &path)),
                error = %path_err.inner(),
                "payload decoding failed"
            );
        }
    })?;

    for path in unknown_paths {
        tracing::warn!(
            event,
            type_name = %type_name::<T>(),
            field = %path,
            value = %format_value(lookup_value(&original, &path)),
            "unknown field in payload"
        );
    }

    Ok(result)
}

/// Decode the payload of inbound event `event`.
#[cfg(not(feature = "tracing"))]
pub fn decode_payload<T: DeserializeOwned>(event: &str, value: Value) -> crate::Result<T> {
    let _ = event;
    Ok(serde_json::from_value(value)?)
}

/// Resolve a `serde_ignored` / `serde_path_to_error` path (`a.b[0].c`, `?` for options).
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty() && *segment != "?")
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "<unable to retrieve>".to_owned(), Value::to_string)
}
