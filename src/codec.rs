//! Per-value-type wire encodings.
//!
//! Every storage endpoint family (`int-*`, `uint/*`, `float-*`, `str-*`,
//! `map-*`) is described by one [`Storage`] implementation. The façade in
//! [`Session`](crate::Session) is generic over it, so request execution is
//! written once for all value types.

use crate::{KvsError, MapValue, Result, Value};

/// Encode/decode capability for one remote storage.
pub trait Storage {
    /// Endpoint prefix, e.g. `int` for `int-put/{key}`.
    const PREFIX: &'static str;

    /// Value type held by the storage.
    type Value: Clone + Into<Value>;

    /// Serializes a value into a request body.
    fn encode(value: &Self::Value) -> Result<String>;

    /// Parses a successful response body.
    fn decode(body: &[u8]) -> std::result::Result<Self::Value, String>;

    /// Path segments addressing `verb` on this storage, before the key.
    fn operation(verb: &str) -> Vec<String> {
        vec![format!("{}-{verb}", Self::PREFIX)]
    }
}

/// Signed 32-bit integer storage. Values travel as decimal text.
#[derive(Clone, Copy, Debug)]
pub struct Int;

/// Unsigned 32-bit integer storage. Values travel as decimal text.
#[derive(Clone, Copy, Debug)]
pub struct Uint;

/// 32-bit float storage. Values travel as decimal text.
#[derive(Clone, Copy, Debug)]
pub struct Float;

/// String storage. Values travel as raw UTF-8 bytes.
#[derive(Clone, Copy, Debug)]
pub struct Str;

/// Map storage. Values travel as a compact JSON object.
#[derive(Clone, Copy, Debug)]
pub struct Map;

impl Storage for Int {
    const PREFIX: &'static str = "int";
    type Value = i32;

    fn encode(value: &i32) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(body: &[u8]) -> std::result::Result<i32, String> {
        parse_text(body, "integer")
    }
}

impl Storage for Uint {
    const PREFIX: &'static str = "uint";
    type Value = u32;

    fn encode(value: &u32) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(body: &[u8]) -> std::result::Result<u32, String> {
        parse_text(body, "unsigned integer")
    }

    // The service routes unsigned storage as `uint/<verb>/{key}`.
    fn operation(verb: &str) -> Vec<String> {
        vec![Self::PREFIX.to_owned(), verb.to_owned()]
    }
}

impl Storage for Float {
    const PREFIX: &'static str = "float";
    type Value = f32;

    fn encode(value: &f32) -> Result<String> {
        if !value.is_finite() {
            return Err(KvsError::Encode(format!(
                "non-finite float value '{value}' is unsupported"
            )));
        }
        Ok(value.to_string())
    }

    fn decode(body: &[u8]) -> std::result::Result<f32, String> {
        parse_text(body, "float")
    }
}

impl Storage for Str {
    const PREFIX: &'static str = "str";
    type Value = String;

    fn encode(value: &String) -> Result<String> {
        Ok(value.clone())
    }

    fn decode(body: &[u8]) -> std::result::Result<String, String> {
        decode_text(body)
    }
}

impl Storage for Map {
    const PREFIX: &'static str = "map";
    type Value = MapValue;

    fn encode(value: &MapValue) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|err| KvsError::Encode(format!("invalid map value: {err}")))
    }

    fn decode(body: &[u8]) -> std::result::Result<MapValue, String> {
        serde_json::from_slice(body).map_err(|err| {
            format!(
                "invalid map body '{}': {err}",
                String::from_utf8_lossy(body)
            )
        })
    }
}

/// Builds a map from loosely typed entries.
///
/// This encoding is lossy on purpose: entries whose key has no plain-text
/// form (nested maps, non-finite floats) are dropped instead of failing the
/// whole map. Returns the map and the number of dropped entries.
pub fn map_from_entries<I, K>(entries: I) -> (MapValue, usize)
where
    I: IntoIterator<Item = (K, String)>,
    K: Into<Value>,
{
    let mut map = MapValue::new();
    let mut dropped = 0;
    for (key, value) in entries {
        match key.into().as_plain_text() {
            Some(key) => {
                map.insert(key, value);
            }
            None => dropped += 1,
        }
    }

    #[cfg(feature = "tracing")]
    {
        if dropped > 0 {
            tracing::debug!(dropped, "dropped map entries without a plain-text key");
        }
    }

    (map, dropped)
}

pub(crate) fn decode_text(body: &[u8]) -> std::result::Result<String, String> {
    String::from_utf8(body.to_vec()).map_err(|err| format!("invalid UTF-8 body: {err}"))
}

pub(crate) fn parse_text<T>(body: &[u8], what: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = decode_text(body)?;
    let trimmed = text.trim();
    trimmed
        .parse::<T>()
        .map_err(|err| format!("invalid {what} body '{trimmed}': {err}"))
}

#[cfg(test)]
mod tests {
    use crate::{
        codec::{map_from_entries, Float, Int, Map, Storage, Str, Uint},
        KvsError, MapValue, Value,
    };

    #[test]
    fn integers_travel_as_decimal_text() {
        assert_eq!(Int::encode(&-42).expect("must encode"), "-42");
        assert_eq!(Int::decode(b"17\n").expect("must decode"), 17);
        assert_eq!(Uint::decode(b"4294967295").expect("must decode"), u32::MAX);
    }

    #[test]
    fn integer_parse_error_names_body() {
        let err = Int::decode(b"nope").expect_err("must fail");
        assert!(err.contains("'nope'"));
        assert!(Uint::decode(b"-1").is_err());
    }

    #[test]
    fn float_rejects_non_finite() {
        let err = Float::encode(&f32::INFINITY).expect_err("must fail");
        assert!(matches!(err, KvsError::Encode(_)));
        assert_eq!(Float::decode(b"1.5").expect("must decode"), 1.5);
    }

    #[test]
    fn float_text_round_trips_exactly() {
        let value = 0.1f32;
        let body = Float::encode(&value).expect("must encode");
        assert_eq!(Float::decode(body.as_bytes()).expect("must decode"), value);
    }

    #[test]
    fn strings_are_raw() {
        assert_eq!(Str::encode(&" a b ".to_owned()).expect("must encode"), " a b ");
        assert_eq!(Str::decode(b" a b ").expect("must decode"), " a b ");
        assert!(Str::decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn map_is_compact_json() {
        let map = MapValue::from([("name".to_owned(), "Jacob".to_owned())]);
        assert_eq!(Map::encode(&map).expect("must encode"), r#"{"name":"Jacob"}"#);
        assert_eq!(Map::decode(br#"{"name":"Jacob"}"#).expect("must decode"), map);
        assert!(Map::decode(b"[1,2]").is_err());
    }

    #[test]
    fn operation_segments_per_storage() {
        assert_eq!(Int::operation("put"), ["int-put"]);
        assert_eq!(Map::operation("del"), ["map-del"]);
        assert_eq!(Uint::operation("get"), ["uint", "get"]);
    }

    #[test]
    fn map_entries_drop_keys_without_text_form() {
        let (map, dropped) = map_from_entries([
            (Value::text("a"), "1".to_owned()),
            (Value::integer(2), "2".to_owned()),
            (Value::Map(MapValue::new()), "3".to_owned()),
            (Value::float(f64::NAN), "4".to_owned()),
        ]);
        assert_eq!(dropped, 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("2").map(String::as_str), Some("2"));
    }
}
