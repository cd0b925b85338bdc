//! Runtime support for generated codecs.
//!
//! Generated modules call into these helpers; they are plain functions over
//! `serde_json::Value` so the generated text stays small.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::path_de::{self, PathError};

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing or non-string discriminant field {field:?}")]
    DiscriminantMissing { field: String },
    #[error("unknown {capability} variant {value:?}")]
    UnknownVariant { capability: String, value: String },
    #[error("{capability} value must not be null")]
    NullValue { capability: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedShape { expected: &'static str, found: &'static str },
    #[error("missing field {field:?}")]
    MissingField { field: String },
    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },
    #[error("{field}: {source}")]
    Field { field: String, source: Box<DecodeError> },
}

impl DecodeError {
    /// Wraps the error with the field (or index, or key) it happened under.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        DecodeError::Field { field: field.into(), source: Box::new(self) }
    }

    /// The innermost error, below any field wrapping.
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<PathError> for DecodeError {
    fn from(err: PathError) -> Self {
        DecodeError::Json { path: err.path, message: err.message }
    }
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn parse(bytes: &[u8]) -> Result<Value, DecodeError> {
    Ok(path_de::from_slice_with_path(bytes)?)
}

/// Reads and removes the discriminant. `null` yields `None`.
pub fn split_discriminant(value: Value, discriminant: &str) -> Result<Option<(String, Fields)>, DecodeError> {
    let missing = || DecodeError::DiscriminantMissing { field: discriminant.to_string() };
    let mut fields = match value {
        Value::Null => return Ok(None),
        Value::Object(fields) => fields,
        _ => return Err(missing()),
    };
    match fields.remove(discriminant) {
        Some(Value::String(kind)) => Ok(Some((kind, fields))),
        _ => Err(missing()),
    }
}

/// Decodes a variant from its own fields (discriminant already removed).
/// No fields left also reads as `null`, which is how unit structs decode.
pub fn populate<T: DeserializeOwned>(fields: Fields) -> Result<T, DecodeError> {
    let empty = fields.is_empty();
    match path_de::from_value_with_path(Value::Object(fields)) {
        Ok(variant) => Ok(variant),
        Err(err) if empty => serde_json::from_value(Value::Null).map_err(|_| err.into()),
        Err(err) => Err(err.into()),
    }
}

/// Encodes a variant as an object with the discriminant as its first key.
pub fn encode_variant<T: Serialize + ?Sized>(
    variant: &T,
    discriminant: &str,
    wire_name: &str,
) -> Result<Value, serde_json::Error> {
    use serde::ser::Error as _;

    let fields = match serde_json::to_value(variant)? {
        Value::Object(fields) => fields,
        // unit struct
        Value::Null => Fields::new(),
        other => {
            return Err(serde_json::Error::custom(format!(
                "variant {wire_name} must encode as a JSON object, not {}",
                kind_of(&other)
            )));
        }
    };
    if fields.contains_key(discriminant) {
        return Err(serde_json::Error::custom(format!(
            "variant {wire_name} has its own field named {discriminant:?}"
        )));
    }
    let mut out = Fields::with_capacity(fields.len() + 1);
    out.insert(discriminant.to_string(), Value::String(wire_name.to_string()));
    out.extend(fields);
    Ok(Value::Object(out))
}

/// Rejects `null` for a non-nullable capability slot.
pub fn required<T>(decoded: Result<Option<T>, DecodeError>, capability: &str) -> Result<T, DecodeError> {
    decoded?.ok_or_else(|| DecodeError::NullValue { capability: capability.to_string() })
}

pub fn object_fields(value: Value) -> Result<Fields, DecodeError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(DecodeError::UnexpectedShape { expected: "object", found: kind_of(&other) }),
    }
}

/// Removes `key`; an absent key reads as `null`.
pub fn take_value(fields: &mut Fields, key: &str) -> Value {
    fields.remove(key).unwrap_or(Value::Null)
}

/// Removes and decodes a plain field. An absent key decodes as `null` when the
/// type allows it (`Option`, unit), otherwise it is a [`DecodeError::MissingField`].
pub fn take_field<T: DeserializeOwned>(fields: &mut Fields, key: &str) -> Result<T, DecodeError> {
    match fields.remove(key) {
        Some(value) => path_de::from_value_with_path(value).map_err(|err| DecodeError::from(err).in_field(key)),
        None => serde_json::from_value(Value::Null)
            .map_err(|_| DecodeError::MissingField { field: key.to_string() }),
    }
}

pub fn encode_sequence<'a, T: 'a, I>(
    items: I,
    encode: impl FnMut(&'a T) -> Result<Value, serde_json::Error>,
) -> Result<Value, serde_json::Error>
where
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(encode).collect::<Result<Vec<_>, _>>().map(Value::Array)
}

/// Keys are written in sorted order.
pub fn encode_mapping<'a, T: 'a, M>(
    entries: M,
    mut encode: impl FnMut(&'a T) -> Result<Value, serde_json::Error>,
) -> Result<Value, serde_json::Error>
where
    M: IntoIterator<Item = (&'a String, &'a T)>,
{
    let mut entries: Vec<_> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = Fields::with_capacity(entries.len());
    for (key, item) in entries {
        out.insert(key.clone(), encode(item)?);
    }
    Ok(Value::Object(out))
}

/// `null` decodes to an empty collection.
pub fn decode_sequence<T, S: FromIterator<T>>(
    value: Value,
    mut decode: impl FnMut(Value) -> Result<T, DecodeError>,
) -> Result<S, DecodeError> {
    match value {
        Value::Null => Ok(std::iter::empty().collect()),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| decode(item).map_err(|err| err.in_field(index.to_string())))
            .collect(),
        other => Err(DecodeError::UnexpectedShape { expected: "array", found: kind_of(&other) }),
    }
}

/// `null` decodes to an empty collection.
pub fn decode_mapping<T, M: FromIterator<(String, T)>>(
    value: Value,
    mut decode: impl FnMut(Value) -> Result<T, DecodeError>,
) -> Result<M, DecodeError> {
    match value {
        Value::Null => Ok(std::iter::empty().collect()),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, item)| match decode(item) {
                Ok(decoded) => Ok((key, decoded)),
                Err(err) => Err(err.in_field(key)),
            })
            .collect(),
        other => Err(DecodeError::UnexpectedShape { expected: "object", found: kind_of(&other) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Square {
        top_left: [i64; 2],
        width: i64,
        height: i64,
    }

    fn square() -> Square {
        Square { top_left: [2, 3], width: 2, height: 2 }
    }

    #[test]
    fn discriminant_comes_first() {
        let value = encode_variant(&square(), "kind", "Square").unwrap();
        assert_eq!(value, json!({"kind": "Square", "top_left": [2, 3], "width": 2, "height": 2}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "kind");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dot;

    #[test]
    fn unit_variants_carry_only_the_discriminant() {
        let value = encode_variant(&Dot, "kind", "Dot").unwrap();
        assert_eq!(value, json!({"kind": "Dot"}));
        let (kind, fields) = split_discriminant(value, "kind").unwrap().unwrap();
        assert_eq!(kind, "Dot");
        assert_eq!(populate::<Dot>(fields), Ok(Dot));

        let err = populate::<Square>(Fields::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref message, .. } if message.contains("top_left")), "{err}");
    }

    #[test]
    fn encode_rejects_non_objects_and_collisions() {
        assert!(encode_variant(&3, "kind", "Three").is_err());
        assert!(encode_variant(&json!({"kind": 1}), "kind", "K").is_err());
    }

    #[test]
    fn split_then_populate() {
        let value = json!({"kind": "Square", "top_left": [2, 3], "width": 2, "height": 2});
        let (kind, fields) = split_discriminant(value, "kind").unwrap().unwrap();
        assert_eq!(kind, "Square");
        assert_eq!(populate::<Square>(fields).unwrap(), square());
    }

    #[test]
    fn split_edge_cases() {
        assert_eq!(split_discriminant(Value::Null, "kind"), Ok(None));
        let missing = DecodeError::DiscriminantMissing { field: "kind".into() };
        assert_eq!(split_discriminant(json!({"x": 1}), "kind"), Err(missing.clone()));
        assert_eq!(split_discriminant(json!({"kind": 7}), "kind"), Err(missing.clone()));
        assert_eq!(split_discriminant(json!([1]), "kind"), Err(missing));
    }

    #[test]
    fn populate_reports_the_path() {
        let fields = object_fields(json!({"top_left": [2, "x"], "width": 2, "height": 2})).unwrap();
        let err = populate::<Square>(fields).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref path, .. } if path == "top_left[1]"), "{err}");
    }

    #[test]
    fn required_rejects_null() {
        assert_eq!(required(Ok(Some(1)), "Shape"), Ok(1));
        assert_eq!(required::<i32>(Ok(None), "Shape"), Err(DecodeError::NullValue { capability: "Shape".into() }));
    }

    #[test]
    fn take_field_defaults_options() {
        let mut fields = object_fields(json!({"size": 3, "bad": "x"})).unwrap();
        assert_eq!(take_field::<i64>(&mut fields, "size"), Ok(3));
        assert_eq!(take_field::<Option<i64>>(&mut fields, "absent"), Ok(None));
        assert_eq!(
            take_field::<i64>(&mut fields, "absent"),
            Err(DecodeError::MissingField { field: "absent".into() })
        );
        let err = take_field::<i64>(&mut fields, "bad").unwrap_err();
        assert!(matches!(err, DecodeError::Field { ref field, .. } if field == "bad"));
        assert!(fields.is_empty());
        assert_eq!(take_value(&mut fields, "gone"), Value::Null);
    }

    #[test]
    fn containers() {
        let items = vec![Some(1), None, Some(3)];
        let encoded = encode_sequence(&items, |item| Ok(json!(item))).unwrap();
        assert_eq!(encoded, json!([1, null, 3]));

        let mut map = std::collections::HashMap::new();
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 1);
        let encoded = encode_mapping(&map, |item| Ok(json!(item))).unwrap();
        assert_eq!(serde_json::to_string(&encoded).unwrap(), r#"{"a":1,"b":2}"#);

        let decoded: Vec<i64> = decode_sequence(json!([1, 2]), |v| Ok(v.as_i64().unwrap_or_default())).unwrap();
        assert_eq!(decoded, [1, 2]);
        let decoded: BTreeMap<String, i64> = decode_mapping(Value::Null, |_| Ok(0)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn container_errors_name_the_position() {
        let fail = |v: Value| -> Result<i64, DecodeError> {
            v.as_i64().ok_or(DecodeError::UnexpectedShape { expected: "number", found: kind_of(&v) })
        };
        let err = decode_sequence::<_, Vec<i64>>(json!([1, "x"]), fail).unwrap_err();
        assert!(matches!(err, DecodeError::Field { ref field, .. } if field == "1"));
        assert_eq!(err.to_string(), "1: expected number, found string");

        let err = decode_mapping::<_, BTreeMap<String, i64>>(json!({"a": true}), fail).unwrap_err();
        assert!(matches!(err.root(), DecodeError::UnexpectedShape { found: "boolean", .. }));

        let err = decode_sequence::<i64, Vec<i64>>(json!({"a": 1}), fail).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedShape { expected: "array", found: "object" });
    }
}
