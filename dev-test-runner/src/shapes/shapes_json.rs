// Code generated by polyjson. DO NOT EDIT.

#![allow(dead_code, unused_imports)]

use super::*;

/// JSON encoding hook for `Shape` variants; declare it as a supertrait of `Shape`.
pub trait ShapeJson {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl ShapeJson for Triangle {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Triangle")
    }
}

impl ShapeJson for Square {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Square")
    }
}

impl ShapeJson for Polygon {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Polygon")
    }
}

impl ShapeJson for Circle {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Circle")
    }
}

impl ShapeJson for Union {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Union")
    }
}

impl ShapeJson for Empty {
    fn shape_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        polyjson::codec::encode_variant(self, "kind", "Empty")
    }
}

/// Decodes a `Shape` from JSON; `null` decodes to `None`.
pub fn decode_shape(value: serde_json::Value) -> Result<Option<Box<dyn Shape>>, polyjson::codec::DecodeError> {
    let Some((kind, fields)) = polyjson::codec::split_discriminant(value, "kind")? else {
        return Ok(None);
    };
    match kind.as_str() {
        "Triangle" => Ok(Some(Box::new(polyjson::codec::populate::<Triangle>(fields)?))),
        "Square" => Ok(Some(Box::new(polyjson::codec::populate::<Square>(fields)?))),
        "Polygon" => Ok(Some(Box::new(polyjson::codec::populate::<Polygon>(fields)?))),
        "Circle" => Ok(Some(Box::new(polyjson::codec::populate::<Circle>(fields)?))),
        "Union" => Ok(Some(Box::new(polyjson::codec::populate::<Union>(fields)?))),
        "Empty" => Ok(Some(Box::new(polyjson::codec::populate::<Empty>(fields)?))),
        other => Err(polyjson::codec::DecodeError::UnknownVariant {
            capability: "Shape".to_string(),
            value: other.to_string(),
        }),
    }
}

/// Encodes a `Shape` as JSON; `None` encodes to `null`.
pub fn encode_shape(value: Option<&dyn Shape>) -> Result<serde_json::Value, serde_json::Error> {
    match value {
        Some(value) => value.shape_json(),
        None => Ok(serde_json::Value::Null),
    }
}

pub fn unmarshal_shape_json(bytes: &[u8]) -> Result<Option<Box<dyn Shape>>, polyjson::codec::DecodeError> {
    decode_shape(polyjson::codec::parse(bytes)?)
}

pub fn marshal_shape_json(value: Option<&dyn Shape>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&encode_shape(value)?)
}

impl serde::Serialize for dyn Shape {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        let value = self.shape_json().map_err(S::Error::custom)?;
        serde::Serialize::serialize(&value, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Box<dyn Shape> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;
        let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
        polyjson::codec::required(decode_shape(value), "Shape").map_err(D::Error::custom)
    }
}

const _: fn() = || {
    fn json_codec<T: serde::Serialize + serde::de::DeserializeOwned>() {}
    json_codec::<Union>();
};

const _: fn() = || {
    fn json_codec<T: serde::Serialize + serde::de::DeserializeOwned>() {}
    json_codec::<Area>();
};

impl serde::Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error as _, SerializeMap as _};
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("size", &self.size)?;
        map.serialize_entry("shapes", &polyjson::codec::encode_sequence(&self.shapes, |item| encode_shape(item.as_deref())).map_err(S::Error::custom)?)?;
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;
        let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
        let mut fields = polyjson::codec::object_fields(value).map_err(D::Error::custom)?;
        Ok(Pattern {
            size: polyjson::codec::take_field(&mut fields, "size").map_err(D::Error::custom)?,
            shapes: polyjson::codec::decode_sequence(polyjson::codec::take_value(&mut fields, "shapes"), |item| decode_shape(item).map(|v| v.map(Into::into))).map_err(|err| D::Error::custom(err.in_field("shapes")))?,
        })
    }
}

impl serde::Serialize for NamedPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error as _, SerializeMap as _};
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("sizes", &self.sizes)?;
        map.serialize_entry("shapes", &polyjson::codec::encode_mapping(&self.shapes, |item| encode_shape(Some(&**item))).map_err(S::Error::custom)?)?;
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for NamedPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;
        let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
        let mut fields = polyjson::codec::object_fields(value).map_err(D::Error::custom)?;
        Ok(NamedPattern {
            sizes: polyjson::codec::take_field(&mut fields, "sizes").map_err(D::Error::custom)?,
            shapes: polyjson::codec::decode_mapping(polyjson::codec::take_value(&mut fields, "shapes"), |item| polyjson::codec::required(decode_shape(item), "Shape").map(Into::into)).map_err(|err| D::Error::custom(err.in_field("shapes")))?,
        })
    }
}

const _: fn() = || {
    fn json_codec<T: serde::Serialize + serde::de::DeserializeOwned>() {}
    json_codec::<ShapeShifter>();
};

impl serde::Serialize for Gallery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error as _, SerializeMap as _};
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("cover", &encode_shape(Some(&*self.cover)).map_err(S::Error::custom)?)?;
        map.serialize_entry("pinned", &encode_shape(self.pinned.as_deref()).map_err(S::Error::custom)?)?;
        map.serialize_entry("shared", &polyjson::codec::encode_sequence(&self.shared, |item| encode_shape(Some(&**item))).map_err(S::Error::custom)?)?;
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for Gallery {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;
        let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
        let mut fields = polyjson::codec::object_fields(value).map_err(D::Error::custom)?;
        Ok(Gallery {
            cover: polyjson::codec::required(decode_shape(polyjson::codec::take_value(&mut fields, "cover")), "Shape").map(Into::into).map_err(|err| D::Error::custom(err.in_field("cover")))?,
            pinned: decode_shape(polyjson::codec::take_value(&mut fields, "pinned")).map(|v| v.map(Into::into)).map_err(|err| D::Error::custom(err.in_field("pinned")))?,
            shared: polyjson::codec::decode_sequence(polyjson::codec::take_value(&mut fields, "shared"), |item| polyjson::codec::required(decode_shape(item), "Shape").map(Into::into)).map_err(|err| D::Error::custom(err.in_field("shared")))?,
        })
    }
}
