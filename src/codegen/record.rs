use std::collections::HashMap;

use super::{Codegen, EmitError, lit};
use crate::classify::{CodecMode, FieldRole, FieldShape, PolymorphicField, StructDescriptor};

impl Codegen {
    pub(super) fn emit_record(
        &mut self,
        s: &StructDescriptor,
        snake_names: &HashMap<&str, String>,
    ) -> Result<(), EmitError> {
        match s.codec {
            // a generic record cannot be named without its parameters
            CodecMode::Derive if !s.type_params.is_empty() => Ok(()),
            CodecMode::Derive => {
                self.blank();
                self.open("const _: fn() = || {");
                self.line("fn json_codec<T: serde::Serialize + serde::de::DeserializeOwned>() {}");
                self.line(format!("json_codec::<{}>();", s.name));
                self.close("};");
                Ok(())
            }
            CodecMode::Generated => {
                if !s.type_params.is_empty() {
                    return Err(EmitError::GenericRecord { record: s.name.clone() });
                }
                self.blank();
                self.emit_serialize(s, snake_names);
                self.blank();
                self.emit_deserialize(s, snake_names);
                Ok(())
            }
        }
    }

    fn emit_serialize(&mut self, s: &StructDescriptor, snake_names: &HashMap<&str, String>) {
        let rt = self.rt().to_string();
        let written = s.layout.iter().filter(|slot| slot.role != FieldRole::Skipped).count();

        self.open(format!("impl serde::Serialize for {} {{", s.name));
        self.open("fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {");
        self.line("use serde::ser::{Error as _, SerializeMap as _};");
        self.line(format!("let mut map = serializer.serialize_map(Some({written}))?;"));
        for slot in &s.layout {
            let key = lit(&slot.wire_name);
            let field = &slot.name;
            match slot.role {
                FieldRole::Skipped => {}
                FieldRole::Plain => self.line(format!("map.serialize_entry({key}, &self.{field})?;")),
                FieldRole::Polymorphic => {
                    let Some(pf) = s.field(field) else { continue };
                    let encode = format!("encode_{}", snake_names[pf.capability.as_str()]);
                    let item = if pf.nullable {
                        format!("{encode}(item.as_deref())")
                    } else {
                        format!("{encode}(Some(&**item))")
                    };
                    let value = match pf.shape {
                        FieldShape::Scalar if pf.nullable => format!("{encode}(self.{field}.as_deref())"),
                        FieldShape::Scalar => format!("{encode}(Some(&*self.{field}))"),
                        FieldShape::Sequence => format!("{rt}::codec::encode_sequence(&self.{field}, |item| {item})"),
                        FieldShape::Mapping => format!("{rt}::codec::encode_mapping(&self.{field}, |item| {item})"),
                    };
                    self.line(format!("map.serialize_entry({key}, &{value}.map_err(S::Error::custom)?)?;"));
                }
            }
        }
        self.line("map.end()");
        self.close("}");
        self.close("}");
    }

    fn emit_deserialize(&mut self, s: &StructDescriptor, snake_names: &HashMap<&str, String>) {
        let rt = self.rt().to_string();

        self.open(format!("impl<'de> serde::Deserialize<'de> for {} {{", s.name));
        self.open("fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {");
        self.line("use serde::de::Error as _;");
        self.line("let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;");
        self.line(format!("let mut fields = {rt}::codec::object_fields(value).map_err(D::Error::custom)?;"));
        self.open(format!("Ok({} {{", s.name));
        for slot in &s.layout {
            let key = lit(&slot.wire_name);
            let field = &slot.name;
            match slot.role {
                FieldRole::Skipped => self.line(format!("{field}: Default::default(),")),
                FieldRole::Plain => self.line(format!(
                    "{field}: {rt}::codec::take_field(&mut fields, {key}).map_err(D::Error::custom)?,"
                )),
                FieldRole::Polymorphic => {
                    let Some(pf) = s.field(field) else { continue };
                    let decode = decode_expr(&rt, pf, &snake_names[pf.capability.as_str()], &key);
                    self.line(format!("{field}: {decode}.map_err(|err| D::Error::custom(err.in_field({key})))?,"));
                }
            }
        }
        self.close("})");
        self.close("}");
        self.close("}");
    }
}

/// Decoders yield `Box<dyn C>`; `Into` carries it over to `Rc`/`Arc` slots.
fn decode_expr(rt: &str, pf: &PolymorphicField, snake: &str, key: &str) -> String {
    let taken = format!("{rt}::codec::take_value(&mut fields, {key})");
    let capability = lit(&pf.capability);
    let element = if pf.nullable {
        format!("|item| decode_{snake}(item).map(|v| v.map(Into::into))")
    } else {
        format!("|item| {rt}::codec::required(decode_{snake}(item), {capability}).map(Into::into)")
    };
    match pf.shape {
        FieldShape::Scalar if pf.nullable => format!("decode_{snake}({taken}).map(|v| v.map(Into::into))"),
        FieldShape::Scalar => format!("{rt}::codec::required(decode_{snake}({taken}), {capability}).map(Into::into)"),
        FieldShape::Sequence => format!("{rt}::codec::decode_sequence({taken}, {element})"),
        FieldShape::Mapping => format!("{rt}::codec::decode_mapping({taken}, {element})"),
    }
}
