use super::{Codegen, lit, snake_case};
use crate::resolve::TypeDescriptor;

impl Codegen {
    pub(super) fn emit_capability(&mut self, t: &TypeDescriptor) {
        let rt = self.rt().to_string();
        let cap = t.capability.as_str();
        let snake = snake_case(cap);
        let hook = format!("{cap}Json");
        let hook_fn = format!("{snake}_json");
        let disc = lit(&t.discriminant);
        let value_sig = "Result<serde_json::Value, serde_json::Error>";
        let decoded = format!("Result<Option<Box<dyn {cap}>>, {rt}::codec::DecodeError>");

        self.line(format!("/// JSON encoding hook for `{cap}` variants; declare it as a supertrait of `{cap}`."));
        self.open(format!("pub trait {hook} {{"));
        self.line(format!("fn {hook_fn}(&self) -> {value_sig};"));
        self.close("}");

        for variant in &t.variants {
            self.blank();
            self.open(format!("impl {hook} for {} {{", variant.name));
            self.open(format!("fn {hook_fn}(&self) -> {value_sig} {{"));
            self.line(format!("{rt}::codec::encode_variant(self, {disc}, {})", lit(&variant.wire_name)));
            self.close("}");
            self.close("}");
        }

        self.blank();
        self.line(format!("/// Decodes a `{cap}` from JSON; `null` decodes to `None`."));
        self.open(format!("pub fn decode_{snake}(value: serde_json::Value) -> {decoded} {{"));
        self.open(format!("let Some((kind, fields)) = {rt}::codec::split_discriminant(value, {disc})? else {{"));
        self.line("return Ok(None);");
        self.close("};");
        self.open("match kind.as_str() {");
        for variant in &t.variants {
            self.line(format!(
                "{} => Ok(Some(Box::new({rt}::codec::populate::<{}>(fields)?))),",
                lit(&variant.wire_name),
                variant.name
            ));
        }
        self.open(format!("other => Err({rt}::codec::DecodeError::UnknownVariant {{"));
        self.line(format!("capability: {}.to_string(),", lit(cap)));
        self.line("value: other.to_string(),");
        self.close("}),");
        self.close("}");
        self.close("}");

        self.blank();
        self.line(format!("/// Encodes a `{cap}` as JSON; `None` encodes to `null`."));
        self.open(format!("pub fn encode_{snake}(value: Option<&dyn {cap}>) -> {value_sig} {{"));
        self.open("match value {");
        self.line(format!("Some(value) => value.{hook_fn}(),"));
        self.line("None => Ok(serde_json::Value::Null),");
        self.close("}");
        self.close("}");

        self.blank();
        self.open(format!("pub fn unmarshal_{snake}_json(bytes: &[u8]) -> {decoded} {{"));
        self.line(format!("decode_{snake}({rt}::codec::parse(bytes)?)"));
        self.close("}");

        self.blank();
        self.open(format!(
            "pub fn marshal_{snake}_json(value: Option<&dyn {cap}>) -> Result<Vec<u8>, serde_json::Error> {{"
        ));
        self.line(format!("serde_json::to_vec(&encode_{snake}(value)?)"));
        self.close("}");

        self.blank();
        self.open(format!("impl serde::Serialize for dyn {cap} {{"));
        self.open("fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {");
        self.line("use serde::ser::Error as _;");
        self.line(format!("let value = self.{hook_fn}().map_err(S::Error::custom)?;"));
        self.line("serde::Serialize::serialize(&value, serializer)");
        self.close("}");
        self.close("}");

        self.blank();
        self.open(format!("impl<'de> serde::Deserialize<'de> for Box<dyn {cap}> {{"));
        self.open("fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {");
        self.line("use serde::de::Error as _;");
        self.line("let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;");
        self.line(format!("{rt}::codec::required(decode_{snake}(value), {}).map_err(D::Error::custom)", lit(cap)));
        self.close("}");
        self.close("}");
    }
}
