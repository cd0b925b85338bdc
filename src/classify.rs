//! Field classification: which record fields hold capability values, and in
//! what container shape.
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::{FieldDecl, RecordDecl, SourceModel, TypeExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Scalar,
    Sequence,
    Mapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecMode {
    /// The record derives serde; capability impls compose with it.
    Derive,
    /// Serialize/Deserialize are emitted for the record.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolymorphicField {
    pub name: String,
    /// Serialization tag name; empty means the declared field name.
    pub wire_name: String,
    pub capability: String,
    pub shape: FieldShape,
    /// The slot (or each element/value) admits JSON `null`.
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Plain,
    Skipped,
    Polymorphic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub name: String,
    /// Resolved key on the wire.
    pub wire_name: String,
    pub role: FieldRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    pub codec: CodecMode,
    pub polymorphic_fields: Vec<PolymorphicField>,
    /// Every declared field, in declaration order.
    pub layout: Vec<FieldSlot>,
}

impl StructDescriptor {
    pub fn field(&self, name: &str) -> Option<&PolymorphicField> {
        self.polymorphic_fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub structs: Vec<StructDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("{record}.{field}: `{ty}` holds `{capability}` in a shape that cannot be encoded")]
    UnsupportedShape {
        record: String,
        field: String,
        capability: String,
        ty: String,
    },
}

/// Scans every record for fields typed as one of `capabilities`.
///
/// Fields that mention a capability in any other shape (nested containers,
/// non-text keys, tuples) are reported as diagnostics, or fail the run when
/// `strict` is set.
pub fn classify_fields(
    model: &SourceModel,
    capabilities: &[&str],
    strict: bool,
) -> Result<Classification, ClassifyError> {
    let mut out = Classification::default();
    for record in model.records() {
        if let Some(descriptor) = classify_record(record, capabilities, strict, &mut out.diagnostics)? {
            tracing::debug!(
                record = %descriptor.name,
                fields = descriptor.polymorphic_fields.len(),
                codec = ?descriptor.codec,
                "classified record"
            );
            out.structs.push(descriptor);
        }
    }
    Ok(out)
}

fn classify_record(
    record: &RecordDecl,
    capabilities: &[&str],
    strict: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<StructDescriptor>, ClassifyError> {
    let mut polymorphic_fields = Vec::new();
    let mut layout = Vec::with_capacity(record.fields.len());

    for field in &record.fields {
        let (tag_name, skipped) = parse_tag(field);
        let wire_name = if tag_name.is_empty() {
            field.name.trim_start_matches("r#").to_string()
        } else {
            tag_name.to_string()
        };
        if skipped {
            layout.push(FieldSlot { name: field.name.clone(), wire_name, role: FieldRole::Skipped });
            continue;
        }

        let role = match classify_type(&field.ty, capabilities) {
            Some((capability, shape, nullable)) => {
                polymorphic_fields.push(PolymorphicField {
                    name: field.name.clone(),
                    wire_name: tag_name.to_string(),
                    capability: capability.to_string(),
                    shape,
                    nullable,
                });
                FieldRole::Polymorphic
            }
            None => {
                if let Some(capability) = capabilities.iter().find(|c| field.ty.mentions(c)) {
                    if strict {
                        return Err(ClassifyError::UnsupportedShape {
                            record: record.name.clone(),
                            field: field.name.clone(),
                            capability: capability.to_string(),
                            ty: field.ty.to_string(),
                        });
                    }
                    tracing::warn!(record = %record.name, field = %field.name, capability, "unsupported capability shape");
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::PJ0100UnsupportedShape,
                            format!("`{}` holds `{capability}` in a shape that is not classified", field.ty),
                        )
                        .at(&record.name, Some(field.name.as_str())),
                    );
                }
                FieldRole::Plain
            }
        };
        layout.push(FieldSlot { name: field.name.clone(), wire_name, role });
    }

    if polymorphic_fields.is_empty() {
        return Ok(None);
    }
    Ok(Some(StructDescriptor {
        name: record.name.clone(),
        type_params: record.type_params.clone(),
        codec: if record.derives_serde { CodecMode::Derive } else { CodecMode::Generated },
        polymorphic_fields,
        layout,
    }))
}

/// `(name, skipped)` from a field tag; name is the first comma-separated token.
fn parse_tag(field: &FieldDecl) -> (&str, bool) {
    match field.tag.as_deref() {
        None => ("", false),
        Some("-") => ("", true),
        Some(tag) => (tag.split(',').next().unwrap_or("").trim(), false),
    }
}

fn classify_type<'c>(ty: &TypeExpr, capabilities: &[&'c str]) -> Option<(&'c str, FieldShape, bool)> {
    if let Some((capability, nullable)) = capability_slot(ty, capabilities) {
        return Some((capability, FieldShape::Scalar, nullable));
    }
    match ty {
        TypeExpr::Sequence(elem) => {
            let (capability, nullable) = capability_slot(elem, capabilities)?;
            Some((capability, FieldShape::Sequence, nullable))
        }
        TypeExpr::Mapping { key, value } if **key == TypeExpr::Text => {
            let (capability, nullable) = capability_slot(value, capabilities)?;
            Some((capability, FieldShape::Mapping, nullable))
        }
        _ => None,
    }
}

/// A single capability value: `C` or `Option<C>` (nullable), or an owning
/// pointer to `C` (non-null).
fn capability_slot<'c>(ty: &TypeExpr, capabilities: &[&'c str]) -> Option<(&'c str, bool)> {
    let lookup = |name: &str| capabilities.iter().copied().find(|c| *c == name);
    match ty {
        TypeExpr::Named(name) => lookup(name).map(|c| (c, true)),
        TypeExpr::Pointer(inner) => lookup(inner.as_named()?).map(|c| (c, false)),
        TypeExpr::Optional(inner) => match &**inner {
            TypeExpr::Named(name) => lookup(name).map(|c| (c, true)),
            TypeExpr::Pointer(inner) => lookup(inner.as_named()?).map(|c| (c, true)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Decl, SourceFile};

    fn named(n: &str) -> Box<TypeExpr> {
        Box::new(TypeExpr::named(n))
    }

    fn boxed_dyn(n: &str) -> TypeExpr {
        TypeExpr::Optional(Box::new(TypeExpr::Pointer(named(n))))
    }

    fn field(name: &str, ty: TypeExpr, tag: Option<&str>) -> FieldDecl {
        FieldDecl { name: name.into(), ty, tag: tag.map(str::to_string) }
    }

    fn record(name: &str, derives_serde: bool, fields: Vec<FieldDecl>) -> Decl {
        Decl::Record(RecordDecl { name: name.into(), type_params: vec![], derives_serde, fields })
    }

    fn model(decls: Vec<Decl>) -> SourceModel {
        SourceModel { files: vec![SourceFile { path: None, decls }] }
    }

    #[test]
    fn scalar_sequence_mapping() {
        let m = model(vec![
            record("Area", true, vec![
                field("color", TypeExpr::Text, None),
                field("shape", boxed_dyn("Shape"), Some("shape,omitempty")),
            ]),
            record("Pattern", false, vec![
                field("size", TypeExpr::named("i64"), None),
                field("shapes", TypeExpr::Sequence(Box::new(boxed_dyn("Shape"))), None),
            ]),
            record("NamedPattern", false, vec![field(
                "shapes",
                TypeExpr::Mapping { key: Box::new(TypeExpr::Text), value: Box::new(TypeExpr::Pointer(named("Shape"))) },
                None,
            )]),
            record("Plain", true, vec![field("n", TypeExpr::named("i64"), None)]),
        ]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        assert!(c.diagnostics.is_empty());
        let names: Vec<_> = c.structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Area", "Pattern", "NamedPattern"]);

        let area = &c.structs[0];
        assert_eq!(area.codec, CodecMode::Derive);
        assert_eq!(
            area.polymorphic_fields,
            vec![PolymorphicField {
                name: "shape".into(),
                wire_name: "shape".into(),
                capability: "Shape".into(),
                shape: FieldShape::Scalar,
                nullable: true,
            }]
        );
        assert_eq!(area.layout[0].role, FieldRole::Plain);

        let pattern = c.structs[1].field("shapes").unwrap();
        assert_eq!((pattern.shape, pattern.nullable, pattern.wire_name.as_str()), (FieldShape::Sequence, true, ""));
        assert_eq!(c.structs[1].codec, CodecMode::Generated);

        let named = c.structs[2].field("shapes").unwrap();
        assert_eq!((named.shape, named.nullable), (FieldShape::Mapping, false));
    }

    #[test]
    fn skipped_fields_are_never_classified() {
        let m = model(vec![record("ShapeShifter", true, vec![
            field("from", boxed_dyn("Shape"), None),
            field("skip_me", boxed_dyn("Shape"), Some("-")),
        ])]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        let s = &c.structs[0];
        assert_eq!(s.polymorphic_fields.len(), 1);
        assert!(s.field("skip_me").is_none());
        assert_eq!(s.layout[1].role, FieldRole::Skipped);
    }

    #[test]
    fn only_resolved_capabilities_count() {
        let m = model(vec![record("Canvas", true, vec![
            field("brush", TypeExpr::named("Brush"), None),
            field("shape", TypeExpr::named("Shape"), None),
        ])]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        assert_eq!(c.structs[0].polymorphic_fields.len(), 1);
        assert_eq!(c.structs[0].polymorphic_fields[0].name, "shape");
        assert!(classify_fields(&m, &[], false).unwrap().structs.is_empty());
    }

    #[test]
    fn unsupported_shapes_are_reported() {
        let nested = TypeExpr::Sequence(Box::new(TypeExpr::Sequence(Box::new(boxed_dyn("Shape")))));
        let int_keys = TypeExpr::Mapping { key: named("i64"), value: Box::new(boxed_dyn("Shape")) };
        let m = model(vec![record("Grid", true, vec![
            field("rows", nested, None),
            field("by_id", int_keys, None),
            field("skipped", TypeExpr::Tuple(vec![TypeExpr::named("Shape")]), Some("-")),
        ])]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        assert!(c.structs.is_empty());
        assert_eq!(c.diagnostics.len(), 2);
        assert_eq!(c.diagnostics[0].code, DiagnosticCode::PJ0100UnsupportedShape);
        assert_eq!(c.diagnostics[1].field.as_deref(), Some("by_id"));

        let err = classify_fields(&m, &["Shape"], true).unwrap_err();
        let ClassifyError::UnsupportedShape { record, field, .. } = err;
        assert_eq!((record.as_str(), field.as_str()), ("Grid", "rows"));
    }

    #[test]
    fn borrowed_slots_are_unsupported() {
        let m = model(vec![record("View", false, vec![
            field("shape", TypeExpr::Borrowed(named("Shape")), None),
            field("label", TypeExpr::Borrowed(Box::new(TypeExpr::Text)), None),
        ])]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        assert!(c.structs.is_empty());
        assert_eq!(c.diagnostics.len(), 1);
        assert_eq!(c.diagnostics[0].field.as_deref(), Some("shape"));
        assert!(c.diagnostics[0].message.contains("&Shape"), "{}", c.diagnostics[0].message);
    }

    #[test]
    fn raw_identifiers_lose_their_prefix_on_the_wire() {
        let m = model(vec![record("Tagged", false, vec![field("r#type", boxed_dyn("Shape"), None)])]);
        let c = classify_fields(&m, &["Shape"], false).unwrap();
        assert_eq!(c.structs[0].layout[0].wire_name, "type");
        assert_eq!(c.structs[0].polymorphic_fields[0].wire_name, "");
    }
}
