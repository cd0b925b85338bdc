// Language-neutral source model. Read-only input of the core.
//
// The Rust loader (`lower`) produces it from `syn` trees; an external loader
// can hand the same shape over as JSON.

use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceModel {
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum Decl {
    Capability(CapabilityDecl),
    Record(RecordDecl),
    Function(FunctionDecl),
}

/// An abstract interface (a trait) shared by variant types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDecl {
    pub name: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeExpr>,
    #[serde(default)]
    pub results: Vec<TypeExpr>,
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Has a default body, so implementors never have to declare it.
    #[serde(default)]
    pub provided: bool,
    /// Not externally visible.
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<String>,
    /// The record brings its own serde impls.
    #[serde(default)]
    pub derives_serde: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    /// Serialization tag: `name[,options]`, or `-` to exclude the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<TypeExpr>,
    /// Trait the function implements, when it sits in a trait impl.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    Text,
    Named(String),
    Optional(Box<TypeExpr>),
    /// Owning pointer: `Box`, `Rc`, `Arc`.
    Pointer(Box<TypeExpr>),
    /// Reference or raw pointer.
    Borrowed(Box<TypeExpr>),
    Sequence(Box<TypeExpr>),
    Mapping { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Array(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Generic { name: String, args: Vec<TypeExpr> },
    Opaque(String),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    /// The plain type name, if this is one.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Whether `name` occurs anywhere inside this type.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            TypeExpr::Text | TypeExpr::Opaque(_) => false,
            TypeExpr::Named(n) => n == name,
            TypeExpr::Optional(inner)
            | TypeExpr::Pointer(inner)
            | TypeExpr::Borrowed(inner)
            | TypeExpr::Sequence(inner)
            | TypeExpr::Array(inner) => inner.mentions(name),
            TypeExpr::Mapping { key, value } => key.mentions(name) || value.mentions(name),
            TypeExpr::Tuple(elems) => elems.iter().any(|t| t.mentions(name)),
            TypeExpr::Generic { name: n, args } => n == name || args.iter().any(|t| t.mentions(name)),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 { f.write_str(", ")?; }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            TypeExpr::Text => f.write_str("String"),
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Optional(inner) => write!(f, "Option<{inner}>"),
            TypeExpr::Pointer(inner) => write!(f, "Box<{inner}>"),
            TypeExpr::Borrowed(inner) => write!(f, "&{inner}"),
            TypeExpr::Sequence(inner) => write!(f, "Vec<{inner}>"),
            TypeExpr::Mapping { key, value } => write!(f, "Map<{key}, {value}>"),
            TypeExpr::Array(inner) => write!(f, "[{inner}]"),
            TypeExpr::Tuple(elems) => {
                f.write_str("(")?;
                list(f, elems)?;
                f.write_str(")")
            }
            TypeExpr::Generic { name, args } => {
                write!(f, "{name}<")?;
                list(f, args)?;
                f.write_str(">")
            }
            TypeExpr::Opaque(text) => f.write_str(text),
        }
    }
}

impl SourceModel {
    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|file| file.decls.is_empty())
    }

    /// Every declaration, files first, then declaration order.
    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.files.iter().flat_map(|file| file.decls.iter())
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &CapabilityDecl> {
        self.decls().filter_map(|decl| match decl {
            Decl::Capability(c) => Some(c),
            _ => None,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDecl> {
        self.decls().filter_map(|decl| match decl {
            Decl::Record(r) => Some(r),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls().filter_map(|decl| match decl {
            Decl::Function(f) => Some(f),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_form_is_readable() {
        let src = r#"{
            "files": [{
                "decls": [
                    {"decl": "capability", "name": "Shape", "operations": [{"name": "isShape", "hidden": true}]},
                    {"decl": "record", "name": "Pattern", "fields": [
                        {"name": "Shapes", "ty": {"sequence": {"named": "Shape"}}, "tag": "shapes"},
                        {"name": "ByName", "ty": {"mapping": {"key": "text", "value": {"named": "Shape"}}}}
                    ]},
                    {"decl": "function", "name": "isShape", "receiver": {"named": "Square"}}
                ]
            }]
        }"#;
        let model: SourceModel = serde_json::from_str(src).unwrap();
        assert_eq!(model.capabilities().count(), 1);
        let record = model.records().next().unwrap();
        assert_eq!(record.fields[0].ty, TypeExpr::Sequence(Box::new(TypeExpr::named("Shape"))));
        assert_eq!(record.fields[1].ty.to_string(), "Map<String, Shape>");
        let function = model.functions().next().unwrap();
        assert_eq!(function.receiver.as_ref().and_then(TypeExpr::as_named), Some("Square"));
    }

    #[test]
    fn mentions_looks_through_containers() {
        let ty = TypeExpr::Sequence(Box::new(TypeExpr::Sequence(Box::new(TypeExpr::named("Shape")))));
        assert!(ty.mentions("Shape"));
        assert!(!ty.mentions("Circle"));
        assert_eq!(ty.to_string(), "Vec<Vec<Shape>>");
    }

    #[test]
    fn files_without_declarations_are_empty() {
        let model = SourceModel { files: vec![SourceFile::default()] };
        assert!(model.is_empty());
    }
}
