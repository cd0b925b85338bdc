//! Rust code generation for resolved capabilities and classified records.
//!
//! The output is one module: per capability a `<Cap>Json` hook trait, the
//! decode/encode entry points and serde impls for `dyn Cap`; per record either
//! a compile-time composition check (`derive`) or full serde impls (`generated`).
mod capability;
mod record;

use std::collections::HashMap;

use crate::classify::StructDescriptor;
use crate::config::{DEFAULT_RUNTIME_CRATE, DEFAULT_SOURCE_MODULE, GenerateConfig};
use crate::resolve::TypeDescriptor;

pub const HEADER: &str = "// Code generated by polyjson. DO NOT EDIT.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("record `{record}` is generic; derive serde for it instead of generating its codec")]
    GenericRecord { record: String },
    #[error("{record}.{field} refers to capability `{capability}`, which was not resolved")]
    UnknownCapability {
        record: String,
        field: String,
        capability: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Path the generated code reaches `codec` through.
    pub runtime_crate: String,
    pub source_module: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(),
            source_module: DEFAULT_SOURCE_MODULE.to_string(),
        }
    }
}

impl From<&GenerateConfig> for CodegenOptions {
    fn from(config: &GenerateConfig) -> Self {
        Self {
            runtime_crate: config.runtime_crate.clone(),
            source_module: config.source_module.clone(),
        }
    }
}

pub struct Codegen {
    options: CodegenOptions,
    buf: String,
    depth: usize,
}

impl Codegen {
    pub fn new(options: CodegenOptions) -> Self {
        Self { options, buf: String::new(), depth: 0 }
    }

    /// Emits capabilities in the given order, then records in the given order.
    pub fn emit(&mut self, types: &[TypeDescriptor], structs: &[StructDescriptor]) -> Result<(), EmitError> {
        let snake_names: HashMap<&str, String> = types
            .iter()
            .map(|t| (t.capability.as_str(), snake_case(&t.capability)))
            .collect();
        for s in structs {
            for field in &s.polymorphic_fields {
                if !snake_names.contains_key(field.capability.as_str()) {
                    return Err(EmitError::UnknownCapability {
                        record: s.name.clone(),
                        field: field.name.clone(),
                        capability: field.capability.clone(),
                    });
                }
            }
        }

        self.line(HEADER);
        self.blank();
        self.line("#![allow(dead_code, unused_imports)]");
        self.blank();
        self.line(format!("use {}::*;", self.options.source_module));

        for t in types {
            self.blank();
            self.emit_capability(t);
        }
        for s in structs {
            self.emit_record(s, &snake_names)?;
        }
        Ok(())
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    fn rt(&self) -> &str {
        &self.options.runtime_crate
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str("    ");
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }
}

/// `NamedPattern` → `named_pattern`, `HTTPShape` → `http_shape`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A Rust string literal for `text`.
fn lit(text: &str) -> String {
    format!("{text:?}")
}
