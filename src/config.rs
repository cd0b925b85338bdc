//! Generation settings: which capabilities to resolve and how to emit them.
//!
//! A capability is given on the command line as
//! `Name[@discriminant][:Variant[=wire],...]`, e.g. `Shape:Square=sq,Circle`.
use std::collections::HashSet;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resolve::MarkerRule;

pub const DEFAULT_DISCRIMINANT: &str = "kind";
pub const DEFAULT_RUNTIME_CRATE: &str = "polyjson";
pub const DEFAULT_SOURCE_MODULE: &str = "super";

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles")
});

static MODULE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("module path pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("empty capability specification")]
    Empty,
    #[error("{0:?} is not a valid identifier")]
    InvalidName(String),
    #[error("{0:?} is not a valid discriminant field name")]
    InvalidDiscriminant(String),
    #[error("invalid variant mapping {0:?}, expected `Variant` or `Variant=wire`")]
    InvalidEntry(String),
    #[error("{0:?} is not a valid module path")]
    InvalidModulePath(String),
    #[error("capability {0:?} is listed more than once")]
    DuplicateCapability(String),
}

/// One capability to resolve, with its variant-name → wire-name remap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    /// Overrides [`GenerateConfig::discriminant`] for this capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminant: Option<String>,
    #[serde(default)]
    pub remap: IndexMap<String, String>,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn remap(mut self, variant: impl Into<String>, wire_name: impl Into<String>) -> Self {
        self.remap.insert(variant.into(), wire_name.into());
        self
    }
}

impl FromStr for CapabilitySpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SpecError::Empty);
        }
        let (head, entries) = match s.split_once(':') {
            Some((head, entries)) => (head, entries),
            None => (s, ""),
        };
        let (name, discriminant) = match head.split_once('@') {
            Some((name, discriminant)) => {
                if discriminant.is_empty() || discriminant.contains(['"', '\\']) {
                    return Err(SpecError::InvalidDiscriminant(discriminant.to_string()));
                }
                (name, Some(discriminant.to_string()))
            }
            None => (head, None),
        };
        if !IDENT.is_match(name) {
            return Err(SpecError::InvalidName(name.to_string()));
        }

        let mut remap = IndexMap::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (variant, wire_name) = match entry.split_once('=') {
                Some((variant, wire_name)) => (variant.trim(), wire_name.trim()),
                None => (entry, entry),
            };
            if !IDENT.is_match(variant) || wire_name.is_empty() || wire_name.contains('=') {
                return Err(SpecError::InvalidEntry(entry.to_string()));
            }
            remap.insert(variant.to_string(), wire_name.to_string());
        }

        Ok(Self { name: name.to_string(), discriminant, remap })
    }
}

/// Everything one generation run needs besides the source model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// In input order; emission follows it.
    pub capabilities: Vec<CapabilitySpec>,
    pub discriminant: String,
    pub marker_rule: MarkerRule,
    /// Turn unsupported container shapes into hard errors.
    pub strict: bool,
    /// Crate path the generated code reaches the `codec` runtime through.
    pub runtime_crate: String,
    /// Module the generated code glob-imports the source types from.
    pub source_module: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            discriminant: DEFAULT_DISCRIMINANT.to_string(),
            marker_rule: MarkerRule::default(),
            strict: false,
            runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(),
            source_module: DEFAULT_SOURCE_MODULE.to_string(),
        }
    }
}

impl GenerateConfig {
    pub fn with_capabilities(capabilities: Vec<CapabilitySpec>) -> Self {
        Self { capabilities, ..Self::default() }
    }

    pub fn discriminant_for<'a>(&'a self, spec: &'a CapabilitySpec) -> &'a str {
        spec.discriminant.as_deref().unwrap_or(&self.discriminant)
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.capabilities.is_empty() {
            return Err(SpecError::Empty);
        }
        if self.discriminant.is_empty() || self.discriminant.contains(['"', '\\']) {
            return Err(SpecError::InvalidDiscriminant(self.discriminant.clone()));
        }
        if !MODULE_PATH.is_match(&self.runtime_crate) {
            return Err(SpecError::InvalidModulePath(self.runtime_crate.clone()));
        }
        if !MODULE_PATH.is_match(&self.source_module) {
            return Err(SpecError::InvalidModulePath(self.source_module.clone()));
        }
        let mut seen = HashSet::new();
        for spec in &self.capabilities {
            if !seen.insert(spec.name.as_str()) {
                return Err(SpecError::DuplicateCapability(spec.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remap(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn flag_forms() {
        let cases: &[(&str, &[(&str, &str)])] = &[
            ("Shape", &[]),
            ("Shape:", &[]),
            ("Shape:Foo", &[("Foo", "Foo")]),
            ("Shape:Foo=foo", &[("Foo", "foo")]),
            ("Shape:Foo=foo,Bar=bar", &[("Foo", "foo"), ("Bar", "bar")]),
            ("Shape:Foo,Bar,", &[("Foo", "Foo"), ("Bar", "Bar")]),
            ("Shape:Foo,Bar=bar", &[("Foo", "Foo"), ("Bar", "bar")]),
        ];
        for (flag, expect) in cases {
            let spec: CapabilitySpec = flag.parse().unwrap_or_else(|e| panic!("{flag}: {e}"));
            assert_eq!(spec.name, "Shape", "{flag}");
            assert_eq!(spec.discriminant, None, "{flag}");
            assert_eq!(spec.remap, remap(expect), "{flag}");
        }
    }

    #[test]
    fn remap_keeps_flag_order() {
        let spec: CapabilitySpec = "Shape:Zed=z,Alpha=a".parse().unwrap();
        let keys: Vec<_> = spec.remap.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Zed", "Alpha"]);
    }

    #[test]
    fn discriminant_override() {
        let spec: CapabilitySpec = "Shape@type:Square=sq".parse().unwrap();
        assert_eq!(spec.discriminant.as_deref(), Some("type"));
        let config = GenerateConfig::with_capabilities(vec![spec.clone(), CapabilitySpec::new("Brush")]);
        assert_eq!(config.discriminant_for(&spec), "type");
        assert_eq!(config.discriminant_for(&config.capabilities[1]), "kind");
    }

    #[test]
    fn malformed_flags_are_rejected() {
        assert_eq!("".parse::<CapabilitySpec>(), Err(SpecError::Empty));
        assert!(matches!("9Shape".parse::<CapabilitySpec>(), Err(SpecError::InvalidName(_))));
        assert!(matches!("Shape@".parse::<CapabilitySpec>(), Err(SpecError::InvalidDiscriminant(_))));
        assert!(matches!("Shape:Foo=".parse::<CapabilitySpec>(), Err(SpecError::InvalidEntry(_))));
        assert!(matches!("Shape:a-b=x".parse::<CapabilitySpec>(), Err(SpecError::InvalidEntry(_))));
    }

    #[test]
    fn duplicate_capabilities_fail_validation() {
        let config = GenerateConfig::with_capabilities(vec![CapabilitySpec::new("Shape"), CapabilitySpec::new("Shape")]);
        assert_eq!(config.validate(), Err(SpecError::DuplicateCapability("Shape".into())));
        assert_eq!(GenerateConfig::default().validate(), Err(SpecError::Empty));
    }
}
