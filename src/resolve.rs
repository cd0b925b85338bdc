//! Variant discovery: capability → marker operation → implementing types.
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{CapabilitySpec, GenerateConfig};
use crate::model::{CapabilityDecl, Operation, SourceModel, TypeExpr};

/// Which operations of a capability may serve as its marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRule {
    /// Required, no parameters, no results, no type parameters.
    #[default]
    Signature,
    /// `signature`, and the operation must also be hidden.
    Hidden,
}

impl MarkerRule {
    pub fn qualifies(self, op: &Operation) -> bool {
        let shape = !op.provided && op.params.is_empty() && op.results.is_empty() && op.type_params.is_empty();
        match self {
            MarkerRule::Signature => shape,
            MarkerRule::Hidden => shape && op.hidden,
        }
    }
}

impl fmt::Display for MarkerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkerRule::Signature => "signature",
            MarkerRule::Hidden => "hidden",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub wire_name: String,
}

/// Everything the emitter needs to know about one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub capability: String,
    pub discriminant: String,
    pub marker: String,
    /// Discovered variants first, then remap-only ones.
    pub variants: Vec<Variant>,
}

impl TypeDescriptor {
    pub fn wire_name(&self, variant: &str) -> Option<&str> {
        self.variants.iter().find(|v| v.name == variant).map(|v| v.wire_name.as_str())
    }

    pub fn variant_for(&self, wire_name: &str) -> Option<&str> {
        self.variants.iter().find(|v| v.wire_name == wire_name).map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no source declarations to analyze")]
    NoInput,
    #[error("capability `{capability}` is not declared")]
    CapabilityNotFound { capability: String },
    #[error("capability `{capability}` has no marker operation (rule: {rule})")]
    NoMarkerOperation { capability: String, rule: MarkerRule },
    #[error("capability `{capability}` has several marker candidates: {}", candidates.join(", "))]
    AmbiguousMarker { capability: String, candidates: Vec<String> },
    #[error("nothing implements `{capability}::{marker}` and no variants were given")]
    NoImplementors { capability: String, marker: String },
    #[error("variants `{first}` and `{second}` of `{capability}` share the wire name {wire_name:?}")]
    DuplicateWireName {
        capability: String,
        wire_name: String,
        first: String,
        second: String,
    },
}

pub fn resolve_spec(
    model: &SourceModel,
    spec: &CapabilitySpec,
    config: &GenerateConfig,
) -> Result<TypeDescriptor, ResolveError> {
    resolve(model, &spec.name, config.discriminant_for(spec), &spec.remap, config.marker_rule)
}

pub fn resolve(
    model: &SourceModel,
    capability: &str,
    discriminant: &str,
    remap: &IndexMap<String, String>,
    rule: MarkerRule,
) -> Result<TypeDescriptor, ResolveError> {
    if model.is_empty() {
        return Err(ResolveError::NoInput);
    }

    let decl = find_capability(model, capability)?;
    let marker = find_marker(decl, rule)?;

    let mut names: Vec<&str> = Vec::new();
    for function in model.functions() {
        if function.name != marker.name {
            continue;
        }
        if function.implements.as_deref().is_some_and(|t| t != capability) {
            continue;
        }
        let Some(TypeExpr::Named(receiver)) = &function.receiver else {
            continue;
        };
        if !names.contains(&receiver.as_str()) {
            names.push(receiver);
        }
    }
    tracing::debug!(capability, marker = %marker.name, discovered = names.len(), "discovered variants");

    let mut variants: Vec<Variant> = names
        .iter()
        .map(|name| Variant {
            name: name.to_string(),
            wire_name: remap.get(*name).cloned().unwrap_or_else(|| name.to_string()),
        })
        .collect();
    for (name, wire_name) in remap {
        if !names.contains(&name.as_str()) {
            tracing::debug!(capability, variant = %name, "registering variant from remap only");
            variants.push(Variant { name: name.clone(), wire_name: wire_name.clone() });
        }
    }

    if variants.is_empty() {
        return Err(ResolveError::NoImplementors {
            capability: capability.to_string(),
            marker: marker.name.clone(),
        });
    }

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for variant in &variants {
        if let Some(first) = seen.insert(&variant.wire_name, &variant.name) {
            return Err(ResolveError::DuplicateWireName {
                capability: capability.to_string(),
                wire_name: variant.wire_name.clone(),
                first: first.to_string(),
                second: variant.name.clone(),
            });
        }
    }

    Ok(TypeDescriptor {
        capability: capability.to_string(),
        discriminant: discriminant.to_string(),
        marker: marker.name.clone(),
        variants,
    })
}

fn find_capability<'m>(model: &'m SourceModel, capability: &str) -> Result<&'m CapabilityDecl, ResolveError> {
    let mut matches = model.capabilities().filter(|c| c.name == capability);
    let decl = matches.next().ok_or_else(|| ResolveError::CapabilityNotFound {
        capability: capability.to_string(),
    })?;
    let duplicates = matches.count();
    if duplicates > 0 {
        tracing::warn!(capability, duplicates, "capability declared more than once, using the first declaration");
    }
    Ok(decl)
}

fn find_marker(decl: &CapabilityDecl, rule: MarkerRule) -> Result<&Operation, ResolveError> {
    let candidates: Vec<&Operation> = decl.operations.iter().filter(|op| rule.qualifies(op)).collect();
    match candidates.as_slice() {
        [] => Err(ResolveError::NoMarkerOperation { capability: decl.name.clone(), rule }),
        [marker] => Ok(*marker),
        _ => Err(ResolveError::AmbiguousMarker {
            capability: decl.name.clone(),
            candidates: candidates.iter().map(|op| op.name.clone()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Decl, FunctionDecl, SourceFile};

    fn op(name: &str) -> Operation {
        Operation {
            name: name.into(),
            params: vec![],
            results: vec![],
            type_params: vec![],
            provided: false,
            hidden: false,
        }
    }

    fn method(name: &str, receiver: TypeExpr, implements: Option<&str>) -> Decl {
        Decl::Function(FunctionDecl {
            name: name.into(),
            receiver: Some(receiver),
            implements: implements.map(str::to_string),
        })
    }

    fn model(decls: Vec<Decl>) -> SourceModel {
        SourceModel { files: vec![SourceFile { path: None, decls }] }
    }

    fn shapes() -> SourceModel {
        let mut area = op("area");
        area.results = vec![TypeExpr::named("f64")];
        model(vec![
            Decl::Capability(CapabilityDecl { name: "Shape".into(), operations: vec![area, op("xxx_shape")] }),
            method("xxx_shape", TypeExpr::named("Square"), Some("Shape")),
            method("xxx_shape", TypeExpr::named("Circle"), None),
            method("xxx_shape", TypeExpr::named("Square"), Some("Shape")),
            method("xxx_shape", TypeExpr::Pointer(Box::new(TypeExpr::named("Boxed"))), None),
            method("xxx_shape", TypeExpr::named("Brush"), Some("Paint")),
            method("area", TypeExpr::named("Triangle"), Some("Shape")),
        ])
    }

    fn names(t: &TypeDescriptor) -> Vec<(&str, &str)> {
        t.variants.iter().map(|v| (v.name.as_str(), v.wire_name.as_str())).collect()
    }

    #[test]
    fn discovers_in_declaration_order() {
        let t = resolve(&shapes(), "Shape", "kind", &IndexMap::new(), MarkerRule::Signature).unwrap();
        assert_eq!(t.marker, "xxx_shape");
        assert_eq!(t.discriminant, "kind");
        assert_eq!(names(&t), [("Square", "Square"), ("Circle", "Circle")]);
    }

    #[test]
    fn remap_is_authoritative() {
        let remap: IndexMap<_, _> = [("Circle", "c"), ("Foo", "f"), ("Bar", "Bar")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let t = resolve(&shapes(), "Shape", "type", &remap, MarkerRule::Signature).unwrap();
        assert_eq!(names(&t), [("Square", "Square"), ("Circle", "c"), ("Foo", "f"), ("Bar", "Bar")]);
        assert_eq!(t.variant_for("f"), Some("Foo"));
        assert_eq!(t.wire_name("Circle"), Some("c"));
    }

    #[test]
    fn remap_alone_satisfies_discovery() {
        let m = model(vec![Decl::Capability(CapabilityDecl { name: "Shape".into(), operations: vec![op("mark")] })]);
        let remap: IndexMap<_, _> = [("Foo".to_string(), "f".to_string())].into_iter().collect();
        let t = resolve(&m, "Shape", "kind", &remap, MarkerRule::Signature).unwrap();
        assert_eq!(names(&t), [("Foo", "f")]);

        let err = resolve(&m, "Shape", "kind", &IndexMap::new(), MarkerRule::Signature).unwrap_err();
        assert_eq!(err, ResolveError::NoImplementors { capability: "Shape".into(), marker: "mark".into() });
    }

    #[test]
    fn empty_and_missing() {
        let err = resolve(&SourceModel::default(), "Shape", "kind", &IndexMap::new(), MarkerRule::Signature);
        assert_eq!(err.unwrap_err(), ResolveError::NoInput);
        let err = resolve(&shapes(), "Brush", "kind", &IndexMap::new(), MarkerRule::Signature);
        assert_eq!(err.unwrap_err(), ResolveError::CapabilityNotFound { capability: "Brush".into() });
    }

    #[test]
    fn marker_rules() {
        let mut provided = op("describe");
        provided.provided = true;
        let mut generic = op("visit");
        generic.type_params = vec!["V".into()];
        let mut hidden = op("_mark");
        hidden.hidden = true;

        let m = model(vec![Decl::Capability(CapabilityDecl {
            name: "Shape".into(),
            operations: vec![provided.clone(), generic.clone()],
        })]);
        let err = resolve(&m, "Shape", "kind", &IndexMap::new(), MarkerRule::Signature).unwrap_err();
        assert!(matches!(err, ResolveError::NoMarkerOperation { .. }), "{err}");

        let m = model(vec![
            Decl::Capability(CapabilityDecl { name: "Shape".into(), operations: vec![op("a"), hidden, op("b")] }),
            method("_mark", TypeExpr::named("Square"), None),
        ]);
        let err = resolve(&m, "Shape", "kind", &IndexMap::new(), MarkerRule::Signature).unwrap_err();
        assert_eq!(
            err,
            ResolveError::AmbiguousMarker {
                capability: "Shape".into(),
                candidates: vec!["a".into(), "_mark".into(), "b".into()],
            }
        );
        let t = resolve(&m, "Shape", "kind", &IndexMap::new(), MarkerRule::Hidden).unwrap();
        assert_eq!(t.marker, "_mark");
        assert_eq!(names(&t), [("Square", "Square")]);
    }

    #[test]
    fn duplicate_wire_names_are_rejected() {
        let remap: IndexMap<_, _> = [("Circle".to_string(), "Square".to_string())].into_iter().collect();
        let err = resolve(&shapes(), "Shape", "kind", &remap, MarkerRule::Signature).unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateWireName { ref wire_name, .. } if wire_name == "Square"));
    }

    #[test]
    fn first_capability_declaration_wins() {
        let mut m = shapes();
        m.files.push(SourceFile {
            path: None,
            decls: vec![Decl::Capability(CapabilityDecl { name: "Shape".into(), operations: vec![op("other")] })],
        });
        let t = resolve(&m, "Shape", "kind", &IndexMap::new(), MarkerRule::Signature).unwrap();
        assert_eq!(t.marker, "xxx_shape");
    }

    #[test]
    fn per_capability_discriminant_applies() {
        let spec: CapabilitySpec = "Shape@type".parse().unwrap();
        let config = GenerateConfig::with_capabilities(vec![spec.clone()]);
        let t = resolve_spec(&shapes(), &spec, &config).unwrap();
        assert_eq!(t.discriminant, "type");
    }
}
