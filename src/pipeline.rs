//! source model → resolve (per capability) → classify → emit.
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{ClassifyError, StructDescriptor, classify_fields};
use crate::codegen::{Codegen, CodegenOptions, EmitError};
use crate::config::{GenerateConfig, SpecError};
use crate::diagnostics::Diagnostic;
use crate::model::SourceModel;
use crate::resolve::{ResolveError, TypeDescriptor, resolve_spec};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] SpecError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Descriptors for every configured capability and every classified record.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub types: Vec<TypeDescriptor>,
    pub structs: Vec<StructDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub analysis: Analysis,
    pub code: String,
}

pub fn analyze(model: &SourceModel, config: &GenerateConfig) -> Result<Analysis, Error> {
    config.validate()?;

    // Capabilities resolve independently; collecting keeps input order, so
    // the first failing capability (in that order) is the one reported.
    let resolved: Vec<Result<TypeDescriptor, ResolveError>> = config
        .capabilities
        .par_iter()
        .map(|spec| resolve_spec(model, spec, config))
        .collect();
    let types = resolved.into_iter().collect::<Result<Vec<_>, _>>()?;

    let names: Vec<&str> = types.iter().map(|t| t.capability.as_str()).collect();
    let classification = classify_fields(model, &names, config.strict)?;
    tracing::info!(
        capabilities = types.len(),
        structs = classification.structs.len(),
        diagnostics = classification.diagnostics.len(),
        "analysis complete"
    );

    Ok(Analysis {
        types,
        structs: classification.structs,
        diagnostics: classification.diagnostics,
    })
}

pub fn generate(model: &SourceModel, config: &GenerateConfig) -> Result<Generation, Error> {
    let analysis = analyze(model, config)?;
    let mut codegen = Codegen::new(CodegenOptions::from(config));
    codegen.emit(&analysis.types, &analysis.structs)?;
    Ok(Generation { code: codegen.into_string(), analysis })
}
