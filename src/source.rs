//! Reading source declarations from disk into a [`SourceModel`].
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostic;
use crate::lower::Lowering;
use crate::model::{SourceFile, SourceModel};
use crate::path_de::{self, PathError};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse Rust source {path}: {source}")]
    Rust {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },
    #[error("invalid source model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: PathError,
    },
}

#[derive(Debug, Default)]
pub struct Loaded {
    pub model: SourceModel,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads every path in order. `*.json` files are serialized source models;
/// anything else is parsed as Rust.
pub fn load_sources(paths: &[PathBuf]) -> Result<Loaded, LoadError> {
    let mut loaded = Loaded::default();
    for path in paths {
        let source = std::fs::read(path).map_err(|source| LoadError::Read { path: path.clone(), source })?;
        if is_model_file(path) {
            let model: SourceModel = path_de::from_slice_with_path(&source)
                .map_err(|source| LoadError::Model { path: path.clone(), source })?;
            tracing::debug!(path = %path.display(), files = model.files.len(), "loaded source model");
            loaded.model.files.extend(model.files);
        } else {
            let text = String::from_utf8_lossy(&source);
            let lowering = crate::lower::lower_source(&text)
                .map_err(|source| LoadError::Rust { path: path.clone(), source })?;
            tracing::debug!(path = %path.display(), decls = lowering.decls.len(), "lowered Rust source");
            loaded.push_rust(path, lowering);
        }
    }
    Ok(loaded)
}

impl Loaded {
    fn push_rust(&mut self, path: &Path, lowering: Lowering) {
        let Lowering { decls, diagnostics } = lowering;
        self.model.files.push(SourceFile {
            path: Some(path.to_string_lossy().to_string()),
            decls,
        });
        self.diagnostics.extend(diagnostics);
    }
}

fn is_model_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
