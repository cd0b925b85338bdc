//! Tagged JSON codecs for trait-object capabilities.
//!
//! Pipeline: source model → variant resolution (per capability) → field
//! classification (once) → Rust codegen. `codec` is the runtime half that the
//! generated code calls into.
pub mod model;
pub mod lower;
pub mod source;
pub mod config;
pub mod resolve;
pub mod classify;
pub mod codegen;
pub mod codec;
pub mod diagnostics;
pub mod path_de;
pub mod pipeline;

pub use classify::{FieldShape, PolymorphicField, StructDescriptor};
pub use codec::DecodeError;
pub use config::{CapabilitySpec, GenerateConfig};
pub use model::SourceModel;
pub use resolve::{MarkerRule, TypeDescriptor, Variant};
