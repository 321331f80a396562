//! Weight blobs: where they live and how they become layers.

mod loader;
mod params;

pub use loader::{ModelKind, ModelStore, MODELS_DIR_ENV};
pub use params::ParameterStore;
