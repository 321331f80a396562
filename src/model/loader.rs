//! Locating weight blobs on disk.

use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the default models directory.
pub const MODELS_DIR_ENV: &str = "DUOSR_MODELS_DIR";

/// The networks whose weights the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Stage 1 sub-pixel upsampler.
    Upsampler,
    /// Stage 2 conditional U-Net refiner.
    Refiner,
}

impl ModelKind {
    /// Get the filename for this model kind.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Upsampler => "espcn_final.safetensors",
            Self::Refiner => "unet_final.safetensors",
        }
    }
}

/// Resolves where weight blobs live.
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    /// Use an explicit models directory.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Resolve the default models directory.
    ///
    /// Uses `$DUOSR_MODELS_DIR` when set, otherwise the platform data directory:
    /// - Windows: `%APPDATA%\duosr\models`
    /// - Linux: `~/.local/share/duosr/models`
    /// - macOS: `~/Library/Application Support/duosr/models`
    ///
    /// Falls back to `./models` when no data directory is known.
    #[must_use]
    pub fn from_env() -> Self {
        if let Some(dir) = env::var_os(MODELS_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Self::new(dir);
        }
        let dir = dirs::data_dir().map_or_else(
            || PathBuf::from("models"),
            |base| base.join("duosr").join("models"),
        );
        Self::new(dir)
    }

    /// Path to the weight blob of `kind`. The file is not checked for existence.
    #[must_use]
    pub fn path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.filename())
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = ModelStore::new("/srv/weights");
        assert_eq!(
            store.path(ModelKind::Upsampler),
            PathBuf::from("/srv/weights/espcn_final.safetensors")
        );
        assert_eq!(
            store.path(ModelKind::Refiner),
            PathBuf::from("/srv/weights/unet_final.safetensors")
        );
    }
}
