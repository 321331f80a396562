//! Safetensors-backed parameter store.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, VarBuilder};

use crate::error::{Error, Result};

/// Every tensor of one weight blob, keyed by its state-dict name.
///
/// Layers are built through a [`VarBuilder`], which checks shapes and
/// converts half-precision tensors to `f32`. The store also tracks which
/// names were claimed so [`ParameterStore::finish`] can reject leftovers.
pub struct ParameterStore {
    path: PathBuf,
    unclaimed: BTreeSet<String>,
    vb: VarBuilder<'static>,
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("path", &self.path)
            .field("unclaimed", &self.unclaimed)
            .finish_non_exhaustive()
    }
}

impl ParameterStore {
    /// Read a safetensors file onto `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid safetensors
    /// data, or holds non floating-point tensors.
    pub fn open<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ParameterRead {
            path: path.to_path_buf(),
            source,
        })?;
        let tensors = candle_core::safetensors::load_buffer(&bytes, device).map_err(|source| {
            Error::ParameterDecode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!("Read {} tensors from {}", tensors.len(), path.display());
        Self::from_tensors(path, tensors, device)
    }

    /// Wrap tensors already in memory. `path` only labels errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParameterDtype`] for any non floating-point tensor.
    pub fn from_tensors<P: AsRef<Path>>(
        path: P,
        tensors: HashMap<String, Tensor>,
        device: &Device,
    ) -> Result<Self> {
        if let Some((name, tensor)) = tensors.iter().find(|(_, t)| !t.dtype().is_float()) {
            return Err(Error::ParameterDtype {
                name: name.clone(),
                dtype: format!("{:?}", tensor.dtype()),
            });
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            unclaimed: tensors.keys().cloned().collect(),
            vb: VarBuilder::from_tensors(tensors, DType::F32, device),
        })
    }

    fn claim(&mut self, name: String) -> Result<()> {
        if self.unclaimed.remove(&name) {
            return Ok(());
        }
        Err(Error::MissingTensor {
            path: self.path.clone(),
            name,
        })
    }

    /// Build a square convolution from `{prefix}.weight` and `{prefix}.bias`.
    ///
    /// # Errors
    ///
    /// Returns an error if either tensor is absent or has the wrong shape.
    pub fn take_conv2d(
        &mut self,
        prefix: &str,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
    ) -> Result<Conv2d> {
        self.claim(format!("{prefix}.weight"))?;
        self.claim(format!("{prefix}.bias"))?;

        let config = Conv2dConfig {
            padding,
            ..Default::default()
        };
        candle_nn::conv2d(in_channels, out_channels, kernel, config, self.vb.pp(prefix)).map_err(
            |source| Error::LayerLoad {
                path: self.path.clone(),
                layer: prefix.to_string(),
                source,
            },
        )
    }

    /// Fail if any tensor was never claimed by a layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedTensors`] listing the leftovers.
    pub fn finish(self) -> Result<()> {
        if self.unclaimed.is_empty() {
            return Ok(());
        }
        Err(Error::UnexpectedTensors {
            path: self.path,
            names: self.unclaimed.into_iter().collect(),
        })
    }
}
