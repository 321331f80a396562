//! Compute device selection.

use std::fmt;
use std::str::FromStr;

use candle_core::Device;

use crate::error::{Error, Result};

/// Which device runs the forward passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    /// The host processor.
    #[default]
    Cpu,
    /// A CUDA accelerator, by ordinal. Needs the `cuda` feature.
    Cuda(usize),
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| format!("unknown device `{other}` (expected cpu, cuda or cuda:N)")),
        }
    }
}

impl DeviceKind {
    /// Open the device. Done once at startup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the accelerator cannot be
    /// opened, including when the crate was built without CUDA support.
    pub fn resolve(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(ordinal) => {
                Device::new_cuda(ordinal).map_err(|source| Error::DeviceUnavailable {
                    device: self.to_string(),
                    source,
                })
            }
        }
    }
}
