//! Runtime core handle, device registry, and model container reader
//!
//! [`Core`] is the runtime-instance handle the probes churn: creating one
//! initializes the device registry, and dropping it releases the instance.
//! The capability query mirrors the narrow surface inference runtimes expose
//! per device (a description plus a build identifier).
//!
//! Model containers use a small binary layout: a magic number, a format
//! version, and a tensor table (name, dims, dtype) followed by the raw data
//! payload. Validation fails fast on a missing file, bad magic, unsupported
//! version, or a payload shorter than the table promises.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;

use crate::error::{ForgeProbeError, ProbeResult};
use crate::runtime::ledger::ResourceLedger;

/// Model container magic number
const MODEL_MAGIC: &[u8; 4] = b"FPMC";

/// Highest container format version this runtime understands
const SUPPORTED_CONTAINER_VERSION: u32 = 1;

/// Sanity caps on the tensor table, to reject garbage headers early
const MAX_TENSOR_COUNT: u64 = 65_536;
const MAX_NAME_LEN: u32 = 4_096;
const MAX_DIMS: u32 = 8;

/// Capability/version information for a single device
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceVersion {
    /// Human-readable device description
    pub description: String,
    /// Build identifier of the device plugin
    pub build: String,
}

/// Handle to an initialized runtime instance
///
/// Creating a `Core` performs real initialization work (device registry
/// construction) and registers the handle with the [`ResourceLedger`];
/// dropping it releases the instance. Handles are intentionally cheap enough
/// to churn in a loop but never free: that cost is what makes the leak probe
/// exercise the real acquire/release path.
#[derive(Debug)]
pub struct Core {
    devices: BTreeMap<String, DeviceVersion>,
}

impl Core {
    /// Initialize a fresh runtime instance
    ///
    /// The built-in `CPU` device is always registered.
    pub fn new() -> ProbeResult<Core> {
        let mut devices = BTreeMap::new();
        devices.insert(
            "CPU".to_string(),
            DeviceVersion {
                description: "forgeprobe CPU reference device".to_string(),
                build: env!("CARGO_PKG_VERSION").to_string(),
            },
        );

        ResourceLedger::record_core_created();
        debug!(devices = devices.len(), "runtime core initialized");
        Ok(Core { devices })
    }

    /// Names of all registered devices
    pub fn available_devices(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Query capability/version information for a named device
    ///
    /// Returns a map keyed by device name, non-empty for every registered
    /// device. Unknown devices are an error.
    pub fn query_versions(
        &self,
        device: &str,
    ) -> ProbeResult<BTreeMap<String, DeviceVersion>> {
        match self.devices.get(device) {
            Some(version) => {
                let mut result = BTreeMap::new();
                result.insert(device.to_string(), version.clone());
                Ok(result)
            }
            None => Err(ForgeProbeError::DeviceNotFound(device.to_string())),
        }
    }

    /// Read and validate a model container from disk
    ///
    /// Each call produces an independently owned [`ModelArtifact`]; releasing
    /// one artifact never invalidates another loaded from the same file.
    pub fn read_model(&self, path: impl AsRef<Path>) -> ProbeResult<ModelArtifact> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ForgeProbeError::ModelLoadFailed(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MODEL_MAGIC {
            return Err(ForgeProbeError::InvalidModelFile(format!(
                "bad magic in {}",
                path.display()
            )));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != SUPPORTED_CONTAINER_VERSION {
            return Err(ForgeProbeError::UnsupportedModelFormat(format!(
                "container version {} (supported: {})",
                version, SUPPORTED_CONTAINER_VERSION
            )));
        }

        let tensor_count = reader.read_u64::<LittleEndian>()?;
        if tensor_count > MAX_TENSOR_COUNT {
            return Err(ForgeProbeError::InvalidModelFile(format!(
                "implausible tensor count {}",
                tensor_count
            )));
        }

        let mut tensors = Vec::with_capacity(tensor_count as usize);
        let mut data_bytes: u64 = 0;
        for _ in 0..tensor_count {
            let tensor = read_tensor_entry(&mut reader)?;
            data_bytes = data_bytes.saturating_add(tensor.data_len());
            tensors.push(tensor);
        }

        // The payload follows the table; a shorter file is truncated.
        let table_end = reader.stream_position()?;
        if file_len.saturating_sub(table_end) < data_bytes {
            return Err(ForgeProbeError::InvalidModelFile(format!(
                "truncated container: {} payload bytes promised, {} present",
                data_bytes,
                file_len.saturating_sub(table_end)
            )));
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let fingerprint = fingerprint_tensors(&tensors);

        ResourceLedger::record_model_created();
        debug!(
            model = %name,
            tensors = tensors.len(),
            data_bytes,
            "model container read"
        );

        Ok(ModelArtifact {
            name,
            tensors,
            data_bytes,
            fingerprint,
        })
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        ResourceLedger::record_core_released();
    }
}

fn read_tensor_entry(reader: &mut BufReader<File>) -> ProbeResult<TensorInfo> {
    let name_len = reader.read_u32::<LittleEndian>()?;
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(ForgeProbeError::InvalidModelFile(format!(
            "tensor name length {} out of range",
            name_len
        )));
    }
    let mut name_bytes = vec![0u8; name_len as usize];
    reader.read_exact(&mut name_bytes)?;
    let name = String::from_utf8(name_bytes).map_err(|_| {
        ForgeProbeError::InvalidModelFile("tensor name is not valid UTF-8".to_string())
    })?;

    let ndims = reader.read_u32::<LittleEndian>()?;
    if ndims == 0 || ndims > MAX_DIMS {
        return Err(ForgeProbeError::InvalidModelFile(format!(
            "tensor {} has {} dimensions",
            name, ndims
        )));
    }
    let mut dims = Vec::with_capacity(ndims as usize);
    for _ in 0..ndims {
        dims.push(reader.read_u64::<LittleEndian>()?);
    }

    let dtype_code = reader.read_u32::<LittleEndian>()?;
    let dtype = TensorDtype::from_code(dtype_code).ok_or_else(|| {
        ForgeProbeError::UnsupportedModelFormat(format!(
            "tensor {} has unknown dtype code {}",
            name, dtype_code
        ))
    })?;

    Ok(TensorInfo { name, dims, dtype })
}

/// Element types a container may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TensorDtype {
    /// 32-bit float
    F32,
    /// 16-bit float
    F16,
    /// 8-bit quantized
    Q8,
}

impl TensorDtype {
    /// Decode the on-disk dtype code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(TensorDtype::F32),
            1 => Some(TensorDtype::F16),
            2 => Some(TensorDtype::Q8),
            _ => None,
        }
    }

    /// On-disk dtype code
    pub fn code(&self) -> u32 {
        match self {
            TensorDtype::F32 => 0,
            TensorDtype::F16 => 1,
            TensorDtype::Q8 => 2,
        }
    }

    /// Bytes per element
    pub fn element_size(&self) -> u64 {
        match self {
            TensorDtype::F32 => 4,
            TensorDtype::F16 => 2,
            TensorDtype::Q8 => 1,
        }
    }
}

/// Metadata for one tensor in a container
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TensorInfo {
    /// Tensor name
    pub name: String,
    /// Shape
    pub dims: Vec<u64>,
    /// Element type
    pub dtype: TensorDtype,
}

impl TensorInfo {
    /// Total elements in the tensor
    pub fn element_count(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Payload bytes the tensor occupies
    pub fn data_len(&self) -> u64 {
        self.element_count().saturating_mul(self.dtype.element_size())
    }
}

/// A loaded, validated model container
///
/// Owns its slot in the [`ResourceLedger`]; releasing it is a plain `Drop`.
#[derive(Debug)]
pub struct ModelArtifact {
    name: String,
    tensors: Vec<TensorInfo>,
    data_bytes: u64,
    fingerprint: u64,
}

impl ModelArtifact {
    /// Model name (derived from the file stem)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tensors in the container
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Tensor table
    pub fn tensors(&self) -> &[TensorInfo] {
        &self.tensors
    }

    /// Total payload bytes
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Stable hash of the tensor table, used to seed the compiled model
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl Drop for ModelArtifact {
    fn drop(&mut self) {
        ResourceLedger::record_model_released();
    }
}

/// FNV-1a over the tensor table; stable across loads of the same file
fn fingerprint_tensors(tensors: &[TensorInfo]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    let mut mix = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    };
    for tensor in tensors {
        for byte in tensor.name.as_bytes() {
            mix(*byte);
        }
        for dim in &tensor.dims {
            for byte in dim.to_le_bytes() {
                mix(byte);
            }
        }
        mix(tensor.dtype.code() as u8);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_device_is_always_registered() {
        let core = Core::new().unwrap();
        assert!(core.available_devices().contains(&"CPU".to_string()));
    }

    #[test]
    fn version_query_returns_build_info() {
        let core = Core::new().unwrap();
        let versions = core.query_versions("CPU").unwrap();
        let cpu = versions.get("CPU").unwrap();
        assert!(!cpu.description.is_empty());
        assert!(!cpu.build.is_empty());
    }

    #[test]
    fn unknown_device_is_rejected() {
        let core = Core::new().unwrap();
        let err = core.query_versions("NPU").unwrap_err();
        assert!(matches!(err, ForgeProbeError::DeviceNotFound(_)));
    }

    #[test]
    fn dtype_codes_round_trip() {
        for dtype in [TensorDtype::F32, TensorDtype::F16, TensorDtype::Q8] {
            assert_eq!(TensorDtype::from_code(dtype.code()), Some(dtype));
        }
        assert_eq!(TensorDtype::from_code(99), None);
    }

    #[test]
    fn tensor_data_len_accounts_for_dtype() {
        let tensor = TensorInfo {
            name: "w".to_string(),
            dims: vec![2, 3],
            dtype: TensorDtype::F16,
        };
        assert_eq!(tensor.element_count(), 6);
        assert_eq!(tensor.data_len(), 12);
    }

    #[test]
    fn fingerprint_is_stable_and_shape_sensitive() {
        let a = vec![TensorInfo {
            name: "w".to_string(),
            dims: vec![4, 4],
            dtype: TensorDtype::F32,
        }];
        let b = vec![TensorInfo {
            name: "w".to_string(),
            dims: vec![4, 8],
            dtype: TensorDtype::F32,
        }];
        assert_eq!(fingerprint_tensors(&a), fingerprint_tensors(&a));
        assert_ne!(fingerprint_tensors(&a), fingerprint_tensors(&b));
    }
}
