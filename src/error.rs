//! Unified error handling for forgeprobe
//!
//! This module provides a centralized error type covering every failure the
//! probes can surface:
//! - Runtime errors (core initialization, device lookup)
//! - Model/Loader errors (file I/O, container parsing, pretrained directories)
//! - Probe errors (misuse of the harness surface)
//! - User errors (invalid configuration, actionable by callers)
//!
//! Failures are never retried or recovered from: the probes are diagnostic
//! tools and every error propagates straight out of the harness entry point.

/// Unified error type for forgeprobe
#[derive(Debug, thiserror::Error)]
pub enum ForgeProbeError {
    // ========== Runtime Errors ==========
    /// Runtime core could not be initialized
    #[error("core initialization failed: {0}")]
    CoreInitFailed(String),

    /// Named device is not registered with the runtime
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    // ========== Model/Loader Errors ==========
    /// Model container could not be read
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),

    /// Model container is corrupt or does not parse
    #[error("invalid model file: {0}")]
    InvalidModelFile(String),

    /// Model container version or layout is not supported
    #[error("unsupported model format: {0}")]
    UnsupportedModelFormat(String),

    /// A required file is missing from a pretrained directory
    #[error("missing pretrained file: {0}")]
    MissingPretrainedFile(String),

    /// Tokenizer definition could not be loaded
    #[error("tokenizer loading failed: {0}")]
    TokenizerLoadFailed(String),

    // ========== Configuration Errors ==========
    /// Invalid runtime or model configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid probe configuration
    #[error("invalid probe configuration: {0}")]
    InvalidProbeConfig(String),

    // ========== Pipeline Errors ==========
    /// Pipeline was given a model that has not been compiled yet
    #[error("model is not compiled; call compile() before building a pipeline")]
    ModelNotCompiled,

    /// Generation request carried an empty prompt
    #[error("empty prompt")]
    EmptyPrompt,

    /// Generation failed
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    // ========== I/O Errors ==========
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ========== Internal Errors ==========
    /// Internal error (indicates a bug)
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ForgeProbeError {
    /// Categorize the error for handling decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForgeProbeError::InvalidConfiguration(_)
            | ForgeProbeError::InvalidProbeConfig(_)
            | ForgeProbeError::EmptyPrompt => ErrorCategory::User,

            ForgeProbeError::CoreInitFailed(_) | ForgeProbeError::DeviceNotFound(_) => {
                ErrorCategory::Runtime
            }

            ForgeProbeError::ModelLoadFailed(_)
            | ForgeProbeError::InvalidModelFile(_)
            | ForgeProbeError::UnsupportedModelFormat(_)
            | ForgeProbeError::MissingPretrainedFile(_)
            | ForgeProbeError::TokenizerLoadFailed(_)
            | ForgeProbeError::IoError(_) => ErrorCategory::Model,

            ForgeProbeError::ModelNotCompiled | ForgeProbeError::GenerationFailed(_) => {
                ErrorCategory::Probe
            }

            ForgeProbeError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Check if this is a user-facing error (actionable by callers)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this is an internal error (indicates a bug)
    pub fn is_internal_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Error category for handling decisions
///
/// - User: invalid input or configuration, fix the request
/// - Runtime: runtime core or device failures
/// - Model: file, container, or tokenizer problems
/// - Probe: misuse of the probe/pipeline surface
/// - Internal: bugs, report to developers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input or configuration
    User,
    /// Runtime core or device failure
    Runtime,
    /// Model file or tokenizer problem
    Model,
    /// Probe or pipeline misuse
    Probe,
    /// Bug in forgeprobe itself
    Internal,
}

/// Convenience result alias used throughout the crate
pub type ProbeResult<T> = Result<T, ForgeProbeError>;
