use thiserror::Error;

use super::handle::InstanceId;

pub type SeqsumResult<T> = Result<T, SeqsumError>;

#[derive(Debug, Error)]
pub enum SeqsumError {
    #[error("Failed to load WASM module: {0}")]
    WasmLoadError(anyhow::Error),

    #[error("WASM module does not implement the sequence ABI: {0}")]
    AbiMismatch(String),

    #[error("Failed to instantiate WASM module: {0}")]
    WasmInstantiationError(anyhow::Error),

    #[error("WASM module trapped in `{export}`: {message}")]
    Trap {
        export: &'static str,
        message: String,
    },

    #[error("Failed to call `{export}`: {reason}")]
    WasmExecutionError {
        export: &'static str,
        reason: anyhow::Error,
    },

    #[error("Sequence handle belongs to instance {found}, not to instance {expected}")]
    ForeignHandle {
        expected: InstanceId,
        found: InstanceId,
    },

    #[error("Sequence of {len} elements exceeds the limit of {max}")]
    SequenceTooLong { len: u64, max: u64 },

    #[error("Instance {0} was poisoned by an earlier trap")]
    Poisoned(InstanceId),
}
