//! Wasmtime-based host side of the sequence boundary.
//!
//! The public API is what the driver (`seqsum_cli`) needs: load a module,
//! instantiate it with no imports, and call `init`/`sum`/`release` through
//! owned, instance-tagged handles.

mod abi;
mod config;
mod error;
mod handle;
mod instance;
mod module;
mod store;

pub use abi::{ModuleMetadata, EXPORT_INIT, EXPORT_LIVE, EXPORT_RELEASE, EXPORT_SUM};
pub use config::SeqsumRuntimeConfig;
pub use error::{SeqsumError, SeqsumResult};
pub use handle::{InstanceId, Sequence};
pub use instance::SeqsumInstance;
pub use module::WasmModule;
pub use store::SeqsumStore;
