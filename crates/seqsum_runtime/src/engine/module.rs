use std::path::Path;

use anyhow::{Context as _, Result};

use super::abi::{self, ModuleMetadata};

pub struct WasmModule {
    pub(crate) wasm: Vec<u8>,
    pub(crate) metadata: ModuleMetadata,
}

impl WasmModule {
    /// Create a new `WasmModule` from a WASM binary.
    pub async fn new(wasm: Vec<u8>) -> Result<Self> {
        let metadata = abi::inspect(&wasm)?;
        Ok(Self { wasm, metadata })
    }

    /// Read a WASM binary from `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let wasm = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::new(wasm).await
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }
}
