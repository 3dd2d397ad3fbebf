use std::sync::Arc;

use wasmtime::StoreLimits;

use super::handle::InstanceId;
use super::module::WasmModule;

pub struct SeqsumStore {
    /// Identity of the instance this store backs. Handles are tagged with it.
    pub(crate) instance_id: InstanceId,
    // Wasm module info
    pub(crate) module: Arc<WasmModule>,
    /// Memory limits enforced on `memory.grow`.
    pub(crate) limits: StoreLimits,
}

impl SeqsumStore {
    pub fn get_instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn get_module(&self) -> &WasmModule {
        &self.module
    }
}
