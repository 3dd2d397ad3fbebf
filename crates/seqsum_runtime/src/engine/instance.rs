use std::sync::Arc;
use std::time::Instant;

use wasmtime::{Engine, Linker, Module, Store, StoreLimitsBuilder, Trap, TypedFunc};

use super::abi::{self, EXPORT_INIT, EXPORT_LIVE, EXPORT_RELEASE, EXPORT_SUM};
use super::config::SeqsumRuntimeConfig;
use super::error::{SeqsumError, SeqsumResult};
use super::handle::{InstanceId, ReleaseQueue, Sequence};
use super::module::WasmModule;
use super::store::SeqsumStore;

pub struct SeqsumInstance {
    id: InstanceId,
    store: Store<SeqsumStore>,
    init_func: TypedFunc<(i32, i32), i32>,
    sum_func: TypedFunc<i32, i64>,
    /// Resolved only when the module exports `release`.
    release_func: Option<TypedFunc<i32, ()>>,
    live_func: Option<TypedFunc<(), i32>>,
    /// Handles dropped by their owners, released on the next call.
    release_queue: ReleaseQueue,
    max_sequence_len: u64,
    fuel_metered: bool,
    poisoned: bool,
}

impl SeqsumInstance {
    pub async fn new(wasm: Arc<WasmModule>, config: &SeqsumRuntimeConfig) -> SeqsumResult<Self> {
        let t0 = Instant::now();
        let id = InstanceId::next();

        let mut wasmtime_config = wasmtime::Config::new();
        wasmtime_config.async_support(true);
        wasmtime_config.wasm_backtrace(true);
        wasmtime_config.consume_fuel(config.fuel.is_some());
        let engine = Engine::new(&wasmtime_config).map_err(SeqsumError::WasmLoadError)?;

        let main_module = Module::new(&engine, &wasm.wasm).map_err(SeqsumError::WasmLoadError)?;
        abi::check(&main_module)?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes)
            .instances(1)
            .build();
        let mut store = Store::new(
            &engine,
            SeqsumStore {
                instance_id: id,
                module: wasm,
                limits,
            },
        );
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = config.fuel {
            store.set_fuel(fuel).map_err(SeqsumError::WasmInstantiationError)?;
        }

        // Nothing is linked: the module must be self-contained.
        let linker: Linker<SeqsumStore> = Linker::new(&engine);
        let instance = linker
            .instantiate_async(&mut store, &main_module)
            .await
            .map_err(SeqsumError::WasmInstantiationError)?;

        let init_func = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, EXPORT_INIT)
            .map_err(SeqsumError::WasmInstantiationError)?;
        let sum_func = instance
            .get_typed_func::<i32, i64>(&mut store, EXPORT_SUM)
            .map_err(SeqsumError::WasmInstantiationError)?;
        let release_func = instance
            .get_typed_func::<i32, ()>(&mut store, EXPORT_RELEASE)
            .ok();
        let live_func = instance
            .get_typed_func::<(), i32>(&mut store, EXPORT_LIVE)
            .ok();
        if release_func.is_none() {
            tracing::debug!(
                "instance {}: module has no `{}` export; sequences are reclaimed at teardown",
                id,
                EXPORT_RELEASE
            );
        }

        tracing::debug!(
            "instance {}: instantiated module sha256={} in {:.3}s",
            id,
            store.data().get_module().metadata().sha256_hex(),
            t0.elapsed().as_secs_f64()
        );

        Ok(Self {
            id,
            store,
            init_func,
            sum_func,
            release_func,
            live_func,
            release_queue: ReleaseQueue::default(),
            max_sequence_len: config.max_sequence_len,
            fuel_metered: config.fuel.is_some(),
            poisoned: false,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Whether sequences can be freed before the instance is torn down.
    pub fn supports_release(&self) -> bool {
        self.release_func.is_some()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Fuel left in the store, or `None` when fuel metering is off.
    pub fn remaining_fuel(&self) -> Option<u64> {
        if !self.fuel_metered {
            return None;
        }
        self.store.get_fuel().ok()
    }

    pub fn get_store(&self) -> &Store<SeqsumStore> {
        &self.store
    }

    /// Construct the inclusive ascending sequence `a..=b` inside the module.
    /// `a > b` yields the empty sequence.
    pub async fn init(&mut self, a: i32, b: i32) -> SeqsumResult<Sequence> {
        self.ensure_usable()?;
        let len = sequence_len(a, b);
        if len > self.max_sequence_len {
            return Err(SeqsumError::SequenceTooLong {
                len,
                max: self.max_sequence_len,
            });
        }
        self.flush_released().await?;

        let raw = match self.init_func.call_async(&mut self.store, (a, b)).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.call_failed(EXPORT_INIT, e)),
        };
        tracing::debug!("instance {}: init({}, {}) -> {} elements", self.id, a, b, len);
        Ok(Sequence::new(
            self.id,
            raw,
            len,
            self.release_func.as_ref().map(|_| &self.release_queue),
        ))
    }

    /// Sum every element of `seq`. The sequence stays alive.
    pub async fn sum(&mut self, seq: &Sequence) -> SeqsumResult<i64> {
        self.ensure_usable()?;
        self.ensure_owned(seq)?;
        self.flush_released().await?;

        match self.sum_func.call_async(&mut self.store, seq.raw()).await {
            Ok(total) => Ok(total),
            Err(e) => Err(self.call_failed(EXPORT_SUM, e)),
        }
    }

    /// Free the memory backing `seq`.
    ///
    /// Without a `release` export this only drops the host-side handle; the
    /// memory stays allocated until the instance is torn down.
    pub async fn release(&mut self, seq: Sequence) -> SeqsumResult<()> {
        self.ensure_usable()?;
        self.ensure_owned(&seq)?;
        let raw = seq.into_raw();
        self.flush_released().await?;
        self.release_raw(raw).await
    }

    /// Number of live sequences, when the module reports it.
    pub async fn live_count(&mut self) -> SeqsumResult<Option<u32>> {
        self.ensure_usable()?;
        self.flush_released().await?;
        let Some(live) = self.live_func.clone() else {
            return Ok(None);
        };
        match live.call_async(&mut self.store, ()).await {
            Ok(count) => Ok(Some(count as u32)),
            Err(e) => Err(self.call_failed(EXPORT_LIVE, e)),
        }
    }

    /// `sum(init(a, b))`, releasing the sequence afterwards.
    pub async fn init_and_sum(&mut self, a: i32, b: i32) -> SeqsumResult<i64> {
        let seq = self.init(a, b).await?;
        let total = self.sum(&seq).await?;
        self.release(seq).await?;
        Ok(total)
    }

    fn ensure_usable(&self) -> SeqsumResult<()> {
        if self.poisoned {
            return Err(SeqsumError::Poisoned(self.id));
        }
        Ok(())
    }

    fn ensure_owned(&self, seq: &Sequence) -> SeqsumResult<()> {
        if seq.instance_id() != self.id {
            return Err(SeqsumError::ForeignHandle {
                expected: self.id,
                found: seq.instance_id(),
            });
        }
        Ok(())
    }

    async fn flush_released(&mut self) -> SeqsumResult<()> {
        let pending = match self.release_queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for raw in pending {
            self.release_raw(raw).await?;
        }
        Ok(())
    }

    async fn release_raw(&mut self, raw: i32) -> SeqsumResult<()> {
        let Some(release) = self.release_func.clone() else {
            return Ok(());
        };
        if raw == 0 {
            return Ok(());
        }
        match release.call_async(&mut self.store, raw).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.call_failed(EXPORT_RELEASE, e)),
        }
    }

    /// Classify a failed call. Any failure leaves the instance poisoned since
    /// the module may have stopped halfway through updating its heap.
    fn call_failed(&mut self, export: &'static str, e: anyhow::Error) -> SeqsumError {
        self.poisoned = true;
        if let Some(trap) = e.downcast_ref::<Trap>() {
            tracing::warn!("instance {}: `{}` trapped: {}", self.id, export, trap);
            return SeqsumError::Trap {
                export,
                message: trap.to_string(),
            };
        }
        tracing::warn!("instance {}: `{}` failed: {:#}", self.id, export, e);
        SeqsumError::WasmExecutionError { export, reason: e }
    }
}

/// Number of elements in `a..=b`.
fn sequence_len(a: i32, b: i32) -> u64 {
    if a > b {
        0
    } else {
        (i64::from(b) - i64::from(a) + 1) as u64
    }
}
