use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raw handles whose `Sequence` was dropped without an explicit release.
/// The owning instance drains it before its next call into the module.
pub(crate) type ReleaseQueue = Arc<Mutex<Vec<i32>>>;

/// A sequence living in the private memory of one module instance.
///
/// The raw handle returned by `init` never leaves this type. A `Sequence` is
/// not `Clone`; releasing it consumes it, and dropping it schedules the
/// release on the instance that created it.
#[derive(Debug)]
pub struct Sequence {
    instance: InstanceId,
    raw: i32,
    len: u64,
    /// `None` once the handle has been handed back, or when the module has
    /// no `release` export.
    release_queue: Option<Weak<Mutex<Vec<i32>>>>,
}

impl Sequence {
    pub(crate) fn new(
        instance: InstanceId,
        raw: i32,
        len: u64,
        release_queue: Option<&ReleaseQueue>,
    ) -> Self {
        Self {
            instance,
            raw,
            len,
            release_queue: release_queue.map(Arc::downgrade),
        }
    }

    /// Instance that owns the backing memory.
    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn raw(&self) -> i32 {
        self.raw
    }

    /// Give up ownership without scheduling a release.
    pub(crate) fn into_raw(mut self) -> i32 {
        self.release_queue = None;
        self.raw
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        // The empty sequence owns no module memory.
        if self.raw == 0 {
            return;
        }
        let Some(queue) = self.release_queue.take().and_then(|q| q.upgrade()) else {
            return;
        };
        match queue.lock() {
            Ok(mut queue) => queue.push(self.raw),
            Err(_) => tracing::warn!("release queue of instance {} is poisoned", self.instance),
        };
    }
}
