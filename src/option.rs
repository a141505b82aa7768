//! Instance configuration.

use std::path::PathBuf;

use crate::{cache::DEFAULT_CACHE_CAPACITY, logging::LogContext};

/// Configuration of an [`Instance`](crate::Instance).
#[derive(Debug, Clone)]
pub struct InstanceOption {
    pub(crate) path: PathBuf,
    pub(crate) cache_capacity: usize,
    pub(crate) pooled_buffers: usize,
    pub(crate) store_cache_bytes: u64,
    pub(crate) flush_every_ms: Option<u64>,
    pub(crate) temporary: bool,
    pub(crate) log_context: LogContext,
}

impl<P> From<P> for InstanceOption
where
    P: Into<PathBuf>,
{
    fn from(path: P) -> Self {
        InstanceOption {
            path: path.into(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            pooled_buffers: 16,
            store_cache_bytes: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
            temporary: false,
            log_context: LogContext::default(),
        }
    }
}

impl InstanceOption {
    /// Directory of the embedded store.
    pub fn path(self, path: impl Into<PathBuf>) -> Self {
        InstanceOption {
            path: path.into(),
            ..self
        }
    }

    /// Number of resolved schemas, column indices and segment sets kept.
    pub fn cache_capacity(self, cache_capacity: usize) -> Self {
        InstanceOption {
            cache_capacity,
            ..self
        }
    }

    /// Number of idle scratch buffers kept for encoding.
    pub fn pooled_buffers(self, pooled_buffers: usize) -> Self {
        InstanceOption {
            pooled_buffers,
            ..self
        }
    }

    /// Page cache size of the embedded store, in bytes.
    pub fn store_cache_bytes(self, store_cache_bytes: u64) -> Self {
        InstanceOption {
            store_cache_bytes,
            ..self
        }
    }

    /// Background flush interval of the embedded store; `None` disables it.
    pub fn flush_every_ms(self, flush_every_ms: Option<u64>) -> Self {
        InstanceOption {
            flush_every_ms,
            ..self
        }
    }

    /// Remove the store directory when the instance is dropped.
    pub fn temporary(self, temporary: bool) -> Self {
        InstanceOption { temporary, ..self }
    }

    /// Fields prepended to every log line of the instance.
    pub fn log_context(self, log_context: LogContext) -> Self {
        InstanceOption {
            log_context,
            ..self
        }
    }
}
