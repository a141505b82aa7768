//! Logging helpers for structured cheddar events.
//!
//! Events go through the `log` facade as `event=<name> [common kv] <fields>`.
//! The common key/value pairs come from a [`LogContext`] handed to the instance
//! at construction; nothing below the instance logs.

/// Single logging target for cheddar.
pub(crate) const LOG_TARGET: &str = "cheddar";

/// Key/value pairs appended to every event an instance emits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogContext {
    common_kv: String,
}

impl LogContext {
    /// Build a context that appends `common_kv`, e.g. `"db=orders"`.
    pub fn new(common_kv: impl Into<String>) -> Self {
        Self {
            common_kv: common_kv.into(),
        }
    }

    pub(crate) fn common_kv(&self) -> Option<&str> {
        if self.common_kv.is_empty() {
            None
        } else {
            Some(&self.common_kv)
        }
    }
}

macro_rules! cheddar_log {
    ($level:expr, ctx: $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            if let Some(common_kv) = $ctx.common_kv() {
                log::log!(
                    target: crate::logging::LOG_TARGET,
                    $level,
                    "event={} {} {}",
                    $event,
                    common_kv,
                    format_args!($fmt $(, $args)*)
                );
            } else {
                log::log!(
                    target: crate::logging::LOG_TARGET,
                    $level,
                    "event={} {}",
                    $event,
                    format_args!($fmt $(, $args)*)
                );
            }
        }
    }};
}

pub(crate) use cheddar_log;
