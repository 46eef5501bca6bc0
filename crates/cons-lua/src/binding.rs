//! Shared state behind the module functions and handle methods.

use crate::codec::RecordCodec;
use crate::resolver::FlagResolver;
use cons_core::config::MIN_TITLE_CAPACITY;
use cons_core::{ConsoleApi, FlagTable};
use std::io;
use std::sync::Arc;

/// Console API, flag resolver and codec used by one registered module.
pub struct ConsoleBinding {
    pub(crate) api: Arc<dyn ConsoleApi>,
    pub(crate) resolver: FlagResolver,
    pub(crate) codec: RecordCodec,
    pub(crate) title_capacity: usize,
}

impl ConsoleBinding {
    #[must_use]
    pub fn new(api: Arc<dyn ConsoleApi>, flags: Arc<FlagTable>, title_capacity: usize) -> Self {
        let resolver = FlagResolver::new(flags);
        Self {
            api,
            codec: RecordCodec::new(resolver.clone()),
            resolver,
            title_capacity: title_capacity.max(MIN_TITLE_CAPACITY),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &FlagResolver {
        &self.resolver
    }

    #[must_use]
    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }
}

impl std::fmt::Debug for ConsoleBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleBinding")
            .field("flags", &self.resolver.table().len())
            .field("title_capacity", &self.title_capacity)
            .finish_non_exhaustive()
    }
}

/// Turns a declined console call into "no result".
pub(crate) fn soft<T>(function: &'static str, result: io::Result<T>) -> Option<T> {
    result
        .inspect_err(|e| tracing::debug!(function, error = %e, "Console call failed"))
        .ok()
}
