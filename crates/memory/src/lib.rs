//! Memory service implementations for FitCoach.

pub mod noop;
pub mod in_memory;

pub use noop::NoopMemory;
pub use in_memory::InMemoryMemoryService;

use std::sync::Arc;
use fitcoach_config::{MemoryBackend, MemoryConfig};
use fitcoach_core::memory::MemoryService;

/// Create the memory service selected in configuration.
pub fn from_config(config: &MemoryConfig) -> Arc<dyn MemoryService> {
    match config.backend {
        MemoryBackend::InMemory => Arc::new(InMemoryMemoryService::new()),
        MemoryBackend::None => Arc::new(NoopMemory),
    }
}
