pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::DurableStore;

use crate::config::StorageConfig;
use std::sync::Arc;

/// Factory: create the durable store described by config
pub fn create_store(config: &StorageConfig) -> Arc<dyn DurableStore> {
    match config.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        "file" => Arc::new(FileStore::new(config.resolved_dir())),
        other => {
            tracing::warn!(
                "Unknown storage backend '{}', falling back to file",
                other
            );
            Arc::new(FileStore::new(config.resolved_dir()))
        }
    }
}
