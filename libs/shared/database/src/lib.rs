pub mod memory;
pub mod repository;
pub mod supabase;
pub mod supabase_store;

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StorageBackend};

pub use memory::MemoryStore;
pub use repository::{AdminRemoval, BookingStore, StoreError, StoreResult};
pub use supabase::SupabaseClient;
pub use supabase_store::SupabaseStore;

/// Builds the store selected by `STORAGE_BACKEND`.
pub fn connect(config: &AppConfig) -> Arc<dyn BookingStore> {
    match config.storage_backend {
        StorageBackend::Supabase => {
            info!("Using Supabase storage at {}", config.supabase_url);
            Arc::new(SupabaseStore::new(Arc::new(SupabaseClient::new(config))))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    }
}
