pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod scoped;
pub mod seed;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use scoped::{resolve_tenant_scoped, Resolution, TenantScopedLookup};
pub use store::{TenantStore, UserStore};
