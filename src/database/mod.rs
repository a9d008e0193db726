pub mod manager;
pub mod mappers;
pub mod memory;
pub mod patch;
pub mod postgres;
pub mod query_builder;
pub mod repository;
pub mod schema;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use patch::Patch;
pub use postgres::PgStore;
pub use repository::{AssociationRepository, ObjectRepository, RepositoryError};
pub use schema::TableSchema;
pub use store::{Row, Store, StoreError};
