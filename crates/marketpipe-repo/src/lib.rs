//! marketpipe-repo
//!
//! Durable storage for the Checkpoint Store and the Job Repository (§4.4).
//! Both are thin wrappers over a single `sqlx::AnyPool`, so the same query
//! text serves the embedded SQLite store used for local ingestion and the
//! Postgres store used in client-server deployments — callers choose the
//! backend by connection URL, never by code path.

pub mod checkpoint_store;
pub mod error;
pub mod job_repository;
pub mod pool;

pub use checkpoint_store::CheckpointStore;
pub use error::RepositoryError;
pub use job_repository::JobRepository;
pub use pool::{connect, connect_from_env, ensure_schema, ENV_DB_URL};
