//! Database layer - connection pool, schema and repositories
//!
//! - Connection pool shared by every repository handle
//! - Row locks and isolation come from PostgreSQL, not the process
//! - `MemoryTodoRepo` mirrors the same contract without a database

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repos;

pub use memory::MemoryTodoRepo;
pub use pool::{create_pool, create_pool_with_options};
pub use repos::{DbError, PgTodoRepo, TodoRepository};
