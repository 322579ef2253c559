pub mod engine;
pub mod manager;
pub mod models;
pub mod update;

pub use manager::{DatabaseError, DatabaseManager};
