//! Infrastructure layer.

pub mod database;
pub mod document;
pub mod notifier;
pub mod storage;

pub use self::database::Database;
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
