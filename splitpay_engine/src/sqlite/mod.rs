//! SQLite database module for the splitpay engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
