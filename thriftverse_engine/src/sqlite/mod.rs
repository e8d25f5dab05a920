//! SQLite backend for the ThriftVerse payment engine.

pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
