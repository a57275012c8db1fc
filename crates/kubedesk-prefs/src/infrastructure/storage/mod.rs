//! Storage infrastructure: store file persistence.
//!
//! This module provides a thin adapter between the application and the
//! file system.  The `store_file` sub-module handles:
//!
//! - Moving a store written under the legacy file name to the current one.
//! - Reading the TOML document, treating a missing or malformed file as empty.
//! - Writing the document back atomically (temp file + rename).
//!
//! Everything above this layer works with `toml::Table` documents and never
//! sees a path or an `std::io::Error` for the store file.

pub mod store_file;
