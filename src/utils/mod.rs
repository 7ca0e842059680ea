//! Filesystem helpers shared by the site operations.
//!
//! All helpers are synchronous and report failures as
//! [`DrError::FileSystem`](crate::core::DrError::FileSystem). Async callers
//! run them inside `spawn_blocking`.

pub mod fs;

pub use fs::{atomic_write, copy_dir, remove_dir_all, write_private};
