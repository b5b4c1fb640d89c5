//! Unit tests for backup-relay building blocks
//!
//! Run with: `cargo test -p backup-relay-tests --test unit`

mod archive;
mod credentials;
