//! Integration tests for backup-relay
//!
//! These tests require Docker and the PostgreSQL client tools.
//! Run with: `cargo test -p backup-relay-tests --test integration -- --ignored`

mod common;
mod postgres;
