//! Shared test utilities for source-bridge integration tests
//!
//! Repositories are created through the real `git` CLI so that mirrors and
//! identities are exercised against genuine on-disk state.

pub mod fixtures;
pub mod repository;
