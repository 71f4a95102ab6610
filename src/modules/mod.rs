//! Modules layer - Infrastructure components
//!
//! Contains the storage adapters the features are built on.

pub mod storage;
