//! Modules layer - Infrastructure components
//!
//! Contains adapters for external resources, currently the media filesystem.

pub mod storage;
