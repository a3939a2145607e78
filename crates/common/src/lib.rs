//! Common utilities shared across the drinks service crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header parsing, size limits, algorithm policy)
pub mod jwt;
