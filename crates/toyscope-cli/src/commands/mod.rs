//! CLI command implementations.

pub mod capture;
pub mod hex_utils;
pub mod hexdump;
pub mod render;
pub mod source;
