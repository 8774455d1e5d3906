//! CLI command implementations.

pub mod common;
pub mod inspect;
pub mod train;
pub mod validate;
pub mod version;
