#![doc = include_str!("../README.md")]

pub mod error;
mod generator;
pub mod protocol;
pub mod tools;

pub use error::{Error, GENERATION_FAILED, INTERNAL_ERROR, Result};
pub use generator::{OsRandom, RandSource, ThreadRandom, UuidGenerator};
// Public re-export so downstream crates can name `Uuid` via
// `uuid_mcp_core::uuid`
pub use uuid;
