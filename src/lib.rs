pub mod cache;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod mapper;
pub mod row;
pub mod schema;

pub use crate::error::{Error, Result};
pub use crate::mapper::BinaryMapper;

#[cfg(test)]
mod tests;
