//! Infrastructure adapters for the Storage context.

pub mod image_processor;
pub mod in_memory;
pub mod local;
pub mod validator;
