//! Infrastructure adapters for the Identity context.

pub mod in_memory;
pub mod password;
