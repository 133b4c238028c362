//! Application layer for the Storage context.

pub mod command_handlers;
pub mod ports;
pub mod query_handlers;
pub mod settings;
pub mod subscribers;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_doubles;
