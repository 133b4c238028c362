//! Application layer for the Identity context.

pub mod command_handlers;
pub mod ports;
pub mod query_handlers;
