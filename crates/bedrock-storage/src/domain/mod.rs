//! Domain layer for the Storage context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod repository;
pub mod value_objects;
