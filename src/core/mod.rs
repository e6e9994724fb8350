//! Configuration, secrets and the value types shared by every stage.

pub mod config;
pub mod models;
pub mod secrets;
