//! # papagaio-core
//!
//! Core types, traits, configuration, and reply primitives for the papagaio bot.

pub mod chance;
pub mod config;
pub mod delay;
pub mod error;
pub mod lifecycle;
pub mod location;
pub mod message;
pub mod phrase;
pub mod traits;
