//! Infrastructure layer: persistence adapters, background jobs, use cases and
//! configuration.

pub mod config;
pub mod id_generator;
pub mod in_memory;
pub mod jobs;
pub mod postgres;
pub mod records;
pub mod repository;
pub mod use_cases;

pub use config::AppConfig;
pub use id_generator::{IdGenerator, SequenceIdGenerator, UuidV7Generator};
