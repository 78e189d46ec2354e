pub mod cluster;
pub mod config;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod resolver;
pub mod service;
pub mod shutdown;
pub mod surface;
pub mod trigger;
