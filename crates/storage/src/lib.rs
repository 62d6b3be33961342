//! Entity data gateways for pipedeps.
//!
//! This crate provides the trait-based query surface the resolver reads
//! production-tracking data through, with an in-memory snapshot and a
//! JSON-directory implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory_gateway;
pub mod json_gateway;

pub use trait_::{EntityGateway, GatewayError, Result};
pub use memory_gateway::MemoryGateway;
pub use json_gateway::JsonGateway;
