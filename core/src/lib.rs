//! Shared domain types for the Personalize MCP adapter.
//!
//! Everything here is transport-agnostic: credential extraction results,
//! the region enumeration, the flow (experience) model sent to the tenant
//! API, and the uniform outcome envelope every facade operation returns.

pub mod credentials;
pub mod flows;
pub mod outcome;
pub mod region;
