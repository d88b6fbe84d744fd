#![doc = "picrelay-core: core pipeline library for picrelay."]

//! This crate contains all pipeline logic, data models and trait contracts
//! for picrelay. Process bootstrap, configuration and the concrete Slack
//! client live in the binary crate.
//!
//! # Usage
//! Add this as a dependency for trigger matching, artifact handling,
//! conversion and the end-to-end pipeline. External collaborators (the
//! authenticated download and the Slack Web API) are traits in
//! [`contract`] so tests can drive the whole pipeline against mocks.

pub mod artifact;
pub mod contract;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod relay;
pub mod trigger;
