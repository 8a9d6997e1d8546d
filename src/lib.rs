//! Try-on request orchestrator for the Stash streetwear app
//!
//! Brokers the app's premium AI features against a generative provider: stylist
//! advice, photorealistic try-on composites of a user photo wearing a catalog
//! product, and short animated clips produced by an asynchronous video job.

pub mod ai;
pub mod bag;
pub mod catalog;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod poll;
pub mod prompts;

pub use error::{Error, Result};
