//! Replica Testing
//!
//! Scripted knowledge base fakes for exercising the ingestion workflow
//! without a live provider.

pub mod provider;

pub use provider::{ProviderCall, ScriptedProvider};
