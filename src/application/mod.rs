//! Application layer containing the workflow orchestration.
//!
//! `PaymentOrchestrator` is the entry point: it resolves the merchant, builds
//! the execution context and walks the workflow graph, running the steps it
//! gets from the `ActionRegistry`.

pub mod actions;
pub mod orchestrator;
pub mod registry;
pub mod tokenization;
