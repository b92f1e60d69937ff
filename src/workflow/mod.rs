//! Declarative workflow graph and the condition language guarding its edges.

pub mod condition;
pub mod definition;
