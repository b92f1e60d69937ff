//! Adapters behind the domain ports: in-memory collaborators, the demo
//! partner, fraud scorers and the redirect wrapper.

pub mod fraud;
pub mod in_memory;
pub mod redirect;
pub mod simulated_partner;
