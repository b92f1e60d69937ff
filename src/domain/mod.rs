//! Domain model: the payment record, its operations, the execution context
//! and the contracts of the collaborators the workflow calls out to.

pub mod card;
pub mod context;
pub mod event;
pub mod merchant;
pub mod operation;
pub mod payment;
pub mod ports;
