//! CSV batch interface used by the command line driver.

pub mod outcome_writer;
pub mod payment_reader;
