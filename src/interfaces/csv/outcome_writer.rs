use crate::application::orchestrator::WorkflowOutcome;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRow<'a> {
    reference: &'a str,
    payment_id: String,
    status: String,
    authorize_attempts: u32,
    capture_attempts: u32,
    refusal_reason: Option<&'a str>,
    error: Option<String>,
}

/// Writes one CSV row per workflow outcome.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    /// Creates a writer; the header row is emitted with the first record.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the row for one workflow run.
    ///
    /// # Arguments
    ///
    /// * `reference` - Merchant reference of the payment, echoed back.
    /// * `outcome` - Result of the run; a missing context leaves the payment columns empty.
    pub fn write_outcome(&mut self, reference: &str, outcome: &WorkflowOutcome) -> Result<()> {
        let ctx = outcome.context.as_ref();
        let row = OutcomeRow {
            reference,
            payment_id: ctx.map(|c| c.payment.id.to_string()).unwrap_or_default(),
            status: ctx.map(|c| c.payment.status.to_string()).unwrap_or_default(),
            authorize_attempts: ctx.map_or(0, |c| c.authorize_attempts),
            capture_attempts: ctx.map_or(0, |c| c.capture_attempts),
            refusal_reason: ctx.and_then(|c| c.payment.refusal_reason.as_deref()),
            error: outcome.error.as_ref().map(ToString::to_string),
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    /// Records a row that never reached the orchestrator, such as a CSV
    /// parse failure.
    pub fn write_rejected(&mut self, reference: &str, error: &dyn std::fmt::Display) -> Result<()> {
        self.writer.serialize(OutcomeRow {
            reference,
            payment_id: String::new(),
            status: String::new(),
            authorize_attempts: 0,
            capture_attempts: 0,
            refusal_reason: None,
            error: Some(error.to_string()),
        })?;
        Ok(())
    }

    /// Flushes buffered rows to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
