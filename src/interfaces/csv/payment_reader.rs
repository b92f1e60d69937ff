use crate::domain::payment::{Amount, CaptureMethod, CardData, Payment};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the payments batch file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub reference: String,
    pub merchant: String,
    pub amount: Decimal,
    pub currency: String,
    pub capture_method: Option<CaptureMethod>,
    pub card_number: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
    pub cvc: Option<String>,
}

impl PaymentRecord {
    /// Converts the row into a new payment.
    ///
    /// A card number without expiry and CVC is a validation error.
    pub fn into_payment(self) -> Result<Payment> {
        let mut payment = Payment::new(Amount::new(self.amount)?, self.currency)
            .with_merchant(self.merchant)
            .with_capture_method(self.capture_method.unwrap_or_default());
        payment.reference = Some(self.reference);

        if let Some(number) = self.card_number {
            let (Some(expiry_month), Some(expiry_year), Some(cvc)) =
                (self.expiry_month, self.expiry_year, self.cvc)
            else {
                return Err(PaymentError::Validation(
                    "Card expiry and CVC are required with a card number".to_string(),
                ));
            };
            payment = payment.with_card(CardData {
                number,
                expiry_month,
                expiry_year,
                cvc,
                holder_name: None,
            });
        }
        Ok(payment)
    }
}

/// Reads payments from a CSV source.
///
/// Wraps `csv::Reader` and yields one `Result<Payment>` per row, so a bad
/// row does not stop the batch.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a reader over `source`, trimming fields and tolerating short rows.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts rows, in file order.
    pub fn payments(self) -> impl Iterator<Item = Result<Payment>> {
        self.reader
            .into_deserialize::<PaymentRecord>()
            .map(|row| row.map_err(PaymentError::from).and_then(PaymentRecord::into_payment))
    }
}
