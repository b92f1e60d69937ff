use crate::domain::card::validate_card;
use crate::domain::payment::{Payment, PaymentInstrument};
use crate::domain::ports::{Headers, TokenVault};
use crate::error::Result;
use chrono::NaiveDate;
use tracing::debug;

/// Validates a raw card on the payment and swaps it for a vault token.
///
/// Already tokenized instruments and payments without an instrument are left
/// alone. Validation and vault failures are returned to the caller.
pub async fn tokenize_instrument(
    vault: &dyn TokenVault,
    headers: &Headers,
    payment: &mut Payment,
    today: NaiveDate,
) -> Result<()> {
    let Some(PaymentInstrument::Card(card)) = &payment.instrument else {
        return Ok(());
    };

    let network = validate_card(card, today)?;
    let mut tokenized = vault.create_token(headers, card).await?;
    tokenized.network = network;

    debug!(payment_id = %payment.id, masked = %tokenized.masked_number, "card tokenized");
    payment.instrument = Some(PaymentInstrument::TokenizedCard(tokenized));
    Ok(())
}
