use crate::domain::card::CardNetwork;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Represents a positive monetary amount for payments and operations.
///
/// Ensures that requested amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates an amount, rejecting zero and negative values.
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation("Amount must be positive".to_string()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    AuthorizationPending,
    Authorized,
    Refused,
    Error,
    PartiallyCaptured,
    Captured,
    Voided,
    Refunded,
    Reversed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Initiated => "INITIATED",
            PaymentStatus::AuthorizationPending => "AUTHORIZATION_PENDING",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::Refused => "REFUSED",
            PaymentStatus::Error => "ERROR",
            PaymentStatus::PartiallyCaptured => "PARTIALLY_CAPTURED",
            PaymentStatus::Captured => "CAPTURED",
            PaymentStatus::Voided => "VOIDED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Reversed => "REVERSED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureMethod {
    #[default]
    Automatic,
    Delayed,
    Manual,
}

/// Raw card data as submitted by the merchant, before tokenization.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub number: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvc: String,
    #[serde(default)]
    pub holder_name: Option<String>,
}

// Never print the PAN or CVC.
impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.number.len();
        let last4 = self.number.get(digits.saturating_sub(4)..).unwrap_or("");
        f.debug_struct("CardData")
            .field("number", &format_args!("****{}", last4))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("holder_name", &self.holder_name)
            .finish()
    }
}

/// Card reference returned by the token vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizedCard {
    pub token: String,
    pub masked_number: String,
    pub bin: String,
    pub last4: String,
    pub network: CardNetwork,
    pub expiry_month: u32,
    pub expiry_year: i32,
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub issuer_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaymentInstrument {
    Card(CardData),
    TokenizedCard(TokenizedCard),
}

/// A redirect instruction the client has to follow (3-D Secure, wallets, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAction {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationData {
    /// Where the partner sends the shopper back after the challenge.
    pub return_url: Option<String>,
    pub result: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    pub code: Option<String>,
    pub partner_reference: Option<String>,
    pub authorized_at: Option<DateTime<Utc>>,
}

/// The payment record the whole workflow exists to advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: Amount,
    pub currency: String,
    #[serde(default)]
    pub capture_method: CaptureMethod,
    pub status: PaymentStatus,
    #[serde(default)]
    pub instrument: Option<PaymentInstrument>,
    #[serde(default)]
    pub authentication: AuthenticationData,
    #[serde(default)]
    pub authorization: AuthorizationData,
    #[serde(default)]
    pub captured_amount: Decimal,
    #[serde(default)]
    pub refunded_amount: Decimal,
    #[serde(default)]
    pub refusal_reason: Option<String>,
    #[serde(default)]
    pub action: Option<PaymentAction>,
}

impl Payment {
    /// Creates a new `INITIATED` payment with a fresh id.
    pub fn new(amount: Amount, currency: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id: None,
            reference: None,
            amount,
            currency: currency.into(),
            capture_method: CaptureMethod::default(),
            status: PaymentStatus::Initiated,
            instrument: None,
            authentication: AuthenticationData::default(),
            authorization: AuthorizationData::default(),
            captured_amount: Decimal::ZERO,
            refunded_amount: Decimal::ZERO,
            refusal_reason: None,
            action: None,
        }
    }

    pub fn with_merchant(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    /// Sets a raw card as the instrument; it is tokenized on initiation.
    pub fn with_card(mut self, card: CardData) -> Self {
        self.instrument = Some(PaymentInstrument::Card(card));
        self
    }

    pub fn with_capture_method(mut self, capture_method: CaptureMethod) -> Self {
        self.capture_method = capture_method;
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    /// Amount that can still be refunded.
    ///
    /// Payments captured before `captured_amount` was tracked fall back to
    /// the full authorized amount.
    pub fn refundable_amount(&self) -> Decimal {
        let captured = if self.captured_amount > Decimal::ZERO {
            self.captured_amount
        } else {
            self.amount.value()
        };
        (captured - self.refunded_amount).max(Decimal::ZERO)
    }

    /// The vault card, once the instrument has been tokenized.
    pub fn tokenized_card(&self) -> Option<&TokenizedCard> {
        match &self.instrument {
            Some(PaymentInstrument::TokenizedCard(card)) => Some(card),
            _ => None,
        }
    }
}
