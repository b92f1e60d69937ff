use crate::domain::card::{CardNetwork, normalize_number};
use crate::domain::event::PaymentEvent;
use crate::domain::merchant::Merchant;
use crate::domain::payment::{CardData, TokenizedCard};
use crate::domain::ports::{EventPublisher, Headers, MerchantLookup, TokenVault};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory merchant directory.
///
/// Stands in for the settings service when running locally and in tests.
#[derive(Default, Clone)]
pub struct InMemoryMerchantStore {
    merchants: Arc<RwLock<HashMap<String, Merchant>>>,
}

impl InMemoryMerchantStore {
    /// Creates a new, empty in-memory merchant store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a merchant, keyed by its id.
    pub async fn store(&self, merchant: Merchant) {
        let mut merchants = self.merchants.write().await;
        merchants.insert(merchant.id.clone(), merchant);
    }

    /// Creates a store pre-loaded with `merchants`.
    pub async fn with_merchants(merchants: impl IntoIterator<Item = Merchant>) -> Self {
        let store = Self::new();
        for merchant in merchants {
            store.store(merchant).await;
        }
        store
    }
}

#[async_trait]
impl MerchantLookup for InMemoryMerchantStore {
    async fn get_merchant(&self, _headers: &Headers, merchant_id: &str) -> Result<Option<Merchant>> {
        let merchants = self.merchants.read().await;
        Ok(merchants.get(merchant_id).cloned())
    }
}

/// Token vault keeping card data in memory, keyed by token.
#[derive(Default, Clone)]
pub struct InMemoryTokenVault {
    cards: Arc<RwLock<HashMap<String, CardData>>>,
}

impl InMemoryTokenVault {
    /// Creates a new, empty token vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cards held.
    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}

#[async_trait]
impl TokenVault for InMemoryTokenVault {
    async fn create_token(&self, _headers: &Headers, card: &CardData) -> Result<TokenizedCard> {
        let number = normalize_number(&card.number);
        let network = CardNetwork::detect(&number)
            .ok_or_else(|| PaymentError::TokenVault("Unsupported card network".to_string()))?;
        if number.len() < 10 {
            return Err(PaymentError::TokenVault("Card number too short".to_string()));
        }

        let bin = number[..6].to_string();
        let last4 = number[number.len() - 4..].to_string();
        let masked_number = format!("{}{}{}", bin, "*".repeat(number.len() - 10), last4);
        let token = format!("tok_{}", Uuid::new_v4().simple());

        let mut stored = card.clone();
        stored.number = number;
        self.cards.write().await.insert(token.clone(), stored);

        Ok(TokenizedCard {
            token,
            masked_number,
            bin,
            last4,
            network,
            expiry_month: card.expiry_month,
            expiry_year: card.expiry_year,
            holder_name: card.holder_name.clone(),
            issuer_name: None,
            country: None,
        })
    }

    async fn decrypt_token(
        &self,
        _headers: &Headers,
        token: &str,
        _merchant_id: &str,
    ) -> Result<CardData> {
        let cards = self.cards.read().await;
        cards
            .get(token)
            .cloned()
            .ok_or_else(|| PaymentError::TokenVault(format!("Unknown token {}", token)))
    }
}

/// Event publisher that keeps every published event, in order.
#[derive(Default, Clone)]
pub struct RecordingEventPublisher {
    events: Arc<RwLock<Vec<PaymentEvent>>>,
}

impl RecordingEventPublisher {
    /// Creates a publisher with no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event published so far, oldest first.
    pub async fn events(&self) -> Vec<PaymentEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: PaymentEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::PaymentEventType;
    use crate::domain::merchant::PartnerConfig;
    use crate::domain::payment::{Amount, Payment};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_merchant_store() {
        let store = InMemoryMerchantStore::new();
        let merchant = Merchant::new("m-1", "Shop", PartnerConfig::new("adyen"));
        store.store(merchant.clone()).await;

        let headers = Headers::new();
        assert_eq!(store.get_merchant(&headers, "m-1").await.unwrap(), Some(merchant));
        assert!(store.get_merchant(&headers, "m-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_vault_tokenize_and_decrypt() {
        let vault = InMemoryTokenVault::new();
        let card = CardData {
            number: "4111 1111 1111 1111".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvc: "123".to_string(),
            holder_name: Some("J Doe".to_string()),
        };
        let headers = Headers::new();

        let tokenized = vault.create_token(&headers, &card).await.unwrap();
        assert!(tokenized.token.starts_with("tok_"));
        assert_eq!(tokenized.masked_number, "411111******1111");
        assert_eq!(tokenized.bin, "411111");
        assert_eq!(tokenized.last4, "1111");
        assert_eq!(tokenized.network, CardNetwork::Visa);

        let decrypted = vault.decrypt_token(&headers, &tokenized.token, "m-1").await.unwrap();
        assert_eq!(decrypted.number, "4111111111111111");
        assert_eq!(decrypted.cvc, "123");

        assert!(vault.decrypt_token(&headers, "tok_missing", "m-1").await.is_err());
    }

    #[tokio::test]
    async fn test_recording_publisher_keeps_order() {
        let publisher = RecordingEventPublisher::new();
        let payment = Payment::new(Amount::new(dec!(5)).unwrap(), "EUR");

        publisher.publish(PaymentEvent::new(PaymentEventType::Initiated, &payment)).await.unwrap();
        publisher.publish(PaymentEvent::new(PaymentEventType::Authorized, &payment)).await.unwrap();

        let types: Vec<_> = publisher.events().await.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![PaymentEventType::Initiated, PaymentEventType::Authorized]);
    }
}
