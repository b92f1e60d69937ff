//! Card instrument validation performed before a card reaches the token vault.

use crate::domain::payment::CardData;
use crate::error::{PaymentError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Diners,
    Jcb,
}

impl CardNetwork {
    /// Detects the network from the card number prefix.
    pub fn detect(number: &str) -> Option<Self> {
        let prefix = |len: usize| -> Option<u32> { number.get(..len)?.parse().ok() };

        if number.starts_with('4') {
            return Some(CardNetwork::Visa);
        }
        if let Some(p) = prefix(2) {
            if (51..=55).contains(&p) {
                return Some(CardNetwork::Mastercard);
            }
            if p == 34 || p == 37 {
                return Some(CardNetwork::Amex);
            }
            if p == 36 || p == 38 || p == 39 {
                return Some(CardNetwork::Diners);
            }
            if p == 65 {
                return Some(CardNetwork::Discover);
            }
        }
        if let Some(p) = prefix(3) {
            if (300..=305).contains(&p) {
                return Some(CardNetwork::Diners);
            }
            if (644..=649).contains(&p) {
                return Some(CardNetwork::Discover);
            }
        }
        if let Some(p) = prefix(4) {
            if (2221..=2720).contains(&p) {
                return Some(CardNetwork::Mastercard);
            }
            if p == 6011 {
                return Some(CardNetwork::Discover);
            }
            if (3528..=3589).contains(&p) {
                return Some(CardNetwork::Jcb);
            }
        }
        None
    }

    pub fn valid_lengths(&self) -> &'static [usize] {
        match self {
            CardNetwork::Visa => &[13, 16, 19],
            CardNetwork::Mastercard => &[16],
            CardNetwork::Amex => &[15],
            CardNetwork::Discover => &[16, 17, 18, 19],
            CardNetwork::Diners => &[14, 15, 16, 17, 18, 19],
            CardNetwork::Jcb => &[16, 17, 18, 19],
        }
    }

    pub fn cvc_length(&self) -> usize {
        match self {
            CardNetwork::Amex => 4,
            _ => 3,
        }
    }
}

/// Luhn checksum over an all-digit string.
pub fn luhn_valid(number: &str) -> bool {
    let mut sum = 0;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    !number.is_empty() && sum % 10 == 0
}

/// Strips the separators shoppers commonly type.
pub fn normalize_number(number: &str) -> String {
    number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

/// Validates card number, expiry and CVC, returning the detected network.
pub fn validate_card(card: &CardData, today: NaiveDate) -> Result<CardNetwork> {
    let number = normalize_number(&card.number);
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::Validation(
            "Card number must contain only digits".to_string(),
        ));
    }

    let network = CardNetwork::detect(&number)
        .ok_or_else(|| PaymentError::Validation("Unsupported card network".to_string()))?;

    if !network.valid_lengths().contains(&number.len()) {
        return Err(PaymentError::Validation(format!(
            "Invalid card number length for {:?}",
            network
        )));
    }

    if !luhn_valid(&number) {
        return Err(PaymentError::Validation(
            "Card number failed checksum validation".to_string(),
        ));
    }

    if !(1..=12).contains(&card.expiry_month) {
        return Err(PaymentError::Validation(
            "Card expiry month must be between 1 and 12".to_string(),
        ));
    }

    let expired = card.expiry_year < today.year()
        || (card.expiry_year == today.year() && card.expiry_month < today.month());
    if expired {
        return Err(PaymentError::Validation("Card has expired".to_string()));
    }

    if card.cvc.len() != network.cvc_length() || !card.cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::Validation(format!(
            "CVC must be {} digits for {:?}",
            network.cvc_length(),
            network
        )));
    }

    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, month: u32, year: i32, cvc: &str) -> CardData {
        CardData {
            number: number.to_string(),
            expiry_month: month,
            expiry_year: year,
            cvc: cvc.to_string(),
            holder_name: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("378282246310005"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("41x1"));
    }

    #[test]
    fn test_network_detection() {
        assert_eq!(CardNetwork::detect("4111111111111111"), Some(CardNetwork::Visa));
        assert_eq!(CardNetwork::detect("5555555555554444"), Some(CardNetwork::Mastercard));
        assert_eq!(CardNetwork::detect("2223003122003222"), Some(CardNetwork::Mastercard));
        assert_eq!(CardNetwork::detect("378282246310005"), Some(CardNetwork::Amex));
        assert_eq!(CardNetwork::detect("6011111111111117"), Some(CardNetwork::Discover));
        assert_eq!(CardNetwork::detect("3530111333300000"), Some(CardNetwork::Jcb));
        assert_eq!(CardNetwork::detect("30569309025904"), Some(CardNetwork::Diners));
        assert_eq!(CardNetwork::detect("9999999999999999"), None);
    }

    #[test]
    fn test_valid_card() {
        let network = validate_card(&card("4111 1111 1111 1111", 12, 2030, "123"), today()).unwrap();
        assert_eq!(network, CardNetwork::Visa);

        let network = validate_card(&card("378282246310005", 6, 2026, "1234"), today()).unwrap();
        assert_eq!(network, CardNetwork::Amex);
    }

    #[test]
    fn test_expired_card() {
        let result = validate_card(&card("4111111111111111", 5, 2026, "123"), today());
        assert!(matches!(result, Err(PaymentError::Validation(msg)) if msg.contains("expired")));
    }

    #[test]
    fn test_cvc_length_depends_on_network() {
        assert!(validate_card(&card("378282246310005", 12, 2030, "123"), today()).is_err());
        assert!(validate_card(&card("4111111111111111", 12, 2030, "1234"), today()).is_err());
    }

    #[test]
    fn test_bad_length_and_checksum() {
        assert!(validate_card(&card("41111111111", 12, 2030, "123"), today()).is_err());
        assert!(validate_card(&card("4111111111111112", 12, 2030, "123"), today()).is_err());
        assert!(validate_card(&card("9111111111111111", 12, 2030, "123"), today()).is_err());
    }
}
