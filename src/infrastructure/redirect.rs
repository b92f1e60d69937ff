use crate::domain::payment::PaymentAction;
use crate::error::{PaymentError, Result};
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const NONCE_LEN: usize = 12;

/// Hides partner redirect targets behind this system's checkout endpoint.
///
/// A partner redirect (`url`, `method`, `data`) is sealed with AES-256-GCM
/// under a key derived from the server secret and handed to the client as an
/// opaque `payload` on our own redirect URL. Only the checkout redirect
/// endpoint opens it again.
pub struct RedirectWrapper {
    cipher: Aes256Gcm,
    checkout_base_url: String,
    return_base_url: String,
}

impl RedirectWrapper {
    /// Creates a wrapper keyed by the SHA-256 of `secret`.
    ///
    /// # Arguments
    ///
    /// * `secret` - Server secret the AES-256-GCM key is derived from.
    /// * `checkout_base_url` - Public base of the checkout redirect endpoint.
    /// * `return_base_url` - Public base shoppers are sent back to.
    pub fn new(
        secret: &str,
        checkout_base_url: impl Into<String>,
        return_base_url: impl Into<String>,
    ) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()));
        Self {
            cipher,
            checkout_base_url: checkout_base_url.into().trim_end_matches('/').to_string(),
            return_base_url: return_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn redirect_prefix(&self) -> String {
        format!("{}/checkout/redirect/", self.checkout_base_url)
    }

    /// Whether `action` already points at our checkout endpoint.
    pub fn is_wrapped(&self, action: &PaymentAction) -> bool {
        action.url.starts_with(&self.redirect_prefix())
    }

    /// Seals a partner redirect and points it at the checkout endpoint.
    pub fn wrap(&self, payment_id: Uuid, action: &PaymentAction) -> Result<PaymentAction> {
        let payload = serde_json::to_vec(action)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, payload.as_ref())
            .map_err(|e| PaymentError::Redirect(format!("Encryption failed: {}", e)))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(PaymentAction {
            url: format!(
                "{}{}?payload={}",
                self.redirect_prefix(),
                payment_id,
                URL_SAFE_NO_PAD.encode(combined)
            ),
            method: "GET".to_string(),
            data: None,
        })
    }

    /// Opens a payload produced by [`RedirectWrapper::wrap`].
    pub fn unwrap(&self, payload: &str) -> Result<PaymentAction> {
        let combined = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| PaymentError::Redirect(format!("Base64 decode failed: {}", e)))?;
        if combined.len() <= NONCE_LEN {
            return Err(PaymentError::Redirect("Payload too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| PaymentError::Redirect(format!("Decryption failed: {}", e)))?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// URL a partner sends the shopper back to, tagged with the partner name
    /// so the confirmation can be matched against the in-flight partner.
    pub fn return_url(&self, payment_id: Uuid, partner_name: &str) -> String {
        format!(
            "{}/payments/{}/return?partner={}",
            self.return_base_url,
            payment_id,
            urlencoding::encode(partner_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrapper() -> RedirectWrapper {
        RedirectWrapper::new("test-secret", "https://pay.example.com/", "https://api.example.com")
    }

    fn partner_action() -> PaymentAction {
        PaymentAction {
            url: "https://acs.partner.test/challenge".to_string(),
            method: "POST".to_string(),
            data: Some(json!({"PaReq": "abc", "MD": "xyz"})),
        }
    }

    #[test]
    fn test_wrap_hides_partner_url() {
        let wrapper = wrapper();
        let id = Uuid::new_v4();
        let wrapped = wrapper.wrap(id, &partner_action()).unwrap();

        assert!(wrapped.url.starts_with(&format!("https://pay.example.com/checkout/redirect/{}?payload=", id)));
        assert!(!wrapped.url.contains("partner.test"));
        assert_eq!(wrapped.method, "GET");
        assert!(wrapped.data.is_none());
        assert!(wrapper.is_wrapped(&wrapped));
        assert!(!wrapper.is_wrapped(&partner_action()));

        let payload = wrapped.url.split("payload=").nth(1).unwrap();
        assert_eq!(wrapper.unwrap(payload).unwrap(), partner_action());
    }

    #[test]
    fn test_payload_bound_to_secret() {
        let wrapped = wrapper().wrap(Uuid::new_v4(), &partner_action()).unwrap();
        let payload = wrapped.url.split("payload=").nth(1).unwrap();

        let other = RedirectWrapper::new("another-secret", "https://pay.example.com", "https://api.example.com");
        assert!(matches!(other.unwrap(payload), Err(PaymentError::Redirect(msg)) if msg.contains("Decryption")));
    }

    #[test]
    fn test_unwrap_rejects_garbage() {
        let wrapper = wrapper();
        assert!(wrapper.unwrap("not base64 !!").is_err());
        assert!(matches!(wrapper.unwrap("c2hvcnQ"), Err(PaymentError::Redirect(msg)) if msg.contains("too short")));
    }

    #[test]
    fn test_return_url_carries_partner() {
        let id = Uuid::new_v4();
        assert_eq!(
            wrapper().return_url(id, "adyen"),
            format!("https://api.example.com/payments/{}/return?partner=adyen", id)
        );
    }

    #[test]
    fn test_return_url_encodes_partner_name() {
        let id = Uuid::new_v4();
        assert_eq!(
            wrapper().return_url(id, "acme pay&x=1#frag"),
            format!(
                "https://api.example.com/payments/{}/return?partner=acme%20pay%26x%3D1%23frag",
                id
            )
        );
    }
}
