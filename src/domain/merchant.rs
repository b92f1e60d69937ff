use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partner integration selected for a merchant, with its account settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerConfig {
    pub name: String,
    #[serde(default)]
    pub merchant_account: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl PartnerConfig {
    /// Creates a partner configuration with no account or settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            merchant_account: None,
            settings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudSettings {
    /// Screen the payment before authentication and authorization.
    #[serde(default)]
    pub pre_authentication: bool,
    /// Screen the payment again once it is authorized.
    #[serde(default)]
    pub post_authorization: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub name: String,
    pub partner: PartnerConfig,
    /// Whether payments of this merchant go through shopper authentication.
    #[serde(default)]
    pub authentication_enabled: bool,
    #[serde(default)]
    pub fraud: FraudSettings,
}

impl Merchant {
    /// Creates a merchant without authentication or fraud screening.
    pub fn new(id: impl Into<String>, name: impl Into<String>, partner: PartnerConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            partner,
            authentication_enabled: false,
            fraud: FraudSettings::default(),
        }
    }
}
