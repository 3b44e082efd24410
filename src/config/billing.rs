//! Billing provider configuration

use serde::{Deserialize, Serialize};

/// Configuration for tier resolution and checkout sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Billing provider API base URL
    pub endpoint: String,
    /// API key (falls back to the STRIPE_SECRET_KEY env var)
    pub api_key: Option<String>,
    /// Price id that maps to the Pro tier
    pub pro_price_id: Option<String>,
    /// Price id that maps to the Agency tier
    pub agency_price_id: Option<String>,
    /// Price id that maps to the Enterprise tier
    pub enterprise_price_id: Option<String>,
    /// Tier resolution retry attempts, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,
    /// Daily scan allowance for the Free tier
    pub free_scans_per_day: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.stripe.com/v1".to_string(),
            api_key: None,
            pro_price_id: None,
            agency_price_id: None,
            enterprise_price_id: None,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            free_scans_per_day: 1,
        }
    }
}
