//! Tier resolution and billing collaborator
//!
//! The scan pipeline consumes two capabilities from the billing provider:
//! resolving a user's subscription tier, and creating a checkout session
//! URL. Tier is re-resolved per scan rather than cached, since it can
//! change out-of-band after a payment.

mod quota;

pub use quota::QuotaLedger;

use crate::config::BillingConfig;
use crate::util::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Subscription tier. Gating of scan depth, exports, and simulation is a
/// pure function of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Pro,
    Agency,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::Agency => "Agency",
            Self::Enterprise => "Enterprise",
        }
    }

    /// Paid tiers may export reports
    pub fn allows_export(&self) -> bool {
        *self != Self::Free
    }

    /// Paid tiers may run persona simulations
    pub fn allows_simulation(&self) -> bool {
        *self != Self::Free
    }

    /// Paid tiers have no daily scan cap
    pub fn unlimited_scans(&self) -> bool {
        *self != Self::Free
    }

    /// The scan depth this tier actually gets for a requested mode: Free
    /// is always downgraded to Preview.
    pub fn effective_mode(&self, requested: crate::types::ScanMode) -> crate::types::ScanMode {
        if *self == Self::Free {
            crate::types::ScanMode::Preview
        } else {
            requested
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the billing provider
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Billing request failed: {0}")]
    RequestFailed(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Billing provider capabilities consumed by the core
#[async_trait]
pub trait TierResolver: Send + Sync {
    /// Resolve the identity's current subscription tier
    async fn resolve_tier(&self, identity: &str) -> Result<Tier, BillingError>;

    /// Create a checkout session and return its redirect URL
    async fn checkout_url(&self, identity: &str, price_id: &str) -> Result<String, BillingError>;
}

/// Resolve a tier with bounded retry and exponential backoff.
///
/// Resolution failure degrades to `Free` rather than failing the scan;
/// an unreachable billing provider should never block a user from
/// scanning at the base tier.
pub async fn resolve_tier_with_retry(
    resolver: &dyn TierResolver,
    identity: &str,
    policy: &RetryPolicy,
) -> Tier {
    let mut attempt = 0;
    loop {
        match resolver.resolve_tier(identity).await {
            Ok(tier) => {
                debug!(identity, tier = %tier, "Tier resolved");
                return tier;
            }
            Err(e) if policy.should_retry(attempt) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    identity,
                    attempt = attempt + 1,
                    "Tier resolution failed: {} (retrying in {:?})",
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(identity, "Unable to verify subscription: {}", e);
                return Tier::Free;
            }
        }
    }
}

// ============================================================================
// HTTP resolver (Stripe-compatible API)
// ============================================================================

/// Tier resolver backed by a Stripe-compatible billing API
pub struct HttpTierResolver {
    client: reqwest::Client,
    endpoint: String,
    price_map: HashMap<String, Tier>,
    success_url: String,
}

#[derive(Debug, Deserialize)]
struct CustomerSearchResponse {
    data: Vec<Customer>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    data: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    status: String,
    #[serde(default)]
    items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionItems {
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    url: String,
}

#[derive(Debug, Serialize)]
struct CheckoutParams<'a> {
    #[serde(rename = "line_items[0][price]")]
    price: &'a str,
    #[serde(rename = "line_items[0][quantity]")]
    quantity: u32,
    mode: &'a str,
    customer_email: &'a str,
    success_url: &'a str,
}

impl HttpTierResolver {
    pub fn new(config: &BillingConfig, success_url: impl Into<String>) -> Result<Self, BillingError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("STRIPE_SECRET_KEY").ok())
            .ok_or_else(|| BillingError::Config("No billing API key configured".to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = format!("Bearer {}", api_key);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_value)
                .map_err(|e| BillingError::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .default_headers(headers)
            .build()
            .map_err(|e| BillingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut price_map = HashMap::new();
        if let Some(id) = &config.pro_price_id {
            price_map.insert(id.clone(), Tier::Pro);
        }
        if let Some(id) = &config.agency_price_id {
            price_map.insert(id.clone(), Tier::Agency);
        }
        if let Some(id) = &config.enterprise_price_id {
            price_map.insert(id.clone(), Tier::Enterprise);
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            price_map,
            success_url: success_url.into(),
        })
    }

    fn tier_for_price(&self, price_id: &str) -> Tier {
        self.price_map.get(price_id).copied().unwrap_or(Tier::Free)
    }
}

#[async_trait]
impl TierResolver for HttpTierResolver {
    async fn resolve_tier(&self, identity: &str) -> Result<Tier, BillingError> {
        // Step 1: resolve the customer id by identity
        let search_url = format!("{}/customers/search", self.endpoint);
        let customers: CustomerSearchResponse = self
            .client
            .get(&search_url)
            .query(&[("query", format!("email:\"{}\"", identity)), ("limit", "1".to_string())])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| BillingError::RequestFailed(e.to_string()))?
            .json()
            .await?;

        let Some(customer) = customers.data.first() else {
            debug!(identity, "No billing customer found");
            return Ok(Tier::Free);
        };

        // Step 2: list subscriptions and pick the first active/trialing one
        let subs_url = format!("{}/subscriptions", self.endpoint);
        let subs: SubscriptionList = self
            .client
            .get(&subs_url)
            .query(&[("customer", customer.id.as_str()), ("status", "all")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| BillingError::RequestFailed(e.to_string()))?
            .json()
            .await?;

        let active = subs
            .data
            .iter()
            .find(|s| matches!(s.status.as_str(), "active" | "trialing"));

        let Some(subscription) = active else {
            return Ok(Tier::Free);
        };

        // Step 3: map the subscription's price to a tier
        let tier = subscription
            .items
            .data
            .first()
            .map(|item| self.tier_for_price(&item.price.id))
            .unwrap_or(Tier::Free);

        Ok(tier)
    }

    async fn checkout_url(&self, identity: &str, price_id: &str) -> Result<String, BillingError> {
        let url = format!("{}/checkout/sessions", self.endpoint);
        let params = CheckoutParams {
            price: price_id,
            quantity: 1,
            mode: "subscription",
            customer_email: identity,
            success_url: &self.success_url,
        };

        let session: CheckoutSession = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| BillingError::RequestFailed(e.to_string()))?
            .json()
            .await?;

        Ok(session.url)
    }
}

// ============================================================================
// Fixed resolver (tests, offline use)
// ============================================================================

/// Resolver with a static identity → tier table and a default for
/// everyone else. Used in tests and when no billing provider is
/// configured.
#[derive(Debug, Default)]
pub struct FixedTierResolver {
    tiers: HashMap<String, Tier>,
    default_tier: Option<Tier>,
}

impl FixedTierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everyone resolves to `tier` unless explicitly overridden
    pub fn with_default(tier: Tier) -> Self {
        Self {
            tiers: HashMap::new(),
            default_tier: Some(tier),
        }
    }

    pub fn set(&mut self, identity: impl Into<String>, tier: Tier) {
        self.tiers.insert(identity.into(), tier);
    }
}

#[async_trait]
impl TierResolver for FixedTierResolver {
    async fn resolve_tier(&self, identity: &str) -> Result<Tier, BillingError> {
        Ok(self
            .tiers
            .get(identity)
            .copied()
            .or(self.default_tier)
            .unwrap_or(Tier::Free))
    }

    async fn checkout_url(&self, _identity: &str, _price_id: &str) -> Result<String, BillingError> {
        Err(BillingError::Config(
            "Checkout requires a configured billing provider".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanMode;

    #[test]
    fn free_tier_gating() {
        assert!(!Tier::Free.allows_export());
        assert!(!Tier::Free.allows_simulation());
        assert!(!Tier::Free.unlimited_scans());
        assert_eq!(Tier::Free.effective_mode(ScanMode::Full), ScanMode::Preview);
    }

    #[test]
    fn paid_tiers_keep_requested_mode() {
        for tier in [Tier::Pro, Tier::Agency, Tier::Enterprise] {
            assert!(tier.allows_export());
            assert!(tier.allows_simulation());
            assert_eq!(tier.effective_mode(ScanMode::Full), ScanMode::Full);
            assert_eq!(tier.effective_mode(ScanMode::Preview), ScanMode::Preview);
        }
    }

    #[tokio::test]
    async fn fixed_resolver_uses_table_then_default() {
        let mut resolver = FixedTierResolver::with_default(Tier::Pro);
        resolver.set("agency@example.com", Tier::Agency);

        assert_eq!(
            resolver.resolve_tier("agency@example.com").await.unwrap(),
            Tier::Agency
        );
        assert_eq!(resolver.resolve_tier("other@example.com").await.unwrap(), Tier::Pro);

        let bare = FixedTierResolver::new();
        assert_eq!(bare.resolve_tier("anyone").await.unwrap(), Tier::Free);
    }

    #[tokio::test]
    async fn retry_degrades_to_free_after_budget() {
        /// Resolver that always fails
        #[derive(Debug)]
        struct Failing;

        #[async_trait]
        impl TierResolver for Failing {
            async fn resolve_tier(&self, _identity: &str) -> Result<Tier, BillingError> {
                Err(BillingError::RequestFailed("down".to_string()))
            }
            async fn checkout_url(
                &self,
                _identity: &str,
                _price_id: &str,
            ) -> Result<String, BillingError> {
                Err(BillingError::RequestFailed("down".to_string()))
            }
        }

        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let tier = resolve_tier_with_retry(&Failing, "u@example.com", &policy).await;
        assert_eq!(tier, Tier::Free);
    }

    #[tokio::test]
    async fn retry_succeeds_on_later_attempt() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Fails once, then resolves Pro
        #[derive(Debug, Default)]
        struct Flaky {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl TierResolver for Flaky {
            async fn resolve_tier(&self, _identity: &str) -> Result<Tier, BillingError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(BillingError::RequestFailed("transient".to_string()))
                } else {
                    Ok(Tier::Pro)
                }
            }
            async fn checkout_url(
                &self,
                _identity: &str,
                _price_id: &str,
            ) -> Result<String, BillingError> {
                unreachable!()
            }
        }

        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let tier = resolve_tier_with_retry(&Flaky::default(), "u@example.com", &policy).await;
        assert_eq!(tier, Tier::Pro);
    }

    #[test]
    fn subscription_list_parses_stripe_shape() {
        let raw = r#"{
            "data": [{
                "status": "active",
                "items": {"data": [{"price": {"id": "price_pro"}}]}
            }]
        }"#;
        let subs: SubscriptionList = serde_json::from_str(raw).unwrap();
        assert_eq!(subs.data[0].status, "active");
        assert_eq!(subs.data[0].items.data[0].price.id, "price_pro");
    }
}
