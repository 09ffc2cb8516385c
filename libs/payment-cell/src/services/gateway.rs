use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{GatewayOrder, OrderRequest};

/// The payment provider's order API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &OrderRequest) -> Result<GatewayOrder>;
}

/// Razorpay-compatible REST gateway (`POST {base}/orders`, basic auth).
pub struct RazorpayGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.payment_api_base.trim_end_matches('/').to_string(),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, order: &OrderRequest) -> Result<GatewayOrder> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(anyhow!("Payment gateway credentials are not configured"));
        }

        let url = format!("{}/orders", self.base_url);
        debug!("Creating gateway order {} for {} {}", order.receipt, order.amount, order.currency);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gateway rejected order {}: {} {}", order.receipt, status, body);
            return Err(anyhow!("Gateway error ({}): {}", status, body));
        }

        Ok(response.json::<GatewayOrder>().await?)
    }
}
