use anyhow::{Result, anyhow, bail};
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha512;
use tracing::error;
use uuid::Uuid;

type HmacSha512 = Hmac<Sha512>;

const PAYSTACK_API_BASE: &str = "https://api.paystack.co";

/// Header Paystack signs webhook bodies with.
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Minimal Paystack client built on reqwest. Amounts cross this boundary in whole
/// naira and are converted to kobo on the wire.
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub email: String,
    pub amount: i64,
    pub reference: String,
    pub session_id: Uuid,
    pub plan_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionInitialization {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct PaystackEvent {
    pub event: String,
    pub data: PaystackChargeData,
}

#[derive(Debug, Deserialize)]
pub struct PaystackChargeData {
    pub reference: String,
    /// Minor units (kobo).
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl PaystackChargeData {
    /// Session id carried in the transaction metadata. Paystack may echo metadata
    /// back as a JSON-encoded string.
    pub fn session_id(&self) -> Option<Uuid> {
        let metadata = match &self.metadata {
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
            other => other.clone(),
        };

        metadata
            .get("session_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

impl PaystackClient {
    pub fn new(secret_key: String, callback_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            callback_url,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let paystack_message = serde_json::from_str::<PaystackEnvelope<Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.message);

        error!(
            status = %status,
            paystack_message = ?paystack_message,
            response_body = %body,
            context = %context,
            "paystack api request failed"
        );

        bail!("Paystack API request failed: {} (status {})", context, status);
    }

    /// Starts a hosted checkout. https://paystack.com/docs/api/transaction/#initialize
    pub async fn initialize_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionInitialization> {
        let mut body = serde_json::json!({
            "email": request.email,
            "amount": to_kobo(request.amount)?,
            "reference": request.reference,
            "metadata": {
                "session_id": request.session_id.to_string(),
                "plan_id": request.plan_id,
            },
        });
        if let Some(callback_url) = &self.callback_url {
            body["callback_url"] = Value::String(callback_url.clone());
        }

        let resp = self
            .http
            .post(format!("{PAYSTACK_API_BASE}/transaction/initialize"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "initialize transaction").await?;

        let envelope: PaystackEnvelope<TransactionInitialization> = resp.json().await?;
        if !envelope.status {
            bail!(
                "Paystack rejected transaction initialization: {}",
                envelope.message.unwrap_or_default()
            );
        }

        envelope
            .data
            .ok_or_else(|| anyhow!("Paystack initialization response has no data"))
    }

    /// Verifies the HMAC-SHA512 body signature. https://paystack.com/docs/payments/webhooks
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<PaystackEvent> {
        verify_signature(self.secret_key.as_bytes(), payload, signature)?;
        let event: PaystackEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}

fn to_kobo(amount: i64) -> Result<i64> {
    amount
        .checked_mul(100)
        .ok_or_else(|| anyhow!("amount {amount} overflows kobo conversion"))
}

fn verify_signature(secret: &[u8], payload: &[u8], signature: &str) -> Result<()> {
    let provided = hex::decode(signature.trim())?;
    let mut mac = HmacSha512::new_from_slice(secret)?;
    mac.update(payload);
    mac.verify_slice(&provided)
        .map_err(|_| anyhow!("invalid webhook signature"))
}
