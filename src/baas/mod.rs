//! Outbound client for the anchoring provider
//!
//! Two one-shot calls: submit a task for hashing/anchoring, and verify a
//! transaction. No retries; a failed call is terminal for the request that
//! triggered it.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BaasConfig;

/// Submission envelope, provider field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope {
    pub data_schema_name: String,
    pub data_id: String,
    pub json_payload: Value,
}

/// What a successful submission yields. The provider nests the task id
/// under `data.id`; an id-less success body is still a success.
#[derive(Debug, Clone)]
pub struct TaskReceipt {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_payload_hash: Option<String>,
}

/// A 200 from the verification endpoint, JSON when it parses.
#[derive(Debug, Clone)]
pub enum VerifyResponse {
    Json(Value),
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    Payload,
    Hash,
}

impl VerifyMode {
    pub fn parse(value: &str) -> Option<VerifyMode> {
        match value {
            "payload" => Some(VerifyMode::Payload),
            "hash" => Some(VerifyMode::Hash),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum BaasError {
    /// Non-success status; carries the verbatim body for the user.
    Status { status: u16, body: String },
    /// Timeout, connection failure, or any transport-level error.
    Network(String),
    /// Success status with a body that does not parse where JSON is required.
    Parse(String),
}

impl fmt::Display for BaasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaasError::Status { status, body } => write!(f, "{} - {}", status, body),
            BaasError::Network(msg) => write!(f, "Network error: {}", msg),
            BaasError::Parse(msg) => write!(f, "Unexpected provider response: {}", msg),
        }
    }
}

impl std::error::Error for BaasError {}

pub struct BaasClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BaasClient {
    pub fn new(config: &BaasConfig) -> Result<Self, BaasError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BaasError::Network(e.to_string()))?;
        Ok(BaasClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// POST the envelope to `{base}/blockchainTask`. 200 and 201 both count
    /// as accepted.
    pub async fn submit_task(&self, envelope: &TaskEnvelope) -> Result<TaskReceipt, BaasError> {
        let body = self
            .post_json(&format!("{}/blockchainTask", self.base_url), envelope, &[
                StatusCode::OK,
                StatusCode::CREATED,
            ])
            .await?;
        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| BaasError::Parse(e.to_string()))?;
        Ok(TaskReceipt {
            task_id: task_id_field(&parsed),
        })
    }

    /// POST a verification request to `{base}/blockchainTransaction/verify`.
    /// A 200 with a non-JSON body degrades to the raw text rather than an
    /// error.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, BaasError> {
        let body = self
            .post_json(
                &format!("{}/blockchainTransaction/verify", self.base_url),
                request,
                &[StatusCode::OK],
            )
            .await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => Ok(VerifyResponse::Json(parsed)),
            Err(_) => Ok(VerifyResponse::Raw(body)),
        }
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
        accepted: &[StatusCode],
    ) -> Result<String, BaasError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-API-Key", api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| BaasError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BaasError::Network(e.to_string()))?;
        if !accepted.contains(&status) {
            return Err(BaasError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

// Task id as the provider returns it, nested under data.id. Some provider
// versions return it numeric.
fn task_id_field(body: &Value) -> Option<String> {
    match body.pointer("/data/id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Success judgment over a verification response.
///
/// Flags live under `data` or, in older provider responses, at the top
/// level; a missing or non-boolean flag reads as false. Hash mode needs the
/// hash verified and the transaction on chain; payload mode needs on-chain
/// plus either verified flag.
pub fn verdict(mode: VerifyMode, body: &Value) -> bool {
    let on_chain = flag(body, "isTransactionIdOnBlockchain");
    match mode {
        VerifyMode::Hash => flag(body, "isJsonPayloadHashVerified") && on_chain,
        VerifyMode::Payload => {
            on_chain && (flag(body, "isJsonPayloadVerified") || flag(body, "isJsonPayloadHashVerified"))
        }
    }
}

fn flag(body: &Value, name: &str) -> bool {
    body.pointer(&format!("/data/{}", name))
        .or_else(|| body.get(name))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
