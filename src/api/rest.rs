use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::Filter;

use crate::api::pages::{self, Flash};
use crate::baas::{BaasClient, BaasError, TaskEnvelope, VerifyMode, VerifyRequest, VerifyResponse};
use crate::prescription::{Prescription, PrescriptionForm, TxOutcome, APPLICATION};
use crate::store::PrescriptionStore;

/// Provider callback body. Only the first blockchain result is consulted.
#[derive(Debug, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "dataId")]
    pub data_id: Option<String>,
    #[serde(rename = "BlockchainResults", default)]
    pub blockchain_results: Vec<BlockchainResult>,
    #[serde(rename = "jsonPayloadHash")]
    pub json_payload_hash: Option<String>,
    #[serde(rename = "jsonPayload")]
    pub json_payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainResult {
    pub transaction_id: Option<String>,
    pub transaction_explorer_url: Option<String>,
    pub is_success: Option<bool>,
}

impl WebhookNotification {
    fn outcome(&self) -> TxOutcome {
        let first = self.blockchain_results.first();
        TxOutcome {
            transaction_id: first.and_then(|r| r.transaction_id.clone()),
            explorer_url: first.and_then(|r| r.transaction_explorer_url.clone()),
            success: first.and_then(|r| r.is_success),
            json_payload_hash: self.json_payload_hash.clone(),
            json_payload: self.json_payload.clone(),
        }
    }
}

/// Verification form fields, provider-side input names.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyForm {
    #[serde(rename = "transactionId", default)]
    pub transaction_id: String,
    #[serde(default)]
    pub verification_type: String,
    #[serde(rename = "jsonPayload", default)]
    pub json_payload: String,
    #[serde(rename = "jsonPayloadHash", default)]
    pub json_payload_hash: String,
}

pub struct RestApi {
    store: Arc<PrescriptionStore>,
    baas: Arc<BaasClient>,
}

impl RestApi {
    pub fn new(store: Arc<PrescriptionStore>, baas: Arc<BaasClient>) -> Self {
        RestApi { store, baas }
    }

    pub fn routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        self.index()
            .or(self.register())
            .or(self.webhook())
            .or(self.prescriptions_json())
            .or(self.verify_form())
            .or(self.verify_submit())
    }

    fn index(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        warp::path::end()
            .and(warp::get())
            .map(move || warp::reply::html(pages::index_page(&store.list_recent_first(), &[])))
    }

    fn register(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        let baas = Arc::clone(&self.baas);
        warp::path("register_prescription")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::form::<PrescriptionForm>())
            .and_then(move |form: PrescriptionForm| {
                let store = Arc::clone(&store);
                let baas = Arc::clone(&baas);
                async move {
                    let flashes = register_prescription(&store, &baas, form).await;
                    let html = pages::index_page(&store.list_recent_first(), &flashes);
                    Ok::<_, Infallible>(warp::reply::html(html))
                }
            })
    }

    fn webhook(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        warp::path!("webhook" / "prescription-notification")
            .and(warp::post())
            .and(warp::body::bytes())
            .map(move |body: bytes::Bytes| {
                let notification: WebhookNotification = match serde_json::from_slice(&body) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        eprintln!("Webhook error: body is not JSON: {}", err);
                        return warp::reply::with_status(
                            warp::reply::json(&json!({"error": "Invalid webhook"})),
                            StatusCode::BAD_REQUEST,
                        );
                    }
                };

                println!("Received webhook for {:?}", notification.data_id);
                if let Some(data_id) = &notification.data_id {
                    if !store.apply_result(data_id, &notification.outcome()) {
                        // Unknown tracking id: acknowledged anyway, the
                        // provider is not told about local bookkeeping.
                        println!("Webhook for unknown data_id {}", data_id);
                    }
                }

                warp::reply::with_status(
                    warp::reply::json(&json!({"message": "Webhook processed successfully"})),
                    StatusCode::OK,
                )
            })
    }

    fn prescriptions_json(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let store = Arc::clone(&self.store);
        warp::path("prescriptions_json")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&store.snapshot()))
    }

    fn verify_form(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("verify_prescription")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .map(move |params: HashMap<String, String>| {
                let tx_id = params.get("tx_id").cloned().unwrap_or_default();
                let mode = params
                    .get("mode")
                    .and_then(|m| VerifyMode::parse(m))
                    .unwrap_or(VerifyMode::Payload);
                warp::reply::html(pages::verify_page(&tx_id, mode, &[], None))
            })
    }

    fn verify_submit(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let baas = Arc::clone(&self.baas);
        warp::path("verify_prescription")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::form::<VerifyForm>())
            .and_then(move |form: VerifyForm| {
                let baas = Arc::clone(&baas);
                async move {
                    let (mode, flashes, raw) = verify_prescription(&baas, &form).await;
                    let html = pages::verify_page(&form.transaction_id, mode, &flashes, raw.as_deref());
                    Ok::<_, Infallible>(warp::reply::html(html))
                }
            })
    }
}

/// Registration contract: validate locally, submit to the provider, store a
/// pending record only on provider success. A failed submission stores
/// nothing; resubmission is the recovery path.
async fn register_prescription(
    store: &PrescriptionStore,
    baas: &BaasClient,
    form: PrescriptionForm,
) -> Vec<Flash> {
    if let Err(message) = form.validate() {
        return vec![Flash::error(message)];
    }

    let data_id = store.mint_data_id();
    let envelope = TaskEnvelope {
        data_schema_name: APPLICATION.to_string(),
        data_id: data_id.clone(),
        json_payload: form.canonical_payload(),
    };

    match baas.submit_task(&envelope).await {
        Ok(receipt) => {
            let record = store.append(Prescription::from_form(&form, data_id, receipt.task_id));
            println!(
                "Registered prescription {} (task {})",
                record.data_id,
                record.baas_task_id.as_deref().unwrap_or("unknown")
            );
            vec![
                Flash::success(format!(
                    "Prescription registered successfully! Tracking ID: {}",
                    record.data_id
                )),
                Flash::info(format!(
                    "BaaS Task ID: {} - Your prescription will be written to the blockchain shortly.",
                    record.baas_task_id.as_deref().unwrap_or("unknown")
                )),
            ]
        }
        Err(BaasError::Status { status, body }) => {
            vec![Flash::error(format!("Error: {} - {}", status, body))]
        }
        Err(err) => vec![Flash::error(format!("Error registering prescription: {}", err))],
    }
}

/// Verification contract: local input checks first (no call on failure),
/// then one provider call whose outcome becomes a verdict banner plus the
/// raw response.
async fn verify_prescription(
    baas: &BaasClient,
    form: &VerifyForm,
) -> (VerifyMode, Vec<Flash>, Option<String>) {
    let mode = VerifyMode::parse(&form.verification_type).unwrap_or(VerifyMode::Payload);

    if form.transaction_id.trim().is_empty() {
        return (mode, vec![Flash::error("Transaction ID is required")], None);
    }
    if VerifyMode::parse(&form.verification_type).is_none() {
        return (mode, vec![Flash::error("Select a verification mode")], None);
    }

    let mut request = VerifyRequest {
        transaction_id: form.transaction_id.trim().to_string(),
        json_payload: None,
        json_payload_hash: None,
    };
    match mode {
        VerifyMode::Payload => {
            if form.json_payload.trim().is_empty() {
                return (
                    mode,
                    vec![Flash::error("JSON payload is required for payload verification")],
                    None,
                );
            }
            match serde_json::from_str::<Value>(&form.json_payload) {
                Ok(payload) => request.json_payload = Some(payload),
                Err(err) => {
                    return (
                        mode,
                        vec![Flash::error(format!("Invalid JSON payload format: {}", err))],
                        None,
                    );
                }
            }
        }
        VerifyMode::Hash => {
            if form.json_payload_hash.trim().is_empty() {
                return (
                    mode,
                    vec![Flash::error("Payload hash is required for hash verification")],
                    None,
                );
            }
            request.json_payload_hash = Some(form.json_payload_hash.trim().to_string());
        }
    }

    match baas.verify(&request).await {
        Ok(VerifyResponse::Json(body)) => {
            let passed = crate::baas::verdict(mode, &body);
            let banner = if passed {
                Flash::success(format!(
                    "Verification passed: transaction {} matches the blockchain record.",
                    request.transaction_id
                ))
            } else {
                Flash::error(format!(
                    "Verification failed: the provider could not confirm transaction {}.",
                    request.transaction_id
                ))
            };
            let raw = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
            (mode, vec![banner], Some(raw))
        }
        Ok(VerifyResponse::Raw(text)) => (
            mode,
            vec![Flash::info("Verification response was not JSON; raw response shown below.")],
            Some(text),
        ),
        Err(BaasError::Status { status, body }) => (
            mode,
            vec![Flash::error(format!("Verification failed. Status: {} - {}", status, body))],
            None,
        ),
        Err(err) => (
            mode,
            vec![Flash::error(format!("Network error during verification: {}", err))],
            None,
        ),
    }
}
