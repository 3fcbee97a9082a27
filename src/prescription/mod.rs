//! Prescription domain types
//!
//! The record tracked locally, the form it is born from, and the canonical
//! JSON document the anchoring provider hashes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application tag stamped into every anchored document; doubles as the
/// provider-side schema name.
pub const APPLICATION: &str = "prescriptionRegistry";

/// Version field of the canonical payload.
pub const PAYLOAD_VERSION: u32 = 1;

/// Anchoring lifecycle. A record starts `Pending` and only a provider
/// result moves it; there is no transition back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Confirmed,
    Failed,
}

/// A registered prescription and its anchoring state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: u64,                         // Local sequence number
    pub data_id: String,                 // Tracking token, "prescription_<n>"
    pub patient_full_name: String,
    pub patient_dob: String,             // YYYY-MM-DD
    pub prescription_date: String,
    pub medication_name: String,
    pub dosage_strength: String,
    pub route_of_administration: String,
    pub frequency_duration: String,
    pub quantity_to_dispense: String,
    pub refill_info: String,
    pub prescriber_signature: String,
    pub baas_task_id: Option<String>,    // Task id the provider returned at submission
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_payload_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<Value>,
}

impl Prescription {
    /// Record born from a validated form, pending until the provider
    /// reports back. The store assigns the sequence number on append.
    pub fn from_form(form: &PrescriptionForm, data_id: String, baas_task_id: Option<String>) -> Self {
        Prescription {
            id: 0,
            data_id,
            patient_full_name: form.patient_full_name.clone(),
            patient_dob: form.patient_dob.clone(),
            prescription_date: form.prescription_date.clone(),
            medication_name: form.medication_name.clone(),
            dosage_strength: form.dosage_strength.clone(),
            route_of_administration: form.route_of_administration.clone(),
            frequency_duration: form.frequency_duration.clone(),
            quantity_to_dispense: form.quantity_to_dispense.clone(),
            refill_info: form.refill_info.clone(),
            prescriber_signature: form.prescriber_signature.clone(),
            baas_task_id,
            status: Status::Pending,
            blockchain_tx_id: None,
            explorer_url: None,
            json_payload_hash: None,
            json_payload: None,
        }
    }

    /// Fold a provider result into the record. An absent success flag
    /// leaves the current status alone; a present flag overwrites it
    /// unconditionally (duplicate deliveries are last-write-wins).
    pub fn apply(&mut self, outcome: &TxOutcome) {
        match outcome.success {
            Some(true) => self.status = Status::Confirmed,
            Some(false) => self.status = Status::Failed,
            None => {}
        }
        if let Some(tx_id) = &outcome.transaction_id {
            self.blockchain_tx_id = Some(tx_id.clone());
        }
        if let Some(url) = &outcome.explorer_url {
            self.explorer_url = Some(url.clone());
        }
        if let Some(hash) = &outcome.json_payload_hash {
            self.json_payload_hash = Some(hash.clone());
        }
        if let Some(payload) = &outcome.json_payload {
            self.json_payload = Some(payload.clone());
        }
    }
}

/// What a provider webhook reported for one transaction.
#[derive(Debug, Clone, Default)]
pub struct TxOutcome {
    pub transaction_id: Option<String>,
    pub explorer_url: Option<String>,
    pub success: Option<bool>,
    pub json_payload_hash: Option<String>,
    pub json_payload: Option<Value>,
}

/// Raw registration form fields. All values are opaque strings; three are
/// required, nothing else is validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionForm {
    #[serde(default)]
    pub patient_full_name: String,
    #[serde(default)]
    pub patient_dob: String,
    #[serde(default)]
    pub prescription_date: String,
    #[serde(default)]
    pub medication_name: String,
    #[serde(default)]
    pub dosage_strength: String,
    #[serde(default)]
    pub route_of_administration: String,
    #[serde(default)]
    pub frequency_duration: String,
    #[serde(default)]
    pub quantity_to_dispense: String,
    #[serde(default)]
    pub refill_info: String,
    #[serde(default)]
    pub prescriber_signature: String,
}

impl PrescriptionForm {
    /// Required-field check. Failing this makes no provider call.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.patient_full_name.trim().is_empty()
            || self.patient_dob.trim().is_empty()
            || self.medication_name.trim().is_empty()
        {
            return Err("Please fill required fields");
        }
        Ok(())
    }

    /// The document the provider hashes: a fixed application tag plus every
    /// clinical field as submitted.
    pub fn canonical_payload(&self) -> Value {
        serde_json::json!({
            "application": APPLICATION,
            "version": PAYLOAD_VERSION,
            "patient_full_name": self.patient_full_name,
            "patient_dob": self.patient_dob,
            "prescription_date": self.prescription_date,
            "medication_name": self.medication_name,
            "dosage_strength": self.dosage_strength,
            "route_of_administration": self.route_of_administration,
            "frequency_duration": self.frequency_duration,
            "quantity_to_dispense": self.quantity_to_dispense,
            "refill_info": self.refill_info,
            "prescriber_signature": self.prescriber_signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled_form() -> PrescriptionForm {
        PrescriptionForm {
            patient_full_name: "Jane Doe".to_string(),
            patient_dob: "1990-01-01".to_string(),
            prescription_date: "2024-03-01".to_string(),
            medication_name: "Amoxicillin".to_string(),
            dosage_strength: "500mg".to_string(),
            route_of_administration: "oral".to_string(),
            frequency_duration: "3x daily for 7 days".to_string(),
            quantity_to_dispense: "21".to_string(),
            refill_info: "no refills".to_string(),
            prescriber_signature: "Dr. A. Smith".to_string(),
        }
    }

    #[test]
    fn validate_accepts_complete_form() {
        assert!(filled_form().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_required_fields() {
        for blank in ["patient_full_name", "patient_dob", "medication_name"] {
            let mut form = filled_form();
            match blank {
                "patient_full_name" => form.patient_full_name = "  ".to_string(),
                "patient_dob" => form.patient_dob = String::new(),
                _ => form.medication_name = String::new(),
            }
            assert!(form.validate().is_err(), "{} should be required", blank);
        }
    }

    #[test]
    fn validate_ignores_optional_fields() {
        let mut form = filled_form();
        form.prescriber_signature = String::new();
        form.refill_info = String::new();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn canonical_payload_carries_submitted_values() {
        let payload = filled_form().canonical_payload();
        assert_eq!(payload["application"], "prescriptionRegistry");
        assert_eq!(payload["version"], 1);
        assert_eq!(payload["patient_full_name"], "Jane Doe");
        assert_eq!(payload["medication_name"], "Amoxicillin");
        assert_eq!(payload["quantity_to_dispense"], "21");
    }

    #[test]
    fn apply_moves_pending_to_confirmed() {
        let mut record = Prescription::from_form(&filled_form(), "prescription_1".to_string(), None);
        record.apply(&TxOutcome {
            transaction_id: Some("tx123".to_string()),
            explorer_url: Some("http://x".to_string()),
            success: Some(true),
            ..TxOutcome::default()
        });
        assert_eq!(record.status, Status::Confirmed);
        assert_eq!(record.blockchain_tx_id.as_deref(), Some("tx123"));
        assert_eq!(record.explorer_url.as_deref(), Some("http://x"));
    }

    #[test]
    fn apply_without_flag_keeps_status() {
        let mut record = Prescription::from_form(&filled_form(), "prescription_2".to_string(), None);
        record.status = Status::Confirmed;
        record.apply(&TxOutcome {
            transaction_id: Some("tx456".to_string()),
            ..TxOutcome::default()
        });
        assert_eq!(record.status, Status::Confirmed);
        assert_eq!(record.blockchain_tx_id.as_deref(), Some("tx456"));
    }

    #[test]
    fn apply_failure_overwrites_confirmed() {
        let mut record = Prescription::from_form(&filled_form(), "prescription_3".to_string(), None);
        record.apply(&TxOutcome { success: Some(true), ..TxOutcome::default() });
        record.apply(&TxOutcome { success: Some(false), ..TxOutcome::default() });
        assert_eq!(record.status, Status::Failed);
    }
}
