//! In-memory prescription store
//!
//! Append-only for the process lifetime, with in-place status updates
//! driven by provider results. Nothing here is durable; a restart starts
//! from an empty list.

use std::sync::{Mutex, RwLock};

use chrono::Utc;

use crate::prescription::{Prescription, TxOutcome};

/// Shared record list. Constructed once in `main` and handed to the API
/// layer behind an `Arc`; handlers never touch a global.
#[derive(Debug, Default)]
pub struct PrescriptionStore {
    records: RwLock<Vec<Prescription>>,
    last_token: Mutex<i64>,
}

impl PrescriptionStore {
    pub fn new() -> Self {
        PrescriptionStore::default()
    }

    /// Mint the next tracking token, `prescription_<integer>`.
    ///
    /// The integer is wall-clock seconds made strictly monotonic: two mints
    /// in the same second yield distinct tokens, so the token stays unique
    /// for the process lifetime while still reading as a timestamp.
    pub fn mint_data_id(&self) -> String {
        let mut last = self.last_token.lock().unwrap();
        let now = Utc::now().timestamp();
        let token = if now > *last { now } else { *last + 1 };
        *last = token;
        format!("prescription_{}", token)
    }

    /// Append a record, assigning its 1-based sequence number. Returns the
    /// stored copy.
    pub fn append(&self, mut record: Prescription) -> Prescription {
        let mut records = self.records.write().unwrap();
        record.id = records.len() as u64 + 1;
        records.push(record.clone());
        record
    }

    /// Fold a provider result into the record matching `data_id`.
    ///
    /// Linear scan, first match only. Returns whether a record matched; an
    /// unknown `data_id` is a silent no-op for the caller to report as
    /// success anyway (the webhook contract never surfaces it).
    pub fn apply_result(&self, data_id: &str, outcome: &TxOutcome) -> bool {
        let mut records = self.records.write().unwrap();
        for record in records.iter_mut() {
            if record.data_id == data_id {
                record.apply(outcome);
                println!("Updated prescription {}: status now {:?}", data_id, record.status);
                return true;
            }
        }
        false
    }

    pub fn find_by_data_id(&self, data_id: &str) -> Option<Prescription> {
        let records = self.records.read().unwrap();
        records.iter().find(|r| r.data_id == data_id).cloned()
    }

    /// Records newest tracking id first, for the index page.
    pub fn list_recent_first(&self) -> Vec<Prescription> {
        let records = self.records.read().unwrap();
        records.iter().rev().cloned().collect()
    }

    /// Records in insertion order, for the JSON dump.
    pub fn snapshot(&self) -> Vec<Prescription> {
        self.records.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescription::{PrescriptionForm, Status};
    use pretty_assertions::assert_eq;

    fn record(store: &PrescriptionStore, patient: &str) -> Prescription {
        let form = PrescriptionForm {
            patient_full_name: patient.to_string(),
            patient_dob: "1990-01-01".to_string(),
            medication_name: "Amoxicillin".to_string(),
            ..PrescriptionForm::default()
        };
        Prescription::from_form(&form, store.mint_data_id(), Some("task-1".to_string()))
    }

    #[test]
    fn minted_tokens_are_unique_and_increasing() {
        let store = PrescriptionStore::new();
        let mut previous: Option<i64> = None;
        for _ in 0..50 {
            let token = store.mint_data_id();
            let suffix = token
                .strip_prefix("prescription_")
                .expect("token keeps the prescription_ prefix");
            let value: i64 = suffix.parse().expect("token suffix is an integer");
            if let Some(prev) = previous {
                assert!(value > prev, "tokens must be strictly increasing");
            }
            previous = Some(value);
        }
    }

    #[test]
    fn append_assigns_sequential_ids_and_keeps_pending() {
        let store = PrescriptionStore::new();
        let first = store.append(record(&store, "Jane Doe"));
        let second = store.append(record(&store, "John Roe"));
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, Status::Pending);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn apply_result_confirms_matching_record() {
        let store = PrescriptionStore::new();
        let stored = store.append(record(&store, "Jane Doe"));
        let outcome = TxOutcome {
            transaction_id: Some("tx123".to_string()),
            explorer_url: Some("http://x".to_string()),
            success: Some(true),
            ..TxOutcome::default()
        };
        assert!(store.apply_result(&stored.data_id, &outcome));
        let updated = store.find_by_data_id(&stored.data_id).unwrap();
        assert_eq!(updated.status, Status::Confirmed);
        assert_eq!(updated.blockchain_tx_id.as_deref(), Some("tx123"));
    }

    #[test]
    fn apply_result_is_idempotent_for_success() {
        let store = PrescriptionStore::new();
        let stored = store.append(record(&store, "Jane Doe"));
        let outcome = TxOutcome { success: Some(true), ..TxOutcome::default() };
        assert!(store.apply_result(&stored.data_id, &outcome));
        assert!(store.apply_result(&stored.data_id, &outcome));
        let updated = store.find_by_data_id(&stored.data_id).unwrap();
        assert_eq!(updated.status, Status::Confirmed);
    }

    #[test]
    fn later_failure_overwrites_confirmed() {
        let store = PrescriptionStore::new();
        let stored = store.append(record(&store, "Jane Doe"));
        store.apply_result(&stored.data_id, &TxOutcome { success: Some(true), ..TxOutcome::default() });
        store.apply_result(&stored.data_id, &TxOutcome { success: Some(false), ..TxOutcome::default() });
        let updated = store.find_by_data_id(&stored.data_id).unwrap();
        assert_eq!(updated.status, Status::Failed);
    }

    #[test]
    fn apply_result_reports_unknown_data_id() {
        let store = PrescriptionStore::new();
        assert!(!store.apply_result("prescription_0", &TxOutcome::default()));
    }

    #[test]
    fn list_recent_first_reverses_insertion_order() {
        let store = PrescriptionStore::new();
        let first = store.append(record(&store, "Jane Doe"));
        let second = store.append(record(&store, "John Roe"));
        let listed = store.list_recent_first();
        assert_eq!(listed[0].data_id, second.data_id);
        assert_eq!(listed[1].data_id, first.data_id);
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].data_id, first.data_id);
    }
}
