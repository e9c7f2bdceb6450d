use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::NewQuestion;
use crate::models::upload_history::ImportMode;
use crate::services::duplicate_service::DuplicateSummary;
use crate::utils::token::generate_preview_id;

pub const UPLOAD_PREVIEW_TTL_MINUTES: i64 = 15;

/// Everything the commit phase needs, captured at preview time.
#[derive(Debug, Clone)]
pub struct UploadPreview {
    pub preview_id: String,
    pub admin_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub file_name: String,
    pub mode: ImportMode,
    pub questions: Vec<NewQuestion>,
    pub duplicates: DuplicateSummary,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Parameters for a new preview; the store allocates the id and expiry.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub admin_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub file_name: String,
    pub mode: ImportMode,
    pub questions: Vec<NewQuestion>,
    pub duplicates: DuplicateSummary,
}

/// Ephemeral keying of preview ids to parsed batches. Backed in-process by
/// default; the abstraction exists so a shared external cache can stand in
/// for multi-instance deployments. Expired entries are swept lazily on every
/// create/get; there is no background timer.
#[cfg_attr(test, mockall::automock)]
pub trait PreviewStore: Send + Sync {
    fn create(&self, request: PreviewRequest) -> UploadPreview;
    fn get(&self, preview_id: &str, admin_id: Uuid) -> Result<UploadPreview>;
    fn delete(&self, preview_id: &str);
    fn sweep_expired(&self);
}

#[derive(Default)]
pub struct InMemoryPreviewStore {
    entries: Mutex<HashMap<String, UploadPreview>>,
}

impl InMemoryPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_locked(entries: &mut HashMap<String, UploadPreview>) {
        let now = Utc::now();
        entries.retain(|_, preview| preview.expires_at > now);
    }
}

impl PreviewStore for InMemoryPreviewStore {
    fn create(&self, request: PreviewRequest) -> UploadPreview {
        let mut entries = self.entries.lock().expect("preview store mutex poisoned");
        Self::sweep_locked(&mut entries);

        let now = Utc::now();
        let preview = UploadPreview {
            preview_id: generate_preview_id(),
            admin_id: request.admin_id,
            exam_id: request.exam_id,
            exam_title: request.exam_title,
            file_name: request.file_name,
            mode: request.mode,
            questions: request.questions,
            duplicates: request.duplicates,
            created_at: now,
            expires_at: now + Duration::minutes(UPLOAD_PREVIEW_TTL_MINUTES),
        };
        entries.insert(preview.preview_id.clone(), preview.clone());
        preview
    }

    fn get(&self, preview_id: &str, admin_id: Uuid) -> Result<UploadPreview> {
        let mut entries = self.entries.lock().expect("preview store mutex poisoned");
        Self::sweep_locked(&mut entries);

        let Some(preview) = entries.get(preview_id) else {
            return Err(Error::NotFound(
                "Upload preview not found or expired. Please upload and preview again".to_string(),
            ));
        };

        if preview.admin_id != admin_id {
            return Err(Error::Forbidden(
                "This upload preview belongs to another admin account".to_string(),
            ));
        }

        Ok(preview.clone())
    }

    fn delete(&self, preview_id: &str) {
        let mut entries = self.entries.lock().expect("preview store mutex poisoned");
        entries.remove(preview_id);
    }

    fn sweep_expired(&self) {
        let mut entries = self.entries.lock().expect("preview store mutex poisoned");
        Self::sweep_locked(&mut entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(admin_id: Uuid) -> PreviewRequest {
        PreviewRequest {
            admin_id,
            exam_id: Uuid::new_v4(),
            exam_title: "BCS Model Test".to_string(),
            file_name: "batch.csv".to_string(),
            mode: ImportMode::Append,
            questions: Vec::new(),
            duplicates: DuplicateSummary::default(),
        }
    }

    fn expire(store: &InMemoryPreviewStore, preview_id: &str) {
        let mut entries = store.entries.lock().unwrap();
        let entry = entries.get_mut(preview_id).unwrap();
        entry.expires_at = Utc::now() - Duration::seconds(1);
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = InMemoryPreviewStore::new();
        let admin = Uuid::new_v4();
        let preview = store.create(request(admin));

        assert_eq!(preview.preview_id.len(), 32);
        assert!(preview.expires_at > preview.created_at);

        let fetched = store.get(&preview.preview_id, admin).unwrap();
        assert_eq!(fetched.exam_title, "BCS Model Test");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = InMemoryPreviewStore::new();
        let err = store.get("missing", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn ownership_mismatch_is_forbidden_and_keeps_the_entry() {
        let store = InMemoryPreviewStore::new();
        let owner = Uuid::new_v4();
        let preview = store.create(request(owner));

        let err = store.get(&preview.preview_id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        // The rightful owner can still read it afterwards.
        assert!(store.get(&preview.preview_id, owner).is_ok());
    }

    #[test]
    fn expired_entry_behaves_like_a_missing_one() {
        let store = InMemoryPreviewStore::new();
        let admin = Uuid::new_v4();
        let preview = store.create(request(admin));
        expire(&store, &preview.preview_id);

        let err = store.get(&preview.preview_id, admin).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn any_access_sweeps_expired_entries() {
        let store = InMemoryPreviewStore::new();
        let admin = Uuid::new_v4();
        let stale = store.create(request(admin));
        expire(&store, &stale.preview_id);

        // An unrelated create garbage-collects the stale record.
        let _fresh = store.create(request(admin));
        assert_eq!(store.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_the_entry() {
        let store = InMemoryPreviewStore::new();
        let admin = Uuid::new_v4();
        let preview = store.create(request(admin));

        store.delete(&preview.preview_id);
        assert!(matches!(
            store.get(&preview.preview_id, admin),
            Err(Error::NotFound(_))
        ));
    }
}
