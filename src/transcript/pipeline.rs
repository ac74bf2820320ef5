//! Per-batch processing: classify, merge tags, archive.
//!
//! Each step is best effort. A failed classification still archives the
//! batch, and a failed tag merge does not stop the upload.

use serde::Serialize;
use std::sync::Arc;

use crate::archive::{conversations_file_name, ArchiveStore};
use crate::classifier::TagClassifier;
use crate::db::{with_conn, SharedConnection};
use crate::transcript::buffer::Batch;
use crate::users::store;
use crate::users::types::{dedup_tags, Tag};

/// What happened to one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub session_id: String,
    pub segments: usize,
    /// Tags the classifier returned (deduplicated) and that were merged.
    pub tags: Vec<Tag>,
    /// CID of the archived batch, when the upload and the record update succeeded.
    pub cid: Option<String>,
}

#[derive(Clone)]
pub struct Pipeline {
    db: SharedConnection,
    classifier: Arc<dyn TagClassifier>,
    archive: Arc<dyn ArchiveStore>,
}

impl Pipeline {
    pub fn new(
        db: SharedConnection,
        classifier: Arc<dyn TagClassifier>,
        archive: Arc<dyn ArchiveStore>,
    ) -> Self {
        Self {
            db,
            classifier,
            archive,
        }
    }

    pub async fn process(&self, batch: &Batch) -> BatchOutcome {
        let tags = self.merge_tags(batch).await;
        let cid = self.archive_batch(batch).await;

        tracing::info!(
            uid = %batch.uid,
            session_id = %batch.session_id,
            segments = batch.segments.len(),
            tags = tags.len(),
            archived = cid.is_some(),
            "batch processed"
        );

        BatchOutcome {
            session_id: batch.session_id.clone(),
            segments: batch.segments.len(),
            tags,
            cid,
        }
    }

    async fn merge_tags(&self, batch: &Batch) -> Vec<Tag> {
        let text = batch.text();
        let tags = match self.classifier.classify(&text, &Tag::ALL).await {
            Ok(tags) => dedup_tags(tags),
            Err(e) => {
                tracing::warn!(session_id = %batch.session_id, error = %e, "classification failed");
                return Vec::new();
            }
        };
        if tags.is_empty() {
            return tags;
        }

        let uid = batch.uid.clone();
        let to_store = tags.clone();
        match with_conn(&self.db, move |conn| store::add_tags(conn, &uid, &to_store)).await {
            Ok(_) => tags,
            Err(e) => {
                tracing::warn!(uid = %batch.uid, error = %e, "failed to merge tags");
                Vec::new()
            }
        }
    }

    async fn archive_batch(&self, batch: &Batch) -> Option<String> {
        let document = serde_json::json!({
            "session_id": batch.session_id,
            "segments": batch.segments,
        });

        let cid = match self
            .archive
            .upload(&conversations_file_name(&batch.uid), &document)
            .await
        {
            Ok(cid) => cid,
            Err(e) => {
                tracing::warn!(session_id = %batch.session_id, error = %e, "archive upload failed");
                return None;
            }
        };

        let uid = batch.uid.clone();
        let stored = cid.clone();
        match with_conn(&self.db, move |conn| store::push_conversation_cid(conn, &uid, &stored)).await {
            Ok(_) => Some(cid),
            Err(e) => {
                tracing::warn!(uid = %batch.uid, cid = %cid, error = %e, "failed to record CID");
                None
            }
        }
    }
}
