// crates/credence-community/src/analyses.rs
//
// AnalysisHistory: per-user saved analyses.
//
// Ids are UUID v7 so lexical id order is creation order; listings still
// sort on `created_at` so imported records with foreign ids behave.
// Deletion is owner-only and runs as a transaction so a concurrent share
// of the same analysis sees either the record or its absence.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use credence_core::document::{Collection, DocKey, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;
use credence_store::{run_transaction, with_retry, RetryPolicy, TxnPlan};

use crate::ledger::validate_id;
use crate::models::{AnalysisRecord, NewAnalysis};

pub(crate) fn analysis_key(id: &str) -> DocKey {
    DocKey::new(Collection::NewsAnalyses, id)
}

#[derive(Clone)]
pub struct AnalysisHistory {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl AnalysisHistory {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Persist a new analysis for `user_id`.
    pub async fn save_analysis(
        &self,
        user_id: &str,
        analysis: NewAnalysis,
    ) -> Result<AnalysisRecord, CredenceError> {
        validate_id("user", user_id)?;
        if analysis.url.trim().is_empty() {
            return Err(CredenceError::InvalidArgument("analysis url is empty".into()));
        }

        let record = AnalysisRecord {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            url: analysis.url,
            title: analysis.title,
            summary: analysis.summary,
            verdict: analysis.verdict,
            cross_check: analysis.cross_check,
            domain_credibility: analysis.domain_credibility,
            created_at: Utc::now(),
        };
        let key = analysis_key(&record.id);
        let body = serde_json::to_value(&record)?;

        let (_, created) = with_retry(&self.policy, || self.store.create_if_absent(&key, body.clone())).await?;
        if !created {
            return Err(CredenceError::Conflict(format!("analysis id {} already taken", record.id)));
        }

        tracing::debug!(analysis_id = %record.id, user_id, url = %record.url, "saved analysis");
        Ok(record)
    }

    pub async fn get_analysis(&self, id: &str) -> Result<AnalysisRecord, CredenceError> {
        let key = analysis_key(id);
        with_retry(&self.policy, || self.store.get(&key))
            .await?
            .ok_or_else(|| CredenceError::NotFound(format!("analysis {}", id)))?
            .decode()
    }

    /// The user's analyses, newest first, at most `limit`.
    pub async fn list_user_analyses(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, CredenceError> {
        let docs = with_retry(&self.policy, || self.store.list(Collection::NewsAnalyses)).await?;

        let mut records = Vec::new();
        for (_, doc) in docs {
            let record: AnalysisRecord = doc.decode()?;
            if record.user_id == user_id {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    /// Delete an analysis owned by `user_id`.
    pub async fn delete_analysis(&self, id: &str, user_id: &str) -> Result<(), CredenceError> {
        let key = analysis_key(id);
        run_transaction(self.store.as_ref(), &self.policy, std::slice::from_ref(&key), |snapshot| {
            let record: AnalysisRecord = snapshot
                .decode(&key)?
                .ok_or_else(|| CredenceError::NotFound(format!("analysis {}", id)))?;
            if record.user_id != user_id {
                return Err(CredenceError::Unauthorized(format!(
                    "analysis {} is not owned by {}",
                    id, user_id
                )));
            }
            Ok(TxnPlan::new(vec![Write::delete(key.clone())], ()))
        })
        .await?;

        tracing::debug!(analysis_id = id, user_id, "deleted analysis");
        Ok(())
    }
}
