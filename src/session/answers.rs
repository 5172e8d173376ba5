use std::collections::HashMap;

use async_trait::async_trait;

use super::{ExamSession, SessionError, SessionStatus};
use crate::core::metrics;
use crate::core::security::Credentials;

/// Remote persistence for individual answers.
#[async_trait]
pub trait AnswerSink: Send + Sync {
    async fn save_answer(
        &self,
        credentials: &Credentials,
        question_id: &str,
        option_key: &str,
    ) -> anyhow::Result<()>;
}

/// A selection that still has to reach the answer sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub question_id: String,
    pub option_key: String,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub save: PendingSave,
    pub result: Result<(), String>,
}

impl SyncOutcome {
    pub fn succeeded(save: PendingSave) -> Self {
        Self { save, result: Ok(()) }
    }

    pub fn failed(save: PendingSave, error: impl Into<String>) -> Self {
        Self { save, result: Err(error.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDisposition {
    /// The sink acknowledged the selection currently held locally.
    Confirmed,
    /// The outcome belongs to a selection that has since been replaced.
    Stale,
    /// The save failed; the selection stays queued for another attempt.
    Failed,
    /// The session is already submitted.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    option_key: String,
    revision: u64,
    synced: bool,
}

/// Local, authoritative answer state plus the remote-sync backlog.
#[derive(Debug, Clone, Default)]
pub struct AnswerBook {
    selections: HashMap<String, Selection>,
    last_revision: u64,
}

impl AnswerBook {
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.selections.get(question_id).map(|selection| selection.option_key.as_str())
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.selections.contains_key(question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selections
            .iter()
            .map(|(question_id, selection)| (question_id.as_str(), selection.option_key.as_str()))
    }

    /// Unconfirmed selections, oldest first.
    pub fn unsynced(&self) -> Vec<PendingSave> {
        let mut pending: Vec<PendingSave> = self
            .selections
            .iter()
            .filter(|(_, selection)| !selection.synced)
            .map(|(question_id, selection)| PendingSave {
                question_id: question_id.clone(),
                option_key: selection.option_key.clone(),
                revision: selection.revision,
            })
            .collect();
        pending.sort_by_key(|save| save.revision);
        pending
    }

    fn upsert(&mut self, question_id: &str, option_key: &str) -> PendingSave {
        self.last_revision += 1;
        let revision = self.last_revision;
        self.selections.insert(
            question_id.to_string(),
            Selection { option_key: option_key.to_string(), revision, synced: false },
        );
        PendingSave {
            question_id: question_id.to_string(),
            option_key: option_key.to_string(),
            revision,
        }
    }

    fn apply(&mut self, outcome: &SyncOutcome) -> SyncDisposition {
        let Some(selection) = self.selections.get_mut(&outcome.save.question_id) else {
            return SyncDisposition::Stale;
        };
        if selection.revision != outcome.save.revision {
            return SyncDisposition::Stale;
        }
        match outcome.result {
            Ok(()) => {
                selection.synced = true;
                SyncDisposition::Confirmed
            }
            Err(_) => SyncDisposition::Failed,
        }
    }
}

impl ExamSession {
    /// Records a selection locally and returns the save the caller should send to the sink.
    /// A repeated selection for the same question replaces the earlier one.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        option_key: &str,
    ) -> Result<PendingSave, SessionError> {
        self.ensure_in_progress("record an answer")?;

        let question_id = question_id.trim();
        let option_key = option_key.trim();
        if question_id.is_empty() || option_key.is_empty() {
            return Err(SessionError::AnswerRejected(
                "question id and option are both required".to_string(),
            ));
        }

        let question = self
            .question(question_id)
            .ok_or_else(|| SessionError::AnswerRejected(format!("unknown question {question_id}")))?;
        if !question.has_option(option_key) {
            return Err(SessionError::AnswerRejected(format!(
                "question {question_id} has no option {option_key}"
            )));
        }

        let pending = self.answers.upsert(question_id, option_key);
        tracing::debug!(question_id, option_key, revision = pending.revision, "Answer recorded");
        metrics::record_answer();
        Ok(pending)
    }

    /// Folds an answer-save result back into the sync backlog. Never changes the selection.
    pub fn apply_sync_outcome(&mut self, outcome: &SyncOutcome) -> SyncDisposition {
        if self.status == SessionStatus::Submitted {
            tracing::debug!(
                question_id = %outcome.save.question_id,
                "Answer save finished after submission; ignored"
            );
            return SyncDisposition::Ignored;
        }
        self.answers.apply(outcome)
    }

    pub fn unsynced_answers(&self) -> Vec<PendingSave> {
        self.answers.unsynced()
    }
}
