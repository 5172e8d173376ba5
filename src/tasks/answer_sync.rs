use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::core::metrics;
use crate::core::security::Credentials;
use crate::session::{AnswerSink, PendingSave, SyncOutcome};

/// Sends one answer to the sink in the background and reports the result on `outcomes`.
pub(crate) fn spawn_save(
    sink: Arc<dyn AnswerSink>,
    credentials: Credentials,
    save: PendingSave,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = save_one(sink.as_ref(), &credentials, save).await;
        if outcomes.send(outcome).is_err() {
            tracing::debug!("Session loop gone; answer save outcome dropped");
        }
    })
}

/// Saves every pending answer concurrently and waits for all of them.
pub(crate) async fn flush(
    sink: Arc<dyn AnswerSink>,
    credentials: &Credentials,
    backlog: Vec<PendingSave>,
) -> Vec<SyncOutcome> {
    if backlog.is_empty() {
        return Vec::new();
    }

    tracing::info!(pending = backlog.len(), "Flushing unsynced answers");
    let mut saves = JoinSet::new();
    for save in backlog {
        let sink = sink.clone();
        let credentials = credentials.clone();
        saves.spawn(async move { save_one(sink.as_ref(), &credentials, save).await });
    }

    let mut outcomes = Vec::with_capacity(saves.len());
    while let Some(joined) = saves.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => tracing::error!(error = %err, "Answer save task join failed"),
        }
    }
    outcomes.sort_by_key(|outcome| outcome.save.revision);
    outcomes
}

async fn save_one(
    sink: &dyn AnswerSink,
    credentials: &Credentials,
    save: PendingSave,
) -> SyncOutcome {
    match sink.save_answer(credentials, &save.question_id, &save.option_key).await {
        Ok(()) => {
            metrics::record_answer_sync("ok");
            tracing::debug!(
                question_id = %save.question_id,
                revision = save.revision,
                "Answer saved"
            );
            SyncOutcome::succeeded(save)
        }
        Err(err) => {
            metrics::record_answer_sync("error");
            tracing::warn!(
                question_id = %save.question_id,
                revision = save.revision,
                error = %format!("{err:#}"),
                "Answer save failed"
            );
            SyncOutcome::failed(save, format!("{err:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
        reject: Option<&'static str>,
    }

    #[async_trait]
    impl AnswerSink for RecordingSink {
        async fn save_answer(
            &self,
            credentials: &Credentials,
            question_id: &str,
            option_key: &str,
        ) -> anyhow::Result<()> {
            assert_eq!(credentials.student_id(), "student-1");
            self.calls.lock().expect("lock").push((question_id.to_string(), option_key.to_string()));
            if self.reject == Some(question_id) {
                anyhow::bail!("backend rejected {question_id}");
            }
            Ok(())
        }
    }

    fn save(question_id: &str, option_key: &str, revision: u64) -> PendingSave {
        PendingSave {
            question_id: question_id.to_string(),
            option_key: option_key.to_string(),
            revision,
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("student-1", "token")
    }

    #[tokio::test]
    async fn spawned_save_reports_success() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_save(sink.clone(), credentials(), save("q1", "optionA", 1), tx)
            .await
            .expect("join");

        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome, SyncOutcome::succeeded(save("q1", "optionA", 1)));
        assert_eq!(sink.calls.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn spawned_save_reports_failure_with_message() {
        let sink = Arc::new(RecordingSink { reject: Some("q1"), ..RecordingSink::default() });
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_save(sink, credentials(), save("q1", "optionB", 4), tx).await.expect("join");

        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome.save.revision, 4);
        assert!(matches!(outcome.result, Err(ref message) if message.contains("rejected q1")));
    }

    #[tokio::test]
    async fn flush_saves_everything_in_revision_order() {
        let sink = Arc::new(RecordingSink { reject: Some("q2"), ..RecordingSink::default() });
        let backlog = vec![save("q3", "optionA", 3), save("q1", "optionC", 1), save("q2", "optionD", 2)];

        let outcomes = flush(sink.clone(), &credentials(), backlog).await;

        let revisions: Vec<u64> = outcomes.iter().map(|outcome| outcome.save.revision).collect();
        assert_eq!(revisions, vec![1, 2, 3]);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(sink.calls.lock().expect("lock").len(), 3);
    }

    #[tokio::test]
    async fn flush_of_empty_backlog_does_nothing() {
        let sink = Arc::new(RecordingSink::default());
        assert!(flush(sink.clone(), &credentials(), Vec::new()).await.is_empty());
        assert!(sink.calls.lock().expect("lock").is_empty());
    }
}
