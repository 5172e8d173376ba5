use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{config::Settings, security::Credentials, state::AppState};
use crate::schemas::exam::ExamRecord;
use crate::session::{AnswerSink, ExamProvider, ExamSession, LoadedExam};

/// One subject per entry of `counts`, each holding that many four-option questions.
/// Subject ids are `s0`, `s1`, ...; question ids `s0-q0`, `s0-q1`, ...
pub(crate) fn exam_record(counts: &[usize], duration_minutes: u64) -> ExamRecord {
    serde_json::from_value(exam_json(counts, duration_minutes)).expect("fixture exam record")
}

pub(crate) fn exam_json(counts: &[usize], duration_minutes: u64) -> Value {
    let subjects: Vec<Value> = (0..counts.len())
        .map(|index| json!({ "_id": format!("s{index}"), "title": format!("Subject {index}") }))
        .collect();
    let questions: Vec<Value> = counts
        .iter()
        .enumerate()
        .flat_map(|(subject, count)| {
            (0..*count).map(move |index| {
                json!({
                    "_id": format!("s{subject}-q{index}"),
                    "subjectId": format!("s{subject}"),
                    "question": format!("Question {index} of subject {subject}"),
                    "optionA": "A",
                    "optionB": "B",
                    "optionC": "C",
                    "optionD": "D"
                })
            })
        })
        .collect();

    json!({
        "_id": "exam-1",
        "title": "Mock Exam",
        "duration": duration_minutes.to_string(),
        "subjects": subjects,
        "question": questions,
    })
}

pub(crate) fn loaded_session(counts: &[usize], page_size: usize) -> ExamSession {
    let mut session = ExamSession::new(page_size);
    session.install(LoadedExam::from_record(exam_record(counts, 30))).expect("install");
    session
}

pub(crate) fn started_session(counts: &[usize], page_size: usize) -> ExamSession {
    let mut session = loaded_session(counts, page_size);
    session.begin().expect("begin");
    session
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new("student-1", "test-token")
}

/// In-memory exam backend: serves a fixed exam list and records answer saves.
pub(crate) struct FakeBackend {
    exams: Mutex<Result<Vec<ExamRecord>, String>>,
    fetches: Mutex<usize>,
    saves: Mutex<Vec<(String, String)>>,
    failing_saves: Mutex<bool>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            exams: Mutex::new(Ok(Vec::new())),
            fetches: Mutex::new(0),
            saves: Mutex::new(Vec::new()),
            failing_saves: Mutex::new(false),
        }
    }
}

impl FakeBackend {
    pub(crate) fn serving(records: Vec<ExamRecord>) -> Self {
        let backend = Self::default();
        *backend.exams.lock().expect("lock") = Ok(records);
        backend
    }

    pub(crate) fn failing(message: &str) -> Self {
        let backend = Self::default();
        *backend.exams.lock().expect("lock") = Err(message.to_string());
        backend
    }

    pub(crate) fn serve(&self, records: Vec<ExamRecord>) {
        *self.exams.lock().expect("lock") = Ok(records);
    }

    pub(crate) fn fail_saves(&self, failing: bool) {
        *self.failing_saves.lock().expect("lock") = failing;
    }

    pub(crate) fn fetches(&self) -> usize {
        *self.fetches.lock().expect("lock")
    }

    pub(crate) fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ExamProvider for FakeBackend {
    async fn fetch_exams(&self, _credentials: &Credentials) -> anyhow::Result<Vec<ExamRecord>> {
        *self.fetches.lock().expect("lock") += 1;
        self.exams.lock().expect("lock").clone().map_err(anyhow::Error::msg)
    }
}

#[async_trait]
impl AnswerSink for FakeBackend {
    async fn save_answer(
        &self,
        _credentials: &Credentials,
        question_id: &str,
        option_key: &str,
    ) -> anyhow::Result<()> {
        if *self.failing_saves.lock().expect("lock") {
            anyhow::bail!("answer backend unavailable");
        }
        self.saves.lock().expect("lock").push((question_id.to_string(), option_key.to_string()));
        Ok(())
    }
}

pub(crate) fn test_state(backend: Arc<FakeBackend>) -> AppState {
    AppState::new(Settings::for_tests(), backend.clone(), backend)
}
