//! Client-side state for one student's exam attempt.
//!
//! `ExamSession` is owned by a single writer. Every mutation happens through one of
//! its methods in response to a discrete event: a load result, a console command,
//! a countdown tick or an answer-save outcome.

mod answers;
mod error;
mod loader;
mod model;
mod navigation;
mod progress;
mod submission;
mod timer;


use std::collections::HashMap;

use time::OffsetDateTime;

pub use answers::{AnswerBook, AnswerSink, PendingSave, SyncDisposition, SyncOutcome};
pub use error::SessionError;
pub use loader::{group_questions, ExamLoader, ExamProvider, GroupedQuestions, LoadedExam};
pub use model::{ExamInfo, Question, SubjectGroup};
pub use navigation::Position;
pub use progress::{PaletteCell, Progress, SubjectProgress};
pub use submission::{SessionStatus, SubmissionReceipt, SubmitCause};
pub use timer::TickOutcome;

pub const DEFAULT_PAGE_SIZE: usize = 1;

#[derive(Debug, Clone)]
pub struct ExamSession {
    exam: Option<ExamInfo>,
    subjects: Vec<SubjectGroup>,
    /// question id -> (subject index, question index within subject)
    question_slots: HashMap<String, (usize, usize)>,
    page_size: usize,
    position: Position,
    answers: AnswerBook,
    remaining_seconds: u64,
    status: SessionStatus,
    started_at: Option<OffsetDateTime>,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ExamSession {
    pub fn new(page_size: usize) -> Self {
        Self {
            exam: None,
            subjects: Vec::new(),
            question_slots: HashMap::new(),
            page_size: page_size.max(1),
            position: Position::default(),
            answers: AnswerBook::default(),
            remaining_seconds: 0,
            status: SessionStatus::NotStarted,
            started_at: None,
        }
    }

    pub fn exam(&self) -> Option<&ExamInfo> {
        self.exam.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.exam.is_some()
    }

    pub fn subjects(&self) -> &[SubjectGroup] {
        &self.subjects
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    pub fn answers(&self) -> &AnswerBook {
        &self.answers
    }

    pub fn selected_option(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        let (subject, index) = *self.question_slots.get(question_id)?;
        self.subjects.get(subject)?.questions.get(index)
    }

    fn ensure_loadable(&self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted || self.exam.is_some() {
            return Err(SessionError::InvalidTransition { status: self.status, action: "load" });
        }
        Ok(())
    }

    /// Installs already-fetched exam data. Only valid once, before the attempt begins.
    pub fn install(&mut self, loaded: LoadedExam) -> Result<(), SessionError> {
        self.ensure_loadable()?;

        let mut question_slots = HashMap::new();
        for (subject_index, subject) in loaded.subjects.iter().enumerate() {
            for (question_index, question) in subject.questions.iter().enumerate() {
                question_slots.insert(question.id.clone(), (subject_index, question_index));
            }
        }

        self.exam = Some(loaded.info);
        self.subjects = loaded.subjects;
        self.question_slots = question_slots;
        self.position = Position::default();
        self.answers = AnswerBook::default();
        self.remaining_seconds = 0;
        Ok(())
    }
}
