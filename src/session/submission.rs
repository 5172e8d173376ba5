use std::fmt;

use time::OffsetDateTime;

use super::{ExamSession, SessionError};

/// Why the session is waiting for a submit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitCause {
    /// The student asked to submit from the last page; they may still back out.
    UserRequested,
    /// The countdown ran out; the only way forward is to submit.
    TimeExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    PendingSubmitConfirmation(SubmitCause),
    Submitted,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::PendingSubmitConfirmation(SubmitCause::UserRequested) => {
                "awaiting submit confirmation"
            }
            Self::PendingSubmitConfirmation(SubmitCause::TimeExpired) => "out of time",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub exam_id: Option<String>,
    pub title: String,
    pub answered: usize,
    pub total_questions: usize,
    pub cause: SubmitCause,
    pub started_at: Option<OffsetDateTime>,
    pub submitted_at: OffsetDateTime,
}

impl ExamSession {
    pub(super) fn ensure_in_progress(&self, action: &'static str) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Submitted => Err(SessionError::Submitted),
            status => Err(SessionError::InvalidTransition { status, action }),
        }
    }

    /// Starts the attempt and arms the countdown at the full exam duration.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::InvalidTransition { status: self.status, action: "begin" });
        }
        let Some(exam) = &self.exam else {
            return Err(SessionError::NotLoaded);
        };

        self.remaining_seconds = exam.duration_seconds;
        self.started_at = Some(OffsetDateTime::now_utc());
        self.status = if self.remaining_seconds == 0 {
            SessionStatus::PendingSubmitConfirmation(SubmitCause::TimeExpired)
        } else {
            SessionStatus::InProgress
        };
        tracing::info!(remaining_seconds = self.remaining_seconds, "Exam attempt started");
        Ok(())
    }

    /// Student-initiated submit, only offered on the last page.
    pub fn request_submit(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress("submit")?;
        if !self.is_last_page() {
            return Err(SessionError::InvalidTransition {
                status: self.status,
                action: "submit before the last page",
            });
        }

        self.status = SessionStatus::PendingSubmitConfirmation(SubmitCause::UserRequested);
        Ok(())
    }

    pub fn can_cancel_submit(&self) -> bool {
        self.status == SessionStatus::PendingSubmitConfirmation(SubmitCause::UserRequested)
            && self.remaining_seconds > 0
    }

    /// Returns to the exam from a student-initiated confirmation.
    pub fn cancel_submit(&mut self) -> Result<(), SessionError> {
        if self.can_cancel_submit() {
            self.status = SessionStatus::InProgress;
            return Ok(());
        }
        match self.status {
            SessionStatus::Submitted => Err(SessionError::Submitted),
            status => Err(SessionError::InvalidTransition { status, action: "cancel submission" }),
        }
    }

    /// Final, irreversible transition. The session accepts no mutation afterwards.
    pub fn confirm_submit(&mut self) -> Result<SubmissionReceipt, SessionError> {
        let cause = match self.status {
            SessionStatus::PendingSubmitConfirmation(cause) => cause,
            SessionStatus::Submitted => return Err(SessionError::Submitted),
            status => {
                return Err(SessionError::InvalidTransition { status, action: "confirm submission" })
            }
        };

        self.status = SessionStatus::Submitted;
        let progress = self.progress();
        let exam = self.exam.as_ref();
        let receipt = SubmissionReceipt {
            exam_id: exam.and_then(|info| info.id.clone()),
            title: exam.map(|info| info.title.clone()).unwrap_or_default(),
            answered: progress.total_answered,
            total_questions: progress.total_questions,
            cause,
            started_at: self.started_at,
            submitted_at: OffsetDateTime::now_utc(),
        };
        tracing::info!(
            answered = receipt.answered,
            total_questions = receipt.total_questions,
            cause = ?cause,
            "Exam submitted"
        );
        Ok(receipt)
    }
}
