use super::{ExamSession, SessionStatus, SubmitCause};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock is not running; nothing changed.
    Ignored,
    Running { remaining_seconds: u64 },
    /// This tick used the last second and moved the session to a forced submit.
    Expired,
}

impl ExamSession {
    /// Applies one elapsed second of exam time. The clock keeps running while a
    /// student-requested confirmation is pending; expiry there turns it into a
    /// forced submit.
    pub fn tick(&mut self) -> TickOutcome {
        if !matches!(
            self.status,
            SessionStatus::InProgress
                | SessionStatus::PendingSubmitConfirmation(SubmitCause::UserRequested)
        ) {
            return TickOutcome::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Running { remaining_seconds: self.remaining_seconds };
        }

        self.status = SessionStatus::PendingSubmitConfirmation(SubmitCause::TimeExpired);
        tracing::info!("Exam time expired");
        TickOutcome::Expired
    }
}
