use thiserror::Error;

use super::SessionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("failed to load exam data: {0}")]
    LoadFailed(String),
    #[error("no exam is available for this student")]
    NoExamAvailable,
    #[error("exam data has not been loaded")]
    NotLoaded,
    #[error("unknown subject {0}")]
    UnknownSubject(String),
    #[error("subject {subject_id} has no question at position {index}")]
    NavigationOutOfRange { subject_id: String, index: usize },
    #[error("answer rejected: {0}")]
    AnswerRejected(String),
    #[error("cannot {action} while the session is {status}")]
    InvalidTransition { status: SessionStatus, action: &'static str },
    #[error("the exam has already been submitted")]
    Submitted,
}
