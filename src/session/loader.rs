use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::{ExamInfo, ExamSession, Question, SessionError, SubjectGroup};
use crate::core::metrics;
use crate::core::security::Credentials;
use crate::schemas::exam::{ExamRecord, QuestionRecord, SubjectRecord};

/// Source of the exams assigned to the signed-in student.
#[async_trait]
pub trait ExamProvider: Send + Sync {
    async fn fetch_exams(&self, credentials: &Credentials) -> anyhow::Result<Vec<ExamRecord>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedQuestions {
    pub subjects: Vec<SubjectGroup>,
    /// Questions left out because their subject is unknown or their id repeats.
    pub dropped: usize,
}

/// Distributes the flat question list into subject groups, keeping provider order
/// for both subjects and questions.
pub fn group_questions(
    subjects: Vec<SubjectRecord>,
    questions: Vec<QuestionRecord>,
) -> GroupedQuestions {
    let mut groups: Vec<SubjectGroup> = Vec::with_capacity(subjects.len());
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(subjects.len());

    for subject in subjects {
        if slots.contains_key(&subject.id) {
            tracing::debug!(subject_id = %subject.id, "Duplicate subject ignored");
            continue;
        }
        slots.insert(subject.id.clone(), groups.len());
        groups.push(SubjectGroup::new(subject.id, subject.title));
    }

    let mut seen_questions = HashSet::with_capacity(questions.len());
    let mut dropped = 0;

    for record in questions {
        let Some(&slot) = slots.get(&record.subject_id) else {
            tracing::debug!(
                question_id = %record.id,
                subject_id = %record.subject_id,
                "Question references unknown subject; dropped"
            );
            dropped += 1;
            continue;
        };
        if !seen_questions.insert(record.id.clone()) {
            tracing::debug!(question_id = %record.id, "Duplicate question id; dropped");
            dropped += 1;
            continue;
        }

        let options = record.option_map();
        groups[slot].questions.push(Question {
            id: record.id,
            subject_id: record.subject_id,
            text: record.text,
            options,
        });
    }

    GroupedQuestions { subjects: groups, dropped }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedExam {
    pub info: ExamInfo,
    pub subjects: Vec<SubjectGroup>,
    pub dropped_questions: usize,
}

impl LoadedExam {
    pub fn from_record(record: ExamRecord) -> Self {
        let grouped = group_questions(record.subjects, record.question);
        Self {
            info: ExamInfo {
                id: record.id,
                title: record.title,
                duration_seconds: record.duration.saturating_mul(60),
            },
            subjects: grouped.subjects,
            dropped_questions: grouped.dropped,
        }
    }
}

#[derive(Clone)]
pub struct ExamLoader {
    provider: Arc<dyn ExamProvider>,
}

impl ExamLoader {
    pub fn new(provider: Arc<dyn ExamProvider>) -> Self {
        Self { provider }
    }

    /// Fetches the student's exam and installs it into a fresh session.
    ///
    /// On any failure the session is left untouched, so calling `load` again retries.
    #[tracing::instrument(skip_all, fields(student_id = %credentials.student_id()))]
    pub async fn load(
        &self,
        session: &mut ExamSession,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        session.ensure_loadable()?;

        let records = match self.provider.fetch_exams(credentials).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Exam load failed");
                metrics::record_exam_load("error");
                return Err(SessionError::LoadFailed(format!("{err:#}")));
            }
        };

        let available = records.len();
        let Some(record) = records.into_iter().next() else {
            tracing::warn!("Exam provider returned no exams");
            metrics::record_exam_load("empty");
            return Err(SessionError::NoExamAvailable);
        };
        if available > 1 {
            tracing::debug!(available, "Multiple exams returned; using the first");
        }

        let loaded = LoadedExam::from_record(record);
        tracing::info!(
            exam_id = loaded.info.id.as_deref().unwrap_or("-"),
            subjects = loaded.subjects.len(),
            dropped_questions = loaded.dropped_questions,
            duration_seconds = loaded.info.duration_seconds,
            "Exam loaded"
        );
        session.install(loaded)?;
        metrics::record_exam_load("ok");
        Ok(())
    }
}
