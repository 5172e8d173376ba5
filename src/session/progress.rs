use super::ExamSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total_questions: usize,
    pub total_answered: usize,
    pub percent: u32,
}

impl Progress {
    pub fn new(total_questions: usize, total_answered: usize) -> Self {
        let percent = if total_questions == 0 {
            0
        } else {
            (total_answered.min(total_questions) * 100 / total_questions) as u32
        };
        Self { total_questions, total_answered, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProgress {
    pub subject_id: String,
    pub title: String,
    pub answered: usize,
    pub total: usize,
}

/// One square of the jump grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteCell {
    pub question_id: String,
    pub question_index: usize,
    pub answered: bool,
    pub current: bool,
}

impl ExamSession {
    pub fn total_questions(&self) -> usize {
        self.subjects.iter().map(|subject| subject.questions.len()).sum()
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.total_questions(), self.answers.len())
    }

    pub fn subject_progress(&self) -> Vec<SubjectProgress> {
        self.subjects
            .iter()
            .map(|subject| SubjectProgress {
                subject_id: subject.id.clone(),
                title: subject.title.clone(),
                answered: subject
                    .questions
                    .iter()
                    .filter(|question| self.answers.contains(&question.id))
                    .count(),
                total: subject.questions.len(),
            })
            .collect()
    }

    /// Per subject, in order: each question's answered flag and whether it is on screen.
    pub fn question_palette(&self) -> Vec<Vec<PaletteCell>> {
        let on_screen: Vec<&str> =
            self.current_questions().iter().map(|question| question.id.as_str()).collect();

        self.subjects
            .iter()
            .map(|subject| {
                subject
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(question_index, question)| PaletteCell {
                        question_id: question.id.clone(),
                        question_index,
                        answered: self.answers.contains(&question.id),
                        current: on_screen.contains(&question.id.as_str()),
                    })
                    .collect()
            })
            .collect()
    }
}
