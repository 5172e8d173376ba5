use super::{ExamSession, Question, SessionError, SessionStatus, SubjectGroup};

/// Current view: subject index and page index within that subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub subject: usize,
    pub page: usize,
}

impl ExamSession {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn current_subject(&self) -> Option<&SubjectGroup> {
        self.subjects.get(self.position.subject)
    }

    /// Questions shown on the current page; empty before load or for an empty subject.
    pub fn current_questions(&self) -> &[Question] {
        match self.current_subject() {
            Some(subject) => subject.page(self.position.page, self.page_size),
            None => &[],
        }
    }

    fn pages_in(&self, subject: usize) -> usize {
        self.subjects.get(subject).map_or(0, |group| group.page_count(self.page_size))
    }

    fn can_navigate(&self) -> bool {
        !self.subjects.is_empty() && self.status != SessionStatus::Submitted
    }

    /// Advances one page, crossing into the next subject when needed.
    /// Returns `false` without moving when already on the last page.
    pub fn next(&mut self) -> bool {
        if !self.can_navigate() {
            return false;
        }

        if self.position.page + 1 < self.pages_in(self.position.subject) {
            self.position.page += 1;
            return true;
        }
        if self.position.subject + 1 < self.subjects.len() {
            self.position = Position { subject: self.position.subject + 1, page: 0 };
            return true;
        }
        false
    }

    /// Steps back one page, landing on the last page of the previous subject when needed.
    pub fn previous(&mut self) -> bool {
        if !self.can_navigate() {
            return false;
        }

        if self.position.page > 0 {
            self.position.page -= 1;
            return true;
        }
        if self.position.subject > 0 {
            let subject = self.position.subject - 1;
            self.position = Position { subject, page: self.pages_in(subject) - 1 };
            return true;
        }
        false
    }

    /// Moves straight to the page holding question `question_index` of `subject_id`.
    pub fn jump_to(
        &mut self,
        subject_id: &str,
        question_index: usize,
    ) -> Result<Position, SessionError> {
        if self.status == SessionStatus::Submitted {
            return Err(SessionError::Submitted);
        }

        let subject = self
            .subjects
            .iter()
            .position(|group| group.id == subject_id)
            .ok_or_else(|| SessionError::UnknownSubject(subject_id.to_string()))?;

        if question_index >= self.subjects[subject].questions.len() {
            return Err(SessionError::NavigationOutOfRange {
                subject_id: subject_id.to_string(),
                index: question_index,
            });
        }

        self.position = Position { subject, page: question_index / self.page_size };
        Ok(self.position)
    }

    pub fn is_first_page(&self) -> bool {
        self.position == Position::default()
    }

    /// True exactly when `next` would not move; an unloaded session has nowhere to go.
    pub fn is_last_page(&self) -> bool {
        let Some(last_subject) = self.subjects.len().checked_sub(1) else {
            return true;
        };
        self.position.subject == last_subject
            && self.position.page + 1 >= self.pages_in(last_subject)
    }
}
