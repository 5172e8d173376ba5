use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamInfo {
    pub id: Option<String>,
    pub title: String,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    /// Back-reference to the owning subject; grouping never reads it after load.
    pub subject_id: String,
    pub text: String,
    pub options: BTreeMap<String, String>,
}

impl Question {
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Option keys in display order.
    pub fn option_keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn option_key_at(&self, index: usize) -> Option<&str> {
        self.option_keys().nth(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

impl SubjectGroup {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), questions: Vec::new() }
    }

    /// A subject without questions still occupies one (empty) page.
    pub fn page_count(&self, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        self.questions.len().div_ceil(page_size).max(1)
    }

    pub fn page(&self, page: usize, page_size: usize) -> &[Question] {
        let page_size = page_size.max(1);
        let start = page.saturating_mul(page_size).min(self.questions.len());
        let end = start.saturating_add(page_size).min(self.questions.len());
        &self.questions[start..end]
    }
}
