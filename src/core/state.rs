use std::sync::Arc;

use crate::core::config::Settings;
use crate::session::{AnswerSink, ExamLoader, ExamProvider};

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    provider: Arc<dyn ExamProvider>,
    sink: Arc<dyn AnswerSink>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        provider: Arc<dyn ExamProvider>,
        sink: Arc<dyn AnswerSink>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, provider, sink }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn loader(&self) -> ExamLoader {
        ExamLoader::new(self.inner.provider.clone())
    }

    pub(crate) fn sink(&self) -> Arc<dyn AnswerSink> {
        self.inner.sink.clone()
    }
}
