pub(crate) mod console;
pub(crate) mod core;
pub mod schemas;
pub(crate) mod services;
pub mod session;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

pub use crate::core::security::Credentials;

use crate::core::{config::Settings, security::CredentialStore, state::AppState, telemetry};
use crate::services::exam_api::ExamApiClient;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let store = CredentialStore::from_settings(&settings)?;
    let client = Arc::new(ExamApiClient::from_settings(&settings)?);

    tracing::info!(
        environment = %settings.runtime().environment.as_str(),
        exam_url = %settings.exam_url(),
        page_size = settings.session().page_size,
        "CBT exam client starting"
    );

    let state = AppState::new(settings, client.clone(), client);
    let result = console::run(state, store).await;

    if let Some(snapshot) = core::metrics::render() {
        tracing::info!(metrics = %snapshot, "Session metrics");
    }

    result
}
