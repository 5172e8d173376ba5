use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const EXAM_LOADS_TOTAL: &str = "cbt_exam_loads_total";
pub(crate) const ANSWERS_RECORDED_TOTAL: &str = "cbt_answers_recorded_total";
pub(crate) const ANSWER_SYNC_TOTAL: &str = "cbt_answer_sync_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_exam_load(outcome: &'static str) {
    metrics::counter!(EXAM_LOADS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_answer() {
    metrics::counter!(ANSWERS_RECORDED_TOTAL).increment(1);
}

pub(crate) fn record_answer_sync(outcome: &'static str) {
    metrics::counter!(ANSWER_SYNC_TOTAL, "outcome" => outcome).increment(1);
}
