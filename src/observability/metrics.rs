//! Prometheus metrics export.

use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Mutex;

static PROMETHEUS: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the Prometheus recorder as the global metrics recorder.
///
/// Safe to call more than once; later calls return the handle installed by
/// the first.
///
/// # Errors
///
/// Returns an error if another recorder is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let mut guard = PROMETHEUS.lock().map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })?;

    if let Some(handle) = guard.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;
    *guard = Some(handle.clone());
    Ok(handle)
}
