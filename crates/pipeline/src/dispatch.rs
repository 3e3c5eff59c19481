use std::future::Future;
use std::sync::Arc;
use tindabot_core::metrics::MetricsStore;
use tracing::error;
use uuid::Uuid;

/// Fire a detached unit of work. The webhook handler never waits on these;
/// a task runs to completion or failure and a failure is logged and counted,
/// never silently dropped. There is no cancellation and no pipeline-level
/// timeout.
pub fn spawn_logged<F>(task: &'static str, metrics: Arc<MetricsStore>, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let trace_id = Uuid::new_v4();
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            metrics.inc_task_failures();
            error!(task, trace_id = %trace_id, error = %e, "background task failed");
        }
    });
}
