//! Batch expansion over all active series.
//!
//! A periodic job in the surrounding application calls this to keep the
//! calendar materialized ahead of time. One misconfigured or failing
//! series never aborts the batch; its outcome is collected and reported.

use futures::future::join_all;

use crate::api::{DateWindow, SeriesId};
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::services::expansion::{generate_instances, SeriesWarning};

/// Aggregated result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Series expanded without error (including those that produced nothing).
    pub series_expanded: usize,
    /// Instances created across the whole batch.
    pub instances_created: usize,
    /// Misconfiguration warnings, per series.
    pub warnings: Vec<(SeriesId, SeriesWarning)>,
    /// Per-series failures; the rest of the batch still ran.
    pub failures: Vec<(SeriesId, String)>,
}

/// Expand every active series intersecting `window`.
///
/// Independent series run concurrently; same-series writers serialize on
/// the store's cursor CAS, so a batch racing an interactive calendar fetch
/// cannot duplicate instances.
pub async fn expand_all_due(
    repo: &dyn FullRepository,
    window: &DateWindow,
) -> RepositoryResult<BatchOutcome> {
    let series_list = repo.list_active(window).await?;
    log::info!(
        "batch expansion: {} active series intersect {}",
        series_list.len(),
        window
    );

    let results = join_all(series_list.iter().map(|series| {
        let id = series.id;
        async move { (id, generate_instances(repo, id, window).await) }
    }))
    .await;

    let mut outcome = BatchOutcome::default();
    for (id, result) in results {
        match result {
            Ok(generated) => {
                outcome.series_expanded += 1;
                outcome.instances_created += generated.instances.len();
                if let Some(warning) = generated.warning {
                    outcome.warnings.push((id, warning));
                }
            }
            Err(e) => {
                log::warn!("batch expansion failed for series {}: {}", id, e);
                outcome.failures.push((id, e.to_string()));
            }
        }
    }

    log::info!(
        "batch expansion: {} series, {} instances created, {} warnings, {} failures",
        outcome.series_expanded,
        outcome.instances_created,
        outcome.warnings.len(),
        outcome.failures.len()
    );
    Ok(outcome)
}
