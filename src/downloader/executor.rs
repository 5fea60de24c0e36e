//! Export executor with done-marker resume
//!
//! Each export is split into fetch units. Units whose marker already exists
//! are skipped; every other unit is fetched through the
//! [`AuthenticatedCaller`], its artifact written atomically, and only then
//! marked done.

use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use crate::auth::{AuthorizationPrompt, OAuthFlow, TokenStore};
use crate::downloader::caller::AuthenticatedCaller;
use crate::downloader::config::{RetryPolicy, EMPTY_TCX_MAX_NEWLINES};
use crate::downloader::progress::Progress;
use crate::downloader::rate_limit::RateLimiter;
use crate::downloader::{ExportError, ExportJob, ExportKind, ExportSummary, FetchUnit};
use crate::fetcher::{FitbitClient, FitbitConfig};
use crate::metrics::{ExportMetrics, UnitOutcome};
use crate::output::{render_csv, split_into_month_ranges, write_artifact, ExportPaths};
use crate::resume::{ActivityLogCache, CacheLock, CompletionStore, FsMarkerStore, UnitStatus};
use crate::shutdown::SharedShutdown;
use crate::DateRange;

/// Whether a TCX payload carries no track points
pub fn is_empty_tcx(tcx: &[u8]) -> bool {
    tcx.iter().filter(|b| **b == b'\n').count() <= EMPTY_TCX_MAX_NEWLINES
}

/// Runs export jobs against the Fitbit API
#[derive(Debug, Clone)]
pub struct ExportExecutor {
    client: FitbitClient,
    flow: OAuthFlow,
    retry_policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
}

impl ExportExecutor {
    /// Executor using `client` for data requests and its HTTP helper for
    /// authorization
    pub fn new(client: FitbitClient) -> Self {
        let flow = OAuthFlow::new(client.http().clone(), Arc::clone(client.config()));
        Self {
            client,
            flow,
            retry_policy: RetryPolicy::default(),
            shutdown: None,
        }
    }

    /// Build the HTTP client for `config`, throttled by `rate_limiter`
    pub fn from_config(config: Arc<FitbitConfig>, rate_limiter: Arc<RateLimiter>) -> Result<Self, ExportError> {
        Ok(Self::new(FitbitClient::from_config(config, rate_limiter)?))
    }

    /// Stop between units (and abort in-flight retries) on shutdown
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Pause between attempts of a failing unit
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replace how the authorization URL reaches the user
    pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.flow = self.flow.with_prompt(prompt);
        self
    }

    /// Run `job`, holding the cache directory lock for its duration
    ///
    /// # Errors
    ///
    /// [`ExportError::Resume`] if another export holds the lock, plus any
    /// error of [`execute_with_store`](Self::execute_with_store).
    pub async fn execute(&self, job: &ExportJob) -> Result<ExportSummary, ExportError> {
        let paths = job.paths();
        paths.ensure_directories()?;
        let _lock = CacheLock::try_acquire(&paths.lock_file())?;

        let store = FsMarkerStore::new(paths.cache_dir());
        self.execute_with_store(job, &store).await
    }

    /// Run `job` recording completion in `store`
    pub async fn execute_with_store(
        &self,
        job: &ExportJob,
        store: &dyn CompletionStore,
    ) -> Result<ExportSummary, ExportError> {
        let paths = job.paths();
        paths.ensure_directories()?;

        let summary = match job.kind {
            ExportKind::ActivityTcx => self.export_activity_tcx(&job.range, &paths, store).await?,
            ExportKind::Weight => self.export_weight(&job.range, &paths, store).await?,
            ExportKind::ActivityMetrics => self.export_activity_metrics(&job.range, &paths, store).await?,
            ExportKind::All => self.export_all(&job.range, &paths, store).await?,
        };

        info!("{summary}");
        Ok(summary)
    }

    /// Export one TCX file per activity that started within `range`
    ///
    /// The activity list is fetched once per range and cached; auto-detected
    /// activities and TCX payloads without samples are marked done without
    /// writing a file.
    pub async fn export_activity_tcx(
        &self,
        range: &DateRange,
        paths: &ExportPaths,
        store: &dyn CompletionStore,
    ) -> Result<ExportSummary, ExportError> {
        let span = info_span!("export", kind = ExportKind::ActivityTcx.as_str(), range = %range);
        async {
            let metrics = ExportMetrics::start(ExportKind::ActivityTcx.as_str());
            let caller = self.caller(paths);
            let client = &self.client;

            let list_unit = FetchUnit::ActivityList(*range);
            let cache = ActivityLogCache::for_range(paths.cache_dir(), range);
            if store.status(&list_unit)? == UnitStatus::Completed && cache.exists()? {
                info!("Activity log list already fetched.");
            } else {
                self.check_shutdown()?;
                info!("Fetching activity log list.");
                let activities = caller
                    .call(&list_unit.label(), |token| async move {
                        client.activity_log_list(&token, range).await
                    })
                    .await?;
                cache.write(&activities)?;
                store.mark_completed(&list_unit)?;
                info!(count = activities.len(), "Activity log list fetched.");
            }

            let activities = cache.read()?;
            let total = activities.len();
            let mut summary = ExportSummary::new(ExportKind::ActivityTcx, total);

            for (index, activity) in activities.iter().enumerate() {
                let progress = Progress::new(index, total);
                let log_id = activity.log_id;
                let unit = FetchUnit::ActivityTcx { log_id };

                let outcome = if store.status(&unit)? == UnitStatus::Completed {
                    info!("{progress} Activity {log_id} already processed.");
                    UnitOutcome::Skipped
                } else if activity.is_auto_detected() {
                    info!("{progress} Activity {log_id} was auto-detected and has no TCX data, skipping.");
                    store.mark_completed(&unit)?;
                    UnitOutcome::Empty
                } else {
                    self.check_shutdown()?;
                    info!("{progress} Fetching activity {log_id}.");
                    let tcx = caller
                        .call(&progress.label(&unit.label()), |token| async move {
                            client.activity_tcx(&token, log_id).await
                        })
                        .await?;

                    if is_empty_tcx(&tcx) {
                        info!("{progress} Activity {log_id} has an empty TCX, skipping.");
                        store.mark_completed(&unit)?;
                        UnitOutcome::Empty
                    } else {
                        self.write_unit(paths, store, &unit, &tcx)?;
                        info!("{progress} Activity {log_id} saved.");
                        UnitOutcome::Fetched
                    }
                };

                summary.record(outcome);
                metrics.record_unit(outcome);
            }

            metrics.record_success(summary.units_processed());
            Ok::<_, ExportError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Export weight entries of `range` as one CSV per calendar month
    ///
    /// Months without entries are marked done without writing a file.
    pub async fn export_weight(
        &self,
        range: &DateRange,
        paths: &ExportPaths,
        store: &dyn CompletionStore,
    ) -> Result<ExportSummary, ExportError> {
        let span = info_span!("export", kind = ExportKind::Weight.as_str(), range = %range);
        async {
            let metrics = ExportMetrics::start(ExportKind::Weight.as_str());
            let caller = self.caller(paths);
            let client = &self.client;

            let chunks = split_into_month_ranges(range);
            let total = chunks.len();
            let mut summary = ExportSummary::new(ExportKind::Weight, total);

            for (index, chunk) in chunks.iter().enumerate() {
                let progress = Progress::new(index, total);
                let unit = FetchUnit::Weight(*chunk);

                let outcome = if store.status(&unit)? == UnitStatus::Completed {
                    info!("{progress} Weight {chunk} already processed.");
                    UnitOutcome::Skipped
                } else {
                    self.check_shutdown()?;
                    info!("{progress} Fetching weight {chunk}.");
                    let entries = caller
                        .call(&progress.label(&unit.label()), |token| async move {
                            client.weight_series(&token, chunk).await
                        })
                        .await?;

                    if entries.is_empty() {
                        info!("{progress} No weight entries for {chunk}.");
                        store.mark_completed(&unit)?;
                        UnitOutcome::Empty
                    } else {
                        self.write_unit(paths, store, &unit, &render_csv(&entries)?)?;
                        info!("{progress} Weight {chunk} saved ({} entries).", entries.len());
                        UnitOutcome::Fetched
                    }
                };

                summary.record(outcome);
                metrics.record_unit(outcome);
            }

            metrics.record_success(summary.units_processed());
            Ok::<_, ExportError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Export daily activity metrics of `range` as one CSV per calendar month
    ///
    /// Only days with a positive step count are written; months without such
    /// days are marked done without writing a file.
    pub async fn export_activity_metrics(
        &self,
        range: &DateRange,
        paths: &ExportPaths,
        store: &dyn CompletionStore,
    ) -> Result<ExportSummary, ExportError> {
        let span = info_span!("export", kind = ExportKind::ActivityMetrics.as_str(), range = %range);
        async {
            let metrics = ExportMetrics::start(ExportKind::ActivityMetrics.as_str());
            let caller = self.caller(paths);
            let client = &self.client;

            let chunks = split_into_month_ranges(range);
            let total = chunks.len();
            let mut summary = ExportSummary::new(ExportKind::ActivityMetrics, total);

            for (index, chunk) in chunks.iter().enumerate() {
                let progress = Progress::new(index, total);
                let unit = FetchUnit::ActivityMetrics(*chunk);

                let outcome = if store.status(&unit)? == UnitStatus::Completed {
                    info!("{progress} Activity {chunk} already processed.");
                    UnitOutcome::Skipped
                } else {
                    self.check_shutdown()?;
                    info!("{progress} Fetching activity {chunk}.");
                    let days = caller
                        .call(&progress.label(&unit.label()), |token| async move {
                            client.activity_metrics(&token, chunk).await
                        })
                        .await?;

                    let active: Vec<_> = days.into_iter().filter(|day| day.has_steps()).collect();
                    if active.is_empty() {
                        info!("{progress} No active days in {chunk}.");
                        store.mark_completed(&unit)?;
                        UnitOutcome::Empty
                    } else {
                        self.write_unit(paths, store, &unit, &render_csv(&active)?)?;
                        info!("{progress} Activity {chunk} saved ({} days).", active.len());
                        UnitOutcome::Fetched
                    }
                };

                summary.record(outcome);
                metrics.record_unit(outcome);
            }

            metrics.record_success(summary.units_processed());
            Ok::<_, ExportError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Weight, then daily activity, then activity TCX
    pub async fn export_all(
        &self,
        range: &DateRange,
        paths: &ExportPaths,
        store: &dyn CompletionStore,
    ) -> Result<ExportSummary, ExportError> {
        let weight = self.export_weight(range, paths, store).await?;
        info!("{weight}");
        let activity = self.export_activity_metrics(range, paths, store).await?;
        info!("{activity}");
        let tcx = self.export_activity_tcx(range, paths, store).await?;
        info!("{tcx}");

        Ok(weight
            .combine(activity, ExportKind::All)
            .combine(tcx, ExportKind::All))
    }

    fn caller(&self, paths: &ExportPaths) -> AuthenticatedCaller {
        let caller = AuthenticatedCaller::new(self.flow.clone(), TokenStore::in_cache_dir(paths.cache_dir()))
            .with_retry_policy(self.retry_policy);
        match &self.shutdown {
            Some(shutdown) => caller.with_shutdown(Arc::clone(shutdown)),
            None => caller,
        }
    }

    fn check_shutdown(&self) -> Result<(), ExportError> {
        match &self.shutdown {
            Some(shutdown) if shutdown.is_shutdown_requested() => {
                info!("Shutdown requested, stopping before the next unit.");
                Err(ExportError::Interrupted)
            }
            _ => Ok(()),
        }
    }

    /// Write the unit's artifact, then its marker
    fn write_unit(
        &self,
        paths: &ExportPaths,
        store: &dyn CompletionStore,
        unit: &FetchUnit,
        bytes: &[u8],
    ) -> Result<(), ExportError> {
        if let Some(name) = unit.artifact_name() {
            write_artifact(&paths.output_file(&name), bytes)?;
        }
        store.mark_completed(unit)?;
        Ok(())
    }
}
