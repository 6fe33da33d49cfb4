use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use ingesta_core::{
    BarInterval, BatchResult, Clock, DataStore, DataType, DataTypeRefreshResult, DeadLetterEntry,
    FetchParams, IndicatorComputer, IndicatorPoint, IndicatorSet, IngestError, PriceBar,
    ProviderRecord, RefreshConfig, RefreshMode, RefreshRequest, RefreshStatus, RetryConfig,
    RetryPolicy, Stage, SymbolRefreshResult, SystemClock, validate_payload,
};

use crate::dead_letter::DeadLetterQueue;
use crate::gates::{DataIngestionGate, GateRun, IndicatorComputationGate, SignalGenerationGate};
use crate::registry::ProviderRegistry;
use crate::saver::{IdempotentDataSaver, UpsertReport};
use crate::strategy::{StalenessQuery, StrategySet};

/// Cooperative batch cancellation.
///
/// Cancelling stops new (symbol, data type) units from starting; units already
/// running finish. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct BatchContext {
    cancel: CancelToken,
    deadline: Option<tokio::time::Instant>,
    dead_lettered: AtomicUsize,
}

impl BatchContext {
    fn stop_reason(&self) -> Option<&'static str> {
        if self.cancel.is_cancelled() {
            return Some("batch cancelled");
        }
        if self
            .deadline
            .is_some_and(|d| tokio::time::Instant::now() >= d)
        {
            return Some("batch timeout elapsed");
        }
        None
    }

    /// Error to return instead of attempt `attempt` once the batch has stopped.
    /// The first attempt of a unit that already started always runs.
    fn interrupted(&self, attempt: u32) -> Option<IngestError> {
        if attempt == 1 {
            return None;
        }
        self.stop_reason()
            .map(|reason| IngestError::Cancelled(reason.to_string()))
    }

    /// Retry predicate that also stops backing off once the batch has stopped.
    fn may_retry(&self, err: &IngestError) -> bool {
        err.is_retryable() && self.stop_reason().is_none()
    }
}

struct Ingested {
    provider: String,
    saved: UpsertReport,
    rejected: usize,
    fallbacks: usize,
}

/// Orchestrates refreshes: staleness, fetch with fallback, validation,
/// idempotent persistence, gates and dead-lettering.
///
/// Every failure is caught at the (symbol, data type) boundary and reported in
/// the returned results; the batch entry points never fail.
pub struct DataRefreshManager {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn DataStore>,
    saver: IdempotentDataSaver,
    indicators: Option<Arc<dyn IndicatorComputer>>,
    strategies: StrategySet,
    retry: RetryPolicy,
    ingestion_gate: DataIngestionGate,
    indicator_gate: IndicatorComputationGate,
    signal_gate: SignalGenerationGate,
    dead_letters: Arc<DeadLetterQueue>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
}

/// Builder for a [`DataRefreshManager`].
pub struct DataRefreshManagerBuilder {
    registry: Option<Arc<ProviderRegistry>>,
    store: Option<Arc<dyn DataStore>>,
    indicators: Option<Arc<dyn IndicatorComputer>>,
    strategies: Option<StrategySet>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
}

impl Default for DataRefreshManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataRefreshManagerBuilder {
    /// Create a builder with default configuration and the system clock.
    ///
    /// Behavior and trade-offs:
    /// - A registry and a store are required; see [`registry`](Self::registry)
    ///   and [`store`](Self::store).
    /// - Without an indicator computer, `TechnicalIndicators` units fail as
    ///   unsupported.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: None,
            store: None,
            indicators: None,
            strategies: None,
            dead_letters: None,
            clock: Arc::new(SystemClock),
            config: RefreshConfig::default(),
        }
    }

    /// Provider registry consulted for every fetch.
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Share a registry (and its limiters and health state) with other managers.
    #[must_use]
    pub fn shared_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Row store and refresh log.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Indicator computer used for `TechnicalIndicators`.
    #[must_use]
    pub fn indicators(mut self, computer: Arc<dyn IndicatorComputer>) -> Self {
        self.indicators = Some(computer);
        self
    }

    /// Wall clock used for staleness decisions and timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the whole configuration.
    ///
    /// Behavior and trade-offs:
    /// - Strategies are derived from the configuration at build time unless
    ///   set explicitly with [`strategies`](Self::strategies).
    /// - Provider settings listed here are only used by registries built with
    ///   `ProviderRegistryBuilder::with_configured_provider`.
    #[must_use]
    pub fn config(mut self, config: RefreshConfig) -> Self {
        self.config = config;
        self
    }

    /// Use explicit refresh strategies instead of deriving them from the configuration.
    #[must_use]
    pub fn strategies(mut self, strategies: StrategySet) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Dead-letter queue to record terminal failures in; a fresh one otherwise.
    #[must_use]
    pub fn dead_letter_queue(mut self, queue: Arc<DeadLetterQueue>) -> Self {
        self.dead_letters = Some(queue);
        self
    }

    /// Symbols processed concurrently.
    ///
    /// Behavior and trade-offs:
    /// - Higher values shorten batches but compete for the same provider
    ///   budgets; callers over budget wait in the limiter.
    /// - Zero is treated as one.
    #[must_use]
    pub const fn max_concurrent_symbols(mut self, n: usize) -> Self {
        self.config.max_concurrent_symbols = n;
        self
    }

    /// Stop starting new units once `timeout` has elapsed since the batch began.
    #[must_use]
    pub const fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.config.batch_timeout = Some(timeout);
        self
    }

    /// Retry settings applied to each (symbol, data type) unit.
    #[must_use]
    pub const fn retry(mut self, cfg: RetryConfig) -> Self {
        self.config.data_fetch_retry_attempts = cfg.max_attempts;
        self.config.data_fetch_retry_delay = cfg.base_delay;
        self.config.retry_max_delay = cfg.max_delay;
        self.config.retry_jitter_fraction = cfg.jitter_fraction;
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    /// `InvalidArg` when the registry or store is missing, or the market
    /// calendar settings are invalid.
    pub fn build(self) -> Result<DataRefreshManager, IngestError> {
        let registry = self.registry.ok_or_else(|| {
            IngestError::InvalidArg("no provider registry; set one via registry(...)".to_string())
        })?;
        let store = self.store.ok_or_else(|| {
            IngestError::InvalidArg("no data store; set one via store(...)".to_string())
        })?;
        let strategies = match self.strategies {
            Some(s) => s,
            None => StrategySet::from_config(&self.config)?,
        };
        Ok(DataRefreshManager {
            saver: IdempotentDataSaver::new(Arc::clone(&store)),
            registry,
            store,
            indicators: self.indicators,
            strategies,
            retry: RetryPolicy::new(self.config.retry()),
            ingestion_gate: DataIngestionGate::new(self.config.gates.clone()),
            indicator_gate: IndicatorComputationGate::new(
                self.config.gates.required_indicators.clone(),
            ),
            signal_gate: SignalGenerationGate::new(self.config.gates.signal_min_lookback),
            dead_letters: self.dead_letters.unwrap_or_default(),
            clock: self.clock,
            config: self.config,
        })
    }
}

impl DataRefreshManager {
    /// Start building a manager.
    #[must_use]
    pub fn builder() -> DataRefreshManagerBuilder {
        DataRefreshManagerBuilder::new()
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// The dead-letter queue terminal failures are recorded in.
    #[must_use]
    pub const fn dead_letters(&self) -> &Arc<DeadLetterQueue> {
        &self.dead_letters
    }

    /// Snapshot of every provider in routing order.
    #[must_use]
    pub fn provider_records(&self) -> Vec<ProviderRecord> {
        self.registry.records()
    }

    /// Refresh `data_types` for every symbol.
    ///
    /// Duplicate symbols are processed once; results keep first-seen order.
    /// Exactly one result is produced per (symbol, data type).
    pub async fn refresh_batch<I, S>(
        &self,
        symbols: I,
        data_types: &[DataType],
        mode: RefreshMode,
        force: bool,
    ) -> BatchResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refresh_batch_with_cancel(symbols, data_types, mode, force, &CancelToken::new())
            .await
    }

    /// [`refresh_batch`](Self::refresh_batch) that also stops starting new
    /// units once `cancel` fires.
    pub async fn refresh_batch_with_cancel<I, S>(
        &self,
        symbols: I,
        data_types: &[DataType],
        mode: RefreshMode,
        force: bool,
        cancel: &CancelToken,
    ) -> BatchResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let requests: Vec<RefreshRequest> = symbols
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| seen.insert(s.clone()))
            .map(|s| RefreshRequest::new(s, data_types.iter().copied(), mode, force))
            .collect();
        self.run(requests, cancel).await
    }

    /// Process independent requests, each with its own mode and force flag.
    pub async fn refresh_requests(
        &self,
        requests: Vec<RefreshRequest>,
        cancel: &CancelToken,
    ) -> BatchResult {
        self.run(requests, cancel).await
    }

    /// Process a single request.
    pub async fn refresh(&self, request: RefreshRequest) -> SymbolRefreshResult {
        let symbol = request.symbol.clone();
        self.run(vec![request], &CancelToken::new())
            .await
            .symbols
            .into_iter()
            .next()
            .unwrap_or_else(|| SymbolRefreshResult::new(symbol))
    }

    /// Requeue a dead-letter entry and run it now as a forced on-demand refresh.
    ///
    /// The entry is kept; remove it from [`dead_letters`](Self::dead_letters)
    /// once resolved.
    ///
    /// # Errors
    /// `NotFound` if no entry has this id.
    pub async fn replay_dead_letter(&self, id: u64) -> Result<SymbolRefreshResult, IngestError> {
        let request = self.dead_letters.requeue(id)?;
        Ok(self.refresh(request).await)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "ingesta::manager::refresh_batch",
            skip(self, requests, cancel),
            fields(symbols = requests.len()),
        )
    )]
    async fn run(&self, requests: Vec<RefreshRequest>, cancel: &CancelToken) -> BatchResult {
        let started_at = self.clock.now();
        let ctx = BatchContext {
            cancel: cancel.clone(),
            deadline: self
                .config
                .batch_timeout
                .map(|t| tokio::time::Instant::now() + t),
            dead_lettered: AtomicUsize::new(0),
        };
        let concurrency = self.config.max_concurrent_symbols.max(1);
        let symbols: Vec<SymbolRefreshResult> = stream::iter(requests)
            .map(|req| self.process_symbol(req, &ctx))
            .buffered(concurrency)
            .collect()
            .await;
        let unstarted: usize = symbols.iter().map(|s| s.totals.pending).sum();
        let result = BatchResult::new(
            symbols,
            ctx.dead_lettered.load(Ordering::SeqCst),
            ctx.cancel.is_cancelled() || unstarted > 0,
            started_at,
            self.clock.now(),
        );
        #[cfg(feature = "tracing")]
        tracing::info!(
            requested = result.totals.requested,
            successful = result.totals.successful,
            failed = result.totals.failed,
            skipped = result.totals.skipped,
            pending = result.totals.pending,
            dead_lettered = result.dead_lettered,
            "batch finished"
        );
        result
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "ingesta::manager::refresh_symbol",
            skip(self, req, ctx),
            fields(symbol = %req.symbol, mode = %req.mode, force = req.force),
        )
    )]
    async fn process_symbol(&self, req: RefreshRequest, ctx: &BatchContext) -> SymbolRefreshResult {
        let mut out = SymbolRefreshResult::new(req.symbol.clone());
        let mut ordered: Vec<DataType> = req.data_types.iter().copied().collect();
        ordered.sort_by_key(|dt| {
            (
                dt.stage(),
                DataType::ALL.iter().position(|d| d == dt).unwrap_or(usize::MAX),
            )
        });

        let mut prices_usable: Option<bool> = None;
        for dt in ordered {
            if let Some(reason) = ctx.stop_reason() {
                out.record(DataTypeRefreshResult::pending(dt, reason, self.clock.now()));
                continue;
            }
            let result = match dt {
                DataType::TechnicalIndicators if prices_usable == Some(false) => {
                    DataTypeRefreshResult::failed(
                        dt,
                        IngestError::gate(
                            DataIngestionGate::NAME,
                            "price-historical did not complete in this batch",
                            true,
                        ),
                        self.clock.now(),
                    )
                }
                DataType::TechnicalIndicators => self.refresh_indicators(&req, ctx).await,
                _ => self.refresh_fetched(&req, dt, ctx).await,
            };
            if dt == DataType::PriceHistorical {
                prices_usable = Some(matches!(
                    result.status,
                    RefreshStatus::Success | RefreshStatus::Skipped
                ));
            }
            out.record(result);
        }
        out
    }

    /// Last refresh of the unit, or `None` from the outer option when the
    /// stored data is fresh and the unit should be skipped.
    async fn staleness(
        &self,
        req: &RefreshRequest,
        data_type: DataType,
    ) -> Result<Option<Option<DateTime<Utc>>>, IngestError> {
        let last_updated = self.store.last_updated(&req.symbol, data_type).await?;
        if req.force {
            return Ok(Some(last_updated));
        }
        let query = StalenessQuery {
            symbol: &req.symbol,
            data_type,
            last_updated,
            now: self.clock.now(),
            force: req.force,
        };
        if self.strategies.for_mode(req.mode).should_refresh(&query) {
            Ok(Some(last_updated))
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(symbol = %req.symbol, data_type = %data_type, "fresh; skipping");
            Ok(None)
        }
    }

    async fn refresh_fetched(
        &self,
        req: &RefreshRequest,
        data_type: DataType,
        ctx: &BatchContext,
    ) -> DataTypeRefreshResult {
        let symbol = req.symbol.as_str();
        let last_updated = match self.staleness(req, data_type).await {
            Ok(Some(last)) => last,
            Ok(None) => return DataTypeRefreshResult::skipped(data_type, self.clock.now()),
            Err(e) => return DataTypeRefreshResult::failed(data_type, e, self.clock.now()),
        };
        let params = self.fetch_params(data_type, last_updated, self.clock.now());
        let gate = Mutex::new(GateRun::new());
        let (params, gate) = (&params, &gate);

        let outcome = self
            .retry
            .execute(
                |attempt| async move {
                    match ctx.interrupted(attempt) {
                        Some(err) => Err(err),
                        None => self.ingest_once(symbol, data_type, params, gate).await,
                    }
                },
                |e| ctx.may_retry(e),
            )
            .await
            .map_err(IngestError::from);

        let now = self.clock.now();
        match outcome {
            Ok(done) => {
                if let Err(e) = self.store.mark_refreshed(symbol, data_type, now).await {
                    return DataTypeRefreshResult::failed(data_type, e, now);
                }
                DataTypeRefreshResult::success(
                    data_type,
                    done.saved.rows_affected(),
                    Some(done.provider.clone()),
                    summarize(&done),
                    now,
                )
            }
            Err(e) => self.fail_unit(symbol, data_type, Stage::Ingestion, e, ctx),
        }
    }

    async fn ingest_once(
        &self,
        symbol: &str,
        data_type: DataType,
        params: &FetchParams,
        gate: &Mutex<GateRun>,
    ) -> Result<Ingested, IngestError> {
        let fetched = self
            .registry
            .fetch_with_fallback(data_type, symbol, params)
            .await?;
        let report = validate_payload(data_type, symbol, fetched.payload, self.clock.now())?;
        if report.all_rejected() {
            let first = report
                .rejected
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(IngestError::Validation(format!(
                "all {} rows from {} rejected; first: {first}",
                report.rejected.len(),
                fetched.provider
            )));
        }
        let rows = report.valid.to_rows(data_type, &fetched.provider)?;
        let submitted = rows.len();
        let saved = self.saver.upsert(data_type, rows).await;
        if submitted > 0 && saved.failed.len() == saved.submitted() {
            let first = saved
                .failed
                .first()
                .map(|(_, e)| e.to_string())
                .unwrap_or_default();
            return Err(IngestError::Storage(format!(
                "no {data_type} rows written for {symbol}; first: {first}"
            )));
        }

        let present = self
            .store
            .count_rows(data_type, symbol, self.coverage_start(data_type), None)
            .await?;
        let verdict = gate
            .lock()
            .expect("mutex poisoned")
            .evaluate(|| self.ingestion_gate.evaluate_fetch(data_type, submitted, present))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            symbol,
            data_type = %data_type,
            present,
            passed = verdict.passed,
            "ingestion gate"
        );
        verdict.into_result()?;

        Ok(Ingested {
            provider: fetched.provider,
            saved,
            rejected: report.rejected.len(),
            fallbacks: fetched.diagnostics.len(),
        })
    }

    async fn refresh_indicators(
        &self,
        req: &RefreshRequest,
        ctx: &BatchContext,
    ) -> DataTypeRefreshResult {
        let data_type = DataType::TechnicalIndicators;
        let symbol = req.symbol.as_str();
        let Some(computer) = self.indicators.as_deref() else {
            return DataTypeRefreshResult::failed(
                data_type,
                IngestError::unsupported("technical-indicators: no indicator computer configured"),
                self.clock.now(),
            );
        };
        match self.staleness(req, data_type).await {
            Ok(Some(_)) => {}
            Ok(None) => return DataTypeRefreshResult::skipped(data_type, self.clock.now()),
            Err(e) => return DataTypeRefreshResult::failed(data_type, e, self.clock.now()),
        }

        let gate = Mutex::new(GateRun::new());
        let gate = &gate;
        let outcome = self
            .retry
            .execute(
                |attempt| async move {
                    match ctx.interrupted(attempt) {
                        Some(err) => Err(err),
                        None => self.indicators_once(symbol, computer, gate).await,
                    }
                },
                |e| ctx.may_retry(e),
            )
            .await
            .map_err(IngestError::from);
        let now = self.clock.now();
        let (set, saved) = match outcome {
            Ok(v) => v,
            Err(e) => return self.fail_unit(symbol, data_type, Stage::Indicators, e, ctx),
        };
        if let Err(e) = self.store.mark_refreshed(symbol, data_type, now).await {
            return DataTypeRefreshResult::failed(data_type, e, now);
        }

        // Evaluated once: the stored indicator rows cannot change between attempts.
        let signals = self.signals_once(symbol).await;
        let mut message = format!(
            "{} points ({} complete), {} inserted, {} updated, {} unchanged",
            set.points.len(),
            set.complete_points(),
            saved.inserted,
            saved.updated,
            saved.unchanged
        );
        if let Err(e) = signals {
            message.push_str(&format!("; signal generation blocked: {e}"));
            self.dead_letter(symbol, data_type, Stage::Signals, e, ctx);
        }
        DataTypeRefreshResult::success(
            data_type,
            saved.rows_affected(),
            Some(computer.name().to_string()),
            message,
            now,
        )
    }

    async fn indicators_once(
        &self,
        symbol: &str,
        computer: &dyn IndicatorComputer,
        gate: &Mutex<GateRun>,
    ) -> Result<(IndicatorSet, UpsertReport), IngestError> {
        let stored = self
            .store
            .rows(
                DataType::PriceHistorical,
                symbol,
                self.coverage_start(DataType::PriceHistorical),
                None,
            )
            .await?;
        // One bar per timestamp; rows arrive ordered by (ts, source).
        let mut by_ts: BTreeMap<DateTime<Utc>, PriceBar> = BTreeMap::new();
        for row in &stored {
            let bar: PriceBar = row.decode()?;
            by_ts.insert(bar.ts, bar);
        }
        let bars: Vec<PriceBar> = by_ts.into_values().collect();

        let outcome = computer.compute(symbol, &bars);
        let verdict = gate
            .lock()
            .expect("mutex poisoned")
            .evaluate(|| self.indicator_gate.evaluate(&outcome))?;
        verdict.into_result()?;
        let set = outcome.map_err(|e| IngestError::InvalidArg(e.to_string()))?;

        let rows = set.to_rows(symbol, computer.name())?;
        let saved = self.saver.upsert(DataType::TechnicalIndicators, rows).await;
        if !saved.failed.is_empty() && saved.failed.len() == saved.submitted() {
            return Err(IngestError::Storage(format!(
                "no indicator rows written for {symbol}"
            )));
        }
        Ok((set, saved))
    }

    async fn signals_once(&self, symbol: &str) -> Result<(), IngestError> {
        let rows = self
            .store
            .rows(DataType::TechnicalIndicators, symbol, None, None)
            .await?;
        let mut complete = 0usize;
        for row in &rows {
            let point: IndicatorPoint = row.decode()?;
            if point.is_complete() {
                complete += 1;
            }
        }
        GateRun::new()
            .evaluate(|| self.signal_gate.evaluate(complete))?
            .into_result()
    }

    fn fail_unit(
        &self,
        symbol: &str,
        data_type: DataType,
        stage: Stage,
        err: IngestError,
        ctx: &BatchContext,
    ) -> DataTypeRefreshResult {
        #[cfg(feature = "tracing")]
        tracing::debug!(symbol, data_type = %data_type, error = %err, "unit failed");
        if err.is_terminal() {
            self.dead_letter(symbol, data_type, stage, err.clone(), ctx);
        }
        DataTypeRefreshResult::failed(data_type, err, self.clock.now())
    }

    fn dead_letter(
        &self,
        symbol: &str,
        data_type: DataType,
        stage: Stage,
        err: IngestError,
        ctx: &BatchContext,
    ) {
        self.dead_letters.enqueue(DeadLetterEntry::new(
            symbol,
            data_type,
            stage,
            err,
            self.clock.now(),
        ));
        ctx.dead_lettered.fetch_add(1, Ordering::SeqCst);
    }

    /// Oldest timestamp a unit of `data_type` is expected to cover.
    fn coverage_start(&self, data_type: DataType) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        match data_type {
            DataType::PriceHistorical | DataType::Macro | DataType::News => {
                Some(now - chrono::Duration::days(i64::from(self.config.history_lookback_days)))
            }
            DataType::PriceIntraday => Some(
                now - chrono::Duration::hours(i64::from(self.config.intraday_lookback_hours)),
            ),
            _ => None,
        }
    }

    /// Fetch window: resume one bar before the last refresh, bounded by the
    /// coverage window; snapshot types fetch without a range.
    fn fetch_params(
        &self,
        data_type: DataType,
        last_updated: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FetchParams {
        let Some(floor) = self.coverage_start(data_type) else {
            return FetchParams::default();
        };
        let (overlap, interval) = match data_type {
            DataType::PriceIntraday => (chrono::Duration::hours(1), BarInterval::M5),
            _ => (chrono::Duration::days(1), BarInterval::D1),
        };
        let start = last_updated
            .map(|t| t - overlap)
            .filter(|s| *s > floor)
            .unwrap_or(floor)
            .min(now);
        FetchParams {
            start: Some(start),
            end: None,
            interval,
            limit: None,
        }
    }
}

fn summarize(done: &Ingested) -> String {
    let mut msg = format!(
        "{} inserted, {} updated, {} unchanged via {}",
        done.saved.inserted, done.saved.updated, done.saved.unchanged, done.provider
    );
    if done.fallbacks > 0 {
        msg.push_str(&format!(" after {} provider failure(s)", done.fallbacks));
    }
    if done.rejected > 0 {
        msg.push_str(&format!("; {} rows rejected", done.rejected));
    }
    if !done.saved.failed.is_empty() {
        msg.push_str(&format!("; {} rows failed to write", done.saved.failed.len()));
    }
    msg
}
