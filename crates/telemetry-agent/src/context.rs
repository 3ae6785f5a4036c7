//! Agent Context
//!
//! Owns every piece of mutable agent state: the metric catalog, the smoothing
//! window, the transmission queue, the last queued snapshot and the active
//! flag. One task drives it; nothing else mutates it.

use bulk_queue::{BulkQueue, QueueStats};
use sampling::{MetricSmoother, Rule, SamplingRateController};
use serde::Serialize;
use tracing::{debug, info, warn};
use uplink::{
    Credentials, FlushOutcome, FlushStats, TransmissionCoordinator, TransportError, UplinkError,
    UplinkRequest,
};
use vehicle_metrics::{
    ids, Field, MetricCatalog, SnapshotAssembler, SnapshotProvider, TelemetrySnapshot, VehicleType,
};

use crate::clock::Clock;
use crate::error::AgentError;
use crate::events::{AgentEvent, EventBus, SubscriptionHandle, Topic};
use crate::notify::Notifier;
use crate::settings::AgentConfig;

const MISSING_TOKEN_MESSAGE: &str =
    "Telemetry upload is not configured: set a user token to start sending";

/// Topics the sampling lifecycle listens to while active
const LIFECYCLE_TOPICS: [Topic; 5] = [
    Topic::SampleTick,
    Topic::FlushTick,
    Topic::VehicleOn,
    Topic::VehicleOff,
    Topic::VehicleTypeChanged,
];

/// Sampling state carried between ticks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingState {
    /// Last snapshot put on the queue; `utc = 0` baseline after a reset
    pub last_queued: TelemetrySnapshot,
    pub is_active: bool,
    /// Whether the clock was valid on the last tick
    pub time_valid: bool,
}

impl SamplingState {
    fn baseline() -> Self {
        Self {
            last_queued: TelemetrySnapshot::baseline(),
            is_active: false,
            time_valid: false,
        }
    }
}

/// What a sample tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sampling lifecycle is stopped
    Inactive,
    /// Clock not valid yet; nothing sampled
    TimeInvalid,
    /// Snapshot taken but the staleness budget has not run out
    Waiting { rule: Rule },
    /// Snapshot queued; `evicted` when the queue dropped its oldest entry
    Queued { rule: Rule, evicted: bool },
}

/// Result of an activation request
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Started,
    /// Stopped; `final_flush` is the best-effort last bulk request, if any
    Stopped { final_flush: Option<UplinkRequest> },
    AlreadyActive,
    AlreadyInactive,
}

/// Point-in-time agent status
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub vehicle_type: VehicleType,
    pub active: bool,
    pub time_valid: bool,
    pub last_queued_utc: Option<i64>,
    pub smoothing_window: usize,
    pub queue: QueueStats,
    pub flush: FlushStats,
}

/// Single-owner agent state
pub struct AgentContext<P, C> {
    config: AgentConfig,
    provider: P,
    clock: C,
    notifier: Box<dyn Notifier>,
    catalog: MetricCatalog,
    controller: SamplingRateController,
    smoother: MetricSmoother,
    queue: BulkQueue<TelemetrySnapshot>,
    coordinator: TransmissionCoordinator,
    credentials: Credentials,
    state: SamplingState,
    subscriptions: Vec<SubscriptionHandle>,
    token_notified: bool,
}

impl<P: SnapshotProvider, C: Clock> AgentContext<P, C> {
    /// Build a context from validated configuration.
    ///
    /// The vehicle type comes from configuration, or from the vehicle itself
    /// when not configured.
    pub fn new(
        config: AgentConfig,
        provider: P,
        clock: C,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let tag = config
            .vehicle_type
            .clone()
            .or_else(|| {
                provider
                    .get_single(ids::VEHICLE_TYPE)
                    .and_then(|v| v.as_str().map(str::to_string))
            })
            .unwrap_or_default();
        let catalog = MetricCatalog::for_vehicle(&tag);
        info!(
            "Agent context for vehicle {:?} (tag {:?}), queue capacity {}",
            catalog.vehicle_type(),
            tag,
            config.queue_capacity
        );

        let queue = BulkQueue::new(config.queue_capacity).map_err(crate::error::ConfigError::from)?;

        Ok(Self {
            controller: SamplingRateController::new(config.sampling.clone()),
            coordinator: TransmissionCoordinator::new(config.uplink.clone()),
            credentials: config.credentials(),
            smoother: MetricSmoother::new(),
            state: SamplingState::baseline(),
            subscriptions: Vec::new(),
            token_notified: false,
            config,
            provider,
            clock,
            notifier,
            catalog,
            queue,
        })
    }

    /// Swap the catalog for a new vehicle type tag
    pub fn apply_vehicle_type(&mut self, tag: &str) {
        let catalog = MetricCatalog::for_vehicle(tag);
        if catalog.vehicle_type() != self.catalog.vehicle_type() {
            info!(
                "Vehicle type changed: {:?} -> {:?}",
                self.catalog.vehicle_type(),
                catalog.vehicle_type()
            );
        }
        self.catalog = catalog;
    }

    /// Handle one sampling tick
    pub fn sample_tick(&mut self) -> TickOutcome {
        if !self.state.is_active {
            return TickOutcome::Inactive;
        }
        let Some(utc) = self.observe_clock() else {
            return TickOutcome::TimeInvalid;
        };

        let snapshot = self.assemble(utc);
        self.smoother
            .push(snapshot.number(Field::Power), snapshot.number(Field::Speed));

        let decision = self.controller.decide(&snapshot, &self.state.last_queued);
        let Some(rule) = decision.rule() else {
            return TickOutcome::TimeInvalid;
        };
        if !decision.should_queue(&snapshot, &self.state.last_queued) {
            debug!("Tick at {}: within {:?} budget", utc, rule);
            return TickOutcome::Waiting { rule };
        }

        let evicted = self.enqueue_smoothed(snapshot);
        debug!("Tick at {}: queued by {:?} ({} queued)", utc, rule, self.queue.len());
        TickOutcome::Queued { rule, evicted }
    }

    /// Queue a snapshot now, bypassing the sampling decision.
    ///
    /// Returns false when the clock is not valid.
    pub fn force_sample(&mut self) -> bool {
        let Some(utc) = self.observe_clock() else {
            return false;
        };
        let snapshot = self.assemble(utc);
        self.smoother
            .push(snapshot.number(Field::Power), snapshot.number(Field::Speed));
        self.enqueue_smoothed(snapshot);
        info!("Forced sample at {} ({} queued)", utc, self.queue.len());
        true
    }

    /// Handle one flush tick; returns the bulk request to send, if any
    pub fn flush_tick(&mut self) -> Option<UplinkRequest> {
        if !self.state.is_active {
            return None;
        }
        self.observe_clock()?;
        self.begin_flush()
    }

    /// Apply the transport result of the outstanding bulk flush
    pub fn complete_flush(&mut self, result: Result<u16, TransportError>) -> FlushOutcome {
        let outcome = self.coordinator.complete(result, &mut self.queue);
        metrics::gauge!("telemetry_queue_len").set(self.queue.len() as f64);
        outcome
    }

    /// Route an event to its handler; returns a bulk request to send, if any
    pub fn dispatch(&mut self, event: AgentEvent) -> Option<UplinkRequest> {
        match event {
            AgentEvent::SampleTick => {
                self.sample_tick();
                None
            }
            AgentEvent::FlushTick => self.flush_tick(),
            AgentEvent::VehicleOn => {
                info!("Vehicle on: resetting sampling baseline");
                self.state.last_queued = TelemetrySnapshot::baseline();
                self.smoother.clear();
                None
            }
            AgentEvent::VehicleOff => {
                if !self.state.is_active {
                    return None;
                }
                info!("Vehicle off: sampling final state");
                self.force_sample();
                self.flush_tick()
            }
            AgentEvent::VehicleTypeChanged(tag) => {
                self.apply_vehicle_type(&tag);
                None
            }
        }
    }

    /// Listing of every supported field with its current value
    pub fn describe_current(&self) -> String {
        let mut out = format!("Vehicle type: {:?}\n", self.catalog.vehicle_type());
        out.push_str(&self.catalog.describe(&self.provider));
        out
    }

    /// Build a one-shot request for the current state.
    ///
    /// The queue and any in-flight bulk flush are left alone.
    pub fn send_once(&mut self) -> Result<UplinkRequest, AgentError> {
        let utc = self.observe_clock().ok_or(AgentError::TimeNotValid)?;
        let snapshot = self.assemble(utc);
        match self.coordinator.single(&snapshot, &self.credentials) {
            Ok(request) => Ok(request),
            Err(UplinkError::MissingToken) => {
                self.notify_missing_token();
                Err(UplinkError::MissingToken.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start or stop the sampling and flush lifecycle.
    ///
    /// Redundant calls report `AlreadyActive`/`AlreadyInactive`. Starting
    /// without a user token is refused.
    pub fn set_active(&mut self, active: bool, bus: &mut dyn EventBus) -> Result<Activation, AgentError> {
        match (active, self.state.is_active) {
            (true, true) => {
                debug!("Activation requested while already active");
                Ok(Activation::AlreadyActive)
            }
            (false, false) => {
                debug!("Deactivation requested while already inactive");
                Ok(Activation::AlreadyInactive)
            }
            (true, false) => {
                if let Err(e) = self.credentials.token() {
                    self.notify_missing_token();
                    return Err(e.into());
                }
                self.subscriptions = LIFECYCLE_TOPICS.iter().map(|t| bus.subscribe(*t)).collect();
                self.state = SamplingState {
                    is_active: true,
                    ..SamplingState::baseline()
                };
                info!("Telemetry started ({} subscriptions)", self.subscriptions.len());
                Ok(Activation::Started)
            }
            (false, true) => {
                self.stop(bus);
                let final_flush = if self.observe_clock().is_some() {
                    self.begin_flush()
                } else {
                    None
                };
                info!("Telemetry stopped, final flush: {}", final_flush.is_some());
                Ok(Activation::Stopped { final_flush })
            }
        }
    }

    /// Stop if active and forget the token, queued snapshots and sampling state
    pub fn reset(&mut self, bus: &mut dyn EventBus) {
        if self.state.is_active {
            self.stop(bus);
        }
        self.credentials.user_token = None;
        self.queue.clear();
        self.smoother.clear();
        self.state = SamplingState::baseline();
        info!("Agent reset");
    }

    /// Replace the user token; re-arms the missing-token notification
    pub fn set_user_token(&mut self, token: Option<String>) {
        self.credentials.user_token = token;
        self.token_notified = false;
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &SamplingState {
        &self.state
    }

    pub fn queue(&self) -> &BulkQueue<TelemetrySnapshot> {
        &self.queue
    }

    pub fn smoother(&self) -> &MetricSmoother {
        &self.smoother
    }

    pub fn is_sending(&self) -> bool {
        self.coordinator.is_sending()
    }

    pub fn flush_stats(&self) -> FlushStats {
        self.coordinator.stats()
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            vehicle_type: self.catalog.vehicle_type(),
            active: self.state.is_active,
            time_valid: self.state.time_valid,
            last_queued_utc: self.state.last_queued.utc(),
            smoothing_window: self.smoother.len(),
            queue: self.queue.stats(),
            flush: self.coordinator.stats(),
        }
    }

    fn observe_clock(&mut self) -> Option<i64> {
        let utc = self.clock.valid_utc();
        if utc.is_none() && self.state.time_valid {
            warn!("Clock fell below the valid range; holding samples");
        }
        self.state.time_valid = utc.is_some();
        utc
    }

    fn assemble(&self, utc: i64) -> TelemetrySnapshot {
        SnapshotAssembler::new(&self.catalog, &self.provider).assemble(Some(utc))
    }

    fn enqueue_smoothed(&mut self, snapshot: TelemetrySnapshot) -> bool {
        let snapshot = match self.smoother.take() {
            Some(sample) => snapshot.with_smoothed(sample.power, sample.speed),
            None => snapshot,
        };
        let evicted = self.queue.enqueue(snapshot.clone()).is_some();
        self.state.last_queued = snapshot;
        metrics::gauge!("telemetry_queue_len").set(self.queue.len() as f64);
        evicted
    }

    fn begin_flush(&mut self) -> Option<UplinkRequest> {
        match self.coordinator.begin_flush(&self.queue, &self.credentials) {
            Ok(request) => request,
            Err(UplinkError::MissingToken) => {
                self.notify_missing_token();
                None
            }
            Err(e) => {
                warn!("Could not build bulk request: {}", e);
                None
            }
        }
    }

    fn stop(&mut self, bus: &mut dyn EventBus) {
        for handle in self.subscriptions.drain(..) {
            if !bus.unsubscribe(handle) {
                warn!("Subscription {:?} was already gone", handle);
            }
        }
        self.state.is_active = false;
        self.state.last_queued = TelemetrySnapshot::baseline();
        self.smoother.clear();
    }

    fn notify_missing_token(&mut self) {
        if self.token_notified {
            return;
        }
        warn!("No user token configured; not sending telemetry");
        self.notifier.notify(MISSING_TOKEN_MESSAGE);
        self.token_notified = true;
    }
}
