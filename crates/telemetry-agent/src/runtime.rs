//! Agent Runtime Loop
//!
//! Drives an [`AgentContext`] from one task. Ticks and vehicle events are
//! funnelled through the event bus in arrival order; bulk sends run on
//! spawned tasks and report back over a completion channel.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use uplink::{FlushOutcome, Transport, TransportError, UplinkRequest};
use vehicle_metrics::SnapshotProvider;

use crate::clock::Clock;
use crate::context::{Activation, AgentContext};
use crate::error::AgentError;
use crate::events::{AgentEvent, LocalEventBus};

/// Result of a bulk send, delivered back to the owning loop
#[derive(Debug)]
pub struct FlushCompletion(pub Result<u16, TransportError>);

/// Run the agent until `shutdown` resolves.
///
/// Activates the context, then serves sample and flush ticks, vehicle events
/// and send completions. On shutdown a bulk send still in flight gets up to the
/// request timeout to report back. The lifecycle is then stopped and one final
/// flush is attempted within the same limit; a result that does not arrive in
/// time is dropped. Returns the context for inspection.
pub async fn run<P, C, F>(
    mut ctx: AgentContext<P, C>,
    transport: Arc<dyn Transport>,
    mut vehicle_events: mpsc::UnboundedReceiver<AgentEvent>,
    shutdown: F,
) -> Result<AgentContext<P, C>, AgentError>
where
    P: SnapshotProvider,
    C: Clock,
    F: Future<Output = ()>,
{
    let (mut bus, mut events) = LocalEventBus::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<FlushCompletion>();

    ctx.set_active(true, &mut bus)?;

    let mut sample_ticks = interval(ctx.config().sample_interval());
    sample_ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut flush_ticks = interval(ctx.config().flush_interval());
    flush_ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);
    info!(
        "Agent loop started: sample every {:?}, flush every {:?}",
        ctx.config().sample_interval(),
        ctx.config().flush_interval()
    );

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            Some(FlushCompletion(result)) = done_rx.recv() => {
                if let FlushOutcome::Acked { removed, .. } = ctx.complete_flush(result) {
                    debug!("Flush completion removed {} snapshots", removed);
                }
            }
            Some(event) = events.recv() => {
                if let Some(request) = ctx.dispatch(event) {
                    spawn_send(&transport, request, &done_tx);
                }
            }
            Some(event) = vehicle_events.recv() => {
                if !bus.publish(event.clone()) {
                    debug!("Vehicle event {:?} dropped, not subscribed", event);
                }
            }
            _ = sample_ticks.tick() => {
                bus.publish(AgentEvent::SampleTick);
            }
            _ = flush_ticks.tick() => {
                bus.publish(AgentEvent::FlushTick);
            }
        }
    }

    if ctx.is_sending() {
        let limit = ctx.config().uplink.timeout();
        debug!("Waiting up to {:?} for the in-flight flush", limit);
        match timeout(limit, done_rx.recv()).await {
            Ok(Some(FlushCompletion(result))) => {
                ctx.complete_flush(result);
            }
            Ok(None) => warn!("In-flight flush vanished before completing"),
            Err(_) => warn!("In-flight flush did not finish within {:?}; result discarded", limit),
        }
    }

    if let Activation::Stopped {
        final_flush: Some(request),
    } = ctx.set_active(false, &mut bus)?
    {
        let limit = request.timeout;
        match timeout(limit, transport.send(request)).await {
            Ok(result) => {
                ctx.complete_flush(result);
            }
            Err(_) => warn!("Final flush did not finish within {:?}; result discarded", limit),
        }
    }

    info!("Agent loop stopped");
    Ok(ctx)
}

fn spawn_send(
    transport: &Arc<dyn Transport>,
    request: UplinkRequest,
    done: &mpsc::UnboundedSender<FlushCompletion>,
) {
    let send = transport.send(request);
    let done = done.clone();
    tokio::spawn(async move {
        let result = send.await;
        if done.send(FlushCompletion(result)).is_err() {
            debug!("Agent loop gone; flush result dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MIN_VALID_UTC};
    use crate::notify::MemoryNotifier;
    use crate::settings::AgentConfig;
    use std::sync::Mutex;
    use std::time::Duration;
    use uplink::{Method, TransportFuture};
    use vehicle_metrics::{ids, MemoryProvider, VehicleType};

    /// Records requests and answers every send with a fixed result
    struct RecordingTransport {
        requests: Mutex<Vec<UplinkRequest>>,
        result: Result<u16, TransportError>,
        delay: Duration,
    }

    impl RecordingTransport {
        fn new(result: Result<u16, TransportError>) -> Arc<Self> {
            Self::slow(result, Duration::ZERO)
        }

        fn slow(result: Result<u16, TransportError>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                result,
                delay,
            })
        }

        fn requests(&self) -> Vec<UplinkRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: UplinkRequest) -> TransportFuture {
            self.requests.lock().unwrap().push(request);
            let result = self.result.clone();
            let delay = self.delay;
            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            })
        }
    }

    fn context(token: Option<&str>) -> AgentContext<MemoryProvider, ManualClock> {
        let mut provider = MemoryProvider::new();
        provider.set(ids::SOC, 64.0);
        provider.set(ids::POWER, 3.0);
        provider.set(ids::SPEED, 20.0);
        provider.set(ids::CHARGING, false);
        provider.set(ids::PARK_TIME, 0.0);

        let config = AgentConfig {
            api_key: "key".to_string(),
            user_token: token.map(str::to_string),
            ..AgentConfig::default()
        };
        AgentContext::new(
            config,
            provider,
            ManualClock::new(MIN_VALID_UTC + 500),
            Box::new(MemoryNotifier::new()),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_samples_and_flushes() {
        let transport = RecordingTransport::new(Ok(200));
        let (_vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();

        let ctx = run(
            context(Some("user")),
            transport.clone(),
            vehicle_rx,
            tokio::time::sleep(Duration::from_secs(25)),
        )
        .await
        .unwrap();

        let requests = transport.requests();
        assert!(!requests.is_empty());
        assert_eq!(requests[0].method, Method::Post);
        assert!(ctx.queue().is_empty());
        assert!(ctx.flush_stats().acked >= 1);
        assert!(!ctx.state().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sends_keep_queue() {
        let transport = RecordingTransport::new(Err(TransportError::Network("offline".into())));
        let (_vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();

        let ctx = run(
            context(Some("user")),
            transport.clone(),
            vehicle_rx,
            tokio::time::sleep(Duration::from_secs(25)),
        )
        .await
        .unwrap();

        assert_eq!(ctx.queue().len(), 1);
        assert!(ctx.flush_stats().failed >= 2);
        assert_eq!(ctx.flush_stats().acked, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vehicle_events_reach_context() {
        let transport = RecordingTransport::new(Ok(200));
        let (vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();
        vehicle_tx
            .send(AgentEvent::VehicleTypeChanged("RT".to_string()))
            .unwrap();

        let ctx = run(
            context(Some("user")),
            transport,
            vehicle_rx,
            tokio::time::sleep(Duration::from_secs(3)),
        )
        .await
        .unwrap();

        assert_eq!(ctx.catalog().vehicle_type(), VehicleType::RenaultTwizy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_flush() {
        // First flush starts at t=0 and answers at t=8, after shutdown at t=5
        let transport = RecordingTransport::slow(Ok(200), Duration::from_secs(8));
        let (_vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();

        let ctx = run(
            context(Some("user")),
            transport.clone(),
            vehicle_rx,
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(ctx.flush_stats().acked, 1);
        assert!(ctx.queue().is_empty());
        assert!(!ctx.is_sending());
    }

    #[tokio::test]
    async fn test_missing_token_refuses_to_run() {
        let transport = RecordingTransport::new(Ok(200));
        let (_vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();

        let result = run(context(None), transport.clone(), vehicle_rx, std::future::pending()).await;

        assert!(matches!(result, Err(ref e) if e.is_config()));
        assert!(transport.requests().is_empty());
    }
}
