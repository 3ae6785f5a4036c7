//! End-to-end agent scenarios driven tick by tick

use sampling::Rule;
use telemetry_agent::{
    Activation, AgentConfig, AgentContext, AgentEvent, LocalEventBus, ManualClock, MemoryNotifier,
    TickOutcome, MIN_VALID_UTC,
};
use uplink::{BulkPayload, FlushOutcome, TransportError, UplinkError};
use vehicle_metrics::{ids, Field, FieldValue, MemoryProvider};

const START: i64 = MIN_VALID_UTC + 86_400;

struct Harness {
    ctx: AgentContext<MemoryProvider, ManualClock>,
    clock: ManualClock,
    bus: LocalEventBus,
    notifier: MemoryNotifier,
}

fn harness(capacity: usize, token: Option<&str>) -> Harness {
    let mut provider = MemoryProvider::new();
    provider.set(ids::SOC, 55.0);
    provider.set(ids::POWER, 7.4);
    provider.set(ids::SPEED, 0.0);
    provider.set(ids::CHARGING, false);
    provider.set(ids::PARK_TIME, 0.0);

    let config = AgentConfig {
        api_key: "api".to_string(),
        user_token: token.map(str::to_string),
        queue_capacity: capacity,
        ..AgentConfig::default()
    };
    let clock = ManualClock::new(START);
    let notifier = MemoryNotifier::new();
    let ctx = AgentContext::new(config, provider, clock.clone(), Box::new(notifier.clone())).unwrap();
    let (bus, _events) = LocalEventBus::new();

    Harness {
        ctx,
        clock,
        bus,
        notifier,
    }
}

fn started(capacity: usize) -> Harness {
    let mut h = harness(capacity, Some("user-token"));
    assert_eq!(h.ctx.set_active(true, &mut h.bus).unwrap(), Activation::Started);
    h
}

fn queued_socs(h: &Harness) -> Vec<f64> {
    h.ctx.queue().iter().filter_map(|s| s.number(Field::Soc)).collect()
}

#[test]
fn test_charging_flip_transmits_on_that_tick() {
    let mut h = started(100);
    let mut outcomes = Vec::new();

    for tick in 1..=8 {
        if tick == 5 {
            h.ctx.provider_mut().set(ids::CHARGING, true);
        }
        outcomes.push(h.ctx.sample_tick());
        h.clock.advance(1);
    }

    assert!(matches!(outcomes[0], TickOutcome::Queued { .. }));
    for outcome in &outcomes[1..4] {
        assert_eq!(*outcome, TickOutcome::Waiting { rule: Rule::KeepAlive });
    }
    assert_eq!(
        outcomes[4],
        TickOutcome::Queued {
            rule: Rule::SignificantChange,
            evicted: false
        }
    );
    for outcome in &outcomes[5..] {
        assert!(matches!(outcome, TickOutcome::Waiting { .. }));
    }

    assert_eq!(h.ctx.queue().len(), 2);
    let last = h.ctx.queue().iter().last().unwrap();
    assert_eq!(last.get(Field::IsCharging), Some(&FieldValue::Bool(true)));
    assert_eq!(last.utc(), Some(START + 4));
}

#[test]
fn test_overflow_during_flush_keeps_only_unsent_snapshots() {
    let mut h = started(10);

    for soc in 1..=10 {
        h.ctx.provider_mut().set(ids::SOC, soc as f64);
        assert!(matches!(h.ctx.sample_tick(), TickOutcome::Queued { evicted: false, .. }));
        h.clock.advance(1);
    }

    let request = h.ctx.flush_tick().expect("bulk request");
    let body: BulkPayload = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body.data[0].tlm_list.len(), 10);
    assert_eq!(body.data[0].token, "user-token");

    for soc in 11..=12 {
        h.ctx.provider_mut().set(ids::SOC, soc as f64);
        assert!(matches!(h.ctx.sample_tick(), TickOutcome::Queued { evicted: true, .. }));
        h.clock.advance(1);
    }
    assert_eq!(h.ctx.queue().overflow_count(), 2);

    let outcome = h.ctx.complete_flush(Ok(200));
    assert_eq!(outcome, FlushOutcome::Acked { sent: 10, removed: 8 });
    assert_eq!(queued_socs(&h), vec![11.0, 12.0]);
}

#[test]
fn test_transport_failure_leaves_queue_length_unchanged() {
    let mut h = started(100);
    for soc in [50.0, 49.0, 48.0] {
        h.ctx.provider_mut().set(ids::SOC, soc);
        h.ctx.sample_tick();
        h.clock.advance(1);
    }
    let before = h.ctx.queue().len();

    h.ctx.flush_tick().unwrap();
    let outcome = h.ctx.complete_flush(Err(TransportError::Timeout));

    assert_eq!(outcome, FlushOutcome::Failed(UplinkError::Transport(TransportError::Timeout)));
    assert_eq!(h.ctx.queue().len(), before);

    // Retried on the next flush tick with the same snapshots
    assert!(h.ctx.flush_tick().is_some());
    assert_eq!(h.ctx.complete_flush(Ok(202)), FlushOutcome::Acked { sent: 3, removed: 3 });
    assert!(h.ctx.queue().is_empty());
}

#[test]
fn test_flush_trigger_while_in_flight_is_ignored() {
    let mut h = started(100);
    h.ctx.sample_tick();

    assert!(h.ctx.flush_tick().is_some());
    assert!(h.ctx.flush_tick().is_none());
    assert!(h.ctx.dispatch(AgentEvent::FlushTick).is_none());
    assert_eq!(h.ctx.flush_stats().attempted, 1);
}

#[test]
fn test_send_once_is_independent_of_bulk_flush() {
    let mut h = started(100);
    h.ctx.sample_tick();
    h.ctx.flush_tick().unwrap();

    let request = h.ctx.send_once().unwrap();
    assert_eq!(request.query_param("token"), Some("user-token"));
    assert_eq!(request.query_param("api_key"), Some("api"));
    assert_eq!(h.ctx.queue().len(), 1);
    assert!(h.ctx.is_sending());
}

#[test]
fn test_missing_token_is_reported_once() {
    let mut h = harness(100, None);

    assert!(h.ctx.set_active(true, &mut h.bus).is_err());
    assert!(h.ctx.set_active(true, &mut h.bus).is_err());
    assert!(h.ctx.send_once().is_err());

    assert_eq!(h.notifier.messages().len(), 1);
    assert!(!h.ctx.state().is_active);
}

#[test]
fn test_unsynced_clock_defers_everything() {
    let mut h = started(100);
    h.clock.set(3_600);

    for _ in 0..5 {
        assert_eq!(h.ctx.sample_tick(), TickOutcome::TimeInvalid);
    }
    assert!(h.ctx.flush_tick().is_none());
    assert!(h.ctx.queue().is_empty());
    assert!(h.notifier.messages().is_empty());

    h.clock.set(START);
    assert!(matches!(h.ctx.sample_tick(), TickOutcome::Queued { .. }));
}

#[test]
fn test_stop_and_restart_cycle() {
    let mut h = started(100);
    h.ctx.sample_tick();

    let Activation::Stopped { final_flush } = h.ctx.set_active(false, &mut h.bus).unwrap() else {
        panic!("expected the agent to stop");
    };
    assert!(final_flush.is_some());
    assert_eq!(h.ctx.set_active(false, &mut h.bus).unwrap(), Activation::AlreadyInactive);
    assert_eq!(h.bus.subscription_count(), 0);

    h.ctx.complete_flush(Ok(200));
    assert!(h.ctx.queue().is_empty());

    assert_eq!(h.ctx.set_active(true, &mut h.bus).unwrap(), Activation::Started);
    assert!(matches!(h.ctx.sample_tick(), TickOutcome::Queued { .. }));
}

#[test]
fn test_reset_forgets_token_and_queue() {
    let mut h = started(100);
    h.ctx.sample_tick();

    h.ctx.reset(&mut h.bus);
    assert!(h.ctx.queue().is_empty());
    assert!(!h.ctx.state().is_active);
    assert!(h.ctx.set_active(true, &mut h.bus).is_err());
}

#[test]
fn test_vehicle_type_change_is_idempotent() {
    let mut h = started(100);

    h.ctx.dispatch(AgentEvent::VehicleTypeChanged("NL".to_string()));
    let first: Vec<_> = h.ctx.catalog().entries().iter().map(|e| e.required_raw_ids.clone()).collect();
    h.ctx.dispatch(AgentEvent::VehicleTypeChanged("NL".to_string()));
    let second: Vec<_> = h.ctx.catalog().entries().iter().map(|e| e.required_raw_ids.clone()).collect();

    assert_eq!(first, second);
    assert_eq!(h.ctx.catalog().vehicle_type().tag(), "NL");
}

#[test]
fn test_soc_change_after_clock_steps_back_is_queued() {
    let mut h = started(100);
    assert!(matches!(h.ctx.sample_tick(), TickOutcome::Queued { .. }));

    h.clock.set(START - 100);
    h.ctx.provider_mut().set(ids::SOC, 54.0);
    assert_eq!(
        h.ctx.sample_tick(),
        TickOutcome::Queued {
            rule: Rule::SignificantChange,
            evicted: false
        }
    );
    assert_eq!(queued_socs(&h), vec![55.0, 54.0]);

    // The stepped-back sample is the new baseline
    h.clock.advance(1);
    assert!(matches!(h.ctx.sample_tick(), TickOutcome::Waiting { .. }));
}
