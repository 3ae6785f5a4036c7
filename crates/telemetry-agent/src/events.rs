//! Event Bus
//!
//! Ticks and vehicle notifications reach the agent through topics. Every
//! subscription yields a [`SubscriptionHandle`] that must be handed back to
//! unsubscribe; events on topics without a live subscription are dropped.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Event topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    /// Periodic sampling tick
    SampleTick,
    /// Periodic bulk flush tick
    FlushTick,
    /// Vehicle powered on
    VehicleOn,
    /// Vehicle powered off
    VehicleOff,
    /// Vehicle type tag changed
    VehicleTypeChanged,
}

/// Events delivered to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    SampleTick,
    FlushTick,
    VehicleOn,
    VehicleOff,
    /// New vehicle type tag
    VehicleTypeChanged(String),
}

impl AgentEvent {
    pub fn topic(&self) -> Topic {
        match self {
            AgentEvent::SampleTick => Topic::SampleTick,
            AgentEvent::FlushTick => Topic::FlushTick,
            AgentEvent::VehicleOn => Topic::VehicleOn,
            AgentEvent::VehicleOff => Topic::VehicleOff,
            AgentEvent::VehicleTypeChanged(_) => Topic::VehicleTypeChanged,
        }
    }
}

/// Opaque subscription handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(u64);

/// Topic subscription registry
pub trait EventBus {
    fn subscribe(&mut self, topic: Topic) -> SubscriptionHandle;

    /// Returns false if the handle was not subscribed
    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool;
}

/// In-process bus feeding a single agent loop
#[derive(Debug)]
pub struct LocalEventBus {
    next_id: u64,
    subscriptions: BTreeMap<SubscriptionHandle, Topic>,
    sender: mpsc::UnboundedSender<AgentEvent>,
}

impl LocalEventBus {
    /// Create a bus and the receiver its events are delivered on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let bus = Self {
            next_id: 1,
            subscriptions: BTreeMap::new(),
            sender,
        };
        (bus, receiver)
    }

    /// Deliver an event if anyone subscribes to its topic.
    ///
    /// Returns whether the event was delivered.
    pub fn publish(&self, event: AgentEvent) -> bool {
        let topic = event.topic();
        if !self.is_subscribed(topic) {
            trace!("No subscriber for {:?}, dropping event", topic);
            return false;
        }
        self.sender.send(event).is_ok()
    }

    pub fn is_subscribed(&self, topic: Topic) -> bool {
        self.subscriptions.values().any(|t| *t == topic)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl EventBus for LocalEventBus {
    fn subscribe(&mut self, topic: Topic) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(handle, topic);
        debug!("Subscribed {:?} to {:?}", handle, topic);
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        match self.subscriptions.remove(&handle) {
            Some(topic) => {
                debug!("Unsubscribed {:?} from {:?}", handle, topic);
                true
            }
            None => false,
        }
    }
}
