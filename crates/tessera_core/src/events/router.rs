//! # Event Router
//!
//! Typed publish/drain channels between producers on any thread and the
//! simulation thread.
//!
//! ## Flow
//!
//! ```text
//! input thread ──publish──┐         ┌──> [inbound queue: E] ──drain──> Vec<E>
//! timer thread ──publish──┼─────────┤
//! systems      ──publish──┘         └──clone──> [sub A] [sub B]
//! ```
//!
//! Every queue is a crossbeam channel. The inbound queue and each
//! subscriber queue are independent copies of the stream: subscribing never
//! takes events away from `drain`. A subscription sees only events published
//! after `subscribe` returns.
//!
//! Publishing never blocks: when a bounded queue is full the overflow policy
//! decides what is lost.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// What a full bounded queue does with a new event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event to make room.
    #[default]
    DropOldest,
    /// Discard the new event.
    DropNewest,
    /// Never drop; the queue grows without bound.
    Unbounded,
}

/// Capacity and overflow behavior of one event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Maximum queued events per queue. Ignored for [`OverflowPolicy::Unbounded`].
    pub capacity: usize,
    /// Behavior when a queue is full.
    pub policy: OverflowPolicy,
}

impl ChannelConfig {
    /// Default capacity per event kind.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a config with the drop-oldest policy.
    #[must_use]
    pub const fn drop_oldest(capacity: usize) -> Self {
        Self {
            capacity,
            policy: OverflowPolicy::DropOldest,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::drop_oldest(Self::DEFAULT_CAPACITY)
    }
}

/// Counters for one event kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelStats {
    /// Event type name.
    pub kind: &'static str,
    /// Events waiting in the inbound queue.
    pub pending: usize,
    /// Live subscriptions.
    pub subscribers: usize,
    /// Events published since creation.
    pub published: u64,
    /// Events lost to overflow, inbound and subscriber queues combined.
    pub dropped: u64,
}

/// A single FIFO with its overflow policy.
struct Queue<E> {
    tx: Sender<E>,
    rx: Receiver<E>,
    policy: OverflowPolicy,
}

impl<E> Queue<E> {
    fn new(config: ChannelConfig) -> Self {
        let (tx, rx) = match config.policy {
            OverflowPolicy::Unbounded => unbounded(),
            // A zero-capacity crossbeam channel is a rendezvous channel.
            _ => bounded(config.capacity.max(1)),
        };
        Self {
            tx,
            rx,
            policy: config.policy,
        }
    }

    /// Enqueues `event`, returning how many events were lost.
    fn push(&self, event: E) -> u64 {
        match self.policy {
            OverflowPolicy::Unbounded => {
                // Cannot disconnect: `self.rx` keeps the channel open.
                let _ = self.tx.send(event);
                0
            }
            OverflowPolicy::DropNewest => match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => 0,
                Err(TrySendError::Full(_)) => 1,
            },
            OverflowPolicy::DropOldest => {
                let mut event = event;
                let mut dropped = 0;
                loop {
                    match self.tx.try_send(event) {
                        Ok(()) | Err(TrySendError::Disconnected(_)) => return dropped,
                        Err(TrySendError::Full(back)) => {
                            if self.rx.try_recv().is_ok() {
                                dropped += 1;
                            }
                            event = back;
                        }
                    }
                }
            }
        }
    }

    /// Takes everything queued at call time, in FIFO order.
    ///
    /// Bounded by the length observed on entry so a busy producer cannot
    /// keep the caller draining forever.
    fn take_all(&self) -> Vec<E> {
        take_pending(&self.rx)
    }

    fn len(&self) -> usize {
        self.rx.len()
    }
}

fn take_pending<E>(rx: &Receiver<E>) -> Vec<E> {
    let pending = rx.len();
    let mut out = Vec::with_capacity(pending);
    for _ in 0..pending {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(_) => break,
        }
    }
    out
}

struct SubscriberSlot<E> {
    queue: Queue<E>,
    token: Weak<()>,
}

type Deliver<E> = fn(&[SubscriberSlot<E>], &E) -> Delivery;

struct Subscribers<E> {
    slots: Vec<SubscriberSlot<E>>,
    /// Set by the first `subscribe`, which is where `E: Clone` is known.
    deliver: Option<Deliver<E>>,
}

#[derive(Clone, Copy, Default)]
struct Delivery {
    copies: u64,
    lost: u64,
}

fn deliver_cloned<E: Clone>(slots: &[SubscriberSlot<E>], event: &E) -> Delivery {
    let mut delivery = Delivery::default();
    for slot in slots {
        // Dropped subscriptions wait for `dispatch` to prune them.
        if slot.token.strong_count() == 0 {
            continue;
        }
        delivery.copies += 1;
        delivery.lost += slot.queue.push(event.clone());
    }
    delivery
}

/// Per-kind channel: one inbound queue plus one queue per subscriber.
struct Channel<E> {
    kind: &'static str,
    config: ChannelConfig,
    inbound: Queue<E>,
    subscribers: RwLock<Subscribers<E>>,
    published: AtomicU64,
    dropped: AtomicU64,
    /// Copies handed to subscribers since the last dispatch.
    delivered: AtomicU64,
}

impl<E: Send + 'static> Channel<E> {
    fn new(config: ChannelConfig) -> Self {
        Self {
            kind: type_name::<E>(),
            config,
            inbound: Queue::new(config),
            subscribers: RwLock::new(Subscribers {
                slots: Vec::new(),
                deliver: None,
            }),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    fn publish(&self, event: E) {
        self.published.fetch_add(1, Ordering::Relaxed);
        {
            // Shared lock: publishers only wait on a concurrent subscribe or prune.
            let subs = self.subscribers.read();
            if let Some(deliver) = subs.deliver {
                let delivery = deliver(&subs.slots, &event);
                self.delivered.fetch_add(delivery.copies, Ordering::Relaxed);
                self.record_lost(delivery.lost, "subscriber");
            }
        }
        let lost = self.inbound.push(event);
        self.record_lost(lost, "inbound");
    }

    fn record_lost(&self, lost: u64, queue: &'static str) {
        if lost > 0 {
            self.dropped.fetch_add(lost, Ordering::Relaxed);
            tracing::trace!(kind = self.kind, lost, queue, "event queue overflow");
        }
    }

    fn subscribe(&self) -> Subscription<E>
    where
        E: Clone,
    {
        let queue = Queue::new(self.config);
        let rx = queue.rx.clone();
        let token = Arc::new(());
        let mut subs = self.subscribers.write();
        subs.deliver = Some(deliver_cloned::<E>);
        subs.slots.push(SubscriberSlot {
            queue,
            token: Arc::downgrade(&token),
        });
        Subscription { rx, _token: token }
    }
}

/// Type-erased operations the router runs across all kinds.
trait ErasedChannel: Send + Sync {
    fn dispatch(&self) -> usize;
    fn stats(&self) -> ChannelStats;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Send + 'static> ErasedChannel for Channel<E> {
    fn dispatch(&self) -> usize {
        let stale = self
            .subscribers
            .read()
            .slots
            .iter()
            .any(|slot| slot.token.strong_count() == 0);
        if stale {
            let mut subs = self.subscribers.write();
            subs.slots.retain(|slot| slot.token.strong_count() > 0);
            tracing::trace!(kind = self.kind, live = subs.slots.len(), "pruned subscriptions");
        }
        usize::try_from(self.delivered.swap(0, Ordering::Relaxed)).unwrap_or(usize::MAX)
    }

    fn stats(&self) -> ChannelStats {
        let subs = self.subscribers.read();
        ChannelStats {
            kind: self.kind,
            pending: self.inbound.len(),
            subscribers: subs
                .slots
                .iter()
                .filter(|slot| slot.token.strong_count() > 0)
                .count(),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Multi-producer event router.
///
/// Share it as `Arc<EventRouter>`; every method takes `&self`.
///
/// ## Usage
///
/// ```rust
/// use tessera_core::EventRouter;
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Input { Open, Move, Close }
///
/// let router = EventRouter::default();
/// router.publish(Input::Open);
/// router.publish(Input::Move);
/// router.publish(Input::Close);
///
/// assert_eq!(router.drain::<Input>(), vec![Input::Open, Input::Move, Input::Close]);
/// assert!(router.drain::<Input>().is_empty());
/// ```
pub struct EventRouter {
    channels: RwLock<HashMap<TypeId, Arc<dyn ErasedChannel>>>,
    defaults: ChannelConfig,
}

impl EventRouter {
    /// Creates a router whose kinds use `defaults` unless registered otherwise.
    #[must_use]
    pub fn new(defaults: ChannelConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    /// Default channel settings.
    #[must_use]
    pub fn defaults(&self) -> ChannelConfig {
        self.defaults
    }

    /// Creates the channel for `E` with `config`.
    ///
    /// Returns `false` (and changes nothing) if `E` already has a channel.
    pub fn register<E: Send + 'static>(&self, config: ChannelConfig) -> bool {
        let mut channels = self.channels.write();
        if channels.contains_key(&TypeId::of::<E>()) {
            tracing::debug!(kind = type_name::<E>(), "channel already registered");
            return false;
        }
        channels.insert(TypeId::of::<E>(), Arc::new(Channel::<E>::new(config)));
        true
    }

    fn existing<E: Send + 'static>(&self) -> Option<Arc<Channel<E>>> {
        let erased = self.channels.read().get(&TypeId::of::<E>()).cloned()?;
        erased.into_any().downcast::<Channel<E>>().ok()
    }

    fn channel<E: Send + 'static>(&self) -> Arc<Channel<E>> {
        if let Some(channel) = self.existing::<E>() {
            return channel;
        }
        let mut channels = self.channels.write();
        let erased = channels
            .entry(TypeId::of::<E>())
            .or_insert_with(|| -> Arc<dyn ErasedChannel> { Arc::new(Channel::<E>::new(self.defaults)) })
            .clone();
        drop(channels);
        match erased.into_any().downcast::<Channel<E>>() {
            Ok(channel) => channel,
            // Entries are only ever inserted under their own TypeId.
            Err(_) => unreachable!("channel for {} stored under a foreign TypeId", type_name::<E>()),
        }
    }

    /// Enqueues `event`. Callable from any thread; never blocks.
    pub fn publish<E: Send + 'static>(&self, event: E) {
        self.channel::<E>().publish(event);
    }

    /// Lock-free publishing handle for `E`.
    #[must_use]
    pub fn publisher<E: Send + 'static>(&self) -> Publisher<E> {
        Publisher {
            channel: self.channel::<E>(),
        }
    }

    /// Registers a subscriber for `E`.
    ///
    /// Every event of kind `E` published after this returns is cloned into
    /// the subscription, independently of [`EventRouter::drain`]. Events
    /// already queued are not replayed. Dropping the subscription
    /// unregisters it.
    #[must_use]
    pub fn subscribe<E: Clone + Send + 'static>(&self) -> Subscription<E> {
        self.channel::<E>().subscribe()
    }

    /// Takes every event of kind `E` published since the last drain, in
    /// publish order. Subscriptions do not affect what this returns.
    pub fn drain<E: Send + 'static>(&self) -> Vec<E> {
        self.existing::<E>()
            .map(|channel| channel.inbound.take_all())
            .unwrap_or_default()
    }

    /// Prunes dropped subscriptions of every kind.
    ///
    /// Returns the number of event copies handed to subscribers since the
    /// previous call.
    pub fn dispatch(&self) -> usize {
        let channels: Vec<Arc<dyn ErasedChannel>> = self.channels.read().values().cloned().collect();
        channels.iter().map(|c| c.dispatch()).sum()
    }

    /// Events of kind `E` waiting in the inbound queue.
    #[must_use]
    pub fn pending<E: Send + 'static>(&self) -> usize {
        self.existing::<E>().map_or(0, |c| c.inbound.len())
    }

    /// Events of kind `E` lost to overflow so far.
    #[must_use]
    pub fn dropped<E: Send + 'static>(&self) -> u64 {
        self.existing::<E>()
            .map_or(0, |c| c.dropped.load(Ordering::Relaxed))
    }

    /// Counters for every kind, sorted by kind name.
    #[must_use]
    pub fn stats(&self) -> Vec<ChannelStats> {
        let mut stats: Vec<ChannelStats> = self.channels.read().values().map(|c| c.stats()).collect();
        stats.sort_by(|a, b| a.kind.cmp(b.kind));
        stats
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

/// Cloneable publishing handle for one event kind.
///
/// Holds the channel directly, so publishing takes no router lock.
pub struct Publisher<E> {
    channel: Arc<Channel<E>>,
}

impl<E: Send + 'static> Publisher<E> {
    /// Enqueues `event`. Never blocks.
    #[inline]
    pub fn publish(&self, event: E) {
        self.channel.publish(event);
    }
}

impl<E> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

/// One subscriber's copy of an event stream.
pub struct Subscription<E> {
    rx: Receiver<E>,
    _token: Arc<()>,
}

impl<E> Subscription<E> {
    /// Takes every event delivered to this subscriber, in publish order.
    pub fn drain(&self) -> Vec<E> {
        take_pending(&self.rx)
    }

    /// Number of delivered events not yet drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Key(u32);

    #[derive(Clone, Debug, PartialEq)]
    struct Tick;

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let router = EventRouter::default();
        for i in 0..5 {
            router.publish(Key(i));
        }

        assert_eq!(router.drain::<Key>(), (0..5).map(Key).collect::<Vec<_>>());
        assert!(router.drain::<Key>().is_empty());
    }

    #[test]
    fn test_drain_unknown_kind_is_empty() {
        let router = EventRouter::default();
        assert!(router.drain::<Tick>().is_empty());
        assert_eq!(router.pending::<Tick>(), 0);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let router = EventRouter::new(ChannelConfig::drop_oldest(3));
        for i in 0..5 {
            router.publish(Key(i));
        }

        assert_eq!(router.drain::<Key>(), vec![Key(2), Key(3), Key(4)]);
        assert_eq!(router.dropped::<Key>(), 2);
    }

    #[test]
    fn test_drop_newest_keeps_oldest() {
        let router = EventRouter::default();
        router.register::<Key>(ChannelConfig {
            capacity: 2,
            policy: OverflowPolicy::DropNewest,
        });
        for i in 0..4 {
            router.publish(Key(i));
        }

        assert_eq!(router.drain::<Key>(), vec![Key(0), Key(1)]);
        assert_eq!(router.dropped::<Key>(), 2);
    }

    #[test]
    fn test_unbounded_never_drops() {
        let router = EventRouter::new(ChannelConfig {
            capacity: 1,
            policy: OverflowPolicy::Unbounded,
        });
        for i in 0..100 {
            router.publish(Key(i));
        }
        assert_eq!(router.drain::<Key>().len(), 100);
        assert_eq!(router.dropped::<Key>(), 0);
    }

    #[test]
    fn test_register_twice_is_refused() {
        let router = EventRouter::default();
        assert!(router.register::<Key>(ChannelConfig::drop_oldest(4)));
        assert!(!router.register::<Key>(ChannelConfig::drop_oldest(8)));
    }

    #[test]
    fn test_subscribers_each_get_a_copy() {
        let router = EventRouter::default();
        let a = router.subscribe::<Key>();
        let b = router.subscribe::<Key>();

        router.publish(Key(1));
        router.publish(Key(2));
        assert_eq!(router.dispatch(), 4);
        assert_eq!(router.dispatch(), 0);

        assert_eq!(a.drain(), vec![Key(1), Key(2)]);
        assert_eq!(b.drain(), vec![Key(1), Key(2)]);
        assert!(a.drain().is_empty());
        assert_eq!(router.drain::<Key>(), vec![Key(1), Key(2)]);
    }

    #[test]
    fn test_subscription_starts_at_subscribe() {
        let router = EventRouter::default();
        router.publish(Key(1));
        let late = router.subscribe::<Key>();
        router.publish(Key(2));

        assert_eq!(late.drain(), vec![Key(2)]);
        assert_eq!(router.drain::<Key>(), vec![Key(1), Key(2)]);
    }

    #[test]
    fn test_slow_subscriber_overflows_alone() {
        let router = EventRouter::new(ChannelConfig::drop_oldest(2));
        let slow = router.subscribe::<Key>();
        for i in 0..3 {
            router.publish(Key(i));
            router.drain::<Key>();
        }

        assert_eq!(slow.drain(), vec![Key(1), Key(2)]);
        assert_eq!(router.dropped::<Key>(), 1);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let router = EventRouter::default();
        let kept = router.subscribe::<Key>();
        let gone = router.subscribe::<Key>();
        drop(gone);

        router.publish(Key(7));
        assert_eq!(router.dispatch(), 1);

        assert_eq!(kept.drain(), vec![Key(7)]);
        let stats = router.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].subscribers, 1);
        assert_eq!(stats[0].published, 1);
    }

    #[test]
    fn test_unsubscribed_kind_accumulates_through_dispatch() {
        let router = EventRouter::default();
        router.publish(Tick);
        router.dispatch();
        assert_eq!(router.pending::<Tick>(), 1);
    }

    #[test]
    fn test_publisher_handle_from_other_thread() {
        let router = Arc::new(EventRouter::default());
        let publisher = router.publisher::<Key>();

        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                publisher.publish(Key(i));
            }
        });
        handle.join().unwrap();

        assert_eq!(router.drain::<Key>(), (0..10).map(Key).collect::<Vec<_>>());
    }
}
