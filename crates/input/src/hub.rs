use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::sensor::{Attitude, SensorError, SensorSample};

/// Hardware boundary for orientation sensors.
///
/// `start` hands the source a sink it publishes into from whatever context it
/// likes; `stop` must halt delivery before returning.
pub trait SensorSource: Send {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    fn start(&mut self, sink: SampleSink) -> Result<(), SensorError>;

    fn stop(&mut self);
}

/// Write side of the latest-sample cell. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SampleSink {
    latest: Arc<Mutex<Option<SensorSample>>>,
}

impl SampleSink {
    /// Replace the latest sample. Older unread samples are dropped.
    pub fn publish(&self, sample: SensorSample) {
        *self.latest.lock() = Some(sample.clamped());
    }

    pub fn publish_attitude(&self, attitude: Attitude) {
        self.publish(SensorSample::from_attitude(attitude));
    }
}

/// Identity of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct HubState {
    subscribers: BTreeSet<SubscriptionId>,
    source: Box<dyn SensorSource>,
}

struct HubInner {
    state: Mutex<HubState>,
    latest: Arc<Mutex<Option<SensorSample>>>,
    active: AtomicBool,
}

impl HubInner {
    fn subscribe(&self) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut state = self.state.lock();
        state.subscribers.insert(id);
        tracing::debug!(refs = state.subscribers.len(), "sensor subscribe");
        if state.subscribers.len() == 1 {
            self.start(&mut state);
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        if !state.subscribers.remove(&id) {
            return false;
        }
        tracing::debug!(refs = state.subscribers.len(), "sensor unsubscribe");
        if state.subscribers.is_empty() {
            self.stop(&mut state);
        }
        true
    }

    fn start(&self, state: &mut HubState) {
        if self.active.load(Ordering::Acquire) {
            return;
        }
        if !state.source.is_available() {
            tracing::warn!(source = state.source.name(), "sensor unavailable; motion stays manual");
            return;
        }
        let sink = SampleSink {
            latest: Arc::clone(&self.latest),
        };
        match state.source.start(sink) {
            Ok(()) => {
                self.active.store(true, Ordering::Release);
                tracing::info!(source = state.source.name(), "sensor started");
            }
            Err(e) => {
                tracing::warn!(source = state.source.name(), "sensor start failed: {e}");
            }
        }
    }

    fn stop(&self, state: &mut HubState) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        state.source.stop();
        *self.latest.lock() = None;
        tracing::info!(source = state.source.name(), "sensor stopped");
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        if *self.active.get_mut() {
            self.state.get_mut().source.stop();
        }
    }
}

/// Process-wide orientation sensor shared by every grid instance.
///
/// Clones refer to the same hub. The underlying source starts on the first
/// subscription and stops when the last one is released.
#[derive(Clone)]
pub struct SensorHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHub")
            .field("refs", &self.ref_count())
            .field("active", &self.is_active())
            .finish()
    }
}

impl SensorHub {
    pub fn new(source: impl SensorSource + 'static) -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState {
                    subscribers: BTreeSet::new(),
                    source: Box::new(source),
                }),
                latest: Arc::new(Mutex::new(None)),
                active: AtomicBool::new(false),
            }),
        }
    }

    /// Register interest in samples. Released when the handle drops.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            id: self.inner.subscribe(),
            hub: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Release a subscription by id. Unknown or already released ids are a
    /// no-op and return `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Most recent sample, if the source is running and has published.
    ///
    /// Never blocks: returns `None` if the delivery context holds the cell at
    /// this instant. Callers keep their last good value in that case.
    pub fn latest_sample(&self) -> Option<SensorSample> {
        self.inner.latest.try_lock().and_then(|guard| *guard)
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn is_available(&self) -> bool {
        self.inner.state.lock().source.is_available()
    }

    /// Number of live subscriptions.
    pub fn ref_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }
}

/// Handle for one sensor subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    hub: Weak<HubInner>,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release now instead of on drop. Idempotent.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.hub
            .upgrade()
            .is_some_and(|hub| hub.unsubscribe(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
