//! Process-wide publish/subscribe for intents.

use super::intent::{Intent, IntentFilter};
use crate::dispatch::DispatchQueue;
use crate::error::Result;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives intents matching the filter it was registered with.
pub trait BroadcastReceiver: Send + Sync {
    fn on_receive(&self, intent: &Intent);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub u64);

pub trait BroadcastBus: Send + Sync {
    /// Deliver `intent` to every matching receiver, asynchronously.
    fn send_broadcast(&self, intent: Intent);

    fn register_receiver(
        &self,
        filter: IntentFilter,
        receiver: Arc<dyn BroadcastReceiver>,
    ) -> ReceiverId;

    /// Once this returns the receiver is never invoked again.
    fn unregister_receiver(&self, id: ReceiverId) -> bool;
}

struct Registration {
    filter: IntentFilter,
    receiver: Arc<dyn BroadcastReceiver>,
}

type Registry = RwLock<BTreeMap<ReceiverId, Registration>>;

/// In-process bus delivering on its own dispatch thread, in send order.
pub struct LocalBus {
    receivers: Arc<Registry>,
    next_id: AtomicU64,
    sent: AtomicU64,
    dispatcher: DispatchQueue<Intent>,
}

impl LocalBus {
    pub fn start() -> Result<Self> {
        let receivers: Arc<Registry> = Arc::new(RwLock::new(BTreeMap::new()));
        let delivery = receivers.clone();
        let dispatcher = DispatchQueue::spawn("broadcast-dispatch", move |intent: Intent| {
            // Held across delivery so unregistering waits for in-flight receivers
            let receivers = delivery.read();
            let mut delivered = 0;
            for registration in receivers.values() {
                if registration.filter.matches(&intent) {
                    registration.receiver.on_receive(&intent);
                    delivered += 1;
                }
            }
            debug!(
                "[Bus] {} delivered to {} receiver(s)",
                intent.action(),
                delivered
            );
        })?;

        Ok(Self {
            receivers,
            next_id: AtomicU64::new(1),
            sent: AtomicU64::new(0),
            dispatcher,
        })
    }

    /// Number of intents accepted by `send_broadcast`.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.read().len()
    }

    /// Wait until every queued intent has been delivered.
    pub fn flush(&self) -> Result<()> {
        self.dispatcher.barrier()
    }

    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}

impl BroadcastBus for LocalBus {
    fn send_broadcast(&self, intent: Intent) {
        debug!("[Bus] Broadcasting {}", intent.action());
        if self.dispatcher.send(intent) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn register_receiver(
        &self,
        filter: IntentFilter,
        receiver: Arc<dyn BroadcastReceiver>,
    ) -> ReceiverId {
        let id = ReceiverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.receivers
            .write()
            .insert(id, Registration { filter, receiver });
        id
    }

    fn unregister_receiver(&self, id: ReceiverId) -> bool {
        self.receivers.write().remove(&id).is_some()
    }
}

/// Receiver that keeps every intent it gets.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct CollectingReceiver {
    received: parking_lot::Mutex<Vec<Intent>>,
}

#[cfg(test)]
impl CollectingReceiver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn received(&self) -> Vec<Intent> {
        self.received.lock().clone()
    }

    pub(crate) fn take(&self) -> Vec<Intent> {
        std::mem::take(&mut *self.received.lock())
    }
}

#[cfg(test)]
impl BroadcastReceiver for CollectingReceiver {
    fn on_receive(&self, intent: &Intent) {
        self.received.lock().push(intent.clone());
    }
}
