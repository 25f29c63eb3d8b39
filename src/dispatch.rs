//! Single-threaded FIFO dispatch queue.
//!
//! Every asynchronous delivery path in the crate runs on one of these: the
//! property store's change callbacks, the broadcast bus and the UI thread.
//! Messages are handled strictly in the order they were sent, on one named
//! thread, off the sender's call stack.

use crate::error::{HvacError, Result};
use log::debug;
use parking_lot::Mutex;
use std::thread::{JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};

enum Envelope<M> {
    Message(M),
    Barrier(oneshot::Sender<()>),
}

/// A named thread draining a queue of `M` into a handler.
pub struct DispatchQueue<M: Send + 'static> {
    name: String,
    tx: Mutex<Option<mpsc::UnboundedSender<Envelope<M>>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl<M: Send + 'static> DispatchQueue<M> {
    /// Spawn the dispatch thread.
    pub fn spawn<H>(name: &str, mut handler: H) -> Result<Self>
    where
        H: FnMut(M) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope<M>>();
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(envelope) = rx.blocking_recv() {
                    match envelope {
                        Envelope::Message(message) => handler(message),
                        Envelope::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("[Dispatch] {} stopped", thread_name);
            })?;

        Ok(Self {
            name: name.to_string(),
            thread_id: handle.thread().id(),
            tx: Mutex::new(Some(tx)),
            thread: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a message. Returns false once the queue has been shut down.
    pub fn send(&self, message: M) -> bool {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(Envelope::Message(message)).is_ok(),
            None => false,
        }
    }

    /// True when called from the dispatch thread itself.
    pub fn is_dispatch_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Block until every message sent before this call has been handled.
    ///
    /// Returns immediately on the dispatch thread. Must not be called from
    /// inside an async task.
    pub fn barrier(&self) -> Result<()> {
        if self.is_dispatch_thread() {
            return Ok(());
        }

        let (done_tx, done_rx) = oneshot::channel();
        let sent = match self.tx.lock().as_ref() {
            Some(tx) => tx.send(Envelope::Barrier(done_tx)).is_ok(),
            None => false,
        };
        if !sent {
            return Err(HvacError::DispatcherStopped(self.name.clone()));
        }

        done_rx
            .blocking_recv()
            .map_err(|_| HvacError::DispatcherStopped(self.name.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Stop accepting messages and wait for the queue to drain.
    ///
    /// Idempotent. Called on the dispatch thread it only closes the queue.
    pub fn shutdown(&self) {
        let tx = self.tx.lock().take();
        if tx.is_none() {
            return;
        }
        drop(tx);

        if self.is_dispatch_thread() {
            return;
        }
        if let Some(handle) = self.thread.lock().take()
            && handle.join().is_err()
        {
            log::error!("[Dispatch] {} panicked", self.name);
        }
    }
}

impl<M: Send + 'static> Drop for DispatchQueue<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_messages_handled_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let queue = DispatchQueue::spawn("test-order", move |n: u32| {
            seen_clone.lock().push(n);
        })
        .unwrap();

        for n in 0..10 {
            assert!(queue.send(n));
        }
        queue.barrier().unwrap();

        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_handler_runs_off_caller_thread() {
        let ran_on = Arc::new(Mutex::new(None));
        let ran_on_clone = ran_on.clone();
        let queue = DispatchQueue::spawn("test-thread", move |_: ()| {
            *ran_on_clone.lock() = std::thread::current().name().map(str::to_string);
        })
        .unwrap();

        queue.send(());
        queue.barrier().unwrap();

        assert_eq!(ran_on.lock().as_deref(), Some("test-thread"));
        assert!(!queue.is_dispatch_thread());
    }

    #[test]
    fn test_shutdown_drains_and_rejects() {
        let seen = Arc::new(Mutex::new(0));
        let seen_clone = seen.clone();
        let queue = DispatchQueue::spawn("test-shutdown", move |_: ()| {
            *seen_clone.lock() += 1;
        })
        .unwrap();

        queue.send(());
        queue.send(());
        queue.shutdown();
        assert_eq!(*seen.lock(), 2);

        assert!(!queue.is_running());
        assert!(!queue.send(()));
        assert!(matches!(
            queue.barrier(),
            Err(HvacError::DispatcherStopped(name)) if name == "test-shutdown"
        ));

        // Second shutdown is a no-op
        queue.shutdown();
    }
}
