//! The UI-affinity executor.

use crate::dispatch::DispatchQueue;
use crate::error::Result;
use log::warn;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs posted tasks one at a time on the dedicated UI thread.
pub struct UiExecutor {
    queue: DispatchQueue<Task>,
}

impl UiExecutor {
    pub fn start() -> Result<Self> {
        let queue = DispatchQueue::spawn("ui-main", |task: Task| task())?;
        Ok(Self { queue })
    }

    /// Queue `task` for the UI thread. Returns false after shutdown.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let posted = self.queue.send(Box::new(task));
        if !posted {
            warn!("[UI] Task dropped, UI thread has stopped");
        }
        posted
    }

    /// Run `task` inline when already on the UI thread, otherwise post it.
    pub fn run_on_ui_thread<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            task();
            true
        } else {
            self.post(task)
        }
    }

    pub fn is_ui_thread(&self) -> bool {
        self.queue.is_dispatch_thread()
    }

    /// Wait for every task posted so far to finish.
    pub fn barrier(&self) -> Result<()> {
        self.queue.barrier()
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    /// Finish queued tasks and stop the UI thread.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
