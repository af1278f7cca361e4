//! In-order host queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use devstream_core::{DeviceIndex, NativeQueue, QueueFault};

/// Unit of work executed by a [`CpuQueue`].
type Task = Box<dyn FnOnce() -> Result<(), QueueFault> + Send + 'static>;

/// State shared between a queue and its worker.
#[derive(Default)]
struct QueueState {
    /// Tasks submitted but not yet finished.
    pending: Mutex<usize>,
    /// Signalled when `pending` drops to zero.
    drained: Condvar,
    /// First failure since the last wait.
    fault: Mutex<Option<QueueFault>>,
}

impl QueueState {
    fn finish(&self, outcome: Result<(), QueueFault>) {
        if let Err(fault) = outcome {
            let mut slot = self.fault.lock();
            if slot.is_none() {
                *slot = Some(fault);
            }
        }

        let mut pending = self.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.drained.notify_all();
        }
    }
}

/// In-order command queue executed on a dedicated host thread.
///
/// The worker thread is spawned on the first submission; a queue that
/// never receives work costs no thread.
pub struct CpuQueue {
    /// Device the queue was created for.
    device: DeviceIndex,
    /// Priority the queue was created with.
    priority: i32,
    /// Shared completion state.
    state: Arc<QueueState>,
    /// Channel to the worker, created lazily.
    sender: Mutex<Option<mpsc::Sender<Task>>>,
}

impl CpuQueue {
    /// Creates an idle queue.
    #[must_use]
    pub fn new(device: DeviceIndex, priority: i32) -> Self {
        Self {
            device,
            priority,
            state: Arc::new(QueueState::default()),
            sender: Mutex::new(None),
        }
    }

    /// Device the queue belongs to.
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Priority the queue was created with.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Number of tasks submitted but not finished.
    pub fn pending(&self) -> usize {
        *self.state.pending.lock()
    }

    /// Enqueues `task`. Tasks run in submission order.
    ///
    /// A task returning an error, or panicking, records a fault that the
    /// next [`NativeQueue::wait`] reports.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueFault>
    where
        F: FnOnce() -> Result<(), QueueFault> + Send + 'static,
    {
        let mut sender = self.sender.lock();
        if sender.is_none() {
            *sender = Some(self.spawn_worker()?);
        }

        *self.state.pending.lock() += 1;

        let sent = sender
            .as_ref()
            .map(|tx| tx.send(Box::new(task)).is_ok())
            .unwrap_or(false);
        if !sent {
            self.state.finish(Ok(()));
            *sender = None;
            return Err(QueueFault::new(format!(
                "worker for queue on device {} exited",
                self.device
            )));
        }

        Ok(())
    }

    fn spawn_worker(&self) -> Result<mpsc::Sender<Task>, QueueFault> {
        let (tx, rx) = mpsc::channel::<Task>();
        let state = Arc::clone(&self.state);

        thread::Builder::new()
            .name(format!("devstream-cpu{}-q", self.device))
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                        Ok(result) => result,
                        Err(_) => Err(QueueFault::new("task panicked")),
                    };
                    if let Err(ref fault) = outcome {
                        warn!(error = %fault, "CPU queue task failed");
                    }
                    state.finish(outcome);
                }
            })
            .map_err(|e| QueueFault::new(format!("failed to spawn queue worker: {}", e)))?;

        debug!(
            device = self.device,
            priority = self.priority,
            "Spawned CPU queue worker"
        );
        Ok(tx)
    }
}

impl NativeQueue for CpuQueue {
    fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    fn wait(&self) -> Result<(), QueueFault> {
        let mut pending = self.state.pending.lock();
        while *pending > 0 {
            self.state.drained.wait(&mut pending);
        }
        drop(pending);

        match self.state.fault.lock().take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CpuQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuQueue")
            .field("device", &self.device)
            .field("priority", &self.priority)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_new_queue_is_idle() {
        let queue = CpuQueue::new(0, 0);
        assert!(queue.is_idle());
        assert!(queue.wait().is_ok());
    }

    #[test]
    fn test_tasks_run_in_order() {
        let queue = CpuQueue::new(0, 0);
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..16 {
            let log = Arc::clone(&log);
            queue
                .submit(move || {
                    log.lock().push(i);
                    Ok(())
                })
                .unwrap();
        }

        queue.wait().unwrap();
        assert!(queue.is_idle());
        assert_eq!(*log.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_queue_busy_until_task_finishes() {
        let queue = CpuQueue::new(0, 0);
        let gate = Arc::new((Mutex::new(false), Condvar::new()));

        let worker_gate = Arc::clone(&gate);
        queue
            .submit(move || {
                let (open, cv) = &*worker_gate;
                let mut open = open.lock();
                while !*open {
                    cv.wait(&mut open);
                }
                Ok(())
            })
            .unwrap();

        assert!(!queue.is_idle());

        let (open, cv) = &*gate;
        *open.lock() = true;
        cv.notify_all();

        queue.wait().unwrap();
        assert!(queue.is_idle());
    }

    #[test]
    fn test_wait_reports_first_fault_once() {
        let queue = CpuQueue::new(1, -1);
        queue.submit(|| Err(QueueFault::new("first"))).unwrap();
        queue.submit(|| Err(QueueFault::new("second"))).unwrap();

        assert_eq!(queue.wait(), Err(QueueFault::new("first")));
        assert!(queue.wait().is_ok());
    }

    #[test]
    fn test_panicking_task_becomes_fault() {
        let queue = CpuQueue::new(0, 0);
        queue.submit(|| panic!("boom")).unwrap();
        assert_eq!(queue.wait(), Err(QueueFault::new("task panicked")));
        assert!(queue.is_idle());
    }

    #[test]
    fn test_concurrent_submitters() {
        let queue = Arc::new(CpuQueue::new(0, 0));
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let counter = Arc::clone(&counter);
                        queue
                            .submit(move || {
                                thread::sleep(Duration::from_micros(10));
                                counter.fetch_add(1, Ordering::Relaxed);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        queue.wait().unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }
}
