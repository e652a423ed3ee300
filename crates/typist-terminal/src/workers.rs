//! Named background workers started on behalf of handlers.
//!
//! Cancellation is cooperative: escape flips every worker's
//! [`CancelToken`] and each worker is expected to poll it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use typist_types::error::Result;

/// Cooperative cancellation signal shared with a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker holding this token to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Entry {
    id: u64,
    name: String,
    token: CancelToken,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    active: Vec<Entry>,
}

#[derive(Debug, Default)]
struct Shared {
    registry: Mutex<Registry>,
    idle: Condvar,
}

/// Registry of running background workers. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Workers {
    shared: Arc<Shared>,
}

/// Removes a worker from the registry when its thread finishes, including
/// by panic.
struct Deregister {
    shared: Arc<Shared>,
    id: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let mut registry = lock(&self.shared.registry);
        registry.active.retain(|e| e.id != self.id);
        self.shared.idle.notify_all();
    }
}

fn lock(m: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Workers {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `work` on a new named thread and track it until it returns.
    pub fn spawn<F>(&self, name: &str, work: F) -> Result<CancelToken>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        let token = CancelToken::new();
        let id = {
            let mut registry = lock(&self.shared.registry);
            registry.next_id += 1;
            let id = registry.next_id;
            registry.active.push(Entry {
                id,
                name: name.to_string(),
                token: token.clone(),
            });
            id
        };

        let guard = Deregister {
            shared: Arc::clone(&self.shared),
            id,
        };
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                work(worker_token);
            });

        match spawned {
            Ok(_) => {
                log::debug!("Started worker '{name}'");
                Ok(token)
            },
            // The closure (and its guard) was dropped, which deregistered it.
            Err(e) => Err(e.into()),
        }
    }

    /// Signal every running worker to stop. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let registry = lock(&self.shared.registry);
        for entry in &registry.active {
            log::debug!("Cancelling worker '{}'", entry.name);
            entry.token.cancel();
        }
        registry.active.len()
    }

    /// Number of workers that have not finished.
    pub fn active_count(&self) -> usize {
        lock(&self.shared.registry).active.len()
    }

    /// Whether any worker is still running.
    pub fn has_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Thread names of the workers still running.
    pub fn active_names(&self) -> Vec<String> {
        lock(&self.shared.registry)
            .active
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Block until no worker is running or `timeout` elapses.
    /// Returns `true` if all workers finished.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let registry = lock(&self.shared.registry);
        let (registry, _) = self
            .shared
            .idle
            .wait_timeout_while(registry, timeout, |r| !r.active.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        registry.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn worker_runs_and_deregisters() {
        let workers = Workers::new();
        let (tx, rx) = mpsc::channel();
        workers
            .spawn("one-shot", move |_| {
                tx.send(42).unwrap();
            })
            .unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 42);
        assert!(workers.wait_idle_timeout(WAIT));
        assert_eq!(workers.active_count(), 0);
    }

    #[test]
    fn cancel_all_reaches_running_workers() {
        let workers = Workers::new();
        let (started_tx, started_rx) = mpsc::channel();
        workers
            .spawn("poller", move |token| {
                started_tx.send(()).unwrap();
                while !token.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        assert!(workers.has_active());
        assert_eq!(workers.active_names(), vec!["poller".to_string()]);

        assert_eq!(workers.cancel_all(), 1);
        assert!(workers.wait_idle_timeout(WAIT));
    }

    #[test]
    fn panicking_worker_still_deregisters() {
        let workers = Workers::new();
        workers
            .spawn("doomed", |_| panic!("worker failure"))
            .unwrap();
        assert!(workers.wait_idle_timeout(WAIT));
    }

    #[test]
    fn token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.clone().cancel();
        assert!(token.is_cancelled());
    }
}
