// Worker threads whose result arrives over a channel, so joins can be bounded

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::warn;

pub struct WorkerHandle<T> {
    name: &'static str,
    thread: JoinHandle<()>,
    done: Receiver<T>,
}

impl<T: Send + 'static> WorkerHandle<T> {
    pub fn spawn<F>(name: &'static str, work: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, done) = bounded(1);
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _ = tx.send(work());
            })?;

        Ok(Self { name, thread, done })
    }

    /// Completion channel; yields the result once, or disconnects if the worker panicked
    pub fn done(&self) -> &Receiver<T> {
        &self.done
    }

    /// Wait at most `timeout` for the result. On timeout the thread is left
    /// running detached and `None` is returned.
    pub fn join_timeout(self, timeout: Duration) -> Option<T> {
        match self.done.recv_timeout(timeout) {
            Ok(result) => {
                self.reap();
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(worker = self.name, ?timeout, "worker did not stop in time, detaching");
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.reap();
                None
            }
        }
    }

    /// Join a worker whose result was already taken from [`WorkerHandle::done`]
    pub fn reap(self) {
        if self.thread.join().is_err() {
            warn!(worker = self.name, "worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_join_returns_result() {
        let worker = WorkerHandle::spawn("adder", || 2 + 2).unwrap();
        assert_eq!(worker.join_timeout(Duration::from_secs(1)), Some(4));
    }

    #[test]
    fn test_join_times_out_on_stuck_worker() {
        // a worker that ignores cancellation is leaked, not waited on forever
        let worker = WorkerHandle::spawn("stuck", || {
            std::thread::sleep(Duration::from_millis(500));
        })
        .unwrap();

        let start = Instant::now();
        assert_eq!(worker.join_timeout(Duration::from_millis(50)), None);
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_panicking_worker_yields_none() {
        let worker = WorkerHandle::spawn("boom", || -> u32 { panic!("boom") }).unwrap();
        assert_eq!(worker.join_timeout(Duration::from_secs(1)), None);
    }
}
