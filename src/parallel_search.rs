//! Parallel root-move search.
//!
//! Each root move is an independent task. Workers pull tasks from one shared
//! queue, so a slow move never holds up the rest, and each result lands at
//! the index of its task. Parallelism stops at the root: everything below a
//! root move runs on the worker that dequeued it.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::{trace, warn};
use parking_lot::Mutex;

use crate::control::GameControlInfo;
use crate::error::SearchError;

/// One unit of root work.
pub type RootTask<T> = Box<dyn FnOnce() -> Result<T, SearchError> + Send + 'static>;

type TaskQueue<T> = Mutex<VecDeque<(usize, RootTask<T>)>>;

struct SharedRun<T> {
    queue: TaskQueue<T>,
    results: Mutex<Vec<Option<T>>>,
    faults: Mutex<Vec<String>>,
    control: Arc<GameControlInfo>,
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelRootCoordinator {
    threads: usize,
}

impl ParallelRootCoordinator {
    /// A coordinator with `threads` workers; 0 uses every CPU.
    pub fn new(threads: usize) -> Self {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        ParallelRootCoordinator { threads }
    }

    pub fn single_threaded() -> Self {
        ParallelRootCoordinator { threads: 1 }
    }

    pub fn thread_count(&self) -> usize {
        self.threads
    }

    /// Run every task and return the results in task order.
    ///
    /// A task that fails or panics stops its siblings through `control`; the
    /// run then reports every failure as `WorkerFaults`. If the search was
    /// interrupted instead, the run reports `Interrupted`.
    pub fn run<T: Send + 'static>(
        &self,
        tasks: Vec<RootTask<T>>,
        control: &Arc<GameControlInfo>,
    ) -> Result<Vec<T>, SearchError> {
        let task_count = tasks.len();
        if task_count == 0 {
            return Ok(Vec::new());
        }

        let shared = Arc::new(SharedRun {
            queue: Mutex::new(tasks.into_iter().enumerate().collect()),
            results: Mutex::new((0..task_count).map(|_| None).collect()),
            faults: Mutex::new(Vec::new()),
            control: Arc::clone(control),
        });

        let workers = self.threads.min(task_count).max(1);
        if workers == 1 {
            worker_loop(0, &shared);
        } else {
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let shared = Arc::clone(&shared);
                    thread::Builder::new()
                        .name(format!("root-worker-{id}"))
                        .spawn(move || worker_loop(id, &shared))
                })
                .collect();
            for handle in handles {
                match handle {
                    Ok(handle) => {
                        if handle.join().is_err() {
                            shared.faults.lock().push("root worker panicked outside its task".into());
                        }
                    }
                    Err(err) => {
                        shared.faults.lock().push(format!("could not spawn root worker: {err}"));
                        control.abort_siblings();
                    }
                }
            }
            // Tasks left behind by workers that never started.
            if !shared.queue.lock().is_empty() {
                worker_loop(workers, &shared);
            }
        }

        let faults = std::mem::take(&mut *shared.faults.lock());
        if !faults.is_empty() {
            return Err(SearchError::WorkerFaults(faults));
        }
        let results = std::mem::take(&mut *shared.results.lock());
        if results.iter().any(Option::is_none) {
            return Err(match control.status() {
                Some(status) => SearchError::Interrupted(status),
                None => SearchError::InvariantViolation("root task finished without a result".into()),
            });
        }
        Ok(results.into_iter().flatten().collect())
    }
}

impl Default for ParallelRootCoordinator {
    fn default() -> Self {
        Self::single_threaded()
    }
}

fn worker_loop<T>(id: usize, shared: &SharedRun<T>) {
    loop {
        // Polls the deadline and move-now too, not just the status word.
        if shared.control.check().is_err() {
            return;
        }
        let next = shared.queue.lock().pop_front();
        let Some((index, task)) = next else {
            return;
        };

        trace!("worker {id} starts root task {index}");
        match catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(value)) => {
                shared.results.lock()[index] = Some(value);
            }
            Ok(Err(err)) if err.is_interruption() => return,
            Ok(Err(err)) => {
                warn!("root task {index} failed: {err}");
                shared.faults.lock().push(format!("task {index}: {err}"));
                shared.control.abort_siblings();
                return;
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("root task {index} panicked: {message}");
                shared.faults.lock().push(format!("task {index} panicked: {message}"));
                shared.control.abort_siblings();
                return;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::InterruptionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn task<T: Send + 'static>(f: impl FnOnce() -> Result<T, SearchError> + Send + 'static) -> RootTask<T> {
        Box::new(f)
    }

    #[test]
    fn results_keep_task_order() {
        let control = Arc::new(GameControlInfo::new());
        let tasks: Vec<RootTask<usize>> = (0..8)
            .map(|i| {
                task(move || {
                    thread::sleep(Duration::from_millis(((8 - i) * 3) as u64));
                    Ok(i * 10)
                })
            })
            .collect();
        let results = ParallelRootCoordinator::new(4).run(tasks, &control).unwrap();
        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn single_worker_runs_inline() {
        let control = Arc::new(GameControlInfo::new());
        let caller = thread::current().id();
        let tasks = vec![task(move || Ok(thread::current().id() == caller))];
        assert_eq!(ParallelRootCoordinator::single_threaded().run(tasks, &control).unwrap(), vec![true]);
    }

    #[test]
    fn a_failing_task_stops_the_rest() {
        let control = Arc::new(GameControlInfo::new());
        let started = Arc::new(AtomicUsize::new(0));
        let mut tasks: Vec<RootTask<()>> =
            vec![task(|| Err(SearchError::InvariantViolation("broken move list".into())))];
        for _ in 0..5 {
            let started = Arc::clone(&started);
            tasks.push(task(move || {
                started.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        let err = ParallelRootCoordinator::single_threaded().run(tasks, &control).unwrap_err();
        assert_eq!(
            err,
            SearchError::WorkerFaults(vec!["task 0: invariant violated: broken move list".into()])
        );
        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(control.status(), Some(InterruptionStatus::Faulted));
    }

    #[test]
    fn panics_are_reported_as_faults() {
        let control = Arc::new(GameControlInfo::new());
        let tasks: Vec<RootTask<u32>> = vec![task(|| Ok(1)), task(|| panic!("boom"))];
        match ParallelRootCoordinator::new(2).run(tasks, &control) {
            Err(SearchError::WorkerFaults(faults)) => {
                assert_eq!(faults.len(), 1);
                assert!(faults[0].contains("boom"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn interruption_is_not_a_fault() {
        let control = Arc::new(GameControlInfo::new());
        let stopper = Arc::clone(&control);
        let tasks: Vec<RootTask<u32>> = vec![
            task(move || {
                stopper.cancel();
                Err(SearchError::Interrupted(InterruptionStatus::Cancelled))
            }),
            task(|| Ok(2)),
        ];
        assert_eq!(
            ParallelRootCoordinator::single_threaded().run(tasks, &control),
            Err(SearchError::Interrupted(InterruptionStatus::Cancelled))
        );
    }

    #[test]
    fn expired_deadline_stops_workers_before_dequeue() {
        let control = Arc::new(GameControlInfo::new());
        control.start_deadline(Duration::ZERO);
        let started = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<RootTask<()>> = (0..3)
            .map(|_| {
                let started = Arc::clone(&started);
                task(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        assert_eq!(
            ParallelRootCoordinator::new(2).run(tasks, &control),
            Err(SearchError::Interrupted(InterruptionStatus::TimedOut))
        );
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_threads_uses_every_cpu() {
        assert_eq!(ParallelRootCoordinator::new(0).thread_count(), num_cpus::get());
        let control = Arc::new(GameControlInfo::new());
        assert_eq!(ParallelRootCoordinator::new(3).run(Vec::<RootTask<u8>>::new(), &control), Ok(vec![]));
    }
}
