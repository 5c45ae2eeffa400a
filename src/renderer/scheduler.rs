//! Deferred shading thread pool.
//!
//! A fixed set of workers, each with its own job slot and condition
//! variable. A batch fills every slot with the same job, wakes each worker
//! and spins (yielding) until all slots are empty again. Worker `k` of `n`
//! handles items `k, k + n, k + 2n, ...`, so writes from different workers
//! never touch the same index.
//!
//! The job is borrowed from the submitter's stack for the duration of the
//! batch only; [`ShadingScheduler::dispatch`] does not return before every
//! worker has dropped its copy of the pointer.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::errors::{RasterError, Result};

/// Work item run once per worker: `(worker_index, worker_count)`.
type StripeFn = dyn Fn(usize, usize) + Sync;

#[derive(Clone, Copy)]
struct JobRef(*const StripeFn);

// SAFETY: the pointee is `Sync`, and `dispatch` keeps it alive until every
// worker has cleared its slot.
unsafe impl Send for JobRef {}

impl JobRef {
    /// Erases the borrow's lifetime.
    ///
    /// # Safety
    /// The returned reference must not be used after `job` goes out of
    /// scope.
    unsafe fn erase<'a>(job: &'a (dyn Fn(usize, usize) + Sync + 'a)) -> Self {
        let ptr: *const (dyn Fn(usize, usize) + Sync + 'a) = job;
        // SAFETY: only the trait object lifetime changes; layout is identical.
        Self(unsafe { std::mem::transmute::<*const (dyn Fn(usize, usize) + Sync + 'a), *const StripeFn>(ptr) })
    }
}

struct State {
    slots: Vec<Option<JobRef>>,
    panicked: Option<usize>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Vec<Condvar>,
}

pub struct ShadingScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ShadingScheduler {
    /// Spawns `worker_count` (at least one) named worker threads.
    pub fn new(worker_count: usize) -> Result<Self> {
        let worker_count = worker_count.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                slots: vec![None; worker_count],
                panicked: None,
                shutdown: false,
            }),
            wake: (0..worker_count).map(|_| Condvar::new()).collect(),
        });

        // Dropping a partially built pool joins what was spawned.
        let mut scheduler = Self { shared, workers: Vec::with_capacity(worker_count) };
        for index in 0..worker_count {
            let shared = Arc::clone(&scheduler.shared);
            let handle = thread::Builder::new()
                .name(format!("shade-worker-{index}"))
                .spawn(move || worker_loop(&shared, index, worker_count))
                .map_err(|source| RasterError::WorkerSpawnFailed { index, source })?;
            scheduler.workers.push(handle);
        }

        log::debug!("Shading pool started with {worker_count} workers");
        Ok(scheduler)
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.wake.len()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Runs `job(k, n)` on every worker `k` and waits for all of them.
    ///
    /// A panicking job is reported as [`RasterError::WorkerPanicked`] after
    /// the batch completes; the pool stays usable.
    pub fn dispatch<F>(&mut self, job: &F) -> Result<()>
    where
        F: Fn(usize, usize) + Sync,
    {
        if !self.is_running() {
            return Err(RasterError::SchedulerShutDown);
        }

        // SAFETY: `job` outlives this call and the barrier below keeps this
        // call alive until no worker holds the pointer.
        let job_ref = unsafe { JobRef::erase(job) };
        {
            let mut state = self.shared.state.lock();
            state.panicked = None;
            state.slots.fill(Some(job_ref));
        }
        for condvar in &self.shared.wake {
            condvar.notify_one();
        }

        loop {
            {
                let state = self.shared.state.lock();
                if state.slots.iter().all(Option::is_none) {
                    return match state.panicked {
                        Some(index) => Err(RasterError::WorkerPanicked(index)),
                        None => Ok(()),
                    };
                }
            }
            thread::yield_now();
        }
    }

    /// Stops and joins all workers. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.state.lock().shutdown = true;
        for condvar in &self.shared.wake {
            condvar.notify_all();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Shading worker exited with a panic");
            }
        }
        log::debug!("Shading pool shut down");
    }
}

impl Drop for ShadingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared, index: usize, worker_count: usize) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.slots[index] {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                shared.wake[index].wait(&mut state);
            }
        };

        // SAFETY: the submitter is blocked in `dispatch` until our slot is
        // cleared below, so the job is still alive.
        let run = catch_unwind(AssertUnwindSafe(|| unsafe { (*job.0)(index, worker_count) }));

        let mut state = shared.state.lock();
        if run.is_err() {
            log::error!("Shading worker {index} panicked");
            state.panicked.get_or_insert(index);
        }
        state.slots[index] = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn every_index_visited_once_per_batch() {
        let mut pool = ShadingScheduler::new(3).unwrap();
        let hits: Vec<AtomicUsize> = (0..100).map(|_| AtomicUsize::new(0)).collect();
        for _ in 0..5 {
            pool.dispatch(&|k, n| {
                let mut i = k;
                while i < hits.len() {
                    hits[i].fetch_add(1, Ordering::Relaxed);
                    i += n;
                }
            })
            .unwrap();
        }
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 5));
    }

    #[test]
    fn shutdown_is_idempotent_and_rejects_work() {
        let mut pool = ShadingScheduler::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(matches!(pool.dispatch(&|_, _| {}), Err(RasterError::SchedulerShutDown)));
    }
}
