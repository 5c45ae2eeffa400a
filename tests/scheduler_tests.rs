//! Shading scheduler tests
//!
//! Tests for:
//! - Every worker runs exactly once per batch
//! - `dispatch` acts as a barrier across many batches
//! - Worker panics are reported and the pool survives them
//! - Shutdown semantics

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use prism::RasterError;
use prism::renderer::ShadingScheduler;

// ============================================================================
// Batches
// ============================================================================

#[test]
fn each_worker_runs_once_per_batch() {
    let mut pool = ShadingScheduler::new(4).unwrap();
    assert_eq!(pool.worker_count(), 4);

    let seen: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();
    pool.dispatch(&|k, n| {
        assert_eq!(n, 4);
        seen[k].fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    assert!(seen.iter().all(|s| s.load(Ordering::Relaxed) == 1));
}

#[test]
fn zero_workers_means_one() {
    let mut pool = ShadingScheduler::new(0).unwrap();
    assert_eq!(pool.worker_count(), 1);
    let calls = AtomicUsize::new(0);
    pool.dispatch(&|_, n| {
        assert_eq!(n, 1);
        calls.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn dispatch_waits_for_the_whole_batch() {
    let mut pool = ShadingScheduler::new(3).unwrap();
    let done = AtomicUsize::new(0);

    for batch in 1..=200 {
        pool.dispatch(&|k, _| {
            // Uneven work so stragglers are likely.
            if k == batch % 3 {
                thread::yield_now();
            }
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(done.load(Ordering::SeqCst), batch * 3);
    }
}

#[test]
fn jobs_may_borrow_and_write_disjoint_stripes() {
    let mut pool = ShadingScheduler::new(3).unwrap();
    let data: Vec<AtomicUsize> = (0..1000).map(|_| AtomicUsize::new(0)).collect();

    pool.dispatch(&|k, n| {
        for slot in data.iter().skip(k).step_by(n) {
            slot.store(k + 1, Ordering::Relaxed);
        }
    })
    .unwrap();

    for (i, slot) in data.iter().enumerate() {
        assert_eq!(slot.load(Ordering::Relaxed), i % 3 + 1);
    }
}

// ============================================================================
// Panics & Shutdown
// ============================================================================

#[test]
fn panicking_job_is_reported_and_pool_recovers() {
    let mut pool = ShadingScheduler::new(2).unwrap();

    let result = pool.dispatch(&|k, _| {
        if k == 1 {
            panic!("shader failure");
        }
    });
    assert!(matches!(result, Err(RasterError::WorkerPanicked(1))));

    let calls = AtomicUsize::new(0);
    pool.dispatch(&|_, _| {
        calls.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn shutdown_stops_the_pool() {
    let mut pool = ShadingScheduler::new(2).unwrap();
    assert!(pool.is_running());
    pool.shutdown();
    assert!(!pool.is_running());
    pool.shutdown();
    assert!(matches!(pool.dispatch(&|_, _| {}), Err(RasterError::SchedulerShutDown)));
}

#[test]
fn dropping_a_busy_pool_joins_cleanly() {
    let mut pool = ShadingScheduler::new(2).unwrap();
    pool.dispatch(&|_, _| thread::yield_now()).unwrap();
    drop(pool);
}
