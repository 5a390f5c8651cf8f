use kernel_sync::FilterLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn uncontended_lock_and_release() {
    let lock = FilterLock::<4>::new();

    {
        let g = lock.lock(0);
        assert_eq!(g.thread(), 0);
    }

    // Released on drop; the same thread can re-enter.
    let _g = lock.lock(0);
}

#[test]
fn mutual_exclusion_under_contention() {
    const THREADS: usize = 8;
    const ITERS: usize = 2_000;

    let lock = Arc::new(FilterLock::<THREADS>::new());
    let in_cs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(THREADS));

    let mut handles = Vec::with_capacity(THREADS);
    for tid in 0..THREADS {
        let lock = Arc::clone(&lock);
        let in_cs = Arc::clone(&in_cs);
        let counter = Arc::clone(&counter);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..ITERS {
                let _g = lock.lock(tid);
                let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, 0, "mutual exclusion violated");
                counter.fetch_add(1, Ordering::SeqCst);
                in_cs.fetch_sub(1, Ordering::SeqCst);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), THREADS * ITERS);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
}

/// Every contender eventually gets through while others keep acquiring and
/// releasing: nobody is starved out of a finite workload.
#[test]
fn all_waiters_eventually_acquire() {
    const THREADS: usize = 4;
    const ITERS: usize = 500;

    let lock = Arc::new(FilterLock::<THREADS>::new());
    let acquired = Arc::new([const { AtomicUsize::new(0) }; THREADS]);
    let start = Arc::new(Barrier::new(THREADS));

    let mut handles = Vec::with_capacity(THREADS);
    for tid in 0..THREADS {
        let lock = Arc::clone(&lock);
        let acquired = Arc::clone(&acquired);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..ITERS {
                let _g = lock.lock(tid);
                acquired[tid].fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    for slot in acquired.iter() {
        assert_eq!(slot.load(Ordering::SeqCst), ITERS);
    }
}

#[test]
#[should_panic(expected = "out of range")]
fn rejects_thread_id_beyond_capacity() {
    let lock = FilterLock::<2>::new();
    let _ = lock.lock(2);
}
