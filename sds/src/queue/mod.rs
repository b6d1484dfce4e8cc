//! A lock-free, multi-producer multi-consumer queue (Michael & Scott,
//! 1996): a singly linked list with separate `head`/`tail` atomics,
//! advanced by compare-and-swap rather than under a lock.
//!
//! A retired node must never be freed while another thread might still
//! hold a pointer into it. [`crossbeam::epoch`] gives that guarantee as a
//! library: `epoch::pin()` marks the calling thread as a participant for
//! the duration of the guard, and `Guard::defer_destroy` defers a node's
//! free until no participant could still be reading it.
//!
//! [`MutexQueue`] is the documented fallback for targets without a
//! usable CAS intrinsic: same [`MpmcQueue`] contract, a `Mutex<VecDeque<T>>`
//! underneath instead of atomics.

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use crossbeam::epoch::{self, Atomic, Owned, Shared};

/// The common contract both queue implementations satisfy: FIFO order
/// among the operations of any single thread, and every enqueued value
/// dequeued by exactly one consumer.
pub trait MpmcQueue<T> {
    fn enqueue(&self, value: T);
    fn dequeue(&self) -> Option<T>;
    fn is_empty(&self) -> bool {
        false
    }
}

struct Node<T> {
    /// `None` only for the sentinel node at the head of an empty queue.
    /// Accessed through a shared reference -- see `dequeue` -- but only
    /// ever by the single thread that just won the CAS making this node
    /// the new sentinel, so the aliasing is benign.
    data: UnsafeCell<Option<T>>,
    next: Atomic<Node<T>>,
}

/// A lock-free FIFO. Safe to share behind a plain `&Queue<T>` across any
/// number of producer and consumer threads.
pub struct Queue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let sentinel = Owned::new(Node { data: UnsafeCell::new(None), next: Atomic::null() });
        let guard = &epoch::pin();
        let sentinel = sentinel.into_shared(guard);
        Queue { head: Atomic::from(sentinel), tail: Atomic::from(sentinel) }
    }
}

impl<T> MpmcQueue<T> for Queue<T> {
    fn enqueue(&self, value: T) {
        let new = Owned::new(Node { data: UnsafeCell::new(Some(value)), next: Atomic::null() });
        let guard = &epoch::pin();
        let mut new = new;
        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);
            if next.is_null() {
                match tail_ref.next.compare_exchange(
                    Shared::null(),
                    new,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                ) {
                    Ok(inserted) => {
                        let _ = self.tail.compare_exchange(
                            tail,
                            inserted,
                            Ordering::Release,
                            Ordering::Relaxed,
                            guard,
                        );
                        return;
                    }
                    Err(failure) => {
                        new = failure.new;
                    }
                }
            } else {
                // Tail lagged behind; help advance it before retrying.
                let _ = self.tail.compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
            }
        }
    }

    fn dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);
            let next_ref = match unsafe { next.as_ref() } {
                None => return None,
                Some(next_ref) => next_ref,
            };

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                let value = unsafe { (*next_ref.data.get()).take() };
                unsafe { guard.defer_destroy(head) };
                return value;
            }
        }
    }

    fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        let head_ref = unsafe { head.deref() };
        head_ref.next.load(Ordering::Acquire, guard).is_null()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // No concurrent access is possible once we have `&mut self`, so
        // it's sound to walk and free the whole chain directly.
        unsafe {
            let guard = epoch::unprotected();
            let mut cur = self.head.load(Ordering::Relaxed, guard);
            while !cur.is_null() {
                let owned = cur.into_owned();
                let next = owned.next.load(Ordering::Relaxed, guard);
                drop(owned);
                cur = next;
            }
        }
    }
}

/// A `Mutex`-backed queue with the same [`MpmcQueue`] contract as
/// [`Queue`], for targets where a lock-free CAS loop is unavailable or
/// undesirable.
pub struct MutexQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for MutexQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MutexQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }
}

impl<T> MpmcQueue<T> for MutexQueue<T> {
    fn enqueue(&self, value: T) {
        self.inner.lock().expect("queue mutex poisoned").push_back(value);
    }

    fn dequeue(&self) -> Option<T> {
        self.inner.lock().expect("queue mutex poisoned").pop_front()
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().expect("queue mutex poisoned").is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fifo_single_thread<Q: MpmcQueue<u64> + Default>() {
        let q = Q::default();
        assert!(q.is_empty());
        for v in 0..10 {
            q.enqueue(v);
        }
        assert!(!q.is_empty());
        for v in 0..10 {
            assert_eq!(q.dequeue(), Some(v));
        }
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn lock_free_queue_is_fifo() {
        fifo_single_thread::<Queue<u64>>();
    }

    #[test]
    fn mutex_queue_is_fifo() {
        fifo_single_thread::<MutexQueue<u64>>();
    }

    #[test]
    fn four_producers_two_consumers_see_every_item_exactly_once() {
        let q = Arc::new(Queue::new());
        let per_producer = 2_500usize;

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        q.enqueue((p, i));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let consumed: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let q = Arc::clone(&q);
                let consumed = Arc::clone(&consumed);
                thread::spawn(move || loop {
                    match q.dequeue() {
                        Some(item) => consumed.lock().unwrap().push(item),
                        None => {
                            if q.is_empty() {
                                return;
                            }
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();
        for c in consumers {
            c.join().unwrap();
        }

        let mut got = consumed.lock().unwrap().clone();
        got.sort_unstable();
        let mut expected: Vec<(usize, usize)> =
            (0..4).flat_map(|p| (0..per_producer).map(move |i| (p, i))).collect();
        expected.sort_unstable();
        assert_eq!(got, expected);
    }
}
