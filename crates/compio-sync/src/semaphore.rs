//! Async semaphore for compio runtime
//!
//! Bounds how many entries are materialized at once during a tree sync. Tasks
//! that find no permit park their waker in a FIFO queue and are woken one at
//! a time as permits come back.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// A compio-compatible async semaphore for bounding concurrency
///
/// Cloning is cheap and every clone shares the same permit pool.
///
/// # Example
///
/// ```rust,no_run
/// use compio_sync::Semaphore;
///
/// # async fn example() {
/// let sem = Semaphore::new(4);
/// let permit = sem.acquire().await;
/// // at most four holders at a time
/// drop(permit);
/// # }
/// ```
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreInner>,
}

struct SemaphoreInner {
    /// Permits currently available
    permits: AtomicUsize,
    /// Tasks waiting for a permit, oldest first
    waiters: Mutex<VecDeque<Waker>>,
}

impl Semaphore {
    /// Create a new semaphore with the given number of permits
    ///
    /// # Panics
    ///
    /// Panics if `permits` is 0 (semaphore must have at least one permit)
    #[must_use]
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "Semaphore must have at least one permit");
        Self {
            inner: Arc::new(SemaphoreInner {
                permits: AtomicUsize::new(permits),
                waiters: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Acquire a permit, waiting asynchronously if none are available
    pub async fn acquire(&self) -> SemaphorePermit {
        Acquire {
            semaphore: self.clone(),
        }
        .await
    }

    /// Try to acquire a permit without waiting
    #[must_use]
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        self.inner
            .permits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|_| SemaphorePermit {
                semaphore: self.clone(),
            })
    }

    /// Number of permits available right now (monitoring only)
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.inner.permits.fetch_add(1, Ordering::Release);
        if let Ok(mut waiters) = self.inner.waiters.lock() {
            if let Some(waker) = waiters.pop_front() {
                waker.wake();
            }
        }
    }

    fn park(&self, waker: Waker) {
        if let Ok(mut waiters) = self.inner.waiters.lock() {
            waiters.push_back(waker);
        }
    }
}

/// RAII guard that returns its permit to the semaphore on drop
pub struct SemaphorePermit {
    semaphore: Semaphore,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

struct Acquire {
    semaphore: Semaphore,
}

impl Future for Acquire {
    type Output = SemaphorePermit;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(permit) = self.semaphore.try_acquire() {
            return Poll::Ready(permit);
        }

        self.semaphore.park(cx.waker().clone());

        // A permit may have been released between the failed attempt and parking.
        match self.semaphore.try_acquire() {
            Some(permit) => Poll::Ready(permit),
            None => Poll::Pending,
        }
    }
}
