//! Async synchronization primitives for compio runtime
//!
//! - [`Semaphore`] - Async semaphore for bounding concurrency
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::Semaphore;
//!
//! #[compio::main]
//! async fn main() {
//!     let sem = Semaphore::new(8);
//!
//!     // Spawn many tasks, but only 8 hold a permit at once
//!     let mut handles = Vec::new();
//!     for i in 0..100 {
//!         let sem = sem.clone();
//!         handles.push(compio::runtime::spawn(async move {
//!             let _permit = sem.acquire().await;
//!             i
//!         }));
//!     }
//!     for handle in handles {
//!         let _ = handle.await;
//!     }
//! }
//! ```

mod semaphore;

pub use semaphore::{Semaphore, SemaphorePermit};
