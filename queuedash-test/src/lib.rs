//! Test utilities for QueueDash
//!
//! Provides an in-process stand-in for the queue emulator:
//! - `GET /statistics/queues` serving the configured queues as JSON
//! - `POST /` accepting SQS `PurgeQueue` and `DeleteQueue` form requests
//! - request counters and failure injection for both endpoints
//!
//! ## Usage
//!
//! ```rust,no_run
//! use queuedash_test::MockEmulator;
//!
//! #[tokio::test]
//! async fn test_dashboard() {
//!     let emulator = MockEmulator::start().await.unwrap();
//!     emulator.add_queue("orders", 5, 2, 0);
//!
//!     println!("Statistics at: {}", emulator.url());
//! }
//! ```

pub mod emulator;

pub use emulator::{ControlRequest, MockEmulator};
