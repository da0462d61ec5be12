//! Runtime side of QueueDash
//!
//! Talks to the queue emulator and keeps the dashboard state current:
//! - [`EmulatorClient`] for the statistics and SQS control endpoints
//! - [`Poller`] for periodic statistics refresh
//! - [`OperationCoordinator`] for purge and delete
//! - [`Dashboard`] tying those to favorites and view criteria

pub mod client;
pub mod dashboard;
pub mod operations;
pub mod poller;

pub use client::{ControlSource, EmulatorClient, EndpointConfig, StatisticsSource};
pub use dashboard::{Dashboard, DashboardRow, DashboardView};
pub use operations::{Confirmation, OperationCoordinator, OperationOutcome};
pub use poller::{PollHandle, PollState, Poller};

/// SQS API version sent with every control request
pub const SQS_API_VERSION: &str = "2012-11-05";

/// Account segment of queue URLs on the local emulator
pub const DEFAULT_ACCOUNT_ID: &str = "000000000000";
