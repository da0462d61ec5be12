//! Purge and delete against the control endpoint
//!
//! The in-flight map is advisory: it lets the presentation layer disable a row's
//! controls and rejects a second request for the same queue, but does not queue work.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use queuedash_core::{OperationError, OperationKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::ControlSource;
use crate::poller::Poller;

/// Operator answer to the "this cannot be undone" prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Self::Confirmed,
            _ => Self::Declined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Operator declined; nothing was sent
    Declined,
    /// Emulator accepted the request and a refresh has run
    Completed,
}

/// Runs destructive queue operations, one at a time per queue
pub struct OperationCoordinator {
    control: Arc<dyn ControlSource>,
    poller: Poller,
    in_flight: DashMap<String, OperationKind>,
    last_error: RwLock<Option<String>>,
}

impl OperationCoordinator {
    pub fn new(control: Arc<dyn ControlSource>, poller: Poller) -> Self {
        Self {
            control,
            poller,
            in_flight: DashMap::new(),
            last_error: RwLock::new(None),
        }
    }

    pub async fn purge(
        &self,
        queue_name: &str,
        confirmation: Confirmation,
    ) -> Result<OperationOutcome, OperationError> {
        self.run(OperationKind::Purge, queue_name, confirmation).await
    }

    pub async fn delete(
        &self,
        queue_name: &str,
        confirmation: Confirmation,
    ) -> Result<OperationOutcome, OperationError> {
        self.run(OperationKind::Delete, queue_name, confirmation).await
    }

    /// Operation currently running for `queue_name`, if any
    pub fn in_flight(&self, queue_name: &str) -> Option<OperationKind> {
        self.in_flight.get(queue_name).map(|entry| *entry.value())
    }

    pub fn in_flight_snapshot(&self) -> BTreeMap<String, OperationKind> {
        self.in_flight
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Message of the most recent failed operation
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    pub async fn run(
        &self,
        kind: OperationKind,
        queue_name: &str,
        confirmation: Confirmation,
    ) -> Result<OperationOutcome, OperationError> {
        if queue_name.is_empty() {
            return Err(OperationError::InvalidQueueName);
        }

        if let Some(running) = self.in_flight(queue_name) {
            return Err(OperationError::InFlight {
                name: queue_name.to_string(),
                kind: running,
            });
        }

        if confirmation == Confirmation::Declined {
            info!(queue = %queue_name, operation = kind.verb(), "Operation declined");
            return Ok(OperationOutcome::Declined);
        }

        let marker = self.mark(kind, queue_name)?;
        info!(queue = %queue_name, operation = kind.verb(), "Starting operation");

        let result = self.control.run_operation(kind, queue_name).await;
        // Clears when the call settles, not after the refresh
        drop(marker);

        match result {
            Ok(()) => {
                info!(queue = %queue_name, operation = kind.verb(), "Operation completed");
                self.poller.refresh().await;
                Ok(OperationOutcome::Completed)
            }
            Err(e) => {
                warn!(queue = %queue_name, operation = kind.verb(), error = %e, "Operation failed");
                *self.last_error.write() =
                    Some(format!("Failed to {} {}: {}", kind.verb(), queue_name, e));
                Err(e)
            }
        }
    }

    fn mark(
        &self,
        kind: OperationKind,
        queue_name: &str,
    ) -> Result<InFlightMarker<'_>, OperationError> {
        match self.in_flight.entry(queue_name.to_string()) {
            Entry::Occupied(entry) => Err(OperationError::InFlight {
                name: queue_name.to_string(),
                kind: *entry.get(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(kind);
                Ok(InFlightMarker {
                    map: &self.in_flight,
                    name: queue_name.to_string(),
                })
            }
        }
    }
}

/// Removes the in-flight entry when the operation settles, however it settles
struct InFlightMarker<'a> {
    map: &'a DashMap<String, OperationKind>,
    name: String,
}

impl Drop for InFlightMarker<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.name);
    }
}
