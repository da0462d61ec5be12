//! Dashboard state consumed by the presentation layer

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use queuedash_core::{
    project, FavoritesStore, KeyValueStore, OperationKind, QueueRecord, QueueType, SnapshotSummary,
    SortField, TypeFilter, ViewCriteria,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::{ControlSource, StatisticsSource};
use crate::operations::OperationCoordinator;
use crate::poller::{PollHandle, Poller};

/// One rendered table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub record: QueueRecord,
    pub queue_type: QueueType,
    pub total: u64,
    pub favorite: bool,
    /// Operation in flight for this queue; row controls are disabled while set
    pub operation: Option<OperationKind>,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub rows: Vec<DashboardRow>,
    /// Totals over the visible rows
    pub summary: SnapshotSummary,
    /// Queue count in the snapshot before filtering
    pub snapshot_queues: usize,
    pub criteria: ViewCriteria,
    pub last_update: Option<DateTime<Utc>>,
    pub poll_error: Option<String>,
    pub operation_error: Option<String>,
    pub is_loading: bool,
}

pub struct Dashboard {
    poller: Poller,
    operations: Arc<OperationCoordinator>,
    favorites: Mutex<FavoritesStore<Arc<dyn KeyValueStore>>>,
    criteria: RwLock<ViewCriteria>,
}

impl Dashboard {
    pub fn new(
        statistics: Arc<dyn StatisticsSource>,
        control: Arc<dyn ControlSource>,
        favorites: Arc<dyn KeyValueStore>,
        poll_interval: Duration,
    ) -> Self {
        let poller = Poller::new(statistics, poll_interval);
        let operations = Arc::new(OperationCoordinator::new(control, poller.clone()));

        Self {
            poller,
            operations,
            favorites: Mutex::new(FavoritesStore::load(favorites)),
            criteria: RwLock::new(ViewCriteria::default()),
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn operations(&self) -> Arc<OperationCoordinator> {
        self.operations.clone()
    }

    /// Start background polling
    pub fn start(&self) -> PollHandle {
        self.poller.start()
    }

    pub fn criteria(&self) -> ViewCriteria {
        self.criteria.read().clone()
    }

    pub fn toggle_sort(&self, field: SortField) {
        let mut criteria = self.criteria.write();
        criteria.toggle_sort(field);
        debug!(field = %criteria.sort_field, order = %criteria.sort_order, "Sort changed");
    }

    pub fn set_type_filter(&self, filter: TypeFilter) {
        self.criteria.write().type_filter = filter;
    }

    pub fn set_text_filter(&self, text: impl Into<String>) {
        self.criteria.write().text_filter = text.into();
    }

    /// Flip favorite status of `name`; returns the new status
    pub fn toggle_favorite(&self, name: &str) -> bool {
        self.favorites.lock().toggle(name)
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.lock().is_favorite(name)
    }

    pub fn favorite_names(&self) -> Vec<String> {
        self.favorites.lock().names().iter().cloned().collect()
    }

    /// Project the latest snapshot through the current criteria
    pub fn view(&self) -> DashboardView {
        let state = self.poller.state();
        let criteria = self.criteria();
        let in_flight = self.operations.in_flight_snapshot();

        let (records, favorite_names) = {
            let favorites = self.favorites.lock();
            (
                project(&state.snapshot, favorites.names(), &criteria),
                favorites.names().clone(),
            )
        };

        let summary = SnapshotSummary::from_records(&records);
        let rows = records
            .into_iter()
            .map(|record| DashboardRow {
                queue_type: record.queue_type(),
                total: record.total(),
                favorite: favorite_names.contains(&record.name),
                operation: in_flight.get(&record.name).copied(),
                record,
            })
            .collect();

        DashboardView {
            rows,
            summary,
            snapshot_queues: state.snapshot.len(),
            criteria,
            last_update: state.last_update,
            poll_error: state.last_error,
            operation_error: self.operations.last_error(),
            is_loading: state.is_loading,
        }
    }
}
