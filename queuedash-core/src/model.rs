//! Queue records as reported by the emulator's statistics endpoint

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time message counts for one queue.
///
/// The emulator reports these as approximations; nothing here treats them as exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatistics {
    pub approximate_number_of_visible_messages: u64,
    pub approximate_number_of_invisible_messages: u64,
    pub approximate_number_of_messages_delayed: u64,
}

impl QueueStatistics {
    pub fn new(visible: u64, invisible: u64, delayed: u64) -> Self {
        Self {
            approximate_number_of_visible_messages: visible,
            approximate_number_of_invisible_messages: invisible,
            approximate_number_of_messages_delayed: delayed,
        }
    }

    pub fn visible(&self) -> u64 {
        self.approximate_number_of_visible_messages
    }

    pub fn invisible(&self) -> u64 {
        self.approximate_number_of_invisible_messages
    }

    pub fn delayed(&self) -> u64 {
        self.approximate_number_of_messages_delayed
    }

    pub fn total(&self) -> u64 {
        self.visible()
            .saturating_add(self.invisible())
            .saturating_add(self.delayed())
    }
}

/// Queue flavour derived from the queue name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Standard,
    Fifo,
}

impl QueueType {
    /// FIFO when the name contains `.fifo`, ignoring case.
    pub fn from_name(name: &str) -> Self {
        if name.to_lowercase().contains(".fifo") {
            Self::Fifo
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Fifo => "FIFO",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destructive operation that can be in flight for a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Purge,
    Delete,
}

impl OperationKind {
    /// SQS `Action` parameter for this operation
    pub fn action(&self) -> &'static str {
        match self {
            Self::Purge => "PurgeQueue",
            Self::Delete => "DeleteQueue",
        }
    }

    /// Progress label shown next to a busy row
    pub fn progress(&self) -> &'static str {
        match self {
            Self::Purge => "purging",
            Self::Delete => "deleting",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Purge => "purge",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.progress())
    }
}

/// One queue and its statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub name: String,
    pub statistics: QueueStatistics,
}

impl QueueRecord {
    pub fn new(name: impl Into<String>, statistics: QueueStatistics) -> Self {
        Self {
            name: name.into(),
            statistics,
        }
    }

    pub fn queue_type(&self) -> QueueType {
        QueueType::from_name(&self.name)
    }

    pub fn total(&self) -> u64 {
        self.statistics.total()
    }
}

/// Ordered set of queue records from a single successful poll.
///
/// A snapshot is never patched; each successful poll replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<QueueRecord>,
}

impl Snapshot {
    /// Build a snapshot, dropping records without a name.
    pub fn new(records: Vec<QueueRecord>) -> Self {
        let before = records.len();
        let records: Vec<QueueRecord> = records
            .into_iter()
            .filter(|r| !r.name.is_empty())
            .collect();

        if records.len() != before {
            tracing::warn!(
                dropped = before - records.len(),
                "Ignoring queue records with an empty name"
            );
        }

        Self { records }
    }

    /// Decode the JSON array returned by the statistics endpoint
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let records: Vec<QueueRecord> = serde_json::from_slice(body)?;
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[QueueRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&QueueRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary::from_records(&self.records)
    }
}

/// Aggregate counts over a set of queue records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub queues: usize,
    pub visible: u64,
    pub invisible: u64,
    pub delayed: u64,
}

impl SnapshotSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QueueRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, record| {
            acc.queues += 1;
            acc.visible = acc.visible.saturating_add(record.statistics.visible());
            acc.invisible = acc.invisible.saturating_add(record.statistics.invisible());
            acc.delayed = acc.delayed.saturating_add(record.statistics.delayed());
            acc
        })
    }

    pub fn total(&self) -> u64 {
        self.visible
            .saturating_add(self.invisible)
            .saturating_add(self.delayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_statistics_response() {
        let body = br#"[
            {"name":"orders","statistics":{"approximateNumberOfVisibleMessages":5,"approximateNumberOfInvisibleMessages":2,"approximateNumberOfMessagesDelayed":0}},
            {"name":"orders.fifo","statistics":{"approximateNumberOfVisibleMessages":1,"approximateNumberOfInvisibleMessages":0,"approximateNumberOfMessagesDelayed":3}}
        ]"#;

        let snapshot = Snapshot::from_json(body).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records()[0].name, "orders");
        assert_eq!(snapshot.records()[0].total(), 7);
        assert_eq!(snapshot.records()[1].total(), 4);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(Snapshot::from_json(br#"{"name":"orders"}"#).is_err());
    }

    #[test]
    fn test_queue_type_is_case_insensitive() {
        assert_eq!(QueueType::from_name("orders.fifo"), QueueType::Fifo);
        assert_eq!(QueueType::from_name("Orders.FIFO"), QueueType::Fifo);
        assert_eq!(QueueType::from_name("my.fifo.dlq"), QueueType::Fifo);
        assert_eq!(QueueType::from_name("fifo-orders"), QueueType::Standard);
    }

    #[test]
    fn test_empty_names_are_dropped() {
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("", QueueStatistics::default()),
            QueueRecord::new("jobs", QueueStatistics::default()),
        ]);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("jobs").is_some());
    }

    #[test]
    fn test_summary() {
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("a", QueueStatistics::new(1, 2, 3)),
            QueueRecord::new("b", QueueStatistics::new(10, 0, 0)),
        ]);
        let summary = snapshot.summary();
        assert_eq!(summary.queues, 2);
        assert_eq!(summary.visible, 11);
        assert_eq!(summary.total(), 16);
    }
}
