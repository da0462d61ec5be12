//! Sorted and filtered views over a snapshot
//!
//! [`project`] is pure: the same snapshot, favorites and criteria always give the same
//! ordered output. Sorting happens here at render time, never on the stored snapshot.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use icu_collator::{Collator, CollatorOptions, Strength};
use tracing::warn;

use crate::model::{QueueRecord, QueueType, Snapshot};

/// Column a view can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Name,
    Type,
    Visible,
    Invisible,
    Total,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        Self::Name,
        Self::Type,
        Self::Visible,
        Self::Invisible,
        Self::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::Visible => "visible",
            Self::Invisible => "invisible",
            Self::Total => "total",
        }
    }

    fn compare(self, collation: &Collation, a: &QueueRecord, b: &QueueRecord) -> Ordering {
        match self {
            Self::Name => collation.compare(&a.name, &b.name),
            Self::Type => collation.compare(a.queue_type().as_str(), b.queue_type().as_str()),
            Self::Visible => a.statistics.visible().cmp(&b.statistics.visible()),
            Self::Invisible => a.statistics.invisible().cmp(&b.statistics.invisible()),
            Self::Total => a.total().cmp(&b.total()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "type" => Ok(Self::Type),
            "visible" => Ok(Self::Visible),
            "invisible" => Ok(Self::Invisible),
            "total" => Ok(Self::Total),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Coarse filter applied before the text filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    All,
    Standard,
    Fifo,
    WithMessages,
    Favorites,
}

impl TypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Standard => "standard",
            Self::Fifo => "fifo",
            Self::WithMessages => "with-messages",
            Self::Favorites => "favorites",
        }
    }

    fn keeps(self, record: &QueueRecord, favorites: &BTreeSet<String>) -> bool {
        match self {
            Self::All => true,
            Self::Standard => record.queue_type() == QueueType::Standard,
            Self::Fifo => record.queue_type() == QueueType::Fifo,
            Self::WithMessages => record.total() > 0,
            Self::Favorites => favorites.contains(&record.name),
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "standard" => Ok(Self::Standard),
            "fifo" => Ok(Self::Fifo),
            "with-messages" | "withmessages" | "messages" => Ok(Self::WithMessages),
            "favorites" | "favourites" | "fav" => Ok(Self::Favorites),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

/// Operator-selected sort and filter state. Session-only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCriteria {
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub type_filter: TypeFilter,
    pub text_filter: String,
}

impl Default for ViewCriteria {
    fn default() -> Self {
        Self {
            sort_field: SortField::Name,
            sort_order: SortOrder::Ascending,
            type_filter: TypeFilter::All,
            text_filter: String::new(),
        }
    }
}

impl ViewCriteria {
    /// Column-header click: the active column flips direction, any other column
    /// becomes active in descending order.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_order = self.sort_order.reversed();
        } else {
            self.sort_field = field;
            self.sort_order = SortOrder::Descending;
        }
    }
}

/// Split a comma separated filter into trimmed, lower-cased, non-empty terms
pub fn parse_text_filter(text: &str) -> Vec<String> {
    text.split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Derive the ordered view of `snapshot` for the given criteria.
///
/// Type filter runs first, then the text filter (any term matches), then a stable sort.
pub fn project(
    snapshot: &Snapshot,
    favorites: &BTreeSet<String>,
    criteria: &ViewCriteria,
) -> Vec<QueueRecord> {
    let terms = parse_text_filter(&criteria.text_filter);
    let collation = Collation::root();

    let mut rows: Vec<QueueRecord> = snapshot
        .records()
        .iter()
        .filter(|record| criteria.type_filter.keeps(record, favorites))
        .filter(|record| matches_terms(&record.name, &terms))
        .cloned()
        .collect();

    // slice::sort_by is stable, so ties keep snapshot order in both directions
    rows.sort_by(|a, b| {
        let ordering = criteria.sort_field.compare(&collation, a, b);
        match criteria.sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    rows
}

fn matches_terms(name: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let name = name.to_lowercase();
    terms.iter().any(|term| name.contains(term.as_str()))
}

/// Case-insensitive text ordering under the root locale's collation rules
struct Collation {
    collator: Option<Collator>,
}

impl Collation {
    fn root() -> Self {
        // Secondary strength: accents count, letter case does not
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Secondary);

        let collator = match Collator::try_new(&Default::default(), options) {
            Ok(collator) => Some(collator),
            Err(e) => {
                warn!(error = ?e, "Collator unavailable, sorting by lower-cased code point");
                None
            }
        };
        Self { collator }
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QueueStatistics;

    fn orders_snapshot() -> Snapshot {
        Snapshot::new(vec![
            QueueRecord::new("orders", QueueStatistics::new(5, 2, 0)),
            QueueRecord::new("orders.fifo", QueueStatistics::new(1, 0, 3)),
        ])
    }

    fn mixed_snapshot() -> Snapshot {
        Snapshot::new(vec![
            QueueRecord::new("billing", QueueStatistics::new(0, 0, 0)),
            QueueRecord::new("Alerts", QueueStatistics::new(3, 0, 0)),
            QueueRecord::new("audit.fifo", QueueStatistics::new(3, 1, 0)),
            QueueRecord::new("batch", QueueStatistics::new(9, 0, 2)),
            QueueRecord::new("zeta", QueueStatistics::new(3, 0, 0)),
        ])
    }

    fn names(rows: &[QueueRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    fn criteria(field: SortField, order: SortOrder) -> ViewCriteria {
        ViewCriteria {
            sort_field: field,
            sort_order: order,
            ..ViewCriteria::default()
        }
    }

    #[test]
    fn test_sort_by_total_descending() {
        let rows = project(
            &orders_snapshot(),
            &BTreeSet::new(),
            &criteria(SortField::Total, SortOrder::Descending),
        );
        assert_eq!(names(&rows), vec!["orders", "orders.fifo"]);
    }

    #[test]
    fn test_fifo_filter() {
        let view = ViewCriteria {
            type_filter: TypeFilter::Fifo,
            ..ViewCriteria::default()
        };
        let rows = project(&orders_snapshot(), &BTreeSet::new(), &view);
        assert_eq!(names(&rows), vec!["orders.fifo"]);
    }

    #[test]
    fn test_standard_filter() {
        let view = ViewCriteria {
            type_filter: TypeFilter::Standard,
            ..ViewCriteria::default()
        };
        let rows = project(&mixed_snapshot(), &BTreeSet::new(), &view);
        assert!(!names(&rows).contains(&"audit.fifo"));
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_with_messages_filter() {
        let view = ViewCriteria {
            type_filter: TypeFilter::WithMessages,
            ..ViewCriteria::default()
        };
        let rows = project(&mixed_snapshot(), &BTreeSet::new(), &view);
        assert!(!names(&rows).contains(&"billing"));
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_favorites_filter_ignores_unknown_names() {
        let favorites: BTreeSet<String> = ["zeta".to_string(), "gone".to_string()].into();
        let view = ViewCriteria {
            type_filter: TypeFilter::Favorites,
            ..ViewCriteria::default()
        };
        let rows = project(&mixed_snapshot(), &favorites, &view);
        assert_eq!(names(&rows), vec!["zeta"]);
    }

    #[test]
    fn test_text_filter_matches_any_term() {
        let view = ViewCriteria {
            text_filter: "a, B".to_string(),
            ..ViewCriteria::default()
        };
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("cat", QueueStatistics::default()),
            QueueRecord::new("Bob", QueueStatistics::default()),
            QueueRecord::new("xyz", QueueStatistics::default()),
        ]);
        let rows = project(&snapshot, &BTreeSet::new(), &view);
        assert_eq!(names(&rows), vec!["Bob", "cat"]);
    }

    #[test]
    fn test_blank_text_filter_is_noop() {
        for text in ["", "   ", " , ,"] {
            let view = ViewCriteria {
                text_filter: text.to_string(),
                type_filter: TypeFilter::WithMessages,
                ..ViewCriteria::default()
            };
            let rows = project(&mixed_snapshot(), &BTreeSet::new(), &view);
            assert_eq!(rows.len(), 4, "filter {:?}", text);
        }
    }

    #[test]
    fn test_text_filter_applies_after_type_filter() {
        let view = ViewCriteria {
            text_filter: "a".to_string(),
            type_filter: TypeFilter::Fifo,
            ..ViewCriteria::default()
        };
        let rows = project(&mixed_snapshot(), &BTreeSet::new(), &view);
        assert_eq!(names(&rows), vec!["audit.fifo"]);
    }

    #[test]
    fn test_name_sort_ignores_case() {
        let rows = project(
            &mixed_snapshot(),
            &BTreeSet::new(),
            &criteria(SortField::Name, SortOrder::Ascending),
        );
        assert_eq!(
            names(&rows),
            vec!["Alerts", "audit.fifo", "batch", "billing", "zeta"]
        );
    }

    #[test]
    fn test_name_sort_uses_collation_order() {
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("jobs1", QueueStatistics::default()),
            QueueRecord::new("jobs-a", QueueStatistics::default()),
            QueueRecord::new("jobs_a", QueueStatistics::default()),
        ]);

        let asc = project(
            &snapshot,
            &BTreeSet::new(),
            &criteria(SortField::Name, SortOrder::Ascending),
        );
        assert_eq!(names(&asc), vec!["jobs_a", "jobs-a", "jobs1"]);

        let desc = project(
            &snapshot,
            &BTreeSet::new(),
            &criteria(SortField::Name, SortOrder::Descending),
        );
        assert_eq!(names(&desc), vec!["jobs1", "jobs-a", "jobs_a"]);
    }

    #[test]
    fn test_names_differing_only_in_case_keep_snapshot_order() {
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("orders", QueueStatistics::default()),
            QueueRecord::new("ORDERS", QueueStatistics::default()),
            QueueRecord::new("Orders", QueueStatistics::default()),
        ]);
        let rows = project(
            &snapshot,
            &BTreeSet::new(),
            &criteria(SortField::Name, SortOrder::Ascending),
        );
        assert_eq!(names(&rows), vec!["orders", "ORDERS", "Orders"]);
    }

    #[test]
    fn test_ties_keep_snapshot_order() {
        // Alerts, audit.fifo and zeta all have 3 visible
        let asc = project(
            &mixed_snapshot(),
            &BTreeSet::new(),
            &criteria(SortField::Visible, SortOrder::Ascending),
        );
        assert_eq!(
            names(&asc),
            vec!["billing", "Alerts", "audit.fifo", "zeta", "batch"]
        );

        let desc = project(
            &mixed_snapshot(),
            &BTreeSet::new(),
            &criteria(SortField::Visible, SortOrder::Descending),
        );
        assert_eq!(
            names(&desc),
            vec!["batch", "Alerts", "audit.fifo", "zeta", "billing"]
        );
    }

    #[test]
    fn test_type_sort_groups_fifo_first_ascending() {
        let rows = project(
            &mixed_snapshot(),
            &BTreeSet::new(),
            &criteria(SortField::Type, SortOrder::Ascending),
        );
        assert_eq!(rows[0].name, "audit.fifo");
    }

    #[test]
    fn test_projection_is_deterministic() {
        let favorites: BTreeSet<String> = ["batch".to_string()].into();
        for field in SortField::ALL {
            for order in [SortOrder::Ascending, SortOrder::Descending] {
                let view = criteria(field, order);
                let first = project(&mixed_snapshot(), &favorites, &view);
                let second = project(&mixed_snapshot(), &favorites, &view);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_toggle_same_field_reverses_distinct_values() {
        let snapshot = Snapshot::new(vec![
            QueueRecord::new("b", QueueStatistics::new(2, 0, 0)),
            QueueRecord::new("c", QueueStatistics::new(7, 0, 0)),
            QueueRecord::new("a", QueueStatistics::new(4, 0, 0)),
        ]);
        let mut view = ViewCriteria::default();

        view.toggle_sort(SortField::Visible);
        let first = project(&snapshot, &BTreeSet::new(), &view);
        view.toggle_sort(SortField::Visible);
        let second = project(&snapshot, &BTreeSet::new(), &view);

        let mut reversed = first.clone();
        reversed.reverse();
        assert_eq!(second, reversed);
        assert_eq!(first.len(), snapshot.len());
    }

    #[test]
    fn test_toggle_sort_rules() {
        let mut view = ViewCriteria::default();
        assert_eq!(view.sort_field, SortField::Name);
        assert_eq!(view.sort_order, SortOrder::Ascending);

        view.toggle_sort(SortField::Name);
        assert_eq!(view.sort_order, SortOrder::Descending);

        view.toggle_sort(SortField::Total);
        assert_eq!(view.sort_field, SortField::Total);
        assert_eq!(view.sort_order, SortOrder::Descending);

        view.toggle_sort(SortField::Total);
        assert_eq!(view.sort_order, SortOrder::Ascending);
    }

    #[test]
    fn test_parse_text_filter() {
        assert_eq!(parse_text_filter(" Foo ,bar,, "), vec!["foo", "bar"]);
        assert!(parse_text_filter("  ").is_empty());
    }

    #[test]
    fn test_parse_criteria_names() {
        assert_eq!("Total".parse::<SortField>().unwrap(), SortField::Total);
        assert_eq!(
            "with-messages".parse::<TypeFilter>().unwrap(),
            TypeFilter::WithMessages
        );
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("size".parse::<SortField>().is_err());
    }
}
