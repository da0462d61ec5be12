//! Line-oriented terminal front end
//!
//! Redraws the queue table after every poll and every command. Commands are read one
//! line at a time from stdin; destructive ones ask for a typed `yes` first.

use anyhow::Result;
use chrono::{Local, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use queuedash_client::{Confirmation, Dashboard, DashboardView, OperationOutcome};
use queuedash_core::{OperationKind, SortField, SortOrder, TypeFilter};
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  sort <name|type|visible|invisible|total>   sort by column (again to reverse)
  filter <all|standard|fifo|with-messages|favorites>
  search <text>[,<text>...]                  substring match on queue name; empty clears
  fav <queue>                                toggle favorite
  purge <queue>                              remove all messages (asks to confirm)
  delete <queue>                             delete the queue (asks to confirm)
  refresh                                    poll now
  help                                       show or hide this text
  quit                                       exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sort(SortField),
    Filter(TypeFilter),
    Search(String),
    Favorite(String),
    Purge(String),
    Delete(String),
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let queue_name = |command: &str| {
        if rest.is_empty() {
            Err(format!("usage: {} <queue>", command))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "sort" => Command::Sort(rest.parse()?),
        "filter" => Command::Filter(rest.parse()?),
        "search" | "/" => Command::Search(rest.to_string()),
        "fav" | "favorite" => Command::Favorite(queue_name("fav")?),
        "purge" => Command::Purge(queue_name("purge")?),
        "delete" => Command::Delete(queue_name("delete")?),
        "refresh" | "r" => Command::Refresh,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };

    Ok(Some(command))
}

fn header_cell(label: &str, field: Option<SortField>, view: &DashboardView) -> Cell {
    let label = match field {
        Some(field) if field == view.criteria.sort_field => {
            let arrow = match view.criteria.sort_order {
                SortOrder::Ascending => "▲",
                SortOrder::Descending => "▼",
            };
            format!("{} {}", label, arrow)
        }
        _ => label.to_string(),
    };
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn count_cell(value: u64) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// Render one full frame as text
pub fn render_frame(
    view: &DashboardView,
    stale: bool,
    notice: Option<&str>,
    show_help: bool,
) -> String {
    let mut out = String::new();

    let updated = match view.last_update {
        Some(at) => at.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "never".to_string(),
    };
    let _ = writeln!(
        out,
        "queuedash | updated {}{}",
        updated,
        if stale { " (stale)" } else { "" }
    );

    if let Some(error) = &view.poll_error {
        let _ = writeln!(out, "! Statistics unavailable: {}", error);
    }
    if let Some(error) = &view.operation_error {
        let _ = writeln!(out, "! {}", error);
    }

    if view.is_loading {
        let _ = writeln!(out, "Loading queues...");
    } else if view.rows.is_empty() {
        let _ = writeln!(
            out,
            "No queues match ({} in emulator).",
            view.snapshot_queues
        );
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED).set_header(vec![
            header_cell("*", None, view),
            header_cell("Name", Some(SortField::Name), view),
            header_cell("Type", Some(SortField::Type), view),
            header_cell("Visible", Some(SortField::Visible), view),
            header_cell("Invisible", Some(SortField::Invisible), view),
            header_cell("Delayed", None, view),
            header_cell("Total", Some(SortField::Total), view),
            header_cell("Status", None, view),
        ]);

        for row in &view.rows {
            let status = match row.operation {
                Some(kind) => Cell::new(format!("{}...", kind.progress())).fg(Color::Yellow),
                None => Cell::new(""),
            };
            table.add_row(vec![
                Cell::new(if row.favorite { "*" } else { "" }).fg(Color::Yellow),
                Cell::new(&row.record.name),
                Cell::new(row.queue_type),
                count_cell(row.record.statistics.visible()),
                count_cell(row.record.statistics.invisible()),
                count_cell(row.record.statistics.delayed()),
                count_cell(row.total),
                status,
            ]);
        }
        let _ = writeln!(out, "{}", table);
    }

    let summary = &view.summary;
    let _ = writeln!(
        out,
        "{} of {} queues | visible {} | invisible {} | delayed {} | total {}",
        summary.queues,
        view.snapshot_queues,
        summary.visible,
        summary.invisible,
        summary.delayed,
        summary.total()
    );

    let criteria = &view.criteria;
    let _ = write!(out, "filter: {}", criteria.type_filter);
    if !criteria.text_filter.is_empty() {
        let _ = write!(out, " | search: {}", criteria.text_filter);
    }
    let _ = writeln!(out);

    if show_help {
        let _ = writeln!(out, "{}", HELP);
    }
    if let Some(notice) = notice {
        let _ = writeln!(out, "{}", notice);
    }
    out
}

/// Interactive session over stdin and stdout
pub struct Console {
    dashboard: Arc<Dashboard>,
    stale_after: chrono::Duration,
    notice: Option<String>,
    show_help: bool,
}

impl Console {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        let interval = dashboard.poller().interval();
        let stale_after = chrono::Duration::from_std(interval * 3)
            .unwrap_or_else(|_| chrono::Duration::seconds(3));

        Self {
            dashboard,
            stale_after,
            notice: None,
            show_help: false,
        }
    }

    /// Run until `quit` or end of input. Polling stops before this returns.
    pub async fn run(mut self) -> Result<()> {
        let handle = self.dashboard.start();
        let mut updates = self.dashboard.poller().subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.draw()?;

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.draw()?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    self.notice = None;
                    match parse_command(&line) {
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(command)) => self.execute(command, &mut lines).await?,
                        Ok(None) => {}
                        Err(message) => self.notice = Some(message),
                    }
                    self.draw()?;
                }
            }
        }

        handle.shutdown().await;
        Ok(())
    }

    async fn execute(&mut self, command: Command, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
        debug!(?command, "Executing command");

        match command {
            Command::Sort(field) => self.dashboard.toggle_sort(field),
            Command::Filter(filter) => self.dashboard.set_type_filter(filter),
            Command::Search(text) => self.dashboard.set_text_filter(text),
            Command::Favorite(name) => {
                let favorite = self.dashboard.toggle_favorite(&name);
                self.notice = Some(if favorite {
                    format!("Added {} to favorites", name)
                } else {
                    format!("Removed {} from favorites", name)
                });
            }
            Command::Purge(name) => self.destructive(OperationKind::Purge, name, lines).await?,
            Command::Delete(name) => self.destructive(OperationKind::Delete, name, lines).await?,
            Command::Refresh => {
                let poller = self.dashboard.poller().clone();
                tokio::spawn(async move { poller.refresh().await });
            }
            Command::Help => self.show_help = !self.show_help,
            Command::Quit => {}
        }
        Ok(())
    }

    async fn destructive(
        &mut self,
        kind: OperationKind,
        name: String,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Result<()> {
        let operations = self.dashboard.operations();

        if let Some(running) = operations.in_flight(&name) {
            self.notice = Some(format!("{} is busy ({})", name, running.progress()));
            return Ok(());
        }

        let prompt = match kind {
            OperationKind::Purge => format!(
                "Purge all messages from '{}'? This cannot be undone. Type 'yes' to confirm: ",
                name
            ),
            OperationKind::Delete => format!(
                "Delete queue '{}' and all its messages? This cannot be undone. Type 'yes' to confirm: ",
                name
            ),
        };
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let answer = lines.next_line().await?.unwrap_or_default();
        let confirmation = Confirmation::from_answer(&answer);

        if confirmation == Confirmation::Declined {
            if let Ok(OperationOutcome::Declined) = operations.run(kind, &name, confirmation).await {
                self.notice = Some(format!("Cancelled {} of {}", kind.verb(), name));
            }
            return Ok(());
        }

        operations.clear_error();
        tokio::spawn(async move {
            if let Err(e) = operations.run(kind, &name, confirmation).await {
                warn!(queue = %name, error = %e, "Queue operation did not complete");
            }
        });
        Ok(())
    }

    fn draw(&self) -> Result<()> {
        let view = self.dashboard.view();
        let stale = self
            .dashboard
            .poller()
            .is_stale(Utc::now(), self.stale_after);
        let frame = render_frame(&view, stale, self.notice.as_deref(), self.show_help);

        let mut stdout = std::io::stdout().lock();
        write!(stdout, "\x1b[2J\x1b[H{}> ", frame)?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuedash_core::{QueueRecord, QueueStatistics, QueueType, SnapshotSummary, ViewCriteria};
    use queuedash_client::DashboardRow;

    fn row(name: &str, stats: QueueStatistics) -> DashboardRow {
        let record = QueueRecord::new(name, stats);
        DashboardRow {
            queue_type: record.queue_type(),
            total: record.total(),
            favorite: false,
            operation: None,
            record,
        }
    }

    fn view(rows: Vec<DashboardRow>) -> DashboardView {
        let summary = SnapshotSummary::from_records(rows.iter().map(|r| &r.record));
        DashboardView {
            snapshot_queues: rows.len(),
            rows,
            summary,
            criteria: ViewCriteria::default(),
            last_update: None,
            poll_error: None,
            operation_error: None,
            is_loading: false,
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("sort total"),
            Ok(Some(Command::Sort(SortField::Total)))
        );
        assert_eq!(
            parse_command("filter fifo"),
            Ok(Some(Command::Filter(TypeFilter::Fifo)))
        );
        assert_eq!(
            parse_command("search  orders, dlq "),
            Ok(Some(Command::Search("orders, dlq".to_string())))
        );
        assert_eq!(
            parse_command("search"),
            Ok(Some(Command::Search(String::new())))
        );
        assert_eq!(
            parse_command("PURGE orders.fifo"),
            Ok(Some(Command::Purge("orders.fifo".to_string())))
        );
        assert_eq!(parse_command("q"), Ok(Some(Command::Quit)));
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("sort depth").is_err());
        assert!(parse_command("delete").is_err());
        assert!(parse_command("explode orders").is_err());
    }

    #[test]
    fn test_render_rows_and_summary() {
        let mut rows = vec![
            row("orders", QueueStatistics::new(5, 2, 0)),
            row("orders.fifo", QueueStatistics::new(1, 0, 3)),
        ];
        rows[0].favorite = true;
        rows[1].operation = Some(OperationKind::Delete);
        assert_eq!(rows[1].queue_type, QueueType::Fifo);

        let frame = render_frame(&view(rows), false, None, false);

        assert!(frame.contains("orders.fifo"));
        assert!(frame.contains("FIFO"));
        assert!(frame.contains("deleting..."));
        assert!(frame.contains("Name ▲"));
        assert!(frame.contains("2 of 2 queues | visible 6 | invisible 2 | delayed 3 | total 11"));
        assert!(!frame.contains("(stale)"));
    }

    #[test]
    fn test_render_banners() {
        let mut view = view(Vec::new());
        view.poll_error = Some("Statistics request failed with HTTP 500".to_string());
        view.operation_error = Some("Failed to purge orders: boom".to_string());

        let frame = render_frame(&view, true, Some("hello"), true);

        assert!(frame.contains("(stale)"));
        assert!(frame.contains("HTTP 500"));
        assert!(frame.contains("Failed to purge orders"));
        assert!(frame.contains("No queues match"));
        assert!(frame.contains("Commands:"));
        assert!(frame.contains("hello"));
    }

    #[test]
    fn test_render_loading() {
        let mut view = view(Vec::new());
        view.is_loading = true;
        assert!(render_frame(&view, false, None, false).contains("Loading queues"));
    }
}
