//! Terminal rendering for calverge-core types.
//!
//! Extension traits that add colored output to core types using owo_colors.

use calverge_core::calendar::CalendarRef;
use calverge_core::orchestrator::{SourceReport, SourceStatus, StatusReport, SyncReport};
use calverge_core::reconcile::EventFailure;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarRef {
    fn render(&self) -> String {
        let access = if self.writable {
            "read/write".green().to_string()
        } else {
            "read-only".yellow().to_string()
        };

        format!(
            "📅 {} {} {}",
            self.title.bold(),
            format!("({})", self.id).dimmed(),
            access
        )
    }
}

impl Render for EventFailure {
    fn render(&self) -> String {
        format!("   {} {}", "!".red(), self.to_string().red())
    }
}

impl Render for SourceReport {
    fn render(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{} {}: {}", "✗".red(), self.calendar.title, error.red());
        }

        let mut lines = vec![format!(
            "{} {}: {} synced, {} cleaned",
            "✓".green(),
            self.calendar.title,
            self.synced,
            self.cleaned
        )];
        lines.extend(self.failures.iter().map(Render::render));
        lines.join("\n")
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = vec![
            format!("{} → {}", self.config_name.bold(), self.target.title),
            format!("   Mode: {}", self.mode.description()).dimmed().to_string(),
        ];

        lines.extend(self.sources.iter().map(|s| format!("   {}", s.render())));
        lines.extend(render_skipped(&self.skipped_sources));

        if self.cancelled {
            lines.push(
                "   Cancelled; remaining sources were not synced"
                    .yellow()
                    .to_string(),
            );
        }

        let failures = self.failures().count();
        let mut totals = format!(
            "\nTotal: {} synced, {} cleaned",
            self.total_synced, self.total_cleaned
        );
        if failures > 0 {
            totals.push_str(&format!(", {}", pluralize(failures, "failure").red()));
        }
        lines.push(totals);

        lines.join("\n")
    }
}

impl Render for SourceStatus {
    fn render(&self) -> String {
        let line = format!(
            "{}: {} to remove, {} to copy",
            self.calendar.title,
            self.synced_artifacts.red(),
            self.pending_events.green()
        );

        match &self.last_sync {
            Some(tag) => {
                let last = format!(
                    "(last synced {} by {})",
                    tag.synced_at.format("%Y-%m-%d %H:%M UTC"),
                    tag.config_name
                );
                format!("{} {}", line, last.dimmed())
            }
            None => line,
        }
    }
}

impl Render for StatusReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "{} → {} {}",
            self.config_name.bold(),
            self.target.title,
            format!("[{}]", self.mode).dimmed()
        )];

        if self.sources.is_empty() {
            lines.push("   Nothing to sync".dimmed().to_string());
        }
        lines.extend(self.sources.iter().map(|s| format!("   {}", s.render())));
        lines.extend(render_skipped(&self.skipped_sources));

        lines.join("\n")
    }
}

fn render_skipped(skipped: &[String]) -> Vec<String> {
    skipped
        .iter()
        .map(|id| format!("   {} {}", "Skipped".yellow(), id.dimmed()))
        .collect()
}

fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}
