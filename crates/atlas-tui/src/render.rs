//! Column layout and cell text shared by the watch screen and the one-shot
//! report, plus the plain-text report itself.
//!
//! Everything here is a pure function of its inputs.

use atlas_core::status::TaskStatus;
use chrono::{DateTime, Local, Utc};
use ratatui::layout::{Constraint, Layout, Rect};
use std::time::Duration;

use crate::model::StatusRow;
use crate::style::{status_icon, Theme, ATTENTION_MARKER, STALE_MARKER};

pub const WIDE_THRESHOLD: u16 = 120;
pub const NARROW_THRESHOLD: u16 = 80;
pub const COLUMN_SPACING: u16 = 2;
pub(crate) const GUTTER_WIDTH: u16 = 3;
const STATUS_WIDTH: u16 = 19;
const STEP_WIDTH: u16 = 5;
const PROGRESS_BAR_WIDTH: usize = 8;
const ELLIPSIS: char = '…';
const NO_ACTION: &str = "—";
pub(crate) const NO_WORKSPACES: &str = "No workspaces found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u16,
    /// Zero means unbounded.
    pub height: u16,
    pub color: bool,
    pub quiet: bool,
    pub show_progress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 100,
            height: 0,
            color: false,
            quiet: false,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Marker,
    Workspace,
    Branch,
    Status,
    Step,
    Progress,
    Action,
}

impl Column {
    pub fn header(self, abbreviated: bool) -> &'static str {
        match (self, abbreviated) {
            (Column::Marker, _) => "",
            (Column::Workspace, false) => "WORKSPACE",
            (Column::Workspace, true) => "WS",
            (Column::Branch, false) => "BRANCH",
            (Column::Branch, true) => "BR",
            (Column::Status, false) => "STATUS",
            (Column::Status, true) => "STAT",
            (Column::Step, _) => "STEP",
            (Column::Progress, false) => "PROGRESS",
            (Column::Progress, true) => "PROG",
            (Column::Action, false) => "ACTION",
            (Column::Action, true) => "ACT",
        }
    }
}

/// Resolved column widths for one terminal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub columns: Vec<(Column, u16)>,
    pub abbreviated: bool,
}

impl TableLayout {
    /// Workspace, branch and action flex; at [`WIDE_THRESHOLD`] and above they
    /// share the extra space in proportion to their normal widths.
    pub fn for_width(width: u16, show_progress: bool) -> Self {
        let abbreviated = width < NARROW_THRESHOLD;
        let (workspace, branch, action) = if width >= WIDE_THRESHOLD {
            (Constraint::Fill(12), Constraint::Fill(18), Constraint::Fill(22))
        } else if abbreviated {
            (Constraint::Min(8), Constraint::Fill(1), Constraint::Fill(1))
        } else {
            (Constraint::Length(12), Constraint::Length(18), Constraint::Fill(1))
        };

        let mut wanted = vec![
            (Column::Marker, Constraint::Length(GUTTER_WIDTH)),
            (Column::Workspace, workspace),
            (Column::Branch, branch),
            (Column::Status, Constraint::Length(STATUS_WIDTH)),
            (Column::Step, Constraint::Length(STEP_WIDTH)),
        ];
        if show_progress {
            wanted.push((
                Column::Progress,
                Constraint::Length(PROGRESS_BAR_WIDTH as u16 + 2),
            ));
        }
        wanted.push((Column::Action, action));

        let areas = Layout::horizontal(wanted.iter().map(|(_, constraint)| *constraint))
            .spacing(COLUMN_SPACING)
            .split(Rect::new(0, 0, width, 1));
        let columns = wanted
            .iter()
            .zip(areas.iter())
            .map(|((column, _), area)| (*column, area.width))
            .collect();
        let mut layout = Self {
            columns,
            abbreviated,
        };
        layout.shrink_to(width);
        layout
    }

    /// Below the sum of the fixed widths the solver may give up on spacing;
    /// take the excess out of the columns, least important first.
    fn shrink_to(&mut self, width: u16) {
        let mut overflow = self.total_width().saturating_sub(width);
        for victim in [
            Column::Action,
            Column::Branch,
            Column::Progress,
            Column::Workspace,
            Column::Step,
            Column::Status,
            Column::Marker,
        ] {
            if overflow == 0 {
                break;
            }
            if let Some((_, column_width)) = self
                .columns
                .iter_mut()
                .find(|(column, _)| *column == victim)
            {
                let cut = (*column_width).min(overflow);
                *column_width -= cut;
                overflow -= cut;
            }
        }
    }

    pub fn constraints(&self) -> Vec<Constraint> {
        self.columns
            .iter()
            .map(|(_, width)| Constraint::Length(*width))
            .collect()
    }

    pub fn width_of(&self, column: Column) -> Option<u16> {
        self.columns
            .iter()
            .find(|(candidate, _)| *candidate == column)
            .map(|(_, width)| *width)
    }

    /// Width of a full row including spacing.
    pub fn total_width(&self) -> u16 {
        let gaps = COLUMN_SPACING * (self.columns.len() as u16).saturating_sub(1);
        self.columns.iter().map(|(_, width)| *width).sum::<u16>() + gaps
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .map(|(column, _)| column.header(self.abbreviated))
            .collect()
    }
}

/// Truncate to `width` characters, marking cut text with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Truncate, then right-pad with spaces to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let mut out = truncate(text, width);
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

pub fn step_label(row: &StatusRow) -> String {
    format!("{}/{}", row.current_step, row.total_steps)
}

pub fn progress_bar(row: &StatusRow) -> String {
    let filled = if row.status == TaskStatus::Completed {
        PROGRESS_BAR_WIDTH
    } else if row.total_steps == 0 {
        0
    } else {
        row.current_step.min(row.total_steps) * PROGRESS_BAR_WIDTH / row.total_steps
    };
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// Suggested command for attention rows, the upstream override otherwise.
pub fn action_label(row: &StatusRow) -> String {
    row.status
        .suggested_command(&row.workspace)
        .or_else(|| row.action.clone())
        .unwrap_or_else(|| NO_ACTION.to_string())
}

pub fn marker_label(row: &StatusRow) -> &'static str {
    if row.needs_attention() {
        ATTENTION_MARKER
    } else if row.stale {
        STALE_MARKER
    } else {
        ""
    }
}

pub fn status_label(status: TaskStatus) -> String {
    format!("{} {status}", status_icon(status))
}

/// Full, untruncated text of one cell.
pub fn cell_text(row: &StatusRow, column: Column) -> String {
    match column {
        Column::Marker => marker_label(row).to_string(),
        Column::Workspace => row.workspace.clone(),
        Column::Branch => row.branch.clone(),
        Column::Status => status_label(row.status),
        Column::Step => step_label(row),
        Column::Progress => progress_bar(row),
        Column::Action => action_label(row),
    }
}

/// Counts behind the footer, taken from rows in render order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterSummary {
    pub total: usize,
    pub attention: usize,
    pub stale: usize,
    /// Suggested command of the first attention row.
    pub command: Option<String>,
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

impl FooterSummary {
    pub fn from_rows(rows: &[StatusRow]) -> Self {
        Self {
            total: rows.len(),
            attention: rows.iter().filter(|row| row.needs_attention()).count(),
            stale: rows.iter().filter(|row| row.stale).count(),
            command: rows
                .iter()
                .find_map(|row| row.status.suggested_command(&row.workspace)),
        }
    }

    pub fn count_text(&self) -> String {
        format!(
            "{} {}",
            self.total,
            plural(self.total, "workspace", "workspaces")
        )
    }

    pub fn attention_text(&self) -> Option<String> {
        (self.attention > 0).then(|| {
            format!(
                "{} {} attention",
                self.attention,
                plural(self.attention, "needs", "need")
            )
        })
    }

    pub fn stale_text(&self) -> Option<String> {
        (self.stale > 0).then(|| format!("{} not refreshed", self.stale))
    }
}

/// Footer as text lines: counts, then `Run: <command>` when something needs
/// attention. Each line is cut to `width`.
pub fn render_footer(rows: &[StatusRow], color: bool, width: u16) -> Vec<String> {
    let theme = Theme::new(color);
    let summary = FooterSummary::from_rows(rows);
    let width = usize::from(width);

    let mut plain = summary.count_text();
    let mut styled = plain.clone();
    for (clause, style) in [
        (summary.attention_text(), theme.warning()),
        (summary.stale_text(), theme.dim()),
    ] {
        if let Some(clause) = clause {
            plain = format!("{plain}, {clause}");
            styled = format!("{styled}, {}", theme.ansi(&clause, style));
        }
    }
    let mut lines = vec![if plain.chars().count() > width {
        truncate(&plain, width)
    } else {
        styled
    }];

    if let Some(command) = summary.command {
        let line = format!("Run: {command}");
        lines.push(if line.chars().count() > width {
            truncate(&line, width)
        } else {
            format!("Run: {}", theme.ansi(&command, theme.accent()))
        });
    }
    lines
}

fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

pub const TITLE: &str = "ATLAS WATCH";

/// Text after the title: refresh time and interval.
pub fn title_detail(last_refresh: Option<DateTime<Utc>>, interval: Duration) -> String {
    let refreshed = match last_refresh {
        Some(at) => format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
        None => "loading…".to_string(),
    };
    format!("· {refreshed} · every {}", format_interval(interval))
}

pub fn error_text(error: &str) -> String {
    format!("⚠ refresh failed: {error}")
}

pub fn more_text(hidden: usize) -> String {
    format!("… {hidden} more")
}

/// Inputs of one watch frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub rows: &'a [StatusRow],
    pub last_refresh: Option<DateTime<Utc>>,
    pub error: Option<&'a str>,
    pub interval: Duration,
}

/// Rows that fit in `capacity` lines, and how many are left out. When rows
/// are hidden the last line is kept for the `… N more` note.
pub fn visible_rows(total: usize, capacity: usize) -> (usize, Option<usize>) {
    if total <= capacity {
        (total, None)
    } else {
        let shown = capacity.saturating_sub(1);
        (shown, Some(total - shown))
    }
}

fn text_row(cells: Vec<String>) -> String {
    cells.join(&" ".repeat(usize::from(COLUMN_SPACING)))
        .trim_end()
        .to_string()
}

/// Header line plus one line per row, in the given order.
pub fn render_table(rows: &[StatusRow], options: &RenderOptions) -> Vec<String> {
    let layout = TableLayout::for_width(options.width, options.show_progress);
    let theme = Theme::new(options.color);

    let header = layout
        .columns
        .iter()
        .map(|(column, width)| fit(column.header(layout.abbreviated), usize::from(*width)))
        .collect();
    let mut lines = vec![theme.ansi(&text_row(header), theme.header())];
    if rows.is_empty() {
        let indent = usize::from(GUTTER_WIDTH + COLUMN_SPACING);
        let note = truncate(
            NO_WORKSPACES,
            usize::from(options.width).saturating_sub(indent),
        );
        lines.push(format!("{}{}", " ".repeat(indent), theme.ansi(&note, theme.dim())));
        return lines;
    }

    for row in rows {
        let cells: Vec<String> = layout
            .columns
            .iter()
            .map(|(column, width)| {
                let text = fit(&cell_text(row, *column), usize::from(*width));
                let style = match column {
                    Column::Marker | Column::Status => theme.status(row.status),
                    Column::Branch => theme.dim(),
                    Column::Action if row.needs_attention() => theme.accent(),
                    Column::Action => theme.dim(),
                    _ => ratatui::style::Style::default(),
                };
                theme.ansi(&text, style)
            })
            .collect();
        lines.push(text_row(cells));
    }
    lines
}

/// One-shot report: table and footer, no title or key hints.
pub fn render_report(rows: &[StatusRow], options: &RenderOptions) -> String {
    let mut lines = render_table(rows, options);
    lines.push(String::new());
    lines.extend(render_footer(rows, options.color, options.width));
    lines.join("\n")
}
