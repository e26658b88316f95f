//! Watch screen drawn with ratatui.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table};
use ratatui::Frame;

use crate::model::StatusRow;
use crate::render::{
    cell_text, error_text, more_text, title_detail, truncate, visible_rows, Column,
    FooterSummary, FrameView, RenderOptions, TableLayout, COLUMN_SPACING, GUTTER_WIDTH,
    NO_WORKSPACES, TITLE,
};
use crate::style::Theme;

const KEY_HINT: &str = "q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Error,
    Gap,
    Table,
    Footer,
    Hint,
}

/// The part of `screen` the frame may use: the last known terminal size,
/// never more than the backend offers.
fn watch_area(screen: Rect, options: &RenderOptions) -> Rect {
    let height = if options.height == 0 {
        screen.height
    } else {
        options.height.min(screen.height)
    };
    Rect::new(screen.x, screen.y, options.width.min(screen.width), height)
}

fn sections(
    view: &FrameView<'_>,
    options: &RenderOptions,
    footer_lines: u16,
) -> Vec<(Section, Constraint)> {
    let mut sections = Vec::new();
    if !options.quiet {
        sections.push((Section::Title, Constraint::Length(1)));
    }
    if view.error.is_some() {
        sections.push((Section::Error, Constraint::Length(1)));
    }
    if !options.quiet {
        sections.push((Section::Gap, Constraint::Length(1)));
    }
    sections.push((Section::Table, Constraint::Min(1)));
    if !options.quiet {
        sections.push((Section::Gap, Constraint::Length(1)));
        sections.push((Section::Footer, Constraint::Length(footer_lines)));
        sections.push((Section::Hint, Constraint::Length(1)));
    }
    sections
}

pub fn draw_watch(frame: &mut Frame<'_>, view: &FrameView<'_>, options: &RenderOptions) {
    let area = watch_area(frame.area(), options);
    let theme = Theme::new(options.color);
    let footer = footer_lines(view.rows, &theme, area.width);
    let sections = sections(view, options, footer.len() as u16);
    let areas = Layout::vertical(sections.iter().map(|(_, constraint)| *constraint)).split(area);

    for ((section, _), rect) in sections.iter().zip(areas.iter()) {
        match section {
            Section::Title => {
                let line = Line::from(vec![
                    Span::styled(TITLE, theme.accent()),
                    Span::raw(" "),
                    Span::styled(title_detail(view.last_refresh, view.interval), theme.dim()),
                ]);
                frame.render_widget(Paragraph::new(line), *rect);
            }
            Section::Error => {
                let error = error_text(view.error.unwrap_or_default());
                let text = truncate(&error, usize::from(rect.width));
                frame.render_widget(Paragraph::new(Span::styled(text, theme.error())), *rect);
            }
            Section::Gap => {}
            Section::Table => draw_table(frame, *rect, view.rows, options, &theme),
            Section::Footer => frame.render_widget(Paragraph::new(footer.clone()), *rect),
            Section::Hint => {
                frame.render_widget(Paragraph::new(Span::styled(KEY_HINT, theme.dim())), *rect);
            }
        }
    }
}

fn cell_style(row: &StatusRow, column: Column, theme: &Theme) -> Style {
    match column {
        Column::Marker | Column::Status => theme.status(row.status),
        Column::Branch => theme.dim(),
        Column::Action if row.needs_attention() => theme.accent(),
        Column::Action => theme.dim(),
        Column::Workspace | Column::Step | Column::Progress => Style::default(),
    }
}

fn table_row<'a>(row: &StatusRow, layout: &TableLayout, theme: &Theme) -> Row<'a> {
    Row::new(layout.columns.iter().map(|(column, width)| {
        let text = truncate(&cell_text(row, *column), usize::from(*width));
        Cell::from(Span::styled(text, cell_style(row, *column, theme)))
    }))
}

fn draw_table(
    frame: &mut Frame<'_>,
    area: Rect,
    rows: &[StatusRow],
    options: &RenderOptions,
    theme: &Theme,
) {
    let layout = TableLayout::for_width(area.width, options.show_progress);
    let capacity = usize::from(area.height.saturating_sub(1));
    let (shown, hidden) = visible_rows(rows.len(), capacity);

    let header = Row::new(layout.headers()).style(theme.header());
    let body: Vec<Row<'_>> = rows[..shown]
        .iter()
        .map(|row| table_row(row, &layout, theme))
        .collect();
    let table = Table::new(body, layout.constraints())
        .header(header)
        .column_spacing(COLUMN_SPACING);
    frame.render_widget(table, area);

    let note = if rows.is_empty() {
        Some(NO_WORKSPACES.to_string())
    } else {
        hidden.map(more_text)
    };
    let Some(note) = note else {
        return;
    };
    let y = area.y + 1 + shown as u16;
    if y >= area.bottom() {
        return;
    }
    let indent = (GUTTER_WIDTH + COLUMN_SPACING).min(area.width);
    let note_area = Rect::new(area.x + indent, y, area.width - indent, 1);
    frame.render_widget(Paragraph::new(Span::styled(note, theme.dim())), note_area);
}

fn footer_lines(rows: &[StatusRow], theme: &Theme, width: u16) -> Vec<Line<'static>> {
    let summary = FooterSummary::from_rows(rows);
    let mut counts = vec![Span::raw(summary.count_text())];
    if let Some(clause) = summary.attention_text() {
        counts.push(Span::raw(", "));
        counts.push(Span::styled(clause, theme.warning()));
    }
    if let Some(clause) = summary.stale_text() {
        counts.push(Span::raw(", "));
        counts.push(Span::styled(clause, theme.dim()));
    }

    let mut lines = vec![Line::from(counts)];
    if let Some(command) = summary.command {
        let budget = usize::from(width).saturating_sub("Run: ".len());
        lines.push(Line::from(vec![
            Span::raw("Run: "),
            Span::styled(truncate(&command, budget), theme.accent()),
        ]));
    }
    lines
}

/// Text of each buffer row, trailing blanks removed.
#[cfg(test)]
pub(crate) fn buffer_lines(buffer: &ratatui::buffer::Buffer) -> Vec<String> {
    buffer
        .content()
        .chunks(usize::from(buffer.area.width).max(1))
        .map(|row| {
            row.iter()
                .map(ratatui::buffer::Cell::symbol)
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}
