use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table};
use ratatui::{Frame, Terminal};
use serde_json::Value;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::data::{
    self, ExportService, FeedService, RecordService, SchemaService, SortDirection,
};
use crate::export;
use crate::feed::{self, FeedItem};
use crate::page::Pager;
use crate::sanitize;
use crate::schema::{ColumnDescriptor, RenderType};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ROW_SELECTED: Color = Color::Rgb(69, 71, 90);

const AUTHOR_DEPTH_COLORS: [Color; 6] = [
    Color::Rgb(250, 179, 135),
    Color::Rgb(166, 227, 161),
    Color::Rgb(203, 166, 247),
    Color::Rgb(245, 194, 231),
    Color::Rgb(137, 220, 235),
    Color::Rgb(249, 226, 175),
];

fn author_depth_color(depth: usize) -> Color {
    AUTHOR_DEPTH_COLORS[depth % AUTHOR_DEPTH_COLORS.len()]
}

// Matches the page size dropdown of the web tables.
const PAGE_SIZE_OPTIONS: [u64; 3] = [10, 25, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Records,
    Feed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryMode {
    Filter(String),
    Comment(String),
}

pub struct Options {
    pub status_message: String,
    pub object: String,
    pub record_id: String,
    pub viewer_id: String,
    pub page_size: u64,
    pub editable: bool,
    pub record_service: Arc<dyn RecordService>,
    pub schema_service: Arc<dyn SchemaService>,
    pub feed_service: Arc<dyn FeedService>,
    pub export_service: Arc<dyn ExportService>,
    pub export_dir: Option<PathBuf>,
    pub config_path: String,
}

pub struct Model {
    object: String,
    record_id: String,
    viewer_id: String,
    editable: bool,
    record_service: Arc<dyn RecordService>,
    schema_service: Arc<dyn SchemaService>,
    feed_service: Arc<dyn FeedService>,
    export_service: Arc<dyn ExportService>,
    export_dir: Option<PathBuf>,
    config_path: String,

    columns: Vec<ColumnDescriptor>,
    rows: Vec<data::Row>,
    visible_rows: Vec<data::Row>,
    pager: Pager,
    sort_by: String,
    sort_direction: SortDirection,
    filter_text: String,

    feed_roots: Vec<FeedItem>,
    selected_row: usize,
    selected_comment: usize,
    focused_pane: Pane,
    entry: Option<EntryMode>,
    status_message: String,
    needs_redraw: bool,
}

impl Model {
    pub fn new(options: Options) -> Result<Self> {
        let pager = Pager::new(options.page_size).context("configure pager")?;
        Ok(Model {
            object: options.object,
            record_id: options.record_id,
            viewer_id: options.viewer_id,
            editable: options.editable,
            record_service: options.record_service,
            schema_service: options.schema_service,
            feed_service: options.feed_service,
            export_service: options.export_service,
            export_dir: options.export_dir,
            config_path: options.config_path,
            columns: Vec::new(),
            rows: Vec::new(),
            visible_rows: Vec::new(),
            pager,
            sort_by: String::new(),
            sort_direction: SortDirection::Asc,
            filter_text: String::new(),
            feed_roots: Vec::new(),
            selected_row: 0,
            selected_comment: 0,
            focused_pane: Pane::Records,
            entry: None,
            status_message: options.status_message,
            needs_redraw: true,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        self.initial_load();

        loop {
            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.handle_key(key.code) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(err) => {
                            self.status_message = format!("Error: {err:#}");
                            self.mark_dirty();
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn initial_load(&mut self) {
        if let Err(err) = self.reload_schema() {
            self.status_message = format!("Error: {err:#}");
        } else if let Err(err) = self.reload_records() {
            self.status_message = format!("Error: {err:#}");
        } else if let Err(err) = self.reload_feed() {
            self.status_message = format!("Error: {err:#}");
        }
        self.mark_dirty();
    }

    fn reload_schema(&mut self) -> Result<()> {
        let fields = self.schema_service.describe_fields(&self.object)?;
        self.columns = crate::schema::build_columns(&fields, self.editable);
        if self.sort_by.is_empty() {
            if let Some(first) = self.columns.first() {
                self.sort_by = first.field_name.clone();
            }
        }
        Ok(())
    }

    fn reload_records(&mut self) -> Result<()> {
        let request = data::PageRequest {
            page_number: self.pager.page_number(),
            page_size: self.pager.page_size(),
            sort_by: self.sort_by.clone(),
            sort_direction: self.sort_direction,
            // The free-text filter is applied client-side, on the page we
            // already have; the server request stays unfiltered.
            filter_text: String::new(),
        };
        let page = self
            .record_service
            .fetch_page(&self.object, &request)?;
        self.pager.set_total_records(page.total_records);
        self.rows = page.rows;
        self.apply_filter();
        self.status_message = format!(
            "Loaded {} ({})",
            self.object,
            self.pager.range_text()
        );
        Ok(())
    }

    fn apply_filter(&mut self) {
        self.visible_rows = data::filter_rows(&self.rows, &self.filter_text);
        if self.selected_row >= self.visible_rows.len() {
            self.selected_row = self.visible_rows.len().saturating_sub(1);
        }
    }

    fn reload_feed(&mut self) -> Result<()> {
        if self.record_id.is_empty() {
            self.feed_roots.clear();
            return Ok(());
        }
        let flat = self.feed_service.load_feed(&self.record_id)?;
        self.feed_roots = feed::build_threaded_feed(flat, &self.viewer_id, &self.record_id);
        let visible = feed::flatten_feed(&self.feed_roots).len();
        if self.selected_comment >= visible {
            self.selected_comment = visible.saturating_sub(1);
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.entry.is_some() {
            self.handle_entry_key(code)?;
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                self.focused_pane = match self.focused_pane {
                    Pane::Records => Pane::Feed,
                    Pane::Feed => Pane::Records,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') | KeyCode::Right => {
                if self.pager.next() {
                    self.reload_records()?;
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if self.pager.previous() {
                    self.reload_records()?;
                }
            }
            KeyCode::Char('z') => {
                let next = next_page_size(self.pager.page_size());
                self.pager.set_page_size(next)?;
                self.reload_records()?;
                self.status_message = format!("Page size {next}");
            }
            KeyCode::Char('s') => {
                self.cycle_sort_column();
                self.reload_records()?;
            }
            KeyCode::Char('d') => {
                self.sort_direction = self.sort_direction.toggled();
                self.pager.rewind();
                self.reload_records()?;
            }
            KeyCode::Char('/') => {
                self.entry = Some(EntryMode::Filter(self.filter_text.clone()));
            }
            KeyCode::Char('c') => {
                if self.record_id.is_empty() {
                    self.status_message = "No record selected for commenting.".to_string();
                } else {
                    self.entry = Some(EntryMode::Comment(String::new()));
                }
            }
            KeyCode::Char('L') => self.toggle_like()?,
            KeyCode::Char('e') => self.export_records()?,
            KeyCode::Char('r') => {
                self.reload_schema()?;
                self.reload_records()?;
                self.reload_feed()?;
                self.status_message = "Refreshed.".to_string();
            }
            KeyCode::Enter => {
                if self.focused_pane == Pane::Records {
                    self.open_selected_record()?;
                }
            }
            _ => return Ok(false),
        }

        self.mark_dirty();
        Ok(false)
    }

    fn handle_entry_key(&mut self, code: KeyCode) -> Result<()> {
        let Some(entry) = self.entry.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::Esc => {
                self.entry = None;
            }
            KeyCode::Backspace => {
                let buffer = match entry {
                    EntryMode::Filter(buffer) | EntryMode::Comment(buffer) => buffer,
                };
                buffer.pop();
            }
            KeyCode::Char(ch) => {
                let buffer = match entry {
                    EntryMode::Filter(buffer) | EntryMode::Comment(buffer) => buffer,
                };
                buffer.push(ch);
            }
            KeyCode::Enter => match self.entry.take() {
                Some(EntryMode::Filter(buffer)) => {
                    self.filter_text = buffer;
                    self.apply_filter();
                    self.status_message = if self.filter_text.is_empty() {
                        "Filter cleared.".to_string()
                    } else {
                        format!(
                            "Filter \"{}\": {} of {} rows",
                            self.filter_text,
                            self.visible_rows.len(),
                            self.rows.len()
                        )
                    };
                }
                Some(EntryMode::Comment(buffer)) => {
                    if buffer.trim().is_empty() {
                        self.status_message = "Comment body cannot be empty.".to_string();
                    } else {
                        self.feed_service
                            .post_comment(&self.record_id, buffer.trim())?;
                        self.reload_feed()?;
                        self.status_message = "Comment posted.".to_string();
                    }
                }
                None => {}
            },
            _ => {}
        }
        self.mark_dirty();
        Ok(())
    }

    fn move_selection(&mut self, delta: i64) {
        let (selected, len) = match self.focused_pane {
            Pane::Records => (&mut self.selected_row, self.visible_rows.len()),
            Pane::Feed => (
                &mut self.selected_comment,
                feed::flatten_feed(&self.feed_roots).len(),
            ),
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        let next = (*selected as i64 + delta).clamp(0, len as i64 - 1);
        *selected = next as usize;
    }

    fn cycle_sort_column(&mut self) {
        if self.columns.is_empty() {
            return;
        }
        let current = self
            .columns
            .iter()
            .position(|column| column.field_name == self.sort_by);
        let next = match current {
            Some(idx) => (idx + 1) % self.columns.len(),
            None => 0,
        };
        self.sort_by = self.columns[next].field_name.clone();
        self.sort_direction = SortDirection::Asc;
        // Sorting restarts from the first page, same as the web table.
        self.pager.rewind();
    }

    fn toggle_like(&mut self) -> Result<()> {
        let target = {
            let flattened = feed::flatten_feed(&self.feed_roots);
            flattened
                .get(self.selected_comment)
                .map(|(_, item)| (item.id.clone(), item.is_liked))
        };
        let Some((id, liked)) = target else {
            self.status_message = "No comment selected.".to_string();
            return Ok(());
        };
        if liked {
            self.feed_service.unlike(&id)?;
        } else {
            self.feed_service.like(&id)?;
        }
        self.reload_feed()?;
        self.status_message = if liked { "Unliked." } else { "Liked." }.to_string();
        Ok(())
    }

    fn export_records(&mut self) -> Result<()> {
        let payload = self
            .export_service
            .export_csv(&self.object, &self.filter_text)?;
        let dir = self
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = export::save_export(&dir, &self.object.to_lowercase(), &payload)?;
        self.status_message = format!("Exported to {}", path.display());
        Ok(())
    }

    fn open_selected_record(&mut self) -> Result<()> {
        let Some(row) = self.visible_rows.get(self.selected_row) else {
            return Ok(());
        };
        let Some(Value::String(id)) = row.get("Id") else {
            self.status_message = "Selected row has no Id field.".to_string();
            return Ok(());
        };
        let id = id.clone();
        self.record_id = id.clone();
        self.selected_comment = 0;
        self.reload_feed()?;
        self.focused_pane = Pane::Feed;
        self.status_message = format!("Viewing feed for {id}");
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(frame.size());

        let header = Line::from(vec![
            Span::styled(
                format!(" RecView — {} ", self.object),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("page {}", self.pager.page_text()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(header).style(Style::default().bg(COLOR_BG)),
            chunks[0],
        );

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(chunks[1]);

        self.draw_records(frame, panes[0]);
        self.draw_feed(frame, panes[1]);
        self.draw_status(frame, chunks[2]);
    }

    fn draw_records(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let border = if self.focused_pane == Pane::Records {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let title = format!(
            " Records {} — sort {} {} ",
            self.pager.range_text(),
            self.sort_by,
            sort_arrow(self.sort_direction)
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title);

        if self.columns.is_empty() {
            frame.render_widget(
                Paragraph::new("No columns described for this object.")
                    .block(block)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                area,
            );
            return;
        }

        let header = TableRow::new(
            self.columns
                .iter()
                .map(|column| {
                    Cell::from(column.label.clone()).style(
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    )
                })
                .collect::<Vec<_>>(),
        );

        let rows: Vec<TableRow> = self
            .visible_rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let cells: Vec<Cell> = self
                    .columns
                    .iter()
                    .map(|column| Cell::from(format_cell(row.get(&column.field_name), column)))
                    .collect();
                let style = if idx == self.selected_row && self.focused_pane == Pane::Records {
                    Style::default()
                        .bg(COLOR_ROW_SELECTED)
                        .fg(COLOR_TEXT_PRIMARY)
                } else {
                    Style::default().fg(COLOR_TEXT_PRIMARY)
                };
                TableRow::new(cells).style(style)
            })
            .collect();

        let share = (100 / self.columns.len().max(1)) as u16;
        let widths: Vec<Constraint> = self
            .columns
            .iter()
            .map(|_| Constraint::Percentage(share))
            .collect();

        frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
    }

    fn draw_feed(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let border = if self.focused_pane == Pane::Feed {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let title = if self.record_id.is_empty() {
            " Feed ".to_string()
        } else {
            format!(" Feed — {} ", self.record_id)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title);

        let width = area.width.saturating_sub(4).max(16) as usize;
        let lines = feed_lines(
            &self.feed_roots,
            width,
            self.selected_comment,
            self.focused_pane == Pane::Feed,
        );
        let body = if lines.is_empty() {
            Paragraph::new("No feed items. Press Enter on a record to load its feed.")
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
        } else {
            Paragraph::new(lines)
        };
        frame.render_widget(body.block(block), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let first = match &self.entry {
            Some(EntryMode::Filter(buffer)) => Line::from(vec![
                Span::styled("Filter: ", Style::default().fg(COLOR_ACCENT)),
                Span::raw(buffer.clone()),
                Span::styled("▏", Style::default().fg(COLOR_ACCENT)),
            ]),
            Some(EntryMode::Comment(buffer)) => Line::from(vec![
                Span::styled("Comment: ", Style::default().fg(COLOR_SUCCESS)),
                Span::raw(buffer.clone()),
                Span::styled("▏", Style::default().fg(COLOR_SUCCESS)),
            ]),
            None => Line::from(Span::styled(
                self.status_message.clone(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )),
        };
        let hints = Line::from(Span::styled(
            format!(
                "n/p pages  z size  s/d sort  / filter  e export  c comment  L like  r refresh  q quit  [{}]",
                self.config_path
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ));
        frame.render_widget(
            Paragraph::new(vec![first, hints]).alignment(Alignment::Left),
            area,
        );
    }
}

fn sort_arrow(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "▲",
        SortDirection::Desc => "▼",
    }
}

fn next_page_size(current: u64) -> u64 {
    let idx = PAGE_SIZE_OPTIONS
        .iter()
        .position(|&size| size == current)
        .unwrap_or(PAGE_SIZE_OPTIONS.len() - 1);
    PAGE_SIZE_OPTIONS[(idx + 1) % PAGE_SIZE_OPTIONS.len()]
}

/// Display text for one table cell according to the column's render type.
fn format_cell(value: Option<&Value>, column: &ColumnDescriptor) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match column.render_type {
        RenderType::Boolean => match value {
            Value::Bool(true) => "✓".to_string(),
            Value::Bool(false) => String::new(),
            other => export::cell_text(Some(other)),
        },
        RenderType::Currency => match value.as_f64() {
            Some(amount) => format!("${amount:.2}"),
            None => export::cell_text(Some(value)),
        },
        RenderType::Percent => match value.as_f64() {
            Some(rate) => format!("{rate:.2}%"),
            None => export::cell_text(Some(value)),
        },
        RenderType::Date | RenderType::DateLocal => format_date(&export::cell_text(Some(value))),
        _ => export::cell_text(Some(value)),
    }
}

// Day, short month, year — the attribute set the column mapper emits for
// date columns.
fn format_date(raw: &str) -> String {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return stamp.format("%-d %b %Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%-d %b %Y").to_string();
    }
    raw.to_string()
}

/// Renders the threaded feed as indented lines, two space indent per reply
/// level, bodies sanitized and wrapped to the pane width.
fn feed_lines(
    roots: &[FeedItem],
    width: usize,
    selected: usize,
    focused: bool,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (position, (depth, item)) in feed::flatten_feed(roots).into_iter().enumerate() {
        let indent = "  ".repeat(depth);
        let marker = if focused && position == selected {
            Span::styled("▶ ", Style::default().fg(COLOR_ACCENT))
        } else {
            Span::raw("  ")
        };
        let mut heading = vec![
            marker,
            Span::raw(indent.clone()),
            Span::styled(
                item.author.clone(),
                Style::default()
                    .fg(author_depth_color(depth))
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if item.like_count > 0 {
            heading.push(Span::styled(
                format!("  ♥ {}", item.like_count),
                Style::default().fg(COLOR_SUCCESS),
            ));
        }
        if item.is_liked {
            heading.push(Span::styled(
                " (you)",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
        }
        lines.push(Line::from(heading));

        let text = sanitize::text_content(&sanitize::sanitize(&item.body));
        let body_width = width.saturating_sub(indent.width() + 2).max(8);
        for wrapped in wrap(text.trim(), body_width) {
            lines.push(Line::from(vec![
                Span::raw(format!("  {indent}")),
                Span::styled(
                    wrapped.into_owned(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
            ]));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::build_threaded_feed;
    use crate::schema::{map_field_to_column, DataType, FieldMetadata};
    use serde_json::json;

    fn column(data_type: DataType) -> ColumnDescriptor {
        map_field_to_column(
            &FieldMetadata {
                api_name: "F".into(),
                label: "F".into(),
                data_type,
                scale: 2,
                updateable: false,
            },
            false,
        )
    }

    #[test]
    fn cells_format_by_render_type() {
        assert_eq!(
            format_cell(Some(&json!(1250.5)), &column(DataType::Currency)),
            "$1250.50"
        );
        assert_eq!(
            format_cell(Some(&json!(12.25)), &column(DataType::Percent)),
            "12.25%"
        );
        assert_eq!(format_cell(Some(&json!(true)), &column(DataType::Boolean)), "✓");
        assert_eq!(format_cell(Some(&json!(false)), &column(DataType::Boolean)), "");
        assert_eq!(
            format_cell(Some(&json!("hello")), &column(DataType::String)),
            "hello"
        );
        assert_eq!(format_cell(None, &column(DataType::String)), "");
    }

    #[test]
    fn dates_render_day_month_year() {
        assert_eq!(
            format_cell(Some(&json!("2024-03-07")), &column(DataType::Date)),
            "7 Mar 2024"
        );
        assert_eq!(
            format_cell(
                Some(&json!("2024-03-07T09:30:00Z")),
                &column(DataType::Datetime)
            ),
            "7 Mar 2024"
        );
        // Unparseable dates fall back to the raw value.
        assert_eq!(
            format_cell(Some(&json!("soon")), &column(DataType::Date)),
            "soon"
        );
    }

    #[test]
    fn page_sizes_cycle_through_options() {
        assert_eq!(next_page_size(10), 25);
        assert_eq!(next_page_size(25), 50);
        assert_eq!(next_page_size(50), 10);
        // Unknown current size restarts the cycle.
        assert_eq!(next_page_size(7), 10);
    }

    fn item(id: &str, parent: Option<&str>, body: &str) -> FeedItem {
        FeedItem {
            id: id.into(),
            parent_id: parent.map(str::to_string),
            created_by_id: "u".into(),
            author: format!("author-{id}"),
            body: body.into(),
            created_utc: 0.0,
            likes: Vec::new(),
            like_count: 0,
            is_liked: false,
            replies: Vec::new(),
        }
    }

    #[test]
    fn feed_lines_indent_replies_and_strip_markup() {
        let roots = build_threaded_feed(
            vec![
                item("1", None, "<p>top <b>post</b></p>"),
                item("2", Some("1"), "<p>reply<script>alert(1)</script></p>"),
            ],
            "viewer",
            "record",
        );
        let lines = feed_lines(&roots, 60, 0, false);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].spans[2].content.as_ref(), "author-1");
        assert_eq!(lines[1].spans[1].content.as_ref(), "top post");
        // Reply heading and body are indented one level.
        assert_eq!(lines[2].spans[1].content.as_ref(), "  ");
        assert_eq!(lines[2].spans[2].content.as_ref(), "author-2");
        assert_eq!(lines[3].spans[1].content.as_ref(), "reply");
    }
}
