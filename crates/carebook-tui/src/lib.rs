// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use carebook_app::{
    CellValue, DAILY_FREE_INPUT_HINT, DAILY_RECORDS_FIELD, DailyInputMode, DayColumn, DayEntry,
    FieldKind, GridCommand, GridEvent, GridState, GridView, LayoutMode, OpenSession, Record,
    SchemaEntry, ScrollSource, format_amount,
};
use carebook_store::Workspace;
use carebook_store::validation::{format_date_range, parse_date_range};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
    Table, Tabs,
};
use std::io;
use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::Weekday;
use tracing::{debug, warn};

pub const DEFAULT_COMPACT_WIDTH: u16 = 100;

const COLUMN_SPACING: u16 = 1;
const DAY_COLUMN_WIDTH: u16 = 6;
const PROXY_SCROLL_STEP: i32 = 8;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

pub enum InternalEvent {
    ClearStatus { token: u64 },
}

/// Host services the grid needs: where rows come from and where committed
/// edits go.
pub trait AppRuntime {
    fn load_workspace(&mut self) -> Result<Workspace>;
    fn save_workspace(&mut self, workspace: &Workspace) -> Result<()>;
    fn compact_width(&self) -> u16 {
        DEFAULT_COMPACT_WIDTH
    }
}

#[derive(Debug, Clone, Copy)]
enum GridColumn {
    Field(&'static SchemaEntry),
    Day(DayColumn),
}

impl GridColumn {
    fn header(self) -> String {
        match self {
            Self::Field(entry) => entry.label.to_owned(),
            Self::Day(column) => column.header(),
        }
    }

    fn width(self, layout: LayoutMode) -> u16 {
        let Self::Field(entry) = self else {
            return DAY_COLUMN_WIDTH;
        };
        let wide = match entry.kind {
            FieldKind::Number => 9,
            FieldKind::Date => 10,
            FieldKind::Searchable => 18,
            FieldKind::Selection => 10,
            FieldKind::Text | FieldKind::DailyRecord => 14,
        };
        match layout {
            LayoutMode::Wide => wide,
            LayoutMode::Compact => wide.min(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct GridCursor {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    NameFilter,
    DateRange,
}

impl PromptKind {
    const fn label(self) -> &'static str {
        match self {
            Self::NameFilter => "name",
            Self::DateRange => "date range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PromptState {
    kind: PromptKind,
    input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavCommand {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    JumpFirstColumn,
    JumpLastColumn,
    Activate,
    ShiftPeriod(i32),
    OpenPrompt(PromptKind),
    ClearFilters,
    NextView,
    PrevView,
    ScrollProxy(i32),
    ToggleHelp,
    Quit,
}

#[derive(Debug, Default)]
struct ViewData {
    workspace: Workspace,
    cursor: GridCursor,
    prompt: Option<PromptState>,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut GridState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(runtime, &mut view_data) {
        emit_status(state, &mut view_data, &internal_tx, format!("load failed: {error:#}"));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        match terminal.size() {
            Ok(size) => sync_viewport(state, &view_data, size.width, runtime.compact_width()),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn refresh_view_data<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    view_data.workspace = runtime.load_workspace()?;
    view_data.cursor = GridCursor::default();
    Ok(())
}

fn process_internal_events(state: &mut GridState, view_data: &ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut GridState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.status_line = Some(message.into());
    bump_status_token(view_data, internal_tx);
}

fn bump_status_token(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

/// Measures the grid against the terminal width and feeds the results to the
/// layout mode and the scroll binding.
fn sync_viewport(state: &mut GridState, view_data: &ViewData, width: u16, compact_below: u16) {
    state.observe_width(&width, compact_below);

    let columns = grid_columns(state);
    let geometry = scrolled_geometry(&columns, state.layout);
    let content = geometry
        .last()
        .map_or(0, |(start, width)| start.saturating_add(*width));
    let viewport = scroll_viewport_width(&columns, state.layout, width);
    let rows = visible_row_count(state, view_data);

    if state.scroll.needs_remeasure(rows, state.columns().len())
        || state.scroll.proxy_content_width() != content
        || state.scroll.viewport_width() != viewport
    {
        state
            .scroll
            .measure(content, viewport, rows, state.columns().len());
        debug!(content, viewport, rows, "grid remeasured");
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        release_session(state, runtime, view_data, internal_tx);
        return true;
    }

    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    if view_data.prompt.is_some() {
        handle_prompt_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.session().is_open() {
        handle_editor_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    let Some(command) = nav_command_for_key(key) else {
        return false;
    };
    apply_nav_command(state, runtime, view_data, internal_tx, command)
}

fn nav_command_for_key(key: KeyEvent) -> Option<NavCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(NavCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(NavCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(NavCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(NavCommand::MoveColumn(1)),
        (KeyCode::Char('g'), _) => Some(NavCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) => Some(NavCommand::JumpLastRow),
        (KeyCode::Char('^'), _) | (KeyCode::Home, _) => Some(NavCommand::JumpFirstColumn),
        (KeyCode::Char('$'), _) | (KeyCode::End, _) => Some(NavCommand::JumpLastColumn),
        (KeyCode::Enter, _) => Some(NavCommand::Activate),
        (KeyCode::Char('['), _) => Some(NavCommand::ShiftPeriod(-1)),
        (KeyCode::Char(']'), _) => Some(NavCommand::ShiftPeriod(1)),
        (KeyCode::Char('/'), _) => Some(NavCommand::OpenPrompt(PromptKind::NameFilter)),
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            Some(NavCommand::OpenPrompt(PromptKind::DateRange))
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => Some(NavCommand::ClearFilters),
        (KeyCode::Char('n'), KeyModifiers::NONE) => Some(NavCommand::NextView),
        (KeyCode::Char('N'), _) => Some(NavCommand::PrevView),
        (KeyCode::Char('<'), _) => Some(NavCommand::ScrollProxy(-PROXY_SCROLL_STEP)),
        (KeyCode::Char('>'), _) => Some(NavCommand::ScrollProxy(PROXY_SCROLL_STEP)),
        (KeyCode::Char('?'), _) => Some(NavCommand::ToggleHelp),
        (KeyCode::Char('q'), KeyModifiers::NONE) => Some(NavCommand::Quit),
        _ => None,
    }
}

fn apply_nav_command<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: NavCommand,
) -> bool {
    match command {
        NavCommand::MoveRow(delta) => {
            release_session(state, runtime, view_data, internal_tx);
            let last = visible_row_count(state, view_data).saturating_sub(1);
            view_data.cursor.row = view_data.cursor.row.saturating_add_signed(delta).min(last);
        }
        NavCommand::MoveColumn(delta) => {
            release_session(state, runtime, view_data, internal_tx);
            let last = grid_columns(state).len().saturating_sub(1);
            view_data.cursor.col = view_data.cursor.col.saturating_add_signed(delta).min(last);
            reveal_cursor_column(state, view_data);
        }
        NavCommand::JumpFirstRow => view_data.cursor.row = 0,
        NavCommand::JumpLastRow => {
            view_data.cursor.row = visible_row_count(state, view_data).saturating_sub(1);
        }
        NavCommand::JumpFirstColumn => {
            view_data.cursor.col = 0;
            state.scroll.on_scroll(ScrollSource::Table, 0);
        }
        NavCommand::JumpLastColumn => {
            view_data.cursor.col = grid_columns(state).len().saturating_sub(1);
            reveal_cursor_column(state, view_data);
        }
        NavCommand::Activate => {
            if let Some(command) = activation_for_cursor(state, view_data) {
                dispatch(state, runtime, view_data, internal_tx, command);
            }
        }
        NavCommand::ShiftPeriod(months) => {
            dispatch(state, runtime, view_data, internal_tx, GridCommand::ShiftPeriod(months));
        }
        NavCommand::OpenPrompt(kind) => {
            let input = match kind {
                PromptKind::NameFilter => state.criteria.name_contains.clone().unwrap_or_default(),
                PromptKind::DateRange => format_date_range(state.criteria.date_range.as_ref()),
            };
            view_data.prompt = Some(PromptState { kind, input });
        }
        NavCommand::ClearFilters => {
            dispatch(state, runtime, view_data, internal_tx, GridCommand::ClearFilters);
        }
        NavCommand::NextView => {
            dispatch(state, runtime, view_data, internal_tx, GridCommand::NextView);
        }
        NavCommand::PrevView => {
            dispatch(state, runtime, view_data, internal_tx, GridCommand::PrevView);
        }
        NavCommand::ScrollProxy(delta) => {
            if state.scroll.scroll_by(ScrollSource::Proxy, delta).is_some() {
                follow_table_offset(state, view_data);
            }
        }
        NavCommand::ToggleHelp => view_data.help_visible = !view_data.help_visible,
        NavCommand::Quit => return true,
    }
    false
}

fn handle_prompt_key<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(prompt) = view_data.prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.prompt = None,
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Char(ch) => prompt.input.push(ch),
        KeyCode::Enter => {
            let Some(prompt) = view_data.prompt.take() else {
                return;
            };
            let command = match prompt.kind {
                PromptKind::NameFilter => GridCommand::SetNameFilter(prompt.input.trim().to_owned()),
                PromptKind::DateRange => match parse_date_range(&prompt.input) {
                    Ok(range) => GridCommand::SetDateRange(range),
                    Err(error) => {
                        emit_status(state, view_data, internal_tx, error.to_string());
                        view_data.prompt = Some(prompt);
                        return;
                    }
                },
            };
            dispatch(state, runtime, view_data, internal_tx, command);
        }
        _ => {}
    }
}

fn handle_editor_key<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(session) = state.session().session() else {
        return;
    };
    let kind = session.kind();
    let picks = picks_from_list(session);
    let mut draft = session.draft().to_owned();
    let mut query = session.query().to_owned();

    let command = match key.code {
        KeyCode::Esc => GridCommand::Cancel,
        KeyCode::Enter => {
            if picks && !dispatch(state, runtime, view_data, internal_tx, GridCommand::PickOption) {
                return;
            }
            GridCommand::Commit
        }
        KeyCode::Tab if kind == FieldKind::DailyRecord => GridCommand::ToggleOtherInput,
        KeyCode::Up if picks => GridCommand::MoveOption(-1),
        KeyCode::Down if picks => GridCommand::MoveOption(1),
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
            let nav = match key.code {
                KeyCode::Up => NavCommand::MoveRow(-1),
                KeyCode::Down => NavCommand::MoveRow(1),
                KeyCode::Left => NavCommand::MoveColumn(-1),
                _ => NavCommand::MoveColumn(1),
            };
            apply_nav_command(state, runtime, view_data, internal_tx, nav);
            return;
        }
        KeyCode::Backspace if kind == FieldKind::Searchable => {
            query.pop();
            GridCommand::SetQuery(query)
        }
        KeyCode::Char(ch) if kind == FieldKind::Searchable => {
            query.push(ch);
            GridCommand::SetQuery(query)
        }
        KeyCode::Backspace if !picks => {
            draft.pop();
            GridCommand::SetDraft(draft)
        }
        KeyCode::Char(ch) if !picks => {
            draft.push(ch);
            GridCommand::SetDraft(draft)
        }
        _ => return,
    };
    dispatch(state, runtime, view_data, internal_tx, command);
}

/// Whether Enter takes the highlighted option rather than typed text.
fn picks_from_list(session: &OpenSession) -> bool {
    match session.kind() {
        FieldKind::Selection | FieldKind::Searchable => true,
        FieldKind::DailyRecord => session.input_mode() == DailyInputMode::Pick,
        FieldKind::Text | FieldKind::Number | FieldKind::Date => false,
    }
}

fn release_session<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.session().is_open() {
        dispatch(state, runtime, view_data, internal_tx, GridCommand::Commit);
    }
}

/// Runs one grid command against the active view's store. Returns whether
/// it succeeded; failures land on the status line.
fn dispatch<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: GridCommand,
) -> bool {
    let view = state.view;
    match state.dispatch(view_data.workspace.store_mut(view), command) {
        Ok(events) => {
            apply_events(state, runtime, view_data, internal_tx, events);
            true
        }
        Err(error) => {
            warn!(view = view.as_str(), %error, "grid command failed");
            emit_status(state, view_data, internal_tx, error.to_string());
            false
        }
    }
}

fn apply_events<R: AppRuntime>(
    state: &mut GridState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<GridEvent>,
) {
    for event in events {
        match event {
            GridEvent::RecordUpdated(key) => {
                if let Err(error) = runtime.save_workspace(&view_data.workspace) {
                    warn!(record = %key, error = %format!("{error:#}"), "save failed");
                    emit_status(state, view_data, internal_tx, format!("save failed: {error:#}"));
                }
            }
            GridEvent::StatusUpdated(_) => bump_status_token(view_data, internal_tx),
            GridEvent::ViewChanged(_) => view_data.cursor = GridCursor::default(),
            GridEvent::FilterChanged | GridEvent::PeriodChanged(_) => clamp_cursor(state, view_data),
            GridEvent::LayoutChanged(_)
            | GridEvent::SessionOpened { .. }
            | GridEvent::SessionUpdated
            | GridEvent::SessionClosed { .. }
            | GridEvent::CommitFailed(_)
            | GridEvent::StatusCleared => {}
        }
    }
}

fn activation_for_cursor(state: &GridState, view_data: &ViewData) -> Option<GridCommand> {
    let rows = state.visible_rows(view_data.workspace.store(state.view));
    let record = rows.get(view_data.cursor.row)?;
    let column = grid_columns(state).get(view_data.cursor.col).copied()?;
    let (field, day) = match column {
        GridColumn::Field(entry) => (entry.name.to_owned(), None),
        GridColumn::Day(day) => (DAILY_RECORDS_FIELD.to_owned(), Some(day.key)),
    };
    Some(GridCommand::Activate {
        record: record.key.clone(),
        field,
        day,
    })
}

fn clamp_cursor(state: &GridState, view_data: &mut ViewData) {
    let rows = visible_row_count(state, view_data);
    let cols = grid_columns(state).len();
    view_data.cursor.row = view_data.cursor.row.min(rows.saturating_sub(1));
    view_data.cursor.col = view_data.cursor.col.min(cols.saturating_sub(1));
}

fn visible_row_count(state: &GridState, view_data: &ViewData) -> usize {
    state
        .visible_rows(view_data.workspace.store(state.view))
        .len()
}

/// Name column first (frozen), remaining fixed fields, then one column per day.
fn grid_columns(state: &GridState) -> Vec<GridColumn> {
    let name = state.view.name_field();
    let mut fixed = state.fixed_columns();
    if let Some(index) = fixed.iter().position(|entry| entry.name == name) {
        let entry = fixed.remove(index);
        fixed.insert(0, entry);
    }
    fixed
        .into_iter()
        .map(GridColumn::Field)
        .chain(state.columns().iter().copied().map(GridColumn::Day))
        .collect()
}

/// `(start, width)` of every scrolling column, in cells from the left edge of
/// the scrolled region. The frozen name column is excluded.
fn scrolled_geometry(columns: &[GridColumn], layout: LayoutMode) -> Vec<(u16, u16)> {
    let mut start = 0u16;
    columns
        .iter()
        .skip(1)
        .map(|column| {
            let width = column.width(layout);
            let entry = (start, width);
            start = start.saturating_add(width).saturating_add(COLUMN_SPACING);
            entry
        })
        .collect()
}

fn scroll_viewport_width(columns: &[GridColumn], layout: LayoutMode, total_width: u16) -> u16 {
    let frozen = columns.first().map_or(0, |column| column.width(layout));
    total_width
        .saturating_sub(2)
        .saturating_sub(frozen)
        .saturating_sub(COLUMN_SPACING)
}

/// Scrolling columns that fit entirely inside `[offset, offset + viewport)`.
fn visible_scrolled_columns(geometry: &[(u16, u16)], offset: u16, viewport: u16) -> Range<usize> {
    let end = offset.saturating_add(viewport);
    let first = geometry
        .iter()
        .position(|(start, _)| *start >= offset)
        .unwrap_or(geometry.len());
    let count = geometry[first..]
        .iter()
        .take_while(|(start, width)| start.saturating_add(*width) <= end)
        .count();
    first..first + count
}

fn reveal_cursor_column(state: &mut GridState, view_data: &ViewData) {
    let Some(scrolled_index) = view_data.cursor.col.checked_sub(1) else {
        return;
    };
    let geometry = scrolled_geometry(&grid_columns(state), state.layout);
    if let Some((start, width)) = geometry.get(scrolled_index).copied() {
        state.scroll.reveal(start, width);
    }
}

/// After the proxy moved the table, keep the cursor on a visible column.
fn follow_table_offset(state: &GridState, view_data: &mut ViewData) {
    let geometry = scrolled_geometry(&grid_columns(state), state.layout);
    let visible = visible_scrolled_columns(
        &geometry,
        state.scroll.table_offset(),
        state.scroll.viewport_width(),
    );
    let Some(scrolled_index) = view_data.cursor.col.checked_sub(1) else {
        return;
    };
    if !visible.contains(&scrolled_index) && !visible.is_empty() {
        view_data.cursor.col = visible.start + 1;
    }
}

fn cell_text(record: &Record, column: GridColumn) -> String {
    match column {
        GridColumn::Field(entry) => match record.field(entry.name) {
            CellValue::Number(value) => format_amount(*value),
            value => value.display(),
        },
        GridColumn::Day(day) => match record.day_entry(day.key) {
            DayEntry::Code(code) => code.to_owned(),
            DayEntry::Blank | DayEntry::Absent => String::new(),
        },
    }
}

fn header_style(column: GridColumn) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match column {
        GridColumn::Day(day) if day.weekday == Weekday::Sunday => base.fg(Color::Red),
        GridColumn::Day(day) if day.weekday == Weekday::Saturday => base.fg(Color::Blue),
        _ => base.fg(Color::White),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &GridState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = GridView::ALL
        .iter()
        .position(|view| *view == state.view)
        .unwrap_or(0);
    let titles = GridView::ALL
        .iter()
        .map(|view| format!("{} ({})", view.label(), view_data.workspace.store(*view).len()))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("carebook").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    frame.render_widget(Paragraph::new(header_text(state, view_data)), layout[1]);

    let mut scrollbar_state = ScrollbarState::new(usize::from(state.scroll.max_offset()))
        .position(usize::from(state.scroll.proxy_offset()))
        .viewport_content_length(usize::from(state.scroll.viewport_width()));
    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalTop)
        .begin_symbol(None)
        .end_symbol(None);
    frame.render_stateful_widget(scrollbar, layout[2], &mut scrollbar_state);

    render_grid(frame, layout[3], state, view_data);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[4]);

    if let Some(session) = state.session().session() {
        let area = centered_rect(50, 60, frame.area());
        frame.render_widget(Clear, area);
        let editor = Paragraph::new(editor_overlay_text(session)).block(
            Block::default()
                .title(format!("edit {}", session.entry().label))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(editor, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, state: &GridState, view_data: &ViewData) {
    let rows = state.visible_rows(view_data.workspace.store(state.view));
    let columns = grid_columns(state);
    let geometry = scrolled_geometry(&columns, state.layout);
    let visible = visible_scrolled_columns(
        &geometry,
        state.scroll.table_offset(),
        state.scroll.viewport_width(),
    );
    let shown = std::iter::once(0)
        .chain(visible.map(|index| index + 1))
        .filter(|index| *index < columns.len())
        .collect::<Vec<_>>();

    let widths = shown
        .iter()
        .map(|index| Constraint::Length(columns[*index].width(state.layout)))
        .collect::<Vec<_>>();
    let header = Row::new(
        shown
            .iter()
            .map(|index| Cell::from(columns[*index].header()).style(header_style(columns[*index]))),
    );

    let body = rows.iter().enumerate().map(|(row_index, record)| {
        let selected_row = row_index == view_data.cursor.row;
        let cells = shown
            .iter()
            .map(|index| {
                let mut style = Style::default();
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && *index == view_data.cursor.col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(cell_text(record, columns[*index])).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let table = Table::new(body, widths)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .block(
            Block::default()
                .title(format!("{} {}", state.view.label(), state.period))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_text(state: &GridState, view_data: &ViewData) -> String {
    if let Some(prompt) = &view_data.prompt {
        return format!("{}: {}_", prompt.kind.label(), prompt.input);
    }

    let mut filters = Vec::new();
    if let Some(name) = &state.criteria.name_contains {
        filters.push(format!("name~{name}"));
    }
    if state.criteria.date_range.is_some() {
        filters.push(format!(
            "{} {}",
            state.view.date_field(),
            format_date_range(state.criteria.date_range.as_ref())
        ));
    }
    let filter = if filters.is_empty() {
        "no filter".to_owned()
    } else {
        filters.join(" ")
    };
    format!(
        "{} | {} rows | {filter} | {}",
        state.period,
        visible_row_count(state, view_data),
        state.layout.label()
    )
}

fn editor_overlay_text(session: &OpenSession) -> String {
    let mut lines = vec![format!("cell: {}", session.target().describe())];
    match session.kind() {
        FieldKind::Searchable => {
            lines.push(format!("search: {}_", session.query()));
            lines.push(format!("value: {}", session.draft()));
        }
        FieldKind::DailyRecord if session.input_mode() == DailyInputMode::Free => {
            lines.push(format!("input: {}_", session.draft()));
            lines.push(format!("hint: {DAILY_FREE_INPUT_HINT}"));
        }
        FieldKind::Selection | FieldKind::DailyRecord => {
            lines.push(format!("value: {}", session.draft()));
        }
        FieldKind::Text | FieldKind::Number | FieldKind::Date => {
            lines.push(format!("input: {}_", session.draft()));
        }
    }

    let options = session.visible_options();
    if !options.is_empty() {
        lines.push(String::new());
        for (index, option) in options.iter().enumerate() {
            let marker = if index == session.cursor() { ">" } else { " " };
            lines.push(format!("{marker} {option}"));
        }
    } else if session.kind() == FieldKind::Searchable {
        lines.push("no matches".to_owned());
    }

    lines.push(String::new());
    let keys = match session.kind() {
        FieldKind::DailyRecord => "enter save | esc cancel | tab other input | up/down choose",
        FieldKind::Selection | FieldKind::Searchable => "enter save | esc cancel | up/down choose",
        FieldKind::Text | FieldKind::Number | FieldKind::Date => "enter save | esc cancel",
    };
    lines.push(keys.to_owned());
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "grid: j/k/h/l arrows move | g/G first/last row | ^/$ first/last column\n\
grid: enter edit | [/] month | n/N view | </> scroll | q quit\n\
filter: / name | d date range (YYYY-MM-DD..YYYY-MM-DD) | c clear\n\
editor: enter save | esc cancel | tab daily other input | arrows leave and save\n\
any key closes help"
}

fn status_text(state: &GridState, view_data: &ViewData) -> String {
    let mode = if view_data.prompt.is_some() {
        "FILTER"
    } else if state.session().is_open() {
        "EDIT"
    } else {
        "NAV"
    };
    let default = match mode {
        "FILTER" => "enter apply | esc close",
        "EDIT" => "enter save | esc cancel",
        _ => "enter edit | [/] month | / d c filter | n/N view | ? help | q",
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {default}"),
        None => format!("{mode} | {default}"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, GridColumn, InternalEvent, NavCommand, PromptKind, ViewData,
        editor_overlay_text, grid_columns, handle_key_event, header_text, nav_command_for_key,
        refresh_view_data, render, scrolled_geometry, status_text, sync_viewport,
        visible_scrolled_columns,
    };
    use anyhow::{Result, bail};
    use carebook_app::{
        CellValue, DayEntry, DayKey, GridState, GridView, LayoutMode, Record, RecordKey,
    };
    use carebook_store::{RecordImport, Workspace};
    use carebook_testkit::fixture_period;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc::{self, Sender};

    #[derive(Debug, Default)]
    struct TestRuntime {
        saves: usize,
        fail_saves: bool,
    }

    impl AppRuntime for TestRuntime {
        fn load_workspace(&mut self) -> Result<Workspace> {
            let settlement = vec![
                Record::new(RecordKey::int(1))
                    .with_field("name", CellValue::text("田中 太郎"))
                    .with_field("admissionDate", CellValue::text("2024-09-03"))
                    .with_field("roomCharge", CellValue::Number(61_980.0))
                    .with_day(DayKey::parse("9/1").expect("day"), "●"),
                Record::new(RecordKey::int(2))
                    .with_field("name", CellValue::text("佐藤 花子"))
                    .with_field("admissionDate", CellValue::text("2024-08-20")),
            ];
            let urine = vec![
                Record::new(RecordKey::text("ut-1"))
                    .with_field("name", CellValue::text("田中 太郎"))
                    .with_field("testDate", CellValue::text("2024-09-10")),
            ];
            Workspace::from_import(RecordImport {
                settlement,
                status: Vec::new(),
                urine,
            })
        }

        fn save_workspace(&mut self, _workspace: &Workspace) -> Result<()> {
            if self.fail_saves {
                bail!("disk full");
            }
            self.saves += 1;
            Ok(())
        }
    }

    fn internal_tx() -> Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn setup() -> (GridState, TestRuntime, ViewData) {
        let state = GridState::new(GridView::MonthlySettlement, fixture_period());
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        refresh_view_data(&mut runtime, &mut view_data).expect("refresh should work");
        (state, runtime, view_data)
    }

    fn press(
        state: &mut GridState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(code, KeyModifiers::NONE),
        )
    }

    fn type_text(state: &mut GridState, runtime: &mut TestRuntime, view_data: &mut ViewData, text: &str) {
        for ch in text.chars() {
            press(state, runtime, view_data, KeyCode::Char(ch));
        }
    }

    fn column_index(state: &GridState, field: &str) -> usize {
        grid_columns(state)
            .iter()
            .position(|column| matches!(column, GridColumn::Field(entry) if entry.name == field))
            .expect("column exists")
    }

    fn first_day_column(state: &GridState) -> usize {
        grid_columns(state)
            .iter()
            .position(|column| matches!(column, GridColumn::Day(_)))
            .expect("day columns")
    }

    #[test]
    fn nav_keys_map_to_commands() {
        let cases = [
            (KeyCode::Char('j'), Some(NavCommand::MoveRow(1))),
            (KeyCode::Left, Some(NavCommand::MoveColumn(-1))),
            (KeyCode::Char('['), Some(NavCommand::ShiftPeriod(-1))),
            (KeyCode::Char(']'), Some(NavCommand::ShiftPeriod(1))),
            (
                KeyCode::Char('/'),
                Some(NavCommand::OpenPrompt(PromptKind::NameFilter)),
            ),
            (
                KeyCode::Char('d'),
                Some(NavCommand::OpenPrompt(PromptKind::DateRange)),
            ),
            (KeyCode::Char('n'), Some(NavCommand::NextView)),
            (KeyCode::Char('q'), Some(NavCommand::Quit)),
            (KeyCode::Char('z'), None),
        ];
        for (code, expected) in cases {
            assert_eq!(
                nav_command_for_key(KeyEvent::new(code, KeyModifiers::NONE)),
                expected,
                "key {code:?}"
            );
        }
    }

    #[test]
    fn name_column_is_frozen_first() {
        let (state, _, _) = setup();
        let columns = grid_columns(&state);
        assert!(matches!(columns[0], GridColumn::Field(entry) if entry.name == "name"));
        assert_eq!(
            columns
                .iter()
                .filter(|column| matches!(column, GridColumn::Day(_)))
                .count(),
            30
        );
    }

    #[test]
    fn enter_edits_and_commits_a_text_cell() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.col = column_index(&state, "roomNumber");

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert!(state.session().is_open());
        type_text(&mut state, &mut runtime, &mut view_data, "201");
        assert_eq!(status_text(&state, &view_data), "EDIT | enter save | esc cancel");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert!(!state.session().is_open());
        assert_eq!(runtime.saves, 1);
        let record = view_data
            .workspace
            .store(GridView::MonthlySettlement)
            .get(&RecordKey::int(1))
            .expect("row 1");
        assert_eq!(record.field("roomNumber"), &CellValue::text("201"));
    }

    #[test]
    fn escape_cancels_without_saving() {
        let (mut state, mut runtime, mut view_data) = setup();
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        type_text(&mut state, &mut runtime, &mut view_data, "xyz");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc);

        assert!(!state.session().is_open());
        assert_eq!(runtime.saves, 0);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("cancelled"))
        );
    }

    #[test]
    fn arrow_keys_leave_the_cell_and_auto_commit() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.col = column_index(&state, "notes");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        type_text(&mut state, &mut runtime, &mut view_data, "ok");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Down);

        assert!(!state.session().is_open());
        assert_eq!(view_data.cursor.row, 1);
        assert_eq!(runtime.saves, 1);
    }

    #[test]
    fn daily_cell_picks_the_highlighted_code() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.row = 1;
        view_data.cursor.col = first_day_column(&state) + 1;

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Down);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        let record = view_data
            .workspace
            .store(GridView::MonthlySettlement)
            .get(&RecordKey::int(2))
            .expect("row 2");
        assert_eq!(
            record.day_entry(DayKey::parse("9/2").expect("day")),
            DayEntry::Code("○")
        );
    }

    #[test]
    fn walking_across_empty_days_saves_nothing() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.row = 1;
        view_data.cursor.col = first_day_column(&state);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Right);

        assert_eq!(runtime.saves, 0);
        let record = view_data
            .workspace
            .store(GridView::MonthlySettlement)
            .get(&RecordKey::int(2))
            .expect("row 2");
        assert!(record.daily_records.is_empty());
    }

    #[test]
    fn daily_free_input_accepts_typed_codes() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.col = first_day_column(&state);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab);
        let overlay = editor_overlay_text(state.session().session().expect("open"));
        assert!(overlay.contains("hint:"));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Backspace);
        type_text(&mut state, &mut runtime, &mut view_data, "12▼");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        let record = view_data
            .workspace
            .store(GridView::MonthlySettlement)
            .get(&RecordKey::int(1))
            .expect("row 1");
        assert_eq!(
            record.day_entry(DayKey::parse("9/1").expect("day")),
            DayEntry::Code("12▼")
        );
    }

    #[test]
    fn searchable_overlay_filters_options() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.col = column_index(&state, "physician");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        type_text(&mut state, &mut runtime, &mut view_data, "kato");

        let overlay = editor_overlay_text(state.session().session().expect("open"));
        assert!(overlay.contains("search: kato_"));
        assert!(overlay.contains("> Kawasaki Family Clinic Dr. Kato"));
        assert!(!overlay.contains("中央病院"));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        let record = view_data
            .workspace
            .store(GridView::MonthlySettlement)
            .get(&RecordKey::int(1))
            .expect("row 1");
        assert_eq!(
            record.field("physician"),
            &CellValue::text("Kawasaki Family Clinic Dr. Kato")
        );
    }

    #[test]
    fn name_prompt_filters_rows() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.row = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('/'));
        type_text(&mut state, &mut runtime, &mut view_data, "田中");
        assert_eq!(header_text(&state, &view_data), "name: 田中_");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert_eq!(state.criteria.name_contains.as_deref(), Some("田中"));
        assert_eq!(view_data.cursor.row, 0);
        assert!(header_text(&state, &view_data).contains("1 rows | name~田中"));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('c'));
        assert!(state.criteria.name_contains.is_none());
    }

    #[test]
    fn bad_date_range_keeps_the_prompt_open() {
        let (mut state, mut runtime, mut view_data) = setup();
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('d'));
        type_text(&mut state, &mut runtime, &mut view_data, "2024-09-30..2024-09-01");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);

        assert!(view_data.prompt.is_some());
        assert!(state.criteria.date_range.is_none());
        assert_eq!(
            state.status_line.as_deref(),
            Some("date range ends before it starts")
        );
    }

    #[test]
    fn bracket_keys_shift_the_month() {
        let (mut state, mut runtime, mut view_data) = setup();
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char(']'));
        assert_eq!(state.period.to_string(), "2024-10");
        assert_eq!(state.columns().len(), 31);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('['));
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('['));
        assert_eq!(state.period.to_string(), "2024-08");
    }

    #[test]
    fn view_keys_rotate_and_reset_the_cursor() {
        let (mut state, mut runtime, mut view_data) = setup();
        view_data.cursor.col = 3;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('N'));
        assert_eq!(state.view, GridView::UrineTest);
        assert_eq!(view_data.cursor.col, 0);
        assert!(header_text(&state, &view_data).contains("1 rows"));
    }

    #[test]
    fn save_failures_reach_the_status_line() {
        let (mut state, mut runtime, mut view_data) = setup();
        runtime.fail_saves = true;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        assert_eq!(state.status_line.as_deref(), Some("save failed: disk full"));
    }

    #[test]
    fn quit_commits_the_open_editor() {
        let (mut state, mut runtime, mut view_data) = setup();
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter);
        let quit = handle_key_event(
            &mut state,
            &mut runtime,
            &mut view_data,
            &internal_tx(),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(quit);
        assert!(!state.session().is_open());
        assert_eq!(runtime.saves, 1);
    }

    #[test]
    fn visible_scrolled_columns_skips_partial_columns() {
        let geometry = [(0, 6), (7, 6), (14, 6), (21, 6)];
        assert_eq!(visible_scrolled_columns(&geometry, 0, 13), 0..2);
        assert_eq!(visible_scrolled_columns(&geometry, 3, 20), 1..3);
        assert_eq!(visible_scrolled_columns(&geometry, 40, 20), 4..4);
    }

    #[test]
    fn proxy_scroll_moves_the_table_and_cursor() {
        let (mut state, mut runtime, mut view_data) = setup();
        sync_viewport(&mut state, &view_data, 80, 100);
        assert_eq!(state.layout, LayoutMode::Compact);
        assert!(state.scroll.max_offset() > 0);

        view_data.cursor.col = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('>'));
        assert_eq!(state.scroll.table_offset(), state.scroll.proxy_offset());
        assert!(state.scroll.table_offset() > 0);
        assert!(view_data.cursor.col > 1);
    }

    #[test]
    fn moving_right_reveals_the_cursor_column() {
        let (mut state, mut runtime, mut view_data) = setup();
        sync_viewport(&mut state, &view_data, 120, 100);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('$'));

        let geometry = scrolled_geometry(&grid_columns(&state), state.layout);
        let visible = visible_scrolled_columns(
            &geometry,
            state.scroll.table_offset(),
            state.scroll.viewport_width(),
        );
        assert!(visible.contains(&(view_data.cursor.col - 1)));
        assert_eq!(state.scroll.proxy_offset(), state.scroll.table_offset());
    }

    #[test]
    fn render_draws_tabs_header_and_grid() {
        let (mut state, _, view_data) = setup();
        sync_viewport(&mut state, &view_data, 140, 100);
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).expect("terminal");
        terminal
            .draw(|frame| render(frame, &state, &view_data))
            .expect("draw");

        let content = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(content.contains("carebook"));
        assert!(content.contains("2024-09"));
        assert!(content.contains("NAV"));
    }
}
