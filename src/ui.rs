use crate::record::RawEntry;
use crate::schema::{CategorySchema, FieldDefinition, FieldKind};
use crate::store::RecordStore;
use crate::workflow::{EntryWorkflow, Submission};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

/// Columns shown in the records table; the detail pane shows the rest
const MAX_RECORD_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Categories,
    Form,
    Records,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Categories => Focus::Form,
            Focus::Form => Focus::Records,
            Focus::Records => Focus::Categories,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Focus::Categories => "Categories",
            Focus::Form => "New Entry",
            Focus::Records => "Existing Records",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

pub struct App<'r, S: RecordStore> {
    pub workflow: EntryWorkflow<'r, S>,
    pub focus: Focus,
    pub category_state: TableState,
    pub records_state: TableState,
    pub field_index: usize,
    pub inputs: Vec<String>,
    pub messages: Vec<Message>,
}

impl<'r, S: RecordStore> App<'r, S> {
    pub fn new(workflow: EntryWorkflow<'r, S>) -> Self {
        let mut category_state = TableState::default();
        category_state.select(Some(0));

        let mut app = Self {
            workflow,
            focus: Focus::Categories,
            category_state,
            records_state: TableState::default(),
            field_index: 0,
            inputs: Vec::new(),
            messages: Vec::new(),
        };
        app.reset_form();
        app
    }

    pub fn selected_category(&self) -> &'r CategorySchema {
        let categories = self.workflow.categories();
        let i = self.category_state.selected().unwrap_or(0);
        &categories[i.min(categories.len().saturating_sub(1))]
    }

    pub fn selected_field(&self) -> Option<&'r FieldDefinition> {
        self.selected_category().fields.get(self.field_index)
    }

    fn reset_form(&mut self) {
        self.inputs = vec![String::new(); self.selected_category().fields.len()];
        self.field_index = 0;
        self.records_state.select(None);
    }

    pub fn next_category(&mut self) {
        let len = self.workflow.categories().len();
        if len == 0 {
            return;
        }
        let i = match self.category_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.category_state.select(Some(i));
        self.messages.clear();
        self.reset_form();
    }

    pub fn previous_category(&mut self) {
        let len = self.workflow.categories().len();
        if len == 0 {
            return;
        }
        let i = match self.category_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.category_state.select(Some(i));
        self.messages.clear();
        self.reset_form();
    }

    pub fn next_field(&mut self) {
        let len = self.inputs.len();
        if len > 0 {
            self.field_index = (self.field_index + 1) % len;
        }
    }

    pub fn previous_field(&mut self) {
        let len = self.inputs.len();
        if len > 0 {
            self.field_index = (self.field_index + len - 1) % len;
        }
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(input) = self.inputs.get_mut(self.field_index) {
            input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(input) = self.inputs.get_mut(self.field_index) {
            input.pop();
        }
    }

    /// Current form contents; blank numeric inputs are left out so they take
    /// the widget default.
    pub fn raw_entry(&self) -> RawEntry {
        self.selected_category()
            .fields
            .iter()
            .zip(&self.inputs)
            .filter(|(field, input)| !(field.kind.is_numeric() && input.trim().is_empty()))
            .map(|(field, input)| (field.name.clone(), input.clone()))
            .collect()
    }

    pub fn submit(&mut self) {
        let category = self.selected_category();
        let raw = self.raw_entry();

        self.messages = match self.workflow.submit(&category.name, &raw) {
            Ok(Submission::Accepted(_)) => {
                self.reset_form();
                let count = self.records().len();
                if count > 0 {
                    self.records_state.select(Some(count - 1));
                }
                vec![Message {
                    kind: MessageKind::Success,
                    text: "Entry added successfully!".to_string(),
                }]
            }
            Ok(Submission::Rejected(errors)) => errors
                .iter()
                .map(|e| Message {
                    kind: MessageKind::Error,
                    text: e.to_string(),
                })
                .collect(),
            Err(e) => vec![Message {
                kind: MessageKind::Error,
                text: format!("Entry not saved: {}", e),
            }],
        };
    }

    pub fn records(&self) -> &[crate::record::NormalizedRecord] {
        self.workflow
            .records(&self.selected_category().name)
            .unwrap_or(&[])
    }

    pub fn selected_record(&self) -> Option<&crate::record::NormalizedRecord> {
        self.records_state
            .selected()
            .and_then(|i| self.records().get(i))
    }

    /// Every stored field of the highlighted record, in schema order
    pub fn record_details(&self) -> Vec<(String, String)> {
        self.selected_record()
            .map(|record| {
                record
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn next_record(&mut self) {
        let len = self.records().len();
        if len == 0 {
            return;
        }
        let i = match self.records_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.records_state.select(Some(i));
    }

    pub fn previous_record(&mut self) {
        let len = self.records().len();
        if len == 0 {
            return;
        }
        let i = match self.records_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.records_state.select(Some(i));
    }

    /// Handle one key press; returns false when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match self.focus {
            Focus::Categories => match code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Down | KeyCode::Char('j') => self.next_category(),
                KeyCode::Up | KeyCode::Char('k') => self.previous_category(),
                KeyCode::Enter | KeyCode::Tab => self.focus = Focus::Form,
                _ => {}
            },
            Focus::Form => match code {
                KeyCode::Esc => self.focus = Focus::Categories,
                KeyCode::Tab => self.focus = self.focus.next(),
                KeyCode::Enter => self.submit(),
                KeyCode::Down => self.next_field(),
                KeyCode::Up => self.previous_field(),
                KeyCode::Backspace => self.backspace(),
                KeyCode::Char(c) => self.type_char(c),
                _ => {}
            },
            Focus::Records => match code {
                KeyCode::Char('q') => return false,
                KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Categories,
                KeyCode::Down | KeyCode::Char('j') => self.next_record(),
                KeyCode::Up | KeyCode::Char('k') => self.previous_record(),
                _ => {}
            },
        }
        true
    }
}

pub fn run_ui<S: RecordStore>(app: &mut App<'_, S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend, S: RecordStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<'_, S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn ui<S: RecordStore>(f: &mut Frame, app: &mut App<'_, S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(42), // Category selector
            Constraint::Min(0),     // Form + records
        ])
        .split(chunks[1]);

    let message_height = (app.messages.len() as u16).min(6) + 2;
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(message_height),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    render_categories(f, columns[0], app);
    render_form(f, right[0], app);
    render_messages(f, right[1], app);
    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(right[2]);

    render_records(f, lower[0], app);
    render_record_detail(f, lower[1], app);

    render_status_bar(f, chunks[2], app);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_header<S: RecordStore>(f: &mut Frame, area: Rect, app: &App<'_, S>) {
    let category = app.selected_category();
    let total = app.workflow.collection().total_records();

    let spans = vec![
        Span::styled(
            "Family Records",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            category.name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} in category", app.records().len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(format!("{} total", total), Style::default().fg(Color::DarkGray)),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_categories<S: RecordStore>(f: &mut Frame, area: Rect, app: &mut App<'_, S>) {
    let rows: Vec<Row> = app
        .workflow
        .categories()
        .iter()
        .map(|category| {
            let count = app.workflow.records(&category.name).map_or(0, |r| r.len());
            Row::new(vec![
                Cell::from(truncate(&category.name, 34)),
                Cell::from(format!("{:>4}", count)).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(34), Constraint::Length(5)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::Categories))
                .title(format!(" {} ", Focus::Categories.title())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.category_state);
}

fn kind_hint(field: &FieldDefinition) -> String {
    let mut hint = match field.kind {
        FieldKind::Text if field.is_date() => "DD/MM/YYYY".to_string(),
        FieldKind::StringList => "comma separated".to_string(),
        kind => kind.name().to_string(),
    };
    if let Some(allowed) = field.allowed_values() {
        hint = allowed.join("/");
    }
    if field.is_required() {
        hint.push_str(", required");
    }
    hint
}

fn render_form<S: RecordStore>(f: &mut Frame, area: Rect, app: &App<'_, S>) {
    let focused = app.focus == Focus::Form;
    let category = app.selected_category();

    let lines: Vec<Line> = category
        .fields
        .iter()
        .zip(&app.inputs)
        .enumerate()
        .map(|(i, (field, input))| {
            let active = focused && i == app.field_index;
            let label_style = if active {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };

            let mut spans = vec![
                Span::raw(if active { " → " } else { "   " }),
                Span::styled(format!("{}: ", field.name), label_style),
                Span::raw(input.clone()),
            ];
            if active {
                spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
            }
            spans.push(Span::styled(
                format!("  ({})", kind_hint(field)),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ));
            Line::from(spans)
        })
        .collect();

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(format!(" {} - {} ", Focus::Form.title(), category.name)),
    );

    f.render_widget(form, area);
}

fn render_messages<S: RecordStore>(f: &mut Frame, area: Rect, app: &App<'_, S>) {
    let lines: Vec<Line> = app
        .messages
        .iter()
        .map(|m| {
            let color = match m.kind {
                MessageKind::Success => Color::Green,
                MessageKind::Error => Color::Red,
            };
            Line::from(Span::styled(format!(" {}", m.text), Style::default().fg(color)))
        })
        .collect();

    let messages = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(messages, area);
}

fn render_records<S: RecordStore>(f: &mut Frame, area: Rect, app: &mut App<'_, S>) {
    let category = app.selected_category();
    let columns: Vec<&str> = category.field_names().take(MAX_RECORD_COLUMNS).collect();

    let header_cells = columns.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .records()
        .iter()
        .map(|record| {
            let cells = columns.iter().map(|name| {
                let value = record.get(name).map(|v| v.to_string()).unwrap_or_default();
                Cell::from(truncate(&value, 28))
            });
            Row::new(cells).height(1)
        })
        .collect();

    let widths = vec![Constraint::Percentage(100 / MAX_RECORD_COLUMNS as u16); columns.len()];
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::Records))
                .title(format!(" {} ", Focus::Records.title())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.records_state);
}

fn render_record_detail<S: RecordStore>(f: &mut Frame, area: Rect, app: &App<'_, S>) {
    let details = app.record_details();

    let lines: Vec<Line> = if details.is_empty() {
        vec![Line::from(Span::styled(
            "Select a record to see all of its fields",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        details
            .into_iter()
            .map(|(name, value)| {
                Line::from(vec![
                    Span::styled(format!("{}: ", name), Style::default().fg(Color::Cyan)),
                    Span::raw(value),
                ])
            })
            .collect()
    };

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Record "));
    f.render_widget(detail, area);
}

fn render_status_bar<S: RecordStore>(f: &mut Frame, area: Rect, app: &App<'_, S>) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut spans = vec![Span::styled(
        format!(" {} ", app.focus.title()),
        Style::default().fg(Color::Cyan),
    )];
    spans.push(Span::raw(" | "));

    match app.focus {
        Focus::Categories => {
            spans.extend([key("↑/↓"), Span::raw(" Category | "), key("Enter"), Span::raw(" Fill form | ")]);
            spans.push(Span::styled("q", Style::default().fg(Color::Red)));
            spans.push(Span::raw(" Quit"));
        }
        Focus::Form => {
            spans.extend([
                key("↑/↓"),
                Span::raw(" Field | "),
                key("Enter"),
                Span::raw(" Submit | "),
                key("Tab"),
                Span::raw(" Records | "),
                key("Esc"),
                Span::raw(" Back"),
            ]);
        }
        Focus::Records => {
            spans.extend([key("↑/↓"), Span::raw(" Scroll | "), key("Esc"), Span::raw(" Back | ")]);
            spans.push(Span::styled("q", Style::default().fg(Color::Red)));
            spans.push(Span::raw(" Quit"));
        }
    }

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// TESTS
// ============================================================================
