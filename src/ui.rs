use crate::category::Category;
use crate::expense::Expense;
use crate::interpreter::interpret;
use crate::summary::{format_currency, format_simple_date, format_date, Summary};
use crate::worker::{Snapshot, StoreWorker};
use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Expenses,
    Breakdown,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Expenses,
            Page::Expenses => Page::Breakdown,
            Page::Breakdown => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Breakdown,
            Page::Expenses => Page::Dashboard,
            Page::Breakdown => Page::Expenses,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Expenses => "Expenses",
            Page::Breakdown => "Breakdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Utterance,
}

pub struct App {
    pub expenses: Vec<Expense>,
    pub filtered_expenses: Vec<Expense>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub category_filter: Option<Category>,
    pub input_mode: InputMode,
    pub input: String,
    pub status: Option<String>,
    pub income: f64,
    pub recent_limit: usize,
}

impl App {
    pub fn new(income: f64, recent_limit: usize) -> Self {
        Self {
            expenses: Vec::new(),
            filtered_expenses: Vec::new(),
            state: TableState::default(),
            current_page: Page::Dashboard,
            show_detail: false,
            category_filter: None,
            input_mode: InputMode::Normal,
            input: String::new(),
            status: None,
            income,
            recent_limit,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.expenses = snapshot.expenses;
        self.refilter();
    }

    pub fn summary(&self) -> Summary {
        Summary::from_expenses(&self.expenses, self.income, self.recent_limit)
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_expense(&self) -> Option<&Expense> {
        self.state.selected().and_then(|i| self.filtered_expenses.get(i))
    }

    /// None → Food → Transport → ... → Other → None
    pub fn cycle_filter(&mut self) {
        self.category_filter = match self.category_filter {
            None => Some(Category::ALL[0]),
            Some(current) => Category::ALL
                .iter()
                .position(|c| *c == current)
                .and_then(|i| Category::ALL.get(i + 1))
                .copied(),
        };
        self.refilter();
    }

    pub fn clear_filter(&mut self) {
        self.category_filter = None;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered_expenses = match self.category_filter {
            None => self.expenses.clone(),
            Some(category) => self
                .expenses
                .iter()
                .filter(|e| e.category == category.label())
                .cloned()
                .collect(),
        };

        // Keep the cursor where it was when possible
        let len = self.filtered_expenses.len();
        let selected = match (self.state.selected(), len) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.state.select(selected);
    }

    /// Interpret the typed utterance and hand it to the store
    pub fn submit_input(&mut self, worker: &StoreWorker) {
        let utterance = std::mem::take(&mut self.input);
        self.input_mode = InputMode::Normal;

        if utterance.trim().is_empty() {
            return;
        }

        let expense = Expense::from_candidate(interpret(&utterance), Utc::now());
        self.status = Some(format!(
            "Expense added via voice! {} · {}",
            format_currency(expense.amount),
            expense.category
        ));
        worker.insert(expense);
    }

    pub fn delete_selected(&mut self, worker: &StoreWorker) {
        if let Some((id, description)) = self
            .selected_expense()
            .map(|expense| (expense.id, expense.description.clone()))
        {
            self.status = Some(format!("Deleted: {}", description));
            worker.delete(id);
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.filtered_expenses.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered_expenses.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App, worker: &StoreWorker) -> Result<()> {
    let snapshots = worker.subscribe();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, worker, &snapshots);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    worker: &StoreWorker,
    snapshots: &Receiver<Snapshot>,
) -> Result<()> {
    loop {
        while let Ok(snapshot) = snapshots.try_recv() {
            app.apply_snapshot(snapshot);
        }

        terminal.draw(|f| ui(f, app))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Utterance => match key.code {
                KeyCode::Enter => app.submit_input(worker),
                KeyCode::Esc => {
                    app.input.clear();
                    app.input_mode = InputMode::Normal;
                }
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('v') | KeyCode::Char('a') => {
                    app.status = None;
                    app.input_mode = InputMode::Utterance;
                }
                KeyCode::Char('d') => app.delete_selected(worker),
                KeyCode::Char('f') => app.cycle_filter(),
                KeyCode::Char('c') => app.clear_filter(),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation + totals
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Input / status bar
        ])
        .split(f.size());

    let summary = app.summary();
    render_header(f, chunks[0], app, &summary);

    match app.current_page {
        Page::Dashboard => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            render_recent(f, halves[0], &summary);
            render_chart(f, halves[1], &summary);
        }
        Page::Expenses if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);
            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Expenses => render_table(f, chunks[1], app),
        Page::Breakdown => render_breakdown(f, chunks[1], &summary),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, summary: &Summary) {
    let pages = [Page::Dashboard, Page::Expenses, Page::Breakdown];

    let mut spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    let balance_color = if summary.balance < 0.0 { Color::Red } else { Color::Green };

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Balance {}", format_currency(summary.balance)),
        Style::default().fg(balance_color).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("↓ {}", format_currency(summary.total_expenses)),
        Style::default().fg(Color::Red),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("↑ {}", format_currency(summary.income)),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn expense_row(expense: &Expense) -> Row<'static> {
    Row::new(vec![
        Cell::from(format_simple_date(&expense.date)),
        Cell::from(truncate(&expense.description, 40)),
        Cell::from(expense.category.clone()),
        Cell::from(format_currency(expense.amount)).style(Style::default().fg(Color::Red)),
    ])
    .height(1)
}

const EXPENSE_WIDTHS: [Constraint; 4] = [
    Constraint::Length(12),
    Constraint::Min(20),
    Constraint::Length(15),
    Constraint::Length(14),
];

fn render_recent(f: &mut Frame, area: Rect, summary: &Summary) {
    if summary.recent.is_empty() {
        let empty = Paragraph::new("\n  No expenses yet. Press v to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Recent Expenses "));
        f.render_widget(empty, area);
        return;
    }

    let table = Table::new(summary.recent.iter().map(expense_row), EXPENSE_WIDTHS)
        .header(header_row(&["Date", "Description", "Category", "Amount"]))
        .block(Block::default().borders(Borders::ALL).title(" Recent Expenses "));

    f.render_widget(table, area);
}

fn render_chart(f: &mut Frame, area: Rect, summary: &Summary) {
    let bars: Vec<(String, u64)> = summary
        .breakdown
        .iter()
        .map(|share| (share.category.clone(), share.total.round().max(0.0) as u64))
        .collect();
    let data: Vec<(&str, u64)> = bars.iter().map(|(label, value)| (label.as_str(), *value)).collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Spending by Category "),
        )
        .data(data.as_slice())
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let title = match app.category_filter {
        Some(category) => format!(" Expenses · {} ", category.label()),
        None => " Expenses ".to_string(),
    };

    let table = Table::new(app.filtered_expenses.iter().map(expense_row), EXPENSE_WIDTHS)
        .header(header_row(&["Date", "Description", "Category", "Amount"]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_breakdown(f: &mut Frame, area: Rect, summary: &Summary) {
    let rows = summary.breakdown.iter().map(|share| {
        Row::new(vec![
            Cell::from(share.category.clone()),
            Cell::from(format_currency(share.total)),
            Cell::from(format!("{:.1}%", share.percent)),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(20), Constraint::Length(16), Constraint::Length(10)],
    )
    .header(header_row(&["Category", "Total", "Share"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Breakdown · {} expenses ", summary.expense_count)),
    );

    f.render_widget(table, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Expense Details ");

    let Some(expense) = app.selected_expense() else {
        f.render_widget(Paragraph::new("No expense selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Date: ", label), Span::raw(format_date(&expense.date))]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label),
            Span::styled(format_currency(expense.amount), Style::default().fg(Color::Red)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Category: ", label), Span::raw(expense.category.clone())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Recorded: ", label),
            Span::raw(format_date(&expense.created_at)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Description: ", label)]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                expense.description.clone(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Yellow);

    let line = match app.input_mode {
        InputMode::Utterance => Line::from(vec![
            Span::styled(" Say it: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(app.input.clone()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        InputMode::Normal => {
            let mut spans = vec![];
            if let Some(status) = &app.status {
                spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Green)));
                spans.push(Span::raw("| "));
            }
            for (k, text) in [
                ("v", " Add | "),
                ("d", " Delete | "),
                ("f", " Filter | "),
                ("Enter", " Details | "),
                ("Tab", " Page | "),
            ] {
                spans.push(Span::styled(k, key));
                spans.push(Span::raw(text));
            }
            spans.push(Span::styled("q", Style::default().fg(Color::Red)));
            spans.push(Span::raw(" Quit"));
            Line::from(spans)
        }
    };

    let status_bar = Paragraph::new(line).block(
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
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ExpenseStore;
    use std::time::Duration;

    fn snapshot(expenses: Vec<Expense>) -> Snapshot {
        Snapshot {
            expenses,
            ..Snapshot::default()
        }
    }

    fn sample() -> Vec<Expense> {
        let now = Utc::now();
        vec![
            Expense::new(10.0, "lunch", Category::Food, now),
            Expense::new(20.0, "uber", Category::Transport, now),
            Expense::new(5.0, "dinner", Category::Food, now),
        ]
    }

    #[test]
    fn test_filter_cycle() {
        let mut app = App::new(2000.0, 5);
        app.apply_snapshot(snapshot(sample()));
        assert_eq!(app.filtered_expenses.len(), 3);

        app.cycle_filter();
        assert_eq!(app.category_filter, Some(Category::Food));
        assert_eq!(app.filtered_expenses.len(), 2);

        for _ in 0..Category::ALL.len() {
            app.cycle_filter();
        }
        assert_eq!(app.category_filter, None);
        assert_eq!(app.filtered_expenses.len(), 3);
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut app = App::new(0.0, 5);
        app.apply_snapshot(snapshot(sample()));
        assert_eq!(app.state.selected(), Some(0));

        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));

        app.state.select(Some(2));
        app.apply_snapshot(snapshot(sample().into_iter().take(1).collect()));
        assert_eq!(app.state.selected(), Some(0));

        app.apply_snapshot(snapshot(Vec::new()));
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_submit_input_goes_through_worker() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();
        let snapshots = worker.subscribe();
        snapshots.recv_timeout(Duration::from_secs(5)).unwrap();

        let mut app = App::new(2000.0, 5);
        app.input_mode = InputMode::Utterance;
        app.input = "Gas 40".to_string();
        app.submit_input(&worker);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.input.is_empty());

        app.apply_snapshot(snapshots.recv_timeout(Duration::from_secs(5)).unwrap());
        assert_eq!(app.expenses.len(), 1);
        assert_eq!(app.expenses[0].category, "Transport");
        assert_eq!(app.summary().balance, 1960.0);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ünïcödé description", 8), "Ünïcö...");
    }
}
