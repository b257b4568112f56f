use std::{
    io,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use fathom_tui::chunk::{find_term, terms};
use fathom_tui::columns::{ClickOutcome, ColumnState, IgnoreReason, ScrollCommand, TermClick};
use fathom_tui::config::AppConfig;
use fathom_tui::container::{ColumnContainer, Focus};
use fathom_tui::document::Document;
use fathom_tui::logging;
use fathom_tui::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: isize = 3;
const PAGE_SCROLL_LINES: isize = 10;

/// Read a nested document one definition at a time, in side-by-side columns.
#[derive(Parser, Debug)]
#[command(name = "fathom", version, about)]
struct Cli {
    /// JSON document to open. The built-in sample is shown when omitted.
    document: Option<PathBuf>,

    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log output to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_path = logging::log_file(cli.log_file.as_deref());
    logging::init(log_path.as_deref()).context("failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::load(),
    };
    let document = match &cli.document {
        Some(path) => Document::load(path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => Document::sample(),
    };
    log::info!("opening \"{}\"", document.title);

    let mut app = App::new(document, &config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    if config.tui.mouse_enabled {
        execute!(stdout, EnableMouseCapture).context("failed to enable mouse capture")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app, config.tui.tick_rate()).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt);
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.has_status_message();
            app.on_tick();
            last_tick = Instant::now();
            // Only redraw if status message changed (was pruned)
            if had_message_before && !app.has_status_message() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

struct App {
    document: Document,
    state: ColumnState,
    container: ColumnContainer,
    theme: Theme,
    focus: Option<Focus>,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn new(document: Document, config: &AppConfig) -> Self {
        let state = ColumnState::new(Arc::clone(&document.root));
        let focus = Some(Focus {
            column: 0,
            term_id: terms(&document.root).next().map(|term| term.id.clone()),
        });
        Self {
            document,
            state,
            container: ColumnContainer::new(config.layout.clone()),
            theme: Theme::new(),
            focus,
            should_quit: false,
            status_message: None,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let columns_area = vertical[0];
        let status_area = vertical[1];

        self.container.draw(
            frame,
            columns_area,
            &self.state,
            self.focus.as_ref(),
            &self.theme,
        );

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let column_text = format!("{}/{}", self.focused_column() + 1, self.state.len());

        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{column_text} ")),
                Span::raw(message.clone()),
            ]);
        }

        let all_shortcuts = ["[]:Scroll", "Tab:Next", "Enter:Open", "q:Quit"];

        let mut spans = vec![
            Span::raw(column_text),
            Span::raw(" "),
            Span::styled(self.document.title.clone(), self.theme.title_style()),
        ];
        let breadcrumbs = self.state.breadcrumbs();
        if !breadcrumbs.is_empty() {
            spans.push(Span::raw(format!(" > {}", breadcrumbs.join(" > "))));
        }

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();

        // Keep the most important shortcuts when space runs out.
        let min_padding = 1;
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn focused_column(&self) -> usize {
        self.focus.as_ref().map(|focus| focus.column).unwrap_or(0)
    }

    /// Dispatch a term activation to the column state and follow up on the
    /// outcome.
    fn activate(&mut self, click: TermClick) {
        let outcome = self.state.on_term_click(&click);
        self.container.request(outcome.scroll());

        match &outcome {
            ClickOutcome::Ignored(IgnoreReason::Leaf) => {
                let label = self
                    .state
                    .columns()
                    .get(click.column_index)
                    .and_then(|column| find_term(&column.content, &click.term_id))
                    .map(|term| term.label.clone())
                    .unwrap_or_default();
                self.set_status(format!("\"{label}\" has nothing to expand"));
            }
            ClickOutcome::Ignored(reason) => {
                log::debug!("click on {} ignored: {reason:?}", click.term_id);
            }
            ClickOutcome::Collapsed { chain } if !chain.is_empty() => {
                self.set_status(format!(
                    "Closed {} nested column(s); reopen to restore",
                    chain.len()
                ));
            }
            ClickOutcome::Restored {
                restored,
                requested,
            } => {
                self.set_status(format!("Restored {restored} of {requested} column(s)"));
            }
            ClickOutcome::Collapsed { .. } | ClickOutcome::Opened => {}
        }

        // Focus follows the scroll to the newest column.
        if outcome.scroll() == ScrollCommand::ToEnd {
            self.focus_column(self.state.len() - 1);
        } else if outcome.changed_columns() {
            self.focus = Some(Focus {
                column: click.column_index,
                term_id: Some(click.term_id),
            });
        }
    }

    fn activate_focused(&mut self) {
        if let Some(Focus {
            column,
            term_id: Some(term_id),
        }) = self.focus.clone()
        {
            self.activate(TermClick::new(term_id, column));
        }
    }

    /// Move focus to the next or previous term of the focused column,
    /// wrapping around.
    fn move_focus_within(&mut self, delta: isize) {
        let column = self.focused_column();
        let Some(content) = self.state.columns().get(column).map(|c| Arc::clone(&c.content))
        else {
            return;
        };
        let ids: Vec<&str> = terms(&content).map(|term| term.id.as_str()).collect();
        if ids.is_empty() {
            return;
        }
        let current = self
            .focus
            .as_ref()
            .and_then(|focus| focus.term_id.as_deref())
            .and_then(|focused| ids.iter().position(|id| *id == focused));
        let next = match current {
            Some(index) => (index as isize + delta).rem_euclid(ids.len() as isize) as usize,
            None => 0,
        };
        self.focus = Some(Focus {
            column,
            term_id: Some(ids[next].to_string()),
        });
    }

    /// Move focus to column `index`, landing on the term whose column is
    /// open to its right when there is one. A column without terms can still
    /// hold focus.
    fn focus_column(&mut self, index: usize) {
        let Some(column) = self.state.columns().get(index) else {
            return;
        };
        let open_child = self
            .state
            .columns()
            .get(index + 1)
            .and_then(|next| next.source_term_id.clone())
            .filter(|source| terms(&column.content).any(|term| &term.id == source));
        let term_id = open_child.or_else(|| terms(&column.content).next().map(|t| t.id.clone()));
        self.focus = Some(Focus {
            column: index,
            term_id,
        });
        self.container.reveal(index);
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.move_focus_within(1),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => self.move_focus_within(-1),
            KeyCode::Left | KeyCode::Char('h') => {
                let column = self.focused_column();
                if column > 0 {
                    self.focus_column(column - 1);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let column = self.focused_column();
                self.focus_column(column + 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_focused(),
            KeyCode::Char('[') => self.container.scroll_columns(-1),
            KeyCode::Char(']') => self.container.scroll_columns(1),
            KeyCode::PageUp => {
                let column = self.focused_column();
                self.container
                    .scroll_column_content(&self.state, column, -PAGE_SCROLL_LINES);
            }
            KeyCode::PageDown => {
                let column = self.focused_column();
                self.container
                    .scroll_column_content(&self.state, column, PAGE_SCROLL_LINES);
            }
            _ => {}
        }
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        let horizontal = event.modifiers.contains(KeyModifiers::SHIFT);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(click) = self.container.hit_test(event.column, event.row) {
                    self.activate(click);
                }
            }
            MouseEventKind::ScrollLeft => self.container.scroll_columns(-1),
            MouseEventKind::ScrollRight => self.container.scroll_columns(1),
            MouseEventKind::ScrollUp if horizontal => self.container.scroll_columns(-1),
            MouseEventKind::ScrollDown if horizontal => self.container.scroll_columns(1),
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let delta = if event.kind == MouseEventKind::ScrollUp {
                    -MOUSE_SCROLL_LINES
                } else {
                    MOUSE_SCROLL_LINES
                };
                if let Some(column) = self.container.column_at(event.column, event.row) {
                    self.container
                        .scroll_column_content(&self.state, column, delta);
                }
            }
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code),
            Event::Mouse(mouse_event) => self.handle_mouse_event(mouse_event),
            _ => {}
        }
    }
}
