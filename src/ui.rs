use crate::{
    round::{
        BetSide,
        Round,
        RoundOutcome,
    },
    state::{
        AppState,
        NotificationLevel,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Refresh,
    SetBettableStatus(bool),
    DeclareResult(RoundOutcome),
    GenesisStartRound,
    Search(String),
    PlaceBet {
        side: BetSide,
        round_id: String,
        amount: String,
    },
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    desired_status: bool,
    current_round: Option<String>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    StatusModal,
    DeclareModal(RoundOutcome),
    GenesisModal,
    SearchModal(String),
    BetModal(BetForm),
    QuitModal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct BetForm {
    round_id: String,
    amount: String,
    focus: BetField,
    side: BetSide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BetField {
    RoundId,
    Amount,
}

impl BetForm {
    fn new(current_round: Option<&str>) -> Self {
        let round_id = current_round.unwrap_or_default().to_string();
        let focus = if round_id.is_empty() {
            BetField::RoundId
        } else {
            BetField::Amount
        };
        Self {
            round_id,
            amount: String::new(),
            focus,
            side: BetSide::Red,
        }
    }

    fn focused(&mut self) -> &mut String {
        match self.focus {
            BetField::RoundId => &mut self.round_id,
            BetField::Amount => &mut self.amount,
        }
    }

    fn switch_focus(&mut self) {
        self.focus = match self.focus {
            BetField::RoundId => BetField::Amount,
            BetField::Amount => BetField::RoundId,
        };
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Keep one Terminal so ratatui can diff buffers between draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(err)) => Err(err.into()),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, app: &AppState) -> Result<()> {
    state.current_round = app.current_round.map(|id| id.to_string());
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, app))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to a user intent, updating modal state on the way.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    match &mut state.mode {
        Mode::Normal => {}
        Mode::StatusModal => {
            return match key.code {
                KeyCode::Esc => close(state),
                KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                    state.desired_status = !state.desired_status;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::SetBettableStatus(state.desired_status))
                }
                _ => None,
            };
        }
        Mode::DeclareModal(outcome) => {
            return match key.code {
                KeyCode::Esc => close(state),
                KeyCode::Left | KeyCode::Char('h') => {
                    *outcome = outcome.prev();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    *outcome = outcome.next();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    let picked = c
                        .to_digit(10)
                        .and_then(|d| u8::try_from(d).ok())
                        .and_then(RoundOutcome::from_index)?;
                    *outcome = picked;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let outcome = *outcome;
                    state.mode = Mode::Normal;
                    Some(UserEvent::DeclareResult(outcome))
                }
                _ => None,
            };
        }
        Mode::GenesisModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::GenesisStartRound)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => close(state),
                _ => None,
            };
        }
        Mode::SearchModal(input) => {
            return match key.code {
                KeyCode::Esc => close(state),
                KeyCode::Backspace => {
                    input.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    input.push(c);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter if !input.is_empty() => {
                    let query = std::mem::take(input);
                    state.mode = Mode::Normal;
                    Some(UserEvent::Search(query))
                }
                _ => None,
            };
        }
        Mode::BetModal(form) => {
            return match key.code {
                KeyCode::Esc => close(state),
                KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                    form.switch_focus();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Left | KeyCode::Right => {
                    form.side = form.side.toggle();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Backspace => {
                    form.focused().pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    form.focused().push(c);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char('.') if form.focus == BetField::Amount => {
                    form.amount.push('.');
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let event = UserEvent::PlaceBet {
                        side: form.side,
                        round_id: form.round_id.clone(),
                        amount: form.amount.clone(),
                    };
                    state.mode = Mode::Normal;
                    Some(event)
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => close(state),
                _ => None,
            };
        }
    }

    let mode = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Mode::QuitModal,
        KeyCode::Char('o') => Mode::StatusModal,
        KeyCode::Char('d') => Mode::DeclareModal(RoundOutcome::Red),
        KeyCode::Char('g') => Mode::GenesisModal,
        KeyCode::Char('f') => Mode::SearchModal(String::new()),
        KeyCode::Char('b') => Mode::BetModal(BetForm::new(state.current_round.as_deref())),
        KeyCode::Char('r') => return Some(UserEvent::Refresh),
        _ => return None,
    };
    state.mode = mode;
    Some(UserEvent::Redraw)
}

fn close(state: &mut UiState) -> Option<UserEvent> {
    state.mode = Mode::Normal;
    Some(UserEvent::Redraw)
}

fn ui(f: &mut Frame, state: &UiState, app: &AppState) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // title + network
            Constraint::Min(14),    // three columns
            Constraint::Length(10), // transaction history
            Constraint::Length(7),  // notifications + pending
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    draw_columns(f, chunks[1], state, app);
    draw_history(f, chunks[2], app);
    draw_notifications(f, chunks[3], app);
    draw_help(f, chunks[4]);
    draw_modals(f, state, app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &AppState) {
    let chain = match app.chain_id {
        Some(id) if id == app.expected_chain_id => {
            Span::styled(format!("{} ✔", app.network_name), Style::default().fg(Color::Green))
        }
        Some(id) => Span::styled(
            format!("wrong network (chain {id})"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled("network unknown", Style::default().fg(Color::DarkGray)),
    };
    let synced = app
        .last_synced
        .map(|t| format!("synced {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| String::from("not synced"));
    let mode = if app.read_only { " | read-only" } else { "" };
    let line = Line::from(vec![
        Span::styled(
            "COCK FIGHT BETTING",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        chain,
        Span::raw(format!("  |  {synced}{mode}")),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_columns(f: &mut Frame, area: Rect, state: &UiState, app: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    // Left: current round details, bettable status
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(4)])
        .split(cols[0]);
    let details = match &app.round {
        Some(round) => round_lines(round),
        None => vec![Line::from("Loading...")],
    };
    f.render_widget(
        Paragraph::new(details)
            .block(Block::default().borders(Borders::ALL).title("CURRENT FIGHT DETAILS")),
        left[0],
    );
    let checkbox = if state.desired_status { "[x]" } else { "[ ]" };
    f.render_widget(
        Paragraph::new(vec![
            Line::from(format!("{checkbox} Status")),
            Line::styled("o: set status", Style::default().fg(Color::DarkGray)),
        ])
        .block(Block::default().borders(Borders::ALL).title("OPEN/CLOSE BETS")),
        left[1],
    );

    // Middle: round number, status, admin actions
    let mut middle = vec![Line::styled(
        app.current_round
            .map(|id| id.to_string())
            .unwrap_or_else(|| String::from("-")),
        Style::default().add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center)];
    if let Some(round) = &app.round {
        middle.push(Line::from(""));
        middle.push(Line::from("CURRENT FIGHT STATUS"));
        middle.push(
            Line::styled(round.status_label(), status_style(round.is_open))
                .alignment(Alignment::Center),
        );
    }
    middle.push(Line::from(""));
    middle.push(Line::styled(
        "d: declare winner (0 = RED, 1 = BLUE, 2 = DRAW)",
        Style::default().fg(Color::DarkGray),
    ));
    middle.push(Line::styled(
        "g: genesis start round",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(
        Paragraph::new(middle)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("CURRENT FIGHT NO.")),
        cols[1],
    );

    // Right: search + bet
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(4)])
        .split(cols[2]);
    let mut searched = vec![Line::styled(
        "f: enter fight no.",
        Style::default().fg(Color::DarkGray),
    )];
    if let Some(round) = &app.searched_round {
        searched.extend(round_lines(round));
    }
    f.render_widget(
        Paragraph::new(searched)
            .block(Block::default().borders(Borders::ALL).title("SEARCH FIGHT")),
        right[0],
    );
    f.render_widget(
        Paragraph::new(vec![Line::styled(
            "b: bet red / blue",
            Style::default().fg(Color::DarkGray),
        )])
        .block(Block::default().borders(Borders::ALL).title("PLACE BET")),
        right[1],
    );
}

pub fn round_lines(round: &Round) -> Vec<Line<'static>> {
    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::raw(format!("{label}: ")),
            Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
        ])
    };
    let result = match round.outcome() {
        Some(outcome) => format!("{} ({outcome})", round.result),
        None => round.result.clone(),
    };
    vec![
        field("FIGHT NO.", round.id_game.clone()),
        field("TOTAL BET", round.total_amount_bet.clone()),
        field("TOTAL BET RED", round.red_amount.clone()),
        field("TOTAL BET WHITE", round.blue_amount.clone()),
        field("ODDS", round.odds_amount.clone()),
        Line::from(vec![
            Span::raw("FIGHT STATUS: "),
            Span::styled(round.status_label(), status_style(round.is_open)),
        ]),
        Line::from(format!("FIGHT RESULT: {result}")),
    ]
}

fn status_style(open: bool) -> Style {
    if open {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn draw_history(f: &mut Frame, area: Rect, app: &AppState) {
    let items: Vec<ListItem> = if app.log.is_empty() {
        vec![ListItem::new(Line::styled(
            "No transactions yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.log
            .entries()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, entry)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("Transaction {}: ", i + 1),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(entry.description()),
                ]))
            })
            .collect()
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Transaction History"));
    f.render_widget(list, area);
}

fn draw_notifications(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = app
        .notifications()
        .rev()
        .map(|n| {
            let color = match n.level {
                NotificationLevel::Success => Color::Green,
                NotificationLevel::Warning => Color::Yellow,
                NotificationLevel::Error => Color::Red,
            };
            Line::styled(
                format!("{} {}", n.raised_at.format("%H:%M:%S"), n.message),
                Style::default().fg(color),
            )
        })
        .collect();
    let pending: Vec<&str> = app.in_flight().map(|kind| kind.label()).collect();
    let pending_line = if pending.is_empty() {
        Line::styled("Idle", Style::default().fg(Color::DarkGray))
    } else {
        Line::styled(
            format!("⏳ Pending: {}", pending.join(", ")),
            Style::default().fg(Color::Yellow),
        )
    };
    lines.insert(0, pending_line);
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(panel, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "o status | d declare | g genesis | f search | b bet | r refresh | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, app: &AppState) {
    let (title, lines) = match &state.mode {
        Mode::Normal => return,
        Mode::StatusModal => {
            let checkbox = if state.desired_status { "[x]" } else { "[ ]" };
            (
                "Set Bettable Status",
                vec![
                    Line::from(format!("{checkbox} Status (space to toggle)")),
                    Line::from("Enter: set status  Esc: cancel"),
                ],
            )
        }
        Mode::DeclareModal(selected) => {
            let options: Vec<Span> = RoundOutcome::ALL
                .iter()
                .map(|outcome| {
                    let label = format!(" {} = {} ", outcome.index(), outcome);
                    if outcome == selected {
                        Span::styled(
                            label,
                            Style::default().fg(Color::Black).bg(Color::Yellow),
                        )
                    } else {
                        Span::raw(label)
                    }
                })
                .collect();
            let round = app
                .current_round
                .map(|id| id.to_string())
                .unwrap_or_else(|| String::from("-"));
            (
                "Declare Winner",
                vec![
                    Line::from(format!("Round: {round}")),
                    Line::from(options),
                    Line::from("←/→ or 0-2: pick  Enter: declare  Esc: cancel"),
                ],
            )
        }
        Mode::GenesisModal => (
            "Genesis Start Round",
            vec![Line::from("Start the genesis round? (y/n)")],
        ),
        Mode::SearchModal(input) => (
            "Search Fight",
            vec![
                Line::from(format!("Fight No.: {input}_")),
                Line::from("Enter: search  Esc: cancel"),
            ],
        ),
        Mode::BetModal(form) => {
            let marker = |field: BetField| if form.focus == field { "> " } else { "  " };
            let side_style = match form.side {
                BetSide::Red => Style::default().fg(Color::Red),
                BetSide::Blue => Style::default().fg(Color::Blue),
            };
            (
                "Place Bet",
                vec![
                    Line::from(format!(
                        "{}Game ID: {}",
                        marker(BetField::RoundId),
                        form.round_id
                    )),
                    Line::from(format!(
                        "{}Amount (in ether): {}",
                        marker(BetField::Amount),
                        form.amount
                    )),
                    Line::from(vec![
                        Span::raw("  Side: "),
                        Span::styled(format!("BET {}", form.side).to_uppercase(), side_style),
                    ]),
                    Line::from("Tab: field  ←/→: side  Enter: bet  Esc: cancel"),
                ],
            )
        }
        Mode::QuitModal => ("Quit", vec![Line::from("Quit? (y/n)")]),
    };
    let area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, area);
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(modal, area);
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
