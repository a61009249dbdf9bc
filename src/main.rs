use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use rand::Rng;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use h2h_terminal::auth::{TokenSource, token_source_from_config};
use h2h_terminal::config::AppConfig;
use h2h_terminal::player::PlayerIdentity;
use h2h_terminal::prediction::Side;
use h2h_terminal::profile::CreditStatus;
use h2h_terminal::provider::{Services, spawn_provider};
use h2h_terminal::state::{
    AppState, Delta, NoticeKind, PredictBlocked, ProviderCommand, Screen, SearchInput, apply_delta,
};

const CELEBRATION: Duration = Duration::from_millis(2500);
const CONFETTI_PARTICLES: usize = 40;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    plans_url: String,
    backend_label: &'static str,
    can_sign_in: bool,
}

impl App {
    fn new(cfg: &AppConfig, can_sign_in: bool, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
            plans_url: cfg.plans_url.clone(),
            backend_label: cfg.backend_label(),
            can_sign_in,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input.is_some() {
            self.on_input_key(key);
            return;
        }
        if self.state.notice.is_some()
            && matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('x'))
        {
            self.state.dismiss_notice();
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.open_search(0),
            KeyCode::Char('2') => self.open_search(1),
            KeyCode::Char('s') => self.state.cycle_surface(),
            KeyCode::Char('t') => self.state.cycle_category(),
            KeyCode::Char('p') => self.predict(),
            KeyCode::Char('m') => self.toggle_matches(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter if self.state.screen == Screen::Matches => self.pick_match(),
            KeyCode::Esc | KeyCode::Char('b') => self.state.screen = Screen::Predict,
            KeyCode::Char('i') => self.sign_in(),
            KeyCode::Char('r') => self.refresh_profile(),
            KeyCode::Char('o') => self.state.sign_out(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.state.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.input = None,
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Char(c) => input.buffer.push(c),
            KeyCode::Enter => {
                let side = input.side;
                let name = input.buffer.trim().to_string();
                self.state.input = None;
                if !name.is_empty() {
                    self.search(side, name);
                }
            }
            _ => {}
        }
    }

    fn open_search(&mut self, side: usize) {
        self.state.screen = Screen::Predict;
        self.state.input = Some(SearchInput {
            side,
            buffer: String::new(),
        });
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn search(&mut self, side: usize, name: String) {
        self.state.begin_search(side);
        if !self.send(ProviderCommand::SearchPlayer { side, name }, "Player search")
            && let Some(card) = self.state.players.get_mut(side)
        {
            card.loading = false;
        }
    }

    fn predict(&mut self) {
        match self.state.begin_prediction() {
            Ok(job) => {
                if !self.send(ProviderCommand::Predict(job), "Prediction") {
                    self.state.predict_busy = false;
                }
            }
            // Rejections already left a notice on the state.
            Err(PredictBlocked::Busy | PredictBlocked::Rejected(_)) => {}
        }
    }

    fn toggle_matches(&mut self) {
        if self.state.screen == Screen::Matches {
            self.state.screen = Screen::Predict;
            return;
        }
        self.state.screen = Screen::Matches;
        self.request_matches();
    }

    fn request_matches(&mut self) {
        if self.send(ProviderCommand::FetchNextMatches, "Upcoming matches") {
            self.state.matches_loading = true;
        }
    }

    fn pick_match(&mut self) {
        let Some(m) = self.state.selected_next_match().cloned() else {
            return;
        };
        self.state.apply_match_selection(&m);
        self.send(
            ProviderCommand::SearchPlayer {
                side: 0,
                name: m.player1,
            },
            "Player search",
        );
        self.send(
            ProviderCommand::SearchPlayer {
                side: 1,
                name: m.player2,
            },
            "Player search",
        );
    }

    fn sign_in(&mut self) {
        if !self.can_sign_in {
            self.state
                .push_log("[INFO] Set AUTH_TOKEN or AUTH_TOKEN_FILE to sign in");
            return;
        }
        let session = self.state.session;
        self.send(ProviderCommand::SignIn { session }, "Sign-in");
    }

    fn refresh_profile(&mut self) {
        if !self.state.signed_in {
            self.state.push_log("[INFO] Not signed in");
            return;
        }
        let session = self.state.session;
        self.send(ProviderCommand::RefreshProfile { session }, "Profile refresh");
    }

    fn maybe_refresh_h2h(&mut self) {
        if let Some((p1, p2)) = self.state.take_h2h_request()
            && !self.send(ProviderCommand::FetchHeadToHead { p1, p2 }, "H2H")
        {
            self.state.h2h_loading = false;
        }
    }

    fn maybe_end_celebration(&mut self) {
        if let Some(c) = self.state.celebration
            && c.started.elapsed() >= CELEBRATION
        {
            self.state.celebration = None;
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::from_env();
    let tokens: Option<Arc<dyn TokenSource>> = token_source_from_config(&cfg).map(Arc::from);
    let services = Services::from_config(&cfg, tokens);
    let can_sign_in = services.profiles.is_some();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(tx, cmd_rx, services, cfg.clone());

    let mut app = App::new(&cfg, can_sign_in, Some(cmd_tx));
    app.state
        .push_log(format!("[INFO] Backend: {}", cfg.backend_label()));
    startup(&mut app, &cfg);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn startup(app: &mut App, cfg: &AppConfig) {
    let defaults = [
        cfg.default_player1
            .clone()
            .unwrap_or_else(|| "Giovanni Mpetshi".to_string()),
        cfg.default_player2
            .clone()
            .unwrap_or_else(|| "Holger Rune".to_string()),
    ];
    for (side, name) in defaults.into_iter().enumerate() {
        app.search(side, name);
    }
    if app.can_sign_in {
        app.sign_in();
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh_h2h();
        app.maybe_end_celebration();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Predict => render_predict(frame, chunks[1], &app.state),
        Screen::Matches => render_matches(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if let Some(input) = &app.state.input {
        render_search_input(frame, frame.size(), input);
    }
    if app.state.notice.is_some() {
        render_notice(frame, frame.size(), app);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let account = match state.profile.profile() {
        Some(profile) => profile.label().to_string(),
        None if state.profile.is_loading() => "signing in...".to_string(),
        None => "signed out".to_string(),
    };
    let line1 = format!(
        " H2H TERMINAL | {} | {} | Credits: {}",
        app.backend_label,
        account,
        credits_label(state)
    );
    let line2 = match state.profile.error() {
        Some(err) => format!(" Profile error: {err}"),
        None => String::new(),
    };
    format!("{line1}\n{line2}")
}

fn credits_label(state: &AppState) -> String {
    let base = match state.profile.credit_status() {
        CreditStatus::Known(n) => n.to_string(),
        CreditStatus::Unknown => "--".to_string(),
    };
    match state.profile.credits_stale_since() {
        Some(since) => format!("{base} (stale since {})", since.format("%H:%M:%S")),
        None => base,
    }
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Predict => {
            "1/2 Search | s Surface | t Type | p Predict | m Matches | i Sign in | r Refresh | o Sign out | ? Help | q Quit".to_string()
        }
        Screen::Matches => {
            "j/k/↑/↓ Move | Enter Use match | m/Esc Back | ? Help | q Quit".to_string()
        }
    }
}

fn render_predict(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Min(4),
        ])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(40),
        ])
        .split(rows[0]);

    render_player_card(frame, cards[0], state, 0);
    let h2h = Paragraph::new(h2h_text(state))
        .alignment(Alignment::Center)
        .block(Block::default().title("H2H").borders(Borders::ALL));
    frame.render_widget(h2h, cards[1]);
    render_player_card(frame, cards[2], state, 1);

    let controls = Paragraph::new(controls_text(state))
        .block(Block::default().title("Match").borders(Borders::ALL));
    frame.render_widget(controls, rows[1]);

    render_prediction(frame, rows[2], state);
}

fn render_player_card(frame: &mut Frame, area: Rect, state: &AppState, side: usize) {
    let card = &state.players[side];
    let title = format!("Player {}", side + 1);
    let mut text = match &card.identity {
        Some(player) => player_text(player),
        None => "Press 1/2 to search".to_string(),
    };
    if card.loading {
        text.push_str("\n\nSearching...");
    }
    if card.identity.is_none()
        && let Some(err) = &state.search_error
    {
        text = format!("{text}\n\n{err}");
    }
    let style = if card.loading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let paragraph = Paragraph::new(text)
        .style(style)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn player_text(player: &PlayerIdentity) -> String {
    let field = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    [
        player.name.clone(),
        format!("Country: {}", player.country.as_deref().unwrap_or("-")),
        format!("Rank: {}", field(player.rank)),
        format!("Best rank: {}", field(player.min_rank)),
        format!("Age: {}", field(player.age)),
        format!(
            "Height: {}",
            player
                .height_cm
                .map(|h| format!("{h} cm"))
                .unwrap_or_else(|| "-".to_string())
        ),
        format!("Hand: {}", player.hand.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn h2h_text(state: &AppState) -> String {
    if state.h2h_loading {
        return "\n-\n".to_string();
    }
    let Some(h2h) = state.h2h else {
        return "\n-\n".to_string();
    };
    let (left, right) = h2h.percentages();
    let met = if h2h.met { "" } else { "\nNever met" };
    format!(
        "\n{} - {}\n{left}% / {right}%{met}",
        h2h.p1_wins, h2h.p2_wins
    )
}

fn controls_text(state: &AppState) -> String {
    let surface = state.surface.map(|s| s.as_str()).unwrap_or("select (s)");
    let category = state.category.map(|c| c.label()).unwrap_or("select (t)");
    format!(
        "Surface: {surface}    Tournament: {category}\n[ {} ]",
        predict_button_label(state)
    )
}

fn predict_button_label(state: &AppState) -> &'static str {
    if state.predict_busy {
        "Predicting with AI..."
    } else if state.profile.credit_status() == CreditStatus::Known(0) {
        "No credits - recharge"
    } else {
        "Predict (p)"
    }
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Prediction").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(result) = state.prediction else {
        let text = if state.predict_busy {
            "Predicting with AI..."
        } else {
            "No prediction yet"
        };
        frame.render_widget(Paragraph::new(text), inner);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let (left, right) = result.percentages();
    let (p1, p2) = state.player_names();
    let label = format!("{p1} {left}%  |  {right}% {p2}");
    frame.render_widget(
        Paragraph::new(label).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[0],
    );
    frame.render_widget(split_bar(left, right), rows[1]);

    if let Some(c) = state.celebration {
        render_confetti(frame, rows[2], c.side);
    }
}

fn split_bar(left: u32, right: u32) -> BarChart<'static> {
    let left_bar = Bar::default()
        .value(u64::from(left))
        .text_value(format!("{left}%"))
        .style(Style::default().fg(Color::Green));
    let right_bar = Bar::default()
        .value(u64::from(right))
        .text_value(format!("{right}%"))
        .style(Style::default().fg(Color::Red));

    BarChart::default()
        .data(BarGroup::default().bars(&[left_bar, right_bar]))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn render_confetti(frame: &mut Frame, area: Rect, side: Side) {
    if area.width < 2 || area.height == 0 {
        return;
    }
    let half = area.width / 2;
    let x0 = match side {
        Side::Left => area.x,
        Side::Right => area.x + half,
    };
    let colors = [Color::Yellow, Color::Magenta, Color::Cyan, Color::Green];
    let mut rng = rand::thread_rng();
    let buf = frame.buffer_mut();
    for _ in 0..CONFETTI_PARTICLES {
        let x = x0 + rng.gen_range(0..half.max(1));
        let y = area.y + rng.gen_range(0..area.height);
        let glyph = ['*', '+', '.', 'o'][rng.gen_range(0..4)];
        let color = colors[rng.gen_range(0..colors.len())];
        buf.get_mut(x, y)
            .set_char(glyph)
            .set_style(Style::default().fg(color));
    }
}

fn render_matches(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Upcoming matches").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.matches_loading && state.next_matches.is_empty() {
        frame.render_widget(Paragraph::new("Loading..."), inner);
        return;
    }
    if state.next_matches.is_empty() {
        frame.render_widget(Paragraph::new("No upcoming matches"), inner);
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(state.matches_selected, state.next_matches.len(), visible);
    for (row, idx) in (start..end).enumerate() {
        let m = &state.next_matches[idx];
        let text = format!(
            "{:<12} {:<28} {:<10} {:<8} {} vs {}",
            m.date, m.tournament, m.tournament_type, m.surface, m.player1, m.player2
        );
        let style = if idx == state.matches_selected {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let line = Rect {
            x: inner.x,
            y: inner.y + row as u16,
            width: inner.width,
            height: 1,
        };
        frame.render_widget(Paragraph::new(text).style(style), line);
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_search_input(frame: &mut Frame, area: Rect, input: &SearchInput) {
    let popup_area = centered_rect(50, 20, area);
    frame.render_widget(Clear, popup_area);
    let title = format!("Search player {}", input.side + 1);
    let text = format!("{}_\n\nEnter search | Esc cancel", input.buffer);
    let popup = Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(popup, popup_area);
}

fn render_notice(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notice) = &app.state.notice else {
        return;
    };
    let popup_area = centered_rect(50, 25, area);
    frame.render_widget(Clear, popup_area);
    let (title, color) = match notice.kind {
        NoticeKind::Blocking => ("Error", Color::Red),
        NoticeKind::Advisory => ("Notice", Color::Yellow),
        NoticeKind::Recharge => ("Recharge", Color::Magenta),
    };
    let mut text = notice.text.clone();
    if notice.kind == NoticeKind::Recharge {
        text.push_str(&format!("\n\nPlans: {}", app.plans_url));
    }
    text.push_str("\n\nEsc/Enter/x dismiss");
    let popup = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(popup, popup_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "H2H Terminal - Help",
        "",
        "Predict:",
        "  1 / 2        Search player 1 / 2",
        "  s            Cycle surface",
        "  t            Cycle tournament type",
        "  p            Predict (1 credit)",
        "",
        "Account:",
        "  i            Sign in",
        "  r            Refresh credits",
        "  o            Sign out",
        "",
        "Matches:",
        "  m            Toggle upcoming matches",
        "  j/k or ↑/↓   Move",
        "  Enter        Use selected match",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
