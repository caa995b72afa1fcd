pub mod app_dirs;
pub mod combo;
pub mod config;
pub mod difficulty;
pub mod feedback;
pub mod game;
pub mod keymap;
pub mod runtime;
pub mod store;
pub mod tracker;
pub mod ui;
pub mod util;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    difficulty::{by_label, Policy, EASY, HARD, MEDIUM},
    feedback::BellFeedback,
    game::Game,
    runtime::{CrosstermEventSource, GameEvent, Runner},
    store::{BestEntry, MemoryScoreStore, RoundRecord, ScoreDb, ScoreStore},
    tracker::Tracker,
};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

pub const TICK_RATE_MS: u64 = 100;

const RECENT_ROUNDS_SHOWN: usize = 10;

/// sleek reflex tui with directional combos and persisted best times
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A sleek reflex TUI: reproduce random arrow combos as fast as you can, with rolling averages and a persisted best time per difficulty."
)]
pub struct Cli {
    /// difficulty preset to start with
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// hide everything but the first arrow until the round starts
    #[clap(long)]
    sightread: bool,

    /// disable feedback sounds
    #[clap(long)]
    mute: bool,

    /// export the round history as CSV to the given path and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl DifficultyArg {
    fn as_policy(&self) -> Policy {
        by_label(&self.to_string()).unwrap_or(EASY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Stats,
}

#[derive(Debug, Default)]
pub struct StatsView {
    pub bests: Vec<BestEntry>,
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub state: AppState,
    pub mute: bool,
    pub stats_view: Option<StatsView>,
}

impl App {
    pub fn new(policy: Policy, sightread: bool, mute: bool) -> Self {
        // A missing database degrades to a session-only store.
        let store: Box<dyn ScoreStore> = match ScoreDb::new() {
            Ok(db) => Box::new(db),
            Err(_) => Box::new(MemoryScoreStore::default()),
        };
        let tracker = Tracker::new(store, policy.label, sightread);
        let game = Game::new(policy, sightread, tracker, Box::new(BellFeedback::new(mute)));

        Self {
            game,
            state: AppState::Playing,
            mute,
            stats_view: None,
        }
    }

    pub fn toggle_mute(&mut self) {
        self.mute = !self.mute;
        self.game.set_muted(self.mute);
    }

    pub fn open_stats(&mut self) {
        let view = ScoreDb::new()
            .ok()
            .map(|db| StatsView {
                bests: db.best_entries().unwrap_or_default(),
                rounds: db.recent_rounds(RECENT_ROUNDS_SHOWN).unwrap_or_default(),
            })
            .unwrap_or_default();
        self.stats_view = Some(view);
        self.state = AppState::Stats;
    }

    pub fn close_stats(&mut self) {
        self.stats_view = None;
        self.state = AppState::Playing;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = cli.export.as_ref() {
        let db = ScoreDb::new()?;
        let count = db.export_rounds_csv(path)?;
        println!("exported {} rounds to {}", count, path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = config_store.load();

    let policy = cli
        .difficulty
        .map(|d| d.as_policy())
        .or_else(|| by_label(&config.difficulty))
        .unwrap_or(EASY);
    let sightread = cli.sightread || config.sightread;
    let mute = cli.mute || config.mute;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(policy, sightread, mute);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let _ = config_store.save(&Config {
        difficulty: app.game.policy.label.to_string(),
        sightread: app.game.sightread,
        mute: app.mute,
    });

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let source = CrosstermEventSource::spawn();
    let runner = Runner::new(source, Duration::from_millis(TICK_RATE_MS));

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick => {
                let was_flashing = app.game.is_flash_pending();
                app.game.on_tick();

                // Redraw only while the flash is resolving; everything else
                // changes on key events.
                if was_flashing {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            GameEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

/// Apply one key event. Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        return true;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.state {
        AppState::Playing => match key.code {
            KeyCode::Tab => app.open_stats(),
            KeyCode::Char('1') => app.game.set_policy(EASY),
            KeyCode::Char('2') => app.game.set_policy(MEDIUM),
            KeyCode::Char('3') => app.game.set_policy(HARD),
            KeyCode::Char('m') => app.toggle_mute(),
            KeyCode::Char('h') => {
                let sightread = !app.game.sightread;
                app.game.set_sightread(sightread);
            }
            code => {
                if let Some(direction) = keymap::decode(code) {
                    app.game.on_input(direction);
                }
            }
        },
        AppState::Stats => match key.code {
            KeyCode::Tab | KeyCode::Char('b') | KeyCode::Backspace => app.close_stats(),
            _ => {}
        },
    }

    false
}

fn ui(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::Playing => f.render_widget(&*app, f.area()),
        AppState::Stats => render_stats(app, f),
    }
}

fn render_stats(app: &mut App, f: &mut Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Modifier, Style},
        widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    };

    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),      // title
            Constraint::Percentage(40), // best averages
            Constraint::Min(0),         // recent rounds
            Constraint::Length(3),      // instructions
        ])
        .split(area);

    let title = Paragraph::new("Best rolling averages and recent rounds")
        .block(Block::default().borders(Borders::ALL).title("Stats"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let view = app.stats_view.get_or_insert_with(StatsView::default);

    if view.bests.is_empty() {
        let no_data = Paragraph::new("No best average yet.\nFinish five rounds in a row to set one!")
            .block(Block::default().borders(Borders::ALL).title("Best"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[1]);
    } else {
        let header = Row::new(vec![
            Cell::from("Mode"),
            Cell::from("Best avg"),
            Cell::from("Set"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = view
            .bests
            .iter()
            .map(|entry| {
                let best = entry
                    .value
                    .parse::<f64>()
                    .map(|secs| format!("{:.2}s", secs))
                    .unwrap_or_else(|_| entry.value.clone());

                Row::new(vec![
                    Cell::from(entry.key.clone()),
                    Cell::from(best).style(Style::default().fg(Color::Green)),
                    Cell::from(humanize(entry.updated_at)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Length(24),
                Constraint::Length(12),
                Constraint::Min(16),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Best"));
        f.render_widget(table, chunks[1]);
    }

    if view.rounds.is_empty() {
        let no_data = Paragraph::new("No rounds recorded yet.")
            .block(Block::default().borders(Borders::ALL).title("Recent rounds"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[2]);
    } else {
        let header = Row::new(vec![
            Cell::from("Difficulty"),
            Cell::from("Time"),
            Cell::from("When"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = view
            .rounds
            .iter()
            .map(|round| {
                let mode = if round.sightread {
                    format!("{} (sightread)", round.difficulty)
                } else {
                    round.difficulty.clone()
                };

                Row::new(vec![
                    Cell::from(mode),
                    Cell::from(util::format_secs(round.elapsed_ms)),
                    Cell::from(humanize(round.recorded_at)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Length(24),
                Constraint::Length(12),
                Constraint::Min(16),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent rounds"));
        f.render_widget(table, chunks[2]);
    }

    let instructions = Paragraph::new("(tab)/(b)ack to the game | (esc) quit")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[3]);
}

fn humanize(timestamp: chrono::DateTime<chrono::Local>) -> String {
    let secs = (chrono::Local::now() - timestamp).num_seconds();
    time_humanize::HumanTime::from(-secs).to_string()
}
