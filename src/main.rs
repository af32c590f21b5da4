mod config;
mod ui;

use chrono::{DateTime, Local};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use directories::UserDirs;
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

use lapdash::{
    app_dirs::AppDirs,
    db::LapDb,
    errors::LapdashError,
    lap::LapField,
    laptime,
    runtime::{CrosstermEventSource, FixedTicker, LapEvent, LapEventSource, Runner, Ticker},
    session::Session,
};

use crate::config::{Config, ConfigStore, FileConfigStore};
use crate::ui::screen::current_screen;

const TICK_RATE_MS: u64 = 250;

/// lap timing tui for manual data entry with live pace stats
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A lap timing TUI: key in lap and sector times, watch the fastest lap, sum of best and gaps update as you type, then archive the session as a markdown pace report plus a best-records row."
)]
pub struct Cli {
    /// directory holding the sqlite database (defaults to the platform data dir)
    #[clap(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// directory pace reports are written to (defaults to the downloads dir)
    #[clap(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// circuit to preselect instead of the first one
    #[clap(short = 'c', long)]
    circuit: Option<String>,

    /// competition group to preselect within the circuit
    #[clap(short = 'g', long)]
    group: Option<String>,

    /// weather written into reports and archived records
    #[clap(short = 'w', long)]
    weather: Option<String>,

    /// car name written into archived records
    #[clap(long)]
    car: Option<String>,

    /// minimum number of lap rows kept on screen
    #[clap(long)]
    min_rows: Option<usize>,

    /// how many archived records the panel lists
    #[clap(long)]
    records_limit: Option<u32>,
}

/// Launch settings once the stored config and the CLI flags are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub circuit: Option<String>,
    pub group: Option<String>,
    pub weather: String,
    pub car: String,
    pub min_rows: usize,
    pub records_limit: u32,
}

impl Cli {
    /// CLI flags win over the stored configuration.
    fn merged(&self, config: Config) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            export_dir: self.export_dir.clone(),
            circuit: self.circuit.clone(),
            group: self.group.clone(),
            weather: self.weather.clone().unwrap_or(config.weather),
            car: self.car.clone().unwrap_or(config.car),
            min_rows: self.min_rows.unwrap_or(config.min_lap_rows),
            records_limit: self.records_limit.unwrap_or(config.records_limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Entry,
    CircuitPicker,
    GroupPicker,
    Weather,
}

#[derive(Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub db: LapDb,
    pub session: Session,
    pub export_dir: PathBuf,
    pub state: AppState,
    pub focus_row: usize,
    pub focus_field: LapField,
    pub editor: String,
    pub status: Option<String>,
    pub picker_items: Vec<String>,
    pub picker_index: usize,
    pub weather_draft: String,
    pub clock: DateTime<Local>,
}

impl App {
    pub fn with_db(
        db: LapDb,
        export_dir: PathBuf,
        min_rows: usize,
        records_limit: u32,
        weather: String,
        car: String,
    ) -> Self {
        Self {
            db,
            session: Session::new(min_rows, records_limit, weather, car),
            export_dir,
            state: AppState::Entry,
            focus_row: 0,
            focus_field: LapField::S1,
            editor: String::new(),
            status: None,
            picker_items: Vec::new(),
            picker_index: 0,
            weather_draft: String::new(),
            clock: Local::now(),
        }
    }

    pub fn on_tick(&mut self) {
        self.clock = Local::now();
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        match self.state {
            AppState::Entry => self.on_entry_key(key),
            AppState::CircuitPicker | AppState::GroupPicker => {
                self.on_picker_key(key);
                KeyOutcome::Continue
            }
            AppState::Weather => {
                self.on_weather_key(key);
                KeyOutcome::Continue
            }
        }
    }

    fn on_entry_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Esc => return KeyOutcome::Quit,
            KeyCode::Char(c) if c.is_ascii_digit() || c == ' ' => self.editor_push(c),
            KeyCode::Backspace => {
                self.editor.pop();
            }
            KeyCode::Enter => self.commit_editor(),
            KeyCode::Tab => self.tab_advance(),
            KeyCode::Up => self.move_focus_row(-1),
            KeyCode::Down => self.move_focus_row(1),
            KeyCode::Left => self.move_focus_field(-1),
            KeyCode::Right => self.move_focus_field(1),
            KeyCode::Char('c') => self.open_circuit_picker(),
            KeyCode::Char('g') => self.open_group_picker(),
            KeyCode::Char('w') => {
                self.weather_draft = self.session.weather.clone();
                self.state = AppState::Weather;
            }
            KeyCode::Char('f') => self.finish(),
            _ => {}
        }
        KeyOutcome::Continue
    }

    /// Accepts a keystroke into the cell editor only while the text still
    /// expands to a valid time, so a bad digit never lands.
    fn editor_push(&mut self, c: char) {
        if self.focus_disabled() {
            return;
        }

        let candidate = laptime::sanitize_time_input(&format!("{}{}", self.editor, c));
        let digits: String = candidate.chars().filter(|ch| ch.is_ascii_digit()).collect();
        if digits.len() > laptime::TIME_DIGITS {
            return;
        }
        if !digits.is_empty() && laptime::normalize_digits(&digits).is_none() {
            return;
        }
        self.editor = candidate;
    }

    fn commit_editor(&mut self) {
        if self.editor.is_empty() || self.focus_disabled() {
            return;
        }
        if self
            .session
            .table
            .commit(self.focus_row, self.focus_field, &self.editor)
        {
            self.editor.clear();
            self.status = None;
            self.adopt_focus_hint();
        }
    }

    fn tab_advance(&mut self) {
        if self.session.table.tab_advance(self.focus_row, self.focus_field) {
            self.editor.clear();
            self.adopt_focus_hint();
        }
    }

    // The engine suggests where the cursor goes next; a suggestion landing on
    // a locked or not-yet-enterable cell is dropped.
    fn adopt_focus_hint(&mut self) {
        if let Some(target) = self.session.table.take_focus() {
            let locked = self
                .session
                .table
                .rows()
                .get(target.row)
                .map(|r| r.is_locked(target.field))
                .unwrap_or(true);
            if target.row <= self.session.table.editable_row() && !locked {
                self.focus_row = target.row;
                self.focus_field = target.field;
            }
        }
    }

    fn focus_disabled(&self) -> bool {
        if self.focus_row > self.session.table.editable_row() {
            return true;
        }
        self.session
            .table
            .rows()
            .get(self.focus_row)
            .map(|r| r.is_locked(self.focus_field))
            .unwrap_or(true)
    }

    fn move_focus_row(&mut self, delta: i64) {
        let last = self.session.table.editable_row() as i64;
        let row = (self.focus_row as i64 + delta).clamp(0, last) as usize;
        if row != self.focus_row {
            self.focus_row = row;
            self.editor.clear();
        }
    }

    fn move_focus_field(&mut self, delta: i64) {
        let fields = LapField::ALL;
        let idx = fields
            .iter()
            .position(|f| *f == self.focus_field)
            .unwrap_or(0);
        let idx = (idx as i64 + delta).rem_euclid(fields.len() as i64) as usize;
        self.focus_field = fields[idx];
        self.editor.clear();
    }

    fn reset_focus(&mut self) {
        self.focus_row = 0;
        self.focus_field = LapField::S1;
        self.editor.clear();
    }

    fn open_circuit_picker(&mut self) {
        match self.db.list_circuits() {
            Ok(items) => {
                self.picker_index = items
                    .iter()
                    .position(|c| Some(c.as_str()) == self.session.circuit.as_deref())
                    .unwrap_or(0);
                self.picker_items = items;
                self.state = AppState::CircuitPicker;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn open_group_picker(&mut self) {
        let Some(circuit) = self.session.circuit.clone() else {
            self.status = Some("select a circuit first".to_string());
            return;
        };
        match self.db.list_groups_for_circuit(&circuit) {
            Ok(items) => {
                self.picker_index = items
                    .iter()
                    .position(|g| Some(g.as_str()) == self.session.group.as_deref())
                    .unwrap_or(0);
                self.picker_items = items;
                self.state = AppState::GroupPicker;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn on_picker_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.picker_index = self.picker_index.saturating_sub(1),
            KeyCode::Down => {
                if self.picker_index + 1 < self.picker_items.len() {
                    self.picker_index += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(choice) = self.picker_items.get(self.picker_index).cloned() {
                    let result = if self.state == AppState::CircuitPicker {
                        self.session.select_circuit(&self.db, choice)
                    } else {
                        self.session.select_group(&self.db, choice)
                    };
                    match result {
                        Ok(()) => {
                            self.reset_focus();
                            self.status = None;
                        }
                        Err(err) => self.status = Some(err.to_string()),
                    }
                }
                self.state = AppState::Entry;
            }
            KeyCode::Esc => self.state = AppState::Entry,
            _ => {}
        }
    }

    fn on_weather_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.weather_draft.push(c),
            KeyCode::Backspace => {
                self.weather_draft.pop();
            }
            KeyCode::Enter => {
                self.session.weather = std::mem::take(&mut self.weather_draft);
                self.state = AppState::Entry;
            }
            KeyCode::Esc => {
                self.weather_draft.clear();
                self.state = AppState::Entry;
            }
            _ => {}
        }
    }

    fn finish(&mut self) {
        match self.session.finish(&self.db, &self.export_dir, Local::now()) {
            Ok(outcome) => {
                log::info!("pace report written to {}", outcome.report_path.display());
                self.status = Some(format!("Saved {}", outcome.report_path.display()));
                self.reset_focus();
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let settings = cli.merged(store.load());

    let data_dir = settings
        .data_dir
        .clone()
        .or_else(AppDirs::data_dir)
        .ok_or(LapdashError::NoDataDir)?;
    let export_dir = settings
        .export_dir
        .clone()
        .or_else(|| UserDirs::new().and_then(|u| u.download_dir().map(|p| p.to_path_buf())))
        .unwrap_or_else(|| data_dir.clone());

    log::info!("database in {}", data_dir.display());

    let db = LapDb::open(&data_dir)?;
    let mut app = App::with_db(
        db,
        export_dir,
        settings.min_rows,
        settings.records_limit,
        settings.weather.clone(),
        settings.car.clone(),
    );

    if let Some(circuit) = settings.circuit.clone() {
        app.session.select_circuit(&app.db, circuit)?;
    } else {
        app.session.load_initial(&app.db)?;
    }
    if let Some(group) = settings.group.clone() {
        app.session.select_group(&app.db, group)?;
    }
    if app.session.circuit.is_some() && app.session.circuit_info.is_none() {
        log::warn!(
            "circuit {:?} is not in the database",
            app.session.circuit.as_deref().unwrap_or("")
        );
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res?;

    // Weather and car edits survive into the next launch.
    let parting = Config {
        min_lap_rows: app.session.table.target_rows(),
        records_limit: app.session.records_limit(),
        weather: app.session.weather.clone(),
        car: app.session.car.clone(),
    };
    if let Err(err) = store.save(&parting) {
        log::warn!("could not save config: {err}");
    }

    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    run_loop(terminal, app, &runner)
}

fn run_loop<B: Backend, E: LapEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            LapEvent::Tick => app.on_tick(),
            LapEvent::Resize => {}
            LapEvent::Key(key) => {
                if app.on_key(key) == KeyOutcome::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = current_screen(&app.state);
    screen.render(app, f);
}
