use crossterm::event::KeyEvent;
use ratatui::Frame;

use crate::{ui, App, AppState};

/// A UI Screen boundary: responsible for rendering and optional key handling
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
    /// Optional per-screen key handling. Returns true if the key was handled.
    fn on_key(&mut self, _key: KeyEvent, _app: &mut App) -> bool {
        false
    }
}

/// Data entry screen - renders the pace table through the App widget
pub struct EntryScreen;

impl Screen for EntryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Circuit picker - every circuit in the database
pub struct CircuitPickerScreen;

impl Screen for CircuitPickerScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        ui::render_picker(app, area, f.buffer_mut(), "Select circuit");
    }
}

/// Group picker - the competition groups of the selected circuit
pub struct GroupPickerScreen;

impl Screen for GroupPickerScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        ui::render_picker(app, area, f.buffer_mut(), "Select competition group");
    }
}

/// Weather editor - free-text conditions attached to finished sessions
pub struct WeatherScreen;

impl Screen for WeatherScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        ui::render_weather(app, area, f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Entry => Box::new(EntryScreen),
        AppState::CircuitPicker => Box::new(CircuitPickerScreen),
        AppState::GroupPicker => Box::new(GroupPickerScreen),
        AppState::Weather => Box::new(WeatherScreen),
    }
}
