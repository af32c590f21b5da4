pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use lapdash::lap::{LapField, LapRow};
use lapdash::laptime;
use lapdash::stats::StatsSnapshot;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

const TIME_PLACEHOLDER: &str = "00:00:000";

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let focus_style = bold_style.fg(Color::Yellow).add_modifier(Modifier::UNDERLINED);

        let rows = self.session.table.rows();
        let stats = StatsSnapshot::compute(rows);
        let editable_row = self.session.table.editable_row();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // selection header
                Constraint::Length(1), // clock + weather
                Constraint::Min(8),    // pace table
                Constraint::Length(5), // summary rows
                Constraint::Length(8), // records + circuit panels
                Constraint::Length(1), // status line
                Constraint::Length(1), // key hints
            ])
            .split(area);

        let header_line = Line::from(vec![
            Span::styled("Circuit: ", dim_style),
            Span::styled(self.session.circuit.as_deref().unwrap_or("-"), bold_style),
            Span::raw("   "),
            Span::styled("Competition_group: ", dim_style),
            Span::styled(self.session.group.as_deref().unwrap_or("-"), bold_style),
        ]);
        Paragraph::new(header_line).render(chunks[0], buf);

        let clock_line = Line::from(vec![
            Span::styled(self.clock.format("%Y-%m-%d").to_string(), bold_style),
            Span::raw("  "),
            Span::styled(self.clock.format("%H:%M:%S").to_string(), bold_style),
            Span::raw("   "),
            Span::styled("Weather: ", dim_style),
            Span::raw(self.session.weather.as_str()),
        ]);
        Paragraph::new(clock_line).render(chunks[1], buf);

        self.render_pace_table(chunks[2], buf, &stats, editable_row, focus_style);
        render_summary(chunks[3], buf, &stats, self, bold_style);

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[4]);
        self.render_best_records(panels[0], buf);
        self.render_circuit_panel(panels[1], buf);

        let status = self
            .status
            .as_deref()
            .unwrap_or("type digits, Enter locks the cell");
        Paragraph::new(Span::styled(status, italic_style)).render(chunks[5], buf);

        let hints = "(c)ircuit / (g)roup / (w)eather / (f)inish / arrows move / (esc)ape";
        Paragraph::new(Span::styled(hints, dim_style)).render(chunks[6], buf);
    }
}

impl App {
    fn render_pace_table(
        &self,
        area: Rect,
        buf: &mut Buffer,
        stats: &StatsSnapshot,
        editable_row: usize,
        focus_style: Style,
    ) {
        let rows = self.session.table.rows();

        // Keep the focused row in view once the table outgrows the area.
        let visible = area.height.saturating_sub(1).max(1) as usize;
        let offset = self.focus_row.saturating_sub(visible.saturating_sub(1));

        let header = Row::new(
            ["Lap", "Lap_speed", "Sector1", "Sector2", "Sector3", "Gap"]
                .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
        );

        let body = rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(idx, row)| {
                let mut cells = vec![Cell::from(format!("Lap{}", idx + 1))];
                for field in LapField::ALL {
                    cells.push(self.time_cell(idx, row, field, stats, editable_row, focus_style));
                }

                let gap = stats
                    .gap_for(row)
                    .map(laptime::format_ms)
                    .unwrap_or_default();
                cells.push(Cell::from(gap));

                Row::new(cells)
            })
            .collect::<Vec<_>>();

        Table::new(
            body,
            [
                Constraint::Length(7),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(12),
            ],
        )
        .header(header)
        .render(area, buf);
    }

    fn time_cell(
        &self,
        idx: usize,
        row: &LapRow,
        field: LapField,
        stats: &StatsSnapshot,
        editable_row: usize,
        focus_style: Style,
    ) -> Cell<'static> {
        let value = row.value(field);

        if self.focus_row == idx && self.focus_field == field {
            let text = if self.editor.is_empty() {
                match value {
                    Some(ms) => laptime::format_ms(ms as i64),
                    None => TIME_PLACEHOLDER.to_string(),
                }
            } else {
                self.editor.clone()
            };
            return Cell::from(text).style(focus_style);
        }

        let is_min = match field {
            LapField::Lap => value.is_some() && value == stats.minima.lap_ms,
            LapField::S1 => value.is_some() && value == stats.minima.s1_ms,
            LapField::S2 => value.is_some() && value == stats.minima.s2_ms,
            LapField::S3 => value.is_some() && value == stats.minima.s3_ms,
        };

        let style = if is_min {
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        } else if idx > editable_row || row.is_locked(field) {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };

        Cell::from(laptime::format_opt(value)).style(style)
    }

    fn render_best_records(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Best_Records");
        let inner = block.inner(area);
        block.render(area, buf);

        // Fixed ranks; empty slots stay visible like unfilled podium steps.
        let lines = (0..self.session.records_limit() as usize)
            .map(|i| match self.session.best_records.get(i) {
                Some(r) => Line::from(format!(
                    "{:>2}.  {:<10}  {:>9}  {}",
                    i + 1,
                    r.record_date,
                    laptime::format_ms(r.lap_time_ms as i64),
                    r.car
                )),
                None => Line::from(format!("{:>2}.", i + 1)),
            })
            .take(inner.height as usize)
            .collect::<Vec<_>>();

        Paragraph::new(lines).render(inner, buf);
    }

    fn render_circuit_panel(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Circuit");
        let inner = block.inner(area);
        block.render(area, buf);

        let note = self
            .session
            .circuit_info
            .as_ref()
            .map(|c| c.note.as_str())
            .unwrap_or("");

        Paragraph::new(note)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

fn render_summary(area: Rect, buf: &mut Buffer, stats: &StatsSnapshot, app: &App, bold: Style) {
    let fastest = stats.fastest.map(|f| f.row);
    let sum_of_best = stats.sum_of_best;
    let wr = app.session.world_record.as_ref();

    let summary_row = |label: &str, lap: Option<u64>, s1: Option<u64>, s2: Option<u64>, s3: Option<u64>| {
        Row::new(vec![
            Cell::from(label.to_string()).style(bold),
            Cell::from(laptime::format_opt(lap)),
            Cell::from(laptime::format_opt(s1)),
            Cell::from(laptime::format_opt(s2)),
            Cell::from(laptime::format_opt(s3)),
            Cell::from(""),
        ])
    };

    let rows = vec![
        summary_row(
            "Fastest_Lap",
            fastest.and_then(|r| r.lap_ms),
            fastest.and_then(|r| r.s1_ms),
            fastest.and_then(|r| r.s2_ms),
            fastest.and_then(|r| r.s3_ms),
        ),
        match sum_of_best {
            Some(best) => summary_row(
                "Sum of Best",
                Some(best.lap_ms),
                Some(best.s1_ms),
                Some(best.s2_ms),
                Some(best.s3_ms),
            ),
            None => summary_row(
                "Sum of Best",
                fastest.and_then(|r| r.lap_ms),
                fastest.and_then(|r| r.s1_ms),
                fastest.and_then(|r| r.s2_ms),
                fastest.and_then(|r| r.s3_ms),
            ),
        },
        summary_row(
            "Average",
            stats.averages.lap_ms,
            stats.averages.s1_ms,
            stats.averages.s2_ms,
            stats.averages.s3_ms,
        ),
        summary_row(
            "World Record",
            wr.map(|w| w.lap_time_ms),
            wr.and_then(|w| w.sector1_ms),
            wr.and_then(|w| w.sector2_ms),
            wr.and_then(|w| w.sector3_ms),
        ),
    ];

    Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .render(area, buf);
}

/// Centered selection list used by the circuit and group pickers.
pub fn render_picker(app: &App, area: Rect, buf: &mut Buffer, title: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN * 4)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    if app.picker_items.is_empty() {
        Paragraph::new(Span::styled(
            "nothing to select",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    } else {
        let lines = app
            .picker_items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if i == app.picker_index {
                    Line::from(Span::styled(
                        format!("> {item}"),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(format!("  {item}"))
                }
            })
            .collect::<Vec<_>>();

        // Entries go left-aligned into a centered column so the selection
        // marker lines up no matter how the item lengths vary.
        let width = picker_width(&app.picker_items).min(chunks[1].width);
        let column = Rect {
            x: chunks[1].x + (chunks[1].width - width) / 2,
            width,
            ..chunks[1]
        };
        Paragraph::new(lines).render(column, buf);
    }

    Paragraph::new(Span::styled(
        "up/down select, Enter confirm, Esc cancel",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

/// Single-line weather editor.
pub fn render_weather(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN * 4)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Weather",
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let draft = format!("{}_", app.weather_draft);
    Paragraph::new(vec![
        Line::from(draft),
        Line::from(Span::styled(
            "Enter saves, Esc cancels",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}

/// Column width for the picker listing: the widest item plus the marker.
pub fn picker_width(items: &[String]) -> u16 {
    items
        .iter()
        .map(|i| i.width() as u16)
        .max()
        .unwrap_or(0)
        .saturating_add(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapdash::db::LapDb;
    use ratatui::{buffer::Buffer, layout::Rect};

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn test_app() -> App {
        let db = LapDb::open_in_memory().unwrap();
        let mut app = App::with_db(db, std::env::temp_dir(), 7, 10, "Sunny".into(), String::new());
        app.session.load_initial(&app.db).unwrap();
        app
    }

    #[test]
    fn entry_screen_shows_selection_and_rows() {
        let mut app = test_app();
        assert!(app.session.table.commit(0, LapField::Lap, "0130000"));

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("Suzuka"));
        assert!(text.contains("Lap1"));
        assert!(text.contains("01:30:000"));
        assert!(text.contains("Fastest_Lap"));
        assert!(text.contains("World Record"));
        assert!(text.contains("Best_Records"));
    }

    #[test]
    fn focused_empty_cell_shows_placeholder() {
        let app = test_app();

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);

        assert!(buffer_text(&buf).contains(TIME_PLACEHOLDER));
    }

    #[test]
    fn editor_text_replaces_focused_cell() {
        let mut app = test_app();
        app.editor = "130".to_string();

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);

        assert!(buffer_text(&buf).contains("130"));
    }

    #[test]
    fn world_record_values_appear_in_summary() {
        let app = test_app();

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);

        // seeded Suzuka world record
        assert!(buffer_text(&buf).contains("01:30:000"));
    }

    #[test]
    fn small_area_renders_without_panic() {
        let app = test_app();

        let area = Rect::new(0, 0, 24, 8);
        let mut buf = Buffer::empty(area);
        (&app).render(area, &mut buf);

        assert!(*buf.area() == area);
    }

    #[test]
    fn picker_highlights_selection() {
        let mut app = test_app();
        app.picker_items = vec!["Monza".to_string(), "Suzuka".to_string()];
        app.picker_index = 1;

        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        render_picker(&app, area, &mut buf, "Select circuit");

        let text = buffer_text(&buf);
        assert!(text.contains("> Suzuka"));
        assert!(text.contains("Monza"));
    }

    #[test]
    fn empty_picker_shows_fallback() {
        let mut app = test_app();
        app.picker_items.clear();

        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        render_picker(&app, area, &mut buf, "Select group");

        assert!(buffer_text(&buf).contains("nothing to select"));
    }

    #[test]
    fn weather_editor_shows_draft() {
        let mut app = test_app();
        app.weather_draft = "Light rain".to_string();

        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        render_weather(&app, area, &mut buf);

        assert!(buffer_text(&buf).contains("Light rain_"));
    }

    #[test]
    fn picker_width_tracks_longest_item() {
        let items = vec!["a".to_string(), "strawberry".to_string()];
        assert_eq!(picker_width(&items), 12);
        assert_eq!(picker_width(&[]), 2);
    }
}
