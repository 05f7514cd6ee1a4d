//! Terminal stand-in for the braille hardware, drawn with ratatui.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Context as _;
use brailleshelf_application::{Button, Driver};
use brailleshelf_core::{Dimensions, Row};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use log::debug;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const HELP: &str = "←/→ page   b bookmark   q quit";

/// Shows the rows as Unicode braille and turns keys into buttons.
pub struct EmulatedDisplay {
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    dimensions: Dimensions,
    rows: Vec<Row>,
    writes: usize,
}

impl EmulatedDisplay {
    pub fn open(dimensions: Dimensions) -> anyhow::Result<Self> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let mut display = Self {
            terminal: Some(terminal),
            dimensions,
            rows: blank_rows(dimensions),
            writes: 0,
        };
        display.draw()?;
        Ok(display)
    }

    /// Gives the terminal back. Also done on drop.
    pub fn close(&mut self) -> anyhow::Result<()> {
        match self.terminal.take() {
            Some(mut terminal) => restore_terminal(&mut terminal),
            None => Ok(()),
        }
    }

    fn draw(&mut self) -> anyhow::Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let rows = &self.rows;
        let dimensions = self.dimensions;
        let writes = self.writes;
        terminal
            .draw(|frame| {
                let area = frame.area();
                draw_panel(frame, area, rows, dimensions, writes);
            })
            .context("draw emulated display")?;
        Ok(())
    }
}

impl Drop for EmulatedDisplay {
    fn drop(&mut self) {
        self.close().ok();
    }
}

impl Driver for EmulatedDisplay {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn set_braille_row(&mut self, index: usize, row: &Row) -> anyhow::Result<()> {
        let Some(slot) = self.rows.get_mut(index) else {
            anyhow::bail!("row {index} is outside a {}-row display", self.dimensions.height);
        };
        *slot = row.clone();
        self.writes += 1;
        debug!("row {index} <- {}", row.to_unicode());
        self.draw()
    }

    fn poll_button(&mut self) -> anyhow::Result<Option<Button>> {
        if !event::poll(Duration::ZERO).context("poll terminal events")? {
            return Ok(None);
        }
        match event::read().context("read terminal event")? {
            Event::Key(key) => Ok(button_for(key)),
            Event::Resize(_, _) => {
                self.draw()?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn reset_display(&mut self) -> anyhow::Result<()> {
        self.rows = blank_rows(self.dimensions);
        self.draw()
    }
}

fn blank_rows(dimensions: Dimensions) -> Vec<Row> {
    vec![Row::blank(dimensions.width); dimensions.height]
}

pub fn button_for(key: KeyEvent) -> Option<Button> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Right | KeyCode::PageDown => Some(Button::Forward),
        KeyCode::Left | KeyCode::PageUp => Some(Button::Back),
        KeyCode::Char('b') => Some(Button::Bookmark),
        KeyCode::Char('q') | KeyCode::Esc => Some(Button::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Button::Quit)
        }
        _ => None,
    }
}

/// One text line per display row, padded to the display width.
pub fn row_lines(rows: &[Row], dimensions: Dimensions) -> Vec<Line<'static>> {
    rows.iter()
        .map(|row| {
            let mut text = row.to_unicode();
            let missing = dimensions.width.saturating_sub(row.len());
            text.extend(std::iter::repeat_n('\u{2800}', missing));
            Line::from(text)
        })
        .collect()
}

fn draw_panel(
    frame: &mut ratatui::Frame,
    area: Rect,
    rows: &[Row],
    dimensions: Dimensions,
    writes: usize,
) {
    frame.render_widget(Clear, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let title = Span::styled(" brailleshelf ", Style::default().fg(Color::Yellow));
    let cells = Paragraph::new(Text::from(row_lines(rows, dimensions)))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(cells, layout[0]);

    let footer = Paragraph::new(Text::from(vec![Line::from(format!(
        "{HELP}   {writes} row writes"
    ))]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, layout[1]);
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}
