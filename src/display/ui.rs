//! Terminal rendering surface for the half-circle waveform.
//!
//! Draws the live waveform as a polyline over a dotted unit half circle on a
//! braille canvas, with a one-line status footer underneath.

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Paragraph,
    },
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use crate::config::DisplayConfig;
use crate::sampler::ChannelStats;
use crate::waveform::WaveformPoint;

const BACKGROUND: Color = Color::Rgb(0, 0, 0);
const FOOTER_FG: Color = Color::Rgb(185, 207, 212);

/// Enters raw mode and the alternate screen, undoing both if the terminal
/// backend cannot be created.
pub(crate) fn enter_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }

    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            let _ = disable_raw_mode();
            let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
            Err(e.into())
        }
    }
}

/// User input during display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Nothing to do (no key, or an unmapped key)
    Continue,
    /// Leave the display (Enter, Escape, 'q', Ctrl+C)
    Quit,
    /// Freeze or unfreeze the drawn waveform (Space)
    ToggleHold,
}

/// Parses a `#RRGGBB` color string.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Full-screen waveform display.
pub struct WaveformTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    line_color: Color,
    max_radius: f64,
    /// Unit half circle, drawn dotted behind the waveform
    reference: Option<Vec<(f64, f64)>>,
    /// Points of the most recently applied frame
    points: Vec<WaveformPoint>,
    last_peak: f64,
    frames_received: u64,
    started: Instant,
    /// Whether the drawn waveform is frozen
    pub is_held: bool,
    /// Cleared once the terminal has been restored
    active: bool,
}

impl WaveformTui {
    /// Enters the alternate screen and prepares the canvas.
    ///
    /// `reference` is the unit half circle for the active angle table.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    /// - If raw mode or the alternate screen cannot be entered
    pub fn new(display: &DisplayConfig, reference: &[WaveformPoint]) -> anyhow::Result<Self> {
        let line_color = parse_hex_color(&display.line_color).unwrap_or_else(|| {
            let configured = &display.line_color;
            tracing::warn!(
                "Invalid line_color '{}'; falling back to default",
                configured
            );
            Color::Rgb(179, 220, 253)
        });

        let terminal = enter_terminal()?;

        Ok(Self {
            terminal,
            line_color,
            max_radius: display.max_radius.max(1.0),
            reference: display
                .reference_arc
                .then(|| reference.iter().map(|p| (p.x, p.y)).collect()),
            points: reference.to_vec(),
            last_peak: 1.0,
            frames_received: 0,
            started: Instant::now(),
            is_held: false,
            active: true,
        })
    }

    /// Replaces the drawn waveform unless the display is held.
    pub fn update(&mut self, points: Vec<WaveformPoint>, peak: f64) {
        self.frames_received += 1;
        if self.is_held {
            return;
        }
        self.points = points;
        self.last_peak = peak;
    }

    /// Draws the current waveform and status footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, channel: ChannelStats) -> anyhow::Result<()> {
        let r = self.max_radius;
        let line_color = self.line_color;
        let points = &self.points;
        let reference = self.reference.as_deref();

        let indicator = if self.is_held {
            Span::styled("⏸ HOLD ", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("● ", Style::default().fg(Color::Red))
        };
        let elapsed = self.started.elapsed().as_secs();
        let footer_line = Line::from(vec![
            indicator,
            Span::raw(format!("{}:{:02}", elapsed / 60, elapsed % 60)),
            Span::raw(format!(" / frames {}", self.frames_received)),
            Span::raw(format!(" / dropped {}", channel.dropped)),
            Span::raw(format!(" / peak {:.2}", self.last_peak)),
        ]);

        self.terminal.draw(|frame| {
            let area = frame.area();
            let footer_height = 1;

            let canvas_area = Rect {
                height: area.height.saturating_sub(footer_height),
                ..area
            };
            let footer_area = Rect {
                y: area.y + area.height.saturating_sub(footer_height),
                height: footer_height.min(area.height),
                ..area
            };

            let canvas = Canvas::default()
                .marker(Marker::Braille)
                .background_color(BACKGROUND)
                .x_bounds([-r, r])
                .y_bounds([0.0, r])
                .paint(|ctx| {
                    if let Some(coords) = reference {
                        ctx.draw(&Points {
                            coords,
                            color: Color::DarkGray,
                        });
                    }
                    for pair in points.windows(2) {
                        ctx.draw(&CanvasLine::new(
                            pair[0].x, pair[0].y, pair[1].x, pair[1].y, line_color,
                        ));
                    }
                });
            frame.render_widget(canvas, canvas_area);

            let footer = Paragraph::new(footer_line)
                .style(Style::default().fg(FOOTER_FG).bg(BACKGROUND));
            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Waits up to `timeout` for a key and maps it to a command.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, timeout: Duration) -> anyhow::Result<DisplayCommand> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
                        tracing::debug!("Quit key pressed");
                        DisplayCommand::Quit
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        tracing::debug!("Ctrl+C pressed");
                        DisplayCommand::Quit
                    }
                    KeyCode::Char(' ') => {
                        self.is_held = !self.is_held;
                        tracing::debug!("Display hold: {}", self.is_held);
                        DisplayCommand::ToggleHold
                    }
                    _ => DisplayCommand::Continue,
                });
            }
        }
        Ok(DisplayCommand::Continue)
    }

    /// Restores the terminal.
    ///
    /// # Errors
    /// - If raw mode cannot be disabled or the cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for WaveformTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
