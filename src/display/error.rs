//! Full-screen error message for failures the user needs to see, such as a
//! microphone that cannot be opened or disappears mid-session.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::Paragraph};
use std::io::Stdout;

use super::ui::enter_terminal;

const ERROR_BG: Color = Color::Rgb(255, 0, 0);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Red error screen with centered, wrapped text. Dismissed by any key.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        Ok(ErrorScreen {
            terminal: enter_terminal()?,
        })
    }

    /// Shows `message` until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering or event polling fails
    pub fn show_error(&mut self, message: &str) -> anyhow::Result<()> {
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame.render_widget(
                    ratatui::widgets::Block::default().style(Style::default().bg(ERROR_BG)),
                    area,
                );

                let paragraph = Paragraph::new(Text::from(message))
                    .style(Style::default().fg(ERROR_FG).bg(ERROR_BG))
                    .alignment(Alignment::Center)
                    .wrap(ratatui::widgets::Wrap { trim: true });

                let centered_area = Rect {
                    x: area.x + area.width / 10,
                    y: area.y + area.height / 3,
                    width: area.width * 8 / 10,
                    height: area.height - area.height / 3,
                };

                frame.render_widget(paragraph, centered_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Leaves the alternate screen and restores the cursor.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows `message` on an error screen and restores the terminal afterwards.
pub fn report_error(message: &str) -> anyhow::Result<()> {
    let mut screen = ErrorScreen::new()?;
    screen.show_error(message)?;
    screen.cleanup()
}
