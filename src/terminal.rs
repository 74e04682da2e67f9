use crate::canvas::FrameBuffer;
use crossterm::{
    cursor::{Hide, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write, stdout};
use unicode_width::UnicodeWidthChar;

/// Raw mode + alternate screen for as long as it lives.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut guard = Self { active: true };
        if let Err(err) = execute!(stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture) {
            guard.restore()?;
            return Err(err);
        }
        Ok(guard)
    }

    /// Give the terminal back. Safe to call more than once.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(stdout(), Show, LeaveAlternateScreen, DisableMouseCapture)?;
        terminal::disable_raw_mode()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Writes a frame buffer as truecolor half-blocks: top pixel in the
/// background colour, bottom pixel in the foreground colour.
pub struct Presenter {
    output_buf: Vec<u8>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { output_buf: Vec::with_capacity(64 * 1024) }
    }

    pub fn present<W: Write>(
        &mut self,
        frame: &FrameBuffer,
        caption: Option<&str>,
        out: &mut W,
    ) -> io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let width = frame.width();
        let height = frame.height();

        let mut prev_top: Option<(u8, u8, u8)> = None;
        let mut prev_bot: Option<(u8, u8, u8)> = None;

        for y in (0..height).step_by(2) {
            for x in 0..width {
                let top = frame.pixel(x, y);
                let bot = if y + 1 < height { frame.pixel(x, y + 1) } else { top };

                if prev_top != Some(top) {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_top = Some(top);
                }
                if prev_bot != Some(bot) {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    prev_bot = Some(bot);
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top = None;
            prev_bot = None;
            if y + 2 < height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        if let Some(text) = caption {
            self.write_caption(text, width, height.div_ceil(2))?;
        }

        out.write_all(&self.output_buf)?;
        out.flush()
    }

    // Centred on the last row.
    fn write_caption(&mut self, text: &str, cols: usize, rows: usize) -> io::Result<()> {
        if rows == 0 || cols == 0 {
            return Ok(());
        }
        let mut shown = String::new();
        let mut used = 0;
        for c in text.chars() {
            // A raw newline on the last row would scroll the screen.
            let c = if c.is_control() { ' ' } else { c };
            let w = c.width().unwrap_or(0);
            if used + w > cols {
                break;
            }
            shown.push(c);
            used += w;
        }
        let col = (cols - used) / 2 + 1;
        write!(self.output_buf, "\x1b[{rows};{col}H\x1b[1;38;2;255;215;0m{shown}\x1b[0m")
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
