//! Text rendering of the speller grid.

use std::collections::HashSet;
use std::io::Write;

use speller_core::config::{parse_ratio, GridConfig};
use speller_core::{Alphabet, StimulusStyle, StimulusSurface, SurfaceError};

const FACE: char = '@';

/// Draws the grid as text after every visual change.
///
/// Flashed cells are bracketed (`[A]`, or `(A)` without magnification) and
/// show [`FACE`] instead of the symbol when the face style is on. The focused
/// cell is marked `>A<`.
pub struct TextGrid<W> {
    out: W,
    grid: GridConfig,
    symbols: Vec<char>,
    flashed: HashSet<usize>,
    style: Option<StimulusStyle>,
    focused: Option<usize>,
}

impl<W: Write + Send> TextGrid<W> {
    pub fn new(grid: GridConfig, out: W) -> Self {
        Self {
            out,
            grid,
            symbols: Vec::new(),
            flashed: HashSet::new(),
            style: None,
            focused: None,
        }
    }

    /// Cells widen with a landscape aspect ratio.
    fn cell_width(&self) -> usize {
        match parse_ratio(&self.grid.ratio) {
            Some((w, h)) => ((3.0 * w / h).round() as usize).clamp(3, 9),
            None => 3,
        }
    }

    fn cell(&self, index: usize, symbol: char) -> String {
        if self.focused == Some(index) {
            return format!(">{symbol}<");
        }
        match self.style {
            Some(style) if self.flashed.contains(&index) => {
                let shown = if style.face { FACE } else { symbol };
                if style.magnify {
                    format!("[{shown}]")
                } else {
                    format!("({shown})")
                }
            }
            _ => format!(" {symbol} "),
        }
    }

    fn draw(&mut self) -> Result<(), SurfaceError> {
        if self.symbols.is_empty() {
            return Ok(());
        }
        let width = self.cell_width();
        let columns = self.grid.columns.max(1);
        let border = format!(
            "+{}",
            format!("{}+", "-".repeat(width)).repeat(columns.min(self.symbols.len()))
        );

        let mut frame = String::new();
        for (row, chunk) in self.symbols.chunks(columns).enumerate() {
            if self.grid.borders {
                frame.push_str(&border);
                frame.push('\n');
            }
            if self.grid.borders {
                frame.push('|');
            }
            for (col, &symbol) in chunk.iter().enumerate() {
                let cell = self.cell(row * columns + col, symbol);
                frame.push_str(&format!("{cell:^width$}"));
                if self.grid.borders {
                    frame.push('|');
                }
            }
            frame.push('\n');
        }
        if self.grid.borders {
            frame.push_str(&border);
            frame.push('\n');
        }
        frame.push('\n');

        self.out.write_all(frame.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), SurfaceError> {
        if index < self.symbols.len() {
            Ok(())
        } else {
            Err(SurfaceError::MissingElement { index })
        }
    }
}

impl<W: Write + Send> StimulusSurface for TextGrid<W> {
    fn attach(&mut self, alphabet: &Alphabet) -> Result<(), SurfaceError> {
        self.symbols = alphabet.iter().collect();
        self.draw()
    }

    fn focus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        self.check(symbol)?;
        self.focused = Some(symbol);
        self.draw()
    }

    fn unfocus(&mut self, symbol: usize) -> Result<(), SurfaceError> {
        self.check(symbol)?;
        self.focused = None;
        self.draw()
    }

    fn flash(&mut self, group: &[usize], style: StimulusStyle) -> Result<(), SurfaceError> {
        for &index in group {
            self.check(index)?;
        }
        self.flashed.extend(group);
        self.style = Some(style);
        self.draw()
    }

    fn unflash(&mut self, group: &[usize], _style: StimulusStyle) -> Result<(), SurfaceError> {
        for index in group {
            self.flashed.remove(index);
        }
        if self.flashed.is_empty() {
            self.style = None;
        }
        self.draw()
    }

    fn dispose(&mut self) {
        self.symbols.clear();
        self.flashed.clear();
        self.focused = None;
    }
}
