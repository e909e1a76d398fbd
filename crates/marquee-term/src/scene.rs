use anyhow::Result;
use async_trait::async_trait;
use crossterm::cursor::MoveTo;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use marquee::scene::{RowElement, RowLayout, RowScene, Tone, ANIMATION_MILLIS};
use marquee::table::Row;
use std::io::{stdout, Stdout, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

////////////////////////////////////////////////////////////////////////////////
//
// Terminal row scene. Each table slot takes two terminal lines: one for the
// row text, one for the divider beneath it. Pixel-ish layout values from the
// library are nominal here; placement is driven by the slot index.
//
////////////////////////////////////////////////////////////////////////////////

/// Nominal layout units reported per two-line slot; keeps the library's
/// row-height floor from binding whenever the terminal has enough lines.
const SLOT_UNITS: f64 = 24.0;

const MOVE_STEPS: u32 = 8;
const FADE_STEPS: u32 = 4;

pub struct TermScene {
    out: Arc<Mutex<Stdout>>,
    cols: u16,
    lines: u16,
}

impl TermScene {
    pub fn new() -> Result<Self> {
        let (cols, lines) = crossterm::terminal::size()?;
        Ok(TermScene {
            out: Arc::new(Mutex::new(stdout())),
            cols,
            lines,
        })
    }

    /// Terminal line of a slot's row text; line 0 carries the header.
    fn line_of(slot: usize) -> u16 {
        (2 * (slot + 1)).min(u16::MAX as usize) as u16
    }
}

impl RowScene for TermScene {
    type Element = TermRow;

    fn viewport_height(&self) -> f64 {
        (self.lines / 2) as f64 * SLOT_UNITS
    }

    fn grow_viewport(&mut self, height: f64) -> Result<()> {
        // a terminal cannot grow; rows past the last line are clipped
        warn!("terminal too short for the requested slots ({height} units wanted)");
        Ok(())
    }

    fn draw_header(&mut self, labels: &[String], layout: &RowLayout) -> Result<()> {
        let widths = column_cells(self.cols, &layout.column_widths);
        let mut out = self.out.lock().expect("stdout lock");
        paint_line(&mut out, 0, &widths, labels, Color::White, true)?;
        out.flush()?;
        Ok(())
    }

    fn draw_divider(&mut self, boundary: usize, _layout: &RowLayout) -> Result<()> {
        let line = Self::line_of(boundary) + 1;
        if line >= self.lines {
            return Ok(());
        }
        let mut out = self.out.lock().expect("stdout lock");
        paint_divider(&mut out, line, self.cols)?;
        out.flush()?;
        Ok(())
    }

    fn create_row(
        &mut self,
        slot: usize,
        row: &Row,
        layout: &RowLayout,
        hidden: bool,
    ) -> Result<Self::Element> {
        let element = TermRow {
            out: self.out.clone(),
            cols: self.cols,
            max_line: self.lines,
            line: Self::line_of(slot),
            widths: column_cells(self.cols, &layout.column_widths),
            cells: row.content.clone(),
            tone: Tone::of(row.confirmed),
            visible: !hidden,
        };
        if !hidden {
            element.paint(tone_color(element.tone))?;
        }
        Ok(element)
    }
}

pub struct TermRow {
    out: Arc<Mutex<Stdout>>,
    cols: u16,
    max_line: u16,
    line: u16,
    widths: Vec<u16>,
    cells: Vec<String>,
    tone: Tone,
    visible: bool,
}

impl TermRow {
    fn paint(&self, color: Color) -> Result<()> {
        if self.line >= self.max_line {
            return Ok(());
        }
        let mut out = self.out.lock().expect("stdout lock");
        paint_line(&mut out, self.line, &self.widths, &self.cells, color, false)?;
        out.flush()?;
        Ok(())
    }

    /// Clear this row's line; divider lines crossed mid-move get their rule
    /// back instead of a blank.
    fn erase(&self) -> Result<()> {
        if self.line >= self.max_line {
            return Ok(());
        }
        let mut out = self.out.lock().expect("stdout lock");
        if self.line % 2 == 1 {
            paint_divider(&mut out, self.line, self.cols)?;
        } else {
            out.queue(MoveTo(0, self.line))?
                .queue(Clear(ClearType::CurrentLine))?;
        }
        out.flush()?;
        Ok(())
    }

    fn fade_palette(&self) -> [Color; FADE_STEPS as usize] {
        match self.tone {
            Tone::Neutral => [Color::DarkGrey, Color::DarkGrey, Color::Grey, Color::White],
            Tone::Alert => [Color::DarkRed, Color::DarkRed, Color::Red, Color::Red],
        }
    }
}

#[async_trait]
impl RowElement for TermRow {
    async fn animate_to(&mut self, slot: usize) -> Result<()> {
        let from = self.line as i32;
        let to = TermScene::line_of(slot) as i32;
        for step in 1..=MOVE_STEPS {
            sleep(Duration::from_millis(ANIMATION_MILLIS / MOVE_STEPS as u64)).await;
            let next = from + (to - from) * step as i32 / MOVE_STEPS as i32;
            if next == self.line as i32 {
                continue;
            }
            self.erase()?;
            self.line = next as u16;
            if self.visible {
                self.paint(tone_color(self.tone))?;
            }
        }
        Ok(())
    }

    fn recolor(&mut self, tone: Tone) -> Result<()> {
        self.tone = tone;
        if self.visible {
            self.paint(tone_color(tone))?;
        }
        Ok(())
    }

    async fn fade_in(&mut self) -> Result<()> {
        for color in self.fade_palette() {
            self.paint(color)?;
            sleep(Duration::from_millis(ANIMATION_MILLIS / FADE_STEPS as u64)).await;
        }
        self.visible = true;
        self.paint(tone_color(self.tone))?;
        Ok(())
    }

    async fn fade_out(self) -> Result<()> {
        for color in self.fade_palette().into_iter().rev() {
            self.paint(color)?;
            sleep(Duration::from_millis(ANIMATION_MILLIS / FADE_STEPS as u64)).await;
        }
        self.erase()?;
        Ok(())
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Neutral => Color::White,
        Tone::Alert => Color::Red,
    }
}

/// Percent shares to terminal cell widths.
fn column_cells(cols: u16, shares: &[f64]) -> Vec<u16> {
    shares
        .iter()
        .map(|share| (cols as f64 * share / 100.0) as u16)
        .collect()
}

fn paint_line(
    out: &mut Stdout,
    line: u16,
    widths: &[u16],
    cells: &[String],
    color: Color,
    bold: bool,
) -> Result<()> {
    out.queue(MoveTo(0, line))?
        .queue(Clear(ClearType::CurrentLine))?
        .queue(SetForegroundColor(color))?;
    if bold {
        out.queue(SetAttribute(Attribute::Bold))?;
    }
    for (cell, width) in cells.iter().zip(widths) {
        let width = *width as usize;
        let text: String = cell.chars().take(width.saturating_sub(1)).collect();
        out.queue(Print(format!("{text:<width$}")))?;
    }
    out.queue(SetAttribute(Attribute::Reset))?
        .queue(ResetColor)?;
    Ok(())
}

fn paint_divider(out: &mut Stdout, line: u16, cols: u16) -> Result<()> {
    out.queue(MoveTo(0, line))?
        .queue(SetForegroundColor(Color::DarkGrey))?
        .queue(Print("─".repeat(cols as usize)))?
        .queue(ResetColor)?;
    Ok(())
}
