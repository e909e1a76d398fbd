use anyhow::{anyhow, Result};
use chrono::DateTime;
use crossterm::cursor::MoveTo;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use marquee::scene::{ChartEngine, ChartHandle, ChartSpec, SeriesSpec, SeriesStyle};
use marquee::SeriesPoint;
use std::io::{stdout, Stdout, Write};
use std::sync::{Arc, Mutex};

////////////////////////////////////////////////////////////////////////////////
//
// Terminal chart engine. The library does its pane arithmetic in pixels, so
// the engine reports a synthetic pixel box (classic 8x16 glyph cells) and
// maps pane bands back to terminal lines when drawing.
//
////////////////////////////////////////////////////////////////////////////////

const CELL_W: f64 = 8.0;
const CELL_H: f64 = 16.0;

pub struct TermEngine {
    out: Arc<Mutex<Stdout>>,
}

impl TermEngine {
    pub fn new() -> Result<Self> {
        Ok(TermEngine {
            out: Arc::new(Mutex::new(stdout())),
        })
    }
}

impl ChartEngine for TermEngine {
    type Handle = TermChart;

    fn container_extent(&self, _container: &str) -> Result<(f64, f64)> {
        let (cols, lines) = crossterm::terminal::size()?;
        Ok((cols as f64 * CELL_W, lines as f64 * CELL_H))
    }

    fn render(&mut self, spec: ChartSpec) -> Result<Self::Handle> {
        let (cols, lines) = crossterm::terminal::size()?;
        let chart = TermChart {
            out: self.out.clone(),
            spec,
            cols,
            lines,
        };
        chart.redraw()?;
        Ok(chart)
    }
}

pub struct TermChart {
    out: Arc<Mutex<Stdout>>,
    spec: ChartSpec,
    cols: u16,
    lines: u16,
}

impl ChartHandle for TermChart {
    fn set_series_data(&mut self, series: usize, data: Vec<SeriesPoint>) -> Result<()> {
        let slot = self
            .spec
            .series
            .get_mut(series)
            .ok_or_else(|| anyhow!("chart has no series {series}"))?;
        slot.data = data;
        self.redraw()
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        self.cols = (width / CELL_W) as u16;
        self.lines = (height / CELL_H) as u16;
        self.redraw()
    }
}

impl TermChart {
    fn redraw(&self) -> Result<()> {
        let mut out = self.out.lock().expect("stdout lock");
        out.queue(Clear(ClearType::All))?;

        out.queue(MoveTo(0, 0))?
            .queue(SetAttribute(Attribute::Bold))?
            .queue(Print(&self.spec.title))?
            .queue(SetAttribute(Attribute::Reset))?;

        for series in &self.spec.series {
            let (top, height) = self.pane_lines(series);
            match series.style {
                SeriesStyle::Line => draw_line_pane(&mut out, series, top, height, self.cols)?,
                SeriesStyle::Column => draw_bar_pane(&mut out, series, top, height, self.cols)?,
            }
        }

        self.draw_time_axis(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Map a series' pixel pane band to terminal lines, below the title
    /// line. Without a pane the series fills the chart.
    fn pane_lines(&self, series: &SeriesSpec) -> (u16, u16) {
        let body = self.lines.saturating_sub(2).max(3);
        match series.pane {
            Some(pane) => {
                let top = 1 + (pane.top / CELL_H) as u16;
                let height = ((pane.height / CELL_H) as u16).max(2);
                (top.min(body), height.min(body))
            }
            None => (1, body),
        }
    }

    fn draw_time_axis(&self, out: &mut Stdout) -> Result<()> {
        let data = &self.spec.series[0].data;
        let (Some(first), Some(last)) = (data.first(), data.last()) else {
            return Ok(());
        };
        let line = self.lines.saturating_sub(1);
        let left = stamp_label(first.0);
        let right = stamp_label(last.0);
        out.queue(MoveTo(0, line))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(SetForegroundColor(Color::DarkGrey))?
            .queue(Print(&left))?;
        let col = (self.cols as usize).saturating_sub(right.len()) as u16;
        out.queue(MoveTo(col, line))?
            .queue(Print(&right))?
            .queue(ResetColor)?;
        Ok(())
    }
}

fn stamp_label(stamp: i64) -> String {
    DateTime::from_timestamp_millis(stamp)
        .map(|t| t.format("%d-%b-%Y %H:%M").to_string())
        .unwrap_or_default()
}

fn bounds(data: &[SeriesPoint]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, value) in data {
        min = min.min(*value);
        max = max.max(*value);
    }
    if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }
    (min, max)
}

/// Average of the points falling into one screen column.
fn bucket(data: &[SeriesPoint], col: usize, cols: usize) -> f64 {
    let n = data.len();
    let start = col * n / cols;
    let end = (((col + 1) * n / cols).max(start + 1)).min(n);
    let slice = &data[start..end];
    slice.iter().map(|(_, v)| v).sum::<f64>() / slice.len() as f64
}

fn draw_line_pane(
    out: &mut Stdout,
    series: &SeriesSpec,
    top: u16,
    height: u16,
    cols: u16,
) -> Result<()> {
    if series.data.is_empty() || height < 2 {
        return Ok(());
    }
    let (min, max) = bounds(&series.data);
    let decimals = series.value_decimals as usize;

    out.queue(MoveTo(0, top))?
        .queue(SetForegroundColor(Color::DarkGrey))?
        .queue(Print(format!("{max:.decimals$}")))?
        .queue(MoveTo(0, top + height - 1))?
        .queue(Print(format!("{min:.decimals$}")))?
        .queue(SetForegroundColor(Color::Cyan))?;

    for col in 0..cols as usize {
        let value = bucket(&series.data, col, cols as usize);
        let norm = (value - min) / (max - min);
        let line = top + (height - 1) - (norm * (height - 1) as f64).round() as u16;
        out.queue(MoveTo(col as u16, line))?.queue(Print("•"))?;
    }
    out.queue(ResetColor)?;
    Ok(())
}

fn draw_bar_pane(
    out: &mut Stdout,
    series: &SeriesSpec,
    top: u16,
    height: u16,
    cols: u16,
) -> Result<()> {
    if series.data.is_empty() || height == 0 {
        return Ok(());
    }
    let (_, max) = bounds(&series.data);

    out.queue(SetForegroundColor(Color::DarkBlue))?;
    let bottom = top + height - 1;
    for col in 0..cols as usize {
        let value = bucket(&series.data, col, cols as usize);
        let bar = ((value / max) * height as f64).round() as u16;
        for step in 0..bar {
            out.queue(MoveTo(col as u16, bottom - step))?
                .queue(Print("█"))?;
        }
    }
    out.queue(ResetColor)?;
    Ok(())
}
