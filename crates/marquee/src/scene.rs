use crate::series::{Pane, SeriesPoint};
use crate::table::Row;
use anyhow::Result;
use async_trait::async_trait;

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Render-target seams. Widgets never touch a concrete display; they drive
// these traits, and a renderer (terminal, test recorder, GUI toolkit) binds
// them to real elements.
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Nominal length of every fade and move effect.
pub const ANIMATION_MILLIS: u64 = 1000;

/// Text color of a row, driven by its confirmation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Confirmed rows; neutral foreground.
    Neutral,
    /// Unconfirmed rows; alert foreground.
    Alert,
}

impl Tone {
    pub fn of(confirmed: bool) -> Self {
        if confirmed {
            Tone::Neutral
        } else {
            Tone::Alert
        }
    }
}

/// Layout facts shared by every painted element of one table: the computed
/// row height, proportional column widths (percent shares), and optional
/// per-column style tags, passed through opaquely to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub row_height: f64,
    pub column_widths: Vec<f64>,
    pub column_styles: Option<Vec<String>>,
}

impl RowLayout {
    /// Vertical offset of a slot; slot 0 sits one row height down, below the
    /// header strip.
    pub fn slot_top(&self, slot: usize) -> f64 {
        (slot + 1) as f64 * self.row_height
    }
}

/// A surface rows are painted onto. One scene per table instance; the scene
/// owns the container and hands out one element per displayed row.
pub trait RowScene {
    type Element: RowElement + Send + 'static;

    /// Current height of the container, in layout units.
    fn viewport_height(&self) -> f64;

    /// Grow the container to `height`; called when the row-height floor
    /// binds.
    fn grow_viewport(&mut self, height: f64) -> Result<()>;

    /// Paint the bold header strip across the top slot.
    fn draw_header(&mut self, labels: &[String], layout: &RowLayout) -> Result<()>;

    /// Paint the horizontal divider under slot `boundary`.
    fn draw_divider(&mut self, boundary: usize, layout: &RowLayout) -> Result<()>;

    /// Create the element for `row` at `slot`, hidden when `hidden` so it
    /// can be faded in.
    fn create_row(
        &mut self,
        slot: usize,
        row: &Row,
        layout: &RowLayout,
        hidden: bool,
    ) -> Result<Self::Element>;
}

/// One displayed row's element. The async operations resolve when the
/// visual effect has completed, which is what the reconciliation barriers
/// join on.
#[async_trait]
pub trait RowElement: Send {
    /// Slide to `slot`'s position. A zero-distance move still resolves.
    async fn animate_to(&mut self, slot: usize) -> Result<()>;

    /// Immediate color change; not animated.
    fn recolor(&mut self, tone: Tone) -> Result<()>;

    /// Fade a hidden element into view.
    async fn fade_in(&mut self) -> Result<()>;

    /// Fade out and remove from the scene.
    async fn fade_out(self) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// How one series is drawn by the charting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Column,
}

/// One series handed to the engine: data plus the presentation the original
/// charts carry (markers and a shadow on lines, 4-decimal tooltips).
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub name: String,
    pub style: SeriesStyle,
    pub data: Vec<SeriesPoint>,
    /// Vertical band when the chart stacks panes; `None` fills the chart.
    pub pane: Option<Pane>,
    /// Allowed time-bucket aggregation `(unit, multiples)` pairs.
    pub grouping: Option<&'static [(&'static str, &'static [u32])]>,
    pub value_decimals: u8,
}

/// Everything the engine needs to build one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub container: String,
    pub title: String,
    pub range_selector: bool,
    pub series: Vec<SeriesSpec>,
}

/// The black-box charting engine: consumes a [`ChartSpec`] and returns a
/// mutable handle to the built chart.
pub trait ChartEngine {
    type Handle: ChartHandle + Send + 'static;

    /// Current pixel box of the named container.
    fn container_extent(&self, container: &str) -> Result<(f64, f64)>;

    fn render(&mut self, spec: ChartSpec) -> Result<Self::Handle>;
}

/// Mutable handle to a built chart.
pub trait ChartHandle: Send {
    /// Replace series `series`'s data wholesale.
    fn set_series_data(&mut self, series: usize, data: Vec<SeriesPoint>) -> Result<()>;

    /// Resize the chart to exactly the given box.
    fn resize(&mut self, width: f64, height: f64) -> Result<()>;
}
