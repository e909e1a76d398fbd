use clap::{Parser, Subcommand, ValueEnum};
use marquee::ChartKind;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing
    #[arg(long, default_value = "INFO")]
    pub trace: TraceLevel,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draw a price chart for one feed endpoint.
    Chart {
        /// Feed endpoint, e.g. http://127.0.0.1:8080/chart/BTC
        url: String,

        /// Chart title.
        #[arg(long, default_value = "Price")]
        title: String,

        #[arg(long, value_enum, default_value_t = KindArg::PriceVolume)]
        kind: KindArg,

        /// Re-fetch the feed every two minutes and redraw.
        #[arg(long)]
        refresh: bool,
    },

    /// Draw a polling, animated row table for one snapshot endpoint.
    Table {
        /// Initial snapshot endpoint, e.g. http://127.0.0.1:8080/trades/BTC
        url: String,

        /// Update endpoint; the initial one is re-polled when unset.
        #[arg(long)]
        update_url: Option<String>,

        /// Visible slot count; defaults to the initial snapshot's length.
        #[arg(long)]
        rows: Option<usize>,

        /// Column header labels.
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "When,Side,Price,Amount,Total"
        )]
        headers: Vec<String>,

        /// Render the initial snapshot only; no polling.
        #[arg(long)]
        no_poll: bool,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum KindArg {
    /// Plain price line.
    Price,
    /// Price line with a range selector.
    PriceRange,
    /// Price stacked over a volume pane.
    PriceVolume,
}

impl From<KindArg> for ChartKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Price => ChartKind::Price,
            KindArg::PriceRange => ChartKind::PriceRange,
            KindArg::PriceVolume => ChartKind::PriceVolume,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceLevel {
    DEBUG,
    INFO,
    WARN,
    ERROR,
}
