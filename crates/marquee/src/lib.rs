pub mod chart;
pub mod client_ext;
pub mod poll;
pub mod scene;
pub mod series;
pub mod table;

pub use crate::chart::{ChartKind, ChartWidget};
pub use crate::client_ext::ClientExt;
pub use crate::poll::PollHandle;
pub use crate::scene::{ChartEngine, ChartHandle, RowElement, RowScene, Tone};
pub use crate::series::{RawPoint, SeriesPoint};
pub use crate::table::{PollingTable, Row, RowKey, TableConfig};
