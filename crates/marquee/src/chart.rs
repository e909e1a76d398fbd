use crate::client_ext::ClientExt;
use crate::poll::{PollHandle, CHART_REFRESH_GAP};
use crate::scene::{ChartEngine, ChartHandle, ChartSpec, SeriesSpec, SeriesStyle};
use crate::series::{self, RawPoint};
use anyhow::Result;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, error, trace};

/// The three chart flavors. Every kind draws a price line; the stacked kind
/// adds a volume column pane beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Plain price line, no range selector.
    Price,
    /// Price line with the engine's range selector.
    PriceRange,
    /// Price over a volume column pane, with the range selector.
    PriceVolume,
}

impl ChartKind {
    fn range_selector(self) -> bool {
        !matches!(self, ChartKind::Price)
    }
}

/// A chart bound to an engine handle. Optionally re-fetches its feed on a
/// two-minute loop and replaces the series data wholesale.
pub struct ChartWidget<H: ChartHandle> {
    handle: H,
    client: Client,
    container: String,
    data_url: String,
    kind: ChartKind,
    auto_refresh: bool,
}

impl<H: ChartHandle> ChartWidget<H> {
    /// Build a chart of `kind` over `init_points`, sized to exactly fill its
    /// container.
    #[allow(clippy::too_many_arguments)]
    pub fn create<E>(
        engine: &mut E,
        client: Client,
        container: &str,
        init_points: Vec<RawPoint>,
        data_url: &str,
        title: &str,
        auto_refresh: bool,
        kind: ChartKind,
    ) -> Result<Self>
    where
        E: ChartEngine<Handle = H>,
    {
        let (width, height) = engine.container_extent(container)?;
        let spec = ChartSpec {
            container: container.to_string(),
            title: title.to_string(),
            range_selector: kind.range_selector(),
            series: series_for(kind, &init_points, height),
        };
        let mut handle = engine.render(spec)?;
        handle.resize(width, height)?;
        debug!("[{container}] {kind:?} chart rendered at {width}x{height}");

        Ok(ChartWidget {
            handle,
            client,
            container: container.to_string(),
            data_url: data_url.to_string(),
            kind,
            auto_refresh,
        })
    }

    /// Dispatch entry point: fetch the initial feed from `data_url`, then
    /// build the chart of the requested kind.
    pub async fn fetch_and_create<E>(
        engine: &mut E,
        client: Client,
        container: &str,
        data_url: &str,
        title: &str,
        auto_refresh: bool,
        kind: ChartKind,
    ) -> Result<Self>
    where
        E: ChartEngine<Handle = H>,
    {
        let init_points = client.fetch_points(data_url).await?;
        Self::create(
            engine,
            client,
            container,
            init_points,
            data_url,
            title,
            auto_refresh,
            kind,
        )
    }

    /// Replace the chart's series data wholesale from a fresh feed: one
    /// series for the price kinds, both sub-series for price+volume.
    pub fn replace_data(&mut self, points: Vec<RawPoint>) -> Result<()> {
        match self.kind {
            ChartKind::Price | ChartKind::PriceRange => self
                .handle
                .set_series_data(0, series::price_series(&points)),
            ChartKind::PriceVolume => {
                let (price, volume) = series::split_price_volume(&points);
                self.handle.set_series_data(0, price)?;
                self.handle.set_series_data(1, volume)
            }
        }
    }

    /// Refresh loop: re-fetch the feed every two minutes and replace the
    /// series in place. A failed fetch logs and ends the chain; nothing
    /// above the widget is disturbed. No-op when the widget was created
    /// without auto-refresh.
    pub async fn run(mut self) {
        if !self.auto_refresh {
            return;
        }
        loop {
            sleep(CHART_REFRESH_GAP).await;
            let points = match self.client.fetch_points(&self.data_url).await {
                Ok(points) => points,
                Err(e) => {
                    error!(
                        "[{}] refresh fetch failed, polling stopped: {e}",
                        self.container
                    );
                    break;
                }
            };
            let count = points.len();
            if let Err(e) = self.replace_data(points) {
                error!(
                    "[{}] series replacement failed, polling stopped: {e}",
                    self.container
                );
                break;
            }
            trace!("[{}] series replaced with {count} points", self.container);
        }
    }

    /// Spawn the refresh loop under a cancellable handle; dropping the
    /// handle tears the widget down.
    pub fn spawn(self) -> PollHandle
    where
        H: 'static,
    {
        PollHandle::new(tokio::spawn(self.run()))
    }
}

fn series_for(kind: ChartKind, points: &[RawPoint], container_height: f64) -> Vec<SeriesSpec> {
    let price_line = |data, pane| SeriesSpec {
        name: "Price".to_string(),
        style: SeriesStyle::Line,
        data,
        pane,
        grouping: None,
        value_decimals: 4,
    };

    match kind {
        ChartKind::Price | ChartKind::PriceRange => {
            vec![price_line(series::price_series(points), None)]
        }
        ChartKind::PriceVolume => {
            let (price, volume) = series::split_price_volume(points);
            let (price_pane, volume_pane) = series::price_volume_panes(container_height);
            vec![
                price_line(price, Some(price_pane)),
                SeriesSpec {
                    name: "Volume".to_string(),
                    style: SeriesStyle::Column,
                    data: volume,
                    pane: Some(volume_pane),
                    grouping: Some(series::VOLUME_GROUPING_UNITS),
                    value_decimals: 0,
                },
            ]
        }
    }
}
