use crate::series::RawPoint;
use crate::table::Row;
use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use tracing::{error, trace};

pub trait ClientExt {
    fn fetch_points(&self, url: &str) -> impl Future<Output = Result<Vec<RawPoint>>> + Send;

    fn fetch_rows(&self, url: &str) -> impl Future<Output = Result<Vec<Row>>> + Send;
}

/// Feed-fetching add-ons for [`reqwest::Client`].
///
/// [`reqwest::Client`]: https://docs.rs/reqwest/latest/reqwest/struct.Client.html
impl ClientExt for Client {
    /// GET a chart feed: an ordered-by-time array of `[t, price(, volume)]`
    /// tuples.
    async fn fetch_points(&self, url: &str) -> Result<Vec<RawPoint>> {
        let response = self.get(url).send().await.map_err(|e| {
            error!("failed fetching response from {url}");
            e
        })?;
        let points: Vec<RawPoint> = response.json().await.map_err(|e| {
            error!("failed deserializing points from {url}");
            e
        })?;
        trace!("{} points fetched from {url}", points.len());
        Ok(points)
    }

    /// GET a table snapshot: an ordered array of keyed rows.
    async fn fetch_rows(&self, url: &str) -> Result<Vec<Row>> {
        let response = self.get(url).send().await.map_err(|e| {
            error!("failed fetching response from {url}");
            e
        })?;
        let rows: Vec<Row> = response.json().await.map_err(|e| {
            error!("failed deserializing rows from {url}");
            e
        })?;
        trace!("{} rows fetched from {url}", rows.len());
        Ok(rows)
    }
}
