use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One `[timestamp, value]` point of a rendered chart series.
pub type SeriesPoint = (i64, f64);

/// One tuple of a raw price feed: `[timestampMillis, price]` with an
/// optional trailing volume.
///
/// ```json
/// [
///     [1491004800000, 10.5, 100],
///     [1491091200000, 11.0, 150]
/// ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    pub stamp: i64,
    pub price: f64,
    pub volume: Option<f64>,
}

impl RawPoint {
    pub fn new(stamp: i64, price: f64) -> Self {
        RawPoint {
            stamp,
            price,
            volume: None,
        }
    }

    pub fn with_volume(stamp: i64, price: f64, volume: f64) -> Self {
        RawPoint {
            stamp,
            price,
            volume: Some(volume),
        }
    }
}

// Feeds arrive as 2- or 3-element arrays, so the arity has to be handled by
// hand rather than a derived tuple struct.
impl<'de> Deserialize<'de> for RawPoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawPointVisitor;

        impl<'de> Visitor<'de> for RawPointVisitor {
            type Value = RawPoint;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a [timestamp, price] or [timestamp, price, volume] array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let stamp = seq
                    .next_element::<i64>()?
                    .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
                let price = seq
                    .next_element::<f64>()?
                    .ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
                let volume = seq.next_element::<f64>()?;
                Ok(RawPoint {
                    stamp,
                    price,
                    volume,
                })
            }
        }

        deserializer.deserialize_seq(RawPointVisitor)
    }
}

impl Serialize for RawPoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.volume.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.stamp)?;
        seq.serialize_element(&self.price)?;
        if let Some(volume) = self.volume {
            seq.serialize_element(&volume)?;
        }
        seq.end()
    }
}

/// Project a raw feed onto its price series.
pub fn price_series(points: &[RawPoint]) -> Vec<SeriesPoint> {
    points.iter().map(|p| (p.stamp, p.price)).collect()
}

/// Split a shared `[t, price, volume]` feed into its price and volume
/// sub-series. Tuples missing a volume contribute 0 to the volume series.
pub fn split_price_volume(points: &[RawPoint]) -> (Vec<SeriesPoint>, Vec<SeriesPoint>) {
    let price = price_series(points);
    let volume = points
        .iter()
        .map(|p| (p.stamp, p.volume.unwrap_or(0.0)))
        .collect();
    (price, volume)
}

/// Height, in layout units, of the range-selector bar the charting engine
/// draws beneath a stacked chart.
pub const BOTTOM_BAR_HEIGHT: f64 = 70.0;

/// Vertical band of one pane in the stacked price/volume layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pane {
    pub top: f64,
    pub height: f64,
}

/// Panes of the stacked layout: price on top (56% of the height left after
/// the bottom bar), volume below (24%), with a gap between.
pub fn price_volume_panes(container_height: f64) -> (Pane, Pane) {
    let available = container_height - BOTTOM_BAR_HEIGHT;
    let price = Pane {
        top: 0.0,
        height: available * 0.56,
    };
    let volume = Pane {
        top: available * 0.66,
        height: available * 0.24,
    };
    (price, volume)
}

/// Time buckets the volume series may be aggregated into when the client
/// zooms out: weekly by 1, monthly by 1, 2, 3, 4 or 6.
pub const VOLUME_GROUPING_UNITS: &[(&str, &[u32])] =
    &[("week", &[1]), ("month", &[1, 2, 3, 4, 6])];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_both_arities() {
        let short: Vec<RawPoint> = serde_json::from_str("[[1000, 10.5]]").unwrap();
        assert_eq!(short, vec![RawPoint::new(1000, 10.5)]);

        let long: Vec<RawPoint> = serde_json::from_str("[[1000, 10.5, 100]]").unwrap();
        assert_eq!(long, vec![RawPoint::with_volume(1000, 10.5, 100.0)]);
    }

    #[test]
    fn serializes_back_to_arrays() {
        let feed = vec![
            RawPoint::with_volume(1000, 10.5, 100.0),
            RawPoint::new(2000, 11.0),
        ];
        let json = serde_json::to_string(&feed).unwrap();
        assert_eq!(json, "[[1000,10.5,100.0],[2000,11.0]]");
    }

    #[test]
    fn splits_shared_feed() {
        let feed = vec![
            RawPoint::with_volume(1000, 10.5, 100.0),
            RawPoint::with_volume(2000, 11.0, 150.0),
        ];
        let (price, volume) = split_price_volume(&feed);
        assert_eq!(price, vec![(1000, 10.5), (2000, 11.0)]);
        assert_eq!(volume, vec![(1000, 100.0), (2000, 150.0)]);
    }

    #[test]
    fn panes_share_the_height_left_by_the_bottom_bar() {
        let (price, volume) = price_volume_panes(570.0);
        assert_eq!(price.top, 0.0);
        assert_eq!(price.height, 280.0);
        assert_eq!(volume.top, 330.0);
        assert_eq!(volume.height, 120.0);
    }
}
