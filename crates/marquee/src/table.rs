use crate::client_ext::ClientExt;
use crate::poll::{PollHandle, TABLE_POLL_GAP};
use crate::scene::{RowElement, RowLayout, RowScene, Tone};
use anyhow::Result;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, trace, warn};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// The polling table: a fixed-slot row display reconciled against periodic
// snapshots of keyed rows, with faded removals and insertions and animated
// moves. Each poll cycle is strictly sequenced: remove-all, then
// move/insert-all, then wait, so no row is ever animating into a slot
// another row is still vacating.
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Floor on the computed row height; containers too short for it are grown
/// instead of the rows shrinking further.
pub const MIN_ROW_HEIGHT: f64 = 22.0;

/// Opaque row identity, unique within one table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RowKey {
    Num(i64),
    Text(String),
}

impl From<i64> for RowKey {
    fn from(n: i64) -> Self {
        RowKey::Num(n)
    }
}

impl From<&str> for RowKey {
    fn from(s: &str) -> Self {
        RowKey::Text(s.to_string())
    }
}

/// One keyed table row, as served by the snapshot endpoints.
///
/// ```json
/// [
///     {
///         "row_key": 17,
///         "confirmed": true,
///         "content": ["Mon, 03-Apr-2017 12:00:00 GMT", "Buy", "0.0042", "12"]
///     },
///     ...
/// ]
/// ```
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Row {
    pub row_key: RowKey,
    pub confirmed: bool,
    pub content: Vec<String>,
}

/// Construction parameters. `update_data_url: None` disables polling; the
/// table renders its initial snapshot and sits still.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub container: String,
    /// Visible slot count; defaults to the initial snapshot's length.
    pub visible_rows: Option<usize>,
    /// Proportional widths (percent shares); defaults to equal shares.
    pub column_widths: Option<Vec<f64>>,
    pub headers: Vec<String>,
    /// Opaque per-column style tags, passed through to the renderer.
    pub column_styles: Option<Vec<String>>,
    pub initial_data_url: String,
    pub update_data_url: Option<String>,
}

/// A row bound to a slot and a scene element. Identity is the key; the slot
/// is reassigned whenever the row's rank in a snapshot changes.
struct DisplayedRow<E> {
    key: RowKey,
    slot: usize,
    element: E,
}

pub struct PollingTable<S: RowScene> {
    scene: S,
    client: Client,
    container: String,
    layout: RowLayout,
    visible_rows: usize,
    update_data_url: Option<String>,
    rows: Vec<DisplayedRow<S::Element>>,
}

impl<S: RowScene> PollingTable<S> {
    /// Fetch the initial snapshot and render the table. An empty snapshot
    /// aborts construction: nothing is rendered and `Ok(None)` is returned.
    pub async fn create(scene: S, client: Client, config: TableConfig) -> Result<Option<Self>> {
        let data = client.fetch_rows(&config.initial_data_url).await?;
        Self::build(scene, client, config, data)
    }

    /// Render from an already-fetched initial snapshot.
    pub fn build(
        mut scene: S,
        client: Client,
        config: TableConfig,
        data: Vec<Row>,
    ) -> Result<Option<Self>> {
        if data.is_empty() {
            debug!(
                "[{}] empty initial snapshot; table not rendered",
                config.container
            );
            return Ok(None);
        }

        let visible_rows = config.visible_rows.unwrap_or(data.len());
        let mut row_height = scene.viewport_height() / (visible_rows + 1) as f64;
        if row_height < MIN_ROW_HEIGHT {
            row_height = MIN_ROW_HEIGHT;
            scene.grow_viewport(row_height * (visible_rows + 1) as f64)?;
        }

        let columns = data[0].content.len();
        let column_widths = config
            .column_widths
            .clone()
            .unwrap_or_else(|| equal_shares(columns));
        let layout = RowLayout {
            row_height,
            column_widths,
            column_styles: config.column_styles.clone(),
        };

        scene.draw_header(&config.headers, &layout)?;
        for boundary in 0..visible_rows {
            scene.draw_divider(boundary, &layout)?;
        }

        if data.len() > visible_rows {
            warn!(
                "[{}] initial snapshot carries {} rows for {} slots; overflowing",
                config.container,
                data.len(),
                visible_rows
            );
        }

        let mut rows = Vec::with_capacity(data.len());
        for (slot, row) in data.iter().enumerate() {
            let element = scene.create_row(slot, row, &layout, false)?;
            rows.push(DisplayedRow {
                key: row.row_key.clone(),
                slot,
                element,
            });
        }

        debug!(
            "[{}] table rendered with {} rows over {} slots",
            config.container,
            rows.len(),
            visible_rows
        );
        Ok(Some(PollingTable {
            scene,
            client,
            container: config.container,
            layout,
            visible_rows,
            update_data_url: config.update_data_url,
            rows,
        }))
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Displayed `(key, slot)` pairs, in no particular order.
    pub fn displayed(&self) -> Vec<(RowKey, usize)> {
        self.rows.iter().map(|d| (d.key.clone(), d.slot)).collect()
    }

    /// Reconcile the displayed rows against `snapshot` (whose order defines
    /// the target slots). Two strictly sequenced phases: fade out every row
    /// whose key is gone, and only once all removals have finished, move and
    /// recolor survivors and fade in newcomers. Resolves when every effect
    /// of both phases has completed.
    pub async fn update_data(&mut self, snapshot: Vec<Row>) -> Result<()> {
        if snapshot.len() > self.visible_rows {
            warn!(
                "[{}] snapshot carries {} rows for {} slots; overflowing",
                self.container,
                snapshot.len(),
                self.visible_rows
            );
        }

        // removal phase: concurrent fade-outs, joined before anything moves
        let (kept, stale): (Vec<_>, Vec<_>) = self
            .rows
            .drain(..)
            .partition(|d| snapshot.iter().any(|row| row.row_key == d.key));
        let removed = stale.len();
        let removals = stale.into_iter().map(|d| d.element.fade_out());
        for result in join_all(removals).await {
            result?;
        }
        trace!("[{}] {removed} stale rows removed", self.container);

        // reconcile phase: moves and fade-ins, all joined together
        let mut kept: Vec<Option<DisplayedRow<S::Element>>> =
            kept.into_iter().map(Some).collect();
        let mut effects: Vec<BoxFuture<'static, Result<DisplayedRow<S::Element>>>> =
            Vec::with_capacity(snapshot.len());
        for (slot, row) in snapshot.iter().enumerate() {
            let existing = kept
                .iter()
                .position(|d| d.as_ref().is_some_and(|d| d.key == row.row_key));
            match existing {
                // survivor: recolor, then slide to its new slot
                Some(i) => {
                    let mut d = kept[i].take().expect("kept row taken once");
                    d.slot = slot;
                    d.element.recolor(Tone::of(row.confirmed))?;
                    effects.push(
                        async move {
                            d.element.animate_to(slot).await?;
                            Ok(d)
                        }
                        .boxed(),
                    );
                }
                // newcomer: create hidden at the slot, then fade in
                None => {
                    let element = self.scene.create_row(slot, row, &self.layout, true)?;
                    let mut d = DisplayedRow {
                        key: row.row_key.clone(),
                        slot,
                        element,
                    };
                    effects.push(
                        async move {
                            d.element.fade_in().await?;
                            Ok(d)
                        }
                        .boxed(),
                    );
                }
            }
        }
        for result in join_all(effects).await {
            self.rows.push(result?);
        }
        Ok(())
    }

    /// Poll loop: wait the fixed gap, fetch the update feed, reconcile,
    /// repeat. Runs forever unless a fetch or a scene operation fails, in
    /// which case the failure is logged and the chain ends; nothing above
    /// the widget is disturbed.
    pub async fn run(mut self) {
        let Some(url) = self.update_data_url.clone() else {
            return;
        };
        loop {
            sleep(TABLE_POLL_GAP).await;
            let snapshot = match self.client.fetch_rows(&url).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(
                        "[{}] update fetch failed, polling stopped: {e}",
                        self.container
                    );
                    break;
                }
            };
            if let Err(e) = self.update_data(snapshot).await {
                error!(
                    "[{}] reconciliation failed, polling stopped: {e}",
                    self.container
                );
                break;
            }
        }
    }

    /// Spawn the poll loop under a cancellable handle; dropping the handle
    /// tears the widget down.
    pub fn spawn(self) -> PollHandle
    where
        S: Send + 'static,
    {
        PollHandle::new(tokio::spawn(self.run()))
    }
}

fn equal_shares(columns: usize) -> Vec<f64> {
    vec![100.0 / columns as f64; columns]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ANIMATION_MILLIS;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Grew(f64),
        Header(usize),
        Divider(usize),
        Created {
            key: RowKey,
            slot: usize,
            tone: Tone,
            hidden: bool,
        },
        Recolored {
            key: RowKey,
            tone: Tone,
        },
        MoveStarted {
            key: RowKey,
            slot: usize,
        },
        Moved {
            key: RowKey,
            slot: usize,
        },
        FadedIn {
            key: RowKey,
        },
        Removed {
            key: RowKey,
        },
    }

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<Event>>>);

    impl Log {
        fn push(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.0.lock().unwrap().clear();
        }

        fn position(&self, wanted: &Event) -> Option<usize> {
            self.events().iter().position(|e| e == wanted)
        }
    }

    struct MockScene {
        height: f64,
        log: Log,
    }

    struct MockElement {
        key: RowKey,
        log: Log,
    }

    impl RowScene for MockScene {
        type Element = MockElement;

        fn viewport_height(&self) -> f64 {
            self.height
        }

        fn grow_viewport(&mut self, height: f64) -> Result<()> {
            self.height = height;
            self.log.push(Event::Grew(height));
            Ok(())
        }

        fn draw_header(&mut self, labels: &[String], _layout: &RowLayout) -> Result<()> {
            self.log.push(Event::Header(labels.len()));
            Ok(())
        }

        fn draw_divider(&mut self, boundary: usize, _layout: &RowLayout) -> Result<()> {
            self.log.push(Event::Divider(boundary));
            Ok(())
        }

        fn create_row(
            &mut self,
            slot: usize,
            row: &Row,
            _layout: &RowLayout,
            hidden: bool,
        ) -> Result<Self::Element> {
            self.log.push(Event::Created {
                key: row.row_key.clone(),
                slot,
                tone: Tone::of(row.confirmed),
                hidden,
            });
            Ok(MockElement {
                key: row.row_key.clone(),
                log: self.log.clone(),
            })
        }
    }

    #[async_trait]
    impl RowElement for MockElement {
        async fn animate_to(&mut self, slot: usize) -> Result<()> {
            self.log.push(Event::MoveStarted {
                key: self.key.clone(),
                slot,
            });
            tokio::time::sleep(Duration::from_millis(ANIMATION_MILLIS)).await;
            self.log.push(Event::Moved {
                key: self.key.clone(),
                slot,
            });
            Ok(())
        }

        fn recolor(&mut self, tone: Tone) -> Result<()> {
            self.log.push(Event::Recolored {
                key: self.key.clone(),
                tone,
            });
            Ok(())
        }

        async fn fade_in(&mut self) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(ANIMATION_MILLIS)).await;
            self.log.push(Event::FadedIn {
                key: self.key.clone(),
            });
            Ok(())
        }

        async fn fade_out(self) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(ANIMATION_MILLIS)).await;
            self.log.push(Event::Removed { key: self.key });
            Ok(())
        }
    }

    fn row(key: i64, confirmed: bool, cells: &[&str]) -> Row {
        Row {
            row_key: key.into(),
            confirmed,
            content: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn config(visible_rows: Option<usize>) -> TableConfig {
        TableConfig {
            container: "recent-trades".to_string(),
            visible_rows,
            column_widths: None,
            headers: vec!["When".to_string(), "Side".to_string(), "Amount".to_string()],
            column_styles: None,
            initial_data_url: "http://localhost/init".to_string(),
            update_data_url: Some("http://localhost/update".to_string()),
        }
    }

    fn table(
        height: f64,
        visible_rows: Option<usize>,
        data: Vec<Row>,
    ) -> (PollingTable<MockScene>, Log) {
        let log = Log::default();
        let scene = MockScene {
            height,
            log: log.clone(),
        };
        let table = PollingTable::build(scene, Client::new(), config(visible_rows), data)
            .unwrap()
            .expect("non-empty snapshot renders");
        (table, log)
    }

    fn displayed_sorted(table: &PollingTable<MockScene>) -> Vec<(RowKey, usize)> {
        let mut displayed = table.displayed();
        displayed.sort_by_key(|(_, slot)| *slot);
        displayed
    }

    #[test]
    fn empty_initial_snapshot_renders_nothing() {
        let log = Log::default();
        let scene = MockScene {
            height: 240.0,
            log: log.clone(),
        };
        let table = PollingTable::build(scene, Client::new(), config(Some(3)), vec![]).unwrap();
        assert!(table.is_none());
        assert!(log.events().is_empty());
    }

    #[test]
    fn initial_render_lays_out_header_dividers_and_rows() {
        let (table, log) = table(
            240.0,
            Some(3),
            vec![row(1, true, &["a", "b", "c"]), row(2, false, &["d", "e", "f"])],
        );

        assert_eq!(table.layout().row_height, 60.0);
        assert_eq!(table.layout().column_widths, vec![100.0 / 3.0; 3]);
        assert_eq!(table.layout().slot_top(0), 60.0);

        let events = log.events();
        assert_eq!(
            events,
            vec![
                Event::Header(3),
                Event::Divider(0),
                Event::Divider(1),
                Event::Divider(2),
                Event::Created {
                    key: 1.into(),
                    slot: 0,
                    tone: Tone::Neutral,
                    hidden: false,
                },
                Event::Created {
                    key: 2.into(),
                    slot: 1,
                    tone: Tone::Alert,
                    hidden: false,
                },
            ]
        );
    }

    #[test]
    fn row_height_floor_grows_the_viewport() {
        let (table, log) = table(40.0, Some(3), vec![row(1, true, &["a"])]);
        assert_eq!(table.layout().row_height, MIN_ROW_HEIGHT);
        assert_eq!(log.position(&Event::Grew(88.0)), Some(0));
    }

    #[test]
    fn configured_widths_override_the_equal_split() {
        let log = Log::default();
        let scene = MockScene {
            height: 240.0,
            log,
        };
        let mut cfg = config(Some(3));
        cfg.column_widths = Some(vec![20.0, 40.0, 40.0]);
        let table = PollingTable::build(scene, Client::new(), cfg, vec![row(1, true, &["a", "b", "c"])])
            .unwrap()
            .unwrap();
        assert_eq!(table.layout().column_widths, vec![20.0, 40.0, 40.0]);
    }

    #[test]
    fn visible_rows_defaults_to_initial_length() {
        let (table, _) = table(
            240.0,
            None,
            vec![row(1, true, &["a"]), row(2, true, &["b"])],
        );
        // 240 / (2 + 1)
        assert_eq!(table.layout().row_height, 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn displayed_keys_and_slots_match_the_snapshot() {
        let (mut table, _) = table(
            240.0,
            Some(3),
            vec![
                row(1, true, &["a"]),
                row(2, true, &["b"]),
                row(3, true, &["c"]),
            ],
        );

        table
            .update_data(vec![row(3, true, &["c"]), row(4, false, &["d"])])
            .await
            .unwrap();

        assert_eq!(
            displayed_sorted(&table),
            vec![(3.into(), 0), (4.into(), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reapplying_a_snapshot_is_idempotent() {
        let snapshot = vec![row(1, true, &["a"]), row(2, false, &["b"])];
        let (mut table, log) = table(240.0, Some(3), snapshot.clone());

        table.update_data(snapshot.clone()).await.unwrap();
        let first = displayed_sorted(&table);

        log.clear();
        table.update_data(snapshot).await.unwrap();
        assert_eq!(displayed_sorted(&table), first);

        // second pass: no removals, no insertions, only color re-assertions
        // and zero-distance moves
        let events = log.events();
        assert!(events
            .iter()
            .all(|e| !matches!(e, Event::Removed { .. } | Event::Created { .. })));
        assert!(log.position(&Event::Moved { key: 1.into(), slot: 0 }).is_some());
        assert!(log.position(&Event::Moved { key: 2.into(), slot: 1 }).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn no_move_or_insert_starts_before_all_removals_finish() {
        let (mut table, log) = table(
            240.0,
            Some(3),
            vec![row(1, true, &["a"]), row(2, true, &["b"])],
        );
        log.clear();

        table
            .update_data(vec![row(2, true, &["b"]), row(3, true, &["c"])])
            .await
            .unwrap();

        let removed = log.position(&Event::Removed { key: 1.into() }).unwrap();
        let move_started = log
            .position(&Event::MoveStarted {
                key: 2.into(),
                slot: 0,
            })
            .unwrap();
        let created = log
            .events()
            .iter()
            .position(|e| matches!(e, Event::Created { .. }))
            .unwrap();
        assert!(removed < move_started);
        assert!(removed < created);
    }

    // the walkthrough scenario: 1 leaves, 2 confirms and climbs, 3 arrives
    #[tokio::test(start_paused = true)]
    async fn removal_move_and_insert_in_one_cycle() {
        let (mut table, log) = table(
            240.0,
            Some(3),
            vec![row(1, true, &["a"]), row(2, false, &["b"])],
        );
        log.clear();

        table
            .update_data(vec![row(2, true, &["b"]), row(3, true, &["c"])])
            .await
            .unwrap();

        let events = log.events();
        assert!(events.contains(&Event::Removed { key: 1.into() }));
        assert!(events.contains(&Event::Recolored {
            key: 2.into(),
            tone: Tone::Neutral,
        }));
        assert!(events.contains(&Event::Moved {
            key: 2.into(),
            slot: 0,
        }));
        assert!(events.contains(&Event::Created {
            key: 3.into(),
            slot: 1,
            tone: Tone::Neutral,
            hidden: true,
        }));
        assert!(events.contains(&Event::FadedIn { key: 3.into() }));
        assert_eq!(
            displayed_sorted(&table),
            vec![(2.into(), 0), (3.into(), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_clears_the_table_and_polling_survives() {
        let (mut table, log) = table(
            240.0,
            Some(3),
            vec![row(1, true, &["a"]), row(2, true, &["b"])],
        );
        log.clear();

        table.update_data(vec![]).await.unwrap();
        assert!(table.displayed().is_empty());
        assert!(log.events().contains(&Event::Removed { key: 1.into() }));
        assert!(log.events().contains(&Event::Removed { key: 2.into() }));

        // the next cycle still applies cleanly
        table.update_data(vec![row(5, true, &["e"])]).await.unwrap();
        assert_eq!(displayed_sorted(&table), vec![(5.into(), 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_snapshot_is_accepted_as_is() {
        let (mut table, _) = table(240.0, Some(1), vec![row(1, true, &["a"])]);
        table
            .update_data(vec![
                row(1, true, &["a"]),
                row(2, true, &["b"]),
                row(3, true, &["c"]),
            ])
            .await
            .unwrap();
        assert_eq!(
            displayed_sorted(&table),
            vec![(1.into(), 0), (2.into(), 1), (3.into(), 2)]
        );
    }

    #[test]
    fn row_keys_deserialize_as_numbers_or_strings() {
        let rows: Vec<Row> = serde_json::from_str(
            r#"[
                {"row_key": 7, "confirmed": true, "content": ["x"]},
                {"row_key": "tx-abc", "confirmed": false, "content": ["y"]}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows[0].row_key, 7.into());
        assert_eq!(rows[1].row_key, "tx-abc".into());
    }
}
