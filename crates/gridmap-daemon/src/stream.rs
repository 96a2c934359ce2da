//! Per-viewer update stream.
//!
//! Wire format (`text/event-stream`):
//!
//! - first message: `data: [...]`, every known tile's version
//! - every flush interval: `data: [...]`, tile changes since the last flush,
//!   one entry per tile with its latest version (possibly empty)
//! - on each merge: `event: merge` with `data: {"from","to","shiftX","shiftY"}`
//!
//! The stream ends when the broadcaster drops this viewer.

use std::time::Duration;

use axum::response::sse::Event;
use futures::Stream;
use gridmap_engine::{Subscription, TileBatch};
use gridmap_types::{MergeEvent, TileCache};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Tiles(Vec<TileCache>),
    Merge(MergeEvent),
}

impl Update {
    pub fn to_event(&self) -> Result<Event, axum::Error> {
        match self {
            Update::Tiles(tiles) => Event::default().json_data(tiles),
            Update::Merge(merge) => Event::default().event("merge").json_data(merge),
        }
    }
}

pub struct UpdateStream {
    sub: Subscription,
    snapshot: Option<Vec<TileCache>>,
    batch: TileBatch,
    ticker: Interval,
}

impl UpdateStream {
    pub fn new(sub: Subscription, snapshot: Vec<TileCache>, flush_interval: Duration) -> Self {
        let period = flush_interval.max(Duration::from_millis(10));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            sub,
            snapshot: Some(snapshot),
            batch: TileBatch::new(),
            ticker,
        }
    }

    /// Next message for the viewer, or `None` once disconnected.
    pub async fn next_update(&mut self) -> Option<Update> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(Update::Tiles(snapshot));
        }
        loop {
            tokio::select! {
                tile = self.sub.tiles.recv() => self.batch.push(tile?),
                merge = self.sub.merges.recv() => return Some(Update::Merge(merge?)),
                _ = self.ticker.tick() => return Some(Update::Tiles(self.batch.take())),
            }
        }
    }

    pub fn into_events(self) -> impl Stream<Item = Result<Event, axum::Error>> {
        futures::stream::unfold(self, |mut stream| async move {
            let update = stream.next_update().await?;
            Some((update.to_event(), stream))
        })
    }
}
