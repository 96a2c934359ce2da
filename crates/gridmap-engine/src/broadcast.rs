//! Update fan-out to live viewers.
//!
//! Each subscriber owns a bounded queue. Publishing never waits: a
//! subscriber whose queue is full is dropped on the spot, which closes its
//! receiving end once it drains what was already queued.

use std::collections::HashMap;

use gridmap_types::{MergeEvent, TileCache};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// One multicast channel.
pub struct Topic<T> {
    name: &'static str,
    capacity: usize,
    subscribers: Mutex<Vec<mpsc::Sender<T>>>,
}

impl<T: Clone> Topic<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every subscriber that has room for it.
    pub fn publish(&self, event: &T) {
        let name = self.name;
        self.subscribers
            .lock()
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(topic = name, "subscriber queue full, dropping subscriber");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(topic = name, "subscriber gone");
                    false
                }
            });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drop every subscriber.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}

/// The two update channels: tile changes and map merges.
pub struct Broadcaster {
    tiles: Topic<TileCache>,
    merges: Topic<MergeEvent>,
}

/// Receiving half of one viewer session.
pub struct Subscription {
    pub tiles: mpsc::Receiver<TileCache>,
    pub merges: mpsc::Receiver<MergeEvent>,
}

impl Broadcaster {
    pub fn new(tile_capacity: usize, merge_capacity: usize) -> Self {
        Self {
            tiles: Topic::new("tiles", tile_capacity),
            merges: Topic::new("merges", merge_capacity),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            tiles: self.tiles.subscribe(),
            merges: self.merges.subscribe(),
        }
    }

    pub fn publish_tile(&self, event: &TileCache) {
        self.tiles.publish(event);
    }

    pub fn publish_merge(&self, event: &MergeEvent) {
        self.merges.publish(event);
    }

    pub fn tiles(&self) -> &Topic<TileCache> {
        &self.tiles
    }

    pub fn merges(&self) -> &Topic<MergeEvent> {
        &self.merges
    }

    /// Disconnect every viewer, e.g. after a full rebuild or wipe.
    pub fn close_all(&self) {
        self.tiles.close();
        self.merges.close();
    }
}

/// Per-connection buffer of tile events between two flushes.
///
/// Keeps one entry per `(map, x, y, zoom)`, holding the highest version seen,
/// in first-seen order. Publishers race after their writes commit, so events
/// for one tile may arrive out of order.
#[derive(Debug, Default)]
pub struct TileBatch {
    entries: Vec<TileCache>,
    index: HashMap<(i64, i32, i32, u8), usize>,
}

impl TileBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TileCache) {
        let key = (event.map, event.x, event.y, event.zoom);
        match self.index.get(&key) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.cache = entry.cache.max(event.cache);
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the buffered events, leaving the batch empty.
    pub fn take(&mut self) -> Vec<TileCache> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }
}
