//! In-memory memoisation of isochrone results and weather lookups.

use geojson::FeatureCollection;
use std::{
    collections::{HashMap, VecDeque},
    fmt,
    hash::Hash,
    sync::{PoisonError, RwLock},
    time::Duration,
};
use tokio::time::Instant;

use crate::{
    model::{EffectiveTravel, GeoPoint, RequestParameters, TerrainPreference, TravelMode},
    profile::ProfileId,
    provider::{IsochroneRequest, RangeType},
};

/// Coordinates are bucketed to 1e-4 degrees (about 11 m).
const COORD_SCALE: f64 = 10_000.0;
/// Durations are bucketed to a tenth of a minute.
const DURATION_SCALE: f64 = 10.0;

/// Fingerprint of everything that shapes an isochrone request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_e4: i64,
    lng_e4: i64,
    mode: TravelMode,
    terrain: TerrainPreference,
    duration_deciminutes: i64,
    profile: ProfileId,
    range_type: RangeType,
    range: u64,
}

impl CacheKey {
    pub fn new(
        params: &RequestParameters,
        travel: &EffectiveTravel,
        request: &IsochroneRequest,
    ) -> Self {
        Self {
            lat_e4: bucket(params.center.latitude, COORD_SCALE),
            lng_e4: bucket(params.center.longitude, COORD_SCALE),
            mode: params.mode,
            terrain: params.terrain,
            duration_deciminutes: bucket(travel.adjusted_duration_minutes, DURATION_SCALE),
            profile: request.profile,
            range_type: request.range_type,
            range: request.range,
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.lat_e4 as f64 / COORD_SCALE, self.lng_e4 as f64 / COORD_SCALE)
    }
}

fn bucket(value: f64, scale: f64) -> i64 {
    (value * scale).round() as i64
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let center = self.center();
        write!(
            f,
            "{:.4},{:.4}|{}|{}|{:.1}min|{}|{}:{}",
            center.latitude,
            center.longitude,
            self.mode,
            self.terrain,
            self.duration_deciminutes as f64 / DURATION_SCALE,
            self.profile,
            self.range_type,
            self.range
        )
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<K>,
}

/// Thread-safe map with optional capacity and time-to-live.
///
/// When full, the oldest inserted key is evicted first. Expired entries are
/// invisible to readers and are dropped on the next write.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    capacity: Option<usize>,
    ttl: Option<Duration>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `capacity` of `None` or `Some(0)` means unbounded.
    pub fn new(capacity: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.filter(|c| *c > 0),
            ttl,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.entries.get(key)?;

        if self.is_expired(entry, Instant::now()) {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    pub fn put(&self, key: K, value: V) {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if self.ttl.is_some() {
            let expired: Vec<K> = inner
                .entries
                .iter()
                .filter(|(_, entry)| self.is_expired(entry, now))
                .map(|(k, _)| k.clone())
                .collect();
            for k in &expired {
                inner.entries.remove(k);
            }
            if !expired.is_empty() {
                let Inner { entries, order } = &mut *inner;
                order.retain(|k| entries.contains_key(k));
            }
        }

        let previous = inner.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: now,
            },
        );
        if previous.is_some() {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key);

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
            }
        }
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }
}

pub const DEFAULT_RESULT_CAPACITY: usize = 256;

/// Successful (non-fallback) isochrones keyed by request fingerprint.
#[derive(Debug)]
pub struct ResultCache {
    entries: BoundedCache<CacheKey, FeatureCollection>,
}

impl ResultCache {
    pub fn new(capacity: Option<usize>, ttl: Option<Duration>) -> Self {
        Self {
            entries: BoundedCache::new(capacity, ttl),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<FeatureCollection> {
        self.entries.get(key)
    }

    pub fn put(&self, key: CacheKey, result: FeatureCollection) {
        self.entries.put(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Some(DEFAULT_RESULT_CAPACITY), None)
    }
}
