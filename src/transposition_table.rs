//! Shared transposition table.
//!
//! Entries are packed into fixed 24-byte records, two per bucket. The bucket
//! is chosen from the low bits of the zobrist key and the full key is stored
//! to reject collisions. A generation counter ages out entries from earlier
//! searches without having to clear the table.

use std::mem::size_of;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::board::Move;
use crate::score::EvaluationScore;

/// How the stored score relates to the true value of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBound {
    Exact,
    /// The node failed high: true value >= score.
    LowerBound,
    /// The node failed low: true value <= score.
    UpperBound,
}

impl ScoreBound {
    fn to_bits(self) -> u8 {
        match self {
            ScoreBound::Exact => 0,
            ScoreBound::LowerBound => 1,
            ScoreBound::UpperBound => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => ScoreBound::LowerBound,
            2 => ScoreBound::UpperBound,
            _ => ScoreBound::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranspositionTableEntry {
    pub key: u64,
    pub best_move: Option<Move>,
    pub score: EvaluationScore,
    /// Static value right after `best_move`, or zero when unknown.
    pub local_score: EvaluationScore,
    pub bound: ScoreBound,
    pub depth: u8,
    /// Stamped by the table on save.
    pub generation: u8,
}

impl TranspositionTableEntry {
    pub fn new(
        key: u64,
        best_move: Option<Move>,
        score: EvaluationScore,
        local_score: EvaluationScore,
        bound: ScoreBound,
        depth: i32,
    ) -> Self {
        TranspositionTableEntry {
            key,
            best_move,
            score,
            local_score,
            bound,
            depth: depth.clamp(0, u8::MAX as i32) as u8,
            generation: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct PackedEntry {
    key: u64,
    score: i32,
    local_score: i32,
    best_move: u16,
    depth: u8,
    bound: u8,
    /// Zero marks a slot that was never written.
    generation: u8,
    _padding: [u8; 3],
}

const _: () = assert!(size_of::<PackedEntry>() == 24);

impl PackedEntry {
    fn pack(entry: &TranspositionTableEntry, generation: u8) -> Self {
        PackedEntry {
            key: entry.key,
            score: entry.score.value(),
            local_score: entry.local_score.value(),
            best_move: entry.best_move.map_or(0, |mv| mv.pack()),
            depth: entry.depth,
            bound: entry.bound.to_bits(),
            generation,
            _padding: [0; 3],
        }
    }

    fn unpack(&self) -> TranspositionTableEntry {
        TranspositionTableEntry {
            key: self.key,
            best_move: Move::unpack(self.best_move),
            score: EvaluationScore::new(self.score),
            local_score: EvaluationScore::new(self.local_score),
            bound: ScoreBound::from_bits(self.bound),
            depth: self.depth,
            generation: self.generation,
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.generation == 0
    }
}

const ENTRIES_PER_BUCKET: usize = 2;
type Bucket = [PackedEntry; ENTRIES_PER_BUCKET];

/// Bytes used by one bucket.
pub const BUCKET_BYTES: usize = size_of::<Bucket>();

/// Buckets sampled by [`TranspositionTable::hashfull`].
const HASHFULL_SAMPLE_BUCKETS: usize = 500;

/// Probe and write counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub probes: u64,
    pub hits: u64,
    pub writes: u64,
}

pub struct TranspositionTable {
    buckets: Mutex<Vec<Bucket>>,
    generation: AtomicU8,
    probes: AtomicU64,
    hits: AtomicU64,
    writes: AtomicU64,
}

fn bucket_count(bytes: usize) -> usize {
    let wanted = (bytes / BUCKET_BYTES).max(1);
    // Largest power of two not above `wanted`.
    1usize << (usize::BITS - 1 - wanted.leading_zeros())
}

impl TranspositionTable {
    /// A table using at most `bytes` bytes (at least one bucket).
    pub fn new(bytes: usize) -> Self {
        TranspositionTable {
            buckets: Mutex::new(vec![Bucket::default(); bucket_count(bytes)]),
            generation: AtomicU8::new(1),
            probes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.bucket_count() * ENTRIES_PER_BUCKET
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Start a new search: entries written before now become stale.
    pub fn notify_new_search(&self) {
        let next = match self.generation().wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.generation.store(next, Ordering::Relaxed);
    }

    pub fn probe(&self, key: u64) -> Option<TranspositionTableEntry> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let buckets = self.buckets.lock();
        let index = key as usize & (buckets.len() - 1);
        let found = buckets[index]
            .iter()
            .find(|slot| !slot.is_empty() && slot.key == key)
            .map(PackedEntry::unpack);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store `entry` under the current generation.
    ///
    /// An entry for the same key is only replaced by one at least as deep.
    /// Otherwise the first empty slot is used, then a slot from an older
    /// search, then the shallower slot.
    pub fn save(&self, entry: TranspositionTableEntry) {
        let generation = self.generation();
        let mut buckets = self.buckets.lock();
        let index = entry.key as usize & (buckets.len() - 1);
        let bucket = &mut buckets[index];

        let target = if let Some(i) = bucket.iter().position(|s| !s.is_empty() && s.key == entry.key) {
            if bucket[i].depth > entry.depth {
                return;
            }
            i
        } else if let Some(i) = bucket.iter().position(PackedEntry::is_empty) {
            i
        } else {
            // Stale slots first, shallower first within each group.
            (0..ENTRIES_PER_BUCKET)
                .min_by_key(|&i| (bucket[i].generation == generation, bucket[i].depth))
                .unwrap_or(0)
        };

        bucket[target] = PackedEntry::pack(&entry, generation);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        let mut buckets = self.buckets.lock();
        buckets.iter_mut().for_each(|b| *b = Bucket::default());
        self.generation.store(1, Ordering::Relaxed);
        self.reset_stats();
    }

    /// Reallocate for a new byte budget. All entries are dropped.
    pub fn resize(&self, bytes: usize) {
        *self.buckets.lock() = vec![Bucket::default(); bucket_count(bytes)];
        self.generation.store(1, Ordering::Relaxed);
        self.reset_stats();
    }

    /// Per-mille of sampled slots written during the current search.
    pub fn hashfull(&self) -> usize {
        let generation = self.generation();
        let buckets = self.buckets.lock();
        let sample = &buckets[..buckets.len().min(HASHFULL_SAMPLE_BUCKETS)];
        let used = sample
            .iter()
            .flat_map(|b| b.iter())
            .filter(|s| s.generation == generation)
            .count();
        used * 1000 / (sample.len() * ENTRIES_PER_BUCKET)
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            probes: self.probes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn reset_stats(&self) {
        self.probes.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("buckets", &self.bucket_count())
            .field("generation", &self.generation())
            .field("stats", &self.stats())
            .finish()
    }
}
