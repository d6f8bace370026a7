//! Progressive fingerprinting funnel.
//!
//! Four ordered stages narrow the candidate set so full reads only happen
//! for files that are very likely duplicates:
//! 1. unique sizes are skipped without touching disk
//! 2. same-size files get a head/tail partial hash
//! 3. unique (size, partial hash) pairs are skipped
//! 4. what is left gets a full hash, memoized in the [`cache::HashCache`]

pub mod cache;
pub mod xxhash;

use crate::error::Error;
use crate::progress::{ProgressReporter, Stage};
use crate::storage::Database;
use ahash::AHashMap;
use cache::HashCache;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, trace, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FunnelStats {
    pub unique_sizes: usize,
    pub partial_hashed: usize,
    pub unique_partials: usize,
    pub full_hashed: usize,
    pub cache_hits: usize,
    pub read_failures: usize,
}

pub struct Fingerprinter<'a> {
    db: &'a Database,
    cache: Option<HashCache>,
    chunk_size: usize,
    batch_size: usize,
}

impl<'a> Fingerprinter<'a> {
    pub fn new(db: &'a Database, cache: Option<HashCache>, chunk_size: usize) -> Self {
        Self {
            db,
            cache,
            chunk_size,
            batch_size: 1000,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run all four stages. Records already `COMPLETE` or `SKIPPED` are left
    /// alone, so running this twice does no extra work.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<FunnelStats, Error> {
        info!("Starting fingerprinting...");
        let mut stats = FunnelStats::default();

        stats.unique_sizes = self.db.mark_unique_sizes()?;
        if stats.unique_sizes > 0 {
            info!("Skipped hashing for {} files with unique sizes", stats.unique_sizes);
        }

        self.process_partial_hashes(&mut stats, reporter)?;

        stats.unique_partials = self.db.mark_unique_partials()?;
        if stats.unique_partials > 0 {
            info!("Marked {} unique partial hashes as processed", stats.unique_partials);
        }

        self.process_full_hashes(&mut stats, reporter)?;

        info!(
            "Fingerprinting complete: {} full hashes ({} from cache), {} read failures",
            stats.full_hashed, stats.cache_hits, stats.read_failures
        );
        Ok(stats)
    }

    fn process_partial_hashes(
        &self,
        stats: &mut FunnelStats,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), Error> {
        let candidates = self.db.partial_hash_candidates()?;
        if candidates.is_empty() {
            return Ok(());
        }
        info!("Computing partial hashes for {} candidates...", candidates.len());
        let start = Instant::now();
        reporter.on_stage_start(Stage::PartialHash, Some(candidates.len()));

        let mut updates: Vec<(i64, String)> = Vec::with_capacity(self.batch_size);
        for (done, (id, path, size)) in candidates.iter().enumerate() {
            match xxhash::partial_hash(Path::new(path), *size as u64, self.chunk_size) {
                Ok(hash) => updates.push((*id, hash)),
                Err(e) => {
                    error!("Could not read file '{}': {}", path, e);
                    stats.read_failures += 1;
                }
            }
            if updates.len() >= self.batch_size {
                stats.partial_hashed += self.db.set_partial_hashes(&updates)?;
                updates.clear();
            }
            reporter.on_stage_progress(Stage::PartialHash, done + 1);
        }
        stats.partial_hashed += self.db.set_partial_hashes(&updates)?;

        reporter.on_stage_complete(
            Stage::PartialHash,
            stats.partial_hashed,
            start.elapsed().as_secs_f64(),
        );
        Ok(())
    }

    fn process_full_hashes(
        &self,
        stats: &mut FunnelStats,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), Error> {
        let candidates = self.db.full_hash_candidates()?;
        if candidates.is_empty() {
            return Ok(());
        }
        info!(
            "Resolving full hashes for {} high-probability duplicates...",
            candidates.len()
        );
        let start = Instant::now();
        reporter.on_stage_start(Stage::FullHash, Some(candidates.len()));

        let mut order: Vec<(i64, String)> = Vec::new();
        let mut groups: AHashMap<(i64, String), Vec<(i64, String)>> = AHashMap::new();
        for (id, path, size, partial) in candidates {
            let key = (size, partial);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push((id, path));
        }

        let mut updates: Vec<(i64, String)> = Vec::with_capacity(self.batch_size);
        let mut done = 0usize;
        for key in order {
            let members = match groups.remove(&key) {
                Some(m) => m,
                None => continue,
            };
            let (size, partial) = key;
            done += members.len();

            if let Some(cached) = self.cached_full_hash(size, &partial) {
                trace!("Cache hit for size {} partial {}", size, partial);
                stats.cache_hits += members.len();
                updates.extend(members.into_iter().map(|(id, _)| (id, cached.clone())));
            } else {
                let mut computed: Vec<(i64, String)> = Vec::with_capacity(members.len());
                for (id, path) in &members {
                    match xxhash::full_hash(Path::new(path)) {
                        Ok(hash) => computed.push((*id, hash)),
                        Err(e) => {
                            error!("Could not read file '{}': {}", path, e);
                            stats.read_failures += 1;
                        }
                    }
                }
                self.remember(size, &partial, &computed);
                updates.extend(computed);
            }

            if updates.len() >= self.batch_size {
                stats.full_hashed += self.db.set_full_hashes(&updates)?;
                updates.clear();
            }
            reporter.on_stage_progress(Stage::FullHash, done);
        }
        stats.full_hashed += self.db.set_full_hashes(&updates)?;

        if stats.cache_hits > 0 {
            info!("Cache hits: {} files skipped full reading", stats.cache_hits);
        }
        reporter.on_stage_complete(
            Stage::FullHash,
            stats.full_hashed,
            start.elapsed().as_secs_f64(),
        );
        Ok(())
    }

    fn cached_full_hash(&self, size: i64, partial: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get_full_hash(size, partial) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Hash cache lookup failed: {}", e);
                None
            }
        }
    }

    /// Memoize a group's full hash. A group whose members disagree shows the
    /// (size, partial) key is ambiguous, so it is not cached.
    fn remember(&self, size: i64, partial: &str, computed: &[(i64, String)]) {
        let cache = match self.cache.as_ref() {
            Some(c) => c,
            None => return,
        };
        let first = match computed.first() {
            Some((_, h)) => h,
            None => return,
        };
        if computed.iter().any(|(_, h)| h != first) {
            warn!(
                "Files of size {} share partial hash {} but differ in content; not caching",
                size, partial
            );
            return;
        }
        if let Err(e) = cache.put_full_hash(size, partial, first) {
            warn!("Failed to cache hash: {}", e);
        }
    }
}
