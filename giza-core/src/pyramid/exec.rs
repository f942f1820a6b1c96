//! Local data-parallel execution of map/reduce-style jobs.
//!
//! This is the in-process stand-in for a distributed execution engine: map
//! tasks own disjoint input partitions, a group-by-key shuffle forms the
//! only synchronization barrier, and reduce tasks own disjoint key sets. A
//! real cluster runtime could replace this module behind the same strategy
//! entry points.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::PlotResult;

/// How many finished items go by between periodic progress reports.
pub(crate) const HEARTBEAT_EVERY: u64 = 100;

/// Runs one map/shuffle/reduce round over the given input partitions.
///
/// Keys are grouped deterministically (sorted order) so that reruns over
/// the same inputs produce identical reduce invocations; reduce output
/// order follows key order. A failing task fails the whole job. Each stage
/// reports task progress as it runs.
pub fn map_reduce<I, K, V, O, M, R>(partitions: Vec<I>, map: M, reduce: R) -> PlotResult<Vec<O>>
where
    I: Send,
    K: Ord + Send,
    V: Send,
    O: Send,
    M: Fn(I) -> PlotResult<Vec<(K, V)>> + Sync,
    R: Fn(K, Vec<V>) -> PlotResult<O> + Sync,
{
    let progress = Progress::new(partitions.len() as u64);
    let emitted: Vec<Vec<(K, V)>> = partitions
        .into_par_iter()
        .map(|partition| {
            let records = map(partition)?;
            if progress.inc() % HEARTBEAT_EVERY == 0 {
                info!("map tasks: {progress}");
            }
            Ok(records)
        })
        .collect::<PlotResult<_>>()?;
    debug!("map tasks: {progress}");

    // the shuffle barrier: group every emitted record by key
    let mut groups: BTreeMap<K, Vec<V>> = BTreeMap::new();
    for (key, value) in emitted.into_iter().flatten() {
        groups.entry(key).or_default().push(value);
    }

    let progress = Progress::new(groups.len() as u64);
    let reduced = groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(key, values)| {
            let out = reduce(key, values)?;
            if progress.inc() % HEARTBEAT_EVERY == 0 {
                info!("reduce tasks: {progress}");
            }
            Ok(out)
        })
        .collect::<PlotResult<Vec<O>>>()?;
    debug!("reduce tasks: {progress}");
    Ok(reduced)
}

/// Shared progress counter for long-running stages, the local equivalent of
/// the execution engine's heartbeat.
#[derive(Debug)]
pub struct Progress {
    start_time: Instant,
    total: u64,
    done: AtomicU64,
}

impl Progress {
    #[must_use]
    pub fn new(total: u64) -> Self {
        Progress {
            start_time: Instant::now(),
            total,
            done: AtomicU64::default(),
        }
    }

    /// Records one finished item; returns how many are done so far.
    pub fn inc(&self) -> u64 {
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Display for Progress {
    #[expect(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let elapsed = self.start_time.elapsed();
        let elapsed_s = elapsed.as_secs_f32();
        let done = self.done.load(Ordering::Relaxed);
        let percent = if self.total == 0 {
            100
        } else {
            done * 100 / self.total
        };
        let speed = if elapsed_s > 0.0 {
            done as f32 / elapsed_s
        } else {
            0.0
        };
        write!(f, "[{elapsed:.1?}] {percent}% @ {speed:.1}/s")?;

        let left = self.total.saturating_sub(done);
        if left == 0 {
            f.write_str(" | done")
        } else if done == 0 {
            f.write_str(" | ??? left")
        } else {
            let left = Duration::from_secs_f32(elapsed_s * left as f32 / done as f32);
            write!(f, " | {left:.0?} left")
        }
    }
}
