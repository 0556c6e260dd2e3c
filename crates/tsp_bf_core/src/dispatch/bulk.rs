use std::{ops::Range, time::Instant};

use rayon::prelude::*;

use super::{
    BestSoFar, Cancellation, Offer, ScoredRoute, SearchOutcome, SearchPlan, Tally, settle,
};
use crate::{BlockingOracle, Error, Result, Route, RouteGenerator, WaypointSet};

/// Routes scanned between two looks at the cancellation latch and the deadline.
const CANCEL_POLL_INTERVAL: u64 = 1024;

struct ChunkOutcome {
    best: Option<ScoredRoute>,
    tally: Tally,
}

/// Bulk-partition regime: one contiguous index chunk per worker, scanned without any
/// shared state, then reduced in chunk order.
#[tsp_bf_derive::timer("bulk")]
pub fn search_bulk<O: BlockingOracle>(
    waypoints: &WaypointSet,
    plan: &SearchPlan,
    oracle: &O,
    cancel: &Cancellation,
) -> Result<SearchOutcome> {
    plan.validate()?;

    let started = Instant::now();
    let deadline = plan.time_limit().map(|limit| started + limit);
    let generator = RouteGenerator::new(waypoints.len(), plan.tour);
    let routes_total = generator.total();
    let ranges = generator.partition(plan.workers);

    log::info!(
        "bulk: start n={} routes={routes_total} workers={} chunks={}",
        waypoints.len(),
        plan.workers,
        ranges.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(plan.workers)
        .build()
        .map_err(|e| Error::other(format!("rayon pool: {e}")))?;

    let chunks: Vec<ChunkOutcome> = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(chunk_idx, range)| {
                scan_chunk(
                    chunk_idx, &generator, range, waypoints, oracle, cancel, deadline,
                )
            })
            .collect()
    });

    let best = BestSoFar::new(cancel.clone());
    let mut tally = Tally::default();
    for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
        tally.absorb(&chunk.tally);
        if let Some(candidate) = chunk.best {
            let (index, distance) = (candidate.index, candidate.distance);
            if best.offer(candidate) == Offer::Improved {
                log::debug!("bulk: improved chunk={chunk_idx} index={index} distance={distance:.4}");
            }
        }
    }

    let (status, best) = settle(&best, cancel, &tally);
    let outcome = SearchOutcome {
        status,
        best,
        waypoint_count: waypoints.len(),
        routes_total,
        routes_attempted: tally.attempted(),
        failures: tally.failed,
        elapsed: started.elapsed(),
        regime: plan.regime,
        concurrency: plan.workers,
    };
    outcome.log_summary();
    Ok(outcome)
}

fn scan_chunk<O: BlockingOracle>(
    chunk_idx: usize,
    generator: &RouteGenerator,
    range: Range<u64>,
    waypoints: &WaypointSet,
    oracle: &O,
    cancel: &Cancellation,
    deadline: Option<Instant>,
) -> ChunkOutcome {
    log::debug!("bulk.chunk: start chunk={chunk_idx} range={range:?}");

    let mut scan = generator.scan(range);
    let mut tally = Tally::default();
    let mut best: Option<(u64, f64)> = None;
    let mut best_stops = Vec::new();

    while let Some((index, stops)) = scan.next_stops() {
        if tally.attempted() % CANCEL_POLL_INTERVAL == 0 && should_stop(cancel, deadline) {
            break;
        }
        match oracle.measure(waypoints, stops) {
            Ok(distance) => {
                tally.scored += 1;
                // Indices only grow within a chunk, so strict `<` keeps the first-seen tie.
                if best.is_none_or(|(_, current)| distance < current) {
                    best = Some((index, distance));
                    best_stops.clear();
                    best_stops.extend_from_slice(stops);
                }
            }
            Err(err) => {
                tally.failed += 1;
                log::debug!("bulk.chunk: score failed chunk={chunk_idx} index={index} err={err}");
            }
        }
    }

    log::debug!(
        "bulk.chunk: done chunk={chunk_idx} scored={} failed={}",
        tally.scored,
        tally.failed
    );

    ChunkOutcome {
        best: best.map(|(index, distance)| {
            ScoredRoute::new(index, Route::new(best_stops), distance)
        }),
        tally,
    }
}

fn should_stop(cancel: &Cancellation, deadline: Option<Instant>) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        log::warn!("bulk: time limit reached, cancelling");
        cancel.cancel();
        return true;
    }
    false
}
