use std::time::Instant;

use futures::{StreamExt, stream};

use super::{
    BestSoFar, Cancellation, Offer, ScoredRoute, SearchOutcome, SearchPlan, Tally, settle,
};
use crate::{DistanceOracle, Result, RouteGenerator, WaypointSet};

/// Fan-out regime: routes stream lazily into at most `fan_out_width` concurrent oracle
/// calls, and one reducer loop folds completions into the shared best cell in whatever
/// order they finish.
#[tsp_bf_derive::timer("fan-out")]
pub async fn search_fan_out<O: DistanceOracle>(
    waypoints: &WaypointSet,
    plan: &SearchPlan,
    oracle: &O,
    cancel: &Cancellation,
) -> Result<SearchOutcome> {
    plan.validate()?;

    let started = Instant::now();
    let generator = RouteGenerator::new(waypoints.len(), plan.tour);
    let routes_total = generator.total();

    log::info!(
        "fan-out: start n={} routes={routes_total} width={} oracle={}",
        waypoints.len(),
        plan.fan_out_width,
        oracle.name()
    );

    let best = BestSoFar::new(cancel.clone());
    let mut tally = Tally::default();

    let results = stream::iter(generator.routes())
        .map(|(index, route)| async move {
            let scored = oracle.score(waypoints, &route).await;
            (index, route, scored)
        })
        .buffer_unordered(plan.fan_out_width);
    tokio::pin!(results);

    let deadline = plan
        .time_limit()
        .map(|limit| tokio::time::Instant::now() + limit);
    let time_limit = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(time_limit);

    let cancelled = cancel.cancelled();
    tokio::pin!(cancelled);

    loop {
        tokio::select! {
            biased;
            _ = &mut cancelled => {
                log::warn!("fan-out: cancelled, dropping in-flight calls");
                break;
            }
            _ = &mut time_limit => {
                log::warn!("fan-out: time limit reached, cancelling");
                cancel.cancel();
                break;
            }
            next = results.next() => match next {
                Some((index, route, Ok(distance))) => {
                    tally.scored += 1;
                    if best.offer(ScoredRoute::new(index, route, distance)) == Offer::Improved {
                        log::debug!("fan-out: improved index={index} distance={distance:.4}");
                    }
                }
                Some((index, _, Err(err))) => {
                    tally.failed += 1;
                    log::debug!("fan-out: score failed index={index} err={err}");
                }
                None => break,
            },
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
        concurrency: plan.fan_out_width,
    };
    outcome.log_summary();
    Ok(outcome)
}
