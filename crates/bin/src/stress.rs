//! Stress - concurrent quadtree reader/writer harness.
//!
//! Writers own disjoint point sets and cycle them in and out of one shared
//! tree; readers run area queries until the writers stop. The run fails if a
//! query ever returns an element twice or the tree is not back to a single
//! empty quad at the end.

mod config;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::bail;
use collisions::{CollisionPoint, ConcurrentPointQuadTree, IdSequence, Rectangle, SpatialElement};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::StressConfig;

#[derive(Debug, Default)]
struct Stats {
    cycles: AtomicUsize,
    queries: AtomicUsize,
    hits: AtomicUsize,
    duplicates: AtomicUsize,
}

fn random_point(rng: &mut StdRng, ids: &IdSequence, bounds: &Rectangle) -> CollisionPoint {
    CollisionPoint::new(
        ids,
        bounds.min_x() + rng.random::<f32>() * bounds.width,
        bounds.min_y() + rng.random::<f32>() * bounds.height,
    )
}

/// A query area up to an eighth of the world on each side.
fn random_area(rng: &mut StdRng, bounds: &Rectangle) -> Rectangle {
    Rectangle::new(
        bounds.min_x() + rng.random::<f32>() * bounds.width,
        bounds.min_y() + rng.random::<f32>() * bounds.height,
        rng.random::<f32>() * bounds.width / 8.0,
        rng.random::<f32>() * bounds.height / 8.0,
    )
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,collisions=debug")),
        )
        .init();

    info!("Collision stress v{}", env!("CARGO_PKG_VERSION"));

    let config = StressConfig::load()?;
    let bounds = config.world.bounds();
    let tree = ConcurrentPointQuadTree::new(config.tree, bounds)?;
    let run = &config.run;

    info!(
        "{} writers x {} points, {} readers, {} ms over {}x{} (limit={} watermark={} max_depth={})",
        run.writers,
        run.points_per_writer,
        run.readers,
        run.duration_ms,
        bounds.width,
        bounds.height,
        config.tree.element_limit,
        config.tree.merge_watermark,
        config.tree.max_depth
    );

    let ids = IdSequence::default();
    let stats = Stats::default();
    let writers_done = AtomicBool::new(false);
    let started = Instant::now();
    let deadline = started + Duration::from_millis(run.duration_ms);

    thread::scope(|s| {
        let writers: Vec<_> = (0..run.writers)
            .map(|index| {
                let (tree, ids, stats) = (&tree, &ids, &stats);
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(run.seed.wrapping_add(index as u64));
                    let points: Vec<CollisionPoint> = (0..run.points_per_writer)
                        .map(|_| random_point(&mut rng, ids, &bounds))
                        .collect();
                    while Instant::now() < deadline {
                        tree.add_all(points.iter().copied());
                        tree.remove_all(points.iter());
                        stats.cycles.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for index in 0..run.readers {
            let (tree, stats, done) = (&tree, &stats, &writers_done);
            s.spawn(move || {
                let mut rng = StdRng::seed_from_u64(run.seed.wrapping_add(u64::MAX / 2 + index as u64));
                let mut found = Vec::new();
                let mut seen = HashSet::new();
                while !done.load(Ordering::Relaxed) {
                    let area = random_area(&mut rng, &bounds);
                    found.clear();
                    tree.elements_within_area_into(&mut found, &area);

                    seen.clear();
                    let unique = found.iter().filter(|p| seen.insert(p.id())).count();
                    if unique != found.len() {
                        warn!("Query {:?} returned {} duplicate elements", area, found.len() - unique);
                        stats.duplicates.fetch_add(found.len() - unique, Ordering::Relaxed);
                    }
                    stats.queries.fetch_add(1, Ordering::Relaxed);
                    stats.hits.fetch_add(unique, Ordering::Relaxed);
                }
            });
        }

        for writer in writers {
            if writer.join().is_err() {
                warn!("Writer thread panicked");
            }
        }
        writers_done.store(true, Ordering::Relaxed);
    });

    let cycles = stats.cycles.load(Ordering::Relaxed);
    let queries = stats.queries.load(Ordering::Relaxed);
    let hits = stats.hits.load(Ordering::Relaxed);
    info!(
        "Finished in {:?}: {} write cycles, {} queries ({:.1} hits/query), {} merges",
        started.elapsed(),
        cycles,
        queries,
        hits as f64 / queries.max(1) as f64,
        tree.total_merge_operations()
    );
    info!("Final tree: {:?}", tree);

    let duplicates = stats.duplicates.load(Ordering::Relaxed);
    if duplicates > 0 {
        bail!("Readers saw {} duplicate elements", duplicates);
    }
    if tree.total_elements() != 0 || tree.total_quads() != 1 {
        bail!(
            "Tree did not return to a single empty quad: {} elements in {} quads",
            tree.total_elements(),
            tree.total_quads()
        );
    }
    if cycles > 0 && tree.total_merge_operations() == 0 {
        warn!("No merges happened; raise points_per_writer or lower element_limit");
    }
    Ok(())
}
