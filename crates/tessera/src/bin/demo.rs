//! # TESSERA Demo
//!
//! Headless run of a small grid simulation:
//! - A protected cursor wanders the grid, driven by an input thread
//! - A timer thread asks for a collectible nugget; at most one exists
//! - The cursor collects a nugget by standing on it
//! - A presentation thread renders snapshots to the log
//!
//! Run with: `RUST_LOG=debug cargo run --bin tessera-demo -- --ticks 400`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera::{GameLoop, RuntimeConfig, RuntimeError, RuntimeResult, TimerFired, TimerProducer};
use tessera_core::{Component, Entity, Point, Publisher, Snapshot, SnapshotReader, TickClock, World, ZIndex};
use tracing_subscriber::EnvFilter;

/// Headless TESSERA demo
#[derive(Parser, Debug)]
#[command(name = "tessera-demo")]
#[command(about = "A cursor wanders a grid collecting nuggets")]
struct Args {
    /// TOML runtime configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to run before exiting
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Random seed for deterministic spawning
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Grid width in cells
    #[arg(long, default_value_t = 16)]
    width: i32,

    /// Grid height in cells
    #[arg(long, default_value_t = 10)]
    height: i32,
}

// =============================================================================
// Components, events, resources
// =============================================================================

#[derive(Clone, Debug)]
struct Cursor;
impl Component for Cursor {}

#[derive(Clone, Debug)]
struct Nugget;
impl Component for Nugget {}

#[derive(Clone, Copy, Debug)]
struct Glyph(char);
impl Component for Glyph {}

/// Simulated time after which the entity is removed.
#[derive(Clone, Copy, Debug)]
struct Expiry(Duration);
impl Component for Expiry {}

#[derive(Clone, Copy, Debug)]
struct CursorMove {
    dx: i32,
    dy: i32,
}

/// Singleton kind: the one live nugget.
struct ActiveNugget;

#[derive(Clone, Copy, Debug)]
struct Grid {
    width: i32,
    height: i32,
}

impl Grid {
    fn clamp(self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }
}

struct CursorHandle(Entity);

struct SpawnRng(ChaCha8Rng);

#[derive(Clone, Copy, Debug, Default)]
struct Score {
    collected: u32,
    expired: u32,
}

const NUGGET_TTL: Duration = Duration::from_secs(3);
const NUGGET_INTERVAL: Duration = Duration::from_millis(400);
const INPUT_INTERVAL: Duration = Duration::from_millis(60);

// =============================================================================
// Systems
// =============================================================================

fn input_system(world: &mut World, _delta: Duration) {
    let moves = world.events().drain::<CursorMove>();
    let (Some(cursor), Some(grid)) = (
        world.resource::<CursorHandle>().map(|c| c.0),
        world.resource::<Grid>().copied(),
    ) else {
        return;
    };
    let Some(mut at) = world.position_of(cursor) else {
        return;
    };
    for step in moves {
        let (x, y) = grid.clamp(at.x + step.dx, at.y + step.dy);
        at = Point::new(x, y);
    }
    world.set_position(cursor, at.x, at.y);
}

fn spawn_system(world: &mut World, _delta: Duration) {
    let fired = world.events().drain::<TimerFired>();
    let now = world.resource::<TickClock>().map_or(Duration::ZERO, |c| c.elapsed);
    let holder = world.singleton::<ActiveNugget>();

    if let Some(current) = holder.current() {
        let expired = world.get::<Expiry>(current).map_or(true, |e| e.0 <= now);
        if expired && holder.compare_and_swap_clear(current) {
            world.destroy_entity(current);
            if let Some(score) = world.resource_mut::<Score>() {
                score.expired += 1;
            }
            tracing::debug!(nugget = %current, "nugget expired");
        }
    }

    if fired.is_empty() || !holder.is_empty() {
        return;
    }
    let Some(grid) = world.resource::<Grid>().copied() else {
        return;
    };
    let Some(rng) = world.resource_mut::<SpawnRng>() else {
        return;
    };
    let (x, y) = (rng.0.gen_range(0..grid.width), rng.0.gen_range(0..grid.height));

    let nugget = world.create_entity();
    world.insert(nugget, Nugget);
    world.insert(nugget, Glyph('*'));
    world.insert(nugget, Expiry(now + NUGGET_TTL));
    world.set_position(nugget, x, y);
    if holder.set_if_absent(nugget) {
        tracing::debug!(%nugget, x, y, "nugget spawned");
    } else {
        world.destroy_entity(nugget);
    }
}

fn collect_system(world: &mut World, _delta: Duration) {
    let Some(cursor) = world.resource::<CursorHandle>().map(|c| c.0) else {
        return;
    };
    let Some(at) = world.position_of(cursor) else {
        return;
    };
    let Some(target) = world.top_entity_at_filtered(at.x, at.y, |w, e| w.is_interactable(e))
    else {
        return;
    };
    // The spawner may have expired and replaced the nugget meanwhile.
    if world.singleton::<ActiveNugget>().compare_and_swap_clear(target) {
        world.destroy_entity(target);
        if let Some(score) = world.resource_mut::<Score>() {
            score.collected += 1;
            tracing::info!(collected = score.collected, x = at.x, y = at.y, "nugget collected");
        }
    }
}

// =============================================================================
// Presentation
// =============================================================================

/// What the presentation thread draws.
struct FrameView {
    tick: u64,
    glyphs: Vec<(Point, char)>,
    score: Score,
}

impl Snapshot for FrameView {
    fn capture(world: &World) -> Self {
        let mut glyphs: Vec<(Point, char)> = world
            .spatial()
            .iter_cells()
            .filter_map(|(point, cell)| {
                let top = cell.top()?;
                world.get::<Glyph>(top).map(|g| (point, g.0))
            })
            .collect();
        glyphs.sort_unstable_by_key(|(p, _)| *p);
        Self {
            tick: world.tick_count(),
            glyphs,
            score: world.resource::<Score>().copied().unwrap_or_default(),
        }
    }
}

fn render(view: &FrameView, grid: Grid) -> String {
    let width = usize::try_from(grid.width).unwrap_or(0);
    let height = usize::try_from(grid.height).unwrap_or(0);
    let mut rows = vec![vec!['.'; width]; height];
    for (point, glyph) in &view.glyphs {
        if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) {
            if let Some(cell) = rows.get_mut(y).and_then(|r| r.get_mut(x)) {
                *cell = *glyph;
            }
        }
    }
    rows.into_iter()
        .map(|r| r.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn spawn_presenter(
    mut reader: SnapshotReader<FrameView>,
    shutdown: Arc<AtomicBool>,
    grid: Grid,
) -> RuntimeResult<JoinHandle<u64>> {
    thread::Builder::new()
        .name("presenter".into())
        .spawn(move || {
            let mut frames = 0;
            while !shutdown.load(Ordering::Acquire) {
                match reader.poll() {
                    Some(view) => {
                        frames += 1;
                        tracing::debug!(
                            tick = view.tick,
                            collected = view.score.collected,
                            "\n{}",
                            render(&view, grid)
                        );
                    }
                    None => thread::sleep(Duration::from_millis(5)),
                }
            }
            frames
        })
        .map_err(|source| RuntimeError::Spawn {
            name: "presenter".into(),
            source,
        })
}

fn spawn_input(
    publisher: Publisher<CursorMove>,
    shutdown: Arc<AtomicBool>,
    seed: u64,
) -> RuntimeResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            while !shutdown.load(Ordering::Acquire) {
                let (dx, dy) = match rng.gen_range(0..4) {
                    0 => (1, 0),
                    1 => (-1, 0),
                    2 => (0, 1),
                    _ => (0, -1),
                };
                publisher.publish(CursorMove { dx, dy });
                thread::sleep(INPUT_INTERVAL);
            }
        })
        .map_err(|source| RuntimeError::Spawn {
            name: "input".into(),
            source,
        })
}

// =============================================================================
// Setup
// =============================================================================

fn setup(world: &mut World, args: &Args, grid: Grid, shutdown: &Arc<AtomicBool>) {
    world.set_z_index(
        ZIndex::builder()
            .layer::<Cursor>(1000)
            .layer::<Nugget>(500)
            .interactable::<Nugget>()
            .build(),
    );
    world.insert_resource(grid);
    world.insert_resource(Score::default());
    world.insert_resource(SpawnRng(ChaCha8Rng::seed_from_u64(args.seed)));

    let cursor = world.create_entity();
    world.insert(cursor, Cursor);
    world.insert(cursor, Glyph('@'));
    world.protect(cursor);
    world.set_position(cursor, grid.width / 2, grid.height / 2);
    world.insert_resource(CursorHandle(cursor));

    world.add_system(input_system, 0);
    world.add_system(spawn_system, 10);
    world.add_system(collect_system, 20);

    // Generic cleanup: anything past its expiry goes, the cursor never does.
    world.add_system(
        |w: &mut World, _: Duration| {
            let now = w.resource::<TickClock>().map_or(Duration::ZERO, |c| c.elapsed);
            let stale: Vec<Entity> = w
                .store::<Expiry>()
                .map(|s| s.iter().filter(|(_, e)| e.0 < now).map(|(id, _)| id).collect())
                .unwrap_or_default();
            for entity in stale {
                w.destroy_entity(entity);
            }
        },
        30,
    );

    let limit = args.ticks;
    let flag = Arc::clone(shutdown);
    world.add_system(
        move |w: &mut World, _: Duration| {
            if w.tick_count() >= limit {
                flag.store(true, Ordering::Release);
            }
        },
        i32::MAX,
    );
}

fn run(args: &Args) -> RuntimeResult<()> {
    let config = match &args.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };
    if args.width <= 0 || args.height <= 0 {
        return Err(RuntimeError::InvalidConfig(format!(
            "grid must be at least 1x1, got {}x{}",
            args.width, args.height
        )));
    }
    let grid = Grid {
        width: args.width,
        height: args.height,
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut game: GameLoop<FrameView> = GameLoop::new(&config);
    setup(game.world_mut(), args, grid, &shutdown);

    let events = Arc::clone(game.world().events());
    let timer = TimerProducer::spawn("nugget", NUGGET_INTERVAL, events.publisher())?;
    let input = spawn_input(events.publisher(), Arc::clone(&shutdown), args.seed.wrapping_add(1))?;
    let presenter = spawn_presenter(game.reader(), Arc::clone(&shutdown), grid)?;

    tracing::info!(
        ticks = args.ticks,
        seed = args.seed,
        width = grid.width,
        height = grid.height,
        "demo started"
    );
    game.run(&shutdown);
    shutdown.store(true, Ordering::Release);

    let fired = timer.stop();
    if input.join().is_err() {
        tracing::warn!("input thread panicked");
    }
    let frames = presenter.join().unwrap_or_else(|_| {
        tracing::warn!("presenter thread panicked");
        0
    });

    game.stats().log_summary();
    for stat in events.stats() {
        tracing::info!(
            kind = stat.kind,
            published = stat.published,
            dropped = stat.dropped,
            "event channel"
        );
    }
    let score = game.world().resource::<Score>().copied().unwrap_or_default();
    tracing::info!(
        collected = score.collected,
        expired = score.expired,
        timer_fired = fired,
        frames_presented = frames,
        "demo finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "demo failed");
            ExitCode::FAILURE
        }
    }
}
