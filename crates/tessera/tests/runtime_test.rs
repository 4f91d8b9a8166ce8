//! Integration test for the runtime: a timer thread feeding a paced game
//! loop while a presentation thread reads snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tessera::{GameLoop, RuntimeConfig, TimerFired, TimerProducer};
use tessera_core::{Component, OccupancySnapshot, Point, World};

#[derive(Clone)]
struct Marker;
impl Component for Marker {}

#[derive(Default)]
struct Fired(u64);

#[test]
fn timer_events_reach_systems() {
    let config = RuntimeConfig {
        tick_rate_hz: 200,
        ..RuntimeConfig::default()
    };
    let mut game: GameLoop = GameLoop::new(&config);
    game.world_mut().insert_resource(Fired::default());
    game.world_mut().add_system(
        |w: &mut World, _: Duration| {
            let n = w.events().drain::<TimerFired>().len() as u64;
            if let Some(fired) = w.resource_mut::<Fired>() {
                fired.0 += n;
            }
        },
        0,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    game.world_mut().add_system(
        move |w: &mut World, _: Duration| {
            if w.tick_count() >= 40 {
                flag.store(true, Ordering::Release);
            }
        },
        100,
    );

    let timer = TimerProducer::spawn(
        "test",
        Duration::from_millis(5),
        game.world().events().publisher(),
    )
    .unwrap();
    let ran = game.run(&shutdown);
    let fired = timer.stop();

    assert_eq!(ran, 40);
    // One last batch may still be queued after the final tick.
    let seen = game.world().resource::<Fired>().map_or(0, |f| f.0);
    let leftover = game.world().events().drain::<TimerFired>().len() as u64;
    assert_eq!(seen + leftover, fired);
    assert!(seen > 0);
}

#[test]
fn presenter_follows_paced_loop() {
    let config = RuntimeConfig {
        tick_rate_hz: 500,
        ..RuntimeConfig::default()
    };
    let mut game: GameLoop<OccupancySnapshot> = GameLoop::new(&config);
    let walker = game.world_mut().create_entity();
    game.world_mut().insert(walker, Marker);
    game.world_mut().set_position(walker, 0, 0);

    game.world_mut().add_system(
        move |w: &mut World, _: Duration| {
            if let Some(at) = w.position_of(walker) {
                w.set_position(walker, at.x + 1, 0);
            }
        },
        0,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    game.world_mut().add_system(
        move |w: &mut World, _: Duration| {
            if w.tick_count() >= 100 {
                flag.store(true, Ordering::Release);
            }
        },
        100,
    );

    // Separate from `shutdown`: the loop publishes the final snapshot after
    // the stopping system has run.
    let presented = Arc::new(AtomicBool::new(false));
    let mut reader = game.reader();
    let stop = Arc::clone(&presented);
    let presenter = thread::spawn(move || {
        let mut last_tick = 0;
        let mut frames = 0;
        loop {
            let done = stop.load(Ordering::Acquire);
            if let Some(snap) = reader.poll() {
                assert!(snap.tick > last_tick);
                let x = i32::try_from(snap.tick).unwrap();
                assert_eq!(snap.top_at(Point::new(x, 0)), Some(walker));
                last_tick = snap.tick;
                frames += 1;
            }
            if done {
                break;
            }
            thread::sleep(Duration::from_micros(200));
        }
        (frames, last_tick)
    });

    game.run(&shutdown);
    presented.store(true, Ordering::Release);
    let (frames, last_tick) = presenter.join().unwrap();

    assert!(frames > 0);
    assert_eq!(last_tick, 100);
    assert_eq!(game.world().position_of(walker), Some(Point::new(100, 0)));
}
