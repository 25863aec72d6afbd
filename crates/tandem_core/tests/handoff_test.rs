//! Integration tests for the host/engine handoff.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tandem_core::{
    spawn, Cancelled, EngineExit, EngineHandle, HandoffResult, SetupError, Side, SwitchReason, SyncStrategy,
    TandemConfig,
};

const ROUNDS: u32 = 500;

fn config(strategy: SyncStrategy) -> TandemConfig {
    TandemConfig {
        strategy,
        ..TandemConfig::default()
    }
}

/// Engine body that yields forever until cancelled.
fn yield_forever(engine: &mut EngineHandle) -> HandoffResult<()> {
    loop {
        engine.switch_thread(SwitchReason::None)?;
    }
}

fn wait_for(flag: &AtomicBool) {
    let start = Instant::now();
    while !flag.load(Ordering::SeqCst) {
        assert!(start.elapsed() < Duration::from_secs(10), "engine never unwound");
        thread::yield_now();
    }
}

/// Marks the calling side as running and records an overlap.
fn enter(running: &AtomicU32, overlaps: &AtomicU32) {
    if running.fetch_add(1, Ordering::SeqCst) != 0 {
        overlaps.fetch_add(1, Ordering::SeqCst);
    }
    thread::yield_now();
    running.fetch_sub(1, Ordering::SeqCst);
}

fn strict_alternation(strategy: SyncStrategy) {
    let running = Arc::new(AtomicU32::new(0));
    let overlaps = Arc::new(AtomicU32::new(0));
    let engine_turns = Arc::new(AtomicU32::new(0));

    let mut host = spawn(&config(strategy), {
        let running = Arc::clone(&running);
        let overlaps = Arc::clone(&overlaps);
        let engine_turns = Arc::clone(&engine_turns);
        move |engine| loop {
            enter(&running, &overlaps);
            engine_turns.fetch_add(1, Ordering::SeqCst);
            engine.switch_thread(SwitchReason::None)?;
        }
    })
    .unwrap();

    for round in 1..=ROUNDS {
        enter(&running, &overlaps);
        host.switch_thread(SwitchReason::None).unwrap();
        assert_eq!(engine_turns.load(Ordering::SeqCst), round);
    }

    assert_eq!(host.handoff_count(), u64::from(ROUNDS) * 2);
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_strict_alternation_blocking() {
    strict_alternation(SyncStrategy::Blocking);
}

#[test]
fn test_strict_alternation_spinning() {
    strict_alternation(SyncStrategy::Spinning);
}

#[test]
fn test_engine_runs_on_named_thread() {
    let name = Arc::new(Mutex::new(None));
    let mut host = spawn(&TandemConfig::default(), {
        let name = Arc::clone(&name);
        move |engine| {
            *name.lock() = thread::current().name().map(str::to_owned);
            yield_forever(engine)
        }
    })
    .unwrap();

    host.switch_thread(SwitchReason::None).unwrap();
    assert_eq!(name.lock().as_deref(), Some("tandem-engine"));
    drop(host);
}

#[test]
fn test_reason_round_trip() {
    let seen_by_engine = Arc::new(Mutex::new(Vec::new()));
    let mut host = spawn(&TandemConfig::default(), {
        let seen = Arc::clone(&seen_by_engine);
        move |engine| {
            let reason = engine.switch_thread(SwitchReason::VideoModeChange)?;
            seen.lock().push(reason);
            let reason = engine.switch_thread(SwitchReason::None)?;
            seen.lock().push(reason);
            yield_forever(engine)
        }
    })
    .unwrap();

    assert_eq!(
        host.switch_thread(SwitchReason::None).unwrap(),
        SwitchReason::VideoModeChange
    );
    assert_eq!(
        host.switch_thread(SwitchReason::VideoModeChange).unwrap(),
        SwitchReason::None
    );
    assert_eq!(
        host.switch_thread(SwitchReason::None).unwrap(),
        SwitchReason::None
    );

    assert_eq!(
        *seen_by_engine.lock(),
        vec![SwitchReason::VideoModeChange, SwitchReason::None]
    );
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_engine_exit_request_cancels_host() {
    for strategy in [SyncStrategy::Blocking, SyncStrategy::Spinning] {
        let mut host = spawn(&config(strategy), |engine| {
            engine.request_exit(Side::Engine);
            engine.switch_thread(SwitchReason::None).map(|_| ())
        })
        .unwrap();

        assert!(host.switch_thread(SwitchReason::None).is_err());
        assert!(host.exit_requested(Side::Engine));
        assert!(!host.holds_control());

        // Control never comes back after a cancellation
        assert!(host.switch_thread(SwitchReason::None).is_err());
        assert!(host.take_frame().is_err());
        assert_eq!(host.shutdown(), EngineExit::Cancelled);
    }
}

#[test]
fn test_host_exit_request_wakes_parked_engine() {
    for strategy in [SyncStrategy::Blocking, SyncStrategy::Spinning] {
        let unwound = Arc::new(AtomicBool::new(false));
        let mut host = spawn(&config(strategy), {
            let unwound = Arc::clone(&unwound);
            move |engine| {
                let result = yield_forever(engine);
                unwound.store(true, Ordering::SeqCst);
                result
            }
        })
        .unwrap();

        for _ in 0..10 {
            host.switch_thread(SwitchReason::None).unwrap();
        }

        // The engine is parked in switch_thread right now
        host.request_exit(Side::Host);
        wait_for(&unwound);

        assert!(host.switch_thread(SwitchReason::None).is_err());
        assert_eq!(host.shutdown(), EngineExit::Cancelled);
    }
}

#[test]
fn test_engine_finishing_cancels_host() {
    let mut host = spawn(&TandemConfig::default(), |_engine| Ok(())).unwrap();

    assert!(host.switch_thread(SwitchReason::None).is_err());
    assert!(host.exit_requested(Side::Engine));
    assert_eq!(host.shutdown(), EngineExit::Finished);
}

#[test]
fn test_engine_panic_wakes_host() {
    for strategy in [SyncStrategy::Blocking, SyncStrategy::Spinning] {
        let mut host = spawn(&config(strategy), |engine| {
            engine.switch_thread(SwitchReason::None)?;
            engine.switch_thread(SwitchReason::None)?;
            panic!("engine core crashed");
        })
        .unwrap();

        host.switch_thread(SwitchReason::None).unwrap();
        host.switch_thread(SwitchReason::None).unwrap();

        // The engine panics on this turn; the host must not stay parked
        assert_eq!(host.switch_thread(SwitchReason::None), Err(Cancelled));
        assert!(host.exit_requested(Side::Engine));
        assert!(!host.holds_control());
        assert_eq!(host.shutdown(), EngineExit::Panicked);
    }
}

#[test]
fn test_engine_returning_cancelled_wakes_host() {
    let mut host = spawn(&TandemConfig::default(), |_engine| Err(Cancelled)).unwrap();

    assert_eq!(host.switch_thread(SwitchReason::None), Err(Cancelled));
    assert!(host.exit_requested(Side::Engine));
    assert!(!host.exit_requested(Side::Host));
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_shutdown_before_first_switch() {
    let ran = Arc::new(AtomicBool::new(false));
    let host = spawn(&TandemConfig::default(), {
        let ran = Arc::clone(&ran);
        move |engine| {
            ran.store(true, Ordering::SeqCst);
            yield_forever(engine)
        }
    })
    .unwrap();

    assert_eq!(host.shutdown(), EngineExit::Cancelled);
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_random_strategy_toggles() {
    const SWITCHES: u32 = 2_000;

    let mut host = spawn(&config(SyncStrategy::Blocking), |engine| {
        let mut rng = StdRng::seed_from_u64(0xE4_61_4E);
        loop {
            if rng.gen_bool(0.3) {
                engine.set_strategy(engine.strategy().toggled());
            }
            engine.switch_thread(SwitchReason::None)?;
        }
    })
    .unwrap();

    let mut rng = StdRng::seed_from_u64(0x40_57);
    for _ in 0..SWITCHES {
        if rng.gen_bool(0.5) {
            let strategy = if rng.gen_bool(0.5) {
                SyncStrategy::Blocking
            } else {
                SyncStrategy::Spinning
            };
            host.set_strategy(strategy);
        }
        host.switch_thread(SwitchReason::None).unwrap();
    }

    assert_eq!(host.handoff_count(), u64::from(SWITCHES) * 2);
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_strategy_change_is_deferred() {
    let mut host = spawn(&config(SyncStrategy::Blocking), yield_forever).unwrap();

    host.set_strategy(SyncStrategy::Spinning);
    assert_eq!(host.strategy(), SyncStrategy::Blocking);

    host.switch_thread(SwitchReason::None).unwrap();
    assert_eq!(host.strategy(), SyncStrategy::Spinning);

    host.switch_thread(SwitchReason::None).unwrap();
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_invalid_config_rejected() {
    let config = TandemConfig {
        max_width: 0,
        ..TandemConfig::default()
    };
    let result = spawn(&config, yield_forever);
    assert!(matches!(result, Err(SetupError::Config(_))));
}
