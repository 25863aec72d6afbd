//! Integration tests for frame exchange across the handoff.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tandem_core::{
    spawn, Capabilities, EngineExit, EngineHandle, FrameOutcome, Geometry, HandoffResult,
    SwitchReason, SyncStrategy, TandemConfig, TimingMode,
};

const ALL_LINES: [u16; 4] = [0, 1, 2, 3];

fn config(timing: TimingMode) -> TandemConfig {
    TandemConfig {
        timing,
        ..TandemConfig::default()
    }
}

fn config_with(timing: TimingMode, strategy: SyncStrategy) -> TandemConfig {
    TandemConfig {
        strategy,
        ..config(timing)
    }
}

/// Fills every pixel of the back buffer with `color`.
fn render(engine: &mut EngineHandle, color: u32) -> HandoffResult<()> {
    if let Some(target) = engine.start_update()? {
        target.pixels.fill(color);
    }
    Ok(())
}

fn unsynced_session(strategy: SyncStrategy) {
    let caps = Arc::new(Mutex::new(None));
    let engine_view = Arc::new(Mutex::new(None));
    let mut host = spawn(&config_with(TimingMode::Unsynced, strategy), {
        let caps = Arc::clone(&caps);
        let engine_view = Arc::clone(&engine_view);
        move |engine| {
            *caps.lock() = Some(engine.set_size(320, 200, 1.0, 1.2, || {})?);
            *engine_view.lock() = Some((engine.geometry(), engine.timing()));
            let mut color = 0;
            loop {
                color += 1;
                render(engine, color)?;
                engine.end_update(Some(&[0, 199]))?;
                engine.switch_thread(SwitchReason::None)?;
            }
        }
    })
    .unwrap();

    let mut modes = Vec::new();
    host.advance(|geometry| modes.push(*geometry)).unwrap();

    assert_eq!(modes.len(), 1);
    let geometry = modes[0];
    assert_eq!((geometry.width, geometry.height), (320, 200));
    assert_eq!(geometry.pitch, 1280);
    assert!((geometry.aspect_ratio - 4.0 / 3.0).abs() < 1e-5);
    assert_eq!(
        *caps.lock(),
        Some(Capabilities {
            displayable: true,
            double_buffered: true,
        })
    );
    assert_eq!(host.timing(), TimingMode::Unsynced);

    for expected in 1..=5 {
        let frame = host.take_frame().unwrap().unwrap();
        assert!(!frame.is_duplicate());
        assert_eq!(frame.pixels().len(), 64_000);
        assert_eq!(frame.as_bytes().len(), 256_000);
        assert!(frame.pixels().iter().all(|&pixel| pixel == expected));
        host.advance(|_| panic!("mode changed unexpectedly")).unwrap();
    }

    let stats = host.frame_stats();
    assert_eq!(stats.swapped, 6);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.presented, 5);
    assert_eq!(host.shutdown(), EngineExit::Cancelled);

    // The engine saw the same mode once control came back to it
    assert_eq!(*engine_view.lock(), Some((Some(geometry), TimingMode::Unsynced)));
}

#[test]
fn test_320x200_unsynced_session_blocking() {
    unsynced_session(SyncStrategy::Blocking);
}

#[test]
fn test_320x200_unsynced_session_spinning() {
    unsynced_session(SyncStrategy::Spinning);
}

#[test]
fn test_second_frame_dropped_until_presented() {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let redraws = Arc::new(AtomicU32::new(0));

    let mut host = spawn(&config(TimingMode::Unsynced), {
        let outcomes = Arc::clone(&outcomes);
        let redraws = Arc::clone(&redraws);
        move |engine| {
            engine.set_size(4, 4, 1.0, 1.0, move || {
                redraws.fetch_add(1, Ordering::SeqCst);
            })?;
            render(engine, 1)?;
            outcomes.lock().push(engine.end_update(Some(&ALL_LINES))?);
            render(engine, 2)?;
            outcomes.lock().push(engine.end_update(Some(&ALL_LINES))?);
            loop {
                engine.switch_thread(SwitchReason::None)?;
            }
        }
    })
    .unwrap();

    host.advance(|_| {}).unwrap();

    assert_eq!(
        *outcomes.lock(),
        vec![FrameOutcome::Swapped, FrameOutcome::Dropped]
    );
    assert_eq!(redraws.load(Ordering::SeqCst), 1);

    // The host sees the first frame, the dropped one never reaches it
    let frame = host.take_frame().unwrap().unwrap();
    assert!(frame.pixels().iter().all(|&pixel| pixel == 1));

    let frame = host.take_frame().unwrap().unwrap();
    assert!(frame.is_duplicate());

    let stats = host.frame_stats();
    assert_eq!((stats.swapped, stats.dropped), (1, 1));
    assert_eq!((stats.presented, stats.duplicates), (2, 1));
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_unchanged_frames_are_not_swapped() {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let mut host = spawn(&config(TimingMode::Unsynced), {
        let outcomes = Arc::clone(&outcomes);
        move |engine| {
            engine.set_size(4, 4, 1.0, 1.0, || {})?;
            outcomes.lock().push(engine.end_update(None)?);
            outcomes.lock().push(engine.end_update(Some(&[]))?);
            loop {
                engine.switch_thread(SwitchReason::None)?;
            }
        }
    })
    .unwrap();

    host.advance(|_| {}).unwrap();
    assert_eq!(
        *outcomes.lock(),
        vec![FrameOutcome::Unchanged, FrameOutcome::Unchanged]
    );
    assert_eq!(host.frame_stats().swapped, 0);
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

fn synced_session(strategy: SyncStrategy) {
    let caps = Arc::new(Mutex::new(None));
    let mut host = spawn(&config_with(TimingMode::Synced, strategy), {
        let caps = Arc::clone(&caps);
        move |engine| {
            *caps.lock() = Some(engine.set_size(8, 8, 1.0, 1.0, || {})?);
            let mut color = 0;
            loop {
                color += 1;
                render(engine, color)?;
                assert_eq!(engine.end_update(Some(&[0]))?, FrameOutcome::Rendered);
                engine.switch_thread(SwitchReason::None)?;
            }
        }
    })
    .unwrap();

    host.advance(|_| {}).unwrap();
    assert_eq!(
        *caps.lock(),
        Some(Capabilities {
            displayable: true,
            double_buffered: false,
        })
    );

    let mut addresses = Vec::new();
    for expected in 1..=3 {
        let frame = host.take_frame().unwrap().unwrap();
        assert!(!frame.is_duplicate());
        assert!(frame.pixels().iter().all(|&pixel| pixel == expected));
        addresses.push(frame.pixels().as_ptr() as usize);
        host.advance(|_| {}).unwrap();
    }
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));

    let frame = host.take_frame().unwrap().unwrap();
    assert!(!frame.is_duplicate());
    let frame = host.take_frame().unwrap().unwrap();
    assert!(frame.is_duplicate());
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_synced_mode_shares_one_buffer_blocking() {
    synced_session(SyncStrategy::Blocking);
}

#[test]
fn test_synced_mode_shares_one_buffer_spinning() {
    synced_session(SyncStrategy::Spinning);
}

#[test]
fn test_rejected_size_does_not_switch() {
    let caps = Arc::new(Mutex::new(Vec::new()));
    let mut host = spawn(&TandemConfig::default(), {
        let caps = Arc::clone(&caps);
        move |engine| {
            caps.lock().push(engine.set_size(5_000, 10, 1.0, 1.0, || {})?);
            caps.lock().push(engine.set_size(0, 10, 1.0, 1.0, || {})?);
            assert!(engine.start_update()?.is_none());
            loop {
                engine.switch_thread(SwitchReason::None)?;
            }
        }
    })
    .unwrap();

    host.advance(|_| panic!("no mode was accepted")).unwrap();

    assert_eq!(
        *caps.lock(),
        vec![Capabilities::CANNOT_DISPLAY, Capabilities::CANNOT_DISPLAY]
    );
    assert_eq!(host.handoff_count(), 2);
    assert!(host.geometry().is_none());
    assert!(host.take_frame().unwrap().is_none());
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}

#[test]
fn test_mode_change_mid_session() {
    let mut host = spawn(&TandemConfig::default(), |engine| {
        engine.set_size(320, 200, 1.0, 1.0, || {})?;
        render(engine, 7)?;
        engine.end_update(Some(&ALL_LINES))?;
        engine.switch_thread(SwitchReason::None)?;

        engine.set_size(640, 400, 1.0, 1.0, || {})?;
        render(engine, 9)?;
        engine.end_update(Some(&ALL_LINES))?;
        loop {
            engine.switch_thread(SwitchReason::None)?;
        }
    })
    .unwrap();

    let mut modes: Vec<Geometry> = Vec::new();
    host.advance(|geometry| modes.push(*geometry)).unwrap();
    host.advance(|geometry| modes.push(*geometry)).unwrap();

    let sizes: Vec<_> = modes.iter().map(|g| (g.width, g.height)).collect();
    assert_eq!(sizes, vec![(320, 200), (640, 400)]);

    let frame = host.take_frame().unwrap().unwrap();
    assert_eq!(frame.geometry().width, 640);
    assert_eq!(frame.pixels().len(), 640 * 400);
    assert!(frame.pixels().iter().all(|&pixel| pixel == 9));
    assert_eq!(host.shutdown(), EngineExit::Cancelled);
}
