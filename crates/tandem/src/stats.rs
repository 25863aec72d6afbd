//! # Host Statistics
//!
//! Per-tick accounting on the host side: how long each `tick()` took and
//! what it ended up presenting.

use std::time::Duration;

use tandem_core::{EngineExit, FrameStats};

use crate::host::TickOutcome;

/// Accumulated host tick statistics.
#[derive(Clone, Debug)]
pub struct HostStats {
    /// Ticks completed.
    pub ticks: u64,
    /// Fresh frames handed to the presenter.
    pub frames_presented: u64,
    /// Frames presented again because the engine had nothing new.
    pub duplicates: u64,
    /// Ticks with no video mode set yet.
    pub no_video: u64,
    /// Video mode changes forwarded to the presenter.
    pub mode_changes: u64,
    /// Sum of tick times.
    pub tick_us_sum: u64,
    /// Shortest tick.
    pub min_tick_us: u64,
    /// Longest tick.
    pub max_tick_us: u64,
}

impl HostStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: 0,
            frames_presented: 0,
            duplicates: 0,
            no_video: 0,
            mode_changes: 0,
            tick_us_sum: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
        }
    }

    /// Records one completed tick.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_tick(&mut self, elapsed: Duration, outcome: TickOutcome) {
        let us = elapsed.as_micros() as u64;
        self.ticks += 1;
        self.tick_us_sum += us;
        self.min_tick_us = self.min_tick_us.min(us);
        self.max_tick_us = self.max_tick_us.max(us);

        match outcome {
            TickOutcome::Presented => self.frames_presented += 1,
            TickOutcome::Duplicate => self.duplicates += 1,
            TickOutcome::NoVideo => self.no_video += 1,
        }
    }

    /// Records a video mode change.
    #[inline]
    pub fn record_mode_change(&mut self) {
        self.mode_changes += 1;
    }

    /// Average tick time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_tick_ms(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        (self.tick_us_sum as f64 / self.ticks as f64) / 1000.0
    }

    /// Share of ticks that presented a duplicate frame.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duplicate_ratio(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.duplicates as f64 / self.ticks as f64
    }

    /// Prints a summary of the statistics.
    #[allow(clippy::cast_precision_loss)]
    pub fn print_summary(&self) {
        let min_us = if self.ticks == 0 { 0 } else { self.min_tick_us };

        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║                     HOST TICK STATISTICS                         ║");
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        println!("┌─ TIMING ─────────────────────────────────────────────────────────┐");
        println!("│ Ticks:              {}", self.ticks);
        println!("│ Average Tick:       {:.3} ms", self.avg_tick_ms());
        println!("│ Min Tick:           {:.3} ms", min_us as f64 / 1000.0);
        println!("│ Max Tick:           {:.3} ms", self.max_tick_us as f64 / 1000.0);
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
        println!("┌─ FRAMES ─────────────────────────────────────────────────────────┐");
        println!("│ Presented:          {}", self.frames_presented);
        println!(
            "│ Duplicates:         {} ({:.1}%)",
            self.duplicates,
            self.duplicate_ratio() * 100.0
        );
        println!("│ No Video:           {}", self.no_video);
        println!("│ Mode Changes:       {}", self.mode_changes);
        println!("└──────────────────────────────────────────────────────────────────┘");
    }
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything known about a session after it shut down.
#[derive(Clone, Debug)]
pub struct HostReport {
    /// How the engine thread ended.
    pub exit: EngineExit,
    /// Host-side tick statistics.
    pub stats: HostStats,
    /// Engine-side frame counters.
    pub frames: FrameStats,
    /// Handoffs performed in both directions.
    pub handoffs: u64,
    /// Input events dropped because the queue was full.
    pub inputs_dropped: u64,
}

impl HostReport {
    /// Prints the host statistics followed by the session summary.
    pub fn print_summary(&self) {
        self.stats.print_summary();
        println!();
        println!("┌─ SESSION ────────────────────────────────────────────────────────┐");
        println!("│ Engine Exit:        {:?}", self.exit);
        println!("│ Handoffs:           {}", self.handoffs);
        println!(
            "│ Rendered:           {} (swapped {}, dropped {})",
            self.frames.rendered, self.frames.swapped, self.frames.dropped
        );
        println!("│ Inputs Dropped:     {}", self.inputs_dropped);
        println!("└──────────────────────────────────────────────────────────────────┘");
    }
}
