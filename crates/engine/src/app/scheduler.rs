use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Fixed-step cadences, in milliseconds so config files stay plain numbers.
/// Zero values fall back to the defaults at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Simulation tick interval; the on-physics hook runs once per tick.
    pub sim_interval_ms: u64,
    /// Key-poll interval; held repeatable bindings re-fire once per tick.
    pub key_poll_interval_ms: u64,
    /// Mouse-hold repeat interval, active only while the button is down.
    pub mouse_hold_interval_ms: u64,
    /// Upper bound on the frame delta fed to the accumulators, so a stall
    /// does not turn into a burst of catch-up ticks.
    pub max_frame_delta_ms: u64,
    /// Per-activity tick cap per frame; backlog beyond it is dropped.
    pub max_ticks_per_frame: u32,
}

pub const DEFAULT_SIM_INTERVAL_MS: u64 = 10;
pub const DEFAULT_KEY_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_MOUSE_HOLD_INTERVAL_MS: u64 = 10;
pub const DEFAULT_MAX_FRAME_DELTA_MS: u64 = 250;
pub const DEFAULT_MAX_TICKS_PER_FRAME: u32 = 5;

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            sim_interval_ms: DEFAULT_SIM_INTERVAL_MS,
            key_poll_interval_ms: DEFAULT_KEY_POLL_INTERVAL_MS,
            mouse_hold_interval_ms: DEFAULT_MOUSE_HOLD_INTERVAL_MS,
            max_frame_delta_ms: DEFAULT_MAX_FRAME_DELTA_MS,
            max_ticks_per_frame: DEFAULT_MAX_TICKS_PER_FRAME,
        }
    }
}

impl TimerConfig {
    pub(crate) fn sim_interval(&self) -> Duration {
        normalize_non_zero_ms(self.sim_interval_ms, DEFAULT_SIM_INTERVAL_MS)
    }

    pub(crate) fn key_poll_interval(&self) -> Duration {
        normalize_non_zero_ms(self.key_poll_interval_ms, DEFAULT_KEY_POLL_INTERVAL_MS)
    }

    pub(crate) fn mouse_hold_interval(&self) -> Duration {
        normalize_non_zero_ms(self.mouse_hold_interval_ms, DEFAULT_MOUSE_HOLD_INTERVAL_MS)
    }

    pub(crate) fn max_frame_delta(&self) -> Duration {
        normalize_non_zero_ms(self.max_frame_delta_ms, DEFAULT_MAX_FRAME_DELTA_MS)
    }

    pub(crate) fn max_ticks_per_frame(&self) -> u32 {
        self.max_ticks_per_frame.max(1)
    }
}

fn normalize_non_zero_ms(value_ms: u64, fallback_ms: u64) -> Duration {
    if value_ms == 0 {
        Duration::from_millis(fallback_ms)
    } else {
        Duration::from_millis(value_ms)
    }
}

/// Outcome of planning one fixed-step activity for one frame.
#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

/// Drain `accumulator` into whole ticks of `fixed_dt`, at most
/// `max_ticks_per_frame`; whatever whole-tick backlog remains past the cap
/// is dropped rather than carried into the next frame.
fn plan_fixed_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

/// How many ticks of each activity one frame should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePlan {
    pub sim_ticks: u32,
    pub key_poll_ticks: u32,
    pub hold_ticks: u32,
    pub dropped_backlog: Duration,
}

/// Accumulator-based planner for the fixed-rate activities.
///
/// The three activities share one clock but keep independent accumulators,
/// so they drift-correct independently of render cadence. The first
/// `advance` only establishes the time baseline (ticking does not start
/// before the environment reports a drawable surface and begins driving
/// frames).
pub struct Scheduler {
    sim_interval: Duration,
    key_poll_interval: Duration,
    mouse_hold_interval: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    sim_accumulator: Duration,
    key_poll_accumulator: Duration,
    hold_accumulator: Duration,
    last_advance: Option<Instant>,
}

impl Scheduler {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            sim_interval: config.sim_interval(),
            key_poll_interval: config.key_poll_interval(),
            mouse_hold_interval: config.mouse_hold_interval(),
            max_frame_delta: config.max_frame_delta(),
            max_ticks_per_frame: config.max_ticks_per_frame(),
            sim_accumulator: Duration::ZERO,
            key_poll_accumulator: Duration::ZERO,
            hold_accumulator: Duration::ZERO,
            last_advance: None,
        }
    }

    /// Plan the ticks owed since the previous call. `hold_active` gates the
    /// mouse-hold activity; while inactive its accumulator stays empty so a
    /// new press starts a fresh repeat cycle.
    pub fn advance(&mut self, now: Instant, hold_active: bool) -> FramePlan {
        let Some(last) = self.last_advance else {
            self.last_advance = Some(now);
            return FramePlan::default();
        };
        self.last_advance = Some(now);

        let frame_dt = now.saturating_duration_since(last).min(self.max_frame_delta);

        self.sim_accumulator = self.sim_accumulator.saturating_add(frame_dt);
        let sim = plan_fixed_steps(
            self.sim_accumulator,
            self.sim_interval,
            self.max_ticks_per_frame,
        );
        self.sim_accumulator = sim.remaining_accumulator;

        self.key_poll_accumulator = self.key_poll_accumulator.saturating_add(frame_dt);
        let key_poll = plan_fixed_steps(
            self.key_poll_accumulator,
            self.key_poll_interval,
            self.max_ticks_per_frame,
        );
        self.key_poll_accumulator = key_poll.remaining_accumulator;

        let hold = if hold_active {
            self.hold_accumulator = self.hold_accumulator.saturating_add(frame_dt);
            let plan = plan_fixed_steps(
                self.hold_accumulator,
                self.mouse_hold_interval,
                self.max_ticks_per_frame,
            );
            self.hold_accumulator = plan.remaining_accumulator;
            plan
        } else {
            self.hold_accumulator = Duration::ZERO;
            StepPlan {
                ticks_to_run: 0,
                remaining_accumulator: Duration::ZERO,
                dropped_backlog: Duration::ZERO,
            }
        };

        FramePlan {
            sim_ticks: sim.ticks_to_run,
            key_poll_ticks: key_poll.ticks_to_run,
            hold_ticks: hold.ticks_to_run,
            dropped_backlog: sim
                .dropped_backlog
                .saturating_add(key_poll.dropped_backlog)
                .saturating_add(hold.dropped_backlog),
        }
    }
}

/// Render pacing for environments without a native frame callback: the loop
/// sleeps toward a fixed frame duration instead.
pub(crate) fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

pub(crate) fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

pub(crate) fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
