/// Simulation tick timing.
///
/// Implements a fixed timestep loop that advances a shared tick counter.
/// Grids and replication stamp their changes with the tick read from a
/// [`TickSource`], so every consumer observes the same monotonically
/// increasing simulation time.
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Target physics/update rate (60 updates per second)
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;
const FIXED_TIMESTEP_DURATION: Duration = Duration::from_micros(16_667); // ~1/60 second

/// Maximum number of physics steps per frame to prevent spiral of death
const MAX_PHYSICS_STEPS: u32 = 5;

/// A simulation tick number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GameTick(pub u32);

impl GameTick {
    pub const ZERO: GameTick = GameTick(0);

    pub fn next(self) -> GameTick {
        GameTick(self.0.wrapping_add(1))
    }
}

impl fmt::Display for GameTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared, single-threaded view of the current tick.
///
/// Cloning yields another handle onto the same counter.
#[derive(Debug, Clone, Default)]
pub struct TickSource {
    current: Rc<Cell<GameTick>>,
}

impl TickSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(tick: GameTick) -> Self {
        Self {
            current: Rc::new(Cell::new(tick)),
        }
    }

    /// Current tick
    pub fn now(&self) -> GameTick {
        self.current.get()
    }

    /// Advance by one tick and return the new value
    pub fn advance(&self) -> GameTick {
        let next = self.current.get().next();
        self.current.set(next);
        next
    }

    /// Jump to a given tick; ticks never move backwards
    pub fn set(&self, tick: GameTick) {
        if tick > self.current.get() {
            self.current.set(tick);
        }
    }
}

/// Fixed timestep loop state
pub struct GameLoop {
    /// Accumulated time for fixed timestep updates
    accumulator: Duration,

    /// Time of last frame
    last_frame_time: Instant,

    /// Whether the simulation is paused
    paused: bool,

    /// Tick counter shared with grids and replication
    ticks: TickSource,

    /// Total updates executed
    update_count: u64,
}

impl GameLoop {
    /// Create a new loop driving the given tick source
    pub fn new(ticks: TickSource) -> Self {
        Self {
            accumulator: Duration::ZERO,
            last_frame_time: Instant::now(),
            paused: false,
            ticks,
            update_count: 0,
        }
    }

    /// Begin a new frame, returns the number of fixed updates to run.
    /// The tick source is advanced once per returned update.
    pub fn begin_frame(&mut self) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.accumulate(frame_time)
    }

    /// Feed an explicit frame duration (headless / deterministic drivers)
    pub fn accumulate(&mut self, frame_time: Duration) -> u32 {
        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;

        let mut updates = 0;
        while self.accumulator >= FIXED_TIMESTEP_DURATION && updates < MAX_PHYSICS_STEPS {
            self.accumulator -= FIXED_TIMESTEP_DURATION;
            self.ticks.advance();
            updates += 1;
        }

        self.update_count += updates as u64;
        updates
    }

    /// Get the fixed timestep for physics updates (in seconds)
    pub fn fixed_timestep(&self) -> f32 {
        FIXED_TIMESTEP
    }

    /// Tick source driven by this loop
    pub fn ticks(&self) -> &TickSource {
        &self.ticks
    }

    /// Get total number of updates executed
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Simulation paused at tick {}", self.ticks.now());
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent update burst
            self.accumulator = Duration::ZERO;
            self.last_frame_time = Instant::now();
            log::info!("Simulation resumed at tick {}", self.ticks.now());
        }
    }
}
