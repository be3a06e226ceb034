//! Engine configuration and validation.

use std::fmt;
use std::num::NonZeroUsize;
use std::thread;

use troupe_core::WorldBounds;

/// Static engine configuration, validated once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// World extent; the simulation is toroidal over it.
    pub world_bounds: WorldBounds,
    /// Upper bound on simulation tick rate, in Hz. The measured elapsed
    /// time still drives integration, so a slow tick produces a larger
    /// `dt` rather than lost simulation time.
    pub max_tick_hz: f64,
    /// Message pump rate, in Hz. Runs faster than the tick rate so bus
    /// traffic and completion callbacks stay responsive between ticks.
    pub message_hz: f64,
    /// Whether movement integration starts enabled. Collision detection
    /// runs either way.
    pub movement_enabled: bool,
    /// Worker thread count for the task pool. `None` sizes the pool
    /// from available parallelism.
    pub worker_threads: Option<usize>,
    /// Suppress render-cycle events entirely.
    pub headless: bool,
    /// Multiplier applied to every measured `dt` before integration.
    pub time_scale: f64,
    /// Member count at which a spatial index leaf splits.
    pub index_load_factor: usize,
    /// Smallest leaf side length a split may produce.
    pub index_min_split: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_bounds: WorldBounds::default(),
            max_tick_hz: 60.0,
            message_hz: 240.0,
            movement_enabled: true,
            worker_threads: None,
            headless: false,
            time_scale: 1.0,
            index_load_factor: 10,
            index_min_split: 100.0,
        }
    }
}

impl EngineConfig {
    /// Check every field for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_tick_hz > 0.0) || !self.max_tick_hz.is_finite() {
            return Err(ConfigError::NonPositiveRate {
                name: "max_tick_hz",
                value: self.max_tick_hz,
            });
        }
        if !(self.message_hz > 0.0) || !self.message_hz.is_finite() {
            return Err(ConfigError::NonPositiveRate {
                name: "message_hz",
                value: self.message_hz,
            });
        }
        if self.message_hz < self.max_tick_hz {
            return Err(ConfigError::PumpSlowerThanTick {
                message_hz: self.message_hz,
                max_tick_hz: self.max_tick_hz,
            });
        }
        if !(self.time_scale > 0.0) || !self.time_scale.is_finite() {
            return Err(ConfigError::NonPositiveTimeScale(self.time_scale));
        }
        if !(self.world_bounds.width > 0.0) || !(self.world_bounds.height > 0.0) {
            return Err(ConfigError::EmptyWorldBounds {
                width: self.world_bounds.width,
                height: self.world_bounds.height,
            });
        }
        if self.index_load_factor < 2 {
            return Err(ConfigError::LoadFactorTooSmall(self.index_load_factor));
        }
        if !(self.index_min_split > 0.0) {
            return Err(ConfigError::NonPositiveMinSplit(self.index_min_split));
        }
        Ok(())
    }

    /// Worker count after resolving `worker_threads`: half the
    /// available parallelism, clamped to `[2, 8]`.
    pub fn effective_workers(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            let parallelism = thread::available_parallelism().map_or(2, NonZeroUsize::get);
            (parallelism / 2).clamp(2, 8)
        })
    }
}

/// An invalid [`EngineConfig`] field.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A rate field must be a positive, finite frequency.
    NonPositiveRate {
        /// Field name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The message pump must fire at least as often as the simulation
    /// cadence, or bus traffic and callbacks starve between ticks.
    PumpSlowerThanTick {
        /// Configured pump rate.
        message_hz: f64,
        /// Configured simulation cap.
        max_tick_hz: f64,
    },
    /// `time_scale` must be positive and finite.
    NonPositiveTimeScale(f64),
    /// World bounds must have positive extents.
    EmptyWorldBounds {
        /// Rejected width.
        width: f64,
        /// Rejected height.
        height: f64,
    },
    /// A leaf must be allowed to hold at least two members.
    LoadFactorTooSmall(usize),
    /// `index_min_split` must be positive.
    NonPositiveMinSplit(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveRate { name, value } => {
                write!(f, "{name} must be a positive finite rate, got {value}")
            }
            ConfigError::PumpSlowerThanTick {
                message_hz,
                max_tick_hz,
            } => {
                write!(
                    f,
                    "message_hz ({message_hz}) must be at least max_tick_hz ({max_tick_hz})"
                )
            }
            ConfigError::NonPositiveTimeScale(v) => {
                write!(f, "time_scale must be positive and finite, got {v}")
            }
            ConfigError::EmptyWorldBounds { width, height } => {
                write!(f, "world bounds must have positive extents, got {width}x{height}")
            }
            ConfigError::LoadFactorTooSmall(n) => {
                write!(f, "index_load_factor must be at least 2, got {n}")
            }
            ConfigError::NonPositiveMinSplit(v) => {
                write!(f, "index_min_split must be positive, got {v}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
