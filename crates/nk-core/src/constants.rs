/// Minimum leading-zero-bit difficulty required for note admission
pub const DEFAULT_MIN_DIFFICULTY: u32 = 16;

/// Maximum number of notes retained before the pruner evicts
pub const DEFAULT_CAPACITY: usize = 1000;

/// Exponential decay rate per day: score loses ~10%/day
pub const DEFAULT_DECAY_LAMBDA: f64 = 0.1;

/// Multiplier applied to accumulated report mass at score time
pub const DEFAULT_REPORT_WEIGHT: f64 = 1.0;

/// Weight of a reaction whose content is neither explicitly positive
/// nor explicitly negative — counted as positive, attenuated
pub const DEFAULT_NEUTRAL_WEIGHT: f64 = 0.5;

/// Contribution of each reply to a note's raw retention score
pub const DEFAULT_REPLY_WEIGHT: f64 = 0.5;

/// Sweep period for the retention pruner, in seconds (1 hour)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
