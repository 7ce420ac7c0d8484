//! Machine configuration.
//!
//! These settings correspond to things which, on the real machine,
//! were fixed by the amount of memory installed, by jumpers on the
//! processor boards, or by the operator's choice of which conditions
//! should halt the simulation.
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The largest memory the mapping hardware can address.
pub const MAX_MEMORY_WORDS: usize = 1 << 20;

/// Memory is installed in whole pages.
pub const MEMORY_INCREMENT: usize = 1024;

/// Selects which maskable stop conditions actually stop the
/// simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopConfig {
    /// Stop when an unimplemented instruction is executed.  When
    /// false, such instructions do nothing.
    pub unimplemented: bool,
    /// Stop when an I/O instruction addresses a select code with no
    /// device.
    pub nonexistent_device: bool,
}

impl Default for StopConfig {
    fn default() -> StopConfig {
        StopConfig {
            unimplemented: true,
            nonexistent_device: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Installed memory, in words.
    pub memory_words: usize,
    /// Duration of one memory cycle.
    pub cycle_time: Duration,
    /// Longest permitted chain of indirect addresses.
    pub indirect_limit: u32,
    /// When set, indirect address resolution always gives way to a
    /// pending interrupt (rather than only after several levels).
    pub interrupt_defer_jumper: bool,
    /// The value read from a select code with no device.
    pub floating_bus: u16,
    pub stops: StopConfig,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            memory_words: 32768,
            cycle_time: Duration::from_nanos(650),
            indirect_limit: 16,
            interrupt_defer_jumper: false,
            floating_bus: 0,
            stops: StopConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MemorySize(usize),
    ZeroIndirectLimit,
    ZeroCycleTime,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MemorySize(n) => write!(
                f,
                "memory size {n} is not a multiple of {MEMORY_INCREMENT} words between {MEMORY_INCREMENT} and {MAX_MEMORY_WORDS}"
            ),
            ConfigError::ZeroIndirectLimit => f.write_str("the indirect address limit must be at least 1"),
            ConfigError::ZeroCycleTime => {
                f.write_str("the memory cycle time must be greater than zero")
            }
        }
    }
}

impl Error for ConfigError {}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let words = self.memory_words;
        if words < MEMORY_INCREMENT || words > MAX_MEMORY_WORDS || words % MEMORY_INCREMENT != 0 {
            return Err(ConfigError::MemorySize(words));
        }
        if self.indirect_limit == 0 {
            return Err(ConfigError::ZeroIndirectLimit);
        }
        // Simulated time would never advance, so no device event
        // could ever fall due.
        if self.cycle_time.is_zero() {
            return Err(ConfigError::ZeroCycleTime);
        }
        Ok(())
    }
}

#[test]
fn default_config_is_valid() {
    assert_eq!(MachineConfig::default().validate(), Ok(()));
}

#[test]
fn odd_memory_sizes_are_rejected() {
    for words in [0, 1000, 1025, MAX_MEMORY_WORDS + MEMORY_INCREMENT] {
        let config = MachineConfig {
            memory_words: words,
            ..MachineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MemorySize(words)));
    }
}

#[test]
fn zero_cycle_time_is_rejected() {
    let config = MachineConfig {
        cycle_time: Duration::ZERO,
        ..MachineConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroCycleTime));
    assert!(crate::ControlUnit::new(config).is_err());
}
