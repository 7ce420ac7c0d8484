//! Physical memory.
//!
//! Memory is addressed by 20-bit physical addresses, although only
//! the configured number of words is installed.  Locations 0 and 1
//! of the logical address space are the A and B registers; that
//! aliasing is handled by the control unit, not here, so the words
//! at physical locations 0 and 1 are ordinary memory which only DMA
//! and the front panel can reach.
use tracing::{event, Level};

use base::prelude::*;

pub struct MemoryUnit {
    words: Vec<u16>,
}

impl std::fmt::Debug for MemoryUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUnit")
            .field("size", &self.words.len())
            .finish_non_exhaustive()
    }
}

impl MemoryUnit {
    pub fn new(size: usize) -> MemoryUnit {
        MemoryUnit {
            words: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.words.len()
    }

    pub fn is_installed(&self, addr: PhysicalAddress) -> bool {
        usize::from(addr) < self.words.len()
    }

    /// Reads a word.  Locations beyond the installed memory read as
    /// zero.
    pub fn read(&self, addr: PhysicalAddress) -> u16 {
        match self.words.get(usize::from(addr)) {
            Some(w) => *w,
            None => {
                event!(
                    Level::TRACE,
                    "read from uninstalled location {:07o}",
                    addr
                );
                0
            }
        }
    }

    /// Writes a word.  Writes beyond the installed memory are
    /// discarded.
    pub fn write(&mut self, addr: PhysicalAddress, value: u16) {
        match self.words.get_mut(usize::from(addr)) {
            Some(w) => {
                *w = value;
            }
            None => {
                event!(
                    Level::TRACE,
                    "discarding write of {:06o} to uninstalled location {:07o}",
                    value,
                    addr
                );
            }
        }
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

#[test]
fn test_uninstalled_memory() {
    let mut mem = MemoryUnit::new(1024);
    let inside = PhysicalAddress::from(0o1777_u16);
    let outside = PhysicalAddress::from(0o2000_u16);
    assert!(mem.is_installed(inside));
    assert!(!mem.is_installed(outside));
    mem.write(inside, 0o123456);
    mem.write(outside, 0o123456);
    assert_eq!(mem.read(inside), 0o123456);
    assert_eq!(mem.read(outside), 0);
    mem.clear();
    assert_eq!(mem.read(inside), 0);
}
