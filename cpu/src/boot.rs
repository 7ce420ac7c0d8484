//! Loading programs into memory.
//!
//! The machine's boot loaders live in the last 64 words of the
//! logical address space (or of memory, if less is installed), and
//! are written for a device at select code 010.  Booting from a
//! device at some other select code means patching the loader's I/O
//! instructions.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use conv::*;
use tracing::{event, Level};

use base::prelude::*;

use crate::control::ControlUnit;

/// The number of words reserved for a boot loader.
pub const LOADER_WORDS: usize = 64;

/// The select code which loaders are written for.
const LOADER_SELECT_CODE: SelectCode = u6!(0o10);

/// The logical address space is 32K words.
const LOGICAL_WORDS: usize = 1 << 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The image does not fit in memory at the requested origin.
    DoesNotFit { origin: Address, words: usize },
    /// A boot loader may be at most 64 words long.
    LoaderTooLong(usize),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::DoesNotFit { origin, words } => write!(
                f,
                "an image of {words} words does not fit in memory at origin {origin:05o}"
            ),
            LoadError::LoaderTooLong(words) => write!(
                f,
                "boot loader is {words} words long but only {LOADER_WORDS} words are reserved for it"
            ),
        }
    }
}

impl Error for LoadError {}

impl ControlUnit {
    /// Copies `words` into memory starting at logical (and, since
    /// mapping is not in use at load time, physical) address
    /// `origin`.
    pub fn load_image(&mut self, origin: Address, words: &[u16]) -> Result<(), LoadError> {
        let start = usize::from(origin);
        let end = start + words.len();
        if end > LOGICAL_WORDS.min(self.config().memory_words) {
            return Err(LoadError::DoesNotFit {
                origin,
                words: words.len(),
            });
        }
        let mut address = PhysicalAddress::from(origin);
        for word in words {
            self.write_memory(address, *word);
            address = address.wrapping_increment();
        }
        event!(
            Level::INFO,
            "loaded {} words at {:05o}",
            words.len(),
            origin
        );
        Ok(())
    }

    /// Installs `loader` in the top 64 words of memory, patched to
    /// use the device at `select_code`, and sets P to its first word.
    pub fn boot(&mut self, loader: &[u16], select_code: SelectCode) -> Result<Address, LoadError> {
        if loader.len() > LOADER_WORDS {
            return Err(LoadError::LoaderTooLong(loader.len()));
        }
        let top = LOGICAL_WORDS.min(self.config().memory_words);
        let origin = u16::value_from(top - LOADER_WORDS)
            .ok()
            .and_then(|n| <Address as std::convert::TryFrom<u16>>::try_from(n).ok())
            .ok_or(LoadError::DoesNotFit {
                origin: Address::MAX,
                words: loader.len(),
            })?;
        let patched: Vec<u16> = loader
            .iter()
            .map(|&word| patch_select_code(word, select_code))
            .collect();
        self.load_image(origin, &patched)?;
        self.registers_mut().p = origin;
        event!(
            Level::INFO,
            "boot loader installed at {:05o} for select code {:02o}",
            origin,
            select_code
        );
        Ok(origin)
    }
}

/// Replaces the select code of an I/O instruction addressed to the
/// loader's device.  Other words are unchanged.
fn patch_select_code(word: u16, select_code: SelectCode) -> u16 {
    let inst = Instruction::new(word);
    match inst.class() {
        InstructionClass::InputOutput(_) if inst.select_code() == LOADER_SELECT_CODE => {
            inst.with_select_code(select_code).bits()
        }
        _ => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;

    fn machine(memory_words: usize) -> ControlUnit {
        ControlUnit::new(MachineConfig {
            memory_words,
            ..MachineConfig::default()
        })
        .expect("valid configuration")
    }

    #[test]
    fn test_patch_only_touches_io_for_select_code_10() {
        let code = u6!(0o12);
        // LIA 10, C
        assert_eq!(patch_select_code(0o103510, code), 0o103512);
        // STC 11 is for another device.
        assert_eq!(patch_select_code(0o102711, code), 0o102711);
        // LDA 10 is a memory reference, not I/O.
        assert_eq!(patch_select_code(0o060010, code), 0o060010);
    }

    #[test]
    fn test_boot_installs_loader_at_top_of_memory() {
        let mut cpu = machine(16384);
        let loader = [0o107700, 0o102710, 0o103610, 0o102077];
        let origin = cpu.boot(&loader, u6!(0o12)).expect("loader fits");
        assert_eq!(u16::from(origin), 0o37700);
        assert_eq!(cpu.registers().p, origin);
        let at = |n: u16| PhysicalAddress::from(0o37700_u16 + n);
        // CLC 0,C has select code 0 and is untouched.
        assert_eq!(cpu.read_memory(at(0)), 0o107700);
        assert_eq!(cpu.read_memory(at(1)), 0o102712);
        assert_eq!(cpu.read_memory(at(2)), 0o103612);
        assert_eq!(cpu.read_memory(at(3)), 0o102077);
    }

    #[test]
    fn test_boot_with_more_than_32k_uses_logical_top() {
        let mut cpu = machine(65536);
        let origin = cpu.boot(&[0o102077], u6!(0o10)).expect("loader fits");
        assert_eq!(u16::from(origin), 0o77700);
    }

    #[test]
    fn test_long_loader_is_rejected() {
        let mut cpu = machine(32768);
        assert_eq!(
            cpu.boot(&[0; 65], u6!(0o10)),
            Err(LoadError::LoaderTooLong(65))
        );
    }

    #[test]
    fn test_image_must_fit() {
        let mut cpu = machine(1024);
        assert!(cpu.load_image(Address::from(0o100_u8), &[1, 2, 3]).is_ok());
        assert_eq!(
            cpu.load_image(<Address as std::convert::TryFrom<u16>>::try_from(0o1776_u16).expect("in range"), &[1, 2, 3]),
            Err(LoadError::DoesNotFit {
                origin: <Address as std::convert::TryFrom<u16>>::try_from(0o1776_u16).expect("in range"),
                words: 3,
            })
        );
    }
}
