//! Some stop conditions can be "masked" by the operator, and whether
//! or not this is happening is controlled by the StopUnit.
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{Level, event};

use super::config::StopConfig;
use super::stop::{StopKind, StopMaskability, StopReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmaskableStop(pub StopKind);

impl Display for UnmaskableStop {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "stop condition {} cannot be masked", self.0)
    }
}

impl Error for UnmaskableStop {}

#[derive(Debug, Default, Clone)]
pub struct StopUnit {
    masked: BTreeSet<StopKind>,
}

impl StopUnit {
    pub fn new(config: &StopConfig) -> StopUnit {
        let mut masked = BTreeSet::new();
        if !config.unimplemented {
            masked.insert(StopKind::Unimplemented);
        }
        if !config.nonexistent_device {
            masked.insert(StopKind::NonexistentDevice);
        }
        StopUnit { masked }
    }

    pub fn set_masked(&mut self, kind: StopKind, masked: bool) -> Result<(), UnmaskableStop> {
        match kind.maskable() {
            StopMaskability::Unmaskable if masked => Err(UnmaskableStop(kind)),
            StopMaskability::Unmaskable => Ok(()),
            StopMaskability::Maskable => {
                if masked {
                    self.masked.insert(kind);
                } else {
                    self.masked.remove(&kind);
                }
                Ok(())
            }
        }
    }

    pub fn is_masked(&self, kind: StopKind) -> bool {
        match kind.maskable() {
            StopMaskability::Unmaskable => false,
            StopMaskability::Maskable => self.masked.contains(&kind),
        }
    }

    /// Returns `reason` if it should stop the simulation, or `None`
    /// if it is masked.
    pub fn filter(&self, reason: StopReason) -> Option<StopReason> {
        if self.is_masked(reason.kind()) {
            event!(Level::DEBUG, "ignoring masked stop condition: {reason}");
            None
        } else {
            Some(reason)
        }
    }
}

#[test]
fn unmaskable_stops_are_not_maskable() {
    let mut unit = StopUnit::default();
    for kind in StopKind::all_stop_kinds() {
        if kind.maskable() == StopMaskability::Unmaskable {
            assert_eq!(unit.set_masked(kind, true), Err(UnmaskableStop(kind)));
            assert!(!unit.is_masked(kind));
            assert_eq!(unit.set_masked(kind, false), Ok(()));
        }
    }
}

#[test]
fn config_selects_masked_stops() {
    let unit = StopUnit::new(&StopConfig::default());
    assert!(!unit.is_masked(StopKind::Unimplemented));
    assert!(unit.is_masked(StopKind::NonexistentDevice));

    let unit = StopUnit::new(&StopConfig {
        unimplemented: false,
        nonexistent_device: true,
    });
    assert!(unit.is_masked(StopKind::Unimplemented));
    assert!(!unit.is_masked(StopKind::NonexistentDevice));
}

#[test]
fn filter_drops_masked_reasons() {
    use base::prelude::*;
    let mut unit = StopUnit::default();
    let reason = StopReason::Unimplemented {
        instruction: Instruction::new(0o105777),
        address: Address::from_low_bits(0o100),
    };
    assert_eq!(unit.filter(reason.clone()), Some(reason.clone()));
    unit.set_masked(StopKind::Unimplemented, true)
        .expect("Unimplemented should be maskable");
    assert_eq!(unit.filter(reason), None);
}
