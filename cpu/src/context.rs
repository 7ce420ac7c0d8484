//! This module manages the context in which the simulator performs
//! a single operation.
//!
//! The simulator is most concerned with keeping track of how much
//! time would have elapsed on the machine it is simulating.  This
//! tells us, for example, when the paper tape reader would have
//! brought the next frame under its read head.  Simulated time only
//! moves forward as instructions and DMA cycles are executed; it has
//! no connection to wall-clock time.
use core::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub simulated_time: Duration,
}

impl Context {
    #[must_use]
    pub fn new(simulated_time: Duration) -> Context {
        Context { simulated_time }
    }

    pub fn advance(&mut self, by: Duration) {
        self.simulated_time += by;
    }
}
