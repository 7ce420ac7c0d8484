//! Paper tape punch.
//!
//! OTA places a frame in the output buffer and STC starts a punch
//! cycle.  When the cycle completes the frame is written to the
//! attached sink and the flag and service request are set.
use std::fmt::{self, Debug, Formatter};
use std::io::Write;
use std::time::Duration;

use tracing::{event, Level};

use base::prelude::*;

use super::{Device, IoContext, IoResult, IoSignal};

/// The punch runs at 75 frames per second.
pub const PUNCH_INTERVAL: Duration = Duration::from_micros(13333);

pub struct TapePunch {
    sink: Box<dyn Write>,
    buffer: u8,
    busy: bool,
    frames_punched: usize,
    write_failed: bool,
}

impl Debug for TapePunch {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("TapePunch")
            .field("buffer", &self.buffer)
            .field("busy", &self.busy)
            .field("frames_punched", &self.frames_punched)
            .field("write_failed", &self.write_failed)
            .finish_non_exhaustive()
    }
}

impl TapePunch {
    pub fn new(sink: Box<dyn Write>) -> TapePunch {
        TapePunch {
            sink,
            buffer: 0,
            busy: false,
            frames_punched: 0,
            write_failed: false,
        }
    }

    pub fn frames_punched(&self) -> usize {
        self.frames_punched
    }
}

impl Device for TapePunch {
    fn name(&self) -> &str {
        "paper tape punch"
    }

    fn io(
        &mut self,
        ctx: &mut IoContext,
        signal: IoSignal,
        _instruction: Instruction,
        data: u16,
    ) -> IoResult {
        match signal {
            IoSignal::ClearFlag => {
                ctx.clear_flag();
                ctx.clear_srq();
                IoResult::data(data)
            }
            IoSignal::SetFlag | IoSignal::SkipFlagClear | IoSignal::SkipFlagSet => {
                ctx.flag_signal(signal).unwrap_or_default()
            }
            IoSignal::OutputData => {
                self.buffer = (data & 0o377) as u8;
                IoResult::data(data)
            }
            // The punch has no input register; the bus floats to zero.
            IoSignal::LoadData => IoResult::data(0),
            IoSignal::MergeData => IoResult::data(data),
            IoSignal::SetControl => {
                ctx.set_control();
                ctx.set_command();
                if !self.busy {
                    self.busy = true;
                    ctx.schedule_after(PUNCH_INTERVAL);
                }
                IoResult::data(data)
            }
            IoSignal::ClearControl => {
                // A punch cycle already under way runs to completion.
                ctx.clear_control();
                IoResult::data(data)
            }
            IoSignal::EndOfTransfer => {
                event!(
                    Level::DEBUG,
                    "end of DMA block after {} frames",
                    self.frames_punched
                );
                IoResult::data(data)
            }
        }
    }

    fn service(&mut self, ctx: &mut IoContext) {
        if !self.busy {
            return;
        }
        self.busy = false;
        if let Err(e) = self.sink.write_all(&[self.buffer]) {
            if !self.write_failed {
                event!(Level::ERROR, "failed to write punch output: {e}");
            }
            self.write_failed = true;
        }
        self.frames_punched += 1;
        ctx.clear_command();
        ctx.set_flag();
        ctx.set_srq();
    }

    fn reset(&mut self, _ctx: &mut IoContext) {
        self.busy = false;
        self.buffer = 0;
        if let Err(e) = self.sink.flush() {
            event!(Level::ERROR, "failed to flush punch output: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::io::schedule::EventQueue;
    use crate::iostatus::IoStatus;
    use base::u6;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_punch_cycle() {
        let output = SharedBuffer::default();
        let mut punch = TapePunch::new(Box::new(output.clone()));
        let mut status = IoStatus::default();
        let mut queue = EventQueue::new();
        let code = u6!(0o13);
        {
            let mut ctx = IoContext::new(code, Duration::ZERO, &mut status, &mut queue);
            punch.io(&mut ctx, IoSignal::OutputData, Instruction::new(0o102613), 0o1252);
            punch.io(&mut ctx, IoSignal::SetControl, Instruction::new(0o103713), 0);
        }
        assert!(status.command(code));
        assert!(output.0.borrow().is_empty());
        let (due_code, when) = queue
            .next_due(Duration::from_secs(1))
            .expect("a punch event should be pending");
        assert_eq!(due_code, code);
        assert_eq!(when, PUNCH_INTERVAL);
        {
            let mut ctx = IoContext::new(code, when, &mut status, &mut queue);
            punch.service(&mut ctx);
        }
        assert_eq!(*output.0.borrow(), vec![0o252]);
        assert!(status.flag(code));
        assert!(status.service_request(code));
        assert!(!status.command(code));
        assert_eq!(punch.frames_punched(), 1);
    }
}
