//! Paper tape reader.
//!
//! Setting control starts the tape moving.  While control remains
//! set, a new frame arrives under the read head every
//! [`FRAME_INTERVAL`]; each arrival clears the command bit and sets
//! the flag and the service request.  A frame which arrives before
//! the previous one was taken (that is, while the flag is still set)
//! latches the overrun status.  The reader stops when control is
//! cleared, when a DMA channel signals the end of a block, or when
//! the tape runs out.
//!
//! LIA and MIA return the frame in bits 7-0, with the overrun status
//! in bit 15.  The overrun status is cleared by CLC or PRESET.
use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use tracing::{event, Level};

use base::prelude::*;

use super::{Device, IoContext, IoResult, IoSignal};

/// The reader runs at 300 frames per second.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(3333);

/// Set in the input word when a frame has been lost.
pub const OVERRUN_BIT: u16 = 0o100000;

/// Is the tape moving?
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Activity {
    Stopped,
    Running,
}

pub struct PaperTapeReader {
    activity: Activity,
    tape_data: Vec<u8>,
    tape_pos: usize,
    buffer: u8,
    overrun: bool,
    already_warned_eof: bool,
}

impl Debug for PaperTapeReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("PaperTapeReader")
            .field("activity", &self.activity)
            .field("tape_len", &self.tape_data.len())
            .field("tape_pos", &self.tape_pos)
            .field("buffer", &self.buffer)
            .field("overrun", &self.overrun)
            .finish_non_exhaustive()
    }
}

impl Default for PaperTapeReader {
    fn default() -> PaperTapeReader {
        PaperTapeReader::new()
    }
}

impl PaperTapeReader {
    pub fn new() -> PaperTapeReader {
        PaperTapeReader {
            activity: Activity::Stopped,
            tape_data: Vec::new(),
            tape_pos: 0,
            buffer: 0,
            overrun: false,
            already_warned_eof: false,
        }
    }

    pub fn with_tape(data: Vec<u8>) -> PaperTapeReader {
        let mut reader = PaperTapeReader::new();
        reader.mount(data);
        reader
    }

    pub fn mount(&mut self, data: Vec<u8>) {
        event!(Level::DEBUG, "mounting a tape ({} frames)", data.len());
        self.tape_data = data;
        self.tape_pos = 0;
        self.already_warned_eof = false;
    }

    /// True if a frame was ever lost because the previous one had
    /// not been taken.
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    pub fn frames_read(&self) -> usize {
        self.tape_pos
    }

    fn input_word(&self) -> u16 {
        let status = if self.overrun { OVERRUN_BIT } else { 0 };
        status | u16::from(self.buffer)
    }

    fn start(&mut self, ctx: &mut IoContext) {
        ctx.set_control();
        ctx.set_command();
        if self.activity == Activity::Stopped {
            self.activity = Activity::Running;
            ctx.schedule_after(FRAME_INTERVAL);
        }
    }

    fn stop(&mut self, ctx: &mut IoContext) {
        self.activity = Activity::Stopped;
        ctx.clear_command();
        ctx.cancel_event();
    }
}

impl Device for PaperTapeReader {
    fn name(&self) -> &str {
        "paper tape reader"
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
            IoSignal::LoadData => IoResult::data(self.input_word()),
            IoSignal::MergeData => IoResult::data(data | self.input_word()),
            IoSignal::OutputData => IoResult::data(data),
            IoSignal::SetControl => {
                self.start(ctx);
                IoResult::data(data)
            }
            IoSignal::ClearControl => {
                ctx.clear_control();
                self.overrun = false;
                self.stop(ctx);
                IoResult::data(data)
            }
            IoSignal::EndOfTransfer => {
                event!(Level::DEBUG, "end of DMA block; stopping the tape");
                self.stop(ctx);
                IoResult::data(data)
            }
        }
    }

    fn service(&mut self, ctx: &mut IoContext) {
        if self.activity == Activity::Stopped {
            return;
        }
        match self.tape_data.get(self.tape_pos) {
            None => {
                if !self.already_warned_eof {
                    self.already_warned_eof = true;
                    event!(
                        Level::WARN,
                        "end of tape at position {}; the reader has stopped",
                        self.tape_pos
                    );
                }
                self.stop(ctx);
            }
            Some(&frame) => {
                if ctx.flag() && !self.overrun {
                    self.overrun = true;
                    event!(
                        Level::WARN,
                        "input overrun at tape position {}",
                        self.tape_pos
                    );
                }
                self.buffer = frame;
                self.tape_pos += 1;
                ctx.clear_command();
                ctx.set_flag();
                ctx.set_srq();
                if ctx.control() {
                    ctx.schedule_after(FRAME_INTERVAL);
                } else {
                    self.activity = Activity::Stopped;
                }
            }
        }
    }

    fn reset(&mut self, _ctx: &mut IoContext) {
        self.activity = Activity::Stopped;
        self.buffer = 0;
        self.overrun = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::schedule::EventQueue;
    use crate::iostatus::IoStatus;
    use base::u6;

    struct Bench {
        status: IoStatus,
        queue: EventQueue,
        now: Duration,
    }

    impl Bench {
        fn new() -> Bench {
            Bench {
                status: IoStatus::default(),
                queue: EventQueue::new(),
                now: Duration::ZERO,
            }
        }

        fn signal(&mut self, reader: &mut PaperTapeReader, signal: IoSignal) -> IoResult {
            let mut ctx = IoContext::new(u6!(0o12), self.now, &mut self.status, &mut self.queue);
            reader.io(&mut ctx, signal, Instruction::new(0o102512), 0)
        }

        /// Delivers the reader's next event, if any.
        fn run_event(&mut self, reader: &mut PaperTapeReader) -> bool {
            match self.queue.next_event_time() {
                Some(when) => {
                    self.now = when;
                    assert!(self.queue.next_due(self.now).is_some());
                    let mut ctx =
                        IoContext::new(u6!(0o12), self.now, &mut self.status, &mut self.queue);
                    reader.service(&mut ctx);
                    true
                }
                None => false,
            }
        }
    }

    #[test]
    fn test_frame_arrives_after_delay() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![0o123, 0o45]);
        bench.signal(&mut reader, IoSignal::SetControl);
        assert!(bench.status.command(u6!(0o12)));
        assert!(!bench.status.flag(u6!(0o12)));
        assert_eq!(bench.queue.due_time(u6!(0o12)), Some(FRAME_INTERVAL));
        assert!(bench.run_event(&mut reader));
        assert!(bench.status.flag(u6!(0o12)));
        assert!(bench.status.service_request(u6!(0o12)));
        assert!(!bench.status.command(u6!(0o12)));
        assert_eq!(bench.signal(&mut reader, IoSignal::LoadData).data, 0o123);
        assert!(!reader.overrun());
    }

    #[test]
    fn test_unread_frame_latches_overrun() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![1, 2, 3]);
        bench.signal(&mut reader, IoSignal::SetControl);
        assert!(bench.run_event(&mut reader));
        // The program does not take the frame, so the flag is still
        // set when the next one arrives.
        assert!(bench.run_event(&mut reader));
        assert!(reader.overrun());
        assert_eq!(
            bench.signal(&mut reader, IoSignal::LoadData).data,
            OVERRUN_BIT | 2
        );
        // The overrun status stays latched.
        bench.signal(&mut reader, IoSignal::ClearFlag);
        assert!(bench.run_event(&mut reader));
        assert!(reader.overrun());
        assert_eq!(
            bench.signal(&mut reader, IoSignal::LoadData).data,
            OVERRUN_BIT | 3
        );
        bench.signal(&mut reader, IoSignal::ClearControl);
        assert!(!reader.overrun());
        assert_eq!(bench.signal(&mut reader, IoSignal::LoadData).data, 3);
    }

    #[test]
    fn test_clear_flag_clears_service_request() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![7]);
        bench.signal(&mut reader, IoSignal::SetControl);
        assert!(bench.run_event(&mut reader));
        bench.signal(&mut reader, IoSignal::ClearFlag);
        assert!(!bench.status.flag(u6!(0o12)));
        assert!(!bench.status.service_request(u6!(0o12)));
    }

    #[test]
    fn test_end_of_transfer_stops_reader() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![1, 2, 3]);
        bench.signal(&mut reader, IoSignal::SetControl);
        bench.signal(&mut reader, IoSignal::EndOfTransfer);
        assert!(bench.queue.is_empty());
        assert!(!bench.run_event(&mut reader));
        assert_eq!(reader.frames_read(), 0);
    }

    #[test]
    fn test_end_of_tape_stops_reader() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![1]);
        bench.signal(&mut reader, IoSignal::SetControl);
        assert!(bench.run_event(&mut reader));
        bench.signal(&mut reader, IoSignal::ClearFlag);
        assert!(bench.run_event(&mut reader));
        assert!(!bench.status.flag(u6!(0o12)));
        assert!(bench.queue.is_empty());
    }

    #[test]
    fn test_merge_ors_in_frame() {
        let mut bench = Bench::new();
        let mut reader = PaperTapeReader::with_tape(vec![0o17]);
        bench.signal(&mut reader, IoSignal::SetControl);
        assert!(bench.run_event(&mut reader));
        let mut ctx = IoContext::new(u6!(0o12), bench.now, &mut bench.status, &mut bench.queue);
        let result = reader.io(&mut ctx, IoSignal::MergeData, Instruction::new(0o102412), 0o100);
        assert_eq!(result.data, 0o117);
    }
}
