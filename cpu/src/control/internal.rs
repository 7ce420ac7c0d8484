//! The devices at select codes 0 to 7, which are part of the
//! processor itself.
use tracing::{event, Level};

use base::prelude::*;

use super::ControlUnit;
use crate::io::{flag_io, IoResult, IoSignal};
use crate::iostatus::select_code;

impl ControlUnit {
    pub(super) fn internal_io(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> IoResult {
        match u8::from(code) {
            0 => self.interrupt_system_io(signal, data),
            1 => self.overflow_io(signal, data),
            2 | 3 => self.dma_address_io(code, signal, data),
            4 => self.power_fail_io(signal, data),
            5 => self.memory_protect_io(signal, data),
            _ => self.dma_control_io(code, signal, data),
        }
    }

    fn interrupt_system_io(&mut self, signal: IoSignal, data: u16) -> IoResult {
        let cir = u16::from(self.last_interrupt);
        match signal {
            IoSignal::SetFlag => {
                event!(Level::DEBUG, "interrupt system on");
                self.ion = true;
                IoResult::data(data)
            }
            IoSignal::ClearFlag => {
                event!(Level::DEBUG, "interrupt system off");
                self.ion = false;
                IoResult::data(data)
            }
            IoSignal::SkipFlagClear => IoResult::skip_if(!self.ion),
            IoSignal::SkipFlagSet => IoResult::skip_if(self.ion),
            IoSignal::LoadData => IoResult::data(cir),
            IoSignal::MergeData => IoResult::data(data | cir),
            IoSignal::ClearControl => {
                // CLC 0 clears control on every device from the DMA
                // channels upward.
                for n in u8::from(select_code::DMA_CONTROL_0)..=u8::from(SelectCode::MAX) {
                    let code = SelectCode::from_low_bits(n);
                    if code < select_code::FIRST_EXTERNAL {
                        self.internal_io(code, IoSignal::ClearControl, 0);
                    } else {
                        self.devices.dispatch(
                            code,
                            IoSignal::ClearControl,
                            Instruction::new(0o106700).with_select_code(code),
                            0,
                            self.ctx.simulated_time,
                            &mut self.status,
                            &mut self.scheduler,
                        );
                    }
                }
                IoResult::data(data)
            }
            IoSignal::SetControl | IoSignal::OutputData | IoSignal::EndOfTransfer => {
                IoResult::data(data)
            }
        }
    }

    fn overflow_io(&mut self, signal: IoSignal, data: u16) -> IoResult {
        match signal {
            IoSignal::SetFlag => {
                self.regs.o = true;
                IoResult::data(data)
            }
            IoSignal::ClearFlag => {
                self.regs.o = false;
                IoResult::data(data)
            }
            IoSignal::SkipFlagClear => IoResult::skip_if(!self.regs.o),
            IoSignal::SkipFlagSet => IoResult::skip_if(self.regs.o),
            IoSignal::LoadData => IoResult::data(self.regs.s),
            IoSignal::MergeData => IoResult::data(data | self.regs.s),
            IoSignal::OutputData => {
                self.regs.s = data;
                IoResult::data(data)
            }
            IoSignal::SetControl | IoSignal::ClearControl | IoSignal::EndOfTransfer => {
                IoResult::data(data)
            }
        }
    }

    /// Select codes 2 and 3 load the channel's memory address (control
    /// clear) or word count (control set).
    fn dma_address_io(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> IoResult {
        let n = usize::from(code) - 2;
        if let Some(result) = flag_io(&mut self.status, code, signal) {
            return result;
        }
        let count = self.dma.channel(n).count();
        match signal {
            IoSignal::SetControl => self.status.set_control(code),
            IoSignal::ClearControl => self.status.clear_control(code),
            IoSignal::OutputData => {
                let channel = self.dma.channel_mut(n);
                if self.status.control(code) {
                    channel.load_count(data);
                } else {
                    channel.load_address_word(data);
                }
            }
            IoSignal::LoadData => return IoResult::data(count),
            IoSignal::MergeData => return IoResult::data(data | count),
            _ => (),
        }
        IoResult::data(data)
    }

    fn power_fail_io(&mut self, signal: IoSignal, data: u16) -> IoResult {
        if let Some(result) = flag_io(&mut self.status, select_code::POWER_FAIL, signal) {
            return result;
        }
        match signal {
            IoSignal::SetControl => self.status.set_control(select_code::POWER_FAIL),
            IoSignal::ClearControl => self.status.clear_control(select_code::POWER_FAIL),
            IoSignal::LoadData => return IoResult::data(0),
            _ => (),
        }
        IoResult::data(data)
    }

    fn memory_protect_io(&mut self, signal: IoSignal, data: u16) -> IoResult {
        let mevr = u16::from(self.mapping.protect.violation_register());
        if let Some(result) = flag_io(&mut self.status, select_code::MEMORY_PROTECT, signal) {
            return result;
        }
        match signal {
            IoSignal::SetControl => {
                event!(Level::DEBUG, "memory protect on");
                self.status.set_control(select_code::MEMORY_PROTECT);
                self.mapping.protect.arm();
            }
            // Memory protect can only be turned off by an interrupt.
            IoSignal::ClearControl => (),
            IoSignal::OutputData => {
                self.mapping.protect.set_fence(Address::from_low_bits(data));
            }
            IoSignal::LoadData => return IoResult::data(mevr),
            IoSignal::MergeData => return IoResult::data(data | mevr),
            _ => (),
        }
        IoResult::data(data)
    }

    /// Select codes 6 and 7 control the DMA channels.
    fn dma_control_io(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> IoResult {
        let n = usize::from(code) - 6;
        if let Some(result) = flag_io(&mut self.status, code, signal) {
            return result;
        }
        let count = self.dma.channel(n).count();
        match signal {
            IoSignal::OutputData => self.dma.channel_mut(n).load_control_word(data),
            IoSignal::SetControl => {
                event!(
                    Level::DEBUG,
                    "starting DMA channel {}: {:?}",
                    n,
                    self.dma.channel(n)
                );
                self.status.set_control(code);
                self.status.set_command(code);
            }
            IoSignal::ClearControl => {
                self.status.clear_control(code);
                self.status.clear_command(code);
            }
            IoSignal::LoadData => return IoResult::data(count),
            IoSignal::MergeData => return IoResult::data(data | count),
            _ => (),
        }
        IoResult::data(data)
    }
}
