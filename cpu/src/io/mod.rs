//! This module simulates the I/O bus: the way I/O instructions and
//! DMA cycles reach the devices, and the devices' view of their own
//! status bits.
//!
//! ## Select codes
//!
//! | Code  | Device                                       |
//! | ----- | -------------------------------------------- |
//! | 0     | Interrupt system                             |
//! | 1     | Overflow and switch register                 |
//! | 2, 3  | DMA channel address and word count          |
//! | 4     | Power fail                                   |
//! | 5     | Memory protect                               |
//! | 6, 7  | DMA channel control                          |
//! | 10-77 | I/O cards                                    |
//!
//! Codes 0 to 7 are handled inside the processor (see
//! `control::internal`).  Every other code is routed through the
//! [`DeviceTable`] to a [`Device`], or to the floating bus if no
//! device is registered there.
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;

use tracing::{event, Level};

use base::prelude::*;

use crate::iostatus::{select_code::FIRST_EXTERNAL, IoStatus};

mod dev_ptr;
mod dev_punch;
pub mod schedule;

pub use dev_ptr::{PaperTapeReader, OVERRUN_BIT};
pub use dev_punch::TapePunch;
use schedule::EventQueue;

/// The operations a device can be asked to perform, either by an I/O
/// instruction or by a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoSignal {
    SetFlag,
    ClearFlag,
    SkipFlagClear,
    SkipFlagSet,
    MergeData,
    LoadData,
    OutputData,
    SetControl,
    ClearControl,
    /// Sent by a DMA channel after the last word of a block.
    EndOfTransfer,
}

impl IoSignal {
    /// The signal generated by an I/O instruction's sub-opcode.
    /// HLT has no signal of its own (its H/C bit still clears the
    /// flag).
    pub fn from_opcode(op: IoOpcode) -> Option<IoSignal> {
        Some(match op {
            IoOpcode::Halt => {
                return None;
            }
            IoOpcode::SetFlag => IoSignal::SetFlag,
            IoOpcode::ClearFlag => IoSignal::ClearFlag,
            IoOpcode::SkipIfFlagClear => IoSignal::SkipFlagClear,
            IoOpcode::SkipIfFlagSet => IoSignal::SkipFlagSet,
            IoOpcode::MergeInto => IoSignal::MergeData,
            IoOpcode::LoadInto => IoSignal::LoadData,
            IoOpcode::OutputFrom => IoSignal::OutputData,
            IoOpcode::SetControl => IoSignal::SetControl,
            IoOpcode::ClearControl => IoSignal::ClearControl,
        })
    }
}

/// The outcome of a device operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoResult {
    /// The data returned to the processor (for LIA/MIA and DMA
    /// input).  For other signals this is the data which was passed
    /// in.
    pub data: u16,
    /// For SFC/SFS, whether the next instruction is to be skipped.
    pub skip: bool,
    /// Set when the device wants the simulation to stop.
    pub stop: bool,
}

impl IoResult {
    pub fn data(data: u16) -> IoResult {
        IoResult {
            data,
            ..IoResult::default()
        }
    }

    pub fn skip_if(condition: bool) -> IoResult {
        IoResult {
            skip: condition,
            ..IoResult::default()
        }
    }
}

/// A device's window onto the rest of the machine while it is
/// handling a signal or an event.
pub struct IoContext<'a> {
    select_code: SelectCode,
    now: Duration,
    status: &'a mut IoStatus,
    scheduler: &'a mut EventQueue,
}

impl<'a> IoContext<'a> {
    pub fn new(
        select_code: SelectCode,
        now: Duration,
        status: &'a mut IoStatus,
        scheduler: &'a mut EventQueue,
    ) -> IoContext<'a> {
        IoContext {
            select_code,
            now,
            status,
            scheduler,
        }
    }

    pub fn select_code(&self) -> SelectCode {
        self.select_code
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn flag(&self) -> bool {
        self.status.flag(self.select_code)
    }

    pub fn set_flag(&mut self) {
        self.status.set_flag(self.select_code)
    }

    pub fn clear_flag(&mut self) {
        self.status.clear_flag(self.select_code)
    }

    pub fn control(&self) -> bool {
        self.status.control(self.select_code)
    }

    pub fn set_control(&mut self) {
        self.status.set_control(self.select_code)
    }

    pub fn clear_control(&mut self) {
        self.status.clear_control(self.select_code)
    }

    pub fn command(&self) -> bool {
        self.status.command(self.select_code)
    }

    pub fn set_command(&mut self) {
        self.status.set_command(self.select_code)
    }

    pub fn clear_command(&mut self) {
        self.status.clear_command(self.select_code)
    }

    pub fn set_srq(&mut self) {
        self.status.set_service_request(self.select_code)
    }

    pub fn clear_srq(&mut self) {
        self.status.clear_service_request(self.select_code)
    }

    /// Schedules this device's event `delay` from now, replacing any
    /// event already pending.  Events always fall due strictly after
    /// the current time.
    pub fn schedule_after(&mut self, delay: Duration) {
        let delay = delay.max(Duration::from_nanos(1));
        self.scheduler.schedule(self.select_code, self.now + delay);
    }

    pub fn cancel_event(&mut self) {
        self.scheduler.cancel(self.select_code);
    }

    pub fn event_pending(&self) -> bool {
        self.scheduler.due_time(self.select_code).is_some()
    }

    /// The standard behaviour of the flag signals (STF, CLF, SFC,
    /// SFS).  Returns `None` for other signals.
    pub fn flag_signal(&mut self, signal: IoSignal) -> Option<IoResult> {
        flag_io(self.status, self.select_code, signal)
    }
}

/// Performs the flag signals (STF, CLF, SFC, SFS) on the flag of
/// `code`.  Returns `None` for other signals.
pub fn flag_io(status: &mut IoStatus, code: SelectCode, signal: IoSignal) -> Option<IoResult> {
    match signal {
        IoSignal::SetFlag => {
            status.set_flag(code);
            Some(IoResult::default())
        }
        IoSignal::ClearFlag => {
            status.clear_flag(code);
            Some(IoResult::default())
        }
        IoSignal::SkipFlagClear => Some(IoResult::skip_if(!status.flag(code))),
        IoSignal::SkipFlagSet => Some(IoResult::skip_if(status.flag(code))),
        _ => None,
    }
}

/// An I/O card and the peripheral attached to it.
pub trait Device: Debug {
    fn name(&self) -> &str;

    /// Performs `signal`.  `instruction` is the I/O instruction
    /// being executed (for DMA cycles, an instruction synthesised by
    /// the channel) and `data` is the value of the A or B register
    /// (or, for DMA output, the word read from memory).
    fn io(
        &mut self,
        ctx: &mut IoContext,
        signal: IoSignal,
        instruction: Instruction,
        data: u16,
    ) -> IoResult;

    /// Called when the device's scheduled event falls due.
    fn service(&mut self, ctx: &mut IoContext);

    /// Called at power-on and preset.  The device's pending event has
    /// already been cancelled and its status bits cleared.
    fn reset(&mut self, ctx: &mut IoContext);
}

pub struct DeviceDescriptor {
    pub select_code: SelectCode,
    pub enabled: bool,
    pub device: Box<dyn Device>,
}

impl Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("DeviceDescriptor")
            .field("select_code", &self.select_code)
            .field("enabled", &self.enabled)
            .field("device", &format_args!("<device: {}>", self.device.name()))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTableError {
    /// Select codes below 10 belong to the processor.
    Reserved(SelectCode),
    /// Another device is already registered at this select code.
    Conflict { select_code: SelectCode, existing: String },
    NoSuchDevice(SelectCode),
}

impl Display for DeviceTableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTableError::Reserved(code) => {
                write!(f, "select code {code:02o} is reserved for the processor")
            }
            DeviceTableError::Conflict {
                select_code,
                existing,
            } => write!(
                f,
                "select code {select_code:02o} is already in use by {existing}"
            ),
            DeviceTableError::NoSuchDevice(code) => {
                write!(f, "no device is registered at select code {code:02o}")
            }
        }
    }
}

impl Error for DeviceTableError {}

/// Handles the select codes which have no device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingBus {
    pub value: u16,
}

impl FloatingBus {
    fn io(&self, signal: IoSignal, data: u16) -> IoResult {
        let mut result = match signal {
            IoSignal::LoadData => IoResult::data(self.value),
            IoSignal::MergeData => IoResult::data(data | self.value),
            // There is no flag, so it is always clear.
            IoSignal::SkipFlagClear => IoResult {
                data,
                skip: true,
                stop: false,
            },
            _ => IoResult::data(data),
        };
        result.stop = true;
        result
    }
}

/// Routes signals to devices by select code.
#[derive(Debug)]
pub struct DeviceTable {
    registry: Vec<DeviceDescriptor>,
    table: [Option<usize>; 64],
    floating: FloatingBus,
}

impl DeviceTable {
    pub fn new(floating_bus: u16) -> DeviceTable {
        DeviceTable {
            registry: Vec::new(),
            table: [None; 64],
            floating: FloatingBus {
                value: floating_bus,
            },
        }
    }

    pub fn register(
        &mut self,
        select_code: SelectCode,
        device: Box<dyn Device>,
    ) -> Result<(), DeviceTableError> {
        if select_code < FIRST_EXTERNAL {
            return Err(DeviceTableError::Reserved(select_code));
        }
        if let Some(existing) = self
            .registry
            .iter()
            .find(|desc| desc.select_code == select_code)
        {
            return Err(DeviceTableError::Conflict {
                select_code,
                existing: existing.device.name().to_string(),
            });
        }
        event!(
            Level::INFO,
            "attaching {} at select code {:02o}",
            device.name(),
            select_code
        );
        self.registry.push(DeviceDescriptor {
            select_code,
            enabled: true,
            device,
        });
        self.rebuild();
        Ok(())
    }

    /// Enables or disables the device registered at `select_code`.
    /// A disabled device is replaced by the floating bus.
    pub fn set_enabled(
        &mut self,
        select_code: SelectCode,
        enabled: bool,
    ) -> Result<(), DeviceTableError> {
        match self
            .registry
            .iter_mut()
            .find(|desc| desc.select_code == select_code)
        {
            Some(desc) => {
                desc.enabled = enabled;
                self.rebuild();
                Ok(())
            }
            None => Err(DeviceTableError::NoSuchDevice(select_code)),
        }
    }

    fn rebuild(&mut self) {
        self.table = [None; 64];
        for (i, desc) in self.registry.iter().enumerate() {
            if desc.enabled {
                self.table[usize::from(desc.select_code)] = Some(i);
            }
        }
    }

    pub fn is_present(&self, select_code: SelectCode) -> bool {
        self.table[usize::from(select_code)].is_some()
    }

    pub fn device_name(&self, select_code: SelectCode) -> Option<&str> {
        self.table[usize::from(select_code)].map(|i| self.registry[i].device.name())
    }

    pub fn floating_bus(&self) -> u16 {
        self.floating.value
    }

    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &mut self,
        select_code: SelectCode,
        signal: IoSignal,
        instruction: Instruction,
        data: u16,
        now: Duration,
        status: &mut IoStatus,
        scheduler: &mut EventQueue,
    ) -> IoResult {
        match self.table[usize::from(select_code)] {
            Some(i) => {
                let mut ctx = IoContext::new(select_code, now, status, scheduler);
                self.registry[i]
                    .device
                    .io(&mut ctx, signal, instruction, data)
            }
            None => {
                event!(
                    Level::DEBUG,
                    "{:?} to select code {:02o}, which has no device",
                    signal,
                    select_code
                );
                self.floating.io(signal, data)
            }
        }
    }

    /// Delivers a due event to the device at `select_code`.
    pub fn service(
        &mut self,
        select_code: SelectCode,
        now: Duration,
        status: &mut IoStatus,
        scheduler: &mut EventQueue,
    ) {
        match self.table[usize::from(select_code)] {
            Some(i) => {
                let mut ctx = IoContext::new(select_code, now, status, scheduler);
                self.registry[i].device.service(&mut ctx);
            }
            None => {
                event!(
                    Level::DEBUG,
                    "discarding event for select code {:02o}, which has no device",
                    select_code
                );
            }
        }
    }

    /// Resets every enabled device, cancelling its pending event and
    /// clearing its status bits first.
    pub fn reset_all(&mut self, now: Duration, status: &mut IoStatus, scheduler: &mut EventQueue) {
        for desc in self.registry.iter_mut().filter(|desc| desc.enabled) {
            scheduler.cancel(desc.select_code);
            status.clear_device(desc.select_code);
            event!(
                Level::INFO,
                "resetting {} at select code {:02o}",
                desc.device.name(),
                desc.select_code
            );
            let mut ctx = IoContext::new(desc.select_code, now, status, scheduler);
            desc.device.reset(&mut ctx);
        }
    }
}

#[cfg(test)]
mod tests;
