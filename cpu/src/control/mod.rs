//! The control unit fetches and executes instructions, grants
//! interrupts and steals memory cycles for the DMA channels.
//!
//! The unit of work is a single pass of [`ControlUnit::step`]:
//!
//! 1. Deliver any device events which have fallen due.
//! 2. Report a stop requested during the previous pass.
//! 3. Perform one DMA cycle, if a channel is requesting one.
//! 4. Grant an interrupt (executing the trap cell instruction) or
//!    fetch and execute the instruction at P.
//! 5. Handle the outcome of the instruction: an aborted instruction
//!    sets the memory protect flag, a stop is returned to the caller.
//! 6. Advance simulated time.
use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{event, span, Level};

use base::prelude::*;

use crate::abort::{resume_after_abort, Fault};
use crate::config::{ConfigError, MachineConfig};
use crate::context::Context;
use crate::dma::{DmaBus, DmaController, DmaPort};
use crate::interrupt::{acknowledge, compute_pending_interrupt};
use crate::io::schedule::EventQueue;
use crate::io::{Device, DeviceTable, DeviceTableError, IoResult, IoSignal};
use crate::iostatus::{select_code, IoStatus};
use crate::mapping::{AccessKind, MapIndexError, MapSelector, MappingUnit};
use crate::memory::MemoryUnit;
use crate::registers::Registers;
use crate::stop::{StopKind, StopReason};
use crate::stopunit::StopUnit;

mod internal;
mod op_alter;
mod op_dms;
mod op_eau;
mod op_index;
mod op_io;
mod op_memref;
mod op_shift;
mod timing;


const INDIRECT_BIT: u16 = 0o100000;

/// Beyond this many levels of indirection, address resolution gives
/// way to a pending interrupt.
const INDIRECT_LEVELS_BEFORE_INTERRUPT: u32 = 3;

/// The instruction being executed, and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CurrentInstruction {
    pub(crate) address: Address,
    pub(crate) instruction: Instruction,
    /// True for the trap cell instruction executed when an interrupt
    /// is granted.  Such instructions do not advance P and are not
    /// subject to memory protect.
    pub(crate) interrupt_entry: bool,
}

#[derive(Debug)]
pub struct ControlUnit {
    regs: Registers,
    status: IoStatus,
    memory: MemoryUnit,
    mapping: MappingUnit,
    dma: DmaController,
    devices: DeviceTable,
    scheduler: EventQueue,
    stops: StopUnit,
    config: MachineConfig,
    ctx: Context,
    /// The interrupt system is on (the flag of select code 0).
    ion: bool,
    /// Set by I/O instructions to hold off an interrupt until one
    /// more instruction has been executed.
    ion_defer: bool,
    /// The interrupt request computed at the start of this pass.
    interrupt_request: Option<SelectCode>,
    /// The central interrupt register: the select code of the most
    /// recently granted interrupt.
    last_interrupt: SelectCode,
    breakpoints: BTreeSet<Address>,
    /// A breakpoint address which was just reported, and so is not
    /// reported again when execution resumes there.
    resume_over: Option<Address>,
    pending_stop: Option<StopReason>,
    /// Memory cycles used during this pass.
    cycles: u32,
    instructions_executed: u64,
}

impl ControlUnit {
    pub fn new(config: MachineConfig) -> Result<ControlUnit, ConfigError> {
        config.validate()?;
        Ok(ControlUnit {
            regs: Registers::default(),
            status: IoStatus::default(),
            memory: MemoryUnit::new(config.memory_words),
            mapping: MappingUnit::new(),
            dma: DmaController::new(),
            devices: DeviceTable::new(config.floating_bus),
            scheduler: EventQueue::new(),
            stops: StopUnit::new(&config.stops),
            config,
            ctx: Context::default(),
            ion: false,
            ion_defer: false,
            interrupt_request: None,
            last_interrupt: SelectCode::ZERO,
            breakpoints: BTreeSet::new(),
            resume_over: None,
            pending_stop: None,
            cycles: 0,
            instructions_executed: 0,
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Attaches a device at `select_code`.
    pub fn attach(
        &mut self,
        select_code: SelectCode,
        device: Box<dyn Device>,
    ) -> Result<(), DeviceTableError> {
        self.devices.register(select_code, device)
    }

    pub fn devices_mut(&mut self) -> &mut DeviceTable {
        &mut self.devices
    }

    /// Performs the PRESET function: all I/O state is cleared, every
    /// device is reset and pending device events are discarded.
    /// Registers, memory and the map registers are kept.
    pub fn preset(&mut self) {
        event!(Level::INFO, "preset");
        self.scheduler.clear();
        self.status = IoStatus::default();
        self.dma.reset();
        self.mapping.reset();
        self.ion = false;
        self.ion_defer = false;
        self.interrupt_request = None;
        self.last_interrupt = SelectCode::ZERO;
        self.pending_stop = None;
        self.resume_over = None;
        self.devices
            .reset_all(self.ctx.simulated_time, &mut self.status, &mut self.scheduler);
    }

    /// Performs a preset and also clears the registers.
    pub fn power_on(&mut self) {
        self.preset();
        self.regs = Registers::default();
    }

    /// Simulates the loss of power: the power fail flag is set.
    pub fn power_fail(&mut self) {
        event!(Level::INFO, "power failure");
        self.status.set_flag(select_code::POWER_FAIL);
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn status(&self) -> &IoStatus {
        &self.status
    }

    pub fn mapping(&self) -> &MappingUnit {
        &self.mapping
    }

    pub fn dma(&self) -> &DmaController {
        &self.dma
    }

    pub fn interrupt_system_enabled(&self) -> bool {
        self.ion
    }

    pub fn stops_mut(&mut self) -> &mut StopUnit {
        &mut self.stops
    }

    pub fn simulated_time(&self) -> Duration {
        self.ctx.simulated_time
    }

    pub fn instructions_executed(&self) -> u64 {
        self.instructions_executed
    }

    /// Reads physical memory, without mapping or protection.
    pub fn read_memory(&self, address: PhysicalAddress) -> u16 {
        self.memory.read(address)
    }

    /// Writes physical memory, without mapping or protection.
    pub fn write_memory(&mut self, address: PhysicalAddress, value: u16) {
        self.memory.write(address, value)
    }

    pub fn read_map_entry(&self, index: usize) -> Result<u16, MapIndexError> {
        self.mapping.read_map_entry(index)
    }

    pub fn write_map_entry(&mut self, index: usize, value: u16) -> Result<(), MapIndexError> {
        self.mapping.write_map_entry(index, value)
    }

    pub fn set_breakpoint(&mut self, address: Address) {
        self.breakpoints.insert(address);
    }

    pub fn clear_breakpoint(&mut self, address: Address) -> bool {
        self.breakpoints.remove(&address)
    }

    fn protect_enabled(&self) -> bool {
        self.status.control(select_code::MEMORY_PROTECT)
    }

    /// Runs until something stops the simulation, or until `limit`
    /// instructions have been executed.
    pub fn run_until_stop(&mut self, limit: Option<u64>) -> StopReason {
        let start = self.instructions_executed;
        loop {
            if let Some(limit) = limit {
                if self.instructions_executed - start >= limit {
                    let reason = StopReason::InstructionLimit;
                    event!(Level::WARN, "stopping: {}", reason);
                    return reason;
                }
            }
            if let Err(reason) = self.step() {
                return reason;
            }
        }
    }

    /// Performs one pass of the processor's main loop.
    pub fn step(&mut self) -> Result<(), StopReason> {
        let span = span!(Level::TRACE, "step", p=?self.regs.p);
        let _enter = span.enter();
        self.cycles = 0;

        self.service_due_events();
        if let Some(reason) = self.pending_stop.take() {
            return Err(self.report_stop(reason));
        }

        if let Some(n) = self.dma.request(&self.status) {
            self.dma_cycle(n);
            if self.pending_stop.is_some() {
                // The channel addressed a missing device; the stop
                // is reported at the start of the next pass.
                self.advance_time();
                return Ok(());
            }
        }

        self.interrupt_request = compute_pending_interrupt(&self.status, self.ion);
        let result = match self.interrupt_request {
            Some(code) if code <= select_code::MEMORY_PROTECT || !self.ion_defer => {
                self.interrupt_entry(code)
            }
            _ => self.fetch_and_execute(),
        };
        match result {
            Ok(()) | Err(Fault::Retry) => (),
            Err(Fault::Abort(violation)) => {
                resume_after_abort(&mut self.status, &mut self.mapping.protect, &violation);
            }
            Err(Fault::Stop(reason)) => {
                if let Some(reason) = self.stops.filter(reason) {
                    self.advance_time();
                    return Err(self.report_stop(reason));
                }
            }
        }
        self.advance_time();
        Ok(())
    }

    fn advance_time(&mut self) {
        let elapsed = timing::cycles_to_duration(self.cycles, self.config.cycle_time);
        self.ctx.advance(elapsed);
    }

    fn report_stop(&mut self, reason: StopReason) -> StopReason {
        if let StopReason::Breakpoint { address } = reason {
            self.resume_over = Some(address);
        }
        event!(Level::WARN, "stopping: {}", reason);
        reason
    }

    fn service_due_events(&mut self) {
        let now = self.ctx.simulated_time;
        while let Some((code, due)) = self.scheduler.next_due(now) {
            event!(
                Level::TRACE,
                "servicing event for select code {:02o} due at {:?}",
                code,
                due
            );
            self.devices
                .service(code, now, &mut self.status, &mut self.scheduler);
        }
    }

    fn interrupt_entry(&mut self, code: SelectCode) -> Result<(), Fault> {
        let trap = acknowledge(&mut self.status, code);
        self.last_interrupt = code;
        // The handler runs with memory protect off, through the
        // system map.
        self.status.clear_control(select_code::MEMORY_PROTECT);
        self.mapping.enter_interrupt();
        self.mapping.begin_instruction();
        let instruction = Instruction::new(self.read(trap)?);
        event!(
            Level::TRACE,
            "interrupt {:02o}: executing {} from the trap cell",
            code,
            instruction
        );
        self.execute(&CurrentInstruction {
            address: trap,
            instruction,
            interrupt_entry: true,
        })
    }

    fn fetch_and_execute(&mut self) -> Result<(), Fault> {
        let p = self.regs.p;
        let resuming = self.resume_over.take() == Some(p);
        if !resuming && self.breakpoints.contains(&p) {
            return Err(StopReason::Breakpoint { address: p }.into());
        }
        self.ion_defer = false;
        self.mapping.begin_instruction();
        self.mapping.protect.note_instruction(p);
        let instruction = Instruction::new(self.read(p)?);
        event!(Level::TRACE, "fetched {} from {:05o}", instruction, p);
        self.regs.p = p.wrapping_increment();
        self.instructions_executed += 1;
        self.execute(&CurrentInstruction {
            address: p,
            instruction,
            interrupt_entry: false,
        })
    }

    fn execute(&mut self, cur: &CurrentInstruction) -> Result<(), Fault> {
        match cur.instruction.class() {
            InstructionClass::MemoryReference(op) => self.op_memory_reference(cur, op),
            InstructionClass::ShiftRotate => {
                self.op_shift_rotate(cur.instruction);
                Ok(())
            }
            InstructionClass::AlterSkip => {
                self.op_alter_skip(cur.instruction);
                Ok(())
            }
            InstructionClass::Extended => match cur.instruction.extended_opcode() {
                Some(op) => self.op_eau(cur, op),
                None => self.unimplemented(cur),
            },
            InstructionClass::InputOutput(op) => self.op_io(cur, op),
        }
    }

    fn unimplemented(&mut self, cur: &CurrentInstruction) -> Result<(), Fault> {
        if self.stops.is_masked(StopKind::Unimplemented) {
            event!(
                Level::DEBUG,
                "ignoring unimplemented instruction {:06o} at {:05o}",
                cur.instruction.bits(),
                cur.address
            );
            return Ok(());
        }
        if !cur.interrupt_entry {
            self.regs.p = cur.address;
        }
        Err(StopReason::Unimplemented {
            instruction: cur.instruction,
            address: cur.address,
        }
        .into())
    }

    fn skip(&mut self) {
        self.regs.p = self.regs.p.wrapping_increment();
    }

    /// Reads a word through the current map.
    fn read(&mut self, address: Address) -> Result<u16, Fault> {
        self.read_via(address, MapSelector::Current)
    }

    fn read_via(&mut self, address: Address, map: MapSelector) -> Result<u16, Fault> {
        self.cycles += 1;
        self.regs.m = address;
        let protect_enabled = self.protect_enabled();
        let value = match u16::from(address) {
            0 => self.regs.a,
            1 => self.regs.b,
            _ => {
                let physical =
                    self.mapping
                        .translate(address, map, AccessKind::Read, protect_enabled)?;
                self.memory.read(physical)
            }
        };
        self.regs.t = value;
        Ok(value)
    }

    /// Writes a word through the current map.
    fn write(&mut self, address: Address, value: u16) -> Result<(), Fault> {
        self.write_via(address, MapSelector::Current, value)
    }

    fn write_via(&mut self, address: Address, map: MapSelector, value: u16) -> Result<(), Fault> {
        self.cycles += 1;
        self.regs.m = address;
        let protect_enabled = self.protect_enabled();
        if protect_enabled {
            self.mapping.protect.check_write(address)?;
        }
        match u16::from(address) {
            0 => self.regs.a = value,
            1 => self.regs.b = value,
            _ => {
                let physical =
                    self.mapping
                        .translate(address, map, AccessKind::Write, protect_enabled)?;
                self.memory.write(physical, value);
            }
        }
        self.regs.t = value;
        Ok(())
    }

    /// Follows a chain of indirect addresses starting at `address`.
    fn resolve_indirect(
        &mut self,
        cur: &CurrentInstruction,
        mut address: Address,
        mut indirect: bool,
    ) -> Result<Address, Fault> {
        let mut depth: u32 = 0;
        while indirect {
            depth += 1;
            if depth > self.config.indirect_limit {
                if !cur.interrupt_entry {
                    self.regs.p = cur.address;
                }
                return Err(StopReason::IndirectLoop {
                    address: cur.address,
                }
                .into());
            }
            if !cur.interrupt_entry
                && self.interrupt_request.is_some()
                && (depth > INDIRECT_LEVELS_BEFORE_INTERRUPT || self.config.interrupt_defer_jumper)
            {
                event!(
                    Level::TRACE,
                    "indirect chain at {:05o} gives way to an interrupt",
                    cur.address
                );
                self.regs.p = cur.address;
                return Err(Fault::Retry);
            }
            let word = self.read(address)?;
            indirect = word & INDIRECT_BIT != 0;
            address = Address::from_low_bits(word);
        }
        Ok(address)
    }

    /// Reads the address word which follows an extended instruction
    /// (advancing P past it) and resolves any indirection.
    fn operand_address(&mut self, cur: &CurrentInstruction) -> Result<Address, Fault> {
        let word = self.next_word()?;
        self.resolve_indirect(cur, Address::from_low_bits(word), word & INDIRECT_BIT != 0)
    }

    /// Reads the word at P and advances P past it.
    fn next_word(&mut self) -> Result<u16, Fault> {
        let at = self.regs.p;
        let word = self.read(at)?;
        self.regs.p = at.wrapping_increment();
        Ok(word)
    }

    /// Checks the target of a jump against the memory protect fence.
    fn check_jump(&mut self, cur: &CurrentInstruction, target: Address) -> Result<(), Fault> {
        if self.protect_enabled() && !cur.interrupt_entry {
            self.mapping.protect.check_jump(target)?;
        }
        Ok(())
    }

    /// Records a stop requested by the floating bus, unless that stop
    /// is masked or another stop is already pending.
    fn note_missing_device(&mut self, code: SelectCode, address: Address) {
        if self.pending_stop.is_none() && !self.stops.is_masked(StopKind::NonexistentDevice) {
            self.pending_stop = Some(StopReason::NonexistentDevice {
                select_code: code,
                address,
            });
        }
    }

    /// Sends `signal` to the device at `code`, whether it is inside
    /// the processor or on the I/O bus.
    fn io_signal(
        &mut self,
        cur: &CurrentInstruction,
        code: SelectCode,
        signal: IoSignal,
        data: u16,
    ) -> IoResult {
        if code < select_code::FIRST_EXTERNAL {
            return self.internal_io(code, signal, data);
        }
        let result = self.devices.dispatch(
            code,
            signal,
            cur.instruction,
            data,
            self.ctx.simulated_time,
            &mut self.status,
            &mut self.scheduler,
        );
        if result.stop {
            self.note_missing_device(code, cur.address);
        }
        result
    }

    fn dma_cycle(&mut self, n: usize) {
        self.cycles += 1;
        let mut bus = SystemBus {
            status: &mut self.status,
            memory: &mut self.memory,
            mapping: &self.mapping,
            devices: &mut self.devices,
            scheduler: &mut self.scheduler,
            now: self.ctx.simulated_time,
            missing_device: None,
        };
        self.dma.cycle(n, &mut bus);
        let missing = bus.missing_device;
        if let Some(code) = missing {
            self.note_missing_device(code, self.regs.p);
        }
    }
}

/// The I/O instruction a DMA channel effectively issues to its
/// device for each signal.
fn dma_instruction(signal: IoSignal, code: SelectCode) -> Instruction {
    let bits = match signal {
        IoSignal::SetFlag => 0o102100,
        IoSignal::ClearFlag => 0o103100,
        IoSignal::SkipFlagClear => 0o102200,
        IoSignal::SkipFlagSet => 0o102300,
        IoSignal::MergeData => 0o102400,
        IoSignal::LoadData => 0o102500,
        IoSignal::OutputData => 0o102600,
        IoSignal::SetControl => 0o102700,
        IoSignal::ClearControl => 0o106700,
        IoSignal::EndOfTransfer => 0o102000,
    };
    Instruction::new(bits).with_select_code(code)
}

/// The DMA channels' access to memory and devices.
struct SystemBus<'a> {
    status: &'a mut IoStatus,
    memory: &'a mut MemoryUnit,
    mapping: &'a MappingUnit,
    devices: &'a mut DeviceTable,
    scheduler: &'a mut EventQueue,
    now: Duration,
    missing_device: Option<SelectCode>,
}

impl DmaBus for SystemBus<'_> {
    fn status_mut(&mut self) -> &mut IoStatus {
        self.status
    }

    fn read_word(&mut self, port: DmaPort, address: Address) -> u16 {
        let physical = self.mapping.translate_unchecked(address, port.map());
        self.memory.read(physical)
    }

    fn write_word(&mut self, port: DmaPort, address: Address, value: u16) {
        let physical = self.mapping.translate_unchecked(address, port.map());
        self.memory.write(physical, value)
    }

    fn signal(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> u16 {
        if code < select_code::FIRST_EXTERNAL {
            event!(
                Level::DEBUG,
                "DMA channel addressed processor select code {:02o}; ignoring {:?}",
                code,
                signal
            );
            return data;
        }
        let result = self.devices.dispatch(
            code,
            signal,
            dma_instruction(signal, code),
            data,
            self.now,
            self.status,
            self.scheduler,
        );
        if result.stop && self.missing_device.is_none() {
            self.missing_device = Some(code);
        }
        result.data
    }
}
