use std::time::Duration;

use base::prelude::*;
use base::u6;

use super::*;

#[derive(Debug, Default)]
struct Echo {
    register: u16,
    resets: usize,
}

impl Device for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn io(
        &mut self,
        ctx: &mut IoContext,
        signal: IoSignal,
        _instruction: Instruction,
        data: u16,
    ) -> IoResult {
        if let Some(result) = ctx.flag_signal(signal) {
            return result;
        }
        match signal {
            IoSignal::OutputData => {
                self.register = data;
                IoResult::data(data)
            }
            IoSignal::LoadData => IoResult::data(self.register),
            IoSignal::SetControl => {
                ctx.set_control();
                ctx.schedule_after(Duration::from_micros(10));
                IoResult::data(data)
            }
            _ => IoResult::data(data),
        }
    }

    fn service(&mut self, ctx: &mut IoContext) {
        ctx.set_flag();
    }

    fn reset(&mut self, _ctx: &mut IoContext) {
        self.resets += 1;
    }
}

fn dispatch(
    table: &mut DeviceTable,
    status: &mut IoStatus,
    queue: &mut EventQueue,
    code: SelectCode,
    signal: IoSignal,
    data: u16,
) -> IoResult {
    table.dispatch(
        code,
        signal,
        Instruction::new(0o102500).with_select_code(code),
        data,
        Duration::ZERO,
        status,
        queue,
    )
}

#[test]
fn test_unregistered_code_reads_floating_bus() {
    let mut table = DeviceTable::new(0o177400);
    let mut status = IoStatus::default();
    let mut queue = EventQueue::new();
    let result = dispatch(&mut table, &mut status, &mut queue, u6!(0o30), IoSignal::LoadData, 0);
    assert_eq!(result.data, 0o177400);
    assert!(result.stop);
    let result = dispatch(&mut table, &mut status, &mut queue, u6!(0o30), IoSignal::MergeData, 0o7);
    assert_eq!(result.data, 0o177407);
    let result = dispatch(
        &mut table,
        &mut status,
        &mut queue,
        u6!(0o30),
        IoSignal::SkipFlagClear,
        0,
    );
    assert!(result.skip);
    let result = dispatch(&mut table, &mut status, &mut queue, u6!(0o30), IoSignal::SkipFlagSet, 0);
    assert!(!result.skip);
}

#[test]
fn test_registered_device_receives_signals() {
    let mut table = DeviceTable::new(0);
    let mut status = IoStatus::default();
    let mut queue = EventQueue::new();
    table
        .register(u6!(0o20), Box::new(Echo::default()))
        .expect("registration should succeed");
    assert!(table.is_present(u6!(0o20)));
    assert_eq!(table.device_name(u6!(0o20)), Some("echo"));
    dispatch(&mut table, &mut status, &mut queue, u6!(0o20), IoSignal::OutputData, 0o1234);
    let result = dispatch(&mut table, &mut status, &mut queue, u6!(0o20), IoSignal::LoadData, 0);
    assert_eq!(result.data, 0o1234);
    assert!(!result.stop);
}

#[test]
fn test_register_rejects_reserved_and_duplicate_codes() {
    let mut table = DeviceTable::new(0);
    assert_eq!(
        table.register(u6!(0o7), Box::new(Echo::default())),
        Err(DeviceTableError::Reserved(u6!(0o7)))
    );
    table
        .register(u6!(0o10), Box::new(Echo::default()))
        .expect("registration should succeed");
    assert!(matches!(
        table.register(u6!(0o10), Box::new(Echo::default())),
        Err(DeviceTableError::Conflict { .. })
    ));
}

#[test]
fn test_disabled_device_is_replaced_by_floating_bus() {
    let mut table = DeviceTable::new(0o55);
    let mut status = IoStatus::default();
    let mut queue = EventQueue::new();
    table
        .register(u6!(0o20), Box::new(Echo::default()))
        .expect("registration should succeed");
    table
        .set_enabled(u6!(0o20), false)
        .expect("device should be registered");
    let result = dispatch(&mut table, &mut status, &mut queue, u6!(0o20), IoSignal::LoadData, 0);
    assert_eq!(result.data, 0o55);
    assert_eq!(
        table.set_enabled(u6!(0o21), true),
        Err(DeviceTableError::NoSuchDevice(u6!(0o21)))
    );
}

#[test]
fn test_reset_cancels_pending_event() {
    let mut table = DeviceTable::new(0);
    let mut status = IoStatus::default();
    let mut queue = EventQueue::new();
    table
        .register(u6!(0o20), Box::new(Echo::default()))
        .expect("registration should succeed");
    dispatch(&mut table, &mut status, &mut queue, u6!(0o20), IoSignal::SetControl, 0);
    assert_eq!(queue.len(), 1);
    assert!(status.control(u6!(0o20)));
    table.reset_all(Duration::ZERO, &mut status, &mut queue);
    assert!(queue.is_empty());
    assert!(!status.control(u6!(0o20)));
}

#[test]
fn test_service_delivers_event() {
    let mut table = DeviceTable::new(0);
    let mut status = IoStatus::default();
    let mut queue = EventQueue::new();
    table
        .register(u6!(0o20), Box::new(Echo::default()))
        .expect("registration should succeed");
    dispatch(&mut table, &mut status, &mut queue, u6!(0o20), IoSignal::SetControl, 0);
    let (code, when) = queue
        .next_due(Duration::from_secs(1))
        .expect("an event should be due");
    table.service(code, when, &mut status, &mut queue);
    assert!(status.flag(u6!(0o20)));
}

#[test]
fn test_io_signal_from_opcode() {
    assert_eq!(IoSignal::from_opcode(IoOpcode::Halt), None);
    assert_eq!(
        IoSignal::from_opcode(IoOpcode::LoadInto),
        Some(IoSignal::LoadData)
    );
    assert_eq!(
        IoSignal::from_opcode(IoOpcode::ClearControl),
        Some(IoSignal::ClearControl)
    );
}
