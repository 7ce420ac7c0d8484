//! The two DMA channels.
//!
//! A channel is set up by the program through its select codes (see
//! `control::internal`), then started by setting its command bit
//! (STC 6 or STC 7).  Thereafter each time the channel's device
//! raises its service request the channel steals one memory cycle to
//! move one word, without the program's involvement.  Channel 0 has
//! priority over channel 1.
use std::fmt::{self, Debug, Formatter};

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::io::IoSignal;
use crate::iostatus::{select_code, IoStatus};
use crate::mapping::MapSelector;

const CW1_STC: u16 = 0o100000;
const CW1_CLC: u16 = 0o020000;
const CW2_INPUT: u16 = 0o100000;

/// Each channel reaches memory through its own port map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DmaPort {
    A,
    B,
}

impl DmaPort {
    pub fn map(self) -> MapSelector {
        match self {
            DmaPort::A => MapSelector::PortA,
            DmaPort::B => MapSelector::PortB,
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DmaChannel {
    /// Control word 1: completion actions and the device select code.
    control_word: u16,
    address: Address,
    input: bool,
    /// Two's complement count of words remaining.
    count: u16,
}

impl Debug for DmaChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaChannel")
            .field("control_word", &format_args!("{:06o}", self.control_word))
            .field("address", &format_args!("{:05o}", self.address))
            .field("input", &self.input)
            .field("count", &format_args!("{:06o}", self.count))
            .finish()
    }
}

impl DmaChannel {
    pub fn load_control_word(&mut self, word: u16) {
        self.control_word = word;
    }

    /// Loads control word 2: bit 15 is set for input (device to
    /// memory), bits 14-0 are the memory address.
    pub fn load_address_word(&mut self, word: u16) {
        self.input = word & CW2_INPUT != 0;
        self.address = Address::from_low_bits(word);
    }

    /// Loads control word 3, the negated word count.
    pub fn load_count(&mut self, word: u16) {
        self.count = word;
    }

    pub fn device(&self) -> SelectCode {
        SelectCode::from_low_bits((self.control_word & 0o77) as u8)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn is_input(&self) -> bool {
        self.input
    }

    fn stc_at_end(&self) -> bool {
        self.control_word & CW1_STC != 0
    }

    fn clc_at_end(&self) -> bool {
        self.control_word & CW1_CLC != 0
    }
}

/// The DMA channels' view of the rest of the machine.
pub trait DmaBus {
    fn status_mut(&mut self) -> &mut IoStatus;
    fn read_word(&mut self, port: DmaPort, address: Address) -> u16;
    fn write_word(&mut self, port: DmaPort, address: Address, value: u16);
    /// Sends `signal` to the device at `code`, returning its data.
    fn signal(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> u16;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DmaController {
    channels: [DmaChannel; 2],
}

impl DmaController {
    pub fn new() -> DmaController {
        DmaController::default()
    }

    /// The control select code (6 or 7) of channel `n`.
    pub fn control_select_code(n: usize) -> SelectCode {
        if n == 0 {
            select_code::DMA_CONTROL_0
        } else {
            select_code::DMA_CONTROL_1
        }
    }

    pub fn channel(&self, n: usize) -> &DmaChannel {
        &self.channels[n]
    }

    pub fn channel_mut(&mut self, n: usize) -> &mut DmaChannel {
        &mut self.channels[n]
    }

    /// Returns the channel (if any) which should transfer a word now.
    pub fn request(&self, status: &IoStatus) -> Option<usize> {
        (0..self.channels.len()).find(|&n| {
            status.command(Self::control_select_code(n))
                && status.service_request(self.channels[n].device())
        })
    }

    /// Performs one transfer cycle on channel `n`.  Returns true if
    /// that completed the block.
    pub fn cycle(&mut self, n: usize, bus: &mut dyn DmaBus) -> bool {
        let port = if n == 0 { DmaPort::A } else { DmaPort::B };
        let ch = &mut self.channels[n];
        let device = ch.device();
        if ch.input {
            let data = bus.signal(device, IoSignal::LoadData, 0);
            bus.write_word(port, ch.address, data);
        } else {
            let data = bus.read_word(port, ch.address);
            bus.signal(device, IoSignal::OutputData, data);
        }
        ch.address = ch.address.wrapping_increment();
        ch.count = ch.count.wrapping_add(1);

        if ch.count != 0 {
            if ch.stc_at_end() {
                bus.signal(device, IoSignal::SetControl, 0);
            }
            bus.signal(device, IoSignal::ClearFlag, 0);
            return false;
        }

        let (stc, clc) = (ch.stc_at_end(), ch.clc_at_end());
        if ch.input {
            if clc {
                bus.signal(device, IoSignal::ClearControl, 0);
                bus.signal(device, IoSignal::ClearFlag, 0);
            }
        } else {
            if !stc && !clc {
                bus.signal(device, IoSignal::ClearFlag, 0);
            }
            if stc {
                bus.signal(device, IoSignal::SetControl, 0);
                bus.signal(device, IoSignal::ClearFlag, 0);
            }
            if clc {
                bus.signal(device, IoSignal::ClearControl, 0);
            }
        }
        let own = Self::control_select_code(n);
        let status = bus.status_mut();
        status.set_flag(own);
        status.clear_command(own);
        bus.signal(device, IoSignal::EndOfTransfer, 0);
        event!(
            Level::DEBUG,
            "DMA channel {} completed a block for select code {:02o}",
            n,
            device
        );
        true
    }

    pub fn reset(&mut self) {
        *self = DmaController::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::u6;

    /// A bus whose single device always requests service and
    /// supplies ascending data.
    struct FakeBus {
        status: IoStatus,
        memory: Vec<u16>,
        next_input: u16,
        signals: Vec<(SelectCode, IoSignal)>,
        output: Vec<u16>,
    }

    impl FakeBus {
        fn new() -> FakeBus {
            let mut status = IoStatus::default();
            status.set_service_request(u6!(0o12));
            FakeBus {
                status,
                memory: vec![0; 32768],
                next_input: 0o100,
                signals: Vec::new(),
                output: Vec::new(),
            }
        }
    }

    impl DmaBus for FakeBus {
        fn status_mut(&mut self) -> &mut IoStatus {
            &mut self.status
        }

        fn read_word(&mut self, _port: DmaPort, address: Address) -> u16 {
            self.memory[usize::from(address)]
        }

        fn write_word(&mut self, _port: DmaPort, address: Address, value: u16) {
            self.memory[usize::from(address)] = value;
        }

        fn signal(&mut self, code: SelectCode, signal: IoSignal, data: u16) -> u16 {
            self.signals.push((code, signal));
            match signal {
                IoSignal::LoadData => {
                    self.next_input += 1;
                    self.next_input
                }
                IoSignal::OutputData => {
                    self.output.push(data);
                    data
                }
                _ => data,
            }
        }
    }

    fn start(dma: &mut DmaController, bus: &mut FakeBus, cw1: u16, cw2: u16, count: u16) {
        let ch = dma.channel_mut(0);
        ch.load_control_word(cw1);
        ch.load_address_word(cw2);
        ch.load_count(count);
        bus.status.set_command(select_code::DMA_CONTROL_0);
    }

    #[test]
    fn test_count_of_minus_one_moves_one_word() {
        let mut dma = DmaController::new();
        let mut bus = FakeBus::new();
        start(&mut dma, &mut bus, 0o12, 0o100000 | 0o2000, 0o177777);
        assert_eq!(dma.request(&bus.status), Some(0));
        assert!(dma.cycle(0, &mut bus));
        assert_eq!(bus.memory[0o2000], 0o101);
        assert_eq!(bus.memory[0o2001], 0);
        assert!(bus.status.flag(select_code::DMA_CONTROL_0));
        assert!(!bus.status.command(select_code::DMA_CONTROL_0));
        assert_eq!(dma.request(&bus.status), None);
        assert_eq!(bus.signals.last(), Some(&(u6!(0o12), IoSignal::EndOfTransfer)));
    }

    #[test]
    fn test_count_of_zero_moves_65536_words() {
        let mut dma = DmaController::new();
        let mut bus = FakeBus::new();
        start(&mut dma, &mut bus, 0o12, 0o100000, 0);
        for i in 0..65535 {
            assert!(!dma.cycle(0, &mut bus), "completed early at word {i}");
        }
        assert!(dma.cycle(0, &mut bus));
        // The address wrapped around twice.
        assert_eq!(dma.channel(0).address(), Address::ZERO);
    }

    #[test]
    fn test_output_sequencing() {
        let mut dma = DmaController::new();
        let mut bus = FakeBus::new();
        bus.memory[0o300] = 0o11;
        bus.memory[0o301] = 0o22;
        start(&mut dma, &mut bus, CW1_STC | CW1_CLC | 0o12, 0o300, 0o177776);
        assert!(!dma.cycle(0, &mut bus));
        assert_eq!(
            bus.signals,
            vec![
                (u6!(0o12), IoSignal::OutputData),
                (u6!(0o12), IoSignal::SetControl),
                (u6!(0o12), IoSignal::ClearFlag),
            ]
        );
        bus.signals.clear();
        assert!(dma.cycle(0, &mut bus));
        assert_eq!(
            bus.signals,
            vec![
                (u6!(0o12), IoSignal::OutputData),
                (u6!(0o12), IoSignal::SetControl),
                (u6!(0o12), IoSignal::ClearFlag),
                (u6!(0o12), IoSignal::ClearControl),
                (u6!(0o12), IoSignal::EndOfTransfer),
            ]
        );
        assert_eq!(bus.output, vec![0o11, 0o22]);
    }

    #[test]
    fn test_input_last_cycle_with_clc() {
        let mut dma = DmaController::new();
        let mut bus = FakeBus::new();
        start(&mut dma, &mut bus, CW1_CLC | 0o12, CW2_INPUT | 0o500, 0o177777);
        assert!(dma.cycle(0, &mut bus));
        assert_eq!(
            bus.signals,
            vec![
                (u6!(0o12), IoSignal::LoadData),
                (u6!(0o12), IoSignal::ClearControl),
                (u6!(0o12), IoSignal::ClearFlag),
                (u6!(0o12), IoSignal::EndOfTransfer),
            ]
        );
    }

    #[test]
    fn test_channel_zero_has_priority() {
        let mut dma = DmaController::new();
        let mut bus = FakeBus::new();
        dma.channel_mut(0).load_control_word(0o12);
        dma.channel_mut(1).load_control_word(0o12);
        bus.status.set_command(select_code::DMA_CONTROL_1);
        assert_eq!(dma.request(&bus.status), Some(1));
        bus.status.set_command(select_code::DMA_CONTROL_0);
        assert_eq!(dma.request(&bus.status), Some(0));
        bus.status.clear_service_request(u6!(0o12));
        assert_eq!(dma.request(&bus.status), None);
    }
}
