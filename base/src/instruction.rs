//! Binary representation of instructions.
//!
//! An instruction occupies one 16-bit word.  The instruction class is
//! determined by bit 15 (which, for memory-reference instructions, is
//! the indirect bit), bits 14-12 and bit 10:
//!
//! | bits 14-12 | bit 15 | bit 10 | class                 |
//! |------------|--------|--------|-----------------------|
//! | non-zero   | any    | any    | memory reference      |
//! | 000        | 0      | 0      | shift/rotate          |
//! | 000        | 0      | 1      | alter/skip            |
//! | 000        | 1      | 0      | extended              |
//! | 000        | 1      | 1      | input/output          |
//!
//! Memory-reference instructions look like this:
//!
//! |Indirect|Opcode |Page   |Offset |
//! |--------|-------|-------|-------|
//! |1 bit   |4 bits |1 bit  |10 bits|
//! |(15)    |(14-11)|(10)   |(9-0)  |
//!
//! The page bit selects between the base page (0) and the page
//! containing the instruction (1).
//!
//! Input/output instructions look like this:
//!
//! |1  |000    |A/B |1   |H/C |Sub-opcode|Select code|
//! |---|-------|----|----|----|----------|-----------|
//! |15 |(14-12)|(11)|(10)|(9) |(8-6)     |(5-0)      |
//!
//! For the set/clear flag sub-opcode, the H/C bit selects between STF
//! and CLF.  For the control sub-opcode, the A/B bit selects between
//! STC and CLC.  Otherwise H/C means "clear the device flag
//! afterward".

use std::fmt::{self, Debug, Display, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::{proptest, Arbitrary};

use super::types::{Accumulator, Address, SelectCode};
use super::unsigned::{Unsigned10Bit, Unsigned6Bit};

const INDIRECT_BIT: u16 = 0o100000;
const CURRENT_PAGE_BIT: u16 = 0o2000;
const AB_BIT: u16 = 0o4000;
const HOLD_CLEAR_BIT: u16 = 0o1000;

/// The five broad instruction classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstructionClass {
    MemoryReference(MemoryOpcode),
    ShiftRotate,
    AlterSkip,
    Extended,
    InputOutput(IoOpcode),
}

/// Opcodes of the memory reference group (bits 14-11).
#[repr(u8)]
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemoryOpcode {
    And = 0o2,
    Jsb = 0o3,
    Xor = 0o4,
    Jmp = 0o5,
    Ior = 0o6,
    Isz = 0o7,
    Ada = 0o10,
    Adb = 0o11,
    Cpa = 0o12,
    Cpb = 0o13,
    Lda = 0o14,
    Ldb = 0o15,
    Sta = 0o16,
    Stb = 0o17,
}

impl MemoryOpcode {
    fn from_field(n: u16) -> Option<MemoryOpcode> {
        use MemoryOpcode::*;
        Some(match n {
            0o2 => And,
            0o3 => Jsb,
            0o4 => Xor,
            0o5 => Jmp,
            0o6 => Ior,
            0o7 => Isz,
            0o10 => Ada,
            0o11 => Adb,
            0o12 => Cpa,
            0o13 => Cpb,
            0o14 => Lda,
            0o15 => Ldb,
            0o16 => Sta,
            0o17 => Stb,
            _ => {
                return None;
            }
        })
    }

    /// The accumulator used by the two-register opcodes (ADA/ADB and
    /// so on).  The logical operations always use A.
    pub fn accumulator(self) -> Accumulator {
        use MemoryOpcode::*;
        match self {
            Adb | Cpb | Ldb | Stb => Accumulator::B,
            _ => Accumulator::A,
        }
    }
}

impl Display for MemoryOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use MemoryOpcode::*;
        f.write_str(match self {
            And => "AND",
            Jsb => "JSB",
            Xor => "XOR",
            Jmp => "JMP",
            Ior => "IOR",
            Isz => "ISZ",
            Ada => "ADA",
            Adb => "ADB",
            Cpa => "CPA",
            Cpb => "CPB",
            Lda => "LDA",
            Ldb => "LDB",
            Sta => "STA",
            Stb => "STB",
        })
    }
}

/// Operations of the input/output group, after taking the H/C and
/// A/B bits into account where they select the operation.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IoOpcode {
    Halt,
    SetFlag,
    ClearFlag,
    SkipIfFlagClear,
    SkipIfFlagSet,
    MergeInto,
    LoadInto,
    OutputFrom,
    SetControl,
    ClearControl,
}

impl IoOpcode {
    /// For STF and CLF the H/C bit is part of the opcode rather than
    /// a request to clear the flag afterward.
    pub fn uses_hold_clear_bit(self) -> bool {
        !matches!(self, IoOpcode::SetFlag | IoOpcode::ClearFlag)
    }
}

impl Display for IoOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use IoOpcode::*;
        f.write_str(match self {
            Halt => "HLT",
            SetFlag => "STF",
            ClearFlag => "CLF",
            SkipIfFlagClear => "SFC",
            SkipIfFlagSet => "SFS",
            MergeInto => "MIA",
            LoadInto => "LIA",
            OutputFrom => "OTA",
            SetControl => "STC",
            ClearControl => "CLC",
        })
    }
}

/// The long (B:A) shifts of the extended arithmetic group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LongShift {
    ArithmeticLeft,
    ArithmeticRight,
    LogicalLeft,
    LogicalRight,
    RotateLeft,
    RotateRight,
}

/// Instructions of the dynamic mapping group.  The A/B bit is not
/// part of the opcode; see [`Instruction::accumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DmsOpcode {
    TransferMapsMemory,
    TransferMapsSequential,
    CrossLoad,
    CrossStore,
    CrossCompare,
    LoadFence,
    ReadStatus,
    ReadViolation,
    DisableJump,
    DisableJumpSubroutine,
    SystemJump,
    SystemJumpSubroutine,
    UserJump,
    UserJumpSubroutine,
    SystemMap,
    UserMap,
    PortAMap,
    PortBMap,
    StoreStatus,
    JumpRestoreStatus,
}

impl DmsOpcode {
    fn from_field(n: u16) -> Option<DmsOpcode> {
        use DmsOpcode::*;
        Some(match n {
            0o0 => TransferMapsMemory,
            0o1 => TransferMapsSequential,
            0o4 => CrossLoad,
            0o5 => CrossStore,
            0o6 => CrossCompare,
            0o7 => LoadFence,
            0o10 => ReadStatus,
            0o11 => ReadViolation,
            0o12 => DisableJump,
            0o13 => DisableJumpSubroutine,
            0o14 => SystemJump,
            0o15 => SystemJumpSubroutine,
            0o16 => UserJump,
            0o17 => UserJumpSubroutine,
            0o20 => SystemMap,
            0o21 => UserMap,
            0o22 => PortAMap,
            0o23 => PortBMap,
            0o24 => StoreStatus,
            0o25 => JumpRestoreStatus,
            _ => {
                return None;
            }
        })
    }
}

/// Selects one of the two index registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexRegister {
    X,
    Y,
}

/// Instructions of the index register group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexOpcode {
    /// SAX, SBX, SAY, SBY
    StoreIndexed(IndexRegister),
    /// CAX, CBX, CAY, CBY
    CopyToIndex(IndexRegister),
    /// LAX, LBX, LAY, LBY
    LoadIndexed(IndexRegister),
    /// STX, STY
    StoreIndex(IndexRegister),
    /// CXA, CXB, CYA, CYB
    CopyFromIndex(IndexRegister),
    /// LDX, LDY
    LoadIndex(IndexRegister),
    /// ADX, ADY
    AddToIndex(IndexRegister),
    /// XAX, XBX, XAY, XBY
    ExchangeIndex(IndexRegister),
    /// ISX, ISY
    IncrementSkip(IndexRegister),
    /// DSX, DSY
    DecrementSkip(IndexRegister),
    /// JLY
    JumpLoadY,
    /// JPY
    JumpIndexedY,
}

impl IndexOpcode {
    fn from_field(n: u16) -> Option<IndexOpcode> {
        use IndexOpcode::*;
        use IndexRegister::{X, Y};
        let reg = if n & 0o10 == 0 { X } else { Y };
        Some(match n {
            0o0 | 0o10 => StoreIndexed(reg),
            0o1 | 0o11 => CopyToIndex(reg),
            0o2 | 0o12 => LoadIndexed(reg),
            0o3 | 0o13 => StoreIndex(reg),
            0o4 | 0o14 => CopyFromIndex(reg),
            0o5 | 0o15 => LoadIndex(reg),
            0o6 | 0o16 => AddToIndex(reg),
            0o7 | 0o17 => ExchangeIndex(reg),
            0o20 | 0o30 => IncrementSkip(reg),
            0o21 | 0o31 => DecrementSkip(reg),
            0o22 => JumpLoadY,
            0o32 => JumpIndexedY,
            _ => {
                return None;
            }
        })
    }
}

/// Instructions of the extended class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtendedOpcode {
    Multiply,
    Divide,
    DoubleLoad,
    DoubleStore,
    /// Shift count is 1 to 16.
    Shift(LongShift, u8),
    Dms(DmsOpcode),
    Index(IndexOpcode),
}

/// A single instruction word.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Instruction(u16);

impl Instruction {
    pub const fn new(bits: u16) -> Instruction {
        Instruction(bits)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub fn class(&self) -> InstructionClass {
        if self.0 & 0o070000 != 0 {
            match MemoryOpcode::from_field((self.0 >> 11) & 0o17) {
                Some(op) => InstructionClass::MemoryReference(op),
                // Bits 14-12 are non-zero, so the opcode field is at
                // least 2.
                None => unreachable!("memory reference opcode field out of range"),
            }
        } else {
            match (self.0 & INDIRECT_BIT != 0, self.0 & CURRENT_PAGE_BIT != 0) {
                (false, false) => InstructionClass::ShiftRotate,
                (false, true) => InstructionClass::AlterSkip,
                (true, false) => InstructionClass::Extended,
                (true, true) => InstructionClass::InputOutput(self.io_opcode()),
            }
        }
    }

    /// Bit 15: memory-reference instructions fetch their operand
    /// through one or more levels of indirection.
    pub const fn is_indirect(&self) -> bool {
        self.0 & INDIRECT_BIT != 0
    }

    /// Bit 10: the offset is relative to the current page rather
    /// than the base page.
    pub const fn is_current_page(&self) -> bool {
        self.0 & CURRENT_PAGE_BIT != 0
    }

    pub const fn page_offset(&self) -> Unsigned10Bit {
        Unsigned10Bit::from_low_bits(self.0)
    }

    /// The direct operand address of a memory reference instruction
    /// located at `location`.
    pub fn direct_address(&self, location: Address) -> Address {
        let base = if self.is_current_page() {
            location.page_base()
        } else {
            Address::ZERO
        };
        base | u16::from(self.page_offset())
    }

    /// Bit 11.
    pub const fn accumulator(&self) -> Accumulator {
        if self.0 & AB_BIT == 0 {
            Accumulator::A
        } else {
            Accumulator::B
        }
    }

    /// Bit 9.
    pub const fn hold_clear(&self) -> bool {
        self.0 & HOLD_CLEAR_BIT != 0
    }

    pub const fn select_code(&self) -> SelectCode {
        Unsigned6Bit::from_low_bits((self.0 & 0o77) as u8)
    }

    /// Replaces the select code field, leaving the rest of the
    /// instruction unchanged.
    pub fn with_select_code(&self, code: SelectCode) -> Instruction {
        Instruction((self.0 & !0o77) | u16::from(code))
    }

    fn io_opcode(&self) -> IoOpcode {
        use IoOpcode::*;
        match (self.0 >> 6) & 0o7 {
            0 => Halt,
            1 if self.hold_clear() => ClearFlag,
            1 => SetFlag,
            2 => SkipIfFlagClear,
            3 => SkipIfFlagSet,
            4 => MergeInto,
            5 => LoadInto,
            6 => OutputFrom,
            _ if self.0 & AB_BIT != 0 => ClearControl,
            _ => SetControl,
        }
    }

    /// Decodes an instruction of the extended class.  `None`
    /// indicates an unimplemented instruction (and is also returned
    /// for instructions of other classes).
    pub fn extended_opcode(&self) -> Option<ExtendedOpcode> {
        if self.class() != InstructionClass::Extended {
            return None;
        }
        let count = match self.0 & 0o17 {
            0 => 16,
            n => n as u8,
        };
        match self.0 {
            0o100200 => Some(ExtendedOpcode::Multiply),
            0o100400 => Some(ExtendedOpcode::Divide),
            0o104200 => Some(ExtendedOpcode::DoubleLoad),
            0o104400 => Some(ExtendedOpcode::DoubleStore),
            w if w & 0o171740 == 0o101700 => {
                DmsOpcode::from_field(w & 0o37).map(ExtendedOpcode::Dms)
            }
            w if w & 0o171740 == 0o101740 => {
                IndexOpcode::from_field(w & 0o37).map(ExtendedOpcode::Index)
            }
            w => {
                let shift = match w & 0o177760 {
                    0o100020 => LongShift::ArithmeticLeft,
                    0o100040 => LongShift::LogicalLeft,
                    0o100100 => LongShift::RotateLeft,
                    0o101020 => LongShift::ArithmeticRight,
                    0o101040 => LongShift::LogicalRight,
                    0o101100 => LongShift::RotateRight,
                    _ => {
                        return None;
                    }
                };
                Some(ExtendedOpcode::Shift(shift, count))
            }
        }
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Instruction {
        Instruction(bits)
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:06o})", self.0)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.class() {
            InstructionClass::MemoryReference(op) => {
                write!(
                    f,
                    "{op} {}{:o}{}",
                    if self.is_current_page() { "C:" } else { "Z:" },
                    self.page_offset(),
                    if self.is_indirect() { ",I" } else { "" }
                )
            }
            InstructionClass::InputOutput(op) => {
                write!(
                    f,
                    "{op} {:02o}{}",
                    self.select_code(),
                    if op.uses_hold_clear_bit() && self.hold_clear() {
                        ",C"
                    } else {
                        ""
                    }
                )
            }
            _ => write!(f, "{:06o}", self.0),
        }
    }
}

#[test]
fn test_memory_reference_decode() {
    // LDA 1234,I (current page)
    let inst = Instruction::new(0o162000 | 0o1234 & 0o1777);
    assert_eq!(
        inst.class(),
        InstructionClass::MemoryReference(MemoryOpcode::Lda)
    );
    assert!(inst.is_indirect());
    assert!(inst.is_current_page());
    assert_eq!(u16::from(inst.page_offset()), 0o1234 & 0o1777);
    assert_eq!(
        u16::from(inst.direct_address(Address::from_low_bits(0o12345))),
        0o12000 | (0o1234 & 0o1777)
    );
    // STB 10 (base page)
    let stb = Instruction::new(0o074010);
    assert_eq!(
        stb.class(),
        InstructionClass::MemoryReference(MemoryOpcode::Stb)
    );
    assert_eq!(
        u16::from(stb.direct_address(Address::from_low_bits(0o12345))),
        0o10
    );
}

#[test]
fn test_io_decode() {
    let check = |bits: u16, op: IoOpcode| {
        assert_eq!(Instruction::new(bits).class(), InstructionClass::InputOutput(op));
    };
    check(0o102000, IoOpcode::Halt);
    check(0o102100, IoOpcode::SetFlag);
    check(0o103100, IoOpcode::ClearFlag);
    check(0o102200, IoOpcode::SkipIfFlagClear);
    check(0o102300, IoOpcode::SkipIfFlagSet);
    check(0o102400, IoOpcode::MergeInto);
    check(0o102500, IoOpcode::LoadInto);
    check(0o102600, IoOpcode::OutputFrom);
    check(0o102700, IoOpcode::SetControl);
    check(0o106700, IoOpcode::ClearControl);
    // LIB 12,C
    let lib = Instruction::new(0o107512);
    assert_eq!(lib.accumulator(), Accumulator::B);
    assert!(lib.hold_clear());
    assert_eq!(u8::from(lib.select_code()), 0o12);
    assert_eq!(lib.to_string(), "LIA 12,C");
}

#[test]
fn test_shift_and_alter_decode() {
    assert_eq!(Instruction::new(0).class(), InstructionClass::ShiftRotate);
    assert_eq!(Instruction::new(0o002400).class(), InstructionClass::AlterSkip);
    assert_eq!(Instruction::new(0o006400).class(), InstructionClass::AlterSkip);
}

#[test]
fn test_extended_decode() {
    assert_eq!(
        Instruction::new(0o100200).extended_opcode(),
        Some(ExtendedOpcode::Multiply)
    );
    assert_eq!(
        Instruction::new(0o104400).extended_opcode(),
        Some(ExtendedOpcode::DoubleStore)
    );
    assert_eq!(
        Instruction::new(0o100020).extended_opcode(),
        Some(ExtendedOpcode::Shift(LongShift::ArithmeticLeft, 16))
    );
    assert_eq!(
        Instruction::new(0o101103).extended_opcode(),
        Some(ExtendedOpcode::Shift(LongShift::RotateRight, 3))
    );
    assert_eq!(
        Instruction::new(0o105710).extended_opcode(),
        Some(ExtendedOpcode::Dms(DmsOpcode::ReadStatus))
    );
    assert_eq!(
        Instruction::new(0o101720).extended_opcode(),
        Some(ExtendedOpcode::Dms(DmsOpcode::SystemMap))
    );
    assert_eq!(
        Instruction::new(0o105745).extended_opcode(),
        Some(ExtendedOpcode::Index(IndexOpcode::LoadIndex(IndexRegister::X)))
    );
    assert_eq!(
        Instruction::new(0o105755).extended_opcode(),
        Some(ExtendedOpcode::Index(IndexOpcode::LoadIndex(IndexRegister::Y)))
    );
    assert_eq!(Instruction::new(0o100000).extended_opcode(), None);
    assert_eq!(Instruction::new(0o105726).extended_opcode(), None);
    // Not in the extended class at all.
    assert_eq!(Instruction::new(0o102000).extended_opcode(), None);
}

#[cfg(test)]
#[proptest]
fn class_matches_bit_layout(inst: Instruction) {
    let bits = inst.bits();
    match inst.class() {
        InstructionClass::MemoryReference(op) => {
            assert_ne!(bits & 0o070000, 0);
            assert_eq!(op as u16, (bits >> 11) & 0o17);
        }
        InstructionClass::ShiftRotate => assert_eq!(bits & 0o172000, 0),
        InstructionClass::AlterSkip => assert_eq!(bits & 0o172000, 0o002000),
        InstructionClass::Extended => assert_eq!(bits & 0o172000, 0o100000),
        InstructionClass::InputOutput(_) => assert_eq!(bits & 0o172000, 0o102000),
    }
}

#[cfg(test)]
#[proptest]
fn with_select_code_changes_only_select_code(inst: Instruction, code: Unsigned6Bit) {
    let patched = inst.with_select_code(code);
    assert_eq!(patched.select_code(), code);
    assert_eq!(patched.bits() & !0o77, inst.bits() & !0o77);
}
