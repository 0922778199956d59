use std::cmp::Ordering;
use std::convert::TryFrom;

use crate::error::{MachineError, Result};
use crate::memory::{Byte, Memory, Word};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// Register reserved by convention as the stack pointer.
pub const SP: usize = 7;

/// Initial stack pointer, just below the top of the 256-byte memory. The
/// stack grows downward from here.
pub const STACK_START: Byte = 0xF4;

/// Flag register bit set when the last CMP found its operands equal.
pub const FLAG_EQUAL: Byte = 0b0000_0001;
/// Flag register bit set when the last CMP found `reg_a > reg_b`.
pub const FLAG_GREATER: Byte = 0b0000_0010;
/// Flag register bit set when the last CMP found `reg_a < reg_b`.
pub const FLAG_LESS: Byte = 0b0000_0100;

/// Opcode bit marking instructions whose handler assigns the PC itself.
const SETS_PC_BIT: Byte = 0b0001_0000;

/// Emulates the LS8 CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processor {
    /// General-purpose registers R0..R7. R7 doubles as the stack pointer.
    pub reg: [Byte; NUM_REGISTERS],
    /// Program counter
    pub pc: Word,
    /// Flag register, layout `0b00000LGE`
    pub fl: Byte,
    /// Cleared by HLT; the run loop stops once this is false
    pub running: bool,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    /// Initializes a new CPU with the PC at address 0 and the stack pointer
    /// at its conventional start.
    pub fn new() -> Self {
        let mut reg = [0; NUM_REGISTERS];
        reg[SP] = STACK_START;
        Self {
            reg,
            pc: 0,
            fl: 0,
            running: true,
        }
    }

    fn reg_read(&self, index: Byte) -> Result<Byte> {
        self.reg
            .get(index as usize)
            .copied()
            .ok_or(MachineError::RegisterOutOfRange { index })
    }

    fn reg_write(&mut self, index: Byte, value: Byte) -> Result<()> {
        match self.reg.get_mut(index as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(MachineError::RegisterOutOfRange { index }),
        }
    }

    /// ALU operations: `reg_a = reg_a <op> reg_b`, wrapping at 8 bits.
    ///
    /// CMP mutates only the flag register. NOT ignores `reg_b`.
    pub fn alu(&mut self, op: AluOp, reg_a: Byte, reg_b: Byte) -> Result<()> {
        let a = self.reg_read(reg_a)?;

        let result = match op {
            AluOp::Add => a.wrapping_add(self.reg_read(reg_b)?),
            AluOp::Sub => a.wrapping_sub(self.reg_read(reg_b)?),
            AluOp::Mul => a.wrapping_mul(self.reg_read(reg_b)?),
            AluOp::Mod => {
                let b = self.reg_read(reg_b)?;
                if b == 0 {
                    return Err(MachineError::ModuloByZero { register: reg_b });
                }
                a % b
            }
            // Shifting by 8 or more drains every bit out of the register.
            AluOp::Shl => a.checked_shl(self.reg_read(reg_b)? as u32).unwrap_or(0),
            AluOp::Shr => a.checked_shr(self.reg_read(reg_b)? as u32).unwrap_or(0),
            AluOp::Xor => a ^ self.reg_read(reg_b)?,
            AluOp::Or => a | self.reg_read(reg_b)?,
            AluOp::Not => !a,
            AluOp::Cmp => {
                let b = self.reg_read(reg_b)?;
                self.fl = match a.cmp(&b) {
                    Ordering::Less => FLAG_LESS,
                    Ordering::Greater => FLAG_GREATER,
                    Ordering::Equal => FLAG_EQUAL,
                };
                return Ok(());
            }
        };

        self.reg_write(reg_a, result)
    }

    /// Pushes `value` onto the stack: decrement SP, store at memory[SP].
    fn push<const S: usize>(&mut self, memory: &mut Memory<S>, value: Byte) -> Result<()> {
        let sp = self.reg[SP].wrapping_sub(1);
        self.reg[SP] = sp;
        memory.write_byte(sp as Word, value)
    }

    /// Pops a value off the stack: read memory[SP], increment SP.
    fn pop<const S: usize>(&mut self, memory: &Memory<S>) -> Result<Byte> {
        let sp = self.reg[SP];
        let value = memory.read_byte(sp as Word)?;
        self.reg[SP] = sp.wrapping_add(1);
        Ok(value)
    }

    /// Executes a single decoded instruction.
    ///
    /// Handlers for instructions carrying the sets-PC bit assign the PC
    /// themselves; everyone else relies on [`Processor::step`] advancing it.
    pub fn execute_instruction<const S: usize>(
        &mut self,
        instruction: Instruction,
        operand_a: Byte,
        operand_b: Byte,
        memory: &mut Memory<S>,
    ) -> Result<()> {
        match instruction {
            Instruction::NOP => {
                debug!("NOP");
            }
            Instruction::HLT => {
                self.running = false;

                debug!("HLT");
            }
            Instruction::LDI => {
                self.reg_write(operand_a, operand_b)?;

                debug!("LDI R{} {}", operand_a, operand_b);
            }
            Instruction::PRN => {
                let value = self.reg_read(operand_a)?;
                println!("{}", value);

                debug!("PRN R{}: {}", operand_a, value);
            }
            Instruction::ADD => self.alu(AluOp::Add, operand_a, operand_b)?,
            Instruction::SUB => self.alu(AluOp::Sub, operand_a, operand_b)?,
            Instruction::MUL => self.alu(AluOp::Mul, operand_a, operand_b)?,
            Instruction::MOD => self.alu(AluOp::Mod, operand_a, operand_b)?,
            Instruction::CMP => self.alu(AluOp::Cmp, operand_a, operand_b)?,
            Instruction::SHL => self.alu(AluOp::Shl, operand_a, operand_b)?,
            Instruction::SHR => self.alu(AluOp::Shr, operand_a, operand_b)?,
            Instruction::XOR => self.alu(AluOp::Xor, operand_a, operand_b)?,
            Instruction::OR => self.alu(AluOp::Or, operand_a, operand_b)?,
            Instruction::NOT => self.alu(AluOp::Not, operand_a, operand_b)?,
            Instruction::PUSH => {
                let value = self.reg_read(operand_a)?;
                self.push(memory, value)?;

                debug!("PUSH R{}: {}", operand_a, value);
            }
            Instruction::POP => {
                let value = self.pop(memory)?;
                self.reg_write(operand_a, value)?;

                debug!("POP R{}: {}", operand_a, value);
            }
            Instruction::CALL => {
                let target = self.reg_read(operand_a)? as Word;
                let ret = self.pc + 2;
                self.push(memory, ret as Byte)?;
                self.pc = target;

                debug!("CALL R{} -> 0x{:02X}", operand_a, target);
            }
            Instruction::RET => {
                let ret = self.pop(memory)? as Word;
                self.pc = ret;

                debug!("RET -> 0x{:02X}", ret);
            }
            Instruction::JMP => {
                self.pc = self.reg_read(operand_a)? as Word;

                debug!("JMP R{} -> 0x{:02X}", operand_a, self.pc);
            }
            Instruction::JEQ => {
                if (self.fl & FLAG_EQUAL) != 0 {
                    self.pc = self.reg_read(operand_a)? as Word;
                } else {
                    // Carries the sets-PC bit, so the fall-through advance
                    // happens here rather than in the run loop.
                    self.pc += instruction.operands() + 1;
                }

                debug!("JEQ R{} -> 0x{:02X}", operand_a, self.pc);
            }
            Instruction::JNE => {
                if (self.fl & FLAG_EQUAL) == 0 {
                    self.pc = self.reg_read(operand_a)? as Word;
                } else {
                    self.pc += instruction.operands() + 1;
                }

                debug!("JNE R{} -> 0x{:02X}", operand_a, self.pc);
            }
        }

        Ok(())
    }

    /// Runs one fetch-decode-execute step.
    ///
    /// Both operand bytes are read up front, whether or not the instruction
    /// uses them; a fetch reaching past the end of memory is a fault.
    pub fn step<const S: usize>(&mut self, memory: &mut Memory<S>) -> Result<()> {
        if log_enabled!(Level::Trace) {
            self.trace(memory);
        }

        let opcode = memory.read_byte(self.pc)?;
        let operand_a = memory.read_byte(self.pc + 1)?;
        let operand_b = memory.read_byte(self.pc + 2)?;

        let instruction =
            Instruction::try_from(opcode).map_err(|_| MachineError::UnknownInstruction {
                opcode,
                address: self.pc,
            })?;

        self.execute_instruction(instruction, operand_a, operand_b, memory)?;

        if !instruction.sets_pc() {
            self.pc += instruction.operands() + 1;
        }

        Ok(())
    }

    /// Runs the program until HLT or a fatal machine error.
    pub fn run<const S: usize>(&mut self, memory: &mut Memory<S>) -> Result<()> {
        while self.running {
            self.step(memory)?;
        }

        debug!("halted at 0x{:02X}", self.pc);

        Ok(())
    }

    /// Logs the CPU state: PC, the three bytes at PC, and all registers.
    pub fn trace<const S: usize>(&self, memory: &Memory<S>) {
        let window = (0..3)
            .map(|offset| match memory.read_byte(self.pc + offset) {
                Ok(byte) => format!("{:02X}", byte),
                Err(_) => "??".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        let registers = self
            .reg
            .iter()
            .map(|value| format!("{:02X}", value))
            .collect::<Vec<_>>()
            .join(" ");

        trace!("TRACE: {:02X} | {} | {}", self.pc, window, registers);
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// The LS8 instruction set.
        ///
        /// The encoding carries the decoder's contract: the two top bits are
        /// the operand count and bit 4 marks instructions that set the PC
        /// themselves.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// No operation
    NOP = 0b0000_0000,
    /// Stop the execution of the program
    HLT = 0b0000_0001,
    /// Pop the return address off the stack and jump back to it
    RET = 0b0001_0001,
    /// Push a register onto the stack
    /// @param register The register to push
    PUSH = 0b0100_0101,
    /// Pop the top of the stack into a register
    /// @param register The register to pop into
    POP = 0b0100_0110,
    /// Print a register as a decimal number
    /// @param register The register to print
    PRN = 0b0100_0111,
    /// Push the return address and jump to the address held in a register
    /// @param register The register holding the subroutine address
    CALL = 0b0101_0000,
    /// Jump to the address held in a register
    /// @param register The register holding the target address
    JMP = 0b0101_0100,
    /// Jump if the equal flag is set
    /// @param register The register holding the target address
    JEQ = 0b0101_0101,
    /// Jump if the equal flag is clear
    /// @param register The register holding the target address
    JNE = 0b0101_0110,
    /// Bitwise-NOT a register in place
    /// @param register The register to invert
    NOT = 0b0110_1001,
    /// Load an immediate value into a register
    /// @param register The destination register
    /// @param value The value to load
    LDI = 0b1000_0010,
    /// `reg_a += reg_b`
    ADD = 0b1010_0000,
    /// `reg_a -= reg_b`
    SUB = 0b1010_0001,
    /// `reg_a *= reg_b`
    MUL = 0b1010_0010,
    /// `reg_a %= reg_b`; a zero divisor is a fatal error
    MOD = 0b1010_0100,
    /// Compare two registers and record the outcome in the flag register
    CMP = 0b1010_0111,
    /// `reg_a |= reg_b`
    OR = 0b1010_1010,
    /// `reg_a ^= reg_b`
    XOR = 0b1010_1011,
    /// `reg_a <<= reg_b`
    SHL = 0b1010_1100,
    /// `reg_a >>= reg_b`
    SHR = 0b1010_1101,
}

impl Instruction {
    /// Number of operand bytes following the opcode, encoded in its two
    /// most-significant bits.
    pub fn operands(self) -> Word {
        (self as Byte >> 6) as Word
    }

    /// Whether this instruction's handler assigns the PC itself. When true
    /// the run loop must not auto-advance after dispatch.
    pub fn sets_pc(self) -> bool {
        (self as Byte & SETS_PC_BIT) != 0
    }
}

/// Operation selector for [`Processor::alu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Mod,
    Cmp,
    Shl,
    Shr,
    Xor,
    Or,
    Not,
}

#[cfg(test)]
mod tests {
    use crate::memory::StdMem;
    use crate::write_instructions;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_every_opcode_is_decodable() {
        for &instruction in Instruction::ALL {
            assert_eq!(
                Instruction::try_from(instruction as Byte),
                Ok(instruction),
                "{} does not round-trip through its encoding",
                instruction.name(),
            );
            assert!(instruction.operands() <= 2);
        }
    }

    #[test]
    fn test_decoder_operand_counts() {
        assert_eq!(Instruction::NOP.operands(), 0);
        assert_eq!(Instruction::HLT.operands(), 0);
        assert_eq!(Instruction::RET.operands(), 0);
        assert_eq!(Instruction::PRN.operands(), 1);
        assert_eq!(Instruction::CALL.operands(), 1);
        assert_eq!(Instruction::LDI.operands(), 2);
        assert_eq!(Instruction::MUL.operands(), 2);
    }

    #[test]
    fn test_decoder_sets_pc() {
        assert!(Instruction::CALL.sets_pc());
        assert!(Instruction::RET.sets_pc());
        assert!(Instruction::JMP.sets_pc());
        // Both conditional jumps carry the bit, so their fall-through path
        // must advance the PC inside the handler.
        assert!(Instruction::JEQ.sets_pc());
        assert!(Instruction::JNE.sets_pc());

        assert!(!Instruction::HLT.sets_pc());
        assert!(!Instruction::LDI.sets_pc());
        assert!(!Instruction::PUSH.sets_pc());
    }

    #[test]
    fn test_no_operation() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        mem.data[0] = Instruction::NOP as Byte;
        cpu.step(&mut mem)?;

        let mut cpu2 = Processor::new();
        cpu2.pc = 1;
        assert_eq!(cpu, cpu2);

        Ok(())
    }

    #[test]
    fn test_halt() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        mem.data[0] = Instruction::HLT as Byte;
        cpu.step(&mut mem)?;

        assert!(!cpu.running);
        assert_eq!(cpu.pc, 1);

        Ok(())
    }

    #[test]
    fn test_halt_stops_the_run_loop() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 0, 1, HLT, LDI, 0, 99)?;
        cpu.run(&mut mem)?;

        // Nothing past HLT ever executes.
        assert_eq!(cpu.reg[0], 1);

        Ok(())
    }

    #[test]
    fn test_load_immediate() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 3, 42)?;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.reg[3], 42);
        assert_eq!(cpu.pc, 3);

        Ok(())
    }

    #[test]
    fn test_add_wraps_at_8_bits() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 250;
        cpu.reg[1] = 10;
        mem.data[0] = Instruction::ADD as Byte;
        mem.data[1] = 0;
        mem.data[2] = 1;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.reg[0], ((250u16 + 10) % 256) as Byte);
        assert_eq!(cpu.pc, 3);

        Ok(())
    }

    #[test]
    fn test_alu_arithmetic() -> Result<()> {
        let mut cpu = Processor::new();

        cpu.reg[0] = 8;
        cpu.reg[1] = 9;
        cpu.alu(AluOp::Mul, 0, 1)?;
        assert_eq!(cpu.reg[0], 72);

        cpu.reg[0] = 7;
        cpu.reg[1] = 9;
        cpu.alu(AluOp::Sub, 0, 1)?;
        assert_eq!(cpu.reg[0], 254); // 7 - 9 wraps

        cpu.reg[0] = 17;
        cpu.reg[1] = 5;
        cpu.alu(AluOp::Mod, 0, 1)?;
        assert_eq!(cpu.reg[0], 2);

        Ok(())
    }

    #[test]
    fn test_alu_bitwise() -> Result<()> {
        let mut cpu = Processor::new();

        cpu.reg[0] = 0b1100;
        cpu.reg[1] = 0b1010;
        cpu.alu(AluOp::Xor, 0, 1)?;
        assert_eq!(cpu.reg[0], 0b0110);

        cpu.reg[0] = 0b1100;
        cpu.alu(AluOp::Or, 0, 1)?;
        assert_eq!(cpu.reg[0], 0b1110);

        cpu.reg[0] = 0b0000_1111;
        cpu.alu(AluOp::Not, 0, 0)?;
        assert_eq!(cpu.reg[0], 0b1111_0000);

        cpu.reg[0] = 0b0000_0011;
        cpu.reg[1] = 2;
        cpu.alu(AluOp::Shl, 0, 1)?;
        assert_eq!(cpu.reg[0], 0b0000_1100);

        cpu.alu(AluOp::Shr, 0, 1)?;
        assert_eq!(cpu.reg[0], 0b0000_0011);

        // A shift of 8 or more clears the register instead of wrapping the
        // shift amount.
        cpu.reg[0] = 0xFF;
        cpu.reg[1] = 8;
        cpu.alu(AluOp::Shl, 0, 1)?;
        assert_eq!(cpu.reg[0], 0);

        Ok(())
    }

    #[test]
    fn test_alu_modulo_by_zero() {
        let mut cpu = Processor::new();

        cpu.reg[0] = 17;
        cpu.reg[1] = 0;
        assert_eq!(
            cpu.alu(AluOp::Mod, 0, 1),
            Err(MachineError::ModuloByZero { register: 1 })
        );
    }

    #[test]
    fn test_compare_sets_flags() -> Result<()> {
        let mut cpu = Processor::new();

        cpu.reg[0] = 5;
        cpu.reg[1] = 5;
        cpu.alu(AluOp::Cmp, 0, 1)?;
        assert_eq!(cpu.fl, FLAG_EQUAL);

        cpu.reg[1] = 3;
        cpu.alu(AluOp::Cmp, 0, 1)?;
        assert_eq!(cpu.fl, FLAG_GREATER);

        cpu.reg[1] = 9;
        cpu.alu(AluOp::Cmp, 0, 1)?;
        assert_eq!(cpu.fl, FLAG_LESS);

        Ok(())
    }

    #[test]
    fn test_jump() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[2] = 0x20;
        mem.data[0] = Instruction::JMP as Byte;
        mem.data[1] = 2;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.pc, 0x20);

        Ok(())
    }

    #[test]
    fn test_jump_if_equal_taken() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 0x20;
        cpu.fl = FLAG_EQUAL;
        mem.data[0] = Instruction::JEQ as Byte;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.pc, 0x20);

        Ok(())
    }

    #[test]
    fn test_jump_if_equal_not_taken_advances() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 0x20;
        cpu.fl = 0;
        mem.data[0] = Instruction::JEQ as Byte;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.pc, 2);

        Ok(())
    }

    #[test]
    fn test_jump_if_not_equal_taken() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 0x20;
        cpu.fl = 0;
        mem.data[0] = Instruction::JNE as Byte;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.pc, 0x20);

        Ok(())
    }

    #[test]
    fn test_jump_if_not_equal_not_taken_advances() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 0x20;
        cpu.fl = FLAG_EQUAL;
        mem.data[0] = Instruction::JNE as Byte;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.pc, 2);

        Ok(())
    }

    #[test]
    fn test_push_writes_below_stack_start() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        cpu.reg[0] = 42;
        mem.data[0] = Instruction::PUSH as Byte;
        cpu.step(&mut mem)?;

        assert_eq!(cpu.reg[SP], STACK_START - 1);
        assert_eq!(mem.data[(STACK_START - 1) as usize], 42);

        Ok(())
    }

    #[test]
    fn test_push_pop_round_trip() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 0, 42, PUSH, 0, POP, 1, HLT)?;
        cpu.run(&mut mem)?;

        assert_eq!(cpu.reg[1], 42);
        assert_eq!(cpu.reg[SP], STACK_START);

        Ok(())
    }

    #[test]
    fn test_call_and_return() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        // 0: LDI R1,7   3: CALL R1   5: HLT   6: NOP
        // 7: LDI R0,42  10: RET
        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 1, 7, CALL, 1, HLT, NOP, LDI, 0, 42, RET)?;

        // The CALL at address 3 pushes its return address.
        cpu.step(&mut mem)?;
        cpu.step(&mut mem)?;
        assert_eq!(cpu.pc, 7);
        assert_eq!(cpu.reg[SP], STACK_START - 1);
        assert_eq!(mem.data[(STACK_START - 1) as usize], 5);

        // The RET lands on the instruction after CALL's operand byte.
        cpu.step(&mut mem)?;
        cpu.step(&mut mem)?;
        assert_eq!(cpu.pc, 5);
        assert_eq!(cpu.reg[SP], STACK_START);

        cpu.run(&mut mem)?;
        assert!(!cpu.running);
        assert_eq!(cpu.reg[0], 42);

        Ok(())
    }

    #[test]
    fn test_unknown_opcode() {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        mem.data[0] = 0xFF;
        assert_eq!(
            cpu.step(&mut mem),
            Err(MachineError::UnknownInstruction {
                opcode: 0xFF,
                address: 0,
            })
        );
    }

    #[test]
    fn test_register_index_out_of_range() {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 9, 1).unwrap();
        assert_eq!(
            cpu.step(&mut mem),
            Err(MachineError::RegisterOutOfRange { index: 9 })
        );
    }

    #[test]
    fn test_fetch_past_end_of_memory() {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        // The operand bytes are always fetched, even for HLT; past the last
        // address that is a fault, not a wrap.
        mem.data[0xFF] = Instruction::HLT as Byte;
        cpu.pc = 0xFF;
        assert_eq!(
            cpu.step(&mut mem),
            Err(MachineError::AddressOutOfRange { address: 0x100 })
        );
    }

    #[test]
    fn test_multiply_program() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        use Instruction::*;
        write_instructions!(mem : 0 => LDI, 0, 8, LDI, 1, 9, MUL, 0, 1, PRN, 0, HLT)?;
        cpu.run(&mut mem)?;

        assert!(!cpu.running);
        assert_eq!(cpu.reg[0], 72);

        Ok(())
    }

    #[test]
    fn test_compare_then_branch_program() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new();

        // JEQ skips the LDI R3,99 block when R0 == R1.
        // 0: LDI R0,10  3: LDI R1,10  6: LDI R2,19  9: CMP R0,R1
        // 12: JEQ R2    14: LDI R3,99 17: HLT (skipped)
        // 19: LDI R3,1  22: HLT
        use Instruction::*;
        write_instructions!(mem : 0 =>
            LDI, 0, 10,
            LDI, 1, 10,
            LDI, 2, 19,
            CMP, 0, 1,
            JEQ, 2,
            LDI, 3, 99,
            HLT,
            NOP,
            LDI, 3, 1,
            HLT,
        )?;
        cpu.run(&mut mem)?;

        assert_eq!(cpu.reg[3], 1);

        Ok(())
    }
}
