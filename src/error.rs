use thiserror::Error;

use crate::memory::{Byte, Word};

/// A fatal condition hit while executing a program.
///
/// Every variant stops the machine; none of them are recoverable or retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    /// The byte at the program counter is not in the instruction set.
    #[error("unknown instruction 0b{opcode:08b} at address 0x{address:02X}")]
    UnknownInstruction { opcode: Byte, address: Word },

    /// A memory access outside of the 256-byte address space.
    #[error("memory address 0x{address:04X} is out of range")]
    AddressOutOfRange { address: Word },

    /// A register operand outside of R0..R7.
    #[error("register index {index} is out of range")]
    RegisterOutOfRange { index: Byte },

    /// MOD with a zero divisor.
    #[error("modulo by zero: register R{register} holds 0")]
    ModuloByZero { register: Byte },
}

pub type Result<T, E = MachineError> = std::result::Result<T, E>;
