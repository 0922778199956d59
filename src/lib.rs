//! Emulator for the LS8, an 8-bit register-based computer: 256 bytes of
//! memory, 8 general-purpose registers, and a fetch-decode-execute loop.

pub mod error;
pub mod memory;
pub mod processor;

pub use error::MachineError;
pub use memory::{Byte, Memory, StdMem, Word};
pub use processor::{Instruction, Processor};
