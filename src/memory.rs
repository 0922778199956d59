use crate::error::{MachineError, Result};

pub mod parse;

pub type Byte = u8; // 1 byte
pub type Word = u16; // wide enough to address all of memory without wrapping

/// The LS8 address space: 256 byte-sized cells.
pub const MEMORY_SIZE: usize = 256;

/// Default memory
pub type StdMem = Memory<MEMORY_SIZE>;

/// Emulates memory for use with the CPU.
///
/// Backs both the program image (loaded at address 0) and the stack, which
/// grows downward from just below the top of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Reads a byte from the memory.
    ///
    /// # Errors
    ///
    /// Out-of-range addresses are a fatal machine fault, never a silent wrap.
    pub fn read_byte(&self, address: Word) -> Result<Byte> {
        self.data
            .get(address as usize)
            .copied()
            .ok_or(MachineError::AddressOutOfRange { address })
    }

    /// Writes a byte to the memory.
    ///
    /// # Errors
    ///
    /// Out-of-range addresses are a fatal machine fault, never a silent wrap.
    pub fn write_byte(&mut self, address: Word, value: Byte) -> Result<()> {
        match self.data.get_mut(address as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(MachineError::AddressOutOfRange { address }),
        }
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, address: Word, data: &[Byte]) -> Result<()> {
        let start = address as usize;
        let end = start + data.len();
        if end > S {
            return Err(MachineError::AddressOutOfRange {
                address: end.min(u16::MAX as usize) as Word,
            });
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ $(,)? ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ])
    };
}
