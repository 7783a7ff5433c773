//! ELF64 file header.

use super::{ELF_MAGIC, ElfError, ElfResult, Fields, slice};

const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

/// Object file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfType {
    None,
    Relocatable,
    Executable,
    SharedObject,
    Core,
    Unknown(u16),
}

impl From<u16> for ElfType {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Relocatable,
            2 => Self::Executable,
            3 => Self::SharedObject,
            4 => Self::Core,
            other => Self::Unknown(other),
        }
    }
}

/// The parts of the ELF64 header needed to find the section table.
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    pub e_type: ElfType,
    pub e_machine: u16,
    /// Section header table file offset
    pub e_shoff: u64,
    /// Section header table entry size
    pub e_shentsize: u16,
    /// Section header table entry count
    pub e_shnum: u16,
    /// Section header string table index
    pub e_shstrndx: u16,
}

impl ElfHeader {
    /// Size of an ELF64 header in bytes.
    pub const SIZE: u64 = 64;

    /// Parse the header at the start of `data`.
    ///
    /// # Errors
    ///
    /// Fails on bad magic, a non-ELF64 class, big-endian data, or a
    /// buffer shorter than the header.
    pub fn parse(data: &[u8]) -> ElfResult<Self> {
        if data.get(0..4) != Some(&ELF_MAGIC[..]) {
            return Err(ElfError::InvalidMagic);
        }
        let raw = Fields::new(slice(data, "ELF header", 0, Self::SIZE)?);

        let class = raw.u8(EI_CLASS);
        if class != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass(class));
        }
        let encoding = raw.u8(EI_DATA);
        if encoding != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEncoding(encoding));
        }

        Ok(Self {
            e_type: ElfType::from(raw.u16(16)),
            e_machine: raw.u16(18),
            e_shoff: raw.u64(40),
            e_shentsize: raw.u16(58),
            e_shnum: raw.u16(60),
            e_shstrndx: raw.u16(62),
        })
    }

    /// Check if this is a shared object.
    pub fn is_shared_object(&self) -> bool {
        self.e_type == ElfType::SharedObject
    }
}
