//! ELF64 dynamic symbol entries.

use super::{ElfError, ElfResult, Fields, section::SectionHeader, slice};

/// Undefined section index.
const SHN_UNDEF: u16 = 0;

/// Symbol binding (scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    Unknown(u8),
}

impl From<u8> for SymbolBinding {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Local,
            1 => Self::Global,
            2 => Self::Weak,
            other => Self::Unknown(other),
        }
    }
}

/// Symbol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    NoType,
    Object,
    Func,
    /// GNU indirect function; resolves to a function at load time
    IFunc,
    Other(u8),
}

impl From<u8> for SymbolType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NoType,
            1 => Self::Object,
            2 => Self::Func,
            10 => Self::IFunc,
            other => Self::Other(other),
        }
    }
}

/// ELF64 symbol table entry.
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    /// Symbol name (index into string table)
    pub st_name: u32,
    /// Type and binding
    pub st_info: u8,
    /// Visibility
    pub st_other: u8,
    /// Section index
    pub st_shndx: u16,
    pub st_value: u64,
}

impl Symbol {
    /// Size of an ELF64 symbol entry in bytes.
    pub const SIZE: u64 = 24;

    fn parse(raw: &[u8]) -> Self {
        let raw = Fields::new(raw);
        Self {
            st_name: raw.u32(0),
            st_info: raw.u8(4),
            st_other: raw.u8(5),
            st_shndx: raw.u16(6),
            st_value: raw.u64(8),
        }
    }

    pub fn binding(&self) -> SymbolBinding {
        SymbolBinding::from(self.st_info >> 4)
    }

    pub fn symbol_type(&self) -> SymbolType {
        SymbolType::from(self.st_info & 0xf)
    }

    pub fn is_defined(&self) -> bool {
        self.st_shndx != SHN_UNDEF
    }

    /// Default or protected visibility.
    pub fn is_visible(&self) -> bool {
        matches!(self.st_other & 0x3, 0 | 3)
    }

    /// Defined, visible, global or weak function (including IFUNCs).
    pub fn is_exported_function(&self) -> bool {
        self.is_defined()
            && self.is_visible()
            && matches!(self.binding(), SymbolBinding::Global | SymbolBinding::Weak)
            && matches!(self.symbol_type(), SymbolType::Func | SymbolType::IFunc)
    }
}

/// Parse every entry of the symbol table described by `section`.
pub fn parse_symbols(data: &[u8], section: &SectionHeader) -> ElfResult<Vec<Symbol>> {
    let entsize = if section.sh_entsize == 0 {
        Symbol::SIZE
    } else {
        section.sh_entsize
    };
    if entsize < Symbol::SIZE {
        return Err(ElfError::OutOfBounds {
            what: "symbol entry",
            offset: section.sh_offset,
            len: entsize,
        });
    }
    let table = slice(data, "symbol table", section.sh_offset, section.sh_size)?;
    Ok(table
        .chunks_exact(entsize as usize)
        .map(Symbol::parse)
        .collect())
}

/// Get a NUL-terminated string from a string table.
pub fn get_string(strtab: &[u8], index: u32) -> ElfResult<&str> {
    let tail = strtab
        .get(index as usize..)
        .ok_or(ElfError::InvalidStringIndex(index))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ElfError::InvalidStringIndex(index))?;
    core::str::from_utf8(&tail[..end]).map_err(|_| ElfError::InvalidUtf8(index))
}
