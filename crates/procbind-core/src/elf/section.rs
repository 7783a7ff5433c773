//! ELF64 section header table.

use super::{ElfError, ElfResult, Fields, header::ElfHeader, slice};

/// Section type, limited to the kinds the export reader cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    Null,
    Symtab,
    Strtab,
    Dynamic,
    Dynsym,
    Other(u32),
}

impl From<u32> for SectionType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Null,
            2 => Self::Symtab,
            3 => Self::Strtab,
            6 => Self::Dynamic,
            11 => Self::Dynsym,
            other => Self::Other(other),
        }
    }
}

/// ELF64 section header.
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    /// Section name (index into the section name string table)
    pub sh_name: u32,
    pub sh_type: SectionType,
    /// Offset in file
    pub sh_offset: u64,
    /// Size in bytes
    pub sh_size: u64,
    /// Index of the associated section (string table for symbol tables)
    pub sh_link: u32,
    /// Entry size if section holds a table
    pub sh_entsize: u64,
}

impl SectionHeader {
    /// Size of an ELF64 section header in bytes.
    pub const SIZE: u64 = 64;

    fn parse(raw: &[u8]) -> Self {
        let raw = Fields::new(raw);
        Self {
            sh_name: raw.u32(0),
            sh_type: SectionType::from(raw.u32(4)),
            sh_offset: raw.u64(24),
            sh_size: raw.u64(32),
            sh_link: raw.u32(40),
            sh_entsize: raw.u64(56),
        }
    }
}

/// Parse every section header described by `header`.
pub fn parse_section_headers(data: &[u8], header: &ElfHeader) -> ElfResult<Vec<SectionHeader>> {
    let entsize = u64::from(header.e_shentsize);
    if header.e_shnum > 0 && entsize < SectionHeader::SIZE {
        return Err(ElfError::OutOfBounds {
            what: "section header entry",
            offset: header.e_shoff,
            len: entsize,
        });
    }
    let table = slice(
        data,
        "section header table",
        header.e_shoff,
        entsize * u64::from(header.e_shnum),
    )?;

    Ok(table
        .chunks_exact(entsize.max(1) as usize)
        .map(SectionHeader::parse)
        .collect())
}
