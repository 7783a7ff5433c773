//! ELF64 export-table reader.
//!
//! Just enough ELF parsing to list what a shared object exports: the file
//! header, the section header table, and the dynamic symbol table with its
//! string table. Only 64-bit little-endian objects are understood. ELF has no
//! export ordinals, so every entry is name-only.

pub mod header;
pub mod section;
pub mod symbol;

pub use header::{ElfHeader, ElfType};
pub use section::{SectionHeader, SectionType};
pub use symbol::{Symbol, SymbolBinding, SymbolType};

use crate::ident::ExportEntry;

/// ELF magic bytes: "\x7fELF"
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Error type for ELF parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElfError {
    /// Invalid ELF magic bytes
    InvalidMagic,
    /// Not an ELF64 object
    UnsupportedClass(u8),
    /// Not little-endian
    UnsupportedEncoding(u8),
    /// A table points outside the file
    OutOfBounds {
        what: &'static str,
        offset: u64,
        len: u64,
    },
    /// Invalid string table index
    InvalidStringIndex(u32),
    /// String table entry is not UTF-8
    InvalidUtf8(u32),
    /// No `.dynsym` section
    NoDynamicSymbols,
}

impl core::fmt::Display for ElfError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid ELF magic"),
            Self::UnsupportedClass(c) => write!(f, "unsupported ELF class: {c}"),
            Self::UnsupportedEncoding(e) => write!(f, "unsupported data encoding: {e}"),
            Self::OutOfBounds { what, offset, len } => {
                write!(f, "{what} at {offset:#x} (+{len:#x}) is outside the file")
            }
            Self::InvalidStringIndex(idx) => write!(f, "invalid string index: {idx}"),
            Self::InvalidUtf8(idx) => write!(f, "string at index {idx} is not UTF-8"),
            Self::NoDynamicSymbols => write!(f, "object has no dynamic symbol table"),
        }
    }
}

impl std::error::Error for ElfError {}

/// Result type for ELF operations.
pub type ElfResult<T> = Result<T, ElfError>;

/// Bounds-checked slice of `data`.
pub(crate) fn slice<'a>(
    data: &'a [u8],
    what: &'static str,
    offset: u64,
    len: u64,
) -> ElfResult<&'a [u8]> {
    let oob = ElfError::OutOfBounds { what, offset, len };
    let start = usize::try_from(offset).map_err(|_| oob.clone())?;
    let size = usize::try_from(len).map_err(|_| oob.clone())?;
    let end = start.checked_add(size).ok_or_else(|| oob.clone())?;
    data.get(start..end).ok_or(oob)
}

/// Little-endian field reader over a fixed-size record.
pub(crate) struct Fields<'a> {
    bytes: &'a [u8],
}

impl<'a> Fields<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn u8(&self, at: usize) -> u8 {
        self.bytes[at]
    }

    pub(crate) fn u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    pub(crate) fn u32(&self, at: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[at..at + 4]);
        u32::from_le_bytes(raw)
    }

    pub(crate) fn u64(&self, at: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[at..at + 8]);
        u64::from_le_bytes(raw)
    }
}

/// List the functions a shared object exports, sorted by name.
///
/// Only defined, globally visible (global or weak, default or protected
/// visibility) function symbols are returned; versioned duplicates collapse
/// into one entry. Names that are not UTF-8 cannot be looked up by name and
/// are skipped.
pub fn exported_symbols(data: &[u8]) -> ElfResult<Vec<ExportEntry>> {
    let header = ElfHeader::parse(data)?;
    let sections = section::parse_section_headers(data, &header)?;

    let dynsym = sections
        .iter()
        .find(|s| s.sh_type == SectionType::Dynsym)
        .ok_or(ElfError::NoDynamicSymbols)?;
    let strtab_header = sections
        .get(dynsym.sh_link as usize)
        .ok_or(ElfError::OutOfBounds {
            what: "dynamic string table",
            offset: u64::from(dynsym.sh_link),
            len: 0,
        })?;
    let strtab = slice(
        data,
        "dynamic string table",
        strtab_header.sh_offset,
        strtab_header.sh_size,
    )?;

    let mut names: Vec<String> = Vec::new();
    for sym in symbol::parse_symbols(data, dynsym)? {
        if !sym.is_exported_function() {
            continue;
        }
        let name = match symbol::get_string(strtab, sym.st_name) {
            Ok(name) => name,
            Err(ElfError::InvalidUtf8(_)) => continue,
            Err(err) => return Err(err),
        };
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    names.sort();
    names.dedup();

    Ok(names.into_iter().map(ExportEntry::named).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Synthetic shared-object builder for parser tests.

    /// Build a minimal ELF64 shared object whose `.dynsym` holds `symbols`
    /// as `(name, st_info, st_other, st_shndx)` tuples.
    pub(crate) fn build_shared_object(symbols: &[(&str, u8, u8, u16)]) -> Vec<u8> {
        let mut strtab = vec![0u8];
        let mut dynsym = vec![0u8; 24]; // null symbol
        for (name, info, other, shndx) in symbols {
            let name_off = strtab.len() as u32;
            strtab.extend_from_slice(name.as_bytes());
            strtab.push(0);
            let mut sym = [0u8; 24];
            sym[0..4].copy_from_slice(&name_off.to_le_bytes());
            sym[4] = *info;
            sym[5] = *other;
            sym[6..8].copy_from_slice(&shndx.to_le_bytes());
            sym[8..16].copy_from_slice(&0x1000u64.to_le_bytes());
            dynsym.extend_from_slice(&sym);
        }

        let dynsym_off = 64u64;
        let strtab_off = dynsym_off + dynsym.len() as u64;
        let shoff = strtab_off + strtab.len() as u64;

        let mut out = vec![0u8; 64];
        out[0..4].copy_from_slice(&super::ELF_MAGIC);
        out[4] = 2; // ELFCLASS64
        out[5] = 1; // ELFDATA2LSB
        out[6] = 1;
        out[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
        out[18..20].copy_from_slice(&62u16.to_le_bytes()); // x86_64
        out[40..48].copy_from_slice(&shoff.to_le_bytes());
        out[52..54].copy_from_slice(&64u16.to_le_bytes());
        out[58..60].copy_from_slice(&64u16.to_le_bytes());
        out[60..62].copy_from_slice(&3u16.to_le_bytes()); // null, .dynsym, .dynstr
        out.extend_from_slice(&dynsym);
        out.extend_from_slice(&strtab);

        let section = |ty: u32, offset: u64, size: u64, link: u32, entsize: u64| {
            let mut sh = [0u8; 64];
            sh[4..8].copy_from_slice(&ty.to_le_bytes());
            sh[24..32].copy_from_slice(&offset.to_le_bytes());
            sh[32..40].copy_from_slice(&size.to_le_bytes());
            sh[40..44].copy_from_slice(&link.to_le_bytes());
            sh[56..64].copy_from_slice(&entsize.to_le_bytes());
            sh
        };
        out.extend_from_slice(&[0u8; 64]);
        out.extend_from_slice(&section(11, dynsym_off, dynsym.len() as u64, 2, 24));
        out.extend_from_slice(&section(3, strtab_off, strtab.len() as u64, 0, 0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testing::build_shared_object;
    use super::*;

    const GLOBAL_FUNC: u8 = 0x12;
    const WEAK_FUNC: u8 = 0x22;
    const LOCAL_FUNC: u8 = 0x02;
    const GLOBAL_OBJECT: u8 = 0x11;
    const HIDDEN: u8 = 2;

    #[test]
    fn lists_only_exported_functions() {
        let so = build_shared_object(&[
            ("strcmp", GLOBAL_FUNC, 0, 1),
            ("puts", GLOBAL_FUNC, 0, 1),
            ("memcpy", WEAK_FUNC, 0, 1),
            ("helper", LOCAL_FUNC, 0, 1),
            ("environ", GLOBAL_OBJECT, 0, 1),
            ("hidden_fn", GLOBAL_FUNC, HIDDEN, 1),
            ("imported", GLOBAL_FUNC, 0, 0),
            ("puts", GLOBAL_FUNC, 0, 1),
        ]);
        let exports = exported_symbols(&so).unwrap();
        let names: Vec<_> = exports.iter().filter_map(|e| e.name.as_deref()).collect();
        assert_eq!(names, ["memcpy", "puts", "strcmp"]);
        assert!(exports.iter().all(|e| e.ordinal.is_none()));
    }

    #[test]
    fn non_utf8_names_are_skipped() {
        let mut so = build_shared_object(&[("cafX", GLOBAL_FUNC, 0, 1), ("puts", GLOBAL_FUNC, 0, 1)]);
        let at = so
            .windows(5)
            .position(|w| w == b"cafX\0")
            .unwrap();
        so[at + 3] = 0xe9;

        let exports = exported_symbols(&so).unwrap();
        assert_eq!(exports, [ExportEntry::named("puts")]);
    }

    #[test]
    fn rejects_non_elf_input() {
        assert_eq!(
            exported_symbols(b"MZ\x90\0not an elf file at all, just some bytes......................"),
            Err(ElfError::InvalidMagic)
        );
    }

    #[test]
    fn truncated_input_is_out_of_bounds() {
        let mut so = build_shared_object(&[("puts", GLOBAL_FUNC, 0, 1)]);
        so.truncate(so.len() - 10);
        assert!(matches!(
            exported_symbols(&so),
            Err(ElfError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn slice_checks_overflow() {
        let data = [0u8; 8];
        assert!(slice(&data, "t", 4, 4).is_ok());
        assert!(slice(&data, "t", 4, 5).is_err());
        assert!(slice(&data, "t", u64::MAX, 2).is_err());
    }
}
