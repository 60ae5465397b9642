//! Loads a statically linked RV32I ELF image's `.text` section into a
//! word vector suitable for [`crate::instr_mem::InstrMem::new`].
//!
//! Grounded on the same `elf` crate usage the host harness has always
//! reached for (`ElfBytes::minimal_parse` + `section_header_by_name`),
//! but every `expect()` there becomes a `Result` here: this module is
//! library code, not a one-off test fixture.

use std::path::Path;

use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::Uxlen;

#[derive(Debug, Error)]
pub enum ElfLoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse ELF file: {0}")]
    Parse(String),

    #[error("ELF file has no .text section")]
    MissingText,

    #[error(".text section data is compressed, which this loader does not support")]
    CompressedText,

    #[error(".text section is not a whole number of 32-bit words ({0} bytes)")]
    Misaligned(usize),
}

/// Reads `path`, extracts its `.text` section, and returns it as a
/// vector of little-endian 32-bit words (word `i` is byte address `4 *
/// i`), ready to hand to `InstrMem::new`.
pub fn load_elf(path: &Path) -> Result<Vec<Uxlen>, ElfLoadError> {
    let file_data = std::fs::read(path).map_err(|source| ElfLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let file = ElfBytes::<AnyEndian>::minimal_parse(&file_data)
        .map_err(|e| ElfLoadError::Parse(e.to_string()))?;

    let text_shdr = file
        .section_header_by_name(".text")
        .map_err(|e| ElfLoadError::Parse(e.to_string()))?
        .ok_or(ElfLoadError::MissingText)?;

    let (data, compression) = file
        .section_data(&text_shdr)
        .map_err(|e| ElfLoadError::Parse(e.to_string()))?;

    if compression.is_some() {
        return Err(ElfLoadError::CompressedText);
    }

    if data.len() % 4 != 0 {
        return Err(ElfLoadError::Misaligned(data.len()));
    }

    Ok(data
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes(word.try_into().expect("chunks_exact(4) yields 4 bytes")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_elf(Path::new("/nonexistent/path/to/nowhere.elf")).unwrap_err();
        assert!(matches!(err, ElfLoadError::Io { .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let dir = std::env::temp_dir();
        let path = dir.join("rv32i_sim_elf_loader_garbage_test.bin");
        std::fs::write(&path, b"not an elf file").unwrap();
        let err = load_elf(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ElfLoadError::Parse(_)));
    }
}
