//! Hand-assembled ELF64 fixtures
//!
//! Only the parts the symbol loader reads are emitted: the file header, the
//! section header table, `.shstrtab`, and whatever sections a test adds. No
//! program headers.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_DYNSYM: u32 = 11;

pub const SHN_ABS: u16 = 0xfff1;

const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;
const SYM_SIZE: usize = 24;

pub struct FixtureSymbol {
    pub name: &'static str,
    pub value: u64,
    pub size: u64,
    pub shndx: u16,
}

impl FixtureSymbol {
    pub fn new(name: &'static str, value: u64, size: u64, shndx: u16) -> Self {
        Self { name, value, size, shndx }
    }
}

struct FixtureSection {
    name: String,
    sh_type: u32,
    addr: u64,
    align: u64,
    link: u32,
    entsize: u64,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct ElfBuilder {
    sections: Vec<FixtureSection>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next added section will get; 0 is the null section
    pub fn next_index(&self) -> u16 {
        u16::try_from(self.sections.len() + 1).unwrap()
    }

    /// Add a code section of `size` zero bytes
    pub fn text(self, name: &str, addr: u64, align: u64, size: usize) -> Self {
        self.section(name, SHT_PROGBITS, addr, align, 0, 0, vec![0x90; size])
    }

    /// Add a symbol section and its string section
    pub fn symbols(self, symtab: &str, strtab: &str, symbols: &[FixtureSymbol]) -> Self {
        let sh_type = if symtab == ".dynsym" { SHT_DYNSYM } else { SHT_SYMTAB };
        self.symbols_with_tail(symtab, strtab, sh_type, symbols, &[])
    }

    /// Like [`symbols`](Self::symbols), with extra bytes after the last record
    pub fn symbols_with_tail(
        self,
        symtab: &str,
        strtab: &str,
        sh_type: u32,
        symbols: &[FixtureSymbol],
        tail: &[u8],
    ) -> Self {
        let mut strings = vec![0u8];
        let mut records = vec![0u8; SYM_SIZE];

        for symbol in symbols {
            let name_offset = u32::try_from(strings.len()).unwrap();
            strings.extend_from_slice(symbol.name.as_bytes());
            strings.push(0);

            records.extend_from_slice(&name_offset.to_le_bytes());
            records.push(0x12); // STB_GLOBAL, STT_FUNC
            records.push(0);
            records.extend_from_slice(&symbol.shndx.to_le_bytes());
            records.extend_from_slice(&symbol.value.to_le_bytes());
            records.extend_from_slice(&symbol.size.to_le_bytes());
        }
        records.extend_from_slice(tail);

        let strtab_index = u32::from(self.next_index());
        self.section(strtab, SHT_STRTAB, 0, 1, 0, 0, strings).section(
            symtab,
            sh_type,
            0,
            8,
            strtab_index,
            SYM_SIZE as u64,
            records,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn section(
        mut self,
        name: &str,
        sh_type: u32,
        addr: u64,
        align: u64,
        link: u32,
        entsize: u64,
        data: Vec<u8>,
    ) -> Self {
        self.sections.push(FixtureSection {
            name: name.to_string(),
            sh_type,
            addr,
            align,
            link,
            entsize,
            data,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(u32::try_from(shstrtab.len()).unwrap());
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = u32::try_from(shstrtab.len()).unwrap();
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut out = vec![0u8; EHDR_SIZE];
        let mut offsets = Vec::new();
        for data in self.sections.iter().map(|s| &s.data).chain(std::iter::once(&shstrtab)) {
            pad_to_8(&mut out);
            offsets.push(out.len() as u64);
            out.extend_from_slice(data);
        }
        pad_to_8(&mut out);
        let shoff = out.len() as u64;

        // Null section
        out.extend_from_slice(&[0u8; SHDR_SIZE]);
        for (i, section) in self.sections.iter().enumerate() {
            write_shdr(
                &mut out,
                name_offsets[i],
                section.sh_type,
                section.addr,
                offsets[i],
                section.data.len() as u64,
                section.link,
                section.align,
                section.entsize,
            );
        }
        let shstrndx = self.sections.len() + 1;
        write_shdr(
            &mut out,
            shstrtab_name,
            SHT_STRTAB,
            0,
            offsets[self.sections.len()],
            shstrtab.len() as u64,
            0,
            1,
            0,
        );

        let shnum = u16::try_from(self.sections.len() + 2).unwrap();
        let header = elf_header(shoff, shnum, u16::try_from(shstrndx).unwrap());
        out[..EHDR_SIZE].copy_from_slice(&header);
        out
    }

    /// Write the image to a temporary file
    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.build()).unwrap();
        file.flush().unwrap();
        file
    }
}

fn pad_to_8(out: &mut Vec<u8>) {
    while out.len() % 8 != 0 {
        out.push(0);
    }
}

fn elf_header(shoff: u64, shnum: u16, shstrndx: u16) -> Vec<u8> {
    let mut h = Vec::with_capacity(EHDR_SIZE);
    h.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    h.extend_from_slice(&[0u8; 8]);
    h.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    h.extend_from_slice(&62u16.to_le_bytes()); // EM_X86_64
    h.extend_from_slice(&1u32.to_le_bytes());
    h.extend_from_slice(&0x40_0000u64.to_le_bytes()); // e_entry
    h.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
    h.extend_from_slice(&shoff.to_le_bytes());
    h.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    h.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    h.extend_from_slice(&56u16.to_le_bytes()); // e_phentsize
    h.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
    h.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes());
    h.extend_from_slice(&shnum.to_le_bytes());
    h.extend_from_slice(&shstrndx.to_le_bytes());
    h
}

#[allow(clippy::too_many_arguments)]
fn write_shdr(
    out: &mut Vec<u8>,
    name: u32,
    sh_type: u32,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    align: u64,
    entsize: u64,
) {
    out.extend_from_slice(&name.to_le_bytes());
    out.extend_from_slice(&sh_type.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // sh_flags
    out.extend_from_slice(&addr.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&link.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // sh_info
    out.extend_from_slice(&align.to_le_bytes());
    out.extend_from_slice(&entsize.to_le_bytes());
}

/// `main` at 0x4006a4 in a `.text` at 0x400000 (page aligned, so the load base is 0x400000)
pub fn hello_world() -> ElfBuilder {
    let builder = ElfBuilder::new();
    let text = builder.next_index();
    builder.text(".text", 0x40_0000, 0x1000, 0x800).symbols(
        ".symtab",
        ".strtab",
        &[
            FixtureSymbol::new("_start", 0x40_0400, 0x2a, text),
            FixtureSymbol::new("main", 0x40_06a4, 0xb, text),
        ],
    )
}
