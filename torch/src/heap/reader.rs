//! Decoding V8 heap objects out of another process's memory

use log::debug;
use std::fs::File;
use std::io;

use super::layout::HeapLayout;
use super::source::MemorySource;
use crate::domain::{HeapError, Pid};

/// Default nesting limit for cons strings
pub const DEFAULT_MAX_CONS_DEPTH: usize = 5;

/// Returned once the cons string nesting limit is reached
pub const ELLIPSIS: &str = "...";
/// Name or file placeholder; also the decoding of a zero-length string
pub const EMPTY: &str = "[empty]";
/// Line placeholder; also the decoding of a string of unknown shape
pub const UNKNOWN: &str = "[unknown]";

/// Clear the heap-object tag bit
fn untag(value: u64) -> u64 {
    value & !1
}

/// Reads V8 objects through a [`MemorySource`]
///
/// Every field access is a fresh read: the target's heap keeps mutating, so
/// nothing is cached and two reads of the same address may disagree. The
/// scratch buffer makes a reader unsuitable for concurrent use; give each
/// caller its own.
pub struct HeapMemoryReader<S> {
    source: S,
    layout: HeapLayout,
    max_cons_depth: usize,
    buffer: [u8; 8],
}

impl HeapMemoryReader<File> {
    /// Open `/proc/<pid>/mem`
    ///
    /// # Errors
    /// Returns an error if the memory file cannot be opened, typically because
    /// the caller may not ptrace the target
    pub fn open(pid: Pid) -> io::Result<Self> {
        Self::open_with_layout(pid, HeapLayout::default())
    }

    /// Open `/proc/<pid>/mem` and decode it with `layout`
    ///
    /// # Errors
    /// Same as [`HeapMemoryReader::open`]
    pub fn open_with_layout(pid: Pid, layout: HeapLayout) -> io::Result<Self> {
        Ok(Self::with_layout(File::open(pid.mem_path())?, layout))
    }
}

impl<S: MemorySource> HeapMemoryReader<S> {
    pub fn new(source: S) -> Self {
        Self::with_layout(source, HeapLayout::default())
    }

    pub fn with_layout(source: S, layout: HeapLayout) -> Self {
        Self { source, layout, max_cons_depth: DEFAULT_MAX_CONS_DEPTH, buffer: [0; 8] }
    }

    #[must_use]
    pub fn with_max_cons_depth(mut self, depth: usize) -> Self {
        self.max_cons_depth = depth;
        self
    }

    #[must_use]
    pub fn layout(&self) -> &HeapLayout {
        &self.layout
    }

    fn read_bytes(&mut self, addr: u64, len: usize) -> Result<&[u8], HeapError> {
        self.buffer.fill(0);
        let buf = &mut self.buffer[..len];
        self.source.read_at(addr, buf).map_err(|source| HeapError::Read { addr, len, source })?;
        Ok(buf)
    }

    /// # Errors
    /// Returns an error if the byte cannot be read
    pub fn read_u8(&mut self, addr: u64) -> Result<u8, HeapError> {
        Ok(self.read_bytes(addr, 1)?[0])
    }

    /// # Errors
    /// Returns an error if the bytes cannot be read
    pub fn read_u16(&mut self, addr: u64) -> Result<u16, HeapError> {
        let bytes = self.read_bytes(addr, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// # Errors
    /// Returns an error if the bytes cannot be read
    pub fn read_u32(&mut self, addr: u64) -> Result<u32, HeapError> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// # Errors
    /// Returns an error if the bytes cannot be read
    pub fn read_u64(&mut self, addr: u64) -> Result<u64, HeapError> {
        self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes(self.buffer))
    }

    /// Read a small integer, which lives in the high word of a tagged value
    ///
    /// # Errors
    /// Returns an error if the word cannot be read
    pub fn read_smi(&mut self, addr: u64) -> Result<i64, HeapError> {
        let raw = self.read_u64(addr)?;
        Ok(i64::from_le_bytes(raw.to_le_bytes()) >> 32)
    }

    /// Follow a tagged field: untag the field address, read, untag the result
    ///
    /// # Errors
    /// Returns an error if the word cannot be read
    pub fn read_pointer(&mut self, addr: u64) -> Result<u64, HeapError> {
        Ok(untag(self.read_u64(untag(addr))?))
    }

    /// Instance type of the object at `object`, read through its map
    ///
    /// # Errors
    /// Returns an error if the map pointer or the type byte cannot be read
    pub fn read_instance_type(&mut self, object: u64) -> Result<u8, HeapError> {
        let map = self.read_pointer(object.wrapping_add(self.layout.heap_object_map))?;
        self.read_u8(map.wrapping_add(self.layout.map_instance_type))
    }

    /// # Errors
    /// Returns an error if the length field cannot be read
    pub fn read_string_length(&mut self, string: u64) -> Result<i64, HeapError> {
        self.read_smi(string.wrapping_add(self.layout.string_length))
    }

    /// Decode the string at `string`
    ///
    /// A zero-length string decodes to `[empty]`, a string of unrecognised
    /// shape to `[unknown]`, and cons strings nested past the depth limit to
    /// `...`. Flat strings of either encoding are cut at `max_string_chars`.
    ///
    /// # Errors
    /// Returns an error if any field of the string cannot be read
    pub fn read_string(&mut self, string: u64) -> Result<String, HeapError> {
        self.read_string_at_depth(string, 0)
    }

    fn read_string_at_depth(&mut self, string: u64, depth: usize) -> Result<String, HeapError> {
        if depth >= self.max_cons_depth {
            return Ok(ELLIPSIS.to_string());
        }

        let string = untag(string);
        let shape = self.read_instance_type(string)? & self.layout.string_repr_mask;
        let length = self.read_string_length(string)?;

        if length <= 0 {
            return Ok(EMPTY.to_string());
        }

        let chars = usize::try_from(length).map_or(self.layout.max_string_chars, |n| {
            n.min(self.layout.max_string_chars)
        });
        let data = string.wrapping_add(self.layout.seq_string_data);

        if shape == self.layout.one_byte_seq_shape() {
            self.read_one_byte_chars(data, chars)
        } else if shape == self.layout.string_layout_seq {
            self.read_two_byte_chars(data, chars)
        } else if shape & self.layout.string_layout_mask == self.layout.string_layout_cons {
            self.read_cons_string(string, depth + 1)
        } else {
            debug!("String 0x{string:x} has unknown shape 0x{shape:02x}");
            Ok(UNKNOWN.to_string())
        }
    }

    fn read_one_byte_chars(&mut self, data: u64, chars: usize) -> Result<String, HeapError> {
        let mut out = String::with_capacity(chars);
        for addr in (0..chars as u64).map(|i| data.wrapping_add(i)) {
            out.push(char::from(self.read_u8(addr)?));
        }
        Ok(out)
    }

    fn read_two_byte_chars(&mut self, data: u64, chars: usize) -> Result<String, HeapError> {
        let mut units = Vec::with_capacity(chars);
        for addr in (0..chars as u64).map(|i| data.wrapping_add(2 * i)) {
            units.push(self.read_u16(addr)?);
        }
        Ok(String::from_utf16_lossy(&units))
    }

    /// Both halves are read one level below `depth`, so each cons level costs
    /// two levels of the limit
    fn read_cons_string(&mut self, string: u64, depth: usize) -> Result<String, HeapError> {
        let first = self.read_pointer(string.wrapping_add(self.layout.cons_string_first))?;
        let second = self.read_pointer(string.wrapping_add(self.layout.cons_string_second))?;

        let mut out = self.read_string_at_depth(first, depth + 1)?;
        out.push_str(&self.read_string_at_depth(second, depth + 1)?);
        Ok(out)
    }

    /// # Errors
    /// Returns an error if the length field cannot be read
    pub fn read_fixed_array_length(&mut self, array: u64) -> Result<i64, HeapError> {
        self.read_smi(array.wrapping_add(self.layout.fixed_array_length))
    }

    /// # Errors
    /// Returns an error if the element cannot be read
    pub fn read_fixed_array_smi(&mut self, array: u64, index: u64) -> Result<i64, HeapError> {
        let element = array
            .wrapping_add(self.layout.fixed_array_header_size)
            .wrapping_add(index.wrapping_mul(8));
        self.read_smi(element)
    }

    /// The `SharedFunctionInfo` of a `JSFunction`
    ///
    /// # Errors
    /// Returns an error if the pointer cannot be read
    pub fn read_shared_info(&mut self, function: u64) -> Result<u64, HeapError> {
        self.read_pointer(function.wrapping_add(self.layout.js_function_shared_info))
    }

    /// Function name, falling back to the inferred name for anonymous functions
    ///
    /// # Errors
    /// Returns an error if either name string cannot be read
    pub fn read_function_name(&mut self, shared: u64) -> Result<String, HeapError> {
        let mut name = self.read_pointer(shared.wrapping_add(self.layout.shared_info_name))?;
        if self.read_string_length(name)? == 0 {
            name = self.read_pointer(shared.wrapping_add(self.layout.shared_info_inferred_name))?;
        }
        self.read_string(name)
    }

    /// Name of the script the function was compiled from
    ///
    /// # Errors
    /// Returns an error if the script or its name cannot be read
    pub fn read_function_file_name(&mut self, shared: u64) -> Result<String, HeapError> {
        let script = self.read_pointer(shared.wrapping_add(self.layout.shared_info_script))?;
        let name = self.read_pointer(script.wrapping_add(self.layout.script_name))?;
        self.read_string(name)
    }

    /// 1-based source line of the function's start position
    ///
    /// Binary searches the script's line ends for the first line ending at or
    /// after the start position, then adds the script's own line offset.
    ///
    /// # Errors
    /// Returns an error if a field cannot be read, the line ends are not a
    /// fixed array, or the position lies past the last line
    pub fn read_function_line_number(&mut self, shared: u64) -> Result<i64, HeapError> {
        let packed = self.read_u32(shared.wrapping_add(self.layout.shared_info_start_position))?;
        let start_position = i64::from(packed >> self.layout.start_position_shift);

        let script = self.read_pointer(shared.wrapping_add(self.layout.shared_info_script))?;
        let line_ends = self.read_pointer(script.wrapping_add(self.layout.script_line_ends))?;
        let line_offset = self.read_smi(script.wrapping_add(self.layout.script_line_offset))?;

        let found = self.read_instance_type(line_ends)?;
        if found != self.layout.fixed_array_type {
            return Err(HeapError::UnexpectedType {
                addr: line_ends,
                expected: self.layout.fixed_array_type,
                found,
            });
        }

        let not_found = HeapError::NotFound {
            script,
            position: u64::from(packed >> self.layout.start_position_shift),
        };

        let size = self.read_fixed_array_length(line_ends)?;
        if size <= 0 {
            return Err(not_found);
        }

        let mut low: u64 = 0;
        let mut high = size.unsigned_abs() - 1;
        while low < high {
            let mid = low + (high - low) / 2;
            if self.read_fixed_array_smi(line_ends, mid)? < start_position {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        if self.read_fixed_array_smi(line_ends, low)? < start_position {
            return Err(not_found);
        }

        let line = i64::try_from(low)
            .ok()
            .and_then(|low| low.checked_add(1)?.checked_add(line_offset))
            .unwrap_or(0);
        if line < 1 {
            return Err(HeapError::NegativeLine(line));
        }

        Ok(line)
    }

    /// Symbolicate a `JSFunction` pointer as `name:file:line`
    ///
    /// Each part is decoded on its own; a part that fails becomes `[empty]`
    /// (name, file) or `[unknown]` (line). Never fails as a whole.
    pub fn read_function(&mut self, function: u64) -> String {
        let shared = match self.read_shared_info(function) {
            Ok(shared) => shared,
            Err(e) => {
                debug!("No shared info for function 0x{function:x}: {e}");
                return format!("{EMPTY}:{EMPTY}:{UNKNOWN}");
            }
        };

        let name = self.read_function_name(shared).unwrap_or_else(|e| {
            debug!("Function name of 0x{function:x}: {e}");
            EMPTY.to_string()
        });

        let file = self.read_function_file_name(shared).unwrap_or_else(|e| {
            debug!("File name of 0x{function:x}: {e}");
            EMPTY.to_string()
        });

        let line = self.read_function_line_number(shared).map_or_else(
            |e| {
                debug!("Line number of 0x{function:x}: {e}");
                UNKNOWN.to_string()
            },
            |line| line.to_string(),
        );

        format!("{name}:{file}:{line}")
    }
}
