//! Object layout of the V8 heap
//!
//! Offsets are in bytes from the start of an object (the untagged pointer).
//! The defaults describe the x64 V8 shipped with node 0.10; other builds move
//! fields around, so the whole table can be overridden from JSON. Fields
//! missing from the JSON keep their default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapLayout {
    /// Every heap object starts with a pointer to its map
    pub heap_object_map: u64,
    /// One-byte instance type inside a map
    pub map_instance_type: u64,

    pub string_length: u64,
    pub seq_string_data: u64,
    pub cons_string_first: u64,
    pub cons_string_second: u64,
    pub string_repr_mask: u8,
    pub string_encoding_one_byte: u8,
    pub string_layout_mask: u8,
    pub string_layout_seq: u8,
    pub string_layout_cons: u8,
    /// Upper bound on characters read from one flat string
    pub max_string_chars: usize,

    pub fixed_array_type: u8,
    pub fixed_array_length: u64,
    pub fixed_array_header_size: u64,

    pub js_function_shared_info: u64,

    pub shared_info_name: u64,
    pub shared_info_inferred_name: u64,
    pub shared_info_script: u64,
    /// Packed start position and function type bits
    pub shared_info_start_position: u64,
    pub start_position_shift: u32,

    pub script_name: u64,
    pub script_line_offset: u64,
    pub script_line_ends: u64,
}

impl Default for HeapLayout {
    fn default() -> Self {
        Self {
            heap_object_map: 0x00,
            map_instance_type: 0x0c,

            string_length: 0x08,
            seq_string_data: 0x18,
            cons_string_first: 0x18,
            cons_string_second: 0x20,
            string_repr_mask: 0x07,
            string_encoding_one_byte: 0x04,
            string_layout_mask: 0x03,
            string_layout_seq: 0x00,
            string_layout_cons: 0x01,
            max_string_chars: 200,

            fixed_array_type: 0xa3,
            fixed_array_length: 0x08,
            fixed_array_header_size: 0x10,

            js_function_shared_info: 0x28,

            shared_info_name: 0x08,
            shared_info_inferred_name: 0x50,
            shared_info_script: 0x40,
            shared_info_start_position: 0x84,
            start_position_shift: 2,

            script_name: 0x10,
            script_line_offset: 0x18,
            script_line_ends: 0x58,
        }
    }
}

impl HeapLayout {
    /// Parse a layout from a JSON object
    ///
    /// Only objects are accepted; serde would otherwise fill the fields of a
    /// JSON array by position.
    ///
    /// # Errors
    /// Returns an error if `json` is not an object or a field has the wrong type
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "heap layout must be a JSON object",
            ));
        }
        serde_json::from_value(value)
    }

    /// Instance type of a one-byte sequential string
    #[must_use]
    pub fn one_byte_seq_shape(&self) -> u8 {
        self.string_encoding_one_byte | self.string_layout_seq
    }
}
