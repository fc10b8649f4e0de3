use std::io::Write;
use torch::domain::Pid;
use torch::heap::{HeapLayout, HeapMemoryReader};

/// A flat heap image holding one function, `serve` from `lib/http.js`,
/// starting on the 2nd line of its script
fn function_image(layout: &HeapLayout) -> (Vec<u8>, u64) {
    let mut image = vec![0u8; 0x1000];
    let mut put = |addr: u64, bytes: &[u8]| {
        let start = usize::try_from(addr).unwrap();
        image[start..start + bytes.len()].copy_from_slice(bytes);
    };
    let ptr = |target: u64| (target | 1).to_le_bytes();
    let smi = |value: i64| (value << 32).to_le_bytes();

    let (ascii_map, array_map) = (0x40, 0x80);
    let (function, shared, script, line_ends, name, file) =
        (0x100, 0x200, 0x300, 0x400, 0x500, 0x600);

    put(ascii_map + layout.map_instance_type, &[layout.one_byte_seq_shape()]);
    put(array_map + layout.map_instance_type, &[layout.fixed_array_type]);

    put(function + layout.js_function_shared_info, &ptr(shared));
    put(shared + layout.shared_info_name, &ptr(name));
    put(shared + layout.shared_info_script, &ptr(script));
    put(shared + layout.shared_info_start_position, &(20u32 << layout.start_position_shift).to_le_bytes());

    put(script + layout.script_name, &ptr(file));
    put(script + layout.script_line_offset, &smi(0));
    put(script + layout.script_line_ends, &ptr(line_ends));

    put(line_ends + layout.heap_object_map, &ptr(array_map));
    put(line_ends + layout.fixed_array_length, &smi(3));
    for (i, end) in [12i64, 48, 90].into_iter().enumerate() {
        put(line_ends + layout.fixed_array_header_size + 8 * i as u64, &smi(end));
    }

    for (addr, text) in [(name, "serve"), (file, "lib/http.js")] {
        put(addr + layout.heap_object_map, &ptr(ascii_map));
        put(addr + layout.string_length, &smi(text.len() as i64));
        put(addr + layout.seq_string_data, text.as_bytes());
    }

    (image, function | 1)
}

#[test]
fn test_read_function_from_dump_file() {
    let (image, function) = function_image(&HeapLayout::default());
    let mut dump = tempfile::tempfile().unwrap();
    dump.write_all(&image).unwrap();

    let mut reader = HeapMemoryReader::new(dump);
    assert_eq!(reader.read_function(function), "serve:lib/http.js:2");
}

#[test]
fn test_read_function_with_layout_from_json() {
    let layout = HeapLayout::from_json(
        r#"{
            "js_function_shared_info": 56,
            "shared_info_script": 72,
            "script_line_ends": 80
        }"#,
    )
    .unwrap();
    let (image, function) = function_image(&layout);

    let mut default_reader = HeapMemoryReader::new(image.clone());
    assert_eq!(default_reader.read_function(function), "[empty]:[empty]:[unknown]");

    let mut reader = HeapMemoryReader::with_layout(image, layout);
    assert_eq!(reader.read_function(function), "serve:lib/http.js:2");
}

#[test]
fn test_open_reads_own_memory() {
    static WORDS: [u64; 2] = [0x0123_4567_89ab_cdef, 42 << 32];

    let mut reader = HeapMemoryReader::open(Pid(std::process::id())).expect("Failed to open own memory");
    let addr = WORDS.as_ptr() as u64;

    assert_eq!(reader.read_u64(addr).unwrap(), 0x0123_4567_89ab_cdef);
    assert_eq!(reader.read_u8(addr).unwrap(), 0xef);
    assert_eq!(reader.read_smi(addr + 8).unwrap(), 42);
}

#[test]
fn test_open_missing_process_fails() {
    assert!(HeapMemoryReader::open(Pid(999_999_999)).is_err());
}
