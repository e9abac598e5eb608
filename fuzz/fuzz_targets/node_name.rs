#![no_main]

use diagflux_pipeline::parser::diagnostics::node_name_from_file;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        if let Ok(node) = node_name_from_file(name) {
            assert!(!node.is_empty());
        }
    }
});
