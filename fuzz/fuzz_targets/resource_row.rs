#![no_main]

use diagflux_pipeline::ResourceParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut parser = ResourceParser::for_file("dstat-fuzz.csv");

    for record in reader.records().flatten() {
        let _ = parser.parse_record(&record);
    }
});
