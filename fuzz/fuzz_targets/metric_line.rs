#![no_main]

use diagflux_pipeline::parser::diagnostics::is_metric_line;
use diagflux_pipeline::DiagnosticsParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if !is_metric_line(&line) {
        return;
    }

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let parser = DiagnosticsParser::new("fuzz");
    if let Ok(sample) = parser.parse_line(&line) {
        assert!(!sample.metric.is_empty());
    }
});
