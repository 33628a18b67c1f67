#![no_main]

use libfuzzer_sys::fuzz_target;
use stockaudit::config::AnalysisConfig;
use stockaudit::ingest::parse_csv;
use stockaudit::pipeline::Pipeline;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must not panic; whatever parses must analyse cleanly
        if let Ok(records) = parse_csv(input) {
            if let Ok(pipeline) = Pipeline::new(AnalysisConfig::default()) {
                let _ = pipeline.run(&records);
            }
        }
    }
});
