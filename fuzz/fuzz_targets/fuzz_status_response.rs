#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(report) = efatura::gib::response::parse_status_result(s) {
            // The mapped status must agree with the raw one.
            if let Some(raw) = report.gib_status.as_deref() {
                assert_eq!(report.status, efatura::core::map_gib_status(raw));
            }
        }
    }
});
