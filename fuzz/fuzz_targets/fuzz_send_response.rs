#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Errors are fine, panics are bugs.
        let _ = efatura::gib::response::parse_send_result(s);
        let _ = efatura::gib::response::parse_report_result(s);
    }
});
