#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(list) = efatura::gib::response::parse_incoming_result(s) {
            for invoice in &list {
                let _ = uuid::Uuid::parse_str(invoice.uuid.trim());
            }
        }
    }
});
