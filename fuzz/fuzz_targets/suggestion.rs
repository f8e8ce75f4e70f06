#![no_main]

use doc_chat::suggestion::extract_suggested_change;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Some(change) = extract_suggested_change(&input) {
        assert!(!change.original_text.is_empty() || input.contains("\"originalText\""));
    }
});
