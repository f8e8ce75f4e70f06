#![no_main]

use doc_chat::doc::{Document, Parser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let blocks = Parser::parse(&input);
    assert!(!blocks.is_empty());
    let markup = Document::from_blocks(blocks).serialize();
    let reparsed = Document::parse(&markup);
    assert_eq!(reparsed.serialize(), markup);
});
