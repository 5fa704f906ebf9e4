//! Fuzz test for document parsing
//!
//! Parsing arbitrary bytes must never panic, and rendering is stable once
//! a record has been through the codec.

#![no_main]

use bootcfg_core::codec::{parse_document, parse_document_bytes, render_document};
use bootcfg_core::BuildInfo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Byte entry point: size limit and encoding errors must not panic
    let _ = parse_document_bytes(data);

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = parse_document(text) else {
        return;
    };

    let build = BuildInfo::new();
    let Ok(rendered) = render_document(&record, &build) else {
        return;
    };

    // Partial documents leave fields at zero, which may be outside their
    // domain and fail to parse back. Whatever does parse back must render
    // identically from then on.
    if let Ok(reparsed) = parse_document(&rendered) {
        let again = render_document(&reparsed, &build).expect("reparsed record renders");
        assert_eq!(again, rendered);
    }
});
