//! Fuzz test for value parsers
//!
//! Every accepted value must format back to text the parser accepts again.

#![no_main]

use bootcfg_core::values::{
    format_fixed_point, format_key_combo, parse_bool, parse_choice, parse_dec_int,
    parse_fixed_point, parse_hex, parse_key_combo,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse_bool(data);
    let _ = parse_hex(data, 0, u64::MAX);
    let _ = parse_choice(data, &["off", "clock", "l2", "clock+l2"]);

    if let Ok(value) = parse_dec_int(data, i64::MIN, i64::MAX) {
        assert_eq!(parse_dec_int(&value.to_string(), i64::MIN, i64::MAX), Ok(value));
    }

    if let Ok(value) = parse_fixed_point(data, i64::MIN, i64::MAX) {
        let text = format_fixed_point(value);
        assert_eq!(parse_fixed_point(&text, i64::MIN, i64::MAX), Ok(value));
    }

    if let Ok(combo) = parse_key_combo(data) {
        let text = format_key_combo(combo);
        assert_eq!(parse_key_combo(&text), Ok(combo));
    }
});
