#![no_main]

use libfuzzer_sys::fuzz_target;

use picalc_core::decimal::Decimal;
use picalc_core::precision::{Precision, RoundingPolicy};

fuzz_target!(|data: &[u8]| {
    let Some((&digits, text)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(text) else {
        return;
    };
    let Ok(value) = text.parse::<Decimal>() else {
        return;
    };

    let reparsed: Decimal = value.to_string().parse().expect("display output must parse");
    assert_eq!(reparsed, value, "display round trip of {text:?}");

    let digits = u32::from(digits % 64) + 1;
    for rounding in RoundingPolicy::ALL {
        let rounded = value.round(Precision::new(digits, rounding).unwrap());
        assert!(rounded.significant_digits() <= u64::from(digits));
        if rounding == RoundingPolicy::Down {
            assert!(rounded.abs() <= value.abs(), "truncation grew {text:?}");
        }
    }
});
