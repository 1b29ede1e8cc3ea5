#![no_main]

use libfuzzer_sys::fuzz_target;
use used_equipment_core::request::MAX_COLLATERAL_ITEMS;
use used_equipment_core::wire::{check_cap, take_within_cap};

/// Exercises the bounded-array framing discipline with declared lengths up
/// to twice the documented cap (spec.md §8 "Wire-fuzz safety"): an oversized
/// array must be fully drained and truncated, never panic, and never keep
/// more than the cap regardless of how the fuzzer shapes the input.
fuzz_target!(|data: Vec<u8>| {
    let cap = MAX_COLLATERAL_ITEMS;
    let declared_len = data.len().min(cap * 2);
    let items: Vec<u8> = data.into_iter().take(declared_len).collect();

    let verdict = check_cap("collateral", items.len(), cap);
    if items.len() > cap {
        assert!(verdict.is_err());
    } else {
        assert!(verdict.is_ok());
    }

    let (kept, dropped) = take_within_cap(items.clone(), cap);
    assert!(kept.len() <= cap);
    assert_eq!(kept.len() + dropped, items.len());
});
