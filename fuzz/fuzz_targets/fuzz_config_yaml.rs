#![no_main]

use libfuzzer_sys::fuzz_target;
use used_equipment_core::CoreConfig;

fuzz_target!(|data: &[u8]| {
    // Parsing an untrusted YAML config must never panic, regardless of how
    // malformed or adversarial the input is.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_yaml::from_str::<CoreConfig>(s);
    }
});
