#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only well-formed JSON reaches the decoders in production
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Exercise the decoders against arbitrary shapes
    let _ = helios::tesla::decode_power_snapshot(&value);
    let _ = helios::tesla::decode_charge_state(&value);
    let _ = helios::tesla::decode_products(&value);
    let _ = helios::tesla::types::unwrap_envelope(value);
});
