#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use roastbout::config::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        // Errors are fine; panics are not.
        let _ = ConfigLoader::default().load_str(yaml, Path::new("fuzz.yaml"));
    }
});
