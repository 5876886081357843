#![no_main]

use heistbench::config::ConfigLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        if let Ok(loaded) = ConfigLoader::with_defaults().load_from_str(yaml) {
            // A config that validates must also resolve its delay.
            if let Some(delay) = &loaded.config.params.delay {
                assert!(delay.as_secs().is_ok());
            }
        }
    }
});
