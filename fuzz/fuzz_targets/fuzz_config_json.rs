//! Fuzz target: JSON configuration documents
//!
//! Feeds arbitrary bytes to `RemoteConfig::from_json` and verifies:
//! - No panics under arbitrary input
//! - Every accepted document passes `validate()` again
//! - Every accepted config survives the postcard blob stored in NVS
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use somfyremote::RemoteConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = RemoteConfig::from_json(text) else {
        return;
    };

    assert!(config.validate().is_ok(), "accepted config failed validation");

    let blob = postcard::to_allocvec(&config).expect("config always serialises");
    let back: RemoteConfig = postcard::from_bytes(&blob).expect("own blob always decodes");
    assert_eq!(back, config);
});
