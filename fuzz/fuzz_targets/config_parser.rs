//! Fuzz target for config parsing.
//!
//! Arbitrary bytes must never panic the parser, and a config that parses must
//! survive a serialize and reparse unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;

use prtriage_types::ConfigFile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = toml::from_str::<ConfigFile>(text) else {
        return;
    };
    let rendered = toml::to_string(&config).expect("serializable config");
    let reparsed: ConfigFile = toml::from_str(&rendered).expect("reparse");
    assert_eq!(reparsed, config);
});
