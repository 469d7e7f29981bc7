//! Fuzz target for the mapping tokenizer.
//!
//! Run with: cargo +nightly fuzz run fuzz_tokenizer

#![no_main]

use cmdalias_core::Tokenizer;
use cmdalias_core::tokenizer::{Convention, split_first_token};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    for tokenizer in [
        Tokenizer::default(),
        Tokenizer::new(Convention::Delimiter, '/', ';'),
    ] {
        if let Ok(commands) = tokenizer.split(s) {
            assert!(!commands.is_empty());
            assert!(commands.iter().all(|c| !c.trim().is_empty()));
        }
        let words: Vec<&str> = s.split(' ').collect();
        if let Ok(commands) = tokenizer.split_words(&words) {
            assert!(!commands.is_empty());
        }
    }
    let _ = split_first_token(s);
});
