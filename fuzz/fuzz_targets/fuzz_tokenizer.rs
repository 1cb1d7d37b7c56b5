#![no_main]

use csvstream::{Error, TokenizerBuilder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The first byte picks a buffer capacity so that refills land at
    // arbitrary positions.
    let (capacity, input) = match data.split_first() {
        None => return,
        Some((&first, rest)) => (first as usize % 32, rest),
    };
    let mut tok = TokenizerBuilder::new()
        .buffer_capacity(capacity)
        .from_reader(input);
    let mut parsed = 0;
    loop {
        match tok.parse_record(None) {
            Ok(None) => break,
            Ok(Some(record)) => assert!(!record.is_empty()),
            Err(Error::Utf8 { .. }) => {}
            Err(err) => panic!("unexpected error: {}", err),
        }
        parsed += 1;
    }

    // Skipping must agree with parsing on the number of records.
    let mut tok = TokenizerBuilder::new()
        .buffer_capacity(capacity)
        .from_reader(input);
    assert_eq!(tok.skip_records(usize::MAX).unwrap(), parsed);
});
