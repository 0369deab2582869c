#![no_main]

use libfuzzer_sys::fuzz_target;

use holefix::query::compile;

// compile must never panic, and accepted patterns must survive a source round trip.
fuzz_target!(|data: &[u8]| {
    let Ok(pattern) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tree) = compile(pattern) {
        let reparsed = compile(&tree.to_source()).expect("to_source output must compile");
        assert_eq!(tree, reparsed);
    }
});
