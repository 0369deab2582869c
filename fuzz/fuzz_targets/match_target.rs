#![no_main]

use libfuzzer_sys::fuzz_target;

use holefix::query::{MatchOptions, Matcher, Target, compile};

// First line is the pattern, the rest is the target source.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, source) = text.split_once('\n').unwrap_or((text, ""));
    let Ok(tree) = compile(pattern) else {
        return;
    };
    let Ok(target) = Target::tokenize(source) else {
        return;
    };
    let matcher = Matcher::new(&tree);
    let mut last_end = 0;
    for m in matcher.find_iter(&target) {
        assert!(m.span.start >= last_end && m.span.end <= source.len());
        last_end = m.span.end;
        for capture in m.captures.values() {
            assert_eq!(&source[capture.span.start..capture.span.end], capture.text);
        }
    }
    let _ = matcher
        .find_iter_with(&target, MatchOptions { overlapping: true })
        .take(64)
        .count();
});
