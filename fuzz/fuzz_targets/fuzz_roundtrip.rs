#![no_main]

use libfuzzer_sys::fuzz_target;
use sf_core::{BusinessProcess, DialectConfig, SequentialIds};
use sf_export::export_with;
use sf_parser::parse_with;

fn reparse(text: &str, dialect: &DialectConfig) -> BusinessProcess {
    parse_with(text, dialect, &mut SequentialIds::default()).process
}

// After one normalizing pass, export(parse(text)) is a fixed point. Department
// names with spaces cannot be written back unambiguously, so they are skipped.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let dialect = DialectConfig::default();
    let first = reparse(input, &dialect);
    if first
        .swimlanes
        .iter()
        .any(|lane| lane.name.split_whitespace().count() != 1)
    {
        return;
    }

    let normalized = export_with(&first, &dialect);
    let once = export_with(&reparse(&normalized, &dialect), &dialect);
    let twice = export_with(&reparse(&once, &dialect), &dialect);
    assert_eq!(once, twice);
});
