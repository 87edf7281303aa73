#![no_main]

use libfuzzer_sys::fuzz_target;
use sf_core::{DialectConfig, SequentialIds};
use sf_parser::parse_with;
use sf_validate::validate;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let parsed = parse_with(input, &DialectConfig::default(), &mut SequentialIds::default());

    let process = &parsed.process;
    for edge in &process.edges {
        assert!(process.node(&edge.source).is_some());
        assert!(process.node(&edge.target).is_some());
    }
    for report in &process.reports {
        for id in &report.related_node_ids {
            assert!(process.node(id).is_some());
        }
    }

    let _ = validate(process);
});
