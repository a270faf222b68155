//! Verify parsing against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file lists named cases with an input and the expected
//! outcome, so new server quirks can be captured without writing Rust.

use pulp_core::{parse_link_header, Pagination, Task};
use serde_json::Value;

fn page(value: &Value) -> Option<u32> {
    value.as_u64().map(|p| p as u32)
}

// ---------------------------------------------------------------------------
// Link headers
// ---------------------------------------------------------------------------

#[test]
fn link_header_vectors() {
    let raw = include_str!("../../test-vectors/link-headers.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let header = case["header"].as_str().unwrap();
        let expected = &case["expected"];

        let parsed = parse_link_header(header);
        let wanted = Pagination {
            next: page(&expected["next"]),
            prev: page(&expected["prev"]),
            first: page(&expected["first"]),
            last: page(&expected["last"]),
        };
        assert_eq!(parsed, wanted, "{name}");
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn task_vectors() {
    let raw = include_str!("../../test-vectors/tasks.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let task: Task = serde_json::from_value(case["body"].clone()).unwrap();

        assert_eq!(task.state.as_str(), expected["state"].as_str().unwrap(), "{name}: state");
        assert_eq!(task.is_terminal(), expected["terminal"].as_bool().unwrap(), "{name}: terminal");
        assert_eq!(
            task.importer_kind().map(|k| k.as_str()),
            expected["importer"].as_str(),
            "{name}: importer"
        );
        assert_eq!(
            task.content_progress().map(|c| c.items_total),
            expected["items_total"].as_u64(),
            "{name}: items_total"
        );
        assert_eq!(
            task.content_progress().map(|c| c.items_left),
            expected["items_left"].as_u64(),
            "{name}: items_left"
        );
    }
}
