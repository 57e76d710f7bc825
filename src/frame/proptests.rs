//! Property-based tests for the frame decoder

use super::*;
use proptest::prelude::*;

fn item_line(content: &str) -> String {
    format!("{}\n", serde_json::json!({ "type": "item", "content": content }))
}

fn arb_content() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,12}",
        "[}{\"\\\\ a-z]{0,8}",
        "[àéíòúçñ€😀 ]{0,6}",
    ]
}

/// A stream body made of well-formed lines, junk lines and glued objects.
fn arb_body() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        arb_content().prop_map(|c| item_line(&c)),
        (arb_content(), arb_content()).prop_map(|(a, b)| {
            let mut glued = item_line(&a);
            glued.pop();
            glued.push_str(&item_line(&b));
            glued
        }),
        "[a-z ]{1,10}\n".prop_map(String::from),
        Just("{\"type\":\"item\",\"content\":\n".to_string()),
        Just("\r\n".to_string()),
    ];
    proptest::collection::vec(line, 0..8).prop_map(|lines| lines.concat())
}

/// Split `body` at arbitrary offsets, snapping back to char boundaries.
fn split_at_points(body: &str, points: Vec<usize>) -> Vec<&str> {
    let mut cuts: Vec<usize> = points
        .into_iter()
        .map(|p| {
            let mut idx = p % (body.len() + 1);
            while !body.is_char_boundary(idx) {
                idx -= 1;
            }
            idx
        })
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut rest = body;
    let mut consumed = 0;
    for cut in cuts {
        let (head, tail) = rest.split_at(cut - consumed);
        chunks.push(head);
        rest = tail;
        consumed = cut;
    }
    chunks.push(rest);
    chunks
}

proptest! {
    /// Accumulated text after chunk n+1 always extends the text after chunk n.
    #[test]
    fn accumulated_text_is_append_only(
        body in arb_body(),
        points in proptest::collection::vec(any::<usize>(), 0..6),
    ) {
        let mut session = StreamSession::new();
        let mut previous = String::new();
        for chunk in split_at_points(&body, points) {
            let current = session.feed(chunk).to_string();
            prop_assert!(current.starts_with(&previous));
            previous = current;
        }
        let finished = session.finish().to_string();
        prop_assert!(finished.starts_with(&previous));
    }

    /// Chunk boundaries never change the final result.
    #[test]
    fn chunking_is_invisible(
        body in arb_body(),
        points in proptest::collection::vec(any::<usize>(), 0..6),
    ) {
        let mut whole = StreamSession::new();
        whole.feed(&body);
        let expected = whole.finish().to_string();

        let mut split = StreamSession::new();
        for chunk in split_at_points(&body, points) {
            split.feed(chunk);
        }
        prop_assert_eq!(split.finish(), expected.as_str());
    }

    /// A chunk without a terminator leaves the accumulated text unchanged.
    #[test]
    fn unterminated_chunk_changes_nothing(
        prefix in arb_body(),
        partial in "[^\n]{0,20}",
    ) {
        let mut session = StreamSession::new();
        let before = session.feed(&prefix).to_string();
        let after = session.feed(&partial).to_string();
        prop_assert_eq!(before, after);
    }

    /// Well-formed item lines reconstruct exactly their content.
    #[test]
    fn item_lines_round_trip_content(contents in proptest::collection::vec(arb_content(), 0..6)) {
        let body: String = contents.iter().map(|c| item_line(c)).collect();
        let mut session = StreamSession::new();
        session.feed(&body);
        let expected = contents.concat();
        prop_assert_eq!(session.finish(), expected.as_str());
        prop_assert_eq!(session.skipped_fragments(), 0);
    }

    /// Glued item objects split by the scanner reassemble to the original line.
    #[test]
    fn scanner_fragments_concatenate_to_input(line in "[{}\" a-z\\\\:,]{0,40}") {
        prop_assert_eq!(split_concatenated(&line).concat(), line);
    }
}
