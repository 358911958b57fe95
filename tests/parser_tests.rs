//! Integration tests for the MBOX index, MIME parser, and text extraction.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mboxtext::error::MboxError;
use mboxtext::extract::extract_text;
use mboxtext::index::MailboxIndex;
use mboxtext::model::message::{HeaderValue, Message};
use mboxtext::parser::mime::{parse_message, MBOX_FROM_HEADER};
use mboxtext::store::reader::MboxStore;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn parse_nth(index: &MailboxIndex, ordinal: usize) -> Message {
    parse_message(index.message(ordinal).unwrap()).unwrap()
}

// ─── Index: counts ──────────────────────────────────────────────────

#[test]
fn test_simple_mbox_count() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    assert_eq!(index.len().unwrap(), 3, "simple.mbox should contain 3 messages");
}

#[test]
fn test_escaped_from_is_not_a_separator() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    let second = String::from_utf8(index.message(2).unwrap()).unwrap();
    assert!(second.contains(">From the perspective"));
    assert!(second.starts_with("From user2@example.com"));
}

#[test]
fn test_empty_mbox() {
    let index = MailboxIndex::new(fixture("empty.mbox")).unwrap();
    assert_eq!(index.len().unwrap(), 0);
    assert_eq!(index.iter().unwrap().count(), 0);
}

#[test]
fn test_file_without_separator_has_no_messages() {
    let index = MailboxIndex::new(fixture("no_separator.mbox")).unwrap();
    assert!(index.is_empty().unwrap());
    assert!(matches!(index.message(1), Err(MboxError::MessageNotFound(1))));
}

#[test]
fn test_count_matches_separator_lines() {
    for name in ["simple.mbox", "multipart.mbox", "empty.mbox", "no_separator.mbox"] {
        let content = std::fs::read(fixture(name)).unwrap();
        let separators = content
            .split(|&b| b == b'\n')
            .filter(|line| line.starts_with(b"From "))
            .count();
        let index = MailboxIndex::new(fixture(name)).unwrap();
        assert_eq!(index.len().unwrap(), separators, "{name}");
    }
}

// ─── Index: access ──────────────────────────────────────────────────

#[test]
fn test_out_of_range_ordinals() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    let count = index.len().unwrap();
    assert!(matches!(index.message(0), Err(MboxError::MessageNotFound(0))));
    assert!(matches!(
        index.message(count + 1),
        Err(MboxError::MessageNotFound(n)) if n == count + 1
    ));
    assert!(matches!(
        index.range(1..=count + 1),
        Err(MboxError::OutOfBounds { .. })
    ));
}

#[test]
fn test_iteration_matches_indexed_access() {
    let index = MailboxIndex::new(fixture("multipart.mbox")).unwrap();
    let via_iter: Vec<Vec<u8>> = index.iter().unwrap().map(|m| m.unwrap()).collect();
    assert_eq!(via_iter.len(), index.len().unwrap());
    for (i, bytes) in via_iter.iter().enumerate() {
        assert_eq!(bytes, &index.message(i + 1).unwrap());
    }

    let tail: Vec<Vec<u8>> = index.range(2..=2).unwrap().map(|m| m.unwrap()).collect();
    assert_eq!(tail, vec![index.message(2).unwrap()]);
}

#[test]
fn test_ranges_reconstruct_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("two.mbox");
    let content = "From a@b 1 Jan 1970\nSubject: one\n\nfirst\n\n\
                   From a@b 1 Jan 1970\nSubject: two\n\nsecond\n";
    file.write_str(content).unwrap();
    file.assert(predicate::path::exists());

    let index = MailboxIndex::new(file.path()).unwrap();
    assert_eq!(index.len().unwrap(), 2);

    let toc = index.toc().unwrap();
    assert!(toc[0].end() <= toc[1].offset, "ranges must not overlap");

    let mut rebuilt = index.message(1).unwrap();
    rebuilt.extend(index.message(2).unwrap());
    assert_eq!(rebuilt, content.as_bytes());
}

#[test]
fn test_shared_index_across_threads() {
    let index = std::sync::Arc::new(MailboxIndex::new(fixture("simple.mbox")).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || index.len().unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

// ─── Parsing ────────────────────────────────────────────────────────

#[test]
fn test_first_message_headers() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    let msg = parse_nth(&index, 1);
    let headers = msg.headers();
    assert_eq!(
        headers.first(MBOX_FROM_HEADER),
        Some("user1@example.com Thu Jan 04 10:00:00 2024")
    );
    assert_eq!(headers.first("Subject"), Some("Hello World"));
    assert_eq!(headers.first("From"), Some("User One <user1@example.com>"));
    assert_eq!(headers.first("Message-ID"), Some("<msg001@example.com>"));
}

#[test]
fn test_folding_and_duplicate_headers() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    let msg = parse_nth(&index, 2);
    assert_eq!(msg.headers().first("Subject"), Some("Re: Hello World"));
    assert_eq!(
        msg.headers().get("Received"),
        Some(&HeaderValue::Multiple(vec![
            "from mx1.example.com by relay.example.com".to_string(),
            "from relay.example.com by inbox.example.com".to_string(),
        ]))
    );
}

#[test]
fn test_base64_body_decoded() {
    let index = MailboxIndex::new(fixture("simple.mbox")).unwrap();
    match parse_nth(&index, 3) {
        Message::Single(env) => assert_eq!(env.body, "Hello from a base64 body."),
        Message::Multipart(_) => panic!("third message is single-part"),
    }
}

#[test]
fn test_malformed_base64_is_preserved() {
    let raw = "From x 1\nContent-Transfer-Encoding: base64\n\n%%% not base64 %%%\nsecond line\n";
    match parse_message(raw).unwrap() {
        Message::Single(env) => assert_eq!(env.body, "%%% not base64 %%%\nsecond line"),
        Message::Multipart(_) => panic!("expected single part"),
    }
}

#[test]
fn test_multipart_parts() {
    let index = MailboxIndex::new(fixture("multipart.mbox")).unwrap();
    let Message::Multipart(multipart) = parse_nth(&index, 1) else {
        panic!("first message is multipart");
    };
    assert_eq!(multipart.parts.len(), 2);
    assert!(multipart.parts[0].starts_with("Content-Type: text/plain"));
    assert!(multipart.parts[1].starts_with("Content-Type: text/html"));
    assert!(multipart
        .parts
        .iter()
        .all(|p| !p.contains("multi-part message in MIME format") && !p.contains("epilogue")));
}

// ─── Text extraction ────────────────────────────────────────────────

#[test]
fn test_extract_alternative() {
    let index = MailboxIndex::new(fixture("multipart.mbox")).unwrap();
    let text = extract_text(&parse_nth(&index, 1)).unwrap();
    assert_eq!(
        text,
        "Plain version of the newsletter.\n\nHTML version of the newsletter.\n\nTom & Jerry"
    );
    assert!(predicate::str::contains("<").not().eval(text.as_str()));
    assert!(predicate::str::contains("color: red").not().eval(text.as_str()));
}

#[test]
fn test_extract_nested_skips_attachment() {
    let index = MailboxIndex::new(fixture("multipart.mbox")).unwrap();
    let text = extract_text(&parse_nth(&index, 2)).unwrap();
    assert_eq!(text, "Report summary.\n\nReport summary.");
}

#[test]
fn test_extract_plain_messages() {
    let mut store = MboxStore::open(fixture("simple.mbox")).unwrap();
    assert_eq!(store.text(1).unwrap(), "This is the first message.");
    assert_eq!(
        store.text(2).unwrap(),
        "Replying to the first message.\n>From the perspective of mbox this line is escaped."
    );
    assert_eq!(store.text(3).unwrap(), "Hello from a base64 body.");
}

#[test]
fn test_plain_and_html_parts_joined() {
    let raw = "Content-Type: multipart/mixed; boundary=XYZ\n\n\
               --XYZ\nContent-Type: text/plain\n\nplain part\n\
               --XYZ\nContent-Type: text/html\n\n<div><i>html</i> part</div>\n\
               --XYZ--\n";
    let msg = parse_message(raw).unwrap();
    let Message::Multipart(ref multipart) = msg else {
        panic!("expected multipart");
    };
    assert_eq!(multipart.parts.len(), 2);
    assert_eq!(extract_text(&msg).unwrap(), "plain part\n\nhtml part");
}

#[test]
fn test_latin1_base64_message_is_readable() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("latin1.mbox");
    file.write_str(
        "From a@b 1 Jan 1970\nSubject: plain\n\nhello\n\n\
         From a@b 1 Jan 1970\nSubject: latin1\n\
         Content-Type: text/plain; charset=iso-8859-1\n\
         Content-Transfer-Encoding: base64\n\nY2Fm6Q==\n",
    )
    .unwrap();

    let mut store = MboxStore::open(file.path()).unwrap();
    assert_eq!(store.text(2).unwrap(), "caf\u{fffd}");

    let subjects: Vec<Option<String>> =
        store.listing().unwrap().into_iter().map(|row| row.subject).collect();
    assert_eq!(
        subjects,
        vec![Some("plain".to_string()), Some("latin1".to_string())]
    );
}
