use proptest::prelude::*;

use ragdb_core::chunker::Chunker;
use ragdb_core::error::Error;

fn words_text(len: usize) -> String {
    let mut s = String::new();
    let mut i = 0;
    while s.chars().count() < len {
        s.push_str(&format!("word{} ", i));
        i += 1;
    }
    s.chars().take(len).collect()
}

#[test]
fn empty_input_yields_nothing() {
    let chunker = Chunker::new(100, 10).unwrap();
    assert_eq!(chunker.chunks("").count(), 0);
    assert!(chunker.split("").is_empty());
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    assert!(matches!(Chunker::new(10, 10), Err(Error::InvalidConfig(_))));
    assert!(matches!(Chunker::new(10, 11), Err(Error::InvalidConfig(_))));
    assert!(matches!(Chunker::new(0, 0), Err(Error::InvalidConfig(_))));
    assert!(Chunker::new(10, 9).is_ok());
}

#[test]
fn twelve_hundred_chars_make_three_chunks() {
    let text = words_text(1200);
    let chunker = Chunker::new(500, 50).unwrap();
    let chunks = chunker.split(&text);
    assert_eq!(chunks.len(), 3);
    for c in &chunks {
        assert!(c.chars().count() <= 500, "chunk of {} chars", c.chars().count());
    }
}

#[test]
fn hard_cuts_advance_by_size_minus_overlap() {
    let text = "a".repeat(1000);
    let chunker = Chunker::new(100, 10).unwrap();
    let segments: Vec<_> = chunker.chunks(&text).collect();
    assert_eq!(segments.len(), 11);
    for pair in segments.windows(2) {
        assert_eq!(pair[1].start - pair[0].start, 90);
    }
    assert_eq!(segments.last().unwrap().end, 1000);
}

#[test]
fn prefers_paragraph_break() {
    let text = "First paragraph here.\n\nSecond paragraph continues with more words";
    let chunker = Chunker::new(30, 0).unwrap().with_tolerance(15);
    let first = chunker.chunks(text).next().unwrap();
    assert_eq!(first.text, "First paragraph here.\n\n");
}

#[test]
fn prefers_sentence_over_word() {
    let text = "One two three. Four five six seven";
    let chunker = Chunker::new(20, 0).unwrap().with_tolerance(10);
    let first = chunker.chunks(text).next().unwrap();
    assert_eq!(first.text, "One two three. ");
}

#[test]
fn avoids_cutting_words() {
    let text = "alpha beta gamma delta epsilon zeta eta theta";
    let chunker = Chunker::new(20, 0).unwrap().with_tolerance(10);
    let chunks = chunker.split(text);
    assert_eq!(chunks[0], "alpha beta gamma ");
    for c in &chunks[..chunks.len() - 1] {
        assert!(c.ends_with(' '), "chunk {:?} ends mid-word", c);
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn counts_characters_not_bytes() {
    let text = "é".repeat(25);
    let chunker = Chunker::new(10, 2).unwrap();
    for seg in chunker.chunks(&text) {
        assert!(seg.text.chars().count() <= 10);
    }
}

#[test]
fn iteration_is_restartable() {
    let text = words_text(700);
    let chunker = Chunker::new(120, 20).unwrap();
    let iter = chunker.chunks(&text);
    let mut partial = iter.clone();
    partial.next();
    let full: Vec<_> = iter.collect();
    let again: Vec<_> = chunker.chunks(&text).collect();
    assert_eq!(full, again);
    assert_eq!(partial.collect::<Vec<_>>(), full[1..].to_vec());
}

#[test]
fn clone_resumes_from_any_window() {
    let text = "Grüße aus Köln. Ça va très bien, merci! ".repeat(20);
    let chars: Vec<char> = text.chars().collect();
    let chunker = Chunker::new(64, 12).unwrap();
    let full: Vec<_> = chunker.chunks(&text).collect();
    assert!(full.len() > 3);

    let mut iter = chunker.chunks(&text);
    for i in 0..full.len() {
        let rest: Vec<_> = iter.clone().collect();
        assert_eq!(rest, full[i..].to_vec());
        let seg = iter.next().unwrap();
        let expected: String = chars[seg.start..seg.end].iter().collect();
        assert_eq!(seg.text, expected);
    }
    assert!(iter.next().is_none());
}

#[test]
fn whitespace_only_input_yields_nothing() {
    let chunker = Chunker::new(10, 2).unwrap();
    assert_eq!(chunker.chunks("   \n\n   \t  ").count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn chunks_cover_text_with_exact_overlap(
        text in "[a-z]{1,8}( [a-z]{1,8}){0,150}",
        size in 10usize..200,
        raw_overlap in 0usize..200,
    ) {
        let overlap = raw_overlap % size;
        let chunker = Chunker::new(size, overlap).unwrap();
        let chars: Vec<char> = text.chars().collect();
        let segments: Vec<_> = chunker.chunks(&text).collect();
        prop_assert!(!segments.is_empty());

        let mut rebuilt = String::new();
        let mut covered = 0usize;
        for (i, seg) in segments.iter().enumerate() {
            prop_assert!(seg.end - seg.start <= size);
            prop_assert!(seg.start <= covered, "gap before segment {}", i);
            let expected: String = chars[seg.start..seg.end].iter().collect();
            prop_assert_eq!(seg.text, expected.as_str());
            if i > 0 {
                prop_assert_eq!(seg.start, segments[i - 1].end - overlap);
            }
            rebuilt.extend(&chars[covered..seg.end]);
            covered = seg.end;
        }
        prop_assert_eq!(covered, chars.len());
        prop_assert_eq!(rebuilt, text);
    }
}
