use ecfr_core::chunker::split_sentences;
use ecfr_core::types::SectionRecord;
use ecfr_core::Chunker;

fn section(content: &str) -> SectionRecord {
    SectionRecord {
        title_number: "1".into(),
        title_name: "General Provisions".into(),
        part_number: "1".into(),
        section_number: "1.1".into(),
        section_title: "Definitions.".into(),
        content: content.into(),
    }
}

fn numbered_sentences(n: usize) -> String {
    (0..n)
        .map(|i| format!("Sentence number {} sets a rule.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn chunks_respect_size_bound() {
    let text = numbered_sentences(40);
    let chunker = Chunker::new(100, 30);
    let chunks = chunker.split_text(&text);
    assert!(chunks.len() > 1);
    for c in &chunks {
        assert!(c.chars().count() <= 100, "chunk too long: {:?}", c);
        assert_eq!(c.trim(), c.as_str());
        assert!(!c.is_empty());
    }
}

#[test]
fn trailing_words_carry_into_next_chunk() {
    let text = numbered_sentences(12);
    let chunker = Chunker::new(100, 20);
    assert_eq!(chunker.overlap_words(), 2);
    let chunks = chunker.split_text(&text);
    assert!(chunks.len() >= 2);
    for pair in chunks.windows(2) {
        let words: Vec<&str> = pair[0].split_whitespace().collect();
        let tail = words[words.len() - 2..].join(" ");
        assert!(pair[1].starts_with(&format!("{} ", tail)), "{:?} does not start with {:?}", pair[1], tail);
    }
}

#[test]
fn every_sentence_lands_in_a_chunk() {
    let text = numbered_sentences(25);
    let chunks = Chunker::new(120, 40).split_text(&text);
    for sentence in split_sentences(&text) {
        assert!(chunks.iter().any(|c| c.contains(sentence)), "lost sentence {:?}", sentence);
    }
}

/// Drops the words a chunk inherited from its predecessor.
fn without_carried_words<'a>(prev: &str, chunk: &'a str, max_words: usize) -> &'a str {
    let prev_words: Vec<&str> = prev.split_whitespace().collect();
    for take in (1..=max_words.min(prev_words.len())).rev() {
        let tail = prev_words[prev_words.len() - take..].join(" ");
        if let Some(rest) = chunk.strip_prefix(&format!("{} ", tail)) {
            return rest;
        }
    }
    chunk
}

#[test]
fn each_sentence_appears_once_outside_carried_words() {
    let text = numbered_sentences(25);
    let chunker = Chunker::new(120, 40);
    let chunks = chunker.split_text(&text);
    assert!(chunks.len() > 2);

    let mut bodies = vec![chunks[0].as_str()];
    for pair in chunks.windows(2) {
        let body = without_carried_words(&pair[0], &pair[1], chunker.overlap_words());
        assert_ne!(body.len(), pair[1].len(), "no carried words in {:?}", pair[1]);
        bodies.push(body);
    }
    assert_eq!(bodies.join(" "), split_sentences(&text).join(" "));
}

#[test]
fn zero_overlap_partitions_sentences() {
    let text = numbered_sentences(15);
    let chunks = Chunker::new(80, 0).split_text(&text);
    assert_eq!(chunks.join(" "), split_sentences(&text).join(" "));
}

#[test]
fn overlong_sentence_is_its_own_chunk() {
    let long = format!("Every {}.", "word ".repeat(40).trim_end());
    let text = format!("Short one. {} Short two.", long);
    let chunks = Chunker::new(50, 0).split_text(&text);
    assert_eq!(chunks, vec!["Short one.".to_string(), long, "Short two.".to_string()]);
}

#[test]
fn empty_or_blank_content_yields_nothing() {
    let chunker = Chunker::default();
    assert!(chunker.split_text("").is_empty());
    assert!(chunker.split_text("   \n\t ").is_empty());
    assert!(chunker.chunk_section(&section("")).is_empty());
}

#[test]
fn section_of_600_chars_splits_with_default_settings() {
    let mut text = String::new();
    let mut i = 0;
    while text.chars().count() < 600 {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&format!("Agencies must file document {} with the Office.", i));
        i += 1;
    }
    let chunks = Chunker::default().chunk_section(&section(&text));
    assert!(chunks.len() >= 2);
    for c in &chunks {
        assert_eq!(c.source, "Title 1, Part 1, Section 1.1");
        assert_eq!(c.title_name, "General Provisions");
        assert_eq!(c.section_title, "Definitions.");
        assert!(c.text.chars().count() <= 512);
    }
}

#[test]
fn corpus_chunks_keep_section_order() {
    let mut a = section("Alpha rule applies here. Alpha rule has limits.");
    a.section_number = "1.1".into();
    let mut b = section("Beta rule applies there.");
    b.section_number = "1.2".into();
    let chunks = Chunker::default().chunk_corpus(&[a, b]);
    let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["Title 1, Part 1, Section 1.1", "Title 1, Part 1, Section 1.2"]);
}
