use std::fs;

use crate::extractor::{ContentExtractor, ExtractError, ReadabilityExtractor, TranscriptExtractor};

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/extractor/tests/fixtures/{name}"))
        .expect("Failed to read test fixture")
}

#[test]
fn test_extract_article() {
    let html = fixture("article.html");
    let extractor = ReadabilityExtractor;

    let title = extractor.extract_title(&html).unwrap();
    assert!(title.contains("Backpressure"));

    let text = extractor.extract_text(&html).unwrap();
    assert!(text.contains("slow consumer"));
    assert!(text.contains("Bounded channels"));
    assert!(!text.contains("Copyright 2024"));
}

#[test]
fn test_extract_transcript() {
    let html = fixture("episode.html");
    let extractor = TranscriptExtractor;

    assert_eq!(
        extractor.extract_title(&html).unwrap(),
        "Episode 412: Streaming Data Contracts"
    );

    let text = extractor.extract_text(&html).unwrap();
    assert_eq!(
        text,
        "Tobias: Hello and welcome to the Data Engineering Podcast. \
         Guest: Thanks, it is great to be here. \
         Tobias: Let's talk about contracts."
    );
}

#[test]
fn test_transcript_extractor_without_transcript() {
    let html = fixture("article.html");
    let text = TranscriptExtractor.extract_text(&html).unwrap();
    assert!(text.contains("slow consumer"));
}

#[test]
fn test_title_not_found() {
    let html = "<html><body><div>untitled</div></body></html>";
    assert!(matches!(
        ReadabilityExtractor.extract_title(html),
        Err(ExtractError::TitleNotFound)
    ));
}

#[test]
fn test_empty_body_is_not_an_error() {
    let html = "<html><head><title>Nothing</title></head><body></body></html>";
    assert!(ReadabilityExtractor.extract_text(html).is_ok());
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use crate::extractor::collapse_whitespace;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_extractors_never_panic(html in ".*") {
            let _ = ReadabilityExtractor.extract_title(&html);
            let _ = ReadabilityExtractor.extract_text(&html);
            let _ = TranscriptExtractor.extract_text(&html);
        }

        #[test]
        fn test_collapsed_text_has_single_spaces(text in "[a-z \\t\\n]*") {
            let collapsed = collapse_whitespace(&text);
            prop_assert!(!collapsed.contains("  "));
            prop_assert!(!collapsed.contains('\n'));
            prop_assert_eq!(collapsed.trim(), collapsed.as_str());
        }
    }
}
