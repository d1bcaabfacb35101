use pdfrag::{build_prompt, excerpt, Chunk, Hit, CHUNK_DELIMITER, FALLBACK_ANSWER};

fn hit(index: usize, page: usize, text: &str, score: f32) -> Hit {
    Hit {
        chunk: Chunk {
            index,
            source: "guide.pdf".to_string(),
            page_number: page,
            text: text.to_string(),
        },
        score,
    }
}

#[test]
fn prompt_contains_context_question_and_fallback_instruction() {
    let hits = vec![
        hit(3, 2, "Store grain in sealed bins.", 0.9),
        hit(1, 1, "Rotate stock every season.", 0.5),
    ];
    let prompt = build_prompt("How should grain be stored?", &hits);

    assert!(prompt.contains(&format!(
        "Store grain in sealed bins.{CHUNK_DELIMITER}Rotate stock every season."
    )));
    assert!(prompt.contains("Question: How should grain be stored?"));
    assert!(prompt.contains("based only on the provided context"));
    assert!(prompt.contains(&format!("say \"{FALLBACK_ANSWER}\"")));
    let context_at = prompt.find("<context>").expect("context block");
    let question_at = prompt.find("Question:").expect("question line");
    assert!(context_at < question_at);
}

#[test]
fn prompt_keeps_retrieval_order() {
    let hits = vec![hit(0, 1, "second", 0.2), hit(1, 1, "first", 0.1)];
    let prompt = build_prompt("q", &hits);
    let a = prompt.find("second").expect("second chunk");
    let b = prompt.find("first").expect("first chunk");
    assert!(a < b);
}

#[test]
fn fallback_sentence_is_fixed() {
    assert_eq!(
        FALLBACK_ANSWER,
        "I don't have enough information to answer this question based on the provided documents."
    );
}

#[test]
fn context_block_holds_only_chunk_text() {
    let prompt = build_prompt("q", &[hit(0, 4, "  Filters need cleaning.  ", 0.75)]);
    assert!(prompt.contains("<context>\nFilters need cleaning.\n</context>"));
    assert!(!prompt.contains("guide.pdf"));
    assert!(!prompt.contains("0.75"));
}

#[test]
fn excerpts_are_cut_on_char_boundaries() {
    assert_eq!(excerpt("short text", 300), "short text");
    assert_eq!(excerpt("abcdef", 3), "abc...");
    assert_eq!(excerpt("日本語のテキスト", 3), "日本語...");
    assert_eq!(excerpt("  padded  ", 10), "padded");
}
