use crate::vector_index::Hit;

/// The sentence the model is told to reply with when the context does not
/// contain the answer.
pub const FALLBACK_ANSWER: &str =
    "I don't have enough information to answer this question based on the provided documents.";

/// Shown instead of an answer while no index is ready.
pub const NOT_READY_MESSAGE: &str = "Please upload and process documents first.";

pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Builds the single-string model input: preamble, retrieved chunks in
/// similarity order, the question and the answering rules.
pub fn build_prompt(question: &str, hits: &[Hit]) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.text.trim())
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER);

    format!(
        "You are a helpful assistant that answers questions based on the provided PDF documents.\n\n\
         <context>\n{context}\n</context>\n\n\
         Question: {question}\n\n\
         Answer the question based only on the provided context. If the information is not in the \
         context, say \"{FALLBACK_ANSWER}\"\n\n\
         Provide a clear, concise, and informative answer."
    )
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
