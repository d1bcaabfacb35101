use std::iter;

use crate::load_pdf::Page;

/// Break preferences, strongest first: paragraph, line, sentence, word.
/// When none of them falls inside a window the text is cut at the window
/// edge.
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the index, stable for the lifetime of the index.
    pub index: usize,
    pub source: String,
    /// 1-based, inherited from the page the chunk was cut from.
    pub page_number: usize,
    pub text: String,
}

/// Splits every page into overlapping windows. Chunks never cross a page
/// boundary, so each one carries exactly the metadata of its page.
pub fn chunk_pages(pages: &[Page], size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for text in chunk_text(&page.text, size, overlap) {
            chunks.push(Chunk {
                index: chunks.len(),
                source: page.source.clone(),
                page_number: page.page_number,
                text,
            });
        }
    }
    chunks
}

/// Splits `text` into windows of at most `size` characters. Each window
/// after the first starts exactly `overlap` characters before the end of
/// the previous one. Lengths are counted in `char`s, never bytes.
pub fn chunk_text(text: &str, size: usize, mut overlap: usize) -> Vec<String> {
    if size == 0 {
        return if text.trim().is_empty() {
            vec![]
        } else {
            vec![text.to_string()]
        };
    }
    if overlap >= size {
        overlap = size / 4;
    }

    // Byte offset of every char start, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(iter::once(text.len()))
        .collect();
    let len_chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = if len_chars - start <= size {
            len_chars
        } else {
            break_point(text, &bounds, start + overlap, start + size)
        };
        let piece = &text[bounds[start]..bounds[end]];
        if !piece.trim().is_empty() {
            chunks.push(piece.to_string());
        }
        if end == len_chars {
            break;
        }
        start = end - overlap;
    }

    chunks
}

/// Picks the end of a window as a char index in `(lo, hi]`. The result is
/// always past `lo` so the next window moves forward.
fn break_point(text: &str, bounds: &[usize], lo: usize, hi: usize) -> usize {
    let base = bounds[lo];
    let window = &text[base..bounds[hi]];
    for level in SEPARATORS {
        let cut = level
            .iter()
            .filter_map(|sep| window.rfind(sep).map(|p| p + sep.len()))
            .max();
        if let Some(cut) = cut {
            // Separators are ASCII, so `base + cut` is always a char boundary.
            return bounds.partition_point(|&b| b < base + cut);
        }
    }
    hi
}
