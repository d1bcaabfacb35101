use pdfrag::{Chunk, IndexError, VectorIndex, DEFAULT_TOP_K};

fn chunk(index: usize, text: &str) -> Chunk {
    Chunk {
        index,
        source: "doc.pdf".to_string(),
        page_number: 1,
        text: text.to_string(),
    }
}

fn chunks(n: usize) -> Vec<Chunk> {
    (0..n).map(|i| chunk(i, &format!("chunk {i}"))).collect()
}

#[test]
fn building_from_zero_chunks_fails() {
    let err = VectorIndex::build(vec![], vec![]).err().expect("empty build must fail");
    assert_eq!(err, IndexError::Empty);
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let err = VectorIndex::build(chunks(3), vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0]])
        .err()
        .expect("dimension mismatch must fail");
    assert_eq!(
        err,
        IndexError::DimensionMismatch {
            position: 2,
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn mismatched_lengths_are_rejected() {
    let err = VectorIndex::build(chunks(2), vec![vec![1.0]])
        .err()
        .expect("length mismatch must fail");
    assert_eq!(err, IndexError::LengthMismatch { chunks: 2, vectors: 1 });
}

#[test]
fn search_orders_by_descending_similarity() {
    let vectors = vec![
        vec![0.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0],
        vec![0.7, 0.7, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![-1.0, 0.0, 0.0],
    ];
    let index = VectorIndex::build(chunks(5), vectors).expect("index should build");
    assert_eq!(index.len(), 5);
    assert_eq!(index.dim(), 3);

    let hits = index.search(&[1.0, 0.1, 0.0], 3);
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].chunk.index, 1);
    assert_eq!(hits[1].chunk.index, 2);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!((hits[0].score - 0.995).abs() < 0.01);
}

#[test]
fn search_returns_at_most_k() {
    let index = VectorIndex::build(chunks(3), vec![vec![1.0, 0.0]; 3]).expect("index should build");
    assert_eq!(index.search(&[1.0, 0.0], DEFAULT_TOP_K).len(), 3);
    assert_eq!(index.search(&[1.0, 0.0], 2).len(), 2);
    assert!(index.search(&[1.0, 0.0], 0).is_empty());
}

#[test]
fn ties_keep_insertion_order() {
    let vectors = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]];
    let index = VectorIndex::build(chunks(4), vectors).expect("index should build");
    let order: Vec<usize> = index
        .search(&[1.0, 0.0], 4)
        .iter()
        .map(|h| h.chunk.index)
        .collect();
    assert_eq!(order, vec![1, 2, 3, 0]);
}

#[test]
fn zero_vectors_and_wrong_dimensions_do_not_panic() {
    let index = VectorIndex::build(chunks(2), vec![vec![0.0, 0.0], vec![1.0, 0.0]])
        .expect("index should build");
    let hits = index.search(&[1.0, 0.0], 2);
    assert_eq!(hits[0].chunk.index, 1);
    assert_eq!(hits[1].score, 0.0);
    assert!(index.search(&[1.0, 0.0, 0.0], 2).is_empty());
}
