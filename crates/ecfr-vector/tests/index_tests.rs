use std::path::Path;

use ecfr_core::traits::VectorIndex;
use ecfr_core::Error;
use ecfr_vector::FlatL2Index;

fn sample() -> FlatL2Index {
    FlatL2Index::from_vectors(2, &[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0], vec![1.0, 0.0]]).unwrap()
}

#[test]
fn nearest_rows_by_ascending_distance() {
    let index = sample();
    let hits = index.search(&[0.9, 0.0], 3).unwrap();
    let rows: Vec<usize> = hits.iter().map(|h| h.row).collect();
    // rows 1 and 3 tie; the lower row wins.
    assert_eq!(rows, vec![1, 3, 0]);
    assert!((hits[0].distance - 0.01).abs() < 1e-6);
    assert!((hits[2].distance - 0.81).abs() < 1e-6);
    assert!(hits[0].score() > hits[2].score());
}

#[test]
fn k_larger_than_rows_returns_all() {
    let hits = sample().search(&[0.0, 0.0], 10).unwrap();
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].row, 0);
    assert_eq!(hits[0].score(), 1.0);
    assert!(sample().search(&[0.0, 0.0], 0).unwrap().is_empty());
}

#[test]
fn dimension_is_enforced() {
    let mut index = FlatL2Index::new(3);
    assert!(matches!(
        index.add(&[vec![1.0, 2.0]]),
        Err(Error::DimensionMismatch { expected: 3, actual: 2 })
    ));
    assert!(index.is_empty());
    assert!(matches!(index.search(&[1.0], 1), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn empty_index_finds_nothing() {
    let index = FlatL2Index::new(4);
    assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
}

#[test]
fn serialized_index_answers_identically() {
    let index = sample();
    let restored = FlatL2Index::from_bytes(&index.to_bytes(), Path::new("idx.bin")).unwrap();
    assert_eq!(restored.len(), 4);
    assert_eq!(restored.row(2), Some(&[0.0f32, 3.0][..]));
    assert_eq!(restored.search(&[0.1, 2.5], 2).unwrap(), index.search(&[0.1, 2.5], 2).unwrap());
}

#[test]
fn corrupt_index_bytes_are_rejected() {
    let bytes = sample().to_bytes();
    let path = Path::new("idx.bin");
    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(FlatL2Index::from_bytes(&bad_magic, path), Err(Error::Artifact { .. })));
    assert!(matches!(FlatL2Index::from_bytes(&bytes[..bytes.len() - 4], path), Err(Error::Artifact { .. })));
    assert!(matches!(FlatL2Index::from_bytes(&bytes[..10], path), Err(Error::Artifact { .. })));
}

#[test]
fn nan_rows_rank_last_without_panicking() {
    let rows: Vec<Vec<f32>> = (0..64)
        .map(|i| if i % 3 == 0 { vec![f32::NAN, 0.0] } else { vec![i as f32, 0.0] })
        .collect();
    let index = FlatL2Index::from_vectors(2, &rows).unwrap();
    let hits = index.search(&[5.0, 0.0], 5).unwrap();
    let ids: Vec<usize> = hits.iter().map(|h| h.row).collect();
    assert_eq!(ids, vec![5, 4, 7, 2, 8]);
    assert!(hits.iter().all(|h| h.distance.is_finite()));

    let all = index.search(&[5.0, 0.0], 64).unwrap();
    assert_eq!(all.len(), 64);
    assert!(all[42..].iter().all(|h| h.row % 3 == 0 && h.distance == f32::INFINITY));
    assert_eq!(all[63].score(), 0.0);
}
