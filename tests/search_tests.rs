//! Tests for the search primitives
//!
//! These tests verify:
//! - Lower/upper bounds and equal ranges against a brute-force model
//! - Binary search hits some equal ordinal or reports absence
//! - Read errors abort the search
//! - Async twins agree with the sync functions

use std::cmp::Ordering;

use diskarray::search::{
    binary_search_by, binary_search_by_async, equal_range_by, equal_range_by_async,
    lower_bound_by, upper_bound_by,
};
use diskarray::{DiskArrayError, Result};

// =============================================================================
// Helper Functions
// =============================================================================

fn reader(values: &[i32]) -> impl FnMut(u64) -> Result<i32> + '_ {
    move |id| Ok(values[id as usize])
}

fn brute_force_range(values: &[i32], key: i32) -> std::ops::Range<u64> {
    let lo = values.iter().take_while(|&&v| v < key).count() as u64;
    let hi = values.iter().take_while(|&&v| v <= key).count() as u64;
    lo..hi
}

// =============================================================================
// Bound Tests
// =============================================================================

#[test]
fn test_bounds_match_brute_force() {
    let values = vec![1, 3, 3, 3, 7, 9, 9, 12];

    for key in -1..14 {
        let expected = brute_force_range(&values, key);
        let count = values.len() as u64;

        let lo = lower_bound_by(count, reader(&values), |v| v.cmp(&key)).unwrap();
        let hi = upper_bound_by(count, reader(&values), |v| v.cmp(&key)).unwrap();
        let range = equal_range_by(count, reader(&values), |v| v.cmp(&key)).unwrap();

        assert_eq!(lo..hi, expected, "key {}", key);
        assert_eq!(range, expected, "key {}", key);
    }
}

#[test]
fn test_bounds_on_empty_input() {
    let values: Vec<i32> = Vec::new();

    assert_eq!(lower_bound_by(0, reader(&values), |v| v.cmp(&1)).unwrap(), 0);
    assert_eq!(equal_range_by(0, reader(&values), |v| v.cmp(&1)).unwrap(), 0..0);
    assert_eq!(binary_search_by(0, reader(&values), |v| v.cmp(&1)).unwrap(), None);
}

#[test]
fn test_all_equal_values() {
    let values = vec![5; 33];
    let range = equal_range_by(33, reader(&values), |v| v.cmp(&5)).unwrap();
    assert_eq!(range, 0..33);
}

// =============================================================================
// Binary Search Tests
// =============================================================================

#[test]
fn test_binary_search_hits_or_misses() {
    let values: Vec<i32> = (0..100).map(|i| i * 2).collect();

    for key in 0..200 {
        let found = binary_search_by(100, reader(&values), |v| v.cmp(&key)).unwrap();
        if key % 2 == 0 {
            assert_eq!(found, Some(((key / 2) as u64, key)));
        } else {
            assert_eq!(found, None);
        }
    }
}

#[test]
fn test_binary_search_returns_first_midpoint_hit() {
    // The first probe of [0, 7) is ordinal 3, which already matches
    let values = vec![1, 2, 2, 2, 2, 2, 9];
    let found = binary_search_by(7, reader(&values), |v| v.cmp(&2)).unwrap();
    assert_eq!(found, Some((3, 2)));
}

#[test]
fn test_probe_count_is_logarithmic() {
    let values: Vec<i32> = (0..1024).collect();
    let mut probes = 0;

    let found = binary_search_by(
        1024,
        |id| {
            probes += 1;
            Ok(values[id as usize])
        },
        |v| v.cmp(&1000),
    )
    .unwrap();

    assert_eq!(found, Some((1000, 1000)));
    assert!(probes <= 11, "took {} probes", probes);
}

#[test]
fn test_read_error_aborts_search() {
    let result = lower_bound_by(
        10,
        |_| -> Result<i32> { Err(DiskArrayError::Corruption("unreadable".into())) },
        |v| v.cmp(&0),
    );
    assert!(matches!(result, Err(DiskArrayError::Corruption(_))));
}

#[test]
fn test_custom_ordering() {
    let values = vec![9, 7, 7, 4, 1];
    let range = equal_range_by(5, reader(&values), |v| match v.cmp(&7) {
        Ordering::Less => Ordering::Greater,
        Ordering::Greater => Ordering::Less,
        Ordering::Equal => Ordering::Equal,
    })
    .unwrap();
    assert_eq!(range, 1..3);
}

// =============================================================================
// Async Tests
// =============================================================================

#[tokio::test]
async fn test_async_twins_agree() {
    let values = vec![2, 4, 4, 8, 16, 16, 16, 32];

    for key in 0..40 {
        let sync_range = equal_range_by(8, reader(&values), |v| v.cmp(&key)).unwrap();
        let async_range = equal_range_by_async(
            8,
            |id| {
                let value = values[id as usize];
                async move { Ok(value) }
            },
            |v| v.cmp(&key),
        )
        .await
        .unwrap();
        assert_eq!(sync_range, async_range);

        let sync_hit = binary_search_by(8, reader(&values), |v| v.cmp(&key)).unwrap();
        let async_hit = binary_search_by_async(
            8,
            |id| {
                let value = values[id as usize];
                async move { Ok(value) }
            },
            |v| v.cmp(&key),
        )
        .await
        .unwrap();
        assert_eq!(sync_hit, async_hit);
    }
}
