//! Tests for the async read path
//!
//! These tests verify:
//! - Async point, range and search operations agree with the sync ones
//! - Async scans stream records in on-disk order
//! - Closed files fail async reads too
//! - Many concurrent async readers share one database

mod common;

use std::sync::Arc;

use common::{ok_all, person, setup_temp_db, Person, TestRng};
use diskarray::file::read_only_factory;
use diskarray::{
    BincodeSerializer, Database, DiskArrayError, I64Serializer, LruRecordCache, RandomAccessFile,
    RecordCache, Utf8Serializer,
};
use futures::StreamExt;
use tempfile::TempDir;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

/// Database with sorted i64s (array 0) and sorted people by id (array 1)
fn setup_database() -> (TempDir, Database, Vec<i64>) {
    let (temp, path) = setup_temp_db();
    let mut rng = TestRng::new(7);
    let mut numbers: Vec<i64> = (0..500).map(|_| (rng.next_u64() % 10_000) as i64).collect();
    let input = numbers.clone();
    numbers.sort();

    let db = Database::create(&path, Uuid::new_v4())
        .unwrap()
        .add_fixed_array_sorted_by_key(I64Serializer, move |_| Ok(ok_all(input)), |n| *n)
        .unwrap()
        .add_variable_array_sorted_by_key(
            BincodeSerializer::<Person>::new(),
            |_| Ok(ok_all((0..100).rev().map(person).collect())),
            |p: &Person| p.id,
        )
        .unwrap()
        .finish()
        .unwrap();
    (temp, db, numbers)
}

// =============================================================================
// Point and Range Reads
// =============================================================================

#[tokio::test]
async fn test_get_async_matches_sync() {
    let (_temp, db, numbers) = setup_database();
    let stored = db.get::<i64>(0).unwrap();
    let people = db.get::<Person>(1).unwrap();

    for id in [0u64, 1, 250, 499] {
        assert_eq!(stored.get_async(id).await.unwrap(), numbers[id as usize]);
    }
    assert_eq!(people.get_async(42).await.unwrap(), person(42));
}

#[tokio::test]
async fn test_get_range_async_both_layouts() {
    let (_temp, db, numbers) = setup_database();
    let stored = db.get::<i64>(0).unwrap();
    let people = db.get::<Person>(1).unwrap();

    assert_eq!(
        stored.get_range_async(10, 20).await.unwrap(),
        numbers[10..20].to_vec()
    );
    assert_eq!(
        people.get_range_async(98, 100).await.unwrap(),
        vec![person(98), person(99)]
    );
    assert_eq!(people.get_range_async(5, 5).await.unwrap(), Vec::<Person>::new());
}

#[tokio::test]
async fn test_async_bounds_errors() {
    let (_temp, db, _numbers) = setup_database();
    let people = db.get::<Person>(1).unwrap();

    assert!(matches!(
        people.get_async(100).await,
        Err(DiskArrayError::OutOfRange { id: 100, len: 100 })
    ));
    assert!(matches!(
        people.get_range_async(3, 2).await,
        Err(DiskArrayError::InvalidRange { .. })
    ));
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_async_search_matches_sync() {
    let (_temp, db, numbers) = setup_database();
    let stored = db.get::<i64>(0).unwrap();

    for probe in [numbers[0], numbers[77], numbers[499], -1, 10_001] {
        let sync_range = stored.equal_range_by_key(&probe, |n| *n).unwrap();
        let async_range = stored.equal_range_by_key_async(&probe, |n| *n).await.unwrap();
        assert_eq!(sync_range, async_range);

        let found = stored.binary_search_by_key_async(&probe, |n| *n).await.unwrap();
        assert_eq!(found.is_some(), !sync_range.is_empty());
        if let Some((id, value)) = found {
            assert!(sync_range.contains(&id));
            assert_eq!(value, probe);
        }
    }
}

#[tokio::test]
async fn test_async_search_indirect() {
    let (_temp, db, _numbers) = setup_database();
    let people = db.get::<Person>(1).unwrap();

    let (id, found) = people
        .binary_search_by_async(|p| p.id.cmp(&63))
        .await
        .unwrap()
        .unwrap();
    assert_eq!((id, found), (63, person(63)));
    assert_eq!(
        people.equal_range_by_async(|p| p.id.cmp(&500)).await.unwrap(),
        100..100
    );
}

#[tokio::test]
async fn test_async_reads_fill_cache() {
    let (_temp, db, numbers) = setup_database();
    let lru: Arc<LruRecordCache<u64, i64>> = Arc::new(LruRecordCache::new(64).unwrap());
    let cache: Arc<dyn RecordCache<u64, i64>> = lru.clone();
    let stored = db.get_with_cache(0, cache).unwrap();

    assert_eq!(stored.get_async(3).await.unwrap(), numbers[3]);
    assert_eq!(stored.get_async(3).await.unwrap(), numbers[3]);
    assert_eq!(lru.stats().hits, 1);
    assert!(lru.contains(&3));
}

// =============================================================================
// Scans
// =============================================================================

#[tokio::test]
async fn test_linear_scan_async_clustered() {
    let (_temp, db, numbers) = setup_database();
    let stored = db.get::<i64>(0).unwrap();

    let scanned: Vec<i64> = stored
        .linear_scan_async()
        .map(|n| n.unwrap())
        .collect()
        .await;
    assert_eq!(scanned, numbers);
}

#[tokio::test]
async fn test_linear_scan_async_indirect() {
    let (_temp, db, _numbers) = setup_database();
    let people = db.get::<Person>(1).unwrap();

    let mut stream = people.linear_scan_async();
    let mut count = 0u32;
    while let Some(p) = stream.next().await {
        assert_eq!(p.unwrap(), person(count));
        count += 1;
    }
    assert_eq!(count, 100);
}

#[tokio::test]
async fn test_linear_scan_async_reports_oversized_length_prefix() {
    let (_temp, path) = setup_temp_db();
    let db = Database::create(&path, Uuid::new_v4())
        .unwrap()
        .add_variable_array(Utf8Serializer, |_| {
            Ok(ok_all(vec!["apple".to_string(), "banana".to_string()]))
        })
        .unwrap()
        .finish()
        .unwrap();

    // First length prefix sits after the file header, array header and table offset
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[56..60].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let words = db.get::<String>(0).unwrap();
    let scanned: Vec<_> = words.linear_scan_async().collect().await;
    assert_eq!(scanned.len(), 1);
    assert!(matches!(scanned[0], Err(DiskArrayError::Corruption(_))));
}

#[tokio::test]
async fn test_linear_scan_async_empty() {
    let (_temp, path) = setup_temp_db();
    let db = Database::create(&path, Uuid::new_v4())
        .unwrap()
        .add_variable_array(Utf8Serializer, |_| Ok(ok_all(Vec::<String>::new())))
        .unwrap()
        .finish()
        .unwrap();

    let words = db.get::<String>(0).unwrap();
    assert_eq!(words.linear_scan_async().count().await, 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_async_reads_after_close() {
    let (_temp, db, _numbers) = setup_database();
    let stored = db.get::<i64>(0).unwrap();

    db.close();

    assert!(matches!(stored.get_async(0).await, Err(DiskArrayError::Closed)));
    let first = stored.linear_scan_async().next().await.unwrap();
    assert!(matches!(first, Err(DiskArrayError::Closed)));
}

#[tokio::test]
async fn test_read_at_async_short_read() {
    let (_temp, path) = setup_temp_db();
    std::fs::write(&path, [1u8; 16]).unwrap();
    let file = Arc::new(RandomAccessFile::open(read_only_factory(&path), 64).unwrap());

    assert_eq!(file.read_at_async(8, 8).await.unwrap(), vec![1u8; 8]);
    assert!(matches!(
        file.read_at_async(12, 8).await,
        Err(DiskArrayError::UnexpectedEof { offset: 12, len: 8 })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_readers() {
    let (_temp, db, numbers) = setup_database();
    let db = Arc::new(db);
    let numbers = Arc::new(numbers);

    let tasks: Vec<_> = (0..16u64)
        .map(|t| {
            let db = Arc::clone(&db);
            let numbers = Arc::clone(&numbers);
            tokio::spawn(async move {
                let stored = db.get::<i64>(0).unwrap();
                for i in 0..25u64 {
                    let id = (t * 31 + i * 17) % 500;
                    assert_eq!(stored.get_async(id).await.unwrap(), numbers[id as usize]);
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
}
