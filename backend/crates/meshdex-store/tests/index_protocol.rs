//! Index Maintenance Protocol Tests
//!
//! End-to-end behavior of `IndexSession` over the in-memory backend:
//! - Forward and reverse records agree after a successful update
//! - Partially failed updates compensate the reverse records that changed
//! - Lookups fail instead of returning partial answers
//! - Concurrent updates of different objects do not lose memberships

use meshdex_store::test_utils::{entry, raw_id, FaultyStorage};
use meshdex_store::{
    reverse_location, IndexError, IndexSession, IndexStorage, MemoryBackend, MembershipEntry,
    MembershipRecord, StorageError,
};
use std::sync::Arc;
use std::time::Duration;

const OBJECT: u8 = 1;
const I1: u8 = 10;
const I2: u8 = 20;
const I3: u8 = 30;

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

fn faulty_session() -> (IndexSession, Arc<FaultyStorage>, Arc<MemoryBackend>) {
    let inner = Arc::new(MemoryBackend::new());
    let faulty = Arc::new(FaultyStorage::new(Arc::clone(&inner)));
    let storage: Arc<dyn IndexStorage> = faulty.clone();
    (IndexSession::new(storage), faulty, inner)
}

fn reverse_entries(backend: &MemoryBackend, index: u8) -> Vec<MembershipEntry> {
    backend
        .get(&reverse_location(&raw_id(index)))
        .map(|bytes| MembershipRecord::decode_or_empty(&bytes).unwrap().entries)
        .unwrap_or_default()
}

/// Object starts out in `{I2:"b", I3:"c"}`.
async fn seed(session: &IndexSession) {
    session
        .update_indexes(raw_id(OBJECT), vec![entry(I2, "b"), entry(I3, "c")])
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_update_inserts_new_and_removes_stale_memberships() {
    init_logging();
    let (session, faulty, inner) = faulty_session();
    seed(&session).await;
    let calls_before = faulty.cas_calls();

    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap();

    // Forward record plus one insert and one removal; I2 is left alone.
    assert_eq!(faulty.cas_calls() - calls_before, 3);
    assert_eq!(reverse_entries(&inner, I1), vec![entry(OBJECT, "a")]);
    assert_eq!(reverse_entries(&inner, I2), vec![entry(OBJECT, "b")]);
    assert!(reverse_entries(&inner, I3).is_empty());

    let claimed = session.check_indexes(&raw_id(OBJECT)).await.unwrap();
    assert_eq!(claimed, vec![entry(I2, "b"), entry(I1, "a")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partial_failure_compensates_landed_removal() {
    init_logging();
    let (session, faulty, inner) = faulty_session();
    seed(&session).await;
    faulty.fail_cas(reverse_location(&raw_id(I1)), 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap_err();

    match err {
        IndexError::Mutation(StorageError::IoError(message)) => {
            assert!(message.contains(&reverse_location(&raw_id(I1)).to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // I3's removal landed and was re-inserted; I1 never changed.
    assert_eq!(reverse_entries(&inner, I3), vec![entry(OBJECT, "c")]);
    assert!(reverse_entries(&inner, I1).is_empty());
    assert_eq!(reverse_entries(&inner, I2), vec![entry(OBJECT, "b")]);

    // The forward record is not compensated.
    let claimed = session.check_indexes(&raw_id(OBJECT)).await.unwrap();
    assert_eq!(claimed, vec![entry(I2, "b"), entry(I1, "a")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partial_failure_compensates_landed_insert() {
    init_logging();
    let (session, faulty, inner) = faulty_session();
    seed(&session).await;
    // The insert into I1 is slow to land, the removal from I3 fails.
    faulty.delay_cas(reverse_location(&raw_id(I1)), Duration::from_millis(20));
    faulty.fail_cas(reverse_location(&raw_id(I3)), 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Mutation(_)));
    assert!(reverse_entries(&inner, I1).is_empty());
    assert_eq!(reverse_entries(&inner, I3), vec![entry(OBJECT, "c")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_compensation_leaves_drift() {
    init_logging();
    let (session, faulty, inner) = faulty_session();
    seed(&session).await;
    faulty.fail_cas(reverse_location(&raw_id(I1)), 1);
    // Removal from I3 lands, re-inserting it fails.
    faulty.fail_cas_after(reverse_location(&raw_id(I3)), 1, 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Mutation(StorageError::IoError(_))));
    assert!(reverse_entries(&inner, I3).is_empty());
}

#[tokio::test]
async fn test_total_failure_reports_error_without_compensation() {
    init_logging();
    let (session, faulty, _inner) = faulty_session();
    faulty.fail_cas(reverse_location(&raw_id(I1)), 1);
    faulty.fail_cas(reverse_location(&raw_id(I2)), 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Mutation(_)));
    // Forward record plus the two failed inserts.
    assert_eq!(faulty.cas_calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_failure_is_reported_over_later_ones() {
    init_logging();
    let (session, faulty, _inner) = faulty_session();
    let first = reverse_location(&raw_id(I1));
    let later = reverse_location(&raw_id(I2));
    faulty.fail_cas(first, 1);
    faulty.delay_cas(later, Duration::from_millis(30));
    faulty.fail_cas(later, 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .await
        .unwrap_err();

    match err {
        IndexError::Mutation(StorageError::IoError(message)) => {
            assert!(message.contains(&first.to_string()));
            assert!(!message.contains(&later.to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(faulty.cas_calls(), 3);
}

#[tokio::test]
async fn test_unsupported_forward_version_is_decode_error() {
    let (session, faulty, inner) = faulty_session();
    let forward = session.forward_location(&raw_id(OBJECT));
    // [2, [], []]
    inner.put(forward, vec![0x93, 0x02, 0x90, 0x90]);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Decode(_)));
    assert_eq!(faulty.cas_calls(), 1);
    assert_eq!(inner.get(&forward), Some(vec![0x93, 0x02, 0x90, 0x90]));
    assert!(inner.get(&reverse_location(&raw_id(I1))).is_none());
}

#[tokio::test]
async fn test_malformed_reverse_record_is_decode_error() {
    let (session, _faulty, inner) = faulty_session();
    inner.put(reverse_location(&raw_id(I1)), vec![0xc1]);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Decode(_)));
    assert_eq!(inner.get(&reverse_location(&raw_id(I1))), Some(vec![0xc1]));
}

#[tokio::test]
async fn test_removal_from_absent_reverse_record_writes_nothing() {
    let (session, _faulty, inner) = faulty_session();
    let forward = session.forward_location(&raw_id(OBJECT));
    // The object claims I3, but I3 has no reverse record.
    inner.put(
        forward,
        MembershipRecord::new(vec![entry(I3, "c")]).encode().unwrap(),
    );

    session.update_indexes(raw_id(OBJECT), vec![]).await.unwrap();

    assert!(inner.get(&reverse_location(&raw_id(I3))).is_none());
    let err = session.find_indexes(&[raw_id(I3)]).await.unwrap_err();
    assert!(matches!(
        err,
        IndexError::IncompleteResponse {
            requested: 1,
            received: 0
        }
    ));
}

#[tokio::test]
async fn test_emptied_reverse_record_finds_nothing() {
    let (session, _faulty, _inner) = faulty_session();
    seed(&session).await;

    session
        .update_indexes(raw_id(OBJECT), vec![entry(I2, "b")])
        .await
        .unwrap();

    assert!(session.find_indexes(&[raw_id(I3)]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forward_write_failure_touches_nothing_else() {
    let (session, faulty, inner) = faulty_session();
    faulty.fail_cas(session.forward_location(&raw_id(OBJECT)), 1);

    let err = session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a")])
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Mutation(StorageError::IoError(_))));
    assert_eq!(faulty.cas_calls(), 1);
    assert!(inner.is_empty());
}

#[tokio::test]
async fn test_repeated_update_only_rewrites_forward_record() {
    let (session, faulty, inner) = faulty_session();
    seed(&session).await;
    let calls_before = faulty.cas_calls();

    seed(&session).await;

    assert_eq!(faulty.cas_calls() - calls_before, 1);
    assert_eq!(reverse_entries(&inner, I2), vec![entry(OBJECT, "b")]);
    assert_eq!(reverse_entries(&inner, I3), vec![entry(OBJECT, "c")]);
}

#[tokio::test]
async fn test_duplicate_desired_entries_collapse() {
    let (session, _faulty, inner) = faulty_session();

    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I1, "a")])
        .await
        .unwrap();

    assert_eq!(reverse_entries(&inner, I1), vec![entry(OBJECT, "a")]);
    let claimed = session.check_indexes(&raw_id(OBJECT)).await.unwrap();
    assert_eq!(claimed, vec![entry(I1, "a")]);
}

#[tokio::test]
async fn test_payload_change_replaces_reverse_entry() {
    let (session, _faulty, inner) = faulty_session();
    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "old")])
        .await
        .unwrap();

    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "new")])
        .await
        .unwrap();

    assert_eq!(reverse_entries(&inner, I1), vec![entry(OBJECT, "new")]);
}

#[tokio::test]
async fn test_clearing_memberships_empties_reverse_records() {
    let (session, _faulty, inner) = faulty_session();
    seed(&session).await;

    session.update_indexes(raw_id(OBJECT), vec![]).await.unwrap();

    assert!(reverse_entries(&inner, I2).is_empty());
    assert!(reverse_entries(&inner, I3).is_empty());
    assert!(session.check_indexes(&raw_id(OBJECT)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_related_ids_survive_forward_rewrite() {
    let (session, _faulty, inner) = faulty_session();
    let forward = session.forward_location(&raw_id(OBJECT));
    let mut record = MembershipRecord::new(vec![entry(I2, "b")]);
    record.related = vec![raw_id(99)];
    inner.put(forward, record.encode().unwrap());

    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, "a")])
        .await
        .unwrap();

    let stored = MembershipRecord::decode(&inner.get(&forward).unwrap()).unwrap();
    assert_eq!(stored.entries, vec![entry(I1, "a")]);
    assert_eq!(stored.related, vec![raw_id(99)]);
}

#[tokio::test]
async fn test_find_empty_request_does_no_io() {
    let (session, faulty, _inner) = faulty_session();

    assert!(session.find_indexes(&[]).await.unwrap().is_empty());
    assert_eq!(faulty.bulk_read_calls(), 0);
}

#[tokio::test]
async fn test_find_intersects_memberships() {
    let (session, _faulty, _inner) = faulty_session();
    // a = [x, y], b = [y, z]
    session
        .update_indexes(raw_id(2), vec![entry(I1, "")])
        .await
        .unwrap();
    session
        .update_indexes(raw_id(3), vec![entry(I1, ""), entry(I2, "")])
        .await
        .unwrap();
    session
        .update_indexes(raw_id(4), vec![entry(I2, "")])
        .await
        .unwrap();

    let found = session.find_indexes(&[raw_id(I1), raw_id(I2)]).await.unwrap();
    assert_eq!(found, vec![entry(3, "")]);
}

#[tokio::test]
async fn test_find_incomplete_reply_fails() {
    let (session, faulty, _inner) = faulty_session();
    session
        .update_indexes(raw_id(OBJECT), vec![entry(I1, ""), entry(I2, "")])
        .await
        .unwrap();
    faulty.truncate_bulk_reads(1);

    let err = session
        .find_indexes(&[raw_id(I1), raw_id(I2)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::IncompleteResponse {
            requested: 2,
            received: 1
        }
    ));
}

#[tokio::test]
async fn test_check_unknown_object_surfaces_read_error() {
    let (session, faulty, _inner) = faulty_session();

    let err = session.check_indexes(&raw_id(OBJECT)).await.unwrap_err();
    assert!(matches!(err, IndexError::Mutation(StorageError::NotFound(_))));
    assert_eq!(faulty.read_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_share_reverse_records() {
    init_logging();
    // Every update races on I1's reverse record.
    let storage = Arc::new(MemoryBackend::with_max_retries(1_000));
    let session = Arc::new(IndexSession::new(storage));

    let mut tasks = Vec::new();
    for tag in 100..132u8 {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            session
                .update_indexes(raw_id(tag), vec![entry(I1, ""), entry(tag, "")])
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let members = session.find_indexes(&[raw_id(I1)]).await.unwrap();
    assert_eq!(members.len(), 32);

    let own = session.find_indexes(&[raw_id(I1), raw_id(105)]).await.unwrap();
    assert_eq!(own, vec![entry(105, "")]);
}

#[tokio::test]
async fn test_name_based_api() {
    let session = IndexSession::new(Arc::new(MemoryBackend::new()));

    session
        .update_indexes_by_name("docs/1", &["lang:rust", "status:draft"])
        .await
        .unwrap();
    session
        .update_indexes_by_name("docs/2", &["lang:rust"])
        .await
        .unwrap();

    let rust = session.find_indexes_by_name(&["lang:rust"]).await.unwrap();
    assert_eq!(rust.len(), 2);

    let drafts = session
        .find_indexes_by_name(&["lang:rust", "status:draft"])
        .await
        .unwrap();
    assert_eq!(drafts, vec![MembershipEntry::bare(session.id_for("docs/1"))]);

    let claimed = session.check_indexes_by_name("docs/1").await.unwrap();
    assert_eq!(claimed.len(), 2);
    assert!(claimed.contains(&MembershipEntry::bare(session.id_for("status:draft"))));
}

#[test]
fn test_blocking_wrappers_on_multi_thread_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let session = IndexSession::new(Arc::new(MemoryBackend::new()))
        .with_runtime(runtime.handle().clone());

    session
        .blocking_update_indexes(raw_id(OBJECT), vec![entry(I1, "a"), entry(I2, "b")])
        .unwrap();

    let found = session.blocking_find_indexes(&[raw_id(I1)]).unwrap();
    assert_eq!(found, vec![entry(OBJECT, "a")]);

    let claimed = session.blocking_check_indexes(&raw_id(OBJECT)).unwrap();
    assert_eq!(claimed, vec![entry(I2, "b"), entry(I1, "a")]);
}
