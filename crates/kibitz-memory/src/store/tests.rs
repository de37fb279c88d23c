use super::ConversationStore;
use chrono::Duration;
use kibitz_core::clock::{Clock, ManualClock};
use kibitz_core::config::MemoryConfig;
use kibitz_core::turn::{ConversationKey, Speaker, Turn};
use std::sync::Arc;

fn test_store() -> (ConversationStore, ManualClock) {
    let clock = ManualClock::default();
    let store = ConversationStore::with_clock(&MemoryConfig::default(), Arc::new(clock.clone()));
    (store, clock)
}

fn said(clock: &ManualClock, text: &str) -> Turn {
    Turn::new(Speaker::human("U1", None), text, clock.now())
}

fn texts(turns: &[Turn]) -> Vec<&str> {
    turns.iter().map(|t| t.text.as_str()).collect()
}

#[tokio::test]
async fn test_unknown_key_reads_empty() {
    let (store, _) = test_store();
    assert!(store.get(&ConversationKey::channel("C1")).await.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_append_preserves_order() {
    let (store, clock) = test_store();
    let key = ConversationKey::direct("U1");
    store.append(&key, said(&clock, "hi")).await;
    store.append(&key, Turn::bot("hello", clock.now())).await;
    store.append(&key, said(&clock, "hi")).await;

    let turns = store.get(&key).await;
    assert_eq!(texts(&turns), vec!["hi", "hello", "hi"]);
    assert!(turns[1].speaker.is_bot());
}

#[tokio::test]
async fn test_idle_gap_clears_before_append() {
    let (store, clock) = test_store();
    let key = ConversationKey::channel("C1");
    store.append(&key, said(&clock, "A")).await;
    clock.advance(Duration::seconds(601));
    store.append(&key, said(&clock, "B")).await;

    assert_eq!(texts(&store.get(&key).await), vec!["B"]);
}

#[tokio::test]
async fn test_exactly_ttl_is_not_expired() {
    let (store, clock) = test_store();
    let key = ConversationKey::thread("C1", "T1");
    store.append(&key, said(&clock, "A")).await;
    clock.advance(Duration::seconds(600));
    store.append(&key, said(&clock, "B")).await;

    assert_eq!(texts(&store.get(&key).await), vec!["A", "B"]);
}

#[tokio::test]
async fn test_idle_record_cleared_on_read() {
    let (store, clock) = test_store();
    let key = ConversationKey::direct("U1");
    store.append(&key, said(&clock, "old")).await;
    clock.advance(Duration::seconds(900));

    assert!(store.get(&key).await.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_activity_extends_window() {
    let (store, clock) = test_store();
    let key = ConversationKey::direct("U1");
    for text in ["a", "b", "c"] {
        store.append(&key, said(&clock, text)).await;
        clock.advance(Duration::seconds(500));
    }
    assert_eq!(store.get(&key).await.len(), 3);
}

#[tokio::test]
async fn test_read_does_not_extend_window() {
    let (store, clock) = test_store();
    let key = ConversationKey::channel("C1");
    store.append(&key, said(&clock, "a")).await;
    clock.advance(Duration::seconds(400));
    assert_eq!(store.get(&key).await.len(), 1);
    clock.advance(Duration::seconds(400));
    assert!(store.get(&key).await.is_empty());
}

#[tokio::test]
async fn test_peer_uses_shorter_window() {
    let (store, clock) = test_store();
    let peer = ConversationKey::peer("R1", "U1");
    let direct = ConversationKey::direct("U1");
    store.append(&peer, said(&clock, "p")).await;
    store.append(&direct, said(&clock, "d")).await;
    clock.advance(Duration::seconds(301));

    assert!(store.get(&peer).await.is_empty());
    assert_eq!(store.get(&direct).await.len(), 1);
}

#[tokio::test]
async fn test_ambient_capacity_evicts_oldest() {
    let (store, clock) = test_store();
    let key = ConversationKey::ambient("C1");
    for i in 0..21 {
        store.append(&key, said(&clock, &format!("m{i}"))).await;
    }
    let turns = store.get(&key).await;
    assert_eq!(turns.len(), 20);
    assert_eq!(turns[0].text, "m1");
    assert_eq!(turns[19].text, "m20");
}

#[tokio::test]
async fn test_ambient_ignores_idle_window() {
    let (store, clock) = test_store();
    let key = ConversationKey::ambient("C1");
    store.append(&key, said(&clock, "early")).await;
    clock.advance(Duration::hours(5));
    store.append(&key, said(&clock, "late")).await;
    assert_eq!(texts(&store.get(&key).await), vec!["early", "late"]);
}

#[tokio::test]
async fn test_keys_are_disjoint() {
    let (store, clock) = test_store();
    store
        .append(&ConversationKey::channel("C1"), said(&clock, "channel"))
        .await;
    store
        .append(&ConversationKey::thread("C1", "T1"), said(&clock, "thread"))
        .await;
    store
        .append(&ConversationKey::ambient("C1"), said(&clock, "ambient"))
        .await;

    assert_eq!(
        texts(&store.get(&ConversationKey::channel("C1")).await),
        vec!["channel"]
    );
    assert_eq!(
        texts(&store.get(&ConversationKey::thread("C1", "T1")).await),
        vec!["thread"]
    );
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_clear() {
    let (store, clock) = test_store();
    let key = ConversationKey::channel("C1");
    store.append(&key, said(&clock, "x")).await;
    store.clear(&key).await;
    assert!(store.get(&key).await.is_empty());
    store.clear(&ConversationKey::channel("never-written")).await;
}

#[tokio::test]
async fn test_concurrent_appends_to_different_keys() {
    let (store, clock) = test_store();
    let mut handles = Vec::new();
    for n in 0..8 {
        let store = store.clone();
        let clock = clock.clone();
        handles.push(tokio::spawn(async move {
            let key = ConversationKey::direct(format!("U{n}"));
            for i in 0..10 {
                store.append(&key, said(&clock, &i.to_string())).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.len().await, 8);
    for n in 0..8 {
        let turns = store.get(&ConversationKey::direct(format!("U{n}"))).await;
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(
            turns.iter().map(|t| t.text.clone()).collect::<Vec<_>>(),
            expected
        );
    }
}

#[tokio::test]
async fn test_oversized_ttl_never_expires_back_to_back_turns() {
    let clock = ManualClock::default();
    let config = MemoryConfig {
        channel_ttl_secs: u64::MAX,
        ..Default::default()
    };
    let store = ConversationStore::with_clock(&config, Arc::new(clock.clone()));
    let key = ConversationKey::channel("C1");

    store.append(&key, said(&clock, "a")).await;
    store.append(&key, said(&clock, "b")).await;
    clock.advance(Duration::days(365));
    assert_eq!(texts(&store.get(&key).await), vec!["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_to_one_key_are_all_kept() {
    let (store, clock) = test_store();
    let key = ConversationKey::thread("C1", "1700000000.000001");
    let mut handles = Vec::new();
    for n in 0..50 {
        let store = store.clone();
        let clock = clock.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.append(&key, said(&clock, &n.to_string())).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut seen: Vec<usize> = store
        .get(&key)
        .await
        .iter()
        .map(|t| t.text.parse().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..50).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_to_ambient_key_stay_within_capacity() {
    let (store, clock) = test_store();
    let key = ConversationKey::ambient("C1");
    let mut handles = Vec::new();
    for n in 0..50 {
        let store = store.clone();
        let clock = clock.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.append(&key, said(&clock, &n.to_string())).await;
            assert!(store.get(&key).await.len() <= 20);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(store.get(&key).await.len(), 20);
}
