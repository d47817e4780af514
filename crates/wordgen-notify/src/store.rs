//! The bounded, time-ordered notification ledger.
//!
//! Head of the list is the most recently touched entry. All mutation goes
//! through [`NotificationStore::upsert`] and friends; every mutation
//! persists best-effort and publishes an immutable snapshot on a watch
//! channel so consumers subscribe instead of reaching into shared state.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::policy::{decide, UpsertDecision};
use crate::storage::Storage;
use crate::{NotificationItem, NotificationStatus};
use wordgen_protocol::StorageAddress;

const MAX_ENTRIES: usize = 5;
const TTL_DAYS: i64 = 7;
const STORAGE_KEY: &str = "wordgen.notifications";

/// Where a click on a notification should take the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    /// Request still in flight: route into the live request view even when
    /// no link was computed yet.
    LiveRequest {
        request_id: Option<String>,
        source_word: String,
        target_language: String,
        address: Option<StorageAddress>,
    },
    /// Resolved entry with a known route; address tokens ride along so the
    /// destination can skip a lookup.
    Navigate {
        route: String,
        address: Option<StorageAddress>,
    },
}

pub struct NotificationStore {
    entries: Mutex<Vec<NotificationItem>>,
    watch_tx: watch::Sender<Vec<NotificationItem>>,
    storage: Option<Arc<dyn Storage>>,
}

impl NotificationStore {
    /// Ephemeral store with no persistence.
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(Vec::new());
        Self {
            entries: Mutex::new(Vec::new()),
            watch_tx,
            storage: None,
        }
    }

    /// Store backed by persistence; loads and TTL-prunes the stored ledger.
    /// Any load failure is logged and treated as an empty store.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        let entries = load_entries(storage.as_ref());
        let (watch_tx, _) = watch::channel(entries.clone());
        Self {
            entries: Mutex::new(entries),
            watch_tx,
            storage: Some(storage),
        }
    }

    /// Apply a candidate under the override policy. Returns true when the
    /// ledger changed, false when the sticky rule rejected the update.
    pub fn upsert(&self, candidate: NotificationItem, force_override: bool) -> bool {
        let mut entries = self.entries.lock().expect("notification ledger poisoned");
        let existing_idx = entries.iter().position(|e| e.id == candidate.id);
        let existing_status = existing_idx.map(|i| entries[i].status);
        match decide(existing_status, candidate.status, force_override) {
            UpsertDecision::Reject => {
                tracing::debug!(
                    id = %candidate.id,
                    incoming = candidate.status.as_str(),
                    "sticky ledger entry rejected stale update"
                );
                return false;
            }
            UpsertDecision::Insert => {
                entries.insert(0, candidate);
            }
            UpsertDecision::Merge => {
                let idx = existing_idx.expect("merge decision implies existing entry");
                let mut entry = entries.remove(idx);
                let replace_all = force_override || candidate.status.forces_override();
                merge_into(&mut entry, candidate, replace_all);
                entries.insert(0, entry);
            }
        }
        entries.truncate(MAX_ENTRIES);
        self.after_mutation(&entries);
        true
    }

    pub fn mark_seen(&self, id: &str) {
        let mut entries = self.entries.lock().expect("notification ledger poisoned");
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.seen = true;
        }
        self.after_mutation(&entries);
    }

    pub fn mark_all_seen(&self) {
        let mut entries = self.entries.lock().expect("notification ledger poisoned");
        for entry in entries.iter_mut() {
            entry.seen = true;
        }
        self.after_mutation(&entries);
    }

    pub fn remove(&self, id: &str) {
        let mut entries = self.entries.lock().expect("notification ledger poisoned");
        entries.retain(|e| e.id != id);
        self.after_mutation(&entries);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("notification ledger poisoned");
        entries.clear();
        self.after_mutation(&entries);
    }

    pub fn unseen_count(&self) -> usize {
        let entries = self.entries.lock().expect("notification ledger poisoned");
        entries.iter().filter(|e| !e.seen).count()
    }

    pub fn snapshot(&self) -> Vec<NotificationItem> {
        self.entries
            .lock()
            .expect("notification ledger poisoned")
            .clone()
    }

    /// Subscribe to immutable ledger snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Vec<NotificationItem>> {
        self.watch_tx.subscribe()
    }

    /// Resolve a click on a notification to a navigation target.
    pub fn resolve_click(&self, id: &str) -> Option<ClickTarget> {
        let entries = self.entries.lock().expect("notification ledger poisoned");
        let entry = entries.iter().find(|e| e.id == id)?;
        let address = stored_address(entry);
        if entry.status.is_live() {
            return Some(ClickTarget::LiveRequest {
                request_id: entry.request_id.clone(),
                source_word: entry.source_word.clone(),
                target_language: entry.target_language.clone(),
                address,
            });
        }
        entry
            .link
            .clone()
            .map(|route| ClickTarget::Navigate { route, address })
    }

    fn after_mutation(&self, entries: &[NotificationItem]) {
        let snapshot = entries.to_vec();
        if let Some(storage) = self.storage.as_deref() {
            persist_entries(storage, &snapshot);
        }
        let _ = self.watch_tx.send_replace(snapshot);
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn stored_address(entry: &NotificationItem) -> Option<StorageAddress> {
    match (entry.pk.as_deref(), entry.sk.as_deref()) {
        (Some(pk), Some(sk)) => {
            let mut addr = StorageAddress::new(pk, sk);
            addr.media_ref = entry.media_ref.clone();
            Some(addr)
        }
        _ => None,
    }
}

fn merge_into(entry: &mut NotificationItem, candidate: NotificationItem, replace_all: bool) {
    let seen = entry.seen;
    if replace_all {
        let id = entry.id.clone();
        *entry = candidate;
        entry.id = id;
        entry.seen = seen;
        return;
    }
    entry.status = candidate.status;
    entry.timestamp = candidate.timestamp;
    if !candidate.title.is_empty() {
        entry.title = candidate.title;
    }
    if !candidate.message.is_empty() {
        entry.message = candidate.message;
    }
    if candidate.link.is_some() {
        entry.link = candidate.link;
    }
    if candidate.request_id.is_some() {
        entry.request_id = candidate.request_id;
    }
    if candidate.pk.is_some() {
        entry.pk = candidate.pk;
    }
    if candidate.sk.is_some() {
        entry.sk = candidate.sk;
    }
    if candidate.media_ref.is_some() {
        entry.media_ref = candidate.media_ref;
    }
    entry.progress = entry.progress.max(candidate.progress);
    entry.seen = seen;
}

fn load_entries(storage: &dyn Storage) -> Vec<NotificationItem> {
    let raw = match storage.get(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(%err, "failed to read notification ledger; starting empty");
            return Vec::new();
        }
    };
    let mut entries: Vec<NotificationItem> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(%err, "corrupt notification ledger; starting empty");
            return Vec::new();
        }
    };
    let cutoff = Utc::now() - Duration::days(TTL_DAYS);
    entries.retain(|e| e.timestamp > cutoff);
    entries.truncate(MAX_ENTRIES);
    entries
}

fn persist_entries(storage: &dyn Storage, entries: &[NotificationItem]) {
    let raw = match serde_json::to_string(entries) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%err, "failed to serialize notification ledger");
            return;
        }
    };
    if let Err(err) = storage.set(STORAGE_KEY, &raw) {
        tracing::warn!(%err, "failed to persist notification ledger");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn item(word: &str, status: NotificationStatus) -> NotificationItem {
        NotificationItem::new(word, Some("de"), "en", status)
    }

    #[test]
    fn inserting_six_distinct_keeps_five_most_recent() {
        let store = NotificationStore::new();
        for word in ["eins", "zwei", "drei", "vier", "fuenf", "sechs"] {
            assert!(store.upsert(item(word, NotificationStatus::Pending), false));
        }
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 5);
        // "eins" was the least-recently-touched and got evicted.
        assert!(!snapshot.iter().any(|e| e.source_word == "eins"));
        assert_eq!(snapshot[0].source_word, "sechs");
    }

    #[test]
    fn touching_an_entry_rescues_it_from_eviction() {
        let store = NotificationStore::new();
        for word in ["eins", "zwei", "drei", "vier", "fuenf"] {
            store.upsert(item(word, NotificationStatus::Pending), false);
        }
        // Touch the oldest, then insert a sixth.
        store.upsert(item("eins", NotificationStatus::Processing), false);
        store.upsert(item("sechs", NotificationStatus::Pending), false);
        let snapshot = store.snapshot();
        assert!(snapshot.iter().any(|e| e.source_word == "eins"));
        assert!(!snapshot.iter().any(|e| e.source_word == "zwei"));
    }

    #[test]
    fn redirect_entry_ignores_stale_processing_frames() {
        let store = NotificationStore::new();
        store.upsert(item("haus", NotificationStatus::Redirect), false);
        assert!(!store.upsert(item("haus", NotificationStatus::Processing), false));
        assert_eq!(store.snapshot()[0].status, NotificationStatus::Redirect);
    }

    #[test]
    fn forced_override_replaces_fields_but_preserves_seen() {
        let store = NotificationStore::new();
        store.upsert(
            item("haus", NotificationStatus::Processing).with_title("Generating"),
            false,
        );
        let id = store.snapshot()[0].id.clone();
        store.mark_seen(&id);

        let replacement = item("haus", NotificationStatus::Completed)
            .with_title("Done")
            .with_link("/words/de/en/noun/haus");
        assert!(store.upsert(replacement, true));
        let entry = &store.snapshot()[0];
        assert_eq!(entry.status, NotificationStatus::Completed);
        assert_eq!(entry.title, "Done");
        assert!(entry.seen, "seen flag must survive forced override");
    }

    #[test]
    fn pending_then_processing_merges_normally() {
        let store = NotificationStore::new();
        store.upsert(item("haus", NotificationStatus::Pending), false);
        store.upsert(
            item("haus", NotificationStatus::Processing).with_progress(40),
            false,
        );
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, NotificationStatus::Processing);
        assert_eq!(snapshot[0].progress, 40);
    }

    #[test]
    fn merge_never_regresses_progress() {
        let store = NotificationStore::new();
        store.upsert(
            item("haus", NotificationStatus::Processing).with_progress(70),
            false,
        );
        store.upsert(
            item("haus", NotificationStatus::Processing).with_progress(30),
            false,
        );
        assert_eq!(store.snapshot()[0].progress, 70);
    }

    #[test]
    fn unseen_count_and_mark_all_seen() {
        let store = NotificationStore::new();
        store.upsert(item("eins", NotificationStatus::Pending), false);
        store.upsert(item("zwei", NotificationStatus::Pending), false);
        assert_eq!(store.unseen_count(), 2);
        store.mark_all_seen();
        assert_eq!(store.unseen_count(), 0);
    }

    #[test]
    fn live_entries_route_into_the_request_view_without_a_link() {
        let store = NotificationStore::new();
        store.upsert(
            item("haus", NotificationStatus::Processing).with_request_id("r-1"),
            false,
        );
        let id = store.snapshot()[0].id.clone();
        match store.resolve_click(&id) {
            Some(ClickTarget::LiveRequest {
                request_id,
                source_word,
                target_language,
                address,
            }) => {
                assert_eq!(request_id.as_deref(), Some("r-1"));
                assert_eq!(source_word, "haus");
                assert_eq!(target_language, "en");
                assert!(address.is_none());
            }
            other => panic!("expected LiveRequest, got {:?}", other),
        }
    }

    #[test]
    fn resolved_entries_navigate_with_address_context() {
        let store = NotificationStore::new();
        store.upsert(
            item("haus", NotificationStatus::Redirect)
                .with_link("/words/de/en/noun/haus")
                .with_address("SRC#de#haus", "TGT#en"),
            false,
        );
        let id = store.snapshot()[0].id.clone();
        match store.resolve_click(&id) {
            Some(ClickTarget::Navigate { route, address }) => {
                assert_eq!(route, "/words/de/en/noun/haus");
                let address = address.expect("address context");
                assert_eq!(address.pk, "SRC#de#haus");
                assert_eq!(address.sk, "TGT#en");
            }
            other => panic!("expected Navigate, got {:?}", other),
        }
    }

    #[test]
    fn ledger_persists_and_reloads() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = NotificationStore::with_storage(storage.clone());
            store.upsert(item("haus", NotificationStatus::Processing), false);
        }
        let reloaded = NotificationStore::with_storage(storage);
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].source_word, "haus");
    }

    #[test]
    fn load_prunes_entries_older_than_ttl() {
        let storage = Arc::new(MemoryStorage::new());
        let mut stale = item("alt", NotificationStatus::Completed);
        stale.timestamp = Utc::now() - Duration::days(TTL_DAYS + 1);
        let fresh = item("neu", NotificationStatus::Pending);
        storage
            .set(
                STORAGE_KEY,
                &serde_json::to_string(&vec![stale, fresh]).expect("serialize"),
            )
            .expect("seed storage");

        let store = NotificationStore::with_storage(storage);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].source_word, "neu");
    }

    #[test]
    fn corrupt_persistence_is_swallowed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(STORAGE_KEY, "not json at all").expect("seed");
        let store = NotificationStore::with_storage(storage);
        assert!(store.snapshot().is_empty());
        // Store keeps working in memory afterwards.
        assert!(store.upsert(item("haus", NotificationStatus::Pending), false));
    }

    #[tokio::test]
    async fn watch_channel_carries_snapshots() {
        let store = NotificationStore::new();
        let mut rx = store.subscribe();
        store.upsert(item("haus", NotificationStatus::Pending), false);
        rx.changed().await.expect("snapshot published");
        assert_eq!(rx.borrow().len(), 1);
    }
}
