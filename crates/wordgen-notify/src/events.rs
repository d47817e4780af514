//! Maps channel events onto ledger updates.
//!
//! The ledger consumes the event stream independently of the per-request
//! tracker: every relevant frame becomes an upsert under the request's
//! deterministic key, and the override table sorts out ordering.

use serde_json::Value;

use crate::store::NotificationStore;
use crate::{NotificationItem, NotificationStatus};
use wordgen_address::{redirect_address, route_from_address, word_route};
use wordgen_protocol::{InboundEvent, WordRequest};

/// Fold one channel event into the ledger. Returns true when the ledger
/// changed.
pub fn apply_event(store: &NotificationStore, request: &WordRequest, event: &InboundEvent) -> bool {
    let src = request.source_language.as_deref();
    let base = |status: NotificationStatus| {
        let mut item = NotificationItem::new(
            request.source_word.clone(),
            src,
            request.target_language.clone(),
            status,
        )
        .with_title(request.source_word.clone());
        if let Some(id) = request.request_id.as_deref() {
            item = item.with_request_id(id);
        }
        item
    };

    match event {
        InboundEvent::SubscriptionConfirmed { request_id } => {
            let mut item = base(NotificationStatus::Pending).with_message("Request received");
            if let Some(id) = request_id.as_deref() {
                item = item.with_request_id(id);
            }
            store.upsert(item, false)
        }
        InboundEvent::ProcessingStarted { request_id, data } => {
            let mut item = base(NotificationStatus::Processing)
                .with_message("Generating entry")
                .with_progress(progress_of(data).unwrap_or(5));
            if let Some(id) = request_id.as_deref() {
                item = item.with_request_id(id);
            }
            store.upsert(item, false)
        }
        InboundEvent::ChunkUpdate { data, .. } | InboundEvent::StepUpdate { data, .. } => {
            let mut item = base(NotificationStatus::Processing).with_message("Generating entry");
            if let Some(progress) = progress_of(data) {
                item = item.with_progress(progress);
            }
            store.upsert(item, false)
        }
        InboundEvent::ProcessingCompleted { data, .. } => {
            let word = data
                .get("word")
                .and_then(|v| v.as_str())
                .unwrap_or(&request.source_word);
            let result_src = data
                .get("source_language")
                .and_then(|v| v.as_str())
                .or(src)
                .unwrap_or("auto");
            let pos = data.get("part_of_speech").and_then(|v| v.as_str());
            let route = word_route(result_src, &request.target_language, pos, word);
            let addr = redirect_address(
                data,
                &request.source_word,
                result_src,
                &request.target_language,
            );
            let mut item = base(NotificationStatus::Completed)
                .with_message("Entry ready")
                .with_progress(100)
                .with_link(route)
                .with_address(addr.pk, addr.sk);
            item.media_ref = addr.media_ref;
            store.upsert(item, false)
        }
        InboundEvent::ProcessingFailed { reason, .. } => {
            let message = reason.clone().unwrap_or_else(|| "Generation failed".to_string());
            store.upsert(base(NotificationStatus::Failed).with_message(message), false)
        }
        InboundEvent::ValidationFailed { issue, .. } => {
            let message = issue.clone().unwrap_or_else(|| "Word rejected".to_string());
            store.upsert(base(NotificationStatus::Failed).with_message(message), false)
        }
        InboundEvent::WordExistsRedirect { data, .. } => {
            let addr = redirect_address(
                data,
                &request.source_word,
                src.unwrap_or("auto"),
                &request.target_language,
            );
            let route = route_from_address(&addr).unwrap_or_else(|| {
                word_route(
                    src.unwrap_or("auto"),
                    &request.target_language,
                    None,
                    &request.source_word,
                )
            });
            let mut item = base(NotificationStatus::Redirect)
                .with_message("Entry already exists")
                .with_progress(100)
                .with_link(route)
                .with_address(addr.pk, addr.sk);
            item.media_ref = addr.media_ref;
            store.upsert(item, true)
        }
        InboundEvent::ConnectionClose { .. } | InboundEvent::Unknown { .. } => false,
    }
}

fn progress_of(data: &Value) -> Option<u8> {
    data.get("progress")
        .and_then(|v| v.as_u64())
        .map(|p| p.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wordgen_protocol::decode_frame;

    fn request() -> WordRequest {
        WordRequest::new("Haus", "en").with_source_language("de")
    }

    #[test]
    fn redirect_event_locks_the_entry() {
        let store = NotificationStore::new();
        let req = request();
        let redirect = decode_frame(
            &json!({
                "type": "word_exists_redirect",
                "data": {"existing_item": {"PK": "SRC#de#haus", "SK": "TGT#en"}}
            })
            .to_string(),
        )
        .expect("decode");
        assert!(apply_event(&store, &req, &redirect));

        let entry = &store.snapshot()[0];
        assert_eq!(entry.status, NotificationStatus::Redirect);
        assert_eq!(entry.pk.as_deref(), Some("SRC#de#haus"));
        assert_eq!(entry.link.as_deref(), Some("/words/de/en/pending/haus"));

        // A stale processing frame for the same request changes nothing.
        let stale = decode_frame(&json!({"type": "processing_started"}).to_string()).expect("decode");
        assert!(!apply_event(&store, &req, &stale));
        assert_eq!(store.snapshot()[0].status, NotificationStatus::Redirect);
    }

    #[test]
    fn completed_event_links_the_result_route() {
        let store = NotificationStore::new();
        let req = request();
        let completed = decode_frame(
            &json!({
                "type": "processing_completed",
                "data": {"word": "Haus", "part_of_speech": "Masculine Noun", "source_language": "de"}
            })
            .to_string(),
        )
        .expect("decode");
        apply_event(&store, &req, &completed);
        let entry = &store.snapshot()[0];
        assert_eq!(entry.status, NotificationStatus::Completed);
        assert_eq!(entry.progress, 100);
        assert_eq!(entry.link.as_deref(), Some("/words/de/en/noun/haus"));
    }

    #[test]
    fn progress_frames_update_in_place() {
        let store = NotificationStore::new();
        let req = request();
        for (frame, expected) in [
            (json!({"type": "subscription_confirmed"}), 0u8),
            (json!({"type": "processing_started"}), 5),
            (json!({"type": "chunk_update", "data": {"progress": 60}}), 60),
        ] {
            let ev = decode_frame(&frame.to_string()).expect("decode");
            apply_event(&store, &req, &ev);
            let snapshot = store.snapshot();
            assert_eq!(snapshot.len(), 1, "one entry per request key");
            assert_eq!(snapshot[0].progress, expected);
        }
    }

    #[test]
    fn unknown_and_close_frames_leave_the_ledger_alone() {
        let store = NotificationStore::new();
        let req = request();
        let unknown = decode_frame(&json!({"type": "whatever"}).to_string()).expect("decode");
        let close = decode_frame(&json!({"type": "connection_close"}).to_string()).expect("decode");
        assert!(!apply_event(&store, &req, &unknown));
        assert!(!apply_event(&store, &req, &close));
        assert!(store.snapshot().is_empty());
    }
}
