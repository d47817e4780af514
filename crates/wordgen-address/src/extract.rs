//! Address extraction from redirect payloads.
//!
//! A `word_exists_redirect` frame may carry its address three ways, in
//! order of preference: explicit top-level `pk`/`sk` tokens, a nested
//! existing-item structure (upper- or lower-case key names), or enough
//! word/language fields to reconstruct the address from scratch.

use serde_json::Value;

use crate::{build_address, language_code, normalize_part_of_speech, normalize_word};
use wordgen_protocol::StorageAddress;

/// Resolve the address a redirect payload points at, falling back to the
/// submitted request context when the payload is silent. Total: always
/// yields an address.
pub fn redirect_address(
    data: &Value,
    source_word: &str,
    source_language: &str,
    target_language: &str,
) -> StorageAddress {
    if let Some(addr) = explicit_tokens(data) {
        return addr;
    }
    if let Some(addr) = nested_existing_item(data) {
        return addr;
    }
    let word = str_field(data, "word")
        .or_else(|| str_field(data, "source_word"))
        .unwrap_or_else(|| source_word.to_string());
    let src = str_field(data, "source_language").unwrap_or_else(|| source_language.to_string());
    let tgt = str_field(data, "target_language").unwrap_or_else(|| target_language.to_string());
    let pos = str_field(data, "part_of_speech").or_else(|| str_field(data, "pos"));
    let mut addr = build_address(&word, &src, &tgt, pos.as_deref());
    addr.media_ref = media_ref(data);
    addr
}

/// Light pattern extraction for routing: `SRC#<lang>#<word>` /
/// `TGT#<lang>[#POS#<pos>]` tokens yield a `/words/...` route. Anything
/// else is left opaque.
pub fn route_from_address(addr: &StorageAddress) -> Option<String> {
    let mut pk_parts = addr.pk.splitn(3, '#');
    if pk_parts.next() != Some("SRC") {
        return None;
    }
    let source_lang = pk_parts.next().filter(|s| !s.is_empty())?;
    let word = pk_parts.next().filter(|s| !s.is_empty())?;

    let sk_parts: Vec<&str> = addr.sk.split('#').collect();
    if sk_parts.first() != Some(&"TGT") || sk_parts.len() < 2 || sk_parts[1].is_empty() {
        return None;
    }
    let target_lang = sk_parts[1];
    let pos = match sk_parts.get(2) {
        Some(&"POS") => sk_parts.get(3).copied().unwrap_or("pending"),
        _ => "pending",
    };
    Some(format!(
        "/words/{}/{}/{}/{}",
        language_code(source_lang),
        language_code(target_lang),
        normalize_part_of_speech(pos),
        normalize_word(word)
    ))
}

fn explicit_tokens(data: &Value) -> Option<StorageAddress> {
    let pk = str_field(data, "pk").or_else(|| str_field(data, "PK"))?;
    let sk = str_field(data, "sk").or_else(|| str_field(data, "SK"))?;
    let mut addr = StorageAddress::new(pk, sk);
    addr.media_ref = media_ref(data);
    Some(addr)
}

fn nested_existing_item(data: &Value) -> Option<StorageAddress> {
    let item = data
        .get("existing_item")
        .or_else(|| data.get("existing_word"))
        .or_else(|| data.get("existingItem"))?;
    let pk = str_field(item, "PK").or_else(|| str_field(item, "pk"))?;
    let sk = str_field(item, "SK").or_else(|| str_field(item, "sk"))?;
    let mut addr = StorageAddress::new(pk, sk);
    addr.media_ref = media_ref(item).or_else(|| media_ref(data));
    Some(addr)
}

fn media_ref(data: &Value) -> Option<String> {
    str_field(data, "media_ref")
        .or_else(|| str_field(data, "mediaRef"))
        .or_else(|| str_field(data, "media"))
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_top_level_tokens_win() {
        let data = json!({
            "pk": "SRC#en#haus",
            "sk": "TGT#es",
            "existing_item": {"PK": "SRC#xx#nope", "SK": "TGT#xx"}
        });
        let addr = redirect_address(&data, "Haus", "de", "en");
        assert_eq!(addr.pk, "SRC#en#haus");
        assert_eq!(addr.sk, "TGT#es");
    }

    #[test]
    fn nested_existing_item_is_second_choice() {
        let data = json!({"existing_item": {"PK": "SRC#en#haus", "SK": "TGT#es"}});
        let addr = redirect_address(&data, "Haus", "de", "en");
        assert_eq!(addr.pk, "SRC#en#haus");
        assert_eq!(addr.sk, "TGT#es");
        assert_eq!(addr.media_ref, None);
    }

    #[test]
    fn reconstruction_falls_back_to_request_context() {
        let addr = redirect_address(&json!({}), "Häuser", "German", "en");
        assert_eq!(addr.pk, "SRC#de#hauser");
        assert_eq!(addr.sk, "TGT#en");
    }

    #[test]
    fn reconstruction_prefers_payload_fields_over_request() {
        let data = json!({"word": "Maus", "source_language": "de", "part_of_speech": "feminine noun"});
        let addr = redirect_address(&data, "Haus", "en", "en");
        assert_eq!(addr.pk, "SRC#de#maus");
        assert_eq!(addr.sk, "TGT#en#POS#noun");
    }

    #[test]
    fn media_reference_is_carried_when_present() {
        let data = json!({
            "existing_item": {"PK": "SRC#en#haus", "SK": "TGT#es", "media_ref": "media/haus.jpg"}
        });
        let addr = redirect_address(&data, "Haus", "de", "en");
        assert_eq!(addr.media_ref.as_deref(), Some("media/haus.jpg"));
    }

    #[test]
    fn route_from_wellformed_address_tokens() {
        let addr = StorageAddress::new("SRC#en#haus", "TGT#es");
        assert_eq!(
            route_from_address(&addr).as_deref(),
            Some("/words/en/es/pending/haus")
        );
        let addr = StorageAddress::new("SRC#de#hauser", "TGT#en#POS#noun");
        assert_eq!(
            route_from_address(&addr).as_deref(),
            Some("/words/de/en/noun/hauser")
        );
    }

    #[test]
    fn opaque_tokens_yield_no_route() {
        assert_eq!(route_from_address(&StorageAddress::new("whatever", "TGT#en")), None);
        assert_eq!(route_from_address(&StorageAddress::new("SRC#en#haus", "opaque")), None);
    }
}
