//! Response normalizer: turns upstream payloads of unknown shape into
//! [`GameRecord`]s.
//!
//! Nothing in here fails. Unrecognized envelopes become empty listings and
//! unusable fields fall back to placeholder values, so a half-broken upstream
//! response still renders.

use std::hash::BuildHasher;

use foldhash::HashSet;
use foldhash::fast::FixedState;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{GameRecord, UNKNOWN_GAME_NAME};

/// Keys folded into dedicated record fields and therefore not passed through.
const CONSUMED_KEYS: &[&str] = &["id", "name", "provider", "thumbnail", "image"];

const ID_KEYS: &[&str] = &["id", "platformId", "slug"];
const NAME_KEYS: &[&str] = &["name", "gameText", "title"];

const FALLBACK_ID_SEED: u64 = 0x6c6f_6262_7969_6473;

/// Shape of an image-like upstream field.
enum ImageField<'a> {
    Url(&'a str),
    Variants(&'a Map<String, Value>),
    Missing,
}

impl<'a> ImageField<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(url)) => ImageField::Url(url),
            Some(Value::Object(variants)) => ImageField::Variants(variants),
            _ => ImageField::Missing,
        }
    }
}

/// Recognized listing envelopes returned by the catalog API.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingPayload {
    /// `{ games: [...], totalCount?, pageNumber?, pageSize? }` from the tiles endpoint.
    Tiles {
        games: Vec<Value>,
        total_count: Option<usize>,
        page_number: Option<u32>,
        page_size: Option<u32>,
    },
    /// `{ components: [{ type: "game-list", games, total }] }` from curated pages.
    Components {
        games: Vec<Value>,
        total: Option<usize>,
    },
    /// A bare array of games.
    Bare(Vec<Value>),
    Unrecognized,
}

impl ListingPayload {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(games) => ListingPayload::Bare(games),
            Value::Object(mut root) => {
                if let Some(Value::Array(games)) = root.remove("games") {
                    return ListingPayload::Tiles {
                        games,
                        total_count: count_field(&root, &["totalCount", "total"]),
                        page_number: count_field(&root, &["pageNumber"]).map(clamp_u32),
                        page_size: count_field(&root, &["pageSize"]).map(clamp_u32),
                    };
                }
                if let Some(Value::Array(components)) = root.remove("components") {
                    return components_listing(components);
                }
                match root.remove("data") {
                    Some(inner @ (Value::Array(_) | Value::Object(_))) => {
                        ListingPayload::from_value(inner)
                    }
                    _ => ListingPayload::Unrecognized,
                }
            }
            _ => ListingPayload::Unrecognized,
        }
    }
}

fn components_listing(components: Vec<Value>) -> ListingPayload {
    let mut games = Vec::new();
    let mut total: Option<usize> = None;
    let mut saw_game_list = false;

    for component in components {
        let Value::Object(mut component) = component else {
            continue;
        };
        if component.get("type").and_then(Value::as_str) != Some("game-list") {
            continue;
        }
        saw_game_list = true;
        if let Some(count) = count_field(&component, &["total"]) {
            total = Some(total.unwrap_or(0) + count);
        }
        if let Some(Value::Array(list)) = component.remove("games") {
            games.extend(list);
        }
    }

    if saw_game_list {
        ListingPayload::Components { games, total }
    } else {
        ListingPayload::Unrecognized
    }
}

/// A normalized listing: records plus whatever paging metadata the envelope carried.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedListing {
    pub items: Vec<GameRecord>,
    pub total_count: Option<usize>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

/// Normalizes a full listing response. Ids are unique in the result; later
/// duplicates are dropped.
pub fn normalize_listing(value: Value) -> NormalizedListing {
    let (games, total_count, page_number, page_size) = match ListingPayload::from_value(value) {
        ListingPayload::Tiles {
            games,
            total_count,
            page_number,
            page_size,
        } => (games, total_count, page_number, page_size),
        ListingPayload::Components { games, total } => (games, total, None, None),
        ListingPayload::Bare(games) => (games, None, None, None),
        ListingPayload::Unrecognized => {
            warn!("unrecognized listing payload, treating as empty");
            (Vec::new(), None, None, None)
        }
    };

    let mut seen = HashSet::default();
    let mut items = Vec::with_capacity(games.len());
    for (index, raw) in games.into_iter().enumerate() {
        let record = normalize_game(raw, index);
        if seen.insert(record.id.clone()) {
            items.push(record);
        } else {
            debug!(id = %record.id, "dropping duplicate game in listing");
        }
    }

    NormalizedListing {
        items,
        total_count,
        page_number,
        page_size,
    }
}

/// Normalizes one raw game entry. `index` is its position in the response and
/// only feeds the fallback id.
pub fn normalize_game(raw: Value, index: usize) -> GameRecord {
    match raw {
        Value::Object(map) => normalize_object(map, index),
        other => {
            debug!(index, value = %other, "non-object game entry, using placeholder");
            normalize_object(Map::new(), index)
        }
    }
}

fn normalize_object(raw: Map<String, Value>, index: usize) -> GameRecord {
    let name = first_string(&raw, NAME_KEYS).unwrap_or_else(|| UNKNOWN_GAME_NAME.to_string());
    let provider = resolve_provider(&raw);
    let id = first_id(&raw).unwrap_or_else(|| fallback_id(&name, provider.as_deref(), index));
    let thumbnail = resolve_thumbnail(&raw, &name);

    let extra = raw
        .into_iter()
        .filter(|(key, _)| !CONSUMED_KEYS.contains(&key.as_str()))
        .collect();

    GameRecord {
        id,
        name,
        thumbnail,
        provider,
        extra,
    }
}

fn first_string(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_id(raw: &Map<String, Value>) -> Option<String> {
    ID_KEYS.iter().find_map(|key| match raw.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn resolve_provider(raw: &Map<String, Value>) -> Option<String> {
    let from_provider = match raw.get("provider") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("name").and_then(Value::as_str),
        _ => None,
    };
    from_provider
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| first_string(raw, &["providerName"]))
}

/// Deterministic id for entries without any id-like field, stable across
/// re-fetches of the same listing.
fn fallback_id(name: &str, provider: Option<&str>, index: usize) -> String {
    let hash = FixedState::with_seed(FALLBACK_ID_SEED).hash_one((name, provider, index));
    format!("anon-{hash:016x}")
}

/// Whether `candidate` may be stored as a thumbnail.
pub fn is_valid_thumbnail(candidate: &str) -> bool {
    candidate.starts_with("http") || candidate.starts_with('/')
}

/// Takes the first non-empty candidate in priority order; an invalid one
/// clears the thumbnail instead of falling through to later candidates.
fn resolve_thumbnail(raw: &Map<String, Value>, name: &str) -> String {
    let Some(candidate) = thumbnail_candidates(raw).into_iter().next() else {
        return String::new();
    };
    if is_valid_thumbnail(candidate) {
        return candidate.to_string();
    }
    warn!(game = %name, candidate, "discarding invalid thumbnail");
    String::new()
}

fn thumbnail_candidates(raw: &Map<String, Value>) -> Vec<&str> {
    let mut candidates = Vec::new();

    match ImageField::of(raw.get("thumbnail")) {
        ImageField::Url(url) => candidates.push(url),
        ImageField::Variants(variants) => {
            candidates.extend(strings_at(variants, &["url", "original", "small", "thumbnail"]));
        }
        ImageField::Missing => {}
    }

    match ImageField::of(raw.get("image")) {
        ImageField::Url(url) => candidates.push(url),
        ImageField::Variants(image) => {
            for size in ["original", "small", "thumbnail"] {
                match ImageField::of(image.get(size)) {
                    ImageField::Url(url) => candidates.push(url),
                    ImageField::Variants(nested) => {
                        candidates.extend(strings_at(nested, &["url", "src", "original"]));
                    }
                    ImageField::Missing => {}
                }
            }
            candidates.extend(strings_at(
                image,
                &["url", "src", "original", "small", "thumbnail"],
            ));
        }
        ImageField::Missing => {}
    }

    if let Some(Value::Object(original)) = raw
        .get("providerLogo")
        .and_then(|logo| logo.get("original"))
    {
        candidates.extend(strings_at(original, &["src", "url"]));
    }

    candidates
        .into_iter()
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

fn strings_at<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Vec<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .collect()
}

fn count_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
