use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Tag name establishing a parent reference to another item.
pub const REF_TAG: &str = "e";

/// Tag name of the proof-of-work commitment: `["nonce", "<nonce>", "<target>"]`.
pub const COMMITMENT_TAG: &str = "nonce";

/// Kind discriminator for an item. Wire values follow the original
/// numeric tags; the set is semantic, not exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum ItemKind {
    /// A root note, or a reply when it carries a parent reference.
    Note,
    Reaction,
    Report,
    Other(u16),
}

impl From<u16> for ItemKind {
    fn from(n: u16) -> Self {
        match n {
            1 => ItemKind::Note,
            7 => ItemKind::Reaction,
            1984 => ItemKind::Report,
            other => ItemKind::Other(other),
        }
    }
}

impl From<ItemKind> for u16 {
    fn from(kind: ItemKind) -> u16 {
        match kind {
            ItemKind::Note => 1,
            ItemKind::Reaction => 7,
            ItemKind::Report => 1984,
            ItemKind::Other(n) => n,
        }
    }
}

/// An immutable, content-addressed record.
///
/// The engine never mutates an item's content — it only decides whether to
/// keep or delete it, and how to score it. `id` is the hex-encoded content
/// hash; `tags` carry typed annotations, each a list of strings whose first
/// element is the tag name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub created_at: u64,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
}

impl Item {
    /// The parent this item references, if any. The first `e` tag with a
    /// value is authoritative; further reference tags are ignored.
    pub fn parent(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.len() >= 2 && t[0] == REF_TAG)
            .map(|t| t[1].as_str())
    }

    /// Whether the item carries a proof-of-work commitment tag at all.
    pub fn has_commitment(&self) -> bool {
        self.tags.iter().any(|t| t.len() >= 2 && t[0] == COMMITMENT_TAG)
    }

    /// The raw claimed-target field of the commitment tag, unparsed.
    pub fn commitment_target(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.len() >= 3 && t[0] == COMMITMENT_TAG)
            .map(|t| t[2].as_str())
    }

    /// Age relative to `now`, in fractional days. Items stamped in the
    /// future have age 0.
    pub fn age_days(&self, now: u64) -> f64 {
        now.saturating_sub(self.created_at) as f64 / 86400.0
    }
}

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
