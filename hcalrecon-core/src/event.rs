//! Per-event container standing in for the framework's event bus.
//!
//! Hit collections are addressed by `(collection, pass)`; products are stored
//! under the output name configured on the producer that made them.

use crate::error::{Error, Result};
use crate::hit::HcalHit;
use crate::track::Track;
use crate::trigger::TriggerDecision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of a hit collection on the event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputTag {
    /// Collection name, e.g. `hcalDigis`.
    pub collection: String,
    /// Name of the pass that produced it, e.g. `recon`.
    pub pass: String,
}

impl InputTag {
    /// Creates a tag from collection and pass names.
    pub fn new(collection: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            pass: pass.into(),
        }
    }
}

impl Default for InputTag {
    fn default() -> Self {
        Self::new("hcalDigis", "recon")
    }
}

impl fmt::Display for InputTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.collection, self.pass)
    }
}

/// Output object written back to the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Product {
    /// Collection of tracks.
    Tracks(Vec<Track>),
    /// A trigger decision.
    Trigger(TriggerDecision),
}

/// One event: read-only hit collections plus the products added to it.
#[derive(Debug, Clone, Default)]
pub struct Event {
    number: u64,
    collections: BTreeMap<InputTag, Vec<HcalHit>>,
    products: BTreeMap<String, Product>,
}

impl Event {
    /// Creates an empty event.
    pub fn new(number: u64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Event number.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Adds (or replaces) a hit collection.
    pub fn insert_collection(&mut self, tag: InputTag, hits: Vec<HcalHit>) {
        self.collections.insert(tag, hits);
    }

    /// Hits of the collection addressed by `tag`.
    pub fn collection(&self, tag: &InputTag) -> Result<&[HcalHit]> {
        self.collections
            .get(tag)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingCollection {
                event: self.number,
                collection: tag.collection.clone(),
                pass: tag.pass.clone(),
            })
    }

    /// Iterates over all hit collections.
    pub fn collections(&self) -> impl Iterator<Item = (&InputTag, &[HcalHit])> {
        self.collections
            .iter()
            .map(|(tag, hits)| (tag, hits.as_slice()))
    }

    /// Stores a product; each name may be written once per event.
    pub fn add(&mut self, name: impl Into<String>, product: Product) -> Result<()> {
        let name = name.into();
        if self.products.contains_key(&name) {
            return Err(Error::DuplicateProduct(name));
        }
        self.products.insert(name, product);
        Ok(())
    }

    /// Whether a product named `name` has been stored.
    pub fn contains_product(&self, name: &str) -> bool {
        self.products.contains_key(name)
    }

    /// Looks up a product by name.
    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    /// Tracks stored under `name`, if that product is a track collection.
    pub fn tracks(&self, name: &str) -> Option<&[Track]> {
        match self.products.get(name)? {
            Product::Tracks(tracks) => Some(tracks),
            Product::Trigger(_) => None,
        }
    }

    /// Trigger decision stored under `name`, if that product is a trigger.
    pub fn trigger(&self, name: &str) -> Option<&TriggerDecision> {
        match self.products.get(name)? {
            Product::Trigger(decision) => Some(decision),
            Product::Tracks(_) => None,
        }
    }

    /// All products, ordered by name.
    pub fn products(&self) -> &BTreeMap<String, Product> {
        &self.products
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::Section;

    #[test]
    fn test_collection_lookup() {
        let mut event = Event::new(7);
        let hits = vec![HcalHit::new(Section::Back, 1, 2, 10.0, 1.0)];
        event.insert_collection(InputTag::default(), hits.clone());

        assert_eq!(event.collection(&InputTag::default()).unwrap(), &hits[..]);

        let err = event
            .collection(&InputTag::new("hcalDigis", "sim"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingCollection { event: 7, .. }));
    }

    #[test]
    fn test_products_written_once() {
        let mut event = Event::new(1);
        event
            .add(
                "cosmicMuonTrigger",
                Product::Trigger(TriggerDecision::rejected("cosmicMuonTrigger")),
            )
            .unwrap();
        event.add("HcalTracks", Product::Tracks(Vec::new())).unwrap();

        assert!(event.contains_product("HcalTracks"));
        assert!(!event.contains_product("hcalMipTracks"));
        assert!(event.trigger("cosmicMuonTrigger").is_some());
        assert!(event.tracks("cosmicMuonTrigger").is_none());
        assert_eq!(event.tracks("HcalTracks").map(<[Track]>::len), Some(0));

        let err = event
            .add("HcalTracks", Product::Tracks(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateProduct(name) if name == "HcalTracks"));
    }

    #[test]
    fn test_input_tag_display() {
        assert_eq!(InputTag::default().to_string(), "hcalDigis_recon");
    }
}
