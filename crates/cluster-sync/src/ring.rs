use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::SyncError;
use crate::model::Node;
use crate::palette::{self, Color, NodeAttribute, Palette};
use crate::surface::GraphSurface;

/// Set-valued attribute a node ring can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingKey {
    Source,
    Effect,
}

impl RingKey {
    pub fn tags<'a>(&self, node: &'a Node) -> &'a BTreeSet<String> {
        match self {
            RingKey::Source => &node.source_tags,
            RingKey::Effect => &node.effect_tags,
        }
    }

    pub fn attribute(&self) -> NodeAttribute {
        match self {
            RingKey::Source => NodeAttribute::Source,
            RingKey::Effect => NodeAttribute::Effect,
        }
    }
}

impl FromStr for RingKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(RingKey::Source),
            "effect" => Ok(RingKey::Effect),
            other => Err(SyncError::UnsupportedRingKey(other.to_string())),
        }
    }
}

/// Which attribute to draw as rings, and with which colors. A ring
/// without a key clears every ring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingSpec {
    pub key: Option<RingKey>,
    pub palette: Palette,
}

impl RingSpec {
    pub fn new(key: RingKey, palette: Palette) -> Self {
        Self {
            key: Some(key),
            palette,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// One colored arc of a node ring, in degrees clockwise from the top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSlice {
    pub start_deg: f32,
    pub end_deg: f32,
    pub color: Color,
}

impl RingSlice {
    pub fn sweep(&self) -> f32 {
        self.end_deg - self.start_deg
    }
}

/// Equal slices for each distinct tag in sorted order. The slices tile
/// the full circle exactly; no tags means no slices.
pub fn slices_for(tags: &BTreeSet<String>, palette: &Palette) -> Vec<RingSlice> {
    let count = tags.len();
    tags.iter()
        .enumerate()
        .map(|(i, tag)| {
            let start = 360.0 * i as f64 / count as f64;
            let end = if i + 1 == count {
                360.0
            } else {
                360.0 * (i + 1) as f64 / count as f64
            };
            RingSlice {
                start_deg: start as f32,
                end_deg: end as f32,
                color: palette::lookup(palette, tag),
            }
        })
        .collect()
}

/// Apply (or clear) rings on every node of the surface.
pub fn draw<S: GraphSurface + ?Sized>(surface: &mut S, nodes: &[Node], spec: &RingSpec) {
    for node in nodes {
        let slices = match spec.key {
            Some(key) => slices_for(key.tags(node), &spec.palette),
            None => Vec::new(),
        };
        surface.set_ring(&node.id, slices);
    }
}
