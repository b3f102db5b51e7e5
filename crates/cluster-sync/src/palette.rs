use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::Node;

pub const SATURATION: f32 = 0.65;
pub const LIGHTNESS: f32 = 0.55;

/// Fallback for keys missing from a palette.
pub const NEUTRAL_GRAY: Color = Color::rgb(0x99, 0x99, 0x99);

/// An sRGB color with alpha. Serialized as `#rrggbb` / `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Hue in degrees, saturation and lightness in [0, 1].
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }

    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?).with_alpha(byte(6)?)),
            _ => None,
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
            .ok_or_else(|| format!("invalid color {value:?}, expected #rrggbb"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub type Palette = BTreeMap<String, Color>;

/// Look up a key, falling back to neutral gray.
pub fn lookup(palette: &Palette, key: &str) -> Color {
    palette.get(key).copied().unwrap_or(NEUTRAL_GRAY)
}

/// Categorical node attributes that can be colored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeAttribute {
    Cluster,
    Source,
    Effect,
}

impl NodeAttribute {
    pub const ALL: [NodeAttribute; 3] =
        [NodeAttribute::Cluster, NodeAttribute::Source, NodeAttribute::Effect];

    pub fn name(&self) -> &'static str {
        match self {
            NodeAttribute::Cluster => "cluster",
            NodeAttribute::Source => "source",
            NodeAttribute::Effect => "effect",
        }
    }

    /// Every value the node contributes; set-valued attributes
    /// contribute each element.
    pub fn values(&self, node: &Node) -> Vec<String> {
        match self {
            NodeAttribute::Cluster => vec![node.cluster.to_string()],
            NodeAttribute::Source => node.source_tags.iter().cloned().collect(),
            NodeAttribute::Effect => node.effect_tags.iter().cloned().collect(),
        }
    }
}

/// Evenly distribute the distinct keys around the hue wheel in
/// lexicographic order.
pub fn palette_for_keys<I>(keys: I) -> Palette
where
    I: IntoIterator<Item = String>,
{
    let sorted: BTreeSet<String> = keys.into_iter().collect();
    let count = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, key)| {
            let hue = (360.0 * index as f32 / count as f32).round();
            (key, Color::from_hsl(hue, SATURATION, LIGHTNESS))
        })
        .collect()
}

pub fn generate(nodes: &[Node], attribute: NodeAttribute) -> Palette {
    palette_for_keys(nodes.iter().flat_map(|node| attribute.values(node)))
}

/// Generated palettes for every attribute plus caller overrides, which
/// take precedence key by key.
#[derive(Debug, Clone, Default)]
pub struct Palettes {
    generated: BTreeMap<NodeAttribute, Palette>,
    overrides: BTreeMap<NodeAttribute, Palette>,
}

impl Palettes {
    pub fn generate_all(nodes: &[Node]) -> Self {
        let mut palettes = Self::default();
        palettes.regenerate(nodes);
        palettes
    }

    /// Recompute generated palettes, keeping overrides.
    pub fn regenerate(&mut self, nodes: &[Node]) {
        self.generated = NodeAttribute::ALL
            .iter()
            .map(|attribute| (*attribute, generate(nodes, *attribute)))
            .collect();
    }

    /// Replace the generated palette of one attribute.
    pub fn set_generated(&mut self, attribute: NodeAttribute, palette: Palette) {
        self.generated.insert(attribute, palette);
    }

    pub fn set_override(&mut self, attribute: NodeAttribute, mapping: Palette) {
        self.overrides.insert(attribute, mapping);
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// The effective palette for an attribute.
    pub fn get(&self, attribute: NodeAttribute) -> Palette {
        let mut palette =
            self.generated.get(&attribute).cloned().unwrap_or_default();
        if let Some(overrides) = self.overrides.get(&attribute) {
            palette.extend(overrides.iter().map(|(k, c)| (k.clone(), *c)));
        }
        palette
    }

    pub fn all(&self) -> BTreeMap<NodeAttribute, Palette> {
        NodeAttribute::ALL
            .iter()
            .map(|attribute| (*attribute, self.get(*attribute)))
            .collect()
    }
}
