//! Hcal sections, hits and detector geometry.

use crate::config::{ConfigResult, ParameterSet};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// One of the five sub-detectors composing the Hcal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Section {
    /// Downstream of the ECal, 81 layers by default.
    Back,
    /// Side section above the ECal.
    Top,
    /// Side section below the ECal.
    Bottom,
    /// Side section on the left of the ECal.
    Left,
    /// Side section on the right of the ECal.
    Right,
}

impl Section {
    /// All sections in raw-value order.
    pub const ALL: [Section; 5] = [
        Section::Back,
        Section::Top,
        Section::Bottom,
        Section::Left,
        Section::Right,
    ];

    /// Raw value used by the detector ID (0 = Back ... 4 = Right).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Section for a raw detector ID value.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name as it appears in parameter names, e.g. `Back` in
    /// `MinConsecutiveLayersHitBackHcal`.
    pub fn name(self) -> &'static str {
        match self {
            Section::Back => "Back",
            Section::Top => "Top",
            Section::Bottom => "Bottom",
            Section::Left => "Left",
            Section::Right => "Right",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownSection(s.to_string()))
    }
}

impl TryFrom<String> for Section {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Section> for String {
    fn from(section: Section) -> Self {
        section.name().to_string()
    }
}

/// Fixed-size table holding one value per [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerSection<T>(pub [T; 5]);

impl<T: Copy> PerSection<T> {
    /// Same value for every section.
    pub fn splat(value: T) -> Self {
        Self([value; 5])
    }

    /// Value for Back and a shared value for the four side sections.
    pub fn back_and_sides(back: T, sides: T) -> Self {
        Self([back, sides, sides, sides, sides])
    }
}

impl<T> PerSection<T> {
    /// Iterates over `(section, value)` pairs in section order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &T)> {
        Section::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Section> for PerSection<T> {
    type Output = T;

    fn index(&self, section: Section) -> &T {
        &self.0[section.index()]
    }
}

impl<T> IndexMut<Section> for PerSection<T> {
    fn index_mut(&mut self, section: Section) -> &mut T {
        &mut self.0[section.index()]
    }
}

/// A single reconstructed Hcal hit as read from the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HcalHit {
    /// Section the hit belongs to.
    pub section: Section,
    /// Layer number, starting at 1.
    pub layer: i32,
    /// Strip number within the layer, starting at 0.
    pub strip: i32,
    /// Number of photo-electrons.
    pub pe: f32,
    /// Reconstructed energy (MeV).
    pub energy: f32,
}

impl HcalHit {
    /// Creates a new hit.
    #[inline]
    pub fn new(section: Section, layer: i32, strip: i32, pe: f32, energy: f32) -> Self {
        Self {
            section,
            layer,
            strip,
            pe,
            energy,
        }
    }

    /// A hit is noise when it has fewer photo-electrons than `min_pe`.
    #[inline]
    pub fn is_noise(&self, min_pe: f32) -> bool {
        self.pe < min_pe
    }
}

/// Number of layers and strips in each section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HcalGeometry {
    /// Layers per section (numbered `1..=layers`).
    pub layers: PerSection<i32>,
    /// Strips per layer (numbered `0..strips`).
    pub strips: PerSection<i32>,
}

impl Default for HcalGeometry {
    fn default() -> Self {
        Self {
            layers: PerSection::back_and_sides(81, 17),
            strips: PerSection::back_and_sides(34, 31),
        }
    }
}

impl HcalGeometry {
    /// Last layer number of a section.
    #[inline]
    pub fn last_layer(&self, section: Section) -> i32 {
        self.layers[section]
    }

    /// Whether the hit's layer and strip exist in its section.
    #[inline]
    pub fn contains(&self, hit: &HcalHit) -> bool {
        (1..=self.layers[hit.section]).contains(&hit.layer)
            && (0..self.strips[hit.section]).contains(&hit.strip)
    }

    /// Reads `NumLayers<Section>Hcal` / `NumStrips<Section>Hcal`.
    ///
    /// The single-section `NumHcalLayers` / `NumHcalStrips` keys used by the
    /// track producer scripts set the Back section.
    pub fn from_parameters(ps: &ParameterSet) -> ConfigResult<Self> {
        Self::from_parameters_with(Self::default(), ps)
    }

    /// Reads the layer and strip counts on top of `base`.
    pub fn from_parameters_with(base: Self, ps: &ParameterSet) -> ConfigResult<Self> {
        let mut geometry = base;
        for section in Section::ALL {
            let (layers_key, strips_key) = Self::keys(section);
            geometry.layers[section] = positive(ps, &layers_key, base.layers[section])?;
            geometry.strips[section] = positive(ps, &strips_key, base.strips[section])?;
        }
        if ps.contains("NumHcalLayers") {
            geometry.layers[Section::Back] =
                positive(ps, "NumHcalLayers", geometry.layers[Section::Back])?;
        }
        if ps.contains("NumHcalStrips") {
            geometry.strips[Section::Back] =
                positive(ps, "NumHcalStrips", geometry.strips[Section::Back])?;
        }
        Ok(geometry)
    }

    /// Writes the per-section layer and strip counts.
    pub fn write_parameters(&self, ps: &mut ParameterSet) {
        for section in Section::ALL {
            let (layers_key, strips_key) = Self::keys(section);
            ps.insert(layers_key, self.layers[section]);
            ps.insert(strips_key, self.strips[section]);
        }
    }

    fn keys(section: Section) -> (String, String) {
        (
            format!("NumLayers{section}Hcal"),
            format!("NumStrips{section}Hcal"),
        )
    }
}

fn positive(ps: &ParameterSet, name: &str, default: i32) -> ConfigResult<i32> {
    let value = ps.get_positive_count(name, default.unsigned_abs())?;
    i32::try_from(value).map_err(|_| ConfigError::WrongType {
        name: name.to_string(),
        expected: "a layer or strip count",
    })
}
