use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{FrameSize, Keypoint, KeypointName};

/// Trait for reading pose landmarks from a pose-estimation provider.
///
/// Implement this for whatever your pose library hands back per frame. The
/// measurement engine only ever asks for single landmarks by name.
pub trait LandmarkSource {
    /// The raw landmark for `name`, in normalized coordinates.
    /// Returns `None` if the provider did not report it.
    fn keypoint(&self, name: KeypointName) -> Option<Keypoint>;
}

/// Providers that emit the landmarks as an ordered list, indexed by
/// [`KeypointName::index`]. Indices past the end of the list are absent.
impl LandmarkSource for [Keypoint] {
    fn keypoint(&self, name: KeypointName) -> Option<Keypoint> {
        self.get(name.index()).copied()
    }
}

impl LandmarkSource for Vec<Keypoint> {
    fn keypoint(&self, name: KeypointName) -> Option<Keypoint> {
        self.as_slice().keypoint(name)
    }
}

/// A simple name-keyed landmark set implementing [`LandmarkSource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Landmarks {
    points: BTreeMap<KeypointName, Keypoint>,
}

impl Landmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered provider list. Entries beyond the known
    /// vocabulary are ignored.
    pub fn from_indexed(points: &[Keypoint]) -> Self {
        points
            .iter()
            .enumerate()
            .filter_map(|(i, kp)| KeypointName::from_index(i).map(|name| (name, *kp)))
            .collect()
    }

    pub fn with(mut self, name: KeypointName, keypoint: Keypoint) -> Self {
        self.points.insert(name, keypoint);
        self
    }

    pub fn insert(&mut self, name: KeypointName, keypoint: Keypoint) -> Option<Keypoint> {
        self.points.insert(name, keypoint)
    }

    pub fn get_mut(&mut self, name: KeypointName) -> Option<&mut Keypoint> {
        self.points.get_mut(&name)
    }

    pub fn remove(&mut self, name: KeypointName) -> Option<Keypoint> {
        self.points.remove(&name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeypointName, &Keypoint)> {
        self.points.iter().map(|(name, kp)| (*name, kp))
    }
}

impl LandmarkSource for Landmarks {
    fn keypoint(&self, name: KeypointName) -> Option<Keypoint> {
        self.points.get(&name).copied()
    }
}

impl FromIterator<(KeypointName, Keypoint)> for Landmarks {
    fn from_iter<T: IntoIterator<Item = (KeypointName, Keypoint)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Landmarks as a provider hands them over: keyed by name or as the ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoseLandmarks {
    Named(Landmarks),
    Indexed(Vec<Keypoint>),
}

impl LandmarkSource for PoseLandmarks {
    fn keypoint(&self, name: KeypointName) -> Option<Keypoint> {
        match self {
            Self::Named(landmarks) => landmarks.keypoint(name),
            Self::Indexed(list) => list.keypoint(name),
        }
    }
}

/// One frame of pose-estimation output. `landmarks` is `None` when no
/// person was detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub landmarks: Option<PoseLandmarks>,
}

impl LandmarkFrame {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}
