use glam::{DMat4, DQuat, DVec3};

use crate::animation::tracks::{InterpolationMode, KeyframeTrack};

/// Transform channel a track animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone)]
pub struct TrackMeta {
    pub node_name: String,
    pub target: TargetPath,
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<DVec3>),
    Quaternion(KeyframeTrack<DQuat>),
}

impl TrackData {
    fn last_time(&self) -> f64 {
        match self {
            TrackData::Vector3(track) => track.times.last().copied().unwrap_or(0.0),
            TrackData::Quaternion(track) => track.times.last().copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f64,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: String, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(|t| t.data.last_time()).fold(0.0_f64, f64::max);
        Self {
            name,
            duration,
            tracks,
        }
    }

    #[must_use]
    pub fn track(&self, node_name: &str, target: TargetPath) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.meta.node_name == node_name && t.meta.target == target)
    }

    /// Local matrix of `node_name` at `time`, composed from its three tracks.
    #[must_use]
    pub fn sample_matrix(&self, node_name: &str, time: f64) -> Option<DMat4> {
        let vector = |target| match &self.track(node_name, target)?.data {
            TrackData::Vector3(track) => track.sample(time),
            TrackData::Quaternion(_) => None,
        };
        let rotation = match &self.track(node_name, TargetPath::Rotation)?.data {
            TrackData::Quaternion(track) => track.sample(time)?,
            TrackData::Vector3(_) => return None,
        };
        Some(DMat4::from_scale_rotation_translation(
            vector(TargetPath::Scale)?,
            rotation,
            vector(TargetPath::Translation)?,
        ))
    }
}

/// Collects translation, rotation and scale keys per node while baking.
#[derive(Debug, Clone, Default)]
pub struct ClipBuilder {
    nodes: Vec<(String, [KeyframeTrack<DVec3>; 2], KeyframeTrack<DQuat>)>,
}

impl ClipBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys the decomposed local matrix of `node_name` at `time`.
    pub fn key(&mut self, node_name: &str, time: f64, matrix: &DMat4) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        let index = match self.nodes.iter().position(|(n, ..)| n == node_name) {
            Some(index) => index,
            None => {
                self.nodes.push((
                    node_name.to_owned(),
                    [
                        KeyframeTrack::new(InterpolationMode::Linear),
                        KeyframeTrack::new(InterpolationMode::Linear),
                    ],
                    KeyframeTrack::new(InterpolationMode::Linear),
                ));
                self.nodes.len() - 1
            }
        };
        let (_, [translations, scales], rotations) = &mut self.nodes[index];
        translations.insert_key(time, translation);
        scales.insert_key(time, scale);
        rotations.insert_key(time, rotation);
    }

    #[must_use]
    pub fn build(self, name: impl Into<String>) -> AnimationClip {
        let tracks = self
            .nodes
            .into_iter()
            .flat_map(|(node_name, [translations, scales], rotations)| {
                let meta = |target| TrackMeta {
                    node_name: node_name.clone(),
                    target,
                };
                [
                    Track {
                        meta: meta(TargetPath::Translation),
                        data: TrackData::Vector3(translations),
                    },
                    Track {
                        meta: meta(TargetPath::Rotation),
                        data: TrackData::Quaternion(rotations),
                    },
                    Track {
                        meta: meta(TargetPath::Scale),
                        data: TrackData::Vector3(scales),
                    },
                ]
            })
            .collect();
        AnimationClip::new(name.into(), tracks)
    }
}
