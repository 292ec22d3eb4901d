//! Fundamental types for the RepCoach engine.

use chrono::Utc;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a coaching session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Timestamp wrapper with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Milliseconds elapsed since `earlier`
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

/// 33-landmark body joint definition (MediaPipe Pose layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Joint {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Joint {
    pub const COUNT: usize = 33;

    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEyeInner),
            2 => Some(Self::LeftEye),
            3 => Some(Self::LeftEyeOuter),
            4 => Some(Self::RightEyeInner),
            5 => Some(Self::RightEye),
            6 => Some(Self::RightEyeOuter),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            9 => Some(Self::MouthLeft),
            10 => Some(Self::MouthRight),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            17 => Some(Self::LeftPinky),
            18 => Some(Self::RightPinky),
            19 => Some(Self::LeftIndex),
            20 => Some(Self::RightIndex),
            21 => Some(Self::LeftThumb),
            22 => Some(Self::RightThumb),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            25 => Some(Self::LeftKnee),
            26 => Some(Self::RightKnee),
            27 => Some(Self::LeftAnkle),
            28 => Some(Self::RightAnkle),
            29 => Some(Self::LeftHeel),
            30 => Some(Self::RightHeel),
            31 => Some(Self::LeftFootIndex),
            32 => Some(Self::RightFootIndex),
            _ => None,
        }
    }
}

/// Single tracked body landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth, unused by planar features
    #[serde(default)]
    pub z: f64,
    /// Detector confidence [0, 1]
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    pub fn with_visibility(x: f64, y: f64, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    pub fn point2(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// One timestamped snapshot of tracked joint coordinates.
///
/// Transient: produced by the external pose detector once per tick and
/// discarded after evaluation. Joints the detector failed to resolve are
/// `None`.
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    pub timestamp: Timestamp,
    landmarks: [Option<Landmark>; Joint::COUNT],
}

impl LandmarkFrame {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            landmarks: [None; Joint::COUNT],
        }
    }

    /// Build from a flat `[x, y, z, visibility]` quad per joint, as delivered
    /// by the browser detector bridge. Returns `None` unless exactly
    /// `4 * Joint::COUNT` values are supplied.
    pub fn from_flat(timestamp: Timestamp, data: &[f64]) -> Option<Self> {
        if data.len() != 4 * Joint::COUNT {
            return None;
        }

        let mut frame = Self::new(timestamp);
        for (i, quad) in data.chunks_exact(4).enumerate() {
            let joint = Joint::from_index(i as u8)?;
            frame.set(
                joint,
                Landmark {
                    x: quad[0],
                    y: quad[1],
                    z: quad[2],
                    visibility: quad[3] as f32,
                },
            );
        }
        Some(frame)
    }

    pub fn set(&mut self, joint: Joint, landmark: Landmark) {
        self.landmarks[joint as usize] = Some(landmark);
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks[joint as usize].as_ref()
    }

    /// Landmark for `joint` if present and at or above the visibility floor
    pub fn visible(&self, joint: Joint, min_visibility: f32) -> Option<&Landmark> {
        self.get(joint)
            .filter(|lm| lm.visibility >= min_visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_roundtrip() {
        for i in 0..Joint::COUNT as u8 {
            let joint = Joint::from_index(i).expect("index in range");
            assert_eq!(joint as u8, i);
        }
        assert!(Joint::from_index(Joint::COUNT as u8).is_none());
    }

    #[test]
    fn test_frame_visibility_gate() {
        let mut frame = LandmarkFrame::new(Timestamp::from_millis(0));
        frame.set(Joint::LeftKnee, Landmark::with_visibility(0.5, 0.5, 0.3));

        assert!(frame.get(Joint::LeftKnee).is_some());
        assert!(frame.visible(Joint::LeftKnee, 0.5).is_none());
        assert!(frame.visible(Joint::LeftKnee, 0.2).is_some());
        assert!(frame.visible(Joint::RightKnee, 0.0).is_none());
    }

    #[test]
    fn test_frame_from_flat() {
        let mut data = vec![0.0; 4 * Joint::COUNT];
        let base = Joint::LeftWrist as usize * 4;
        data[base] = 0.25;
        data[base + 1] = 0.75;
        data[base + 3] = 0.9;

        let frame = LandmarkFrame::from_flat(Timestamp::from_millis(10), &data)
            .expect("full quad set");
        let wrist = frame.get(Joint::LeftWrist).expect("wrist present");
        assert!((wrist.x - 0.25).abs() < 1e-12);
        assert!((wrist.y - 0.75).abs() < 1e-12);

        assert!(LandmarkFrame::from_flat(Timestamp::from_millis(10), &data[..10]).is_none());
    }

    #[test]
    fn test_timestamp_millis_since() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = Timestamp::from_millis(1_450);
        assert_eq!(t1.millis_since(t0), 450);
        assert!((t1.as_secs_f64() - 1.45).abs() < 1e-12);
    }
}
