//! # Block Side Module
//!
//! The six faces of a voxel block, in the axis convention used throughout the
//! engine: X is forward, Y is right, Z is up.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The discriminants index the face-vertex table used by the culled mesher,
/// so the order here must match `BLOCK_TRIANGLES` in the meshing module.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face toward positive X.
    Forward = 0,
    /// The face toward positive Y.
    Right = 1,
    /// The face toward negative X.
    Backward = 2,
    /// The face toward negative Y.
    Left = 3,
    /// The face toward positive Z.
    Up = 4,
    /// The face toward negative Z.
    Down = 5,
}

impl BlockSide {
    /// All six faces, in discriminant order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::Forward,
            BlockSide::Right,
            BlockSide::Backward,
            BlockSide::Left,
            BlockSide::Up,
            BlockSide::Down,
        ]
    }

    /// The unit offset to the neighboring block across this face.
    pub fn offset(&self) -> Vector3<i32> {
        match self {
            BlockSide::Forward => Vector3::new(1, 0, 0),
            BlockSide::Right => Vector3::new(0, 1, 0),
            BlockSide::Backward => Vector3::new(-1, 0, 0),
            BlockSide::Left => Vector3::new(0, -1, 0),
            BlockSide::Up => Vector3::new(0, 0, 1),
            BlockSide::Down => Vector3::new(0, 0, -1),
        }
    }

    /// The outward unit normal of this face.
    pub fn normal(&self) -> Vector3<f32> {
        let o = self.offset();
        Vector3::new(o.x as f32, o.y as f32, o.z as f32)
    }
}
