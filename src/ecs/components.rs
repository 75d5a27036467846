//! Common ECS components

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component, relative to the entity's parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in parent space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Decompose a matrix into a transform
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// Get the transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Velocity component for physics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Gameplay tag used for collision filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

/// Whether the entity takes part in simulation and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Active(pub bool);

impl Default for Active {
    fn default() -> Self {
        Self(true)
    }
}

/// Marks a template entity that only exists to be cloned.
///
/// Prefabs are never active and never unloaded with a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prefab;

/// Marks a root entity that survives scene unloads, together with its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Persistent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            position: Vec3::new(1.0, -2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
            scale: Vec3::splat(2.0),
        };

        let decomposed = Transform::from_matrix(transform.matrix());
        assert!(decomposed.position.abs_diff_eq(transform.position, 1e-5));
        assert!(decomposed.scale.abs_diff_eq(transform.scale, 1e-5));
        assert!(decomposed.rotation.abs_diff_eq(transform.rotation, 1e-5));
    }

    #[test]
    fn test_transform_forward() {
        let transform =
            Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::PI));
        assert!(transform.forward().abs_diff_eq(Vec3::Z, 1e-5));
    }
}
