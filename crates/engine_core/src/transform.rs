//! World pose (position + orientation) for anything placed along the road.

use bytemuck::{Pod, Zeroable};
use glam::{DMat3, DMat4, DQuat, DVec3, Mat4, Quat, Vec3};

/// World up axis. Roads are generated with this as their reference up.
pub const WORLD_UP: DVec3 = DVec3::Y;
/// Default forward axis: the road advances along +Z.
pub const WORLD_FORWARD: DVec3 = DVec3::Z;

/// A world-space position and orientation in double precision.
///
/// Local +Z is forward, +Y is up and +X is right (right = up × forward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Pose at `position` whose forward axis faces `direction`, rolled so its
    /// up axis stays as close to `up` as possible.
    pub fn facing(position: DVec3, direction: DVec3, up: DVec3) -> Self {
        let forward = match direction.try_normalize() {
            Some(f) => f,
            None => return Self::from_position(position),
        };
        let right = match up.cross(forward).try_normalize() {
            Some(r) => r,
            // Looking straight up or down: any perpendicular works.
            None => forward.any_orthonormal_vector(),
        };
        let local_up = forward.cross(right);
        let rotation = DQuat::from_mat3(&DMat3::from_cols(right, local_up, forward)).normalize();
        Self { position, rotation }
    }

    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }

    pub fn right(&self) -> DVec3 {
        self.rotation * DVec3::X
    }

    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    /// Model matrix for this pose.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Single-precision model matrix handed to presentation layers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PoseRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Pose> for PoseRaw {
    fn from(pose: &Pose) -> Self {
        let q = pose.rotation;
        let rotation = Quat::from_xyzw(q.x as f32, q.y as f32, q.z as f32, q.w as f32);
        let translation = Vec3::new(
            pose.position.x as f32,
            pose.position.y as f32,
            pose.position.z as f32,
        );
        Self {
            model: Mat4::from_rotation_translation(rotation, translation).to_cols_array_2d(),
        }
    }
}

impl From<Pose> for PoseRaw {
    fn from(pose: Pose) -> Self {
        Self::from(&pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn facing_forward_axis_is_identity() {
        let pose = Pose::facing(DVec3::new(1.0, 2.0, 3.0), WORLD_FORWARD, WORLD_UP);
        assert!(close(pose.forward(), DVec3::Z));
        assert!(close(pose.right(), DVec3::X));
        assert!(close(pose.up(), DVec3::Y));
    }

    #[test]
    fn facing_turned_direction_keeps_basis_orthonormal() {
        let dir = DVec3::new(1.0, 0.2, 1.0).normalize();
        let pose = Pose::facing(DVec3::ZERO, dir, WORLD_UP);
        assert!(close(pose.forward(), dir));
        assert!(pose.right().dot(pose.forward()).abs() < 1e-9);
        assert!(pose.right().y.abs() < 1e-9);
        assert!(pose.up().y > 0.0);
    }

    #[test]
    fn facing_zero_direction_falls_back_to_identity() {
        let pose = Pose::facing(DVec3::ONE, DVec3::ZERO, WORLD_UP);
        assert_eq!(pose.rotation, DQuat::IDENTITY);
        assert_eq!(pose.position, DVec3::ONE);
    }

    #[test]
    fn raw_pose_carries_translation() {
        let raw = PoseRaw::from(Pose::from_position(DVec3::new(4.0, 5.0, 6.0)));
        assert_eq!(raw.model[3], [4.0, 5.0, 6.0, 1.0]);
    }
}
