//! Node transform helpers.
//!
//! TRS to matrix is always exact. Matrix to TRS only succeeds for affine
//! matrices without shear; anything else is reported instead of guessed.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use thiserror::Error;

use crate::types::Node;

/// Shear tolerance between normalized basis axes.
pub const SHEAR_EPSILON: f32 = 1e-6;

/// Determinant magnitude below which the linear part counts as singular.
const DETERMINANT_EPSILON: f32 = 1e-12;

/// Which representation of a node's transform is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Identity matrix and default TRS
    None,
    Matrix,
    Trs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecomposeError {
    /// Upper 3x3 has (near) zero determinant
    #[error("matrix is singular and cannot be decomposed")]
    Degenerate,
    /// Basis axes are not orthogonal within tolerance
    #[error("matrix contains shear and cannot be decomposed into TRS")]
    Sheared,
    /// Bottom row is not (0, 0, 0, 1)
    #[error("matrix is not affine")]
    Projective,
}

/// Build a column-major matrix from translation, rotation and scale.
pub fn trs_to_matrix(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Split an affine matrix into translation, rotation and scale.
pub fn decompose_matrix(matrix: &Mat4) -> Result<(Vec3, Quat, Vec3), DecomposeError> {
    if matrix.row(3) != Vec4::W {
        return Err(DecomposeError::Projective);
    }

    let linear = Mat3::from_mat4(*matrix);
    if linear.determinant().abs() < DETERMINANT_EPSILON {
        return Err(DecomposeError::Degenerate);
    }

    let x = linear.x_axis.normalize();
    let y = linear.y_axis.normalize();
    let z = linear.z_axis.normalize();
    if x.dot(y).abs() > SHEAR_EPSILON
        || x.dot(z).abs() > SHEAR_EPSILON
        || y.dot(z).abs() > SHEAR_EPSILON
    {
        return Err(DecomposeError::Sheared);
    }

    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    Ok((translation, rotation, scale))
}

impl Node {
    /// Local transform as a matrix, whichever form is authoritative.
    pub fn local_matrix(&self) -> Mat4 {
        match self.transform_kind() {
            TransformKind::Matrix => self.matrix,
            TransformKind::Trs => trs_to_matrix(self.translation, self.rotation, self.scale),
            TransformKind::None => Mat4::IDENTITY,
        }
    }

    /// Local transform as TRS, decomposing the matrix when it is authoritative.
    pub fn local_trs(&self) -> Result<(Vec3, Quat, Vec3), DecomposeError> {
        match self.transform_kind() {
            TransformKind::Matrix => decompose_matrix(&self.matrix),
            _ => Ok((self.translation, self.rotation, self.scale)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trs_roundtrip() {
        let t = Vec3::new(1.0, 2.0, 3.0);
        let r = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let s = Vec3::new(2.0, 2.0, 2.0);
        let m = trs_to_matrix(t, r, s);

        let (t2, r2, s2) = decompose_matrix(&m).unwrap();
        assert!(t2.abs_diff_eq(t, 1e-5));
        assert!(s2.abs_diff_eq(s, 1e-5));
        assert!(r2.abs_diff_eq(r, 1e-5) || r2.abs_diff_eq(-r, 1e-5));
    }

    #[test]
    fn test_rejects_degenerate() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(decompose_matrix(&m), Err(DecomposeError::Degenerate));
    }

    #[test]
    fn test_rejects_shear() {
        let mut m = Mat4::IDENTITY;
        m.y_axis.x = 0.5;
        assert_eq!(decompose_matrix(&m), Err(DecomposeError::Sheared));
    }

    #[test]
    fn test_rejects_projective() {
        let mut m = Mat4::IDENTITY;
        m.x_axis.w = 0.25;
        assert_eq!(decompose_matrix(&m), Err(DecomposeError::Projective));
    }

    #[test]
    fn test_node_local_matrix_prefers_matrix() {
        let node = Node {
            matrix: Mat4::from_translation(Vec3::X),
            translation: Vec3::Y,
            ..Default::default()
        };
        assert_eq!(node.local_matrix(), Mat4::from_translation(Vec3::X));

        let node = Node {
            translation: Vec3::Y,
            ..Default::default()
        };
        assert_eq!(node.local_matrix(), Mat4::from_translation(Vec3::Y));
        assert_eq!(node.local_trs().unwrap().0, Vec3::Y);
    }
}
