//! Core mesh data structures.
//!
//! This module provides the face-vertex mesh representation used by the
//! decimation engine, together with the derived topology tables.
//!
//! # Overview
//!
//! The primary type is [`TexturedMesh`], a triangle mesh with an attached UV
//! parameterization. Positions and texture coordinates live in separate index
//! spaces: `faces[f][k]` indexes into `positions` while `uv_faces[f][k]`
//! indexes into `uvs`. A (position id, uv id) pair appearing at some face
//! corner is called a *wedge*; a position vertex on a texture seam owns more
//! than one wedge.
//!
//! Derived topology lives in submodules:
//! - [`flaps`] — undirected edge tables (`E`, `EMAP`, `EF`, `EI`) and
//!   one-ring circulation,
//! - [`seams`] — seam/boundary/fold-over classification and the mutable
//!   seam-edge set,
//! - [`infinity`] — boundary regularization via a virtual vertex at infinity,
//! - [`compact`] — removal of dead faces and unreferenced coordinates.

pub mod compact;
pub mod flaps;
pub mod infinity;
pub mod seams;

use nalgebra::{Point2, Point3, Vector3};

use crate::error::{MeshError, Result};

/// Sentinel index marking dead faces, dead edges, and absent flap sides.
pub const NULL_INDEX: usize = usize::MAX;

/// A triangle mesh with UV texture coordinates.
///
/// Invariants (checked by [`TexturedMesh::new`]):
/// - `faces` and `uv_faces` have the same length and are co-indexed,
/// - every position index is within `positions`, every uv index within `uvs`.
///
/// Zero-area triangles are accepted.
#[derive(Debug, Clone, Default)]
pub struct TexturedMesh {
    /// 3D vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// 2D texture coordinates.
    pub uvs: Vec<Point2<f64>>,
    /// Position index triples, one per triangle.
    pub faces: Vec<[usize; 3]>,
    /// Texture coordinate index triples, co-indexed with `faces`.
    pub uv_faces: Vec<[usize; 3]>,
}

impl TexturedMesh {
    /// Create a mesh from raw arrays, validating all indices.
    pub fn new(
        positions: Vec<Point3<f64>>,
        uvs: Vec<Point2<f64>>,
        faces: Vec<[usize; 3]>,
        uv_faces: Vec<[usize; 3]>,
    ) -> Result<Self> {
        if faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if faces.len() != uv_faces.len() {
            return Err(MeshError::invalid_param(
                "uv_faces",
                uv_faces.len(),
                "must be co-indexed with faces",
            ));
        }
        for (f, face) in faces.iter().enumerate() {
            for &v in face {
                if v >= positions.len() {
                    return Err(MeshError::InvalidVertexIndex { face: f, vertex: v });
                }
            }
        }
        for (f, face) in uv_faces.iter().enumerate() {
            for &t in face {
                if t >= uvs.len() {
                    return Err(MeshError::InvalidUvIndex { face: f, uv: t });
                }
            }
        }
        Ok(Self {
            positions,
            uvs,
            faces,
            uv_faces,
        })
    }

    /// Number of position vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of texture coordinates.
    #[inline]
    pub fn num_uvs(&self) -> usize {
        self.uvs.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Area of triangle `f`.
    pub fn face_area(&self, f: usize) -> f64 {
        let [a, b, c] = self.faces[f];
        triangle_area(&self.positions[a], &self.positions[b], &self.positions[c])
    }

    /// Mean triangle area over all faces.
    ///
    /// Used by the decimation driver to choose the global position scale so
    /// that the mean triangle area equals one in the scaled metric.
    pub fn mean_face_area(&self) -> f64 {
        if self.faces.is_empty() {
            return 0.0;
        }
        let total: f64 = (0..self.faces.len()).map(|f| self.face_area(f)).sum();
        total / self.faces.len() as f64
    }
}

/// Area-weighted normal of a triangle (half the edge cross product).
///
/// The direction encodes the triangle's orientation; the magnitude is its
/// area. Degenerate triangles yield the zero vector.
#[inline]
pub fn area_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Vector3<f64> {
    0.5 * (b - a).cross(&(c - a))
}

/// Area of a 3D triangle.
#[inline]
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    area_normal(a, b, c).norm()
}

/// Twice the signed area of a 2D (UV) triangle.
///
/// Positive for counter-clockwise winding.
#[inline]
pub fn uv_double_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> TexturedMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uvs = positions.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap()
    }

    #[test]
    fn test_quad_counts_and_areas() {
        let mesh = unit_quad();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_uvs(), 4);
        assert_eq!(mesh.num_faces(), 2);
        assert!((mesh.face_area(0) - 0.5).abs() < 1e-12);
        assert!((mesh.mean_face_area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_indices() {
        let positions = vec![Point3::origin(); 3];
        let uvs = vec![Point2::origin(); 3];
        let err = TexturedMesh::new(positions, uvs, vec![[0, 1, 7]], vec![[0, 1, 2]]);
        assert!(matches!(
            err,
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 7 })
        ));
    }

    #[test]
    fn test_rejects_mismatched_uv_faces() {
        let positions = vec![Point3::origin(); 3];
        let uvs = vec![Point2::origin(); 3];
        let err = TexturedMesh::new(positions, uvs, vec![[0, 1, 2]], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn test_uv_double_area_sign() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!(uv_double_area(&a, &b, &c) > 0.0);
        assert!(uv_double_area(&a, &c, &b) < 0.0);
    }
}
