//! # Selvage
//!
//! Seam-aware mesh decimation: reduce a UV-textured triangle mesh to a
//! target vertex count while preserving the discontinuity structure of its
//! parameterization.
//!
//! The engine collapses edges in order of least error, measured jointly over
//! geometry and texture space with 5D quadric error metrics kept per *wedge*
//! (per position/uv identity pair). Texture seams, mesh boundaries, and UV
//! fold-overs constrain which collapses are legal, at a configurable
//! strictness.
//!
//! ## Quick Start
//!
//! ```no_run
//! use selvage::algo::decimate::{decimate, DecimateOptions};
//! use selvage::io;
//!
//! // Load a mesh with texture coordinates.
//! let mesh = io::load_obj("model.obj").unwrap();
//!
//! // Halve the vertex count, seamlessly.
//! let options = DecimateOptions::with_target(mesh.num_vertices() / 2);
//! let result = decimate(&mesh, &options).unwrap();
//!
//! println!(
//!     "decimated to {} vertices (max error {:.6})",
//!     result.mesh.num_vertices(),
//!     result.max_error
//! );
//! io::save_obj(&result.mesh, "decimated.obj").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use selvage::mesh::TexturedMesh;
//! use nalgebra::{Point2, Point3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let uvs = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.5, 1.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//! let mesh = TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use selvage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::decimate::{decimate, DecimateOptions, Decimation, SeamAwareDegree};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::TexturedMesh;
}

// Re-export nalgebra types for convenience
pub use nalgebra;
