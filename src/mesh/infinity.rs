//! Boundary regularization with a virtual vertex at infinity.
//!
//! The collapse machinery wants every edge to have two incident faces. To
//! that end, each boundary loop is closed by one virtual vertex placed at
//! `+∞` and one virtual face per boundary edge. The virtual faces carry a
//! mirrored UV: at their two real corners they reuse the uv ids of the
//! opposite real face, and at the infinity corner they reference a single
//! virtual uv id. The virtual wedge accumulates a zero quadric, so boundary
//! collapses incur no texture cost from the virtual side; legality is still
//! enforced by the placement oracle, and edges touching the infinity vertex
//! itself are never collapsible.
//!
//! The augmentation is undone implicitly during final compaction: virtual
//! faces are appended after all real faces and are dropped wholesale by
//! `clean_mesh`.

use nalgebra::{Point2, Point3};

use crate::error::Result;
use crate::mesh::flaps::EdgeFlaps;
use crate::mesh::{TexturedMesh, NULL_INDEX};

/// Bookkeeping produced by [`connect_boundary_to_infinity`].
#[derive(Debug, Clone, Copy)]
pub struct InfinityAugmentation {
    /// Index of the appended infinity vertex, if the mesh had a boundary.
    pub infinity_vertex: Option<usize>,
    /// Index of the appended virtual uv, if the mesh had a boundary.
    pub infinity_uv: Option<usize>,
    /// Number of faces before augmentation; faces at or past this index are
    /// virtual.
    pub num_real_faces: usize,
}

impl InfinityAugmentation {
    /// Whether `v` is the virtual infinity vertex.
    #[inline]
    pub fn is_infinity_vertex(&self, v: usize) -> bool {
        self.infinity_vertex == Some(v)
    }
}

/// Close every boundary loop of `mesh` with virtual faces through a single
/// vertex at infinity.
///
/// For a boundary edge traversed `a → b` by its one real face, the appended
/// virtual face is `[b, a, inf]` — infinity vertex in the third corner slot —
/// so that the virtual side traverses the edge in the opposite direction and
/// the augmented mesh stays consistently oriented. Closed meshes are left
/// untouched.
pub fn connect_boundary_to_infinity(mesh: &mut TexturedMesh) -> Result<InfinityAugmentation> {
    let num_real_faces = mesh.num_faces();
    let flaps = EdgeFlaps::build(&mesh.faces)?;

    let mut boundary: Vec<(usize, usize)> = Vec::new();
    for e in 0..flaps.num_edges() {
        let [f0, f1] = flaps.edge_faces[e];
        if f0 == NULL_INDEX || f1 == NULL_INDEX {
            let side = if f0 == NULL_INDEX { 1 } else { 0 };
            boundary.push((flaps.edge_faces[e][side], flaps.edge_corners[e][side]));
        }
    }

    if boundary.is_empty() {
        return Ok(InfinityAugmentation {
            infinity_vertex: None,
            infinity_uv: None,
            num_real_faces,
        });
    }

    let v_inf = mesh.positions.len();
    let t_inf = mesh.uvs.len();
    mesh.positions
        .push(Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY));
    mesh.uvs.push(Point2::new(f64::INFINITY, f64::INFINITY));

    for (f, c) in boundary {
        let a = mesh.faces[f][(c + 1) % 3];
        let b = mesh.faces[f][(c + 2) % 3];
        let ta = mesh.uv_faces[f][(c + 1) % 3];
        let tb = mesh.uv_faces[f][(c + 2) % 3];
        mesh.faces.push([b, a, v_inf]);
        mesh.uv_faces.push([tb, ta, t_inf]);
    }

    Ok(InfinityAugmentation {
        infinity_vertex: Some(v_inf),
        infinity_uv: Some(t_inf),
        num_real_faces,
    })
}
