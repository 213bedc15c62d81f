//! Edge-flap topology tables.
//!
//! For every undirected edge of a triangle mesh, the *flap* records its two
//! endpoint vertices, the two incident faces, and the corner opposite the
//! edge within each incident face. The tables mirror the classic
//! matrix-based layout:
//!
//! - `edges[e]` — endpoint position ids, lower id first (`E`),
//! - `emap[k * num_faces + f]` — the edge opposite corner `k` of face `f`
//!   (`EMAP`),
//! - `edge_faces[e]` — the two incident faces (`EF`), [`NULL_INDEX`] on an
//!   absent (boundary) side,
//! - `edge_corners[e]` — the corner index opposite the edge within each
//!   incident face (`EI`).
//!
//! Side 0 of a flap is the face in which the edge appears counter-clockwise
//! as `edges[e][0] → edges[e][1]`.
//!
//! The tables are built once per mesh; the collapse executor patches them
//! incrementally instead of rebuilding.

use std::collections::HashMap;

use crate::error::{MeshError, Result};
use crate::mesh::NULL_INDEX;

/// Edge-flap tables for a triangle mesh.
#[derive(Debug, Clone)]
pub struct EdgeFlaps {
    /// Endpoint position ids per undirected edge, lower id first.
    pub edges: Vec<[usize; 2]>,
    /// Corner-to-edge map: `emap[k * num_faces + f]` is the edge opposite
    /// corner `k` of face `f`.
    pub emap: Vec<usize>,
    /// Incident faces per edge.
    pub edge_faces: Vec<[usize; 2]>,
    /// Opposite-corner indices per edge, co-indexed with `edge_faces`.
    pub edge_corners: Vec<[usize; 2]>,
    num_faces: usize,
}

/// A face corner visited while circulating a vertex one-ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCorner {
    /// The face id.
    pub face: usize,
    /// The corner within the face holding the circulated vertex.
    pub corner: usize,
}

impl EdgeFlaps {
    /// Build the flap tables from a face array.
    ///
    /// Edges are indexed in lexicographic order of their sorted endpoint
    /// pairs, making the tables deterministic for a given face array.
    /// Returns [`MeshError::NonManifoldEdge`] if more than two faces share an
    /// edge or two faces traverse it in the same direction.
    pub fn build(faces: &[[usize; 3]]) -> Result<Self> {
        let m = faces.len();

        let mut pairs: Vec<[usize; 2]> = Vec::with_capacity(3 * m);
        for face in faces {
            for k in 0..3 {
                let a = face[(k + 1) % 3];
                let b = face[(k + 2) % 3];
                pairs.push(if a < b { [a, b] } else { [b, a] });
            }
        }
        pairs.sort_unstable();
        pairs.dedup();

        let index: HashMap<[usize; 2], usize> =
            pairs.iter().enumerate().map(|(e, &p)| (p, e)).collect();

        let mut emap = vec![NULL_INDEX; 3 * m];
        let mut edge_faces = vec![[NULL_INDEX; 2]; pairs.len()];
        let mut edge_corners = vec![[NULL_INDEX; 2]; pairs.len()];

        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let a = face[(k + 1) % 3];
                let b = face[(k + 2) % 3];
                let key = if a < b { [a, b] } else { [b, a] };
                let e = index[&key];
                emap[k * m + f] = e;
                // Side 0 holds the face where the edge runs edges[e][0] -> edges[e][1].
                let side = if a == pairs[e][0] { 0 } else { 1 };
                if edge_faces[e][side] != NULL_INDEX {
                    return Err(MeshError::NonManifoldEdge {
                        v0: pairs[e][0],
                        v1: pairs[e][1],
                    });
                }
                edge_faces[e][side] = f;
                edge_corners[e][side] = k;
            }
        }

        Ok(Self {
            edges: pairs,
            emap,
            edge_faces,
            edge_corners,
            num_faces: m,
        })
    }

    /// Number of undirected edges (live and dead).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The edge opposite corner `k` of face `f`.
    #[inline]
    pub fn edge_across(&self, f: usize, k: usize) -> usize {
        self.emap[k * self.num_faces + f]
    }

    /// Redirect the corner `(f, k)` to point at `e`.
    #[inline]
    pub fn set_edge_across(&mut self, f: usize, k: usize, e: usize) {
        self.emap[k * self.num_faces + f] = e;
    }

    /// Whether edge `e` is still part of the live topology.
    #[inline]
    pub fn is_live(&self, e: usize) -> bool {
        self.edges[e][0] != NULL_INDEX
    }

    /// Whether edge `e` has an absent face side.
    #[inline]
    pub fn is_boundary_edge(&self, e: usize) -> bool {
        self.edge_faces[e][0] == NULL_INDEX || self.edge_faces[e][1] == NULL_INDEX
    }

    /// Mark edge `e` dead, clearing its endpoint and flap entries.
    pub fn kill_edge(&mut self, e: usize) {
        self.edges[e] = [NULL_INDEX; 2];
        self.edge_faces[e] = [NULL_INDEX; 2];
        self.edge_corners[e] = [NULL_INDEX; 2];
    }

    /// Walk the face ring around vertex `v`, starting from `f_start`.
    ///
    /// Requires every edge incident to `v` to have two live faces (true after
    /// boundary-to-infinity augmentation on a manifold mesh). Returns `None`
    /// if the walk hits an open or inconsistent flap, which callers treat as
    /// an illegal neighborhood.
    pub fn vertex_ring(
        &self,
        faces: &[[usize; 3]],
        v: usize,
        f_start: usize,
    ) -> Option<Vec<RingCorner>> {
        let mut ring = Vec::with_capacity(8);
        let mut f = f_start;
        loop {
            let corner = faces[f].iter().position(|&w| w == v)?;
            ring.push(RingCorner { face: f, corner });
            // Exit through the v-incident edge opposite corner (corner + 1).
            let exit = self.edge_across(f, (corner + 1) % 3);
            if exit == NULL_INDEX || !self.is_live(exit) {
                return None;
            }
            let [f0, f1] = self.edge_faces[exit];
            let next = if f0 == f { f1 } else { f0 };
            if next == NULL_INDEX {
                return None;
            }
            if next == f_start {
                return Some(ring);
            }
            if ring.len() > self.num_faces {
                // Corrupt walk; fail closed.
                return None;
            }
            f = next;
        }
    }
}
