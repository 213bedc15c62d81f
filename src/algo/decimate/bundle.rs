//! Wedge enumeration across a candidate collapse.
//!
//! Collapsing edge `(p0, p1)` merges not just two position vertices but two
//! *sets of wedges*: each endpoint may own several uv identities when it lies
//! on a seam. The bundle walks both one-rings, collects each endpoint's
//! wedges, and pairs them across the edge: the wedges holding the edge's
//! corners in the left face pair up, as do those in the right face. Wedges
//! not adjacent to the edge stay unpaired and transfer to the survivor
//! unchanged. The result is a partition into [`WedgeGroup`]s, each of which
//! becomes exactly one wedge of the merged vertex.

use crate::mesh::flaps::{EdgeFlaps, RingCorner};

/// Topological classification of a candidate collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseKind {
    /// The UV map is continuous across the edge.
    Interior,
    /// The edge is a seam with distinct uv ids at both endpoints.
    SeamAlong,
    /// A seam terminates at one of the edge's endpoints.
    SeamEndpoint,
    /// The edge touches the virtual infinity vertex; never collapsible.
    Infinity,
}

/// A set of wedges merged into a single wedge by the collapse.
#[derive(Debug, Clone, Default)]
pub struct WedgeGroup {
    /// The uv ids of this group's wedges at `p0`.
    pub wedges0: Vec<usize>,
    /// The uv ids of this group's wedges at `p1`.
    pub wedges1: Vec<usize>,
}

impl WedgeGroup {
    /// A representative uv id on `p0`'s side, if any.
    pub fn first0(&self) -> Option<usize> {
        self.wedges0.first().copied()
    }

    /// A representative uv id on `p1`'s side, if any.
    pub fn first1(&self) -> Option<usize> {
        self.wedges1.first().copied()
    }
}

/// Everything the oracle and executor need to know about one candidate edge.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// The candidate edge id.
    pub edge: usize,
    /// First endpoint (`edges[e][0]`).
    pub p0: usize,
    /// Second endpoint (`edges[e][1]`).
    pub p1: usize,
    /// The face on side 0 of the flap.
    pub face_left: usize,
    /// The face on side 1 of the flap.
    pub face_right: usize,
    /// One-ring corners of `p0`, starting at `face_left`.
    pub ring0: Vec<RingCorner>,
    /// One-ring corners of `p1`, starting at `face_left`.
    pub ring1: Vec<RingCorner>,
    /// The wedge partition induced by the collapse.
    pub groups: Vec<WedgeGroup>,
    /// Collapse topology.
    pub kind: CollapseKind,
}

impl Bundle {
    /// Enumerate the wedges around edge `e` and pair them across the collapse.
    ///
    /// Returns `None` when the neighborhood cannot be walked (open or
    /// inconsistent flaps), which callers score as an illegal collapse.
    pub fn build(
        e: usize,
        flaps: &EdgeFlaps,
        faces: &[[usize; 3]],
        uv_faces: &[[usize; 3]],
        infinity_vertex: Option<usize>,
    ) -> Option<Bundle> {
        let [p0, p1] = flaps.edges[e];
        let [face_left, face_right] = flaps.edge_faces[e];

        if infinity_vertex == Some(p0) || infinity_vertex == Some(p1) {
            return Some(Bundle {
                edge: e,
                p0,
                p1,
                face_left,
                face_right,
                ring0: Vec::new(),
                ring1: Vec::new(),
                groups: Vec::new(),
                kind: CollapseKind::Infinity,
            });
        }

        let ring0 = flaps.vertex_ring(faces, p0, face_left)?;
        let ring1 = flaps.vertex_ring(faces, p1, face_left)?;

        let wedges0 = distinct_uvs(&ring0, uv_faces);
        let wedges1 = distinct_uvs(&ring1, uv_faces);

        let t0_left = uv_at(faces, uv_faces, face_left, p0)?;
        let t1_left = uv_at(faces, uv_faces, face_left, p1)?;
        let t0_right = uv_at(faces, uv_faces, face_right, p0)?;
        let t1_right = uv_at(faces, uv_faces, face_right, p1)?;

        let kind = match (t0_left != t0_right, t1_left != t1_right) {
            (false, false) => CollapseKind::Interior,
            (true, true) => CollapseKind::SeamAlong,
            _ => CollapseKind::SeamEndpoint,
        };

        // Start with every wedge in its own group, then union across the
        // edge-adjacent corner pairs on each side.
        let mut groups: Vec<WedgeGroup> = Vec::with_capacity(wedges0.len() + wedges1.len());
        let mut group_of0 = std::collections::HashMap::new();
        let mut group_of1 = std::collections::HashMap::new();
        for &t in &wedges0 {
            group_of0.insert(t, groups.len());
            groups.push(WedgeGroup {
                wedges0: vec![t],
                wedges1: Vec::new(),
            });
        }
        for &t in &wedges1 {
            group_of1.insert(t, groups.len());
            groups.push(WedgeGroup {
                wedges0: Vec::new(),
                wedges1: vec![t],
            });
        }

        let mut pairs = vec![(t0_left, t1_left)];
        if (t0_right, t1_right) != (t0_left, t1_left) {
            pairs.push((t0_right, t1_right));
        }
        for (a, b) in pairs {
            let ga = *group_of0.get(&a)?;
            let gb = *group_of1.get(&b)?;
            if ga == gb {
                continue;
            }
            let moved = std::mem::take(&mut groups[gb]);
            for &t in &moved.wedges0 {
                group_of0.insert(t, ga);
            }
            for &t in &moved.wedges1 {
                group_of1.insert(t, ga);
            }
            groups[ga].wedges0.extend(moved.wedges0);
            groups[ga].wedges1.extend(moved.wedges1);
        }
        groups.retain(|g| !g.wedges0.is_empty() || !g.wedges1.is_empty());

        Some(Bundle {
            edge: e,
            p0,
            p1,
            face_left,
            face_right,
            ring0,
            ring1,
            groups,
            kind,
        })
    }

    /// Number of wedges at `p0`.
    pub fn wedge_count0(&self) -> usize {
        self.groups.iter().map(|g| g.wedges0.len()).sum()
    }

    /// Number of wedges at `p1`.
    pub fn wedge_count1(&self) -> usize {
        self.groups.iter().map(|g| g.wedges1.len()).sum()
    }
}

fn distinct_uvs(ring: &[RingCorner], uv_faces: &[[usize; 3]]) -> Vec<usize> {
    let mut uvs = Vec::with_capacity(ring.len());
    for rc in ring {
        let t = uv_faces[rc.face][rc.corner];
        if !uvs.contains(&t) {
            uvs.push(t);
        }
    }
    uvs
}

fn uv_at(
    faces: &[[usize; 3]],
    uv_faces: &[[usize; 3]],
    f: usize,
    v: usize,
) -> Option<usize> {
    let corner = faces[f].iter().position(|&w| w == v)?;
    Some(uv_faces[f][corner])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::infinity::connect_boundary_to_infinity;
    use crate::mesh::TexturedMesh;
    use nalgebra::{Point2, Point3};

    fn square(uv_faces: Vec<[usize; 3]>, uvs: Vec<Point2<f64>>) -> TexturedMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        TexturedMesh::new(positions, uvs, faces, uv_faces).unwrap()
    }

    fn continuous_square() -> TexturedMesh {
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        square(vec![[0, 1, 2], [0, 2, 3]], uvs)
    }

    fn cut_square() -> TexturedMesh {
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.45, 0.0),
            Point2::new(0.45, 0.45),
            Point2::new(0.55, 0.0),
            Point2::new(0.55, 0.45),
            Point2::new(1.0, 0.45),
        ];
        square(vec![[0, 1, 2], [3, 4, 5]], uvs)
    }

    fn edge_between(flaps: &crate::mesh::flaps::EdgeFlaps, a: usize, b: usize) -> usize {
        let key = if a < b { [a, b] } else { [b, a] };
        (0..flaps.num_edges())
            .find(|&e| flaps.edges[e] == key)
            .unwrap()
    }

    #[test]
    fn test_interior_edge_yields_single_group() {
        let mut mesh = continuous_square();
        let aug = connect_boundary_to_infinity(&mut mesh).unwrap();
        let flaps = crate::mesh::flaps::EdgeFlaps::build(&mesh.faces).unwrap();
        let e = edge_between(&flaps, 0, 2);
        let b =
            Bundle::build(e, &flaps, &mesh.faces, &mesh.uv_faces, aug.infinity_vertex).unwrap();
        assert_eq!(b.kind, CollapseKind::Interior);
        assert_eq!(b.groups.len(), 1);
        assert_eq!(b.wedge_count0(), 1);
        assert_eq!(b.wedge_count1(), 1);
        assert_eq!(b.ring0.len(), 4);
    }

    #[test]
    fn test_seam_edge_yields_two_groups() {
        let mut mesh = cut_square();
        let aug = connect_boundary_to_infinity(&mut mesh).unwrap();
        let flaps = crate::mesh::flaps::EdgeFlaps::build(&mesh.faces).unwrap();
        let e = edge_between(&flaps, 0, 2);
        let b =
            Bundle::build(e, &flaps, &mesh.faces, &mesh.uv_faces, aug.infinity_vertex).unwrap();
        assert_eq!(b.kind, CollapseKind::SeamAlong);
        assert_eq!(b.groups.len(), 2);
        assert_eq!(b.wedge_count0(), 2);
        assert_eq!(b.wedge_count1(), 2);
        // Each group pairs one wedge from each side.
        for g in &b.groups {
            assert_eq!(g.wedges0.len(), 1);
            assert_eq!(g.wedges1.len(), 1);
        }
    }

    #[test]
    fn test_boundary_edge_stays_single_wedge() {
        // Virtual faces mirror the real side's uvs, so a boundary edge of a
        // continuous chart is not a uv discontinuity.
        let mut mesh = continuous_square();
        let aug = connect_boundary_to_infinity(&mut mesh).unwrap();
        let flaps = crate::mesh::flaps::EdgeFlaps::build(&mesh.faces).unwrap();
        let e = edge_between(&flaps, 0, 1);
        let b =
            Bundle::build(e, &flaps, &mesh.faces, &mesh.uv_faces, aug.infinity_vertex).unwrap();
        assert_eq!(b.kind, CollapseKind::Interior);
        assert_eq!(b.groups.len(), 1);
    }

    #[test]
    fn test_infinity_edges_are_flagged() {
        let mut mesh = continuous_square();
        let aug = connect_boundary_to_infinity(&mut mesh).unwrap();
        let v_inf = aug.infinity_vertex.unwrap();
        let flaps = crate::mesh::flaps::EdgeFlaps::build(&mesh.faces).unwrap();
        let e = edge_between(&flaps, 0, v_inf);
        let b =
            Bundle::build(e, &flaps, &mesh.faces, &mesh.uv_faces, aug.infinity_vertex).unwrap();
        assert_eq!(b.kind, CollapseKind::Infinity);
        assert!(b.groups.is_empty());
    }
}
