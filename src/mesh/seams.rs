//! Seam, boundary, and fold-over classification.
//!
//! An edge is a *seam* when the UV parameterization is discontinuous across
//! it: the two incident faces disagree on the uv id at one or both of its
//! endpoints. An edge with a single incident face is a *boundary*. An
//! interior edge whose two incident UV triangles wind in opposite directions
//! is a *fold-over*.
//!
//! [`classify_seams`] reports all three families. [`SeamSet`] is the mutable
//! undirected adjacency over position-vertex ids that the decimation engine
//! consults for legality and rewrites after each collapse.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::mesh::flaps::EdgeFlaps;
use crate::mesh::{uv_double_area, TexturedMesh, NULL_INDEX};

/// One classified edge, identified by the incident face corners opposite it.
///
/// `face`/`corner` locate the edge within one incident face; the `opposite_*`
/// fields locate it within the other. Boundaries have no opposite side and
/// carry [`NULL_INDEX`] there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedEdge {
    /// A face incident to the edge.
    pub face: usize,
    /// The corner of `face` opposite the edge.
    pub corner: usize,
    /// The other incident face, or [`NULL_INDEX`] for a boundary.
    pub opposite_face: usize,
    /// The corner of `opposite_face` opposite the edge, or [`NULL_INDEX`].
    pub opposite_corner: usize,
}

impl ClassifiedEdge {
    /// The two endpoint position ids of the edge, read from `face`.
    pub fn endpoints(&self, faces: &[[usize; 3]]) -> (usize, usize) {
        let f = &faces[self.face];
        (f[(self.corner + 1) % 3], f[(self.corner + 2) % 3])
    }
}

/// Output of [`classify_seams`].
#[derive(Debug, Clone, Default)]
pub struct SeamClassification {
    /// Interior edges whose incident faces disagree on uv ids.
    pub seams: Vec<ClassifiedEdge>,
    /// Edges with exactly one incident face.
    pub boundaries: Vec<ClassifiedEdge>,
    /// Interior edges whose incident UV triangles have opposite orientation.
    pub fold_overs: Vec<ClassifiedEdge>,
}

/// Classify every edge of `mesh` as seam, boundary, fold-over, or plain.
///
/// Plain interior edges are not reported.
pub fn classify_seams(mesh: &TexturedMesh) -> Result<SeamClassification> {
    let flaps = EdgeFlaps::build(&mesh.faces)?;
    let mut out = SeamClassification::default();

    for e in 0..flaps.num_edges() {
        let [f0, f1] = flaps.edge_faces[e];
        let [c0, c1] = flaps.edge_corners[e];
        if f0 == NULL_INDEX || f1 == NULL_INDEX {
            let (face, corner) = if f0 == NULL_INDEX { (f1, c1) } else { (f0, c0) };
            out.boundaries.push(ClassifiedEdge {
                face,
                corner,
                opposite_face: NULL_INDEX,
                opposite_corner: NULL_INDEX,
            });
            continue;
        }

        let edge = ClassifiedEdge {
            face: f0,
            corner: c0,
            opposite_face: f1,
            opposite_corner: c1,
        };

        // The faces traverse the shared edge in opposite directions, so f0's
        // corner (c0+1) coincides with f1's corner (c1+2) and vice versa.
        let ft0 = &mesh.uv_faces[f0];
        let ft1 = &mesh.uv_faces[f1];
        let discontinuous = ft0[(c0 + 1) % 3] != ft1[(c1 + 2) % 3]
            || ft0[(c0 + 2) % 3] != ft1[(c1 + 1) % 3];
        if discontinuous {
            out.seams.push(edge);
            continue;
        }

        let area0 = uv_triangle_double_area(mesh, f0);
        let area1 = uv_triangle_double_area(mesh, f1);
        if area0 * area1 < 0.0 {
            out.fold_overs.push(edge);
        }
    }

    Ok(out)
}

fn uv_triangle_double_area(mesh: &TexturedMesh, f: usize) -> f64 {
    let [a, b, c] = mesh.uv_faces[f];
    uv_double_area(&mesh.uvs[a], &mesh.uvs[b], &mesh.uvs[c])
}

/// Undirected adjacency over position-vertex ids marking seam edges.
///
/// Symmetric and self-loop free by construction. The decimation executor
/// calls [`SeamSet::remap`] after each collapse so the set tracks the
/// surviving vertex ids.
#[derive(Debug, Clone, Default)]
pub struct SeamSet {
    adj: HashMap<usize, HashSet<usize>>,
}

impl SeamSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the undirected edge `(u, v)`. Idempotent; self-loops are ignored.
    pub fn insert(&mut self, u: usize, v: usize) {
        if u == v {
            return;
        }
        self.adj.entry(u).or_default().insert(v);
        self.adj.entry(v).or_default().insert(u);
    }

    /// Remove the undirected edge `(u, v)` if present.
    pub fn erase(&mut self, u: usize, v: usize) {
        for (a, b) in [(u, v), (v, u)] {
            let emptied = match self.adj.get_mut(&a) {
                Some(set) => {
                    set.remove(&b);
                    set.is_empty()
                }
                None => false,
            };
            if emptied {
                self.adj.remove(&a);
            }
        }
    }

    /// Whether the undirected edge `(u, v)` is in the set.
    pub fn contains(&self, u: usize, v: usize) -> bool {
        self.adj.get(&u).is_some_and(|set| set.contains(&v))
    }

    /// Number of seam edges incident to `u`.
    pub fn degree(&self, u: usize) -> usize {
        self.adj.get(&u).map_or(0, |set| set.len())
    }

    /// Whether `u` lies on any seam edge.
    pub fn on_seam(&self, u: usize) -> bool {
        self.degree(u) > 0
    }

    /// Total number of seam edges.
    pub fn len(&self) -> usize {
        let degree_sum: usize = self.adj.values().map(|set| set.len()).sum();
        degree_sum / 2
    }

    /// Whether the set holds no edges.
    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Number of vertices touched by at least one seam edge.
    pub fn num_vertices(&self) -> usize {
        self.adj.len()
    }

    /// Rewrite every edge `(from, x)` as `(to, x)`.
    ///
    /// Edges that would become self-loops or duplicates disappear. Applied
    /// atomically after a collapse merges `from` into `to`.
    pub fn remap(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let Some(neighbors) = self.adj.remove(&from) else {
            return;
        };
        for x in neighbors {
            let emptied = match self.adj.get_mut(&x) {
                Some(set) => {
                    set.remove(&from);
                    set.is_empty()
                }
                None => false,
            };
            if emptied {
                self.adj.remove(&x);
            }
            if x != to {
                self.insert(to, x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3};

    // A unit square split along its diagonal, with the diagonal cut in UV
    // space: the two triangles chart into disjoint uv islands.
    fn cut_square() -> TexturedMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.45, 0.0),
            Point2::new(0.45, 0.45),
            Point2::new(0.55, 0.0),
            Point2::new(0.55, 0.45),
            Point2::new(1.0, 0.45),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        let uv_faces = vec![[0, 1, 2], [3, 4, 5]];
        TexturedMesh::new(positions, uvs, faces, uv_faces).unwrap()
    }

    #[test]
    fn test_cut_square_reports_one_seam() {
        let mesh = cut_square();
        let class = classify_seams(&mesh).unwrap();
        assert_eq!(class.seams.len(), 1);
        assert_eq!(class.fold_overs.len(), 0);
        assert_eq!(class.boundaries.len(), 4);

        let (a, b) = class.seams[0].endpoints(&mesh.faces);
        let mut got = [a, b];
        got.sort_unstable();
        assert_eq!(got, [0, 2]);
    }

    #[test]
    fn test_continuous_quad_has_no_seams() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uvs: Vec<_> = positions.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        let mesh = TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap();
        let class = classify_seams(&mesh).unwrap();
        assert!(class.seams.is_empty());
        assert!(class.fold_overs.is_empty());
        assert_eq!(class.boundaries.len(), 4);
    }

    #[test]
    fn test_fold_over_detection() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        // Face 1 shares the uv ids of the edge but folds back inside face
        // 0's uv triangle, flipping orientation.
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
            Point2::new(0.5, 0.5),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        let uv_faces = vec![[0, 1, 2], [1, 0, 3]];
        let mesh = TexturedMesh::new(positions, uvs, faces, uv_faces).unwrap();
        let class = classify_seams(&mesh).unwrap();
        assert!(class.seams.is_empty());
        assert_eq!(class.fold_overs.len(), 1);
        let (a, b) = class.fold_overs[0].endpoints(&mesh.faces);
        let mut got = [a, b];
        got.sort_unstable();
        assert_eq!(got, [0, 1]);
    }

    #[test]
    fn test_seam_set_basics() {
        let mut s = SeamSet::new();
        s.insert(1, 2);
        s.insert(2, 1);
        s.insert(2, 3);
        s.insert(4, 4); // ignored self-loop
        assert_eq!(s.len(), 2);
        assert!(s.contains(1, 2) && s.contains(2, 1));
        assert_eq!(s.degree(2), 2);
        assert_eq!(s.num_vertices(), 3);

        s.erase(1, 2);
        assert!(!s.contains(2, 1));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_seam_set_remap_merges_and_drops_self_loops() {
        let mut s = SeamSet::new();
        s.insert(1, 2);
        s.insert(2, 3);
        s.insert(1, 3);
        // Merge 2 into 1: (2,3) becomes (1,3) which already exists, and
        // (1,2) becomes a self-loop and disappears.
        s.remap(2, 1);
        assert_eq!(s.len(), 1);
        assert!(s.contains(1, 3));
        assert!(!s.on_seam(2));
        // Symmetry is preserved.
        assert_eq!(s.degree(1), s.degree(3));
    }
}
