//! Cost and placement oracle for candidate collapses.
//!
//! For a candidate edge the oracle answers two questions at once: *may* this
//! edge collapse under the topology, seam-strictness, and boundary rules, and
//! if so, *where* should the merged vertex land in 5D. Illegal candidates
//! score `+∞`; legal ones get the minimizer of the summed wedge quadrics —
//! one shared 3D position, one independent uv per merged wedge — with a
//! midpoint and then an endpoint fallback when the system is degenerate.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector, Point2, Point3, Vector5};

use crate::mesh::{area_normal, NULL_INDEX};

use super::bundle::{Bundle, CollapseKind};
use super::quadric::Quadric5;
use super::{SeamAwareDegree, Session};

/// A face normal below this (squared) magnitude is too degenerate to carry
/// orientation, in the scaled space where the mean triangle area is one.
const FLAT_NORMAL_EPS: f64 = 1e-24;

/// The merged 5D placement for a legal collapse.
#[derive(Debug, Clone)]
pub struct Placement {
    /// The shared 3D position (scaled space).
    pub position: Point3<f64>,
    /// One uv per wedge group, aligned with `Bundle::groups` (scaled space).
    pub uvs: Vec<Point2<f64>>,
}

/// A fully resolved legal collapse.
#[derive(Debug, Clone)]
pub struct PlanDetail {
    /// The wedge bundle of the candidate edge.
    pub bundle: Bundle,
    /// Where the merged vertex lands.
    pub placement: Placement,
}

/// Oracle verdict for one candidate edge.
#[derive(Debug, Clone)]
pub struct CollapsePlan {
    /// Quadric cost of the collapse; `+∞` when disallowed.
    pub cost: f64,
    /// Present only for legal collapses.
    pub detail: Option<PlanDetail>,
}

impl CollapsePlan {
    fn infeasible() -> Self {
        Self {
            cost: f64::INFINITY,
            detail: None,
        }
    }
}

/// Evaluate the oracle for edge `e` against the current session state.
pub fn cost_and_placement(sess: &Session, e: usize) -> CollapsePlan {
    if !sess.flaps.is_live(e) {
        return CollapsePlan::infeasible();
    }
    let Some(bundle) = Bundle::build(
        e,
        &sess.flaps,
        &sess.faces,
        &sess.uv_faces,
        sess.infinity_vertex,
    ) else {
        return CollapsePlan::infeasible();
    };
    // Edges touching the infinity vertex exist solely to regularize
    // boundary quadrics.
    if bundle.kind == CollapseKind::Infinity {
        return CollapsePlan::infeasible();
    }
    let (p0, p1) = (bundle.p0, bundle.p1);
    // The ring walk and the quadric map must agree on each endpoint's wedges.
    debug_assert_eq!(bundle.wedge_count0(), sess.quadrics.wedge_count(p0));
    debug_assert_eq!(bundle.wedge_count1(), sess.quadrics.wedge_count(p1));

    if !seam_rules_allow(sess, &bundle) {
        return CollapsePlan::infeasible();
    }

    if sess.preserve_boundaries
        && (sess.boundary_verts.contains(&p0) || sess.boundary_verts.contains(&p1))
    {
        return CollapsePlan::infeasible();
    }

    // Link condition, vertex level: the endpoints must share exactly the two
    // vertices opposite the edge, else the collapse would pinch a
    // non-manifold edge.
    let n0 = ring_vertices(sess, &bundle, 0);
    let n1 = ring_vertices(sess, &bundle, 1);
    let common = n0
        .intersection(&n1)
        .filter(|&&v| v != p0 && v != p1)
        .count();
    if common != 2 {
        return CollapsePlan::infeasible();
    }

    // Link condition, edge level: an edge opposite `p0` in one retained face
    // and opposite `p1` in another would turn those faces into a duplicated
    // pair (a tetrahedron collapsing to a two-face pillow is the smallest
    // offender).
    let l0 = link_edges(sess, &bundle, 0);
    let l1 = link_edges(sess, &bundle, 1);
    if !l0.is_disjoint(&l1) {
        return CollapsePlan::infeasible();
    }

    // Sum the wedge quadrics per merged group.
    let mut group_quadrics = Vec::with_capacity(bundle.groups.len());
    for g in &bundle.groups {
        let mut q = Quadric5::zero();
        for &t in &g.wedges0 {
            match sess.quadrics.get(p0, t) {
                Some(wq) => q += wq,
                None => return CollapsePlan::infeasible(),
            }
        }
        for &t in &g.wedges1 {
            match sess.quadrics.get(p1, t) {
                Some(wq) => q += wq,
                None => return CollapsePlan::infeasible(),
            }
        }
        group_quadrics.push(q);
    }

    let Some((cost, placement)) = solve_placement(sess, &bundle, &group_quadrics) else {
        return CollapsePlan::infeasible();
    };

    if flips_orientation(sess, &bundle, &placement.position) {
        return CollapsePlan::infeasible();
    }

    CollapsePlan {
        cost,
        detail: Some(PlanDetail { bundle, placement }),
    }
}

/// Apply the configured seam-aware degree.
fn seam_rules_allow(sess: &Session, bundle: &Bundle) -> bool {
    let (p0, p1) = (bundle.p0, bundle.p1);
    match sess.degree {
        SeamAwareDegree::NoUVShapePreserving => true,
        SeamAwareDegree::UVShapePreserving | SeamAwareDegree::Seamless => {
            if sess.seams.on_seam(p0) || sess.seams.on_seam(p1) {
                // Only edges interior to a seam polyline may collapse: the
                // edge itself is a seam and neither endpoint is a junction.
                let seam_interior = sess.seams.contains(p0, p1)
                    && sess.seams.degree(p0) == 2
                    && sess.seams.degree(p1) == 2;
                if !seam_interior {
                    return false;
                }
            }
            if sess.degree == SeamAwareDegree::Seamless {
                // No new wedge identities: the merge may not exceed the
                // smaller endpoint's wedge census.
                let min_wedges = bundle.wedge_count0().min(bundle.wedge_count1());
                if bundle.groups.len() != min_wedges {
                    return false;
                }
            }
            true
        }
    }
}

fn ring_vertices(sess: &Session, bundle: &Bundle, side: usize) -> HashSet<usize> {
    let ring = if side == 0 { &bundle.ring0 } else { &bundle.ring1 };
    let mut verts = HashSet::with_capacity(2 * ring.len());
    for rc in ring {
        let face = sess.faces[rc.face];
        verts.insert(face[(rc.corner + 1) % 3]);
        verts.insert(face[(rc.corner + 2) % 3]);
    }
    verts
}

/// Opposite edges of the retained ring faces on one side, as sorted pairs.
fn link_edges(sess: &Session, bundle: &Bundle, side: usize) -> HashSet<[usize; 2]> {
    let ring = if side == 0 { &bundle.ring0 } else { &bundle.ring1 };
    let mut edges = HashSet::with_capacity(ring.len());
    for rc in ring {
        if rc.face == bundle.face_left || rc.face == bundle.face_right {
            continue;
        }
        let face = sess.faces[rc.face];
        let a = face[(rc.corner + 1) % 3];
        let b = face[(rc.corner + 2) % 3];
        edges.insert(if a < b { [a, b] } else { [b, a] });
    }
    edges
}

/// Minimize the summed quadrics over (shared xyz, per-group uv).
///
/// Falls back to the 5D edge midpoint and then to endpoint `p0` when the
/// joint system is singular or wanders (optimum far outside the edge
/// neighborhood). Returns `None` only if no candidate evaluates finitely.
fn solve_placement(
    sess: &Session,
    bundle: &Bundle,
    group_quadrics: &[Quadric5],
) -> Option<(f64, Placement)> {
    let w = bundle.groups.len();
    let pos0 = sess.scaled_positions[bundle.p0];
    let pos1 = sess.scaled_positions[bundle.p1];
    let midpoint = Point3::from((pos0.coords + pos1.coords) * 0.5);
    let edge_len = (pos1 - pos0).norm();

    let dim = 3 + 2 * w;
    let mut m = DMatrix::<f64>::zeros(dim, dim);
    let mut rhs = DVector::<f64>::zeros(dim);
    for (gi, q) in group_quadrics.iter().enumerate() {
        let a = q.a();
        let b = q.b();
        let o = 3 + 2 * gi;
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] += a[(i, j)];
            }
            rhs[i] -= b[i];
        }
        for i in 0..3 {
            for j in 0..2 {
                m[(i, o + j)] += a[(i, 3 + j)];
                m[(o + j, i)] += a[(3 + j, i)];
            }
        }
        for i in 0..2 {
            for j in 0..2 {
                m[(o + i, o + j)] += a[(3 + i, 3 + j)];
            }
            rhs[o + i] -= b[3 + i];
        }
    }

    let optimal = m.lu().solve(&rhs).and_then(|x| {
        if !x.iter().all(|v| v.is_finite()) {
            return None;
        }
        let position = Point3::new(x[0], x[1], x[2]);
        // A nearly singular system passes the LU solve but throws the
        // optimum far away; treat that as degenerate too.
        if (position - midpoint).norm() > 2.0 * edge_len + 1e-9 {
            return None;
        }
        let uvs = (0..w)
            .map(|gi| Point2::new(x[3 + 2 * gi], x[4 + 2 * gi]))
            .collect();
        Some(Placement { position, uvs })
    });

    let candidates = [
        optimal,
        Some(midpoint_placement(sess, bundle, midpoint)),
        Some(endpoint_placement(sess, bundle, pos0)),
    ];
    for candidate in candidates.into_iter().flatten() {
        let cost = placement_cost(&candidate, group_quadrics);
        if cost.is_finite() {
            return Some((cost, candidate));
        }
    }
    None
}

fn midpoint_placement(sess: &Session, bundle: &Bundle, midpoint: Point3<f64>) -> Placement {
    let uvs = bundle
        .groups
        .iter()
        .map(|g| match (g.first0(), g.first1()) {
            (Some(a), Some(b)) => {
                Point2::from((sess.scaled_uvs[a].coords + sess.scaled_uvs[b].coords) * 0.5)
            }
            (Some(a), None) => sess.scaled_uvs[a],
            (None, Some(b)) => sess.scaled_uvs[b],
            (None, None) => unreachable!("empty wedge group"),
        })
        .collect();
    Placement {
        position: midpoint,
        uvs,
    }
}

fn endpoint_placement(sess: &Session, bundle: &Bundle, pos0: Point3<f64>) -> Placement {
    let uvs = bundle
        .groups
        .iter()
        .map(|g| {
            let t = g.first0().or_else(|| g.first1()).expect("empty wedge group");
            sess.scaled_uvs[t]
        })
        .collect();
    Placement {
        position: pos0,
        uvs,
    }
}

fn placement_cost(placement: &Placement, group_quadrics: &[Quadric5]) -> f64 {
    let p = &placement.position;
    group_quadrics
        .iter()
        .zip(&placement.uvs)
        .map(|(q, uv)| q.eval(&Vector5::new(p.x, p.y, p.z, uv.x, uv.y)))
        .sum()
}

/// Whether moving both endpoints to `position` would flip any retained face.
///
/// The two faces adjacent to the collapsing edge die and are skipped, as are
/// virtual infinity faces (their normals are not finite) and faces already
/// degenerate before the move.
fn flips_orientation(sess: &Session, bundle: &Bundle, position: &Point3<f64>) -> bool {
    let mut seen = HashSet::new();
    for rc in bundle.ring0.iter().chain(bundle.ring1.iter()) {
        let f = rc.face;
        if f == bundle.face_left || f == bundle.face_right || !seen.insert(f) {
            continue;
        }
        let vs = sess.faces[f];
        if vs[0] == NULL_INDEX {
            continue;
        }
        if let Some(v_inf) = sess.infinity_vertex {
            if vs.contains(&v_inf) {
                continue;
            }
        }
        let corner = |v: usize| {
            if v == bundle.p0 || v == bundle.p1 {
                *position
            } else {
                sess.scaled_positions[v]
            }
        };
        let before = area_normal(
            &sess.scaled_positions[vs[0]],
            &sess.scaled_positions[vs[1]],
            &sess.scaled_positions[vs[2]],
        );
        if before.norm_squared() <= FLAT_NORMAL_EPS {
            continue;
        }
        let after = area_normal(&corner(vs[0]), &corner(vs[1]), &corner(vs[2]));
        if before.dot(&after) <= 0.0 {
            return true;
        }
    }
    false
}
