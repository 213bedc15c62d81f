//! Wedge quadrics in homogeneous 5D.
//!
//! Decimation error is measured jointly over geometry and parameterization:
//! each triangle corner lives at a 5D point `(x, y, z, u, v)` (positions
//! pre-scaled by the global position scale, uvs by the uv weight), and each
//! triangle contributes the squared distance to its own 2-flat in that space,
//! weighted by triangle area. Summing contributions per *wedge* — per
//! (position id, uv id) pair — yields the 6×6 symmetric quadrics consumed by
//! the placement oracle.

use std::collections::HashMap;

use nalgebra::{Matrix5, Matrix6, Point2, Point3, Vector5};

/// Tolerance below which a triangle's in-plane basis is considered degenerate.
const DEGENERATE_EPS: f64 = 1e-12;

/// A 6×6 symmetric quadric `[A b; bᵀ c]` over homogeneous `(x, y, z, u, v, 1)`.
///
/// Evaluates to the summed squared distance from a 5D point to the planes
/// accumulated into it. Always symmetric positive semi-definite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric5(Matrix6<f64>);

impl Quadric5 {
    /// The zero quadric.
    pub fn zero() -> Self {
        Self(Matrix6::zeros())
    }

    /// Quadric measuring squared distance to the 2-flat through `s0`, `s1`,
    /// `s2`, weighted by `weight` (the triangle's area).
    ///
    /// Degenerate triangles produce the zero quadric.
    pub fn from_triangle(
        s0: &Vector5<f64>,
        s1: &Vector5<f64>,
        s2: &Vector5<f64>,
        weight: f64,
    ) -> Self {
        let d1 = s1 - s0;
        let n1 = d1.norm();
        if n1 < DEGENERATE_EPS {
            return Self::zero();
        }
        let e1 = d1 / n1;

        let d2 = s2 - s0;
        let t = d2 - e1 * d2.dot(&e1);
        let n2 = t.norm();
        if n2 < DEGENERATE_EPS {
            return Self::zero();
        }
        let e2 = t / n2;

        // Distance to the flat: (x - s0)ᵀ A (x - s0) with A the projector
        // onto the flat's orthogonal complement.
        let a = Matrix5::identity() - e1 * e1.transpose() - e2 * e2.transpose();
        let b = -(a * s0);
        let c = s0.dot(&(a * s0));

        let mut m = Matrix6::zeros();
        m.fixed_view_mut::<5, 5>(0, 0).copy_from(&a);
        m.fixed_view_mut::<5, 1>(0, 5).copy_from(&b);
        m.fixed_view_mut::<1, 5>(5, 0).copy_from(&b.transpose());
        m[(5, 5)] = c;
        Self(m * weight)
    }

    /// Evaluate `xᵀ A x + 2 bᵀ x + c` at a 5D point.
    pub fn eval(&self, x: &Vector5<f64>) -> f64 {
        let h = x.push(1.0);
        h.dot(&(self.0 * h))
    }

    /// The 5×5 `A` block.
    pub fn a(&self) -> Matrix5<f64> {
        self.0.fixed_view::<5, 5>(0, 0).into_owned()
    }

    /// The linear term `b`.
    pub fn b(&self) -> Vector5<f64> {
        self.0.fixed_view::<5, 1>(0, 5).into_owned()
    }

    /// Trace of the full 6×6 matrix.
    pub fn trace(&self) -> f64 {
        self.matrix().trace()
    }

    /// The raw matrix.
    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.0
    }
}

impl std::ops::AddAssign<&Quadric5> for Quadric5 {
    fn add_assign(&mut self, rhs: &Quadric5) {
        self.0 += rhs.0;
    }
}

impl std::ops::Add for Quadric5 {
    type Output = Quadric5;

    fn add(mut self, rhs: Quadric5) -> Quadric5 {
        self += &rhs;
        self
    }
}

/// Sparse map from (position id, uv id) wedges to their accumulated quadrics.
#[derive(Debug, Clone, Default)]
pub struct WedgeQuadrics {
    map: HashMap<usize, HashMap<usize, Quadric5>>,
}

impl WedgeQuadrics {
    /// Accumulate the per-wedge quadrics of the first `num_faces` faces.
    ///
    /// `positions` and `uvs` must already carry the position scale and uv
    /// weight. Every referenced wedge receives an entry, so zero-area
    /// triangles still register their corners (with zero contribution).
    pub fn from_mesh(
        positions: &[Point3<f64>],
        uvs: &[Point2<f64>],
        faces: &[[usize; 3]],
        uv_faces: &[[usize; 3]],
        num_faces: usize,
    ) -> Self {
        let mut wq = Self::default();
        for f in 0..num_faces {
            let vs = faces[f];
            let ts = uv_faces[f];
            let corner = |k: usize| {
                let p = &positions[vs[k]];
                let t = &uvs[ts[k]];
                Vector5::new(p.x, p.y, p.z, t.x, t.y)
            };
            let s = [corner(0), corner(1), corner(2)];
            let area = crate::mesh::triangle_area(
                &positions[vs[0]],
                &positions[vs[1]],
                &positions[vs[2]],
            );
            let q = Quadric5::from_triangle(&s[0], &s[1], &s[2], area);
            for k in 0..3 {
                *wq.entry(vs[k], ts[k]) += &q;
            }
        }
        wq
    }

    fn entry(&mut self, p: usize, t: usize) -> &mut Quadric5 {
        self.map
            .entry(p)
            .or_default()
            .entry(t)
            .or_insert_with(Quadric5::zero)
    }

    /// The quadric of wedge `(p, t)`, if it exists.
    pub fn get(&self, p: usize, t: usize) -> Option<&Quadric5> {
        self.map.get(&p).and_then(|wedges| wedges.get(&t))
    }

    /// Insert a zero quadric for wedge `(p, t)` if absent.
    pub fn ensure_zero(&mut self, p: usize, t: usize) {
        self.entry(p, t);
    }

    /// Number of distinct wedges at position vertex `p`.
    pub fn wedge_count(&self, p: usize) -> usize {
        self.map.get(&p).map_or(0, |wedges| wedges.len())
    }

    /// Remove and return all wedges of vertex `p`.
    pub fn remove_vertex(&mut self, p: usize) -> Option<HashMap<usize, Quadric5>> {
        self.map.remove(&p)
    }

    /// Replace the wedge set of vertex `p`.
    pub fn set_vertex(&mut self, p: usize, wedges: HashMap<usize, Quadric5>) {
        self.map.insert(p, wedges);
    }

    /// Sum of quadric traces over all live wedges.
    ///
    /// Collapses accumulate quadrics and never discard them, so this is
    /// non-decreasing across the decimation loop.
    pub fn total_trace(&self) -> f64 {
        self.map
            .values()
            .flat_map(|wedges| wedges.values())
            .map(Quadric5::trace)
            .sum()
    }
}
