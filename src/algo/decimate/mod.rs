//! Seam-aware mesh decimation.
//!
//! This module reduces a triangle mesh with UV texture coordinates to a
//! target vertex count by repeated edge collapse, choosing collapses in
//! order of least quadric error while preserving the discontinuity structure
//! of the UV map.
//!
//! Error is measured in homogeneous 5D — position and uv jointly — following
//! the texture-coordinate extension of quadric error metrics, with one
//! quadric per *wedge* (per position/uv identity pair) so that seams keep
//! their independent uv tracks. How strictly seams constrain the collapse
//! order is configurable via [`SeamAwareDegree`].
//!
//! # Example
//!
//! ```no_run
//! use selvage::algo::decimate::{decimate, DecimateOptions};
//! use selvage::io;
//!
//! let mesh = io::load_obj("input.obj").unwrap();
//! let options = DecimateOptions::with_target(mesh.num_vertices() / 2);
//! let result = decimate(&mesh, &options).unwrap();
//! println!("max error: {}", result.max_error);
//! io::save_obj(&result.mesh, "output.obj").unwrap();
//! ```
//!
//! # References
//!
//! - Garland, M. & Heckbert, P. (1997). "Surface Simplification Using
//!   Quadric Error Metrics." SIGGRAPH '97.
//! - Garland, M. & Heckbert, P. (1998). "Simplifying Surfaces with Color and
//!   Texture using Quadric Error Metrics." Visualization '98.
//! - Liu, S., Ferguson, Z., Jacobson, A. & Gingold, Y. (2017). "Seamless:
//!   Seam erasure and seam-aware decoupling of shape from mesh resolution."
//!   SIGGRAPH Asia 2017.

mod bundle;
mod collapse;
mod placement;
mod quadric;
mod queue;

use std::collections::HashSet;

use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::flaps::EdgeFlaps;
use crate::mesh::infinity::connect_boundary_to_infinity;
use crate::mesh::seams::{classify_seams, SeamSet};
use crate::mesh::{compact, TexturedMesh};

use self::collapse::execute_collapse;
use self::placement::cost_and_placement;
use self::quadric::WedgeQuadrics;
use self::queue::EdgeQueue;

/// The scaled metric normalizes the mean triangle area to this value.
const TARGET_AVG_AREA: f64 = 1.0;

/// How strictly the collapse order must respect seam topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeamAwareDegree {
    /// Seams constrain nothing beyond general topology rules.
    NoUVShapePreserving,
    /// Vertices on seams only collapse along the interior of a seam
    /// polyline, never across or at junctions.
    UVShapePreserving,
    /// As [`SeamAwareDegree::UVShapePreserving`], and the merge may not
    /// introduce new wedge identities.
    #[default]
    Seamless,
}

impl SeamAwareDegree {
    /// Map the conventional 0/1/2 encoding to a degree.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::NoUVShapePreserving),
            1 => Some(Self::UVShapePreserving),
            2 => Some(Self::Seamless),
            _ => None,
        }
    }
}

/// Options for seam-aware decimation.
#[derive(Debug, Clone)]
pub struct DecimateOptions {
    /// Target number of output vertices. Must be positive and smaller than
    /// the input vertex count.
    pub target_num_vertices: usize,

    /// Seam preservation strictness.
    pub seam_aware_degree: SeamAwareDegree,

    /// Forbid collapsing any edge touching the mesh boundary.
    pub preserve_boundaries: bool,

    /// Relative weight of uv error against geometric error.
    pub uv_weight: f64,

    /// Abort when the queue hands back the same uncollapsible edge twice in
    /// a row. Failed edges are re-queued at infinite cost, so this should
    /// never fire; it is kept as a stopping-condition backstop.
    pub abort_on_stalled_edge: bool,
}

impl DecimateOptions {
    /// Create options targeting `target` output vertices.
    pub fn with_target(target: usize) -> Self {
        Self {
            target_num_vertices: target,
            seam_aware_degree: SeamAwareDegree::default(),
            preserve_boundaries: false,
            uv_weight: 1.0,
            abort_on_stalled_edge: true,
        }
    }

    /// Set the seam-aware degree.
    pub fn with_seam_aware_degree(mut self, degree: SeamAwareDegree) -> Self {
        self.seam_aware_degree = degree;
        self
    }

    /// Set whether boundary edges are preserved.
    pub fn with_preserve_boundaries(mut self, preserve: bool) -> Self {
        self.preserve_boundaries = preserve;
        self
    }

    /// Set the uv error weight.
    pub fn with_uv_weight(mut self, weight: f64) -> Self {
        self.uv_weight = weight;
        self
    }
}

/// The outcome of a decimation run.
#[derive(Debug, Clone)]
pub struct Decimation {
    /// The decimated, compacted mesh.
    pub mesh: TexturedMesh,
    /// Largest single-collapse error committed, in input units.
    pub max_error: f64,
    /// Whether the target vertex count was reached. `false` means the run
    /// stopped early — every remaining candidate was infeasible — and `mesh`
    /// holds the best partial result.
    pub reached_target: bool,
}

/// Mutable state of one decimation run.
///
/// Coordinates are kept twice: in input units (`positions`, `uvs`, the
/// source of truth for the final mesh) and in the scaled metric
/// (`scaled_positions` carry the global position scale, `scaled_uvs` the uv
/// weight) that quadrics, placements, and orientation tests work in. Both
/// copies are updated on every collapse, so vertices a collapse never
/// touches come out of the run bit-identical.
pub(crate) struct Session {
    pub positions: Vec<nalgebra::Point3<f64>>,
    pub uvs: Vec<nalgebra::Point2<f64>>,
    pub scaled_positions: Vec<nalgebra::Point3<f64>>,
    pub scaled_uvs: Vec<nalgebra::Point2<f64>>,
    pub faces: Vec<[usize; 3]>,
    pub uv_faces: Vec<[usize; 3]>,
    pub flaps: EdgeFlaps,
    pub seams: SeamSet,
    pub quadrics: WedgeQuadrics,
    pub queue: EdgeQueue,
    pub boundary_verts: HashSet<usize>,
    pub infinity_vertex: Option<usize>,
    pub num_real_faces: usize,
    pub degree: SeamAwareDegree,
    pub preserve_boundaries: bool,
    pub pos_scale: f64,
    pub uv_weight: f64,
}

impl Session {
    /// Classify seams, close boundaries, scale, and accumulate the initial
    /// wedge quadrics. The candidate queue is sized but not yet seeded.
    pub(crate) fn prepare(
        mesh: TexturedMesh,
        options: &DecimateOptions,
        pos_scale: f64,
    ) -> Result<Session> {
        let classification = classify_seams(&mesh)?;
        let mut seams = SeamSet::new();
        for edge in classification
            .seams
            .iter()
            .chain(&classification.boundaries)
            .chain(&classification.fold_overs)
        {
            let (a, b) = edge.endpoints(&mesh.faces);
            seams.insert(a, b);
        }
        log::info!(
            "seam classification: {} seams, {} boundaries, {} fold-overs ({} seam vertices, {} seam edges)",
            classification.seams.len(),
            classification.boundaries.len(),
            classification.fold_overs.len(),
            seams.num_vertices(),
            seams.len(),
        );

        let mut boundary_verts = HashSet::new();
        if options.preserve_boundaries {
            for edge in &classification.boundaries {
                let (a, b) = edge.endpoints(&mesh.faces);
                boundary_verts.insert(a);
                boundary_verts.insert(b);
            }
            log::info!("preserving {} boundary vertices", boundary_verts.len());
        }

        let mut mesh = mesh;
        let aug = connect_boundary_to_infinity(&mut mesh)?;
        let scaled_positions: Vec<_> = mesh.positions.iter().map(|p| p * pos_scale).collect();
        let scaled_uvs: Vec<_> = mesh.uvs.iter().map(|t| t * options.uv_weight).collect();

        let flaps = EdgeFlaps::build(&mesh.faces)?;
        let mut quadrics = WedgeQuadrics::from_mesh(
            &scaled_positions,
            &scaled_uvs,
            &mesh.faces,
            &mesh.uv_faces,
            aug.num_real_faces,
        );
        if let (Some(v_inf), Some(t_inf)) = (aug.infinity_vertex, aug.infinity_uv) {
            quadrics.ensure_zero(v_inf, t_inf);
        }
        let queue = EdgeQueue::with_num_edges(flaps.num_edges());

        Ok(Session {
            positions: mesh.positions,
            uvs: mesh.uvs,
            scaled_positions,
            scaled_uvs,
            faces: mesh.faces,
            uv_faces: mesh.uv_faces,
            flaps,
            seams,
            quadrics,
            queue,
            boundary_verts,
            infinity_vertex: aug.infinity_vertex,
            num_real_faces: aug.num_real_faces,
            degree: options.seam_aware_degree,
            preserve_boundaries: options.preserve_boundaries,
            pos_scale,
            uv_weight: options.uv_weight,
        })
    }
}

/// Decimate `mesh` down to `options.target_num_vertices` vertices.
///
/// Returns an error only for invalid input. Early termination — no feasible
/// collapse remains, or the stalled-edge backstop fired — is reported via
/// [`Decimation::reached_target`] with the partial mesh attached.
pub fn decimate(mesh: &TexturedMesh, options: &DecimateOptions) -> Result<Decimation> {
    let n = mesh.num_vertices();
    if options.target_num_vertices == 0 || options.target_num_vertices >= n {
        return Err(MeshError::InvalidTarget {
            target: options.target_num_vertices,
            vertices: n,
        });
    }
    if !options.uv_weight.is_finite() || options.uv_weight <= 0.0 {
        return Err(MeshError::invalid_param(
            "uv_weight",
            options.uv_weight,
            "must be finite and positive",
        ));
    }

    let avg_area = mesh.mean_face_area();
    let pos_scale = if avg_area > 1e-12 {
        (TARGET_AVG_AREA / avg_area).sqrt()
    } else {
        1.0
    };

    let mut sess = Session::prepare(mesh.clone(), options, pos_scale)?;
    // The virtual vertex is counted among the live ones; aim one higher so
    // the real-vertex target is unchanged.
    let mut target = options.target_num_vertices;
    if sess.infinity_vertex.is_some() {
        target += 1;
    }

    // Seeding reads disjoint neighborhoods of immutable state; this is the
    // only phase of the run that parallelizes safely.
    let costs: Vec<f64> = (0..sess.flaps.num_edges())
        .into_par_iter()
        .map(|e| cost_and_placement(&sess, e).cost)
        .collect();
    for (e, cost) in costs.into_iter().enumerate() {
        sess.queue.insert(e, cost);
    }
    log::info!("seeded {} collapse candidates", sess.queue.len());

    let mut remain = sess.positions.len();
    let mut max_error = 0.0f64;
    let mut stalled = false;
    let mut prev_edge = None;
    while remain > target {
        if sess.queue.is_empty() {
            break;
        }
        let (top_cost, _) = sess.queue.peek().expect("non-empty queue");
        if top_cost.is_infinite() {
            break;
        }
        let (cost, e) = sess.queue.pop().expect("peeked entry");
        // The queued cost may be stale if a neighbor collapsed since; ask
        // the oracle again before committing.
        let plan = cost_and_placement(&sess, e);
        match plan.detail {
            Some(detail) if plan.cost.is_finite() => {
                execute_collapse(&mut sess, &detail);
                max_error = max_error.max(cost.max(0.0).sqrt() / pos_scale);
                remain -= 1;
            }
            _ => {
                sess.queue.insert(e, f64::INFINITY);
                if options.abort_on_stalled_edge && prev_edge == Some(e) {
                    log::warn!("edge {e} refused collapse twice in a row; stopping");
                    stalled = true;
                    break;
                }
            }
        }
        prev_edge = Some(e);
    }
    let reached_target = !stalled && remain <= target;
    log::info!(
        "decimation stopped at {remain} live vertices (target {target}); \
         {} seam edges remain, max error {max_error}",
        sess.seams.len(),
    );
    log::debug!(
        "accumulated quadric mass: {}",
        sess.quadrics.total_trace()
    );

    let mesh = compact::clean_mesh(
        &sess.positions,
        &sess.uvs,
        &sess.faces,
        &sess.uv_faces,
        sess.num_real_faces,
    );

    Ok(Decimation {
        mesh,
        max_error,
        reached_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3};

    fn xy_uvs(positions: &[Point3<f64>]) -> Vec<Point2<f64>> {
        positions.iter().map(|p| Point2::new(p.x, p.y)).collect()
    }

    fn tetrahedron() -> TexturedMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let uvs = xy_uvs(&positions);
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap()
    }

    fn planar_quad() -> TexturedMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uvs = xy_uvs(&positions);
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap()
    }

    /// A flat strip of `cells + 1` columns and two rows of vertices.
    fn strip(cells: usize) -> TexturedMesh {
        let cols = cells + 1;
        let mut positions = Vec::new();
        for r in 0..2 {
            for c in 0..cols {
                positions.push(Point3::new(c as f64, r as f64, 0.0));
            }
        }
        let v = |r: usize, c: usize| r * cols + c;
        let mut faces = Vec::new();
        for c in 0..cells {
            faces.push([v(0, c), v(0, c + 1), v(1, c + 1)]);
            faces.push([v(0, c), v(1, c + 1), v(1, c)]);
        }
        let uvs = xy_uvs(&positions);
        TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap()
    }

    fn grid(n: usize) -> TexturedMesh {
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let v = |i: usize, j: usize| j * (n + 1) + i;
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                faces.push([v(i, j), v(i + 1, j), v(i + 1, j + 1)]);
                faces.push([v(i, j), v(i + 1, j + 1), v(i, j + 1)]);
            }
        }
        let uvs = xy_uvs(&positions);
        TexturedMesh::new(positions, uvs, faces.clone(), faces).unwrap()
    }

    /// An open cylinder whose UV chart is cut along the meridian at angle 0.
    fn seam_cylinder(segments: usize, rings: usize) -> TexturedMesh {
        let mut positions = Vec::new();
        for i in 0..rings {
            for j in 0..segments {
                let angle = 2.0 * std::f64::consts::PI * j as f64 / segments as f64;
                positions.push(Point3::new(angle.cos(), angle.sin(), i as f64));
            }
        }
        let mut uvs = Vec::new();
        for i in 0..rings {
            for j in 0..=segments {
                uvs.push(Point2::new(
                    j as f64 / segments as f64,
                    i as f64 / (rings - 1) as f64,
                ));
            }
        }
        let v = |i: usize, j: usize| i * segments + j % segments;
        let t = |i: usize, j: usize| i * (segments + 1) + j;
        let mut faces = Vec::new();
        let mut uv_faces = Vec::new();
        for i in 0..rings - 1 {
            for j in 0..segments {
                faces.push([v(i, j), v(i, j + 1), v(i + 1, j + 1)]);
                faces.push([v(i, j), v(i + 1, j + 1), v(i + 1, j)]);
                uv_faces.push([t(i, j), t(i, j + 1), t(i + 1, j + 1)]);
                uv_faces.push([t(i, j), t(i + 1, j + 1), t(i + 1, j)]);
            }
        }
        TexturedMesh::new(positions, uvs, faces, uv_faces).unwrap()
    }

    fn wedge_counts(mesh: &TexturedMesh) -> std::collections::HashMap<usize, usize> {
        let mut wedges: std::collections::HashMap<usize, std::collections::HashSet<usize>> =
            std::collections::HashMap::new();
        for (face, uv_face) in mesh.faces.iter().zip(&mesh.uv_faces) {
            for k in 0..3 {
                wedges.entry(face[k]).or_default().insert(uv_face[k]);
            }
        }
        wedges.into_iter().map(|(v, set)| (v, set.len())).collect()
    }

    #[test]
    fn test_rejects_invalid_targets() {
        let mesh = tetrahedron();
        for target in [0, 4, 10] {
            let result = decimate(&mesh, &DecimateOptions::with_target(target));
            assert!(matches!(result, Err(MeshError::InvalidTarget { .. })));
        }
    }

    #[test]
    fn test_rejects_bad_uv_weight() {
        let mesh = tetrahedron();
        let options = DecimateOptions::with_target(3).with_uv_weight(0.0);
        assert!(decimate(&mesh, &options).is_err());
    }

    #[test]
    fn test_tetrahedron_cannot_decimate() {
        let mesh = tetrahedron();
        let result = decimate(&mesh, &DecimateOptions::with_target(3)).unwrap();
        assert!(!result.reached_target);
        assert_eq!(result.max_error, 0.0);
        // Nothing could move: the output is the input, bit for bit.
        assert_eq!(result.mesh.positions, mesh.positions);
        assert_eq!(result.mesh.uvs, mesh.uvs);
        assert_eq!(result.mesh.faces, mesh.faces);
        assert_eq!(result.mesh.uv_faces, mesh.uv_faces);
    }

    #[test]
    fn test_quad_collapses_to_one_triangle() {
        let mesh = planar_quad();
        let result = decimate(&mesh, &DecimateOptions::with_target(3)).unwrap();
        assert!(result.reached_target);
        assert_eq!(result.mesh.num_vertices(), 3);
        assert_eq!(result.mesh.num_faces(), 1);
        assert!(result.max_error < 1e-6, "coplanar collapse has no error");
        // The infinity vertex never leaks into the output.
        assert!(result
            .mesh
            .positions
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite()));
        assert!(result.mesh.uvs.iter().all(|t| t.x.is_finite() && t.y.is_finite()));
    }

    #[test]
    fn test_strip_with_preserved_boundaries_is_untouched() {
        let mesh = strip(5);
        let n = mesh.num_vertices();
        let options = DecimateOptions::with_target(n - 2).with_preserve_boundaries(true);
        let result = decimate(&mesh, &options).unwrap();
        // Every vertex of a strip is a boundary vertex, so nothing may move.
        assert!(!result.reached_target);
        assert_eq!(result.max_error, 0.0);
        assert_eq!(result.mesh.positions, mesh.positions);
        assert_eq!(result.mesh.faces, mesh.faces);
        assert_eq!(result.mesh.num_vertices(), n);
    }

    #[test]
    fn test_grid_halves_without_error() {
        let mesh = grid(4);
        let n = mesh.num_vertices();
        let result = decimate(&mesh, &DecimateOptions::with_target(n / 2)).unwrap();
        assert!(result.reached_target);
        assert_eq!(result.mesh.num_vertices(), n / 2);
        assert!(result.max_error < 1e-6, "planar grid decimates exactly");

        // No face degenerated and no orientation flipped: the grid stays
        // counter-clockwise in the plane.
        for f in 0..result.mesh.num_faces() {
            let [a, b, c] = result.mesh.faces[f];
            assert!(a != b && b != c && a != c);
            let normal = crate::mesh::area_normal(
                &result.mesh.positions[a],
                &result.mesh.positions[b],
                &result.mesh.positions[c],
            );
            assert!(normal.z > 0.0);
        }
        // The output is still manifold.
        assert!(EdgeFlaps::build(&result.mesh.faces).is_ok());
    }

    #[test]
    fn test_seam_cylinder_preserves_seam_structure() {
        let mesh = seam_cylinder(8, 4);
        let input_class = classify_seams(&mesh).unwrap();
        let input_seams = input_class.seams.len();
        assert_eq!(input_seams, 3, "one cut meridian with three segments");

        let n = mesh.num_vertices();
        let result = decimate(&mesh, &DecimateOptions::with_target(n / 2)).unwrap();
        assert!(result.reached_target);
        assert_eq!(result.mesh.num_vertices(), n / 2);

        // Seam edges may collapse along the seam but never multiply.
        let output_class = classify_seams(&result.mesh).unwrap();
        assert!(output_class.seams.len() <= input_seams);

        // No wedge identities introduced: at most the two sides of the cut.
        for (v, count) in wedge_counts(&result.mesh) {
            assert!(count <= 2, "vertex {v} gained wedges ({count})");
        }
    }

    #[test]
    fn test_fold_over_edge_is_never_collapsed() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
            Point2::new(0.5, 0.5),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        let uv_faces = vec![[0, 1, 2], [1, 0, 3]];
        let mesh = TexturedMesh::new(positions, uvs, faces, uv_faces).unwrap();

        let options = DecimateOptions::with_target(3)
            .with_seam_aware_degree(SeamAwareDegree::UVShapePreserving);
        let result = decimate(&mesh, &options).unwrap();
        // The fold-over pins vertices 0 and 1, and every other edge touches
        // them, so nothing is collapsible.
        assert!(!result.reached_target);
        assert_eq!(result.mesh.num_vertices(), 4);
    }

    #[test]
    fn test_max_error_grows_on_curved_input() {
        // A coarse cylinder cannot halve its vertex count without geometric
        // error; the reported maximum must reflect that and stay finite.
        let mesh = seam_cylinder(8, 4);
        let n = mesh.num_vertices();
        let result = decimate(&mesh, &DecimateOptions::with_target(n / 2)).unwrap();
        assert!(result.max_error.is_finite());
        assert!(result.max_error > 0.0);
    }
}
