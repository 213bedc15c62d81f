//! Atomic application of one legal collapse.
//!
//! The executor consumes a plan the oracle has just re-validated and commits
//! it in one pass: the two faces flanking the edge die, their outer edges
//! merge pairwise, every surviving corner of the victim vertex is rewritten
//! to the survivor (positions *and* uv identities, following the wedge
//! pairing), quadrics and seams migrate, and every edge whose cost may have
//! changed is re-scored into the queue.
//!
//! The flap tables are patched in place rather than rebuilt. Patched `E`
//! rows keep their slots but may lose the lower-id-first ordering; nothing
//! downstream relies on it after construction.

use std::collections::{HashMap, HashSet};

use crate::mesh::NULL_INDEX;

use super::placement::{cost_and_placement, PlanDetail};
use super::quadric::Quadric5;
use super::Session;

/// Apply a validated collapse plan. The caller decrements its live vertex
/// count on return.
pub fn execute_collapse(sess: &mut Session, plan: &PlanDetail) {
    let b = &plan.bundle;
    let e = b.edge;

    // Merge direction: both endpoints move to the same placement, so the
    // orientation-flip census is identical for either survivor and the tie
    // falls to the lower id.
    let v_keep = b.p0.min(b.p1);
    let v_kill = b.p0.max(b.p1);
    let keep_is_p0 = v_keep == b.p0;

    // Resolve each wedge group to one surviving uv id, accumulate the merged
    // quadrics, and record the id rewrites for the ring pass below.
    let mut uv_remap: HashMap<(usize, usize), usize> = HashMap::new();
    let mut new_wedges: HashMap<usize, Quadric5> = HashMap::new();
    for (gi, group) in b.groups.iter().enumerate() {
        let (keep_side, kill_side) = if keep_is_p0 {
            (&group.wedges0, &group.wedges1)
        } else {
            (&group.wedges1, &group.wedges0)
        };
        let keep_t = keep_side
            .first()
            .or_else(|| kill_side.first())
            .copied()
            .expect("empty wedge group");

        let mut q = Quadric5::zero();
        for &t in &group.wedges0 {
            if let Some(wq) = sess.quadrics.get(b.p0, t) {
                q += wq;
            }
        }
        for &t in &group.wedges1 {
            if let Some(wq) = sess.quadrics.get(b.p1, t) {
                q += wq;
            }
        }
        new_wedges.insert(keep_t, q);

        for &t in keep_side {
            if t != keep_t {
                uv_remap.insert((v_keep, t), keep_t);
            }
        }
        for &t in kill_side {
            if t != keep_t {
                uv_remap.insert((v_kill, t), keep_t);
            }
        }

        let uv = plan.placement.uvs[gi];
        sess.scaled_uvs[keep_t] = uv;
        sess.uvs[keep_t] = uv / sess.uv_weight;
    }
    sess.scaled_positions[v_keep] = plan.placement.position;
    sess.positions[v_keep] = plan.placement.position / sess.pos_scale;

    // Retire the two flanking faces. In each, the edge from the third vertex
    // to the victim dies and its outer face inherits the surviving edge on
    // the keeper's side.
    for side in 0..2 {
        let f = sess.flaps.edge_faces[e][side];
        let face = sess.faces[f];
        let ck = face.iter().position(|&v| v == v_kill).expect("victim in flap");
        let cs = face.iter().position(|&v| v == v_keep).expect("survivor in flap");

        let e_dead = sess.flaps.edge_across(f, cs);
        let e_live = sess.flaps.edge_across(f, ck);

        let outer_side = if sess.flaps.edge_faces[e_dead][0] == f { 1 } else { 0 };
        let f_outer = sess.flaps.edge_faces[e_dead][outer_side];
        let c_outer = sess.flaps.edge_corners[e_dead][outer_side];

        sess.flaps.kill_edge(e_dead);
        sess.queue.erase(e_dead);
        sess.faces[f] = [NULL_INDEX; 3];
        sess.uv_faces[f] = [NULL_INDEX; 3];

        sess.flaps.set_edge_across(f_outer, c_outer, e_live);
        let patched = if sess.flaps.edge_faces[e_live][0] == f { 0 } else { 1 };
        sess.flaps.edge_faces[e_live][patched] = f_outer;
        sess.flaps.edge_corners[e_live][patched] = c_outer;
    }

    // Rewrite the victim's surviving ring: position ids, uv ids, and the
    // endpoint entries of its incident edges.
    let (kill_ring, keep_ring) = if keep_is_p0 {
        (&b.ring1, &b.ring0)
    } else {
        (&b.ring0, &b.ring1)
    };
    for rc in kill_ring {
        let f = rc.face;
        if sess.faces[f][0] == NULL_INDEX {
            continue;
        }
        let c = rc.corner;
        debug_assert_eq!(sess.faces[f][c], v_kill);
        let t = sess.uv_faces[f][c];
        if let Some(&nt) = uv_remap.get(&(v_kill, t)) {
            sess.uv_faces[f][c] = nt;
        }
        sess.faces[f][c] = v_keep;
        for dk in 1..3 {
            let ee = sess.flaps.edge_across(f, (c + dk) % 3);
            if sess.flaps.is_live(ee) {
                for end in &mut sess.flaps.edges[ee] {
                    if *end == v_kill {
                        *end = v_keep;
                    }
                }
            }
        }
    }
    // A seam ending at the victim can merge two of the survivor's wedges;
    // retag the survivor's ring where that happened.
    for rc in keep_ring {
        let f = rc.face;
        if sess.faces[f][0] == NULL_INDEX {
            continue;
        }
        let t = sess.uv_faces[f][rc.corner];
        if let Some(&nt) = uv_remap.get(&(v_keep, t)) {
            sess.uv_faces[f][rc.corner] = nt;
        }
    }

    sess.flaps.kill_edge(e);

    sess.quadrics.remove_vertex(v_kill);
    sess.quadrics.set_vertex(v_keep, new_wedges);
    sess.seams.remap(v_kill, v_keep);

    // Re-score everything whose cost may have moved: all edges of all
    // surviving faces around either endpoint.
    let mut rescored = HashSet::new();
    for rc in b.ring0.iter().chain(b.ring1.iter()) {
        let f = rc.face;
        if sess.faces[f][0] == NULL_INDEX {
            continue;
        }
        for k in 0..3 {
            let ee = sess.flaps.edge_across(f, k);
            if ee == NULL_INDEX || !sess.flaps.is_live(ee) || !rescored.insert(ee) {
                continue;
            }
            let cost = cost_and_placement(sess, ee).cost;
            sess.queue.update(ee, cost);
        }
    }
}
