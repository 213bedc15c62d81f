//! Final mesh compaction.
//!
//! During decimation, dead faces are stamped with [`NULL_INDEX`] rather than
//! removed, and merged-away vertices simply become unreferenced. Compaction
//! happens exactly once, after the collapse loop terminates: dead and
//! virtual faces are dropped, then unreferenced positions and texture
//! coordinates are removed independently.

use crate::mesh::{TexturedMesh, NULL_INDEX};

/// Drop coordinate rows not referenced by any face and remap face indices.
///
/// Surviving rows keep their original relative order, so a mesh with no
/// unreferenced rows passes through unchanged. Returns the compacted
/// coordinates, the remapped faces, and the old-to-new index map
/// ([`NULL_INDEX`] marks dropped rows).
pub fn remove_unreferenced<T: Clone>(
    coords: &[T],
    faces: &[[usize; 3]],
) -> (Vec<T>, Vec<[usize; 3]>, Vec<usize>) {
    let mut referenced = vec![false; coords.len()];
    for face in faces {
        for &i in face {
            referenced[i] = true;
        }
    }
    let mut old_to_new = vec![NULL_INDEX; coords.len()];
    let mut kept = Vec::new();
    for (i, coord) in coords.iter().enumerate() {
        if referenced[i] {
            old_to_new[i] = kept.len();
            kept.push(coord.clone());
        }
    }
    let remapped = faces
        .iter()
        .map(|face| face.map(|i| old_to_new[i]))
        .collect();
    (kept, remapped, old_to_new)
}

/// Compact a decimated mesh.
///
/// Keeps only the live rows among the first `num_real_faces` faces (virtual
/// infinity faces are appended after the real ones and are discarded
/// wholesale), then removes unreferenced positions and uvs. The infinity
/// vertex is unreferenced by construction and disappears here.
pub fn clean_mesh(
    positions: &[nalgebra::Point3<f64>],
    uvs: &[nalgebra::Point2<f64>],
    faces: &[[usize; 3]],
    uv_faces: &[[usize; 3]],
    num_real_faces: usize,
) -> TexturedMesh {
    let mut live_faces = Vec::with_capacity(num_real_faces);
    let mut live_uv_faces = Vec::with_capacity(num_real_faces);
    for f in 0..num_real_faces {
        if faces[f][0] != NULL_INDEX {
            debug_assert!(uv_faces[f][0] != NULL_INDEX);
            live_faces.push(faces[f]);
            live_uv_faces.push(uv_faces[f]);
        }
    }

    let (positions, faces, _) = remove_unreferenced(positions, &live_faces);
    let (uvs, uv_faces, _) = remove_unreferenced(uvs, &live_uv_faces);
    TexturedMesh {
        positions,
        uvs,
        faces,
        uv_faces,
    }
}
