//! Wavefront OBJ format support.
//!
//! Reads and writes `v`, `vt`, and `f` records. Faces may use the `v/vt` or
//! `v/vt/vn` reference forms (corners without a texture coordinate are
//! rejected — a purely geometric mesh cannot be decimated seam-aware);
//! polygons are fan triangulated. Positions and texture coordinates keep
//! their separate OBJ index spaces, which is exactly the wedge structure the
//! decimation engine operates on. Normals, materials, and grouping
//! directives are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::TexturedMesh;

/// Load a textured mesh from an OBJ file.
///
/// The file must carry texture coordinates on every face corner; a purely
/// geometric OBJ cannot be decimated seam-aware.
///
/// # Example
///
/// ```no_run
/// use selvage::io::obj;
///
/// let mesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TexturedMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let fail = |line: usize, message: String| MeshError::LoadError {
        path: path.to_path_buf(),
        message: format!("line {line}: {message}"),
    };

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut uvs: Vec<Point2<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut uv_faces: Vec<[usize; 3]> = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let lineno = lineno + 1;
        let line = line?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords = parse_floats(&mut tokens, 3)
                    .map_err(|m| fail(lineno, m))?;
                positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("vt") => {
                let coords = parse_floats(&mut tokens, 2)
                    .map_err(|m| fail(lineno, m))?;
                uvs.push(Point2::new(coords[0], coords[1]));
            }
            Some("f") => {
                let mut corners: Vec<(usize, usize)> = Vec::with_capacity(4);
                for token in tokens {
                    let (v, vt) = parse_face_corner(token, positions.len(), uvs.len())
                        .map_err(|m| fail(lineno, m))?;
                    corners.push((v, vt));
                }
                if corners.len() < 3 {
                    return Err(fail(lineno, "face has fewer than 3 corners".into()));
                }
                for i in 1..corners.len() - 1 {
                    faces.push([corners[0].0, corners[i].0, corners[i + 1].0]);
                    uv_faces.push([corners[0].1, corners[i].1, corners[i + 1].1]);
                }
            }
            // Normals, materials, and grouping are irrelevant here.
            _ => {}
        }
    }

    if uvs.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file has no texture coordinates (vt records)".to_string(),
        });
    }

    TexturedMesh::new(positions, uvs, faces, uv_faces)
}

fn parse_floats<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    count: usize,
) -> std::result::Result<Vec<f64>, String> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let token = tokens.next().ok_or("missing coordinate")?;
        out.push(
            token
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{token}'"))?,
        );
    }
    Ok(out)
}

/// Parse one `f` corner reference into zero-based (position, uv) indices.
///
/// OBJ indices are one-based; negative values count back from the end of the
/// arrays read so far.
fn parse_face_corner(
    token: &str,
    num_positions: usize,
    num_uvs: usize,
) -> std::result::Result<(usize, usize), String> {
    let mut parts = token.split('/');
    let v = parts.next().filter(|p| !p.is_empty()).ok_or_else(|| {
        format!("malformed face corner '{token}'")
    })?;
    let vt = parts.next().unwrap_or("");
    if vt.is_empty() {
        return Err(format!(
            "face corner '{token}' has no texture coordinate reference"
        ));
    }
    let v = resolve_index(v, num_positions)
        .ok_or_else(|| format!("position index '{v}' out of range"))?;
    let vt = resolve_index(vt, num_uvs)
        .ok_or_else(|| format!("uv index '{vt}' out of range"))?;
    Ok((v, vt))
}

fn resolve_index(token: &str, len: usize) -> Option<usize> {
    let value: i64 = token.parse().ok()?;
    let index = if value > 0 {
        value as usize - 1
    } else if value < 0 {
        len.checked_sub(value.unsigned_abs() as usize)?
    } else {
        return None;
    };
    (index < len).then_some(index)
}

/// Save a textured mesh to an OBJ file.
///
/// Coordinates are written with round-trip precision.
pub fn save<P: AsRef<Path>>(mesh: &TexturedMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut writer = BufWriter::new(file);

    for p in &mesh.positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for t in &mesh.uvs {
        writeln!(writer, "vt {} {}", t.x, t.y)?;
    }
    for (face, uv_face) in mesh.faces.iter().zip(&mesh.uv_faces) {
        writeln!(
            writer,
            "f {}/{} {}/{} {}/{}",
            face[0] + 1,
            uv_face[0] + 1,
            face[1] + 1,
            uv_face[1] + 1,
            face[2] + 1,
            uv_face[2] + 1,
        )?;
    }
    writer.flush()?;
    Ok(())
}
