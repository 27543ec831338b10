use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;

use crate::mesh::{MeshData, VERTEX_STRIDE};

/// Parses an OBJ file from memory and returns interleaved vertex/index arrays.
///
/// Vertices are laid out as `position.xyz` followed by `normal.xyz`. Faces
/// with more than three corners are fanned into triangles. Smooth normals are
/// computed when the file does not provide them.
pub fn load_obj_from_str(data: &str) -> Result<MeshData> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut corners: Vec<Corner> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let parsed = match tag {
            "v" => read_vec3(parts).map(|p| positions.push(p)),
            "vn" => read_vec3(parts).map(|n| normals.push(n)),
            "f" => read_face(parts, positions.len(), normals.len()).map(|polygon| {
                for i in 1..polygon.len() - 1 {
                    corners.extend([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }),
            _ => Ok(()),
        };
        parsed.with_context(|| format!("invalid `{tag}` record on line {}", line_no + 1))?;
    }

    if positions.is_empty() {
        bail!("OBJ file does not define any vertices");
    }

    let mut mesh = MeshData::default();
    let mut lookup: HashMap<Corner, u32> = HashMap::new();
    let mut missing_normals = false;
    for corner in corners {
        let index = *lookup.entry(corner).or_insert_with(|| {
            let position = positions[corner.position];
            let normal = match corner.normal {
                Some(n) => normals[n],
                None => {
                    missing_normals = true;
                    Vec3::ZERO
                }
            };
            let index = mesh.vertex_count() as u32;
            mesh.vertices.extend_from_slice(&position.to_array());
            mesh.vertices.extend_from_slice(&normal.to_array());
            index
        });
        mesh.indices.push(index);
    }

    if missing_normals {
        smooth_normals(&mut mesh);
    }
    Ok(mesh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

fn read_vec3<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let values = parts
        .take(3)
        .map(|part| part.parse::<f32>().map_err(|err| anyhow!("`{part}`: {err}")))
        .collect::<Result<Vec<_>>>()?;
    match values[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => bail!("expected 3 components, got {}", values.len()),
    }
}

/// Parses `v`, `v/vt`, `v//vn` or `v/vt/vn` corners.
fn read_face<'a>(
    parts: impl Iterator<Item = &'a str>,
    position_count: usize,
    normal_count: usize,
) -> Result<Vec<Corner>> {
    let mut polygon = Vec::new();
    for part in parts {
        let mut fields = part.split('/');
        let position = fields
            .next()
            .filter(|field| !field.is_empty())
            .ok_or_else(|| anyhow!("missing vertex index in `{part}`"))?;
        let position = resolve_index(position, position_count)?;
        let normal = match fields.nth(1) {
            Some(field) if !field.is_empty() => Some(resolve_index(field, normal_count)?),
            _ => None,
        };
        polygon.push(Corner { position, normal });
    }
    if polygon.len() < 3 {
        bail!("faces must reference at least 3 vertices");
    }
    Ok(polygon)
}

/// Converts a one-based (or negative, end-relative) OBJ index.
fn resolve_index(field: &str, len: usize) -> Result<usize> {
    let index = field
        .parse::<i64>()
        .map_err(|err| anyhow!("`{field}`: {err}"))?;
    let resolved = match index {
        i if i > 0 => i as usize - 1,
        i if i < 0 && (i.unsigned_abs() as usize) <= len => len - i.unsigned_abs() as usize,
        _ => bail!("index {index} is out of range"),
    };
    if resolved >= len {
        bail!("index {index} refers past the {len} declared entries");
    }
    Ok(resolved)
}

fn smooth_normals(mesh: &mut MeshData) {
    let position = |vertices: &[f32], i: usize| {
        Vec3::from_slice(&vertices[i * VERTEX_STRIDE..i * VERTEX_STRIDE + 3])
    };
    let mut accum = vec![Vec3::ZERO; mesh.vertex_count()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let face = (position(&mesh.vertices, b) - position(&mesh.vertices, a))
            .cross(position(&mesh.vertices, c) - position(&mesh.vertices, a));
        if let Some(face) = face.try_normalize() {
            for i in [a, b, c] {
                accum[i] += face;
            }
        }
    }
    for (vertex, normal) in mesh
        .vertices
        .chunks_exact_mut(VERTEX_STRIDE)
        .zip(accum)
    {
        vertex[3..].copy_from_slice(&normal.normalize_or_zero().to_array());
    }
}
