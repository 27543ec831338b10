use std::collections::BTreeSet;
use std::f32::consts::{PI, TAU};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use crate::scene::Shape;

/// Floats per interleaved vertex.
pub const VERTEX_STRIDE: usize = 6;

const SEGMENTS: u32 = 32;
const TORUS_MAJOR_RADIUS: f32 = 0.35;
const TORUS_MINOR_RADIUS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Line-list indices covering every triangle edge once.
    pub fn edge_indices(&self) -> Vec<u32> {
        let mut edges = BTreeSet::new();
        for triangle in self.indices.chunks_exact(3) {
            for (a, b) in [
                (triangle[0], triangle[1]),
                (triangle[1], triangle[2]),
                (triangle[2], triangle[0]),
            ] {
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Indices for the requested primitive mode.
    pub fn indices_for(&self, mode: PrimitiveMode) -> Vec<u32> {
        match mode {
            PrimitiveMode::Triangles => self.indices.clone(),
            PrimitiveMode::Lines => self.edge_indices(),
        }
    }

    fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3]) {
        self.vertices.extend_from_slice(&position);
        self.vertices.extend_from_slice(&normal);
    }

    fn next_index(&self) -> u32 {
        self.vertex_count() as u32
    }
}

/// Builds the mesh for a shape. The bunny is read from `<assets>/bunny.obj`
/// and replaced by the sphere when the file is unavailable.
pub fn build(shape: Shape, assets: &Path) -> MeshData {
    match shape {
        Shape::Cube => cube(),
        Shape::Sphere => sphere(SEGMENTS, SEGMENTS / 2),
        Shape::Torus => torus(SEGMENTS, SEGMENTS / 2),
        Shape::Cylinder => cylinder(SEGMENTS),
        Shape::Bunny => match load_bunny(assets) {
            Ok(mesh) => mesh,
            Err(err) => {
                warn!("bunny mesh unavailable, drawing a sphere instead: {err:#}");
                sphere(SEGMENTS, SEGMENTS / 2)
            }
        },
    }
}

fn load_bunny(assets: &Path) -> Result<MeshData> {
    let path = assets.join("bunny.obj");
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let mut mesh = crate::obj::load_obj_from_str(&contents)
        .with_context(|| format!("failed to parse OBJ mesh {}", path.display()))?;
    fit_unit_box(&mut mesh);
    Ok(mesh)
}

/// Recentres a loaded mesh and scales it so its largest extent is 1.
fn fit_unit_box(mesh: &mut MeshData) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex[axis]);
            max[axis] = max[axis].max(vertex[axis]);
        }
    }
    let extent = (0..3).map(|a| max[a] - min[a]).fold(0.0_f32, f32::max);
    if extent <= f32::EPSILON {
        return;
    }
    for vertex in mesh.vertices.chunks_exact_mut(VERTEX_STRIDE) {
        for axis in 0..3 {
            let centre = (min[axis] + max[axis]) * 0.5;
            vertex[axis] = (vertex[axis] - centre) / extent;
        }
    }
}

pub fn cube() -> MeshData {
    MeshData {
        vertices: CUBE_VERTICES.to_vec(),
        indices: CUBE_INDICES.to_vec(),
    }
}

pub fn sphere(slices: u32, stacks: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            mesh.push_vertex(normal.map(|c| c * 0.5), normal);
        }
    }
    push_grid(&mut mesh, 0, slices, stacks, false);
    mesh
}

pub fn torus(ring_segments: u32, tube_segments: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for tube in 0..=tube_segments {
        let phi = TAU * tube as f32 / tube_segments as f32;
        for ring in 0..=ring_segments {
            let theta = TAU * ring as f32 / ring_segments as f32;
            let normal = [phi.cos() * theta.cos(), phi.sin(), phi.cos() * theta.sin()];
            let position = [
                TORUS_MAJOR_RADIUS * theta.cos() + TORUS_MINOR_RADIUS * normal[0],
                TORUS_MINOR_RADIUS * normal[1],
                TORUS_MAJOR_RADIUS * theta.sin() + TORUS_MINOR_RADIUS * normal[2],
            ];
            mesh.push_vertex(position, normal);
        }
    }
    push_grid(&mut mesh, 0, ring_segments, tube_segments, true);
    mesh
}

/// Capped cylinder of radius 0.5 and height 1 along Y.
pub fn cylinder(slices: u32) -> MeshData {
    let mut mesh = MeshData::default();
    for y in [0.5_f32, -0.5] {
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let (sin, cos) = theta.sin_cos();
            mesh.push_vertex([0.5 * cos, y, 0.5 * sin], [cos, 0.0, sin]);
        }
    }
    push_grid(&mut mesh, 0, slices, 1, false);

    for (y, up) in [(0.5_f32, true), (-0.5, false)] {
        let normal = [0.0, if up { 1.0 } else { -1.0 }, 0.0];
        let centre = mesh.next_index();
        mesh.push_vertex([0.0, y, 0.0], normal);
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let (sin, cos) = theta.sin_cos();
            mesh.push_vertex([0.5 * cos, y, 0.5 * sin], normal);
        }
        for slice in 0..slices {
            let current = centre + 1 + slice;
            if up {
                mesh.indices.extend_from_slice(&[centre, current + 1, current]);
            } else {
                mesh.indices.extend_from_slice(&[centre, current, current + 1]);
            }
        }
    }
    mesh
}

/// Indexes a `(columns + 1) x (rows + 1)` vertex grid starting at `base`.
/// Rows advance downwards on spheres and cylinders; `rows_go_up` flips the
/// winding for grids whose rows advance upwards.
fn push_grid(mesh: &mut MeshData, base: u32, columns: u32, rows: u32, rows_go_up: bool) {
    let width = columns + 1;
    for row in 0..rows {
        for column in 0..columns {
            let a = base + row * width + column;
            let b = a + width;
            if rows_go_up {
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            } else {
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
    }
}

const CUBE_VERTICES: &[f32] = &[
    // positions        // normals
    -0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, -0.5, 0.5, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 0.0, 0.0, 1.0,
    -0.5, 0.5, 0.5, 0.0, 0.0, 1.0, -0.5, -0.5, -0.5, 0.0, 0.0, -1.0, 0.5, -0.5, -0.5, 0.0, 0.0,
    -1.0, 0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, 0.5, -0.5, 0.0, 0.0, -1.0, -0.5, -0.5, -0.5, -1.0,
    0.0, 0.0, -0.5, -0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, 0.5, -1.0, 0.0, 0.0, -0.5, 0.5, -0.5,
    -1.0, 0.0, 0.0, 0.5, -0.5, -0.5, 1.0, 0.0, 0.0, 0.5, -0.5, 0.5, 1.0, 0.0, 0.0, 0.5, 0.5, 0.5,
    1.0, 0.0, 0.0, 0.5, 0.5, -0.5, 1.0, 0.0, 0.0, -0.5, -0.5, -0.5, 0.0, -1.0, 0.0, 0.5, -0.5,
    -0.5, 0.0, -1.0, 0.0, 0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5, -0.5, 0.5, 0.0, -1.0, 0.0, -0.5,
    0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, -0.5, 0.0, 1.0, 0.0, 0.5, 0.5, 0.5, 0.0, 1.0, 0.0, -0.5,
    0.5, 0.5, 0.0, 1.0, 0.0,
];

const CUBE_INDICES: &[u32] = &[
    0, 1, 2, 0, 2, 3, // front
    4, 6, 5, 4, 7, 6, // back
    8, 9, 10, 8, 10, 11, // left
    12, 14, 13, 12, 15, 14, // right
    16, 17, 18, 16, 18, 19, // bottom
    20, 22, 21, 20, 23, 22, // top
];
