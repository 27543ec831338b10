use anyhow::Result;
use bytemuck::bytes_of;
use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::mesh::PrimitiveMode;
use crate::scene::Shape;

/// Handle of a compiled shading program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Resolved uniform slot of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Shader stages of one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Int(_) => UniformKind::Int,
            Self::Float(_) => UniformKind::Float,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Writes the value at the start of `dst` using uniform-buffer layout
    /// rules: `mat3` columns are padded to 16 bytes. Returns the bytes written.
    pub fn write_to(&self, dst: &mut [u8]) -> usize {
        let mut put = |bytes: &[u8], at: usize| {
            dst[at..at + bytes.len()].copy_from_slice(bytes);
            at + bytes.len()
        };
        match self {
            Self::Int(v) => put(bytes_of(v), 0),
            Self::Float(v) => put(bytes_of(v), 0),
            Self::Vec3(v) => put(bytes_of(&v.to_array()), 0),
            Self::Vec4(v) => put(bytes_of(&v.to_array()), 0),
            Self::Mat4(m) => put(bytes_of(&m.to_cols_array()), 0),
            Self::Mat3(m) => {
                let mut end = 0;
                for column in 0..3 {
                    let padded = m.col(column).extend(0.0).to_array();
                    end = put(bytes_of(&padded), column * 16);
                }
                end
            }
        }
    }
}

/// Fixed-function state applied at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawState {
    pub depth_test: bool,
    pub backface_culling: bool,
}

/// Opaque device: compiles programs, binds uniforms and issues draws.
///
/// Writes through a location the program does not have are not errors;
/// callers skip `None` locations.
pub trait GraphicsDevice {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId>;

    fn use_program(&mut self, program: ProgramId);

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Sets a uniform of the program currently in use.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn apply_draw_state(&mut self, state: DrawState);

    /// Clears colour and depth.
    fn clear(&mut self);

    /// Draws a shape's mesh with the uniforms set so far.
    fn draw(&mut self, shape: Shape, mode: PrimitiveMode);
}
