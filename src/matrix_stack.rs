//! Hierarchical model-view matrix stack.
//!
//! The stack always holds a current matrix; `push` saves a copy of it and
//! `pop` restores the saved copy. Every `mult_*` call right-multiplies the
//! current matrix, so the transform applied last is the one closest to the
//! object's local coordinates.

use glam::{Mat4, Vec3};

use crate::error::StackError;

/// Stack of 4x4 transforms composed against a shared view matrix.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    current: Mat4,
    saved: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    /// Creates a stack whose current matrix is the identity.
    pub fn new() -> Self {
        Self {
            current: Mat4::IDENTITY,
            saved: Vec::new(),
        }
    }

    /// Number of saved frames below the current matrix.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Saves a copy of the current matrix.
    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restores the most recently saved matrix.
    pub fn pop(&mut self) -> Result<(), StackError> {
        self.current = self.saved.pop().ok_or(StackError::Underflow)?;
        Ok(())
    }

    /// Replaces the current matrix.
    pub fn load(&mut self, matrix: Mat4) {
        self.current = matrix;
    }

    /// Right-multiplies the current matrix: `current = current * matrix`.
    pub fn multiply(&mut self, matrix: Mat4) {
        self.current *= matrix;
    }

    /// Snapshot of the current matrix.
    pub fn current(&self) -> Mat4 {
        self.current
    }

    pub fn mult_translation(&mut self, offset: Vec3) {
        self.multiply(Mat4::from_translation(offset));
    }

    /// Rotation about the X axis, in degrees.
    pub fn mult_rotation_x(&mut self, degrees: f32) {
        self.multiply(Mat4::from_rotation_x(degrees.to_radians()));
    }

    /// Rotation about the Y axis, in degrees.
    pub fn mult_rotation_y(&mut self, degrees: f32) {
        self.multiply(Mat4::from_rotation_y(degrees.to_radians()));
    }

    /// Rotation about the Z axis, in degrees.
    pub fn mult_rotation_z(&mut self, degrees: f32) {
        self.multiply(Mat4::from_rotation_z(degrees.to_radians()));
    }

    pub fn mult_scale(&mut self, factors: Vec3) {
        self.multiply(Mat4::from_scale(factors));
    }
}
