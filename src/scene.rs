use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use glam::Vec3;
use log::warn;

use crate::camera::Camera;
use crate::config::{MaterialSpec, SceneConfig};
use crate::light::Light;
use crate::material::MaterialHandle;
use crate::matrix_stack::MatrixStack;

/// Mesh provider an object is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Sphere,
    Torus,
    Cylinder,
    Bunny,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Self::Cube,
        Self::Sphere,
        Self::Torus,
        Self::Cylinder,
        Self::Bunny,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Torus => "torus",
            Self::Cylinder => "cylinder",
            Self::Bunny => "bunny",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Shape::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown shape `{s}`"))
    }
}

/// Coordinate axis for elementary rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "x" | "X" => Ok(Self::X),
            "y" | "Y" => Ok(Self::Y),
            "z" | "Z" => Ok(Self::Z),
            other => Err(anyhow!("unknown rotation axis `{other}`")),
        }
    }
}

/// One step of an object's transform sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transformation {
    Translate(Vec3),
    /// Angle in degrees.
    Rotate(Axis, f32),
    Scale(Vec3),
}

impl Transformation {
    /// Right-multiplies the stack's current matrix with this step.
    pub fn apply(&self, stack: &mut MatrixStack) {
        match *self {
            Self::Translate(offset) => stack.mult_translation(offset),
            Self::Rotate(Axis::X, degrees) => stack.mult_rotation_x(degrees),
            Self::Rotate(Axis::Y, degrees) => stack.mult_rotation_y(degrees),
            Self::Rotate(Axis::Z, degrees) => stack.mult_rotation_z(degrees),
            Self::Scale(factors) => stack.mult_scale(factors),
        }
    }
}

/// Drawable object of the fixed scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub shape: Shape,
    /// Applied in order, each one inside the previous.
    pub transformations: Vec<Transformation>,
    pub material: MaterialHandle,
}

/// Per-vertex or per-fragment evaluation of the lighting equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    Gouraud,
    Phong,
}

impl ShadingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Gouraud => Self::Phong,
            Self::Phong => Self::Gouraud,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gouraud => "Gouraud",
            Self::Phong => "Phong",
        }
    }
}

impl FromStr for ShadingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gouraud" => Ok(Self::Gouraud),
            "phong" => Ok(Self::Phong),
            other => Err(anyhow!("unknown shading mode `{other}`")),
        }
    }
}

/// Global draw-state switches applied at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub backface_culling: bool,
    pub depth_test: bool,
    pub shading: ShadingMode,
    pub wireframe: bool,
    /// Colours surfaces by their view-space normal.
    pub show_normals: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            backface_culling: false,
            depth_test: true,
            shading: ShadingMode::Phong,
            wireframe: false,
            show_normals: false,
        }
    }
}

/// Everything the frame loop, input handlers and panel read or mutate.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: Camera,
    pub lights: Vec<Light>,
    /// Material edited from the panel; objects holding a clone alias it.
    pub material: MaterialHandle,
    pub objects: Vec<SceneObject>,
    pub options: RenderOptions,
    pub strafe_enabled: bool,
}

impl SceneState {
    /// Builds the live scene from a configuration.
    pub fn from_config(config: &SceneConfig) -> Result<Self> {
        config.validate()?;
        let material = MaterialHandle::new(config.material);
        let objects = config
            .objects
            .iter()
            .map(|spec| SceneObject {
                name: spec.name.clone(),
                shape: spec.shape,
                transformations: spec.transformations.clone(),
                material: match spec.material {
                    MaterialSpec::Shared => material.clone(),
                    MaterialSpec::Own(own) => MaterialHandle::new(own),
                },
            })
            .collect();
        Ok(Self {
            camera: config.camera.clone(),
            lights: config.lights.clone(),
            material,
            objects,
            options: config.options,
            strafe_enabled: config.strafe_enabled,
        })
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn light_mut(&mut self, index: usize) -> Result<&mut Light> {
        let count = self.lights.len();
        match self.lights.get_mut(index) {
            Some(light) => Ok(light),
            None => bail!("light slot {index} out of range ({count} lights)"),
        }
    }

    /// Flips a light slot; out-of-range slots are ignored.
    pub fn toggle_light(&mut self, index: usize) -> Option<bool> {
        match self.lights.get_mut(index) {
            Some(light) => Some(light.toggle()),
            None => {
                warn!("no light in slot {index}");
                None
            }
        }
    }
}
