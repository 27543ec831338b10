//! Building blocks for a small interactive lit scene.
//!
//! The crate keeps the scene transformation and lighting pipeline (matrix
//! stack, look-at camera, light model and the per-frame renderer) separate
//! from the window and the GPU. Rendering goes through the
//! [`render::GraphicsDevice`] trait so the frame loop can be driven headless
//! in tests and tools.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod light;
pub mod material;
pub mod matrix_stack;
pub mod mesh;
pub mod obj;
pub mod panel;
pub mod render;
pub mod scene;

pub use app::{Application, Response};
pub use camera::{Camera, ClipPlane, StrafeDirection};
pub use config::{SceneConfig, Variant};
pub use error::{PanelError, StackError};
pub use input::{InputEvent, KeyCode, Modifiers, MouseButton, NamedKey, PointerDrag};
pub use light::{Intensities, Light, LightKind, LightUniform, MAX_LIGHTS};
pub use material::{Material, MaterialHandle, Reflectance};
pub use matrix_stack::MatrixStack;
pub use mesh::{MeshData, PrimitiveMode};
pub use obj::load_obj_from_str;
pub use panel::{FieldPath, FieldValue, ParameterPanel};
pub use render::{FrameStats, GraphicsDevice, RecordingDevice, SceneRenderer, WgpuDevice};
pub use scene::{RenderOptions, SceneObject, SceneState, ShadingMode, Shape, Transformation};
