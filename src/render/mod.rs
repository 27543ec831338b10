pub mod device;
pub mod headless;
pub mod native;
pub mod renderer;
pub mod shaders;
pub mod uniforms;

pub use device::{
    DrawState, GraphicsDevice, ProgramId, ProgramSource, UniformKind, UniformLocation,
    UniformValue,
};
pub use headless::{DeviceCall, RecordedDraw, RecordingDevice};
pub use native::WgpuDevice;
pub use renderer::{normal_matrix, FrameStats, SceneRenderer};
pub use uniforms::{LightLocations, ProgramUniforms};
