use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use pollster::block_on;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::mesh::{self, PrimitiveMode, VERTEX_STRIDE};
use crate::render::device::{
    DrawState, GraphicsDevice, ProgramId, ProgramSource, UniformLocation, UniformValue,
};
use crate::render::shaders::{
    module_source, uniform_slots, UniformBlock, UniformSlot, FRAME_BLOCK_SIZE, OBJECT_BLOCK_SIZE,
};
use crate::scene::Shape;

const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.03,
    g: 0.03,
    b: 0.05,
    a: 1.0,
};

/// [`GraphicsDevice`] backed by wgpu.
///
/// Draws are recorded with a snapshot of the object uniforms and encoded into
/// a single render pass by [`WgpuDevice::present`].
pub struct WgpuDevice {
    // Declared before `window` so it is dropped first.
    surface: wgpu::Surface,
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    slots: Vec<UniformSlot>,
    programs: Vec<CompiledProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    meshes: HashMap<Shape, MeshBuffers>,
    assets: PathBuf,
    current: Option<ProgramId>,
    draw_state: DrawState,
    object_block: [u8; OBJECT_BLOCK_SIZE],
    commands: Vec<DrawCommand>,
}

impl WgpuDevice {
    /// Creates a device rendering into `window`. Meshes that are loaded from
    /// disk are looked up under `assets`.
    pub async fn new(window: Arc<Window>, assets: PathBuf) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the window is kept alive by `self.window`, which is dropped
        // after `self.surface`.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using GPU adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("scene-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .context("surface reports no texture formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth = DepthBuffer::create(&device, config.width, config.height);

        let frame_layout = uniform_layout(&device, "frame-bind-layout", FRAME_BLOCK_SIZE);
        let object_layout = uniform_layout(&device, "object-bind-layout", OBJECT_BLOCK_SIZE);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            surface,
            window,
            device,
            queue,
            config,
            depth,
            frame_layout,
            object_layout,
            pipeline_layout,
            slots: uniform_slots(),
            programs: Vec::new(),
            pipelines: HashMap::new(),
            meshes: HashMap::new(),
            assets,
            current: None,
            draw_state: DrawState {
                depth_test: true,
                backface_culling: false,
            },
            object_block: [0; OBJECT_BLOCK_SIZE],
            commands: Vec::new(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reconfigures the swap chain; zero-sized requests are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, size.width, size.height);
    }

    /// Encodes the recorded draws into one pass and presents it.
    pub fn present(&mut self) -> Result<(), wgpu::SurfaceError> {
        let commands = std::mem::take(&mut self.commands);
        for program in &self.programs {
            self.queue
                .write_buffer(&program.frame_buffer, 0, &program.frame_block);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene-encoder"),
            });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOUR),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        for command in &commands {
            let (Some(pipeline), Some(mesh), Some(program)) = (
                self.pipelines.get(&command.key),
                self.meshes.get(&command.shape),
                self.programs.get(command.key.program.0 as usize),
            ) else {
                continue;
            };
            let indices = mesh.indices(command.key.mode);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &program.frame_bind_group, &[]);
            pass.set_bind_group(1, &command.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..indices.count, 0, 0..1);
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn ensure_mesh(&mut self, shape: Shape) {
        if self.meshes.contains_key(&shape) {
            return;
        }
        let data = mesh::build(shape, &self.assets);
        let label = shape.name();
        let buffers = MeshBuffers {
            vertex: self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label}-vertices")),
                    contents: bytemuck::cast_slice(&data.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            triangles: IndexBuffer::create(
                &self.device,
                &data.indices,
                &format!("{label}-triangles"),
            ),
            lines: IndexBuffer::create(
                &self.device,
                &data.edge_indices(),
                &format!("{label}-edges"),
            ),
        };
        info!(
            "uploaded {label} mesh: {} vertices, {} triangles",
            data.vertex_count(),
            data.triangle_count()
        );
        self.meshes.insert(shape, buffers);
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(program) = self.programs.get(key.program.0 as usize) else {
            return;
        };
        let topology = match key.mode {
            PrimitiveMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveMode::Lines => wgpu::PrimitiveTopology::LineList,
        };
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.module,
                    entry_point: "vs_main",
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: key.state.backface_culling.then_some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthBuffer::FORMAT,
                    depth_write_enabled: key.state.depth_test,
                    depth_compare: if key.state.depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &program.module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            });
        self.pipelines.insert(key, pipeline);
    }
}

impl GraphicsDevice for WgpuDevice {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(module_source(source).into()),
            });
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            bail!("shader `{}` failed to compile: {err}", source.label);
        }

        let frame_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniform"),
            size: FRAME_BLOCK_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        self.programs.push(CompiledProgram {
            label: source.label,
            module,
            frame_block: vec![0; FRAME_BLOCK_SIZE],
            frame_buffer,
            frame_bind_group,
        });
        info!("compiled `{}` program", source.label);
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if program.0 as usize >= self.programs.len() {
            return None;
        }
        self.slots
            .iter()
            .position(|slot| slot.name == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(slot) = self.slots.get(location.0 as usize) else {
            return;
        };
        if slot.kind != value.kind() {
            warn!("`{}` expects {:?}, got {:?}", slot.name, slot.kind, value.kind());
            return;
        }
        let block: &mut [u8] = match slot.block {
            UniformBlock::Object => &mut self.object_block,
            UniformBlock::Frame => {
                let Some(program) = self
                    .current
                    .and_then(|id| self.programs.get_mut(id.0 as usize))
                else {
                    return;
                };
                &mut program.frame_block
            }
        };
        value.write_to(&mut block[slot.offset..]);
    }

    fn apply_draw_state(&mut self, state: DrawState) {
        self.draw_state = state;
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn draw(&mut self, shape: Shape, mode: PrimitiveMode) {
        let Some(program) = self.current else {
            warn!("draw of {shape} without a program");
            return;
        };
        let key = PipelineKey {
            program,
            state: self.draw_state,
            mode,
        };
        self.ensure_mesh(shape);
        self.ensure_pipeline(key);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object-uniform"),
                contents: &self.object_block,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.commands.push(DrawCommand {
            key,
            shape,
            bind_group,
            _uniforms: buffer,
        });
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, size: usize) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        }],
    })
}

struct CompiledProgram {
    label: &'static str,
    module: wgpu::ShaderModule,
    frame_block: Vec<u8>,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    state: DrawState,
    mode: PrimitiveMode,
}

struct DrawCommand {
    key: PipelineKey,
    shape: Shape,
    bind_group: wgpu::BindGroup,
    _uniforms: wgpu::Buffer,
}

struct IndexBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

impl IndexBuffer {
    fn create(device: &wgpu::Device, indices: &[u32], label: &str) -> Self {
        Self {
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            count: indices.len() as u32,
        }
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    triangles: IndexBuffer,
    lines: IndexBuffer,
}

impl MeshBuffers {
    fn indices(&self, mode: PrimitiveMode) -> &IndexBuffer {
        match mode {
            PrimitiveMode::Triangles => &self.triangles,
            PrimitiveMode::Lines => &self.lines,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
