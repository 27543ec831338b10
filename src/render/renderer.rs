use anyhow::{Context, Result};
use glam::{Mat3, Mat4};
use log::error;

use crate::error::StackError;
use crate::matrix_stack::MatrixStack;
use crate::mesh::PrimitiveMode;
use crate::render::device::{DrawState, GraphicsDevice, ProgramId, ProgramSource, UniformValue};
use crate::render::shaders::{GOURAUD, PHONG};
use crate::render::uniforms::{set, ProgramUniforms};
use crate::scene::{SceneObject, SceneState, ShadingMode};

/// What a frame sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub shading: ShadingMode,
    pub lights: usize,
    pub draws: usize,
}

struct Program {
    id: ProgramId,
    uniforms: ProgramUniforms,
}

/// Drives a [`GraphicsDevice`] from a [`SceneState`].
pub struct SceneRenderer<D: GraphicsDevice> {
    device: D,
    phong: Program,
    gouraud: Program,
    stack: MatrixStack,
}

impl<D: GraphicsDevice> SceneRenderer<D> {
    /// Compiles both shading programs and resolves their uniforms.
    pub fn new(mut device: D) -> Result<Self> {
        let mut compile = |source: &ProgramSource| -> Result<Program> {
            let id = device
                .compile_program(source)
                .with_context(|| format!("failed to compile `{}` program", source.label))?;
            let uniforms = ProgramUniforms::resolve(&device, id);
            Ok(Program { id, uniforms })
        };
        let phong = compile(&PHONG)?;
        let gouraud = compile(&GOURAUD)?;
        Ok(Self {
            device,
            phong,
            gouraud,
            stack: MatrixStack::new(),
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Records one frame. A stack discipline failure aborts the frame; the
    /// caller must not present it.
    pub fn render(&mut self, scene: &SceneState) -> Result<FrameStats, StackError> {
        let options = &scene.options;
        self.device.apply_draw_state(DrawState {
            depth_test: options.depth_test,
            backface_culling: options.backface_culling,
        });
        self.device.clear();

        let program = match options.shading {
            ShadingMode::Phong => &self.phong,
            ShadingMode::Gouraud => &self.gouraud,
        };
        self.device.use_program(program.id);

        let uniforms = &program.uniforms;
        let camera = &scene.camera;
        let view = camera.view_matrix();
        set(
            &mut self.device,
            uniforms.projection,
            UniformValue::Mat4(camera.projection_matrix()),
        );
        set(
            &mut self.device,
            uniforms.camera_eye,
            UniformValue::Vec3(camera.eye),
        );
        set(
            &mut self.device,
            uniforms.num_lights,
            UniformValue::Int(scene.lights.len() as i32),
        );
        for (slot, light) in scene.lights.iter().enumerate() {
            uniforms.upload_light(&mut self.device, slot, &light.to_view_space(&view));
        }

        let mode = if options.wireframe {
            PrimitiveMode::Lines
        } else {
            PrimitiveMode::Triangles
        };
        let use_normals = UniformValue::Int(i32::from(options.show_normals));
        let mut draws = 0;
        for object in &scene.objects {
            let before = self.stack.depth();
            self.stack.push();
            self.stack.load(view);
            for step in &object.transformations {
                step.apply(&mut self.stack);
            }
            let model_view = self.stack.current();
            set(&mut self.device, uniforms.model_view, UniformValue::Mat4(model_view));
            set(
                &mut self.device,
                uniforms.normals,
                UniformValue::Mat3(normal_matrix(model_view)),
            );
            uniforms.upload_material(&mut self.device, &object.material.get());
            set(&mut self.device, uniforms.use_normals, use_normals);
            self.device.draw(object.shape, mode);
            finish_object(&mut self.stack, object, before)?;
            draws += 1;
        }

        Ok(FrameStats {
            shading: options.shading,
            lights: scene.lights.len(),
            draws,
        })
    }
}

fn finish_object(
    stack: &mut MatrixStack,
    object: &SceneObject,
    before: usize,
) -> Result<(), StackError> {
    let result = stack.pop().and_then(|()| {
        let after = stack.depth();
        if after == before {
            Ok(())
        } else {
            Err(StackError::Unbalanced {
                object: object.name.clone(),
                before,
                after,
            })
        }
    });
    if let Err(err) = &result {
        error!("aborting frame: {err}");
        *stack = MatrixStack::new();
    }
    result
}

/// Inverse-transpose of the upper 3x3. Singular transforms (a zero scale)
/// fall back to the identity.
pub fn normal_matrix(model_view: Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(model_view);
    if upper.determinant().abs() <= f32::EPSILON {
        return Mat3::IDENTITY;
    }
    upper.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::camera::Camera;
    use crate::config::Variant;
    use crate::render::headless::{DeviceCall, RecordingDevice};
    use crate::scene::Transformation;

    fn renderer() -> SceneRenderer<RecordingDevice> {
        SceneRenderer::new(RecordingDevice::new()).unwrap()
    }

    fn approx_mat4(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    /// A scene whose camera produces the identity view matrix.
    fn identity_view_scene() -> SceneState {
        let mut scene = SceneState::from_config(&Variant::Basic.config()).unwrap();
        scene.camera = Camera {
            eye: Vec3::ZERO,
            at: Vec3::NEG_Z,
            up: Vec3::Y,
            ..Camera::default()
        };
        scene
    }

    #[test]
    fn table_gets_scaled_model_view_and_normal_matrix() {
        let scene = identity_view_scene();
        assert!(approx_mat4(scene.camera.view_matrix(), Mat4::IDENTITY));

        let mut renderer = renderer();
        renderer.render(&scene).unwrap();
        let table = &renderer.device().draws()[0];
        let Some(UniformValue::Mat4(model_view)) = table.uniform("u_model_view") else {
            panic!("model-view not uploaded");
        };
        assert!(approx_mat4(
            model_view,
            Mat4::from_diagonal(Vec4::new(10.0, 0.5, 10.0, 1.0))
        ));
        let Some(UniformValue::Mat3(normals)) = table.uniform("u_normals") else {
            panic!("normal matrix not uploaded");
        };
        assert!(normals.abs_diff_eq(Mat3::from_diagonal(Vec3::new(0.1, 2.0, 0.1)), 1e-5));
    }

    #[test]
    fn normal_matrix_ignores_translation() {
        let with_offset = Mat4::from_translation(Vec3::new(4.0, -2.0, 7.0))
            * Mat4::from_scale(Vec3::new(10.0, 0.5, 10.0));
        assert!(normal_matrix(with_offset)
            .abs_diff_eq(Mat3::from_diagonal(Vec3::new(0.1, 2.0, 0.1)), 1e-5));
        assert_eq!(normal_matrix(Mat4::from_scale(Vec3::ZERO)), Mat3::IDENTITY);
    }

    #[test]
    fn disabled_lights_upload_zero_intensity() {
        let scene = SceneState::from_config(&Variant::MultiLight.config()).unwrap();
        assert!(!scene.lights[1].turned_on);

        let mut renderer = renderer();
        renderer.render(&scene).unwrap();
        let device = renderer.device();
        for field in ["ambient", "diffuse", "specular"] {
            assert_eq!(
                device.uniform(&format!("u_L[1].{field}")),
                Some(UniformValue::Vec3(Vec3::ZERO))
            );
        }
        assert_eq!(
            device.uniform("u_L[0].diffuse"),
            Some(UniformValue::Vec3(Vec3::splat(0.8)))
        );
        assert_eq!(device.uniform("u_L[1].aperture"), Some(UniformValue::Float(0.0)));
        assert_eq!(device.uniform("u_numLights"), Some(UniformValue::Int(3)));
    }

    #[test]
    fn directional_lights_stay_directions() {
        let scene = SceneState::from_config(&Variant::MultiLight.config()).unwrap();
        let mut renderer = renderer();
        renderer.render(&scene).unwrap();
        let Some(UniformValue::Vec4(position)) = renderer.device().uniform("u_L[2].position")
        else {
            panic!("light position not uploaded");
        };
        assert_eq!(position.w, 0.0);
        let expected = scene
            .camera
            .view_matrix()
            .transform_vector3(Vec3::new(-1.0, -0.5, 0.0));
        assert!((position.truncate() - expected).length() < 1e-5);
        // Directional slots carry no axis.
        assert_eq!(renderer.device().uniform("u_L[2].axis"), None);
    }

    #[test]
    fn frame_follows_the_documented_order() {
        let scene = SceneState::from_config(&Variant::Basic.config()).unwrap();
        let mut renderer = renderer();
        let stats = renderer.render(&scene).unwrap();
        assert_eq!(
            stats,
            FrameStats {
                shading: ShadingMode::Gouraud,
                lights: 1,
                draws: 3,
            }
        );
        let calls = renderer.device().calls();
        assert!(matches!(calls[0], DeviceCall::DrawState(_)));
        assert_eq!(calls[1], DeviceCall::Clear);
        let DeviceCall::UseProgram(program) = calls[2] else {
            panic!("program not selected before uniforms");
        };
        assert_eq!(renderer.device().program_label(program), Some("gouraud"));
        let shapes: Vec<_> = renderer.device().draws().iter().map(|d| d.shape).collect();
        assert_eq!(
            shapes,
            scene.objects.iter().map(|o| o.shape).collect::<Vec<_>>()
        );
    }

    #[test]
    fn options_drive_state_and_primitive_mode() {
        let mut scene = SceneState::from_config(&Variant::MultiLight.config()).unwrap();
        scene.options.backface_culling = true;
        scene.options.depth_test = false;
        scene.options.wireframe = true;
        scene.options.show_normals = true;

        let mut renderer = renderer();
        renderer.render(&scene).unwrap();
        let device = renderer.device();
        assert_eq!(
            device.calls()[0],
            DeviceCall::DrawState(DrawState {
                depth_test: false,
                backface_culling: true,
            })
        );
        assert!(device
            .draws()
            .iter()
            .all(|draw| draw.mode == PrimitiveMode::Lines));
        assert_eq!(device.uniform("u_use_normals"), Some(UniformValue::Int(1)));
        assert_eq!(
            device.program_label(device.current_program().unwrap()),
            Some("phong")
        );
    }

    #[test]
    fn shared_material_edits_reach_every_linked_draw() {
        let scene = SceneState::from_config(&Variant::Basic.config()).unwrap();
        scene.material.update(|m| m.shininess = 42.0);
        let mut renderer = renderer();
        renderer.render(&scene).unwrap();
        let sphere = &renderer.device().draws()[2];
        assert_eq!(sphere.shape, crate::scene::Shape::Sphere);
        assert_eq!(
            sphere.uniform("u_material.shininess"),
            Some(UniformValue::Float(42.0))
        );
    }

    #[test]
    fn missing_uniforms_are_skipped() {
        let scene = SceneState::from_config(&Variant::Basic.config()).unwrap();
        let device = RecordingDevice::new().without_uniform("u_normals");
        let mut renderer = SceneRenderer::new(device).unwrap();
        let stats = renderer.render(&scene).unwrap();
        assert_eq!(stats.draws, 3);
        assert_eq!(renderer.device().uniform("u_normals"), None);
    }

    #[test]
    fn stack_depth_is_balanced_across_frames() {
        let mut scene = SceneState::from_config(&Variant::MultiLight.config()).unwrap();
        scene.objects[1].transformations.extend([
            Transformation::Rotate(crate::scene::Axis::Y, 30.0),
            Transformation::Translate(Vec3::X),
        ]);
        let mut renderer = renderer();
        for _ in 0..3 {
            renderer.render(&scene).unwrap();
            assert_eq!(renderer.stack.depth(), 0);
        }
    }

    #[test]
    fn unbalanced_objects_abort_the_frame() {
        let scene = SceneState::from_config(&Variant::Basic.config()).unwrap();
        let table = &scene.objects[0];

        let mut stack = MatrixStack::new();
        stack.push();
        stack.push();
        let err = finish_object(&mut stack, table, 0).unwrap_err();
        assert_eq!(
            err,
            StackError::Unbalanced {
                object: "Table".into(),
                before: 0,
                after: 1,
            }
        );
        assert_eq!(stack.depth(), 0);

        assert_eq!(
            finish_object(&mut stack, table, 0),
            Err(StackError::Underflow)
        );
    }
}
