use glam::{Vec2, Vec3};
use scene_lab::input::{InputEvent, KeyCode, MouseButton};
use scene_lab::render::UniformValue;
use scene_lab::{Application, RecordingDevice, Response, SceneRenderer, Variant};

fn setup() -> (Application, SceneRenderer<RecordingDevice>) {
    let app = Application::new(&Variant::MultiLight.config()).unwrap();
    let renderer = SceneRenderer::new(RecordingDevice::new()).unwrap();
    (app, renderer)
}

fn frame(app: &Application, renderer: &mut SceneRenderer<RecordingDevice>) {
    renderer.device_mut().reset();
    renderer.render(app.scene()).unwrap();
}

fn press(app: &mut Application, key: KeyCode) -> Response {
    app.handle(InputEvent::KeyDown { key })
}

#[test]
fn toggled_light_reaches_the_next_frame() {
    let (mut app, mut renderer) = setup();
    frame(&app, &mut renderer);
    assert_eq!(
        renderer.device().uniform("u_L[1].diffuse"),
        Some(UniformValue::Vec3(Vec3::ZERO))
    );

    assert_eq!(press(&mut app, KeyCode::Digit(2)), Response::Changed);
    frame(&app, &mut renderer);
    let expected = app.scene().lights[1].intensities.diffuse;
    assert_ne!(expected, Vec3::ZERO);
    assert_eq!(
        renderer.device().uniform("u_L[1].diffuse"),
        Some(UniformValue::Vec3(expected))
    );
}

#[test]
fn shading_key_switches_programs() {
    let (mut app, mut renderer) = setup();
    frame(&app, &mut renderer);
    let phong = renderer.device().current_program().unwrap();
    assert_eq!(renderer.device().program_label(phong), Some("phong"));

    press(&mut app, KeyCode::Character('G'));
    frame(&app, &mut renderer);
    let gouraud = renderer.device().current_program().unwrap();
    assert_eq!(renderer.device().program_label(gouraud), Some("gouraud"));
    assert!(renderer.device().draws().iter().all(|d| d.program == gouraud));
}

#[test]
fn orbiting_moves_the_uploaded_eye() {
    let (mut app, mut renderer) = setup();
    frame(&app, &mut renderer);
    let before = renderer.device().uniform("u_camera_eye");

    app.handle(InputEvent::PointerDown {
        button: MouseButton::LEFT,
        position: Vec2::ZERO,
    });
    app.handle(InputEvent::PointerMove {
        position: Vec2::new(30.0, -20.0),
    });
    frame(&app, &mut renderer);
    let after = renderer.device().uniform("u_camera_eye");
    assert_ne!(before, after);
    assert_eq!(after, Some(UniformValue::Vec3(app.scene().camera.eye)));
}

#[test]
fn panel_colour_edits_reach_linked_objects_only() {
    let (mut app, mut renderer) = setup();
    app.apply_settings(&["material.Kd=255,0,0"]).unwrap();
    frame(&app, &mut renderer);

    let draws = renderer.device().draws();
    assert_eq!(draws.len(), 5);
    let kd = |index: usize| draws[index].uniform("u_material.Kd");
    assert_eq!(kd(4), Some(UniformValue::Vec3(Vec3::X)));
    assert_ne!(kd(0), Some(UniformValue::Vec3(Vec3::X)));
}

#[test]
fn option_keys_change_draw_mode_and_normals() {
    let (mut app, mut renderer) = setup();
    for key in ['C', 'Z', 'N', 'F'] {
        press(&mut app, KeyCode::Character(key));
        frame(&app, &mut renderer);
    }
    let last = renderer.device().draws().last().unwrap();
    assert_eq!(last.uniform("u_use_normals"), Some(UniformValue::Int(1)));
    assert_eq!(last.mode, scene_lab::PrimitiveMode::Lines);
}
