use anyhow::{Context, Result};
use log::{debug, info};

use crate::camera::StrafeDirection;
use crate::config::SceneConfig;
use crate::input::{InputEvent, KeyCode, MouseButton, NamedKey, PointerDrag};
use crate::panel::{FieldPath, FieldValue, OptionField, ParameterPanel};
use crate::scene::SceneState;

/// What the host should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Nothing changed.
    Idle,
    /// State changed; the next frame shows it.
    Changed,
    Quit,
}

pub struct Application {
    scene: SceneState,
    panel: ParameterPanel,
    drag: PointerDrag,
}

impl Application {
    pub fn new(config: &SceneConfig) -> Result<Self> {
        let scene = SceneState::from_config(config).context("invalid scene configuration")?;
        let panel = ParameterPanel::for_scene(&scene);
        Ok(Self {
            scene,
            panel,
            drag: PointerDrag::new(),
        })
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn panel(&self) -> &ParameterPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ParameterPanel {
        &mut self.panel
    }

    /// Applies `path=value` assignments through the panel.
    pub fn apply_settings<S: AsRef<str>>(&mut self, assignments: &[S]) -> Result<()> {
        for assignment in assignments {
            let assignment = assignment.as_ref();
            self.panel
                .set_from_str(&mut self.scene, assignment)
                .with_context(|| format!("cannot apply `{assignment}`"))?;
        }
        Ok(())
    }

    pub fn handle(&mut self, event: InputEvent) -> Response {
        match event {
            InputEvent::PointerDown { button, position } if button == MouseButton::LEFT => {
                self.drag.begin(position);
                Response::Idle
            }
            InputEvent::PointerDown { .. } => Response::Idle,
            InputEvent::PointerMove { position } => match self.drag.advance(position) {
                Some(delta) => {
                    self.scene.camera.orbit(delta.x, delta.y);
                    Response::Changed
                }
                None => Response::Idle,
            },
            InputEvent::PointerUp { button } => {
                if button == MouseButton::LEFT {
                    self.drag.end();
                }
                Response::Idle
            }
            InputEvent::Wheel { delta, modifiers } => {
                let camera = &mut self.scene.camera;
                if modifiers.ctrl {
                    camera.dolly(delta, true);
                } else if modifiers.meta {
                    camera.dolly(delta, false);
                } else if modifiers.alt {
                    return Response::Idle;
                } else {
                    camera.zoom(delta);
                }
                Response::Changed
            }
            InputEvent::KeyDown { key } => self.handle_key(key),
            InputEvent::Resize { width, height } => {
                self.scene.camera.set_viewport(width, height);
                Response::Changed
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) -> Response {
        match key {
            KeyCode::Named(NamedKey::Escape) => Response::Quit,
            KeyCode::Character('R') => {
                self.scene.camera.reset();
                info!("camera reset");
                Response::Changed
            }
            KeyCode::Character(c @ ('W' | 'A' | 'S' | 'D')) => {
                if !self.scene.strafe_enabled {
                    return Response::Idle;
                }
                let direction = match c {
                    'W' => StrafeDirection::Forward,
                    'S' => StrafeDirection::Back,
                    'A' => StrafeDirection::Left,
                    _ => StrafeDirection::Right,
                };
                self.scene.camera.strafe(direction);
                Response::Changed
            }
            KeyCode::Digit(n @ 1..=9) => {
                let slot = usize::from(n - 1);
                let Some(light) = self.scene.lights.get(slot) else {
                    debug!("no light in slot {slot}");
                    return Response::Idle;
                };
                let value = FieldValue::Toggle(!light.turned_on);
                self.edit(FieldPath::LightTurnedOn(slot), value)
            }
            KeyCode::Character('G') => {
                let shading = self.scene.options.shading.toggled();
                info!("shading mode: {}", shading.name());
                self.edit(
                    FieldPath::Option(OptionField::Shading),
                    FieldValue::Choice(shading.name().to_string()),
                )
            }
            KeyCode::Character('C') => {
                let value = FieldValue::Toggle(!self.scene.options.backface_culling);
                self.edit(FieldPath::Option(OptionField::BackfaceCulling), value)
            }
            KeyCode::Character('Z') => {
                let value = FieldValue::Toggle(!self.scene.options.depth_test);
                self.edit(FieldPath::Option(OptionField::DepthTest), value)
            }
            KeyCode::Character('N') => {
                let value = FieldValue::Toggle(!self.scene.options.show_normals);
                self.edit(FieldPath::Option(OptionField::ShowNormals), value)
            }
            KeyCode::Character('F') => {
                let value = FieldValue::Toggle(!self.scene.options.wireframe);
                self.edit(FieldPath::Option(OptionField::Wireframe), value)
            }
            _ => Response::Idle,
        }
    }

    fn edit(&mut self, path: FieldPath, value: FieldValue) -> Response {
        match self.panel.set(&mut self.scene, path, value) {
            Ok(()) => Response::Changed,
            Err(err) => {
                debug!("ignored key edit: {err}");
                Response::Idle
            }
        }
    }
}
