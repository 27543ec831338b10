//! Parameter panel binding layer.
//!
//! Controls are bound to a [`FieldPath`] rather than to a live object, and
//! values are read and written through the path every time. Replacing a
//! vector in [`SceneState`] therefore never leaves a control pointing at
//! stale data. Change callbacks run after the raw value has been stored and
//! may refine it (the clip plane callbacks enforce the near/far margin this
//! way).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use log::debug;

use crate::camera::ClipPlane;
use crate::error::PanelError;
use crate::material::Reflectance;
use crate::scene::{SceneState, ShadingMode};

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraField {
    Fovy,
    Aspect,
    Near,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraVector {
    Eye,
    At,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionField {
    BackfaceCulling,
    DepthTest,
    Shading,
    Wireframe,
    ShowNormals,
}

/// Stable identifier of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Camera(CameraField),
    /// Component 0..3 of `eye`, `at` or `up`.
    CameraVector(CameraVector, usize),
    /// Light slot and component 0..4 of its position.
    LightPosition(usize, usize),
    LightIntensity(usize, Reflectance),
    LightAxis(usize, usize),
    LightAperture(usize),
    LightCutoff(usize),
    LightTurnedOn(usize),
    MaterialColor(Reflectance),
    MaterialShininess,
    Option(OptionField),
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Camera(field) => {
                let name = match field {
                    CameraField::Fovy => "fovy",
                    CameraField::Aspect => "aspect",
                    CameraField::Near => "near",
                    CameraField::Far => "far",
                };
                write!(f, "camera.{name}")
            }
            Self::CameraVector(vector, component) => {
                let name = match vector {
                    CameraVector::Eye => "eye",
                    CameraVector::At => "at",
                    CameraVector::Up => "up",
                };
                write!(f, "camera.{name}.{}", COMPONENTS[component])
            }
            Self::LightPosition(slot, component) => {
                write!(f, "lights[{slot}].position.{}", COMPONENTS[component])
            }
            Self::LightIntensity(slot, kind) => write!(f, "lights[{slot}].{}", kind.name()),
            Self::LightAxis(slot, component) => {
                write!(f, "lights[{slot}].axis.{}", COMPONENTS[component])
            }
            Self::LightAperture(slot) => write!(f, "lights[{slot}].aperture"),
            Self::LightCutoff(slot) => write!(f, "lights[{slot}].cutoff"),
            Self::LightTurnedOn(slot) => write!(f, "lights[{slot}].turnedOn"),
            Self::MaterialColor(kind) => {
                let name = match kind {
                    Reflectance::Ambient => "Ka",
                    Reflectance::Diffuse => "Kd",
                    Reflectance::Specular => "Ks",
                };
                write!(f, "material.{name}")
            }
            Self::MaterialShininess => f.write_str("material.shininess"),
            Self::Option(option) => {
                let name = match option {
                    OptionField::BackfaceCulling => "backfaceCulling",
                    OptionField::DepthTest => "depthTest",
                    OptionField::Shading => "shading",
                    OptionField::Wireframe => "wireframe",
                    OptionField::ShowNormals => "normals",
                };
                write!(f, "options.{name}")
            }
        }
    }
}

impl FromStr for FieldPath {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PanelError::InvalidPath(s.to_string());
        let component = |name: &str, limit: usize| {
            COMPONENTS[..limit]
                .iter()
                .position(|c| *c == name)
                .or_else(|| name.parse::<usize>().ok().filter(|i| *i < limit))
                .ok_or_else(invalid)
        };
        let parts: Vec<&str> = s.split('.').collect();
        let path = match parts.as_slice() {
            ["camera", "fovy"] => Self::Camera(CameraField::Fovy),
            ["camera", "aspect"] => Self::Camera(CameraField::Aspect),
            ["camera", "near"] => Self::Camera(CameraField::Near),
            ["camera", "far"] => Self::Camera(CameraField::Far),
            ["camera", vector, c] => {
                let vector = match *vector {
                    "eye" => CameraVector::Eye,
                    "at" => CameraVector::At,
                    "up" => CameraVector::Up,
                    _ => return Err(invalid()),
                };
                Self::CameraVector(vector, component(c, 3)?)
            }
            ["material", "Ka"] => Self::MaterialColor(Reflectance::Ambient),
            ["material", "Kd"] => Self::MaterialColor(Reflectance::Diffuse),
            ["material", "Ks"] => Self::MaterialColor(Reflectance::Specular),
            ["material", "shininess"] => Self::MaterialShininess,
            ["options", "backfaceCulling"] => Self::Option(OptionField::BackfaceCulling),
            ["options", "depthTest"] => Self::Option(OptionField::DepthTest),
            ["options", "shading"] => Self::Option(OptionField::Shading),
            ["options", "wireframe"] => Self::Option(OptionField::Wireframe),
            ["options", "normals"] => Self::Option(OptionField::ShowNormals),
            [light, rest @ ..] if light.starts_with("lights[") => {
                let slot = light
                    .strip_prefix("lights[")
                    .and_then(|l| l.strip_suffix(']'))
                    .and_then(|index| index.parse::<usize>().ok())
                    .ok_or_else(invalid)?;
                match rest {
                    ["position", c] => Self::LightPosition(slot, component(c, 4)?),
                    ["axis", c] => Self::LightAxis(slot, component(c, 3)?),
                    ["ambient"] => Self::LightIntensity(slot, Reflectance::Ambient),
                    ["diffuse"] => Self::LightIntensity(slot, Reflectance::Diffuse),
                    ["specular"] => Self::LightIntensity(slot, Reflectance::Specular),
                    ["aperture"] => Self::LightAperture(slot),
                    ["cutoff"] => Self::LightCutoff(slot),
                    ["turnedOn"] => Self::LightTurnedOn(slot),
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        };
        Ok(path)
    }
}

/// Value shown by, or submitted to, a control.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f32),
    /// RGB in `0..=255`, as colour pickers present it.
    Color([u8; 3]),
    Toggle(bool),
    Choice(String),
}

impl FieldValue {
    fn from_unit_rgb(value: Vec3) -> Self {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::Color([channel(value.x), channel(value.y), channel(value.z)])
    }

    fn to_unit_rgb(rgb: [u8; 3]) -> Vec3 {
        Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Color([r, g, b]) => write!(f, "{r},{g},{b}"),
            Self::Toggle(value) => write!(f, "{value}"),
            Self::Choice(value) => f.write_str(value),
        }
    }
}

/// Slider bounds; unbounded sides are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub step: f32,
}

impl NumberRange {
    pub const fn bounded(min: f32, max: f32, step: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            step,
        }
    }

    pub const fn unbounded(step: f32) -> Self {
        Self {
            min: None,
            max: None,
            step,
        }
    }

    /// Saturates to the bounds. `step` is the slider granularity only.
    pub fn apply(&self, value: f32) -> f32 {
        let mut value = value;
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Number(NumberRange),
    Color,
    Toggle,
    Choice(&'static [&'static str]),
}

/// One bound control.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub path: FieldPath,
    pub kind: ControlKind,
    /// Display-only: driven by the window or by pointer input.
    pub read_only: bool,
}

pub type ChangeCallback = Box<dyn FnMut(&mut SceneState, &FieldValue)>;

/// Controls plus their change subscribers.
#[derive(Default)]
pub struct ParameterPanel {
    controls: Vec<Control>,
    callbacks: HashMap<FieldPath, Vec<ChangeCallback>>,
}

impl fmt::Debug for ParameterPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterPanel")
            .field("controls", &self.controls.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

const SHADING_CHOICES: &[&str] = &["Gouraud", "Phong"];

impl ParameterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the camera, options, every light slot and the shared material.
    pub fn for_scene(scene: &SceneState) -> Self {
        let mut panel = Self::new();

        panel.bind_number(
            FieldPath::Camera(CameraField::Fovy),
            NumberRange::bounded(1.0, 179.0, 1.0),
        );
        panel
            .bind_number(
                FieldPath::Camera(CameraField::Aspect),
                NumberRange::bounded(0.0, 10.0, 0.01),
            )
            .read_only = true;
        panel.bind_number(
            FieldPath::Camera(CameraField::Near),
            NumberRange::bounded(0.1, 20.0, 0.01),
        );
        panel.on_change(FieldPath::Camera(CameraField::Near), |scene, value| {
            if let FieldValue::Number(v) = value {
                scene.camera.adjust_clip(ClipPlane::Near, *v);
            }
        });
        panel.bind_number(
            FieldPath::Camera(CameraField::Far),
            NumberRange::bounded(0.1, 20.0, 0.01),
        );
        panel.on_change(FieldPath::Camera(CameraField::Far), |scene, value| {
            if let FieldValue::Number(v) = value {
                scene.camera.adjust_clip(ClipPlane::Far, *v);
            }
        });
        for vector in [CameraVector::Eye, CameraVector::At, CameraVector::Up] {
            for component in 0..3 {
                let control = panel.bind_number(
                    FieldPath::CameraVector(vector, component),
                    NumberRange::unbounded(0.05),
                );
                control.read_only = vector == CameraVector::Up;
            }
        }

        panel.bind(FieldPath::Option(OptionField::BackfaceCulling), ControlKind::Toggle);
        panel.bind(FieldPath::Option(OptionField::DepthTest), ControlKind::Toggle);
        panel.bind(
            FieldPath::Option(OptionField::Shading),
            ControlKind::Choice(SHADING_CHOICES),
        );
        panel.bind(FieldPath::Option(OptionField::Wireframe), ControlKind::Toggle);
        panel.bind(FieldPath::Option(OptionField::ShowNormals), ControlKind::Toggle);

        for slot in 0..scene.lights.len() {
            for component in 0..3 {
                panel.bind_number(
                    FieldPath::LightPosition(slot, component),
                    NumberRange::bounded(-10.0, 10.0, 0.1),
                );
            }
            panel.bind_number(
                FieldPath::LightPosition(slot, 3),
                NumberRange::bounded(0.0, 1.0, 1.0),
            );
            for kind in Reflectance::ALL {
                panel.bind(FieldPath::LightIntensity(slot, kind), ControlKind::Color);
            }
            for component in 0..3 {
                panel.bind_number(
                    FieldPath::LightAxis(slot, component),
                    NumberRange::bounded(-1.0, 1.0, 0.01),
                );
            }
            panel.bind_number(
                FieldPath::LightAperture(slot),
                NumberRange::bounded(0.0, 90.0, 1.0),
            );
            panel.bind_number(
                FieldPath::LightCutoff(slot),
                NumberRange::bounded(0.0, 1.0, 0.01),
            );
            panel.bind(FieldPath::LightTurnedOn(slot), ControlKind::Toggle);
        }

        for kind in Reflectance::ALL {
            panel.bind(FieldPath::MaterialColor(kind), ControlKind::Color);
        }
        panel.bind_number(
            FieldPath::MaterialShininess,
            NumberRange::bounded(1.0, 256.0, 1.0),
        );
        panel
    }

    /// Adds a control, or returns the existing one for `path`.
    pub fn bind(&mut self, path: FieldPath, kind: ControlKind) -> &mut Control {
        let index = match self.controls.iter().position(|c| c.path == path) {
            Some(index) => index,
            None => {
                self.controls.push(Control {
                    path,
                    kind,
                    read_only: false,
                });
                self.controls.len() - 1
            }
        };
        &mut self.controls[index]
    }

    pub fn bind_number(&mut self, path: FieldPath, range: NumberRange) -> &mut Control {
        self.bind(path, ControlKind::Number(range))
    }

    /// Subscribes to successful edits of `path`.
    pub fn on_change(
        &mut self,
        path: FieldPath,
        callback: impl FnMut(&mut SceneState, &FieldValue) + 'static,
    ) {
        self.callbacks
            .entry(path)
            .or_default()
            .push(Box::new(callback));
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, path: FieldPath) -> Option<&Control> {
        self.controls.iter().find(|c| c.path == path)
    }

    /// Reads the live value of a bound field.
    pub fn get(&self, scene: &SceneState, path: FieldPath) -> Result<FieldValue, PanelError> {
        self.require(path)?;
        read_field(scene, path).ok_or_else(|| PanelError::UnknownField(path.to_string()))
    }

    /// Edits a bound field: saturates numbers to the control range, stores
    /// the value and notifies subscribers.
    pub fn set(
        &mut self,
        scene: &mut SceneState,
        path: FieldPath,
        value: FieldValue,
    ) -> Result<(), PanelError> {
        let control = self.require(path)?;
        if control.read_only {
            return Err(PanelError::ReadOnly(path.to_string()));
        }
        let value = normalize(path, &control.kind, value)?;
        write_field(scene, path, &value)?;
        debug!("panel: {path} = {value}");
        if let Some(callbacks) = self.callbacks.get_mut(&path) {
            for callback in callbacks.iter_mut() {
                callback(scene, &value);
            }
        }
        Ok(())
    }

    /// Parses and applies a `path=value` assignment.
    pub fn set_from_str(
        &mut self,
        scene: &mut SceneState,
        assignment: &str,
    ) -> Result<FieldPath, PanelError> {
        let (path, raw) = assignment
            .split_once('=')
            .ok_or_else(|| PanelError::InvalidPath(assignment.to_string()))?;
        let path: FieldPath = path.trim().parse()?;
        let kind = self.require(path)?.kind.clone();
        let value = parse_value(path, &kind, raw.trim())?;
        self.set(scene, path, value)?;
        Ok(path)
    }

    /// One `path = value` line per control, in binding order.
    pub fn describe(&self, scene: &SceneState) -> Vec<String> {
        self.controls
            .iter()
            .filter_map(|control| {
                let value = read_field(scene, control.path)?;
                let suffix = if control.read_only { " (read-only)" } else { "" };
                Some(format!("{} = {value}{suffix}", control.path))
            })
            .collect()
    }

    fn require(&self, path: FieldPath) -> Result<&Control, PanelError> {
        self.control(path)
            .ok_or_else(|| PanelError::UnknownField(path.to_string()))
    }
}

fn mismatch(path: FieldPath, expected: &'static str) -> PanelError {
    PanelError::TypeMismatch {
        path: path.to_string(),
        expected,
    }
}

fn normalize(
    path: FieldPath,
    kind: &ControlKind,
    value: FieldValue,
) -> Result<FieldValue, PanelError> {
    match (kind, value) {
        (ControlKind::Number(range), FieldValue::Number(v)) => {
            let v = range.apply(v);
            // The w component tags the light type: 0 directional, 1 positional.
            let v = match path {
                FieldPath::LightPosition(_, 3) => v.round(),
                _ => v,
            };
            Ok(FieldValue::Number(v))
        }
        (ControlKind::Color, value @ FieldValue::Color(_)) => Ok(value),
        (ControlKind::Toggle, value @ FieldValue::Toggle(_)) => Ok(value),
        (ControlKind::Choice(choices), FieldValue::Choice(choice)) => choices
            .iter()
            .find(|c| c.eq_ignore_ascii_case(&choice))
            .map(|c| FieldValue::Choice(c.to_string()))
            .ok_or_else(|| mismatch(path, "listed choice")),
        (ControlKind::Number(_), _) => Err(mismatch(path, "number")),
        (ControlKind::Color, _) => Err(mismatch(path, "colour")),
        (ControlKind::Toggle, _) => Err(mismatch(path, "boolean")),
        (ControlKind::Choice(_), _) => Err(mismatch(path, "choice")),
    }
}

fn parse_value(path: FieldPath, kind: &ControlKind, raw: &str) -> Result<FieldValue, PanelError> {
    match kind {
        ControlKind::Number(_) => raw
            .parse::<f32>()
            .map(FieldValue::Number)
            .map_err(|_| mismatch(path, "number")),
        ControlKind::Toggle => raw
            .parse::<bool>()
            .map(FieldValue::Toggle)
            .map_err(|_| mismatch(path, "boolean")),
        ControlKind::Choice(_) => Ok(FieldValue::Choice(raw.to_string())),
        ControlKind::Color => {
            let channels = raw
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| mismatch(path, "r,g,b colour"))?;
            match channels[..] {
                [r, g, b] => Ok(FieldValue::Color([r, g, b])),
                _ => Err(mismatch(path, "r,g,b colour")),
            }
        }
    }
}

fn read_field(scene: &SceneState, path: FieldPath) -> Option<FieldValue> {
    let camera = &scene.camera;
    let value = match path {
        FieldPath::Camera(field) => FieldValue::Number(match field {
            CameraField::Fovy => camera.fovy,
            CameraField::Aspect => camera.aspect,
            CameraField::Near => camera.near,
            CameraField::Far => camera.far,
        }),
        FieldPath::CameraVector(vector, component) => {
            let v = match vector {
                CameraVector::Eye => camera.eye,
                CameraVector::At => camera.at,
                CameraVector::Up => camera.up,
            };
            FieldValue::Number(v[component])
        }
        FieldPath::LightPosition(slot, c) => FieldValue::Number(scene.lights.get(slot)?.position[c]),
        FieldPath::LightIntensity(slot, kind) => {
            FieldValue::from_unit_rgb(scene.lights.get(slot)?.intensities.get(kind))
        }
        FieldPath::LightAxis(slot, c) => FieldValue::Number(scene.lights.get(slot)?.axis[c]),
        FieldPath::LightAperture(slot) => FieldValue::Number(scene.lights.get(slot)?.aperture),
        FieldPath::LightCutoff(slot) => FieldValue::Number(scene.lights.get(slot)?.cutoff),
        FieldPath::LightTurnedOn(slot) => FieldValue::Toggle(scene.lights.get(slot)?.turned_on),
        FieldPath::MaterialColor(kind) => {
            FieldValue::from_unit_rgb(scene.material.get().coefficient(kind))
        }
        FieldPath::MaterialShininess => FieldValue::Number(scene.material.get().shininess),
        FieldPath::Option(option) => {
            let options = &scene.options;
            match option {
                OptionField::BackfaceCulling => FieldValue::Toggle(options.backface_culling),
                OptionField::DepthTest => FieldValue::Toggle(options.depth_test),
                OptionField::Shading => FieldValue::Choice(options.shading.name().to_string()),
                OptionField::Wireframe => FieldValue::Toggle(options.wireframe),
                OptionField::ShowNormals => FieldValue::Toggle(options.show_normals),
            }
        }
    };
    Some(value)
}

fn write_field(scene: &mut SceneState, path: FieldPath, value: &FieldValue) -> Result<(), PanelError> {
    let unknown = || PanelError::UnknownField(path.to_string());
    match (path, value) {
        (FieldPath::Camera(field), FieldValue::Number(v)) => match field {
            CameraField::Fovy => scene.camera.set_fovy(*v),
            CameraField::Aspect => scene.camera.aspect = *v,
            CameraField::Near => scene.camera.near = *v,
            CameraField::Far => scene.camera.far = *v,
        },
        (FieldPath::CameraVector(vector, component), FieldValue::Number(v)) => {
            let target = match vector {
                CameraVector::Eye => &mut scene.camera.eye,
                CameraVector::At => &mut scene.camera.at,
                CameraVector::Up => &mut scene.camera.up,
            };
            target[component] = *v;
        }
        (FieldPath::LightPosition(slot, c), FieldValue::Number(v)) => {
            scene.lights.get_mut(slot).ok_or_else(unknown)?.position[c] = *v;
        }
        (FieldPath::LightIntensity(slot, kind), FieldValue::Color(rgb)) => {
            let light = scene.lights.get_mut(slot).ok_or_else(unknown)?;
            light.intensities.set(kind, FieldValue::to_unit_rgb(*rgb));
        }
        (FieldPath::LightAxis(slot, c), FieldValue::Number(v)) => {
            scene.lights.get_mut(slot).ok_or_else(unknown)?.axis[c] = *v;
        }
        (FieldPath::LightAperture(slot), FieldValue::Number(v)) => {
            scene.lights.get_mut(slot).ok_or_else(unknown)?.aperture = *v;
        }
        (FieldPath::LightCutoff(slot), FieldValue::Number(v)) => {
            scene.lights.get_mut(slot).ok_or_else(unknown)?.cutoff = *v;
        }
        (FieldPath::LightTurnedOn(slot), FieldValue::Toggle(on)) => {
            scene.lights.get_mut(slot).ok_or_else(unknown)?.turned_on = *on;
        }
        (FieldPath::MaterialColor(kind), FieldValue::Color(rgb)) => {
            let value = FieldValue::to_unit_rgb(*rgb);
            scene.material.update(|m| m.set_coefficient(kind, value));
        }
        (FieldPath::MaterialShininess, FieldValue::Number(v)) => {
            scene.material.update(|m| m.shininess = *v);
        }
        (FieldPath::Option(option), value) => {
            let options = &mut scene.options;
            match (option, value) {
                (OptionField::BackfaceCulling, FieldValue::Toggle(on)) => {
                    options.backface_culling = *on
                }
                (OptionField::DepthTest, FieldValue::Toggle(on)) => options.depth_test = *on,
                (OptionField::Wireframe, FieldValue::Toggle(on)) => options.wireframe = *on,
                (OptionField::ShowNormals, FieldValue::Toggle(on)) => options.show_normals = *on,
                (OptionField::Shading, FieldValue::Choice(choice)) => {
                    options.shading = choice
                        .parse::<ShadingMode>()
                        .map_err(|_| mismatch(path, "shading mode"))?;
                }
                _ => return Err(mismatch(path, "matching value")),
            }
        }
        _ => return Err(mismatch(path, "matching value")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::Variant;
    use crate::light::LightKind;

    fn scene() -> SceneState {
        SceneState::from_config(&Variant::MultiLight.config()).unwrap()
    }

    #[test]
    fn paths_round_trip_through_strings() {
        for text in [
            "camera.fovy",
            "camera.eye.z",
            "lights[2].position.w",
            "lights[0].diffuse",
            "lights[1].turnedOn",
            "material.Ks",
            "options.shading",
        ] {
            let path: FieldPath = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
        assert_eq!(
            "camera.at.1".parse::<FieldPath>().unwrap(),
            FieldPath::CameraVector(CameraVector::At, 1)
        );
        assert!("camera.eye.w".parse::<FieldPath>().is_err());
        assert!("lights[x].cutoff".parse::<FieldPath>().is_err());
    }

    #[test]
    fn near_and_far_callbacks_keep_the_margin() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        let near = FieldPath::Camera(CameraField::Near);
        let far = FieldPath::Camera(CameraField::Far);

        panel.set(&mut scene, far, FieldValue::Number(5.0)).unwrap();
        panel.set(&mut scene, near, FieldValue::Number(19.0)).unwrap();
        assert_eq!(scene.camera.near, 4.5);
        panel.set(&mut scene, far, FieldValue::Number(0.1)).unwrap();
        assert_eq!(scene.camera.far, 5.0);
        assert!(scene.camera.near < scene.camera.far);
    }

    #[test]
    fn light_type_tag_snaps_to_directional_or_positional() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        panel
            .set_from_str(&mut scene, "lights[2].position.w=0.5")
            .unwrap();
        assert_eq!(scene.lights[2].position.w, 1.0);
        assert_eq!(scene.lights[2].kind(), LightKind::Point);
        let view = scene.camera.view_matrix();
        assert_eq!(scene.lights[2].to_view_space(&view).position.w, 1.0);

        panel
            .set_from_str(&mut scene, "lights[2].position.w=0.3")
            .unwrap();
        assert_eq!(scene.lights[2].position.w, 0.0);
        assert_eq!(scene.lights[2].kind(), LightKind::Directional);
        assert_eq!(
            panel.get(&scene, FieldPath::LightPosition(2, 3)),
            Ok(FieldValue::Number(0.0))
        );
    }

    #[test]
    fn numbers_saturate_to_the_control_range() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        panel
            .set_from_str(&mut scene, "lights[0].aperture=150")
            .unwrap();
        assert_eq!(scene.lights[0].aperture, 90.0);
        panel
            .set_from_str(&mut scene, "material.shininess=0")
            .unwrap();
        assert_eq!(scene.material.get().shininess, 1.0);
        panel.set_from_str(&mut scene, "camera.fovy=200").unwrap();
        assert_eq!(scene.camera.fovy, 179.0);
    }

    #[test]
    fn read_only_controls_reject_edits() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        let up = FieldPath::CameraVector(CameraVector::Up, 1);
        assert!(panel.control(up).unwrap().read_only);
        assert_eq!(
            panel.set(&mut scene, up, FieldValue::Number(0.0)),
            Err(PanelError::ReadOnly("camera.up.y".into()))
        );
        assert!(panel.set_from_str(&mut scene, "camera.aspect=3").is_err());
    }

    #[test]
    fn colours_are_edited_as_bytes_and_stored_as_units() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        panel
            .set_from_str(&mut scene, "material.Kd=255,0,51")
            .unwrap();
        let kd = scene.material.get().kd;
        assert!((kd - Vec3::new(1.0, 0.0, 0.2)).length() < 1e-6);
        // Objects linked to the shared material see the edit.
        assert_eq!(scene.object("bunny").unwrap().material.get().kd, kd);
        assert_eq!(
            panel
                .get(&scene, FieldPath::MaterialColor(Reflectance::Diffuse))
                .unwrap(),
            FieldValue::Color([255, 0, 51])
        );
    }

    #[test]
    fn controls_follow_replaced_vectors() {
        let mut scene = scene();
        let panel = ParameterPanel::for_scene(&scene);
        scene.camera.eye = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(
            panel
                .get(&scene, FieldPath::CameraVector(CameraVector::Eye, 2))
                .unwrap(),
            FieldValue::Number(3.0)
        );
    }

    #[test]
    fn subscribers_are_notified() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        panel.on_change(FieldPath::LightTurnedOn(1), move |_, value| {
            assert_eq!(value, &FieldValue::Toggle(true));
            seen.set(seen.get() + 1);
        });
        panel
            .set_from_str(&mut scene, "lights[1].turnedOn=true")
            .unwrap();
        assert!(scene.lights[1].turned_on);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn type_mismatches_and_unknown_slots_fail() {
        let mut scene = scene();
        let mut panel = ParameterPanel::for_scene(&scene);
        assert!(matches!(
            panel.set_from_str(&mut scene, "options.depthTest=maybe"),
            Err(PanelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            panel.set_from_str(&mut scene, "options.shading=flat"),
            Err(PanelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            panel.set_from_str(&mut scene, "lights[7].cutoff=0.5"),
            Err(PanelError::UnknownField(_))
        ));
        panel
            .set_from_str(&mut scene, "options.shading=gouraud")
            .unwrap();
        assert_eq!(scene.options.shading, ShadingMode::Gouraud);
    }

    #[test]
    fn describe_lists_every_control() {
        let scene = scene();
        let panel = ParameterPanel::for_scene(&scene);
        let lines = panel.describe(&scene);
        assert_eq!(lines.len(), panel.controls().len());
        assert!(lines.contains(&"camera.fovy = 45".to_string()));
        assert!(lines.contains(&"camera.up.y = 1 (read-only)".to_string()));
    }
}
