//! Scene configuration: built-in variants and the XML scene description.
//!
//! A [`SceneConfig`] is the single input of [`SceneState::from_config`]. The
//! built-in [`Variant`]s cover the demo family; an XML document can then
//! replace the lights, objects, shared material or render options of a
//! variant:
//!
//! ```xml
//! <scene>
//!     <options><shading>gouraud</shading><culling>true</culling></options>
//!     <material><ka>0.1 0.1 0.1</ka><kd>0.8 0.8 0.8</kd><ks>1 1 1</ks><shininess>8</shininess></material>
//!     <light><position>0 5 0 1</position><diffuse>0.8 0.8 0.8</diffuse><on>true</on></light>
//!     <object>
//!         <name>Table</name>
//!         <shape>cube</shape>
//!         <scale>10 0.5 10</scale>
//!         <material shared="true"/>
//!     </object>
//! </scene>
//! ```
//!
//! [`SceneState::from_config`]: crate::scene::SceneState::from_config

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec3, Vec4};
use roxmltree::{Document, Node};

use crate::camera::Camera;
use crate::light::{Intensities, Light, MAX_LIGHTS};
use crate::material::Material;
use crate::scene::{Axis, RenderOptions, ShadingMode, Shape, Transformation};

/// Whether an object owns its material or aliases the shared one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialSpec {
    Own(Material),
    Shared,
}

/// Declarative description of one scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub name: String,
    pub shape: Shape,
    pub transformations: Vec<Transformation>,
    pub material: MaterialSpec,
}

impl ObjectSpec {
    fn new(
        name: &str,
        shape: Shape,
        transformations: Vec<Transformation>,
        material: MaterialSpec,
    ) -> Self {
        Self {
            name: name.to_string(),
            shape,
            transformations,
            material,
        }
    }
}

/// Parameters of one demo scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub camera: Camera,
    pub lights: Vec<Light>,
    pub material: Material,
    pub objects: Vec<ObjectSpec>,
    pub options: RenderOptions,
    /// Enables first-person WASD movement.
    pub strafe_enabled: bool,
}

impl SceneConfig {
    /// Checks the constraints the shading programs rely on.
    pub fn validate(&self) -> Result<()> {
        if self.lights.is_empty() || self.lights.len() > MAX_LIGHTS {
            bail!(
                "a scene needs between 1 and {MAX_LIGHTS} lights, got {}",
                self.lights.len()
            );
        }
        if !positive(self.material.shininess) {
            bail!("shared material shininess must be positive");
        }
        for object in &self.objects {
            if let MaterialSpec::Own(material) = object.material {
                if !positive(material.shininess) {
                    bail!("material of `{}` needs a positive shininess", object.name);
                }
            }
        }
        Ok(())
    }

    /// Applies an XML scene description on top of this configuration.
    /// Leaves the configuration untouched when the document is rejected.
    pub fn apply_xml(&mut self, xml: &str) -> Result<()> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            bail!("expected <scene> root element");
        }

        let mut next = self.clone();
        if let Some(options) = child(&root, "options") {
            next.options = parse_options(&options, next.options)?;
        }
        if let Some(material) = child(&root, "material") {
            next.material = parse_material(&material, next.material)?;
        }

        let lights = root
            .children()
            .filter(|n| n.has_tag_name("light"))
            .enumerate()
            .map(|(index, node)| {
                parse_light(&node).with_context(|| format!("light {}", index + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        if !lights.is_empty() {
            next.lights = lights;
        }

        let objects = root
            .children()
            .filter(|n| n.has_tag_name("object"))
            .map(|node| {
                parse_object(&node).with_context(|| format!("object `{}`", node_label(&node)))
            })
            .collect::<Result<Vec<_>>>()?;
        if !objects.is_empty() {
            next.objects = objects;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Built-in scene presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// One point light, per-vertex shading, three objects.
    Basic,
    /// Spot, point and directional slots with per-fragment shading.
    MultiLight,
    /// `MultiLight` with first-person movement keys.
    Explorer,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Self::Basic, Self::MultiLight, Self::Explorer];

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::MultiLight => "multi-light",
            Self::Explorer => "explorer",
        }
    }

    pub fn config(self) -> SceneConfig {
        match self {
            Self::Basic => basic_config(),
            Self::MultiLight => multi_light_config(),
            Self::Explorer => SceneConfig {
                strafe_enabled: true,
                ..multi_light_config()
            },
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| {
                anyhow!("unknown variant `{s}`; expected basic, multi-light or explorer")
            })
    }
}

fn table() -> ObjectSpec {
    ObjectSpec::new(
        "Table",
        Shape::Cube,
        vec![Transformation::Scale(Vec3::new(10.0, 0.5, 10.0))],
        MaterialSpec::Own(Material::new(
            Vec3::new(0.4, 0.25, 0.0),
            Vec3::splat(0.3),
            Vec3::splat(0.1),
            256.0,
        )),
    )
}

fn placed(name: &str, shape: Shape, at: Vec3, material: MaterialSpec) -> ObjectSpec {
    ObjectSpec::new(
        name,
        shape,
        vec![
            Transformation::Translate(at),
            Transformation::Scale(Vec3::splat(2.0)),
        ],
        material,
    )
}

fn red_plastic() -> MaterialSpec {
    MaterialSpec::Own(Material::new(
        Vec3::new(0.9, 0.1, 0.1),
        Vec3::new(0.9, 0.1, 0.1),
        Vec3::new(0.9, 0.1, 0.1),
        1.0,
    ))
}

fn basic_config() -> SceneConfig {
    SceneConfig {
        camera: Camera::default(),
        lights: vec![Light {
            position: Vec4::new(0.0, 5.0, 0.0, 1.0),
            intensities: Intensities::new(Vec3::splat(0.2), Vec3::splat(0.8), Vec3::ONE),
            axis: Vec3::NEG_Y,
            aperture: 0.0,
            cutoff: 0.0,
            turned_on: true,
        }],
        material: Material::default(),
        objects: vec![
            table(),
            placed("cube", Shape::Cube, Vec3::new(2.0, 1.25, 2.0), red_plastic()),
            placed(
                "sphere",
                Shape::Sphere,
                Vec3::new(-2.0, 1.25, -2.0),
                MaterialSpec::Shared,
            ),
        ],
        options: RenderOptions {
            shading: ShadingMode::Gouraud,
            ..RenderOptions::default()
        },
        strafe_enabled: false,
    }
}

fn multi_light_config() -> SceneConfig {
    SceneConfig {
        camera: Camera::default(),
        lights: vec![
            Light {
                position: Vec4::new(0.0, 5.0, 0.0, 0.0),
                intensities: Intensities::new(Vec3::splat(0.1), Vec3::splat(0.8), Vec3::ONE),
                axis: Vec3::new(0.0, -1.0, -1.0),
                aperture: 90.0,
                cutoff: 1.0,
                turned_on: true,
            },
            Light {
                position: Vec4::new(0.0, 5.0, 0.0, 1.0),
                intensities: Intensities::new(
                    Vec3::splat(0.5),
                    Vec3::splat(0.3),
                    Vec3::splat(0.4),
                ),
                axis: Vec3::ZERO,
                aperture: 0.0,
                cutoff: 0.0,
                turned_on: false,
            },
            Light {
                position: Vec4::new(-1.0, -0.5, 0.0, 0.0),
                intensities: Intensities::new(
                    Vec3::splat(0.2),
                    Vec3::splat(0.2),
                    Vec3::splat(0.3),
                ),
                axis: Vec3::ZERO,
                aperture: 0.0,
                cutoff: 0.0,
                turned_on: false,
            },
        ],
        material: Material::default(),
        objects: vec![
            table(),
            placed("cube", Shape::Cube, Vec3::new(2.0, 1.25, 2.0), red_plastic()),
            placed(
                "torus",
                Shape::Torus,
                Vec3::new(-2.0, 0.7, 2.0),
                MaterialSpec::Own(Material::new(
                    Vec3::new(0.2, 1.0, 0.5),
                    Vec3::new(0.7, 0.9, 0.5),
                    Vec3::new(0.3, 0.15, 0.05),
                    1.0,
                )),
            ),
            placed(
                "sphere",
                Shape::Sphere,
                Vec3::new(2.0, 1.25, -2.0),
                MaterialSpec::Own(Material::new(
                    Vec3::new(0.1, 0.4, 0.5),
                    Vec3::new(0.6, 0.3, 0.1),
                    Vec3::new(0.3, 0.15, 0.05),
                    1.0,
                )),
            ),
            placed(
                "bunny",
                Shape::Bunny,
                Vec3::new(-2.0, 1.25, -2.0),
                MaterialSpec::Shared,
            ),
        ],
        options: RenderOptions::default(),
        strafe_enabled: false,
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_numbers(value: &str, count: usize, what: &str) -> Result<Vec<f32>> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("failed to parse {what} component `{component}`: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if numbers.len() != count {
        bail!("{what} needs {count} components, got {}", numbers.len());
    }
    Ok(numbers)
}

fn parse_vec3(value: &str) -> Result<Vec3> {
    parse_numbers(value, 3, "vector").map(|n| Vec3::new(n[0], n[1], n[2]))
}

fn parse_vec4(value: &str) -> Result<Vec4> {
    parse_numbers(value, 4, "position").map(|n| Vec4::new(n[0], n[1], n[2], n[3]))
}

fn parse_f32(value: &str) -> Result<f32> {
    value
        .parse::<f32>()
        .map_err(|err| anyhow!("failed to parse float `{value}`: {err}"))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        other => Err(anyhow!("expected a boolean, got `{other}`")),
    }
}

fn vec3_or(node: &Node<'_, '_>, tag: &str, default: Vec3) -> Result<Vec3> {
    optional_text(node, tag)
        .map(|text| parse_vec3(&text).with_context(|| format!("<{tag}>")))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn f32_or(node: &Node<'_, '_>, tag: &str, default: f32) -> Result<f32> {
    optional_text(node, tag)
        .map(|text| parse_f32(&text).with_context(|| format!("<{tag}>")))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn bool_or(node: &Node<'_, '_>, tag: &str, default: bool) -> Result<bool> {
    optional_text(node, tag)
        .map(|text| parse_bool(&text).with_context(|| format!("<{tag}>")))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn parse_options(node: &Node<'_, '_>, base: RenderOptions) -> Result<RenderOptions> {
    let shading = match optional_text(node, "shading") {
        Some(text) => text.parse()?,
        None => base.shading,
    };
    Ok(RenderOptions {
        backface_culling: bool_or(node, "culling", base.backface_culling)?,
        depth_test: bool_or(node, "depth-test", base.depth_test)?,
        shading,
        wireframe: bool_or(node, "wireframe", base.wireframe)?,
        show_normals: bool_or(node, "normals", base.show_normals)?,
    })
}

fn parse_material(node: &Node<'_, '_>, base: Material) -> Result<Material> {
    let clamp = |v: Vec3| v.clamp(Vec3::ZERO, Vec3::ONE);
    Ok(Material {
        ka: clamp(vec3_or(node, "ka", base.ka)?),
        kd: clamp(vec3_or(node, "kd", base.kd)?),
        ks: clamp(vec3_or(node, "ks", base.ks)?),
        shininess: f32_or(node, "shininess", base.shininess)?,
    })
}

fn parse_light(node: &Node<'_, '_>) -> Result<Light> {
    let base = Light::default();
    let position = match optional_text(node, "position") {
        Some(text) => parse_vec4(&text)?,
        None => base.position,
    };
    if position.w != 0.0 && position.w != 1.0 {
        bail!("light position w must be 0 (directional) or 1 (positional)");
    }
    let mut intensities = base.intensities;
    for kind in crate::material::Reflectance::ALL {
        let value = vec3_or(node, kind.name(), intensities.get(kind))?;
        intensities.set(kind, value);
    }
    Ok(Light {
        position,
        intensities,
        axis: vec3_or(node, "axis", base.axis)?,
        aperture: f32_or(node, "aperture", base.aperture)?.clamp(0.0, 90.0),
        cutoff: f32_or(node, "cutoff", base.cutoff)?,
        turned_on: bool_or(node, "on", base.turned_on)?,
    })
}

fn parse_object(node: &Node<'_, '_>) -> Result<ObjectSpec> {
    let name = optional_text(node, "name").ok_or_else(|| anyhow!("<name> tag is missing"))?;
    let shape: Shape = optional_text(node, "shape")
        .ok_or_else(|| anyhow!("<shape> tag is missing on `{name}`"))?
        .parse()?;

    let mut transformations = Vec::new();
    for step in node.children().filter(|n| n.is_element()) {
        let text = step.text().map(str::trim).unwrap_or_default();
        let transformation = match step.tag_name().name() {
            "translate" => Transformation::Translate(parse_vec3(text)?),
            "scale" => Transformation::Scale(parse_vec3(text)?),
            "rotate" => {
                let axis: Axis = step
                    .attribute("axis")
                    .ok_or_else(|| anyhow!("<rotate> needs an axis attribute"))?
                    .parse()?;
                Transformation::Rotate(axis, parse_f32(text)?)
            }
            _ => continue,
        };
        transformations.push(transformation);
    }

    let material = match child(node, "material") {
        Some(material) if material.attribute("shared") == Some("true") => MaterialSpec::Shared,
        Some(material) => MaterialSpec::Own(parse_material(&material, Material::default())?),
        None => MaterialSpec::Own(Material::default()),
    };

    Ok(ObjectSpec {
        name,
        shape,
        transformations,
        material,
    })
}

fn node_label(node: &Node<'_, '_>) -> String {
    optional_text(node, "name").unwrap_or_else(|| "<unnamed>".to_string())
}
