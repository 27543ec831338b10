use log::warn;

use crate::light::{LightUniform, MAX_LIGHTS};
use crate::material::Material;
use crate::render::device::{GraphicsDevice, ProgramId, UniformLocation, UniformValue};

/// Locations of one light slot's fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightLocations {
    pub position: Option<UniformLocation>,
    pub axis: Option<UniformLocation>,
    pub ambient: Option<UniformLocation>,
    pub diffuse: Option<UniformLocation>,
    pub specular: Option<UniformLocation>,
    pub aperture: Option<UniformLocation>,
    pub cutoff: Option<UniformLocation>,
}

/// Uniform locations of a program, looked up once after compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramUniforms {
    pub projection: Option<UniformLocation>,
    pub camera_eye: Option<UniformLocation>,
    pub num_lights: Option<UniformLocation>,
    pub lights: [LightLocations; MAX_LIGHTS],
    pub model_view: Option<UniformLocation>,
    pub normals: Option<UniformLocation>,
    pub ka: Option<UniformLocation>,
    pub kd: Option<UniformLocation>,
    pub ks: Option<UniformLocation>,
    pub shininess: Option<UniformLocation>,
    pub use_normals: Option<UniformLocation>,
}

impl ProgramUniforms {
    pub fn resolve<D: GraphicsDevice + ?Sized>(device: &D, program: ProgramId) -> Self {
        let find = |name: &str| {
            let location = device.uniform_location(program, name);
            if location.is_none() {
                warn!("program {program:?} has no uniform `{name}`; writes will be skipped");
            }
            location
        };
        let lights = std::array::from_fn(|slot| {
            let field = |name: &str| find(&format!("u_L[{slot}].{name}"));
            LightLocations {
                position: field("position"),
                axis: field("axis"),
                ambient: field("ambient"),
                diffuse: field("diffuse"),
                specular: field("specular"),
                aperture: field("aperture"),
                cutoff: field("cutoff"),
            }
        });
        Self {
            projection: find("u_projection"),
            camera_eye: find("u_camera_eye"),
            num_lights: find("u_numLights"),
            lights,
            model_view: find("u_model_view"),
            normals: find("u_normals"),
            ka: find("u_material.Ka"),
            kd: find("u_material.Kd"),
            ks: find("u_material.Ks"),
            shininess: find("u_material.shininess"),
            use_normals: find("u_use_normals"),
        }
    }

    /// Uploads one light slot. Slots past the declared array are ignored.
    pub fn upload_light<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        slot: usize,
        light: &LightUniform,
    ) {
        let Some(locations) = self.lights.get(slot) else {
            return;
        };
        set(device, locations.position, UniformValue::Vec4(light.position));
        if let Some(axis) = light.axis {
            set(device, locations.axis, UniformValue::Vec3(axis));
        }
        set(device, locations.ambient, UniformValue::Vec3(light.ambient));
        set(device, locations.diffuse, UniformValue::Vec3(light.diffuse));
        set(device, locations.specular, UniformValue::Vec3(light.specular));
        set(device, locations.aperture, UniformValue::Float(light.aperture));
        set(device, locations.cutoff, UniformValue::Float(light.cutoff));
    }

    pub fn upload_material<D: GraphicsDevice + ?Sized>(&self, device: &mut D, material: &Material) {
        set(device, self.ka, UniformValue::Vec3(material.ka));
        set(device, self.kd, UniformValue::Vec3(material.kd));
        set(device, self.ks, UniformValue::Vec3(material.ks));
        set(device, self.shininess, UniformValue::Float(material.shininess));
    }
}

/// Writes through a location when the program has one.
pub fn set<D: GraphicsDevice + ?Sized>(
    device: &mut D,
    location: Option<UniformLocation>,
    value: UniformValue,
) {
    if let Some(location) = location {
        device.set_uniform(location, value);
    }
}
