use crate::light::MAX_LIGHTS;
use crate::render::device::{ProgramSource, UniformKind};

pub const FRAME_BLOCK_SIZE: usize = LIGHTS_OFFSET + LIGHT_STRIDE * MAX_LIGHTS;
pub const OBJECT_BLOCK_SIZE: usize = 176;

const LIGHTS_OFFSET: usize = 96;
const LIGHT_STRIDE: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    Frame,
    Object,
}

/// Where a named uniform lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub block: UniformBlock,
    pub offset: usize,
    pub kind: UniformKind,
}

impl UniformSlot {
    fn new(name: impl Into<String>, block: UniformBlock, offset: usize, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            block,
            offset,
            kind,
        }
    }
}

/// Every uniform the programs declare, in block order.
pub fn uniform_slots() -> Vec<UniformSlot> {
    use UniformBlock::{Frame, Object};
    use UniformKind::*;

    let mut slots = vec![
        UniformSlot::new("u_projection", Frame, 0, Mat4),
        UniformSlot::new("u_camera_eye", Frame, 64, Vec3),
        UniformSlot::new("u_numLights", Frame, 80, Int),
    ];
    for slot in 0..MAX_LIGHTS {
        let base = LIGHTS_OFFSET + slot * LIGHT_STRIDE;
        let name = |field: &str| format!("u_L[{slot}].{field}");
        slots.extend([
            UniformSlot::new(name("position"), Frame, base, Vec4),
            UniformSlot::new(name("axis"), Frame, base + 16, Vec3),
            UniformSlot::new(name("ambient"), Frame, base + 32, Vec3),
            UniformSlot::new(name("diffuse"), Frame, base + 48, Vec3),
            UniformSlot::new(name("specular"), Frame, base + 64, Vec3),
            UniformSlot::new(name("aperture"), Frame, base + 80, Float),
            UniformSlot::new(name("cutoff"), Frame, base + 84, Float),
        ]);
    }
    slots.extend([
        UniformSlot::new("u_model_view", Object, 0, Mat4),
        UniformSlot::new("u_normals", Object, 64, Mat3),
        UniformSlot::new("u_material.Ka", Object, 112, Vec3),
        UniformSlot::new("u_material.Kd", Object, 128, Vec3),
        UniformSlot::new("u_material.Ks", Object, 144, Vec3),
        UniformSlot::new("u_material.shininess", Object, 160, Float),
        UniformSlot::new("u_use_normals", Object, 164, Int),
    ]);
    slots
}

/// Lighting evaluated per fragment from interpolated view-space normals.
pub const PHONG: ProgramSource = ProgramSource {
    label: "phong",
    vertex: PHONG_VERTEX,
    fragment: PHONG_FRAGMENT,
};

/// Lighting evaluated per vertex; colours are interpolated.
pub const GOURAUD: ProgramSource = ProgramSource {
    label: "gouraud",
    vertex: GOURAUD_VERTEX,
    fragment: GOURAUD_FRAGMENT,
};

/// Declarations shared by every program. Prepended to each stage pair.
pub const COMMON: &str = r#"
struct Light {
    position: vec4<f32>,
    axis: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    aperture: f32,
    cutoff: f32,
}

struct FrameUniforms {
    projection: mat4x4<f32>,
    camera_eye: vec4<f32>,
    num_lights: i32,
    lights: array<Light, 3>,
}

struct ObjectUniforms {
    model_view: mat4x4<f32>,
    normals: mat3x3<f32>,
    ka: vec4<f32>,
    kd: vec4<f32>,
    ks: vec4<f32>,
    shininess: f32,
    use_normals: i32,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;

@group(1) @binding(0)
var<uniform> object: ObjectUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

fn normal_colour(normal: vec3<f32>) -> vec3<f32> {
    return normalize(normal) * 0.5 + vec3<f32>(0.5);
}

// Blinn-Phong sum over the light slots, in view space (eye at the origin).
fn shade(position: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    let n = normalize(normal);
    let v = normalize(-position);
    var colour = vec3<f32>(0.0);
    let count = min(frame.num_lights, 3);
    for (var i = 0; i < count; i = i + 1) {
        let light = frame.lights[i];
        var l = normalize(light.position.xyz);
        var spot = 1.0;
        if (light.position.w != 0.0) {
            l = normalize(light.position.xyz - position);
            if (light.aperture > 0.0) {
                let cos_angle = dot(-l, normalize(light.axis.xyz));
                if (cos_angle < cos(radians(light.aperture))) {
                    spot = 0.0;
                } else {
                    spot = pow(max(cos_angle, 0.0), light.cutoff);
                }
            }
        }
        let lambert = max(dot(n, l), 0.0);
        var specular = vec3<f32>(0.0);
        if (lambert > 0.0) {
            let h = normalize(l + v);
            specular = pow(max(dot(n, h), 0.0), object.shininess) * light.specular.xyz * object.ks.xyz;
        }
        let ambient = light.ambient.xyz * object.ka.xyz;
        let diffuse = lambert * light.diffuse.xyz * object.kd.xyz;
        colour = colour + ambient + spot * (diffuse + specular);
    }
    return colour;
}
"#;

const PHONG_VERTEX: &str = r#"
struct PhongVarying {
    @builtin(position) clip: vec4<f32>,
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> PhongVarying {
    var out: PhongVarying;
    let view_position = object.model_view * vec4<f32>(input.position, 1.0);
    out.clip = frame.projection * view_position;
    out.position = view_position.xyz;
    out.normal = object.normals * input.normal;
    return out;
}
"#;

const PHONG_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: PhongVarying) -> @location(0) vec4<f32> {
    if (object.use_normals != 0) {
        return vec4<f32>(normal_colour(input.normal), 1.0);
    }
    return vec4<f32>(shade(input.position, input.normal), 1.0);
}
"#;

const GOURAUD_VERTEX: &str = r#"
struct GouraudVarying {
    @builtin(position) clip: vec4<f32>,
    @location(0) colour: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> GouraudVarying {
    var out: GouraudVarying;
    let view_position = object.model_view * vec4<f32>(input.position, 1.0);
    let normal = object.normals * input.normal;
    out.clip = frame.projection * view_position;
    if (object.use_normals != 0) {
        out.colour = normal_colour(normal);
    } else {
        out.colour = shade(view_position.xyz, normal);
    }
    return out;
}
"#;

const GOURAUD_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: GouraudVarying) -> @location(0) vec4<f32> {
    return vec4<f32>(input.colour, 1.0);
}
"#;

/// Full WGSL module for a program.
pub fn module_source(program: &ProgramSource) -> String {
    format!("{COMMON}{}{}", program.vertex, program.fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_fit_their_blocks() {
        for slot in uniform_slots() {
            let size = match slot.kind {
                UniformKind::Int | UniformKind::Float => 4,
                UniformKind::Vec3 => 12,
                UniformKind::Vec4 => 16,
                UniformKind::Mat3 => 48,
                UniformKind::Mat4 => 64,
            };
            let block = match slot.block {
                UniformBlock::Frame => FRAME_BLOCK_SIZE,
                UniformBlock::Object => OBJECT_BLOCK_SIZE,
            };
            assert!(slot.offset + size <= block, "{} overflows", slot.name);
        }
    }

    #[test]
    fn every_light_slot_is_declared() {
        let slots = uniform_slots();
        for slot in 0..MAX_LIGHTS {
            for field in ["position", "axis", "ambient", "diffuse", "specular", "aperture", "cutoff"] {
                let name = format!("u_L[{slot}].{field}");
                assert!(slots.iter().any(|s| s.name == name), "missing {name}");
            }
        }
        assert_eq!(FRAME_BLOCK_SIZE, 384);
    }

    fn has_loop(block: &naga::Block) -> bool {
        block.iter().any(|statement| match statement {
            naga::Statement::Loop { .. } => true,
            naga::Statement::Block(inner) => has_loop(inner),
            _ => false,
        })
    }

    #[test]
    fn modules_parse_and_validate() {
        for program in [PHONG, GOURAUD] {
            let source = module_source(&program);
            let module = naga::front::wgsl::parse_str(&source)
                .unwrap_or_else(|err| panic!("{} failed to parse: {err:?}", program.label));
            naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::empty(),
            )
            .validate(&module)
            .unwrap_or_else(|err| panic!("{} failed to validate: {err:?}", program.label));

            let entry_points: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(entry_points, ["vs_main", "fs_main"], "{}", program.label);

            let (_, shade) = module
                .functions
                .iter()
                .find(|(_, f)| f.name.as_deref() == Some("shade"))
                .expect("shade function");
            assert!(has_loop(&shade.body), "shade must iterate the lights");

            let light_fields: Vec<_> = module
                .types
                .iter()
                .find_map(|(_, ty)| match &ty.inner {
                    naga::TypeInner::Struct { members, .. } if ty.name.as_deref() == Some("Light") => {
                        Some(members.iter().filter_map(|m| m.name.clone()).collect())
                    }
                    _ => None,
                })
                .expect("Light struct");
            assert_eq!(
                light_fields,
                ["position", "axis", "ambient", "diffuse", "specular", "aperture", "cutoff"]
            );
        }
    }

    #[test]
    fn shading_sums_blinn_phong_terms_inside_the_spot_cone() {
        let shade = COMMON
            .split("fn shade")
            .nth(1)
            .expect("shade function");
        assert!(shade.contains("min(frame.num_lights, 3)"));
        assert!(shade.contains("if (light.aperture > 0.0)"));
        assert!(shade.contains("cos(radians(light.aperture))"));
        assert!(shade.contains("pow(max(cos_angle, 0.0), light.cutoff)"));
        assert!(shade.contains("let h = normalize(l + v);"));
        assert!(shade.contains("let light = frame.lights[i];"));
    }
}
