use glam::{Mat4, Vec3, Vec4};

use crate::material::Reflectance;

/// Number of light slots the shading programs declare.
pub const MAX_LIGHTS: usize = 3;

/// Ambient, diffuse and specular intensities of a light, channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intensities {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Intensities {
    pub const fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
        }
    }

    pub fn get(&self, kind: Reflectance) -> Vec3 {
        match kind {
            Reflectance::Ambient => self.ambient,
            Reflectance::Diffuse => self.diffuse,
            Reflectance::Specular => self.specular,
        }
    }

    pub fn set(&mut self, kind: Reflectance, value: Vec3) {
        let value = value.clamp(Vec3::ZERO, Vec3::ONE);
        match kind {
            Reflectance::Ambient => self.ambient = value,
            Reflectance::Diffuse => self.diffuse = value,
            Reflectance::Specular => self.specular = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// A light slot. `position.w` tags the kind: `0` is a direction, `1` a
/// location. Positional lights with a non-zero `aperture` are spotlights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec4,
    pub intensities: Intensities,
    /// Spotlight aim, world space.
    pub axis: Vec3,
    /// Cone half-angle in degrees; `0` means omnidirectional.
    pub aperture: f32,
    /// Spot falloff exponent.
    pub cutoff: f32,
    pub turned_on: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 5.0, 0.0, 1.0),
            intensities: Intensities::new(Vec3::splat(0.2), Vec3::splat(0.8), Vec3::ONE),
            axis: Vec3::NEG_Y,
            aperture: 0.0,
            cutoff: 0.0,
            turned_on: true,
        }
    }
}

impl Light {
    pub fn kind(&self) -> LightKind {
        if self.position.w == 0.0 {
            LightKind::Directional
        } else if self.aperture > 0.0 {
            LightKind::Spot
        } else {
            LightKind::Point
        }
    }

    pub fn is_positional(&self) -> bool {
        self.position.w != 0.0
    }

    pub fn toggle(&mut self) -> bool {
        self.turned_on = !self.turned_on;
        self.turned_on
    }

    /// Values uploaded to the shading programs for this slot this frame.
    ///
    /// The position keeps its `w` tag through the view transform, so
    /// directions ignore the view translation. A disabled light keeps its
    /// geometry but contributes zero intensity.
    pub fn to_view_space(&self, view: &Mat4) -> LightUniform {
        let axis = self
            .is_positional()
            .then(|| view.transform_vector3(self.axis));
        let gate = |value: Vec3| if self.turned_on { value } else { Vec3::ZERO };
        LightUniform {
            position: *view * self.position,
            axis,
            ambient: gate(self.intensities.ambient),
            diffuse: gate(self.intensities.diffuse),
            specular: gate(self.intensities.specular),
            aperture: self.aperture,
            cutoff: self.cutoff,
        }
    }
}

/// View-space light parameters ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightUniform {
    pub position: Vec4,
    /// Only present for positional lights.
    pub axis: Option<Vec3>,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub aperture: f32,
    pub cutoff: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot() -> Light {
        Light {
            position: Vec4::new(1.0, 4.0, -2.0, 1.0),
            axis: Vec3::new(0.0, -1.0, -1.0),
            aperture: 30.0,
            cutoff: 0.5,
            ..Light::default()
        }
    }

    #[test]
    fn kind_follows_w_tag_and_aperture() {
        let mut light = spot();
        assert_eq!(light.kind(), LightKind::Spot);
        light.aperture = 0.0;
        assert_eq!(light.kind(), LightKind::Point);
        light.position.w = 0.0;
        assert_eq!(light.kind(), LightKind::Directional);
    }

    #[test]
    fn directional_lights_ignore_view_translation() {
        let light = Light {
            position: Vec4::new(-1.0, -0.5, 0.0, 0.0),
            ..Light::default()
        };
        let view = Mat4::from_translation(Vec3::new(3.0, -7.0, 12.0))
            * Mat4::from_rotation_y(0.7);
        let uniform = light.to_view_space(&view);
        assert_eq!(uniform.position.w, 0.0);
        let expected = view.transform_vector3(Vec3::new(-1.0, -0.5, 0.0));
        assert!((uniform.position.truncate() - expected).length() < 1e-5);
        assert!(uniform.axis.is_none());
    }

    #[test]
    fn positional_lights_get_full_transform() {
        let light = spot();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        let uniform = light.to_view_space(&view);
        assert_eq!(uniform.position, Vec4::new(1.0, 4.0, -12.0, 1.0));
        assert_eq!(uniform.axis, Some(Vec3::new(0.0, -1.0, -1.0)));
    }

    #[test]
    fn disabled_light_uploads_zero_intensity_only() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 10.0), Vec3::ZERO, Vec3::Y);
        let mut light = spot();
        let on = light.to_view_space(&view);
        light.toggle();
        let off = light.to_view_space(&view);

        assert_eq!(off.ambient, Vec3::ZERO);
        assert_eq!(off.diffuse, Vec3::ZERO);
        assert_eq!(off.specular, Vec3::ZERO);
        assert_eq!(off.position, on.position);
        assert_eq!(off.axis, on.axis);
        assert_eq!(off.aperture, on.aperture);
        assert_eq!(off.cutoff, on.cutoff);
        // The stored configuration is untouched.
        assert_eq!(light.intensities, spot().intensities);
    }

    #[test]
    fn intensities_are_clamped() {
        let mut intensities = Light::default().intensities;
        intensities.set(Reflectance::Ambient, Vec3::new(1.5, 0.5, -0.2));
        assert_eq!(intensities.ambient, Vec3::new(1.0, 0.5, 0.0));
    }
}
