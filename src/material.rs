use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

/// Phong reflectance coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ka: Vec3,
    pub kd: Vec3,
    pub ks: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ka: Vec3::splat(0.1),
            kd: Vec3::splat(0.8),
            ks: Vec3::ONE,
            shininess: 8.0,
        }
    }
}

impl Material {
    pub const fn new(ka: Vec3, kd: Vec3, ks: Vec3, shininess: f32) -> Self {
        Self { ka, kd, ks, shininess }
    }

    pub fn coefficient(&self, kind: Reflectance) -> Vec3 {
        match kind {
            Reflectance::Ambient => self.ka,
            Reflectance::Diffuse => self.kd,
            Reflectance::Specular => self.ks,
        }
    }

    /// Stores a coefficient, clamping each channel to `[0, 1]`.
    pub fn set_coefficient(&mut self, kind: Reflectance, value: Vec3) {
        let value = value.clamp(Vec3::ZERO, Vec3::ONE);
        match kind {
            Reflectance::Ambient => self.ka = value,
            Reflectance::Diffuse => self.kd = value,
            Reflectance::Specular => self.ks = value,
        }
    }
}

/// Ambient, diffuse or specular term; shared by materials and light intensities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reflectance {
    Ambient,
    Diffuse,
    Specular,
}

impl Reflectance {
    pub const ALL: [Reflectance; 3] = [Self::Ambient, Self::Diffuse, Self::Specular];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Diffuse => "diffuse",
            Self::Specular => "specular",
        }
    }
}

/// Reference-counted material. Cloning the handle aliases the material, so
/// every object holding a clone sees edits made through any of them.
#[derive(Clone, Default)]
pub struct MaterialHandle(Arc<RwLock<Material>>);

impl MaterialHandle {
    pub fn new(material: Material) -> Self {
        Self(Arc::new(RwLock::new(material)))
    }

    /// Copy of the current coefficients.
    pub fn get(&self) -> Material {
        *self.0.read()
    }

    pub fn update<R>(&self, updater: impl FnOnce(&mut Material) -> R) -> R {
        updater(&mut self.0.write())
    }

    /// True when both handles refer to the same material.
    pub fn is_shared_with(&self, other: &MaterialHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MaterialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MaterialHandle").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_handles_alias() {
        let shared = MaterialHandle::default();
        let linked = shared.clone();
        shared.update(|m| m.shininess = 64.0);
        assert_eq!(linked.get().shininess, 64.0);
        assert!(linked.is_shared_with(&shared));
    }

    #[test]
    fn independent_handles_do_not_alias() {
        let a = MaterialHandle::new(Material::default());
        let b = MaterialHandle::new(Material::default());
        a.update(|m| m.set_coefficient(Reflectance::Diffuse, Vec3::X));
        assert_eq!(b.get().kd, Vec3::splat(0.8));
        assert!(!a.is_shared_with(&b));
    }

    #[test]
    fn coefficients_are_clamped() {
        let mut material = Material::default();
        material.set_coefficient(Reflectance::Specular, Vec3::new(2.0, -1.0, 0.5));
        assert_eq!(material.ks, Vec3::new(1.0, 0.0, 0.5));
    }
}
