use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::mesh::PrimitiveMode;
use crate::render::device::{
    DrawState, GraphicsDevice, ProgramId, ProgramSource, UniformLocation, UniformValue,
};
use crate::render::shaders::{uniform_slots, UniformSlot};
use crate::scene::Shape;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    UseProgram(ProgramId),
    DrawState(DrawState),
    Clear,
    Uniform { name: String, value: UniformValue },
    Draw { shape: Shape, mode: PrimitiveMode },
}

/// Uniform values current when a draw was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: ProgramId,
    pub shape: Shape,
    pub mode: PrimitiveMode,
    pub uniforms: Vec<(String, UniformValue)>,
}

impl RecordedDraw {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }
}

#[derive(Debug)]
pub struct RecordingDevice {
    slots: Vec<UniformSlot>,
    hidden: HashSet<String>,
    programs: Vec<&'static str>,
    current: Option<ProgramId>,
    state: Vec<(String, UniformValue)>,
    calls: Vec<DeviceCall>,
    draws: Vec<RecordedDraw>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            slots: uniform_slots(),
            hidden: HashSet::new(),
            programs: Vec::new(),
            current: None,
            state: Vec::new(),
            calls: Vec::new(),
            draws: Vec::new(),
        }
    }

    /// Makes `name` unresolvable, as if the program had optimised it out.
    pub fn without_uniform(mut self, name: &str) -> Self {
        self.hidden.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&'static str> {
        self.programs.get(program.0 as usize).copied()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    /// Latest value written to `name` since the last reset.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.state
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    /// Forgets everything recorded so far; compiled programs are kept.
    pub fn reset(&mut self) {
        self.calls.clear();
        self.draws.clear();
        self.state.clear();
        self.current = None;
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        if source.vertex.is_empty() || source.fragment.is_empty() {
            bail!("program `{}` is missing a stage", source.label);
        }
        self.programs.push(source.label);
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current = Some(program);
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if program.0 as usize >= self.programs.len() || self.hidden.contains(name) {
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
            return;
        }
        let name = slot.name.clone();
        match self.state.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.state.push((name.clone(), value)),
        }
        self.calls.push(DeviceCall::Uniform { name, value });
    }

    fn apply_draw_state(&mut self, state: DrawState) {
        self.calls.push(DeviceCall::DrawState(state));
    }

    fn clear(&mut self) {
        self.calls.push(DeviceCall::Clear);
    }

    fn draw(&mut self, shape: Shape, mode: PrimitiveMode) {
        let Some(program) = self.current else {
            return;
        };
        self.calls.push(DeviceCall::Draw { shape, mode });
        self.draws.push(RecordedDraw {
            program,
            shape,
            mode,
            uniforms: self.state.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::render::shaders::PHONG;

    #[test]
    fn hidden_uniforms_do_not_resolve() {
        let mut device = RecordingDevice::new().without_uniform("u_use_normals");
        let program = device.compile_program(&PHONG).unwrap();
        assert!(device.uniform_location(program, "u_model_view").is_some());
        assert!(device.uniform_location(program, "u_use_normals").is_none());
        assert!(device.uniform_location(program, "u_L[3].position").is_none());
        assert!(device.uniform_location(ProgramId(9), "u_model_view").is_none());
    }

    #[test]
    fn mistyped_writes_are_dropped() {
        let mut device = RecordingDevice::new();
        let program = device.compile_program(&PHONG).unwrap();
        device.use_program(program);
        let location = device.uniform_location(program, "u_numLights").unwrap();
        device.set_uniform(location, UniformValue::Vec3(Vec3::ONE));
        assert_eq!(device.uniform("u_numLights"), None);
        device.set_uniform(location, UniformValue::Int(2));
        assert_eq!(device.uniform("u_numLights"), Some(UniformValue::Int(2)));
    }

    #[test]
    fn draws_snapshot_current_uniforms() {
        let mut device = RecordingDevice::new();
        let program = device.compile_program(&PHONG).unwrap();
        device.draw(Shape::Cube, PrimitiveMode::Triangles);
        assert!(device.draws().is_empty());

        device.use_program(program);
        let location = device.uniform_location(program, "u_material.shininess").unwrap();
        device.set_uniform(location, UniformValue::Float(4.0));
        device.draw(Shape::Cube, PrimitiveMode::Lines);
        let draw = &device.draws()[0];
        assert_eq!(draw.mode, PrimitiveMode::Lines);
        assert_eq!(draw.uniform("u_material.shininess"), Some(UniformValue::Float(4.0)));
        assert_eq!(device.program_label(program), Some("phong"));
    }
}
