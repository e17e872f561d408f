//! Window-less GPU backend.
//!
//! Tracks handles and bindings like a real driver would, validates every
//! call, and counts uploads and draws. With [`HeadlessBackend::recording`]
//! it also keeps the full call sequence. Statistics live in a shared
//! [`GpuCallLog`] so they stay readable after the backend has been moved
//! into a [`RenderContext`](crate::resources::rendercontext::RenderContext).

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use rustc_hash::FxHashMap;

use super::{
    Binding, BufferId, DisplayRect, GpuBackend, GpuResource, Primitive, ProgramId, ShaderStage,
    SurfaceId, TextureDesc, TextureId,
};
use crate::resources::rendercontext::RenderError;
use crate::resources::videosource::VideoFrame;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum GpuCall {
    CreateSurface { id: SurfaceId, width: u32, height: u32 },
    CreateProgram { id: ProgramId },
    SetUniformVec4 { program: ProgramId, name: String, value: [f32; 4] },
    SetUniformSampler { program: ProgramId, name: String, unit: u32 },
    CreateVertexBuffer { id: BufferId, attribute: String, vertices: Vec<[f32; 2]> },
    CreateTexture { id: TextureId, desc: TextureDesc },
    UploadTexture { texture: TextureId, width: u32, height: u32, flip_y: bool },
    Bind(Binding),
    RestoreDefaults,
    DrawArrays { mode: Primitive, first: u32, count: u32 },
    Present { surface: SurfaceId, dest: DisplayRect },
    Release(GpuResource),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Surface,
    Program,
    Buffer,
    Texture,
}

#[derive(Default)]
struct LogState {
    record: bool,
    calls: Vec<GpuCall>,
    uploads: u64,
    draws: u64,
    presents: u64,
    created: u64,
    live: FxHashMap<u32, Kind>,
}

/// Shared, cloneable view of what a [`HeadlessBackend`] did.
#[derive(Clone, Default)]
pub struct GpuCallLog(Rc<RefCell<LogState>>);

impl GpuCallLog {
    /// Every recorded call, oldest first. Empty unless recording.
    pub fn calls(&self) -> Vec<GpuCall> {
        self.0.borrow().calls.clone()
    }

    /// Number of texture uploads that reached the backend.
    pub fn uploads(&self) -> u64 {
        self.0.borrow().uploads
    }

    /// Number of draw calls that reached the backend.
    pub fn draws(&self) -> u64 {
        self.0.borrow().draws
    }

    pub fn presents(&self) -> u64 {
        self.0.borrow().presents
    }

    /// Objects ever created, released or not.
    pub fn created(&self) -> u64 {
        self.0.borrow().created
    }

    /// Objects created and not yet released.
    pub fn live(&self) -> usize {
        self.0.borrow().live.len()
    }

    fn push(&self, call: GpuCall) {
        let mut state = self.0.borrow_mut();
        if state.record {
            state.calls.push(call);
        }
    }
}

#[derive(Default)]
struct Bound {
    surface: Option<SurfaceId>,
    program: Option<ProgramId>,
    buffer: Option<BufferId>,
    textures: FxHashMap<u32, TextureId>,
}

pub struct HeadlessBackend {
    log: GpuCallLog,
    next_id: u32,
    bound: Bound,
    textures: FxHashMap<u32, TextureDesc>,
    shader_failure: Option<(ShaderStage, String)>,
    link_failure: Option<String>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Counting backend; individual calls are not kept.
    pub fn new() -> Self {
        Self {
            log: GpuCallLog::default(),
            next_id: 1,
            bound: Bound::default(),
            textures: FxHashMap::default(),
            shader_failure: None,
            link_failure: None,
        }
    }

    /// Backend that keeps every call in its log.
    pub fn recording() -> Self {
        let backend = Self::new();
        backend.log.0.borrow_mut().record = true;
        backend
    }

    /// Make the given stage fail to compile with `log`.
    pub fn with_shader_failure(mut self, stage: ShaderStage, log: impl Into<String>) -> Self {
        self.shader_failure = Some((stage, log.into()));
        self
    }

    /// Make program linking fail with `log`.
    pub fn with_link_failure(mut self, log: impl Into<String>) -> Self {
        self.link_failure = Some(log.into());
        self
    }

    /// Handle to the shared statistics.
    pub fn log(&self) -> GpuCallLog {
        self.log.clone()
    }

    fn alloc(&mut self, kind: Kind) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let mut state = self.log.0.borrow_mut();
        state.created += 1;
        state.live.insert(id, kind);
        id
    }

    fn check(&self, id: u32, kind: Kind, what: &'static str) -> Result<(), RenderError> {
        match self.log.0.borrow().live.get(&id) {
            Some(k) if *k == kind => Ok(()),
            _ => Err(RenderError::InvalidHandle(what)),
        }
    }

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<(), RenderError> {
        if let Some((failing, log)) = &self.shader_failure {
            if *failing == stage {
                return Err(RenderError::ShaderCompile {
                    stage,
                    log: log.clone(),
                });
            }
        }
        if !source.contains("void main") {
            return Err(RenderError::ShaderCompile {
                stage,
                log: "no entry point 'main'".to_string(),
            });
        }
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_surface(&mut self, width: u32, height: u32) -> Result<SurfaceId, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::SurfaceCreation(format!(
                "invalid size {}x{}",
                width, height
            )));
        }
        let id = SurfaceId(self.alloc(Kind::Surface));
        self.log.push(GpuCall::CreateSurface { id, width, height });
        Ok(id)
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        self.compile(ShaderStage::Vertex, vertex)?;
        self.compile(ShaderStage::Fragment, fragment)?;
        if let Some(log) = &self.link_failure {
            return Err(RenderError::ProgramLink { log: log.clone() });
        }
        let id = ProgramId(self.alloc(Kind::Program));
        self.log.push(GpuCall::CreateProgram { id });
        Ok(id)
    }

    fn set_uniform_vec4(
        &mut self,
        program: ProgramId,
        name: &str,
        value: [f32; 4],
    ) -> Result<(), RenderError> {
        self.check(program.0, Kind::Program, "program")?;
        self.log.push(GpuCall::SetUniformVec4 {
            program,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_uniform_sampler(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<(), RenderError> {
        self.check(program.0, Kind::Program, "program")?;
        self.log.push(GpuCall::SetUniformSampler {
            program,
            name: name.to_string(),
            unit,
        });
        Ok(())
    }

    fn create_vertex_buffer(
        &mut self,
        program: ProgramId,
        attribute: &str,
        vertices: &[[f32; 2]],
    ) -> Result<BufferId, RenderError> {
        self.check(program.0, Kind::Program, "program")?;
        let id = BufferId(self.alloc(Kind::Buffer));
        self.log.push(GpuCall::CreateVertexBuffer {
            id,
            attribute: attribute.to_string(),
            vertices: vertices.to_vec(),
        });
        Ok(id)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, RenderError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::TextureCreation(format!(
                "invalid size {}x{}",
                desc.width, desc.height
            )));
        }
        let id = TextureId(self.alloc(Kind::Texture));
        self.textures.insert(id.0, *desc);
        self.log.push(GpuCall::CreateTexture { id, desc: *desc });
        Ok(id)
    }

    fn upload_texture(
        &mut self,
        texture: TextureId,
        frame: &VideoFrame,
        flip_y: bool,
    ) -> Result<(), RenderError> {
        self.check(texture.0, Kind::Texture, "texture")?;
        let desc = self
            .textures
            .get(&texture.0)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let expected = desc.width as usize * desc.height as usize * VideoFrame::BYTES_PER_PIXEL;
        if frame.width != desc.width || frame.height != desc.height || frame.pixels.len() != expected
        {
            return Err(RenderError::FrameSize {
                expected,
                actual: frame.pixels.len(),
            });
        }
        self.log.0.borrow_mut().uploads += 1;
        self.log.push(GpuCall::UploadTexture {
            texture,
            width: frame.width,
            height: frame.height,
            flip_y,
        });
        trace!("headless upload {}x{}", frame.width, frame.height);
        Ok(())
    }

    fn bind(&mut self, binding: Binding) -> Result<(), RenderError> {
        match binding {
            Binding::Surface(id) => {
                self.check(id.0, Kind::Surface, "surface")?;
                self.bound.surface = Some(id);
            }
            Binding::Program(id) => {
                self.check(id.0, Kind::Program, "program")?;
                self.bound.program = Some(id);
            }
            Binding::VertexBuffer(id) => {
                self.check(id.0, Kind::Buffer, "buffer")?;
                self.bound.buffer = Some(id);
            }
            Binding::Texture { unit, texture } => {
                self.check(texture.0, Kind::Texture, "texture")?;
                self.bound.textures.insert(unit, texture);
            }
        }
        self.log.push(GpuCall::Bind(binding));
        Ok(())
    }

    fn restore_defaults(&mut self) {
        self.bound = Bound::default();
        self.log.push(GpuCall::RestoreDefaults);
    }

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) -> Result<(), RenderError> {
        if self.bound.surface.is_none() {
            return Err(RenderError::InvalidHandle("surface"));
        }
        if self.bound.program.is_none() {
            return Err(RenderError::InvalidHandle("program"));
        }
        if self.bound.buffer.is_none() {
            return Err(RenderError::InvalidHandle("buffer"));
        }
        if !self.bound.textures.contains_key(&0) {
            return Err(RenderError::InvalidHandle("texture"));
        }
        self.log.0.borrow_mut().draws += 1;
        self.log.push(GpuCall::DrawArrays { mode, first, count });
        Ok(())
    }

    fn present(&mut self, surface: SurfaceId, dest: DisplayRect) -> Result<(), RenderError> {
        self.check(surface.0, Kind::Surface, "surface")?;
        self.log.0.borrow_mut().presents += 1;
        self.log.push(GpuCall::Present { surface, dest });
        Ok(())
    }

    fn release(&mut self, resource: GpuResource) {
        let id = match resource {
            GpuResource::Surface(id) => id.0,
            GpuResource::Program(id) => id.0,
            GpuResource::Buffer(id) => id.0,
            GpuResource::Texture(id) => id.0,
        };
        if self.log.0.borrow_mut().live.remove(&id).is_some() {
            self.textures.remove(&id);
            self.log.push(GpuCall::Release(resource));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_without_bindings_is_rejected() {
        let mut gpu = HeadlessBackend::new();
        assert_eq!(
            gpu.draw_arrays(Primitive::TriangleStrip, 0, 4),
            Err(RenderError::InvalidHandle("surface"))
        );
        assert_eq!(gpu.log().draws(), 0);
    }

    #[test]
    fn draw_without_texture_is_rejected() {
        let mut gpu = HeadlessBackend::new();
        let surface = gpu.create_surface(8, 8).unwrap();
        let program = gpu.create_program("void main() {}", "void main() {}").unwrap();
        let buffer = gpu
            .create_vertex_buffer(program, "vertexPosition", &[[0.0, 0.0]; 4])
            .unwrap();
        gpu.bind(Binding::Surface(surface)).unwrap();
        gpu.bind(Binding::Program(program)).unwrap();
        gpu.bind(Binding::VertexBuffer(buffer)).unwrap();

        assert_eq!(
            gpu.draw_arrays(Primitive::TriangleStrip, 0, 4),
            Err(RenderError::InvalidHandle("texture"))
        );
        assert_eq!(gpu.log().draws(), 0);
    }

    #[test]
    fn released_handles_become_invalid() {
        let mut gpu = HeadlessBackend::new();
        let tex = gpu.create_texture(&TextureDesc::new(2, 2)).unwrap();
        assert_eq!(gpu.log().live(), 1);
        gpu.release(GpuResource::Texture(tex));
        assert_eq!(gpu.log().live(), 0);
        let frame = VideoFrame::solid(2, 2, [0, 0, 0]);
        assert_eq!(
            gpu.upload_texture(tex, &frame, false),
            Err(RenderError::InvalidHandle("texture"))
        );
    }

    #[test]
    fn handle_of_wrong_kind_is_rejected() {
        let mut gpu = HeadlessBackend::new();
        let surface = gpu.create_surface(4, 4).unwrap();
        assert_eq!(
            gpu.bind(Binding::Program(ProgramId(surface.0))),
            Err(RenderError::InvalidHandle("program"))
        );
    }

    #[test]
    fn shader_failure_reports_stage() {
        let mut gpu =
            HeadlessBackend::new().with_shader_failure(ShaderStage::Fragment, "syntax error");
        let err = gpu.create_program("void main() {}", "void main() {}").unwrap_err();
        assert_eq!(
            err,
            RenderError::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: "syntax error".to_string()
            }
        );
        assert_eq!(gpu.log().created(), 0);
    }

    #[test]
    fn recording_keeps_calls() {
        let mut gpu = HeadlessBackend::recording();
        let surface = gpu.create_surface(8, 8).unwrap();
        gpu.bind(Binding::Surface(surface)).unwrap();
        gpu.restore_defaults();
        assert_eq!(
            gpu.log().calls(),
            vec![
                GpuCall::CreateSurface {
                    id: surface,
                    width: 8,
                    height: 8
                },
                GpuCall::Bind(Binding::Surface(surface)),
                GpuCall::RestoreDefaults,
            ]
        );
    }
}
