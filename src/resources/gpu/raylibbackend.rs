//! Raylib GPU backend.
//!
//! Maps the handle-based [`GpuBackend`] API onto raylib objects through the
//! FFI: surfaces are `RenderTexture2D`s, programs are `Shader`s, textures
//! are RGB8 `Texture2D`s. Raylib draws its own quad, so a vertex buffer is
//! kept as the pixel rectangle its clip-space corners cover on the bound
//! surface.
//!
//! # Note
//! Raylib needs a live window and must be called from the thread that
//! created it; [`RaylibBackend::new`] takes the `RaylibThread` token as proof.

use std::ffi::{CString, c_void};
use std::ptr;

use log::warn;
use raylib::RaylibThread;
use raylib::ffi;
use rustc_hash::FxHashMap;

use super::{
    Binding, BufferId, DisplayRect, GpuBackend, GpuResource, Primitive, ProgramId, SurfaceId,
    TextureDesc, TextureFilter, TextureId, TextureWrap,
};
use crate::resources::rendercontext::RenderError;
use crate::resources::videosource::VideoFrame;

const WHITE: ffi::Color = ffi::Color {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};
const BLACK: ffi::Color = ffi::Color {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

/// Clip-space bounds of a vertex buffer.
#[derive(Clone, Copy, Debug)]
struct ClipRect {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl ClipRect {
    fn from_vertices(vertices: &[[f32; 2]]) -> Self {
        let mut rect = ClipRect {
            min_x: f32::MAX,
            min_y: f32::MAX,
            max_x: f32::MIN,
            max_y: f32::MIN,
        };
        for [x, y] in vertices {
            rect.min_x = rect.min_x.min(*x);
            rect.min_y = rect.min_y.min(*y);
            rect.max_x = rect.max_x.max(*x);
            rect.max_y = rect.max_y.max(*y);
        }
        rect
    }

    /// Pixel rectangle on a `width` x `height` surface, y pointing down.
    fn to_pixels(self, width: i32, height: i32) -> ffi::Rectangle {
        let (w, h) = (width as f32, height as f32);
        ffi::Rectangle {
            x: (self.min_x + 1.0) * 0.5 * w,
            y: (1.0 - self.max_y) * 0.5 * h,
            width: (self.max_x - self.min_x) * 0.5 * w,
            height: (self.max_y - self.min_y) * 0.5 * h,
        }
    }
}

#[derive(Default)]
struct Bound {
    surface: Option<SurfaceId>,
    program: Option<ProgramId>,
    buffer: Option<BufferId>,
    texture: Option<TextureId>,
}

pub struct RaylibBackend {
    next_id: u32,
    default_shader_id: u32,
    surfaces: FxHashMap<u32, ffi::RenderTexture2D>,
    programs: FxHashMap<u32, ffi::Shader>,
    buffers: FxHashMap<u32, ClipRect>,
    textures: FxHashMap<u32, ffi::Texture2D>,
    bound: Bound,
    flip_scratch: Vec<u8>,
}

impl RaylibBackend {
    pub fn new(_th: &RaylibThread) -> Self {
        // Raylib answers a failed shader build with its default shader, so
        // remember that id to tell the two apart.
        let default_shader_id = unsafe { ffi::LoadShaderFromMemory(ptr::null(), ptr::null()) }.id;
        Self {
            next_id: 1,
            default_shader_id,
            surfaces: FxHashMap::default(),
            programs: FxHashMap::default(),
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            bound: Bound::default(),
            flip_scratch: Vec::new(),
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn program(&self, id: ProgramId) -> Result<ffi::Shader, RenderError> {
        self.programs
            .get(&id.0)
            .copied()
            .ok_or(RenderError::InvalidHandle("program"))
    }
}

impl GpuBackend for RaylibBackend {
    fn name(&self) -> &'static str {
        "raylib"
    }

    fn create_surface(&mut self, width: u32, height: u32) -> Result<SurfaceId, RenderError> {
        let target = unsafe { ffi::LoadRenderTexture(width as i32, height as i32) };
        if !unsafe { ffi::IsRenderTextureValid(target) } {
            return Err(RenderError::SurfaceCreation(format!(
                "LoadRenderTexture({}x{}) returned an invalid target",
                width, height
            )));
        }
        unsafe {
            ffi::BeginTextureMode(target);
            ffi::ClearBackground(BLACK);
            ffi::EndTextureMode();
        }
        let id = self.alloc();
        self.surfaces.insert(id, target);
        Ok(SurfaceId(id))
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        let vs = CString::new(vertex).map_err(|_| RenderError::ShaderCompile {
            stage: super::ShaderStage::Vertex,
            log: "source contains a NUL byte".to_string(),
        })?;
        let fs = CString::new(fragment).map_err(|_| RenderError::ShaderCompile {
            stage: super::ShaderStage::Fragment,
            log: "source contains a NUL byte".to_string(),
        })?;

        let shader = unsafe { ffi::LoadShaderFromMemory(vs.as_ptr(), fs.as_ptr()) };
        if shader.id == self.default_shader_id || !unsafe { ffi::IsShaderValid(shader) } {
            return Err(RenderError::ProgramLink {
                log: "raylib fell back to its default shader; compiler output is in the raylib log"
                    .to_string(),
            });
        }
        let id = self.alloc();
        self.programs.insert(id, shader);
        Ok(ProgramId(id))
    }

    fn set_uniform_vec4(
        &mut self,
        program: ProgramId,
        name: &str,
        value: [f32; 4],
    ) -> Result<(), RenderError> {
        let shader = self.program(program)?;
        let Ok(c_name) = CString::new(name) else {
            return Ok(());
        };
        unsafe {
            let loc = ffi::GetShaderLocation(shader, c_name.as_ptr());
            if loc >= 0 {
                ffi::SetShaderValue(
                    shader,
                    loc,
                    value.as_ptr() as *const c_void,
                    ffi::ShaderUniformDataType::SHADER_UNIFORM_VEC4 as i32,
                );
            }
        }
        Ok(())
    }

    fn set_uniform_sampler(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<(), RenderError> {
        let shader = self.program(program)?;
        let Ok(c_name) = CString::new(name) else {
            return Ok(());
        };
        let unit = unit as i32;
        unsafe {
            let loc = ffi::GetShaderLocation(shader, c_name.as_ptr());
            if loc >= 0 {
                ffi::SetShaderValue(
                    shader,
                    loc,
                    &unit as *const i32 as *const c_void,
                    ffi::ShaderUniformDataType::SHADER_UNIFORM_INT as i32,
                );
            }
        }
        Ok(())
    }

    fn create_vertex_buffer(
        &mut self,
        program: ProgramId,
        _attribute: &str,
        vertices: &[[f32; 2]],
    ) -> Result<BufferId, RenderError> {
        self.program(program)?;
        let id = self.alloc();
        self.buffers.insert(id, ClipRect::from_vertices(vertices));
        Ok(BufferId(id))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, RenderError> {
        let texture = unsafe {
            let mut image = ffi::GenImageColor(desc.width as i32, desc.height as i32, BLACK);
            ffi::ImageFormat(
                &mut image,
                ffi::PixelFormat::PIXELFORMAT_UNCOMPRESSED_R8G8B8 as i32,
            );
            let texture = ffi::LoadTextureFromImage(image);
            ffi::UnloadImage(image);
            texture
        };
        if !unsafe { ffi::IsTextureValid(texture) } {
            return Err(RenderError::TextureCreation(format!(
                "LoadTextureFromImage({}x{}) returned an invalid texture",
                desc.width, desc.height
            )));
        }

        let filter = match desc.filter {
            TextureFilter::Nearest => ffi::TextureFilter::TEXTURE_FILTER_POINT as i32,
            TextureFilter::Linear => ffi::TextureFilter::TEXTURE_FILTER_BILINEAR as i32,
        };
        let wrap = match desc.wrap {
            TextureWrap::Repeat => ffi::TextureWrap::TEXTURE_WRAP_REPEAT as i32,
            TextureWrap::ClampToEdge => ffi::TextureWrap::TEXTURE_WRAP_CLAMP as i32,
        };
        unsafe {
            ffi::SetTextureFilter(texture, filter);
            ffi::SetTextureWrap(texture, wrap);
        }

        let id = self.alloc();
        self.textures.insert(id, texture);
        Ok(TextureId(id))
    }

    fn upload_texture(
        &mut self,
        texture: TextureId,
        frame: &VideoFrame,
        flip_y: bool,
    ) -> Result<(), RenderError> {
        let tex = *self
            .textures
            .get(&texture.0)
            .ok_or(RenderError::InvalidHandle("texture"))?;
        let expected = tex.width as usize * tex.height as usize * VideoFrame::BYTES_PER_PIXEL;
        if frame.width as i32 != tex.width
            || frame.height as i32 != tex.height
            || frame.pixels.len() != expected
        {
            return Err(RenderError::FrameSize {
                expected,
                actual: frame.pixels.len(),
            });
        }

        let pixels: &[u8] = if flip_y {
            let row_len = frame.width as usize * VideoFrame::BYTES_PER_PIXEL;
            self.flip_scratch.clear();
            for row in frame.pixels.chunks_exact(row_len).rev() {
                self.flip_scratch.extend_from_slice(row);
            }
            &self.flip_scratch
        } else {
            &frame.pixels
        };

        // UpdateTexture reads exactly width * height * 3 bytes, checked above
        unsafe {
            ffi::UpdateTexture(tex, pixels.as_ptr() as *const c_void);
        }
        Ok(())
    }

    fn bind(&mut self, binding: Binding) -> Result<(), RenderError> {
        match binding {
            Binding::Surface(id) if self.surfaces.contains_key(&id.0) => {
                self.bound.surface = Some(id)
            }
            Binding::Program(id) if self.programs.contains_key(&id.0) => {
                self.bound.program = Some(id)
            }
            Binding::VertexBuffer(id) if self.buffers.contains_key(&id.0) => {
                self.bound.buffer = Some(id)
            }
            Binding::Texture { unit: 0, texture } if self.textures.contains_key(&texture.0) => {
                self.bound.texture = Some(texture)
            }
            Binding::Surface(_) => return Err(RenderError::InvalidHandle("surface")),
            Binding::Program(_) => return Err(RenderError::InvalidHandle("program")),
            Binding::VertexBuffer(_) => return Err(RenderError::InvalidHandle("buffer")),
            Binding::Texture { .. } => return Err(RenderError::InvalidHandle("texture")),
        }
        Ok(())
    }

    fn restore_defaults(&mut self) {
        self.bound = Bound::default();
    }

    fn draw_arrays(&mut self, mode: Primitive, _first: u32, count: u32) -> Result<(), RenderError> {
        let target = self
            .bound
            .surface
            .and_then(|id| self.surfaces.get(&id.0))
            .copied()
            .ok_or(RenderError::InvalidHandle("surface"))?;
        let shader = self
            .bound
            .program
            .and_then(|id| self.programs.get(&id.0))
            .copied()
            .ok_or(RenderError::InvalidHandle("program"))?;
        let quad = self
            .bound
            .buffer
            .and_then(|id| self.buffers.get(&id.0))
            .copied()
            .ok_or(RenderError::InvalidHandle("buffer"))?;
        let texture = self
            .bound
            .texture
            .and_then(|id| self.textures.get(&id.0))
            .copied()
            .ok_or(RenderError::InvalidHandle("texture"))?;

        if mode != Primitive::TriangleStrip || count != 4 {
            warn!(
                "raylib backend draws quads only; drawing bounds of {:?} x{}",
                mode, count
            );
        }

        let source = ffi::Rectangle {
            x: 0.0,
            y: 0.0,
            width: texture.width as f32,
            height: texture.height as f32,
        };
        let dest = quad.to_pixels(target.texture.width, target.texture.height);
        unsafe {
            ffi::BeginTextureMode(target);
            ffi::BeginShaderMode(shader);
            ffi::DrawTexturePro(
                texture,
                source,
                dest,
                ffi::Vector2 { x: 0.0, y: 0.0 },
                0.0,
                WHITE,
            );
            ffi::EndShaderMode();
            ffi::EndTextureMode();
        }
        Ok(())
    }

    fn present(&mut self, surface: SurfaceId, dest: DisplayRect) -> Result<(), RenderError> {
        let target = self
            .surfaces
            .get(&surface.0)
            .copied()
            .ok_or(RenderError::InvalidHandle("surface"))?;
        // Negative height flips the render texture, stored bottom-up by OpenGL
        let source = ffi::Rectangle {
            x: 0.0,
            y: 0.0,
            width: target.texture.width as f32,
            height: -(target.texture.height as f32),
        };
        let dest = ffi::Rectangle {
            x: dest.x,
            y: dest.y,
            width: dest.width,
            height: dest.height,
        };
        unsafe {
            ffi::DrawTexturePro(
                target.texture,
                source,
                dest,
                ffi::Vector2 { x: 0.0, y: 0.0 },
                0.0,
                WHITE,
            );
        }
        Ok(())
    }

    fn release(&mut self, resource: GpuResource) {
        match resource {
            GpuResource::Surface(id) => {
                if let Some(target) = self.surfaces.remove(&id.0) {
                    unsafe { ffi::UnloadRenderTexture(target) };
                }
            }
            GpuResource::Program(id) => {
                if let Some(shader) = self.programs.remove(&id.0) {
                    unsafe { ffi::UnloadShader(shader) };
                }
            }
            GpuResource::Buffer(id) => {
                self.buffers.remove(&id.0);
            }
            GpuResource::Texture(id) => {
                if let Some(texture) = self.textures.remove(&id.0) {
                    unsafe { ffi::UnloadTexture(texture) };
                }
            }
        }
    }
}

impl Drop for RaylibBackend {
    fn drop(&mut self) {
        for (_, texture) in self.textures.drain() {
            unsafe { ffi::UnloadTexture(texture) };
        }
        for (_, shader) in self.programs.drain() {
            unsafe { ffi::UnloadShader(shader) };
        }
        for (_, target) in self.surfaces.drain() {
            unsafe { ffi::UnloadRenderTexture(target) };
        }
    }
}
