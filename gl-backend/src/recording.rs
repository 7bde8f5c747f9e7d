//! A [`GlBackend`] that doesn't render anything, but records every call made
//! to it and simulates just enough state for the queries to make sense. Used
//! as the backend in tests and in the demo.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec,
    vec::Vec,
};
use core::ffi::c_void;

use enum_map::EnumMap;

use crate::{
    client_array::read_indices, effective_stride, enums::*, formats, ClientArray, GLboolean,
    GLenum, GLfloat, GLint, GLintptr, GLsizei, GLsizeiptr, GLuint, GlBackend,
};

/// One argument of a recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// Signed integers.
    Int(i64),
    /// Unsigned integers, enums and booleans.
    Uint(u64),
    /// Floats and doubles.
    Float(f64),
    /// Float arrays, as many values as the call reads.
    Floats(Vec<f32>),
    /// Name and enum arrays.
    Names(Vec<u32>),
    /// Byte payloads, as many bytes as the call reads.
    Bytes(Vec<u8>),
    /// Strings.
    Text(String),
    /// A null pointer.
    Null,
}

macro_rules! impl_arg_from {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {
        $(impl From<$ty> for Arg {
            fn from(value: $ty) -> Self {
                Arg::$variant(<$wide>::from(value))
            }
        })*
    };
}

impl_arg_from!(Int as i64: i8, i16, i32);
impl_arg_from!(Uint as u64: u8, u16, u32);
impl_arg_from!(Float as f64: f32, f64);

/// A call made to a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// The name of the [`GlBackend`] method that was called.
    pub name: &'static str,
    #[allow(missing_docs)]
    pub args: Vec<Arg>,
}

/// The contents of one array, as seen by a draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum CapturedArray {
    /// The array was in client memory: the elements that were drawn, tightly
    /// packed, in the order they were drawn.
    Client(Vec<u8>),
    /// The array was in a buffer object.
    Buffer {
        #[allow(missing_docs)]
        buffer: GLuint,
        #[allow(missing_docs)]
        offset: usize,
        #[allow(missing_docs)]
        stride: GLsizei,
    },
}

/// Where a draw call got its indices from.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawIndices {
    /// Not an indexed draw.
    None,
    /// Indices read from client memory.
    Client(Vec<u32>),
    /// Indices in the bound element array buffer.
    Buffer {
        #[allow(missing_docs)]
        buffer: GLuint,
        #[allow(missing_docs)]
        offset: usize,
        #[allow(missing_docs)]
        ty: GLenum,
    },
}

/// A draw call made to a [`RecordingBackend`], with the array data it read.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    #[allow(missing_docs)]
    pub mode: GLenum,
    #[allow(missing_docs)]
    pub first: GLint,
    #[allow(missing_docs)]
    pub count: GLsizei,
    #[allow(missing_docs)]
    pub indices: DrawIndices,
    /// The enabled client arrays.
    pub arrays: Vec<(ClientArray, CapturedArray)>,
    /// The enabled generic vertex attribute arrays.
    pub attribs: Vec<(GLuint, CapturedArray)>,
}

impl DrawCall {
    /// The captured contents of the given array, if it was enabled.
    pub fn array(&self, array: ClientArray) -> Option<&CapturedArray> {
        self.arrays
            .iter()
            .find(|(kind, _)| *kind == array)
            .map(|(_, captured)| captured)
    }
}

#[derive(Clone, Copy, Debug)]
struct ArrayPointer {
    size: GLint,
    ty: GLenum,
    stride: GLsizei,
    pointer: *const c_void,
    buffer: GLuint,
}

/// See the [module documentation](crate::recording).
pub struct RecordingBackend {
    /// Every call made, in order.
    pub calls: Vec<Call>,
    /// Every draw call made, in order, with the data it read.
    pub draws: Vec<DrawCall>,
    /// Every object name handed out by the generation functions.
    pub generated: Vec<GLuint>,
    /// Makes all generation functions fail, returning 0.
    pub fail_generation: bool,
    /// Returned (and reset) by the next [`GlBackend::get_error`].
    pub pending_error: GLenum,
    /// Returned for `COMPILE_STATUS` and `LINK_STATUS` queries.
    pub compile_status: GLint,
    /// Returned by [`GlBackend::check_framebuffer_status`].
    pub framebuffer_status: GLenum,
    /// Returned by the info log queries.
    pub info_log: String,
    /// The byte [`GlBackend::read_pixels`] fills the output with.
    pub pixel_fill: u8,
    integers: BTreeMap<GLenum, Vec<GLint>>,
    floats: BTreeMap<GLenum, Vec<GLfloat>>,
    strings: BTreeMap<GLenum, String>,
    capabilities: BTreeSet<GLenum>,
    uniform_locations: BTreeMap<String, GLint>,
    shader_sources: BTreeMap<GLuint, String>,
    next_name: GLuint,
    array_buffer: GLuint,
    element_array_buffer: GLuint,
    client_arrays: EnumMap<ClientArray, Option<ArrayPointer>>,
    enabled_arrays: EnumMap<ClientArray, bool>,
    attrib_arrays: BTreeMap<GLuint, ArrayPointer>,
    enabled_attribs: BTreeSet<GLuint>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// Creates a backend with some plausible implementation limits.
    pub fn new() -> RecordingBackend {
        let mut integers = BTreeMap::new();
        integers.insert(MAX_TEXTURE_SIZE, vec![8192]);
        integers.insert(MAX_TEXTURE_UNITS, vec![4]);
        integers.insert(MAX_TEXTURE_IMAGE_UNITS, vec![16]);
        integers.insert(MAX_TEXTURE_COORDS, vec![8]);
        integers.insert(UNPACK_ALIGNMENT, vec![4]);
        integers.insert(ACTIVE_TEXTURE, vec![TEXTURE0 as GLint]);
        integers.insert(VIEWPORT, vec![0, 0, 0, 0]);
        let mut floats = BTreeMap::new();
        floats.insert(LINE_WIDTH, vec![1.0]);
        floats.insert(MAX_TEXTURE_MAX_ANISOTROPY, vec![16.0]);
        let mut strings = BTreeMap::new();
        strings.insert(VENDOR, String::from("gml"));
        strings.insert(RENDERER, String::from("recording backend"));
        strings.insert(VERSION, String::from("2.1"));
        strings.insert(EXTENSIONS, String::from("GL_ARB_vertex_buffer_object"));

        RecordingBackend {
            calls: Vec::new(),
            draws: Vec::new(),
            generated: Vec::new(),
            fail_generation: false,
            pending_error: NO_ERROR,
            compile_status: GLint::from(TRUE),
            framebuffer_status: FRAMEBUFFER_COMPLETE,
            info_log: String::new(),
            pixel_fill: 0x7F,
            integers,
            floats,
            strings,
            capabilities: BTreeSet::new(),
            uniform_locations: BTreeMap::new(),
            shader_sources: BTreeMap::new(),
            next_name: 1,
            array_buffer: 0,
            element_array_buffer: 0,
            client_arrays: EnumMap::default(),
            enabled_arrays: EnumMap::default(),
            attrib_arrays: BTreeMap::new(),
            enabled_attribs: BTreeSet::new(),
        }
    }

    /// Overrides the value returned by [`GlBackend::get_integer_v`].
    pub fn set_integers(&mut self, pname: GLenum, values: &[GLint]) {
        self.integers.insert(pname, values.to_vec());
    }

    /// Overrides the value returned by [`GlBackend::get_string`].
    pub fn set_string(&mut self, name: GLenum, value: &str) {
        self.strings.insert(name, String::from(value));
    }

    /// The names of the recorded calls, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.iter().map(|call| call.name).collect()
    }

    /// The recorded calls with the given name, in order.
    pub fn calls_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Call> + 'a {
        self.calls.iter().filter(move |call| call.name == name)
    }

    /// The source last set for `shader` with [`GlBackend::shader_source`].
    pub fn shader_source_of(&self, shader: GLuint) -> Option<&str> {
        self.shader_sources.get(&shader).map(String::as_str)
    }

    fn record(&mut self, name: &'static str, args: Vec<Arg>) {
        self.apply(name, &args);
        self.calls.push(Call { name, args });
    }

    /// Tracks the handful of states the queries can read back.
    fn apply(&mut self, name: &str, args: &[Arg]) {
        match (name, args) {
            ("enable", [Arg::Uint(cap)]) => {
                self.capabilities.insert(*cap as GLenum);
            }
            ("disable", [Arg::Uint(cap)]) => {
                self.capabilities.remove(&(*cap as GLenum));
            }
            ("line_width", [Arg::Float(width)]) => {
                self.floats.insert(LINE_WIDTH, vec![*width as GLfloat]);
            }
            ("active_texture", [Arg::Uint(texture)]) => {
                self.integers.insert(ACTIVE_TEXTURE, vec![*texture as GLint]);
            }
            ("bind_texture", [_, Arg::Uint(texture)]) => {
                self.integers.insert(TEXTURE_BINDING_2D, vec![*texture as GLint]);
            }
            ("pixel_store_i", [Arg::Uint(pname), Arg::Int(param)]) => {
                self.integers.insert(*pname as GLenum, vec![*param as GLint]);
            }
            ("viewport", [Arg::Int(x), Arg::Int(y), Arg::Int(w), Arg::Int(h)]) => {
                let viewport = vec![*x as GLint, *y as GLint, *w as GLint, *h as GLint];
                self.integers.insert(VIEWPORT, viewport);
            }
            _ => {}
        }
    }

    fn answer(&self, name: &str, args: &[Arg]) -> i64 {
        match (name, args) {
            ("is_enabled", [Arg::Uint(cap)]) => {
                i64::from(self.capabilities.contains(&(*cap as GLenum)))
            }
            ("is_texture" | "is_buffer" | "is_shader" | "is_program", [Arg::Uint(name)]) => {
                i64::from(*name != 0 && self.generated.contains(&(*name as GLuint)))
            }
            ("unmap_buffer", _) => i64::from(TRUE),
            _ => 0,
        }
    }

    fn generate(&mut self, names: &mut [GLuint]) {
        for name in names {
            *name = self.generate_range(1);
        }
    }

    fn generate_range(&mut self, range: GLsizei) -> GLuint {
        let Ok(range) = GLuint::try_from(range) else {
            return 0;
        };
        if self.fail_generation || range == 0 {
            return 0;
        }
        let first = self.next_name;
        self.next_name += range;
        self.generated.extend(first..first + range);
        first
    }

    fn set_pointer(&mut self, array: ClientArray, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.client_arrays[array] = Some(ArrayPointer {
            size,
            ty,
            stride,
            pointer,
            buffer: self.array_buffer,
        });
    }

    /// Captures the given elements of an array.
    ///
    /// ### Safety
    ///
    /// If the array is in client memory, its pointer must be valid for reads
    /// of all the given elements.
    unsafe fn capture(
        array: &ArrayPointer,
        item_size: usize,
        elements: impl Iterator<Item = usize>,
    ) -> CapturedArray {
        if array.buffer != 0 {
            return CapturedArray::Buffer {
                buffer: array.buffer,
                offset: array.pointer as usize,
                stride: array.stride,
            };
        }
        let stride = effective_stride(array.stride, item_size);
        let mut data = Vec::new();
        for element in elements {
            // Safety: guaranteed by the caller.
            let item = unsafe {
                let start = array.pointer.cast::<u8>().add(element * stride);
                core::slice::from_raw_parts(start, item_size)
            };
            data.extend_from_slice(item);
        }
        CapturedArray::Client(data)
    }

    /// Records a draw reading the given elements of every enabled array.
    ///
    /// ### Safety
    ///
    /// The enabled client arrays must be valid for reads of all the elements.
    unsafe fn capture_draw(
        &mut self,
        mode: GLenum,
        first: GLint,
        count: GLsizei,
        indices: DrawIndices,
        elements: &[usize],
    ) {
        let mut arrays = Vec::new();
        for array in ClientArray::ALL {
            if !self.enabled_arrays[array] {
                continue;
            }
            let Some(pointer) = &self.client_arrays[array] else {
                continue;
            };
            let item_size = array.item_size(pointer.size, pointer.ty);
            // Safety: guaranteed by the caller.
            let captured = unsafe { Self::capture(pointer, item_size, elements.iter().copied()) };
            arrays.push((array, captured));
        }
        let mut attribs = Vec::new();
        for index in &self.enabled_attribs {
            let Some(pointer) = self.attrib_arrays.get(index) else {
                continue;
            };
            let components = usize::try_from(pointer.size).unwrap_or(0);
            let item_size = components * formats::bytes_per_component(pointer.ty);
            // Safety: guaranteed by the caller.
            let captured = unsafe { Self::capture(pointer, item_size, elements.iter().copied()) };
            attribs.push((*index, captured));
        }
        self.draws.push(DrawCall {
            mode,
            first,
            count,
            indices,
            arrays,
            attribs,
        });
    }

    /// ### Safety
    ///
    /// See [`GlBackend::draw_elements`].
    unsafe fn draw_indexed(
        &mut self,
        name: &'static str,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
    ) {
        self.record(name, vec![mode.into(), count.into(), ty.into()]);
        let count_usize = usize::try_from(count).unwrap_or(0);
        if self.element_array_buffer != 0 {
            let source = DrawIndices::Buffer {
                buffer: self.element_array_buffer,
                offset: indices as usize,
                ty,
            };
            // Safety: no client memory is read, client arrays can't be
            // resolved without reading the buffer.
            unsafe { self.capture_draw(mode, 0, count, source, &[]) };
            return;
        }
        // Safety: guaranteed by the caller.
        let Some(read) = (unsafe { read_indices(indices, ty, count_usize) }) else {
            self.pending_error = INVALID_ENUM;
            return;
        };
        let elements = read.iter().map(|&i| i as usize).collect::<Vec<_>>();
        // Safety: guaranteed by the caller.
        unsafe { self.capture_draw(mode, 0, count, DrawIndices::Client(read), &elements) };
    }

    fn leading<T: Copy>(values: &[T], count: usize) -> Vec<T> {
        values[..count.min(values.len())].to_vec()
    }
}

macro_rules! record_commands {
    (
        fixed { $($op:ident => fn $name:ident($($arg:ident: $ty:ty),*);)* }
        query { $($qop:ident => fn $qname:ident($($qarg:ident: $qty:ty),*) -> $ret:ty;)* }
        special { $($sop:ident,)* }
    ) => {
        $(
            fn $name(&mut self, $($arg: $ty),*) {
                self.record(stringify!($name), vec![$(Arg::from($arg)),*]);
            }
        )*
        $(
            fn $qname(&mut self, $($qarg: $qty),*) -> $ret {
                let args: Vec<Arg> = vec![$(Arg::from($qarg)),*];
                let answer = self.answer(stringify!($qname), &args);
                self.record(stringify!($qname), args);
                answer as $ret
            }
        )*
    };
}

impl GlBackend for RecordingBackend {
    crate::for_each_gl_command!(record_commands);

    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        match target {
            ARRAY_BUFFER => self.array_buffer = buffer,
            ELEMENT_ARRAY_BUFFER => self.element_array_buffer = buffer,
            _ => {}
        }
        self.record("bind_buffer", vec![target.into(), buffer.into()]);
    }

    fn enable_client_state(&mut self, array: GLenum) {
        if let Some(array) = ClientArray::from_gl(array) {
            self.enabled_arrays[array] = true;
        }
        self.record("enable_client_state", vec![array.into()]);
    }

    fn disable_client_state(&mut self, array: GLenum) {
        if let Some(array) = ClientArray::from_gl(array) {
            self.enabled_arrays[array] = false;
        }
        self.record("disable_client_state", vec![array.into()]);
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.enabled_attribs.insert(index);
        self.record("enable_vertex_attrib_array", vec![index.into()]);
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.enabled_attribs.remove(&index);
        self.record("disable_vertex_attrib_array", vec![index.into()]);
    }

    fn light_fv(&mut self, light: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_light_material(pname));
        self.record("light_fv", vec![light.into(), pname.into(), Arg::Floats(params)]);
    }

    fn material_fv(&mut self, face: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_light_material(pname));
        self.record("material_fv", vec![face.into(), pname.into(), Arg::Floats(params)]);
    }

    fn fog_fv(&mut self, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_fog(pname));
        self.record("fog_fv", vec![pname.into(), Arg::Floats(params)]);
    }

    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_tex_parameter(pname));
        self.record("tex_parameter_fv", vec![target.into(), pname.into(), Arg::Floats(params)]);
    }

    fn tex_env_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_tex_env(pname));
        self.record("tex_env_fv", vec![target.into(), pname.into(), Arg::Floats(params)]);
    }

    fn light_model_fv(&mut self, pname: GLenum, params: &[GLfloat]) {
        let params = Self::leading(params, formats::num_args_light_model(pname));
        self.record("light_model_fv", vec![pname.into(), Arg::Floats(params)]);
    }

    fn mult_matrix_f(&mut self, m: &[GLfloat; 16]) {
        self.record("mult_matrix_f", vec![Arg::Floats(m.to_vec())]);
    }

    fn load_matrix_f(&mut self, m: &[GLfloat; 16]) {
        self.record("load_matrix_f", vec![Arg::Floats(m.to_vec())]);
    }

    fn uniform_1fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]) {
        let value = Self::leading(value, usize::try_from(count).unwrap_or(0));
        self.record("uniform_1fv", vec![location.into(), count.into(), Arg::Floats(value)]);
    }

    fn uniform_4fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]) {
        let value = Self::leading(value, 4 * usize::try_from(count).unwrap_or(0));
        self.record("uniform_4fv", vec![location.into(), count.into(), Arg::Floats(value)]);
    }

    fn uniform_matrix_2fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = Self::leading(value, 4 * usize::try_from(count).unwrap_or(0));
        let args = vec![location.into(), count.into(), transpose.into(), Arg::Floats(value)];
        self.record("uniform_matrix_2fv", args);
    }

    fn uniform_matrix_3fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = Self::leading(value, 9 * usize::try_from(count).unwrap_or(0));
        let args = vec![location.into(), count.into(), transpose.into(), Arg::Floats(value)];
        self.record("uniform_matrix_3fv", args);
    }

    fn uniform_matrix_4fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = Self::leading(value, 16 * usize::try_from(count).unwrap_or(0));
        let args = vec![location.into(), count.into(), transpose.into(), Arg::Floats(value)];
        self.record("uniform_matrix_4fv", args);
    }

    fn delete_textures(&mut self, textures: &[GLuint]) {
        self.record("delete_textures", vec![Arg::Names(textures.to_vec())]);
    }

    fn delete_buffers(&mut self, buffers: &[GLuint]) {
        self.record("delete_buffers", vec![Arg::Names(buffers.to_vec())]);
    }

    fn delete_framebuffers(&mut self, framebuffers: &[GLuint]) {
        self.record("delete_framebuffers", vec![Arg::Names(framebuffers.to_vec())]);
    }

    fn delete_renderbuffers(&mut self, renderbuffers: &[GLuint]) {
        self.record("delete_renderbuffers", vec![Arg::Names(renderbuffers.to_vec())]);
    }

    fn delete_queries(&mut self, queries: &[GLuint]) {
        self.record("delete_queries", vec![Arg::Names(queries.to_vec())]);
    }

    fn draw_buffers(&mut self, buffers: &[GLenum]) {
        self.record("draw_buffers", vec![Arg::Names(buffers.to_vec())]);
    }

    fn tex_image_1d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLsizei,
        border: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    ) {
        let size = formats::image_size(width, 1, 1, format, ty);
        let pixels = pixels.map_or(Arg::Null, |p| Arg::Bytes(Self::leading(p, size)));
        let args = vec![
            target.into(),
            level.into(),
            internal_format.into(),
            width.into(),
            border.into(),
            format.into(),
            ty.into(),
            pixels,
        ];
        self.record("tex_image_1d", args);
    }

    fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        border: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    ) {
        let size = formats::image_size(width, height, 1, format, ty);
        let pixels = pixels.map_or(Arg::Null, |p| Arg::Bytes(Self::leading(p, size)));
        let args = vec![
            target.into(),
            level.into(),
            internal_format.into(),
            width.into(),
            height.into(),
            border.into(),
            format.into(),
            ty.into(),
            pixels,
        ];
        self.record("tex_image_2d", args);
    }

    fn tex_image_3d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        depth: GLsizei,
        border: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    ) {
        let size = formats::image_size(width, height, depth, format, ty);
        let pixels = pixels.map_or(Arg::Null, |p| Arg::Bytes(Self::leading(p, size)));
        let args = vec![
            target.into(),
            level.into(),
            internal_format.into(),
            width.into(),
            height.into(),
            depth.into(),
            border.into(),
            format.into(),
            ty.into(),
            pixels,
        ];
        self.record("tex_image_3d", args);
    }

    fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        xoffset: GLint,
        yoffset: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) {
        let size = formats::image_size(width, height, 1, format, ty);
        let args = vec![
            target.into(),
            level.into(),
            xoffset.into(),
            yoffset.into(),
            width.into(),
            height.into(),
            format.into(),
            ty.into(),
            Arg::Bytes(Self::leading(pixels, size)),
        ];
        self.record("tex_sub_image_2d", args);
    }

    fn compressed_tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        border: GLint,
        data: &[u8],
    ) {
        let args = vec![
            target.into(),
            level.into(),
            internal_format.into(),
            width.into(),
            height.into(),
            border.into(),
            Arg::Bytes(data.to_vec()),
        ];
        self.record("compressed_tex_image_2d", args);
    }

    fn build_2d_mipmaps(
        &mut self,
        target: GLenum,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    ) -> GLint {
        let size = formats::image_size(width, height, 1, format, ty);
        let args = vec![
            target.into(),
            internal_format.into(),
            width.into(),
            height.into(),
            format.into(),
            ty.into(),
            Arg::Bytes(Self::leading(data, size)),
        ];
        self.record("build_2d_mipmaps", args);
        0
    }

    fn buffer_data(&mut self, target: GLenum, size: GLsizeiptr, data: Option<&[u8]>, usage: GLenum) {
        let len = usize::try_from(size).unwrap_or(0);
        let data = data.map_or(Arg::Null, |d| Arg::Bytes(Self::leading(d, len)));
        let args = vec![target.into(), Arg::Int(size as i64), data, usage.into()];
        self.record("buffer_data", args);
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: GLintptr, data: &[u8]) {
        let args = vec![target.into(), Arg::Int(offset as i64), Arg::Bytes(data.to_vec())];
        self.record("buffer_sub_data", args);
    }

    fn map_1f(&mut self, target: GLenum, u1: GLfloat, u2: GLfloat, stride: GLint, order: GLint, points: &[GLfloat]) {
        let per_point = formats::num_args_map1(target);
        let stride = usize::try_from(stride).unwrap_or(0);
        let mut packed = Vec::new();
        for point in 0..usize::try_from(order).unwrap_or(0) {
            let start = point * stride;
            if let Some(values) = points.get(start..start + per_point) {
                packed.extend_from_slice(values);
            }
        }
        let args = vec![target.into(), u1.into(), u2.into(), order.into(), Arg::Floats(packed)];
        self.record("map_1f", args);
    }

    fn shader_source(&mut self, shader: GLuint, sources: &[&str]) {
        let source: String = sources.concat();
        self.shader_sources.insert(shader, source.clone());
        self.record("shader_source", vec![shader.into(), Arg::Text(source)]);
    }

    fn vertex_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::Vertex, size, ty, stride, pointer);
        self.record("vertex_pointer", vec![size.into(), ty.into(), stride.into()]);
    }

    fn color_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::Color, size, ty, stride, pointer);
        self.record("color_pointer", vec![size.into(), ty.into(), stride.into()]);
    }

    fn tex_coord_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::TexCoord, size, ty, stride, pointer);
        self.record("tex_coord_pointer", vec![size.into(), ty.into(), stride.into()]);
    }

    fn normal_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::Normal, 3, ty, stride, pointer);
        self.record("normal_pointer", vec![ty.into(), stride.into()]);
    }

    fn index_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::Index, 1, ty, stride, pointer);
        self.record("index_pointer", vec![ty.into(), stride.into()]);
    }

    fn edge_flag_pointer(&mut self, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ClientArray::EdgeFlag, 1, UNSIGNED_BYTE, stride, pointer);
        self.record("edge_flag_pointer", vec![stride.into()]);
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: GLboolean,
        stride: GLsizei,
        pointer: *const c_void,
    ) {
        let array = ArrayPointer {
            size,
            ty,
            stride,
            pointer,
            buffer: self.array_buffer,
        };
        self.attrib_arrays.insert(index, array);
        let args = vec![index.into(), size.into(), ty.into(), normalized.into(), stride.into()];
        self.record("vertex_attrib_pointer", args);
    }

    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        self.record("draw_arrays", vec![mode.into(), first.into(), count.into()]);
        let start = usize::try_from(first).unwrap_or(0);
        let count_usize = usize::try_from(count).unwrap_or(0);
        let elements = (start..start + count_usize).collect::<Vec<_>>();
        // Safety: guaranteed by the caller.
        unsafe { self.capture_draw(mode, first, count, DrawIndices::None, &elements) };
    }

    unsafe fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, indices: *const c_void) {
        // Safety: guaranteed by the caller.
        unsafe { self.draw_indexed("draw_elements", mode, count, ty, indices) };
    }

    unsafe fn draw_range_elements(
        &mut self,
        mode: GLenum,
        _start: GLuint,
        _end: GLuint,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
    ) {
        // Safety: guaranteed by the caller.
        unsafe { self.draw_indexed("draw_range_elements", mode, count, ty, indices) };
    }

    fn get_error(&mut self) -> GLenum {
        self.record("get_error", Vec::new());
        core::mem::replace(&mut self.pending_error, NO_ERROR)
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        self.record("check_framebuffer_status", vec![target.into()]);
        self.framebuffer_status
    }

    fn get_integer_v(&mut self, pname: GLenum, params: &mut [GLint]) {
        self.record("get_integer_v", vec![pname.into()]);
        match self.integers.get(&pname) {
            Some(values) => {
                for (param, value) in params.iter_mut().zip(values) {
                    *param = *value;
                }
            }
            None => self.pending_error = INVALID_ENUM,
        }
    }

    fn get_float_v(&mut self, pname: GLenum, params: &mut [GLfloat]) {
        self.record("get_float_v", vec![pname.into()]);
        match self.floats.get(&pname) {
            Some(values) => {
                for (param, value) in params.iter_mut().zip(values) {
                    *param = *value;
                }
            }
            None => self.pending_error = INVALID_ENUM,
        }
    }

    fn get_string(&mut self, name: GLenum) -> String {
        self.record("get_string", vec![name.into()]);
        self.strings.get(&name).cloned().unwrap_or_default()
    }

    fn get_shader_iv(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        self.record("get_shader_iv", vec![shader.into(), pname.into()]);
        match pname {
            COMPILE_STATUS => self.compile_status,
            INFO_LOG_LENGTH => GLint::try_from(self.info_log.len()).unwrap_or(GLint::MAX),
            _ => 0,
        }
    }

    fn get_program_iv(&mut self, program: GLuint, pname: GLenum) -> GLint {
        self.record("get_program_iv", vec![program.into(), pname.into()]);
        match pname {
            LINK_STATUS => self.compile_status,
            INFO_LOG_LENGTH => GLint::try_from(self.info_log.len()).unwrap_or(GLint::MAX),
            _ => 0,
        }
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        self.record("get_shader_info_log", vec![shader.into()]);
        self.info_log.clone()
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        self.record("get_program_info_log", vec![program.into()]);
        self.info_log.clone()
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.record("get_uniform_location", vec![program.into(), Arg::Text(String::from(name))]);
        let next = GLint::try_from(self.uniform_locations.len()).unwrap_or(GLint::MAX);
        *self.uniform_locations.entry(String::from(name)).or_insert(next)
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.record("get_attrib_location", vec![program.into(), Arg::Text(String::from(name))]);
        let next = GLint::try_from(self.uniform_locations.len()).unwrap_or(GLint::MAX);
        *self.uniform_locations.entry(String::from(name)).or_insert(next)
    }

    fn read_pixels(
        &mut self,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: &mut [u8],
    ) {
        let args = vec![
            x.into(),
            y.into(),
            width.into(),
            height.into(),
            format.into(),
            ty.into(),
        ];
        self.record("read_pixels", args);
        let size = formats::image_size(width, height, 1, format, ty).min(pixels.len());
        pixels[..size].fill(self.pixel_fill);
    }

    fn gen_textures(&mut self, textures: &mut [GLuint]) {
        self.generate(textures);
        self.record("gen_textures", vec![Arg::Names(textures.to_vec())]);
    }

    fn gen_buffers(&mut self, buffers: &mut [GLuint]) {
        self.generate(buffers);
        self.record("gen_buffers", vec![Arg::Names(buffers.to_vec())]);
    }

    fn gen_framebuffers(&mut self, framebuffers: &mut [GLuint]) {
        self.generate(framebuffers);
        self.record("gen_framebuffers", vec![Arg::Names(framebuffers.to_vec())]);
    }

    fn gen_renderbuffers(&mut self, renderbuffers: &mut [GLuint]) {
        self.generate(renderbuffers);
        self.record("gen_renderbuffers", vec![Arg::Names(renderbuffers.to_vec())]);
    }

    fn gen_queries(&mut self, queries: &mut [GLuint]) {
        self.generate(queries);
        self.record("gen_queries", vec![Arg::Names(queries.to_vec())]);
    }

    fn gen_lists(&mut self, range: GLsizei) -> GLuint {
        let first = self.generate_range(range);
        self.record("gen_lists", vec![range.into()]);
        first
    }

    fn create_program(&mut self) -> GLuint {
        let name = self.generate_range(1);
        self.record("create_program", Vec::new());
        name
    }

    fn create_shader(&mut self, kind: GLenum) -> GLuint {
        let name = self.generate_range(1);
        self.record("create_shader", vec![kind.into()]);
        name
    }

    fn new_quadric(&mut self) -> GLuint {
        let name = self.generate_range(1);
        self.record("new_quadric", Vec::new());
        name
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::{enums::*, ClientArray, GlBackend};

    use super::{Arg, CapturedArray, DrawIndices, RecordingBackend};

    #[test]
    fn records_calls_in_order() {
        let mut gl = RecordingBackend::new();
        gl.enable(BLEND);
        gl.color_4f(1.0, 0.5, 0.25, 1.0);
        gl.disable(BLEND);
        assert_eq!(vec!["enable", "color_4f", "disable"], gl.call_names());
        assert_eq!(
            vec![Arg::Float(1.0), Arg::Float(0.5), Arg::Float(0.25), Arg::Float(1.0)],
            gl.calls[1].args
        );
    }

    #[test]
    fn queries_see_earlier_state_changes() {
        let mut gl = RecordingBackend::new();
        assert_eq!(FALSE, gl.is_enabled(DEPTH_TEST));
        gl.enable(DEPTH_TEST);
        assert_eq!(TRUE, gl.is_enabled(DEPTH_TEST));
        gl.line_width(3.0);
        let mut width = [0.0];
        gl.get_float_v(LINE_WIDTH, &mut width);
        assert_eq!([3.0], width);
    }

    #[test]
    fn generated_names_are_unique_and_nonzero() {
        let mut gl = RecordingBackend::new();
        let mut textures = [0; 3];
        gl.gen_textures(&mut textures);
        let list = gl.gen_lists(4);
        let program = gl.create_program();
        assert_eq!([1, 2, 3], textures);
        assert_eq!(4, list);
        assert_eq!(8, program);
        assert_eq!(TRUE, gl.is_texture(2));
        gl.fail_generation = true;
        assert_eq!(0, gl.create_shader(VERTEX_SHADER));
    }

    #[test]
    fn draws_capture_client_memory() {
        let mut gl = RecordingBackend::new();
        let positions: [u8; 8] = [10, 11, 20, 21, 30, 31, 40, 41];
        let indices: [u16; 3] = [3, 0, 1];
        gl.enable_client_state(VERTEX_ARRAY);
        gl.vertex_pointer(2, UNSIGNED_BYTE, 0, positions.as_ptr().cast());
        // Safety: the pointers point to arrays of the right size.
        unsafe {
            gl.draw_arrays(TRIANGLES, 1, 2);
            gl.draw_elements(TRIANGLES, 3, UNSIGNED_SHORT, indices.as_ptr().cast());
        }

        let arrays = &gl.draws[0];
        assert_eq!(
            Some(&CapturedArray::Client(vec![20, 21, 30, 31])),
            arrays.array(ClientArray::Vertex)
        );
        let elements = &gl.draws[1];
        assert_eq!(DrawIndices::Client(vec![3, 0, 1]), elements.indices);
        assert_eq!(
            Some(&CapturedArray::Client(vec![40, 41, 10, 11, 20, 21])),
            elements.array(ClientArray::Vertex)
        );
    }

    #[test]
    fn buffer_sourced_arrays_are_offsets() {
        let mut gl = RecordingBackend::new();
        gl.bind_buffer(ARRAY_BUFFER, 5);
        gl.enable_client_state(VERTEX_ARRAY);
        gl.vertex_pointer(3, FLOAT, 24, 12usize as *const _);
        // Safety: no client memory is read.
        unsafe { gl.draw_arrays(TRIANGLES, 0, 3) };
        assert_eq!(
            Some(&CapturedArray::Buffer {
                buffer: 5,
                offset: 12,
                stride: 24
            }),
            gl.draws[0].array(ClientArray::Vertex)
        );
    }
}
