//! The worker side of a [`Gml`] context.
//!
//! A [`Producer`] implements [`GlBackend`] by encoding every call into its
//! queue instead of making it. Calls that return nothing return right away.
//! Calls that return a value publish the queue and wait for the server to
//! execute it, unless the answer is known without asking: cached parameters,
//! optimistic statuses, and object names, which come from the pools in
//! [`GraphicsObjectAllocator`](crate::GraphicsObjectAllocator).

use core::{convert::Infallible, ffi::c_void, mem::size_of, sync::atomic::Ordering};
use std::{fmt::Display, sync::Arc};

use bytemuck::Pod;
use gl_backend::{
    enums::*, formats, ClientArray, GLboolean, GLenum, GLfloat, GLint, GLintptr, GLsizei,
    GLsizeiptr, GLuint, GlBackend,
};

use crate::{
    allocator::ObjectKind,
    client_state::{ArraySlot, ClientState},
    opcode::Opcode,
    queue::WriteToken,
    record::{RecordWriter, RETURNS_VALUE},
    registry::{Gml, Role},
    snapshot::{encode_draw, Draw, IndexRange},
    GmlError,
};

/// Appends records to one queue, holding on to its write buffer between
/// calls.
struct QueueWriter {
    gml: Arc<Gml>,
    thread_number: usize,
    token: Option<WriteToken>,
}

impl QueueWriter {
    fn record(&mut self, opcode: Opcode, encode: impl FnOnce(&mut RecordWriter)) {
        self.record_flagged(opcode, 0, encode);
    }

    fn record_flagged(&mut self, opcode: Opcode, flags: u16, encode: impl FnOnce(&mut RecordWriter)) {
        let result = self.try_record(opcode, flags, |writer| {
            encode(writer);
            Ok::<(), Infallible>(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Writes one record. If `encode` fails, the partial record is removed
    /// and the error returned.
    fn try_record<E>(
        &mut self,
        opcode: Opcode,
        flags: u16,
        encode: impl FnOnce(&mut RecordWriter) -> Result<(), E>,
    ) -> Result<(), E> {
        let max_bytes = self.gml.config().max_queue_bytes;
        let queue = self.gml.queue(self.thread_number);
        if self.token.is_none() {
            self.token = queue.acquire_write(true, self.gml.shutdown_flag());
        }
        let Some(token) = self.token.as_mut() else {
            tracing::trace!("dropped a {} call after shutdown", opcode.name());
            return Ok(());
        };
        let bytes = queue.write_bytes(token);
        let mut writer = RecordWriter::begin(bytes, opcode, flags, max_bytes);
        if let Err(err) = encode(&mut writer) {
            writer.cancel();
            return Err(err);
        }
        writer.finish();
        if bytes.len() >= max_bytes {
            self.submit();
        }
        Ok(())
    }

    /// Publishes the write buffer, if there is one.
    fn submit(&mut self) {
        if let Some(token) = self.token.take() {
            let queue = self.gml.queue(self.thread_number);
            queue.release_write(token, false, self.gml.shutdown_flag());
        }
    }

    /// Writes a value-returning record, publishes it, and waits for the
    /// server to post the result.
    fn rendezvous(
        &mut self,
        opcode: Opcode,
        encode: impl FnOnce(&mut RecordWriter),
    ) -> Result<Vec<u8>, GmlError> {
        self.record_flagged(opcode, RETURNS_VALUE, encode);
        let shutdown = self.gml.shutdown_flag();
        let queue = self.gml.queue(self.thread_number);
        if let Some(token) = self.token.take() {
            queue.release_write(token, true, shutdown);
        }
        queue.sync.request();
        queue.sync.wait(shutdown)
    }

    /// A rendezvous for a single plain value. Returns the default value if
    /// the server shut down.
    fn query<T: Pod + Default>(&mut self, opcode: Opcode, encode: impl FnOnce(&mut RecordWriter)) -> T {
        match self.rendezvous(opcode, encode) {
            Ok(result) => match bytemuck::try_pod_read_unaligned(&result) {
                Ok(value) => value,
                Err(_) => {
                    tracing::error!(
                        "{} returned {} bytes instead of {}",
                        opcode.name(),
                        result.len(),
                        size_of::<T>()
                    );
                    T::default()
                }
            },
            Err(err) => {
                aborted(opcode, &err);
                T::default()
            }
        }
    }
}

fn aborted(opcode: Opcode, err: &GmlError) {
    tracing::warn!("{} returns a default value: {err}", opcode.name());
}

/// The first `count` values of `values`, or all of them if there are fewer.
fn leading<T>(values: &[T], count: usize) -> &[T] {
    &values[..count.min(values.len())]
}

fn count_of(count: GLsizei) -> usize {
    usize::try_from(count).unwrap_or(0)
}

/// Copies a result posted as an array of `T` into `out`.
fn copy_result<T: Pod>(result: &[u8], out: &mut [T]) {
    let values: Vec<T> = bytemuck::pod_collect_to_vec(result);
    for (out, value) in out.iter_mut().zip(values) {
        *out = value;
    }
}

/// A thread's handle for deferring graphics calls to the [`Server`].
///
/// Created with [`Gml::producer`] or [`Gml::aux_producer`]. Calls are
/// published to the server in batches: when [`Producer::submit`] or
/// [`Producer::sync`] is called, when a call needs a result, when the queue
/// buffer reaches [`GmlConfig::max_queue_bytes`], and when the producer is
/// dropped.
///
/// [`Server`]: crate::Server
/// [`GmlConfig::max_queue_bytes`]: crate::GmlConfig::max_queue_bytes
pub struct Producer {
    writer: QueueWriter,
    role: Role,
    client: ClientState,
}

impl Producer {
    pub(crate) fn new(gml: Arc<Gml>, role: Role, thread_number: usize) -> Producer {
        Producer {
            writer: QueueWriter {
                gml,
                thread_number,
                token: None,
            },
            role,
            client: ClientState::default(),
        }
    }

    /// Whether this is a worker or the auxiliary producer.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The number of the queue this producer writes to.
    pub fn thread_number(&self) -> usize {
        self.writer.thread_number
    }

    #[allow(missing_docs)]
    pub fn gml(&self) -> &Arc<Gml> {
        &self.writer.gml
    }

    /// Hands the calls made so far over to the server without waiting for
    /// them to be executed.
    pub fn submit(&mut self) {
        self.writer.submit();
    }

    /// Waits until the server has executed every call made so far.
    pub fn sync(&mut self) -> Result<(), GmlError> {
        self.writer.rendezvous(Opcode::Nop, |_| {}).map(|_| ())
    }

    fn config(&self) -> &crate::GmlConfig {
        self.writer.gml.config()
    }

    fn log_aux_request(&self, what: impl Display) {
        if self.role == Role::Aux && self.config().call_debug {
            tracing::error!("the simulation thread requested a {what} name");
        }
    }

    fn gen_names(&mut self, kind: ObjectKind, names: &mut [GLuint]) {
        self.log_aux_request(format_args!("{kind:?}"));
        let gml = &self.writer.gml;
        if let Err(err) = gml.allocator().request_many(kind, names, gml.shutdown_flag()) {
            tracing::warn!("{kind:?} names are not available: {err}");
            names.fill(0);
        }
    }

    fn gen_name(&mut self, kind: ObjectKind) -> GLuint {
        let mut name = [0];
        self.gen_names(kind, &mut name);
        name[0]
    }

    fn float_array(&mut self, opcode: Opcode, target: GLenum, pname: GLenum, params: &[GLfloat]) {
        self.writer.record(opcode, |writer| {
            writer.put(target);
            writer.put(pname);
            writer.put_slice(params);
        });
    }

    fn uniform_array(
        &mut self,
        opcode: Opcode,
        location: GLint,
        count: GLsizei,
        transpose: GLboolean,
        value: &[GLfloat],
    ) {
        self.writer.record(opcode, |writer| {
            writer.put(location);
            writer.put(count);
            writer.put(transpose);
            writer.put_slice(value);
        });
    }

    fn names(&mut self, opcode: Opcode, names: &[GLuint]) {
        self.writer.record(opcode, |writer| writer.put_slice(names));
    }

    fn string_query(&mut self, opcode: Opcode, encode: impl FnOnce(&mut RecordWriter)) -> String {
        match self.writer.rendezvous(opcode, encode) {
            Ok(result) => String::from_utf8_lossy(&result).into_owned(),
            Err(err) => {
                aborted(opcode, &err);
                String::new()
            }
        }
    }

    /// Snapshots and defers a draw call.
    ///
    /// ### Safety
    ///
    /// See [`encode_draw`].
    unsafe fn draw(&mut self, opcode: Opcode, draw: Draw) {
        let client = &self.client;
        let result = self.writer.try_record(opcode, 0, |writer| {
            // Safety: forwarded to the caller.
            unsafe { encode_draw(writer, client, draw) }
        });
        if let Err(err) = result {
            tracing::error!("dropped a {} call that can't be deferred: {err:?}", opcode.name());
        }
    }

    fn set_pointer(&mut self, slot: ArraySlot, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.client.set_pointer(slot, size, ty, FALSE, stride, pointer);
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.writer.submit();
        let queue = self.writer.gml.queue(self.writer.thread_number);
        queue.claimed.store(false, Ordering::Release);
        tracing::debug!("released queue {}", self.writer.thread_number);
    }
}

macro_rules! impl_deferred_commands {
    (
        fixed { $($op:ident => fn $name:ident($($arg:ident: $ty:ty),*);)* }
        query { $($qop:ident => fn $qname:ident($($qarg:ident: $qty:ty),*) -> $ret:ty;)* }
        special { $($sop:ident,)* }
    ) => {
        $(
            fn $name(&mut self, $($arg: $ty),*) {
                self.writer.record(Opcode::$op, |_writer| {
                    $(_writer.put::<$ty>($arg);)*
                });
            }
        )*
        $(
            fn $qname(&mut self, $($qarg: $qty),*) -> $ret {
                self.writer.query(Opcode::$qop, |_writer| {
                    $(_writer.put::<$qty>($qarg);)*
                })
            }
        )*
    };
}

impl GlBackend for Producer {
    gl_backend::for_each_gl_command!(impl_deferred_commands);

    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        self.client.bind_buffer(target, buffer);
        self.writer.record(Opcode::BindBuffer, |writer| {
            writer.put(target);
            writer.put(buffer);
        });
    }

    fn enable_client_state(&mut self, array: GLenum) {
        self.client.set_enabled(array, true);
        self.writer.record(Opcode::EnableClientState, |writer| writer.put(array));
    }

    fn disable_client_state(&mut self, array: GLenum) {
        self.client.set_enabled(array, false);
        self.writer.record(Opcode::DisableClientState, |writer| writer.put(array));
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.client.set_attrib_enabled(index, true);
        self.writer.record(Opcode::EnableVertexAttribArray, |writer| writer.put(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.client.set_attrib_enabled(index, false);
        self.writer.record(Opcode::DisableVertexAttribArray, |writer| writer.put(index));
    }

    fn light_fv(&mut self, light: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_light_material(pname));
        self.float_array(Opcode::Lightfv, light, pname, params);
    }

    fn material_fv(&mut self, face: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_light_material(pname));
        self.float_array(Opcode::Materialfv, face, pname, params);
    }

    fn fog_fv(&mut self, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_fog(pname));
        self.writer.record(Opcode::Fogfv, |writer| {
            writer.put(pname);
            writer.put_slice(params);
        });
    }

    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_tex_parameter(pname));
        self.float_array(Opcode::TexParameterfv, target, pname, params);
    }

    fn tex_env_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_tex_env(pname));
        self.float_array(Opcode::TexEnvfv, target, pname, params);
    }

    fn light_model_fv(&mut self, pname: GLenum, params: &[GLfloat]) {
        let params = leading(params, formats::num_args_light_model(pname));
        self.writer.record(Opcode::LightModelfv, |writer| {
            writer.put(pname);
            writer.put_slice(params);
        });
    }

    fn mult_matrix_f(&mut self, m: &[GLfloat; 16]) {
        self.writer.record(Opcode::MultMatrixf, |writer| writer.put(*m));
    }

    fn load_matrix_f(&mut self, m: &[GLfloat; 16]) {
        self.writer.record(Opcode::LoadMatrixf, |writer| writer.put(*m));
    }

    fn uniform_1fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]) {
        let value = leading(value, count_of(count));
        self.uniform_array(Opcode::Uniform1fv, location, count, FALSE, value);
    }

    fn uniform_4fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]) {
        let value = leading(value, 4 * count_of(count));
        self.uniform_array(Opcode::Uniform4fv, location, count, FALSE, value);
    }

    fn uniform_matrix_2fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = leading(value, 4 * count_of(count));
        self.uniform_array(Opcode::UniformMatrix2fv, location, count, transpose, value);
    }

    fn uniform_matrix_3fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = leading(value, 9 * count_of(count));
        self.uniform_array(Opcode::UniformMatrix3fv, location, count, transpose, value);
    }

    fn uniform_matrix_4fv(&mut self, location: GLint, count: GLsizei, transpose: GLboolean, value: &[GLfloat]) {
        let value = leading(value, 16 * count_of(count));
        self.uniform_array(Opcode::UniformMatrix4fv, location, count, transpose, value);
    }

    fn delete_textures(&mut self, textures: &[GLuint]) {
        self.names(Opcode::DeleteTextures, textures);
    }

    fn delete_buffers(&mut self, buffers: &[GLuint]) {
        self.names(Opcode::DeleteBuffers, buffers);
    }

    fn delete_framebuffers(&mut self, framebuffers: &[GLuint]) {
        self.names(Opcode::DeleteFramebuffers, framebuffers);
    }

    fn delete_renderbuffers(&mut self, renderbuffers: &[GLuint]) {
        self.names(Opcode::DeleteRenderbuffers, renderbuffers);
    }

    fn delete_queries(&mut self, queries: &[GLuint]) {
        self.names(Opcode::DeleteQueries, queries);
    }

    fn draw_buffers(&mut self, buffers: &[GLenum]) {
        self.names(Opcode::DrawBuffers, buffers);
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
        self.writer.record(Opcode::TexImage1D, |writer| {
            writer.put(target);
            writer.put(level);
            writer.put(internal_format);
            writer.put(width);
            writer.put(border);
            writer.put(format);
            writer.put(ty);
            writer.put_optional_slice(pixels.map(|pixels| leading(pixels, size)));
        });
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
        self.writer.record(Opcode::TexImage2D, |writer| {
            writer.put(target);
            writer.put(level);
            writer.put(internal_format);
            writer.put(width);
            writer.put(height);
            writer.put(border);
            writer.put(format);
            writer.put(ty);
            writer.put_optional_slice(pixels.map(|pixels| leading(pixels, size)));
        });
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
        self.writer.record(Opcode::TexImage3D, |writer| {
            writer.put(target);
            writer.put(level);
            writer.put(internal_format);
            writer.put(width);
            writer.put(height);
            writer.put(depth);
            writer.put(border);
            writer.put(format);
            writer.put(ty);
            writer.put_optional_slice(pixels.map(|pixels| leading(pixels, size)));
        });
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
        let pixels = leading(pixels, formats::image_size(width, height, 1, format, ty));
        self.writer.record(Opcode::TexSubImage2D, |writer| {
            writer.put(target);
            writer.put(level);
            writer.put(xoffset);
            writer.put(yoffset);
            writer.put(width);
            writer.put(height);
            writer.put(format);
            writer.put(ty);
            writer.put_slice(pixels);
        });
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
        self.writer.record(Opcode::CompressedTexImage2D, |writer| {
            writer.put(target);
            writer.put(level);
            writer.put(internal_format);
            writer.put(width);
            writer.put(height);
            writer.put(border);
            writer.put_slice(data);
        });
    }

    /// Deferred like any other upload, so the error code of the real call is
    /// not available, and 0 (success) is returned.
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
        let data = leading(data, formats::image_size(width, height, 1, format, ty));
        self.writer.record(Opcode::Build2DMipmaps, |writer| {
            writer.put(target);
            writer.put(internal_format);
            writer.put(width);
            writer.put(height);
            writer.put(format);
            writer.put(ty);
            writer.put_slice(data);
        });
        0
    }

    fn buffer_data(&mut self, target: GLenum, size: GLsizeiptr, data: Option<&[u8]>, usage: GLenum) {
        let len = usize::try_from(size).unwrap_or(0);
        self.writer.record(Opcode::BufferData, |writer| {
            writer.put(target);
            writer.put(size);
            writer.put(usage);
            writer.put_optional_slice(data.map(|data| leading(data, len)));
        });
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: GLintptr, data: &[u8]) {
        self.writer.record(Opcode::BufferSubData, |writer| {
            writer.put(target);
            writer.put(offset);
            writer.put_slice(data);
        });
    }

    /// The control points are packed, so the server is called with a stride
    /// of [`formats::num_args_map1`]`(target)`.
    fn map_1f(
        &mut self,
        target: GLenum,
        u1: GLfloat,
        u2: GLfloat,
        stride: GLint,
        order: GLint,
        points: &[GLfloat],
    ) {
        let per_point = formats::num_args_map1(target);
        let stride = usize::try_from(stride).unwrap_or(0);
        let order_len = usize::try_from(order).unwrap_or(0);
        let mut packed = Vec::with_capacity(per_point * order_len);
        for point in 0..order_len {
            let start = point * stride;
            if let Some(values) = points.get(start..start + per_point) {
                packed.extend_from_slice(values);
            }
        }
        self.writer.record(Opcode::Map1f, |writer| {
            writer.put(target);
            writer.put(u1);
            writer.put(u2);
            writer.put(order);
            writer.put_slice(&packed);
        });
    }

    fn shader_source(&mut self, shader: GLuint, sources: &[&str]) {
        self.writer.record(Opcode::ShaderSource, |writer| {
            writer.put(shader);
            writer.put(sources.len() as u32);
            for source in sources {
                writer.put_str(source);
            }
        });
    }

    fn vertex_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::Vertex), size, ty, stride, pointer);
    }

    fn color_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::Color), size, ty, stride, pointer);
    }

    fn tex_coord_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::TexCoord), size, ty, stride, pointer);
    }

    fn normal_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::Normal), 3, ty, stride, pointer);
    }

    fn index_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::Index), 1, ty, stride, pointer);
    }

    fn edge_flag_pointer(&mut self, stride: GLsizei, pointer: *const c_void) {
        self.set_pointer(ArraySlot::Client(ClientArray::EdgeFlag), 1, UNSIGNED_BYTE, stride, pointer);
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
        let slot = ArraySlot::Attrib(index);
        self.client.set_pointer(slot, size, ty, normalized, stride, pointer);
    }

    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        // Safety: the caller upholds the contract of draw_arrays, which is
        // what encode_draw needs.
        unsafe { self.draw(Opcode::DrawArrays, Draw::Arrays { mode, first, count }) };
    }

    unsafe fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, indices: *const c_void) {
        let draw = Draw::Elements {
            mode,
            count,
            ty,
            indices,
            range: None,
        };
        // Safety: as in draw_arrays.
        unsafe { self.draw(Opcode::DrawElements, draw) };
    }

    unsafe fn draw_range_elements(
        &mut self,
        mode: GLenum,
        start: GLuint,
        end: GLuint,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
    ) {
        let draw = Draw::Elements {
            mode,
            count,
            ty,
            indices,
            range: Some(IndexRange { start, end }),
        };
        // Safety: as in draw_arrays.
        unsafe { self.draw(Opcode::DrawRangeElements, draw) };
    }

    fn get_error(&mut self) -> GLenum {
        if self.config().assume_no_error {
            return NO_ERROR;
        }
        self.writer.query(Opcode::GetError, |_| {})
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        if self.config().optimistic_status {
            return FRAMEBUFFER_COMPLETE;
        }
        self.writer.query(Opcode::CheckFramebufferStatus, |writer| writer.put(target))
    }

    fn get_integer_v(&mut self, pname: GLenum, params: &mut [GLint]) {
        let gml = &self.writer.gml;
        if gml.cache().is_some_and(|cache| cache.integers(pname, params)) {
            return;
        }
        let count = params.len() as u32;
        let result = self.writer.rendezvous(Opcode::GetIntegerv, |writer| {
            writer.put(pname);
            writer.put(count);
        });
        match result {
            Ok(result) => copy_result(&result, params),
            Err(err) => aborted(Opcode::GetIntegerv, &err),
        }
    }

    fn get_float_v(&mut self, pname: GLenum, params: &mut [GLfloat]) {
        let gml = &self.writer.gml;
        if gml.cache().is_some_and(|cache| cache.floats(pname, params)) {
            return;
        }
        let count = params.len() as u32;
        let result = self.writer.rendezvous(Opcode::GetFloatv, |writer| {
            writer.put(pname);
            writer.put(count);
        });
        match result {
            Ok(result) => copy_result(&result, params),
            Err(err) => aborted(Opcode::GetFloatv, &err),
        }
    }

    fn get_string(&mut self, name: GLenum) -> String {
        if let Some(value) = self.writer.gml.cache().and_then(|cache| cache.string(name)) {
            return String::from(value);
        }
        self.string_query(Opcode::GetString, |writer| writer.put(name))
    }

    fn get_shader_iv(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        if pname == COMPILE_STATUS && self.config().optimistic_status {
            return GLint::from(TRUE);
        }
        self.writer.query(Opcode::GetShaderiv, |writer| {
            writer.put(shader);
            writer.put(pname);
        })
    }

    fn get_program_iv(&mut self, program: GLuint, pname: GLenum) -> GLint {
        if pname == LINK_STATUS && self.config().optimistic_status {
            return GLint::from(TRUE);
        }
        self.writer.query(Opcode::GetProgramiv, |writer| {
            writer.put(program);
            writer.put(pname);
        })
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        self.string_query(Opcode::GetShaderInfoLog, |writer| writer.put(shader))
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        self.string_query(Opcode::GetProgramInfoLog, |writer| writer.put(program))
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.writer.query(Opcode::GetUniformLocation, |writer| {
            writer.put(program);
            writer.put_str(name);
        })
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.writer.query(Opcode::GetAttribLocation, |writer| {
            writer.put(program);
            writer.put_str(name);
        })
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
        let len = pixels.len() as u32;
        let result = self.writer.rendezvous(Opcode::ReadPixels, |writer| {
            writer.put(x);
            writer.put(y);
            writer.put(width);
            writer.put(height);
            writer.put(format);
            writer.put(ty);
            writer.put(len);
        });
        match result {
            Ok(result) => copy_result(&result, pixels),
            Err(err) => aborted(Opcode::ReadPixels, &err),
        }
    }

    fn gen_textures(&mut self, textures: &mut [GLuint]) {
        self.gen_names(ObjectKind::Texture, textures);
    }

    fn gen_buffers(&mut self, buffers: &mut [GLuint]) {
        self.gen_names(ObjectKind::Buffer, buffers);
    }

    fn gen_framebuffers(&mut self, framebuffers: &mut [GLuint]) {
        self.gen_names(ObjectKind::Framebuffer, framebuffers);
    }

    fn gen_renderbuffers(&mut self, renderbuffers: &mut [GLuint]) {
        self.gen_names(ObjectKind::Renderbuffer, renderbuffers);
    }

    fn gen_queries(&mut self, queries: &mut [GLuint]) {
        self.gen_names(ObjectKind::Query, queries);
    }

    /// Names in excess of `range` that came with the pooled range are
    /// deleted with a deferred `delete_lists`.
    fn gen_lists(&mut self, range: GLsizei) -> GLuint {
        self.log_aux_request("display list");
        let gml = &self.writer.gml;
        let mut excess = Vec::new();
        let first = gml.allocator().request_lists(
            range,
            |name, count| excess.push((name, count)),
            gml.shutdown_flag(),
        );
        for (name, count) in excess {
            self.delete_lists(name, count);
        }
        first.unwrap_or_else(|err| {
            tracing::warn!("display list names are not available: {err}");
            0
        })
    }

    fn create_program(&mut self) -> GLuint {
        self.gen_name(ObjectKind::Program)
    }

    fn create_shader(&mut self, kind: GLenum) -> GLuint {
        let kind = match kind {
            VERTEX_SHADER => ObjectKind::VertexShader,
            FRAGMENT_SHADER => ObjectKind::FragmentShader,
            GEOMETRY_SHADER => ObjectKind::GeometryShader,
            _ => {
                tracing::warn!("can't create a shader of kind {kind:#x}");
                return 0;
            }
        };
        self.gen_name(kind)
    }

    fn new_quadric(&mut self) -> GLuint {
        self.gen_name(ObjectKind::Quadric)
    }
}
