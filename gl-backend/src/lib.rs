// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! This crate mainly revolves around the [`GlBackend`] trait, the graphics API
//! surface that the `gml` crate defers calls to. A real implementation wraps
//! an OpenGL context and is only ever used from the thread that owns it.
//!
//! This is split off of the `gml` crate so that the API surface and the
//! deferral machinery can be compiled independently, and so that the command
//! table ([`for_each_gl_command`]) has a single home that both the trait and
//! the deferral code are generated from.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

mod client_array;
pub mod commands;
pub mod formats;
pub mod recording;
mod types;

use alloc::string::String;
use core::ffi::c_void;

pub use client_array::{effective_stride, read_indices, ClientArray};
pub use recording::RecordingBackend;
pub use types::*;

macro_rules! declare_backend_methods {
    (
        fixed { $($op:ident => fn $name:ident($($arg:ident: $ty:ty),*);)* }
        query { $($qop:ident => fn $qname:ident($($qarg:ident: $qty:ty),*) -> $ret:ty;)* }
        special { $($sop:ident,)* }
    ) => {
        $(
            #[allow(missing_docs)]
            fn $name(&mut self, $($arg: $ty),*);
        )*
        $(
            #[allow(missing_docs)]
            fn $qname(&mut self, $($qarg: $qty),*) -> $ret;
        )*
    };
}

/// The wrapped graphics API.
///
/// Method names follow the underlying entry points (`glBindTexture` is
/// [`GlBackend::bind_texture`]), with (count, pointer) argument pairs folded
/// into slices and out-parameters into return values or `&mut` slices. The
/// pointer arguments of the client-array setters are kept as raw pointers,
/// since the memory they point to is only read when a draw call is made.
///
/// Everything that takes only plain values is generated from
/// [`for_each_gl_command`].
pub trait GlBackend {
    crate::for_each_gl_command!(declare_backend_methods);

    /// Binds `buffer` to `target`. `ARRAY_BUFFER` and `ELEMENT_ARRAY_BUFFER`
    /// bindings change how the pointer arguments of the client-array setters
    /// and [`GlBackend::draw_elements`] are interpreted: as offsets into the
    /// bound buffer instead of as client memory.
    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint);
    /// Enables one of the [`ClientArray`]s.
    fn enable_client_state(&mut self, array: GLenum);
    /// Disables one of the [`ClientArray`]s.
    fn disable_client_state(&mut self, array: GLenum);
    /// Enables the generic vertex attribute array at `index`.
    fn enable_vertex_attrib_array(&mut self, index: GLuint);
    /// Disables the generic vertex attribute array at `index`.
    fn disable_vertex_attrib_array(&mut self, index: GLuint);

    /// Reads [`formats::num_args_light_material`] values from `params`.
    fn light_fv(&mut self, light: GLenum, pname: GLenum, params: &[GLfloat]);
    /// Reads [`formats::num_args_light_material`] values from `params`.
    fn material_fv(&mut self, face: GLenum, pname: GLenum, params: &[GLfloat]);
    /// Reads [`formats::num_args_fog`] values from `params`.
    fn fog_fv(&mut self, pname: GLenum, params: &[GLfloat]);
    /// Reads [`formats::num_args_tex_parameter`] values from `params`.
    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]);
    /// Reads [`formats::num_args_tex_env`] values from `params`.
    fn tex_env_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat]);
    /// Reads [`formats::num_args_light_model`] values from `params`.
    fn light_model_fv(&mut self, pname: GLenum, params: &[GLfloat]);
    #[allow(missing_docs)]
    fn mult_matrix_f(&mut self, m: &[GLfloat; 16]);
    #[allow(missing_docs)]
    fn load_matrix_f(&mut self, m: &[GLfloat; 16]);
    /// Reads `count` values from `value`.
    fn uniform_1fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]);
    /// Reads `4 * count` values from `value`.
    fn uniform_4fv(&mut self, location: GLint, count: GLsizei, value: &[GLfloat]);
    /// Reads `4 * count` values from `value`.
    fn uniform_matrix_2fv(
        &mut self,
        location: GLint,
        count: GLsizei,
        transpose: GLboolean,
        value: &[GLfloat],
    );
    /// Reads `9 * count` values from `value`.
    fn uniform_matrix_3fv(
        &mut self,
        location: GLint,
        count: GLsizei,
        transpose: GLboolean,
        value: &[GLfloat],
    );
    /// Reads `16 * count` values from `value`.
    fn uniform_matrix_4fv(
        &mut self,
        location: GLint,
        count: GLsizei,
        transpose: GLboolean,
        value: &[GLfloat],
    );

    #[allow(missing_docs)]
    fn delete_textures(&mut self, textures: &[GLuint]);
    #[allow(missing_docs)]
    fn delete_buffers(&mut self, buffers: &[GLuint]);
    #[allow(missing_docs)]
    fn delete_framebuffers(&mut self, framebuffers: &[GLuint]);
    #[allow(missing_docs)]
    fn delete_renderbuffers(&mut self, renderbuffers: &[GLuint]);
    #[allow(missing_docs)]
    fn delete_queries(&mut self, queries: &[GLuint]);
    #[allow(missing_docs)]
    fn draw_buffers(&mut self, buffers: &[GLenum]);

    /// Reads [`formats::image_size`]`(width, 1, 1, format, ty)` bytes from
    /// `pixels`, if any.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// Reads [`formats::image_size`]`(width, height, 1, format, ty)` bytes
    /// from `pixels`, if any.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// Reads [`formats::image_size`]`(width, height, depth, format, ty)`
    /// bytes from `pixels`, if any.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// Reads [`formats::image_size`]`(width, height, 1, format, ty)` bytes
    /// from `pixels`.
    #[allow(clippy::too_many_arguments)]
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
    );
    /// The image size is `data.len()`.
    #[allow(clippy::too_many_arguments)]
    fn compressed_tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        border: GLint,
        data: &[u8],
    );
    /// `gluBuild2DMipmaps`: reads [`formats::image_size`]`(width, height, 1,
    /// format, ty)` bytes from `data`.
    #[allow(clippy::too_many_arguments)]
    fn build_2d_mipmaps(
        &mut self,
        target: GLenum,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    ) -> GLint;
    /// Reads `size` bytes from `data`, if any.
    fn buffer_data(&mut self, target: GLenum, size: GLsizeiptr, data: Option<&[u8]>, usage: GLenum);
    #[allow(missing_docs)]
    fn buffer_sub_data(&mut self, target: GLenum, offset: GLintptr, data: &[u8]);
    /// Reads `order` control points of [`formats::num_args_map1`]`(target)`
    /// values each from `points`, with consecutive points `stride` values
    /// apart.
    fn map_1f(
        &mut self,
        target: GLenum,
        u1: GLfloat,
        u2: GLfloat,
        stride: GLint,
        order: GLint,
        points: &[GLfloat],
    );
    /// Replaces the source of `shader` with the concatenation of `sources`.
    fn shader_source(&mut self, shader: GLuint, sources: &[&str]);

    /// Sets the vertex array pointer. See [`GlBackend::draw_arrays`] for when
    /// the pointer is read.
    fn vertex_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void);
    /// Sets the color array pointer.
    fn color_pointer(&mut self, size: GLint, ty: GLenum, stride: GLsizei, pointer: *const c_void);
    /// Sets the texture coordinate array pointer.
    fn tex_coord_pointer(
        &mut self,
        size: GLint,
        ty: GLenum,
        stride: GLsizei,
        pointer: *const c_void,
    );
    /// Sets the normal array pointer.
    fn normal_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void);
    /// Sets the color index array pointer.
    fn index_pointer(&mut self, ty: GLenum, stride: GLsizei, pointer: *const c_void);
    /// Sets the edge flag array pointer.
    fn edge_flag_pointer(&mut self, stride: GLsizei, pointer: *const c_void);
    /// Sets the pointer of the generic vertex attribute array at `index`.
    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: GLboolean,
        stride: GLsizei,
        pointer: *const c_void,
    );

    /// Draws `count` vertices starting from `first` using the enabled arrays.
    ///
    /// ### Safety
    ///
    /// Every enabled array whose pointer was set while no `ARRAY_BUFFER` was
    /// bound must point to memory valid for reads of elements `first` through
    /// `first + count - 1`, at the stride it was set with.
    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei);
    /// Draws `count` vertices whose indices are read from `indices`, or from
    /// the bound `ELEMENT_ARRAY_BUFFER` at the offset `indices` if one is
    /// bound.
    ///
    /// ### Safety
    ///
    /// Without a bound `ELEMENT_ARRAY_BUFFER`, `indices` must point to `count`
    /// indices of type `ty`. Every enabled client array (see
    /// [`GlBackend::draw_arrays`]) must be valid for reads of every element
    /// referenced by those indices.
    unsafe fn draw_elements(
        &mut self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
    );
    /// Like [`GlBackend::draw_elements`], with the hint that all indices are
    /// between `start` and `end`.
    ///
    /// ### Safety
    ///
    /// See [`GlBackend::draw_elements`].
    unsafe fn draw_range_elements(
        &mut self,
        mode: GLenum,
        start: GLuint,
        end: GLuint,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
    );

    /// Returns and clears the oldest recorded error.
    fn get_error(&mut self) -> GLenum;
    #[allow(missing_docs)]
    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum;
    /// Writes as many values as `pname` has into `params`.
    fn get_integer_v(&mut self, pname: GLenum, params: &mut [GLint]);
    /// Writes as many values as `pname` has into `params`.
    fn get_float_v(&mut self, pname: GLenum, params: &mut [GLfloat]);
    #[allow(missing_docs)]
    fn get_string(&mut self, name: GLenum) -> String;
    #[allow(missing_docs)]
    fn get_shader_iv(&mut self, shader: GLuint, pname: GLenum) -> GLint;
    #[allow(missing_docs)]
    fn get_program_iv(&mut self, program: GLuint, pname: GLenum) -> GLint;
    #[allow(missing_docs)]
    fn get_shader_info_log(&mut self, shader: GLuint) -> String;
    #[allow(missing_docs)]
    fn get_program_info_log(&mut self, program: GLuint) -> String;
    #[allow(missing_docs)]
    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint;
    #[allow(missing_docs)]
    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint;
    /// Reads back `width * height` pixels into `pixels`.
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: GLint,
        y: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: &mut [u8],
    );

    /// Fills `textures` with new texture names. A name of 0 means the
    /// generation failed.
    fn gen_textures(&mut self, textures: &mut [GLuint]);
    /// Fills `buffers` with new buffer names.
    fn gen_buffers(&mut self, buffers: &mut [GLuint]);
    /// Fills `framebuffers` with new framebuffer names.
    fn gen_framebuffers(&mut self, framebuffers: &mut [GLuint]);
    /// Fills `renderbuffers` with new renderbuffer names.
    fn gen_renderbuffers(&mut self, renderbuffers: &mut [GLuint]);
    /// Fills `queries` with new query names.
    fn gen_queries(&mut self, queries: &mut [GLuint]);
    /// Returns the first name of a contiguous range of `range` new display
    /// list names, or 0 if they couldn't be generated.
    fn gen_lists(&mut self, range: GLsizei) -> GLuint;
    /// Returns a new program name, or 0.
    fn create_program(&mut self) -> GLuint;
    /// Returns a new shader name of the given kind, or 0.
    fn create_shader(&mut self, kind: GLenum) -> GLuint;
    /// `gluNewQuadric`, with the quadric object identified by a name instead
    /// of a pointer. Returns 0 on failure.
    fn new_quadric(&mut self) -> GLuint;
}
