// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The declarative command table.
//!
//! Every deferrable call is listed here exactly once. Calls in `fixed` take
//! only plain values and return nothing, calls in `query` take plain values and
//! return one plain value, and calls in `special` have a hand-written encoding
//! (array payloads, strings, client-array snapshots, out-parameters). The
//! [`GlBackend`](crate::GlBackend) trait methods for the first two sections are
//! generated from this table, as are the opcodes, encoders and decoders of the
//! `gml` crate.
//!
//! The table is handed to a callback macro, which should accept input of the
//! form:
//!
//! ```text
//! fixed { $( $opcode => fn $method($($arg: $type),*); )* }
//! query { $( $opcode => fn $method($($arg: $type),*) -> $ret; )* }
//! special { $( $opcode, )* }
//! ```

/// Calls the given macro with the full command table. See the [module
/// documentation](crate::commands) for the shape of the input.
#[macro_export]
macro_rules! for_each_gl_command {
    ($callback:ident) => {
        $callback! {
            fixed {
                Enable => fn enable(cap: $crate::GLenum);
                Disable => fn disable(cap: $crate::GLenum);
                BindTexture => fn bind_texture(target: $crate::GLenum, texture: $crate::GLuint);
                TexParameteri => fn tex_parameter_i(target: $crate::GLenum, pname: $crate::GLenum, param: $crate::GLint);
                TexParameterf => fn tex_parameter_f(target: $crate::GLenum, pname: $crate::GLenum, param: $crate::GLfloat);
                TexEnvi => fn tex_env_i(target: $crate::GLenum, pname: $crate::GLenum, param: $crate::GLint);
                ActiveTexture => fn active_texture(texture: $crate::GLenum);
                ClientActiveTexture => fn client_active_texture(texture: $crate::GLenum);
                Begin => fn begin(mode: $crate::GLenum);
                End => fn end();
                Vertex2f => fn vertex_2f(x: $crate::GLfloat, y: $crate::GLfloat);
                Vertex3f => fn vertex_3f(x: $crate::GLfloat, y: $crate::GLfloat, z: $crate::GLfloat);
                TexCoord2f => fn tex_coord_2f(s: $crate::GLfloat, t: $crate::GLfloat);
                MultiTexCoord2f => fn multi_tex_coord_2f(target: $crate::GLenum, s: $crate::GLfloat, t: $crate::GLfloat);
                Normal3f => fn normal_3f(nx: $crate::GLfloat, ny: $crate::GLfloat, nz: $crate::GLfloat);
                Color3f => fn color_3f(red: $crate::GLfloat, green: $crate::GLfloat, blue: $crate::GLfloat);
                Color4f => fn color_4f(red: $crate::GLfloat, green: $crate::GLfloat, blue: $crate::GLfloat, alpha: $crate::GLfloat);
                Color4ub => fn color_4ub(red: $crate::GLubyte, green: $crate::GLubyte, blue: $crate::GLubyte, alpha: $crate::GLubyte);
                MatrixMode => fn matrix_mode(mode: $crate::GLenum);
                PushMatrix => fn push_matrix();
                PopMatrix => fn pop_matrix();
                LoadIdentity => fn load_identity();
                Translatef => fn translate_f(x: $crate::GLfloat, y: $crate::GLfloat, z: $crate::GLfloat);
                Rotatef => fn rotate_f(angle: $crate::GLfloat, x: $crate::GLfloat, y: $crate::GLfloat, z: $crate::GLfloat);
                Scalef => fn scale_f(x: $crate::GLfloat, y: $crate::GLfloat, z: $crate::GLfloat);
                Ortho => fn ortho(left: $crate::GLdouble, right: $crate::GLdouble, bottom: $crate::GLdouble, top: $crate::GLdouble, near: $crate::GLdouble, far: $crate::GLdouble);
                Frustum => fn frustum(left: $crate::GLdouble, right: $crate::GLdouble, bottom: $crate::GLdouble, top: $crate::GLdouble, near: $crate::GLdouble, far: $crate::GLdouble);
                Viewport => fn viewport(x: $crate::GLint, y: $crate::GLint, width: $crate::GLsizei, height: $crate::GLsizei);
                Scissor => fn scissor(x: $crate::GLint, y: $crate::GLint, width: $crate::GLsizei, height: $crate::GLsizei);
                BlendFunc => fn blend_func(sfactor: $crate::GLenum, dfactor: $crate::GLenum);
                BlendFuncSeparate => fn blend_func_separate(src_rgb: $crate::GLenum, dst_rgb: $crate::GLenum, src_alpha: $crate::GLenum, dst_alpha: $crate::GLenum);
                BlendEquation => fn blend_equation(mode: $crate::GLenum);
                AlphaFunc => fn alpha_func(func: $crate::GLenum, reference: $crate::GLclampf);
                DepthFunc => fn depth_func(func: $crate::GLenum);
                DepthMask => fn depth_mask(flag: $crate::GLboolean);
                ColorMask => fn color_mask(red: $crate::GLboolean, green: $crate::GLboolean, blue: $crate::GLboolean, alpha: $crate::GLboolean);
                CullFace => fn cull_face(mode: $crate::GLenum);
                FrontFace => fn front_face(mode: $crate::GLenum);
                ShadeModel => fn shade_model(mode: $crate::GLenum);
                PolygonMode => fn polygon_mode(face: $crate::GLenum, mode: $crate::GLenum);
                PolygonOffset => fn polygon_offset(factor: $crate::GLfloat, units: $crate::GLfloat);
                LineWidth => fn line_width(width: $crate::GLfloat);
                PointSize => fn point_size(size: $crate::GLfloat);
                Clear => fn clear(mask: $crate::GLbitfield);
                ClearColor => fn clear_color(red: $crate::GLclampf, green: $crate::GLclampf, blue: $crate::GLclampf, alpha: $crate::GLclampf);
                ClearDepth => fn clear_depth(depth: $crate::GLclampd);
                ClearStencil => fn clear_stencil(s: $crate::GLint);
                StencilFunc => fn stencil_func(func: $crate::GLenum, reference: $crate::GLint, mask: $crate::GLuint);
                StencilOp => fn stencil_op(fail: $crate::GLenum, zfail: $crate::GLenum, zpass: $crate::GLenum);
                StencilMask => fn stencil_mask(mask: $crate::GLuint);
                Fogf => fn fog_f(pname: $crate::GLenum, param: $crate::GLfloat);
                Fogi => fn fog_i(pname: $crate::GLenum, param: $crate::GLint);
                Lightf => fn light_f(light: $crate::GLenum, pname: $crate::GLenum, param: $crate::GLfloat);
                Materialf => fn material_f(face: $crate::GLenum, pname: $crate::GLenum, param: $crate::GLfloat);
                Hint => fn hint(target: $crate::GLenum, mode: $crate::GLenum);
                PixelStorei => fn pixel_store_i(pname: $crate::GLenum, param: $crate::GLint);
                NewList => fn new_list(list: $crate::GLuint, mode: $crate::GLenum);
                EndList => fn end_list();
                CallList => fn call_list(list: $crate::GLuint);
                DeleteLists => fn delete_lists(list: $crate::GLuint, range: $crate::GLsizei);
                PushAttrib => fn push_attrib(mask: $crate::GLbitfield);
                PopAttrib => fn pop_attrib();
                Flush => fn flush();
                Finish => fn finish();
                BindFramebuffer => fn bind_framebuffer(target: $crate::GLenum, framebuffer: $crate::GLuint);
                BindRenderbuffer => fn bind_renderbuffer(target: $crate::GLenum, renderbuffer: $crate::GLuint);
                FramebufferTexture2D => fn framebuffer_texture_2d(target: $crate::GLenum, attachment: $crate::GLenum, textarget: $crate::GLenum, texture: $crate::GLuint, level: $crate::GLint);
                FramebufferRenderbuffer => fn framebuffer_renderbuffer(target: $crate::GLenum, attachment: $crate::GLenum, renderbuffertarget: $crate::GLenum, renderbuffer: $crate::GLuint);
                RenderbufferStorage => fn renderbuffer_storage(target: $crate::GLenum, internal_format: $crate::GLenum, width: $crate::GLsizei, height: $crate::GLsizei);
                UseProgram => fn use_program(program: $crate::GLuint);
                AttachShader => fn attach_shader(program: $crate::GLuint, shader: $crate::GLuint);
                DetachShader => fn detach_shader(program: $crate::GLuint, shader: $crate::GLuint);
                CompileShader => fn compile_shader(shader: $crate::GLuint);
                LinkProgram => fn link_program(program: $crate::GLuint);
                ValidateProgram => fn validate_program(program: $crate::GLuint);
                DeleteShader => fn delete_shader(shader: $crate::GLuint);
                DeleteProgram => fn delete_program(program: $crate::GLuint);
                Uniform1i => fn uniform_1i(location: $crate::GLint, v0: $crate::GLint);
                Uniform1f => fn uniform_1f(location: $crate::GLint, v0: $crate::GLfloat);
                Uniform2f => fn uniform_2f(location: $crate::GLint, v0: $crate::GLfloat, v1: $crate::GLfloat);
                Uniform3f => fn uniform_3f(location: $crate::GLint, v0: $crate::GLfloat, v1: $crate::GLfloat, v2: $crate::GLfloat);
                Uniform4f => fn uniform_4f(location: $crate::GLint, v0: $crate::GLfloat, v1: $crate::GLfloat, v2: $crate::GLfloat, v3: $crate::GLfloat);
                VertexAttrib4f => fn vertex_attrib_4f(index: $crate::GLuint, x: $crate::GLfloat, y: $crate::GLfloat, z: $crate::GLfloat, w: $crate::GLfloat);
                CopyTexSubImage2D => fn copy_tex_sub_image_2d(target: $crate::GLenum, level: $crate::GLint, xoffset: $crate::GLint, yoffset: $crate::GLint, x: $crate::GLint, y: $crate::GLint, width: $crate::GLsizei, height: $crate::GLsizei);
                GenerateMipmap => fn generate_mipmap(target: $crate::GLenum);
                BeginQuery => fn begin_query(target: $crate::GLenum, id: $crate::GLuint);
                EndQuery => fn end_query(target: $crate::GLenum);
                DeleteQuadric => fn delete_quadric(quadric: $crate::GLuint);
                QuadricDrawStyle => fn quadric_draw_style(quadric: $crate::GLuint, draw: $crate::GLenum);
                Sphere => fn sphere(quadric: $crate::GLuint, radius: $crate::GLdouble, slices: $crate::GLint, stacks: $crate::GLint);
                Cylinder => fn cylinder(quadric: $crate::GLuint, base: $crate::GLdouble, top: $crate::GLdouble, height: $crate::GLdouble, slices: $crate::GLint, stacks: $crate::GLint);
                Perspective => fn perspective(fovy: $crate::GLdouble, aspect: $crate::GLdouble, z_near: $crate::GLdouble, z_far: $crate::GLdouble);
                Ortho2D => fn ortho_2d(left: $crate::GLdouble, right: $crate::GLdouble, bottom: $crate::GLdouble, top: $crate::GLdouble);
                LookAt => fn look_at(eye_x: $crate::GLdouble, eye_y: $crate::GLdouble, eye_z: $crate::GLdouble, center_x: $crate::GLdouble, center_y: $crate::GLdouble, center_z: $crate::GLdouble, up_x: $crate::GLdouble, up_y: $crate::GLdouble, up_z: $crate::GLdouble);
            }
            query {
                IsEnabled => fn is_enabled(cap: $crate::GLenum) -> $crate::GLboolean;
                IsTexture => fn is_texture(texture: $crate::GLuint) -> $crate::GLboolean;
                IsBuffer => fn is_buffer(buffer: $crate::GLuint) -> $crate::GLboolean;
                IsShader => fn is_shader(shader: $crate::GLuint) -> $crate::GLboolean;
                IsProgram => fn is_program(program: $crate::GLuint) -> $crate::GLboolean;
                RenderMode => fn render_mode(mode: $crate::GLenum) -> $crate::GLint;
                UnmapBuffer => fn unmap_buffer(target: $crate::GLenum) -> $crate::GLboolean;
            }
            special {
                Nop,
                BindBuffer,
                EnableClientState,
                DisableClientState,
                EnableVertexAttribArray,
                DisableVertexAttribArray,
                Lightfv,
                Materialfv,
                Fogfv,
                TexParameterfv,
                TexEnvfv,
                LightModelfv,
                MultMatrixf,
                LoadMatrixf,
                Uniform1fv,
                Uniform4fv,
                UniformMatrix2fv,
                UniformMatrix3fv,
                UniformMatrix4fv,
                DeleteTextures,
                DeleteBuffers,
                DeleteFramebuffers,
                DeleteRenderbuffers,
                DeleteQueries,
                DrawBuffers,
                TexImage1D,
                TexImage2D,
                TexImage3D,
                TexSubImage2D,
                CompressedTexImage2D,
                Build2DMipmaps,
                BufferData,
                BufferSubData,
                Map1f,
                ShaderSource,
                DrawArrays,
                DrawElements,
                DrawRangeElements,
                GetError,
                CheckFramebufferStatus,
                GetIntegerv,
                GetFloatv,
                GetString,
                GetShaderiv,
                GetProgramiv,
                GetShaderInfoLog,
                GetProgramInfoLog,
                GetUniformLocation,
                GetAttribLocation,
                ReadPixels,
            }
        }
    };
}
