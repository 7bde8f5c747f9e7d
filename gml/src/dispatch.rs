//! Executing records with the real backend.
//!
//! Records of the `fixed` and `query` sections of the command table are
//! decoded by generated code, in the order the producer wrote their
//! arguments. The `special` records are decoded by hand below, and
//! [`Special`] makes sure each of them is.

use gl_backend::{formats, GLboolean, GLenum, GLfloat, GLint, GLsizei, GLuint, GlBackend};

use crate::{
    opcode::Opcode,
    record::{ArgReader, Record, RETURNS_VALUE},
    snapshot::replay_draw,
    sync::Rendezvous,
};

macro_rules! define_dispatch {
    (
        fixed { $($op:ident => fn $name:ident($($arg:ident: $ty:ty),*);)* }
        query { $($qop:ident => fn $qname:ident($($qarg:ident: $qty:ty),*) -> $ret:ty;)* }
        special { $($sop:ident,)* }
    ) => {
        /// The opcodes with hand-written decoding.
        #[derive(Clone, Copy, Debug)]
        enum Special {
            $($sop,)*
        }

        /// Makes the call encoded in `record`. Results of value-returning
        /// calls are posted to `sync`.
        pub(crate) fn execute_record<B: GlBackend + ?Sized>(
            backend: &mut B,
            record: Record<'_>,
            sync: &Rendezvous,
        ) {
            let Record { opcode, flags, mut args } = record;
            match opcode {
                $(Opcode::$op => {
                    $(let $arg = args.get::<$ty>();)*
                    backend.$name($($arg),*);
                })*
                $(Opcode::$qop => {
                    $(let $qarg = args.get::<$qty>();)*
                    let result: $ret = backend.$qname($($qarg),*);
                    sync.post(bytemuck::bytes_of(&result));
                })*
                $(Opcode::$sop => execute_special(backend, Special::$sop, flags, &mut args, sync),)*
            }
        }
    };
}

gl_backend::for_each_gl_command!(define_dispatch);

fn execute_special<B: GlBackend + ?Sized>(
    backend: &mut B,
    special: Special,
    flags: u16,
    args: &mut ArgReader,
    sync: &Rendezvous,
) {
    match special {
        Special::Nop => {
            if flags & RETURNS_VALUE != 0 {
                sync.post(&[]);
            }
        }
        Special::BindBuffer => backend.bind_buffer(args.get(), args.get()),
        Special::EnableClientState => backend.enable_client_state(args.get()),
        Special::DisableClientState => backend.disable_client_state(args.get()),
        Special::EnableVertexAttribArray => backend.enable_vertex_attrib_array(args.get()),
        Special::DisableVertexAttribArray => backend.disable_vertex_attrib_array(args.get()),

        Special::Lightfv
        | Special::Materialfv
        | Special::TexParameterfv
        | Special::TexEnvfv => {
            let target: GLenum = args.get();
            let pname: GLenum = args.get();
            let params = args.get_slice::<GLfloat>();
            match special {
                Special::Lightfv => backend.light_fv(target, pname, &params),
                Special::Materialfv => backend.material_fv(target, pname, &params),
                Special::TexParameterfv => backend.tex_parameter_fv(target, pname, &params),
                _ => backend.tex_env_fv(target, pname, &params),
            }
        }
        Special::Fogfv => {
            let pname: GLenum = args.get();
            backend.fog_fv(pname, &args.get_slice::<GLfloat>());
        }
        Special::LightModelfv => {
            let pname: GLenum = args.get();
            backend.light_model_fv(pname, &args.get_slice::<GLfloat>());
        }
        Special::MultMatrixf => backend.mult_matrix_f(&args.get::<[GLfloat; 16]>()),
        Special::LoadMatrixf => backend.load_matrix_f(&args.get::<[GLfloat; 16]>()),

        Special::Uniform1fv
        | Special::Uniform4fv
        | Special::UniformMatrix2fv
        | Special::UniformMatrix3fv
        | Special::UniformMatrix4fv => {
            let location: GLint = args.get();
            let count: GLsizei = args.get();
            let transpose: GLboolean = args.get();
            let value = args.get_slice::<GLfloat>();
            match special {
                Special::Uniform1fv => backend.uniform_1fv(location, count, &value),
                Special::Uniform4fv => backend.uniform_4fv(location, count, &value),
                Special::UniformMatrix2fv => backend.uniform_matrix_2fv(location, count, transpose, &value),
                Special::UniformMatrix3fv => backend.uniform_matrix_3fv(location, count, transpose, &value),
                _ => backend.uniform_matrix_4fv(location, count, transpose, &value),
            }
        }

        Special::DeleteTextures => backend.delete_textures(&args.get_slice::<GLuint>()),
        Special::DeleteBuffers => backend.delete_buffers(&args.get_slice::<GLuint>()),
        Special::DeleteFramebuffers => backend.delete_framebuffers(&args.get_slice::<GLuint>()),
        Special::DeleteRenderbuffers => backend.delete_renderbuffers(&args.get_slice::<GLuint>()),
        Special::DeleteQueries => backend.delete_queries(&args.get_slice::<GLuint>()),
        Special::DrawBuffers => backend.draw_buffers(&args.get_slice::<GLenum>()),

        Special::TexImage1D => {
            let (target, level, internal_format): (GLenum, GLint, GLint) =
                (args.get(), args.get(), args.get());
            let (width, border, format, ty): (GLsizei, GLint, GLenum, GLenum) =
                (args.get(), args.get(), args.get(), args.get());
            let pixels = args.get_optional_slice::<u8>();
            let pixels = pixels.as_deref();
            backend.tex_image_1d(target, level, internal_format, width, border, format, ty, pixels);
        }
        Special::TexImage2D => {
            let (target, level, internal_format): (GLenum, GLint, GLint) =
                (args.get(), args.get(), args.get());
            let (width, height, border): (GLsizei, GLsizei, GLint) =
                (args.get(), args.get(), args.get());
            let (format, ty): (GLenum, GLenum) = (args.get(), args.get());
            let pixels = args.get_optional_slice::<u8>();
            let pixels = pixels.as_deref();
            backend.tex_image_2d(target, level, internal_format, width, height, border, format, ty, pixels);
        }
        Special::TexImage3D => {
            let (target, level, internal_format): (GLenum, GLint, GLint) =
                (args.get(), args.get(), args.get());
            let (width, height, depth, border): (GLsizei, GLsizei, GLsizei, GLint) =
                (args.get(), args.get(), args.get(), args.get());
            let (format, ty): (GLenum, GLenum) = (args.get(), args.get());
            let pixels = args.get_optional_slice::<u8>();
            let pixels = pixels.as_deref();
            backend.tex_image_3d(
                target,
                level,
                internal_format,
                width,
                height,
                depth,
                border,
                format,
                ty,
                pixels,
            );
        }
        Special::TexSubImage2D => {
            let (target, level, xoffset, yoffset): (GLenum, GLint, GLint, GLint) =
                (args.get(), args.get(), args.get(), args.get());
            let (width, height, format, ty): (GLsizei, GLsizei, GLenum, GLenum) =
                (args.get(), args.get(), args.get(), args.get());
            let pixels = args.get_bytes();
            backend.tex_sub_image_2d(target, level, xoffset, yoffset, width, height, format, ty, pixels);
        }
        Special::CompressedTexImage2D => {
            let (target, level, internal_format): (GLenum, GLint, GLenum) =
                (args.get(), args.get(), args.get());
            let (width, height, border): (GLsizei, GLsizei, GLint) =
                (args.get(), args.get(), args.get());
            let data = args.get_bytes();
            backend.compressed_tex_image_2d(target, level, internal_format, width, height, border, data);
        }
        Special::Build2DMipmaps => {
            let (target, internal_format, width, height): (GLenum, GLint, GLsizei, GLsizei) =
                (args.get(), args.get(), args.get(), args.get());
            let (format, ty): (GLenum, GLenum) = (args.get(), args.get());
            let data = args.get_bytes();
            let status = backend.build_2d_mipmaps(target, internal_format, width, height, format, ty, data);
            if status != 0 {
                tracing::warn!("deferred build_2d_mipmaps failed with {status}");
            }
        }
        Special::BufferData => {
            let target: GLenum = args.get();
            let size: isize = args.get();
            let usage: GLenum = args.get();
            let data = args.get_optional_slice::<u8>();
            backend.buffer_data(target, size, data.as_deref(), usage);
        }
        Special::BufferSubData => {
            let target: GLenum = args.get();
            let offset: isize = args.get();
            backend.buffer_sub_data(target, offset, args.get_bytes());
        }
        Special::Map1f => {
            let target: GLenum = args.get();
            let (u1, u2): (GLfloat, GLfloat) = (args.get(), args.get());
            let order: GLint = args.get();
            let points = args.get_slice::<GLfloat>();
            let stride = formats::num_args_map1(target) as GLint;
            backend.map_1f(target, u1, u2, stride, order, &points);
        }
        Special::ShaderSource => {
            let shader: GLuint = args.get();
            let count: u32 = args.get();
            let sources = (0..count).map(|_| args.get_str()).collect::<Vec<&str>>();
            backend.shader_source(shader, &sources);
        }

        Special::DrawArrays | Special::DrawElements => replay_draw(backend, args, false),
        Special::DrawRangeElements => replay_draw(backend, args, true),

        Special::GetError => sync.post(bytemuck::bytes_of(&backend.get_error())),
        Special::CheckFramebufferStatus => {
            let status = backend.check_framebuffer_status(args.get());
            sync.post(bytemuck::bytes_of(&status));
        }
        Special::GetIntegerv => {
            let pname: GLenum = args.get();
            let mut values = vec![0; args.get::<u32>() as usize];
            backend.get_integer_v(pname, &mut values);
            sync.post(bytemuck::cast_slice::<GLint, u8>(&values));
        }
        Special::GetFloatv => {
            let pname: GLenum = args.get();
            let mut values = vec![0.0; args.get::<u32>() as usize];
            backend.get_float_v(pname, &mut values);
            sync.post(bytemuck::cast_slice::<GLfloat, u8>(&values));
        }
        Special::GetString => sync.post(backend.get_string(args.get()).as_bytes()),
        Special::GetShaderiv => {
            let value = backend.get_shader_iv(args.get(), args.get());
            sync.post(bytemuck::bytes_of(&value));
        }
        Special::GetProgramiv => {
            let value = backend.get_program_iv(args.get(), args.get());
            sync.post(bytemuck::bytes_of(&value));
        }
        Special::GetShaderInfoLog => sync.post(backend.get_shader_info_log(args.get()).as_bytes()),
        Special::GetProgramInfoLog => {
            sync.post(backend.get_program_info_log(args.get()).as_bytes());
        }
        Special::GetUniformLocation => {
            let program: GLuint = args.get();
            let location = backend.get_uniform_location(program, args.get_str());
            sync.post(bytemuck::bytes_of(&location));
        }
        Special::GetAttribLocation => {
            let program: GLuint = args.get();
            let location = backend.get_attrib_location(program, args.get_str());
            sync.post(bytemuck::bytes_of(&location));
        }
        Special::ReadPixels => {
            let (x, y, width, height): (GLint, GLint, GLsizei, GLsizei) =
                (args.get(), args.get(), args.get(), args.get());
            let (format, ty): (GLenum, GLenum) = (args.get(), args.get());
            let mut pixels = vec![0; args.get::<u32>() as usize];
            backend.read_pixels(x, y, width, height, format, ty, &mut pixels);
            sync.post(&pixels);
        }
    }
}

#[cfg(test)]
mod tests {
    use gl_backend::{enums::*, recording::Arg, RecordingBackend};

    use crate::{
        opcode::Opcode,
        record::{RecordReader, RecordWriter, RETURNS_VALUE},
        sync::Rendezvous,
    };

    use super::execute_record;

    fn execute_all(bytes: &[u8], backend: &mut RecordingBackend, sync: &Rendezvous) {
        for record in RecordReader::new(bytes) {
            execute_record(backend, record, sync);
        }
    }

    #[test]
    fn fixed_calls_read_their_arguments_in_order() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::BindTexture, 0, 1024);
        writer.put(TEXTURE_2D);
        writer.put(7u32);
        writer.finish();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Color4ub, 0, 1024);
        for channel in [1u8, 2, 3, 4] {
            writer.put(channel);
        }
        writer.finish();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Perspective, 0, 1024);
        for value in [45.0f64, 1.5, 0.1, 100.0] {
            writer.put(value);
        }
        writer.finish();

        let mut gl = RecordingBackend::new();
        execute_all(&bytes, &mut gl, &Rendezvous::new());
        assert_eq!(vec!["bind_texture", "color_4ub", "perspective"], gl.call_names());
        assert_eq!(vec![Arg::Uint(TEXTURE_2D.into()), Arg::Uint(7)], gl.calls[0].args);
        assert_eq!(Arg::Uint(3), gl.calls[1].args[2]);
        assert_eq!(Arg::Float(0.1), gl.calls[2].args[2]);
    }

    #[test]
    fn queries_post_their_result() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Enable, 0, 1024);
        writer.put(BLEND);
        writer.finish();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::IsEnabled, RETURNS_VALUE, 1024);
        writer.put(BLEND);
        writer.finish();

        let sync = Rendezvous::new();
        execute_all(&bytes, &mut RecordingBackend::new(), &sync);
        sync.request();
        let shutdown = core::sync::atomic::AtomicBool::new(false);
        assert_eq!(Ok(vec![TRUE]), sync.wait(&shutdown));
    }

    #[test]
    fn string_arrays_are_concatenated_in_order() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::ShaderSource, 0, 1024);
        writer.put(3u32);
        writer.put(2u32);
        writer.put_str("void main() ");
        writer.put_str("{}");
        writer.finish();

        let mut gl = RecordingBackend::new();
        execute_all(&bytes, &mut gl, &Rendezvous::new());
        assert_eq!(Some("void main() {}"), gl.shader_source_of(3));
    }

    #[test]
    fn missing_pixels_stay_missing() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::TexImage2D, 0, 1024);
        writer.put(TEXTURE_2D);
        for value in [0i32, RGBA as i32, 4, 4, 0] {
            writer.put(value);
        }
        writer.put(RGBA);
        writer.put(UNSIGNED_BYTE);
        writer.put_optional_slice::<u8>(None);
        writer.finish();

        let mut gl = RecordingBackend::new();
        execute_all(&bytes, &mut gl, &Rendezvous::new());
        assert_eq!(Some(&Arg::Null), gl.calls[0].args.last());
    }
}
