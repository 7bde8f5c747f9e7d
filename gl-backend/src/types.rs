//! Scalar types of the wrapped graphics API, and the enumerant values the
//! command queue needs to know about.

#![allow(missing_docs)]

pub type GLenum = u32;
pub type GLboolean = u8;
pub type GLbitfield = u32;
pub type GLbyte = i8;
pub type GLshort = i16;
pub type GLint = i32;
pub type GLsizei = i32;
pub type GLubyte = u8;
pub type GLushort = u16;
pub type GLuint = u32;
pub type GLfloat = f32;
pub type GLclampf = f32;
pub type GLdouble = f64;
pub type GLclampd = f64;
pub type GLsizeiptr = isize;
pub type GLintptr = isize;

/// Enumerant values. Only the ones the queue, the size tables, the tests and
/// the demo actually use are listed.
pub mod enums {
    use super::{GLboolean, GLenum};

    pub const FALSE: GLboolean = 0;
    pub const TRUE: GLboolean = 1;

    pub const NO_ERROR: GLenum = 0;
    pub const INVALID_ENUM: GLenum = 0x0500;
    pub const INVALID_VALUE: GLenum = 0x0501;
    pub const INVALID_OPERATION: GLenum = 0x0502;

    pub const POINTS: GLenum = 0x0000;
    pub const LINES: GLenum = 0x0001;
    pub const LINE_STRIP: GLenum = 0x0003;
    pub const TRIANGLES: GLenum = 0x0004;
    pub const TRIANGLE_STRIP: GLenum = 0x0005;
    pub const QUADS: GLenum = 0x0007;

    pub const BYTE: GLenum = 0x1400;
    pub const UNSIGNED_BYTE: GLenum = 0x1401;
    pub const SHORT: GLenum = 0x1402;
    pub const UNSIGNED_SHORT: GLenum = 0x1403;
    pub const INT: GLenum = 0x1404;
    pub const UNSIGNED_INT: GLenum = 0x1405;
    pub const FLOAT: GLenum = 0x1406;
    pub const DOUBLE: GLenum = 0x140A;
    pub const BITMAP: GLenum = 0x1A00;

    pub const COLOR_INDEX: GLenum = 0x1900;
    pub const DEPTH_COMPONENT: GLenum = 0x1902;
    pub const RED: GLenum = 0x1903;
    pub const GREEN: GLenum = 0x1904;
    pub const BLUE: GLenum = 0x1905;
    pub const ALPHA: GLenum = 0x1906;
    pub const RGB: GLenum = 0x1907;
    pub const RGBA: GLenum = 0x1908;
    pub const LUMINANCE: GLenum = 0x1909;
    pub const LUMINANCE_ALPHA: GLenum = 0x190A;
    pub const BGR: GLenum = 0x80E0;
    pub const BGRA: GLenum = 0x80E1;
    pub const COMPRESSED_RGBA_S3TC_DXT5: GLenum = 0x83F3;

    pub const VERTEX_ARRAY: GLenum = 0x8074;
    pub const NORMAL_ARRAY: GLenum = 0x8075;
    pub const COLOR_ARRAY: GLenum = 0x8076;
    pub const INDEX_ARRAY: GLenum = 0x8077;
    pub const TEXTURE_COORD_ARRAY: GLenum = 0x8078;
    pub const EDGE_FLAG_ARRAY: GLenum = 0x8079;

    pub const ARRAY_BUFFER: GLenum = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: GLenum = 0x8893;
    pub const PIXEL_PACK_BUFFER: GLenum = 0x88EB;
    pub const PIXEL_UNPACK_BUFFER: GLenum = 0x88EC;
    pub const STREAM_DRAW: GLenum = 0x88E0;
    pub const STATIC_DRAW: GLenum = 0x88E4;
    pub const DYNAMIC_DRAW: GLenum = 0x88E8;

    pub const AMBIENT: GLenum = 0x1200;
    pub const DIFFUSE: GLenum = 0x1201;
    pub const SPECULAR: GLenum = 0x1202;
    pub const POSITION: GLenum = 0x1203;
    pub const SPOT_DIRECTION: GLenum = 0x1204;
    pub const SPOT_EXPONENT: GLenum = 0x1205;
    pub const SPOT_CUTOFF: GLenum = 0x1206;
    pub const CONSTANT_ATTENUATION: GLenum = 0x1207;
    pub const LINEAR_ATTENUATION: GLenum = 0x1208;
    pub const QUADRATIC_ATTENUATION: GLenum = 0x1209;
    pub const EMISSION: GLenum = 0x1600;
    pub const SHININESS: GLenum = 0x1601;
    pub const AMBIENT_AND_DIFFUSE: GLenum = 0x1602;
    pub const COLOR_INDEXES: GLenum = 0x1603;
    pub const FRONT: GLenum = 0x0404;
    pub const BACK: GLenum = 0x0405;
    pub const FRONT_AND_BACK: GLenum = 0x0408;
    pub const LIGHT0: GLenum = 0x4000;

    pub const FOG_INDEX: GLenum = 0x0B61;
    pub const FOG_DENSITY: GLenum = 0x0B62;
    pub const FOG_START: GLenum = 0x0B63;
    pub const FOG_END: GLenum = 0x0B64;
    pub const FOG_MODE: GLenum = 0x0B65;
    pub const FOG_COLOR: GLenum = 0x0B66;

    pub const TEXTURE_ENV_MODE: GLenum = 0x2200;
    pub const TEXTURE_ENV_COLOR: GLenum = 0x2201;
    pub const TEXTURE_ENV: GLenum = 0x2300;
    pub const MODULATE: GLenum = 0x2100;

    pub const TEXTURE_MAG_FILTER: GLenum = 0x2800;
    pub const TEXTURE_MIN_FILTER: GLenum = 0x2801;
    pub const TEXTURE_WRAP_S: GLenum = 0x2802;
    pub const TEXTURE_WRAP_T: GLenum = 0x2803;
    pub const TEXTURE_BORDER_COLOR: GLenum = 0x1004;
    pub const TEXTURE_PRIORITY: GLenum = 0x8066;
    pub const LINEAR: GLenum = 0x2601;
    pub const NEAREST: GLenum = 0x2600;

    pub const LIGHT_MODEL_LOCAL_VIEWER: GLenum = 0x0B51;
    pub const LIGHT_MODEL_TWO_SIDE: GLenum = 0x0B52;
    pub const LIGHT_MODEL_AMBIENT: GLenum = 0x0B53;

    pub const MAP1_COLOR_4: GLenum = 0x0D90;
    pub const MAP1_INDEX: GLenum = 0x0D91;
    pub const MAP1_NORMAL: GLenum = 0x0D92;
    pub const MAP1_TEXTURE_COORD_1: GLenum = 0x0D93;
    pub const MAP1_TEXTURE_COORD_2: GLenum = 0x0D94;
    pub const MAP1_TEXTURE_COORD_3: GLenum = 0x0D95;
    pub const MAP1_TEXTURE_COORD_4: GLenum = 0x0D96;
    pub const MAP1_VERTEX_3: GLenum = 0x0D97;
    pub const MAP1_VERTEX_4: GLenum = 0x0D98;

    pub const TEXTURE_1D: GLenum = 0x0DE0;
    pub const TEXTURE_2D: GLenum = 0x0DE1;
    pub const TEXTURE_3D: GLenum = 0x806F;
    pub const TEXTURE0: GLenum = 0x84C0;

    pub const BLEND: GLenum = 0x0BE2;
    pub const DEPTH_TEST: GLenum = 0x0B71;
    pub const CULL_FACE: GLenum = 0x0B44;
    pub const FOG: GLenum = 0x0B60;
    pub const LIGHTING: GLenum = 0x0B50;
    pub const ALPHA_TEST: GLenum = 0x0BC0;

    pub const SRC_ALPHA: GLenum = 0x0302;
    pub const ONE_MINUS_SRC_ALPHA: GLenum = 0x0303;
    pub const ONE: GLenum = 0x0001;
    pub const LESS: GLenum = 0x0201;
    pub const GREATER: GLenum = 0x0204;

    pub const MODELVIEW: GLenum = 0x1700;
    pub const PROJECTION: GLenum = 0x1701;
    pub const RENDER: GLenum = 0x1C00;
    pub const COMPILE: GLenum = 0x1300;

    pub const COLOR_BUFFER_BIT: u32 = 0x0000_4000;
    pub const DEPTH_BUFFER_BIT: u32 = 0x0000_0100;

    pub const FRAMEBUFFER: GLenum = 0x8D40;
    pub const RENDERBUFFER: GLenum = 0x8D41;
    pub const FRAMEBUFFER_COMPLETE: GLenum = 0x8CD5;
    pub const FRAMEBUFFER_UNSUPPORTED: GLenum = 0x8CDD;
    pub const COLOR_ATTACHMENT0: GLenum = 0x8CE0;

    pub const FRAGMENT_SHADER: GLenum = 0x8B30;
    pub const VERTEX_SHADER: GLenum = 0x8B31;
    pub const GEOMETRY_SHADER: GLenum = 0x8DD9;
    pub const COMPILE_STATUS: GLenum = 0x8B81;
    pub const LINK_STATUS: GLenum = 0x8B82;
    pub const INFO_LOG_LENGTH: GLenum = 0x8B84;

    pub const LINE_WIDTH: GLenum = 0x0B21;
    pub const VIEWPORT: GLenum = 0x0BA2;
    pub const ACTIVE_TEXTURE: GLenum = 0x84E0;
    pub const TEXTURE_BINDING_2D: GLenum = 0x8069;
    pub const MAX_TEXTURE_SIZE: GLenum = 0x0D33;
    pub const MAX_TEXTURE_UNITS: GLenum = 0x84E2;
    pub const MAX_TEXTURE_IMAGE_UNITS: GLenum = 0x8872;
    pub const MAX_TEXTURE_COORDS: GLenum = 0x8871;
    pub const UNPACK_ALIGNMENT: GLenum = 0x0CF5;
    pub const MAX_TEXTURE_MAX_ANISOTROPY: GLenum = 0x84FF;

    pub const VENDOR: GLenum = 0x1F00;
    pub const RENDERER: GLenum = 0x1F01;
    pub const VERSION: GLenum = 0x1F02;
    pub const EXTENSIONS: GLenum = 0x1F03;

    pub const FILL: GLenum = 0x1B02;
    pub const SAMPLES_PASSED: GLenum = 0x8914;
}
