//! Element counts and sizes that the wrapped API implies from its enum
//! arguments. A call taking a pointer reads as many values as these functions
//! say, so a deferred copy of that call must copy exactly that much.
//!
//! All of these return 0 for enumerants they don't know, which makes the
//! deferred call copy nothing rather than read out of bounds.

use crate::{enums::*, GLenum, GLsizei};

/// Amount of components per pixel in the given pixel `format`, for texture
/// uploads and mipmap builds.
pub const fn components(format: GLenum) -> usize {
    match format {
        COLOR_INDEX | RED | GREEN | BLUE | ALPHA | LUMINANCE | DEPTH_COMPONENT => 1,
        LUMINANCE_ALPHA => 2,
        RGB | BGR => 3,
        RGBA | BGRA => 4,
        _ => 0,
    }
}

/// Size of one component of the given data type, in bytes.
pub const fn bytes_per_component(ty: GLenum) -> usize {
    match ty {
        UNSIGNED_BYTE | BYTE | BITMAP => 1,
        UNSIGNED_SHORT | SHORT => 2,
        UNSIGNED_INT | INT | FLOAT => 4,
        DOUBLE => 8,
        _ => 0,
    }
}

/// Size of an image of the given dimensions, format and type in bytes. Pass
/// 1 for the unused dimensions of 1D and 2D images.
pub fn image_size(
    width: GLsizei,
    height: GLsizei,
    depth: GLsizei,
    format: GLenum,
    ty: GLenum,
) -> usize {
    let dimension = |d: GLsizei| usize::try_from(d).unwrap_or(0);
    dimension(width)
        .saturating_mul(dimension(height))
        .saturating_mul(dimension(depth))
        .saturating_mul(components(format))
        .saturating_mul(bytes_per_component(ty))
}

/// Values read by `glLightfv` and `glMaterialfv`.
pub const fn num_args_light_material(pname: GLenum) -> usize {
    match pname {
        AMBIENT | DIFFUSE | SPECULAR | EMISSION | AMBIENT_AND_DIFFUSE | POSITION => 4,
        SPOT_DIRECTION | COLOR_INDEXES => 3,
        SHININESS
        | SPOT_EXPONENT
        | SPOT_CUTOFF
        | CONSTANT_ATTENUATION
        | LINEAR_ATTENUATION
        | QUADRATIC_ATTENUATION => 1,
        _ => 0,
    }
}

/// Values read by `glFogfv`.
pub const fn num_args_fog(pname: GLenum) -> usize {
    match pname {
        FOG_MODE | FOG_DENSITY | FOG_START | FOG_END | FOG_INDEX => 1,
        FOG_COLOR => 4,
        _ => 0,
    }
}

/// Values read by `glTexEnvfv`.
pub const fn num_args_tex_env(pname: GLenum) -> usize {
    match pname {
        TEXTURE_ENV_MODE => 1,
        TEXTURE_ENV_COLOR => 4,
        _ => 0,
    }
}

/// Values read by `glTexParameterfv`.
pub const fn num_args_tex_parameter(pname: GLenum) -> usize {
    match pname {
        TEXTURE_MIN_FILTER | TEXTURE_MAG_FILTER | TEXTURE_WRAP_S | TEXTURE_WRAP_T
        | TEXTURE_PRIORITY => 1,
        TEXTURE_BORDER_COLOR => 4,
        _ => 0,
    }
}

/// Values read by `glLightModelfv`.
pub const fn num_args_light_model(pname: GLenum) -> usize {
    match pname {
        LIGHT_MODEL_LOCAL_VIEWER | LIGHT_MODEL_TWO_SIDE => 1,
        LIGHT_MODEL_AMBIENT => 4,
        _ => 0,
    }
}

/// Values per control point of a `glMap1f` evaluator target.
pub const fn num_args_map1(target: GLenum) -> usize {
    match target {
        MAP1_INDEX | MAP1_TEXTURE_COORD_1 => 1,
        MAP1_TEXTURE_COORD_2 => 2,
        MAP1_VERTEX_3 | MAP1_NORMAL | MAP1_TEXTURE_COORD_3 => 3,
        MAP1_VERTEX_4 | MAP1_COLOR_4 | MAP1_TEXTURE_COORD_4 => 4,
        _ => 0,
    }
}
