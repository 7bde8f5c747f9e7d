use alloc::vec::Vec;
use core::ffi::c_void;

use enum_map::Enum;

use crate::{enums::*, formats::bytes_per_component, GLenum, GLint, GLsizei};

/// The fixed-function client-side vertex arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum)]
pub enum ClientArray {
    /// `GL_VERTEX_ARRAY`
    Vertex,
    /// `GL_COLOR_ARRAY`
    Color,
    /// `GL_TEXTURE_COORD_ARRAY`
    TexCoord,
    /// `GL_NORMAL_ARRAY`
    Normal,
    /// `GL_INDEX_ARRAY`
    Index,
    /// `GL_EDGE_FLAG_ARRAY`
    EdgeFlag,
}

impl ClientArray {
    /// All arrays, in the order deferred draws snapshot them.
    pub const ALL: [ClientArray; 6] = [
        ClientArray::Vertex,
        ClientArray::Color,
        ClientArray::TexCoord,
        ClientArray::Normal,
        ClientArray::Index,
        ClientArray::EdgeFlag,
    ];

    /// Maps the `glEnableClientState` enumerant to the array, if it is one.
    pub const fn from_gl(array: GLenum) -> Option<ClientArray> {
        match array {
            VERTEX_ARRAY => Some(ClientArray::Vertex),
            COLOR_ARRAY => Some(ClientArray::Color),
            TEXTURE_COORD_ARRAY => Some(ClientArray::TexCoord),
            NORMAL_ARRAY => Some(ClientArray::Normal),
            INDEX_ARRAY => Some(ClientArray::Index),
            EDGE_FLAG_ARRAY => Some(ClientArray::EdgeFlag),
            _ => None,
        }
    }

    /// The `glEnableClientState` enumerant of this array.
    pub const fn to_gl(self) -> GLenum {
        match self {
            ClientArray::Vertex => VERTEX_ARRAY,
            ClientArray::Color => COLOR_ARRAY,
            ClientArray::TexCoord => TEXTURE_COORD_ARRAY,
            ClientArray::Normal => NORMAL_ARRAY,
            ClientArray::Index => INDEX_ARRAY,
            ClientArray::EdgeFlag => EDGE_FLAG_ARRAY,
        }
    }

    /// Size of one element of this array in bytes, given the `size` and
    /// `ty` passed to its pointer call. Normals always have three components,
    /// indices one, and edge flags are one byte each.
    pub fn item_size(self, size: GLint, ty: GLenum) -> usize {
        let components = match self {
            ClientArray::Vertex | ClientArray::Color | ClientArray::TexCoord => {
                usize::try_from(size).unwrap_or(0)
            }
            ClientArray::Normal => 3,
            ClientArray::Index => 1,
            ClientArray::EdgeFlag => return 1,
        };
        components * bytes_per_component(ty)
    }
}

/// The distance between consecutive elements of an array, where a `stride` of
/// 0 means the elements are tightly packed.
pub fn effective_stride(stride: GLsizei, item_size: usize) -> usize {
    match usize::try_from(stride) {
        Ok(0) | Err(_) => item_size,
        Ok(stride) => stride,
    }
}

/// Reads `count` indices of type `ty` (`UNSIGNED_BYTE`, `UNSIGNED_SHORT` or
/// `UNSIGNED_INT`) into a vector. Returns None for other index types.
///
/// ### Safety
///
/// `indices` must be valid for reads of `count` values of type `ty`. The
/// values don't need to be aligned. With a `count` of 0, `indices` isn't
/// read and may be null.
pub unsafe fn read_indices(indices: *const c_void, ty: GLenum, count: usize) -> Option<Vec<u32>> {
    let index_size = match ty {
        UNSIGNED_BYTE => 1,
        UNSIGNED_SHORT => 2,
        UNSIGNED_INT => 4,
        _ => return None,
    };
    if count == 0 {
        return Some(Vec::new());
    }
    // Safety: guaranteed by the caller.
    let bytes = unsafe { core::slice::from_raw_parts(indices.cast::<u8>(), count * index_size) };
    let indices = match index_size {
        1 => bytes.iter().map(|&i| u32::from(i)).collect(),
        2 => bytes
            .chunks_exact(2)
            .map(|i| u32::from(bytemuck::pod_read_unaligned::<u16>(i)))
            .collect(),
        _ => bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<u32>)
            .collect(),
    };
    Some(indices)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::enums::*;

    use super::{effective_stride, read_indices, ClientArray};

    #[test]
    fn gl_enums_round_trip() {
        for array in ClientArray::ALL {
            assert_eq!(Some(array), ClientArray::from_gl(array.to_gl()));
        }
        assert_eq!(None, ClientArray::from_gl(TEXTURE_2D));
    }

    #[test]
    fn item_sizes_follow_the_array_kind() {
        assert_eq!(12, ClientArray::Vertex.item_size(3, FLOAT));
        assert_eq!(4, ClientArray::Color.item_size(4, UNSIGNED_BYTE));
        assert_eq!(6, ClientArray::Normal.item_size(7, SHORT));
        assert_eq!(4, ClientArray::Index.item_size(2, INT));
        assert_eq!(1, ClientArray::EdgeFlag.item_size(0, 0));
    }

    #[test]
    fn zero_stride_means_packed() {
        assert_eq!(12, effective_stride(0, 12));
        assert_eq!(32, effective_stride(32, 12));
    }

    #[test]
    fn reads_every_index_type() {
        let bytes: [u8; 3] = [2, 0, 1];
        let shorts: [u16; 3] = [300, 0, 7];
        let ints: [u32; 2] = [70_000, 1];
        // Safety: all of the arrays hold the amount of indices being read.
        unsafe {
            assert_eq!(Some(vec![2, 0, 1]), read_indices(bytes.as_ptr().cast(), UNSIGNED_BYTE, 3));
            assert_eq!(Some(vec![300, 0, 7]), read_indices(shorts.as_ptr().cast(), UNSIGNED_SHORT, 3));
            assert_eq!(Some(vec![70_000, 1]), read_indices(ints.as_ptr().cast(), UNSIGNED_INT, 2));
            assert_eq!(None, read_indices(ints.as_ptr().cast(), FLOAT, 2));
        }
    }

    #[test]
    fn no_indices_are_read_for_empty_draws() {
        // Safety: nothing is read.
        unsafe {
            assert_eq!(Some(vec![]), read_indices(core::ptr::null(), UNSIGNED_SHORT, 0));
            assert_eq!(None, read_indices(core::ptr::null(), FLOAT, 0));
        }
    }
}
