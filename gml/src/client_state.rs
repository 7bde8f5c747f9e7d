//! The client-array state each producer keeps for itself.
//!
//! Array pointers are read by the draw calls, not by the pointer setters, so
//! the setters are not deferred at all: the producer remembers them, and each
//! draw copies what it reads from them into its record. Enabling and binding
//! are both remembered and deferred, because the server needs to know which
//! arrays to set up, and the rest of the server's state depends on them.

use std::collections::{BTreeMap, BTreeSet};

use core::ffi::c_void;

use enum_map::EnumMap;
use gl_backend::{enums::*, formats, ClientArray, GLboolean, GLenum, GLint, GLsizei, GLuint};

/// A raw pointer into the memory of the thread that set it. Only dereferenced
/// by that same thread, during the draw call that snapshots it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ClientPointer(pub *const c_void);

// Safety: the pointer is never dereferenced by another thread than the one
// owning the memory, see above.
unsafe impl Send for ClientPointer {}

/// Everything a pointer setter call said about one array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ArrayPointer {
    pub size: GLint,
    pub ty: GLenum,
    pub stride: GLsizei,
    pub normalized: GLboolean,
    /// A client memory address if `buffer` is 0, an offset into `buffer`
    /// otherwise.
    pub pointer: ClientPointer,
    /// The `ARRAY_BUFFER` that was bound when the pointer was set.
    pub buffer: GLuint,
}

/// Which array an [`ArrayPointer`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArraySlot {
    Client(ClientArray),
    Attrib(GLuint),
}

impl ArraySlot {
    pub fn item_size(self, array: &ArrayPointer) -> usize {
        match self {
            ArraySlot::Client(kind) => kind.item_size(array.size, array.ty),
            ArraySlot::Attrib(_) => {
                usize::try_from(array.size).unwrap_or(0) * formats::bytes_per_component(array.ty)
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct ClientState {
    pub array_buffer: GLuint,
    pub element_array_buffer: GLuint,
    enabled: EnumMap<ClientArray, bool>,
    pointers: EnumMap<ClientArray, Option<ArrayPointer>>,
    enabled_attribs: BTreeSet<GLuint>,
    attribs: BTreeMap<GLuint, ArrayPointer>,
}

impl ClientState {
    pub fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        match target {
            ARRAY_BUFFER => self.array_buffer = buffer,
            ELEMENT_ARRAY_BUFFER => self.element_array_buffer = buffer,
            _ => {}
        }
    }

    pub fn set_enabled(&mut self, array: GLenum, enabled: bool) {
        if let Some(array) = ClientArray::from_gl(array) {
            self.enabled[array] = enabled;
        }
    }

    pub fn set_attrib_enabled(&mut self, index: GLuint, enabled: bool) {
        if enabled {
            self.enabled_attribs.insert(index);
        } else {
            self.enabled_attribs.remove(&index);
        }
    }

    pub fn set_pointer(
        &mut self,
        slot: ArraySlot,
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
            normalized,
            pointer: ClientPointer(pointer),
            buffer: self.array_buffer,
        };
        match slot {
            ArraySlot::Client(kind) => self.pointers[kind] = Some(array),
            ArraySlot::Attrib(index) => {
                self.attribs.insert(index, array);
            }
        }
    }

    /// The arrays a draw call made now would read, in a fixed order: the
    /// client arrays in [`ClientArray::ALL`] order, then the generic
    /// attributes by index. Enabled arrays without a pointer are skipped.
    pub fn enabled_arrays(&self) -> impl Iterator<Item = (ArraySlot, ArrayPointer)> + '_ {
        let client = ClientArray::ALL
            .into_iter()
            .filter(|kind| self.enabled[*kind])
            .filter_map(|kind| Some((ArraySlot::Client(kind), self.pointers[kind]?)));
        let attribs = self
            .enabled_attribs
            .iter()
            .filter_map(|index| Some((ArraySlot::Attrib(*index), *self.attribs.get(index)?)));
        client.chain(attribs)
    }
}

#[cfg(test)]
mod tests {
    use gl_backend::{enums::*, ClientArray};

    use super::{ArraySlot, ClientState};

    #[test]
    fn pointers_remember_the_bound_buffer() {
        let mut state = ClientState::default();
        state.set_enabled(VERTEX_ARRAY, true);
        state.set_enabled(COLOR_ARRAY, true);
        state.set_pointer(ArraySlot::Client(ClientArray::Color), 4, UNSIGNED_BYTE, 0, 0, core::ptr::null());
        state.bind_buffer(ARRAY_BUFFER, 3);
        state.set_pointer(ArraySlot::Client(ClientArray::Vertex), 3, FLOAT, 0, 0, core::ptr::null());

        let arrays = state.enabled_arrays().collect::<Vec<_>>();
        assert_eq!(2, arrays.len());
        assert_eq!(ArraySlot::Client(ClientArray::Vertex), arrays[0].0);
        assert_eq!(3, arrays[0].1.buffer);
        assert_eq!(ArraySlot::Client(ClientArray::Color), arrays[1].0);
        assert_eq!(0, arrays[1].1.buffer);
    }

    #[test]
    fn disabled_and_unset_arrays_are_skipped() {
        let mut state = ClientState::default();
        state.set_enabled(NORMAL_ARRAY, true);
        state.set_pointer(ArraySlot::Client(ClientArray::TexCoord), 2, FLOAT, 0, 0, core::ptr::null());
        state.set_pointer(ArraySlot::Attrib(2), 4, FLOAT, 0, 0, core::ptr::null());
        state.set_pointer(ArraySlot::Attrib(5), 4, FLOAT, 0, 0, core::ptr::null());
        state.set_attrib_enabled(5, true);
        state.set_attrib_enabled(7, true);

        let slots = state.enabled_arrays().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(vec![ArraySlot::Attrib(5)], slots);
        state.set_attrib_enabled(5, false);
        assert_eq!(0, state.enabled_arrays().count());
    }
}
