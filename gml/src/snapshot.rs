//! Deferred draw calls.
//!
//! A draw reads the client memory behind the array pointers when it's made.
//! By the time the server executes the record, that memory may have been
//! changed or freed, so the producer copies everything the draw would read
//! into the record, and the server points the arrays at the copy.
//!
//! There are four ways a draw is replayed:
//!
//! - [`Replay::Arrays`]: `draw_arrays`. Client arrays are copied from `first`
//!   to `first + count`, tightly packed, and buffer-sourced arrays are offset
//!   by `first` elements, so the replay starts at element 0.
//! - [`Replay::Deindexed`]: `draw_elements` with client-side indices and only
//!   client arrays. The referenced elements are copied in index order, and
//!   the replay is a `draw_arrays` over the copy.
//! - [`Replay::Rebased`]: `draw_elements` with client-side indices and at
//!   least one buffer-sourced array. Buffer contents can't be gathered on this
//!   side, so the indices are copied (minus the smallest one), the client
//!   arrays are copied from the smallest to the largest index, the buffer
//!   arrays are offset by the smallest index, and the replay is indexed.
//! - [`Replay::BufferIndices`]: `draw_elements` with a bound
//!   `ELEMENT_ARRAY_BUFFER`. The index pointer is an offset, so the indices
//!   can't be read here, and every enabled array must be buffer-sourced.

use std::borrow::Cow;

use core::ffi::c_void;

use arrayvec::ArrayVec;
use bytemuck::{Pod, Zeroable};
use enum_map::Enum;
use gl_backend::{
    effective_stride, enums::*, read_indices, ClientArray, GLenum, GLint, GLsizei, GLuint,
    GlBackend,
};

use crate::{
    client_state::{ArrayPointer, ArraySlot, ClientState},
    record::{ArgReader, RecordWriter},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub(crate) enum Replay {
    Arrays = 0,
    Deindexed = 1,
    Rebased = 2,
    BufferIndices = 3,
}

impl Replay {
    fn from_raw(raw: u32) -> Option<Replay> {
        [Replay::Arrays, Replay::Deindexed, Replay::Rebased, Replay::BufferIndices]
            .into_iter()
            .find(|replay| *replay as u32 == raw)
    }
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct DrawHeader {
    mode: u32,
    count: i32,
    replay: u32,
    index_type: u32,
    /// The `ARRAY_BUFFER` the producer had bound, restored after the draw.
    array_buffer: u32,
    element_buffer: u32,
    /// The index offset into `element_buffer`, for [`Replay::BufferIndices`].
    index_offset: u64,
    /// The `draw_range_elements` hint, rebased for [`Replay::Rebased`].
    start: u32,
    end: u32,
    arrays: u32,
    _padding: u32,
}

const CLIENT_SLOT_ATTRIB: u32 = u32::MAX;

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct ArrayHeader {
    /// [`ClientArray`] index, or [`CLIENT_SLOT_ATTRIB`].
    client_slot: u32,
    attrib_index: u32,
    size: i32,
    ty: u32,
    stride: i32,
    normalized: u32,
    buffer: u32,
    /// Nonzero if the array's contents follow this header.
    copied: u32,
    /// The offset into `buffer`, if not copied.
    offset: u64,
}

/// The index range of a `draw_range_elements` call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IndexRange {
    pub start: GLuint,
    pub end: GLuint,
}

/// A draw call as made by the producer.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Draw {
    Arrays {
        mode: GLenum,
        first: GLint,
        count: GLsizei,
    },
    Elements {
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        indices: *const c_void,
        range: Option<IndexRange>,
    },
}

/// Why a draw call could not be deferred.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SnapshotError {
    /// Indices in a buffer can't be resolved against arrays in client memory.
    ClientArraysWithElementBuffer,
    UnsupportedIndexType(GLenum),
}

/// The fixed-function arrays come first, and there are only so many of them.
type ClientArrays = ArrayVec<(ArraySlot, ArrayPointer), { ClientArray::ALL.len() }>;

/// Writes the snapshot of `draw` into the record. On error, nothing past the
/// record header has been written, and the record should be canceled.
///
/// ### Safety
///
/// The enabled client-memory arrays of `state` and the indices of `draw` (if
/// client-side) must be valid for the reads the draw would make if it was
/// executed right now.
pub(crate) unsafe fn encode_draw(
    writer: &mut RecordWriter,
    state: &ClientState,
    draw: Draw,
) -> Result<(), SnapshotError> {
    let mut client_arrays = ClientArrays::new();
    let mut attribs = Vec::new();
    for (slot, array) in state.enabled_arrays() {
        match slot {
            ArraySlot::Client(_) => client_arrays.push((slot, array)),
            ArraySlot::Attrib(_) => attribs.push((slot, array)),
        }
    }
    let arrays = || client_arrays.iter().chain(attribs.iter()).copied();
    let any_client_memory = arrays().any(|(_, array)| array.buffer == 0);

    let mut header = DrawHeader {
        array_buffer: state.array_buffer,
        arrays: arrays().count() as u32,
        ..DrawHeader::zeroed()
    };

    match draw {
        Draw::Arrays { mode, first, count } => {
            header.mode = mode;
            header.count = count;
            header.replay = Replay::Arrays as u32;
            writer.put(header);
            let first = usize::try_from(first).unwrap_or(0);
            let count = usize::try_from(count).unwrap_or(0);
            for (slot, array) in arrays() {
                // Safety: the caller guarantees elements first..first+count
                // are readable.
                unsafe { put_array(writer, slot, &array, first, first..first + count) };
            }
        }

        Draw::Elements { mode, count, ty, indices, range } => {
            header.mode = mode;
            header.count = count;
            header.index_type = ty;
            if let Some(range) = range {
                header.start = range.start;
                header.end = range.end;
            }

            if state.element_array_buffer != 0 {
                if any_client_memory {
                    return Err(SnapshotError::ClientArraysWithElementBuffer);
                }
                header.replay = Replay::BufferIndices as u32;
                header.element_buffer = state.element_array_buffer;
                header.index_offset = indices as usize as u64;
                writer.put(header);
                for (slot, array) in arrays() {
                    // Safety: buffer-sourced arrays aren't read.
                    unsafe { put_array(writer, slot, &array, 0, 0..0) };
                }
                return Ok(());
            }

            let count_usize = usize::try_from(count).unwrap_or(0);
            // Safety: guaranteed by the caller.
            let Some(read) = (unsafe { read_indices(indices, ty, count_usize) }) else {
                return Err(SnapshotError::UnsupportedIndexType(ty));
            };

            if !arrays().any(|(_, array)| array.buffer != 0) {
                header.replay = Replay::Deindexed as u32;
                writer.put(header);
                for (slot, array) in arrays() {
                    let elements = read.iter().map(|&i| i as usize);
                    // Safety: the caller guarantees every referenced element
                    // is readable.
                    unsafe { put_array(writer, slot, &array, 0, elements) };
                }
            } else {
                let min = read.iter().copied().min().unwrap_or(0);
                let max = read.iter().copied().max().unwrap_or(0);
                header.replay = Replay::Rebased as u32;
                header.index_type = UNSIGNED_INT;
                header.start = header.start.saturating_sub(min);
                header.end = header.end.saturating_sub(min);
                writer.put(header);
                let rebased = read.iter().map(|&i| i - min).collect::<Vec<u32>>();
                writer.put_slice(&rebased);
                let (min, max) = (min as usize, max as usize);
                let span = if read.is_empty() { min..min } else { min..max + 1 };
                for (slot, array) in arrays() {
                    // Safety: the caller guarantees every referenced element,
                    // and thus everything between the smallest and largest
                    // one, is readable.
                    unsafe { put_array(writer, slot, &array, min, span.clone()) };
                }
            }
        }
    }
    Ok(())
}

/// Writes one array: buffer-sourced arrays as their offset advanced by
/// `base` elements, client arrays as a packed copy of `elements`.
///
/// ### Safety
///
/// If `array` is in client memory, it must be valid for reads of every
/// element in `elements`.
unsafe fn put_array(
    writer: &mut RecordWriter,
    slot: ArraySlot,
    array: &ArrayPointer,
    base: usize,
    elements: impl Iterator<Item = usize>,
) {
    let (client_slot, attrib_index) = match slot {
        ArraySlot::Client(kind) => (kind.into_usize() as u32, 0),
        ArraySlot::Attrib(index) => (CLIENT_SLOT_ATTRIB, index),
    };
    let item_size = slot.item_size(array);
    let stride = effective_stride(array.stride, item_size);
    let copied = array.buffer == 0;
    let header = ArrayHeader {
        client_slot,
        attrib_index,
        size: array.size,
        ty: array.ty,
        stride: if copied { 0 } else { array.stride },
        normalized: u32::from(array.normalized),
        buffer: array.buffer,
        copied: u32::from(copied),
        offset: if copied {
            0
        } else {
            (array.pointer.0 as usize + base * stride) as u64
        },
    };
    writer.put(header);
    if copied {
        // Read back as a byte slice, with the length written at the mark.
        let len = writer.mark::<u32>();
        let mut copied_bytes = 0usize;
        for element in elements {
            // Safety: guaranteed by the caller.
            let item = unsafe {
                let start = array.pointer.0.cast::<u8>().add(element * stride);
                core::slice::from_raw_parts(start, item_size)
            };
            writer.put_bytes(item);
            copied_bytes += item_size;
        }
        writer.patch(len, u32::try_from(copied_bytes).unwrap_or(u32::MAX));
    }
}

struct ReplayArray<'a> {
    header: ArrayHeader,
    data: Option<&'a [u8]>,
}

/// Sets up the arrays of a draw record and makes the draw.
pub(crate) fn replay_draw<B: GlBackend + ?Sized>(
    backend: &mut B,
    args: &mut ArgReader,
    range_call: bool,
) {
    let header: DrawHeader = args.get();
    let Some(replay) = Replay::from_raw(header.replay) else {
        tracing::error!("invalid draw replay kind {}", header.replay);
        panic!("invalid draw replay kind {}", header.replay);
    };
    let indices: Option<Cow<[u32]>> = (replay == Replay::Rebased).then(|| args.get_slice());
    let mut arrays = Vec::with_capacity(header.arrays as usize);
    for _ in 0..header.arrays {
        let array_header: ArrayHeader = args.get();
        let data = (array_header.copied != 0).then(|| args.get_bytes());
        arrays.push(ReplayArray {
            header: array_header,
            data,
        });
    }

    let mut bound = header.array_buffer;
    for array in &arrays {
        let h = &array.header;
        if h.buffer != bound {
            backend.bind_buffer(ARRAY_BUFFER, h.buffer);
            bound = h.buffer;
        }
        let pointer = match array.data {
            Some(data) => data.as_ptr().cast::<c_void>(),
            None => h.offset as usize as *const c_void,
        };
        if h.client_slot == CLIENT_SLOT_ATTRIB {
            let normalized = h.normalized as u8;
            backend.vertex_attrib_pointer(h.attrib_index, h.size, h.ty, normalized, h.stride, pointer);
            continue;
        }
        match ClientArray::from_usize(h.client_slot as usize) {
            ClientArray::Vertex => backend.vertex_pointer(h.size, h.ty, h.stride, pointer),
            ClientArray::Color => backend.color_pointer(h.size, h.ty, h.stride, pointer),
            ClientArray::TexCoord => backend.tex_coord_pointer(h.size, h.ty, h.stride, pointer),
            ClientArray::Normal => backend.normal_pointer(h.ty, h.stride, pointer),
            ClientArray::Index => backend.index_pointer(h.ty, h.stride, pointer),
            ClientArray::EdgeFlag => backend.edge_flag_pointer(h.stride, pointer),
        }
    }
    if bound != header.array_buffer {
        backend.bind_buffer(ARRAY_BUFFER, header.array_buffer);
    }

    // Safety: every client-memory array points into `arrays`, which holds
    // exactly the elements the draw reads: `count` packed elements for
    // Arrays and Deindexed, and the elements up to the largest rebased index
    // for Rebased. The rebased indices are in `indices`. BufferIndices reads
    // no client memory.
    unsafe {
        match replay {
            Replay::Arrays | Replay::Deindexed => backend.draw_arrays(header.mode, 0, header.count),
            Replay::Rebased => {
                let indices = indices.as_deref().unwrap_or(&[]);
                let pointer = indices.as_ptr().cast::<c_void>();
                if range_call {
                    backend.draw_range_elements(header.mode, header.start, header.end, header.count, UNSIGNED_INT, pointer);
                } else {
                    backend.draw_elements(header.mode, header.count, UNSIGNED_INT, pointer);
                }
            }
            Replay::BufferIndices => {
                let pointer = header.index_offset as usize as *const c_void;
                if range_call {
                    backend.draw_range_elements(header.mode, header.start, header.end, header.count, header.index_type, pointer);
                } else {
                    backend.draw_elements(header.mode, header.count, header.index_type, pointer);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gl_backend::{
        enums::*,
        recording::{CapturedArray, DrawIndices},
        ClientArray, GlBackend, RecordingBackend,
    };

    use crate::{
        client_state::{ArraySlot, ClientState},
        opcode::Opcode,
        record::{RecordReader, RecordWriter},
    };

    use super::{encode_draw, replay_draw, Draw, IndexRange, SnapshotError};

    fn round_trip(state: &ClientState, draw: Draw) -> Result<RecordingBackend, SnapshotError> {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::DrawElements, 0, 1 << 20);
        // Safety: the tests keep the arrays alive until this returns.
        unsafe { encode_draw(&mut writer, state, draw)? };
        writer.finish();
        let mut backend = RecordingBackend::new();
        backend.bind_buffer(ARRAY_BUFFER, state.array_buffer);
        backend.bind_buffer(ELEMENT_ARRAY_BUFFER, state.element_array_buffer);
        backend.calls.clear();
        let mut record = RecordReader::new(&bytes).next().unwrap();
        let range_call = matches!(draw, Draw::Elements { range: Some(_), .. });
        replay_draw(&mut backend, &mut record.args, range_call);
        Ok(backend)
    }

    fn with_client_vertices(positions: &[u8]) -> ClientState {
        let mut state = ClientState::default();
        state.set_enabled(VERTEX_ARRAY, true);
        let slot = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(slot, 2, UNSIGNED_BYTE, 0, 0, positions.as_ptr().cast());
        state
    }

    #[test]
    fn arrays_copy_the_drawn_range() {
        let mut positions = [10u8, 11, 20, 21, 30, 31, 40, 41];
        let state = with_client_vertices(&positions);
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::DrawArrays, 0, 1 << 20);
        let draw = Draw::Arrays { mode: TRIANGLES, first: 1, count: 2 };
        // Safety: positions has elements 1 and 2.
        unsafe { encode_draw(&mut writer, &state, draw).unwrap() };
        writer.finish();
        // The draw must not see changes made after it was encoded.
        positions.fill(0);

        let mut backend = RecordingBackend::new();
        let mut record = RecordReader::new(&bytes).next().unwrap();
        replay_draw(&mut backend, &mut record.args, false);
        let draw = &backend.draws[0];
        assert_eq!(0, draw.first);
        assert_eq!(2, draw.count);
        assert_eq!(
            Some(&CapturedArray::Client(vec![20, 21, 30, 31])),
            draw.array(ClientArray::Vertex)
        );
    }

    #[test]
    fn client_indices_are_resolved_in_order() {
        let positions = [10u8, 11, 20, 21, 30, 31, 40, 41];
        let indices = [3u16, 0, 1, 3];
        let state = with_client_vertices(&positions);
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 4,
            ty: UNSIGNED_SHORT,
            indices: indices.as_ptr().cast(),
            range: None,
        };
        let backend = round_trip(&state, draw).unwrap();
        assert_eq!(vec!["vertex_pointer", "draw_arrays"], backend.call_names());
        assert_eq!(
            Some(&CapturedArray::Client(vec![40, 41, 10, 11, 20, 21, 40, 41])),
            backend.draws[0].array(ClientArray::Vertex)
        );
    }

    #[test]
    fn strided_arrays_are_packed() {
        // Interleaved: two position bytes, then two padding bytes.
        let interleaved = [1u8, 2, 0, 0, 3, 4, 0, 0, 5, 6, 0, 0];
        let mut state = ClientState::default();
        state.set_enabled(VERTEX_ARRAY, true);
        let slot = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(slot, 2, UNSIGNED_BYTE, 0, 4, interleaved.as_ptr().cast());
        let draw = Draw::Arrays { mode: POINTS, first: 0, count: 3 };
        let backend = round_trip(&state, draw).unwrap();
        assert_eq!(
            Some(&CapturedArray::Client(vec![1, 2, 3, 4, 5, 6])),
            backend.draws[0].array(ClientArray::Vertex)
        );
    }

    #[test]
    fn buffer_arrays_are_offset_by_first() {
        let mut state = ClientState::default();
        state.set_enabled(VERTEX_ARRAY, true);
        state.bind_buffer(ARRAY_BUFFER, 7);
        let slot = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(slot, 3, FLOAT, 0, 0, 8usize as *const _);
        state.bind_buffer(ARRAY_BUFFER, 0);
        let draw = Draw::Arrays { mode: TRIANGLES, first: 2, count: 3 };
        let backend = round_trip(&state, draw).unwrap();
        assert_eq!(
            Some(&CapturedArray::Buffer { buffer: 7, offset: 8 + 2 * 12, stride: 0 }),
            backend.draws[0].array(ClientArray::Vertex)
        );
        // The binding is switched for the pointer and then restored.
        let binds = backend.calls_named("bind_buffer").count();
        assert_eq!(2, binds);
    }

    #[test]
    fn mixed_sources_keep_the_draw_indexed() {
        let colors = [0u8, 1, 2, 3, 4, 5];
        let indices = [4u8, 2, 5];
        let mut state = ClientState::default();
        state.set_enabled(COLOR_ARRAY, true);
        state.set_enabled(VERTEX_ARRAY, true);
        let color = ArraySlot::Client(ClientArray::Color);
        state.set_pointer(color, 1, UNSIGNED_BYTE, 0, 0, colors.as_ptr().cast());
        state.bind_buffer(ARRAY_BUFFER, 9);
        let vertex = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(vertex, 2, FLOAT, 0, 0, core::ptr::null());
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 3,
            ty: UNSIGNED_BYTE,
            indices: indices.as_ptr().cast(),
            range: Some(IndexRange { start: 2, end: 5 }),
        };
        let backend = round_trip(&state, draw).unwrap();
        let draw = &backend.draws[0];
        assert_eq!(DrawIndices::Client(vec![2, 0, 3]), draw.indices);
        assert_eq!(
            Some(&CapturedArray::Buffer { buffer: 9, offset: 2 * 8, stride: 0 }),
            draw.array(ClientArray::Vertex)
        );
        assert_eq!(
            Some(&CapturedArray::Client(vec![4, 2, 5])),
            draw.array(ClientArray::Color)
        );
    }

    #[test]
    fn element_buffers_pass_offsets_through() {
        let mut state = ClientState::default();
        state.set_enabled(VERTEX_ARRAY, true);
        state.bind_buffer(ARRAY_BUFFER, 2);
        state.bind_buffer(ELEMENT_ARRAY_BUFFER, 3);
        let vertex = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(vertex, 3, FLOAT, 0, 16, core::ptr::null());
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 6,
            ty: UNSIGNED_SHORT,
            indices: 32usize as *const _,
            range: None,
        };
        let mut backend = RecordingBackend::new();
        backend.bind_buffer(ARRAY_BUFFER, 2);
        backend.bind_buffer(ELEMENT_ARRAY_BUFFER, 3);
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::DrawElements, 0, 1 << 20);
        // Safety: no client memory is read.
        unsafe { encode_draw(&mut writer, &state, draw).unwrap() };
        writer.finish();
        let mut record = RecordReader::new(&bytes).next().unwrap();
        replay_draw(&mut backend, &mut record.args, false);
        assert_eq!(
            DrawIndices::Buffer { buffer: 3, offset: 32, ty: UNSIGNED_SHORT },
            backend.draws[0].indices
        );
        assert_eq!(
            Some(&CapturedArray::Buffer { buffer: 2, offset: 0, stride: 16 }),
            backend.draws[0].array(ClientArray::Vertex)
        );
    }

    #[test]
    fn client_arrays_with_element_buffers_are_rejected() {
        let positions = [0u8; 4];
        let mut state = with_client_vertices(&positions);
        state.bind_buffer(ELEMENT_ARRAY_BUFFER, 3);
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 2,
            ty: UNSIGNED_BYTE,
            indices: core::ptr::null(),
            range: None,
        };
        assert_eq!(
            Some(SnapshotError::ClientArraysWithElementBuffer),
            round_trip(&state, draw).err()
        );
    }

    #[test]
    fn empty_draws_without_indices_copy_nothing() {
        let positions = [10u8, 11];
        let state = with_client_vertices(&positions);
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 0,
            ty: UNSIGNED_SHORT,
            indices: core::ptr::null(),
            range: None,
        };
        let backend = round_trip(&state, draw).unwrap();
        let draw = &backend.draws[0];
        assert_eq!(0, draw.count);
        assert_eq!(Some(&CapturedArray::Client(vec![])), draw.array(ClientArray::Vertex));
    }

    #[test]
    fn empty_rebased_draws_copy_no_elements() {
        let colors: Vec<u8> = Vec::new();
        let indices: [u32; 0] = [];
        let mut state = ClientState::default();
        state.set_enabled(COLOR_ARRAY, true);
        state.set_enabled(VERTEX_ARRAY, true);
        let color = ArraySlot::Client(ClientArray::Color);
        state.set_pointer(color, 4, UNSIGNED_BYTE, 0, 0, colors.as_ptr().cast());
        state.bind_buffer(ARRAY_BUFFER, 9);
        let vertex = ArraySlot::Client(ClientArray::Vertex);
        state.set_pointer(vertex, 2, FLOAT, 0, 0, core::ptr::null());
        let draw = Draw::Elements {
            mode: TRIANGLES,
            count: 0,
            ty: UNSIGNED_INT,
            indices: indices.as_ptr().cast(),
            range: None,
        };
        let backend = round_trip(&state, draw).unwrap();
        let draw = &backend.draws[0];
        assert_eq!(DrawIndices::Client(vec![]), draw.indices);
        assert_eq!(Some(&CapturedArray::Client(vec![])), draw.array(ClientArray::Color));
        assert_eq!(
            Some(&CapturedArray::Buffer { buffer: 9, offset: 0, stride: 0 }),
            draw.array(ClientArray::Vertex)
        );
    }

    #[test]
    fn generic_attributes_are_copied_too() {
        let weights = [1.0f32, 2.0, 3.0];
        let indices = [2u32, 2];
        let mut state = ClientState::default();
        state.set_attrib_enabled(4, true);
        let slot = ArraySlot::Attrib(4);
        state.set_pointer(slot, 1, FLOAT, TRUE, 0, weights.as_ptr().cast());
        let draw = Draw::Elements {
            mode: LINES,
            count: 2,
            ty: UNSIGNED_INT,
            indices: indices.as_ptr().cast(),
            range: None,
        };
        let backend = round_trip(&state, draw).unwrap();
        let expected = bytemuck::cast_slice::<f32, u8>(&[3.0, 3.0]).to_vec();
        assert_eq!(vec![(4, CapturedArray::Client(expected))], backend.draws[0].attribs);
    }
}
