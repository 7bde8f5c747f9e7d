//! The byte encoding of deferred calls.
//!
//! A queue buffer is a sequence of records. Each record starts with a
//! [`RecordHeader`], followed by the arguments of the call as plain values,
//! and is padded to a multiple of [`RECORD_ALIGN`] bytes. Variable-length
//! arguments are written as a `u32` element count followed by the elements.
//! Nothing in the encoding is a pointer into the buffer, so the buffer can be
//! reallocated freely while a record is being written.

use std::{borrow::Cow, marker::PhantomData, mem::size_of};

use bytemuck::{Pod, Zeroable};

use crate::{opcode::Opcode, GmlError};

/// Set on records whose execution posts a result to the queue's rendezvous
/// mailbox.
pub const RETURNS_VALUE: u16 = 1;

/// Records start at multiples of this, and their lengths are multiples of
/// this.
pub const RECORD_ALIGN: usize = 8;

/// The size of [`RecordHeader`].
pub const HEADER_SIZE: usize = size_of::<RecordHeader>();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RecordHeader {
    pub opcode: u16,
    pub flags: u16,
    /// Length of the whole record, including this header and the padding.
    pub len: u32,
}

/// A placeholder written into a record, to be filled in with
/// [`RecordWriter::patch`] once the value is known.
pub struct RecordMark<T> {
    offset: usize,
    _value: PhantomData<T>,
}

/// Appends one record to the end of a queue buffer.
///
/// The buffer grows to at least double its capacity when it runs out of room,
/// but never past `max_bytes`, unless a single record needs more. A single
/// record longer than `max_bytes` is a fatal error.
pub struct RecordWriter<'a> {
    bytes: &'a mut Vec<u8>,
    start: usize,
    max_bytes: usize,
}

impl<'a> RecordWriter<'a> {
    pub fn begin(
        bytes: &'a mut Vec<u8>,
        opcode: Opcode,
        flags: u16,
        max_bytes: usize,
    ) -> RecordWriter<'a> {
        debug_assert_eq!(0, bytes.len() % RECORD_ALIGN);
        let start = bytes.len();
        let mut writer = RecordWriter {
            bytes,
            start,
            max_bytes,
        };
        writer.put(RecordHeader {
            opcode: opcode.raw(),
            flags,
            len: 0,
        });
        writer
    }

    pub fn put<T: Pod>(&mut self, value: T) {
        self.extend(bytemuck::bytes_of(&value));
    }

    /// Writes the length of `values` followed by the values.
    pub fn put_slice<T: Pod>(&mut self, values: &[T]) {
        self.put(Self::length_prefix(values.len()));
        self.extend(bytemuck::cast_slice(values));
    }

    /// Like [`RecordWriter::put_slice`], with a separate flag for a missing
    /// slice.
    pub fn put_optional_slice<T: Pod>(&mut self, values: Option<&[T]>) {
        self.put(u32::from(values.is_some()));
        self.put_slice(values.unwrap_or(&[]));
    }

    pub fn put_str(&mut self, value: &str) {
        self.put_slice(value.as_bytes());
    }

    /// Writes `bytes` without a length. Combined with [`RecordWriter::mark`],
    /// this writes a slice whose length isn't known up front.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.extend(bytes);
    }

    /// Reserves room for a `T` to be written later.
    pub fn mark<T: Pod>(&mut self) -> RecordMark<T> {
        let offset = self.bytes.len();
        self.put(T::zeroed());
        RecordMark {
            offset,
            _value: PhantomData,
        }
    }

    pub fn patch<T: Pod>(&mut self, mark: RecordMark<T>, value: T) {
        let range = mark.offset..mark.offset + size_of::<T>();
        self.bytes[range].copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Pads the record and writes its length into the header. Returns the
    /// length of the record.
    pub fn finish(mut self) -> usize {
        let unpadded = self.bytes.len() - self.start;
        let len = unpadded.next_multiple_of(RECORD_ALIGN);
        self.reserve(len - unpadded);
        self.bytes.resize(self.start + len, 0);
        let Ok(len_u32) = u32::try_from(len) else {
            too_large(len, self.max_bytes);
        };
        let header_len = self.start + 4..self.start + HEADER_SIZE;
        self.bytes[header_len].copy_from_slice(&len_u32.to_ne_bytes());
        len
    }

    /// Removes the partially written record from the buffer.
    pub fn cancel(self) {
        self.bytes.truncate(self.start);
    }

    fn length_prefix(len: usize) -> u32 {
        match u32::try_from(len) {
            Ok(len) => len,
            Err(_) => too_large(len, u32::MAX as usize),
        }
    }

    fn extend(&mut self, data: &[u8]) {
        self.reserve(data.len());
        self.bytes.extend_from_slice(data);
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.bytes.len() + additional;
        let record_len = needed - self.start;
        if record_len > self.max_bytes {
            too_large(record_len, self.max_bytes);
        }
        if needed <= self.bytes.capacity() {
            return;
        }
        let old_capacity = self.bytes.capacity();
        let doubled = old_capacity.saturating_mul(2);
        let new_capacity = doubled.min(self.max_bytes).max(needed);
        if let Err(err) = self.bytes.try_reserve_exact(new_capacity - self.bytes.len()) {
            tracing::error!("failed to grow a queue buffer to {new_capacity} bytes: {err}");
            panic!("failed to grow a queue buffer to {new_capacity} bytes: {err}");
        }
        tracing::debug!(
            "grew a queue buffer from {old_capacity} to {} bytes",
            self.bytes.capacity()
        );
    }
}

fn too_large(len: usize, max: usize) -> ! {
    let err = GmlError::RecordTooLarge { len, max };
    tracing::error!("{err}");
    panic!("{err}");
}

/// A decoded record, borrowing the queue buffer.
pub struct Record<'a> {
    pub opcode: Opcode,
    pub flags: u16,
    pub args: ArgReader<'a>,
}

/// Iterates over the records of a queue buffer.
pub struct RecordReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> RecordReader<'a> {
        RecordReader { bytes, offset: 0 }
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let remaining = &self.bytes[self.offset..];
        if remaining.is_empty() {
            return None;
        }
        let Some(header_bytes) = remaining.get(..HEADER_SIZE) else {
            corrupt_buffer(self.offset, "truncated record header");
        };
        let header: RecordHeader = bytemuck::pod_read_unaligned(header_bytes);
        let len = header.len as usize;
        if len < HEADER_SIZE || len % RECORD_ALIGN != 0 || len > remaining.len() {
            corrupt_buffer(self.offset, "invalid record length");
        }
        let Some(opcode) = Opcode::from_raw(header.opcode) else {
            corrupt_buffer(self.offset, "unknown opcode");
        };
        self.offset += len;
        Some(Record {
            opcode,
            flags: header.flags,
            args: ArgReader {
                opcode,
                bytes: &remaining[HEADER_SIZE..len],
            },
        })
    }
}

fn corrupt_buffer(offset: usize, problem: &str) -> ! {
    tracing::error!("corrupted queue buffer at byte {offset}: {problem}");
    panic!("corrupted queue buffer at byte {offset}: {problem}");
}

/// Reads the arguments of one record in the order they were written.
pub struct ArgReader<'a> {
    opcode: Opcode,
    bytes: &'a [u8],
}

impl<'a> ArgReader<'a> {
    pub fn get<T: Pod>(&mut self) -> T {
        let bytes = self.take(size_of::<T>());
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Reads a slice written with [`RecordWriter::put_slice`]. Borrows the
    /// buffer if it happens to be aligned for `T`.
    pub fn get_slice<T: Pod>(&mut self) -> Cow<'a, [T]> {
        let len = self.get::<u32>() as usize;
        let Some(byte_len) = len.checked_mul(size_of::<T>()) else {
            self.truncated();
        };
        let bytes = self.take(byte_len);
        match bytemuck::try_cast_slice(bytes) {
            Ok(values) => Cow::Borrowed(values),
            Err(_) => Cow::Owned(bytemuck::pod_collect_to_vec(bytes)),
        }
    }

    pub fn get_bytes(&mut self) -> &'a [u8] {
        let len = self.get::<u32>() as usize;
        self.take(len)
    }

    pub fn get_optional_slice<T: Pod>(&mut self) -> Option<Cow<'a, [T]>> {
        let present = self.get::<u32>() != 0;
        let values = self.get_slice();
        present.then_some(values)
    }

    pub fn get_str(&mut self) -> &'a str {
        let bytes = self.get_bytes();
        match core::str::from_utf8(bytes) {
            Ok(value) => value,
            Err(_) => self.truncated(),
        }
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        if len > self.bytes.len() {
            self.truncated();
        }
        let (taken, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        taken
    }

    fn truncated(&self) -> ! {
        tracing::error!("truncated {} record", self.opcode.name());
        panic!("truncated {} record", self.opcode.name());
    }
}

#[cfg(test)]
mod tests {
    use crate::opcode::Opcode;

    use super::{RecordReader, RecordWriter, HEADER_SIZE, RECORD_ALIGN, RETURNS_VALUE};

    #[test]
    fn records_are_padded_and_self_describing() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Color4ub, 0, 1024);
        writer.put([1u8, 2, 3, 4]);
        assert_eq!(HEADER_SIZE + RECORD_ALIGN, writer.finish());
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::IsTexture, RETURNS_VALUE, 1024);
        writer.put(5u32);
        writer.finish();
        assert_eq!(32, bytes.len());

        let mut records = RecordReader::new(&bytes);
        let mut color = records.next().unwrap();
        assert_eq!(Opcode::Color4ub, color.opcode);
        assert_eq!([1u8, 2, 3, 4], color.args.get::<[u8; 4]>());
        let mut query = records.next().unwrap();
        assert_eq!(RETURNS_VALUE, query.flags);
        assert_eq!(5, query.args.get::<u32>());
        assert!(records.next().is_none());
    }

    #[test]
    fn marks_survive_growth() {
        let mut bytes = Vec::with_capacity(8);
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::ShaderSource, 0, 1 << 20);
        let mark = writer.mark::<u32>();
        let text = "x".repeat(300);
        writer.put_str(&text);
        writer.patch(mark, 300);
        writer.finish();
        assert!(bytes.capacity() >= 300);

        let mut record = RecordReader::new(&bytes).next().unwrap();
        assert_eq!(300, record.args.get::<u32>());
        assert_eq!(text, record.args.get_str());
    }

    #[test]
    fn slices_read_back_regardless_of_alignment() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Lightfv, 0, 1024);
        writer.put(1u8);
        writer.put_slice(&[1.0f32, 2.0, 3.0]);
        writer.put_optional_slice::<u8>(None);
        writer.finish();

        let mut record = RecordReader::new(&bytes).next().unwrap();
        assert_eq!(1, record.args.get::<u8>());
        assert_eq!(&[1.0, 2.0, 3.0][..], &*record.args.get_slice::<f32>());
        assert!(record.args.get_optional_slice::<u8>().is_none());
    }

    #[test]
    fn growth_stops_at_the_bound() {
        let mut bytes = Vec::with_capacity(64);
        for _ in 0..3 {
            let mut writer = RecordWriter::begin(&mut bytes, Opcode::BufferSubData, 0, 100);
            writer.put([0u8; 40]);
            writer.finish();
        }
        assert!(bytes.capacity() < 200);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn oversized_records_are_fatal() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::BufferData, 0, 64);
        writer.put_slice(&[0u8; 128]);
    }

    #[test]
    #[should_panic(expected = "truncated")]
    fn reading_past_the_record_is_fatal() {
        let mut bytes = Vec::new();
        let mut writer = RecordWriter::begin(&mut bytes, Opcode::Enable, 0, 64);
        writer.put(1u32);
        writer.finish();
        let mut record = RecordReader::new(&bytes).next().unwrap();
        let _ = record.args.get::<[u32; 2]>();
        let _ = record.args.get::<u32>();
    }

    #[test]
    #[should_panic(expected = "unknown opcode")]
    fn unknown_opcodes_are_fatal() {
        let header = super::RecordHeader {
            opcode: u16::MAX,
            flags: 0,
            len: HEADER_SIZE as u32,
        };
        let bytes = bytemuck::bytes_of(&header).to_vec();
        let _ = RecordReader::new(&bytes).next();
    }
}
