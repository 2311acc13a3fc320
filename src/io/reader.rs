use std::io;

use binary_reader::BinaryReader;

use crate::geometry::IntRect;

/// Extensions over `binary_reader::BinaryReader` for the record shapes
/// that recur across cast resources: fixed-length strings, Pascal
/// (u8-length-prefixed) strings, and QuickDraw-ordered rects.
pub trait ReaderExt {
    fn remaining(&self) -> usize;
    fn read_string(&mut self, len: usize) -> io::Result<String>;
    fn read_pascal_string(&mut self) -> io::Result<String>;
    fn read_u16_string(&mut self) -> io::Result<String>;
    fn read_u32_string(&mut self) -> io::Result<String>;
    /// Rects are stored as i16 top, left, bottom, right.
    fn read_rect(&mut self) -> io::Result<IntRect>;
}

impl ReaderExt for BinaryReader {
    fn remaining(&self) -> usize {
        self.length.saturating_sub(self.pos)
    }

    fn read_string(&mut self, len: usize) -> io::Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).to_string())
    }

    fn read_pascal_string(&mut self) -> io::Result<String> {
        let len = self.read_u8()? as usize;
        self.read_string(len)
    }

    fn read_u16_string(&mut self) -> io::Result<String> {
        let len = self.read_u16()? as usize;
        self.read_string(len)
    }

    fn read_u32_string(&mut self) -> io::Result<String> {
        let len = self.read_u32()? as usize;
        self.read_string(len)
    }

    fn read_rect(&mut self) -> io::Result<IntRect> {
        let top = self.read_i16()? as i32;
        let left = self.read_i16()? as i32;
        let bottom = self.read_i16()? as i32;
        let right = self.read_i16()? as i32;
        Ok(IntRect {
            left,
            top,
            right,
            bottom,
        })
    }
}
