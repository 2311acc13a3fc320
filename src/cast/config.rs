use binary_reader::{BinaryReader, Endian};

use crate::error::CastError;
use crate::geometry::IntRect;
use crate::io::reader::ReaderExt;

/// Versions from this one on store the cast table as tagged CASt
/// resources; older files use the flat VWCR record.
pub const FILE_VER_TAGGED: u16 = 400;

const MIN_CONFIG_LEN: usize = 20;

/// Decoded header record (VWCF/DRCF): the library's scalar metadata.
#[derive(Clone, Debug, Default)]
pub struct CastConfig {
    pub version: u16,
    pub movie_rect: IntRect,
    pub cast_array_start: u16,
    pub cast_array_end: u16,
    pub cast_id_offset: u16,
    pub stage_color: u8,
    pub default_palette: i8,
}

impl CastConfig {
    /// Read the fixed header fields. Newer files append fields past the
    /// fixed part; those are tolerated and ignored.
    pub fn read(data: &[u8]) -> Result<CastConfig, CastError> {
        if data.len() < MIN_CONFIG_LEN {
            return Err(CastError::MalformedHeader { len: data.len() });
        }
        let mut reader = BinaryReader::from_u8(data);
        reader.set_endian(Endian::Big);

        let /*  0 */ _len = reader.read_u16()?;
        let /*  2 */ version = reader.read_u16()?;
        let /*  4 */ movie_rect = reader.read_rect()?;
        let /* 12 */ cast_array_start = reader.read_u16()?;
        let /* 14 */ cast_array_end = reader.read_u16()?;
        let /* 16 */ cast_id_offset = reader.read_u16()?;
        let /* 18 */ stage_color = reader.read_u8()?;
        let /* 19 */ default_palette = reader.read_i8()?;

        Ok(CastConfig {
            version,
            movie_rect,
            cast_array_start,
            cast_array_end,
            cast_id_offset,
            stage_color,
            default_palette,
        })
    }

    pub fn is_tagged(&self) -> bool {
        self.version >= FILE_VER_TAGGED
    }
}
