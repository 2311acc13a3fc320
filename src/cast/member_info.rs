use binary_reader::{BinaryReader, Endian};

use crate::error::CastError;
use crate::io::reader::ReaderExt;

/// Per-member metadata: the source of truth the name and script-id
/// indexes are derived from. Lives alongside the member under the same
/// numeric id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CastMemberInfo {
    pub name: String,
    pub script_id: Option<u32>,
    pub flags: u32,
}

impl CastMemberInfo {
    /// Decode a metadata sub-record: flags, optional script id (0 means
    /// none), then the Pascal-string display name. A name whose length
    /// prefix runs past the record is a `MalformedEntry`.
    pub fn read(id: u16, data: &[u8]) -> Result<CastMemberInfo, CastError> {
        let mut reader = BinaryReader::from_u8(data);
        reader.set_endian(Endian::Big);

        let flags = reader
            .read_u32()
            .map_err(|err| CastError::entry(id, err.to_string()))?;
        let raw_script_id = reader
            .read_u32()
            .map_err(|err| CastError::entry(id, err.to_string()))?;
        let name = reader
            .read_pascal_string()
            .map_err(|err| CastError::entry(id, format!("bad name record: {}", err)))?;

        Ok(CastMemberInfo {
            name,
            script_id: if raw_script_id == 0 {
                None
            } else {
                Some(raw_script_id)
            },
            flags,
        })
    }
}
