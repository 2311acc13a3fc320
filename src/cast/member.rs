use binary_reader::{BinaryReader, Endian};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::CastError;
use crate::geometry::IntRect;
use crate::io::reader::ReaderExt;

/// Member type tags as stored in the cast table. The set is fixed by the
/// file format; anything outside it becomes an `Unsupported` placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum MemberTypeTag {
    Bitmap = 1,
    Text = 3,
    Shape = 8,
    Script = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ScriptType {
    Score = 1,
    Movie = 3,
    Parent = 7,
}

#[derive(Clone, Debug)]
pub struct BitmapMember {
    pub initial_rect: IntRect,
    pub reg_point: (i16, i16),
    pub bits_per_pixel: u8,
    pub palette_id: i8,
    /// Pixel data reference, decoded by the renderer, not here.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct TextMember {
    pub initial_rect: IntRect,
    pub alignment: i16,
    pub font_id: u16,
    pub font_size: u16,
    pub text: String,
}

impl TextMember {
    /// Text members whose content opens with the `--` marker carry an
    /// embedded score script rather than displayable text.
    pub fn embedded_script(&self) -> Option<&str> {
        if self.text.starts_with("--") {
            Some(&self.text)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct ShapeMember {
    pub shape_type: u8,
    pub initial_rect: IntRect,
    pub pattern: u16,
    pub fg_color: u8,
    pub bg_color: u8,
    pub fill_type: u8,
    pub line_thickness: u8,
    pub line_direction: u8,
}

#[derive(Clone, Debug)]
pub struct ScriptMember {
    pub script_type: ScriptType,
    pub source: String,
}

#[derive(Clone, Debug)]
pub enum CastMemberType {
    Bitmap(BitmapMember),
    Text(TextMember),
    Shape(ShapeMember),
    Script(ScriptMember),
    /// Unrecognized type tag. Occupies its id slot so the registry
    /// invariants hold, but exposes no payload.
    Unsupported { tag: u32 },
}

impl CastMemberType {
    pub fn type_string(&self) -> &str {
        match self {
            Self::Bitmap(_) => "bitmap",
            Self::Text(_) => "text",
            Self::Shape(_) => "shape",
            Self::Script(_) => "script",
            Self::Unsupported { .. } => "unsupported",
        }
    }

    pub fn as_script(&self) -> Option<&ScriptMember> {
        match self {
            Self::Script(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextMember> {
        match self {
            Self::Text(data) => Some(data),
            _ => None,
        }
    }
}

/// One loaded cast member. Constructed once by the factory during load,
/// mutated only through `mark_modified`, destroyed with the owning `Cast`.
#[derive(Clone, Debug)]
pub struct CastMember {
    pub id: u16,
    pub member_type: CastMemberType,
    modified: bool,
}

impl CastMember {
    /// The single polymorphism boundary: dispatch on the stored type tag
    /// and parse the matching payload layout. Unknown tags are not an
    /// error; a payload that does not parse is.
    pub fn from_tag(id: u16, tag: u32, data: &[u8]) -> Result<CastMember, CastError> {
        let member_type = match MemberTypeTag::from_u32(tag) {
            Some(MemberTypeTag::Bitmap) => read_bitmap(id, data)?,
            Some(MemberTypeTag::Text) => read_text(id, data)?,
            Some(MemberTypeTag::Shape) => read_shape(id, data)?,
            Some(MemberTypeTag::Script) => read_script(id, data)?,
            None => CastMemberType::Unsupported { tag },
        };
        Ok(CastMember {
            id,
            member_type,
            modified: false,
        })
    }

    /// Bounding rectangle declared in the member's payload, used for
    /// placement before first render. Payload-less members report an
    /// empty rect.
    pub fn initial_rect(&self) -> IntRect {
        match &self.member_type {
            CastMemberType::Bitmap(bitmap) => bitmap.initial_rect,
            CastMemberType::Text(text) => text.initial_rect,
            CastMemberType::Shape(shape) => shape.initial_rect,
            CastMemberType::Script(_) => IntRect::default(),
            CastMemberType::Unsupported { .. } => IntRect::default(),
        }
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

fn payload_reader(data: &[u8]) -> BinaryReader {
    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    reader
}

fn entry_err(id: u16) -> impl Fn(std::io::Error) -> CastError {
    move |err| CastError::entry(id, err.to_string())
}

fn read_bitmap(id: u16, data: &[u8]) -> Result<CastMemberType, CastError> {
    let mut reader = payload_reader(data);
    let initial_rect = reader.read_rect().map_err(entry_err(id))?;
    let reg_y = reader.read_i16().map_err(entry_err(id))?;
    let reg_x = reader.read_i16().map_err(entry_err(id))?;
    let bits_per_pixel = reader.read_u8().map_err(entry_err(id))?;
    let palette_id = reader.read_i8().map_err(entry_err(id))?;
    let rest = reader.remaining();
    let pixels = reader.read_bytes(rest).map_err(entry_err(id))?;
    Ok(CastMemberType::Bitmap(BitmapMember {
        initial_rect,
        reg_point: (reg_x, reg_y),
        bits_per_pixel,
        palette_id,
        data: pixels.to_vec(),
    }))
}

fn read_text(id: u16, data: &[u8]) -> Result<CastMemberType, CastError> {
    let mut reader = payload_reader(data);
    let initial_rect = reader.read_rect().map_err(entry_err(id))?;
    let alignment = reader.read_i16().map_err(entry_err(id))?;
    let font_id = reader.read_u16().map_err(entry_err(id))?;
    let font_size = reader.read_u16().map_err(entry_err(id))?;
    let text = reader.read_u16_string().map_err(entry_err(id))?;
    Ok(CastMemberType::Text(TextMember {
        initial_rect,
        alignment,
        font_id,
        font_size,
        text,
    }))
}

fn read_shape(id: u16, data: &[u8]) -> Result<CastMemberType, CastError> {
    let mut reader = payload_reader(data);
    let shape_type = reader.read_u8().map_err(entry_err(id))?;
    let initial_rect = reader.read_rect().map_err(entry_err(id))?;
    let pattern = reader.read_u16().map_err(entry_err(id))?;
    let fg_color = reader.read_u8().map_err(entry_err(id))?;
    let bg_color = reader.read_u8().map_err(entry_err(id))?;
    let fill_type = reader.read_u8().map_err(entry_err(id))?;
    let line_thickness = reader.read_u8().map_err(entry_err(id))?;
    let line_direction = reader.read_u8().map_err(entry_err(id))?;
    Ok(CastMemberType::Shape(ShapeMember {
        shape_type,
        initial_rect,
        pattern,
        fg_color,
        bg_color,
        fill_type,
        line_thickness,
        line_direction,
    }))
}

fn read_script(id: u16, data: &[u8]) -> Result<CastMemberType, CastError> {
    let mut reader = payload_reader(data);
    let raw_type = reader.read_u8().map_err(entry_err(id))?;
    let script_type = ScriptType::from_u8(raw_type)
        .ok_or_else(|| CastError::entry(id, format!("unknown script type {}", raw_type)))?;
    let source = reader.read_u32_string().map_err(entry_err(id))?;
    Ok(CastMemberType::Script(ScriptMember {
        script_type,
        source,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_payload() -> Vec<u8> {
        let mut data = vec![1u8];
        data.extend_from_slice(&[0, 10, 0, 20, 0, 110, 0, 220]); // rect
        data.extend_from_slice(&[0, 5]); // pattern
        data.extend_from_slice(&[255, 0, 1, 2, 0]);
        data
    }

    #[test]
    fn test_shape_payload_round_trip() {
        let member = CastMember::from_tag(4, MemberTypeTag::Shape as u32, &shape_payload()).unwrap();
        assert_eq!(member.id, 4);
        assert_eq!(member.initial_rect(), IntRect::new(20, 10, 220, 110));
        match &member.member_type {
            CastMemberType::Shape(shape) => {
                assert_eq!(shape.pattern, 5);
                assert_eq!(shape.fg_color, 255);
                assert_eq!(shape.line_thickness, 2);
            }
            other => panic!("expected shape, got {}", other.type_string()),
        }
    }

    #[test]
    fn test_unknown_tag_is_placeholder() {
        let member = CastMember::from_tag(7, 99, &[]).unwrap();
        assert_eq!(member.member_type.type_string(), "unsupported");
        assert_eq!(member.initial_rect(), IntRect::default());
    }

    #[test]
    fn test_truncated_payload_is_malformed_entry() {
        let result = CastMember::from_tag(3, MemberTypeTag::Bitmap as u32, &[0, 1, 2]);
        assert!(matches!(
            result,
            Err(CastError::MalformedEntry { id: 3, .. })
        ));
    }

    #[test]
    fn test_mark_modified() {
        let mut member = CastMember::from_tag(1, MemberTypeTag::Shape as u32, &shape_payload()).unwrap();
        assert!(!member.is_modified());
        member.mark_modified();
        assert!(member.is_modified());
    }

    #[test]
    fn test_text_embedded_script_marker() {
        let text = TextMember {
            initial_rect: IntRect::default(),
            alignment: 0,
            font_id: 0,
            font_size: 12,
            text: "-- on exitFrame".to_string(),
        };
        assert!(text.embedded_script().is_some());
    }
}
