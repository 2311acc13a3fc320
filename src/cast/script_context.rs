use binary_reader::{BinaryReader, Endian};
use fxhash::FxHashMap;
use log::{debug, warn};
use num_traits::FromPrimitive;

use crate::archive::{fourcc, Archive};
use crate::cast::member::ScriptType;
use crate::io::reader::ReaderExt;

/// Extracted, not-yet-executed script text for one script-bearing
/// member. The interpreter collaborator compiles and runs these; this
/// crate only extracts and hands off.
#[derive(Clone, Debug)]
pub struct ScriptSource {
    pub owner_id: Option<u16>,
    pub script_type: ScriptType,
    pub text: String,
}

/// Registry of extracted scripts keyed by script id, handed to the
/// script execution collaborator after load.
#[derive(Debug, Default)]
pub struct ScriptContext {
    scripts: FxHashMap<u32, ScriptSource>,
}

impl ScriptContext {
    pub fn register(&mut self, id: u32, source: ScriptSource) {
        debug!(
            "script {} ({:?}, member {:?}): {} bytes",
            id,
            source.script_type,
            source.owner_id,
            source.text.len()
        );
        self.scripts.insert(id, source);
    }

    /// Register only when the id is still vacant. Used for scripts
    /// recovered from member payloads so they never shadow a section
    /// read from the Lctx table.
    pub fn register_vacant(&mut self, id: u32, source: ScriptSource) {
        if !self.scripts.contains_key(&id) {
            self.register(id, source);
        }
    }

    pub fn get(&self, id: u32) -> Option<&ScriptSource> {
        self.scripts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Read the Lctx section map and pull each referenced Lscr payload out of
/// the archive. Entries are keyed 1-based by table position; a vacant
/// slot is -1. Returns None when the archive carries no script context.
pub fn read_script_context(archive: &dyn Archive) -> Option<ScriptContext> {
    let lctx_entry = archive.list_resources(fourcc("Lctx")).into_iter().next()?;
    let data = archive.get_resource(fourcc("Lctx"), lctx_entry.id)?;

    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    let entry_count = match (reader.read_u16(), reader.read_u16()) {
        (Ok(count), Ok(_pad)) => count,
        _ => {
            warn!("script context table header unreadable");
            return Some(ScriptContext::default());
        }
    };

    let mut context = ScriptContext::default();
    for index in 0..entry_count {
        let section_id = match reader.read_i32() {
            Ok(section_id) => section_id,
            Err(_) => {
                warn!("script context table truncated at entry {}", index);
                break;
            }
        };
        if section_id < 0 {
            continue;
        }
        match read_script_resource(archive, section_id as u16) {
            Some(source) => context.register(index as u32 + 1, source),
            None => warn!(
                "script context entry {} points at missing or bad section {}",
                index, section_id
            ),
        }
    }
    Some(context)
}

fn read_script_resource(archive: &dyn Archive, section_id: u16) -> Option<ScriptSource> {
    let data = archive.get_resource(fourcc("Lscr"), section_id)?;
    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    let raw_type = reader.read_u8().ok()?;
    let script_type = ScriptType::from_u8(raw_type)?;
    let _pad = reader.read_u8().ok()?;
    let text = reader.read_u32_string().ok()?;
    Some(ScriptSource {
        owner_id: None,
        script_type,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    fn lscr_bytes(script_type: ScriptType, text: &str) -> Vec<u8> {
        let mut data = vec![script_type as u8, 0];
        data.extend_from_slice(&(text.len() as u32).to_be_bytes());
        data.extend_from_slice(text.as_bytes());
        data
    }

    fn lctx_bytes(sections: &[i32]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(sections.len() as u16).to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        for section in sections {
            data.extend_from_slice(&section.to_be_bytes());
        }
        data
    }

    #[test]
    fn test_absent_context_is_none() {
        let archive = MemoryArchive::new();
        assert!(read_script_context(&archive).is_none());
    }

    #[test]
    fn test_vacant_slots_skipped() {
        let mut archive = MemoryArchive::new();
        archive.insert(fourcc("Lctx"), 1, lctx_bytes(&[-1, 3, -1]));
        archive.insert(
            fourcc("Lscr"),
            3,
            lscr_bytes(ScriptType::Movie, "on startMovie end"),
        );
        let context = read_script_context(&archive).unwrap();
        assert_eq!(context.len(), 1);
        let source = context.get(2).unwrap();
        assert_eq!(source.script_type, ScriptType::Movie);
        assert_eq!(source.text, "on startMovie end");
    }

    #[test]
    fn test_missing_section_is_not_fatal() {
        let mut archive = MemoryArchive::new();
        archive.insert(fourcc("Lctx"), 1, lctx_bytes(&[5, 7]));
        archive.insert(fourcc("Lscr"), 7, lscr_bytes(ScriptType::Score, "-- go"));
        let context = read_script_context(&archive).unwrap();
        assert_eq!(context.len(), 1);
        assert!(context.get(1).is_none());
        assert!(context.get(2).is_some());
    }

    #[test]
    fn test_register_vacant_never_overwrites() {
        let mut context = ScriptContext::default();
        context.register(
            1,
            ScriptSource {
                owner_id: None,
                script_type: ScriptType::Movie,
                text: "first".to_string(),
            },
        );
        context.register_vacant(
            1,
            ScriptSource {
                owner_id: Some(4),
                script_type: ScriptType::Score,
                text: "second".to_string(),
            },
        );
        assert_eq!(context.get(1).unwrap().text, "first");
    }
}
