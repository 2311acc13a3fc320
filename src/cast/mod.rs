pub mod config;
pub mod font_map;
pub mod member;
pub mod member_info;
pub mod script_context;

use binary_reader::{BinaryReader, Endian};
use fxhash::FxHashMap;
use itertools::Itertools;
use log::warn;

use crate::archive::{fourcc, Archive};
use crate::error::CastError;
use crate::geometry::IntRect;

use self::config::CastConfig;
use self::font_map::{read_font_size_map, FontRemap, FontSizeMap};
use self::member::CastMember;
use self::member_info::CastMemberInfo;
use self::script_context::{read_script_context, ScriptContext, ScriptSource};

/// Who tears the library down. A private library dies with its movie; a
/// shared one is a pool referenced by many movies and outlives any single
/// referencing movie. The loader only records the tag, destruction timing
/// is the embedder's contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOwnership {
    Private,
    Shared,
}

/// Raw table entry before typed construction: the slot id, the stored
/// type tag, the metadata sub-record (absent for legacy members with no
/// VWCI resource) and the opaque member payload.
struct RawMember {
    id: u16,
    tag: u32,
    info: Option<Vec<u8>>,
    data: Vec<u8>,
}

/// One cast library: the member registry, its derived name/script-id
/// indexes, the lazily loaded font tables and the extracted script
/// context. Loading is synchronous and exclusive; nothing here locks.
pub struct Cast {
    archive: Option<Box<dyn Archive>>,
    ownership: CastOwnership,

    pub version: u16,
    pub movie_rect: IntRect,
    pub stage_color: u8,
    pub default_palette: i8,
    pub cast_array_start: u16,
    pub cast_array_end: u16,
    pub cast_id_offset: u16,

    members: FxHashMap<u16, CastMember>,
    infos: FxHashMap<u16, CastMemberInfo>,
    // Derived views over `infos`, rebuilt wholesale after load. Name keys
    // are lowercased; original casing stays in the info record.
    names: FxHashMap<String, u16>,
    script_ids: FxHashMap<u32, u16>,

    font_map: Option<FontSizeMap>,
    font_remap: Option<FontRemap>,
    script_context: Option<ScriptContext>,
}

impl Cast {
    pub fn new(ownership: CastOwnership) -> Cast {
        Cast {
            archive: None,
            ownership,
            version: 0,
            movie_rect: IntRect::default(),
            stage_color: 0,
            default_palette: -1,
            cast_array_start: 0,
            cast_array_end: 0,
            cast_id_offset: 0,
            members: FxHashMap::default(),
            infos: FxHashMap::default(),
            names: FxHashMap::default(),
            script_ids: FxHashMap::default(),
            font_map: None,
            font_remap: None,
            script_context: None,
        }
    }

    pub fn set_archive(&mut self, archive: Box<dyn Archive>) {
        self.archive = Some(archive);
    }

    pub fn is_shared(&self) -> bool {
        self.ownership == CastOwnership::Shared
    }

    pub fn ownership(&self) -> CastOwnership {
        self.ownership
    }

    /// Run the full load sequence: config, cast table, per-entry info and
    /// member construction, font tables, script context. Header failures
    /// abort and leave the library empty; per-entry failures skip that id
    /// and keep going.
    pub fn load(&mut self) -> Result<(), CastError> {
        self.clear();

        let (config, raw_members, font_map, font_remap, script_context) = {
            let archive = self.archive.as_deref().ok_or(CastError::MissingArchive)?;
            let config = read_config_resource(archive)?;
            let raw_members = if config.is_tagged() {
                read_tagged_table(archive, &config)
            } else {
                read_legacy_table(archive, &config)
            };
            let font_map = archive
                .list_resources(fourcc("VWFM"))
                .into_iter()
                .next()
                .and_then(|entry| archive.get_resource(fourcc("VWFM"), entry.id))
                .map(read_font_size_map);
            let font_remap = archive
                .list_resources(fourcc("FXmp"))
                .into_iter()
                .next()
                .and_then(|entry| archive.get_resource(fourcc("FXmp"), entry.id))
                .map(FontRemap::read);
            let script_context = read_script_context(archive);
            (config, raw_members, font_map, font_remap, script_context)
        };

        self.version = config.version;
        self.movie_rect = config.movie_rect;
        self.stage_color = config.stage_color;
        self.default_palette = config.default_palette;
        self.cast_array_start = config.cast_array_start;
        self.cast_array_end = config.cast_array_end;
        self.cast_id_offset = config.cast_id_offset;
        self.font_map = font_map;
        self.font_remap = font_remap;
        self.script_context = script_context;

        for raw in raw_members {
            self.load_member(raw);
        }
        self.rebuild_indexes();
        self.load_member_scripts();
        Ok(())
    }

    fn clear(&mut self) {
        self.members.clear();
        self.infos.clear();
        self.names.clear();
        self.script_ids.clear();
        self.font_map = None;
        self.font_remap = None;
        self.script_context = None;
    }

    /// Decode one raw entry into its info record and typed member. Either
    /// part failing to parse leaves the id out of every registry.
    fn load_member(&mut self, raw: RawMember) {
        let info = match raw.info {
            Some(bytes) => match CastMemberInfo::read(raw.id, &bytes) {
                Ok(info) => Some(info),
                Err(err) => {
                    warn!("skipping cast member: {}", err);
                    return;
                }
            },
            None => None,
        };
        let member = match CastMember::from_tag(raw.id, raw.tag, &raw.data) {
            Ok(member) => member,
            Err(err) => {
                warn!("skipping cast member: {}", err);
                return;
            }
        };
        self.members.insert(raw.id, member);
        if let Some(info) = info {
            self.infos.insert(raw.id, info);
        }
    }

    /// Recompute the name and script-id views from the info records.
    /// Ids are walked in ascending order, so on a duplicate name the
    /// highest (last-loaded) id wins.
    fn rebuild_indexes(&mut self) {
        self.names.clear();
        self.script_ids.clear();
        for id in self.infos.keys().copied().sorted() {
            let info = &self.infos[&id];
            if !info.name.is_empty() {
                self.names.insert(info.name.to_lowercase(), id);
            }
            if let Some(script_id) = info.script_id {
                self.script_ids.insert(script_id, id);
            }
        }
    }

    /// Feed member-borne scripts (script members and `--`-marked text
    /// members) into the script context. Sections extracted from an Lctx
    /// table keep precedence over payload copies of the same script id.
    fn load_member_scripts(&mut self) {
        let mut sources: Vec<(u32, ScriptSource)> = Vec::new();
        for id in self.members.keys().copied().sorted() {
            let member = &self.members[&id];
            let key = self
                .infos
                .get(&id)
                .and_then(|info| info.script_id)
                .unwrap_or(id as u32);
            if let Some(script) = member.member_type.as_script() {
                sources.push((
                    key,
                    ScriptSource {
                        owner_id: Some(id),
                        script_type: script.script_type,
                        text: script.source.clone(),
                    },
                ));
            } else if let Some(text) = member.member_type.as_text() {
                if let Some(embedded) = text.embedded_script() {
                    sources.push((
                        key,
                        ScriptSource {
                            owner_id: Some(id),
                            script_type: member::ScriptType::Score,
                            text: embedded.to_string(),
                        },
                    ));
                }
            }
        }
        if sources.is_empty() {
            return;
        }
        let context = self.script_context.get_or_insert_with(ScriptContext::default);
        for (key, source) in sources {
            context.register_vacant(key, source);
        }
    }

    pub fn get_member(&self, id: u16) -> Option<&CastMember> {
        self.members.get(&id)
    }

    /// Case-insensitive name lookup through the derived index.
    pub fn get_member_by_name(&self, name: &str) -> Option<&CastMember> {
        let id = *self.names.get(&name.to_lowercase())?;
        self.members.get(&id)
    }

    pub fn get_member_by_script_id(&self, script_id: u32) -> Option<&CastMember> {
        let id = *self.script_ids.get(&script_id)?;
        self.members.get(&id)
    }

    pub fn get_member_info(&self, id: u16) -> Option<&CastMemberInfo> {
        self.infos.get(&id)
    }

    pub fn member_initial_rect(&self, id: u16) -> Option<IntRect> {
        self.members.get(&id).map(CastMember::initial_rect)
    }

    /// Returns false when the id is not loaded.
    pub fn set_member_modified(&mut self, id: u16) -> bool {
        match self.members.get_mut(&id) {
            Some(member) => {
                member.mark_modified();
                true
            }
            None => false,
        }
    }

    /// Cross-platform font-size translation. Identity for ids the table
    /// does not cover, or when no table was present at all.
    pub fn map_font(&self, id: u16) -> u16 {
        self.font_map
            .as_ref()
            .and_then(|map| map.get(&id).copied())
            .unwrap_or(id)
    }

    pub fn char_to_win(&self, ch: u8) -> u8 {
        self.font_remap
            .as_ref()
            .map_or(ch, |remap| remap.char_to_win(ch))
    }

    pub fn char_to_mac(&self, ch: u8) -> u8 {
        self.font_remap
            .as_ref()
            .map_or(ch, |remap| remap.char_to_mac(ch))
    }

    pub fn font_remap(&self) -> Option<&FontRemap> {
        self.font_remap.as_ref()
    }

    pub fn script_context(&self) -> Option<&ScriptContext> {
        self.script_context.as_ref()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> Vec<u16> {
        self.members.keys().copied().sorted().collect_vec()
    }
}

/// VWCF header with DRCF as the newer-container fallback tag.
fn read_config_resource(archive: &dyn Archive) -> Result<CastConfig, CastError> {
    for tag in &[fourcc("VWCF"), fourcc("DRCF")] {
        if let Some(entry) = archive.list_resources(*tag).into_iter().next() {
            if let Some(data) = archive.get_resource(*tag, entry.id) {
                return CastConfig::read(data);
            }
        }
    }
    // An archive with no config record at all cannot yield a usable
    // header either.
    Err(CastError::MalformedHeader { len: 0 })
}

/// Legacy fixed table: one size-prefixed record per slot in the id range,
/// slot id implicit from position. Metadata comes from per-id VWCI
/// resources when present.
fn read_legacy_table(archive: &dyn Archive, config: &CastConfig) -> Vec<RawMember> {
    let data = match archive
        .list_resources(fourcc("VWCR"))
        .into_iter()
        .next()
        .and_then(|entry| archive.get_resource(fourcc("VWCR"), entry.id))
    {
        Some(data) => data,
        None => {
            warn!("cast table resource missing, library loads empty");
            return Vec::new();
        }
    };

    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    let mut entries = Vec::new();
    for id in config.cast_array_start..=config.cast_array_end {
        let size = match reader.read_u8() {
            Ok(size) => size as usize,
            Err(_) => {
                warn!("cast table truncated before slot {}", id);
                break;
            }
        };
        if size == 0 {
            continue; // empty slot
        }
        let tag = match reader.read_u8() {
            Ok(tag) => tag as u32,
            Err(_) => {
                warn!("cast table truncated in slot {}", id);
                break;
            }
        };
        let payload = match reader.read_bytes(size - 1) {
            Ok(payload) => payload.to_vec(),
            Err(_) => {
                warn!("cast table truncated in slot {}", id);
                break;
            }
        };
        let info = archive
            .get_resource(fourcc("VWCI"), id)
            .map(|bytes| bytes.to_vec());
        entries.push(RawMember {
            id,
            tag,
            info,
            data: payload,
        });
    }
    entries
}

/// Tagged table: every CASt resource in the directory, filtered to the
/// configured id range. Resource id minus the id offset gives the slot.
fn read_tagged_table(archive: &dyn Archive, config: &CastConfig) -> Vec<RawMember> {
    let mut entries = Vec::new();
    for entry in archive.list_resources(fourcc("CASt")) {
        if entry.len == 0 {
            warn!("cast resource {} has an empty byte range, skipped", entry.id);
            continue;
        }
        if entry.id < config.cast_id_offset {
            warn!("cast resource {} below the id offset, skipped", entry.id);
            continue;
        }
        let id = entry.id - config.cast_id_offset;
        if id < config.cast_array_start || id > config.cast_array_end {
            warn!("cast member {} outside id range, skipped", id);
            continue;
        }
        let data = match archive.get_resource(fourcc("CASt"), entry.id) {
            Some(data) => data,
            None => continue,
        };
        match split_cast_chunk(id, data) {
            Ok(raw) => entries.push(raw),
            Err(err) => warn!("skipping cast member: {}", err),
        }
    }
    entries
}

/// CASt chunk framing: type tag, info length, data length, then the two
/// sections back to back.
fn split_cast_chunk(id: u16, data: &[u8]) -> Result<RawMember, CastError> {
    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    let tag = reader
        .read_u32()
        .map_err(|err| CastError::entry(id, err.to_string()))?;
    let info_len = reader
        .read_u32()
        .map_err(|err| CastError::entry(id, err.to_string()))? as usize;
    let data_len = reader
        .read_u32()
        .map_err(|err| CastError::entry(id, err.to_string()))? as usize;
    let info = reader
        .read_bytes(info_len)
        .map_err(|_| CastError::entry(id, "info section past chunk end"))?
        .to_vec();
    let payload = reader
        .read_bytes(data_len)
        .map_err(|_| CastError::entry(id, "data section past chunk end"))?
        .to_vec();
    Ok(RawMember {
        id,
        tag,
        info: if info_len > 0 { Some(info) } else { None },
        data: payload,
    })
}
