use fxhash::FxHashMap;
use itertools::Itertools;

/// Pack a four-character resource tag into a u32, e.g. `fourcc("CASt")`.
pub fn fourcc(tag: &str) -> u32 {
    let bytes = tag.as_bytes();
    debug_assert!(bytes.len() == 4);
    ((bytes[0] as u32) << 24) | ((bytes[1] as u32) << 16) | ((bytes[2] as u32) << 8) | (bytes[3] as u32)
}

pub fn fourcc_to_string(tag: u32) -> String {
    let bytes = [
        (tag >> 24) as u8,
        (tag >> 16) as u8,
        (tag >> 8) as u8,
        tag as u8,
    ];
    String::from_utf8_lossy(&bytes).to_string()
}

/// One entry in the container's resource directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: u16,
    pub len: usize,
}

/// Read-only boundary to the container/archive that owns the raw byte
/// ranges. The loader never writes through it, and all reads are
/// synchronous; how the container finds and decompresses its sections is
/// its own business.
pub trait Archive {
    /// The bytes of the resource with the given tag and id, if present.
    fn get_resource(&self, tag: u32, id: u16) -> Option<&[u8]>;

    /// Directory of all resources carrying the given tag, in id order.
    fn list_resources(&self, tag: u32) -> Vec<ResourceEntry>;
}

/// Map-backed archive for embedders (and tests) that already hold the
/// container's sections in memory.
#[derive(Default)]
pub struct MemoryArchive {
    resources: FxHashMap<(u32, u16), Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> MemoryArchive {
        MemoryArchive::default()
    }

    pub fn insert(&mut self, tag: u32, id: u16, data: Vec<u8>) {
        self.resources.insert((tag, id), data);
    }
}

impl Archive for MemoryArchive {
    fn get_resource(&self, tag: u32, id: u16) -> Option<&[u8]> {
        self.resources.get(&(tag, id)).map(|data| data.as_slice())
    }

    fn list_resources(&self, tag: u32) -> Vec<ResourceEntry> {
        self.resources
            .iter()
            .filter(|((t, _), _)| *t == tag)
            .map(|((_, id), data)| ResourceEntry {
                id: *id,
                len: data.len(),
            })
            .sorted_by_key(|entry| entry.id)
            .collect_vec()
    }
}
