//! Cast-library loader and resource registry for Director-era movie
//! archives: decodes the versioned container records that describe a
//! library's reusable assets (bitmaps, shapes, text, scripts) and exposes
//! them to a playback runtime through id, name and script-id lookups.
//!
//! The container itself, the script interpreter, and the renderer are
//! collaborators behind the [`archive::Archive`] trait and the payloads
//! on [`cast::member::CastMember`]; this crate never renders or executes
//! anything.

pub mod archive;
pub mod cast;
pub mod error;
pub mod geometry;
pub mod io;

pub use crate::archive::{fourcc, Archive, MemoryArchive, ResourceEntry};
pub use crate::cast::member::{CastMember, CastMemberType, MemberTypeTag, ScriptType};
pub use crate::cast::member_info::CastMemberInfo;
pub use crate::cast::script_context::{ScriptContext, ScriptSource};
pub use crate::cast::{Cast, CastOwnership};
pub use crate::error::CastError;
pub use crate::geometry::IntRect;
