use binary_reader::{BinaryReader, Endian};
use fxhash::FxHashMap;
use log::warn;

use crate::error::CastError;

pub type CharMap = FxHashMap<u8, u8>;
pub type FontSizeMap = FxHashMap<u16, u16>;

/// Cross-platform record for one source font: the destination font name,
/// whether glyph codes should be remapped through the character tables,
/// and the point-size translation table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FontXPlatformInfo {
    pub to_font: String,
    pub remap_chars: bool,
    pub size_map: FontSizeMap,
}

pub type FontXPlatformMap = FxHashMap<String, FontXPlatformInfo>;

/// Tables decoded from the FXmp resource: font translations and 8-bit
/// character remaps for both platform directions. The two directions are
/// independent; a forward entry does not imply a reverse one.
#[derive(Debug, Default)]
pub struct FontRemap {
    pub mac_fonts_to_win: FontXPlatformMap,
    pub win_fonts_to_mac: FontXPlatformMap,
    pub mac_chars_to_win: CharMap,
    pub win_chars_to_mac: CharMap,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Platform {
    Mac,
    Win,
}

/// One side of an FXmp mapping: platform prefix plus an optional
/// (possibly quoted) font name.
struct FxmpSide {
    platform: Platform,
    name: String,
}

impl FontRemap {
    /// Parse the FXmp text resource. Lines are CR-terminated (LF is
    /// accepted), `;` opens a comment. A line that fails to parse is
    /// skipped, never fatal.
    pub fn read(data: &[u8]) -> FontRemap {
        let text = String::from_utf8_lossy(data);
        let mut remap = FontRemap::default();
        for raw_line in text.split(|c| c == '\r' || c == '\n') {
            let line = match raw_line.find(';') {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Err(err) = remap.read_line(line) {
                warn!("skipping font map line: {}", err);
            }
        }
        remap
    }

    pub fn char_to_win(&self, ch: u8) -> u8 {
        *self.mac_chars_to_win.get(&ch).unwrap_or(&ch)
    }

    pub fn char_to_mac(&self, ch: u8) -> u8 {
        *self.win_chars_to_mac.get(&ch).unwrap_or(&ch)
    }

    fn read_line(&mut self, line: &str) -> Result<(), CastError> {
        let malformed = || CastError::MalformedFontLine {
            line: line.to_string(),
        };

        let tokens = tokenize(line).ok_or_else(malformed)?;
        if tokens.len() < 3 || tokens[1] != "=>" {
            return Err(malformed());
        }
        let from = parse_side(&tokens[0]).ok_or_else(malformed)?;
        let to = parse_side(&tokens[2]).ok_or_else(malformed)?;
        if from.platform == to.platform {
            return Err(malformed());
        }

        let mut rest = &tokens[3..];
        let mut remap_chars = false;
        if rest.first().map(String::as_str) == Some("Map") {
            match rest.get(1).map(String::as_str) {
                Some("All") => remap_chars = true,
                Some("None") => remap_chars = false,
                _ => return Err(malformed()),
            }
            rest = &rest[2..];
        }

        match (from.name.is_empty(), to.name.is_empty()) {
            // Char remap line: `Mac: => Win: 128=>196 ...`
            (true, true) => {
                let chars = match from.platform {
                    Platform::Mac => &mut self.mac_chars_to_win,
                    Platform::Win => &mut self.win_chars_to_mac,
                };
                for token in rest {
                    let (src, dst) = parse_pair(token).ok_or_else(malformed)?;
                    if src > 0xff || dst > 0xff {
                        return Err(malformed());
                    }
                    chars.insert(src as u8, dst as u8);
                }
                Ok(())
            }
            // Font line: `Mac:Name => Win:Name [Map All|None] [n=>m ...]`
            (false, false) => {
                let mut size_map = FontSizeMap::default();
                for token in rest {
                    let (src, dst) = parse_pair(token).ok_or_else(malformed)?;
                    size_map.insert(src, dst);
                }
                let fonts = match from.platform {
                    Platform::Mac => &mut self.mac_fonts_to_win,
                    Platform::Win => &mut self.win_fonts_to_mac,
                };
                fonts.insert(
                    from.name,
                    FontXPlatformInfo {
                        to_font: to.name,
                        remap_chars,
                        size_map,
                    },
                );
                Ok(())
            }
            _ => Err(malformed()),
        }
    }
}

/// Split a line into whitespace-separated tokens, keeping double-quoted
/// spans (font names with spaces) inside one token. Returns None on an
/// unterminated quote.
fn tokenize(line: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}

fn parse_side(token: &str) -> Option<FxmpSide> {
    let colon = token.find(':')?;
    let platform = match &token[..colon] {
        "Mac" => Platform::Mac,
        "Win" => Platform::Win,
        _ => return None,
    };
    Some(FxmpSide {
        platform,
        name: token[colon + 1..].to_string(),
    })
}

fn parse_pair(token: &str) -> Option<(u16, u16)> {
    let arrow = token.find("=>")?;
    let src = token[..arrow].parse::<u16>().ok()?;
    let dst = token[arrow + 2..].parse::<u16>().ok()?;
    Some((src, dst))
}

/// Read the VWFM font-size map: a count followed by (source id,
/// destination id) pairs. A truncated table keeps the pairs read so far.
pub fn read_font_size_map(data: &[u8]) -> FontSizeMap {
    let mut reader = BinaryReader::from_u8(data);
    reader.set_endian(Endian::Big);
    let mut map = FontSizeMap::default();
    let count = match reader.read_u16() {
        Ok(count) => count,
        Err(_) => {
            warn!("font size map resource too short for its count field");
            return map;
        }
    };
    for _ in 0..count {
        match (reader.read_u16(), reader.read_u16()) {
            (Ok(src), Ok(dst)) => {
                map.insert(src, dst);
            }
            _ => {
                warn!("font size map truncated after {} entries", map.len());
                break;
            }
        }
    }
    map
}
