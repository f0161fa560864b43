//! File type guessing for entries without a name.

/// Extension given to geometry payloads
pub const GEOMETRY_EXTENSION: &str = "gr2";

const TEXT_WINDOW: usize = 256;

#[rustfmt::skip]
const MAGICS: &[(&[u8], &str)] = &[
    (b"DDS",                      "dds"),
    (&[0x00, 0x01, 0x00, 0x00],   "ttf"),
    (b"OTTO",                     "otf"),
    (&[0xE5, 0x9B, 0x49, 0x5E],   GEOMETRY_EXTENSION),
    (b"ZOSFT",                    "zosft"),
    (&[0x89, b'P', b'N', b'G'],   "png"),
    (b"FSB5",                     "fsb"),
    (b"RIFF",                     "riff"),
    (b"<?xml",                    "xml"),
];

/// Guess a file extension from the leading bytes of a payload
///
/// Falls back to `bin` when nothing matches.
///
/// ```
/// use eso_mnf::sniff::guess_extension;
///
/// assert_eq!(guess_extension(b"DDS |\0\0\0"), "dds");
/// assert_eq!(guess_extension(b"-- addon code\nlocal x = 1"), "lua");
/// assert_eq!(guess_extension(&[0xFF, 0x00]), "bin");
/// ```
pub fn guess_extension(data: &[u8]) -> &'static str {
    if let Some((_, extension)) = MAGICS.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *extension;
    }

    if looks_like_markup(data) {
        "xml"
    } else if looks_like_lua(data) {
        "lua"
    } else {
        "bin"
    }
}

fn looks_like_markup(data: &[u8]) -> bool {
    matches!(data, [b'<', next, ..] if next.is_ascii_alphabetic())
}

fn looks_like_lua(data: &[u8]) -> bool {
    let window = &data[..data.len().min(TEXT_WINDOW)];
    if window.is_empty() || !window.iter().all(|&b| is_text(b)) {
        return false;
    }

    window.starts_with(b"--") || contains(window, b"function") || contains(window, b"local ")
}

fn is_text(byte: u8) -> bool {
    byte.is_ascii_graphic() || byte.is_ascii_whitespace() || byte >= 0x80
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
