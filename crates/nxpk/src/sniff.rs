//! Content sniffing for entries without a recovered name.
//!
//! The label only picks a file extension for output naming. It never
//! affects the bytes written and ties always go to the earliest rule.

use memchr::memmem;

/// Buffers at least this large skip the substring heuristics.
const TEXT_SCAN_LIMIT: usize = 1_000_000;

/// Exact prefixes, checked in order after the single-byte text markers.
const PREFIXES: &[(&[u8], &str)] = &[
    (b"hit", "hit"),
    (b"PKM", "pkm"),
    (b"PVR", "pvr"),
    (b"DDS", "dds"),
];

/// Signatures that start at byte 1.
const OFFSET_ONE: &[(&[u8], &str)] = &[(b"KTX", "ktx"), (b"PNG", "png")];

const FOUR_BYTE: &[([u8; 4], &str)] = &[
    ([0x34, 0x80, 0xC8, 0xBB], "nxm"),
    ([0x14, 0x00, 0x00, 0x00], "type1"),
    ([0x04, 0x00, 0x00, 0x00], "type2"),
    ([0x00, 0x01, 0x00, 0x00], "type3"),
    (*b"VANT", "vant"),
    (*b"MDMP", "mdmp"),
    (*b"RGIS", "rgis"),
    (*b"NTRK", "ntrk"),
];

/// Substring groups for text-like content, in priority order.
const TEXT_HINTS: &[(&[&[u8]], &str)] = &[
    (
        &[b"void", b"main(", b"include", b"float", b"technique", b"ifndef"],
        "shader",
    ),
    (&[b"?xml"], "xml"),
    (&[b"import"], "py"),
    (&[b"1000", b"ssh", b"png", b"tga", b"exit"], "txt"),
];

/// Guess a file extension (without the dot) for decompressed entry data.
pub fn sniff_extension(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return "none";
    }
    if data.starts_with(b"CocosStudio-") {
        return "coc";
    }
    match data[0] {
        b'<' => return "xml",
        b'{' => return "json",
        _ => {}
    }

    if let Some(&(_, label)) = PREFIXES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return label;
    }
    if let Some(&(_, label)) = OFFSET_ONE
        .iter()
        .find(|(magic, _)| data[1..].starts_with(magic))
    {
        return label;
    }
    if let Some(&(_, label)) = FOUR_BYTE.iter().find(|(magic, _)| data.starts_with(magic)) {
        return label;
    }

    if data.len() < TEXT_SCAN_LIMIT {
        for &(needles, label) in TEXT_HINTS {
            if needles
                .iter()
                .any(|needle| memmem::find(data, needle).is_some())
            {
                return label;
            }
        }
    }

    "dat"
}
