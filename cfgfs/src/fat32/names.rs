// SPDX-License-Identifier: MIT

//! Short (8.3) and long file names, and FAT timestamps.

use time::OffsetDateTime;

use crate::errors::*;
use crate::fat32::{
    constant::{FAT_LFN_CHARS, FAT_MAX_LFN_CHARS},
    types::Fat32LfnEntry,
};

/// Date, time and 10 ms units as stored in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
    pub tenths: u8,
}

impl FatTimestamp {
    pub fn from_datetime(ts: OffsetDateTime) -> Self {
        let year = ts.year().clamp(1980, 2107);
        let date = (((year - 1980) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
        let time =
            ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
        // odd seconds land in the fine resolution field
        let tenths = (ts.second() % 2) * 100 + (ts.millisecond() / 10) as u8;
        Self { date, time, tenths }
    }

    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }
}

/// Allowed characters in SFN (after uppercase):
/// A–Z, 0–9 and !$%'-_@~`^#&(){}.
#[inline(always)]
fn is_valid_sfn_char(b: u8) -> bool {
    matches!(b,
        b'A'..=b'Z' | b'0'..=b'9' |
        b'!' | b'$' | b'%' | b'\'' | b'-' | b'_' | b'@' | b'~' | b'`' |
        b'^' | b'#' | b'&' | b'(' | b')' | b'{' | b'}'
    )
}

/// Rejects names no FAT directory can hold.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::Other("Invalid file name"));
    }
    if name.encode_utf16().count() > FAT_MAX_LFN_CHARS {
        return Err(FsError::Other("File name longer than 255 characters"));
    }
    if name
        .chars()
        .any(|c| c < ' ' || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
    {
        return Err(FsError::Other("File name contains a reserved character"));
    }
    Ok(())
}

/// Upper-case 8.3 basis of `name`; the flag is set when characters were
/// dropped or replaced, so the basis needs a numeric tail to stay unique.
pub fn to_short_name(name: &str) -> ([u8; 11], bool) {
    let mut raw = [b' '; 11];

    let (base, ext) = match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, ext),
        _ => (name, ""),
    };

    let mut lossy = base.len() > 8 || ext.len() > 3 || base.is_empty();
    let mut fill = |src: &str, dst: &mut [u8]| {
        for (slot, ch) in dst.iter_mut().zip(src.bytes()) {
            let up = ch.to_ascii_uppercase();
            *slot = if is_valid_sfn_char(up) {
                up
            } else {
                lossy = true;
                b'_'
            };
        }
    };
    let (base_raw, ext_raw) = raw.split_at_mut(8);
    fill(base, base_raw);
    fill(ext, ext_raw);

    (raw, lossy)
}

/// Replaces the end of the basis with `~n` (`META_DAT` -> `META_D~1`).
pub fn with_numeric_tail(short: &[u8; 11], n: u32) -> [u8; 11] {
    let tail = format!("~{n}");
    let base_len = short[..8].iter().position(|&b| b == b' ').unwrap_or(8);
    let keep = base_len.min(8usize.saturating_sub(tail.len()));

    let mut out = *short;
    out[..8].fill(b' ');
    out[..keep].copy_from_slice(&short[..keep]);
    out[keep..keep + tail.len()].copy_from_slice(tail.as_bytes());
    out
}

/// Name as the short entry alone would show it (`BASE.EXT`).
fn short_display(short: &[u8; 11]) -> String {
    let part = |b: &[u8]| {
        String::from_utf8_lossy(b)
            .trim_end_matches(' ')
            .to_string()
    };
    let (base, ext) = (part(&short[..8]), part(&short[8..]));
    if ext.is_empty() {
        base
    } else {
        format!("{base}.{ext}")
    }
}

/// `true` when the short entry cannot reproduce `name` on its own.
pub fn needs_lfn(name: &str, short: &[u8; 11]) -> bool {
    short_display(short) != name
}

/// Decodes a short entry to a lower-case name.
pub fn decode_sfn(sfn: &[u8; 11]) -> String {
    let mut raw = *sfn;
    if raw[0] == 0x05 {
        raw[0] = 0xE5;
    }
    short_display(&raw).to_ascii_lowercase()
}

/// Checksum of a short name, repeated in each of its long-name slots.
pub fn lfn_checksum(short: &[u8; 11]) -> u8 {
    short.iter().fold(0u8, |sum, &b| {
        ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(b)
    })
}

/// Long-name slots for `name`, in on-disk order (last part first).
pub fn lfn_entries(name: &str, short: &[u8; 11]) -> Vec<Fat32LfnEntry> {
    let name_utf16: Vec<u16> = name.encode_utf16().collect();
    let count = name_utf16.len().div_ceil(FAT_LFN_CHARS).max(1);
    let checksum = lfn_checksum(short);

    let mut out = Vec::with_capacity(count);
    for (i, chunk) in name_utf16
        .chunks(FAT_LFN_CHARS)
        .chain(core::iter::once(&[][..]))
        .take(count)
        .enumerate()
    {
        // 0x0000 terminates a name that does not fill the slot, 0xFFFF pads
        let mut chars = [0xFFFFu16; FAT_LFN_CHARS];
        chars[..chunk.len()].copy_from_slice(chunk);
        if chunk.len() < FAT_LFN_CHARS {
            chars[chunk.len()] = 0x0000;
        }
        out.push(Fat32LfnEntry::new((i + 1) as u8, i + 1 == count, &chars, checksum));
    }

    out.reverse();
    out
}

/// Joins long-name slots given in on-disk order.
pub fn decode_lfn(lfns: &[Fat32LfnEntry]) -> FsResult<String> {
    let mut name_utf16 = Vec::with_capacity(lfns.len() * FAT_LFN_CHARS);
    for entry in lfns.iter().rev() {
        for &c in &entry.extract_utf16() {
            if c == 0x0000 || c == 0xFFFF {
                break;
            }
            name_utf16.push(c);
        }
    }
    String::from_utf16(&name_utf16).map_err(|_| FsError::Corrupted("Invalid long file name"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(to_short_name("BOOT"), (*b"BOOT       ", false));
        assert_eq!(to_short_name("latest"), (*b"LATEST     ", false));
        assert_eq!(to_short_name("openstack"), (*b"OPENSTAC   ", true));
        assert_eq!(to_short_name("meta_data.json"), (*b"META_DATJSO", true));
        assert_eq!(to_short_name("a b.c"), (*b"A_B     C  ", true));
        assert_eq!(to_short_name("v1.2.txt"), (*b"V1_2    TXT", true));
    }

    #[test]
    fn numeric_tails() {
        assert_eq!(&with_numeric_tail(b"META_DATJSO", 1), b"META_D~1JSO");
        assert_eq!(&with_numeric_tail(b"USER_DAT   ", 12), b"USER_~12   ");
        assert_eq!(&with_numeric_tail(b"AB         ", 3), b"AB~3       ");
    }

    #[test]
    fn long_name_needed_for_case_or_tail() {
        assert!(!needs_lfn("BOOT", b"BOOT       "));
        assert!(!needs_lfn("README.TXT", b"README  TXT"));
        assert!(needs_lfn("latest", b"LATEST     "));
        assert!(needs_lfn("user_data", b"USER_D~1   "));
    }

    #[test]
    fn long_names_split_in_thirteen_chars() {
        let short = *b"NETWOR~1JSO";
        let lfn = lfn_entries("network_data.json", &short);
        assert_eq!(lfn.len(), 2);
        assert_eq!(lfn[0].order, 0x42);
        assert_eq!(lfn[1].order, 0x01);
        assert!(lfn.iter().all(|l| l.checksum == lfn_checksum(&short)));
        // "json" then the terminator, then padding
        let tail = lfn[0].extract_utf16();
        assert_eq!(tail[4], 0x0000);
        assert_eq!(tail[5], 0xFFFF);
        assert_eq!(decode_lfn(&lfn).unwrap(), "network_data.json");

        // exactly 13 characters: no terminator, one slot
        let lfn = lfn_entries("thirteen_char", &short);
        assert_eq!(lfn.len(), 1);
        assert_eq!(decode_lfn(&lfn).unwrap(), "thirteen_char");
    }

    #[test]
    fn checksum_rotates_right() {
        assert_eq!(lfn_checksum(&[0u8; 11]), 0);
        let mut one = [0u8; 11];
        one[10] = 1;
        assert_eq!(lfn_checksum(&one), 1);
        one[9] = 2;
        // 2, rotated once, plus 1
        assert_eq!(lfn_checksum(&one), 2);
    }

    #[test]
    fn reserved_names_are_refused() {
        assert!(validate_name("user_data").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn timestamps() {
        // 2024-03-05 14:07:09.250 UTC
        let ts = OffsetDateTime::from_unix_timestamp_nanos(1_709_647_629_250_000_000).unwrap();
        let stamp = FatTimestamp::from_datetime(ts);
        assert_eq!(stamp.date, (44 << 9) | (3 << 5) | 5);
        assert_eq!(stamp.time, (14 << 11) | (7 << 5) | 4);
        assert_eq!(stamp.tenths, 125);

        let epoch = FatTimestamp::from_datetime(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(epoch.date >> 9, 0);
    }
}
