// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};

/// Byte size written as `512K`, `64M`, `1G` or a plain byte count.
///
/// Suffixes are binary (K = 1024).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Size(pub u64);

impl Size {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * 1024;
    pub const GIB: u64 = 1024 * 1024 * 1024;

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn mib(n: u64) -> Self {
        Size(n * Self::MIB)
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_size(s).map(Size)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl serde::de::Visitor<'_> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a size like '512K', '64M', '1G' or a byte count")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_size(value).map(Size).map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Size(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(Size)
                    .map_err(|_| E::custom(format!("negative size {value}")))
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n >= Self::GIB && n % Self::GIB == 0 {
            write!(f, "{}G", n / Self::GIB)
        } else if n >= Self::MIB && n % Self::MIB == 0 {
            write!(f, "{}M", n / Self::MIB)
        } else if n >= Self::KIB && n % Self::KIB == 0 {
            write!(f, "{}K", n / Self::KIB)
        } else {
            write!(f, "{n}")
        }
    }
}

fn parse_size(size: &str) -> Result<u64, String> {
    let lower = size.trim().to_lowercase();
    let lower = lower.strip_suffix("ib").or_else(|| lower.strip_suffix('b')).unwrap_or(&lower);

    let (num, unit) = if let Some(num) = lower.strip_suffix('k') {
        (num, Size::KIB)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, Size::MIB)
    } else if let Some(num) = lower.strip_suffix('g') {
        (num, Size::GIB)
    } else if let Some(num) = lower.strip_suffix('t') {
        (num, Size::GIB * 1024)
    } else {
        (lower, 1)
    };

    let value = num
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Invalid size format '{size}'. Use K, M, G or T suffix."))?;
    value
        .checked_mul(unit)
        .ok_or_else(|| format!("Size '{size}' is too large"))
}
