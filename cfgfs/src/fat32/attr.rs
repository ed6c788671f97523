// SPDX-License-Identifier: MIT

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fat32Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0F;
    }
}

impl Fat32Attributes {
    /// `true` for the raw attribute byte of a long-name slot.
    #[inline]
    pub fn is_lfn(raw: u8) -> bool {
        raw & 0x3F == Self::LFN.bits()
    }
}
