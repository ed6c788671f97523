// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines the set of known MBR partition type ids.
///
/// This macro generates:
/// - A constant `u8` for each partition type id.
/// - An enum `PartitionKind` with one variant per type and an `Unknown(u8)` fallback.
/// - Conversions between the raw byte and `PartitionKind`, and a `Display` implementation.
///
/// # Example
/// ```rust
/// use cfgpart::define_partition_kinds;
///
/// define_partition_kinds! {
///     Empty => "Empty", 0x00,
///     Linux => "Linux", 0x83,
/// }
///
/// assert_eq!(PartitionKind::from_byte(0x83), PartitionKind::Linux);
/// assert_eq!(MBR_TYPE_LINUX, 0x83);
/// ```
///
/// # Note
/// This macro requires the `paste` crate for identifier concatenation.
macro_rules! define_partition_kinds {
    (
        $(
            $name:ident => $desc:expr, $id:expr
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                pub const [<MBR_TYPE_ $name:snake:upper>]: u8 = $id;
            )+

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum PartitionKind {
                $($name,)+
                Unknown(u8),
            }

            impl PartitionKind {
                pub fn from_byte(id: u8) -> Self {
                    match id {
                        $(b if b == [<MBR_TYPE_ $name:snake:upper>] => Self::$name,)+
                        other => Self::Unknown(other),
                    }
                }

                pub fn as_byte(&self) -> u8 {
                    match self {
                        $(Self::$name => [<MBR_TYPE_ $name:snake:upper>],)+
                        Self::Unknown(id) => *id,
                    }
                }
            }

            impl core::fmt::Display for PartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        $(Self::$name => write!(f, $desc),)+
                        Self::Unknown(id) => write!(f, "Unknown (0x{:02X})", id),
                    }
                }
            }
        }
    };
}
