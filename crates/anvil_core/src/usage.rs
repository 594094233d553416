//! Usage policy and the CPU access it implies.

use bitflags::bitflags;

bitflags! {
    /// CPU access granted to a backing store.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CpuAccess: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// CPU/GPU access tradeoff of a resource.
///
/// | Usage       | CPU access   | Update path                    |
/// |-------------|--------------|--------------------------------|
/// | `Static`    | none         | whole-resource device update   |
/// | `Dynamic`   | write        | map (write-discard)            |
/// | `Staging`   | read + write | map (read-write)               |
/// | `Immutable` | none         | initial data only              |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usage {
    #[default]
    Static,
    Dynamic,
    Staging,
    Immutable,
}

/// How a map exposes the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// Previous contents are discarded; the CPU only writes.
    WriteDiscard,
    /// Contents are readable and writable in place.
    ReadWrite,
}

impl Usage {
    #[must_use]
    pub const fn cpu_access(self) -> CpuAccess {
        match self {
            Self::Static | Self::Immutable => CpuAccess::empty(),
            Self::Dynamic => CpuAccess::WRITE,
            Self::Staging => CpuAccess::READ.union(CpuAccess::WRITE),
        }
    }

    /// Map mode used when a resource of this usage is mapped.
    #[must_use]
    pub const fn map_mode(self) -> MapMode {
        match self {
            Self::Dynamic => MapMode::WriteDiscard,
            _ => MapMode::ReadWrite,
        }
    }

    /// Dynamic and staging resources are updated through map/unmap.
    #[inline]
    #[must_use]
    pub const fn is_mappable(self) -> bool {
        matches!(self, Self::Dynamic | Self::Staging)
    }
}

impl MapMode {
    /// CPU access the backing store needs for a map of this mode.
    #[must_use]
    pub const fn required_access(self) -> CpuAccess {
        match self {
            Self::WriteDiscard => CpuAccess::WRITE,
            Self::ReadWrite => CpuAccess::READ.union(CpuAccess::WRITE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_access_is_consistent_with_map_mode() {
        for usage in [Usage::Static, Usage::Dynamic, Usage::Staging, Usage::Immutable] {
            let mappable = usage.cpu_access().contains(usage.map_mode().required_access());
            assert_eq!(mappable, usage.is_mappable(), "{usage:?}");
        }
    }
}
