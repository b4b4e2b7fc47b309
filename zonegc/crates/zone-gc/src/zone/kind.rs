//! Zone classification.

use serde::Serialize;
use std::fmt;

/// Immutable classification of a zone
///
/// Fixed when the zone is created. Scheduling code outside this crate uses
/// it to special-case ordering, e.g. sweeping the interned-global-data zone
/// last or never compacting a privileged zone on its own.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Regular allocation domain
    Ordinary,
    /// Holds interned strings and other process-wide shared data
    InternedGlobalData,
    /// Holds runtime-internal objects
    Privileged,
}

impl ZoneKind {
    #[inline(always)]
    pub fn is_interned_global_data(self) -> bool {
        self == ZoneKind::InternedGlobalData
    }

    #[inline(always)]
    pub fn is_privileged(self) -> bool {
        self == ZoneKind::Privileged
    }

    pub const fn name(self) -> &'static str {
        match self {
            ZoneKind::Ordinary => "ordinary",
            ZoneKind::InternedGlobalData => "interned_global_data",
            ZoneKind::Privileged => "privileged",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(!ZoneKind::Ordinary.is_interned_global_data());
        assert!(!ZoneKind::Ordinary.is_privileged());
        assert!(ZoneKind::InternedGlobalData.is_interned_global_data());
        assert!(!ZoneKind::InternedGlobalData.is_privileged());
        assert!(ZoneKind::Privileged.is_privileged());
        assert!(!ZoneKind::Privileged.is_interned_global_data());
    }
}
