//! Archive variants and the rules that differ between them.

use std::{fmt, path::Path};

/// Which kind of manifest is being read
///
/// Decided once when a session opens and passed to everything that behaves
/// differently between the two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveVariant {
    /// The full depot manifest (`depot/eso.mnf`)
    Depot,

    /// The game client manifest (`game/client/game.mnf`)
    Client,
}

impl ArchiveVariant {
    /// File index of the manifest entry that holds the name table
    pub const fn name_table_key(self) -> u32 {
        match self {
            ArchiveVariant::Depot => 0x00FF_FFFF,
            ArchiveVariant::Client => 0,
        }
    }

    /// Whether the linker drops entries with a nonzero aux flag
    ///
    /// Observed on depot manifests only, the meaning of the flag is unknown.
    pub const fn skips_flagged_entries(self) -> bool {
        matches!(self, ArchiveVariant::Depot)
    }

    /// Whether entry payloads carry an embedded sub-header
    pub const fn has_payload_header(self) -> bool {
        matches!(self, ArchiveVariant::Client)
    }

    /// Guess the variant from a manifest's file name, `eso.mnf` is the depot
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Self {
        let is_depot = path
            .as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("eso"));

        if is_depot {
            ArchiveVariant::Depot
        } else {
            ArchiveVariant::Client
        }
    }
}

impl fmt::Display for ArchiveVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveVariant::Depot => write!(f, "depot"),
            ArchiveVariant::Client => write!(f, "client"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::ArchiveVariant;

    #[test]
    fn variant_from_path() {
        assert_eq!(
            ArchiveVariant::from_manifest_path("depot/eso.mnf"),
            ArchiveVariant::Depot
        );
        assert_eq!(
            ArchiveVariant::from_manifest_path("game/client/game.mnf"),
            ArchiveVariant::Client
        );
        assert_eq!(
            ArchiveVariant::from_manifest_path("ESO.MNF"),
            ArchiveVariant::Depot
        );
    }

    #[test]
    fn name_table_keys() {
        assert_eq!(ArchiveVariant::Client.name_table_key(), 0);
        assert_ne!(
            ArchiveVariant::Depot.name_table_key(),
            ArchiveVariant::Client.name_table_key()
        );
    }
}
