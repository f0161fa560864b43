//! Joining manifest entries to their names.

use std::borrow::Cow;

use tracing::{debug, instrument};

use crate::{
    manifest::{ManifestEntry, ManifestTable},
    names::{NameEntry, NameTable},
    sniff,
    variant::ArchiveVariant,
};

/// A manifest entry together with its name, if it has one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEntry<'a> {
    pub manifest: &'a ManifestEntry,
    pub name: Option<&'a NameEntry>,
}

impl<'a> ResolvedEntry<'a> {
    pub fn index(&self) -> u32 {
        self.manifest.index
    }

    /// The raw name from the name table
    pub fn file_name(&self) -> Option<&'a str> {
        self.name
            .map(|n| n.file_name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// The name table path made relative, or `None` if it is unusable
    ///
    /// Leading separators are dropped and backslashes become slashes. Paths
    /// with `.` or `..` components are refused, so an extracted entry can never
    /// land outside the output directory.
    pub fn named_path(&self) -> Option<Cow<'a, str>> {
        let name = self.file_name()?;

        let path: Cow<'a, str> = if name.contains('\\') {
            Cow::Owned(name.replace('\\', "/"))
        } else {
            Cow::Borrowed(name)
        };

        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty()
            || trimmed
                .split('/')
                .any(|c| c.is_empty() || c == "." || c == "..")
        {
            return None;
        }

        Some(match path {
            Cow::Borrowed(p) => Cow::Borrowed(p.trim_start_matches('/')),
            Cow::Owned(p) => Cow::Owned(p.trim_start_matches('/').to_owned()),
        })
    }

    /// Fallback path for entries without a usable name
    pub fn synthesized_path(&self, extension: &str) -> String {
        format!(
            "{:04}/{:08}.{}",
            self.manifest.archive_index().unwrap_or_default(),
            self.manifest.index,
            extension
        )
    }

    /// Where the entry goes when extracted, sniffing `data` for unnamed entries
    pub fn relative_path(&self, data: &[u8]) -> String {
        match self.named_path() {
            Some(path) => path.into_owned(),
            None => self.synthesized_path(sniff::guess_extension(data)),
        }
    }
}

/// Counters describing the outcome of linking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Manifest entries that found a name
    pub linked: usize,

    /// Manifest entries with a key that no name carries
    pub unnamed: usize,

    /// Manifest entries left out by the variant's aux flag rule
    pub filtered: usize,

    /// Names that no manifest entry points at
    pub orphaned_names: usize,

    /// Names shared by more than one manifest entry
    pub shared_names: usize,
}

/// Link every manifest entry to its name table record
///
/// Returns, for each manifest entry, the position of its name in `names`.
/// Each hit bumps the name's reference count. Duplicate and orphaned links are
/// only counted, never rejected.
#[instrument(skip_all, fields(variant = %variant))]
pub fn link(
    manifest: &ManifestTable,
    names: &mut NameTable,
    variant: ArchiveVariant,
) -> (Vec<Option<usize>>, LinkStats) {
    let mut stats = LinkStats::default();

    let links: Vec<Option<usize>> = manifest
        .entries()
        .iter()
        .map(|entry| {
            if variant.skips_flagged_entries() && entry.aux_flag.is_some_and(|f| f != 0) {
                stats.filtered += 1;
                return None;
            }

            let position = entry.file_index.and_then(|k| names.position_of(k));
            match position.and_then(|p| names.entry_mut(p)) {
                Some(name) => {
                    name.reference_count += 1;
                    stats.linked += 1;
                }
                None => stats.unnamed += 1,
            }
            position
        })
        .collect();

    for name in names.entries() {
        match name.reference_count {
            0 => stats.orphaned_names += 1,
            1 => {}
            _ => stats.shared_names += 1,
        }
    }
    debug!("{stats:?}");

    (links, stats)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::{link, ResolvedEntry};
    use crate::manifest::{ManifestEntry, ManifestTable};
    use crate::names::{NameEntry, NameTable};
    use crate::testing::encode_name_table;
    use crate::types::FileLocation;
    use crate::variant::ArchiveVariant;

    fn entry(index: u32, file_index: u32, aux_flag: u32) -> ManifestEntry {
        ManifestEntry {
            index,
            file_index: Some(file_index),
            aux_flag: Some(aux_flag),
            ..Default::default()
        }
    }

    fn names() -> NameTable {
        NameTable::parse(&encode_name_table(&[
            (10, "/art/a.dds"),
            (20, "/esoui/b.lua"),
            (30, "/never/used.xml"),
        ]))
        .unwrap()
    }

    #[traced_test]
    #[test]
    fn linked_entries_share_their_key() {
        let manifest = ManifestTable::from_entries(vec![
            entry(0, 10, 0),
            entry(1, 20, 0),
            entry(2, 20, 0),
            entry(3, 99, 0),
        ]);
        let mut names = names();

        let (links, stats) = link(&manifest, &mut names, ArchiveVariant::Client);

        for (entry, link) in manifest.entries().iter().zip(&links) {
            if let Some(position) = link {
                assert_eq!(
                    entry.file_index,
                    names.get(*position).unwrap().file_index
                );
            }
        }

        assert_eq!(links[3], None);
        assert_eq!(names.by_file_index(10).unwrap().reference_count, 1);
        assert_eq!(names.by_file_index(20).unwrap().reference_count, 2);
        assert_eq!(names.by_file_index(30).unwrap().reference_count, 0);

        assert_eq!(stats.linked, 3);
        assert_eq!(stats.unnamed, 1);
        assert_eq!(stats.orphaned_names, 1);
        assert_eq!(stats.shared_names, 1);
    }

    #[test]
    fn depot_skips_flagged_entries() {
        let manifest = ManifestTable::from_entries(vec![entry(0, 10, 1), entry(1, 20, 0)]);

        let mut depot_names = names();
        let (links, stats) = link(&manifest, &mut depot_names, ArchiveVariant::Depot);
        assert_eq!(links[0], None);
        assert!(links[1].is_some());
        assert_eq!(stats.filtered, 1);
        assert_eq!(depot_names.by_file_index(10).unwrap().reference_count, 0);

        let mut client_names = names();
        let (links, _) = link(&manifest, &mut client_names, ArchiveVariant::Client);
        assert!(links[0].is_some());
    }

    #[test]
    fn named_paths_are_relative() {
        let manifest = entry(0, 10, 0);
        let mut name = NameEntry {
            file_name: "/art/fx/a.dds".into(),
            ..Default::default()
        };

        let resolved = ResolvedEntry {
            manifest: &manifest,
            name: Some(&name),
        };
        assert_eq!(resolved.named_path().as_deref(), Some("art/fx/a.dds"));

        name.file_name = "\\esoui\\app.lua".into();
        let resolved = ResolvedEntry {
            manifest: &manifest,
            name: Some(&name),
        };
        assert_eq!(resolved.named_path().as_deref(), Some("esoui/app.lua"));

        for bad in ["/../etc/passwd", "/a//b", "/", ""] {
            name.file_name = bad.into();
            let resolved = ResolvedEntry {
                manifest: &manifest,
                name: Some(&name),
            };
            assert_eq!(resolved.named_path(), None, "{bad}");
        }
    }

    #[test]
    fn unnamed_entries_get_synthesized_paths() {
        let manifest = ManifestEntry {
            index: 754523,
            location: Some(FileLocation {
                archive_index: 76,
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = ResolvedEntry {
            manifest: &manifest,
            name: None,
        };

        assert_eq!(resolved.relative_path(b"DDS "), "0076/00754523.dds");
        assert_eq!(resolved.relative_path(&[0x00]), "0076/00754523.bin");
    }
}
