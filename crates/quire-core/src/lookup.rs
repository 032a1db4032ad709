//! Closed enum ↔ name mapping backing the lookup tables
//!
//! Every enumerated column (file type, resource type, group type, read and
//! write permission) is stored as a foreign key into a small lookup table whose
//! rows are seeded from [`LookupEnum::ALL`] at startup. The database layer only
//! ever talks to these tables through `as_db_name` / `from_db_name`, so the
//! mapping lives in exactly one place per enum.

use std::fmt::Debug;

/// An enum persisted through a seeded lookup table.
pub trait LookupEnum: Sized + Copy + Eq + Debug + Send + Sync + 'static {
    /// Name of the lookup table holding one row per variant.
    const TABLE: &'static str;

    /// Every variant, in seeding order.
    const ALL: &'static [Self];

    /// Stable name stored in the `name` column.
    fn as_db_name(&self) -> &'static str;

    fn from_db_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|variant| variant.as_db_name() == name)
    }

    fn db_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|variant| variant.as_db_name()).collect()
    }
}

/// Implements `Display` and `FromStr` in terms of the lookup name so that the
/// wire, the database and the logs all agree on one spelling.
#[macro_export]
macro_rules! impl_lookup_display {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::lookup::LookupEnum::as_db_name(self))
            }
        }

        impl std::str::FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as $crate::lookup::LookupEnum>::from_db_name(&s.trim().to_lowercase())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "Invalid {}: {}",
                            <$ty as $crate::lookup::LookupEnum>::TABLE,
                            s
                        )
                    })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileType, GroupType, ReadPermission, ResourceType, WritePermission};
    use std::collections::HashSet;

    fn assert_closed_mapping<T: LookupEnum>() {
        let names = T::db_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len(), "duplicate name in {}", T::TABLE);

        for variant in T::ALL {
            assert_eq!(T::from_db_name(variant.as_db_name()), Some(*variant));
            assert!(variant.as_db_name().len() <= 32);
        }
        assert_eq!(T::from_db_name("no_such_name"), None);
    }

    #[test]
    fn test_every_lookup_table_is_a_closed_mapping() {
        assert_closed_mapping::<FileType>();
        assert_closed_mapping::<ResourceType>();
        assert_closed_mapping::<GroupType>();
        assert_closed_mapping::<ReadPermission>();
        assert_closed_mapping::<WritePermission>();
    }

    #[test]
    fn test_table_names_are_distinct() {
        let tables: HashSet<_> = [
            FileType::TABLE,
            ResourceType::TABLE,
            GroupType::TABLE,
            ReadPermission::TABLE,
            WritePermission::TABLE,
        ]
        .into_iter()
        .collect();
        assert_eq!(tables.len(), 5);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("ART_BOOK".parse::<GroupType>().unwrap(), GroupType::ArtBook);
        assert_eq!(" webp ".parse::<FileType>().unwrap(), FileType::Webp);
        assert!("banner".parse::<ResourceType>().is_err());
        assert_eq!(ReadPermission::Private.to_string(), "private");
    }
}
