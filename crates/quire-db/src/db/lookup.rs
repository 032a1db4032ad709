//! Lookup table seeding
//!
//! Runs once at startup, after migrations. Every variant of every
//! [`LookupEnum`] is inserted (or re-activated) and the table is then checked
//! to contain exactly the known names as active rows.

use anyhow::{Context, Result};
use quire_core::models::{FileType, GroupType, ReadPermission, ResourceType, WritePermission};
use quire_core::LookupEnum;
use sqlx::{PgPool, Postgres};

/// Seed and verify all lookup tables.
pub async fn seed_lookup_tables(pool: &PgPool) -> Result<()> {
    seed_table::<FileType>(pool).await?;
    seed_table::<ResourceType>(pool).await?;
    seed_table::<GroupType>(pool).await?;
    seed_table::<ReadPermission>(pool).await?;
    seed_table::<WritePermission>(pool).await?;

    tracing::info!("Lookup tables seeded");
    Ok(())
}

#[tracing::instrument(skip(pool), fields(db.table = T::TABLE, db.operation = "seed"))]
async fn seed_table<T: LookupEnum>(pool: &PgPool) -> Result<()> {
    let names = T::db_names();

    sqlx::query::<Postgres>(&format!(
        "INSERT INTO {} (name, active) SELECT UNNEST($1::text[]), TRUE \
         ON CONFLICT (name) DO UPDATE SET active = TRUE",
        T::TABLE
    ))
    .bind(&names)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to seed {}", T::TABLE))?;

    let active = sqlx::query_scalar::<Postgres, String>(&format!(
        "SELECT name FROM {} WHERE active",
        T::TABLE
    ))
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to read {}", T::TABLE))?;

    check_active_names::<T>(&active)
}

/// The active rows must be exactly the enum's variants.
fn check_active_names<T: LookupEnum>(active: &[String]) -> Result<()> {
    for name in T::db_names() {
        if !active.iter().any(|a| a == name) {
            anyhow::bail!("{} is missing active row '{}'", T::TABLE, name);
        }
    }

    if let Some(unknown) = active
        .iter()
        .find(|a| T::from_db_name(a.as_str()).is_none())
    {
        anyhow::bail!("{} has unknown active row '{}'", T::TABLE, unknown);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_rows_pass() {
        assert!(check_active_names::<GroupType>(&names(&["art_book", "other"])).is_ok());
        assert!(check_active_names::<ReadPermission>(&names(&["private", "public"])).is_ok());
    }

    #[test]
    fn test_missing_row_fails() {
        let err = check_active_names::<ResourceType>(&names(&["image"])).unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_unknown_row_fails() {
        let rows = names(&["jpeg", "png", "webp", "svg", "gif", "other", "bmp"]);
        let err = check_active_names::<FileType>(&rows).unwrap_err();
        assert!(err.to_string().contains("bmp"));
    }
}
