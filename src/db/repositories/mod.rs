//! Database repositories
//!
//! One repository trait per entity group with a `Sqlx*Repository`
//! implementation serving both SQLite and MySQL. The helpers below cover
//! the queries every table shares: lookup by id, listing, deletion and
//! maintenance of many-to-many join tables.

pub mod asset;
pub mod content;
pub mod geo;
pub mod publishing;
pub mod template_content;

pub use asset::{AssetRepository, SqlxAssetRepository};
pub use content::{ReferenceRepository, SqlxReferenceRepository};
pub use geo::{GeoRepository, SqlxGeoRepository};
pub use publishing::{PublishingStateRepository, SqlxPublishingStateRepository};
pub use template_content::{Counter, SqlxTemplateContentRepository, TemplateContentRepository};

use anyhow::{Context, Result};
use sqlx::mysql::MySqlRow;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use crate::db::DynDatabasePool;

/// Rows that decode from either backend
pub trait Record:
    for<'r> FromRow<'r, SqliteRow> + for<'r> FromRow<'r, MySqlRow> + Send + Unpin
{
}

impl<T> Record for T where
    T: for<'r> FromRow<'r, SqliteRow> + for<'r> FromRow<'r, MySqlRow> + Send + Unpin
{
}

/// A many-to-many join table: `owner` rows point at `target` rows
#[derive(Debug, Clone, Copy)]
pub struct LinkTable {
    pub table: &'static str,
    pub owner: &'static str,
    pub target: &'static str,
}

impl LinkTable {
    /// Removes every link of one owner
    pub(crate) fn clear_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?", self.table, self.owner)
    }

    /// Inserts one owner -> target link
    pub(crate) fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            self.table, self.owner, self.target
        )
    }
}

pub(crate) async fn find_by_id<T: Record>(
    pool: &DynDatabasePool,
    table: &str,
    id: i64,
) -> Result<Option<T>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", table);
    with_pool!(pool, |conn| {
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
            .with_context(|| format!("Failed to load {} {}", table, id))
    })
}

/// All rows of `table` in the given order
pub(crate) async fn list_all<T: Record>(
    pool: &DynDatabasePool,
    table: &str,
    order_by: &str,
) -> Result<Vec<T>> {
    let sql = format!("SELECT * FROM {} ORDER BY {}", table, order_by);
    with_pool!(pool, |conn| {
        sqlx::query_as::<_, T>(&sql)
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to list {}", table))
    })
}

/// Rows of `table` whose id is in `ids`, ordered by id
pub(crate) async fn list_by_ids<T: Record>(
    pool: &DynDatabasePool,
    table: &str,
    ids: &[i64],
) -> Result<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT * FROM {} WHERE id IN ({}) ORDER BY id",
        table,
        placeholders(ids.len())
    );
    with_pool!(pool, |conn| {
        let mut query = sqlx::query_as::<_, T>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to list {} by id", table))
    })
}

/// Delete a row, returning whether it existed
pub(crate) async fn delete_by_id(pool: &DynDatabasePool, table: &str, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    let affected = with_pool!(pool, |conn| {
        sqlx::query(&sql)
            .bind(id)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to delete {} {}", table, id))?
            .rows_affected()
    });
    Ok(affected > 0)
}

pub(crate) async fn count_rows(pool: &DynDatabasePool, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    with_pool!(pool, |conn| {
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(conn)
            .await
            .with_context(|| format!("Failed to count {}", table))
    })
}

/// The subset of `ids` with no row in `table`
pub(crate) async fn missing_ids(
    pool: &DynDatabasePool,
    table: &str,
    ids: &[i64],
) -> Result<Vec<i64>> {
    let wanted = dedup(ids);
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id FROM {} WHERE id IN ({})",
        table,
        placeholders(wanted.len())
    );
    let found: Vec<i64> = with_pool!(pool, |conn| {
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in &wanted {
            query = query.bind(*id);
        }
        query
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to check {} ids", table))?
    });
    Ok(wanted.into_iter().filter(|id| !found.contains(id)).collect())
}

/// Replace every link of `owner` with `targets`
pub(crate) async fn set_links(
    pool: &DynDatabasePool,
    link: LinkTable,
    owner: i64,
    targets: &[i64],
) -> Result<()> {
    let delete = link.clear_sql();
    let insert = link.insert_sql();
    let targets = dedup(targets);
    with_pool!(pool, |conn| {
        let mut tx = conn.begin().await?;
        sqlx::query(&delete)
            .bind(owner)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear {}", link.table))?;
        for target in &targets {
            sqlx::query(&insert)
                .bind(owner)
                .bind(*target)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to link {} {} -> {}", link.table, owner, target))?;
        }
        tx.commit().await?;
        Ok(())
    })
}

/// Add one link; a link that already exists is left alone
pub(crate) async fn add_link(
    pool: &DynDatabasePool,
    link: LinkTable,
    owner: i64,
    target: i64,
) -> Result<()> {
    if list_links(pool, link, owner).await?.contains(&target) {
        return Ok(());
    }
    let insert = link.insert_sql();
    with_pool!(pool, |conn| {
        sqlx::query(&insert)
            .bind(owner)
            .bind(target)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to link {} {} -> {}", link.table, owner, target))?;
        Ok(())
    })
}

/// Remove one link, returning whether it existed
pub(crate) async fn remove_link(
    pool: &DynDatabasePool,
    link: LinkTable,
    owner: i64,
    target: i64,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ? AND {} = ?",
        link.table, link.owner, link.target
    );
    let affected = with_pool!(pool, |conn| {
        sqlx::query(&sql)
            .bind(owner)
            .bind(target)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to unlink {} {} -> {}", link.table, owner, target))?
            .rows_affected()
    });
    Ok(affected > 0)
}

/// Targets linked from `owner`, ascending
pub(crate) async fn list_links(pool: &DynDatabasePool, link: LinkTable, owner: i64) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT {target} FROM {table} WHERE {owner} = ? ORDER BY {target}",
        target = link.target,
        table = link.table,
        owner = link.owner
    );
    with_pool!(pool, |conn| {
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(owner)
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to list {}", link.table))
    })
}

/// Owners linking to `target`, ascending
pub(crate) async fn list_owners(pool: &DynDatabasePool, link: LinkTable, target: i64) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT {owner} FROM {table} WHERE {target} = ? ORDER BY {owner}",
        owner = link.owner,
        table = link.table,
        target = link.target
    );
    with_pool!(pool, |conn| {
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(target)
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to list {} owners", link.table))
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations::run_migrations};

    const COUNTRY_STATES: LinkTable = LinkTable {
        table: "country_states",
        owner: "country_id",
        target: "state_id",
    };

    async fn seeded_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        for sql in [
            "INSERT INTO countries (id, name) VALUES (1, 'India')",
            "INSERT INTO countries (id, name) VALUES (2, 'Nepal')",
            "INSERT INTO states (id, name) VALUES (10, 'Punjab')",
            "INSERT INTO states (id, name) VALUES (11, 'Goa')",
            "INSERT INTO states (id, name) VALUES (12, 'Bagmati')",
        ] {
            pool.execute(sql).await.unwrap();
        }
        pool
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        assert_eq!(dedup(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let pool = seeded_pool().await;
        let missing = missing_ids(&pool, "states", &[10, 99, 11, 99, 42]).await.unwrap();
        assert_eq!(missing, vec![99, 42]);
        assert!(missing_ids(&pool, "states", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_links_replaces_and_dedups() {
        let pool = seeded_pool().await;

        set_links(&pool, COUNTRY_STATES, 1, &[11, 10, 11]).await.unwrap();
        assert_eq!(list_links(&pool, COUNTRY_STATES, 1).await.unwrap(), vec![10, 11]);

        set_links(&pool, COUNTRY_STATES, 1, &[12]).await.unwrap();
        assert_eq!(list_links(&pool, COUNTRY_STATES, 1).await.unwrap(), vec![12]);

        set_links(&pool, COUNTRY_STATES, 1, &[]).await.unwrap();
        assert!(list_links(&pool, COUNTRY_STATES, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_links_is_atomic() {
        let pool = seeded_pool().await;
        set_links(&pool, COUNTRY_STATES, 1, &[10]).await.unwrap();

        // 999 violates the foreign key, so the whole replacement rolls back
        assert!(set_links(&pool, COUNTRY_STATES, 1, &[11, 999]).await.is_err());
        assert_eq!(list_links(&pool, COUNTRY_STATES, 1).await.unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn test_add_remove_and_owners() {
        let pool = seeded_pool().await;

        add_link(&pool, COUNTRY_STATES, 1, 10).await.unwrap();
        add_link(&pool, COUNTRY_STATES, 1, 10).await.unwrap();
        add_link(&pool, COUNTRY_STATES, 2, 10).await.unwrap();

        assert_eq!(list_links(&pool, COUNTRY_STATES, 1).await.unwrap(), vec![10]);
        assert_eq!(list_owners(&pool, COUNTRY_STATES, 10).await.unwrap(), vec![1, 2]);

        assert!(remove_link(&pool, COUNTRY_STATES, 1, 10).await.unwrap());
        assert!(!remove_link(&pool, COUNTRY_STATES, 1, 10).await.unwrap());
        assert_eq!(list_owners(&pool, COUNTRY_STATES, 10).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let pool = seeded_pool().await;
        assert_eq!(count_rows(&pool, "states").await.unwrap(), 3);
        assert!(delete_by_id(&pool, "states", 11).await.unwrap());
        assert!(!delete_by_id(&pool, "states", 11).await.unwrap());
        assert_eq!(count_rows(&pool, "states").await.unwrap(), 2);
    }
}
