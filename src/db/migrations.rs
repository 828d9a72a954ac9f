//! Database migrations
//!
//! Migrations are embedded as SQL strings for SQLite and MySQL and applied in
//! version order. Applied versions are tracked in the `_migrations` table.
//!
//! Every table carries `created_on` / `updated_on` audit columns. Foreign keys
//! of one-to-many references have no `ON DELETE` action, so a referenced row
//! cannot be deleted; many-to-many join rows cascade with either side.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (unique, ascending)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i32,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_geo_taxonomy",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100),
                source_id VARCHAR(10),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS states (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100),
                short_name VARCHAR(5),
                timezone VARCHAR(100),
                source_id VARCHAR(10),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS countries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100),
                short_name VARCHAR(5),
                source_id VARCHAR(10),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS state_cities (
                state_id INTEGER NOT NULL,
                city_id INTEGER NOT NULL,
                PRIMARY KEY (state_id, city_id),
                FOREIGN KEY (state_id) REFERENCES states(id) ON DELETE CASCADE,
                FOREIGN KEY (city_id) REFERENCES cities(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_state_cities_city_id ON state_cities(city_id);
            CREATE TABLE IF NOT EXISTS country_states (
                country_id INTEGER NOT NULL,
                state_id INTEGER NOT NULL,
                PRIMARY KEY (country_id, state_id),
                FOREIGN KEY (country_id) REFERENCES countries(id) ON DELETE CASCADE,
                FOREIGN KEY (state_id) REFERENCES states(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_country_states_state_id ON country_states(state_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS cities (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NULL,
                source_id VARCHAR(10) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS states (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NULL,
                short_name VARCHAR(5) NULL,
                timezone VARCHAR(100) NULL,
                source_id VARCHAR(10) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS countries (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NULL,
                short_name VARCHAR(5) NULL,
                source_id VARCHAR(10) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS state_cities (
                state_id BIGINT NOT NULL,
                city_id BIGINT NOT NULL,
                PRIMARY KEY (state_id, city_id),
                FOREIGN KEY (state_id) REFERENCES states(id) ON DELETE CASCADE,
                FOREIGN KEY (city_id) REFERENCES cities(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_state_cities_city_id ON state_cities(city_id);
            CREATE TABLE IF NOT EXISTS country_states (
                country_id BIGINT NOT NULL,
                state_id BIGINT NOT NULL,
                PRIMARY KEY (country_id, state_id),
                FOREIGN KEY (country_id) REFERENCES countries(id) ON DELETE CASCADE,
                FOREIGN KEY (state_id) REFERENCES states(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_country_states_state_id ON country_states(state_id);
        "#,
    },
    Migration {
        version: 2,
        name: "create_postal_code_mappers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS postal_code_mappers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                postal_code VARCHAR(255) NOT NULL,
                latitude VARCHAR(255),
                longitude VARCHAR(255),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_postal_code_mappers_code ON postal_code_mappers(postal_code);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS postal_code_mappers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                postal_code VARCHAR(255) NOT NULL,
                latitude VARCHAR(255) NULL,
                longitude VARCHAR(255) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_postal_code_mappers_code ON postal_code_mappers(postal_code);
        "#,
    },
    Migration {
        version: 3,
        name: "create_content_sources",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS content_providers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                url VARCHAR(200),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS partners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                logo VARCHAR(200),
                description TEXT NOT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sponsors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                logo VARCHAR(255),
                external_link VARCHAR(200),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS content_providers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                url VARCHAR(200) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS partners (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                logo VARCHAR(200) NULL,
                description TEXT NOT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sponsors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                logo VARCHAR(255) NULL,
                external_link VARCHAR(200) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_advertising",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS ad_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                script TEXT,
                location VARCHAR(50),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                start_date TIMESTAMP NOT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS ad_sections (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                script TEXT NULL,
                location VARCHAR(50) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS campaigns (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                start_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_assets",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS asset_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(20) NOT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS asset_contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier VARCHAR(255) NOT NULL,
                content VARCHAR(255),
                alternate_text VARCHAR(255),
                sort_order INTEGER,
                start_time INTEGER NOT NULL DEFAULT 0,
                duration INTEGER NOT NULL DEFAULT 5,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS assets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                asset_type_id INTEGER,
                source VARCHAR(255),
                content_attribution VARCHAR(255),
                thumbnail VARCHAR(255),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (asset_type_id) REFERENCES asset_types(id)
            );
            CREATE INDEX IF NOT EXISTS idx_assets_asset_type_id ON assets(asset_type_id);
            CREATE TABLE IF NOT EXISTS asset_asset_contents (
                asset_id INTEGER NOT NULL,
                asset_content_id INTEGER NOT NULL,
                PRIMARY KEY (asset_id, asset_content_id),
                FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE CASCADE,
                FOREIGN KEY (asset_content_id) REFERENCES asset_contents(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_asset_asset_contents_content ON asset_asset_contents(asset_content_id);
            CREATE TABLE IF NOT EXISTS asset_associations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_id INTEGER,
                template_location VARCHAR(50),
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (asset_id) REFERENCES assets(id)
            );
            CREATE INDEX IF NOT EXISTS idx_asset_associations_asset_id ON asset_associations(asset_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS asset_types (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(20) NOT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS asset_contents (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                identifier VARCHAR(255) NOT NULL,
                content VARCHAR(255) NULL,
                alternate_text VARCHAR(255) NULL,
                sort_order INT NULL,
                start_time INT NOT NULL DEFAULT 0,
                duration INT NOT NULL DEFAULT 5,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS assets (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                asset_type_id BIGINT NULL,
                source VARCHAR(255) NULL,
                content_attribution VARCHAR(255) NULL,
                thumbnail VARCHAR(255) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (asset_type_id) REFERENCES asset_types(id)
            );
            CREATE TABLE IF NOT EXISTS asset_asset_contents (
                asset_id BIGINT NOT NULL,
                asset_content_id BIGINT NOT NULL,
                PRIMARY KEY (asset_id, asset_content_id),
                FOREIGN KEY (asset_id) REFERENCES assets(id) ON DELETE CASCADE,
                FOREIGN KEY (asset_content_id) REFERENCES asset_contents(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_asset_asset_contents_content ON asset_asset_contents(asset_content_id);
            CREATE TABLE IF NOT EXISTS asset_associations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                asset_id BIGINT NULL,
                template_location VARCHAR(50) NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (asset_id) REFERENCES assets(id)
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_template_contents",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS template_contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_heading VARCHAR(255) NOT NULL,
                content_subheading VARCHAR(255) NOT NULL DEFAULT '',
                content_url VARCHAR(200) NOT NULL DEFAULT '',
                content_byline TEXT NOT NULL,
                content_byline_link TEXT NOT NULL,
                content_body TEXT NOT NULL,
                content_synopsis TEXT,
                content_publish_date TIMESTAMP NOT NULL,
                content_provider_id INTEGER,
                disable_ads BOOLEAN NOT NULL DEFAULT 0,
                content_partner_id INTEGER,
                content_received_date TIMESTAMP,
                search_keywords TEXT,
                search_boost INTEGER DEFAULT 0,
                include_in_search BOOLEAN NOT NULL DEFAULT 0,
                guid VARCHAR(255),
                seo_meta_name VARCHAR(100),
                seo_keywords TEXT,
                seo_meta_description TEXT,
                template VARCHAR(255),
                preview_path VARCHAR(20),
                country_id INTEGER,
                state_id INTEGER,
                city_id INTEGER,
                sponsor_id INTEGER,
                is_timely_content BOOLEAN NOT NULL DEFAULT 0,
                available_in_trends BOOLEAN NOT NULL DEFAULT 0,
                disable_personalization BOOLEAN NOT NULL DEFAULT 0,
                is_promoted_content BOOLEAN NOT NULL DEFAULT 0,
                homepage_availability BOOLEAN NOT NULL DEFAULT 0,
                year INTEGER,
                manufacturer TEXT,
                make TEXT,
                make_model TEXT,
                likes INTEGER DEFAULT 0,
                views INTEGER DEFAULT 0,
                slug VARCHAR(255),
                is_featured BOOLEAN NOT NULL DEFAULT 0,
                template_configuration TEXT,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (content_provider_id) REFERENCES content_providers(id),
                FOREIGN KEY (content_partner_id) REFERENCES partners(id),
                FOREIGN KEY (country_id) REFERENCES countries(id),
                FOREIGN KEY (state_id) REFERENCES states(id),
                FOREIGN KEY (city_id) REFERENCES cities(id),
                FOREIGN KEY (sponsor_id) REFERENCES sponsors(id)
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_template_contents_slug ON template_contents(slug);
            CREATE INDEX IF NOT EXISTS idx_template_contents_publish_date ON template_contents(content_publish_date);
            CREATE INDEX IF NOT EXISTS idx_template_contents_country_id ON template_contents(country_id);
            CREATE INDEX IF NOT EXISTS idx_template_contents_state_id ON template_contents(state_id);
            CREATE INDEX IF NOT EXISTS idx_template_contents_city_id ON template_contents(city_id);
            CREATE INDEX IF NOT EXISTS idx_template_contents_sponsor_id ON template_contents(sponsor_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS template_contents (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                content_heading VARCHAR(255) NOT NULL,
                content_subheading VARCHAR(255) NOT NULL DEFAULT '',
                content_url VARCHAR(200) NOT NULL DEFAULT '',
                content_byline TEXT NOT NULL,
                content_byline_link TEXT NOT NULL,
                content_body LONGTEXT NOT NULL,
                content_synopsis TEXT NULL,
                content_publish_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                content_provider_id BIGINT NULL,
                disable_ads BOOLEAN NOT NULL DEFAULT FALSE,
                content_partner_id BIGINT NULL,
                content_received_date TIMESTAMP NULL,
                search_keywords TEXT NULL,
                search_boost INT NULL DEFAULT 0,
                include_in_search BOOLEAN NOT NULL DEFAULT FALSE,
                guid VARCHAR(255) NULL,
                seo_meta_name VARCHAR(100) NULL,
                seo_keywords TEXT NULL,
                seo_meta_description TEXT NULL,
                template VARCHAR(255) NULL,
                preview_path VARCHAR(20) NULL,
                country_id BIGINT NULL,
                state_id BIGINT NULL,
                city_id BIGINT NULL,
                sponsor_id BIGINT NULL,
                is_timely_content BOOLEAN NOT NULL DEFAULT FALSE,
                available_in_trends BOOLEAN NOT NULL DEFAULT FALSE,
                disable_personalization BOOLEAN NOT NULL DEFAULT FALSE,
                is_promoted_content BOOLEAN NOT NULL DEFAULT FALSE,
                homepage_availability BOOLEAN NOT NULL DEFAULT FALSE,
                year INT NULL,
                manufacturer TEXT NULL,
                make TEXT NULL,
                make_model TEXT NULL,
                likes INT NULL DEFAULT 0,
                views INT NULL DEFAULT 0,
                slug VARCHAR(255) NULL,
                is_featured BOOLEAN NOT NULL DEFAULT FALSE,
                template_configuration TEXT NULL,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (content_provider_id) REFERENCES content_providers(id),
                FOREIGN KEY (content_partner_id) REFERENCES partners(id),
                FOREIGN KEY (country_id) REFERENCES countries(id),
                FOREIGN KEY (state_id) REFERENCES states(id),
                FOREIGN KEY (city_id) REFERENCES cities(id),
                FOREIGN KEY (sponsor_id) REFERENCES sponsors(id)
            );
            CREATE UNIQUE INDEX idx_template_contents_slug ON template_contents(slug);
            CREATE INDEX idx_template_contents_publish_date ON template_contents(content_publish_date);
        "#,
    },
    Migration {
        version: 7,
        name: "create_template_content_relations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS template_content_secondary_navigation (
                from_content_id INTEGER NOT NULL,
                to_content_id INTEGER NOT NULL,
                PRIMARY KEY (from_content_id, to_content_id),
                FOREIGN KEY (from_content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (to_content_id) REFERENCES template_contents(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_related_articles (
                from_content_id INTEGER NOT NULL,
                to_content_id INTEGER NOT NULL,
                PRIMARY KEY (from_content_id, to_content_id),
                FOREIGN KEY (from_content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (to_content_id) REFERENCES template_contents(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_asset_associations (
                content_id INTEGER NOT NULL,
                asset_association_id INTEGER NOT NULL,
                PRIMARY KEY (content_id, asset_association_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (asset_association_id) REFERENCES asset_associations(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_ads (
                content_id INTEGER NOT NULL,
                ad_section_id INTEGER NOT NULL,
                PRIMARY KEY (content_id, ad_section_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (ad_section_id) REFERENCES ad_sections(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_campaigns (
                content_id INTEGER NOT NULL,
                campaign_id INTEGER NOT NULL,
                PRIMARY KEY (content_id, campaign_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (campaign_id) REFERENCES campaigns(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS template_content_secondary_navigation (
                from_content_id BIGINT NOT NULL,
                to_content_id BIGINT NOT NULL,
                PRIMARY KEY (from_content_id, to_content_id),
                FOREIGN KEY (from_content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (to_content_id) REFERENCES template_contents(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_related_articles (
                from_content_id BIGINT NOT NULL,
                to_content_id BIGINT NOT NULL,
                PRIMARY KEY (from_content_id, to_content_id),
                FOREIGN KEY (from_content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (to_content_id) REFERENCES template_contents(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_asset_associations (
                content_id BIGINT NOT NULL,
                asset_association_id BIGINT NOT NULL,
                PRIMARY KEY (content_id, asset_association_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (asset_association_id) REFERENCES asset_associations(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_ads (
                content_id BIGINT NOT NULL,
                ad_section_id BIGINT NOT NULL,
                PRIMARY KEY (content_id, ad_section_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (ad_section_id) REFERENCES ad_sections(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS template_content_campaigns (
                content_id BIGINT NOT NULL,
                campaign_id BIGINT NOT NULL,
                PRIMARY KEY (content_id, campaign_id),
                FOREIGN KEY (content_id) REFERENCES template_contents(id) ON DELETE CASCADE,
                FOREIGN KEY (campaign_id) REFERENCES campaigns(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 8,
        name: "create_publishing_states",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS publishing_states (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id INTEGER NOT NULL UNIQUE,
                publish_state VARCHAR(20),
                unpublishing_on TIMESTAMP,
                do_not_publish_until TIMESTAMP,
                not_for_external_use BOOLEAN NOT NULL DEFAULT 0,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (content_id) REFERENCES template_contents(id)
            );
            CREATE INDEX IF NOT EXISTS idx_publishing_states_state ON publishing_states(publish_state);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS publishing_states (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                content_id BIGINT NOT NULL UNIQUE,
                publish_state VARCHAR(20) NULL,
                unpublishing_on TIMESTAMP NULL,
                do_not_publish_until TIMESTAMP NULL,
                not_for_external_use BOOLEAN NOT NULL DEFAULT FALSE,
                created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (content_id) REFERENCES template_contents(id)
            );
            CREATE INDEX idx_publishing_states_state ON publishing_states(publish_state);
        "#,
    },
];

/// Run all pending migrations, returning how many were applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied: Vec<i32> = get_applied_migrations(pool)
        .await?
        .iter()
        .map(|m| m.version)
        .collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Migrations already recorded in `_migrations`, by ascending version
pub async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    with_pool!(pool, |conn| {
        sqlx::query_as::<_, MigrationRecord>(
            "SELECT version, name, applied_at FROM _migrations ORDER BY version",
        )
        .fetch_all(conn)
        .await
        .context("Failed to read applied migrations")
    })
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    with_pool!(pool, |conn| {
        let mut tx = conn.begin().await?;
        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
        sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    })
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a migration script on `;`, dropping empty and comment-only pieces
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_comment_only(s))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if every embedded migration has been applied
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Number of embedded migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.iter().any(|a| a.version == m.version))
        .count())
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
