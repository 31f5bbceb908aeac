use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::{
    HeroRecord, HeroStore, ImageError, ImageId, ImageRecord, ImageResult, ImageStore, OwnerKey,
    OwnerStore, SettingsStore, Slot,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS vehicles (
        owner_key TEXT PRIMARY KEY NOT NULL,
        image_url TEXT
    )",
    "CREATE TABLE IF NOT EXISTS vehicle_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_key TEXT NOT NULL,
        slot INTEGER NOT NULL,
        mime_type TEXT NOT NULL,
        data BLOB NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (owner_key, slot)
    )",
    "CREATE TABLE IF NOT EXISTS hero_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        mime_type TEXT NOT NULL,
        data BLOB NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )",
];

/// SQLite backend. `updated_at` columns hold microseconds since the epoch.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply the schema
    pub async fn connect(url: &str) -> ImageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(ImageError::storage)?
            .create_if_missing(true);
        // every connection to an in-memory database is a separate database
        let in_memory = url.contains(":memory:");
        let mut pool_options =
            SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(ImageError::storage)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> ImageResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(ImageError::storage)?;
        }
        Ok(())
    }

    /// Register an owner record (a vehicle) if it does not exist yet
    pub async fn add_owner(&self, owner: &OwnerKey) -> ImageResult<()> {
        sqlx::query("INSERT OR IGNORE INTO vehicles (owner_key) VALUES (?)")
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        Ok(())
    }
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

fn image_from_row(row: &SqliteRow) -> Result<ImageRecord, sqlx::Error> {
    let slot: i64 = row.try_get("slot")?;
    let data: Vec<u8> = row.try_get("data")?;
    Ok(ImageRecord {
        id: ImageId(row.try_get("id")?),
        owner: OwnerKey(row.try_get("owner_key")?),
        slot: Slot(slot as u32),
        mime_type: row.try_get("mime_type")?,
        bytes: Bytes::from(data),
        updated_at: from_micros(row.try_get("updated_at")?),
    })
}

fn hero_from_row(row: &SqliteRow) -> Result<HeroRecord, sqlx::Error> {
    let data: Vec<u8> = row.try_get("data")?;
    Ok(HeroRecord {
        id: row.try_get("id")?,
        mime_type: row.try_get("mime_type")?,
        bytes: Bytes::from(data),
        updated_at: from_micros(row.try_get("updated_at")?),
    })
}

const IMAGE_COLUMNS: &str = "id, owner_key, slot, mime_type, data, updated_at";

#[async_trait]
impl ImageStore for SqliteStore {
    async fn put(
        &self,
        owner: &OwnerKey,
        slot: Slot,
        mime_type: &str,
        bytes: Bytes,
    ) -> ImageResult<ImageRecord> {
        let sql = format!(
            "INSERT INTO vehicle_images (owner_key, slot, mime_type, data, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (owner_key, slot) DO UPDATE SET
                mime_type = excluded.mime_type,
                data = excluded.data,
                updated_at = MAX(excluded.updated_at, vehicle_images.updated_at + 1)
             RETURNING {IMAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(owner.as_str())
            .bind(i64::from(slot.get()))
            .bind(mime_type)
            .bind(&bytes[..])
            .bind(now_micros())
            .fetch_one(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        image_from_row(&row).map_err(ImageError::storage)
    }

    async fn get(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<Option<ImageRecord>> {
        let sql =
            format!("SELECT {IMAGE_COLUMNS} FROM vehicle_images WHERE id = ? AND owner_key = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        row.as_ref()
            .map(image_from_row)
            .transpose()
            .map_err(ImageError::storage)
    }

    async fn get_by_id(&self, id: ImageId) -> ImageResult<Option<ImageRecord>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM vehicle_images WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        row.as_ref()
            .map(image_from_row)
            .transpose()
            .map_err(ImageError::storage)
    }

    async fn list_by_owner(&self, owner: &OwnerKey) -> ImageResult<Vec<ImageRecord>> {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM vehicle_images WHERE owner_key = ? ORDER BY slot ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        rows.iter()
            .map(image_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ImageError::storage)
    }

    async fn occupied_slots(&self, owner: &OwnerKey) -> ImageResult<Vec<Slot>> {
        let slots: Vec<i64> =
            sqlx::query_scalar("SELECT slot FROM vehicle_images WHERE owner_key = ? ORDER BY slot")
                .bind(owner.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(ImageError::storage)?;
        Ok(slots.into_iter().map(|s| Slot(s as u32)).collect())
    }

    async fn delete_one(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<bool> {
        let result = sqlx::query("DELETE FROM vehicle_images WHERE id = ? AND owner_key = ?")
            .bind(id.get())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_owner(&self, owner: &OwnerKey) -> ImageResult<u64> {
        let result = sqlx::query("DELETE FROM vehicle_images WHERE owner_key = ?")
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OwnerStore for SqliteStore {
    async fn owner_exists(&self, owner: &OwnerKey) -> ImageResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM vehicles WHERE owner_key = ?")
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        Ok(found.is_some())
    }

    async fn write_projection(
        &self,
        owner: &OwnerKey,
        projection: Option<&str>,
    ) -> ImageResult<()> {
        let result = sqlx::query("UPDATE vehicles SET image_url = ? WHERE owner_key = ?")
            .bind(projection)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(ImageError::storage)?;
        if result.rows_affected() == 0 {
            return Err(ImageError::not_found(format!("vehicle {owner}")));
        }
        Ok(())
    }

    async fn read_projection(&self, owner: &OwnerKey) -> ImageResult<Option<String>> {
        let row: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_url FROM vehicles WHERE owner_key = ?")
                .bind(owner.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(ImageError::storage)?;
        row.ok_or_else(|| ImageError::not_found(format!("vehicle {owner}")))
    }
}

#[async_trait]
impl HeroStore for SqliteStore {
    async fn put_hero(&self, mime_type: &str, bytes: Bytes) -> ImageResult<HeroRecord> {
        let row = sqlx::query(
            "INSERT INTO hero_images (mime_type, data, updated_at)
             VALUES (?, ?, MAX(?, COALESCE((SELECT MAX(updated_at) + 1 FROM hero_images), 0)))
             RETURNING id, mime_type, data, updated_at",
        )
        .bind(mime_type)
        .bind(&bytes[..])
        .bind(now_micros())
        .fetch_one(&self.pool)
        .await
        .map_err(ImageError::storage)?;
        hero_from_row(&row).map_err(ImageError::storage)
    }

    async fn latest_hero(&self) -> ImageResult<Option<HeroRecord>> {
        let row = sqlx::query(
            "SELECT id, mime_type, data, updated_at FROM hero_images
             ORDER BY updated_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(ImageError::storage)?;
        row.as_ref()
            .map(hero_from_row)
            .transpose()
            .map_err(ImageError::storage)
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> ImageResult<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(ImageError::storage)
    }

    async fn set_setting(&self, key: &str, value: &str) -> ImageResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(ImageError::storage)?;
        Ok(())
    }
}
