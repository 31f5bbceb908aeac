use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::{
    HeroRecord, HeroStore, ImageId, ImageRecord, ImageResult, ImageStore, OwnerKey, OwnerStore,
    SettingsStore, Slot,
};

#[derive(Debug, Default)]
struct OwnerRow {
    image_url: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    owners: HashMap<OwnerKey, OwnerRow>,
    images: HashMap<ImageId, ImageRecord>,
    /// (owner, slot) -> id; the uniqueness constraint
    slots: BTreeMap<(OwnerKey, Slot), ImageId>,
    heroes: Vec<HeroRecord>,
    settings: HashMap<String, String>,
    next_image_id: i64,
    next_hero_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing timestamps, so an overwrite always changes `updated_at`
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// In-memory backend for tests and development.
///
/// Implements every storage trait over one set of tables. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner record (a vehicle) with an empty projection
    pub fn add_owner(&self, owner: &OwnerKey) {
        self.tables
            .write()
            .owners
            .entry(owner.clone())
            .or_default();
    }

    /// Drop an owner record; its images are left untouched
    pub fn remove_owner(&self, owner: &OwnerKey) -> bool {
        self.tables.write().owners.remove(owner).is_some()
    }

    /// Delete every current hero row without touching settings
    pub fn clear_hero_rows(&self) {
        self.tables.write().heroes.clear();
    }

    /// Total number of stored owner images
    pub fn image_count(&self) -> usize {
        self.tables.read().images.len()
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn put(
        &self,
        owner: &OwnerKey,
        slot: Slot,
        mime_type: &str,
        bytes: Bytes,
    ) -> ImageResult<ImageRecord> {
        let mut tables = self.tables.write();
        let updated_at = tables.stamp();

        let key = (owner.clone(), slot);
        if let Some(id) = tables.slots.get(&key).copied() {
            if let Some(record) = tables.images.get_mut(&id) {
                record.mime_type = mime_type.to_string();
                record.bytes = bytes;
                record.updated_at = updated_at;
                return Ok(record.clone());
            }
        }

        tables.next_image_id += 1;
        let id = ImageId(tables.next_image_id);
        let record = ImageRecord {
            id,
            owner: owner.clone(),
            slot,
            mime_type: mime_type.to_string(),
            bytes,
            updated_at,
        };
        tables.slots.insert(key, id);
        tables.images.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<Option<ImageRecord>> {
        Ok(self
            .tables
            .read()
            .images
            .get(&id)
            .filter(|r| &r.owner == owner)
            .cloned())
    }

    async fn get_by_id(&self, id: ImageId) -> ImageResult<Option<ImageRecord>> {
        Ok(self.tables.read().images.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: &OwnerKey) -> ImageResult<Vec<ImageRecord>> {
        let tables = self.tables.read();
        // BTreeMap order is (owner, slot), so the range is already slot ascending
        Ok(tables
            .slots
            .range((owner.clone(), Slot(0))..=(owner.clone(), Slot(u32::MAX)))
            .filter_map(|(_, id)| tables.images.get(id).cloned())
            .collect())
    }

    async fn delete_one(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<bool> {
        let mut tables = self.tables.write();
        let slot = match tables.images.get(&id) {
            Some(record) if &record.owner == owner => record.slot,
            _ => return Ok(false),
        };
        tables.images.remove(&id);
        tables.slots.remove(&(owner.clone(), slot));
        Ok(true)
    }

    async fn delete_all_for_owner(&self, owner: &OwnerKey) -> ImageResult<u64> {
        let mut tables = self.tables.write();
        let keys: Vec<(OwnerKey, Slot)> = tables
            .slots
            .range((owner.clone(), Slot(0))..=(owner.clone(), Slot(u32::MAX)))
            .map(|(k, _)| k.clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some(id) = tables.slots.remove(&key) {
                tables.images.remove(&id);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl OwnerStore for MemoryStore {
    async fn owner_exists(&self, owner: &OwnerKey) -> ImageResult<bool> {
        Ok(self.tables.read().owners.contains_key(owner))
    }

    async fn write_projection(
        &self,
        owner: &OwnerKey,
        projection: Option<&str>,
    ) -> ImageResult<()> {
        let mut tables = self.tables.write();
        match tables.owners.get_mut(owner) {
            Some(row) => {
                row.image_url = projection.map(str::to_string);
                Ok(())
            }
            None => Err(crate::ImageError::not_found(format!("vehicle {owner}"))),
        }
    }

    async fn read_projection(&self, owner: &OwnerKey) -> ImageResult<Option<String>> {
        match self.tables.read().owners.get(owner) {
            Some(row) => Ok(row.image_url.clone()),
            None => Err(crate::ImageError::not_found(format!("vehicle {owner}"))),
        }
    }
}

#[async_trait]
impl HeroStore for MemoryStore {
    async fn put_hero(&self, mime_type: &str, bytes: Bytes) -> ImageResult<HeroRecord> {
        let mut tables = self.tables.write();
        let updated_at = tables.stamp();
        tables.next_hero_id += 1;
        let record = HeroRecord {
            id: tables.next_hero_id,
            mime_type: mime_type.to_string(),
            bytes,
            updated_at,
        };
        tables.heroes.push(record.clone());
        Ok(record)
    }

    async fn latest_hero(&self) -> ImageResult<Option<HeroRecord>> {
        Ok(self
            .tables
            .read()
            .heroes
            .iter()
            .max_by_key(|r| (r.updated_at, r.id))
            .cloned())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> ImageResult<Option<String>> {
        Ok(self.tables.read().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> ImageResult<()> {
        self.tables
            .write()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
