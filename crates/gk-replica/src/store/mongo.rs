//! MongoDB replica store.

use async_trait::async_trait;
use mongodb::{bson::doc, Collection, Database, IndexModel};

use crate::error::Result;
use crate::profile::ProfileReplica;
use crate::store::ReplicaStore;

pub struct MongoReplicaStore {
    collection: Collection<ProfileReplica>,
}

impl MongoReplicaStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("profiles"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        // Not unique: the replica stores whatever the stream says
        let username_lookup = IndexModel::builder().keys(doc! { "username": 1 }).build();
        self.collection.create_indexes([username_lookup]).await?;
        Ok(())
    }
}

#[async_trait]
impl ReplicaStore for MongoReplicaStore {
    async fn upsert(&self, profile: ProfileReplica) -> Result<()> {
        self.collection
            .find_one_and_replace(doc! { "_id": &profile.id }, &profile)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileReplica>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<ProfileReplica>> {
        Ok(self
            .collection
            .find_one(doc! { "username": username })
            .await?)
    }

    async fn list(&self) -> Result<Vec<ProfileReplica>> {
        use futures::TryStreamExt;

        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
