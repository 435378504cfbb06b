// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts and credentials (emails, passwords, keys)
//! - Tags (shared across accounts)
//! - Per-account shards (profile, snapshots, collections, workouts, sets)

use crate::db::collections;
use crate::db::shard::{encode_id, ShardKey};
use crate::error::AppError;
use crate::models::{
    Account, Collection, Email, Flavor, Key, Password, Profile, Set, Snapshot, Tag, Workout,
};
use futures_util::{stream, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Shard records carry their own id; enough to address them for deletion.
#[derive(Deserialize)]
struct RecordId {
    id: i64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Parent path for top-level collections.
    fn root(&self) -> Result<String, AppError> {
        Ok(self.get_client()?.get_documents_path().clone())
    }

    /// Parent path for an account's shard sub-collections.
    fn shard_parent(&self, shard: &ShardKey) -> Result<String, AppError> {
        Ok(format!(
            "{}/{}",
            self.get_client()?.get_documents_path(),
            shard.document_path()
        ))
    }

    // ─── Generic Document Operations ─────────────────────────────

    async fn get_doc<T>(&self, parent: &str, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .parent(parent)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_doc<T>(&self, parent: &str, collection: &str, id: &str, obj: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .parent(parent)
            .object(obj)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create a document only if it does not exist yet.
    ///
    /// Returns `false` when a document with that id is already present.
    async fn insert_doc<T>(&self, parent: &str, collection: &str, id: &str, obj: &T) -> Result<bool, AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let result: Result<(), _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .parent(parent)
            .object(obj)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                // The usual failure is "already exists"; confirm before reporting it.
                if self.get_doc::<T>(parent, collection, id).await?.is_some() {
                    Ok(false)
                } else {
                    Err(AppError::Database(e.to_string()))
                }
            }
        }
    }

    async fn delete_doc(&self, parent: &str, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .parent(parent)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Get an account by id.
    pub async fn get_account(&self, account_id: i64) -> Result<Option<Account>, AppError> {
        self.get_doc(&self.root()?, collections::ACCOUNTS, &encode_id(account_id))
            .await
    }

    /// Create or update an account.
    pub async fn set_account(&self, account: &Account) -> Result<(), AppError> {
        self.put_doc(
            &self.root()?,
            collections::ACCOUNTS,
            &encode_id(account.id),
            account,
        )
        .await
    }

    /// Register a new account with its email, password and empty profile.
    ///
    /// The email document is created first; its id is the address, so a
    /// second registration of the same address fails with `Conflict`.
    pub async fn register_account(
        &self,
        account: &Account,
        email: &Email,
        password: &Password,
        profile: &Profile,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let root = self.root()?;
        let email_id = Email::document_id(&email.email);

        if !self
            .insert_doc(&root, collections::EMAILS, &email_id, email)
            .await?
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let enc = encode_id(account.id);
        let shard = ShardKey::new(account.id);
        let shard_parent = self.shard_parent(&shard)?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::ACCOUNTS)
            .document_id(&enc)
            .parent(&root)
            .object(account)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .update()
            .in_col(collections::PASSWORDS)
            .document_id(&enc)
            .parent(&root)
            .object(password)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .update()
            .in_col(collections::PROFILE)
            .document_id(collections::PROFILE_DOC)
            .parent(&shard_parent)
            .object(profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Err(e) = transaction.commit().await {
            // Release the address so the user can try again.
            if let Err(cleanup) = self.delete_doc(&root, collections::EMAILS, &email_id).await {
                tracing::error!(error = %cleanup, "Failed to release email after failed registration");
            }
            return Err(AppError::Database(format!("Registration commit failed: {}", e)));
        }

        tracing::info!(account_id = account.id, shard = %shard.document_path(), "Account registered");
        Ok(())
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Look up an email record by address (case-insensitive).
    pub async fn get_email(&self, address: &str) -> Result<Option<Email>, AppError> {
        self.get_doc(&self.root()?, collections::EMAILS, &Email::document_id(address))
            .await
    }

    pub async fn set_email(&self, email: &Email) -> Result<(), AppError> {
        self.put_doc(
            &self.root()?,
            collections::EMAILS,
            &Email::document_id(&email.email),
            email,
        )
        .await
    }

    /// All email records bound to an account.
    pub async fn emails_for_account(&self, account_id: i64) -> Result<Vec<Email>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EMAILS)
            .filter(|q| q.for_all([q.field("account_id").eq(account_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_password(&self, account_id: i64) -> Result<Option<Password>, AppError> {
        self.get_doc(&self.root()?, collections::PASSWORDS, &encode_id(account_id))
            .await
    }

    pub async fn set_password(&self, password: &Password) -> Result<(), AppError> {
        self.put_doc(
            &self.root()?,
            collections::PASSWORDS,
            &encode_id(password.account_id),
            password,
        )
        .await
    }

    pub async fn get_key(&self, keyid: &str) -> Result<Option<Key>, AppError> {
        self.get_doc(&self.root()?, collections::KEYS, &urlencoding::encode(keyid))
            .await
    }

    /// Register a new key; `Conflict` if the credential id is taken.
    pub async fn insert_key(&self, key: &Key) -> Result<(), AppError> {
        let doc_id = urlencoding::encode(&key.keyid).into_owned();
        if !self
            .insert_doc(&self.root()?, collections::KEYS, &doc_id, key)
            .await?
        {
            return Err(AppError::Conflict(format!("Key {} already registered", key.keyid)));
        }
        Ok(())
    }

    pub async fn set_key(&self, key: &Key) -> Result<(), AppError> {
        self.put_doc(
            &self.root()?,
            collections::KEYS,
            &urlencoding::encode(&key.keyid),
            key,
        )
        .await
    }

    pub async fn delete_key(&self, keyid: &str) -> Result<(), AppError> {
        self.delete_doc(&self.root()?, collections::KEYS, &urlencoding::encode(keyid))
            .await
    }

    pub async fn keys_for_account(&self, account_id: i64) -> Result<Vec<Key>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::KEYS)
            .filter(|q| q.for_all([q.field("account_id").eq(account_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Tag Operations ──────────────────────────────────────────

    pub async fn get_tag(&self, name: &str) -> Result<Option<Tag>, AppError> {
        self.get_doc(&self.root()?, collections::TAGS, &urlencoding::encode(name))
            .await
    }

    /// Make sure a global tag record exists for each name.
    ///
    /// The tag's document id is its name, so concurrent creators race on a
    /// single document: the loser re-reads and reuses the winner's record.
    pub async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>, AppError> {
        let root = self.root()?;
        let now = crate::time_utils::unix_now_f64();

        stream::iter(names.to_vec())
            .map(|name| {
                let root = root.clone();
                async move {
                    let doc_id = urlencoding::encode(&name).into_owned();
                    let tag = Tag {
                        name: name.clone(),
                        created_utc: now,
                    };
                    if self.insert_doc(&root, collections::TAGS, &doc_id, &tag).await? {
                        tracing::debug!(tag = %name, "Created tag");
                        return Ok::<Tag, AppError>(tag);
                    }
                    self.get_doc::<Tag>(&root, collections::TAGS, &doc_id)
                        .await?
                        .ok_or_else(|| AppError::Database(format!("Tag {} vanished", name)))
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Tag, AppError>>>()
            .await
            .into_iter()
            .collect()
    }

    // ─── Profile Operations ──────────────────────────────────────

    pub async fn get_profile(&self, shard: &ShardKey) -> Result<Option<Profile>, AppError> {
        self.get_doc(
            &self.shard_parent(shard)?,
            collections::PROFILE,
            collections::PROFILE_DOC,
        )
        .await
    }

    pub async fn set_profile(&self, shard: &ShardKey, profile: &Profile) -> Result<(), AppError> {
        self.put_doc(
            &self.shard_parent(shard)?,
            collections::PROFILE,
            collections::PROFILE_DOC,
            profile,
        )
        .await
    }

    // ─── Snapshot Operations ─────────────────────────────────────

    pub async fn get_snapshot(&self, shard: &ShardKey, id: i64) -> Result<Option<Snapshot>, AppError> {
        self.get_doc(&self.shard_parent(shard)?, collections::SNAPSHOTS, &id.to_string())
            .await
    }

    pub async fn set_snapshot(&self, shard: &ShardKey, snapshot: &Snapshot) -> Result<(), AppError> {
        self.put_doc(
            &self.shard_parent(shard)?,
            collections::SNAPSHOTS,
            &snapshot.id.to_string(),
            snapshot,
        )
        .await
    }

    pub async fn delete_snapshot(&self, shard: &ShardKey, id: i64) -> Result<(), AppError> {
        self.delete_doc(&self.shard_parent(shard)?, collections::SNAPSHOTS, &id.to_string())
            .await
    }

    /// Most recent snapshots, newest first.
    pub async fn recent_snapshots(&self, shard: &ShardKey, limit: u32) -> Result<Vec<Snapshot>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SNAPSHOTS)
            .parent(&self.shard_parent(shard)?)
            .order_by([("utc", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Snapshots with `start <= utc <= end`, oldest first.
    pub async fn snapshots_between(
        &self,
        shard: &ShardKey,
        start: f64,
        end: f64,
    ) -> Result<Vec<Snapshot>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SNAPSHOTS)
            .parent(&self.shard_parent(shard)?)
            .filter(|q| {
                q.for_all([
                    q.field("utc").greater_than_or_equal(start),
                    q.field("utc").less_than_or_equal(end),
                ])
            })
            .order_by([("utc", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Snapshots attached to a collection, oldest first.
    pub async fn snapshots_in_collection(
        &self,
        shard: &ShardKey,
        collection_id: i64,
    ) -> Result<Vec<Snapshot>, AppError> {
        let mut snapshots: Vec<Snapshot> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SNAPSHOTS)
            .parent(&self.shard_parent(shard)?)
            .filter(|q| q.for_all([q.field("collection_id").eq(collection_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        snapshots.sort_by(|a, b| a.utc.total_cmp(&b.utc).then(a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    // ─── Collection Operations ───────────────────────────────────

    pub async fn get_collection(&self, shard: &ShardKey, id: i64) -> Result<Option<Collection>, AppError> {
        self.get_doc(&self.shard_parent(shard)?, collections::COLLECTIONS, &id.to_string())
            .await
    }

    pub async fn set_collection(&self, shard: &ShardKey, collection: &Collection) -> Result<(), AppError> {
        self.put_doc(
            &self.shard_parent(shard)?,
            collections::COLLECTIONS,
            &collection.id.to_string(),
            collection,
        )
        .await
    }

    /// Fetch several collections by id, skipping ids that do not exist.
    pub async fn get_collections(&self, shard: &ShardKey, ids: &[i64]) -> Result<Vec<Collection>, AppError> {
        let found = stream::iter(ids.to_vec())
            .map(|id| async move { self.get_collection(shard, id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Collection>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Collection>>, AppError>>()?;
        Ok(found.into_iter().flatten().collect())
    }

    pub async fn collections_with_flavor(
        &self,
        shard: &ShardKey,
        flavor: Flavor,
    ) -> Result<Vec<Collection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COLLECTIONS)
            .parent(&self.shard_parent(shard)?)
            .filter(|q| q.for_all([q.field("flavor").eq(flavor.as_str())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a collection.
    ///
    /// Its snapshots are kept but detached. A workout anchored on the
    /// collection is deleted along with its sets.
    pub async fn delete_collection(&self, shard: &ShardKey, id: i64) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = self.shard_parent(shard)?;

        let snapshots = self.snapshots_in_collection(shard, id).await?;
        for chunk in snapshots.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for snapshot in chunk {
                let mut detached = snapshot.clone();
                detached.collection_id = None;
                client
                    .fluent()
                    .update()
                    .in_col(collections::SNAPSHOTS)
                    .document_id(detached.id.to_string())
                    .parent(&parent)
                    .object(&detached)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to detach snapshots: {}", e)))?;
        }

        if self.get_workout(shard, id).await?.is_some() {
            self.delete_workout(shard, id).await?;
        }

        self.delete_doc(&parent, collections::COLLECTIONS, &id.to_string())
            .await?;
        tracing::debug!(collection_id = id, detached = snapshots.len(), "Deleted collection");
        Ok(())
    }

    // ─── Workout Operations ──────────────────────────────────────

    pub async fn get_workout(&self, shard: &ShardKey, id: i64) -> Result<Option<Workout>, AppError> {
        self.get_doc(&self.shard_parent(shard)?, collections::WORKOUTS, &id.to_string())
            .await
    }

    /// Atomically store a workout and the collection it extends.
    pub async fn save_workout(
        &self,
        shard: &ShardKey,
        collection: &Collection,
        workout: &Workout,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = self.shard_parent(shard)?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::COLLECTIONS)
            .document_id(collection.id.to_string())
            .parent(&parent)
            .object(collection)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .update()
            .in_col(collections::WORKOUTS)
            .document_id(workout.id.to_string())
            .parent(&parent)
            .object(workout)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    /// Delete a workout and all of its sets.
    async fn delete_workout(&self, shard: &ShardKey, id: i64) -> Result<(), AppError> {
        let parent = self.shard_parent(shard)?;
        let sets = self.sets_for_workout(shard, id).await?;
        self.batch_delete(&sets, collections::SETS, &parent, |set: &Set| {
            set.id.to_string()
        })
        .await?;
        self.delete_doc(&parent, collections::WORKOUTS, &id.to_string())
            .await
    }

    // ─── Set Operations ──────────────────────────────────────────

    pub async fn get_set(&self, shard: &ShardKey, id: i64) -> Result<Option<Set>, AppError> {
        self.get_doc(&self.shard_parent(shard)?, collections::SETS, &id.to_string())
            .await
    }

    pub async fn set_set(&self, shard: &ShardKey, set: &Set) -> Result<(), AppError> {
        self.put_doc(
            &self.shard_parent(shard)?,
            collections::SETS,
            &set.id.to_string(),
            set,
        )
        .await
    }

    pub async fn delete_set(&self, shard: &ShardKey, id: i64) -> Result<(), AppError> {
        self.delete_doc(&self.shard_parent(shard)?, collections::SETS, &id.to_string())
            .await
    }

    /// Sets in a workout, in the order they were performed.
    pub async fn sets_for_workout(&self, shard: &ShardKey, workout_id: i64) -> Result<Vec<Set>, AppError> {
        let mut sets: Vec<Set> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SETS)
            .parent(&self.shard_parent(shard)?)
            .filter(|q| q.for_all([q.field("workout_id").eq(workout_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sets.sort_by_key(|s| (s.start_utc.unwrap_or(i64::MAX), s.id));
        Ok(sets)
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        parent: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .parent(parent)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Ids of every record in one shard sub-collection.
    async fn shard_record_ids(&self, parent: &str, collection: &str) -> Result<Vec<RecordId>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .parent(parent)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Account Deletion ──────────────────────────────────────────

    /// Delete an account and everything it owns.
    ///
    /// Shard records go first, then credentials, then the account document,
    /// so a partial failure never leaves data without an owner record.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_account_data(&self, account_id: i64) -> Result<usize, AppError> {
        let root = self.root()?;
        let shard = ShardKey::new(account_id);
        let parent = self.shard_parent(&shard)?;
        let mut deleted_count = 0;

        // 1. Shard sub-collections
        for collection in [
            collections::SETS,
            collections::WORKOUTS,
            collections::SNAPSHOTS,
            collections::COLLECTIONS,
        ] {
            let records = self.shard_record_ids(&parent, collection).await?;
            self.batch_delete(&records, collection, &parent, |r: &RecordId| r.id.to_string())
                .await?;
            deleted_count += records.len();
            tracing::debug!(account_id, collection, count = records.len(), "Deleted shard records");
        }

        self.delete_doc(&parent, collections::PROFILE, collections::PROFILE_DOC)
            .await?;
        deleted_count += 1;

        // 2. Credentials
        let emails = self.emails_for_account(account_id).await?;
        self.batch_delete(&emails, collections::EMAILS, &root, |e: &Email| {
            Email::document_id(&e.email)
        })
        .await?;
        deleted_count += emails.len();

        let keys = self.keys_for_account(account_id).await?;
        self.batch_delete(&keys, collections::KEYS, &root, |k: &Key| {
            urlencoding::encode(&k.keyid).into_owned()
        })
        .await?;
        deleted_count += keys.len();

        let enc = encode_id(account_id);
        self.delete_doc(&root, collections::PASSWORDS, &enc).await?;
        deleted_count += 1;

        // 3. The account itself
        self.delete_doc(&root, collections::ACCOUNTS, &enc).await?;
        deleted_count += 1;

        tracing::info!(account_id, deleted_count, "Account deletion complete");

        Ok(deleted_count)
    }
}
