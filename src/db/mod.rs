//! Database layer (Firestore).

pub mod firestore;
pub mod shard;

pub use firestore::FirestoreDb;
pub use shard::ShardKey;

/// Collection names as constants.
pub mod collections {
    // Global collections
    pub const ACCOUNTS: &str = "accounts";
    /// Keyed by urlencoded lower-cased address
    pub const EMAILS: &str = "emails";
    /// Keyed by encoded account id
    pub const PASSWORDS: &str = "passwords";
    /// Keyed by credential id
    pub const KEYS: &str = "keys";
    /// Keyed by urlencoded tag name
    pub const TAGS: &str = "tags";

    // Per-account shard sub-collections
    pub const PROFILE: &str = "profile";
    pub const SNAPSHOTS: &str = "snapshots";
    pub const COLLECTIONS: &str = "collections";
    pub const WORKOUTS: &str = "workouts";
    pub const SETS: &str = "sets";

    /// Document id of the single profile record in a shard.
    pub const PROFILE_DOC: &str = "profile";
}
