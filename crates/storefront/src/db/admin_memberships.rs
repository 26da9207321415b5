//! Admin membership repository.
//!
//! Memberships are provisioned with `seamline-cli admin grant`; the server
//! only reads them.

use seamline_core::{AdminMembership, IdentityId};

use super::{DataStore, DataStoreError, Query, collections, decode_rows};

/// Repository for `admin_users` reads.
pub struct AdminMembershipRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> AdminMembershipRepository<'a> {
    /// Create a new membership repository.
    #[must_use]
    pub const fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// Membership rows for an identity.
    ///
    /// At most two rows are fetched: enough to tell "exactly one" from a
    /// uniqueness breach without reading the whole table.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails or a row cannot be decoded.
    pub async fn find_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<AdminMembership>, DataStoreError> {
        let query = Query::from(collections::ADMIN_USERS)
            .select("id,user_id,created_at")
            .eq("user_id", identity_id.to_string())
            .limit(2);

        decode_rows(self.store.select(&query).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_find_for_identity_matches_only_that_identity() {
        let store = MemoryStore::new();
        let member = IdentityId::new(Uuid::from_u128(1));
        store.seed(
            collections::ADMIN_USERS,
            [
                json!({"id": 1, "user_id": member.to_string(), "created_at": "2026-01-01T00:00:00Z"}),
                json!({"id": 2, "user_id": Uuid::from_u128(2).to_string(), "created_at": "2026-01-02T00:00:00Z"}),
            ],
        );

        let repo = AdminMembershipRepository::new(&store);
        let rows = repo.find_for_identity(member).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity_id, member);

        let none = repo
            .find_for_identity(IdentityId::new(Uuid::from_u128(3)))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_for_identity_caps_at_two_rows() {
        let store = MemoryStore::new();
        let id = Uuid::from_u128(9).to_string();
        store.seed(
            collections::ADMIN_USERS,
            (1..=3).map(|n| json!({"id": n, "user_id": id, "created_at": "2026-01-01T00:00:00Z"})),
        );

        let repo = AdminMembershipRepository::new(&store);
        let rows = repo
            .find_for_identity(IdentityId::new(Uuid::from_u128(9)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
