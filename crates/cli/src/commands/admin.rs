//! Admin membership provisioning.
//!
//! The storefront only ever reads `admin_users`; rows are created and
//! removed here.

use chrono::{DateTime, Utc};
use seamline_core::{AdminMembership, IdentityId, MembershipId};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Identity already holds a membership.
    #[error("Identity {0} is already an admin")]
    AlreadyAdmin(IdentityId),

    /// Identity holds no membership.
    #[error("Identity {0} is not an admin")]
    NotAdmin(IdentityId),
}

type MembershipRow = (i64, Uuid, DateTime<Utc>);

fn membership((id, user_id, created_at): MembershipRow) -> AdminMembership {
    AdminMembership {
        id: MembershipId::new(id),
        identity_id: IdentityId::new(user_id),
        created_at,
    }
}

/// Grant admin rights to `identity`.
///
/// # Errors
///
/// Returns `AdminError::AlreadyAdmin` if a membership exists.
pub async fn grant(identity: IdentityId) -> Result<AdminMembership, AdminError> {
    let pool = connect().await?;
    let created = insert_membership(&pool, identity).await?;

    tracing::info!(
        "Admin membership created. ID: {}, Identity: {}",
        created.id,
        created.identity_id
    );
    tracing::warn!(
        "Any session this identity already holds is admitted on its next request."
    );
    Ok(created)
}

async fn insert_membership(
    pool: &PgPool,
    identity: IdentityId,
) -> Result<AdminMembership, AdminError> {
    let row: Option<MembershipRow> = sqlx::query_as(
        r"
        INSERT INTO admin_users (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING id, user_id, created_at
        ",
    )
    .bind(identity.as_uuid())
    .fetch_optional(pool)
    .await?;

    row.map(membership).ok_or(AdminError::AlreadyAdmin(identity))
}

/// Revoke admin rights from `identity`.
///
/// Sessions the identity holds are revoked by the gate on their next
/// protected request.
///
/// # Errors
///
/// Returns `AdminError::NotAdmin` if no membership exists.
pub async fn revoke(identity: IdentityId) -> Result<(), AdminError> {
    let pool = connect().await?;

    let result = sqlx::query("DELETE FROM admin_users WHERE user_id = $1")
        .bind(identity.as_uuid())
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::NotAdmin(identity));
    }

    tracing::info!("Admin membership removed for identity {}", identity);
    Ok(())
}

/// Print every admin membership, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list() -> Result<(), AdminError> {
    let pool = connect().await?;

    let rows: Vec<MembershipRow> =
        sqlx::query_as("SELECT id, user_id, created_at FROM admin_users ORDER BY created_at, id")
            .fetch_all(&pool)
            .await?;

    #[allow(clippy::print_stdout)]
    {
        if rows.is_empty() {
            println!("No admin memberships.");
        }
        for m in rows.into_iter().map(membership) {
            println!("{}\t{}\t{}", m.id, m.identity_id, m.created_at.to_rfc3339());
        }
    }

    Ok(())
}
