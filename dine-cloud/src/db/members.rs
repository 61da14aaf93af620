use shared::error::{AppError, ErrorCode};
use shared::models::{MemberInvite, VenueMember};
use shared::staff::{Member, VenueRole, check_member_removal, check_role_change};
use shared::util::now_millis;
use sqlx::{PgConnection, PgPool};

use crate::error::ServiceResult;

const MEMBER_COLUMNS: &str =
    "venue_id, user_id, email, display_name, role, created_at, updated_at";

/// Caller's role in a venue, `None` when not a member
pub async fn role_of(
    pool: &PgPool,
    venue_id: i64,
    user_id: &str,
) -> Result<Option<VenueRole>, sqlx::Error> {
    let row: Option<(VenueRole,)> =
        sqlx::query_as("SELECT role FROM user_venue_roles WHERE venue_id = $1 AND user_id = $2")
            .bind(venue_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

pub async fn list(pool: &PgPool, venue_id: i64) -> Result<Vec<VenueMember>, sqlx::Error> {
    sqlx::query_as::<_, VenueMember>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM user_venue_roles WHERE venue_id = $1 ORDER BY created_at"
    ))
    .bind(venue_id)
    .fetch_all(pool)
    .await
}

/// Add a member; the invite rules are checked by the caller
pub async fn add(pool: &PgPool, venue_id: i64, invite: &MemberInvite) -> ServiceResult<VenueMember> {
    let now = now_millis();
    let member = sqlx::query_as::<_, VenueMember>(&format!(
        r#"
        INSERT INTO user_venue_roles (venue_id, user_id, email, display_name, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (venue_id, user_id) DO NOTHING
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(venue_id)
    .bind(&invite.user_id)
    .bind(invite.email.as_deref())
    .bind(invite.display_name.as_deref())
    .bind(invite.role)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    member.ok_or_else(|| {
        AppError::with_message(ErrorCode::MemberAlreadyExists, "User is already a member")
            .with_detail("user_id", invite.user_id.clone())
            .into()
    })
}

/// Lock every owner row of the venue and return how many there are
async fn lock_owner_count(conn: &mut PgConnection, venue_id: i64) -> Result<i64, sqlx::Error> {
    let owners: Vec<(String,)> = sqlx::query_as(
        "SELECT user_id FROM user_venue_roles WHERE venue_id = $1 AND role = 'OWNER' FOR UPDATE",
    )
    .bind(venue_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(owners.len() as i64)
}

async fn lock_member_role(
    conn: &mut PgConnection,
    venue_id: i64,
    user_id: &str,
) -> ServiceResult<VenueRole> {
    let row: Option<(VenueRole,)> = sqlx::query_as(
        "SELECT role FROM user_venue_roles WHERE venue_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(venue_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| r.0).ok_or_else(|| {
        AppError::with_message(ErrorCode::MemberNotFound, "Member not found")
            .with_detail("user_id", user_id)
            .into()
    })
}

/// Change a member's role. Owner rows are locked first so two concurrent
/// demotions cannot both see a second owner.
pub async fn change_role(
    pool: &PgPool,
    venue_id: i64,
    actor: Member<'_>,
    target_user_id: &str,
    new_role: VenueRole,
) -> ServiceResult<VenueMember> {
    let mut tx = pool.begin().await?;

    let owner_count = lock_owner_count(&mut tx, venue_id).await?;
    let target_role = lock_member_role(&mut tx, venue_id, target_user_id).await?;
    check_role_change(
        actor,
        Member {
            user_id: target_user_id,
            role: target_role,
        },
        new_role,
        owner_count,
    )?;

    let member = sqlx::query_as::<_, VenueMember>(&format!(
        r#"
        UPDATE user_venue_roles SET role = $3, updated_at = $4
        WHERE venue_id = $1 AND user_id = $2
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(venue_id)
    .bind(target_user_id)
    .bind(new_role)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(venue_id, target = target_user_id, from = %target_role, to = %new_role, "Member role changed");
    Ok(member)
}

pub async fn remove(
    pool: &PgPool,
    venue_id: i64,
    actor: Member<'_>,
    target_user_id: &str,
) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;

    let owner_count = lock_owner_count(&mut tx, venue_id).await?;
    let target_role = lock_member_role(&mut tx, venue_id, target_user_id).await?;
    check_member_removal(
        actor,
        Member {
            user_id: target_user_id,
            role: target_role,
        },
        owner_count,
    )?;

    sqlx::query("DELETE FROM user_venue_roles WHERE venue_id = $1 AND user_id = $2")
        .bind(venue_id)
        .bind(target_user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(venue_id, target = target_user_id, role = %target_role, "Member removed");
    Ok(())
}
