use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::UpdateUserPayload;
use crate::error::{Error, Result};
use crate::models::exam::RecordStatus;
use crate::models::user::User;

/// Admin-side account management over the shared soft-delete scheme.
#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_users(
        &self,
        page: i64,
        limit: i64,
        record_status: RecordStatus,
        role: Option<&str>,
        search: Option<&str>,
    ) -> Result<UserPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let role = role.map(str::trim).filter(|r| !r.is_empty());
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::bool IS NULL OR is_deleted = $1)
              AND ($2::text IS NULL OR role = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            "#,
        )
        .bind(record_status.as_deleted_flag())
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::bool IS NULL OR is_deleted = $1)
              AND ($2::text IS NULL OR role = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(record_status.as_deleted_flag())
        .bind(role)
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserPage {
            users,
            total,
            page,
            limit,
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn update_user(&self, user_id: Uuid, payload: &UpdateUserPayload) -> Result<User> {
        if let Some(email) = payload.email.as_deref() {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
            )
            .bind(email)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            if taken {
                return Err(Error::BadRequest(
                    "Email is already in use by another account".to_string(),
                ));
            }
        }

        if let Some(role) = payload.role.as_deref() {
            if !matches!(role, "student" | "admin") {
                return Err(Error::BadRequest(
                    "role must be either student or admin".to_string(),
                ));
            }
        }

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                bio = COALESCE($5, bio),
                role = COALESCE($6, role),
                exam_targets = COALESCE($7, exam_targets),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payload.name.as_deref().map(str::trim))
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.bio.as_deref())
        .bind(payload.role.as_deref())
        .bind(payload.exam_targets.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn soft_delete_user(&self, user_id: Uuid, deleted_by: Uuid) -> Result<User> {
        if user_id == deleted_by {
            return Err(Error::BadRequest(
                "You cannot archive your own admin account".to_string(),
            ));
        }

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_deleted = TRUE, deleted_at = NOW(), deleted_by = $2, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(deleted_by)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn restore_user(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, updated_at = NOW()
            WHERE id = $1 AND is_deleted = TRUE
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Archived user not found".to_string()))
    }
}
