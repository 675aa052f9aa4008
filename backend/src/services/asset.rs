//! Physical asset service
//!
//! Owns the one code path that materializes asset rows with QR tokens, used by
//! distribution execution and procurement completion.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::config::AssetConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::AssetRow;
use shared::{
    generate_asset_token, AssetLocation, MovementStatus, PaginatedResponse, Pagination,
    PhysicalAsset,
};

#[derive(Clone)]
pub struct AssetService {
    db: PgPool,
}

/// Units to create for one asset model
#[derive(Debug, Clone)]
pub struct NewAssetBatch<'a> {
    pub model_id: Uuid,
    pub model_code: &'a str,
    /// One entry per unit
    pub locations: Vec<AssetLocation>,
    pub movement_status: MovementStatus,
    pub distribution_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetQuery {
    pub room_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub movement_status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One line of the QR label sheet for a distribution
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AssetLabel {
    pub qr_token: String,
    pub model_code: String,
    pub model_name: String,
    pub room_code: Option<String>,
    pub room_name: Option<String>,
    pub movement_status: String,
}

/// Draw `count` tokens that are distinct from each other
fn fresh_tokens(prefix: &str, model_code: &str, count: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut tokens = Vec::with_capacity(count);
    while tokens.len() < count {
        let token = generate_asset_token(prefix, model_code);
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}

impl AssetService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert one asset row per location.
    ///
    /// Tokens that collide with existing rows are skipped by the insert and
    /// regenerated, up to `config.token_attempts` rounds. Returns the number of
    /// rows created, which always equals the batch size on success.
    pub async fn materialize(
        conn: &mut PgConnection,
        config: &AssetConfig,
        batch: NewAssetBatch<'_>,
    ) -> AppResult<u64> {
        let mut pending = batch.locations;
        let mut created = 0u64;
        let attempts = config.token_attempts.max(1);

        for attempt in 1..=attempts {
            if pending.is_empty() {
                break;
            }

            let tokens = fresh_tokens(&config.token_prefix, batch.model_code, pending.len());
            let rooms: Vec<Option<Uuid>> = pending.iter().map(AssetLocation::room_id).collect();
            let warehouses: Vec<Option<Uuid>> =
                pending.iter().map(AssetLocation::warehouse_id).collect();

            let accepted: HashSet<String> = sqlx::query_scalar::<_, String>(
                r#"
                INSERT INTO fixed_assets (model_id, room_id, warehouse_id, movement_status, qr_token, distribution_id)
                SELECT $1, t.room_id, t.warehouse_id, $2, t.qr_token, $3
                FROM UNNEST($4::uuid[], $5::uuid[], $6::text[]) AS t(room_id, warehouse_id, qr_token)
                ON CONFLICT (qr_token) DO NOTHING
                RETURNING qr_token
                "#,
            )
            .bind(batch.model_id)
            .bind(batch.movement_status.as_str())
            .bind(batch.distribution_id)
            .bind(&rooms)
            .bind(&warehouses)
            .bind(&tokens)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

            created += accepted.len() as u64;

            let collided: Vec<AssetLocation> = pending
                .iter()
                .zip(&tokens)
                .filter(|(_, token)| !accepted.contains(*token))
                .map(|(location, _)| *location)
                .collect();

            if !collided.is_empty() {
                tracing::warn!(
                    attempt,
                    collisions = collided.len(),
                    model_code = batch.model_code,
                    "Asset token collisions, regenerating"
                );
            }
            pending = collided;
        }

        if !pending.is_empty() {
            return Err(AppError::Consistency(format!(
                "Could not assign unique tokens to {} assets after {} attempts",
                pending.len(),
                attempts
            )));
        }

        Ok(created)
    }

    /// Paginated asset listing; unit roles only see their own unit's rooms
    pub async fn list(
        &self,
        user: &AuthUser,
        query: AssetQuery,
    ) -> AppResult<PaginatedResponse<PhysicalAsset>> {
        let movement_status = match query.movement_status.as_deref() {
            Some(s) => Some(
                MovementStatus::from_str(s)
                    .ok_or_else(|| AppError::validation("movement_status", "Unknown movement status"))?,
            ),
            None => None,
        };
        let pagination = Pagination::from_query(query.page, query.per_page);
        let unit_scope = user.list_scope().unit_id;

        let filter = r#"
            FROM fixed_assets a
            LEFT JOIN rooms r ON r.id = a.room_id
            WHERE ($1::uuid IS NULL OR a.room_id = $1)
              AND ($2::uuid IS NULL OR a.warehouse_id = $2)
              AND ($3::uuid IS NULL OR a.model_id = $3)
              AND ($4::text IS NULL OR a.movement_status = $4)
              AND ($5::uuid IS NULL OR r.unit_id = $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", filter))
            .bind(query.room_id)
            .bind(query.warehouse_id)
            .bind(query.model_id)
            .bind(movement_status.map(|s| s.as_str()))
            .bind(unit_scope)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, AssetRow>(&format!(
            r#"
            SELECT a.id, a.model_id, a.room_id, a.warehouse_id, a.movement_status, a.condition,
                   a.qr_token, a.inventory_number, a.distribution_id, a.notes,
                   a.created_at, a.updated_at
            {}
            ORDER BY a.created_at DESC, a.id
            LIMIT $6 OFFSET $7
            "#,
            filter
        ))
        .bind(query.room_id)
        .bind(query.warehouse_id)
        .bind(query.model_id)
        .bind(movement_status.map(|s| s.as_str()))
        .bind(unit_scope)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let assets = rows
            .into_iter()
            .map(PhysicalAsset::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(assets, &pagination, total.max(0) as u64))
    }

    /// Label sheet for every asset a distribution generated
    pub async fn labels_for_distribution(&self, distribution_id: Uuid) -> AppResult<Vec<AssetLabel>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM asset_distributions WHERE id = $1)",
        )
        .bind(distribution_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Distribution".to_string()));
        }

        let labels = sqlx::query_as::<_, AssetLabel>(
            r#"
            SELECT a.qr_token, m.code AS model_code, m.name AS model_name,
                   r.code AS room_code, r.name AS room_name, a.movement_status
            FROM fixed_assets a
            JOIN asset_models m ON m.id = a.model_id
            LEFT JOIN rooms r ON r.id = a.room_id
            WHERE a.distribution_id = $1
            ORDER BY r.code, a.qr_token
            "#,
        )
        .bind(distribution_id)
        .fetch_all(&self.db)
        .await?;

        Ok(labels)
    }

    /// Render labels as CSV for the label printer
    pub fn labels_to_csv(labels: &[AssetLabel]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for label in labels {
            wtr.serialize(label)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tokens_are_distinct() {
        let tokens = fresh_tokens("INV", "PROJ-4K", 200);
        let unique: HashSet<_> = tokens.iter().collect();
        assert_eq!(unique.len(), 200);
        assert!(tokens.iter().all(|t| t.starts_with("INV-PROJ4K-")));
    }

    #[test]
    fn test_labels_to_csv() {
        let labels = vec![AssetLabel {
            qr_token: "INV-PROJ4K-0a1b2c3d4e5f".into(),
            model_code: "PROJ-4K".into(),
            model_name: "Projector 4K".into(),
            room_code: Some("R101".into()),
            room_name: Some("Lecture Hall".into()),
            movement_status: "IN_TRANSIT".into(),
        }];

        let csv = AssetService::labels_to_csv(&labels).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("qr_token,model_code,model_name,room_code,room_name,movement_status")
        );
        assert_eq!(
            lines.next(),
            Some("INV-PROJ4K-0a1b2c3d4e5f,PROJ-4K,Projector 4K,R101,Lecture Hall,IN_TRANSIT")
        );
    }
}
