//! Role-scoped dashboard counters

use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::notification::NotificationService;
use shared::{available_actions, RequestAction, RequestStatus, UserRole, REQUEST_TRANSITIONS};

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub role: UserRole,
    pub distributions: Vec<StatusCount>,
    /// Shipped targets in scope with units still to confirm
    pub pending_receipts: i64,
    pub pending_units: i64,
    pub requests: Vec<StatusCount>,
    /// Requests sitting in a status where the caller's role can move them forward
    pub requests_awaiting_action: i64,
    pub procurements: Vec<StatusCount>,
    pub unread_notifications: i64,
}

/// Request statuses in which `role` has something other than cancel to do
pub fn actionable_request_statuses(role: UserRole) -> Vec<RequestStatus> {
    RequestStatus::ALL
        .into_iter()
        .filter(|status| {
            available_actions(REQUEST_TRANSITIONS, *status, role)
                .iter()
                .any(|action| *action != RequestAction::Cancel)
        })
        .collect()
}

fn to_counts(rows: Vec<(String, i64)>) -> Vec<StatusCount> {
    rows.into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn summary(&self, user: &AuthUser) -> AppResult<DashboardSummary> {
        let scope = user.list_scope();

        let distributions = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT d.status, COUNT(*)
            FROM asset_distributions d
            WHERE ($1::uuid IS NULL AND $2::uuid IS NULL)
               OR EXISTS (
                    SELECT 1 FROM asset_distribution_targets t
                    JOIN rooms r ON r.id = t.room_id
                    JOIN units u ON u.id = r.unit_id
                    WHERE t.distribution_id = d.id
                      AND ($1::uuid IS NULL OR r.unit_id = $1)
                      AND ($2::uuid IS NULL OR u.faculty_id = $2)
               )
            GROUP BY d.status
            ORDER BY d.status
            "#,
        )
        .bind(scope.unit_id)
        .bind(scope.faculty_id)
        .fetch_all(&self.db)
        .await?;

        let (pending_receipts, pending_units) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(t.allocated_quantity - t.received_quantity), 0)::BIGINT
            FROM asset_distribution_targets t
            JOIN asset_distributions d ON d.id = t.distribution_id
            JOIN rooms r ON r.id = t.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE d.status = 'SHIPPED'
              AND t.received_quantity < t.allocated_quantity
              AND ($1::uuid IS NULL OR r.unit_id = $1)
              AND ($2::uuid IS NULL OR u.faculty_id = $2)
            "#,
        )
        .bind(scope.unit_id)
        .bind(scope.faculty_id)
        .fetch_one(&self.db)
        .await?;

        let requests = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT rq.status, COUNT(*)
            FROM requests rq
            JOIN rooms r ON r.id = rq.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE ($1::uuid IS NULL OR r.unit_id = $1)
              AND ($2::uuid IS NULL OR u.faculty_id = $2)
              AND ($3::uuid IS NULL OR rq.warehouse_id = $3)
            GROUP BY rq.status
            ORDER BY rq.status
            "#,
        )
        .bind(scope.unit_id)
        .bind(scope.faculty_id)
        .bind(scope.warehouse_id)
        .fetch_all(&self.db)
        .await?;

        let actionable: Vec<&str> = actionable_request_statuses(user.role)
            .iter()
            .map(|s| s.as_str())
            .collect();
        let requests_awaiting_action: i64 = requests
            .iter()
            .filter(|(status, _)| actionable.contains(&status.as_str()))
            .map(|(_, count)| count)
            .sum();

        let procurements = match user.role {
            UserRole::UnitAdmin | UserRole::UnitStaff => Vec::new(),
            _ => {
                sqlx::query_as::<_, (String, i64)>(
                    r#"
                    SELECT p.status, COUNT(*)
                    FROM procurements p
                    JOIN warehouses w ON w.id = p.warehouse_id
                    WHERE ($1::uuid IS NULL OR w.faculty_id = $1)
                      AND ($2::uuid IS NULL OR p.warehouse_id = $2)
                    GROUP BY p.status
                    ORDER BY p.status
                    "#,
                )
                .bind(scope.faculty_id)
                .bind(scope.warehouse_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        let unread_notifications = NotificationService::new(self.db.clone())
            .unread_count(user.user_id)
            .await?
            .unread;

        Ok(DashboardSummary {
            role: user.role,
            distributions: to_counts(distributions),
            pending_receipts,
            pending_units,
            requests: to_counts(requests),
            requests_awaiting_action,
            procurements: to_counts(procurements),
            unread_notifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actionable_statuses_per_role() {
        assert_eq!(
            actionable_request_statuses(UserRole::UnitAdmin),
            vec![RequestStatus::PendingUnit]
        );
        assert_eq!(
            actionable_request_statuses(UserRole::FacultyAdmin),
            vec![RequestStatus::PendingFaculty]
        );
        assert_eq!(
            actionable_request_statuses(UserRole::WarehouseStaff),
            vec![
                RequestStatus::Approved,
                RequestStatus::Processing,
                RequestStatus::ReadyToPickup
            ]
        );
        assert!(actionable_request_statuses(UserRole::UnitStaff).is_empty());
    }
}
