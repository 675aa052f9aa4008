//! Seed data for database-backed service tests

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AssetConfig;
use crate::middleware::AuthUser;
use shared::UserRole;

/// One faculty with a unit of two rooms, a warehouse, a catalog entry of each
/// kind and one user per role.
pub struct Campus {
    pub room_a: Uuid,
    pub room_b: Uuid,
    pub warehouse_id: Uuid,
    pub model_id: Uuid,
    pub consumable_id: Uuid,
    pub super_admin: AuthUser,
    pub warehouse_staff: AuthUser,
    pub faculty_admin: AuthUser,
    pub unit_admin: AuthUser,
    pub unit_staff: AuthUser,
}

pub fn asset_config() -> AssetConfig {
    AssetConfig {
        token_prefix: "INV".to_string(),
        token_attempts: 3,
    }
}

async fn insert_id(pool: &PgPool, sql: &str, binds: &[&str]) -> Uuid {
    let mut query = sqlx::query_scalar::<_, Uuid>(sql);
    for bind in binds {
        query = query.bind(*bind);
    }
    query.fetch_one(pool).await.unwrap()
}

async fn insert_user(
    pool: &PgPool,
    email: &str,
    role: UserRole,
    unit_id: Option<Uuid>,
    faculty_id: Option<Uuid>,
    warehouse_id: Option<Uuid>,
) -> AuthUser {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (name, email, role, unit_id, faculty_id, warehouse_id)
        VALUES ($1, $1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(role.as_str())
    .bind(unit_id)
    .bind(faculty_id)
    .bind(warehouse_id)
    .fetch_one(pool)
    .await
    .unwrap();

    AuthUser {
        user_id,
        role,
        unit_id,
        faculty_id,
        warehouse_id,
    }
}

pub async fn seed(pool: &PgPool) -> Campus {
    let faculty_id = insert_id(
        pool,
        "INSERT INTO faculties (code, name) VALUES ($1, $2) RETURNING id",
        &["SCI", "Faculty of Science"],
    )
    .await;

    let unit_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO units (faculty_id, code, name) VALUES ($1, 'CS', 'Computer Science') RETURNING id",
    )
    .bind(faculty_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let mut rooms = Vec::new();
    for code in ["CS-101", "CS-102"] {
        let room_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO rooms (unit_id, code, name) VALUES ($1, $2, $2) RETURNING id",
        )
        .bind(unit_id)
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap();
        rooms.push(room_id);
    }

    let warehouse_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO warehouses (faculty_id, code, name) VALUES ($1, 'WH-SCI', 'Science store') RETURNING id",
    )
    .bind(faculty_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let model_id = insert_id(
        pool,
        "INSERT INTO asset_models (code, name) VALUES ($1, $2) RETURNING id",
        &["proj-4k", "Projector 4K"],
    )
    .await;

    let consumable_id = insert_id(
        pool,
        "INSERT INTO consumables (code, name, unit) VALUES ($1, $2, $3) RETURNING id",
        &["A4", "A4 paper", "ream"],
    )
    .await;

    sqlx::query("INSERT INTO consumable_stocks (consumable_id, warehouse_id, quantity) VALUES ($1, $2, 50)")
        .bind(consumable_id)
        .bind(warehouse_id)
        .execute(pool)
        .await
        .unwrap();

    Campus {
        room_a: rooms[0],
        room_b: rooms[1],
        warehouse_id,
        model_id,
        consumable_id,
        super_admin: insert_user(pool, "root@uni.test", UserRole::SuperAdmin, None, None, None).await,
        warehouse_staff: insert_user(
            pool,
            "store@uni.test",
            UserRole::WarehouseStaff,
            None,
            None,
            Some(warehouse_id),
        )
        .await,
        faculty_admin: insert_user(
            pool,
            "dean@uni.test",
            UserRole::FacultyAdmin,
            None,
            Some(faculty_id),
            None,
        )
        .await,
        unit_admin: insert_user(pool, "head@uni.test", UserRole::UnitAdmin, Some(unit_id), None, None)
            .await,
        unit_staff: insert_user(pool, "staff@uni.test", UserRole::UnitStaff, Some(unit_id), None, None)
            .await,
    }
}

pub async fn count(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}
