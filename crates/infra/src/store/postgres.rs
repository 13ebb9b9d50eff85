//! Postgres-backed store.
//!
//! Quantity changes are written as `quantity = quantity + $delta`, so the row
//! lock taken by the `UPDATE` serialises concurrent writers to the same item.
//! Update and delete of an intervention start with `SELECT ... FOR UPDATE` on
//! the intervention row, which keeps two transactions from reversing the same
//! material lines twice.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use fieldops_auth::{HashedPassword, Role, UserAccount};
use fieldops_clients::{Client, ClientFilter, ClientSummary};
use fieldops_core::{ClientId, InterventionId, InventoryItemId, MaterialLineId, Money, UserId};
use fieldops_interventions::{
    Assignee, Intervention, InterventionDetail, InterventionFilter, InterventionStatus,
    InterventionSummary, MaterialDetail, MaterialRecord, MonthlyRevenue, Statistics, TypeCount,
};
use fieldops_inventory::{InventoryFilter, InventoryItem};

use super::{Store, StoreResult, UnitOfWork};
use crate::error::{map_sqlx_error, StoreError};

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, created_at, updated_at";

const CLIENT_COLUMNS: &str = "c.id, c.first_name, c.last_name, c.email, c.phone, c.address, \
     c.city, c.postal_code, c.notes, c.created_at, c.updated_at";

const INVENTORY_COLUMNS: &str = "id, name, reference, description, quantity, min_quantity, \
     unit_price_cents, category, created_at, updated_at";

const INTERVENTION_COLUMNS: &str = "i.id, i.client_id, i.assigned_to, i.intervention_date, \
     i.intervention_time, i.type, i.status, i.problem_description, i.work_done, i.time_spent, \
     i.labor_cost_cents, i.materials_cost_cents, i.total_cost_cents, i.is_urgent, i.notes, \
     i.created_at, i.updated_at";

const MATERIAL_COLUMNS: &str =
    "m.id, m.intervention_id, m.inventory_id, m.quantity, m.unit_price_cents, m.created_at";

/// [`Store`] over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migrate: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error(column, e))
}

fn cents(row: &PgRow, column: &str) -> StoreResult<Money> {
    get::<i64>(row, column).map(Money::from_cents)
}

fn optional_cents(row: &PgRow, column: &str) -> StoreResult<Option<Money>> {
    Ok(get::<Option<i64>>(row, column)?.map(Money::from_cents))
}

fn decode_user(row: &PgRow) -> StoreResult<UserAccount> {
    Ok(UserAccount {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        password_hash: HashedPassword::from_phc(get::<String>(row, "password_hash")?),
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        role: Role::new(get::<String>(row, "role")?),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn decode_client(row: &PgRow) -> StoreResult<Client> {
    Ok(Client {
        id: ClientId::from_uuid(get(row, "id")?),
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        email: get(row, "email")?,
        phone: get(row, "phone")?,
        address: get(row, "address")?,
        city: get(row, "city")?,
        postal_code: get(row, "postal_code")?,
        notes: get(row, "notes")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn decode_item(row: &PgRow) -> StoreResult<InventoryItem> {
    Ok(InventoryItem {
        id: InventoryItemId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        reference: get(row, "reference")?,
        description: get(row, "description")?,
        quantity: get(row, "quantity")?,
        min_quantity: get(row, "min_quantity")?,
        unit_price: optional_cents(row, "unit_price_cents")?,
        category: get(row, "category")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn decode_intervention(row: &PgRow) -> StoreResult<Intervention> {
    let status = get::<String>(row, "status")?
        .parse::<InterventionStatus>()
        .map_err(|e| StoreError::decode(e.to_string()))?;
    Ok(Intervention {
        id: InterventionId::from_uuid(get(row, "id")?),
        client_id: ClientId::from_uuid(get(row, "client_id")?),
        assigned_to: get::<Option<Uuid>>(row, "assigned_to")?.map(UserId::from_uuid),
        intervention_date: get(row, "intervention_date")?,
        intervention_time: get(row, "intervention_time")?,
        kind: get(row, "type")?,
        status,
        problem_description: get(row, "problem_description")?,
        work_done: get(row, "work_done")?,
        time_spent: get(row, "time_spent")?,
        labor_cost: optional_cents(row, "labor_cost_cents")?,
        materials_cost: cents(row, "materials_cost_cents")?,
        total_cost: cents(row, "total_cost_cents")?,
        is_urgent: get(row, "is_urgent")?,
        notes: get(row, "notes")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn decode_material(row: &PgRow) -> StoreResult<MaterialRecord> {
    Ok(MaterialRecord {
        id: MaterialLineId::from_uuid(get(row, "id")?),
        intervention_id: InterventionId::from_uuid(get(row, "intervention_id")?),
        inventory_id: InventoryItemId::from_uuid(get(row, "inventory_id")?),
        quantity: get(row, "quantity")?,
        unit_price: cents(row, "unit_price_cents")?,
        created_at: get(row, "created_at")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &UserAccount) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?
            .as_ref()
            .map(decode_user)
            .transpose()
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .as_ref()
            .map(decode_user)
            .transpose()
    }

    async fn list_clients(&self, filter: &ClientFilter) -> StoreResult<Vec<ClientSummary>> {
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS},
                   (SELECT COUNT(*) FROM interventions i WHERE i.client_id = c.id) AS intervention_count
            FROM clients c
            WHERE ($1::text IS NULL
                   OR c.first_name ILIKE $1 OR c.last_name ILIKE $1
                   OR c.email ILIKE $1 OR c.phone ILIKE $1)
            ORDER BY c.last_name, c.first_name
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.like_pattern())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_clients", e))?;
        rows.iter()
            .map(|row| {
                Ok(ClientSummary {
                    client: decode_client(row)?,
                    intervention_count: get(row, "intervention_count")?,
                })
            })
            .collect()
    }

    async fn get_client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_client", e))?
            .as_ref()
            .map(decode_client)
            .transpose()
    }

    #[instrument(skip(self, client), fields(client_id = %client.id), err)]
    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients
                (id, first_name, last_name, email, phone, address, city, postal_code, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.postal_code)
        .bind(&client.notes)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_client", e))?;
        Ok(())
    }

    #[instrument(skip(self, client), fields(client_id = %client.id), err)]
    async fn update_client(&self, client: &Client) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET first_name = $2, last_name = $3, email = $4, phone = $5, address = $6,
                city = $7, postal_code = $8, notes = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.postal_code)
        .bind(&client.notes)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(client_id = %id), err)]
    async fn delete_client(&self, id: ClientId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn client_interventions(&self, id: ClientId) -> StoreResult<Vec<Intervention>> {
        let sql = format!(
            "SELECT {INTERVENTION_COLUMNS} FROM interventions i WHERE i.client_id = $1 \
             ORDER BY i.intervention_date DESC, i.intervention_time DESC NULLS LAST"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("client_interventions", e))?;
        rows.iter().map(decode_intervention).collect()
    }

    async fn list_inventory(&self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!(
            r#"
            SELECT {INVENTORY_COLUMNS}
            FROM inventory
            WHERE ($1::text IS NULL OR name ILIKE $1 OR reference ILIKE $1 OR category ILIKE $1)
              AND (NOT $2 OR quantity <= min_quantity)
            ORDER BY name
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.like_pattern())
            .bind(filter.low_stock_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inventory", e))?;
        rows.iter().map(decode_item).collect()
    }

    async fn low_stock_items(&self) -> StoreResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE quantity <= min_quantity \
             ORDER BY quantity, name"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("low_stock_items", e))?;
        rows.iter().map(decode_item).collect()
    }

    async fn get_inventory_item(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_inventory_item", e))?
            .as_ref()
            .map(decode_item)
            .transpose()
    }

    #[instrument(skip(self, item), fields(inventory_id = %item.id), err)]
    async fn insert_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory
                (id, name, reference, description, quantity, min_quantity, unit_price_cents, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.reference)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.min_quantity)
        .bind(item.unit_price.map(Money::cents))
        .bind(&item.category)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_inventory_item", e))?;
        Ok(())
    }

    #[instrument(skip(self, item), fields(inventory_id = %item.id), err)]
    async fn update_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET name = $2, reference = $3, description = $4, quantity = $5, min_quantity = $6,
                unit_price_cents = $7, category = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.reference)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.min_quantity)
        .bind(item.unit_price.map(Money::cents))
        .bind(&item.category)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_inventory_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(inventory_id = %id), err)]
    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_inventory_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_interventions(
        &self,
        filter: &InterventionFilter,
    ) -> StoreResult<Vec<InterventionSummary>> {
        let sql = format!(
            r#"
            SELECT {INTERVENTION_COLUMNS},
                   c.first_name AS client_first_name,
                   c.last_name AS client_last_name,
                   c.phone AS client_phone,
                   c.address AS client_address,
                   u.first_name AS plumber_first_name,
                   u.last_name AS plumber_last_name
            FROM interventions i
            JOIN clients c ON c.id = i.client_id
            LEFT JOIN users u ON u.id = i.assigned_to
            WHERE ($1::text IS NULL OR i.status = $1)
              AND ($2::uuid IS NULL OR i.client_id = $2)
              AND ($3::date IS NULL OR i.intervention_date >= $3)
              AND ($4::date IS NULL OR i.intervention_date <= $4)
              AND (NOT $5 OR i.is_urgent)
            ORDER BY i.intervention_date DESC, i.intervention_time DESC NULLS LAST
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(InterventionStatus::as_str))
            .bind(filter.client_id.map(Uuid::from))
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.urgent_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_interventions", e))?;
        rows.iter()
            .map(|row| {
                Ok(InterventionSummary {
                    intervention: decode_intervention(row)?,
                    client_first_name: get(row, "client_first_name")?,
                    client_last_name: get(row, "client_last_name")?,
                    client_phone: get(row, "client_phone")?,
                    client_address: get(row, "client_address")?,
                    plumber_first_name: get(row, "plumber_first_name")?,
                    plumber_last_name: get(row, "plumber_last_name")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(intervention_id = %id), err)]
    async fn intervention_detail(
        &self,
        id: InterventionId,
    ) -> StoreResult<Option<InterventionDetail>> {
        let sql = format!("SELECT {INTERVENTION_COLUMNS} FROM interventions i WHERE i.id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("intervention_detail", e))?
        else {
            return Ok(None);
        };
        let intervention = decode_intervention(&row)?;

        let client = self
            .get_client(intervention.client_id)
            .await?
            .ok_or_else(|| StoreError::decode(format!("intervention {id} has no client")))?;

        let plumber = match intervention.assigned_to {
            Some(user_id) => self.get_user(user_id).await?.map(|u| Assignee {
                id: u.id,
                first_name: u.first_name,
                last_name: u.last_name,
            }),
            None => None,
        };

        let sql = format!(
            r#"
            SELECT {MATERIAL_COLUMNS}, inv.name, inv.reference,
                   inv.unit_price_cents AS item_unit_price_cents
            FROM intervention_materials m
            JOIN inventory inv ON inv.id = m.inventory_id
            WHERE m.intervention_id = $1
            ORDER BY m.created_at, m.id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("intervention_materials", e))?;
        let materials = rows
            .iter()
            .map(|row| {
                Ok(MaterialDetail {
                    record: decode_material(row)?,
                    name: get(row, "name")?,
                    reference: get(row, "reference")?,
                    item_unit_price: optional_cents(row, "item_unit_price_cents")?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(InterventionDetail {
            intervention,
            client,
            plumber,
            materials,
        }))
    }

    async fn statistics(&self, today: NaiveDate) -> StoreResult<Statistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (
                    WHERE date_trunc('month', intervention_date) = date_trunc('month', $1::date)
                ) AS this_month,
                COUNT(*) FILTER (WHERE status IN ('completed', 'invoiced')) AS completed,
                COUNT(*) FILTER (WHERE status IN ('planned', 'in_progress')) AS pending,
                COUNT(*) FILTER (
                    WHERE is_urgent AND status NOT IN ('completed', 'invoiced')
                ) AS urgent,
                COALESCE(SUM(total_cost_cents) FILTER (WHERE status = 'invoiced'), 0)::BIGINT
                    AS revenue_cents,
                COALESCE(SUM(total_cost_cents) FILTER (
                    WHERE status = 'invoiced'
                      AND date_trunc('month', intervention_date) = date_trunc('month', $1::date)
                ), 0)::BIGINT AS revenue_this_month_cents,
                COUNT(DISTINCT client_id) FILTER (
                    WHERE intervention_date >= ($1::date - INTERVAL '6 months')
                ) AS active_clients,
                (SELECT COUNT(*) FROM inventory WHERE quantity <= min_quantity) AS low_stock
            FROM interventions
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("statistics", e))?;

        Ok(Statistics {
            total_interventions: get(&row, "total")?,
            interventions_this_month: get(&row, "this_month")?,
            completed_interventions: get(&row, "completed")?,
            pending_interventions: get(&row, "pending")?,
            urgent_interventions: get(&row, "urgent")?,
            total_revenue: cents(&row, "revenue_cents")?,
            revenue_this_month: cents(&row, "revenue_this_month_cents")?,
            active_clients: get(&row, "active_clients")?,
            low_stock_items: get(&row, "low_stock")?,
        })
    }

    async fn monthly_revenue(&self, today: NaiveDate) -> StoreResult<Vec<MonthlyRevenue>> {
        let rows = sqlx::query(
            r#"
            SELECT EXTRACT(YEAR FROM intervention_date)::INT AS year,
                   EXTRACT(MONTH FROM intervention_date)::INT AS month,
                   COALESCE(SUM(total_cost_cents), 0)::BIGINT AS revenue_cents,
                   COUNT(*) AS intervention_count
            FROM interventions
            WHERE status = 'invoiced'
              AND intervention_date >= ($1::date - INTERVAL '12 months')
            GROUP BY 1, 2
            ORDER BY 1 DESC, 2 DESC
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("monthly_revenue", e))?;

        rows.iter()
            .map(|row| {
                let month: i32 = get(row, "month")?;
                Ok(MonthlyRevenue {
                    year: get(row, "year")?,
                    month: u32::try_from(month)
                        .map_err(|_| StoreError::decode(format!("month out of range: {month}")))?,
                    revenue: cents(row, "revenue_cents")?,
                    intervention_count: get(row, "intervention_count")?,
                })
            })
            .collect()
    }

    async fn interventions_by_type(&self) -> StoreResult<Vec<TypeCount>> {
        let rows = sqlx::query(
            "SELECT type, COUNT(*) AS count FROM interventions GROUP BY type ORDER BY count DESC, type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("interventions_by_type", e))?;
        rows.iter()
            .map(|row| {
                Ok(TypeCount {
                    kind: get(row, "type")?,
                    count: get(row, "count")?,
                })
            })
            .collect()
    }

    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// A unit of work over one Postgres transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_intervention(&mut self, id: InterventionId) -> StoreResult<Option<Intervention>> {
        let sql = format!(
            "SELECT {INTERVENTION_COLUMNS} FROM interventions i WHERE i.id = $1 FOR UPDATE"
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_intervention", e))?
            .as_ref()
            .map(decode_intervention)
            .transpose()
    }

    async fn insert_intervention(&mut self, i: &Intervention) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interventions
                (id, client_id, assigned_to, intervention_date, intervention_time, type, status,
                 problem_description, work_done, time_spent, labor_cost_cents, materials_cost_cents,
                 total_cost_cents, is_urgent, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(i.id.as_uuid())
        .bind(i.client_id.as_uuid())
        .bind(i.assigned_to.map(Uuid::from))
        .bind(i.intervention_date)
        .bind(i.intervention_time)
        .bind(&i.kind)
        .bind(i.status.as_str())
        .bind(&i.problem_description)
        .bind(&i.work_done)
        .bind(i.time_spent)
        .bind(i.labor_cost.map(Money::cents))
        .bind(i.materials_cost.cents())
        .bind(i.total_cost.cents())
        .bind(i.is_urgent)
        .bind(&i.notes)
        .bind(i.created_at)
        .bind(i.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_intervention", e))?;
        Ok(())
    }

    async fn update_intervention(&mut self, i: &Intervention) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE interventions
            SET client_id = $2, assigned_to = $3, intervention_date = $4, intervention_time = $5,
                type = $6, status = $7, problem_description = $8, work_done = $9,
                time_spent = $10, labor_cost_cents = $11, materials_cost_cents = $12,
                total_cost_cents = $13, is_urgent = $14, notes = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(i.id.as_uuid())
        .bind(i.client_id.as_uuid())
        .bind(i.assigned_to.map(Uuid::from))
        .bind(i.intervention_date)
        .bind(i.intervention_time)
        .bind(&i.kind)
        .bind(i.status.as_str())
        .bind(&i.problem_description)
        .bind(&i.work_done)
        .bind(i.time_spent)
        .bind(i.labor_cost.map(Money::cents))
        .bind(i.materials_cost.cents())
        .bind(i.total_cost.cents())
        .bind(i.is_urgent)
        .bind(&i.notes)
        .bind(i.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_intervention", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_intervention(&mut self, id: InterventionId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM interventions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_intervention", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn material_lines(&mut self, id: InterventionId) -> StoreResult<Vec<MaterialRecord>> {
        let sql = format!(
            "SELECT {MATERIAL_COLUMNS} FROM intervention_materials m \
             WHERE m.intervention_id = $1 ORDER BY m.created_at, m.id"
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("material_lines", e))?;
        rows.iter().map(decode_material).collect()
    }

    async fn insert_material_line(&mut self, line: &MaterialRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO intervention_materials
                (id, intervention_id, inventory_id, quantity, unit_price_cents, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.intervention_id.as_uuid())
        .bind(line.inventory_id.as_uuid())
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_material_line", e))?;
        Ok(())
    }

    async fn delete_material_lines(&mut self, id: InterventionId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM intervention_materials WHERE intervention_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_material_lines", e))?;
        Ok(result.rows_affected())
    }

    async fn adjust_inventory_quantity(
        &mut self,
        id: InventoryItemId,
        delta: i64,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE inventory SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(delta)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_inventory_quantity", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::constraint(format!(
                "inventory item {id} does not exist"
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}
