//! Persistence boundary.
//!
//! [`Store`] covers reads and the single-statement writes used by the CRUD
//! handlers. Anything that must change several tables together goes through a
//! [`UnitOfWork`] obtained from [`Store::begin`].

use async_trait::async_trait;
use chrono::NaiveDate;

use fieldops_auth::UserAccount;
use fieldops_clients::{Client, ClientFilter, ClientSummary};
use fieldops_core::{ClientId, InterventionId, InventoryItemId, UserId};
use fieldops_interventions::{
    Intervention, InterventionDetail, InterventionFilter, InterventionSummary, MaterialRecord,
    MonthlyRevenue, Statistics, TypeCount,
};
use fieldops_inventory::{InventoryFilter, InventoryItem};

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // users

    /// Fails with `Constraint` when the email is already registered.
    async fn insert_user(&self, user: &UserAccount) -> StoreResult<()>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>>;
    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>>;

    // clients

    /// Sorted by last name, then first name.
    async fn list_clients(&self, filter: &ClientFilter) -> StoreResult<Vec<ClientSummary>>;
    async fn get_client(&self, id: ClientId) -> StoreResult<Option<Client>>;
    async fn insert_client(&self, client: &Client) -> StoreResult<()>;
    /// `NotFound` when the row is gone.
    async fn update_client(&self, client: &Client) -> StoreResult<()>;
    /// `NotFound` when absent, `Constraint` while interventions reference it.
    async fn delete_client(&self, id: ClientId) -> StoreResult<()>;
    /// The client's interventions, most recent first.
    async fn client_interventions(&self, id: ClientId) -> StoreResult<Vec<Intervention>>;

    // inventory

    /// Sorted by name.
    async fn list_inventory(&self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>>;
    /// Low-stock items, lowest quantity first.
    async fn low_stock_items(&self) -> StoreResult<Vec<InventoryItem>>;
    async fn get_inventory_item(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>>;
    async fn insert_inventory_item(&self, item: &InventoryItem) -> StoreResult<()>;
    async fn update_inventory_item(&self, item: &InventoryItem) -> StoreResult<()>;
    /// `NotFound` when absent, `Constraint` while material lines reference it.
    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()>;

    // interventions (read side)

    async fn list_interventions(
        &self,
        filter: &InterventionFilter,
    ) -> StoreResult<Vec<InterventionSummary>>;
    async fn intervention_detail(&self, id: InterventionId)
    -> StoreResult<Option<InterventionDetail>>;

    // statistics

    async fn statistics(&self, today: NaiveDate) -> StoreResult<Statistics>;
    async fn monthly_revenue(&self, today: NaiveDate) -> StoreResult<Vec<MonthlyRevenue>>;
    async fn interventions_by_type(&self) -> StoreResult<Vec<TypeCount>>;

    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One all-or-nothing transaction over interventions, their material lines
/// and inventory quantities.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every change made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read the intervention and hold it against concurrent writers until the
    /// transaction ends.
    async fn lock_intervention(&mut self, id: InterventionId) -> StoreResult<Option<Intervention>>;

    /// `Constraint` when the client (or assigned user) does not exist.
    async fn insert_intervention(&mut self, intervention: &Intervention) -> StoreResult<()>;
    /// Returns `false` when no row matched.
    async fn update_intervention(&mut self, intervention: &Intervention) -> StoreResult<bool>;
    /// Returns `false` when no row matched. Material lines go with it.
    async fn delete_intervention(&mut self, id: InterventionId) -> StoreResult<bool>;

    async fn material_lines(&mut self, id: InterventionId) -> StoreResult<Vec<MaterialRecord>>;
    /// `Constraint` when the inventory item does not exist.
    async fn insert_material_line(&mut self, line: &MaterialRecord) -> StoreResult<()>;
    async fn delete_material_lines(&mut self, id: InterventionId) -> StoreResult<u64>;

    /// `quantity += delta`; `Constraint` when the item does not exist.
    async fn adjust_inventory_quantity(
        &mut self,
        id: InventoryItemId,
        delta: i64,
    ) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
