//! In-memory store for tests and local development.
//!
//! All tables live behind one async mutex. A unit of work takes the lock for
//! its whole lifetime and edits a private copy of the tables, which replaces
//! the shared state only on commit. Transactions are therefore serialised, and
//! an abandoned one leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use fieldops_auth::UserAccount;
use fieldops_clients::{directory_order, Client, ClientFilter, ClientSummary};
use fieldops_core::{ClientId, InterventionId, InventoryItemId, UserId};
use fieldops_interventions::{
    interventions_by_type, listing_order, monthly_revenue, summarize, Assignee, Intervention,
    InterventionDetail, InterventionFilter, InterventionSummary, MaterialDetail, MaterialRecord,
    MonthlyRevenue, Statistics, TypeCount,
};
use fieldops_inventory::{InventoryFilter, InventoryItem};

use super::{Store, StoreResult, UnitOfWork};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, UserAccount>,
    clients: BTreeMap<ClientId, Client>,
    inventory: BTreeMap<InventoryItemId, InventoryItem>,
    interventions: BTreeMap<InterventionId, Intervention>,
    materials: Vec<MaterialRecord>,
}

impl Tables {
    fn assignee(&self, id: Option<UserId>) -> Option<Assignee> {
        let user = self.users.get(&id?)?;
        Some(Assignee {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        })
    }

    fn low_stock_count(&self) -> i64 {
        self.inventory.values().filter(|i| i.is_low_stock()).count() as i64
    }

    fn all_interventions(&self) -> Vec<Intervention> {
        self.interventions.values().cloned().collect()
    }

    fn check_intervention_refs(&self, intervention: &Intervention) -> StoreResult<()> {
        if !self.clients.contains_key(&intervention.client_id) {
            return Err(StoreError::constraint(format!(
                "client {} does not exist",
                intervention.client_id
            )));
        }
        if let Some(user) = intervention.assigned_to {
            if !self.users.contains_key(&user) {
                return Err(StoreError::constraint(format!("user {user} does not exist")));
            }
        }
        Ok(())
    }
}

/// Process-local [`Store`]; cheap to clone, clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_user(&self, user: &UserAccount) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::constraint(format!(
                "email {} is already registered",
                user.email
            )));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn list_clients(&self, filter: &ClientFilter) -> StoreResult<Vec<ClientSummary>> {
        let t = self.tables.lock().await;
        let mut clients: Vec<&Client> = t.clients.values().filter(|c| filter.matches(c)).collect();
        clients.sort_by(|a, b| directory_order(a, b));
        Ok(clients
            .into_iter()
            .map(|client| ClientSummary {
                client: client.clone(),
                intervention_count: t
                    .interventions
                    .values()
                    .filter(|i| i.client_id == client.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn get_client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        Ok(self.tables.lock().await.clients.get(&id).cloned())
    }

    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .clients
            .insert(client.id, client.clone());
        Ok(())
    }

    async fn update_client(&self, client: &Client) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let slot = t.clients.get_mut(&client.id).ok_or(StoreError::NotFound)?;
        *slot = client.clone();
        Ok(())
    }

    async fn delete_client(&self, id: ClientId) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.clients.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if t.interventions.values().any(|i| i.client_id == id) {
            return Err(StoreError::constraint(format!(
                "client {id} still has interventions"
            )));
        }
        t.clients.remove(&id);
        Ok(())
    }

    async fn client_interventions(&self, id: ClientId) -> StoreResult<Vec<Intervention>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Intervention> = t
            .interventions
            .values()
            .filter(|i| i.client_id == id)
            .cloned()
            .collect();
        rows.sort_by(listing_order);
        Ok(rows)
    }

    async fn list_inventory(&self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
        let t = self.tables.lock().await;
        let mut items: Vec<InventoryItem> = t
            .inventory
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn low_stock_items(&self) -> StoreResult<Vec<InventoryItem>> {
        let t = self.tables.lock().await;
        let mut items: Vec<InventoryItem> = t
            .inventory
            .values()
            .filter(|i| i.is_low_stock())
            .cloned()
            .collect();
        items.sort_by_key(|i| i.quantity);
        Ok(items)
    }

    async fn get_inventory_item(&self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        Ok(self.tables.lock().await.inventory.get(&id).cloned())
    }

    async fn insert_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .inventory
            .insert(item.id, item.clone());
        Ok(())
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        let slot = t.inventory.get_mut(&item.id).ok_or(StoreError::NotFound)?;
        *slot = item.clone();
        Ok(())
    }

    async fn delete_inventory_item(&self, id: InventoryItemId) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        if !t.inventory.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if t.materials.iter().any(|m| m.inventory_id == id) {
            return Err(StoreError::constraint(format!(
                "inventory item {id} is used by interventions"
            )));
        }
        t.inventory.remove(&id);
        Ok(())
    }

    async fn list_interventions(
        &self,
        filter: &InterventionFilter,
    ) -> StoreResult<Vec<InterventionSummary>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<&Intervention> = t
            .interventions
            .values()
            .filter(|i| filter.matches(i))
            .collect();
        rows.sort_by(|a, b| listing_order(a, b));
        rows.into_iter()
            .map(|i| {
                let client = t.clients.get(&i.client_id).ok_or_else(|| {
                    StoreError::decode(format!("intervention {} has no client", i.id))
                })?;
                let plumber = t.assignee(i.assigned_to);
                Ok(InterventionSummary::new(i.clone(), client, plumber.as_ref()))
            })
            .collect()
    }

    async fn intervention_detail(
        &self,
        id: InterventionId,
    ) -> StoreResult<Option<InterventionDetail>> {
        let t = self.tables.lock().await;
        let Some(intervention) = t.interventions.get(&id) else {
            return Ok(None);
        };
        let client = t
            .clients
            .get(&intervention.client_id)
            .cloned()
            .ok_or_else(|| StoreError::decode(format!("intervention {id} has no client")))?;
        let materials = t
            .materials
            .iter()
            .filter(|m| m.intervention_id == id)
            .map(|m| {
                let item = t.inventory.get(&m.inventory_id).ok_or_else(|| {
                    StoreError::decode(format!("material line {} has no item", m.id))
                })?;
                Ok(MaterialDetail {
                    record: m.clone(),
                    name: item.name.clone(),
                    reference: item.reference.clone(),
                    item_unit_price: item.unit_price,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(InterventionDetail {
            plumber: t.assignee(intervention.assigned_to),
            intervention: intervention.clone(),
            client,
            materials,
        }))
    }

    async fn statistics(&self, today: NaiveDate) -> StoreResult<Statistics> {
        let t = self.tables.lock().await;
        Ok(summarize(&t.all_interventions(), t.low_stock_count(), today))
    }

    async fn monthly_revenue(&self, today: NaiveDate) -> StoreResult<Vec<MonthlyRevenue>> {
        let t = self.tables.lock().await;
        Ok(monthly_revenue(&t.all_interventions(), today))
    }

    async fn interventions_by_type(&self) -> StoreResult<Vec<TypeCount>> {
        let t = self.tables.lock().await;
        Ok(interventions_by_type(&t.all_interventions()))
    }

    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_intervention(&mut self, id: InterventionId) -> StoreResult<Option<Intervention>> {
        Ok(self.staged.interventions.get(&id).cloned())
    }

    async fn insert_intervention(&mut self, intervention: &Intervention) -> StoreResult<()> {
        self.staged.check_intervention_refs(intervention)?;
        if self.staged.interventions.contains_key(&intervention.id) {
            return Err(StoreError::constraint(format!(
                "intervention {} already exists",
                intervention.id
            )));
        }
        self.staged
            .interventions
            .insert(intervention.id, intervention.clone());
        Ok(())
    }

    async fn update_intervention(&mut self, intervention: &Intervention) -> StoreResult<bool> {
        if !self.staged.interventions.contains_key(&intervention.id) {
            return Ok(false);
        }
        self.staged.check_intervention_refs(intervention)?;
        self.staged
            .interventions
            .insert(intervention.id, intervention.clone());
        Ok(true)
    }

    async fn delete_intervention(&mut self, id: InterventionId) -> StoreResult<bool> {
        let existed = self.staged.interventions.remove(&id).is_some();
        if existed {
            self.staged.materials.retain(|m| m.intervention_id != id);
        }
        Ok(existed)
    }

    async fn material_lines(&mut self, id: InterventionId) -> StoreResult<Vec<MaterialRecord>> {
        Ok(self
            .staged
            .materials
            .iter()
            .filter(|m| m.intervention_id == id)
            .cloned()
            .collect())
    }

    async fn insert_material_line(&mut self, line: &MaterialRecord) -> StoreResult<()> {
        if !self.staged.interventions.contains_key(&line.intervention_id) {
            return Err(StoreError::constraint(format!(
                "intervention {} does not exist",
                line.intervention_id
            )));
        }
        if !self.staged.inventory.contains_key(&line.inventory_id) {
            return Err(StoreError::constraint(format!(
                "inventory item {} does not exist",
                line.inventory_id
            )));
        }
        self.staged.materials.push(line.clone());
        Ok(())
    }

    async fn delete_material_lines(&mut self, id: InterventionId) -> StoreResult<u64> {
        let before = self.staged.materials.len();
        self.staged.materials.retain(|m| m.intervention_id != id);
        Ok((before - self.staged.materials.len()) as u64)
    }

    async fn adjust_inventory_quantity(
        &mut self,
        id: InventoryItemId,
        delta: i64,
    ) -> StoreResult<()> {
        let item = self
            .staged
            .inventory
            .get_mut(&id)
            .ok_or_else(|| StoreError::constraint(format!("inventory item {id} does not exist")))?;
        item.adjust(delta, Utc::now())
            .map_err(|e| StoreError::constraint(e.to_string()))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_clients::ClientDetails;
    use fieldops_inventory::ItemDetails;

    fn client() -> Client {
        let fields = ClientDetails {
            first_name: Some("Ana".into()),
            last_name: Some("Lopez".into()),
            phone: Some("0600000000".into()),
            address: Some("3 quai Ouest".into()),
            ..ClientDetails::default()
        }
        .validate()
        .unwrap();
        Client::new(ClientId::new(), fields, Utc::now())
    }

    fn item(quantity: i64) -> InventoryItem {
        let fields = ItemDetails {
            name: Some("Siphon".into()),
            quantity: Some(quantity),
            ..ItemDetails::default()
        }
        .validate()
        .unwrap();
        InventoryItem::new(InventoryItemId::new(), fields, Utc::now())
    }

    #[tokio::test]
    async fn dropped_unit_of_work_discards_changes() {
        let store = InMemoryStore::new();
        let it = item(10);
        store.insert_inventory_item(&it).await.unwrap();

        {
            let mut uow = store.begin().await.unwrap();
            uow.adjust_inventory_quantity(it.id, -4).await.unwrap();
        }

        let after = store.get_inventory_item(it.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 10);
    }

    #[tokio::test]
    async fn committed_unit_of_work_is_visible() {
        let store = InMemoryStore::new();
        let it = item(10);
        store.insert_inventory_item(&it).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.adjust_inventory_quantity(it.id, -4).await.unwrap();
        uow.commit().await.unwrap();

        let after = store.get_inventory_item(it.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 6);
    }

    #[tokio::test]
    async fn adjusting_unknown_item_is_a_constraint_error() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow
            .adjust_inventory_quantity(InventoryItemId::new(), -1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn overflowing_adjustment_is_a_constraint_error() {
        let store = InMemoryStore::new();
        let it = item(10);
        store.insert_inventory_item(&it).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .adjust_inventory_quantity(it.id, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        uow.rollback().await.unwrap();

        let after = store.get_inventory_item(it.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 10);
    }

    #[tokio::test]
    async fn client_delete_is_not_found_when_absent() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.delete_client(ClientId::new()).await,
            Err(StoreError::NotFound)
        );
        let c = client();
        store.insert_client(&c).await.unwrap();
        store.delete_client(c.id).await.unwrap();
        assert!(store.get_client(c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn low_stock_is_sorted_by_quantity() {
        let store = InMemoryStore::new();
        for q in [4, 1, 50, 3] {
            store.insert_inventory_item(&item(q)).await.unwrap();
        }
        let low: Vec<i64> = store
            .low_stock_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.quantity)
            .collect();
        assert_eq!(low, vec![1, 3, 4]);
    }
}
