//! Intervention-material reconciliation.
//!
//! Keeps `inventory.quantity` equal to the initial stock minus the quantities
//! of every material line attached to a live intervention. Each entry point
//! runs in one [`UnitOfWork`]: either every row and quantity changes together
//! or nothing does.
//!
//! Material lists are full replacements. An update first gives back the stock
//! held by the old lines, then takes stock for the new ones; the two phases
//! never interleave. Within a phase, quantities are adjusted in ascending
//! inventory-id order so concurrent transactions lock item rows in the same
//! order.
//!
//! Stock is allowed to go negative.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use fieldops_core::{DomainError, InterventionId, InventoryItemId};
use fieldops_interventions::{
    Intervention, InterventionDraft, InterventionWithMaterials, MaterialLine, MaterialRecord,
};

use crate::error::StoreError;
use crate::store::{Store, UnitOfWork};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Rejected before any transaction was opened.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The intervention does not exist; nothing was changed.
    #[error("intervention not found")]
    NotFound,

    /// A transactional step failed; everything was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct InterventionReconciler<S: ?Sized = dyn Store> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for InterventionReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> InterventionReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert the intervention with its material lines and take the stock.
    #[instrument(skip_all, err)]
    pub async fn create(
        &self,
        draft: InterventionDraft,
        now: DateTime<Utc>,
    ) -> Result<InterventionWithMaterials, ReconcileError> {
        let fields = draft.validate()?;
        let intervention = Intervention::new(InterventionId::new(), &fields, now);

        let mut uow = self.store.begin().await?;
        let result = async {
            uow.insert_intervention(&intervention).await?;
            let materials = attach_lines(uow.as_mut(), intervention.id, &fields.materials, now).await?;
            Ok::<_, ReconcileError>(materials)
        }
        .await;

        let materials = finish(uow, result, intervention.id).await?;
        debug!(
            intervention_id = %intervention.id,
            lines = materials.len(),
            total_cost = %intervention.total_cost,
            "intervention created"
        );
        Ok(InterventionWithMaterials {
            intervention,
            materials,
        })
    }

    /// Replace the intervention's fields and material list.
    ///
    /// An empty or omitted list gives back all the stock the intervention held.
    #[instrument(skip_all, fields(intervention_id = %id), err)]
    pub async fn update(
        &self,
        id: InterventionId,
        draft: InterventionDraft,
        now: DateTime<Utc>,
    ) -> Result<InterventionWithMaterials, ReconcileError> {
        let fields = draft.validate()?;

        let mut uow = self.store.begin().await?;
        let result = async {
            let mut intervention = uow
                .lock_intervention(id)
                .await?
                .ok_or(ReconcileError::NotFound)?;

            release_lines(uow.as_mut(), id).await?;

            intervention.apply(&fields, now);
            let materials = attach_lines(uow.as_mut(), id, &fields.materials, now).await?;

            if !uow.update_intervention(&intervention).await? {
                return Err(ReconcileError::NotFound);
            }
            Ok::<_, ReconcileError>(InterventionWithMaterials {
                intervention,
                materials,
            })
        }
        .await;

        let updated = finish(uow, result, id).await?;
        debug!(
            lines = updated.materials.len(),
            total_cost = %updated.intervention.total_cost,
            "intervention updated"
        );
        Ok(updated)
    }

    /// Give back the stock held by the intervention and remove it.
    #[instrument(skip_all, fields(intervention_id = %id), err)]
    pub async fn delete(&self, id: InterventionId) -> Result<(), ReconcileError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            if uow.lock_intervention(id).await?.is_none() {
                return Err(ReconcileError::NotFound);
            }
            release_lines(uow.as_mut(), id).await?;
            if !uow.delete_intervention(id).await? {
                return Err(ReconcileError::NotFound);
            }
            Ok::<_, ReconcileError>(())
        }
        .await;

        finish(uow, result, id).await?;
        debug!("intervention deleted");
        Ok(())
    }
}

/// Net quantity change per item, in ascending item order.
///
/// A sum that does not fit in an `i64` is a constraint failure.
fn deltas<'a>(
    lines: impl IntoIterator<Item = &'a MaterialLine>,
    sign: i64,
) -> Result<BTreeMap<InventoryItemId, i64>, StoreError> {
    let mut out = BTreeMap::new();
    for line in lines {
        let total = out.entry(line.inventory_id).or_insert(0i64);
        let current = *total;
        *total = line
            .quantity
            .checked_mul(sign)
            .and_then(|q| current.checked_add(q))
            .ok_or_else(|| {
                StoreError::constraint(format!(
                    "quantity overflow for inventory item {}",
                    line.inventory_id
                ))
            })?;
    }
    Ok(out)
}

async fn apply_deltas(
    uow: &mut dyn UnitOfWork,
    deltas: BTreeMap<InventoryItemId, i64>,
) -> Result<(), StoreError> {
    for (item, delta) in deltas {
        if delta != 0 {
            uow.adjust_inventory_quantity(item, delta).await?;
        }
    }
    Ok(())
}

/// Restore stock for the current lines and delete them.
async fn release_lines(uow: &mut dyn UnitOfWork, id: InterventionId) -> Result<(), StoreError> {
    let old: Vec<MaterialLine> = uow
        .material_lines(id)
        .await?
        .iter()
        .map(MaterialRecord::line)
        .collect();
    apply_deltas(uow, deltas(&old, 1)?).await?;
    uow.delete_material_lines(id).await?;
    Ok(())
}

/// Insert the new lines and take their stock.
async fn attach_lines(
    uow: &mut dyn UnitOfWork,
    id: InterventionId,
    lines: &[MaterialLine],
    now: DateTime<Utc>,
) -> Result<Vec<MaterialRecord>, StoreError> {
    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        let record = MaterialRecord::new(id, line, now);
        uow.insert_material_line(&record).await?;
        records.push(record);
    }
    apply_deltas(uow, deltas(lines, -1)?).await?;
    Ok(records)
}

/// Commit on success; roll back and hand the error on otherwise.
async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, ReconcileError>,
    id: InterventionId,
) -> Result<T, ReconcileError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(intervention_id = %id, error = %err, "reconciliation rolled back");
            if let Err(rollback_err) = uow.rollback().await {
                warn!(intervention_id = %id, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::NaiveDate;
    use fieldops_clients::{Client, ClientDetails};
    use fieldops_core::{ClientId, Money};
    use fieldops_interventions::InterventionStatus;
    use fieldops_inventory::{InventoryItem, ItemDetails};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    struct Fixture {
        store: Arc<InMemoryStore>,
        reconciler: InterventionReconciler<InMemoryStore>,
        client: ClientId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            let fields = ClientDetails {
                first_name: Some("Léa".into()),
                last_name: Some("Martin".into()),
                phone: Some("0611223344".into()),
                address: Some("8 rue du Port".into()),
                ..ClientDetails::default()
            }
            .validate()
            .unwrap();
            let client = Client::new(ClientId::new(), fields, Utc::now());
            store.insert_client(&client).await.unwrap();
            Self {
                reconciler: InterventionReconciler::new(Arc::clone(&store)),
                store,
                client: client.id,
            }
        }

        async fn item(&self, quantity: i64) -> InventoryItemId {
            let fields = ItemDetails {
                name: Some(format!("item-{quantity}")),
                quantity: Some(quantity),
                ..ItemDetails::default()
            }
            .validate()
            .unwrap();
            let item = InventoryItem::new(InventoryItemId::new(), fields, Utc::now());
            self.store.insert_inventory_item(&item).await.unwrap();
            item.id
        }

        async fn quantity(&self, id: InventoryItemId) -> i64 {
            self.store
                .get_inventory_item(id)
                .await
                .unwrap()
                .unwrap()
                .quantity
        }

        fn draft(&self, labor: Value, materials: Value) -> InterventionDraft {
            serde_json::from_value(json!({
                "client_id": self.client.to_string(),
                "intervention_date": "2026-10-18",
                "type": "Fuite",
                "problem_description": "Robinet qui goutte",
                "labor_cost": labor,
                "materials": materials,
            }))
            .unwrap()
        }

        async fn line_count(&self, id: InterventionId) -> usize {
            self.store
                .intervention_detail(id)
                .await
                .unwrap()
                .map(|d| d.materials.len())
                .unwrap_or(0)
        }
    }

    #[tokio::test]
    async fn create_computes_costs_and_takes_stock() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let b = fx.item(10).await;

        let created = fx
            .reconciler
            .create(
                fx.draft(
                    json!(50),
                    json!([
                        { "inventory_id": a, "quantity": 2, "unit_price": 5 },
                        { "inventory_id": b, "quantity": 1, "unit_price": 20 }
                    ]),
                ),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(created.intervention.materials_cost, Money::from_major(30));
        assert_eq!(created.intervention.total_cost, Money::from_major(80));
        assert_eq!(created.intervention.status, InterventionStatus::Planned);
        assert_eq!(created.materials.len(), 2);
        assert_eq!(fx.quantity(a).await, 8);
        assert_eq!(fx.quantity(b).await, 9);
    }

    #[tokio::test]
    async fn create_with_unknown_item_changes_nothing() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;

        let err = fx
            .reconciler
            .create(
                fx.draft(
                    json!(null),
                    json!([
                        { "inventory_id": a, "quantity": 2 },
                        { "inventory_id": InventoryItemId::new(), "quantity": 1 }
                    ]),
                ),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Store(StoreError::Constraint(_))));
        assert_eq!(fx.quantity(a).await, 10);
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(fx.store.statistics(today).await.unwrap().total_interventions, 0);
    }

    #[tokio::test]
    async fn summed_line_quantities_that_overflow_roll_back() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;

        let err = fx
            .reconciler
            .create(
                fx.draft(
                    json!(null),
                    json!([
                        { "inventory_id": a, "quantity": i64::MAX },
                        { "inventory_id": a, "quantity": i64::MAX }
                    ]),
                ),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Store(StoreError::Constraint(_))));
        assert_eq!(fx.quantity(a).await, 10);
        assert_eq!(fx.store.list_interventions(&Default::default()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn stock_overflow_is_refused_and_later_reversal_restores_stock() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let huge = json!([{ "inventory_id": a, "quantity": i64::MAX - 5 }]);

        let first = fx
            .reconciler
            .create(fx.draft(json!(null), huge.clone()), Utc::now())
            .await
            .unwrap();
        let err = fx
            .reconciler
            .create(fx.draft(json!(null), huge), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Store(StoreError::Constraint(_))));
        assert_eq!(fx.quantity(a).await, 15 - i64::MAX);

        fx.reconciler.delete(first.intervention.id).await.unwrap();
        assert_eq!(fx.quantity(a).await, 10);
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_any_write() {
        let fx = Fixture::new().await;
        let err = fx
            .reconciler
            .create(InterventionDraft::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
    }

    #[tokio::test]
    async fn update_with_same_list_is_a_round_trip() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let materials = json!([{ "inventory_id": a, "quantity": 3, "unit_price": 10 }]);

        let created = fx
            .reconciler
            .create(fx.draft(json!(15), materials.clone()), Utc::now())
            .await
            .unwrap();
        let updated = fx
            .reconciler
            .update(
                created.intervention.id,
                fx.draft(json!(15), materials),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(fx.quantity(a).await, 7);
        assert_eq!(
            updated.intervention.materials_cost,
            created.intervention.materials_cost
        );
        assert_eq!(updated.intervention.total_cost, created.intervention.total_cost);
    }

    #[tokio::test]
    async fn update_with_empty_list_gives_back_all_stock() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let created = fx
            .reconciler
            .create(
                fx.draft(
                    json!(null),
                    json!([{ "inventory_id": a, "quantity": 3, "unit_price": 10 }]),
                ),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(fx.quantity(a).await, 7);

        let updated = fx
            .reconciler
            .update(created.intervention.id, fx.draft(json!(null), json!([])), Utc::now())
            .await
            .unwrap();

        assert_eq!(fx.quantity(a).await, 10);
        assert_eq!(updated.intervention.materials_cost, Money::ZERO);
        assert!(updated.materials.is_empty());
        assert_eq!(fx.line_count(created.intervention.id).await, 0);
    }

    #[tokio::test]
    async fn update_moves_stock_between_items() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let b = fx.item(10).await;
        let created = fx
            .reconciler
            .create(
                fx.draft(json!(null), json!([{ "inventory_id": a, "quantity": 4 }])),
                Utc::now(),
            )
            .await
            .unwrap();

        fx.reconciler
            .update(
                created.intervention.id,
                fx.draft(
                    json!(null),
                    json!([
                        { "inventory_id": a, "quantity": 1 },
                        { "inventory_id": b, "quantity": 5 }
                    ]),
                ),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(fx.quantity(a).await, 9);
        assert_eq!(fx.quantity(b).await, 5);
    }

    #[tokio::test]
    async fn update_keeps_status_when_absent() {
        let fx = Fixture::new().await;
        let mut draft = fx.draft(json!(null), json!([]));
        draft.status = Some("in_progress".into());
        let created = fx.reconciler.create(draft, Utc::now()).await.unwrap();

        let updated = fx
            .reconciler
            .update(created.intervention.id, fx.draft(json!(null), json!([])), Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.intervention.status, InterventionStatus::InProgress);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_intervention_change_nothing() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let existing = fx
            .reconciler
            .create(
                fx.draft(json!(null), json!([{ "inventory_id": a, "quantity": 2 }])),
                Utc::now(),
            )
            .await
            .unwrap();

        let missing = InterventionId::new();
        let err = fx
            .reconciler
            .update(
                missing,
                fx.draft(json!(null), json!([{ "inventory_id": a, "quantity": 5 }])),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::NotFound);

        let err = fx.reconciler.delete(missing).await.unwrap_err();
        assert_eq!(err, ReconcileError::NotFound);

        assert_eq!(fx.quantity(a).await, 8);
        assert_eq!(fx.line_count(existing.intervention.id).await, 1);
    }

    #[tokio::test]
    async fn failed_update_keeps_the_old_lines() {
        let fx = Fixture::new().await;
        let a = fx.item(10).await;
        let created = fx
            .reconciler
            .create(
                fx.draft(json!(null), json!([{ "inventory_id": a, "quantity": 2 }])),
                Utc::now(),
            )
            .await
            .unwrap();

        let err = fx
            .reconciler
            .update(
                created.intervention.id,
                fx.draft(
                    json!(null),
                    json!([{ "inventory_id": InventoryItemId::new(), "quantity": 1 }]),
                ),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Store(StoreError::Constraint(_))));
        assert_eq!(fx.quantity(a).await, 8);
        assert_eq!(fx.line_count(created.intervention.id).await, 1);
    }

    #[tokio::test]
    async fn delete_gives_back_stock() {
        let fx = Fixture::new().await;
        let b = fx.item(1).await;
        let created = fx
            .reconciler
            .create(
                fx.draft(json!(null), json!([{ "inventory_id": b, "quantity": 4 }])),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(fx.quantity(b).await, -3);

        fx.reconciler.delete(created.intervention.id).await.unwrap();

        assert_eq!(fx.quantity(b).await, 1);
        assert!(fx
            .store
            .intervention_detail(created.intervention.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_do_not_lose_updates() {
        let fx = Fixture::new().await;
        let a = fx.item(100).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let reconciler = fx.reconciler.clone();
            let draft = fx.draft(json!(null), json!([{ "inventory_id": a, "quantity": 2 }]));
            handles.push(tokio::spawn(async move {
                reconciler.create(draft, Utc::now()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fx.quantity(a).await, 60);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create(Vec<(usize, i64)>),
        Update(usize, Vec<(usize, i64)>),
        Delete(usize),
    }

    fn lines() -> impl Strategy<Value = Vec<(usize, i64)>> {
        proptest::collection::vec((0usize..3, 1i64..6), 0..4)
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            lines().prop_map(Op::Create),
            (0usize..8, lines()).prop_map(|(i, l)| Op::Update(i, l)),
            (0usize..8).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 48,
            ..ProptestConfig::default()
        })]

        #[test]
        fn stock_always_matches_attached_lines(ops in proptest::collection::vec(op(), 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async move {
                let fx = Fixture::new().await;
                let initial = [20i64, 5, 0];
                let mut items = Vec::new();
                for q in initial {
                    items.push(fx.item(q).await);
                }
                let mut live: Vec<InterventionId> = Vec::new();

                let materials = |wanted: &[(usize, i64)]| {
                    Value::Array(
                        wanted.iter()
                            .map(|(i, q)| json!({ "inventory_id": items[*i], "quantity": q, "unit_price": 1 }))
                            .collect(),
                    )
                };

                for op in ops {
                    match op {
                        Op::Create(wanted) => {
                            let created = fx
                                .reconciler
                                .create(fx.draft(json!(null), materials(&wanted)), Utc::now())
                                .await
                                .unwrap();
                            live.push(created.intervention.id);
                        }
                        Op::Update(idx, wanted) => {
                            let target = live.get(idx).copied().unwrap_or_else(InterventionId::new);
                            let res = fx
                                .reconciler
                                .update(target, fx.draft(json!(null), materials(&wanted)), Utc::now())
                                .await;
                            assert_eq!(res.is_ok(), live.contains(&target));
                        }
                        Op::Delete(idx) => {
                            let target = live.get(idx).copied().unwrap_or_else(InterventionId::new);
                            let res = fx.reconciler.delete(target).await;
                            assert_eq!(res.is_ok(), live.contains(&target));
                            live.retain(|id| *id != target);
                        }
                    }

                    let mut used = [0i64; 3];
                    for id in &live {
                        let detail = fx.store.intervention_detail(*id).await.unwrap().unwrap();
                        for m in detail.materials {
                            let slot = items.iter().position(|it| *it == m.record.inventory_id).unwrap();
                            used[slot] += m.record.quantity;
                        }
                    }
                    for (slot, id) in items.iter().enumerate() {
                        assert_eq!(fx.quantity(*id).await, initial[slot] - used[slot]);
                    }
                }
            });
        }
    }
}
