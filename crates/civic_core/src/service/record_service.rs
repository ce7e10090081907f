//! Record use-case service.
//!
//! # Responsibility
//! - Create, update and delete resources, alerts and people, plus edit the
//!   community record.
//! - Step resource quantities while preserving their unit text.
//!
//! # Invariants
//! - Ids are assigned here and never rewritten afterwards.
//! - New resources and people append; new alerts prepend.
//! - Deleting a resource or person, or removing a resource whose quantity
//!   reached zero, only happens after the caller's confirmation callback
//!   agrees. Declining leaves the document unchanged, except that a
//!   declined zero-quantity removal clamps the quantity to zero.
//! - Missing targets and malformed quantities are reported as values and
//!   never touch the document.

use crate::model::alert::{Alert, NewAlert};
use crate::model::document::{CommunityInfoPatch, Document};
use crate::model::person::{NewPerson, Person, PersonPatch};
use crate::model::resource::{NewResource, Resource, ResourcePatch};
use crate::model::{new_record_id, now_epoch_ms, RecordId};
use crate::repo::kv_repo::KvRepository;
use crate::service::state_store::StateStore;
use log::warn;
use serde_json::Map;

/// Where new records land in their collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Append,
    /// Newest first.
    Prepend,
}

/// How the renderer points at a record: by stable id or by display index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef<'a> {
    Id(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for RecordRef<'a> {
    fn from(value: &'a str) -> Self {
        Self::Id(value)
    }
}

impl<'a> From<&'a String> for RecordRef<'a> {
    fn from(value: &'a String) -> Self {
        Self::Id(value.as_str())
    }
}

impl From<usize> for RecordRef<'_> {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Question put to the user before a destructive change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub collection: &'static str,
    pub id: RecordId,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(RecordId),
    /// Confirmation refused; nothing changed.
    Declined,
    NotFound,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

/// One `+`/`-` press on a resource quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityStep {
    Decrement,
    Increment,
}

impl QuantityStep {
    pub fn delta(self) -> f64 {
        match self {
            Self::Decrement => -1.0,
            Self::Increment => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// Quantity rewritten and persisted.
    Adjusted { id: RecordId, quantity: String },
    /// Step would reach zero or below; nothing changed. Settle with
    /// [`RecordService::settle_removal`].
    RemovalCandidate { id: RecordId, quantity: String },
    /// Removal confirmed; the resource is gone.
    Removed { id: RecordId },
    /// Removal declined; quantity clamped to zero.
    Clamped { id: RecordId, quantity: String },
    NotFound,
    /// Quantity text does not lead with a number; nothing changed.
    Malformed { id: RecordId },
    /// Settling asked for a resource that one decrement would not empty;
    /// nothing changed.
    NotACandidate { id: RecordId, quantity: String },
}

/// Accessors binding the generic operations to one document collection.
pub trait RecordCollection {
    type Record;
    type Draft;

    /// Collection name used in logs and prompts.
    const NAME: &'static str;
    const PLACEMENT: Placement;
    /// `Some` when deletion needs confirmation.
    const DELETE_PROMPT: Option<&'static str>;

    fn records(doc: &Document) -> &Vec<Self::Record>;
    fn records_mut(doc: &mut Document) -> &mut Vec<Self::Record>;
    fn record_id(record: &Self::Record) -> &str;
    fn build(id: RecordId, draft: Self::Draft) -> Self::Record;
}

/// Collections whose records may be edited in place.
pub trait EditableCollection: RecordCollection {
    type Patch;

    fn apply_patch(record: &mut Self::Record, patch: Self::Patch);
}

pub struct Resources;
pub struct Alerts;
pub struct People;

impl RecordCollection for Resources {
    type Record = Resource;
    type Draft = NewResource;

    const NAME: &'static str = "resources";
    const PLACEMENT: Placement = Placement::Append;
    const DELETE_PROMPT: Option<&'static str> = Some("Remove this item?");

    fn records(doc: &Document) -> &Vec<Resource> {
        &doc.resources
    }

    fn records_mut(doc: &mut Document) -> &mut Vec<Resource> {
        &mut doc.resources
    }

    fn record_id(record: &Resource) -> &str {
        &record.id
    }

    fn build(id: RecordId, draft: NewResource) -> Resource {
        Resource {
            id,
            kind: draft.kind,
            location: draft.location,
            quantity: draft.quantity,
            status: draft.status,
            extra: Map::new(),
        }
    }
}

impl EditableCollection for Resources {
    type Patch = ResourcePatch;

    fn apply_patch(record: &mut Resource, patch: ResourcePatch) {
        patch.apply(record);
    }
}

impl RecordCollection for Alerts {
    type Record = Alert;
    type Draft = NewAlert;

    const NAME: &'static str = "alerts";
    const PLACEMENT: Placement = Placement::Prepend;
    const DELETE_PROMPT: Option<&'static str> = None;

    fn records(doc: &Document) -> &Vec<Alert> {
        &doc.alerts
    }

    fn records_mut(doc: &mut Document) -> &mut Vec<Alert> {
        &mut doc.alerts
    }

    fn record_id(record: &Alert) -> &str {
        &record.id
    }

    fn build(id: RecordId, draft: NewAlert) -> Alert {
        Alert {
            id,
            message: draft.message,
            severity: draft.severity,
            timestamp: now_epoch_ms(),
            extra: Map::new(),
        }
    }
}

impl RecordCollection for People {
    type Record = Person;
    type Draft = NewPerson;

    const NAME: &'static str = "people";
    const PLACEMENT: Placement = Placement::Append;
    const DELETE_PROMPT: Option<&'static str> = Some("Remove this resident from the census?");

    fn records(doc: &Document) -> &Vec<Person> {
        &doc.people
    }

    fn records_mut(doc: &mut Document) -> &mut Vec<Person> {
        &mut doc.people
    }

    fn record_id(record: &Person) -> &str {
        &record.id
    }

    fn build(id: RecordId, draft: NewPerson) -> Person {
        Person {
            id,
            name: draft.name,
            age: draft.age,
            gender: draft.gender,
            skill: draft.skill,
            health: draft.health,
            contact: draft.contact,
            extra: Map::new(),
        }
    }
}

impl EditableCollection for People {
    type Patch = PersonPatch;

    fn apply_patch(record: &mut Person, patch: PersonPatch) {
        patch.apply(record);
    }
}

/// Record operations over one store.
pub struct RecordService<'store, R: KvRepository> {
    store: &'store mut StateStore<R>,
}

impl<'store, R: KvRepository> RecordService<'store, R> {
    pub fn new(store: &'store mut StateStore<R>) -> Self {
        Self { store }
    }

    /// Looks a record up by id or display index.
    pub fn get<C: RecordCollection>(&self, target: RecordRef<'_>) -> Option<&C::Record> {
        let index = self.position::<C>(target)?;
        C::records(self.store.document()).get(index)
    }

    /// Adds a record with a fresh id and returns that id.
    pub fn create<C: RecordCollection>(&mut self, draft: C::Draft) -> RecordId {
        let id = new_record_id();
        let record = C::build(id.clone(), draft);
        self.store.mutate("create", move |doc| {
            let records = C::records_mut(doc);
            match C::PLACEMENT {
                Placement::Append => records.push(record),
                Placement::Prepend => records.insert(0, record),
            }
            Some(())
        });
        id
    }

    /// Overwrites only the fields present in `patch`. Returns `false` when
    /// the target does not exist.
    pub fn update<C: EditableCollection>(&mut self, target: RecordRef<'_>, patch: C::Patch) -> bool {
        let Some(index) = self.position::<C>(target) else {
            return false;
        };
        self.store
            .mutate("update", move |doc| {
                let record = C::records_mut(doc).get_mut(index)?;
                C::apply_patch(record, patch);
                Some(())
            })
            .is_some()
    }

    /// Removes a record, asking `confirm` first when the collection requires
    /// it.
    pub fn delete<C: RecordCollection>(
        &mut self,
        target: RecordRef<'_>,
        confirm: impl FnOnce(&ConfirmPrompt) -> bool,
    ) -> DeleteOutcome {
        let Some(index) = self.position::<C>(target) else {
            return DeleteOutcome::NotFound;
        };
        let id = C::record_id(&C::records(self.store.document())[index]).to_string();

        if let Some(message) = C::DELETE_PROMPT {
            let prompt = ConfirmPrompt {
                collection: C::NAME,
                id: id.clone(),
                message,
            };
            if !confirm(&prompt) {
                return DeleteOutcome::Declined;
            }
        }

        self.remove_at::<C>(index);
        DeleteOutcome::Deleted(id)
    }

    pub fn create_resource(&mut self, draft: NewResource) -> RecordId {
        self.create::<Resources>(draft)
    }

    pub fn update_resource(&mut self, id: &str, patch: ResourcePatch) -> bool {
        self.update::<Resources>(RecordRef::Id(id), patch)
    }

    pub fn delete_resource(
        &mut self,
        target: RecordRef<'_>,
        confirm: impl FnOnce(&ConfirmPrompt) -> bool,
    ) -> DeleteOutcome {
        self.delete::<Resources>(target, confirm)
    }

    /// Raises an alert at the top of the list.
    pub fn create_alert(&mut self, draft: NewAlert) -> RecordId {
        self.create::<Alerts>(draft)
    }

    /// Dismisses an alert. No confirmation is involved.
    pub fn dismiss_alert(&mut self, target: RecordRef<'_>) -> bool {
        self.delete::<Alerts>(target, |_| true).is_deleted()
    }

    pub fn create_person(&mut self, draft: NewPerson) -> RecordId {
        self.create::<People>(draft)
    }

    pub fn update_person(&mut self, id: &str, patch: PersonPatch) -> bool {
        self.update::<People>(RecordRef::Id(id), patch)
    }

    pub fn delete_person(
        &mut self,
        target: RecordRef<'_>,
        confirm: impl FnOnce(&ConfirmPrompt) -> bool,
    ) -> DeleteOutcome {
        self.delete::<People>(target, confirm)
    }

    pub fn update_community_info(&mut self, patch: CommunityInfoPatch) {
        self.store.mutate("update_community_info", move |doc| {
            patch.apply(&mut doc.community_info);
            Some(())
        });
    }

    /// Moves a resource quantity one unit up or down.
    ///
    /// The result is rounded to two decimals and keeps the unit suffix. A
    /// step landing on zero or below changes nothing and reports
    /// `RemovalCandidate`.
    pub fn adjust_quantity(&mut self, target: RecordRef<'_>, step: QuantityStep) -> QuantityOutcome {
        let Some(index) = self.position::<Resources>(target) else {
            return QuantityOutcome::NotFound;
        };
        let resource = &self.store.document().resources[index];
        let id = resource.id.clone();
        let Some(current) = resource.parsed_quantity() else {
            warn!("event=adjust_quantity module=records status=malformed id={id}");
            return QuantityOutcome::Malformed { id };
        };

        let next = current.offset(step.delta());
        if next.value <= 0.0 {
            return QuantityOutcome::RemovalCandidate {
                id,
                quantity: resource.quantity.clone(),
            };
        }

        let quantity = next.to_string();
        self.set_quantity(index, quantity.clone());
        QuantityOutcome::Adjusted { id, quantity }
    }

    /// Resolves a `RemovalCandidate`: removes the resource when `confirmed`,
    /// otherwise clamps its quantity to zero.
    ///
    /// The candidate condition is checked again here; a resource one
    /// decrement would not empty is left alone and reported as
    /// `NotACandidate`.
    pub fn settle_removal(&mut self, target: RecordRef<'_>, confirmed: bool) -> QuantityOutcome {
        let Some(index) = self.position::<Resources>(target) else {
            return QuantityOutcome::NotFound;
        };
        let resource = &self.store.document().resources[index];
        let id = resource.id.clone();

        let Some(current) = resource.parsed_quantity() else {
            warn!("event=settle_removal module=records status=malformed id={id}");
            return QuantityOutcome::Malformed { id };
        };
        if current.offset(QuantityStep::Decrement.delta()).value > 0.0 {
            warn!("event=settle_removal module=records status=not_candidate id={id}");
            return QuantityOutcome::NotACandidate {
                id,
                quantity: resource.quantity.clone(),
            };
        }

        if confirmed {
            self.remove_at::<Resources>(index);
            return QuantityOutcome::Removed { id };
        }

        let quantity = current.zeroed().to_string();
        self.set_quantity(index, quantity.clone());
        QuantityOutcome::Clamped { id, quantity }
    }

    /// `adjust_quantity` followed, when needed, by a confirmation prompt and
    /// `settle_removal`.
    pub fn adjust_quantity_confirmed(
        &mut self,
        target: RecordRef<'_>,
        step: QuantityStep,
        confirm: impl FnOnce(&ConfirmPrompt) -> bool,
    ) -> QuantityOutcome {
        match self.adjust_quantity(target, step) {
            QuantityOutcome::RemovalCandidate { id, .. } => {
                let prompt = ConfirmPrompt {
                    collection: Resources::NAME,
                    id: id.clone(),
                    message: Resources::DELETE_PROMPT.unwrap_or("Remove this item?"),
                };
                let confirmed = confirm(&prompt);
                self.settle_removal(RecordRef::Id(&id), confirmed)
            }
            other => other,
        }
    }

    fn set_quantity(&mut self, index: usize, quantity: String) {
        self.store.mutate("adjust_quantity", move |doc| {
            doc.resources.get_mut(index)?.quantity = quantity;
            Some(())
        });
    }

    fn remove_at<C: RecordCollection>(&mut self, index: usize) {
        self.store.mutate("delete", move |doc| {
            let records = C::records_mut(doc);
            (index < records.len()).then(|| {
                records.remove(index);
            })
        });
    }

    fn position<C: RecordCollection>(&self, target: RecordRef<'_>) -> Option<usize> {
        let records = C::records(self.store.document());
        let found = match target {
            RecordRef::Index(index) => (index < records.len()).then_some(index),
            RecordRef::Id(id) => records.iter().position(|r| C::record_id(r) == id),
        };
        if found.is_none() {
            warn!(
                "event=record_lookup module=records status=not_found collection={}",
                C::NAME
            );
        }
        found
    }
}
