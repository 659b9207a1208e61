// ============================================================================
// ENTITY LIST VIEWMODEL - Optimistic CRUD over one settings collection
// ============================================================================
// One generic view model serves departments, designations, work locations and
// salary components. Local state changes first; the server call follows and
// either confirms the change or the snapshot taken beforehand is restored.
// ============================================================================

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::errors::ApiError;
use crate::models::entity::{Entity, Toggleable};
use crate::models::salary_component::{ComponentType, SalaryComponent};
use crate::models::{Department, Designation, WorkLocation};
use crate::services::api_client::ApiClient;
use crate::services::employee_directory::EmployeeDirectory;
use crate::services::mutation_queue::{MutationPermit, MutationQueue};
use crate::state::reactivity::{ReactiveState, SubscriptionId};
use crate::utils::constants::PROVISIONAL_ID_PREFIX;

pub type DepartmentsViewModel = EntityListViewModel<Department>;
pub type DesignationsViewModel = EntityListViewModel<Designation>;
pub type WorkLocationsViewModel = EntityListViewModel<WorkLocation>;
pub type SalaryComponentsViewModel = EntityListViewModel<SalaryComponent>;

/// What the view renders
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<E> {
    pub items: Vec<E>,
    pub loading: bool,
    pub error: Option<String>,
    // provisional id -> server id, so callers holding the old id still hit the entity
    aliases: HashMap<String, String>,
    // optimistic changes not yet confirmed; re-applied on top of every fetch
    pending: Vec<PendingMutation<E>>,
    // set by every fetch start; only the latest fetch owns `loading`
    fetch_generation: u64,
    // bumped by confirmed mutations; a fetch that saw it move is dropped
    revision: u64,
}

impl<E> Default for ListState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            aliases: HashMap::new(),
            pending: Vec::new(),
            fetch_generation: 0,
            revision: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingMutation<E> {
    ticket: u64,
    upserts: Vec<E>,
    removals: Vec<String>,
}

/// Pre-images of everything one optimistic change touched
#[derive(Debug)]
struct Snapshot<E> {
    ticket: u64,
    changed: Vec<E>,
    removed: Vec<(usize, E)>,
    inserted: Vec<String>,
}

#[derive(Clone)]
pub struct EntityListViewModel<E: Entity> {
    api: ApiClient,
    employees: EmployeeDirectory,
    state: Rc<ReactiveState<ListState<E>>>,
    queue: MutationQueue,
    alive: Rc<Cell<bool>>,
    sequence: Rc<Cell<u64>>,
}

impl<E: Entity> EntityListViewModel<E> {
    pub fn new(api: ApiClient, employees: EmployeeDirectory) -> Self {
        Self {
            api,
            employees,
            state: Rc::new(ReactiveState::new(ListState::default())),
            queue: MutationQueue::new(),
            alive: Rc::new(Cell::new(true)),
            sequence: Rc::new(Cell::new(0)),
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Last fetch plus pending optimistic changes, in fetch order with creations appended
    pub fn list(&self) -> Vec<E> {
        self.state.with(|state| state.items.clone())
    }

    pub fn snapshot(&self) -> ListState<E> {
        self.state.get()
    }

    pub fn get(&self, id: &str) -> Option<E> {
        let id = self.resolve(id);
        self.state
            .with(|state| state.items.iter().find(|item| item.id() == id).cloned())
    }

    /// Case-insensitive substring match; an empty query returns everything
    pub fn search(&self, query: &str) -> Vec<E> {
        let needle = query.trim().to_lowercase();
        self.state.with(|state| {
            state
                .items
                .iter()
                .filter(|item| needle.is_empty() || item.search_text().contains(&needle))
                .cloned()
                .collect()
        })
    }

    pub fn error(&self) -> Option<String> {
        self.state.with(|state| state.error.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state.with(|state| state.loading)
    }

    pub fn clear_error(&self) {
        if self.error().is_some() {
            self.state.update(|state| state.error = None);
        }
    }

    /// Employees pointing at the entity
    pub fn reference_count(&self, id: &str) -> usize {
        match self.get(id) {
            Some(entity) => self
                .employees
                .reference_count(|employee| entity.is_referenced_by(employee)),
            None => 0,
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        self.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.unsubscribe(id);
    }

    /// The view went away; responses still in flight will not touch the state
    pub fn close(&self) {
        log::info!("🔌 {} list closed", E::LABEL);
        self.alive.set(false);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    // ========================================================================
    // FETCH
    // ========================================================================

    pub async fn fetch(&self) -> Result<(), ApiError> {
        let generation = self.next_sequence();
        let mut revision = 0;
        self.state.update(|state| {
            state.loading = true;
            state.error = None;
            state.fetch_generation = generation;
            revision = state.revision;
        });

        log::info!("📋 Loading {} list", E::LABEL);
        let result = self.api.get_all::<E>(&collection_path::<E>()).await;
        if !self.is_alive() {
            return result.map(|_| ());
        }

        let (latest_fetch, current_revision) =
            self.state.with(|state| (state.fetch_generation, state.revision));
        if latest_fetch != generation {
            // The newer fetch clears the spinner when it lands
            log::info!("📋 Dropping superseded {} list response", E::LABEL);
            return result.map(|_| ());
        }
        if current_revision != revision {
            log::info!("📋 Dropping stale {} list response", E::LABEL);
            self.state.update(|state| state.loading = false);
            return result.map(|_| ());
        }

        match result {
            Ok(fetched) => {
                let count = fetched.len();
                self.state.update(|state| {
                    state.items = merge_pending(fetched, &state.pending);
                    state.loading = false;
                });
                log::info!("✅ {} {} records loaded", count, E::LABEL);
                Ok(())
            }
            Err(e) => {
                log::error!("❌ Error loading {} list: {}", E::LABEL, e);
                let message = e.user_message();
                self.state.update(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                Err(e)
            }
        }
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    pub async fn create(&self, draft: E::Draft) -> Result<E, ApiError> {
        let provisional_id = format!("{}{}", PROVISIONAL_ID_PREFIX, self.next_sequence());
        // Later mutations on the provisional id queue behind the create
        let (_, _permits) = self
            .lock_rows(&provisional_id, |id, items| {
                items.push(E::from_draft(id.to_string(), &draft));
                Ok(())
            })
            .await?;

        let optimistic = E::from_draft(provisional_id.clone(), &draft);
        let snapshot = self.apply_optimistic(&provisional_id, |items| items.push(optimistic));
        log::info!("➕ Creating {} ({})", E::LABEL, provisional_id);

        let result = self.api.post::<_, E>(&collection_path::<E>(), &draft).await;
        if !self.is_alive() {
            return result;
        }

        match result {
            Ok(created) => {
                self.state.update(|state| {
                    replace_provisional(&mut state.items, &provisional_id, created.clone());
                    E::normalize(&mut state.items, created.id());
                    state
                        .aliases
                        .insert(provisional_id.clone(), created.id().to_string());
                    state.pending.retain(|pending| pending.ticket != snapshot.ticket);
                    state.revision += 1;
                });
                log::info!("✅ {} '{}' created with id {}", E::LABEL, created.name(), created.id());
                Ok(created)
            }
            Err(e) => {
                log::error!("❌ Error creating {}: {}", E::LABEL, e);
                self.revert(snapshot, &e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // UPDATE
    // ========================================================================

    pub async fn update(&self, id: &str, patch: E::Patch) -> Result<E, ApiError> {
        self.update_with(id, move |_| patch.clone()).await
    }

    /// Builds the patch from the entity as it stands once this mutation's turn comes
    async fn update_with<F>(&self, id: &str, make_patch: F) -> Result<E, ApiError>
    where
        F: Fn(&E) -> E::Patch,
    {
        let (id, _permits) = self
            .lock_rows(id, |id, items| {
                let item = items
                    .iter_mut()
                    .find(|item| item.id() == id)
                    .ok_or_else(|| self.not_found(id))?;
                let patch = make_patch(&*item);
                item.apply_patch(&patch);
                Ok(())
            })
            .await?;
        let Some(current) = self.get(&id) else {
            return Err(self.not_found(&id));
        };

        let patch = make_patch(&current);
        let snapshot = self.apply_optimistic(&id, |items| {
            if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
                item.apply_patch(&patch);
            }
        });
        log::info!("✏️ Updating {} {}", E::LABEL, id);

        let result = self.api.patch::<_, E>(&item_path::<E>(&id), &patch).await;
        if !self.is_alive() {
            return result;
        }

        match result {
            Ok(updated) => {
                self.state.update(|state| {
                    if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
                        *item = updated.clone();
                    }
                    E::normalize(&mut state.items, &id);
                    state.pending.retain(|pending| pending.ticket != snapshot.ticket);
                    state.revision += 1;
                });
                log::info!("✅ {} {} updated", E::LABEL, id);
                Ok(updated)
            }
            Err(e) => {
                log::error!("❌ Error updating {} {}: {}", E::LABEL, id, e);
                self.revert(snapshot, &e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // DELETE
    // ========================================================================

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let (id, _permits) = self
            .lock_rows(id, |id, items| {
                if !items.iter().any(|item| item.id() == id) {
                    return Err(self.not_found(id));
                }
                items.retain(|item| item.id() != id);
                Ok(())
            })
            .await?;
        let Some(entity) = self.get(&id) else {
            return Err(self.not_found(&id));
        };

        if let Err(conflict) = self.check_deletable(&entity) {
            log::warn!("⚠️ Refusing to delete {} '{}': {}", E::LABEL, entity.name(), conflict);
            let message = conflict.user_message();
            self.state.update(|state| state.error = Some(message));
            return Err(conflict);
        }

        let snapshot = self.apply_optimistic(&id, |items| items.retain(|item| item.id() != id));
        log::info!("🗑️ Deleting {} {}", E::LABEL, id);

        let result = self.api.delete(&item_path::<E>(&id)).await;
        if !self.is_alive() {
            return result;
        }

        match result {
            // Already gone on the server: the local removal stands
            Ok(()) | Err(ApiError::NotFound(_)) => {
                self.state.update(|state| {
                    state.pending.retain(|pending| pending.ticket != snapshot.ticket);
                    state.revision += 1;
                });
                log::info!("✅ {} {} deleted", E::LABEL, id);
                Ok(())
            }
            Err(e) => {
                log::error!("❌ Error deleting {} {}: {}", E::LABEL, id, e);
                self.revert(snapshot, &e);
                Err(e)
            }
        }
    }

    /// Blocker first, then employee references; no network involved
    pub fn check_deletable(&self, entity: &E) -> Result<(), ApiError> {
        if let Some(reason) = entity.deletion_blocker() {
            return Err(ApiError::ReferentialConflict(reason));
        }

        let count = self
            .employees
            .reference_count(|employee| entity.is_referenced_by(employee));
        if count > 0 {
            return Err(ApiError::ReferentialConflict(format!(
                "Cannot delete {} '{}': {} employee(s) are still assigned to it",
                E::LABEL.to_lowercase(),
                entity.name(),
                count
            )));
        }
        Ok(())
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn next_sequence(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        next
    }

    fn resolve(&self, id: &str) -> String {
        self.state.with(|state| {
            state
                .aliases
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string())
        })
    }

    /// Locks the target row and every row `change` would touch once normalized,
    /// all in ascending id order. `change` is rehearsed on a copy of the list after
    /// the locks are held; if it reaches a row outside the locked set, everything is
    /// released and the wider set is taken instead.
    async fn lock_rows<C>(&self, id: &str, change: C) -> Result<(String, Vec<MutationPermit>), ApiError>
    where
        C: Fn(&str, &mut Vec<E>) -> Result<(), ApiError>,
    {
        let mut wanted = BTreeSet::new();
        loop {
            let resolved = self.resolve(id);
            wanted.insert(resolved.clone());
            let permits = self.queue.acquire_all(&wanted).await;

            // A create may confirm while we wait on its provisional id
            if self.resolve(id) != resolved {
                wanted.remove(&resolved);
                continue;
            }

            let touched = self.state.with(|state| {
                let mut after = state.items.clone();
                change(&resolved, &mut after)?;
                E::normalize(&mut after, &resolved);
                Ok::<_, ApiError>(touched_ids(&state.items, &after))
            })?;
            if touched.is_subset(&wanted) {
                return Ok((resolved, permits));
            }
            drop(permits);
            wanted.extend(touched);
        }
    }

    fn not_found(&self, id: &str) -> ApiError {
        ApiError::NotFound(format!("{} {}", E::LABEL, id))
    }

    fn apply_optimistic<F>(&self, changed_id: &str, change: F) -> Snapshot<E>
    where
        F: FnOnce(&mut Vec<E>),
    {
        let ticket = self.next_sequence();
        let mut snapshot = None;
        self.state.update(|state| {
            let before = state.items.clone();
            change(&mut state.items);
            E::normalize(&mut state.items, changed_id);

            let (taken, pending) = diff(ticket, &before, &state.items);
            state.pending.push(pending);
            state.error = None;
            snapshot = Some(taken);
        });
        snapshot.unwrap_or(Snapshot {
            ticket,
            changed: Vec::new(),
            removed: Vec::new(),
            inserted: Vec::new(),
        })
    }

    fn revert(&self, snapshot: Snapshot<E>, error: &ApiError) {
        let message = error.user_message();
        self.state.update(|state| {
            state
                .items
                .retain(|item| !snapshot.inserted.iter().any(|id| id == item.id()));
            for original in &snapshot.changed {
                if let Some(item) = state.items.iter_mut().find(|item| item.id() == original.id()) {
                    *item = original.clone();
                }
            }
            for (index, original) in &snapshot.removed {
                if !state.items.iter().any(|item| item.id() == original.id()) {
                    let at = (*index).min(state.items.len());
                    state.items.insert(at, original.clone());
                }
            }
            state.pending.retain(|pending| pending.ticket != snapshot.ticket);
            state.error = Some(message);
        });
    }
}

impl<E: Toggleable> EntityListViewModel<E> {
    /// Flips Active/Inactive through an optimistic update
    pub async fn toggle_status(&self, id: &str) -> Result<E, ApiError> {
        self.update_with(id, |current| current.status_toggle_patch()).await
    }
}

impl EntityListViewModel<SalaryComponent> {
    /// One tab of the salary components page
    pub fn filter_by_type(&self, component_type: ComponentType) -> Vec<SalaryComponent> {
        self.state.with(|state| {
            state
                .items
                .iter()
                .filter(|component| component.component_type == component_type)
                .cloned()
                .collect()
        })
    }
}

fn collection_path<E: Entity>() -> String {
    format!("/{}/", E::COLLECTION)
}

fn item_path<E: Entity>(id: &str) -> String {
    format!("/{}/{}/", E::COLLECTION, urlencoding::encode(id))
}

fn diff<E: Entity>(ticket: u64, before: &[E], after: &[E]) -> (Snapshot<E>, PendingMutation<E>) {
    let mut snapshot = Snapshot {
        ticket,
        changed: Vec::new(),
        removed: Vec::new(),
        inserted: Vec::new(),
    };
    let mut pending = PendingMutation {
        ticket,
        upserts: Vec::new(),
        removals: Vec::new(),
    };

    for (index, old) in before.iter().enumerate() {
        match after.iter().find(|item| item.id() == old.id()) {
            Some(new) if new != old => {
                snapshot.changed.push(old.clone());
                pending.upserts.push(new.clone());
            }
            Some(_) => {}
            None => {
                snapshot.removed.push((index, old.clone()));
                pending.removals.push(old.id().to_string());
            }
        }
    }
    for new in after {
        if !before.iter().any(|item| item.id() == new.id()) {
            snapshot.inserted.push(new.id().to_string());
            pending.upserts.push(new.clone());
        }
    }

    (snapshot, pending)
}

fn touched_ids<E: Entity>(before: &[E], after: &[E]) -> BTreeSet<String> {
    let (snapshot, _) = diff(0, before, after);
    snapshot
        .changed
        .iter()
        .map(|item| item.id().to_string())
        .chain(snapshot.removed.iter().map(|(_, item)| item.id().to_string()))
        .chain(snapshot.inserted)
        .collect()
}

fn merge_pending<E: Entity>(fetched: Vec<E>, pending: &[PendingMutation<E>]) -> Vec<E> {
    let mut items = fetched;
    for mutation in pending {
        items.retain(|item| !mutation.removals.iter().any(|id| id == item.id()));
        for upsert in &mutation.upserts {
            match items.iter_mut().find(|item| item.id() == upsert.id()) {
                Some(item) => *item = upsert.clone(),
                None => items.push(upsert.clone()),
            }
        }
    }
    items
}

// The server row may already be present if a fetch landed mid-create
fn replace_provisional<E: Entity>(items: &mut Vec<E>, provisional_id: &str, created: E) {
    let existing = items.iter().position(|item| item.id() == created.id());
    let provisional = items.iter().position(|item| item.id() == provisional_id);
    match (existing, provisional) {
        (Some(existing), Some(provisional)) => {
            items[existing] = created;
            items.remove(provisional);
        }
        (Some(existing), None) => items[existing] = created,
        (None, Some(provisional)) => items[provisional] = created,
        (None, None) => items.push(created),
    }
}
