//! In-memory stand-ins for the keyring and the hosted backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::auth::SessionContext;
use crate::error::{AppError, AppResult};
use crate::models::{
    Branch, CancellationReason, CancellationRecord, CancelledPizza, Flavor, NamedRef,
    NewCancellationRecord, NewCancelledPizza, Profile, ReasonRef, Role, Session, SessionUser,
    ShiftPeriod,
};
use crate::remote::{RecordQuery, RemoteStore};
use crate::storage::CredentialStore;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCredentials {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    fn map(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.map().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        self.map().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

pub fn session_for(user_id: Uuid) -> Session {
    Session {
        access_token: format!("access-{}", Uuid::new_v4()),
        refresh_token: format!("refresh-{}", Uuid::new_v4()),
        expires_at: None,
        user: SessionUser {
            id: user_id,
            email: None,
        },
    }
}

pub fn cashier_profile(branch_id: Uuid, branch_name: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        full_name: "Caja Centro".into(),
        role: Role::BranchCashier,
        branch_id: Some(branch_id),
        branch: Some(NamedRef {
            name: branch_name.into(),
        }),
    }
}

pub fn supervisor_profile() -> Profile {
    Profile {
        id: Uuid::new_v4(),
        full_name: "Supervisora".into(),
        role: Role::Supervisor,
        branch_id: None,
        branch: None,
    }
}

/// A resolved context for `profile` with a fresh session.
pub fn signed_in(profile: &Profile) -> SessionContext {
    SessionContext::resolved(Some(session_for(profile.id)), Some(profile.clone()))
}

pub fn record(branch: &Branch, on: NaiveDate, cancelled: u32, sent: Option<u32>) -> CancellationRecord {
    CancellationRecord {
        id: Uuid::new_v4(),
        branch_id: branch.id,
        cashier_name: "Luis".into(),
        date: on,
        shift: Some(ShiftPeriod::Am),
        total_cancelled: cancelled,
        total_sent: sent,
        created_by: None,
        branch: Some(NamedRef {
            name: branch.name.clone(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Remote fake
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeState {
    /// One entry per trait call, e.g. `"insert_record"`.
    pub calls: Vec<String>,
    /// e-mail -> (password, profile)
    pub users: HashMap<String, (String, Profile)>,
    /// refresh token -> user id
    pub refresh_tokens: HashMap<String, Uuid>,
    pub profiles: HashMap<Uuid, Profile>,
    pub branches: Vec<Branch>,
    pub flavors: Vec<Flavor>,
    pub reasons: Vec<CancellationReason>,
    pub records: Vec<CancellationRecord>,
    /// (record id, line item)
    pub pizzas: Vec<(Uuid, CancelledPizza)>,
    pub fail_sign_in: bool,
    pub fail_pizza_insert: bool,
    pub fail_delete: bool,
    pub fail_profile: bool,
    pub fail_reads: bool,
    /// Updates succeed but return no rows, like a row-level policy denial.
    pub deny_updates: bool,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, call: &str) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        state
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn add_user(&self, email: &str, password: &str, profile: Profile) {
        let mut state = self.state();
        state.profiles.insert(profile.id, profile.clone());
        state
            .users
            .insert(email.to_string(), (password.to_string(), profile));
    }

    pub fn add_branch(&self, name: &str) -> Branch {
        let branch = Branch {
            id: Uuid::new_v4(),
            name: name.into(),
        };
        self.state().branches.push(branch.clone());
        branch
    }

    pub fn add_catalog(&self, flavor: &str, reason: &str) -> (Uuid, Uuid) {
        let flavor = Flavor {
            id: Uuid::new_v4(),
            name: flavor.into(),
            is_active: true,
        };
        let reason = CancellationReason {
            id: Uuid::new_v4(),
            reason: reason.into(),
            is_active: true,
        };
        let ids = (flavor.id, reason.id);
        let mut state = self.state();
        state.flavors.push(flavor);
        state.reasons.push(reason);
        ids
    }

    pub fn add_record(&self, record: CancellationRecord) -> Uuid {
        let id = record.id;
        self.state().records.push(record);
        id
    }

    pub fn add_pizza(&self, record_id: Uuid, flavor: &str, reason: &str, quantity: u32) {
        self.state().pizzas.push((
            record_id,
            CancelledPizza {
                id: Uuid::new_v4(),
                quantity,
                flavor: Some(NamedRef {
                    name: flavor.into(),
                }),
                reason: Some(ReasonRef {
                    reason: reason.into(),
                }),
            },
        ));
    }

    pub fn pizzas_of(&self, record_id: Uuid) -> usize {
        self.state()
            .pizzas
            .iter()
            .filter(|(r, _)| *r == record_id)
            .count()
    }

    fn issue_session(state: &mut FakeState, user_id: Uuid) -> Session {
        let session = session_for(user_id);
        state
            .refresh_tokens
            .insert(session.refresh_token.clone(), user_id);
        session
    }
}

fn unavailable(what: &str) -> AppError {
    AppError::Remote {
        status: 500,
        message: format!("{what} unavailable"),
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let mut state = self.log("sign_in_with_password");
        if state.fail_sign_in {
            return Err(unavailable("auth"));
        }
        let user_id = match state.users.get(email) {
            Some((expected, profile)) if expected == password => profile.id,
            _ => return Err(AppError::Auth("Invalid login credentials".into())),
        };
        Ok(Self::issue_session(&mut state, user_id))
    }

    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        let mut state = self.log("refresh_session");
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AppError::Auth("Invalid Refresh Token".into()))?;
        Ok(Self::issue_session(&mut state, user_id))
    }

    async fn sign_out(&self, session: &Session) -> AppResult<()> {
        let mut state = self.log("sign_out");
        state.refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }

    async fn fetch_profile(&self, session: &Session) -> AppResult<Profile> {
        let state = self.log("fetch_profile");
        if state.fail_profile {
            return Err(unavailable("profiles"));
        }
        state
            .profiles
            .get(&session.user_id())
            .cloned()
            .ok_or(AppError::Remote {
                status: 406,
                message: "Expected exactly one row".into(),
            })
    }

    async fn list_branches(&self, _session: &Session) -> AppResult<Vec<Branch>> {
        let state = self.log("list_branches");
        if state.fail_reads {
            return Err(unavailable("branches"));
        }
        let mut branches = state.branches.clone();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn list_active_flavors(&self, _session: &Session) -> AppResult<Vec<Flavor>> {
        let state = self.log("list_active_flavors");
        Ok(state.flavors.iter().filter(|f| f.is_active).cloned().collect())
    }

    async fn list_active_reasons(&self, _session: &Session) -> AppResult<Vec<CancellationReason>> {
        let state = self.log("list_active_reasons");
        Ok(state.reasons.iter().filter(|r| r.is_active).cloned().collect())
    }

    async fn list_records(
        &self,
        _session: &Session,
        query: &RecordQuery,
    ) -> AppResult<Vec<CancellationRecord>> {
        let state = self.log("list_records");
        if state.fail_reads {
            return Err(unavailable("records"));
        }
        let mut rows: Vec<CancellationRecord> = state
            .records
            .iter()
            .filter(|r| query.created_by.is_none() || r.created_by == query.created_by)
            .filter(|r| query.branch_id.map_or(true, |b| r.branch_id == b))
            .filter(|r| query.date.map_or(true, |d| r.date == d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.size as usize)
            .collect())
    }

    async fn list_pizzas(
        &self,
        _session: &Session,
        record_id: Uuid,
    ) -> AppResult<Vec<CancelledPizza>> {
        let state = self.log("list_pizzas");
        if state.fail_reads {
            return Err(unavailable("pizzas"));
        }
        Ok(state
            .pizzas
            .iter()
            .filter(|(r, _)| *r == record_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn insert_record(
        &self,
        _session: &Session,
        record: &NewCancellationRecord,
    ) -> AppResult<CancellationRecord> {
        let mut state = self.log("insert_record");
        let branch = state
            .branches
            .iter()
            .find(|b| b.id == record.branch_id)
            .map(|b| NamedRef {
                name: b.name.clone(),
            });
        let row = CancellationRecord {
            id: Uuid::new_v4(),
            branch_id: record.branch_id,
            cashier_name: record.cashier_name.clone(),
            date: record.date,
            shift: Some(record.shift),
            total_cancelled: record.total_cancelled,
            total_sent: None,
            created_by: Some(record.created_by),
            branch,
        };
        state.records.push(row.clone());
        Ok(row)
    }

    async fn insert_pizzas(
        &self,
        _session: &Session,
        pizzas: &[NewCancelledPizza],
    ) -> AppResult<()> {
        let mut state = self.log("insert_pizzas");
        if state.fail_pizza_insert {
            return Err(AppError::Remote {
                status: 400,
                message: "insert or update on table violates foreign key constraint".into(),
            });
        }
        for p in pizzas {
            let flavor = state
                .flavors
                .iter()
                .find(|f| f.id == p.flavor_id)
                .map(|f| NamedRef {
                    name: f.name.clone(),
                });
            let reason = state
                .reasons
                .iter()
                .find(|r| r.id == p.reason_id)
                .map(|r| ReasonRef {
                    reason: r.reason.clone(),
                });
            state.pizzas.push((
                p.record_id,
                CancelledPizza {
                    id: Uuid::new_v4(),
                    quantity: p.quantity,
                    flavor,
                    reason,
                },
            ));
        }
        Ok(())
    }

    async fn delete_record(&self, _session: &Session, record_id: Uuid) -> AppResult<()> {
        let mut state = self.log("delete_record");
        if state.fail_delete {
            return Err(unavailable("delete"));
        }
        state.records.retain(|r| r.id != record_id);
        state.pizzas.retain(|(r, _)| *r != record_id);
        Ok(())
    }

    async fn set_total_sent(
        &self,
        _session: &Session,
        record_id: Uuid,
        total_sent: u32,
    ) -> AppResult<Vec<CancellationRecord>> {
        let mut state = self.log("set_total_sent");
        if state.deny_updates {
            return Ok(Vec::new());
        }
        Ok(state
            .records
            .iter_mut()
            .filter(|r| r.id == record_id && !r.is_validated())
            .map(|r| {
                r.total_sent = Some(total_sent);
                r.clone()
            })
            .collect())
    }
}
