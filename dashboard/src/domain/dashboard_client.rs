//! Dashboard operations composed from the read and write bindings.
//!
//! Each operation validates its input, issues one request through a binding
//! and, for login and registration, writes the resulting session. Validation
//! failures never reach the network.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::binding::{MutationBinding, MutationMethod, MutationPayload, QueryBinding, QueryOptions};
use super::ports::{RequestExecutor, StorageError};
use super::schema::{
    AddMemberRequest, CreateExpenseRequest, CreateGroupRequest, Envelope, Expense, Group,
    GroupBalances, LoginRequest, Payload, RegisterRequest, SplitType,
};
use super::{AuthData, Principal, RequestError, SessionStore};

/// Login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login";
/// Registration endpoint.
pub const REGISTER_PATH: &str = "/api/auth/register";
/// Identity endpoint.
pub const WHOAMI_PATH: &str = "/api/auth/me";
/// Group collection endpoint.
pub const GROUPS_PATH: &str = "/api/groups";
/// Membership endpoint.
pub const ADD_MEMBER_PATH: &str = "/api/groups/add-member";
/// Expense collection endpoint.
pub const EXPENSES_PATH: &str = "/api/expenses";

const ALL_FIELDS_REQUIRED: &str = "All fields are required.";
const EXPENSE_FIELDS_REQUIRED: &str = "Please provide description, amount and category.";
const EMAIL_REQUIRED: &str = "Email is required.";

/// Expenses of one group.
#[must_use]
pub fn group_expenses_path(group_id: &str) -> String {
    format!("{EXPENSES_PATH}/group/{group_id}")
}

/// Balances and settlement suggestions of one group.
#[must_use]
pub fn group_balances_path(group_id: &str) -> String {
    format!("{EXPENSES_PATH}/balances/group/{group_id}")
}

/// Failures surfaced by [`DashboardClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// The request failed or was rejected.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// The session could not be persisted or cleared.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Entry point for the dashboard's remote operations.
#[derive(Clone)]
pub struct DashboardClient {
    executor: Arc<dyn RequestExecutor>,
    session: SessionStore,
}

impl DashboardClient {
    /// Create a client sharing `session` with every binding it creates.
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, session: SessionStore) -> Self {
        Self { executor, session }
    }

    /// The session this client reads credentials from.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Read binding over the caller's groups.
    #[must_use]
    pub fn groups_query(&self, options: QueryOptions) -> QueryBinding<Envelope<Vec<Group>>> {
        self.query(GROUPS_PATH, options)
    }

    /// Read binding over a group's expenses.
    #[must_use]
    pub fn expenses_query(
        &self,
        group_id: &str,
        options: QueryOptions,
    ) -> QueryBinding<Envelope<Vec<Expense>>> {
        self.query(group_expenses_path(group_id), options)
    }

    /// Read binding over a group's balances.
    #[must_use]
    pub fn balances_query(
        &self,
        group_id: &str,
        options: QueryOptions,
    ) -> QueryBinding<Envelope<GroupBalances>> {
        self.query(group_balances_path(group_id), options)
    }

    /// Sign in and persist the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, DashboardError> {
        require_all(&[email, password], ALL_FIELDS_REQUIRED)?;
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.authenticate(LOGIN_PATH, request).await
    }

    /// Create an account and persist the session.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, DashboardError> {
        require_all(&[name, email, password], ALL_FIELDS_REQUIRED)?;
        let request = RegisterRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.authenticate(REGISTER_PATH, request).await
    }

    /// Forget the session locally. No request is made.
    pub fn logout(&self) -> Result<(), DashboardError> {
        self.session.clear_auth()?;
        Ok(())
    }

    /// Groups the signed-in user belongs to.
    pub async fn groups(&self) -> Result<Vec<Group>, DashboardError> {
        let envelope = self
            .groups_query(QueryOptions::manual())
            .try_refetch()
            .await?;
        Ok(envelope.into_inner())
    }

    /// Create a group.
    ///
    /// The response shape is not fixed by the API, so unknown bodies are kept
    /// as raw JSON.
    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
        category: &str,
    ) -> Result<Payload<Envelope<Group>>, DashboardError> {
        require_all(&[name, description, category], ALL_FIELDS_REQUIRED)?;
        let request = CreateGroupRequest {
            name: name.to_owned(),
            description: description.to_owned(),
            category: category.to_owned(),
        };
        self.send(GROUPS_PATH, request).await
    }

    /// Expenses recorded in a group.
    pub async fn group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, DashboardError> {
        let envelope = self
            .expenses_query(group_id, QueryOptions::manual())
            .try_refetch()
            .await?;
        Ok(envelope.into_inner())
    }

    /// Balances and settlement suggestions of a group.
    pub async fn group_balances(&self, group_id: &str) -> Result<GroupBalances, DashboardError> {
        let envelope = self
            .balances_query(group_id, QueryOptions::manual())
            .try_refetch()
            .await?;
        Ok(envelope.into_inner())
    }

    /// Record an expense split equally across the group.
    ///
    /// `amount` is parsed here; blanks and non-numbers are rejected before
    /// any request is made.
    pub async fn create_expense(
        &self,
        group_id: &str,
        description: &str,
        amount: &str,
        category: &str,
    ) -> Result<Payload<Envelope<Expense>>, DashboardError> {
        let parsed = parse_amount(amount)
            .filter(|_| !description.is_empty() && !category.is_empty())
            .ok_or_else(|| RequestError::validation(EXPENSE_FIELDS_REQUIRED))?;
        let request = CreateExpenseRequest {
            description: description.to_owned(),
            amount: parsed,
            category: category.to_owned(),
            group_id: group_id.to_owned(),
            split_type: SplitType::Equal,
        };
        self.send(EXPENSES_PATH, request).await
    }

    /// Add a member to a group by email.
    pub async fn add_member(&self, group_id: &str, email: &str) -> Result<Value, DashboardError> {
        require_all(&[email], EMAIL_REQUIRED)?;
        let request = AddMemberRequest {
            group_id: group_id.to_owned(),
            email: email.to_owned(),
        };
        self.send(ADD_MEMBER_PATH, request).await
    }

    /// Ask the API who the current credential belongs to.
    pub async fn whoami(&self) -> Result<Payload<Envelope<Principal>>, DashboardError> {
        Ok(self
            .query(WHOAMI_PATH, QueryOptions::manual())
            .try_refetch()
            .await?)
    }

    async fn authenticate<P: Serialize>(
        &self,
        path: &str,
        request: P,
    ) -> Result<Principal, DashboardError> {
        let envelope: Envelope<AuthData> = self.send(path, request).await?;
        let auth = envelope.into_inner();
        self.session.set_auth(&auth)?;
        debug!(user_id = auth.user.id, path, "authenticated");
        Ok(auth.user)
    }

    async fn send<P, R>(&self, path: &str, request: P) -> Result<R, DashboardError>
    where
        P: Serialize,
        R: DeserializeOwned + Clone,
    {
        let binding: MutationBinding<P, R> = MutationBinding::new(
            Arc::clone(&self.executor),
            self.session.clone(),
            path,
            MutationMethod::Post,
        );
        Ok(binding.try_mutate(MutationPayload::Json(request)).await?)
    }

    fn query<T>(&self, path: impl Into<String>, options: QueryOptions) -> QueryBinding<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        QueryBinding::bind(Arc::clone(&self.executor), self.session.clone(), path, options)
    }
}

fn require_all(fields: &[&str], message: &str) -> Result<(), RequestError> {
    if fields.iter().any(|field| field.is_empty()) {
        return Err(RequestError::validation(message));
    }
    Ok(())
}

/// Parse a user-entered amount; only finite numbers are accepted.
fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

#[cfg(test)]
#[path = "dashboard_client_tests.rs"]
mod tests;
