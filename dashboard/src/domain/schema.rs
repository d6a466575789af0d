//! Response and request schemas for the remote expense API.
//!
//! The API wraps every payload in `{ "data": ... }`. Callers that cannot rely
//! on a stable shape decode into [`Payload`], which keeps the raw JSON instead
//! of failing when the known schema does not match.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Principal;

/// `{ "data": T }` wrapper used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Endpoint payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Unwrap the payload.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// A known schema, or the raw JSON when the body did not match it.
///
/// # Examples
/// ```
/// use dashboard::domain::schema::{Envelope, Payload};
/// use serde_json::json;
///
/// let known: Payload<Envelope<u32>> = serde_json::from_value(json!({ "data": 3 })).unwrap();
/// assert_eq!(known.known().map(|e| e.data), Some(3));
/// let unknown: Payload<Envelope<u32>> = serde_json::from_value(json!({ "rows": [] })).unwrap();
/// assert!(unknown.known().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    /// The body matched the schema.
    Known(T),
    /// The body as received.
    Unknown(Value),
}

impl<T> Payload<T> {
    /// The decoded schema, if it matched.
    #[must_use]
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown(_) => None,
        }
    }
}

/// Member entry inside a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    /// Membership id.
    pub id: i64,
    /// Member profile.
    pub user: Principal,
    /// Role within the group.
    pub role: String,
    /// Net balance.
    pub balance: f64,
    /// Join timestamp.
    pub joined_at: String,
}

/// Expense-sharing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Group id.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Sum of all expenses.
    #[serde(default)]
    pub total_expense: f64,
    /// Whether the group is open.
    #[serde(default)]
    pub is_active: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: String,
    /// Members and their balances.
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

/// One participant's share of an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    /// Split id.
    pub id: i64,
    /// Participant.
    pub user: Principal,
    /// Share owed.
    pub amount: f64,
    /// Whether the share has been settled.
    pub is_paid: bool,
}

/// Recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Expense id.
    pub id: i64,
    /// What was paid for.
    pub description: String,
    /// Total amount.
    pub amount: f64,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Member who paid.
    pub paid_by: Principal,
    /// Split rule, such as `EQUAL`.
    pub split_type: String,
    /// Per-member shares.
    #[serde(default)]
    pub splits: Vec<Split>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Direction of a member's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BalanceStatus {
    /// The member owes money.
    Owes,
    /// The member is owed money.
    Owed,
    /// Any other status string.
    Other(String),
}

impl From<String> for BalanceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "OWES" => Self::Owes,
            "OWED" => Self::Owed,
            _ => Self::Other(value),
        }
    }
}

impl From<BalanceStatus> for String {
    fn from(value: BalanceStatus) -> Self {
        match value {
            BalanceStatus::Owes => "OWES".to_owned(),
            BalanceStatus::Owed => "OWED".to_owned(),
            BalanceStatus::Other(raw) => raw,
        }
    }
}

/// Net position of one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    /// Member id.
    pub user_id: i64,
    /// Member name.
    pub user_name: String,
    /// Member email.
    pub user_email: String,
    /// Net balance.
    pub balance: f64,
    /// Direction of the balance.
    pub balance_status: BalanceStatus,
}

/// Transfer suggested by the server to settle the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSettlement {
    /// Paying member id.
    pub payer_id: i64,
    /// Paying member name.
    pub payer_name: String,
    /// Paying member email.
    pub payer_email: String,
    /// Receiving member id.
    pub receiver_id: i64,
    /// Receiving member name.
    pub receiver_name: String,
    /// Receiving member email.
    pub receiver_email: String,
    /// Amount to transfer.
    pub amount: f64,
    /// Human-readable summary of the transfer.
    #[serde(default)]
    pub description: String,
}

/// Balances and settlements computed by the server for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalances {
    /// Group id.
    pub group_id: i64,
    /// Group name.
    pub group_name: String,
    /// Sum of all expenses.
    pub total_group_expenses: f64,
    /// Net position per member.
    #[serde(default)]
    pub user_balances: Vec<UserBalance>,
    /// Transfers that settle the group.
    #[serde(default)]
    pub suggested_settlements: Vec<SuggestedSettlement>,
    /// Number of suggested transfers.
    #[serde(default)]
    pub total_transactions_needed: u32,
    /// Server-written summary.
    #[serde(default)]
    pub summary: String,
    /// Whether every balance is zero.
    #[serde(default)]
    pub group_settled: bool,
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// `POST /api/groups` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGroupRequest {
    /// Group name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Category label.
    pub category: String,
}

/// How an expense is divided; the dashboard only creates equal splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    /// Every member pays the same share.
    Equal,
}

/// `POST /api/expenses` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    /// What was paid for.
    pub description: String,
    /// Total amount.
    pub amount: f64,
    /// Category label.
    pub category: String,
    /// Target group id.
    pub group_id: String,
    /// Split rule.
    pub split_type: SplitType,
}

/// `POST /api/groups/add-member` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// Target group id.
    pub group_id: String,
    /// Email of the user to add.
    pub email: String,
}
