use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored clearance requests (store-assigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for registered residents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResidentId(pub i64);

/// Identifier wrapper for clearance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClearanceTypeId(pub i64);

/// Account identity of whoever acts on a request (resident or staff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Lifecycle status of a clearance request.
///
/// `Submitted` and `Pending` are both "awaiting review"; every guard goes
/// through [`RequestStatus::is_awaiting_review`] so the rule exists once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
    Pending,
    Approved,
    Rejected,
    Cancelled,
    ForRelease,
    Released,
    Expired,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::ForRelease => "for_release",
            Self::Released => "released",
            Self::Expired => "expired",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "for_release" => Some(Self::ForRelease),
            "released" => Some(Self::Released),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// True while the request sits in the staff review queue.
    pub const fn is_awaiting_review(self) -> bool {
        matches!(self, Self::Submitted | Self::Pending)
    }

    /// True once no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Expired)
    }
}

/// A citizen's application for an official clearance document, tracked from
/// submission through release and expiry. Never physically deleted; terminal
/// records are retained for history and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceRequest {
    pub id: RequestId,
    pub reference_number: String,
    pub resident_id: ResidentId,
    pub clearance_type_id: ClearanceTypeId,
    pub purpose: String,

    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,

    pub processed_by: Option<UserId>,
    pub processed_date: Option<DateTime<Utc>>,
    pub remarks: Option<String>,

    pub is_paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub collected_by: Option<UserId>,
    pub official_receipt_number: Option<String>,
    /// Snapshot of the type fee in centavos at payment time.
    pub amount_paid: Option<u32>,

    pub released_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,

    pub cancelled_by: Option<UserId>,
    pub cancelled_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,

    pub document_path: Option<String>,
    pub document_generated_date: Option<DateTime<Utc>>,

    /// Optimistic-concurrency stamp; bumped by the store on every update.
    pub version: u64,
}

impl ClearanceRequest {
    /// A freshly submitted request, before the store assigns an id.
    pub fn submitted(
        reference_number: String,
        resident_id: ResidentId,
        clearance_type_id: ClearanceTypeId,
        purpose: String,
        request_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId(0),
            reference_number,
            resident_id,
            clearance_type_id,
            purpose,
            status: RequestStatus::Submitted,
            request_date,
            processed_by: None,
            processed_date: None,
            remarks: None,
            is_paid: false,
            paid_date: None,
            collected_by: None,
            official_receipt_number: None,
            amount_paid: None,
            released_date: None,
            expiry_date: None,
            cancelled_by: None,
            cancelled_date: None,
            cancellation_reason: None,
            document_path: None,
            document_generated_date: None,
            version: 0,
        }
    }

    pub fn status_view(&self) -> RequestView {
        RequestView {
            id: self.id,
            reference_number: self.reference_number.clone(),
            resident_id: self.resident_id,
            clearance_type_id: self.clearance_type_id,
            purpose: self.purpose.clone(),
            status: self.status,
            status_label: self.status.label(),
            request_date: self.request_date,
            is_paid: self.is_paid,
            released_date: self.released_date,
            expiry_date: self.expiry_date,
            document_path: self.document_path.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

/// Sanitized representation served to callers; staff identities stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub reference_number: String,
    pub resident_id: ResidentId,
    pub clearance_type_id: ClearanceTypeId,
    pub purpose: String,
    pub status: RequestStatus,
    pub status_label: &'static str,
    pub request_date: DateTime<Utc>,
    pub is_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Catalog entry determining the fee for a request. Read-mostly; owned by the
/// directory, consulted only at request creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceType {
    pub id: ClearanceTypeId,
    pub name: String,
    /// Fee in centavos.
    pub fee: u32,
    pub is_active: bool,
}

/// Registered resident able to submit and cancel their own requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub id: ResidentId,
    /// Account identity the resident signs in with.
    pub user_id: UserId,
    pub full_name: String,
}
