//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a conversion request.
///
/// The numeric convention is fixed for compatibility with persisted data:
/// 0 = Pending, 50 = Processing, 100 = Completed. Pending is a reserved
/// value; every successful submission goes straight to Processing. Other
/// stored values are displayed as "Unknown" and are never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
}

impl RequestStatus {
    /// Numeric value persisted in the status column
    pub const fn code(self) -> i64 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::Processing => 50,
            RequestStatus::Completed => 100,
        }
    }

    /// Decode a persisted status value; None for out-of-convention values
    pub fn from_code(code: i64) -> Option<RequestStatus> {
        match code {
            0 => Some(RequestStatus::Pending),
            50 => Some(RequestStatus::Processing),
            100 => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// Display label for a persisted status value
    pub fn label_for(code: i64) -> &'static str {
        match RequestStatus::from_code(code) {
            Some(RequestStatus::Pending) => "Pending",
            Some(RequestStatus::Processing) => "Processing",
            Some(RequestStatus::Completed) => "Completed",
            None => "Unknown",
        }
    }
}

/// A customer conversion request record.
///
/// `status` carries the raw persisted value so that out-of-convention
/// data survives a round trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    #[serde(rename = "ID")]
    pub id: String,
    pub contact_name: String,
    pub contact_mail: String,
    pub contact_phone: Option<String>,
    pub label_software: String,
    pub other_software_name: Option<String>,
    pub other_software_website: Option<String>,
    pub num_labels: i64,
    pub conversion_fonts: bool,
    pub conversion_fieldnames: bool,
    pub comparison_print_scan: bool,
    #[serde(rename = "supportADS")]
    pub support_ads: bool,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub folder_name: String,
    pub manifest_object: String,
}
