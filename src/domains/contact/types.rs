use serde::{Deserialize, Serialize};

/// Static inclusion criteria for the candidate population
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCriteria {
    pub contact_type: String,
    pub do_not_email: bool,
    pub is_opt_out: bool,
}

impl Default for CandidateCriteria {
    fn default() -> Self {
        Self {
            contact_type: "Individual".to_string(),
            do_not_email: false,
            is_opt_out: false,
        }
    }
}

/// A candidate contact as read from the CRM, including its primary address
/// fields. Read-only for the export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactRecord {
    pub id: i64,
    pub hash: Option<String>,
    pub individual_prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub formal_title: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub external_identifier: Option<String>,
}

/// One row of `civicrm_email`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EmailRow {
    pub contact_id: i64,
    pub email: String,
    pub is_primary: bool,
    pub is_bulkmail: bool,
}

/// Primary phone of a contact
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PhoneRow {
    pub contact_id: i64,
    pub phone: String,
}

/// Street part of a primary address
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct AddressRow {
    pub contact_id: i64,
    pub street_address: Option<String>,
    pub supplemental_address_1: Option<String>,
    pub supplemental_address_2: Option<String>,
}

/// Membership of a contact in a group
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GroupContactRow {
    pub contact_id: i64,
    pub status: String,
}

/// One survey activity a contact is a target of, with the linked campaign's
/// external identifier and the survey id, either of which may be absent.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SurveyLinkRow {
    pub contact_id: i64,
    pub campaign_external_identifier: Option<String>,
    pub survey_id: Option<i64>,
}
