//! Range-based joins of the auxiliary CRM relations.
//!
//! Each joiner issues one query per chunk for an inclusive contact-id range
//! and returns a map keyed by contact id. Contacts without a matching row
//! are simply absent from the map.

use std::collections::HashMap;
use tokio::sync::OnceCell;

use crate::domains::contact::repository::CrmRepository;
use crate::domains::contact::types::{AddressRow, EmailRow, SurveyLinkRow};
use crate::errors::DbResult;

use super::types::JoinRange;

/// Campaign and survey identifiers linked to a contact through survey activities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyLinks {
    /// Distinct campaign external identifiers, comma separated
    pub campaign_external_identifiers: String,
    /// Distinct survey ids, comma separated
    pub survey_ids: String,
}

/// Pick one email per contact: the first bulk address, else the first
/// primary one, else the first address seen.
///
/// `rows` must be grouped by contact id.
pub fn select_emails(rows: &[EmailRow]) -> HashMap<i64, String> {
    #[derive(Default)]
    struct Candidates<'a> {
        bulk: Option<&'a str>,
        primary: Option<&'a str>,
        first: Option<&'a str>,
    }

    let mut per_contact: HashMap<i64, Candidates> = HashMap::new();
    for row in rows {
        let candidates = per_contact.entry(row.contact_id).or_default();
        if row.is_bulkmail && candidates.bulk.is_none() {
            candidates.bulk = Some(&row.email);
        }
        if row.is_primary && candidates.primary.is_none() {
            candidates.primary = Some(&row.email);
        }
        if candidates.first.is_none() {
            candidates.first = Some(&row.email);
        }
    }

    per_contact
        .into_iter()
        .filter_map(|(contact_id, c)| {
            c.bulk.or(c.primary).or(c.first).map(|email| (contact_id, email.to_string()))
        })
        .collect()
}

/// Street address followed by the non-empty supplemental lines, joined with `", "`.
/// Lines are taken verbatim; only empty strings are skipped.
pub fn format_address(address: &AddressRow) -> String {
    [
        address.street_address.as_deref(),
        address.supplemental_address_1.as_deref(),
        address.supplemental_address_2.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Collapse survey activity rows into distinct, comma separated identifiers
/// per contact, keeping first-seen order.
pub fn aggregate_survey_links(rows: &[SurveyLinkRow]) -> HashMap<i64, SurveyLinks> {
    let mut grouped: HashMap<i64, (Vec<String>, Vec<String>)> = HashMap::new();

    for row in rows {
        let (campaigns, surveys) = grouped.entry(row.contact_id).or_default();
        if let Some(campaign) = row.campaign_external_identifier.as_deref().filter(|c| !c.is_empty()) {
            if !campaigns.iter().any(|c| c == campaign) {
                campaigns.push(campaign.to_string());
            }
        }
        if let Some(survey_id) = row.survey_id {
            let survey_id = survey_id.to_string();
            if !surveys.contains(&survey_id) {
                surveys.push(survey_id);
            }
        }
    }

    grouped
        .into_iter()
        .map(|(contact_id, (campaigns, surveys))| {
            (
                contact_id,
                SurveyLinks {
                    campaign_external_identifiers: campaigns.join(","),
                    survey_ids: surveys.join(","),
                },
            )
        })
        .collect()
}

pub async fn join_emails(repo: &dyn CrmRepository, range: JoinRange) -> DbResult<HashMap<i64, String>> {
    let rows = repo.emails_in_range(range.range_start, range.range_end).await?;
    Ok(select_emails(&rows))
}

pub async fn join_primary_phones(repo: &dyn CrmRepository, range: JoinRange) -> DbResult<HashMap<i64, String>> {
    let rows = repo.primary_phones_in_range(range.range_start, range.range_end).await?;
    let mut phones = HashMap::with_capacity(rows.len());
    for row in rows {
        phones.entry(row.contact_id).or_insert(row.phone);
    }
    Ok(phones)
}

pub async fn join_primary_addresses(repo: &dyn CrmRepository, range: JoinRange) -> DbResult<HashMap<i64, String>> {
    let rows = repo.primary_addresses_in_range(range.range_start, range.range_end).await?;
    let mut addresses = HashMap::with_capacity(rows.len());
    for row in &rows {
        addresses.entry(row.contact_id).or_insert_with(|| format_address(row));
    }
    Ok(addresses)
}

pub async fn join_survey_links(repo: &dyn CrmRepository, range: JoinRange) -> DbResult<HashMap<i64, SurveyLinks>> {
    let rows = repo.survey_links_in_range(range.range_start, range.range_end).await?;
    Ok(aggregate_survey_links(&rows))
}

/// Membership status of contacts in one named group.
///
/// The group id is looked up on first use and reused for every later chunk.
pub struct GroupStatusJoiner {
    group_name: String,
    group_id: OnceCell<Option<i64>>,
}

impl GroupStatusJoiner {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            group_id: OnceCell::new(),
        }
    }

    pub async fn join(&self, repo: &dyn CrmRepository, range: JoinRange) -> DbResult<HashMap<i64, String>> {
        let group_id = self
            .group_id
            .get_or_try_init(|| async {
                let id = repo.find_group_id(&self.group_name).await?;
                if id.is_none() {
                    log::warn!("Group '{}' not found, its status column stays empty", self.group_name);
                }
                Ok::<_, crate::errors::DbError>(id)
            })
            .await?;

        let Some(group_id) = *group_id else {
            return Ok(HashMap::new());
        };

        let rows = repo.group_contacts_in_range(group_id, range.range_start, range.range_end).await?;
        Ok(rows.into_iter().map(|row| (row.contact_id, row.status)).collect())
    }
}
