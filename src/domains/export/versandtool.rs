use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domains::contact::repository::CrmRepository;
use crate::domains::contact::types::{CandidateCriteria, ContactRecord};
use crate::domains::settings::types::VERSANDTOOL_EXPORTS;

use super::checksum::ChecksumGenerator;
use super::csv_record::{csv_optional_to_string, CsvRecord};
use super::joiners::{
    join_emails, join_primary_addresses, join_primary_phones, join_survey_links, GroupStatusJoiner,
    SurveyLinks,
};
use super::service::ExportVariant;
use super::types::{ChunkDescriptor, ChunkRanges, ExportError, ExportResult, RangeMode};

pub const COMMUNITY_NL_GROUP: &str = "Community NL";
pub const DONATION_INFO_GROUP: &str = "Donation Info";

/// Prefix of legacy IMB person ids carried in the external identifier
const IMB_PREFIX: &str = "IMB-";

pub const VERSANDTOOL_HEADERS: [&str; 20] = [
    "Kontakt-Hash",
    "E-Mail",
    "Salutation",
    "Firstname",
    "Lastname",
    "Birthday",
    "Title",
    "ZIP",
    "City",
    "Country",
    "Address",
    "Contact_ID",
    "Telephone",
    "PersonID_IMB",
    "Package_id",
    "Segment_id",
    "Community_NL",
    "Donation Info",
    "Campaign_Topic",
    "Petition",
];

/// One line of the Versandtool file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersandtoolRow {
    #[serde(rename = "Kontakt-Hash")]
    pub kontakt_hash: String,
    #[serde(rename = "E-Mail")]
    pub email: String,
    #[serde(rename = "Salutation")]
    pub salutation: String,
    #[serde(rename = "Firstname")]
    pub firstname: String,
    #[serde(rename = "Lastname")]
    pub lastname: String,
    #[serde(rename = "Birthday")]
    pub birthday: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "ZIP")]
    pub zip: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Contact_ID")]
    pub contact_id: i64,
    #[serde(rename = "Telephone")]
    pub telephone: String,
    #[serde(rename = "PersonID_IMB")]
    pub person_id_imb: String,
    #[serde(rename = "Package_id")]
    pub package_id: String,
    #[serde(rename = "Segment_id")]
    pub segment_id: String,
    #[serde(rename = "Community_NL")]
    pub community_nl: String,
    #[serde(rename = "Donation Info")]
    pub donation_info: String,
    #[serde(rename = "Campaign_Topic")]
    pub campaign_topic: String,
    #[serde(rename = "Petition")]
    pub petition: String,
}

impl CsvRecord for VersandtoolRow {
    fn headers() -> Vec<&'static str> {
        VERSANDTOOL_HEADERS.to_vec()
    }

    fn to_csv(&self) -> Vec<String> {
        vec![
            self.kontakt_hash.clone(),
            self.email.clone(),
            self.salutation.clone(),
            self.firstname.clone(),
            self.lastname.clone(),
            self.birthday.clone(),
            self.title.clone(),
            self.zip.clone(),
            self.city.clone(),
            self.country.clone(),
            self.address.clone(),
            self.contact_id.to_string(),
            self.telephone.clone(),
            self.person_id_imb.clone(),
            self.package_id.clone(),
            self.segment_id.clone(),
            self.community_nl.clone(),
            self.donation_info.clone(),
            self.campaign_topic.clone(),
            self.petition.clone(),
        ]
    }
}

/// Auxiliary values of one chunk, keyed by contact id
#[derive(Debug, Clone, Default)]
pub struct VersandtoolJoin {
    pub emails: HashMap<i64, String>,
    pub phones: HashMap<i64, String>,
    pub addresses: HashMap<i64, String>,
    pub community_nl: HashMap<i64, String>,
    pub donation_info: HashMap<i64, String>,
    pub surveys: HashMap<i64, SurveyLinks>,
}

/// The external identifier if it is a legacy IMB person id, else empty
pub fn filter_external_identifier(external_identifier: Option<&str>) -> String {
    external_identifier
        .filter(|id| id.starts_with(IMB_PREFIX))
        .map(str::to_string)
        .unwrap_or_default()
}

fn lookup(map: &HashMap<i64, String>, contact_id: i64) -> String {
    map.get(&contact_id).cloned().unwrap_or_default()
}

/// Daily export of mailable individuals for the Versandtool mailing service
pub struct VersandtoolExport {
    repo: Arc<dyn CrmRepository>,
    checksum: Arc<dyn ChecksumGenerator>,
    criteria: CandidateCriteria,
    range_mode: RangeMode,
    community_nl: GroupStatusJoiner,
    donation_info: GroupStatusJoiner,
}

impl VersandtoolExport {
    pub fn new(
        repo: Arc<dyn CrmRepository>,
        checksum: Arc<dyn ChecksumGenerator>,
        range_mode: RangeMode,
    ) -> Self {
        Self {
            repo,
            checksum,
            criteria: CandidateCriteria::default(),
            range_mode,
            community_nl: GroupStatusJoiner::new(COMMUNITY_NL_GROUP),
            donation_info: GroupStatusJoiner::new(DONATION_INFO_GROUP),
        }
    }
}

#[async_trait]
impl ExportVariant for VersandtoolExport {
    type Record = ContactRecord;
    type Join = VersandtoolJoin;
    type Row = VersandtoolRow;

    fn name(&self) -> &str {
        "versandtool"
    }

    fn settings_name(&self) -> &str {
        VERSANDTOOL_EXPORTS
    }

    async fn count(&self) -> ExportResult<u64> {
        self.repo
            .count_candidates(&self.criteria)
            .await
            .map_err(|e| ExportError::NoCandidates(format!("Failed to count contacts: {}", e)))
    }

    async fn select_chunk(&self, chunk: ChunkDescriptor) -> ExportResult<Vec<ContactRecord>> {
        Ok(self.repo.find_candidates(&self.criteria, chunk.size, chunk.offset).await?)
    }

    async fn join(&self, chunk: ChunkDescriptor, records: &[ContactRecord]) -> ExportResult<VersandtoolJoin> {
        let contact_ids: Vec<i64> = records.iter().map(|c| c.id).collect();
        let ranges = ChunkRanges::for_chunk(chunk, self.range_mode, &contact_ids);
        debug!(
            "Joining chunk at offset {} over contacts {}..={} (surveys {}..={})",
            chunk.offset,
            ranges.relations.range_start,
            ranges.relations.range_end,
            ranges.activities.range_start,
            ranges.activities.range_end
        );

        let repo = self.repo.as_ref();
        Ok(VersandtoolJoin {
            emails: join_emails(repo, ranges.relations).await?,
            phones: join_primary_phones(repo, ranges.relations).await?,
            addresses: join_primary_addresses(repo, ranges.relations).await?,
            community_nl: self.community_nl.join(repo, ranges.relations).await?,
            donation_info: self.donation_info.join(repo, ranges.relations).await?,
            surveys: join_survey_links(repo, ranges.activities).await?,
        })
    }

    fn transform(&self, contact: &ContactRecord, join: &VersandtoolJoin) -> VersandtoolRow {
        let id = contact.id;
        let surveys = join.surveys.get(&id);

        VersandtoolRow {
            kontakt_hash: self.checksum.checksum(id, contact.hash.as_deref()),
            email: lookup(&join.emails, id),
            salutation: csv_optional_to_string(&contact.individual_prefix),
            firstname: csv_optional_to_string(&contact.first_name),
            lastname: csv_optional_to_string(&contact.last_name),
            birthday: csv_optional_to_string(&contact.birth_date),
            title: csv_optional_to_string(&contact.formal_title),
            zip: csv_optional_to_string(&contact.postal_code),
            city: csv_optional_to_string(&contact.city),
            country: csv_optional_to_string(&contact.country),
            address: lookup(&join.addresses, id),
            contact_id: id,
            telephone: lookup(&join.phones, id),
            person_id_imb: filter_external_identifier(contact.external_identifier.as_deref()),
            package_id: String::new(),
            segment_id: String::new(),
            community_nl: lookup(&join.community_nl, id),
            donation_info: lookup(&join.donation_info, id),
            campaign_topic: surveys.map(|s| s.campaign_external_identifiers.clone()).unwrap_or_default(),
            petition: surveys.map(|s| s.survey_ids.clone()).unwrap_or_default(),
        }
    }
}
