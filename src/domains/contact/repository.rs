use async_trait::async_trait;
use sqlx::{query_as, query_scalar, SqlitePool};

use crate::errors::{DbError, DbResult};

use super::types::{
    AddressRow, CandidateCriteria, ContactRecord, EmailRow, GroupContactRow, PhoneRow,
    SurveyLinkRow,
};

/// Activity type of survey/petition activities
pub const SURVEY_ACTIVITY_TYPE_ID: i64 = 28;

/// `civicrm_activity_contact.record_type_id` of activity targets
pub const TARGET_RECORD_TYPE_ID: i64 = 3;

/// Record access into the CRM store.
///
/// Range queries take an inclusive `[range_start, range_end]` bound on the
/// contact id; a bound with `range_start > range_end` matches nothing.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    async fn count_candidates(&self, criteria: &CandidateCriteria) -> DbResult<u64>;

    /// Candidates ordered by contact id, `limit` rows starting at `offset`
    async fn find_candidates(
        &self,
        criteria: &CandidateCriteria,
        limit: u64,
        offset: u64,
    ) -> DbResult<Vec<ContactRecord>>;

    /// All email rows in range, ordered by contact id then row id
    async fn emails_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<EmailRow>>;

    async fn primary_phones_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<PhoneRow>>;

    async fn primary_addresses_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<AddressRow>>;

    async fn find_group_id(&self, group_name: &str) -> DbResult<Option<i64>>;

    async fn group_contacts_in_range(
        &self,
        group_id: i64,
        range_start: i64,
        range_end: i64,
    ) -> DbResult<Vec<GroupContactRow>>;

    /// Survey activities whose targets fall in range, ordered by contact id then activity id
    async fn survey_links_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<SurveyLinkRow>>;
}

pub struct SqliteCrmRepository {
    pool: SqlitePool,
}

impl SqliteCrmRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const CANDIDATE_FILTER: &str = "c.contact_type = ? AND c.do_not_email = ? AND c.is_opt_out = ? AND c.is_deleted = 0";

#[async_trait]
impl CrmRepository for SqliteCrmRepository {
    async fn count_candidates(&self, criteria: &CandidateCriteria) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM civicrm_contact c WHERE {}", CANDIDATE_FILTER);
        let count: i64 = query_scalar(&sql)
            .bind(&criteria.contact_type)
            .bind(criteria.do_not_email)
            .bind(criteria.is_opt_out)
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count).map_err(|_| DbError::Query(format!("Negative contact count {}", count)))
    }

    async fn find_candidates(
        &self,
        criteria: &CandidateCriteria,
        limit: u64,
        offset: u64,
    ) -> DbResult<Vec<ContactRecord>> {
        let sql = format!(
            "SELECT c.id, c.hash, c.individual_prefix, c.first_name, c.last_name, c.birth_date,
                    c.formal_title, a.postal_code, a.city, co.iso_code AS country, c.external_identifier
             FROM civicrm_contact c
             LEFT JOIN civicrm_address a ON a.contact_id = c.id AND a.is_primary = 1
             LEFT JOIN civicrm_country co ON co.id = a.country_id
             WHERE {}
             GROUP BY c.id
             ORDER BY c.id ASC
             LIMIT ? OFFSET ?",
            CANDIDATE_FILTER
        );

        let limit = i64::try_from(limit).map_err(|_| DbError::Query(format!("Limit {} out of range", limit)))?;
        let offset = i64::try_from(offset).map_err(|_| DbError::Query(format!("Offset {} out of range", offset)))?;

        let contacts = query_as::<_, ContactRecord>(&sql)
            .bind(&criteria.contact_type)
            .bind(criteria.do_not_email)
            .bind(criteria.is_opt_out)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn emails_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<EmailRow>> {
        let rows = query_as::<_, EmailRow>(
            "SELECT contact_id, email, is_primary, is_bulkmail
             FROM civicrm_email
             WHERE contact_id BETWEEN ? AND ?
             ORDER BY contact_id ASC, id ASC",
        )
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn primary_phones_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<PhoneRow>> {
        let rows = query_as::<_, PhoneRow>(
            "SELECT contact_id, phone
             FROM civicrm_phone
             WHERE is_primary = 1 AND contact_id BETWEEN ? AND ?
             ORDER BY contact_id ASC, id ASC",
        )
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn primary_addresses_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<AddressRow>> {
        let rows = query_as::<_, AddressRow>(
            "SELECT contact_id, street_address, supplemental_address_1, supplemental_address_2
             FROM civicrm_address
             WHERE is_primary = 1 AND contact_id BETWEEN ? AND ?
             ORDER BY contact_id ASC, id ASC",
        )
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_group_id(&self, group_name: &str) -> DbResult<Option<i64>> {
        let id: Option<i64> = query_scalar("SELECT id FROM civicrm_group WHERE name = ? LIMIT 1")
            .bind(group_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn group_contacts_in_range(
        &self,
        group_id: i64,
        range_start: i64,
        range_end: i64,
    ) -> DbResult<Vec<GroupContactRow>> {
        let rows = query_as::<_, GroupContactRow>(
            "SELECT contact_id, status
             FROM civicrm_group_contact
             WHERE contact_id BETWEEN ? AND ? AND group_id = ?
             ORDER BY contact_id ASC, id ASC",
        )
        .bind(range_start)
        .bind(range_end)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn survey_links_in_range(&self, range_start: i64, range_end: i64) -> DbResult<Vec<SurveyLinkRow>> {
        let rows = query_as::<_, SurveyLinkRow>(
            "SELECT acon.contact_id AS contact_id,
                    acamp.external_identifier AS campaign_external_identifier,
                    act.source_record_id AS survey_id
             FROM civicrm_activity act
             INNER JOIN civicrm_activity_contact acon ON act.id = acon.activity_id
             LEFT JOIN civicrm_campaign acamp ON act.campaign_id = acamp.id
             WHERE act.activity_type_id = ? AND acon.record_type_id = ?
               AND acon.contact_id BETWEEN ? AND ?
             ORDER BY acon.contact_id ASC, act.id ASC",
        )
        .bind(SURVEY_ACTIVITY_TYPE_ID)
        .bind(TARGET_RECORD_TYPE_ID)
        .bind(range_start)
        .bind(range_end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_pool, seed_contact, ContactSeed};

    #[tokio::test]
    async fn test_count_applies_inclusion_criteria() {
        let pool = memory_pool().await;
        seed_contact(&pool, ContactSeed::individual(1)).await;
        seed_contact(&pool, ContactSeed { do_not_email: true, ..ContactSeed::individual(2) }).await;
        seed_contact(&pool, ContactSeed { is_opt_out: true, ..ContactSeed::individual(3) }).await;
        seed_contact(&pool, ContactSeed { contact_type: "Organization", ..ContactSeed::individual(4) }).await;
        seed_contact(&pool, ContactSeed { is_deleted: true, ..ContactSeed::individual(5) }).await;
        seed_contact(&pool, ContactSeed::individual(6)).await;

        let repo = SqliteCrmRepository::new(pool);
        let count = repo.count_candidates(&CandidateCriteria::default()).await.unwrap();
        assert_eq!(count, 2);

        let page = repo.find_candidates(&CandidateCriteria::default(), 10, 0).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 6]);
    }

    #[tokio::test]
    async fn test_find_candidates_pages_by_offset() {
        let pool = memory_pool().await;
        for id in 1..=5 {
            seed_contact(&pool, ContactSeed::individual(id)).await;
        }
        let repo = SqliteCrmRepository::new(pool);

        let page = repo.find_candidates(&CandidateCriteria::default(), 2, 2).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4]);

        let past_end = repo.find_candidates(&CandidateCriteria::default(), 2, 5).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_carries_primary_address_fields() {
        let pool = memory_pool().await;
        seed_contact(&pool, ContactSeed::individual(7)).await;
        sqlx::query("INSERT INTO civicrm_country (id, name, iso_code) VALUES (1152, 'Netherlands', 'NL')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO civicrm_address (contact_id, is_primary, street_address, postal_code, city, country_id)
             VALUES (7, 0, 'Old Road 9', '0000', 'Nowhere', NULL),
                    (7, 1, 'Keizersgracht 1', '1015 CJ', 'Amsterdam', 1152)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = SqliteCrmRepository::new(pool);
        let page = repo.find_candidates(&CandidateCriteria::default(), 10, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].postal_code.as_deref(), Some("1015 CJ"));
        assert_eq!(page[0].city.as_deref(), Some("Amsterdam"));
        assert_eq!(page[0].country.as_deref(), Some("NL"));
    }

    #[tokio::test]
    async fn test_inverted_range_matches_nothing() {
        let pool = memory_pool().await;
        seed_contact(&pool, ContactSeed::individual(150)).await;
        sqlx::query("INSERT INTO civicrm_email (contact_id, email, is_primary) VALUES (150, 'a@example.org', 1)")
            .execute(&pool)
            .await
            .unwrap();
        let repo = SqliteCrmRepository::new(pool);

        assert!(repo.emails_in_range(100, 100).await.unwrap().is_empty());
        assert_eq!(repo.emails_in_range(100, 200).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_survey_links_only_for_targets_of_survey_activities() {
        let pool = memory_pool().await;
        seed_contact(&pool, ContactSeed::individual(1)).await;
        sqlx::query(
            "INSERT INTO civicrm_campaign (id, name, external_identifier) VALUES (1, 'Oceans', 'CAMP-OCEAN');
             INSERT INTO civicrm_activity (id, activity_type_id, source_record_id, campaign_id) VALUES
                (10, 28, 501, 1),
                (11, 1, 502, 1),
                (12, 28, 503, NULL);
             INSERT INTO civicrm_activity_contact (activity_id, contact_id, record_type_id) VALUES
                (10, 1, 3),
                (11, 1, 3),
                (12, 1, 2);",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = SqliteCrmRepository::new(pool);
        let links = repo.survey_links_in_range(1, 1).await.unwrap();
        assert_eq!(
            links,
            vec![SurveyLinkRow {
                contact_id: 1,
                campaign_external_identifier: Some("CAMP-OCEAN".to_string()),
                survey_id: Some(501),
            }]
        );
    }
}
