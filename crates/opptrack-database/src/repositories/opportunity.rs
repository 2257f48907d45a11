//! Opportunity repository implementation.
//!
//! All writes here either complete fully or not at all: multi-statement
//! operations (create with countries, submit with partners, transfer)
//! run inside a single transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::opportunity::{Opportunity, OpportunityStatus};

const INSERT_COLUMNS: &str = "id, ref_no, title, opp_type, status, funding_agency_id, client_id, \
     lead_unit_id, lead_institute_id, proposal_lead_id, parent_id, due_date, clarification_date, \
     intent_bid_date, submission_date, result_date, duration_months, submission_validity_days, \
     currency, proposal_amount, net_amount, notes, result_note, created_by, updated_by, \
     created_at, updated_at";

/// Repository for opportunity CRUD, transfer, and digest queries.
#[derive(Debug, Clone)]
pub struct OpportunityRepository {
    pool: PgPool,
}

impl OpportunityRepository {
    /// Create a new opportunity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an opportunity by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Opportunity>> {
        sqlx::query_as::<_, Opportunity>("SELECT * FROM opportunities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find opportunity", e))
    }

    /// Find an opportunity by its reference number.
    pub async fn find_by_ref_no(&self, ref_no: &str) -> AppResult<Option<Opportunity>> {
        sqlx::query_as::<_, Opportunity>("SELECT * FROM opportunities WHERE ref_no = $1")
            .bind(ref_no)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find opportunity", e))
    }

    /// Insert a new opportunity together with its target country rows.
    pub async fn create(&self, opp: &Opportunity, countries: &[String]) -> AppResult<()> {
        let mut tx = self.begin().await?;
        insert_opportunity(&mut tx, opp).await?;
        replace_countries(&mut tx, opp.id, countries).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit create", e))
    }

    /// Write back a fully merged opportunity row.
    ///
    /// `ref_no`, `created_by`, and `created_at` are deliberately absent
    /// from the column list: the stored values survive any update. When
    /// `countries` or `partners` is given, the join-table rows are
    /// replaced in the same transaction.
    pub async fn update(
        &self,
        opp: &Opportunity,
        countries: Option<&[String]>,
        partners: Option<&[Uuid]>,
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "UPDATE opportunities SET title = $2, opp_type = $3, status = $4, \
             funding_agency_id = $5, client_id = $6, lead_unit_id = $7, lead_institute_id = $8, \
             proposal_lead_id = $9, due_date = $10, clarification_date = $11, \
             intent_bid_date = $12, submission_date = $13, result_date = $14, \
             duration_months = $15, submission_validity_days = $16, currency = $17, \
             proposal_amount = $18, net_amount = $19, notes = $20, result_note = $21, \
             updated_by = $22, updated_at = $23 \
             WHERE id = $1",
        )
        .bind(opp.id)
        .bind(&opp.title)
        .bind(opp.opp_type)
        .bind(opp.status)
        .bind(opp.funding_agency_id)
        .bind(opp.client_id)
        .bind(opp.lead_unit_id)
        .bind(opp.lead_institute_id)
        .bind(opp.proposal_lead_id)
        .bind(opp.due_date)
        .bind(opp.clarification_date)
        .bind(opp.intent_bid_date)
        .bind(opp.submission_date)
        .bind(opp.result_date)
        .bind(opp.duration_months)
        .bind(opp.submission_validity_days)
        .bind(&opp.currency)
        .bind(opp.proposal_amount)
        .bind(opp.net_amount)
        .bind(&opp.notes)
        .bind(&opp.result_note)
        .bind(opp.updated_by)
        .bind(opp.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update opportunity", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Opportunity {} does not exist",
                opp.id
            )));
        }

        if let Some(countries) = countries {
            replace_countries(&mut tx, opp.id, countries).await?;
        }
        if let Some(partners) = partners {
            replace_partners(&mut tx, opp.id, partners).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit update", e))
    }

    /// Atomically create the transfer child and mark the parent Transferred.
    ///
    /// Both writes commit together or neither does; a partial transfer is
    /// an invariant violation.
    pub async fn transfer(
        &self,
        parent_id: Uuid,
        child: &Opportunity,
        actor_id: Uuid,
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;

        insert_opportunity(&mut tx, child).await?;

        let result = sqlx::query(
            "UPDATE opportunities SET status = $2, updated_by = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(parent_id)
        .bind(OpportunityStatus::TransferredToRfp)
        .bind(actor_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark parent transferred", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Opportunity {parent_id} does not exist"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transfer", e))
    }

    /// The RFP child created by transferring the given opportunity, if any.
    pub async fn find_transferred_child(&self, parent_id: Uuid) -> AppResult<Option<Opportunity>> {
        sqlx::query_as::<_, Opportunity>(
            "SELECT * FROM opportunities WHERE parent_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find transfer child", e))
    }

    /// Opportunities created since `cutoff` and still in Entered status,
    /// newest first. Feeds the periodic digest.
    pub async fn find_recent_entered(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Opportunity>> {
        sqlx::query_as::<_, Opportunity>(
            "SELECT * FROM opportunities WHERE created_at >= $1 AND status = $2 \
             ORDER BY created_at DESC",
        )
        .bind(cutoff)
        .bind(OpportunityStatus::Entered)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list recent opportunities", e)
        })
    }

    /// Target country codes for an opportunity.
    pub async fn countries(&self, opportunity_id: Uuid) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT country_code FROM opportunity_countries WHERE opportunity_id = $1 \
             ORDER BY country_code",
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list countries", e))
    }

    /// Partner institute IDs for an opportunity.
    pub async fn partners(&self, opportunity_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT institute_id FROM opportunity_partners WHERE opportunity_id = $1",
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list partners", e))
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
    }
}

async fn insert_opportunity(
    tx: &mut Transaction<'static, Postgres>,
    opp: &Opportunity,
) -> AppResult<()> {
    sqlx::query(&format!(
        "INSERT INTO opportunities ({INSERT_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
          $19, $20, $21, $22, $23, $24, $25, $26, $27)"
    ))
    .bind(opp.id)
    .bind(&opp.ref_no)
    .bind(&opp.title)
    .bind(opp.opp_type)
    .bind(opp.status)
    .bind(opp.funding_agency_id)
    .bind(opp.client_id)
    .bind(opp.lead_unit_id)
    .bind(opp.lead_institute_id)
    .bind(opp.proposal_lead_id)
    .bind(opp.parent_id)
    .bind(opp.due_date)
    .bind(opp.clarification_date)
    .bind(opp.intent_bid_date)
    .bind(opp.submission_date)
    .bind(opp.result_date)
    .bind(opp.duration_months)
    .bind(opp.submission_validity_days)
    .bind(&opp.currency)
    .bind(opp.proposal_amount)
    .bind(opp.net_amount)
    .bind(&opp.notes)
    .bind(&opp.result_note)
    .bind(opp.created_by)
    .bind(opp.updated_by)
    .bind(opp.created_at)
    .bind(opp.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::conflict(format!("Reference number '{}' already exists", opp.ref_no))
        } else {
            AppError::with_source(ErrorKind::Database, "Failed to insert opportunity", e)
        }
    })?;
    Ok(())
}

async fn replace_countries(
    tx: &mut Transaction<'static, Postgres>,
    opportunity_id: Uuid,
    countries: &[String],
) -> AppResult<()> {
    sqlx::query("DELETE FROM opportunity_countries WHERE opportunity_id = $1")
        .bind(opportunity_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear countries", e))?;

    for code in countries {
        sqlx::query(
            "INSERT INTO opportunity_countries (opportunity_id, country_code) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(opportunity_id)
        .bind(code)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert country", e))?;
    }
    Ok(())
}

async fn replace_partners(
    tx: &mut Transaction<'static, Postgres>,
    opportunity_id: Uuid,
    partners: &[Uuid],
) -> AppResult<()> {
    sqlx::query("DELETE FROM opportunity_partners WHERE opportunity_id = $1")
        .bind(opportunity_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear partners", e))?;

    for institute_id in partners {
        sqlx::query(
            "INSERT INTO opportunity_partners (opportunity_id, institute_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(opportunity_id)
        .bind(institute_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert partner", e))?;
    }
    Ok(())
}
