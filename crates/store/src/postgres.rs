//! Postgres-backed voucher store.
//!
//! ## Atomicity
//!
//! Each create/update/delete runs as a single transaction. The legacy system
//! this replaces executed the statement sequence without a wrapping
//! transaction, so a failed line insert could leave an orphaned header; here
//! a failure at any point rolls the whole posting back.
//!
//! ## Number allocation
//!
//! The next sequence index is derived from `MAX(sequence_no)` over the
//! `(tenant scope, voucher type, fiscal year)` partition *inside* the posting
//! transaction. Two concurrent postings in the same partition can still
//! compute the same index; the unique key on
//! `(company_id, owner_type, owner_id, voucher_type, fiscal_year,
//! sequence_no)` makes one of them fail with a unique violation (code
//! `23505`), which is mapped to [`StoreError::Conflict`] and retried up to
//! [`MAX_ALLOCATION_RETRIES`] times with a fresh transaction.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Backend` |
//! | RowNotFound / PoolClosed / other | n/a | `Backend` |
//!
//! ## Schema
//!
//! Tables are pre-provisioned by the platform's migration tooling; this
//! store never alters them. Header/items table pairs per voucher family:
//! `sales_vouchers`/`sales_voucher_items` (also `sale_history`),
//! `purchase_vouchers`/`purchase_voucher_items`,
//! `payment_vouchers`/`payment_voucher_items`,
//! `receipt_vouchers`/`receipt_voucher_items`; all families mirror ledger
//! postings into `voucher_entries`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::sync::Arc;
use tracing::instrument;

use kosh_core::{
    FiscalYear, ItemLedgerId, PartyLedgerId, TenantScope, VoucherId,
};
use kosh_gst::GstKind;
use kosh_vouchers::{format_number, DispatchDetails, PostableVoucher, VoucherType};

use crate::error::{StoreError, StoreResult};
use crate::store::{
    derive_ledger_entries, derive_sale_history, CreatedVoucher, StoredLine, StoredVoucher,
    VoucherFilter, VoucherHeader, VoucherStore,
};

/// Bounded retries for number-allocation conflicts.
pub const MAX_ALLOCATION_RETRIES: u32 = 3;

const ENTRIES_TABLE: &str = "voucher_entries";
const HISTORY_TABLE: &str = "sale_history";

#[derive(Debug, Clone, Copy)]
struct Tables {
    header: &'static str,
    items: &'static str,
    writes_history: bool,
}

fn tables_for(voucher_type: VoucherType) -> Tables {
    match voucher_type {
        VoucherType::Sales | VoucherType::SalesOrder => Tables {
            header: "sales_vouchers",
            items: "sales_voucher_items",
            writes_history: true,
        },
        VoucherType::Purchase | VoucherType::PurchaseOrder => Tables {
            header: "purchase_vouchers",
            items: "purchase_voucher_items",
            writes_history: false,
        },
        VoucherType::Payment => Tables {
            header: "payment_vouchers",
            items: "payment_voucher_items",
            writes_history: false,
        },
        VoucherType::Receipt => Tables {
            header: "receipt_vouchers",
            items: "receipt_voucher_items",
            writes_history: false,
        },
    }
}

/// Production voucher store on Postgres.
///
/// Clone-cheap; all operations go through the shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresVoucherStore {
    pool: Arc<PgPool>,
}

impl PostgresVoucherStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn next_sequence(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        scope: &TenantScope,
        voucher_type: VoucherType,
        fiscal_year: FiscalYear,
    ) -> StoreResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(sequence_no), 0) AS current \
             FROM {} \
             WHERE company_id = $1 AND owner_type = $2 AND owner_id = $3 \
               AND voucher_type = $4 AND fiscal_year = $5",
            tables.header
        );
        let row = sqlx::query(&sql)
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .bind(fiscal_year.start_year())
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("next_sequence", e))?;

        let current: i64 = row
            .try_get("current")
            .map_err(|e| StoreError::backend(format!("failed to read sequence: {e}")))?;
        Ok(current + 1)
    }

    async fn insert_header(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        scope: &TenantScope,
        voucher_type: VoucherType,
        number: &str,
        sequence: i64,
        fiscal_year: FiscalYear,
        voucher: &PostableVoucher,
    ) -> StoreResult<VoucherId> {
        let dispatch = voucher.dispatch.clone().unwrap_or_default();
        let sql = format!(
            "INSERT INTO {} (\
                company_id, owner_type, owner_id, voucher_type, \
                voucher_number, sequence_no, fiscal_year, gst_type, \
                date, party_id, subtotal, cgst_total, sgst_total, igst_total, \
                discount_total, tds_total, total, narration, reference_no, \
                dispatch_doc_no, dispatch_through, dispatch_destination, \
                dispatch_approx_distance, is_quotation, sales_ledger_id, created_at\
             ) VALUES (\
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, NOW()\
             ) RETURNING id",
            tables.header
        );
        let row = sqlx::query(&sql)
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .bind(number)
            .bind(sequence)
            .bind(fiscal_year.start_year())
            .bind(voucher.kind.as_str())
            .bind(voucher.date)
            .bind(voucher.party_id.as_i64())
            .bind(voucher.subtotal)
            .bind(voucher.taxes.cgst)
            .bind(voucher.taxes.sgst)
            .bind(voucher.taxes.igst)
            .bind(voucher.discount_total)
            .bind(voucher.tds_total)
            .bind(voucher.total)
            .bind(voucher.narration.as_deref())
            .bind(voucher.reference_no.as_deref())
            .bind(dispatch.doc_no.as_deref())
            .bind(dispatch.through.as_deref())
            .bind(dispatch.destination.as_deref())
            .bind(dispatch.approx_distance)
            .bind(voucher.is_quotation)
            .bind(voucher.sales_ledger_id.map(|l| l.as_i64()))
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_header", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::backend(format!("failed to read inserted id: {e}")))?;
        Ok(VoucherId::new(id))
    }

    /// Batch-insert line items: one statement, one suspension point.
    async fn insert_lines(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        voucher_id: VoucherId,
        voucher: &PostableVoucher,
    ) -> StoreResult<()> {
        if voucher.entries.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (\
                voucher_id, item_id, ledger_id, quantity, rate, amount, \
                cgst_rate, sgst_rate, igst_rate, \
                cgst_ledger_id, sgst_ledger_id, igst_ledger_id) ",
            tables.items
        ));
        builder.push_values(&voucher.entries, |mut b, line| {
            b.push_bind(voucher_id.as_i64())
                .push_bind(line.item_id.map(|i| i.as_i64()))
                .push_bind(line.ledger_id.map(|l| l.as_i64()))
                .push_bind(line.quantity)
                .push_bind(line.rate)
                .push_bind(line.amount)
                .push_bind(line.cgst_rate)
                .push_bind(line.sgst_rate)
                .push_bind(line.igst_rate)
                .push_bind(line.cgst_ledger_id)
                .push_bind(line.sgst_ledger_id)
                .push_bind(line.igst_ledger_id);
        });

        builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_lines", e))?;
        Ok(())
    }

    async fn insert_derived_rows(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        scope: &TenantScope,
        voucher_type: VoucherType,
        number: &str,
        voucher: &PostableVoucher,
    ) -> StoreResult<()> {
        let entries = derive_ledger_entries(voucher_type, number, voucher);
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {ENTRIES_TABLE} (\
                company_id, owner_type, owner_id, voucher_type, \
                voucher_number, ledger_id, amount) "
        ));
        builder.push_values(&entries, |mut b, e| {
            b.push_bind(scope.company_id.as_i64())
                .push_bind(scope.owner_type.as_str())
                .push_bind(scope.owner_id.as_i64())
                .push_bind(e.voucher_type.tag())
                .push_bind(e.voucher_number.as_str())
                .push_bind(e.ledger_id)
                .push_bind(e.amount);
        });
        builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_voucher_entries", e))?;

        if tables.writes_history {
            let history = derive_sale_history(number, voucher);
            if !history.is_empty() {
                let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                    "INSERT INTO {HISTORY_TABLE} (\
                        company_id, owner_type, owner_id, voucher_number, \
                        item_id, quantity, rate, amount, date) "
                ));
                builder.push_values(&history, |mut b, h| {
                    b.push_bind(scope.company_id.as_i64())
                        .push_bind(scope.owner_type.as_str())
                        .push_bind(scope.owner_id.as_i64())
                        .push_bind(h.voucher_number.as_str())
                        .push_bind(h.item_id.as_i64())
                        .push_bind(h.quantity)
                        .push_bind(h.rate)
                        .push_bind(h.amount)
                        .push_bind(h.date);
                });
                builder
                    .build()
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("insert_sale_history", e))?;
            }
        }

        Ok(())
    }

    async fn delete_derived_rows(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        scope: &TenantScope,
        voucher_type: VoucherType,
        number: &str,
    ) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {ENTRIES_TABLE} \
             WHERE company_id = $1 AND owner_type = $2 AND owner_id = $3 \
               AND voucher_type = $4 AND voucher_number = $5"
        );
        sqlx::query(&sql)
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .bind(number)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_voucher_entries", e))?;

        if tables.writes_history {
            let sql = format!(
                "DELETE FROM {HISTORY_TABLE} \
                 WHERE company_id = $1 AND owner_type = $2 AND owner_id = $3 \
                   AND voucher_number = $4"
            );
            sqlx::query(&sql)
                .bind(scope.company_id.as_i64())
                .bind(scope.owner_type.as_str())
                .bind(scope.owner_id.as_i64())
                .bind(number)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("delete_sale_history", e))?;
        }

        Ok(())
    }

    async fn delete_lines(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        voucher_id: VoucherId,
    ) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE voucher_id = $1", tables.items);
        sqlx::query(&sql)
            .bind(voucher_id.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_lines", e))?;
        Ok(())
    }

    /// Load a header inside a transaction, row-locked for the write paths.
    async fn load_header_for_update(
        tx: &mut Transaction<'_, Postgres>,
        tables: Tables,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<Option<(String, i64, i32)>> {
        let sql = format!(
            "SELECT voucher_number, sequence_no, fiscal_year FROM {} \
             WHERE id = $1 AND company_id = $2 AND owner_type = $3 \
               AND owner_id = $4 AND voucher_type = $5 \
             FOR UPDATE",
            tables.header
        );
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("load_header_for_update", e))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let number: String = row
                    .try_get("voucher_number")
                    .map_err(|e| StoreError::backend(format!("failed to read number: {e}")))?;
                let sequence: i64 = row
                    .try_get("sequence_no")
                    .map_err(|e| StoreError::backend(format!("failed to read sequence: {e}")))?;
                let fiscal_year: i32 = row
                    .try_get("fiscal_year")
                    .map_err(|e| StoreError::backend(format!("failed to read fiscal year: {e}")))?;
                Ok(Some((number, sequence, fiscal_year)))
            }
        }
    }

    async fn create_once(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        voucher: &PostableVoucher,
    ) -> StoreResult<CreatedVoucher> {
        let tables = tables_for(voucher_type);
        let fiscal_year = FiscalYear::containing(voucher.date);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let sequence = Self::next_sequence(&mut tx, tables, scope, voucher_type, fiscal_year).await?;
        let number = format_number(voucher_type, sequence);

        let id = Self::insert_header(
            &mut tx,
            tables,
            scope,
            voucher_type,
            &number,
            sequence,
            fiscal_year,
            voucher,
        )
        .await?;
        Self::insert_lines(&mut tx, tables, id, voucher).await?;
        Self::insert_derived_rows(&mut tx, tables, scope, voucher_type, &number, voucher).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        Ok(CreatedVoucher {
            id,
            number,
            sequence,
            fiscal_year,
            kind: voucher.kind,
        })
    }
}

#[async_trait]
impl VoucherStore for PostgresVoucherStore {
    #[instrument(skip(self), fields(scope = %scope), err)]
    async fn company_state(&self, scope: &TenantScope) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT state FROM companies WHERE id = $1")
            .bind(scope.company_id.as_i64())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("company_state", e))?;
        Ok(row.and_then(|r| r.try_get::<Option<String>, _>("state").ok().flatten()))
    }

    #[instrument(skip(self), fields(scope = %scope, ledger = %ledger), err)]
    async fn ledger_state(
        &self,
        scope: &TenantScope,
        ledger: PartyLedgerId,
    ) -> StoreResult<Option<String>> {
        let row = sqlx::query(
            "SELECT state FROM ledgers \
             WHERE id = $1 AND company_id = $2 AND owner_type = $3 AND owner_id = $4",
        )
        .bind(ledger.as_i64())
        .bind(scope.company_id.as_i64())
        .bind(scope.owner_type.as_str())
        .bind(scope.owner_id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ledger_state", e))?;
        Ok(row.and_then(|r| r.try_get::<Option<String>, _>("state").ok().flatten()))
    }

    #[instrument(
        skip(self, voucher),
        fields(scope = %scope, voucher_type = %voucher_type, lines = voucher.entries.len()),
        err
    )]
    async fn create(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        voucher: PostableVoucher,
    ) -> StoreResult<CreatedVoucher> {
        let mut last_conflict = None;
        for attempt in 0..MAX_ALLOCATION_RETRIES {
            match self.create_once(scope, voucher_type, &voucher).await {
                Err(StoreError::Conflict(msg)) => {
                    tracing::debug!(attempt, %msg, "number allocation conflict, retrying");
                    last_conflict = Some(StoreError::Conflict(msg));
                }
                other => return other,
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            StoreError::conflict("voucher number allocation kept conflicting")
        }))
    }

    #[instrument(skip(self), fields(scope = %scope, voucher_type = %voucher_type), err)]
    async fn get(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<Option<StoredVoucher>> {
        let tables = tables_for(voucher_type);

        let sql = format!(
            "SELECT {HEADER_COLUMNS} FROM {} \
             WHERE id = $1 AND company_id = $2 AND owner_type = $3 \
               AND owner_id = $4 AND voucher_type = $5",
            tables.header
        );
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_header", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = header_from_row(&row)?;

        let sql = format!(
            "SELECT voucher_id, item_id, ledger_id, quantity, rate, amount, \
                    cgst_rate, sgst_rate, igst_rate, \
                    cgst_ledger_id, sgst_ledger_id, igst_ledger_id \
             FROM {} WHERE voucher_id = $1 ORDER BY id ASC",
            tables.items
        );
        let rows = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_lines", e))?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            lines.push(line_from_row(&row)?);
        }

        Ok(Some(StoredVoucher { header, lines }))
    }

    #[instrument(skip(self), fields(scope = %scope, voucher_type = %voucher_type), err)]
    async fn list(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        filter: VoucherFilter,
    ) -> StoreResult<Vec<VoucherHeader>> {
        let tables = tables_for(voucher_type);
        let (from, to) = filter.date_bounds();

        let sql = format!(
            "SELECT {HEADER_COLUMNS} FROM {} \
             WHERE company_id = $1 AND owner_type = $2 AND owner_id = $3 \
               AND voucher_type = $4 \
               AND ($5::date IS NULL OR date >= $5) \
               AND ($6::date IS NULL OR date <= $6) \
             ORDER BY date ASC, sequence_no ASC",
            tables.header
        );
        let rows = sqlx::query(&sql)
            .bind(scope.company_id.as_i64())
            .bind(scope.owner_type.as_str())
            .bind(scope.owner_id.as_i64())
            .bind(voucher_type.tag())
            .bind(from)
            .bind(to)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_headers", e))?;

        let mut headers = Vec::with_capacity(rows.len());
        for row in rows {
            headers.push(header_from_row(&row)?);
        }
        Ok(headers)
    }

    #[instrument(
        skip(self, voucher),
        fields(scope = %scope, voucher_type = %voucher_type, lines = voucher.entries.len()),
        err
    )]
    async fn update(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
        voucher: PostableVoucher,
    ) -> StoreResult<()> {
        let tables = tables_for(voucher_type);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let Some((number, _sequence, _fy)) =
            Self::load_header_for_update(&mut tx, tables, scope, voucher_type, id).await?
        else {
            return Err(StoreError::NotFound);
        };

        let dispatch = voucher.dispatch.clone().unwrap_or_default();
        let sql = format!(
            "UPDATE {} SET \
                gst_type = $1, date = $2, party_id = $3, subtotal = $4, \
                cgst_total = $5, sgst_total = $6, igst_total = $7, \
                discount_total = $8, tds_total = $9, total = $10, \
                narration = $11, reference_no = $12, \
                dispatch_doc_no = $13, dispatch_through = $14, \
                dispatch_destination = $15, dispatch_approx_distance = $16, \
                is_quotation = $17, sales_ledger_id = $18 \
             WHERE id = $19",
            tables.header
        );
        sqlx::query(&sql)
            .bind(voucher.kind.as_str())
            .bind(voucher.date)
            .bind(voucher.party_id.as_i64())
            .bind(voucher.subtotal)
            .bind(voucher.taxes.cgst)
            .bind(voucher.taxes.sgst)
            .bind(voucher.taxes.igst)
            .bind(voucher.discount_total)
            .bind(voucher.tds_total)
            .bind(voucher.total)
            .bind(voucher.narration.as_deref())
            .bind(voucher.reference_no.as_deref())
            .bind(dispatch.doc_no.as_deref())
            .bind(dispatch.through.as_deref())
            .bind(dispatch.destination.as_deref())
            .bind(dispatch.approx_distance)
            .bind(voucher.is_quotation)
            .bind(voucher.sales_ledger_id.map(|l| l.as_i64()))
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_header", e))?;

        // Full replace, not a diff: simpler and leaves no dangling rows.
        Self::delete_lines(&mut tx, tables, id).await?;
        Self::delete_derived_rows(&mut tx, tables, scope, voucher_type, &number).await?;
        Self::insert_lines(&mut tx, tables, id, &voucher).await?;
        Self::insert_derived_rows(&mut tx, tables, scope, voucher_type, &number, &voucher).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(scope = %scope, voucher_type = %voucher_type), err)]
    async fn delete(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> StoreResult<()> {
        let tables = tables_for(voucher_type);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let Some((number, _sequence, _fy)) =
            Self::load_header_for_update(&mut tx, tables, scope, voucher_type, id).await?
        else {
            return Err(StoreError::NotFound);
        };

        // Children first, header last, to respect foreign-key ordering.
        Self::delete_lines(&mut tx, tables, id).await?;
        Self::delete_derived_rows(&mut tx, tables, scope, voucher_type, &number).await?;

        let sql = format!("DELETE FROM {} WHERE id = $1", tables.header);
        sqlx::query(&sql)
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_header", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }
}

const HEADER_COLUMNS: &str = "id, voucher_type, voucher_number, sequence_no, fiscal_year, \
     gst_type, date, party_id, subtotal, cgst_total, sgst_total, igst_total, \
     discount_total, tds_total, total, narration, reference_no, \
     dispatch_doc_no, dispatch_through, dispatch_destination, \
     dispatch_approx_distance, is_quotation, sales_ledger_id, created_at";

fn header_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<VoucherHeader> {
    let read = |e: sqlx::Error| StoreError::backend(format!("failed to read header row: {e}"));

    let voucher_type: String = row.try_get("voucher_type").map_err(read)?;
    let voucher_type = voucher_type
        .parse()
        .map_err(|e| StoreError::backend(format!("bad voucher_type column: {e}")))?;

    let gst_type: String = row.try_get("gst_type").map_err(read)?;
    let kind = match gst_type.as_str() {
        "intra" => GstKind::Intra,
        "inter" => GstKind::Inter,
        other => {
            return Err(StoreError::backend(format!("bad gst_type column: {other}")));
        }
    };

    let read = |e: sqlx::Error| StoreError::backend(format!("failed to read header row: {e}"));
    let doc_no: Option<String> = row.try_get("dispatch_doc_no").map_err(read)?;
    let through: Option<String> = row.try_get("dispatch_through").map_err(read)?;
    let destination: Option<String> = row.try_get("dispatch_destination").map_err(read)?;
    let approx_distance: Option<i64> = row.try_get("dispatch_approx_distance").map_err(read)?;
    let dispatch = if doc_no.is_some()
        || through.is_some()
        || destination.is_some()
        || approx_distance.is_some()
    {
        Some(DispatchDetails {
            doc_no,
            through,
            destination,
            approx_distance,
        })
    } else {
        None
    };

    let fiscal_start: i32 = row.try_get("fiscal_year").map_err(read)?;
    let date: NaiveDate = row.try_get("date").map_err(read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;

    Ok(VoucherHeader {
        id: VoucherId::new(row.try_get("id").map_err(read)?),
        voucher_type,
        number: row.try_get("voucher_number").map_err(read)?,
        sequence: row.try_get("sequence_no").map_err(read)?,
        fiscal_year: FiscalYear::containing(
            // fiscal_year stores the start year; any date in April of it maps back.
            NaiveDate::from_ymd_opt(fiscal_start, 4, 1)
                .ok_or_else(|| StoreError::backend("bad fiscal_year column"))?,
        ),
        kind,
        date,
        party_id: PartyLedgerId::new(row.try_get("party_id").map_err(read)?),
        subtotal: row.try_get("subtotal").map_err(read)?,
        cgst_total: row.try_get("cgst_total").map_err(read)?,
        sgst_total: row.try_get("sgst_total").map_err(read)?,
        igst_total: row.try_get("igst_total").map_err(read)?,
        discount_total: row.try_get("discount_total").map_err(read)?,
        tds_total: row.try_get("tds_total").map_err(read)?,
        total: row.try_get("total").map_err(read)?,
        narration: row.try_get("narration").map_err(read)?,
        reference_no: row.try_get("reference_no").map_err(read)?,
        dispatch,
        is_quotation: row.try_get("is_quotation").map_err(read)?,
        sales_ledger_id: row
            .try_get::<Option<i64>, _>("sales_ledger_id")
            .map_err(read)?
            .map(ItemLedgerId::new),
        created_at,
    })
}

fn line_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<StoredLine> {
    let read = |e: sqlx::Error| StoreError::backend(format!("failed to read line row: {e}"));
    Ok(StoredLine {
        voucher_id: VoucherId::new(row.try_get("voucher_id").map_err(read)?),
        item_id: row
            .try_get::<Option<i64>, _>("item_id")
            .map_err(read)?
            .map(ItemLedgerId::new),
        ledger_id: row
            .try_get::<Option<i64>, _>("ledger_id")
            .map_err(read)?
            .map(ItemLedgerId::new),
        quantity: row.try_get("quantity").map_err(read)?,
        rate: row.try_get("rate").map_err(read)?,
        amount: row.try_get("amount").map_err(read)?,
        cgst_rate: row.try_get("cgst_rate").map_err(read)?,
        sgst_rate: row.try_get("sgst_rate").map_err(read)?,
        igst_rate: row.try_get("igst_rate").map_err(read)?,
        cgst_ledger_id: row.try_get("cgst_ledger_id").map_err(read)?,
        sgst_ledger_id: row.try_get("sgst_ledger_id").map_err(read)?,
        igst_ledger_id: row.try_get("igst_ledger_id").map_err(read)?,
    })
}

/// Map SQLx errors to `StoreError`, treating unique violations as conflicts.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                StoreError::Conflict(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}
