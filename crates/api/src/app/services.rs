//! Posting orchestration: validate → classify → persist.

use std::sync::Arc;

use thiserror::Error;

use kosh_core::{DomainError, PartyLedgerId, TenantScope, VoucherId};
use kosh_gst::GstKind;
use kosh_store::{
    CreatedVoucher, StoreError, StoredVoucher, VoucherFilter, VoucherHeader, VoucherStore,
};
use kosh_vouchers::{VoucherDraft, VoucherType};

/// Error from the posting orchestration: either a domain rejection
/// (detected before any storage work) or a persistence failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Services shared by the route handlers.
pub struct AppServices {
    store: Arc<dyn VoucherStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn VoucherStore>) -> Self {
        Self { store }
    }

    /// Classify GST applicability for `party` within `scope`.
    ///
    /// A missing company or party state is treated as blank and fails open
    /// to inter-state, per the classifier contract.
    async fn classify(
        &self,
        scope: &TenantScope,
        party: PartyLedgerId,
    ) -> Result<GstKind, ServiceError> {
        let company_state = self.store.company_state(scope).await?.unwrap_or_default();
        let party_state = self.store.ledger_state(scope, party).await?.unwrap_or_default();
        Ok(kosh_gst::classify(&company_state, &party_state))
    }

    /// Create a voucher: validate the draft, classify, persist atomically.
    pub async fn post_voucher(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        draft: VoucherDraft,
    ) -> Result<CreatedVoucher, ServiceError> {
        let draft = draft.validated(voucher_type)?;
        let kind = self.classify(scope, draft.party_id).await?;
        let voucher = draft.classified(kind);

        tracing::debug!(
            %scope,
            %voucher_type,
            gst = %kind,
            lines = voucher.entries.len(),
            "posting voucher"
        );
        Ok(self.store.create(scope, voucher_type, voucher).await?)
    }

    /// Update a voucher: re-validate and re-classify against the new
    /// payload, then fully replace lines and derived rows.
    pub async fn update_voucher(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
        draft: VoucherDraft,
    ) -> Result<(), ServiceError> {
        let draft = draft.validated(voucher_type)?;
        let kind = self.classify(scope, draft.party_id).await?;
        let voucher = draft.classified(kind);
        Ok(self.store.update(scope, voucher_type, id, voucher).await?)
    }

    pub async fn get_voucher(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> Result<Option<StoredVoucher>, ServiceError> {
        Ok(self.store.get(scope, voucher_type, id).await?)
    }

    pub async fn list_vouchers(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        filter: VoucherFilter,
    ) -> Result<Vec<VoucherHeader>, ServiceError> {
        Ok(self.store.list(scope, voucher_type, filter).await?)
    }

    pub async fn delete_voucher(
        &self,
        scope: &TenantScope,
        voucher_type: VoucherType,
        id: VoucherId,
    ) -> Result<(), ServiceError> {
        Ok(self.store.delete(scope, voucher_type, id).await?)
    }
}
