//! Admin-gated withdrawal requests.
//!
//! Filing a request only records intent. The balance is checked when the
//! request is filed and again on approval, because it may have moved in
//! between; the second check runs in the same unit of work that debits it.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{
    AccountId, Cents, RequestAction, Transaction, WithdrawalEvent, WithdrawalRequest,
    WithdrawalRequestId, WithdrawalStatus,
};

use super::engine;
use super::service::log_rejection;
use super::{AppError, LedgerService};

/// A processed request and, on approval, the withdrawal it produced.
#[derive(Debug)]
pub struct ProcessedRequest {
    pub request: WithdrawalRequest,
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub status: WithdrawalStatus,
    pub count: i64,
    pub total_amount: Cents,
}

/// Request counts and amounts per status. Every status is present.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub by_status: Vec<StatusSummary>,
}

impl RequestStats {
    pub fn get(&self, status: WithdrawalStatus) -> Option<&StatusSummary> {
        self.by_status.iter().find(|s| s.status == status)
    }

    pub fn total_count(&self) -> i64 {
        self.by_status.iter().map(|s| s.count).sum()
    }
}

impl LedgerService {
    #[instrument(skip(self, description))]
    pub async fn create_request(
        &self,
        account_id: AccountId,
        amount: Cents,
        description: Option<String>,
    ) -> Result<WithdrawalRequest, AppError> {
        self.policy().check_withdrawal_amount(amount)?;

        let request = self
            .repo()
            .unit_of_work(move |uow| {
                Box::pin(async move {
                    let balance = engine::current_balance(uow, account_id).await?;
                    if balance < amount {
                        return Err(AppError::InsufficientBalance {
                            account_id,
                            balance,
                            required: amount,
                        });
                    }
                    if let Some(existing) = uow.pending_request(account_id).await? {
                        return Err(AppError::DuplicatePendingRequest {
                            account_id,
                            request_id: existing.id,
                        });
                    }

                    let request = WithdrawalRequest::new(account_id, amount, description);
                    uow.insert_request(&request).await?;
                    Ok(request)
                })
            })
            .await
            .inspect_err(log_rejection("create_request"))?;

        info!(request_id = %request.id, amount, "withdrawal request filed");
        Ok(request)
    }

    /// Approve or reject a pending request. Approval debits the account in
    /// the same unit of work; if the balance no longer covers the amount,
    /// nothing changes and the request stays pending.
    #[instrument(skip(self, admin_note))]
    pub async fn process_request(
        &self,
        request_id: WithdrawalRequestId,
        action: RequestAction,
        admin_id: AccountId,
        admin_note: Option<String>,
    ) -> Result<ProcessedRequest, AppError> {
        let processed = self
            .repo()
            .unit_of_work(move |uow| {
                Box::pin(async move {
                    let admin = uow
                        .account(admin_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Account", admin_id))?;
                    if !admin.is_admin() {
                        return Err(AppError::Unauthorized(format!(
                            "account {} is not an admin",
                            admin_id
                        )));
                    }

                    let mut request = uow
                        .request(request_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Withdrawal request", request_id))?;
                    request.apply(action.event(), Utc::now())?;
                    request.admin_id = Some(admin_id);
                    request.admin_note = admin_note;

                    let transaction = match action {
                        RequestAction::Approved => {
                            let transaction = engine::record_withdrawal(
                                uow,
                                request.account_id,
                                request.amount,
                                Some(request.description.clone()),
                            )
                            .await?;
                            request.transaction_id = Some(transaction.id);
                            Some(transaction)
                        }
                        RequestAction::Rejected => None,
                    };

                    uow.update_request(&request).await?;
                    Ok(ProcessedRequest {
                        request,
                        transaction,
                    })
                })
            })
            .await
            .inspect_err(log_rejection("process_request"))?;

        info!(
            request_id = %request_id,
            status = processed.request.status.as_str(),
            "withdrawal request processed"
        );
        Ok(processed)
    }

    /// Withdraw a pending request. Only the account that filed it may do so.
    #[instrument(skip(self))]
    pub async fn cancel_request(
        &self,
        request_id: WithdrawalRequestId,
        account_id: AccountId,
    ) -> Result<WithdrawalRequest, AppError> {
        let request = self
            .repo()
            .unit_of_work(move |uow| {
                Box::pin(async move {
                    let mut request = uow
                        .request(request_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Withdrawal request", request_id))?;
                    if request.account_id != account_id {
                        return Err(AppError::Unauthorized(format!(
                            "request {} belongs to another account",
                            request_id
                        )));
                    }
                    request.apply(WithdrawalEvent::Cancel, Utc::now())?;
                    uow.update_request(&request).await?;
                    Ok(request)
                })
            })
            .await
            .inspect_err(log_rejection("cancel_request"))?;

        info!(request_id = %request_id, "withdrawal request cancelled");
        Ok(request)
    }

    pub async fn get_request(
        &self,
        request_id: WithdrawalRequestId,
    ) -> Result<WithdrawalRequest, AppError> {
        self.repo()
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Withdrawal request", request_id))
    }

    /// An account's requests, newest first.
    pub async fn list_account_requests(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<WithdrawalRequest>, AppError> {
        self.get_account(account_id).await?;
        Ok(self.repo().list_requests_for_account(account_id).await?)
    }

    /// Admin queue: pending requests first, optionally filtered by status.
    pub async fn list_requests(
        &self,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<WithdrawalRequest>, AppError> {
        Ok(self.repo().list_requests(status).await?)
    }

    pub async fn request_stats(&self) -> Result<RequestStats, AppError> {
        let aggregates = self.repo().request_stats().await?;

        let by_status = WithdrawalStatus::ALL
            .into_iter()
            .map(|status| {
                aggregates
                    .iter()
                    .find(|a| a.status == status)
                    .map(|a| StatusSummary {
                        status,
                        count: a.count,
                        total_amount: a.total_amount,
                    })
                    .unwrap_or(StatusSummary {
                        status,
                        count: 0,
                        total_amount: 0,
                    })
            })
            .collect();

        Ok(RequestStats { by_status })
    }
}
