mod common;

use anyhow::Result;
use common::{Fixture, test_service};
use wasteledger::application::{AppError, ErrorKind};
use wasteledger::domain::{RequestAction, Role, TransactionPatch, TransactionType, WithdrawalStatus};

#[tokio::test]
async fn test_request_moves_no_money_until_approved() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let request = service.create_request(fx.user.id, 5000, None).await?;
    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(request.description, "Withdrawal request - 50.00");
    assert!(request.transaction_id.is_none());
    assert!(request.processed_at.is_none());
    assert_eq!(service.get_balance(fx.user.id).await?, 10000);

    let processed = service
        .process_request(
            request.id,
            RequestAction::Approved,
            fx.admin.id,
            Some("Paid in cash".to_string()),
        )
        .await?;

    let transaction = processed.transaction.expect("approval creates a withdrawal");
    assert_eq!(transaction.transaction_type, TransactionType::Withdrawal);
    assert_eq!(transaction.total_amount, 5000);
    assert_eq!(transaction.account_id, fx.user.id);

    let stored = service.get_request(request.id).await?;
    assert_eq!(stored.status, WithdrawalStatus::Approved);
    assert_eq!(stored.transaction_id, Some(transaction.id));
    assert_eq!(stored.admin_id, Some(fx.admin.id));
    assert_eq!(stored.admin_note.as_deref(), Some("Paid in cash"));
    assert!(stored.processed_at.is_some());
    assert_eq!(service.get_balance(fx.user.id).await?, 5000);

    // Terminal: a second decision is refused
    let err = service
        .process_request(request.id, RequestAction::Rejected, fx.admin.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(service.get_balance(fx.user.id).await?, 5000);

    Ok(())
}

#[tokio::test]
async fn test_reject_has_no_balance_effect() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let request = service
        .create_request(fx.user.id, 3000, Some("New shoes".to_string()))
        .await?;
    assert_eq!(request.description, "New shoes");

    let processed = service
        .process_request(
            request.id,
            RequestAction::Rejected,
            fx.admin.id,
            Some("Come back next week".to_string()),
        )
        .await?;
    assert!(processed.transaction.is_none());
    assert_eq!(processed.request.status, WithdrawalStatus::Rejected);
    assert!(processed.request.transaction_id.is_none());
    assert_eq!(service.get_balance(fx.user.id).await?, 10000);
    assert_eq!(service.list_account_transactions(fx.user.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_approval_rechecks_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let request = service.create_request(fx.user.id, 8000, None).await?;
    // Balance moves after filing
    service.create_withdrawal(fx.user.id, 5000, None).await?;

    let err = service
        .process_request(request.id, RequestAction::Approved, fx.admin.id, None)
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientBalance {
            balance, required, ..
        } => {
            assert_eq!(balance, 5000);
            assert_eq!(required, 8000);
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    let stored = service.get_request(request.id).await?;
    assert_eq!(stored.status, WithdrawalStatus::Pending);
    assert!(stored.admin_id.is_none());
    assert!(stored.processed_at.is_none());
    assert_eq!(service.get_balance(fx.user.id).await?, 5000);

    Ok(())
}

#[tokio::test]
async fn test_request_creation_checks() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let err = service
        .create_request(fx.user.id, 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = service
        .create_request(fx.user.id, 10001, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);

    let first = service.create_request(fx.user.id, 2000, None).await?;
    let err = service
        .create_request(fx.user.id, 1000, None)
        .await
        .unwrap_err();
    match err {
        AppError::DuplicatePendingRequest {
            account_id,
            request_id,
        } => {
            assert_eq!(account_id, fx.user.id);
            assert_eq!(request_id, first.id);
        }
        other => panic!("expected DuplicatePendingRequest, got {:?}", other),
    }

    // Once the first is settled a new one may be filed
    service.cancel_request(first.id, fx.user.id).await?;
    service.create_request(fx.user.id, 1000, None).await?;

    Ok(())
}

#[tokio::test]
async fn test_cancel_rules() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;
    let request = service.create_request(fx.user.id, 2000, None).await?;

    let err = service
        .cancel_request(request.id, fx.admin.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let cancelled = service.cancel_request(request.id, fx.user.id).await?;
    assert_eq!(cancelled.status, WithdrawalStatus::Cancelled);
    assert!(cancelled.processed_at.is_some());
    assert_eq!(service.get_balance(fx.user.id).await?, 10000);

    let err = service
        .cancel_request(request.id, fx.user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = service
        .process_request(request.id, RequestAction::Approved, fx.admin.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    Ok(())
}

#[tokio::test]
async fn test_only_admins_process_requests() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;
    let request = service.create_request(fx.user.id, 2000, None).await?;

    let err = service
        .process_request(request.id, RequestAction::Approved, fx.user.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = service
        .process_request(
            uuid::Uuid::new_v4(),
            RequestAction::Approved,
            fx.admin.id,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(
        service.get_request(request.id).await?.status,
        WithdrawalStatus::Pending
    );

    Ok(())
}

#[tokio::test]
async fn test_approved_withdrawal_is_locked() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let request = service.create_request(fx.user.id, 4000, None).await?;
    let processed = service
        .process_request(request.id, RequestAction::Approved, fx.admin.id, None)
        .await?;
    let transaction_id = processed.transaction.unwrap().id;

    let err = service
        .delete_transaction(transaction_id, fx.admin.actor())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = service
        .edit_transaction(
            transaction_id,
            TransactionPatch::default().with_amount(1000),
            fx.admin.actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // The description is still editable
    service
        .edit_transaction(
            transaction_id,
            TransactionPatch::default().with_description("Paid at the counter"),
            fx.admin.actor(),
        )
        .await?;
    assert_eq!(service.get_balance(fx.user.id).await?, 6000);

    Ok(())
}

#[tokio::test]
async fn test_listing_and_stats() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    let bob = service
        .create_account("Bob", "bob@example.com", Role::User)
        .await?;
    fx.fund_user(&service, 20000).await?;
    service
        .create_deposit(bob.id, None, fx.worth(20000))
        .await?;

    let approved = service.create_request(fx.user.id, 5000, None).await?;
    service
        .process_request(approved.id, RequestAction::Approved, fx.admin.id, None)
        .await?;
    let rejected = service.create_request(fx.user.id, 1000, None).await?;
    service
        .process_request(rejected.id, RequestAction::Rejected, fx.admin.id, None)
        .await?;
    let pending = service.create_request(bob.id, 3000, None).await?;

    let queue = service.list_requests(None).await?;
    assert_eq!(queue.len(), 3);
    assert_eq!(queue[0].id, pending.id);

    let only_pending = service
        .list_requests(Some(WithdrawalStatus::Pending))
        .await?;
    assert_eq!(only_pending.len(), 1);

    let alice_requests = service.list_account_requests(fx.user.id).await?;
    assert_eq!(alice_requests.len(), 2);
    assert!(alice_requests.iter().all(|r| r.account_id == fx.user.id));

    let stats = service.request_stats().await?;
    assert_eq!(stats.by_status.len(), 4);
    assert_eq!(stats.total_count(), 3);
    let approved_stats = stats.get(WithdrawalStatus::Approved).unwrap();
    assert_eq!(approved_stats.count, 1);
    assert_eq!(approved_stats.total_amount, 5000);
    assert_eq!(stats.get(WithdrawalStatus::Pending).unwrap().total_amount, 3000);
    assert_eq!(stats.get(WithdrawalStatus::Cancelled).unwrap().count, 0);

    Ok(())
}
