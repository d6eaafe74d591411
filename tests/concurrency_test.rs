mod common;

use anyhow::Result;
use common::{Fixture, test_service};
use wasteledger::application::ErrorKind;
use wasteledger::domain::{Role, WithdrawalStatus, compute_all_balances};

const CONTENDERS: usize = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_cannot_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let mut handles = Vec::new();
    for _ in 0..CONTENDERS {
        let service = service.clone();
        let account_id = fx.user.id;
        handles.push(tokio::spawn(async move {
            service.create_withdrawal(account_id, 6000, None).await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::InsufficientBalance, "{}", err);
                insufficient += 1;
            }
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(insufficient, CONTENDERS - 1);
    assert_eq!(service.get_balance(fx.user.id).await?, 4000);
    assert!(service.check_integrity().await?.is_healthy());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_leave_one_pending() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let mut handles = Vec::new();
    for _ in 0..CONTENDERS {
        let service = service.clone();
        let account_id = fx.user.id;
        handles.push(tokio::spawn(async move {
            service.create_request(account_id, 1000, None).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::DuplicatePendingRequest, "{}", err),
        }
    }

    assert_eq!(created, 1);
    let pending = service
        .list_requests(Some(WithdrawalStatus::Pending))
        .await?;
    assert_eq!(pending.len(), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approval_and_withdrawal_settle_consistently() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;

    let request = service.create_request(fx.user.id, 7000, None).await?;

    let approver = {
        let service = service.clone();
        let admin_id = fx.admin.id;
        tokio::spawn(async move {
            service
                .process_request(
                    request.id,
                    wasteledger::RequestAction::Approved,
                    admin_id,
                    None,
                )
                .await
        })
    };
    let withdrawer = {
        let service = service.clone();
        let account_id = fx.user.id;
        tokio::spawn(async move { service.create_withdrawal(account_id, 7000, None).await })
    };

    let approved = approver.await?;
    let withdrawn = withdrawer.await?;

    // Exactly one of them gets the money
    assert!(approved.is_ok() != withdrawn.is_ok());
    assert_eq!(service.get_balance(fx.user.id).await?, 3000);

    let stored = service.get_request(request.id).await?;
    if approved.is_ok() {
        assert_eq!(stored.status, WithdrawalStatus::Approved);
    } else {
        assert_eq!(stored.status, WithdrawalStatus::Pending);
    }
    assert!(service.check_integrity().await?.is_healthy());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_accounts_all_succeed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;

    let mut accounts = Vec::new();
    for i in 0..CONTENDERS {
        let account = service
            .create_account(
                &format!("Member {}", i),
                &format!("member{}@example.com", i),
                Role::User,
            )
            .await?;
        accounts.push(account.id);
    }

    let mut handles = Vec::new();
    for account_id in accounts.iter().copied() {
        let service = service.clone();
        let items = fx.worth(2000);
        handles.push(tokio::spawn(async move {
            service.create_deposit(account_id, None, items).await?;
            service.create_withdrawal(account_id, 500, None).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let transactions: Vec<_> = service
        .list_all_transactions()
        .await?
        .into_iter()
        .map(|d| d.transaction)
        .collect();
    let ledger = compute_all_balances(&transactions);
    for account_id in accounts {
        assert_eq!(service.get_balance(account_id).await?, 1500);
        assert_eq!(ledger.get(&account_id).copied(), Some(1500));
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integrity_check_is_consistent_during_writes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 1000).await?;

    let writer = {
        let service = service.clone();
        let account_id = fx.user.id;
        let items = fx.worth(500);
        tokio::spawn(async move {
            for _ in 0..25 {
                service.create_deposit(account_id, None, items.clone()).await?;
                service.create_withdrawal(account_id, 300, None).await?;
            }
            Ok::<_, wasteledger::AppError>(())
        })
    };

    loop {
        let report = service.check_integrity().await?;
        assert!(report.is_healthy(), "{:?}", report.issues);
        if writer.is_finished() {
            break;
        }
    }
    writer.await??;

    assert_eq!(service.get_balance(fx.user.id).await?, 1000 + 25 * 200);
    assert!(service.check_integrity().await?.is_healthy());

    Ok(())
}
