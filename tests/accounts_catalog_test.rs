mod common;

use anyhow::Result;
use common::{Fixture, test_service};
use wasteledger::application::{AppError, ErrorKind, LedgerService};
use wasteledger::domain::{ItemInput, Role};
use wasteledger::io::Exporter;

#[tokio::test]
async fn test_create_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service
        .create_account("  Dana ", "dana@example.com", Role::User)
        .await?;
    assert_eq!(account.name, "Dana");
    assert_eq!(account.balance, 0);
    assert_eq!(account.account_number.len(), 10);
    assert!(account.account_number.chars().all(|c| c.is_ascii_digit()));

    let by_email = service.get_account_by_email("dana@example.com").await?;
    assert_eq!(by_email.id, account.id);

    let err = service
        .create_account("Dana Again", "dana@example.com", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));

    let err = service
        .create_account("No Email", "not-an-email", Role::User)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(service.list_accounts().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_catalog_crud() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let glass = service.create_category("Glass", 500).await?;
    assert_eq!(glass.price_per_kg, 500);

    let err = service.create_category("Glass", 700).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = service.create_category("Cans", -1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let updated = service
        .update_category(glass.id, Some("Clear glass".to_string()), None)
        .await?;
    assert_eq!(updated.name, "Clear glass");
    assert_eq!(updated.price_per_kg, 500);

    let err = service
        .update_category(glass.id, None, Some(-5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(service.list_categories().await?.len(), 1);

    let removed = service.delete_category(glass.id).await?;
    assert_eq!(removed.id, glass.id);
    assert!(matches!(
        service.get_category(glass.id).await.unwrap_err(),
        AppError::CategoryNotFound(_)
    ));

    Ok(())
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;

    service
        .create_deposit(fx.user.id, None, vec![ItemInput::new(fx.paper, 1000)])
        .await?;

    let err = service.delete_category(fx.paper).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    service.get_category(fx.paper).await?;

    Ok(())
}

#[tokio::test]
async fn test_integrity_check_reports_healthy_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 10000).await?;
    service.create_withdrawal(fx.user.id, 2500, None).await?;
    service.create_request(fx.user.id, 1000, None).await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "{:?}", report.issues);
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transaction_count, 2);
    assert_eq!(report.total_balance, 7500);

    Ok(())
}

#[tokio::test]
async fn test_reconnect_sees_committed_state() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let path = temp.path().join("ledger.db");
    let path = path.to_str().unwrap();

    let user_id = {
        let service = LedgerService::init(path).await?;
        let fx = Fixture::create(&service).await?;
        fx.fund_user(&service, 4200).await?;
        fx.user.id
    };

    let service = LedgerService::connect(path).await?;
    assert_eq!(service.get_balance(user_id).await?, 4200);
    assert_eq!(service.list_account_transactions(user_id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_export_transactions_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    service
        .create_deposit(
            fx.user.id,
            Some("Bottles".to_string()),
            vec![ItemInput::new(fx.plastic, 1500)],
        )
        .await?;
    service.create_withdrawal(fx.user.id, 1000, None).await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_transactions_csv(fx.user.id, &mut buffer)
        .await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,created_at,type,total_amount"));
    assert!(output.contains(",deposit,45.00,4500,1.5,1,Bottles"));
    assert!(output.contains(",withdrawal,10.00,1000,"));

    let mut buffer = Vec::new();
    let items = Exporter::new(&service)
        .export_items_csv(fx.user.id, &mut buffer)
        .await?;
    assert_eq!(items, 1);
    assert!(String::from_utf8(buffer)?.contains(",Plastic,1.5,45.00"));

    Ok(())
}

#[tokio::test]
async fn test_export_account_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.fund_user(&service, 3000).await?;
    service.create_request(fx.user.id, 1000, None).await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service)
        .export_account_json(fx.user.id, &mut buffer)
        .await?;
    assert_eq!(snapshot.transactions.len(), 1);
    assert_eq!(snapshot.requests.len(), 1);

    let value: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(value["account"]["balance"], 3000);
    assert_eq!(value["account"]["role"], "USER");
    assert_eq!(value["requests"][0]["status"], "PENDING");

    Ok(())
}
