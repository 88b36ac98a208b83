use fundledger::config::{CommissionConfig, SettlementConfig};
use fundledger::db::init_db;
use fundledger::domain::{Decision, NewProject, Project};
use fundledger::{
    CallerContext, CommissionType, Decimal, InvestmentEngine, LedgerAuditor, LedgerError,
    ProjectFundingTracker, ProjectStatus, RepaymentDistributor, Repository, TransactionType,
    UserId, WalletService,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Ledger {
    repo: Arc<Repository>,
    wallets: WalletService,
    tracker: ProjectFundingTracker,
    engine: InvestmentEngine,
    distributor: RepaymentDistributor,
    auditor: LedgerAuditor,
    _temp: TempDir,
}

async fn setup_ledger() -> Ledger {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let commission = CommissionConfig::default();
    let settlement = SettlementConfig::default();
    let tracker = ProjectFundingTracker::new(repo.clone(), commission, settlement.currency_scale);

    Ledger {
        wallets: WalletService::new(repo.clone(), settlement),
        engine: InvestmentEngine::new(repo.clone(), tracker.clone(), settlement),
        distributor: RepaymentDistributor::new(
            repo.clone(),
            tracker.clone(),
            commission,
            settlement,
        ),
        auditor: LedgerAuditor::new(repo.clone()),
        tracker,
        repo,
        _temp: temp_dir,
    }
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

async fn approved_project(ledger: &Ledger, requested: &str) -> Project {
    let project = ledger
        .tracker
        .create_project(
            &CallerContext::business("acme"),
            NewProject {
                title: "Warehouse expansion".into(),
                description: "Racking and a forklift".into(),
                amount_requested: d(requested),
                duration: 18,
                expected_roi: d("10"),
            },
        )
        .await
        .unwrap();
    ledger
        .tracker
        .approve(&CallerContext::admin("ops"), &project.id, Decision::Approve, None)
        .await
        .unwrap()
}

async fn investor_with(ledger: &Ledger, id: &str, balance: &str) -> CallerContext {
    let caller = CallerContext::investor(id);
    ledger.wallets.open_wallet(&caller.user_id).await.unwrap();
    ledger.wallets.deposit(&caller, d(balance)).await.unwrap();
    caller
}

#[tokio::test]
async fn test_debit_to_zero_then_insufficient_funds() {
    let ledger = setup_ledger().await;
    let owner = UserId::new("alice");
    ledger.wallets.open_wallet(&owner).await.unwrap();
    ledger
        .wallets
        .credit(&owner, d("500"), TransactionType::Deposit, "Top up", None)
        .await
        .unwrap();

    ledger
        .wallets
        .debit(&owner, d("500"), TransactionType::Investment, "All in", None)
        .await
        .unwrap();
    assert_eq!(ledger.wallets.get_balance(&owner).await.unwrap(), Decimal::zero());

    let err = ledger
        .wallets
        .debit(&owner, d("1"), TransactionType::Investment, "One more", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(ledger.wallets.get_balance(&owner).await.unwrap(), Decimal::zero());
    assert!(ledger.auditor.audit().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_final_investment_funds_project() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let early = investor_with(&ledger, "early", "900").await;
    let late = investor_with(&ledger, "late", "100").await;

    ledger.engine.invest(&early, &project.id, d("900")).await.unwrap();
    let summary = ledger.engine.invest(&late, &project.id, d("100")).await.unwrap();
    assert_eq!(summary.project_status, ProjectStatus::Funded);

    let funded = ledger.tracker.project(&project.id).await.unwrap();
    assert_eq!(funded.amount_raised, d("1000"));
    assert_eq!(funded.status, ProjectStatus::Funded);
    assert!(funded.funded_at.is_some());
}

#[tokio::test]
async fn test_over_capacity_investment_changes_nothing() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let early = investor_with(&ledger, "early", "900").await;
    let greedy = investor_with(&ledger, "greedy", "500").await;

    ledger.engine.invest(&early, &project.id, d("900")).await.unwrap();
    let err = ledger
        .engine
        .invest(&greedy, &project.id, d("150"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CapacityExceeded { .. }));

    assert_eq!(
        ledger.tracker.project(&project.id).await.unwrap().amount_raised,
        d("900")
    );
    assert_eq!(ledger.wallets.get_balance(&greedy.user_id).await.unwrap(), d("500"));
    assert!(ledger
        .repo
        .investment_for(&greedy.user_id, &project.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_profitable_repayment_end_to_end() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let a = investor_with(&ledger, "a", "300").await;
    let b = investor_with(&ledger, "b", "700").await;
    ledger.engine.invest(&a, &project.id, d("300")).await.unwrap();
    ledger.engine.invest(&b, &project.id, d("700")).await.unwrap();

    let report = ledger
        .distributor
        .distribute_repayment(&CallerContext::admin("ops"), &project.id, d("1300"))
        .await
        .unwrap();
    assert!(report.completed);
    assert_eq!(report.profit, d("300"));

    let a_return = ledger.repo.investment_for(&a.user_id, &project.id).await.unwrap().unwrap();
    let b_return = ledger.repo.investment_for(&b.user_id, &project.id).await.unwrap().unwrap();
    assert_eq!(a_return.actual_return, Some(d("90")));
    assert_eq!(b_return.actual_return, Some(d("210")));
    assert!(!a_return.is_active && !b_return.is_active);
    assert!(a_return.repaid_at.is_some());

    assert_eq!(ledger.wallets.get_balance(&a.user_id).await.unwrap(), d("390"));
    assert_eq!(ledger.wallets.get_balance(&b.user_id).await.unwrap(), d("910"));

    let booked = ledger.tracker.commissions(&project.id).await.unwrap();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].commission_type, CommissionType::Profit);
    assert_eq!(booked[0].amount, d("15"));
    assert_eq!(booked[0].percentage, d("5"));

    let repaid = ledger.tracker.project(&project.id).await.unwrap();
    assert_eq!(repaid.status, ProjectStatus::Repaid);
    assert!(ledger.auditor.audit().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_break_even_repayment_books_no_commission() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let a = investor_with(&ledger, "a", "1000").await;
    ledger.engine.invest(&a, &project.id, d("1000")).await.unwrap();

    let report = ledger
        .distributor
        .distribute_repayment(&CallerContext::admin("ops"), &project.id, d("1000"))
        .await
        .unwrap();
    assert!(report.completed);
    assert!(report.commission.is_none());
    assert_eq!(report.paid[0].actual_return, Decimal::zero());
    assert!(ledger.tracker.commissions(&project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_investments_respect_capacity() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;

    let mut callers = Vec::new();
    for i in 0..6 {
        callers.push(investor_with(&ledger, &format!("inv{}", i), "600").await);
    }

    let tasks: Vec<_> = callers
        .into_iter()
        .map(|caller| {
            let engine = ledger.engine.clone();
            let project_id = project.id.clone();
            tokio::spawn(async move { engine.invest(&caller, &project_id, d("600")).await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let over = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(LedgerError::CapacityExceeded { .. }))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(over, 5);

    let project = ledger.tracker.project(&project.id).await.unwrap();
    assert_eq!(project.amount_raised, d("600"));
    assert!(ledger.auditor.audit().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_duplicate_investment_leaves_balance() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let a = investor_with(&ledger, "a", "500").await;

    ledger.engine.invest(&a, &project.id, d("200")).await.unwrap();
    let err = ledger
        .engine
        .invest(&a, &project.id, d("200"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateInvestment { .. }));
    assert_eq!(ledger.wallets.get_balance(&a.user_id).await.unwrap(), d("300"));
}

#[tokio::test]
async fn test_interrupted_repayment_resumes_once() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let a = investor_with(&ledger, "a", "300").await;
    let b = investor_with(&ledger, "b", "700").await;
    ledger.engine.invest(&a, &project.id, d("300")).await.unwrap();
    ledger.engine.invest(&b, &project.id, d("700")).await.unwrap();

    // Make b's credit fail by removing the wallet.
    sqlx::query("DELETE FROM transactions WHERE owner_id = 'b'")
        .execute(ledger.repo.pool())
        .await
        .unwrap();
    sqlx::query("DELETE FROM wallets WHERE owner_id = 'b'")
        .execute(ledger.repo.pool())
        .await
        .unwrap();

    let admin = CallerContext::admin("ops");
    let first = ledger
        .distributor
        .distribute_repayment(&admin, &project.id, d("1300"))
        .await
        .unwrap();
    assert!(!first.completed);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].investor_id, b.user_id);

    let err = ledger
        .distributor
        .distribute_repayment(&admin, &project.id, d("1200"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    ledger.wallets.open_wallet(&b.user_id).await.unwrap();
    let resumed = ledger
        .distributor
        .distribute_repayment(&admin, &project.id, d("1300"))
        .await
        .unwrap();
    assert!(resumed.completed);
    assert_eq!(resumed.skipped, vec![first.paid[0].investment_id.clone()]);

    assert_eq!(ledger.wallets.get_balance(&a.user_id).await.unwrap(), d("390"));
    assert_eq!(ledger.wallets.get_balance(&b.user_id).await.unwrap(), d("910"));
    assert_eq!(ledger.tracker.commissions(&project.id).await.unwrap().len(), 1);
    assert_eq!(
        ledger.tracker.project(&project.id).await.unwrap().status,
        ProjectStatus::Repaid
    );
}

#[tokio::test]
async fn test_rejected_repayment_totals_do_not_block_settlement() {
    let ledger = setup_ledger().await;
    let project = approved_project(&ledger, "1000").await;
    let a = investor_with(&ledger, "a", "300").await;
    let b = investor_with(&ledger, "b", "700").await;
    ledger.engine.invest(&a, &project.id, d("300")).await.unwrap();
    ledger.engine.invest(&b, &project.id, d("700")).await.unwrap();

    let admin = CallerContext::admin("ops");
    for total in ["1300.001", "79228162514264337593543950335"] {
        let err = ledger
            .distributor
            .distribute_repayment(&admin, &project.id, d(total))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)), "total {}", total);
    }

    let report = ledger
        .distributor
        .distribute_repayment(&admin, &project.id, d("1300"))
        .await
        .unwrap();
    assert!(report.completed);
    assert_eq!(ledger.wallets.get_balance(&a.user_id).await.unwrap(), d("390"));
    assert_eq!(ledger.wallets.get_balance(&b.user_id).await.unwrap(), d("910"));
    assert!(ledger.auditor.audit().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_oversized_deposit_is_rejected_without_side_effects() {
    let ledger = setup_ledger().await;
    let max = "79228162514264337593543950335";
    let whale = investor_with(&ledger, "whale", max).await;

    let err = ledger.wallets.deposit(&whale, d(max)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    assert_eq!(ledger.wallets.get_balance(&whale.user_id).await.unwrap(), d(max));
    assert_eq!(
        ledger.wallets.transactions(&whale.user_id).await.unwrap().len(),
        1
    );
    assert!(ledger.auditor.audit().await.unwrap().is_clean());
}
