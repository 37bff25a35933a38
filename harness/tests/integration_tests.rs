//! End-to-end scenarios against the in-memory chain:
//! build → submit → vote → pass → market lookup → admin update → verify.

use std::sync::Arc;
use std::time::Duration;

use rmr_governance::{GovernanceError, ProposalStatus};
use rmr_harness::{unique_ticker, ExecutionReport, HarnessError, RmrScenario, Session};
use rmr_nullables::{NullChain, ResponseShape};
use rmr_types::HarnessConfig;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session_on(chain: &Arc<NullChain>) -> Session {
    Session::new(chain.clone(), HarnessConfig::default())
}

fn chain() -> Arc<NullChain> {
    Arc::new(NullChain::new().with_polls_before_pass(1))
}

// ---------------------------------------------------------------------------
// Launch
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn launch_with_high_rmr_and_verify() {
    let chain = chain();
    let session = session_on(&chain);
    let ticker = unique_ticker();

    let start = Instant::now();
    let launched = session
        .launch_market(&ticker, 0.15, Some(0.05), Some(0.03))
        .await
        .unwrap();

    // settle 5s, one voting poll + 3s, market creation delay 10s
    assert_eq!(start.elapsed(), Duration::from_secs(18));
    assert_eq!(launched.ticker, ticker);
    assert_eq!(launched.rmr, 0.15);

    let reconciler = session.reconciler();
    let found = reconciler.find_by_ticker(&ticker).await.unwrap().unwrap();
    assert_eq!(found.market_id, launched.market_id);
    assert!(reconciler.verify_value_default(&launched.market_id, 0.15).await);
    assert!(!reconciler.verify_value_default(&launched.market_id, 0.10).await);
}

#[tokio::test(start_paused = true)]
async fn every_valid_scenario_launches() {
    let chain = chain();
    let session = session_on(&chain);

    for scenario in [
        RmrScenario::ValidHigh,
        RmrScenario::ValidMedium,
        RmrScenario::ValidLow,
    ] {
        let ticker = unique_ticker();
        let launched = session
            .launch_market(&ticker, scenario.rmr(), None, None)
            .await
            .unwrap();
        assert!(
            session
                .reconciler()
                .verify_value_default(&launched.market_id, scenario.rmr())
                .await,
            "{scenario}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn invalid_rmr_never_reaches_the_chain() {
    let chain = chain();
    let session = session_on(&chain);

    for scenario in [RmrScenario::InvalidLow, RmrScenario::Boundary] {
        let err = session
            .launch_market(&unique_ticker(), scenario.rmr(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Governance(GovernanceError::ConstraintViolation { .. })
        ));
    }
    assert!(chain.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn boundary_rmr_launches_with_lower_imr() {
    let chain = chain();
    let session = session_on(&chain);
    let launched = session
        .launch_market(&unique_ticker(), RmrScenario::Boundary.rmr(), Some(0.03), Some(0.02))
        .await
        .unwrap();
    assert!(session.reconciler().verify_value_default(&launched.market_id, 0.035).await);
}

#[tokio::test(start_paused = true)]
async fn launch_tolerates_transient_node_errors() {
    let chain = chain();
    let session = session_on(&chain);
    chain.fail_next(2);

    let launched = session
        .launch_market(&unique_ticker(), 0.10, None, None)
        .await
        .unwrap();
    assert!(session.reconciler().verify_value_default(&launched.market_id, 0.10).await);
    assert_eq!(chain.call_count(&["tx", "gov", "submit-proposal"]), 3);
}

#[tokio::test(start_paused = true)]
async fn launch_via_raw_log_only_responses() {
    let chain = Arc::new(NullChain::new().with_response_shape(ResponseShape::RawLogText));
    let session = session_on(&chain);
    let launched = session
        .launch_market(&unique_ticker(), 0.10, None, None)
        .await
        .unwrap();
    assert_eq!(launched.proposal_id.as_str(), "1");
}

#[tokio::test(start_paused = true)]
async fn duplicate_ticker_fails_the_proposal() {
    let chain = chain();
    let session = session_on(&chain);
    let ticker = unique_ticker();
    session.launch_market(&ticker, 0.10, None, None).await.unwrap();

    let err = session
        .launch_market(&ticker, 0.15, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Governance(GovernanceError::ProposalFailed {
            status: ProposalStatus::Failed,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_proposal_times_out() {
    let chain = Arc::new(NullChain::new().with_polls_before_pass(100));
    let session = session_on(&chain);

    let err = session
        .launch_market(&unique_ticker(), 0.10, None, None)
        .await
        .unwrap_err();
    match err {
        HarnessError::Governance(GovernanceError::Timeout { polls, .. }) => {
            assert!(polls <= 60 / 3 + 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn update_after_launch() {
    let chain = chain();
    let session = session_on(&chain);
    let launched = session
        .launch_market(&unique_ticker(), 0.10, None, None)
        .await
        .unwrap();

    let reconciler = session.reconciler();
    assert!(reconciler.update(&launched.market_id, 0.15).await);
    assert!(reconciler.update(&launched.market_id, 0.15).await);
    assert!(reconciler.verify_value_default(&launched.market_id, 0.15).await);

    // below IMR is refused and leaves the stored value alone
    assert!(!reconciler.update(&launched.market_id, 0.02).await);
    assert!(reconciler.verify_value_default(&launched.market_id, 0.15).await);
}

#[tokio::test(start_paused = true)]
async fn update_from_non_admin_is_refused() {
    let chain = chain();
    let mut config = HarnessConfig::default();
    config.admin_key = "val".to_string();
    // the launch itself still goes through governance
    let session = Session::new(chain.clone(), config);
    let launched = session
        .launch_market(&unique_ticker(), 0.10, None, None)
        .await
        .unwrap();

    assert!(!session.reconciler().update(&launched.market_id, 0.15).await);
    assert!(session.reconciler().verify_value_default(&launched.market_id, 0.10).await);
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn node_and_key_checks() {
    let chain = chain();
    let session = session_on(&chain);
    assert_eq!(session.check_node().await.unwrap(), 1_000_000);

    let keys = session.check_keys().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys["val"], "inj1validator123456789");
    assert_eq!(keys["testcandidate"], "inj1testcandidate123456789");
}

#[tokio::test(start_paused = true)]
async fn halted_node_and_missing_key_are_reported() {
    let halted = Arc::new(NullChain::new().with_height(0));
    assert!(matches!(
        session_on(&halted).check_node().await,
        Err(HarnessError::NodeNotProducing)
    ));

    let keyless = Arc::new(NullChain::new().without_account("val"));
    match session_on(&keyless).check_keys().await {
        Err(HarnessError::MissingKey { name, .. }) => assert_eq!(name, "val"),
        other => panic!("unexpected result: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scenario_report_is_appended() {
    let chain = chain();
    let session = session_on(&chain);
    let ticker = unique_ticker();
    let mut report = ExecutionReport::new(format!("scenario {ticker}"));

    let launched = session.launch_market(&ticker, 0.10, None, None).await.unwrap();
    report.record("launch", true, launched.market_id.clone());
    let updated = session.reconciler().update(&launched.market_id, 0.15).await;
    report.record("update", updated, "rmr 0.15");
    let verified = session
        .reconciler()
        .verify_value_default(&launched.market_id, 0.15)
        .await;
    report.record("verify", verified, "rmr 0.15");
    assert!(report.all_passed());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rmr_test_log.md");
    report.append_to(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(&ticker));
    assert!(text.contains("- Passed: 3 (100.0%)"));
}
