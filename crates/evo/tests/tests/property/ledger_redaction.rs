//! Property tests: secrets never reach the ledger file, and redaction is
//! stable under re-application.

use evo_ledger::EventLedger;
use evo_types::{layout, LifecycleEvent, Proposal};
use proptest::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_secret_title() -> impl Strategy<Value = (String, String)> {
    (
        prop_oneof![Just("api_key="), Just("token: "), Just("password="), Just("Bearer ")],
        "[A-Za-z0-9]{12,24}",
        "[a-z ]{0,12}",
    )
        .prop_map(|(key, secret, tail)| (format!("fix {key}{secret} {tail}"), secret))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn recorded_secrets_are_redacted((title, secret) in arb_secret_title()) {
        let raw = runtime().block_on(async {
            let dir = TempDir::new().unwrap();
            let ledger = EventLedger::open(dir.path()).await.unwrap();
            let proposal = Proposal::new(title.clone()).with_evidence(title.clone());
            ledger.record(&LifecycleEvent::generated(&proposal)).await.unwrap();
            let events = ledger.read(None).await.unwrap();
            assert_eq!(events.len(), 1);
            tokio::fs::read_to_string(layout::events_path(dir.path())).await.unwrap()
        });
        prop_assert!(!raw.contains(&secret));
        prop_assert_eq!(evo_redact::redact(&raw), raw);
    }
}
