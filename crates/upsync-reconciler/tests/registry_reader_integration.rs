use std::sync::Arc;

use upsync_acl::{MetadataPointer, PermissionBitmask, VerificationMethod};
use upsync_keys::Address;
use upsync_ledger::{DynLedger, MemLedger};
use upsync_reconciler::{GrantRequest, ReconcileError, Reconciler, RegistryReader};

const ACCOUNT: [u8; 20] = [0xa0; 20];
const CONTROLLER: [u8; 20] = [0xc0; 20];

fn setup() -> (MemLedger, Reconciler) {
    let ledger = MemLedger::new();
    let reconciler = Reconciler::new(Arc::new(ledger.clone()) as DynLedger);
    (ledger, reconciler)
}

fn array_length(n: u8) -> Vec<u8> {
    let mut len = vec![0u8; 16];
    len[15] = n;
    len
}

#[tokio::test]
async fn absent_permission_key_reads_as_zero_bitmask() {
    let (_ledger, reconciler) = setup();
    let mask = reconciler
        .reader()
        .permissions(Address::from(ACCOUNT), Address::from(CONTROLLER))
        .await
        .expect("read");
    assert_eq!(mask, PermissionBitmask::ZERO);
    let decoded = upsync_acl::decode_permissions(mask);
    assert!(decoded.capabilities.values().all(|set| !set));
    assert!(decoded.unknown_bits.is_zero());
}

#[tokio::test]
async fn absent_allowed_calls_read_as_empty() {
    let (_ledger, reconciler) = setup();
    let calls = reconciler
        .reader()
        .allowed_calls(Address::from(ACCOUNT), Address::from(CONTROLLER))
        .await
        .expect("read");
    assert!(calls.is_empty());
}

#[tokio::test]
async fn length_drift_fails_instead_of_truncating() {
    let (ledger, reconciler) = setup();
    let account = Address::from(ACCOUNT);

    // Stored length claims two controllers but only index 0 exists.
    ledger.set_data(account, upsync_keys::controllers_array_key(), array_length(2));
    ledger.set_data(
        account,
        upsync_keys::controller_element_key(0),
        Address::from(CONTROLLER).as_bytes().to_vec(),
    );

    let err = reconciler.reader().controllers(account).await.unwrap_err();
    match err {
        ReconcileError::RegistryInconsistency { stored, index, .. } => {
            assert_eq!(stored, 2);
            assert_eq!(index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_element_fails_the_array_read() {
    let (ledger, reconciler) = setup();
    let account = Address::from(ACCOUNT);

    ledger.set_data(account, upsync_keys::controllers_array_key(), array_length(1));
    ledger.set_data(
        account,
        upsync_keys::controller_element_key(0),
        vec![0x01, 0x02, 0x03],
    );

    let err = reconciler.reader().controllers(account).await.unwrap_err();
    assert!(matches!(err, ReconcileError::RegistryInconsistency { .. }));
}

#[tokio::test]
async fn metadata_pointer_round_trip_through_plan() {
    let (ledger, reconciler) = setup();
    let account = Address::from(ACCOUNT);
    let content = br#"{"LSP4Metadata":{"name":"moments"}}"#;
    let pointer = MetadataPointer::for_json_content("ipfs://QmMoments", content);

    // Full replace, exactly one write, with or without a prior pointer.
    let first = reconciler.plan_metadata_update(account, "LSP4Metadata", &pointer);
    assert_eq!(first.len(), 1);
    ledger.set_data_batch(account, first.entries().map(|(k, v)| (k, v.to_vec())));

    let replacement = MetadataPointer {
        method: VerificationMethod::Keccak256Utf8,
        hash: [0x42; 32],
        url: "ipfs://QmReplaced".into(),
    };
    let second = reconciler.plan_metadata_update(account, "LSP4Metadata", &replacement);
    assert_eq!(second.len(), 1);
    ledger.set_data_batch(account, second.entries().map(|(k, v)| (k, v.to_vec())));

    let stored = reconciler
        .reader()
        .metadata_pointer(account, "LSP4Metadata")
        .await
        .expect("read")
        .expect("pointer");
    assert_eq!(stored, replacement);
}

#[tokio::test]
async fn absent_metadata_pointer_reads_as_none() {
    let (_ledger, reconciler) = setup();
    let pointer = reconciler
        .reader()
        .metadata_pointer(Address::from(ACCOUNT), "LSP4Metadata")
        .await
        .expect("read");
    assert!(pointer.is_none());
}

#[tokio::test]
async fn convergence_check_reports_pending_then_empty() {
    let (ledger, reconciler) = setup();
    let account = Address::from(ACCOUNT);
    let controller = Address::from(CONTROLLER);

    let batch = reconciler
        .plan_grant(account, controller, &GrantRequest::capabilities(["CALL"]))
        .await
        .expect("plan");

    // Nothing submitted yet: every write is pending.
    let pending = reconciler
        .reader()
        .check_converged(&batch)
        .await
        .expect("check");
    assert_eq!(pending.len(), batch.len());

    ledger.set_data_batch(account, batch.entries().map(|(k, v)| (k, v.to_vec())));
    let pending = reconciler
        .reader()
        .check_converged(&batch)
        .await
        .expect("check");
    assert!(pending.is_empty());
}

#[tokio::test]
async fn concurrent_writer_is_caught_by_replanning() {
    let (ledger, reconciler) = setup();
    let account = Address::from(ACCOUNT);
    let controller = Address::from(CONTROLLER);
    let rival = Address::from([0xdd; 20]);

    let batch = reconciler
        .plan_grant(account, controller, &GrantRequest::capabilities(["CALL"]))
        .await
        .expect("plan");

    // A rival controller lands between our read and our submission.
    let rival_batch = reconciler
        .plan_grant(account, rival, &GrantRequest::capabilities(["SETDATA"]))
        .await
        .expect("plan rival");
    ledger.set_data_batch(account, rival_batch.entries().map(|(k, v)| (k, v.to_vec())));

    // Our stale batch would clobber index 0; the convergence check flags it,
    // and a fresh plan appends at the observed end instead.
    let pending = reconciler
        .reader()
        .check_converged(&batch)
        .await
        .expect("check");
    assert!(!pending.is_empty());

    let replanned = reconciler
        .plan_grant(account, controller, &GrantRequest::capabilities(["CALL"]))
        .await
        .expect("replan");
    ledger.set_data_batch(account, replanned.entries().map(|(k, v)| (k, v.to_vec())));

    let controllers = reconciler.reader().controllers(account).await.expect("read");
    assert_eq!(controllers, vec![rival, controller]);
}

#[tokio::test]
async fn reader_can_be_shared_across_components() {
    let (_ledger, reconciler) = setup();
    // The reader handle is cheap to clone and snapshot-scoped.
    let reader: RegistryReader = reconciler.reader().clone();
    let mask = reader
        .permissions(Address::from(ACCOUNT), Address::from(CONTROLLER))
        .await
        .expect("read");
    assert!(mask.is_zero());
}
