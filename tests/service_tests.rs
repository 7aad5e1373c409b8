#![cfg(feature = "gib")]

mod common;

use std::time::Duration;

use common::{FakeGateway, Harness, SendMode};
use efatura::core::*;
use efatura::gib::{IncomingInvoice, ResponseDecision};
use efatura::service::{IncomingPoller, SendOutcome, StatusCheck};
use efatura::store::{EInvoiceStore, InvoiceRepository, RecordFilter};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn incoming(uuid: &str, sender: &str) -> IncomingInvoice {
    IncomingInvoice {
        uuid: uuid.to_string(),
        invoice_number: Some("TED2024000000311".into()),
        sender_tax_number: Some(sender.to_string()),
        sender_name: Some("Tedarik Makina A.Ş.".into()),
        issue_date: Some("2024-03-14".into()),
        payable_amount: Some("1200.00".into()),
        content: Some("<Invoice/>".into()),
    }
}

fn refusal() -> SendMode {
    SendMode::Refuse {
        code: "1163".into(),
        message: "Alıcı e-Fatura kayıtlı kullanıcı değil".into(),
    }
}

// ---------------------------------------------------------------------------
// XML generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regeneration_of_unsent_invoice_issues_new_uuid() {
    let h = Harness::with_invoices(&[42]).await;

    let first = h.service.generate_xml(42).await.unwrap();
    let second = h.service.generate_xml(42).await.unwrap();

    assert_ne!(first.uuid, second.uuid);
    assert_eq!(second.status, EInvoiceStatus::Pending);
    assert_eq!(first.id, second.id);

    let stored = h.record(42).await.unwrap();
    assert_eq!(stored.uuid, second.uuid);
    assert_eq!(stored.xml_hash, second.xml_hash);
    let xml = stored.xml_content.unwrap();
    assert!(xml.contains(&second.uuid.to_string()));
    assert!(xml.contains(r#"<cbc:PayableAmount currencyID="TRY">300.00</cbc:PayableAmount>"#));
    assert_eq!(h.store.record_count().await, 1);
    assert_eq!(h.gateway.sends(), 0);
}

#[tokio::test]
async fn redraft_after_send_keeps_uuid_and_reverts_to_pending() {
    let h = Harness::with_invoices(&[1]).await;
    let sent = h.service.send_e_invoice(1).await;
    let uuid = sent.uuid().unwrap();

    let redrafted = h.service.generate_xml(1).await.unwrap();
    assert_eq!(redrafted.status, EInvoiceStatus::Pending);
    assert_eq!(redrafted.uuid, uuid);
}

#[tokio::test]
async fn cancelled_invoice_cannot_be_redrafted() {
    let h = Harness::with_invoices(&[1]).await;
    h.service.send_e_invoice(1).await;
    assert!(h.service.cancel_invoice(1, "Hatalı tutar").await.unwrap());

    let err = h.service.generate_xml(1).await.unwrap_err();
    assert!(matches!(
        err,
        EFaturaError::InvalidTransition {
            from: EInvoiceStatus::Cancelled,
            to: EInvoiceStatus::Pending
        }
    ));
}

#[tokio::test]
async fn generate_for_unknown_invoice_is_not_found() {
    let h = Harness::with_invoices(&[]).await;
    let err = h.service.generate_xml(404).await.unwrap_err();
    assert!(matches!(err, EFaturaError::NotFound(_)));
    assert_eq!(h.store.record_count().await, 0);
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_send_marks_record_sent() {
    let h = Harness::with_invoices(&[42]).await;

    let outcome = h.service.send_e_invoice(42).await;
    let SendOutcome::Sent {
        invoice_id,
        uuid,
        gib_invoice_id,
    } = outcome
    else {
        panic!("expected Sent, got {outcome:?}");
    };
    assert_eq!(invoice_id, 42);
    assert_eq!(gib_invoice_id, "GIB2024000000001");

    let record = h.record(42).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Sent);
    assert_eq!(record.uuid, uuid);
    assert!(record.sent_at.is_some());
    assert!(record.xml_content.is_some());
    assert!(record.gib_response.is_some());
    assert!(record.error_message.is_none());
    assert_eq!(h.gateway.sends(), 1);
}

#[tokio::test]
async fn sent_record_is_not_sent_again() {
    let h = Harness::with_invoices(&[42]).await;
    assert!(h.service.send_e_invoice(42).await.is_success());

    let again = h.service.send_e_invoice(42).await;
    assert!(matches!(
        again,
        SendOutcome::AlreadySent {
            invoice_id: 42,
            status: EInvoiceStatus::Sent,
            ..
        }
    ));
    assert!(again.message().contains("already sent"));
    assert_eq!(h.gateway.sends(), 1);
}

#[tokio::test]
async fn concurrent_sends_transmit_once() {
    let h = Harness::with_invoices(&[7]).await;

    let (a, b) = tokio::join!(h.service.send_e_invoice(7), h.service.send_e_invoice(7));

    let successes = [&a, &b].iter().filter(|o| o.is_success()).count();
    assert_eq!(successes, 1, "{a:?} / {b:?}");
    assert!(
        matches!(a, SendOutcome::AlreadySent { .. }) || matches!(b, SendOutcome::AlreadySent { .. })
    );
    assert_eq!(h.gateway.sends(), 1);
    assert_eq!(h.store.record_count().await, 1);
}

#[tokio::test]
async fn gateway_refusal_rejects_record() {
    let h = Harness::with_invoices(&[3]).await;
    h.gateway.set_send_mode(refusal());

    let outcome = h.service.send_e_invoice(3).await;
    match &outcome {
        SendOutcome::Failed {
            error_code,
            error_message,
            uuid,
            ..
        } => {
            assert_eq!(error_code.as_deref(), Some("1163"));
            assert!(error_message.contains("kayıtlı"));
            assert!(uuid.is_some());
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    let record = h.record(3).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Rejected);
    assert_eq!(record.error_code.as_deref(), Some("1163"));
    assert!(record.sent_at.is_none());
    assert!(record.gib_response.is_some());
}

#[tokio::test]
async fn transport_failure_rejects_record_and_retry_succeeds() {
    let h = Harness::with_invoices(&[3]).await;
    h.gateway
        .set_send_mode(SendMode::Fail(TransportError::Network("connection refused".into())));

    let failed = h.service.send_e_invoice(3).await;
    assert!(!failed.is_success());
    let record = h.record(3).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Rejected);
    assert_eq!(record.error_code.as_deref(), Some("NETWORK"));
    assert!(record.error_message.unwrap().contains("connection refused"));

    h.gateway.set_send_mode(SendMode::Accept);
    let retried = h.service.send_e_invoice(3).await;
    assert!(retried.is_success());
    let record = h.record(3).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Sent);
    assert!(record.error_message.is_none());
    assert!(record.error_code.is_none());
    assert_eq!(h.gateway.sends(), 2);
}

#[tokio::test]
async fn invalid_invoice_is_rejected_before_transport() {
    let h = Harness::with_invoices(&[]).await;
    let mut graph = common::invoice(5);
    graph.customer.tax_number = Some("12345".into());
    h.store.insert_invoice(graph).await;

    let outcome = h.service.send_e_invoice(5).await;
    match &outcome {
        SendOutcome::Failed { error_code, .. } => {
            assert_eq!(error_code.as_deref(), Some("VALIDATION"))
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    let record = h.record(5).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Rejected);
    assert!(record.error_message.unwrap().contains("TR-VKN"));
    assert_eq!(h.gateway.sends(), 0);
}

#[tokio::test]
async fn missing_order_is_recorded_as_failure() {
    let h = Harness::with_invoices(&[8]).await;
    h.store.remove_order(8).await;

    let outcome = h.service.send_e_invoice(8).await;
    assert!(matches!(
        &outcome,
        SendOutcome::Failed { error_code: Some(code), .. } if code == "NOT_FOUND"
    ));
    assert_eq!(h.record(8).await.unwrap().status, EInvoiceStatus::Rejected);
    assert_eq!(h.gateway.sends(), 0);
}

#[tokio::test]
async fn first_acceptance_adopts_gateway_uuid() {
    let h = Harness::with_invoices(&[9]).await;
    let remote = Uuid::new_v4();
    h.gateway.set_send_mode(SendMode::AcceptWithUuid(remote));

    let outcome = h.service.send_e_invoice(9).await;
    assert_eq!(outcome.uuid(), Some(remote));
    assert_eq!(h.record(9).await.unwrap().uuid, remote);
}

#[tokio::test]
async fn never_accepted_invoice_gets_fresh_uuid_on_resend() {
    let h = Harness::with_invoices(&[4]).await;
    h.gateway.set_send_mode(refusal());
    let first = h.service.send_e_invoice(4).await.uuid().unwrap();

    h.gateway.set_send_mode(SendMode::Accept);
    let second = h.service.send_e_invoice(4).await.uuid().unwrap();
    assert_ne!(first, second);

    let documents = h.gateway.sent_documents.lock().unwrap().clone();
    assert_eq!(documents.len(), 2);
    assert!(documents[1].contains(&second.to_string()));
}

// ---------------------------------------------------------------------------
// Status reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_to_end_send_then_approve() {
    let h = Harness::with_invoices(&[42]).await;

    let graph = h.store.load_invoice_graph(42).await.unwrap();
    assert_eq!(graph.invoice.total_amount, dec!(250.00));
    assert_eq!(graph.invoice.vat_amount, dec!(50.00));

    let generated = h.service.generate_xml(42).await.unwrap();
    let xml = generated.xml_content.unwrap();
    assert!(xml.contains(r#"<cbc:LineExtensionAmount currencyID="TRY">250.00</cbc:LineExtensionAmount>"#));
    assert!(xml.contains(r#"<cbc:TaxInclusiveAmount currencyID="TRY">300.00</cbc:TaxInclusiveAmount>"#));

    let uuid = h.service.send_e_invoice(42).await.uuid().unwrap();
    assert_eq!(h.record(42).await.unwrap().status, EInvoiceStatus::Sent);

    h.gateway.set_remote_status("APPROVED");
    let check = h.service.check_invoice_status(uuid).await;
    assert!(check.is_checked());
    assert_eq!(check.status(), EInvoiceStatus::Approved);

    let record = h.record(42).await.unwrap();
    assert_eq!(record.status, EInvoiceStatus::Approved);
    assert_eq!(record.gib_status.as_deref(), Some("APPROVED"));
    assert_eq!(record.uuid, uuid);
}

#[tokio::test]
async fn raw_statuses_map_to_canonical_values() {
    let h = Harness::with_invoices(&[]).await;
    let table = [
        ("PENDING", EInvoiceStatus::Pending),
        ("SENT", EInvoiceStatus::Sent),
        ("DELIVERED", EInvoiceStatus::Received),
        ("APPROVED", EInvoiceStatus::Approved),
        ("REJECTED", EInvoiceStatus::Rejected),
        ("CANCELLED", EInvoiceStatus::Cancelled),
        ("IN_PROGRESS", EInvoiceStatus::Pending),
    ];
    for (raw, expected) in table {
        h.gateway.set_remote_status(raw);
        let check = h.service.check_invoice_status(Uuid::new_v4()).await;
        assert_eq!(check.status(), expected, "raw status {raw}");
    }
}

#[tokio::test]
async fn illegal_remote_transition_keeps_stored_status() {
    let h = Harness::with_invoices(&[2]).await;
    let record = h.service.generate_xml(2).await.unwrap();

    h.gateway.set_remote_status("APPROVED");
    let check = h.service.check_invoice_status(record.uuid).await;
    assert_eq!(check.status(), EInvoiceStatus::Approved);

    let stored = h.record(2).await.unwrap();
    assert_eq!(stored.status, EInvoiceStatus::Pending);
    assert_eq!(stored.gib_status.as_deref(), Some("APPROVED"));
}

#[tokio::test]
async fn failed_check_is_reported_not_pending() {
    let h = Harness::with_invoices(&[2]).await;
    let uuid = h.service.send_e_invoice(2).await.uuid().unwrap();
    h.gateway
        .set_status_error(TransportError::Http { status: 503, body: "down".into() });

    let check = h.service.check_invoice_status(uuid).await;
    match &check {
        StatusCheck::Failed {
            uuid: failed_uuid,
            status,
            error_message,
            ..
        } => {
            assert_eq!(*failed_uuid, uuid);
            assert_eq!(*status, EInvoiceStatus::Pending);
            assert!(error_message.contains("503"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.record(2).await.unwrap().status, EInvoiceStatus::Sent);
}

// ---------------------------------------------------------------------------
// Incoming invoices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incoming_invoices_are_recorded_once() {
    let h = Harness::with_invoices(&[]).await;
    let known = "c3b1e0a4-1f2d-4e5c-8b7a-9d0e1f2a3b4c";
    let fresh = "e5f6a7b8-2c3d-4e5f-9a0b-1c2d3e4f5a6b";

    h.gateway.set_incoming(vec![incoming(known, "1111111111")]);
    assert_eq!(h.service.receive_incoming_invoices().await.unwrap().len(), 1);
    assert_eq!(h.store.record_count().await, 1);

    h.gateway.set_incoming(vec![
        incoming(known, "1111111111"),
        incoming(fresh, "2222222222"),
        incoming("not-a-uuid", "3333333333"),
    ]);
    let listed = h.service.receive_incoming_invoices().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().any(|i| i.uuid == known));
    assert_eq!(h.store.record_count().await, 2);

    let record = h
        .store
        .find_by_uuid(Uuid::parse_str(fresh).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.direction, RecordDirection::Incoming);
    assert_eq!(record.status, EInvoiceStatus::Received);
    assert_eq!(record.invoice_id, None);
    assert_eq!(record.sender_tax_number.as_deref(), Some("2222222222"));
    assert_eq!(record.xml_content.as_deref(), Some("<Invoice/>"));
    assert!(record.received_at.is_some());
    assert_eq!(record.gib_response.unwrap()["senderName"], "Tedarik Makina A.Ş.");
}

#[tokio::test]
async fn incoming_transport_error_is_returned() {
    let h = Harness::with_invoices(&[]).await;
    *h.gateway.incoming.lock().unwrap() = Err(TransportError::Network("timeout".into()));

    let err = h.service.receive_incoming_invoices().await.unwrap_err();
    assert!(matches!(err, EFaturaError::Transport(TransportError::Network(_))));
}

#[tokio::test]
async fn poller_records_incoming_invoices() {
    let h = Harness::with_invoices(&[]).await;
    h.gateway
        .set_incoming(vec![incoming("c3b1e0a4-1f2d-4e5c-8b7a-9d0e1f2a3b4c", "1111111111")]);

    let poller = IncomingPoller::spawn(h.service.clone(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.shutdown().await;

    assert_eq!(h.store.record_count().await, 1);
}

#[tokio::test]
async fn invoice_response_updates_incoming_record() {
    let h = Harness::with_invoices(&[]).await;
    let uuid = "c3b1e0a4-1f2d-4e5c-8b7a-9d0e1f2a3b4c";
    h.gateway.set_incoming(vec![incoming(uuid, "1111111111")]);
    h.service.receive_incoming_invoices().await.unwrap();
    let uuid = Uuid::parse_str(uuid).unwrap();

    let accepted = h
        .service
        .send_invoice_response(uuid, ResponseDecision::Accepted, None)
        .await
        .unwrap();
    assert!(accepted);

    let record = h.store.find_by_uuid(uuid).await.unwrap().unwrap();
    assert_eq!(record.status, EInvoiceStatus::Approved);
    assert_eq!(record.gib_response.unwrap()["status"], "ACCEPTED");
}

#[tokio::test]
async fn rejection_requires_reason() {
    let h = Harness::with_invoices(&[]).await;
    let err = h
        .service
        .send_invoice_response(Uuid::new_v4(), ResponseDecision::Rejected, Some("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, EFaturaError::Validation(_)));
    assert_eq!(
        h.gateway
            .response_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn refused_response_changes_nothing() {
    let h = Harness::with_invoices(&[]).await;
    let uuid = "c3b1e0a4-1f2d-4e5c-8b7a-9d0e1f2a3b4c";
    h.gateway.set_incoming(vec![incoming(uuid, "1111111111")]);
    h.service.receive_incoming_invoices().await.unwrap();
    h.gateway
        .response_accepted
        .store(false, std::sync::atomic::Ordering::SeqCst);

    let uuid = Uuid::parse_str(uuid).unwrap();
    let ok = h
        .service
        .send_invoice_response(uuid, ResponseDecision::Rejected, Some("Fiyat farkı"))
        .await
        .unwrap();
    assert!(!ok);
    let record = h.store.find_by_uuid(uuid).await.unwrap().unwrap();
    assert_eq!(record.status, EInvoiceStatus::Received);
}

#[tokio::test]
async fn response_conflicting_with_stored_status_is_not_sent() {
    let h = Harness::with_invoices(&[]).await;
    let uuid = "c3b1e0a4-1f2d-4e5c-8b7a-9d0e1f2a3b4c";
    h.gateway.set_incoming(vec![incoming(uuid, "1111111111")]);
    h.service.receive_incoming_invoices().await.unwrap();
    let uuid = Uuid::parse_str(uuid).unwrap();

    assert!(
        h.service
            .send_invoice_response(uuid, ResponseDecision::Accepted, None)
            .await
            .unwrap()
    );
    let err = h
        .service
        .send_invoice_response(uuid, ResponseDecision::Rejected, Some("Eksik teslimat"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EFaturaError::InvalidTransition {
            from: EInvoiceStatus::Approved,
            to: EInvoiceStatus::Rejected,
        }
    ));
    assert_eq!(
        h.gateway
            .response_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    let record = h.store.find_by_uuid(uuid).await.unwrap().unwrap();
    assert_eq!(record.status, EInvoiceStatus::Approved);
    assert_eq!(record.gib_response.unwrap()["status"], "ACCEPTED");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_without_record_is_not_found() {
    let h = Harness::with_invoices(&[6]).await;
    let err = h.service.cancel_invoice(6, "Hatalı tutar").await.unwrap_err();
    assert!(matches!(err, EFaturaError::NotFound(_)));
    assert_eq!(h.gateway.cancels(), 0);
}

#[tokio::test]
async fn successful_cancel_updates_record_and_invoice() {
    let h = Harness::with_invoices(&[6]).await;
    h.service.send_e_invoice(6).await;

    assert!(h.service.cancel_invoice(6, "Hatalı tutar").await.unwrap());
    assert_eq!(h.record(6).await.unwrap().status, EInvoiceStatus::Cancelled);
    assert_eq!(
        h.store.invoice(6).await.unwrap().status,
        InvoiceState::Cancelled
    );
}

#[tokio::test]
async fn refused_cancel_changes_nothing() {
    let h = Harness::with_invoices(&[6]).await;
    h.service.send_e_invoice(6).await;
    h.gateway
        .cancel_accepted
        .store(false, std::sync::atomic::Ordering::SeqCst);

    assert!(!h.service.cancel_invoice(6, "Hatalı tutar").await.unwrap());
    assert_eq!(h.record(6).await.unwrap().status, EInvoiceStatus::Sent);
    assert_eq!(h.store.invoice(6).await.unwrap().status, InvoiceState::Sent);
    assert_eq!(h.gateway.cancels(), 1);
}

#[tokio::test]
async fn pending_record_cannot_be_cancelled() {
    let h = Harness::with_invoices(&[6]).await;
    h.service.generate_xml(6).await.unwrap();

    let err = h.service.cancel_invoice(6, "Hatalı tutar").await.unwrap_err();
    assert!(matches!(err, EFaturaError::InvalidTransition { .. }));
    assert_eq!(h.gateway.cancels(), 0);

    let err = h.service.cancel_invoice(6, "   ").await.unwrap_err();
    assert!(matches!(err, EFaturaError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_send_tallies_outcomes() {
    let h = Harness::with_invoices(&[1, 2, 3, 4, 5]).await;
    h.gateway.fail_documents_containing("<cbc:ID>FTR-2</cbc:ID>");
    h.gateway.fail_documents_containing("<cbc:ID>FTR-4</cbc:ID>");

    let summary = h.service.send_batch(&[1, 2, 3, 4, 5]).await;
    assert_eq!(summary.total, 5);
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.failed, 2);

    for outcome in &summary.results {
        let record = h.record(outcome.invoice_id()).await.unwrap();
        let expected = if outcome.is_success() {
            EInvoiceStatus::Sent
        } else {
            EInvoiceStatus::Rejected
        };
        assert_eq!(record.status, expected, "invoice {}", outcome.invoice_id());
    }
    assert!(!h.record(2).await.unwrap().status.blocks_send());
}

#[tokio::test]
async fn retry_failed_resends_pending_and_rejected() {
    let h = Harness::with_invoices(&[1, 2, 3]).await;
    h.gateway.fail_documents_containing("<cbc:ID>FTR-2</cbc:ID>");
    h.service.send_batch(&[1, 2]).await;
    h.service.generate_xml(3).await.unwrap();

    h.gateway.fail_markers.lock().unwrap().clear();
    let summary = h.service.retry_failed().await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 2);

    for id in [1, 2, 3] {
        assert_eq!(h.record(id).await.unwrap().status, EInvoiceStatus::Sent);
    }
    // 1 and 2 in the batch, then 2 and 3 on retry
    assert_eq!(h.gateway.sends(), 4);
}

#[tokio::test]
async fn retry_with_nothing_to_do() {
    let h = Harness::with_invoices(&[1]).await;
    h.service.send_e_invoice(1).await;
    let summary = h.service.retry_failed().await.unwrap();
    assert_eq!(summary.total, 0);
    assert!(summary.results.is_empty());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_joins_invoice_summary_and_paginates() {
    let h = Harness::with_invoices(&[1, 2, 3]).await;
    h.gateway.set_send_mode(refusal());
    h.service.send_e_invoice(1).await;
    h.gateway.set_send_mode(SendMode::Accept);
    h.service.send_e_invoice(2).await;
    h.service.send_e_invoice(3).await;

    let page = h
        .service
        .list_records(RecordFilter {
            status: Some(EInvoiceStatus::Sent),
            limit: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages(), 2);

    let item = &page.items[0];
    let summary = item.invoice.as_ref().unwrap();
    assert_eq!(Some(summary.invoice_id), item.record.invoice_id);
    assert_eq!(summary.invoice_number, format!("FTR-{}", summary.invoice_id));
    assert_eq!(summary.customer_tax_number.as_deref(), Some("1234567890"));
    assert_eq!(summary.grand_total, dec!(300.00));

    let json = serde_json::to_value(item).unwrap();
    assert_eq!(json["status"], "SENT");
    assert!(json["invoice"]["customerName"].is_string());
}

#[tokio::test]
async fn stored_xml_and_record_lookup() {
    let h = Harness::with_invoices(&[1]).await;
    assert!(matches!(
        h.service.get_xml(1).await.unwrap_err(),
        EFaturaError::NotFound(_)
    ));

    let record = h.service.generate_xml(1).await.unwrap();
    let xml = h.service.get_xml(1).await.unwrap();
    assert_eq!(Some(xml), record.xml_content);
    assert_eq!(h.service.get_record(1).await.unwrap().uuid, record.uuid);
}

#[tokio::test]
async fn report_and_health_pass_through() {
    let h = Harness::with_invoices(&[]).await;
    let report = h
        .service
        .get_invoice_report(Uuid::new_v4(), Default::default())
        .await
        .unwrap();
    assert_eq!(report.as_deref(), Some(b"%PDF-1.4".as_slice()));
    assert!(h.service.gateway_reachable().await);

    let gateway = FakeGateway::default();
    gateway
        .reachable
        .store(false, std::sync::atomic::Ordering::SeqCst);
    assert!(!efatura::gib::GibGateway::test_connection(&gateway).await);
}
