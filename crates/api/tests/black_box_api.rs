//! Black-box tests against the real router on an ephemeral port, backed by
//! the in-memory store.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use kosh_core::{CompanyId, OwnerId, OwnerType, PartyLedgerId, TenantScope};
use kosh_store::InMemoryVoucherStore;

struct TestServer {
    base_url: String,
    store: Arc<InMemoryVoucherStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let store = Arc::new(InMemoryVoucherStore::new());
        let app = kosh_api::app::build_app(store.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?companyId=1&ownerType=user&ownerId=7", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn scope() -> TenantScope {
    TenantScope::new(CompanyId::new(1), OwnerType::new("user"), OwnerId::new(7))
}

fn seed_delhi_party(srv: &TestServer, party: i64) {
    let scope = scope();
    srv.store.set_company_state(&scope, "Delhi");
    srv.store
        .set_ledger_state(&scope, PartyLedgerId::new(party), "Delhi");
}

fn voucher_body(party: i64) -> serde_json::Value {
    json!({
        "date": "2025-06-10",
        "partyId": party,
        "mode": "item-invoice",
        "subtotal": 20000,
        "cgstTotal": 1800,
        "sgstTotal": 1800,
        "igstTotal": 3600,
        "entries": [
            {
                "itemId": 31,
                "quantity": 2,
                "rate": 10000,
                "amount": 20000,
                "cgstRate": 9,
                "sgstRate": 9,
                "igstRate": 18,
                "cgstLedgerId": 5,
                "sgstLedgerId": 6,
                "igstLedgerId": 8
            }
        ]
    })
}

#[tokio::test]
async fn missing_tenant_scope_is_unauthorized() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/sales-vouchers", srv.base_url))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn partial_tenant_scope_is_unauthorized() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/sales-vouchers?companyId=1&ownerId=7", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn same_state_purchase_gets_first_number_and_intra_split() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/purchase-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["voucherNumber"], "PRV-0001");
    assert_eq!(body["gstType"], "intra");
}

#[tokio::test]
async fn numbers_are_sequential_per_family() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    for expected in ["SAL-0001", "SAL-0002", "SAL-0003"] {
        let res = client
            .post(srv.url("/sales-vouchers"))
            .json(&voucher_body(11))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["voucherNumber"], expected);
    }

    // The purchase family numbers independently.
    let res = client
        .post(srv.url("/purchase-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["voucherNumber"], "PRV-0001");
}

#[tokio::test]
async fn round_trip_preserves_intra_split_and_ledger_ids() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["voucherId"].as_i64().unwrap();

    let res = client
        .get(srv.url(&format!("/sales-vouchers/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let data = &body["data"];

    assert_eq!(data["gstType"], "intra");
    assert_eq!(data["cgstTotal"], 1800);
    assert_eq!(data["sgstTotal"], 1800);
    assert_eq!(data["igstTotal"], 0);
    // 20000 + 1800 + 1800; the caller omitted total.
    assert_eq!(data["total"], 23600);

    let line = &data["entries"][0];
    assert_eq!(line["cgstLedgerId"], 5);
    assert_eq!(line["sgstLedgerId"], 6);
    assert_eq!(line["igstLedgerId"], 0);
    assert_eq!(line["igstRate"], 0);
}

#[tokio::test]
async fn unknown_party_state_classifies_as_inter() {
    let srv = TestServer::spawn().await;
    // Company state seeded, party state left blank.
    srv.store.set_company_state(&scope(), "Delhi");
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&voucher_body(99))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["gstType"], "inter");
}

#[tokio::test]
async fn wrong_entry_mode_is_rejected() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let mut body = voucher_body(11);
    body["mode"] = json!("accounting-invoice");
    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn entries_without_references_are_rejected() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let mut body = voucher_body(11);
    body["entries"] = json!([{ "quantity": 1, "rate": 100, "amount": 100 }]);
    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_replaces_lines_and_reclassifies() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["voucherId"].as_i64().unwrap();

    // Repoint at an out-of-state party; the update must flip to IGST.
    srv.store
        .set_ledger_state(&scope(), PartyLedgerId::new(12), "Maharashtra (27)");
    let mut body = voucher_body(12);
    body["entries"] = json!([
        {
            "itemId": 42,
            "quantity": 1,
            "rate": 5000,
            "amount": 5000,
            "igstRate": 18,
            "igstLedgerId": 8
        }
    ]);
    body["subtotal"] = json!(5000);
    body["igstTotal"] = json!(900);
    body["cgstTotal"] = json!(450);
    body["sgstTotal"] = json!(450);

    let res = client
        .put(srv.url(&format!("/sales-vouchers/{id}")))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/sales-vouchers/{id}")))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let data = &body["data"];

    assert_eq!(data["gstType"], "inter");
    assert_eq!(data["cgstTotal"], 0);
    assert_eq!(data["igstTotal"], 900);
    assert_eq!(data["entries"].as_array().unwrap().len(), 1);
    assert_eq!(data["entries"][0]["itemId"], 42);
    // The allocated number survives the update.
    assert_eq!(data["voucherNumber"], "SAL-0001");
}

#[tokio::test]
async fn vouchers_are_scoped_to_their_tenant() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    client
        .post(srv.url("/sales-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!(
            "{}/sales-vouchers?companyId=2&ownerType=user&ownerId=7",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let res = client.get(srv.url("/sales-vouchers")).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_honors_month_filter() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let mut june = voucher_body(11);
    june["date"] = json!("2025-06-10");
    let mut july = voucher_body(11);
    july["date"] = json!("2025-07-02");
    for body in [&june, &july] {
        client
            .post(srv.url("/sales-vouchers"))
            .json(body)
            .send()
            .await
            .unwrap();
    }

    let res = client
        .get(format!("{}&month=6&year=2025", srv.url("/sales-vouchers")))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["date"], "2025-06-10");
}

#[tokio::test]
async fn delete_removes_the_voucher() {
    let srv = TestServer::spawn().await;
    seed_delhi_party(&srv, 11);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/sales-vouchers"))
        .json(&voucher_body(11))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["voucherId"].as_i64().unwrap();

    let res = client
        .delete(srv.url(&format!("/sales-vouchers/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/sales-vouchers/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_missing_voucher_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .delete(srv.url("/purchase-vouchers/12345"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}
