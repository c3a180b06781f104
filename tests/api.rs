use std::sync::Arc;

use async_graphql::{Request, Variables};
use barbell::config::Config;
use barbell::graphql::guards::Staff;
use barbell::graphql::{build_schema, BarbellSchema};
use barbell::store::json::JsonStore;
use barbell::util::{add_days, today};
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestApi {
    schema: BarbellSchema,
    // keeps the photo directory alive
    photo_dir: TempDir,
}

impl TestApi {
    fn new() -> Self {
        let photo_dir = tempfile::tempdir().unwrap();
        let config = Config {
            photo_dir: photo_dir.path().to_owned(),
            ..Config::default()
        };

        Self {
            schema: build_schema(Arc::new(JsonStore::in_memory()), config),
            photo_dir,
        }
    }

    async fn run(&self, query: &str, variables: Value) -> Value {
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(Staff);
        let response = self.schema.execute(request).await;
        assert!(response.errors.is_empty(), "errors: {:?}", response.errors);

        response.data.into_json().unwrap()
    }

    async fn run_err(&self, request: Request) -> String {
        let response = self.schema.execute(request).await;
        assert!(!response.errors.is_empty(), "expected an error");

        response.errors[0].message.clone()
    }

    async fn register(&self, email: &str) -> i64 {
        let data = self
            .run(
                r#"mutation($member: NewMember!) {
                    registerMember(newMember: $member) { id }
                }"#,
                json!({
                    "member": {
                        "firstName": "Ada",
                        "lastName": "Lovelace",
                        "email": email,
                        "phone": "555-010-0000",
                        "package": "STANDARD",
                        "months": 2,
                        "discount": 10
                    }
                }),
            )
            .await;

        data["registerMember"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn packages_are_public() {
    let api = TestApi::new();
    let response = api
        .schema
        .execute(Request::new("{ packages { tier monthlyPrice } }"))
        .await;

    assert!(response.errors.is_empty());
    let data = response.data.into_json().unwrap();
    assert_eq!(data["packages"][0], json!({ "tier": "BASIC", "monthlyPrice": 30 }));
    assert_eq!(data["packages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn everything_else_needs_staff() {
    let api = TestApi::new();
    let message = api.run_err(Request::new("{ members { id } }")).await;

    assert!(message.contains("BARBELL_TOKEN"));
}

#[tokio::test]
async fn register_and_look_up_member() {
    let api = TestApi::new();
    let id = api.register("ada@example.com").await;

    let data = api
        .run(
            r#"query($id: Int!) {
                member(id: $id) {
                    fullName email price discount finalPrice
                    status effectiveStatus daysUntilExpiry
                    payments { id }
                }
            }"#,
            json!({ "id": id }),
        )
        .await;
    let member = &data["member"];

    assert_eq!(member["fullName"], "Ada Lovelace");
    assert_eq!(member["price"], 100);
    assert_eq!(member["discount"], 10);
    assert_eq!(member["finalPrice"], 90);
    assert_eq!(member["status"], "ACTIVE");
    assert_eq!(member["effectiveStatus"], "ACTIVE");
    assert!(member["daysUntilExpiry"].as_i64().unwrap() >= 56);
    assert_eq!(member["payments"], json!([]));

    let message = api
        .run_err(
            Request::new(
                r#"mutation {
                    registerMember(newMember: {
                        firstName: "Ada", lastName: "Again", email: "ADA@example.com",
                        phone: "555-010-0000", package: BASIC
                    }) { id }
                }"#,
            )
            .data(Staff),
        )
        .await;
    assert!(message.contains("ada@example.com"));
}

#[tokio::test]
async fn approving_a_payment_extends_membership() {
    let api = TestApi::new();
    let id = api.register("ada@example.com").await;

    let before = api
        .run(
            "query($id: Int!) { member(id: $id) { expiryDate } }",
            json!({ "id": id }),
        )
        .await;

    let data = api
        .run(
            r#"mutation($id: Int!) {
                recordPayment(newPayment: { memberId: $id, method: CARD, months: 1 }) {
                    id amount status transactionId member { email }
                }
            }"#,
            json!({ "id": id }),
        )
        .await;
    let payment = &data["recordPayment"];
    assert_eq!(payment["amount"], 50);
    assert_eq!(payment["status"], "PENDING");
    assert_eq!(payment["member"]["email"], "ada@example.com");
    assert!(payment["transactionId"].as_str().unwrap().starts_with("TXN-"));

    api.run(
        r#"mutation($id: Int!) { setPaymentStatus(id: $id, status: APPROVED) { status } }"#,
        json!({ "id": payment["id"] }),
    )
    .await;

    let after = api
        .run(
            "query($id: Int!) { member(id: $id) { expiryDate } }",
            json!({ "id": id }),
        )
        .await;
    assert_ne!(after["member"]["expiryDate"], before["member"]["expiryDate"]);

    let data = api
        .run(
            "{ dashboard(range: ALL) { totalRevenue pendingPayments revenueByMethod { method amount } } }",
            json!({}),
        )
        .await;
    assert_eq!(data["dashboard"]["totalRevenue"], 50);
    assert_eq!(data["dashboard"]["pendingPayments"], 0);
    assert_eq!(
        data["dashboard"]["revenueByMethod"],
        json!([{ "method": "CARD", "amount": 50 }])
    );
}

#[tokio::test]
async fn check_in_and_out() {
    let api = TestApi::new();
    let id = api.register("ada@example.com").await;

    let data = api
        .run(
            r#"mutation($id: Int!) { checkIn(memberId: $id, time: "07:30") { status checkIn } }"#,
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["checkIn"], json!({ "status": "ACTIVE", "checkIn": "07:30" }));

    let message = api
        .run_err(
            Request::new(r#"mutation($id: Int!) { checkIn(memberId: $id, time: "08:00") { id } }"#)
                .variables(Variables::from_json(json!({ "id": id })))
                .data(Staff),
        )
        .await;
    assert!(message.contains("already checked in"));

    let data = api
        .run(
            r#"mutation($id: Int!) {
                checkOut(memberId: $id, time: "09:00") { status checkOut durationMinutes }
            }"#,
            json!({ "id": id }),
        )
        .await;
    assert_eq!(
        data["checkOut"],
        json!({ "status": "COMPLETED", "checkOut": "09:00", "durationMinutes": 90 })
    );

    let data = api
        .run(
            "{ dashboard(range: TODAY) { todayAttendance checkedInNow attendanceCount } }",
            json!({}),
        )
        .await;
    assert_eq!(
        data["dashboard"],
        json!({ "todayAttendance": 1, "checkedInNow": 0, "attendanceCount": 1 })
    );
}

#[tokio::test]
async fn suspended_members_cannot_check_in() {
    let api = TestApi::new();
    let id = api.register("ada@example.com").await;

    api.run(
        "mutation($id: Int!) { setMemberStatus(id: $id, status: SUSPENDED) { status } }",
        json!({ "id": id }),
    )
    .await;

    let message = api
        .run_err(
            Request::new("mutation($id: Int!) { checkIn(memberId: $id) { id } }")
                .variables(Variables::from_json(json!({ "id": id })))
                .data(Staff),
        )
        .await;
    assert!(message.contains("suspended"));
}

#[tokio::test]
async fn photo_upload_and_member_deletion() {
    let api = TestApi::new();
    let id = api.register("ada@example.com").await;

    let data = api
        .run(
            r#"mutation($id: Int!, $photo: PhotoUpload!) {
                uploadMemberPhoto(id: $id, photo: $photo) { photo }
            }"#,
            json!({
                "id": id,
                "photo": { "fileName": "ada.jpg", "content": base64::encode(b"jpeg bytes") }
            }),
        )
        .await;
    let photo = data["uploadMemberPhoto"]["photo"].as_str().unwrap().to_owned();
    assert!(photo.ends_with(".jpg"));
    assert!(api.photo_dir.path().join(&photo).exists());

    let data = api
        .run(
            "mutation($id: Int!) { deleteMember(id: $id) }",
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["deleteMember"], "success");
    assert!(!api.photo_dir.path().join(&photo).exists());

    let data = api.run("{ members { id } }", json!({})).await;
    assert_eq!(data["members"], json!([]));
}

#[tokio::test]
async fn members_can_be_searched_and_filtered() {
    let api = TestApi::new();
    api.register("ada@example.com").await;
    api.register("grace@example.com").await;

    let data = api
        .run(
            r#"{ members(search: "GRACE") { email } expiringMembers(withinDays: 3) { id } }"#,
            json!({}),
        )
        .await;
    assert_eq!(data["members"], json!([{ "email": "grace@example.com" }]));
    assert_eq!(data["expiringMembers"], json!([]));

    let data = api
        .run("{ members(status: EXPIRED) { id } }", json!({}))
        .await;
    assert_eq!(data["members"], json!([]));
}

#[tokio::test]
async fn expiring_members_are_listed() {
    let api = TestApi::new();
    let ada = api.register("ada@example.com").await;
    api.register("grace@example.com").await;

    let soon = add_days(today(), 3).to_string();
    let data = api
        .run(
            r#"mutation($id: Int!, $expiry: Date!) {
                updateMember(id: $id, update: { expiryDate: $expiry }) { expiryDate daysUntilExpiry }
            }"#,
            json!({ "id": ada, "expiry": soon }),
        )
        .await;
    assert_eq!(data["updateMember"], json!({ "expiryDate": soon, "daysUntilExpiry": 3 }));

    let data = api
        .run(
            r#"{
                week: expiringMembers(withinDays: 7) { id email }
                window: expiringMembers { id }
                tooSoon: expiringMembers(withinDays: 2) { id }
            }"#,
            json!({}),
        )
        .await;
    assert_eq!(data["week"], json!([{ "id": ada, "email": "ada@example.com" }]));
    assert_eq!(data["window"], json!([{ "id": ada }]));
    assert_eq!(data["tooSoon"], json!([]));
}
