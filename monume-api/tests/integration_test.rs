/// Integration tests for the MonuMe tracker API
///
/// These tests drive the full router against a real database:
/// - Login, logout and the session guard
/// - Role gates and manager location scoping
/// - Tracking entries and their performance email
/// - Forms, submissions and cascade on delete
/// - Email gating, audit log and settings
/// - Appointment status changes and confirmation emails

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, TEST_PASSCODE};
use monume_shared::{
    auth::password::verify_password,
    db::seed::{seed_defaults, BOOTSTRAP_ADMIN_USERNAME},
    models::{
        auth_audit::{AuthAuditEvent, AuthEventKind},
        session::Session,
        user::{User, UserRole},
    },
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_reports_database() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, body) = ctx.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["migrations_current"], true);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_default_admin_can_log_in() {
    let Some(ctx) = TestContext::try_new().await else { return };

    // Only writes into empty tables, so a populated test database keeps its data
    let _ = seed_defaults(&ctx.db, "ori3").await;
    // Other tests may have populated the table first
    let Some(admin) = User::find_by_username(&ctx.db, BOOTSTRAP_ADMIN_USERNAME)
        .await
        .unwrap()
    else {
        return;
    };
    if !verify_password("ori3", &admin.password_hash).unwrap_or(false) {
        return;
    }

    let (status, body) = ctx
        .post("/login", None, json!({"username": "admin", "password": "ori3"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["user_id"], admin.id);
    assert!(body["token"].is_string());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_login_and_current_user() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (user, token) = ctx.session(UserRole::Employee).await;

    let (status, body) = ctx.get("/get_current_user", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user.id);
    assert_eq!(body["username"], user.username);
    assert_eq!(body["role"], "employee");
    assert_eq!(body["location"], ctx.location);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_failed_logins_are_rejected_without_a_session() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let user = ctx.create_user(UserRole::Employee).await;

    for _ in 0..3 {
        let (status, body) = ctx
            .post(
                "/login",
                None,
                json!({"username": user.username, "password": "wrong-passcode"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }

    // Unknown user gets the identical answer
    let (status, body) = ctx
        .post(
            "/login",
            None,
            json!({"username": format!("ghost-{}", Uuid::new_v4()), "password": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password");

    assert_eq!(Session::count_for_user(&ctx.db, user.id).await.unwrap(), 0);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_guard_rejects_missing_or_bad_tokens() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, _) = ctx.get("/get_current_user", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/get_current_user", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public routes need nothing
    let (status, _) = ctx.get("/get_locations", None).await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, token) = ctx.session(UserRole::Employee).await;

    let (status, _) = ctx.send(Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get("/get_current_user", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_role_gates_are_enforced_and_audited() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (employee, employee_token) = ctx.session(UserRole::Employee).await;
    let (_, manager_token) = ctx.session(UserRole::Manager).await;

    let (status, _) = ctx.get("/get_users", Some(&employee_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post(
            "/add_location",
            Some(&manager_token),
            json!({"location_name": "Pop-up", "mall": "Somewhere"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post(
            "/update_email_setting",
            Some(&manager_token),
            json!({"setting": "daily_email_enabled", "value": true}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let events: Vec<AuthAuditEvent> = sqlx::query_as(
        "SELECT id, username, user_id, event, detail, created_at FROM auth_audit_events WHERE user_id = $1",
    )
    .bind(employee.id)
    .fetch_all(&ctx.db)
    .await
    .unwrap();
    assert!(events.iter().any(|e| e.event == AuthEventKind::AccessDenied
        && e.detail.as_deref() == Some("GET /get_users")));

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_manager_sees_only_own_location() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let (_, admin_token) = ctx.session(UserRole::Admin).await;
    let local = ctx.create_user(UserRole::Employee).await;
    let elsewhere = ctx
        .create_user_at(UserRole::Employee, Some(format!("Elsewhere {}", Uuid::new_v4())))
        .await;

    let (status, body) = ctx.get("/get_users", Some(&manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert!(users.iter().all(|u| u["location"] == ctx.location.as_str()));
    assert!(users.iter().any(|u| u["id"] == local.id));
    assert!(!users.iter().any(|u| u["id"] == elsewhere.id));
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));

    let (status, body) = ctx.get("/get_users", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert!(users.iter().any(|u| u["id"] == local.id));
    assert!(users.iter().any(|u| u["id"] == elsewhere.id));

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_only_admin_assigns_admin_role() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let (_, admin_token) = ctx.session(UserRole::Admin).await;

    let username = format!("new-admin-{}", Uuid::new_v4().simple());
    let body = json!({
        "username": username,
        "passcode": "1234",
        "role": "admin",
        "location": ctx.location,
    });

    let (status, _) = ctx.post("/create_user", Some(&manager_token), body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = ctx.post("/create_user", Some(&admin_token), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["user"]["role"], "admin");
    assert_eq!(created["user"]["name"], username.as_str());

    let (status, _) = ctx.post("/create_user", Some(&admin_token), body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = created["user"]["id"].as_i64().unwrap();

    // A manager cannot remove an admin either
    let (status, _) = ctx
        .post("/remove_user", Some(&manager_token), json!({"user_id": id}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post("/remove_user", Some(&admin_token), json!({"user_id": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(User::find_by_id(&ctx.db, id).await.unwrap().is_none());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_manager_creates_users_at_own_location() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;

    let (status, _) = ctx
        .post(
            "/create_user",
            Some(&manager_token),
            json!({
                "username": format!("emp-{}", Uuid::new_v4().simple()),
                "passcode": "1234",
                "role": "employee",
                "location": "Some Other Store",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = ctx
        .post(
            "/create_user",
            Some(&manager_token),
            json!({
                "username": format!("emp-{}", Uuid::new_v4().simple()),
                "passcode": "1234",
                "role": "employee",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["user"]["location"], ctx.location.as_str());

    let id = created["user"]["id"].as_i64().unwrap();
    User::delete(&ctx.db, id).await.unwrap();

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_self_delete_is_rejected() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (admin, admin_token) = ctx.session(UserRole::Admin).await;

    let (status, _) = ctx
        .post("/remove_user", Some(&admin_token), json!({"user_id": admin.id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(User::find_by_id(&ctx.db, admin.id).await.unwrap().is_some());

    let (status, _) = ctx
        .post("/remove_user", Some(&admin_token), json!({"user_id": i64::MAX}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_change_own_passcode() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (user, token) = ctx.session(UserRole::Employee).await;

    let (status, _) = ctx
        .post("/change_passcode", Some(&token), json!({"new_passcode": "5678"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/change_passcode",
            Some(&token),
            json!({"new_passcode": "5678", "current_passcode": "wrong"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .post(
            "/change_passcode",
            Some(&token),
            json!({"new_passcode": "5678", "current_passcode": TEST_PASSCODE}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .post("/login", None, json!({"username": user.username, "password": "5678"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_employee_cannot_change_others_passcode() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, token) = ctx.session(UserRole::Employee).await;
    let other = ctx.create_user(UserRole::Employee).await;

    let (status, _) = ctx
        .post(
            "/change_passcode",
            Some(&token),
            json!({"user_id": other.id, "new_passcode": "5678"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_verify_and_confirm_passcode() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let manager = ctx.create_user(UserRole::Manager).await;
    let employee = ctx.create_user(UserRole::Employee).await;

    let (status, body) = ctx
        .post(
            "/verify_password",
            None,
            json!({"username": manager.username, "password": TEST_PASSCODE}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");

    let (status, _) = ctx
        .post(
            "/verify_password",
            None,
            json!({"username": employee.username, "password": TEST_PASSCODE}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post(
            "/confirm_passcode",
            None,
            json!({"user_id": employee.id, "passcode": TEST_PASSCODE}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .post(
            "/confirm_passcode",
            None,
            json!({"user_id": employee.id, "passcode": "nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_tracking_entry_uses_session_user() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (employee, token) = ctx.session(UserRole::Employee).await;
    let other = ctx.create_user(UserRole::Employee).await;

    let (status, body) = ctx
        .post(
            "/save_tracking_data",
            Some(&token),
            json!({
                "user_id": other.id,
                "opal_demos": 4,
                "opal_sales": 2,
                "net_sales": 310.5,
                "hours_worked": 6
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["entry"]["user_id"], employee.id);
    assert_eq!(body["entry"]["scan_demos"], 0);
    assert_eq!(body["email_sent"], true);

    let recipient = employee.email.clone().unwrap();
    let sent = ctx.transport.sent.lock().await;
    assert_eq!(sent.iter().filter(|m| m.recipient == recipient).count(), 1);
    drop(sent);
    assert_eq!(ctx.email_log_count(&recipient).await, 1);

    let (status, body) = ctx.get("/get_history", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert!(history
        .iter()
        .any(|row| row["user_id"] == employee.id && row["username"] == employee.username.as_str()));

    let (status, _) = ctx
        .post("/save_tracking_data", Some(&token), json!({"opal_demos": -1}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_disabled_auto_email_skips_performance_summary() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, admin_token) = ctx.session(UserRole::Admin).await;
    let (employee, token) = ctx.session(UserRole::Employee).await;

    let (status, body) = ctx
        .post(
            "/update_email_setting",
            Some(&admin_token),
            json!({"setting": "auto_email_enabled", "value": "false"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["settings"]["auto_email_enabled"], false);

    let (status, body) = ctx
        .post("/save_tracking_data", Some(&token), json!({"opal_demos": 1}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email_sent"], false);
    assert_eq!(body["email_error"], "Automatic emails are disabled");

    let recipient = employee.email.clone().unwrap();
    assert!(ctx
        .transport
        .sent
        .lock()
        .await
        .iter()
        .all(|m| m.recipient != recipient));

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM email_logs WHERE recipient = $1 AND status = 'skipped'",
    )
    .bind(&recipient)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(count, 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_test_email_is_sent_and_logged_once() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let recipient = format!("test-email-{}@example.com", Uuid::new_v4().simple());

    let (status, body) = ctx
        .post("/send_test_email", Some(&manager_token), json!({"email": recipient}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(ctx.email_log_count(&recipient).await, 1);

    let (status, body) = ctx.get("/get_email_logs?limit=500", Some(&manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .any(|log| log["recipient"] == recipient.as_str() && log["category"] == "test"));

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_email_settings_are_masked_and_allow_listed() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, admin_token) = ctx.session(UserRole::Admin).await;

    let (status, body) = ctx.get("/get_email_settings", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weekly_email_enabled"], true);
    assert_eq!(body["smtp_server"], "smtp.gmail.com");

    let (status, _) = ctx
        .post(
            "/update_email_setting",
            Some(&admin_token),
            json!({"setting": "smtp_server", "value": "evil.example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/update_email_setting",
            Some(&admin_token),
            json!({"setting": "daily_email_enabled", "value": "sometimes"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_form_round_trip_submit_and_cascade() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let questions = json!([{"id": "q1", "title": "Rate us", "type": "linear-scale"}]);

    let (status, form) = ctx
        .post(
            "/api/forms",
            Some(&manager_token),
            json!({"title": "Store visit", "questions": questions}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", form);
    let id = form["id"].as_i64().unwrap();

    let (status, fetched) = ctx.get(&format!("/api/forms/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["questions"], questions);

    let (status, _) = ctx
        .post(
            &format!("/api/forms/{}/submit", id),
            None,
            json!({"responses": {"q1": 5}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listing) = ctx
        .get(&format!("/api/forms/{}/responses", id), Some(&manager_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let responses = listing["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["answers"]["q1"], 5);
    assert_eq!(responses[0]["submitted_by"], "anonymous");

    let (status, legacy) = ctx
        .get(&format!("/api/form_responses/{}", id), Some(&manager_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(legacy["responses"], listing["responses"]);

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/forms/{}", id), Some(&manager_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .get(&format!("/api/forms/{}/responses", id), Some(&manager_token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM form_responses WHERE form_id = $1")
        .bind(id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_form_writes_need_manager_and_valid_questions() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, employee_token) = ctx.session(UserRole::Employee).await;
    let (_, manager_token) = ctx.session(UserRole::Manager).await;

    let (status, _) = ctx
        .post("/api/forms", Some(&employee_token), json!({"title": "Nope"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .post(
            "/api/forms",
            Some(&manager_token),
            json!({
                "title": "Broken",
                "questions": [{"id": "q1", "title": "Pick", "type": "multiple-choice"}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "questions");

    let (status, _) = ctx
        .post(&format!("/api/forms/{}/submit", i64::MAX), None, json!({"responses": {}}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_location_admin_crud() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, admin_token) = ctx.session(UserRole::Admin).await;

    let (status, body) = ctx
        .post(
            "/add_location",
            Some(&admin_token),
            json!({"location_name": "Harbor", "mall": "Pier Plaza"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["location"]["id"].as_i64().unwrap();

    let (status, body) = ctx
        .post(
            "/update_location",
            Some(&admin_token),
            json!({"location_id": id, "mall": "Pier Plaza East"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["location_name"], "Harbor");
    assert_eq!(body["location"]["mall"], "Pier Plaza East");

    let (status, body) = ctx.get(&format!("/get_location/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mall"], "Pier Plaza East");

    let (status, _) = ctx
        .post("/remove_location", Some(&admin_token), json!({"location_id": id}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get(&format!("/get_location/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_appointment_status_flow() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let token = format!("appt-{}", Uuid::new_v4().simple());

    let (status, _) = ctx
        .get(&format!("/api/appointment-status?token={}", token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post(
            "/api/appointment-status",
            None,
            json!({"token": token, "status": "rescheduled"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx
        .post(
            "/api/appointment-status",
            None,
            json!({"token": token, "status": "confirmed", "notes": "See you then"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["notification_sent"], true);

    let staff_mail = ctx
        .transport
        .sent
        .lock()
        .await
        .iter()
        .filter(|m| m.recipient == ctx.staff_email)
        .count();
    assert_eq!(staff_mail, 1);

    let (status, body) = ctx
        .get(&format!("/api/appointment-status?token={}", token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"]["status"], "confirmed");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_share_dialog_appointment_email() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, token) = ctx.session(UserRole::Employee).await;
    let recipient = format!("customer-{}@example.com", Uuid::new_v4().simple());
    let appointment = format!("appt-{}", Uuid::new_v4().simple());
    let link = format!(
        "https://monumetracker.com/static/appointment-status.html?token={}",
        appointment
    );

    let (status, body) = ctx
        .post(
            "/send_appointment_email",
            Some(&token),
            json!({
                "email": recipient,
                "subject": "Your MonuMe appointment",
                "appointmentData": {
                    "title": "Consultation",
                    "date": "2025-03-01",
                    "time": "2:00 PM",
                    "customerName": "Dana",
                    "salesRepName": "Sam"
                },
                "confirmationLink": link
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["token"], appointment.as_str());

    let sent = ctx.transport.sent.lock().await;
    let mail = sent
        .iter()
        .find(|m| m.recipient == recipient)
        .expect("confirmation sent");
    assert_eq!(mail.subject, "Your MonuMe appointment");
    assert!(mail.html.contains(&link));
    assert!(mail.html.contains("Sam"));
    assert!(mail.html.contains("Hi Dana,"));
    drop(sent);

    let (status, body) = ctx
        .get(&format!("/api/appointment-status?token={}", appointment), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"]["status"], "scheduled");

    let (status, _) = ctx
        .post(
            "/send_appointment_email",
            Some(&token),
            json!({"email": recipient, "appointmentData": {"date": "2025-03-01"}}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_event_page_simple_email() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, token) = ctx.session(UserRole::Employee).await;
    let recipient = format!("guest-{}@example.com", Uuid::new_v4().simple());

    let (status, body) = ctx
        .post(
            "/send_simple_email",
            Some(&token),
            json!({
                "to": recipient,
                "subject": "Invitation: Spring Launch",
                "body": "You're invited!\nSee you there."
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);

    let sent = ctx.transport.sent.lock().await;
    let mail = sent
        .iter()
        .find(|m| m.recipient == recipient)
        .expect("invitation sent");
    assert_eq!(mail.subject, "Invitation: Spring Launch");
    assert!(mail.html.contains("You&#x27;re invited!<br>"));
    drop(sent);

    assert_eq!(ctx.email_log_count(&recipient).await, 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_email_logs_report_outcome_totals() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let recipient = format!("totals-{}@example.com", Uuid::new_v4().simple());

    let (status, _) = ctx
        .post("/send_test_email", Some(&manager_token), json!({"email": recipient}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.get("/get_email_logs", Some(&manager_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["counts"]["success"].as_i64().unwrap() >= 1);
    assert!(body["counts"]["failed"].as_i64().is_some());
    assert!(body["counts"]["skipped"].as_i64().is_some());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_admin_reads_auth_audit() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let (_, admin_token) = ctx.session(UserRole::Admin).await;
    let (_, manager_token) = ctx.session(UserRole::Manager).await;
    let ghost = format!("ghost-{}", Uuid::new_v4().simple());

    let (status, _) = ctx
        .post("/login", None, json!({"username": ghost, "password": "nope"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx.get("/get_auth_audit?limit=500", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["events"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["username"] == ghost.as_str() && e["event"] == "login_failed"));

    let (status, _) = ctx.get("/get_auth_audit", Some(&manager_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_login_purges_abandoned_sessions() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let user = ctx.create_user(UserRole::Employee).await;

    let abandoned = Session::create(&ctx.db, user.id).await.unwrap();
    sqlx::query("UPDATE sessions SET last_seen_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
        .bind(abandoned.id)
        .execute(&ctx.db)
        .await
        .unwrap();

    ctx.login(&user).await;

    assert!(Session::find_by_id(&ctx.db, abandoned.id).await.unwrap().is_none());
    assert_eq!(Session::count_for_user(&ctx.db, user.id).await.unwrap(), 1);

    ctx.cleanup().await;
}
