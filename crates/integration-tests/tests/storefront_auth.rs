//! Integration tests for sign-up, sign-in, and cart sync across sessions.

use beanvoyage_integration_tests::{TestContext, user_id};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_fresh_browser_is_anonymous() {
    let ctx = TestContext::new().await;
    let me = ctx.browser().get_json("/auth/me").await;
    assert_eq!(me, json!({ "state": "anonymous" }));
}

#[tokio::test]
async fn test_sign_up_authenticates_and_creates_profile() {
    let ctx = TestContext::new().await;
    let browser = ctx.browser();

    let session = browser.sign_up("ada@beanvoyage.coffee").await;
    assert_eq!(session["state"], "authenticated");
    assert_eq!(session["identity"]["email"], "ada@beanvoyage.coffee");

    let me = browser.get_json("/auth/me").await;
    assert_eq!(me, session);

    let profile = browser.get_json("/account/profile").await;
    assert_eq!(profile["first_name"], "Ada");
    assert_eq!(profile["is_admin"], false);
}

#[tokio::test]
async fn test_sign_up_validation() {
    let ctx = TestContext::new().await;
    let browser = ctx.browser();

    let mismatch = browser
        .post_json(
            "/auth/signup",
            &json!({
                "email": "ada@beanvoyage.coffee",
                "password": "espresso",
                "confirm_password": "latte!!",
                "first_name": "Ada",
                "last_name": "Byron",
            }),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(mismatch["error"], "Passwords do not match");

    let short = browser
        .post_json(
            "/auth/signup",
            &json!({
                "email": "ada@beanvoyage.coffee",
                "password": "mocha",
                "confirm_password": "mocha",
                "first_name": "Ada",
                "last_name": "Byron",
            }),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(short["error"], "Password must be at least 6 characters");

    browser.sign_up("ada@beanvoyage.coffee").await;
    let duplicate = ctx
        .browser()
        .post_json(
            "/auth/signup",
            &json!({
                "email": "ada@beanvoyage.coffee",
                "password": "espresso",
                "confirm_password": "espresso",
                "first_name": "Ada",
                "last_name": "Byron",
            }),
            StatusCode::CONFLICT,
        )
        .await;
    assert_eq!(duplicate["error"], "An account with this email already exists");
}

#[tokio::test]
async fn test_wrong_password_leaves_session_anonymous() {
    let ctx = TestContext::new().await;
    ctx.browser().sign_up("ada@beanvoyage.coffee").await;

    let browser = ctx.browser();
    let resp = browser.log_in("ada@beanvoyage.coffee", "decaf!").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid login credentials");

    let me = browser.get_json("/auth/me").await;
    assert_eq!(me["state"], "anonymous");
}

#[tokio::test]
async fn test_cart_follows_the_account() {
    let ctx = TestContext::new().await;
    let laptop = ctx.browser();
    let session = laptop.sign_up("ada@beanvoyage.coffee").await;
    let user = user_id(&session);

    laptop.add_to_cart("1").await;
    laptop.add_to_cart("8").await;
    let stored = ctx.wait_for_stored_cart(user, 2).await;
    assert_eq!(stored[1].product_id.as_str(), "8");

    // A second device picks up the stored cart on sign-in
    let phone = ctx.browser();
    phone.add_to_cart("3").await;
    let resp = phone.log_in("ada@beanvoyage.coffee", "espresso").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = phone.get_json("/cart").await;
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["lines"][0]["product_id"], "1");

    // Signing out empties the local cart but not the stored one
    let session = laptop.log_out().await;
    assert_eq!(session["state"], "anonymous");
    assert_eq!(laptop.get_json("/cart").await["item_count"], 0);
    assert_eq!(ctx.backend.stored_cart(user).unwrap().len(), 2);

    // Anonymous changes after sign-out are never pushed
    laptop.add_to_cart("5").await;
    assert_eq!(ctx.backend.stored_cart(user).unwrap().len(), 2);
}

#[tokio::test]
async fn test_cart_follows_the_account_on_fresh_database() {
    let ctx = TestContext::fresh_database().await;
    let laptop = ctx.browser();
    let user = user_id(&laptop.sign_up("ada@beanvoyage.coffee").await);

    laptop.add_to_cart("8").await;
    ctx.wait_for_stored_cart(user, 1).await;

    let phone = ctx.browser();
    let resp = phone.log_in("ada@beanvoyage.coffee", "espresso").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = phone.get_json("/cart").await;
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["lines"][0]["product_id"], "8");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let ctx = TestContext::new().await;
    let browser = ctx.browser();
    browser.sign_up("ada@beanvoyage.coffee").await;
    browser.log_out().await;

    let resp = browser.get("/account/profile").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Please sign in to continue");
}

#[tokio::test]
async fn test_reset_password_is_accepted() {
    let ctx = TestContext::new().await;
    let browser = ctx.browser();
    browser
        .post_json(
            "/auth/reset-password",
            &json!({ "email": "ada@beanvoyage.coffee" }),
            StatusCode::OK,
        )
        .await;
    assert_eq!(ctx.identity.recovery_requests().len(), 1);

    browser
        .post_json(
            "/auth/reset-password",
            &json!({ "email": "not-an-email" }),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn test_local_only_sign_in_unavailable() {
    let ctx = TestContext::local_only().await;
    let browser = ctx.browser();

    let resp = browser.log_in("ada@beanvoyage.coffee", "espresso").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Authentication service is not configured");

    // The cart still works locally
    let cart = browser.add_to_cart("2").await;
    assert_eq!(cart["item_count"], 1);
    assert_eq!(ctx.backend.cart_write_count(), 0);
}
