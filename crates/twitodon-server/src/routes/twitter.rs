//! Twitter login, identity, and following endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use twitodon_oauth::FollowEntry;

use crate::error::{Result, ServerError};
use crate::session::{
    RequestOrigin, SessionCookies, TWITTER_SESSION_COOKIE, TWITTER_TOKEN_COOKIE, login_cookie,
    removal_cookie, token_cookie,
};
use crate::state::AppState;

/// Path the provider redirects back to.
pub const TWITTER_CALLBACK_PATH: &str = "/twitterAuth";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterLoginUrlResponse {
    pub twitter_login_url: String,
}

/// Query parameters of the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// `GET /twitterLoginUrl`
///
/// Issues a login URL and pins its `state` to this browser with a
/// `twitterSession` cookie.
pub async fn twitter_login_url(
    State(state): State<AppState>,
    origin: RequestOrigin,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<TwitterLoginUrlResponse>)> {
    let login = state
        .twitter
        .build_login_url(&origin.url(TWITTER_CALLBACK_PATH))
        .await?;

    let jar = jar.add(login_cookie(
        TWITTER_SESSION_COOKIE,
        login.session_id,
        state.config.secure_cookies,
    ));

    Ok((
        jar,
        Json(TwitterLoginUrlResponse {
            twitter_login_url: login.authorization_url,
        }),
    ))
}

/// `GET /twitterAuth?code&state`
pub async fn twitter_auth(
    State(state): State<AppState>,
    origin: RequestOrigin,
    jar: SignedCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(SignedCookieJar, Redirect)> {
    let cookies = SessionCookies::from_jar(&jar);
    let session_id = cookies.require_twitter_session()?;

    if query.state.as_deref() != Some(session_id) {
        return Err(ServerError::SessionMismatch);
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    let grant = state
        .twitter
        .exchange_code(&code, session_id, &origin.url(TWITTER_CALLBACK_PATH))
        .await?;

    tracing::info!(expires_in = grant.expires_in, "Twitter login completed");

    let jar = jar.remove(removal_cookie(TWITTER_SESSION_COOKIE)).add(token_cookie(
        TWITTER_TOKEN_COOKIE,
        grant.access_token,
        grant.expires_in,
        state.config.secure_cookies,
    ));

    Ok((jar, Redirect::to("/")))
}

/// `GET /twitterDeAuth`
pub async fn twitter_deauth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, StatusCode)> {
    let cookies = SessionCookies::from_jar(&jar);
    state.twitter.revoke(cookies.require_twitter_token()?).await?;

    Ok((jar.remove(removal_cookie(TWITTER_TOKEN_COOKIE)), StatusCode::OK))
}

/// `GET /twitterMe`: the signed-in username as plain text.
pub async fn twitter_me(State(state): State<AppState>, cookies: SessionCookies) -> Result<String> {
    let user = state.twitter.who_am_i(cookies.require_twitter_token()?).await?;
    Ok(user.username)
}

/// `GET /followingOnTwitter`
pub async fn following_on_twitter(
    State(state): State<AppState>,
    cookies: SessionCookies,
) -> Result<Json<Vec<FollowEntry>>> {
    let token = cookies.require_twitter_token()?;
    let user = state.twitter.who_am_i(token).await?;
    Ok(Json(state.twitter.list_all_following(token, &user.id).await))
}

pub fn twitter_routes() -> Router<AppState> {
    Router::new()
        .route("/twitterLoginUrl", get(twitter_login_url))
        .route(TWITTER_CALLBACK_PATH, get(twitter_auth))
        .route("/twitterDeAuth", get(twitter_deauth))
        .route("/twitterMe", get(twitter_me))
        .route("/followingOnTwitter", get(following_on_twitter))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::routes::test_support::{body_string, cookie_value, get, signed_cookies};
    use crate::state::test_support;

    async fn mock_me(server: &MockServer, token: &str) {
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "123", "username": "jack", "name": "Jack"}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_url_sets_session_cookie_matching_state() {
        let state = test_support::state();
        let app = crate::Server::from_state(state.clone()).router();

        let response = app.oneshot(get("/twitterLoginUrl", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session = cookie_value(&state, &response, TWITTER_SESSION_COOKIE).unwrap();
        let body: TwitterLoginUrlResponse =
            serde_json::from_str(&body_string(response).await).unwrap();

        let url = url::Url::parse(&body.twitter_login_url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["state"], session);
        assert_eq!(params["client_id"], "test-client");
        assert_eq!(
            params["redirect_uri"],
            "https://twitodon.example/twitterAuth"
        );
        assert_eq!(params["code_challenge_method"], "plain");
        assert_eq!(session.len(), 64);
    }

    #[tokio::test]
    async fn test_me_without_cookie_makes_no_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = crate::Server::from_state(test_support::state_with_twitter(&server.uri())).router();
        let response = app.oneshot(get("/twitterMe", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], "missing_session_cookie");
    }

    #[tokio::test]
    async fn test_me_with_forged_cookie_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = crate::Server::from_state(test_support::state_with_twitter(&server.uri())).router();
        let response = app
            .oneshot(get("/twitterMe", Some("twitterToken=forged")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_returns_plain_username() {
        let server = MockServer::start().await;
        mock_me(&server, "t-token").await;

        let state = test_support::state_with_twitter(&server.uri());
        let cookie = signed_cookies(&state, &[(TWITTER_TOKEN_COOKIE, "t-token")]);
        let app = crate::Server::from_state(state).router();

        let response = app.oneshot(get("/twitterMe", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "jack");
    }

    #[tokio::test]
    async fn test_me_relays_upstream_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let state = test_support::state_with_twitter(&server.uri());
        let cookie = signed_cookies(&state, &[(TWITTER_TOKEN_COOKIE, "expired")]);
        let app = crate::Server::from_state(state).router();

        let response = app.oneshot(get("/twitterMe", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], "upstream_error");
    }

    #[tokio::test]
    async fn test_auth_rejects_state_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let state = test_support::state_with_twitter(&server.uri());
        let cookie = signed_cookies(&state, &[(TWITTER_SESSION_COOKIE, "session-a")]);
        let app = crate::Server::from_state(state).router();

        let response = app
            .oneshot(get("/twitterAuth?code=abc&state=session-b", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_without_session_cookie() {
        let app = crate::Server::from_state(test_support::state()).router();
        let response = app
            .oneshot(get("/twitterAuth?code=abc&state=s", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_sets_clamped_token_cookie_and_redirects() {
        let server = MockServer::start().await;
        let state = test_support::state_with_twitter(&server.uri());
        let login = state
            .twitter
            .build_login_url("https://twitodon.example/twitterAuth")
            .await
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t-token",
                "expires_in": 7200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cookie = signed_cookies(&state, &[(TWITTER_SESSION_COOKIE, &login.session_id)]);
        let app = crate::Server::from_state(state.clone()).router();
        let uri = format!("/twitterAuth?code=abc&state={}", login.session_id);
        let response = app.oneshot(get(&uri, Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
        assert_eq!(
            cookie_value(&state, &response, TWITTER_TOKEN_COOKIE).as_deref(),
            Some("t-token")
        );

        let token_header = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("twitterToken="))
            .unwrap()
            .to_string();
        assert!(token_header.contains("Max-Age=3600"));
        assert!(token_header.contains("SameSite=Strict"));
        assert!(token_header.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_auth_relays_provider_error_body() {
        let server = MockServer::start().await;
        let state = test_support::state_with_twitter(&server.uri());
        let login = state
            .twitter
            .build_login_url("https://twitodon.example/twitterAuth")
            .await
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":"invalid_request","error_description":"bad code"}"#),
            )
            .mount(&server)
            .await;

        let cookie = signed_cookies(&state, &[(TWITTER_SESSION_COOKIE, &login.session_id)]);
        let app = crate::Server::from_state(state).router();
        let uri = format!("/twitterAuth?code=bad&state={}", login.session_id);
        let response = app.oneshot(get(&uri, Some(&cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"invalid_request","error_description":"bad code"}"#
        );
    }

    #[tokio::test]
    async fn test_following_returns_entries() {
        let server = MockServer::start().await;
        mock_me(&server, "t-token").await;
        Mock::given(method("GET"))
            .and(path("/2/users/123/following"))
            .and(query_param("max_results", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "1", "username": "alice"},
                    {"id": "2", "username": "bob", "name": "Bob"}
                ],
                "meta": {"result_count": 2}
            })))
            .mount(&server)
            .await;

        let state = test_support::state_with_twitter(&server.uri());
        let cookie = signed_cookies(&state, &[(TWITTER_TOKEN_COOKIE, "t-token")]);
        let app = crate::Server::from_state(state).router();

        let response = app
            .oneshot(get("/followingOnTwitter", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let entries: Vec<FollowEntry> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].username, "bob");
    }

    #[tokio::test]
    async fn test_deauth_clears_token_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/revoke"))
            .and(body_string_contains("token=t-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"revoked": true})))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_support::state_with_twitter(&server.uri());
        let cookie = signed_cookies(&state, &[(TWITTER_TOKEN_COOKIE, "t-token")]);
        let app = crate::Server::from_state(state).router();

        let response = app.oneshot(get("/twitterDeAuth", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cleared = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.starts_with("twitterToken=") && v.contains("Max-Age=0"));
        assert!(cleared);
    }
}
