//! Mastodon login and identity endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use twitodon_oauth::{MastodonHost, OAuthError};

use crate::error::{Result, ServerError, relayed_status};
use crate::routes::twitter::CallbackQuery;
use crate::session::{
    MASTODON_HOST_COOKIE, MASTODON_TOKEN_COOKIE, RequestOrigin, SessionCookies, login_cookie,
    removal_cookie, token_cookie,
};
use crate::state::AppState;

pub const MASTODON_CALLBACK_PATH: &str = "/mastodonAuth";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MastodonLoginUrlResponse {
    pub mastodon_login_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUrlQuery {
    pub mastodon_host: Option<String>,
}

/// Host cookie parsed back into a server address.
fn host_from(cookies: &SessionCookies) -> Result<MastodonHost> {
    Ok(MastodonHost::parse(cookies.require_mastodon_host()?)?)
}

/// `GET /mastodonLoginUrl?mastodonHost`
///
/// Registers an app on first contact with the server, then remembers the
/// chosen server in the `mastodonHost` cookie.
pub async fn mastodon_login_url(
    State(state): State<AppState>,
    origin: RequestOrigin,
    jar: SignedCookieJar,
    Query(query): Query<LoginUrlQuery>,
) -> Result<(SignedCookieJar, Json<MastodonLoginUrlResponse>)> {
    let raw = query
        .mastodon_host
        .ok_or_else(|| ServerError::BadRequest("Missing mastodonHost".to_string()))?;
    let host = MastodonHost::parse(&raw)?;

    let url = state
        .mastodon
        .build_login_url(&host, &origin.url(MASTODON_CALLBACK_PATH))
        .await?;

    let jar = jar.add(login_cookie(
        MASTODON_HOST_COOKIE,
        host.base_url(),
        state.config.secure_cookies,
    ));

    Ok((
        jar,
        Json(MastodonLoginUrlResponse {
            mastodon_login_url: url,
        }),
    ))
}

/// `GET /mastodonAuth?code`
///
/// A rejected exchange answers with the provider's status and an empty body,
/// and drops any token cookie left from an earlier login.
pub async fn mastodon_auth(
    State(state): State<AppState>,
    origin: RequestOrigin,
    jar: SignedCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let host = host_from(&SessionCookies::from_jar(&jar))?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    match state
        .mastodon
        .exchange_code(&host, &code, &origin.url(MASTODON_CALLBACK_PATH))
        .await
    {
        Ok(grant) => {
            tracing::info!(domain = host.domain(), "Mastodon login completed");
            let jar = jar.add(token_cookie(
                MASTODON_TOKEN_COOKIE,
                grant.access_token,
                grant.expires_in,
                state.config.secure_cookies,
            ));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(OAuthError::TokenExchange { status, .. }) => Ok((
            relayed_status(status),
            jar.remove(removal_cookie(MASTODON_TOKEN_COOKIE)),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// `GET /mastodonDeAuth`
pub async fn mastodon_deauth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response> {
    let cookies = SessionCookies::from_jar(&jar);
    let token = cookies.require_mastodon_token()?;
    let host = host_from(&cookies)?;

    match state.mastodon.revoke(&host, token).await {
        Ok(()) => {
            let jar = jar.remove(removal_cookie(MASTODON_TOKEN_COOKIE));
            Ok((jar, StatusCode::OK).into_response())
        }
        Err(OAuthError::Revoke { status, .. }) => Ok(relayed_status(status).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// `GET /mastodonMe`: the signed-in username as plain text.
pub async fn mastodon_me(State(state): State<AppState>, cookies: SessionCookies) -> Result<String> {
    let token = cookies.require_mastodon_token()?;
    let host = host_from(&cookies)?;
    let account = state.mastodon.who_am_i(&host, token).await?;
    Ok(account.username)
}

pub fn mastodon_routes() -> Router<AppState> {
    Router::new()
        .route("/mastodonLoginUrl", get(mastodon_login_url))
        .route(MASTODON_CALLBACK_PATH, get(mastodon_auth))
        .route("/mastodonDeAuth", get(mastodon_deauth))
        .route("/mastodonMe", get(mastodon_me))
}
