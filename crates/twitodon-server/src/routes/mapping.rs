//! Twitter to Mastodon identity links.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use twitodon_oauth::MastodonHost;

use crate::error::Result;
use crate::session::SessionCookies;
use crate::state::AppState;

/// `GET|POST /addOrUpdateTwitterToMastodonMapping`
///
/// Links the signed-in Twitter account to the signed-in Mastodon account,
/// replacing any earlier link.
pub async fn add_or_update_mapping(
    State(state): State<AppState>,
    cookies: SessionCookies,
) -> Result<StatusCode> {
    let twitter_token = cookies.require_twitter_token()?;
    let mastodon_token = cookies.require_mastodon_token()?;
    let host = MastodonHost::parse(cookies.require_mastodon_host()?)?;

    let twitter_user = state.twitter.who_am_i(twitter_token).await?;
    let account = state.mastodon.who_am_i(&host, mastodon_token).await?;

    let address = state
        .identities
        .upsert(&twitter_user.id, &account.username, host.base_url())
        .await?;
    tracing::info!(twitter_id = %twitter_user.id, mastodon = %address, "Linked identities");

    Ok(StatusCode::OK)
}

/// `POST /matchTwitterUserToMastodon` with a Twitter user id as the body.
///
/// Answers with the linked `handle@host`, or 404 with an empty body.
pub async fn match_twitter_user(
    State(state): State<AppState>,
    cookies: SessionCookies,
    body: String,
) -> Result<Response> {
    cookies.require_mastodon_token()?;
    cookies.require_mastodon_host()?;

    match state.identities.lookup(body.trim()).await? {
        Some(address) => Ok((StatusCode::OK, address).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// `GET /deleteTwitterToMastodonLink`
pub async fn delete_mapping(
    State(state): State<AppState>,
    cookies: SessionCookies,
) -> Result<StatusCode> {
    let twitter_user = state
        .twitter
        .who_am_i(cookies.require_twitter_token()?)
        .await?;

    state.identities.remove(&twitter_user.id).await?;
    tracing::info!(twitter_id = %twitter_user.id, "Removed identity link");

    Ok(StatusCode::OK)
}

pub fn mapping_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addOrUpdateTwitterToMastodonMapping",
            get(add_or_update_mapping).post(add_or_update_mapping),
        )
        .route("/matchTwitterUserToMastodon", post(match_twitter_user))
        .route("/deleteTwitterToMastodonLink", get(delete_mapping))
}
