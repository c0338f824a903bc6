//! End-to-end login and linking flows against mocked providers.

mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::{TestServer, hits};

#[tokio::test]
async fn test_health() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/health").send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_twitter_login_then_me_and_following() -> Result<()> {
    let server = TestServer::start().await?;
    server.mock_twitter().await;

    assert_eq!(server.login_twitter().await?, StatusCode::SEE_OTHER);

    let me = server.get("/twitterMe").send().await?;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(me.text().await?, "jack");

    let following: Vec<serde_json::Value> =
        server.get("/followingOnTwitter").send().await?.json().await?;
    assert_eq!(following.len(), 1);
    assert_eq!(following[0]["username"], "alice");
    Ok(())
}

#[tokio::test]
async fn test_twitter_callback_from_another_browser_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.mock_twitter().await;

    let body: serde_json::Value = server.get("/twitterLoginUrl").send().await?.json().await?;
    let login_url = url::Url::parse(body["twitterLoginUrl"].as_str().unwrap_or_default())?;
    let state = login_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    let stranger = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let response = stranger
        .get(format!(
            "{}/twitterAuth?code=abc&state={}",
            server.base_url(),
            state
        ))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits(&server.twitter, "/2/oauth2/token").await, 0);
    Ok(())
}

#[tokio::test]
async fn test_mastodon_login_registers_app_once() -> Result<()> {
    let server = TestServer::start().await?;
    server.mock_mastodon().await;

    assert_eq!(server.login_mastodon().await?, StatusCode::SEE_OTHER);
    assert_eq!(server.login_mastodon().await?, StatusCode::SEE_OTHER);
    assert_eq!(hits(&server.mastodon, "/api/v1/apps").await, 1);

    let me = server.get("/mastodonMe").send().await?;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(me.text().await?, "alice");
    Ok(())
}

#[tokio::test]
async fn test_link_match_and_unlink() -> Result<()> {
    let server = TestServer::start().await?;
    server.mock_twitter().await;
    server.mock_mastodon().await;

    server.login_mastodon().await?;

    let unmatched = server
        .post("/matchTwitterUserToMastodon")
        .body("123")
        .send()
        .await?;
    assert_eq!(unmatched.status(), StatusCode::NOT_FOUND);
    assert_eq!(unmatched.text().await?, "");

    server.login_twitter().await?;

    let linked = server
        .get("/addOrUpdateTwitterToMastodonMapping")
        .send()
        .await?;
    assert_eq!(linked.status(), StatusCode::OK);

    let matched = server
        .post("/matchTwitterUserToMastodon")
        .body("123")
        .send()
        .await?;
    assert_eq!(matched.status(), StatusCode::OK);
    assert_eq!(matched.text().await?, "alice@127.0.0.1");

    let unlinked = server.get("/deleteTwitterToMastodonLink").send().await?;
    assert_eq!(unlinked.status(), StatusCode::OK);

    let gone = server
        .post("/matchTwitterUserToMastodon")
        .body("123")
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_endpoints_require_session() -> Result<()> {
    let server = TestServer::start().await?;

    for endpoint in [
        "/twitterMe",
        "/followingOnTwitter",
        "/twitterDeAuth",
        "/mastodonMe",
        "/mastodonDeAuth",
        "/mastodonAuth?code=abc",
        "/addOrUpdateTwitterToMastodonMapping",
        "/deleteTwitterToMastodonLink",
    ] {
        let response = server.get(endpoint).send().await?;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} should require a session",
            endpoint
        );
    }

    assert!(server.twitter.received_requests().await.unwrap_or_default().is_empty());
    assert!(server.mastodon.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
