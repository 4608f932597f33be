//! Remote collaborators: platform version APIs, GitHub releases, Trello.

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

use crate::context::{Options, RunContext};
use crate::pipeline::StepOutcome;
use crate::steps::{preconditions, rewrite};
use crate::{shlog, shlog_debug, shlog_warn, Error, Result};

const WORDPRESS_VERSION_URL: &str = "https://api.wordpress.org/core/version-check/1.7/";
const WOOCOMMERCE_INFO_URL: &str = "https://api.wordpress.org/plugins/info/1.0/woocommerce.json";
const GITHUB_API: &str = "https://api.github.com";
const GITHUB_UPLOADS: &str = "https://uploads.github.com";
const TRELLO_API: &str = "https://api.trello.com/1";

const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Latest WordPress core version from the version-check API.
pub async fn latest_wordpress_version(client: &Client) -> Result<String> {
    let payload: Value = client
        .get(WORDPRESS_VERSION_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    offer_version(&payload)
        .ok_or_else(|| Error::Validation("Unexpected version-check payload".to_string()))
}

/// Latest WooCommerce version from the plugin info API.
pub async fn latest_woocommerce_version(client: &Client) -> Result<String> {
    let payload: Value = client
        .get(WOOCOMMERCE_INFO_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    payload["version"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Validation("Unexpected plugin info payload".to_string()))
}

fn offer_version(payload: &Value) -> Option<String> {
    payload["offers"][0]["version"].as_str().map(str::to_string)
}

/// Best-effort enrichment: look up the live platform versions and rewrite
/// the "Tested up to" metadata. A failure here is logged and never aborts
/// the pipeline.
pub async fn tested_up_to(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    if ctx.opts().await.dry_run {
        shlog!("dry run: skipping tested-up-to lookup");
        return Ok(StepOutcome::Continue);
    }
    match try_tested_up_to(&ctx).await {
        Ok((wp, wc)) => shlog!("tested up to: wordpress {}, woocommerce {}", wp, wc),
        Err(e) => shlog_warn!("tested-up-to lookup failed (continuing): {}", e),
    }
    Ok(StepOutcome::Continue)
}

async fn try_tested_up_to(ctx: &RunContext) -> Result<(String, String)> {
    let client = client()?;
    let wp = latest_wordpress_version(&client).await?;
    let wc = latest_woocommerce_version(&client).await?;
    rewrite::apply_tested_up_to(ctx, &wp, Some(&wc)).await?;
    ctx.update(|o| {
        o.wp_version = Some(wp.clone());
        o.wc_version = Some(wc.clone());
    })
    .await;
    Ok((wp, wc))
}

/// Create the GitHub release for the tag and attach the packaged zip.
pub async fn github_release(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let opts = ctx.opts().await;
    let version = rewrite::release_version(&ctx).await?;
    let (owner, repo) = github_coords(&ctx, &opts)?;
    let tag = format!("v{}", version);

    if opts.dry_run {
        shlog!("dry run: would create release {} on {}/{}", tag, owner, repo);
        return Ok(StepOutcome::Continue);
    }

    let token = std::env::var(preconditions::GITHUB_TOKEN)
        .map_err(|_| Error::MissingEnv(preconditions::GITHUB_TOKEN.to_string()))?;
    let client = client()?;

    let response = client
        .post(format!("{}/repos/{}/{}/releases", GITHUB_API, owner, repo))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "tag_name": tag,
            "name": tag,
            "body": format!("Release {}", version),
        }))
        .send()
        .await?;
    let release = read_json("GitHub", response).await?;
    let release_id = release["id"]
        .as_u64()
        .ok_or_else(|| Error::Validation("GitHub release response had no id".to_string()))?;
    shlog!("created GitHub release {} ({})", tag, release_id);

    let asset_name = format!("{}.zip", ctx.config.slug);
    let asset = tokio::fs::read(ctx.zip_path()).await?;
    let response = client
        .post(format!(
            "{}/repos/{}/{}/releases/{}/assets",
            GITHUB_UPLOADS, owner, repo, release_id
        ))
        .bearer_auth(&token)
        .query(&[("name", asset_name.as_str())])
        .header("Content-Type", "application/zip")
        .body(asset)
        .send()
        .await?;
    read_json("GitHub", response).await?;
    shlog!("uploaded {}", asset_name);

    Ok(StepOutcome::Continue)
}

fn github_coords(ctx: &RunContext, opts: &Options) -> Result<(String, String)> {
    if let (Some(owner), Some(repo)) = (&opts.owner, &opts.repo) {
        return Ok((owner.clone(), repo.clone()));
    }
    ctx.config
        .github
        .as_ref()
        .map(|g| (g.owner.clone(), g.repo.clone()))
        .ok_or_else(|| Error::Validation("No GitHub owner/repo configured".to_string()))
}

/// Comment the release on the configured Trello card.
pub async fn trello_comment(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let card = match &ctx.config.trello {
        Some(trello) => trello.card_id.clone(),
        None => {
            shlog_debug!("no Trello card configured, skipping");
            return Ok(StepOutcome::Continue);
        }
    };
    let version = rewrite::release_version(&ctx).await?;
    if ctx.opts().await.dry_run {
        shlog!("dry run: would comment release {} on card {}", version, card);
        return Ok(StepOutcome::Continue);
    }

    let key = std::env::var(preconditions::TRELLO_KEY)
        .map_err(|_| Error::MissingEnv(preconditions::TRELLO_KEY.to_string()))?;
    let token = std::env::var(preconditions::TRELLO_TOKEN)
        .map_err(|_| Error::MissingEnv(preconditions::TRELLO_TOKEN.to_string()))?;

    let text = format!("Released version {}", version);
    let client = client()?;
    let response = client
        .post(format!("{}/cards/{}/actions/comments", TRELLO_API, card))
        .query(&[
            ("key", key.as_str()),
            ("token", token.as_str()),
            ("text", text.as_str()),
        ])
        .send()
        .await?;
    read_json("Trello", response).await?;
    shlog!("commented release {} on Trello card {}", version, card);

    Ok(StepOutcome::Continue)
}

async fn read_json(service: &'static str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            service,
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        });
    }
    Ok(response.json().await?)
}
