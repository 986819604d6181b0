use futures::future;
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

use crate::{
    config::Settings,
    error::FatalError,
    lemmy::{self, ForumApi, Jwt, LemmyClient, PostId, PostSummary, TITLE_PREFIX},
};

/// Full daily run: log in, post today's thread, pin it, unpin the stale ones
pub async fn run() -> Result<(), FatalError> {
    let settings = Settings::load()?;
    let client = LemmyClient::new(settings.base_url.clone());

    let auth = lemmy::log_in(&client, &settings).await?;
    tracing::info!("Log in successful");

    post_daily_thread(&client, &settings, &auth).await;
    Ok(())
}

// `Date.toDateString()` style, e.g. "Fri Aug 29 2026"
const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[weekday repr:short] [month repr:short] [day] [year]");

fn post_title(date: Date) -> String {
    format!("{TITLE_PREFIX} - {}", date.format(DATE_FORMAT).unwrap())
}

fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Everything past login is best-effort: each step failure is logged and
/// shrunk to a benign default instead of ending the run.
async fn post_daily_thread(api: &impl ForumApi, settings: &Settings, auth: &Jwt) {
    let title = post_title(today());
    tracing::info!(title, "Using post title");

    let new_id = match api.create_post(auth, settings.community_id, &title).await {
        Ok(id) => {
            tracing::info!(%id, "Post successful");
            id
        }
        Err(e) => {
            // Without a replacement thread there is nothing safe to unpin,
            // so the sweep is skipped too
            tracing::warn!(%e, "Post failed; leaving existing pinned threads alone");
            return;
        }
    };

    match api.feature_post(auth, new_id, true).await {
        Ok(()) => tracing::info!("Post has been featured"),
        Err(e) => tracing::warn!(%e, "Setting post featured failed"),
    }

    let posts = match api.list_posts(auth, settings.community_id).await {
        Ok(posts) => posts,
        Err(e) => {
            tracing::warn!(%e, "Listing community posts failed");
            Vec::new()
        }
    };

    let stale = stale_pins(&posts, new_id);
    if stale.is_empty() {
        tracing::info!("No stale pinned threads to clean up");
        return;
    }

    // All unfeature calls go out together; each one stands alone, and the run
    // waits for the stragglers so failures can be counted
    let results = future::join_all(
        stale
            .iter()
            .map(|&id| async move { (id, api.feature_post(auth, id, false).await) }),
    )
    .await;

    let mut failed = 0;
    for (id, result) in results {
        if let Err(e) = result {
            failed += 1;
            tracing::warn!(%id, %e, "Unfeaturing stale thread failed");
        }
    }
    tracing::info!(
        unfeatured = stale.len() - failed,
        failed,
        "Stale pin sweep finished"
    );
}

/// Previously pinned daily threads, excluding the one just created
fn stale_pins(posts: &[PostSummary], keep: PostId) -> Vec<PostId> {
    posts
        .iter()
        .filter(|post| post.featured && post.title.starts_with(TITLE_PREFIX))
        .map(|post| post.id)
        .filter(|&id| id != keep)
        .collect()
}
