use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::*;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = "linkhut-client/0.1";

const POSTS_ALL: &str = "v1/posts/all";
const POSTS_GET: &str = "v1/posts/get";
const POSTS_RECENT: &str = "v1/posts/recent";
const POSTS_ADD: &str = "v1/posts/add";
const POSTS_DELETE: &str = "v1/posts/delete";
const POSTS_SUGGEST: &str = "v1/posts/suggest";
const TAGS_GET: &str = "v1/tags/get";
const TAGS_RENAME: &str = "v1/tags/rename";
const TAGS_DELETE: &str = "v1/tags/delete";

/// Client for the LinkHut bookmarking API. One method per resource
/// action; every call is a single independent request/response cycle and
/// the client keeps no state beyond its immutable configuration.
#[derive(Debug, Clone)]
pub struct LinkHutClient {
    http: Client,
    base_url: Url,
    api_token: String,
}

impl LinkHutClient {
    pub fn new(config: Config) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(Error::MissingToken);
        }
        let mut base = config
            .base_url
            .parse::<Url>()
            .map_err(|err| Error::InvalidConfig(format!("invalid base url: {err}")))?;
        if !base.as_str().ends_with('/') {
            base = base
                .join("/")
                .map_err(|err| Error::InvalidConfig(format!("invalid base url: {err}")))?;
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| Error::InvalidConfig(format!("failed to build client: {err}")))?;

        Ok(Self {
            http,
            base_url: base,
            api_token: config.api_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists bookmarks matching the filter. `count` selects the most
    /// recent bookmarks (the server honors at most the first tag there);
    /// tag, date or URL filters go through the lookup endpoint; an empty
    /// filter fetches everything. No matches is an empty list, not an
    /// error.
    pub async fn get_bookmarks(&self, query: &ListQuery) -> Result<Vec<Bookmark>> {
        let mut params = Vec::new();
        let path = if let Some(count) = query.count.filter(|c| *c > 0) {
            params.push(("count".to_string(), count.to_string()));
            if let Some(tag) = &query.tag {
                // The recent endpoint accepts a single tag only.
                if let Some(first) = split_tags(tag).into_iter().next() {
                    validate_tag(&first)?;
                    params.push(("tag".to_string(), first));
                }
            }
            POSTS_RECENT
        } else if query.is_empty() {
            POSTS_ALL
        } else {
            if let Some(tag) = &query.tag {
                let tags = split_tags(tag);
                for tag in &tags {
                    validate_tag(tag)?;
                }
                params.push(("tag".to_string(), tags.join(" ")));
            }
            if let Some(date) = &query.date {
                validate_date(date)?;
                params.push(("dt".to_string(), date.clone()));
            }
            if let Some(url) = &query.url {
                params.push(("url".to_string(), url.clone()));
            }
            POSTS_GET
        };

        let payload: PostsPayload = self.get(path, params, "bookmarks", true).await?;
        Ok(payload.into_posts())
    }

    /// Creates a bookmark. The title defaults to the URL; when no tags
    /// are given and `suggest_tags` is set, the server's suggestions are
    /// applied (a failed suggestion lookup degrades to no tags). A
    /// bookmark that already exists fails with `AlreadyExists` unless
    /// `replace` is set.
    pub async fn create_bookmark(&self, req: &CreateBookmark) -> Result<Bookmark> {
        validate_url(&req.url)?;
        for tag in &req.tags {
            validate_tag(tag)?;
        }

        let title = if req.title.trim().is_empty() {
            req.url.clone()
        } else {
            req.title.clone()
        };

        let mut tags = req.tags.clone();
        if tags.is_empty() && req.suggest_tags {
            match self.suggest_tags(&req.url).await {
                Ok(suggestions) => {
                    tags = suggestions
                        .merged()
                        .into_iter()
                        .filter(|tag| validate_tag(tag).is_ok())
                        .collect();
                }
                Err(err) => {
                    warn!(url = %req.url, %err, "tag suggestion lookup failed");
                }
            }
        }

        let mut params = vec![
            ("url".to_string(), req.url.clone()),
            ("description".to_string(), title.clone()),
            ("tags".to_string(), tags.join(" ")),
            ("replace".to_string(), yes_no(req.replace)),
            ("toread".to_string(), yes_no(req.to_read)),
            ("shared".to_string(), yes_no(!req.private)),
        ];
        if !req.note.trim().is_empty() {
            params.push(("extended".to_string(), req.note.clone()));
        }

        let result: ApiResult = self.get(POSTS_ADD, params, "bookmark", false).await?;
        if !result.is_done() {
            if req.replace {
                return Err(Error::Api {
                    status: StatusCode::OK,
                    message: format!("unexpected result code: {}", result.result_code),
                });
            }
            return Err(Error::AlreadyExists {
                url: req.url.clone(),
            });
        }

        Ok(Bookmark {
            url: req.url.clone(),
            title,
            note: req.note.clone(),
            tags,
            shared: !req.private,
            toread: req.to_read,
            time: None,
            hash: None,
        })
    }

    /// Updates the bookmark at `url`, creating it when it does not exist.
    /// Tags and note are appended to the current values unless the update
    /// asks to replace them; unset flags keep their current state.
    pub async fn update_bookmark(&self, url: &str, update: &BookmarkUpdate) -> Result<Bookmark> {
        validate_url(url)?;
        if update.is_empty() {
            return Err(Error::Validation("no update parameters provided".into()));
        }

        let existing = self
            .get_bookmarks(&ListQuery {
                url: Some(url.to_string()),
                ..ListQuery::default()
            })
            .await?
            .into_iter()
            .next();

        let Some(current) = existing else {
            debug!(%url, "bookmark not found, creating it");
            return self
                .create_bookmark(
                    &CreateBookmark::new(url)
                        .tags(update.tags.clone().unwrap_or_default())
                        .note(update.note.clone().unwrap_or_default())
                        .private(update.private.unwrap_or(false))
                        .to_read(update.to_read.unwrap_or(false)),
                )
                .await;
        };

        let private = update.private.unwrap_or(current.is_private());
        let to_read = update.to_read.unwrap_or(current.toread);

        // Nothing would change; skip the write.
        if update.tags.is_none()
            && update.note.is_none()
            && private == current.is_private()
            && to_read == current.toread
        {
            debug!(%url, "bookmark already in the desired state");
            return Ok(current);
        }

        let tags = match (&update.tags, update.replace) {
            (Some(new_tags), true) => new_tags.clone(),
            (Some(new_tags), false) => {
                let mut merged = current.tags.clone();
                for tag in new_tags {
                    if !merged.contains(tag) {
                        merged.push(tag.clone());
                    }
                }
                merged
            }
            (None, _) => current.tags.clone(),
        };
        let note = match (&update.note, update.replace) {
            (Some(new_note), true) => new_note.clone(),
            (Some(new_note), false) if current.note.is_empty() => new_note.clone(),
            (Some(new_note), false) => format!("{} {}", current.note, new_note),
            (None, _) => current.note.clone(),
        };
        let title = if current.title.is_empty() {
            url.to_string()
        } else {
            current.title.clone()
        };

        self.create_bookmark(
            &CreateBookmark::new(url)
                .title(title)
                .tags(tags)
                .note(note)
                .private(private)
                .to_read(to_read)
                .replace(true)
                .suggest_tags(false),
        )
        .await
    }

    /// Fetches the most recent bookmarks marked as to-read.
    pub async fn get_reading_list(&self, count: u32) -> Result<Vec<Bookmark>> {
        self.get_bookmarks(&ListQuery {
            tag: Some("unread".to_string()),
            count: Some(count),
            ..ListQuery::default()
        })
        .await
    }

    /// Deletes the bookmark at `url`. A bookmark that does not exist
    /// fails with `NotFound`.
    pub async fn delete_bookmark(&self, url: &str) -> Result<()> {
        validate_url(url)?;
        let params = vec![("url".to_string(), url.to_string())];
        let result: ApiResult = self.get(POSTS_DELETE, params, "bookmark", false).await?;
        if !result.is_done() {
            return Err(Error::not_found(format!("bookmark {url}")));
        }
        Ok(())
    }

    /// Lists all tags with their usage counts, sorted by name.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let payload: TagsPayload = self.get(TAGS_GET, Vec::new(), "tags", true).await?;
        Ok(payload.into_tags())
    }

    /// Renames a tag across all bookmarks.
    pub async fn rename_tag(&self, old: &str, new: &str) -> Result<()> {
        validate_tag(old)?;
        validate_tag(new)?;
        let params = vec![
            ("old".to_string(), old.to_string()),
            ("new".to_string(), new.to_string()),
        ];
        let result: ApiResult = self.get(TAGS_RENAME, params, "tag", false).await?;
        if !result.is_done() {
            return Err(Error::not_found(format!("tag {old}")));
        }
        Ok(())
    }

    /// Removes a tag from all bookmarks.
    pub async fn delete_tag(&self, name: &str) -> Result<()> {
        validate_tag(name)?;
        let params = vec![("tag".to_string(), name.to_string())];
        let result: ApiResult = self.get(TAGS_DELETE, params, "tag", false).await?;
        if !result.is_done() {
            return Err(Error::not_found(format!("tag {name}")));
        }
        Ok(())
    }

    /// Asks the server for tag suggestions for a URL.
    pub async fn suggest_tags(&self, url: &str) -> Result<TagSuggestions> {
        validate_url(url)?;
        let params = vec![("url".to_string(), url.to_string())];
        let entries: Vec<SuggestEntry> = self.get(POSTS_SUGGEST, params, "suggestions", true).await?;
        Ok(TagSuggestions::from_entries(entries))
    }

    async fn get<T>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        resource: &str,
        retry: bool,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, query, Option::<&()>::None, resource, retry)
            .await
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&B>,
        resource: &str,
        retry: bool,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| Error::InvalidConfig(format!("invalid url: {err}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }

        let mut attempts = 0usize;
        let max_attempts = if retry { 3 } else { 1 };
        loop {
            attempts += 1;
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            // Keep the token value out of logs.
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", self.api_token))
                    .map_err(|_| Error::InvalidConfig("invalid characters in api token".into()))?,
            );

            let mut req = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers);
            if let Some(b) = body {
                req = req.json(b);
            }

            debug!(%method, path, attempt = attempts, "sending request");
            let response = req.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            if status.is_success() {
                let parsed = response.json::<T>().await?;
                return Ok(parsed);
            }

            let text = response.text().await.unwrap_or_default();
            let should_retry = retry && is_retryable(status);

            if should_retry && attempts < max_attempts {
                let delay = compute_backoff(attempts, headers.get(RETRY_AFTER));
                warn!(%status, path, attempt = attempts, "retrying after transient failure");
                sleep(delay).await;
                continue;
            }

            return Err(Error::from_status(status, resource, text));
        }
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn compute_backoff(attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(header) = retry_after
        && let Ok(val) = header.to_str()
        && let Ok(secs) = val.parse::<u64>()
    {
        return Duration::from_secs(secs);
    }
    let base = 500u64 * (1 << (attempt.saturating_sub(1)).min(4));
    Duration::from_millis(base)
}
