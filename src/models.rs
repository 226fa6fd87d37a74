use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_TAG_LENGTH: usize = 50;

/// A saved link as the LinkHut API represents it. Field names follow the
/// wire format (`href`, `description`, `extended`); booleans travel as
/// `"yes"`/`"no"` and tags as a single space-separated string.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "href", alias = "url")]
    pub url: String,
    #[serde(rename = "description", default)]
    pub title: String,
    #[serde(rename = "extended", default)]
    pub note: String,
    #[serde(rename = "tags", alias = "tag", default, with = "space_tags")]
    pub tags: Vec<String>,
    #[serde(default, with = "yes_no")]
    pub shared: bool,
    #[serde(default, with = "yes_no")]
    pub toread: bool,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl Bookmark {
    /// Builds a bookmark for the given URL, validating it up front.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;
        Ok(Self {
            url,
            title: String::new(),
            note: String::new(),
            tags: Vec::new(),
            shared: true,
            toread: false,
            time: None,
            hash: None,
        })
    }

    pub fn is_private(&self) -> bool {
        !self.shared
    }
}

/// A user-defined label with its usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "tag", alias = "name")]
    pub name: String,
    #[serde(default, deserialize_with = "flexible_count")]
    pub count: u64,
}

/// The tag listing endpoint has been observed returning both a
/// `{"name": count}` map and a plain list, so both shapes are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsPayload {
    List(Vec<Tag>),
    Map(BTreeMap<String, CountValue>),
}

impl TagsPayload {
    pub fn into_tags(self) -> Vec<Tag> {
        let mut tags = match self {
            TagsPayload::List(tags) => tags,
            TagsPayload::Map(map) => map
                .into_iter()
                .map(|(name, count)| Tag {
                    name,
                    count: count.into(),
                })
                .collect(),
        };
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }
}

/// Counts arrive as numbers or numeric strings depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Number(u64),
    Text(String),
}

impl From<CountValue> for u64 {
    fn from(value: CountValue) -> Self {
        match value {
            CountValue::Number(n) => n,
            CountValue::Text(raw) => raw.trim().parse().unwrap_or(0),
        }
    }
}

fn flexible_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    CountValue::deserialize(deserializer).map(u64::from)
}

/// Tag suggestions for a URL, split the way `/v1/posts/suggest` reports
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSuggestions {
    pub popular: Vec<String>,
    pub recommended: Vec<String>,
}

impl TagSuggestions {
    pub(crate) fn from_entries(entries: Vec<SuggestEntry>) -> Self {
        let mut suggestions = Self::default();
        for entry in entries {
            suggestions.popular.extend(entry.popular);
            suggestions.recommended.extend(entry.recommended);
        }
        suggestions
    }

    /// Popular and recommended tags merged, duplicates removed.
    pub fn merged(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for tag in self.popular.iter().chain(self.recommended.iter()) {
            if !seen.contains(tag) {
                seen.push(tag.clone());
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.popular.is_empty() && self.recommended.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SuggestEntry {
    #[serde(default)]
    pub popular: Vec<String>,
    #[serde(default)]
    pub recommended: Vec<String>,
}

/// Parameters for creating (or replacing) a bookmark.
#[derive(Debug, Clone)]
pub struct CreateBookmark {
    pub url: String,
    pub title: String,
    pub note: String,
    pub tags: Vec<String>,
    pub private: bool,
    pub to_read: bool,
    pub replace: bool,
    /// Ask the server for tag suggestions when no tags are given.
    pub suggest_tags: bool,
}

impl CreateBookmark {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            note: String::new(),
            tags: Vec::new(),
            private: false,
            to_read: false,
            replace: false,
            suggest_tags: true,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn to_read(mut self, to_read: bool) -> Self {
        self.to_read = to_read;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn suggest_tags(mut self, suggest: bool) -> Self {
        self.suggest_tags = suggest;
        self
    }
}

/// Changes to apply to an existing bookmark. Unset fields are preserved.
#[derive(Debug, Clone, Default)]
pub struct BookmarkUpdate {
    pub tags: Option<Vec<String>>,
    pub note: Option<String>,
    pub private: Option<bool>,
    pub to_read: Option<bool>,
    /// Replace existing tags and note instead of appending to them.
    pub replace: bool,
}

impl BookmarkUpdate {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none()
            && self.note.is_none()
            && self.private.is_none()
            && self.to_read.is_none()
    }
}

/// Filter for listing bookmarks. An empty filter selects everything.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Tags to filter by, space or comma separated.
    pub tag: Option<String>,
    /// Day to filter by, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Exact URL to look up.
    pub url: Option<String>,
    /// Number of recent bookmarks to fetch.
    pub count: Option<u32>,
}

impl ListQuery {
    /// True when the filter selects everything; a zero count is treated
    /// as unset.
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.date.is_none()
            && self.url.is_none()
            && self.count.unwrap_or(0) == 0
    }
}

/// Envelope around the `posts` list returned by the bookmark endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<Bookmark>,
}

/// `/v1/posts/get` and `/v1/posts/recent` wrap the list in an envelope
/// while `/v1/posts/all` returns a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostsPayload {
    Bare(Vec<Bookmark>),
    Wrapped(PostsResponse),
}

impl PostsPayload {
    pub fn into_posts(self) -> Vec<Bookmark> {
        match self {
            PostsPayload::Bare(posts) => posts,
            PostsPayload::Wrapped(envelope) => envelope.posts,
        }
    }
}

/// Envelope for mutating endpoints; success is `result_code: "done"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult {
    #[serde(default)]
    pub result_code: String,
}

impl ApiResult {
    pub fn is_done(&self) -> bool {
        self.result_code == "done"
    }
}

/// Checks that a URL is non-empty, uses an http(s) scheme and fits the
/// server's length limit.
pub fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::Validation("URL must not be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::Validation(format!(
            "URL must start with http:// or https://: {url}"
        )));
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(Error::Validation(format!(
            "URL length exceeds {MAX_URL_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Checks that a tag name is non-empty, fits the length limit and only
/// contains alphanumerics, hyphens and underscores.
pub fn validate_tag(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("tag must not be empty".into()));
    }
    if name.len() > MAX_TAG_LENGTH {
        return Err(Error::Validation(format!(
            "tag '{name}' exceeds maximum length of {MAX_TAG_LENGTH} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Validation(format!(
            "tag '{name}' contains invalid characters; only alphanumeric, hyphen and underscore are allowed"
        )));
    }
    Ok(())
}

/// Checks that a date filter is a calendar date in `YYYY-MM-DD` form.
pub fn validate_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            Error::Validation(format!(
                "invalid date '{date}'; expected YYYY-MM-DD"
            ))
        })
}

/// Splits a user-supplied tag string on spaces, commas and semicolons.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([' ', ',', ';'])
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Ok(flag),
            Raw::Text(text) => Ok(text.eq_ignore_ascii_case("yes")),
        }
    }
}

mod space_tags {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        tags: &[String],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&tags.join(" "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            List(Vec<String>),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Ok(super::split_tags(&text)),
            Raw::List(list) => Ok(list),
        }
    }
}
