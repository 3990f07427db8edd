//! Board service: the news, free and anonymous boards.
//!
//! # Design
//! Pages name boards logically ("free", "anonymous"); the backend mounts them
//! under physical segments ("freeboard", "chatboard"). Every method resolves
//! the segment through `Board::resolve` before building a URL, so the mapping
//! lives in one table.
//!
//! Boards also differ in field names: the list field, the id parameter and
//! the comment/recommend payload keys. Those are looked up on `Board` too.

use std::fmt::Display;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::client::ApiClient;
use crate::error::{ApiError, Validated, ValidationError};
use crate::http::MultipartForm;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

/// Logical board identifiers and the path segment each is served under.
const BOARD_TYPE_MAPPING: &[(&str, &str)] = &[
    ("news", "news"),
    ("free", "freeboard"),
    ("anonymous", "chatboard"),
    ("chatboard", "chatboard"),
];

/// Physical path segment for a logical board type. Unknown types pass
/// through unchanged.
pub fn map_board_type(board_type: &str) -> &str {
    BOARD_TYPE_MAPPING
        .iter()
        .find(|(logical, _)| *logical == board_type)
        .map_or(board_type, |&(_, physical)| physical)
}

struct Board<'b> {
    segment: &'b str,
}

impl<'b> Board<'b> {
    fn resolve(board_type: &'b str) -> Self {
        Self {
            segment: map_board_type(board_type),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("/{}/{action}", self.segment)
    }

    /// Field of the list response holding the posts.
    fn list_field(&self) -> &'static str {
        match self.segment {
            "freeboard" => "freeboardList",
            "news" => "newsList",
            _ => "posts",
        }
    }

    /// Board-specific name of the post id.
    fn id_key(&self) -> &'static str {
        match self.segment {
            "freeboard" => "freeboardUid",
            "news" => "newsId",
            _ => "postId",
        }
    }

    /// Comment body key; `None` for boards without comments.
    fn comment_key(&self) -> Option<&'static str> {
        match self.segment {
            "freeboard" => Some("freeboardCommentContents"),
            "news" => Some("newsCommentContents"),
            _ => None,
        }
    }

    fn supports_reactions(&self) -> bool {
        matches!(self.segment, "freeboard" | "news")
    }

    fn unsupported(&self, operation: &'static str) -> ApiError {
        ApiError::UnsupportedBoard {
            operation,
            board: self.segment.to_string(),
        }
    }
}

/// Body of a new post. The caller says which encoding it wants.
#[derive(Debug, Clone, PartialEq)]
pub enum PostPayload {
    Json(Value),
    Multipart(MultipartForm),
}

/// One page of a board listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardPage {
    pub posts: Vec<Value>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
    pub total_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    current_page: Option<u32>,
    total_pages: Option<u32>,
    total_count: Option<u64>,
}

/// Post ids are positive integers; zero is never a real post.
fn parse_post_id(post_id: &dyn Display) -> Result<i64, ValidationError> {
    let raw = post_id.to_string();
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ValidationError::new(format!("Invalid post id: {raw:?}")))
}

pub struct BoardService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> BoardService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// List posts. The list is read from the board's own field; a response
    /// without it is a decode error.
    pub async fn get_posts(&self, board_type: &str, params: &Params) -> Result<BoardPage, ApiError> {
        let board = Board::resolve(board_type);
        let response = self.client.get(&board.endpoint("list"), params, false).await?;
        let posts: Vec<Value> = response.clone().decode_field(board.list_field())?;
        let meta: PageMeta = response.decode()?;
        Ok(BoardPage {
            posts,
            current_page: meta.current_page,
            total_pages: meta.total_pages,
            total_count: meta.total_count,
        })
    }

    /// Fetch one post with its comments. A non-numeric id is rejected
    /// locally and nothing is sent.
    pub async fn get_post(
        &self,
        board_type: &str,
        post_id: impl Display,
        increase_read_count: bool,
    ) -> Result<Validated<ApiResponse>, ApiError> {
        let board = Board::resolve(board_type);
        let id = match parse_post_id(&post_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(board = board.segment, "{e}");
                return Ok(Validated::Invalid(e));
            }
        };

        let mut params = Params::new()
            .with("id", id)
            .with("includeComments", true)
            .with(board.id_key(), id);
        if !increase_read_count {
            params.insert("increaseReadCount", false);
        }
        self.client
            .get(&board.endpoint("view"), &params, false)
            .await
            .map(Validated::Valid)
    }

    pub async fn create_post(&self, board_type: &str, payload: PostPayload) -> Result<ApiResponse, ApiError> {
        let board = Board::resolve(board_type);
        let url = board.endpoint("create");
        match payload {
            PostPayload::Json(body) => self.client.post_json(&url, &body, true).await,
            PostPayload::Multipart(form) => self.client.post_form_data(&url, form, true).await,
        }
    }

    /// Update a post; `data` fields are sent alongside `id` and win on
    /// conflict.
    pub async fn update_post(
        &self,
        board_type: &str,
        post_id: i64,
        data: Map<String, Value>,
    ) -> Result<ApiResponse, ApiError> {
        let board = Board::resolve(board_type);
        let mut body = Map::new();
        body.insert("id".to_string(), json!(post_id));
        body.extend(data);
        self.client.put_json(&board.endpoint("update.do"), &body, true).await
    }

    pub async fn delete_post(&self, board_type: &str, post_id: i64) -> Result<ApiResponse, ApiError> {
        let board = Board::resolve(board_type);
        self.client
            .post_json(&board.endpoint("delete"), &json!({ "id": post_id }), true)
            .await
    }

    /// Add a comment, optionally as a reply to `parent_id`. Boards without
    /// comments fail before any request is made.
    pub async fn create_comment(
        &self,
        board_type: &str,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<ApiResponse, ApiError> {
        let board = Board::resolve(board_type);
        let Some(content_key) = board.comment_key() else {
            return Err(board.unsupported("comments"));
        };
        let mut payload = Map::new();
        payload.insert(board.id_key().to_string(), json!(post_id));
        payload.insert(content_key.to_string(), json!(content));
        payload.insert("parentId".to_string(), json!(parent_id));
        self.client
            .post_json(&board.endpoint("addComment"), &payload, true)
            .await
    }

    /// Fetch comments. Caller `params` override the defaults.
    pub async fn get_comments(
        &self,
        board_type: &str,
        post_id: impl Display,
        params: &Params,
    ) -> Result<Validated<ApiResponse>, ApiError> {
        let board = Board::resolve(board_type);
        let id = match parse_post_id(&post_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(board = board.segment, "{e}");
                return Ok(Validated::Invalid(e));
            }
        };

        let mut query = Params::new()
            .with("postId", id)
            .with("id", id)
            .with("increaseReadCount", false);
        query.merge(params);
        self.client
            .get(&board.endpoint("comments"), &query, false)
            .await
            .map(Validated::Valid)
    }

    /// Recommend (or otherwise react to) a post.
    pub async fn react_to_post(
        &self,
        board_type: &str,
        post_id: i64,
        reaction_type: &str,
    ) -> Result<ApiResponse, ApiError> {
        let board = Board::resolve(board_type);
        if !board.supports_reactions() {
            return Err(board.unsupported("recommendation"));
        }
        let mut payload = Map::new();
        payload.insert(board.id_key().to_string(), json!(post_id));
        payload.insert("type".to_string(), json!(reaction_type));
        self.client
            .post_json(&board.endpoint("recommend"), &payload, true)
            .await
    }
}
