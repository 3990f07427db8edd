//! In-memory stand-in for the Kirini backend.
//!
//! Serves the subset of `.do` and board endpoints the client talks to, with
//! the same dual authentication the real site uses: a bearer token issued at
//! login and a `JSESSIONID` session cookie. Either one authorizes a request.
//! A few fixture routes (`/echo`, `/headers`, `/fail/*`, `/text`, `/empty`)
//! exist only to exercise the client's response handling.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "JSESSIONID";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub nickname: String,
    pub user_authority: String,
}

#[derive(Clone, Debug)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub contents: String,
    pub author: String,
    pub attachments: usize,
    pub read_count: u32,
    pub comments: Vec<Value>,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
    sessions: HashMap<String, String>,
    boards: HashMap<String, Vec<Post>>,
    next_id: i64,
}

impl Store {
    /// A store with one registered user, `kim@kirini.test` / `switches`.
    pub fn seeded() -> Self {
        let mut store = Store {
            next_id: 1,
            ..Store::default()
        };
        store.users.insert(
            "kim@kirini.test".to_string(),
            User {
                user_id: 1,
                email: "kim@kirini.test".to_string(),
                password: "switches".to_string(),
                nickname: "kim".to_string(),
                user_authority: "USER".to_string(),
            },
        );
        store
    }

    /// The user behind the bearer token or, failing that, the session cookie.
    fn authenticate(&self, headers: &HeaderMap) -> Option<User> {
        let by_token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|t| self.tokens.get(t));
        let by_session = || session_id(headers).and_then(|s| self.sessions.get(&s));
        by_token
            .or_else(by_session)
            .and_then(|email| self.users.get(email))
            .cloned()
    }
}

pub type Db = Arc<RwLock<Store>>;

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn list_field(board: &str) -> &'static str {
    match board {
        "freeboard" => "freeboardList",
        "news" => "newsList",
        _ => "posts",
    }
}

fn id_key(board: &str) -> &'static str {
    match board {
        "freeboard" => "freeboardUid",
        "news" => "newsId",
        _ => "postId",
    }
}

fn post_json(board: &str, post: &Post, with_comments: bool) -> Value {
    let mut value = json!({
        "title": post.title,
        "contents": post.contents,
        "author": post.author,
        "attachments": post.attachments,
        "readCount": post.read_count,
    });
    value[id_key(board)] = json!(post.id);
    if with_comments {
        value["comments"] = json!(post.comments);
    }
    value
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Login required")
}

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/login.do", post(login))
        .route("/logout.do", get(logout))
        .route("/signup.do", get(signup_check))
        .route("/profile.do", get(profile))
        .route("/mypage/api", get(mypage_get).post(mypage_post))
        .route("/{board}/list", get(list_posts))
        .route("/{board}/view", get(view_post))
        .route("/{board}/create", post(create_post))
        .route("/{board}/delete", post(delete_post))
        .route("/{board}/addComment", post(add_comment))
        .route("/{board}/comments", get(list_comments))
        .route("/echo", post(echo))
        .route("/headers", get(echo_headers))
        .route("/fail/json", get(fail_json))
        .route("/fail/text", get(fail_text))
        .route("/fail/malformed", get(fail_malformed))
        .route("/text", get(text))
        .route("/empty", get(empty))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> Response {
    let mut store = db.write().await;
    let Some(user) = store
        .users
        .get(&input.email)
        .filter(|u| u.password == input.password)
        .cloned()
    else {
        tracing::info!(email = %input.email, "rejected login");
        return Json(json!({ "success": false, "message": "Email or password does not match" })).into_response();
    };

    let token = Uuid::new_v4().to_string();
    let session = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), user.email.clone());
    store.sessions.insert(session.clone(), user.email.clone());
    tracing::info!(email = %user.email, "login");

    (
        [(SET_COOKIE, format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly"))],
        Json(json!({
            "success": true,
            "message": "Login succeeded",
            "redirect": "index.html",
            "token": token,
            "refreshToken": Uuid::new_v4().to_string(),
            "user": user,
        })),
    )
        .into_response()
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> StatusCode {
    if let Some(session) = session_id(&headers) {
        db.write().await.sessions.remove(&session);
    }
    StatusCode::NO_CONTENT
}

async fn signup_check(State(db): State<Db>, Query(query): Query<HashMap<String, String>>) -> Response {
    let store = db.read().await;
    let taken = match query.get("action").map(String::as_str) {
        Some("checkEmail") => {
            let email = query.get("email").cloned().unwrap_or_default();
            store.users.contains_key(&email)
        }
        Some("checkNickname") => {
            let nickname = query.get("nickname").cloned().unwrap_or_default();
            store.users.values().any(|u| u.nickname == nickname)
        }
        _ => return error(StatusCode::BAD_REQUEST, "Unknown action"),
    };
    let message = if taken { "Already in use" } else { "Available" };
    Json(json!({ "isAvailable": !taken, "isDuplicate": taken, "message": message })).into_response()
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Response {
    match db.read().await.authenticate(&headers) {
        Some(user) => Json(json!(user)).into_response(),
        None => unauthorized(),
    }
}

async fn mypage_get(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(user) = db.read().await.authenticate(&headers) else {
        return unauthorized();
    };
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    match query.get("endpoint").map(String::as_str) {
        Some("profile") => Json(json!({ "userName": user.nickname, "email": user.email })).into_response(),
        Some("scraps" | "posts" | "ratings" | "points" | "customize") => {
            Json(json!({ "items": [], "page": page, "totalPages": 1 })).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "Unknown endpoint"),
    }
}

async fn mypage_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = db.write().await;
    let Some(user) = store.authenticate(&headers) else {
        return unauthorized();
    };
    match query.get("endpoint").map(String::as_str) {
        Some("updateProfile") | Some("saveCustomization") => Json(json!({ "success": true })).into_response(),
        Some("deleteAccount") => {
            if body["confirmPassword"].as_str() != Some(user.password.as_str()) {
                return Json(json!({ "success": false, "message": "Password does not match" })).into_response();
            }
            store.users.remove(&user.email);
            store.tokens.retain(|_, email| *email != user.email);
            store.sessions.retain(|_, email| *email != user.email);
            Json(json!({ "success": true, "message": "Account deleted" })).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "Unknown endpoint"),
    }
}

// ---------------------------------------------------------------------------
// Boards
// ---------------------------------------------------------------------------

fn query_id(query: &HashMap<String, String>, key: &str) -> Option<i64> {
    query.get(key).and_then(|v| v.parse().ok())
}

async fn list_posts(
    State(db): State<Db>,
    Path(board): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let store = db.read().await;
    let posts = store.boards.get(&board).map(Vec::as_slice).unwrap_or_default();
    let size: usize = query.get("size").and_then(|s| s.parse().ok()).filter(|s| *s > 0).unwrap_or(10);
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).filter(|p| *p > 0).unwrap_or(1);
    let items: Vec<Value> = posts
        .iter()
        .rev()
        .skip((page - 1) * size)
        .take(size)
        .map(|p| post_json(&board, p, false))
        .collect();

    let mut body = json!({
        "currentPage": page,
        "totalPages": posts.len().div_ceil(size).max(1),
        "totalCount": posts.len(),
    });
    body[list_field(&board)] = json!(items);
    Json(body)
}

async fn view_post(
    State(db): State<Db>,
    Path(board): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(id) = query_id(&query, "id") else {
        return error(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let mut store = db.write().await;
    let Some(post) = store
        .boards
        .get_mut(&board)
        .and_then(|posts| posts.iter_mut().find(|p| p.id == id))
    else {
        return error(StatusCode::NOT_FOUND, "Post not found");
    };
    if query.get("increaseReadCount").map(String::as_str) != Some("false") {
        post.read_count += 1;
    }
    let with_comments = query.get("includeComments").map(String::as_str) == Some("true");
    Json(post_json(&board, post, with_comments)).into_response()
}

#[derive(Deserialize)]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub contents: String,
}

async fn create_post(State(db): State<Db>, Path(board): Path<String>, request: Request) -> Response {
    let Some(user) = db.read().await.authenticate(request.headers()) else {
        return unauthorized();
    };
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (input, attachments) = if is_multipart {
        let mut multipart = match Multipart::from_request(request, &()).await {
            Ok(m) => m,
            Err(rejection) => return rejection.into_response(),
        };
        let mut title = None;
        let mut contents = String::new();
        let mut attachments = 0;
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            if field.file_name().is_some() {
                if field.bytes().await.is_ok() {
                    attachments += 1;
                }
                continue;
            }
            let text = field.text().await.unwrap_or_default();
            match name.as_str() {
                "title" => title = Some(text),
                "contents" => contents = text,
                _ => {}
            }
        }
        let Some(title) = title else {
            return error(StatusCode::BAD_REQUEST, "Title is required");
        };
        (NewPost { title, contents }, attachments)
    } else {
        match Json::<NewPost>::from_request(request, &()).await {
            Ok(Json(input)) => (input, 0),
            Err(rejection) => return rejection.into_response(),
        }
    };

    let mut store = db.write().await;
    let id = store.next_id;
    store.next_id += 1;
    store.boards.entry(board.clone()).or_default().push(Post {
        id,
        title: input.title,
        contents: input.contents,
        author: user.nickname,
        attachments,
        read_count: 0,
        comments: Vec::new(),
    });
    tracing::info!(board = %board, id, attachments, "created post");
    (StatusCode::CREATED, Json(json!({ "success": true, "id": id }))).into_response()
}

async fn delete_post(
    State(db): State<Db>,
    Path(board): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = db.write().await;
    if store.authenticate(&headers).is_none() {
        return unauthorized();
    }
    let Some(id) = body["id"].as_i64() else {
        return error(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let Some(posts) = store.boards.get_mut(&board) else {
        return error(StatusCode::NOT_FOUND, "Post not found");
    };
    let before = posts.len();
    posts.retain(|p| p.id != id);
    if posts.len() == before {
        return error(StatusCode::NOT_FOUND, "Post not found");
    }
    Json(json!({ "success": true })).into_response()
}

async fn add_comment(
    State(db): State<Db>,
    Path(board): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = db.write().await;
    let Some(user) = store.authenticate(&headers) else {
        return unauthorized();
    };
    let Some(id) = body[id_key(&board)].as_i64() else {
        return error(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let Some(post) = store
        .boards
        .get_mut(&board)
        .and_then(|posts| posts.iter_mut().find(|p| p.id == id))
    else {
        return error(StatusCode::NOT_FOUND, "Post not found");
    };
    let content_key = format!("{board}CommentContents");
    post.comments.push(json!({
        "author": user.nickname,
        "content": body[content_key.as_str()],
        "parentId": body["parentId"],
    }));
    Json(json!({ "success": true })).into_response()
}

async fn list_comments(
    State(db): State<Db>,
    Path(board): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(id) = query_id(&query, "postId") else {
        return error(StatusCode::BAD_REQUEST, "Invalid post id");
    };
    let store = db.read().await;
    match store.boards.get(&board).and_then(|posts| posts.iter().find(|p| p.id == id)) {
        Some(post) => Json(json!(post.comments)).into_response(),
        None => error(StatusCode::NOT_FOUND, "Post not found"),
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let map: serde_json::Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), json!(v))))
        .collect();
    Json(Value::Object(map))
}

async fn fail_json() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Database unavailable" })),
    )
        .into_response()
}

async fn fail_text() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

async fn fail_malformed() -> Response {
    ([(CONTENT_TYPE, "application/json")], "{not json").into_response()
}

async fn text() -> &'static str {
    "pong"
}

async fn empty() -> Response {
    ([(CONTENT_TYPE, "application/json")], "").into_response()
}
