//! Resource façades over `ApiClient`.
//!
//! Each service borrows the client and exposes domain-named methods that
//! fix an endpoint path, a parameter shape and whether a token is sent.
//! Obtain them through `ApiClient::users()`, `ApiClient::boards()` and so on.

mod board;
mod glossary;
mod keyboard;
mod mypage;
mod qna;
mod review;
mod user;

pub use board::{map_board_type, BoardPage, BoardService, PostPayload};
pub use glossary::GlossaryService;
pub use keyboard::KeyboardService;
pub use mypage::{ActionResult, MypageService, MypageTab};
pub use qna::QnaService;
pub use review::ReviewService;
pub use user::{DuplicateCheck, LoginResponse, UserService, UserSummary};
