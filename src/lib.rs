//! # http11_tokenizer
//!
//! 依存なしのゼロコピー HTTP/1.x トークナイザー (Sans I/O)
//!
//! ## 特徴
//!
//! - **ゼロコピー**: トークンの値は呼び出し側のバッファのスライス
//! - **インクリメンタル**: データ不足なら `error_insufficient_data` を返して待つ
//! - **Sans I/O**: I/O を完全に分離した設計
//!
//! ## 使い方
//!
//! ### サーバー (リクエスト受信)
//!
//! ```rust
//! use http11_tokenizer::{Code, RequestReader, Tokenizer, token};
//!
//! let buf = b"POST /upload HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello";
//! let mut reader = RequestReader::new();
//! reader.set_buffer(buf);
//!
//! let mut body = Vec::new();
//! loop {
//!     match reader.code() {
//!         Code::BodyChunk => body.extend_from_slice(reader.value::<token::BodyChunk>(buf)),
//!         Code::EndOfMessage => break,
//!         code => assert!(!code.is_error()),
//!     }
//!     reader.next(buf);
//! }
//! assert_eq!(body, b"hello");
//! ```
//!
//! ### クライアント (レスポンス受信)
//!
//! ```rust
//! use http11_tokenizer::{Code, ResponseReader, Tokenizer, token};
//!
//! let buf = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
//! let mut reader = ResponseReader::new();
//! reader.set_method("GET");
//! reader.set_buffer(buf);
//!
//! assert_eq!(reader.code(), Code::Version);
//! reader.next(buf);
//! reader.next(buf);
//! assert_eq!(reader.value::<token::StatusCode>(buf), 404);
//! ```

mod encoder;
mod error;
pub mod filter;
pub mod number;
mod reader;
mod request;
mod response;
mod syntax;
pub mod token;
pub mod transfer_encoding;

pub use encoder::{
    BodyFraming, CONTINUE_RESPONSE, encode_chunk, encode_last_chunk, encode_request,
    encode_request_head, encode_response, encode_response_head, response_has_body,
};
pub use error::EncodeError;
pub use reader::{RequestReader, ResponseReader, Tokenizer};
pub use request::Request;
pub use response::Response;
pub use token::Code;
