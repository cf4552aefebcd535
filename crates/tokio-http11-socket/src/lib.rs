//! tokio_http11_socket - Tokio socket layer for http11_tokenizer
//!
//! 任意の `AsyncRead + AsyncWrite` の上で、トークナイザーが出すトークン列を
//! メッセージ単位の読み書きに変換する。
//!
//! ## Features
//!
//! - `client` - クライアント側ソケット (デフォルト有効)
//! - `server` - サーバー側ソケット (デフォルト有効)
//! - `log` - `log` クレートによるログ出力
//! - `full` - すべての機能を有効化
//!
//! ## 特徴
//!
//! - **http11_tokenizer ベース**: ゼロコピートークナイザーをベースにした設計
//! - **ストリーミング**: ボディを断片ごとに読み書きする
//! - **Keep-Alive**: HTTP/1.1 Keep-Alive とパイプラインのサポート
//! - **100-continue**: `Expect: 100-continue` への応答
//!
//! ## 書き込み順序
//!
//! メタデータ、ボディ、トレーラー、終端の順に書く。
//! 順序を守らない呼び出しは panic する。

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod error;
mod inbound;
mod log;
mod outbound;
#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub use client::ClientSocket;
pub use config::SocketConfig;
pub use error::{Error, Result};
pub use inbound::ReadState;
pub use outbound::WriteState;
#[cfg(feature = "server")]
pub use server::ServerSocket;

// http11_tokenizer の型を re-export
pub use http11_tokenizer::{Code, Request, Response};
