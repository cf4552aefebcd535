//! tokio-http11-socket エラー型

use std::fmt;

use http11_tokenizer::{Code, EncodeError};

/// tokio-http11-socket エラー
#[derive(Debug)]
pub enum Error {
    /// I/O エラー
    Io(std::io::Error),
    /// トークナイザーが報告したプロトコルエラー
    Protocol(Code),
    /// 送信するメッセージが不正
    Encode(EncodeError),
    /// バッファが一杯になってもトークンが完成しない
    ///
    /// `expected` は次に来るはずだったトークン
    HeaderSectionTooLarge { expected: Code },
    /// UTF-8 として解釈できないヘッダー
    InvalidUtf8,
    /// 読み取りタイムアウト
    Timeout,
    /// メッセージの途中で接続が閉じられた
    ConnectionClosed,
}

impl Error {
    /// サーバーが返すべきステータスコード
    ///
    /// 通信路の問題でレスポンスを返す意味がない場合は `None`
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Protocol(Code::ErrorContentLengthOverflow | Code::ErrorChunkSizeOverflow) => {
                Some(413)
            }
            Error::Protocol(_) | Error::InvalidUtf8 => Some(400),
            Error::HeaderSectionTooLarge { expected } => match expected {
                Code::Method => Some(501),
                Code::RequestTarget => Some(414),
                _ => Some(431),
            },
            Error::Io(_) | Error::Encode(_) | Error::Timeout | Error::ConnectionClosed => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(code) => write!(f, "protocol error: {}", code),
            Error::Encode(e) => write!(f, "encode error: {}", e),
            Error::HeaderSectionTooLarge { expected } => {
                write!(f, "header section too large (expected {})", expected)
            }
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 in message head"),
            Error::Timeout => write!(f, "read timeout"),
            Error::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
