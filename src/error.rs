use std::fmt;

/// HTTP エンコードエラー
///
/// エンコーダーはトークナイザーと同じ文字種で検証するため、
/// エンコードできたメッセージは必ずトークナイズできる
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Host ヘッダーがない (HTTP/1.1 必須)
    MissingHostHeader,
    /// メソッドが token ではない
    InvalidMethod,
    /// リクエストターゲットが空、または使用できない文字を含む
    InvalidRequestTarget,
    /// `HTTP/1.x` 形式ではない
    InvalidVersion,
    /// 3 桁ではないステータスコード
    InvalidStatusCode(u16),
    /// ステータスフレーズに CR や LF などの制御文字が含まれている
    InvalidReasonPhrase,
    /// ヘッダー名が token ではない
    InvalidFieldName(String),
    /// ヘッダー値に CR や LF などの制御文字が含まれている
    InvalidFieldValue(String),
    /// 1xx / 204 レスポンスで Transfer-Encoding が設定されている
    /// RFC 7230 Section 3.3.1: サーバーは 1xx または 204 レスポンスに
    /// Transfer-Encoding を含めてはならない (MUST NOT)
    ForbiddenTransferEncoding { status_code: u16 },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MissingHostHeader => {
                write!(f, "missing Host header (required for HTTP/1.1)")
            }
            EncodeError::InvalidMethod => write!(f, "invalid method"),
            EncodeError::InvalidRequestTarget => write!(f, "invalid request target"),
            EncodeError::InvalidVersion => write!(f, "invalid HTTP version"),
            EncodeError::InvalidStatusCode(status_code) => {
                write!(f, "invalid status code: {}", status_code)
            }
            EncodeError::InvalidReasonPhrase => write!(f, "invalid reason phrase"),
            EncodeError::InvalidFieldName(name) => write!(f, "invalid field name: {:?}", name),
            EncodeError::InvalidFieldValue(name) => {
                write!(f, "invalid field value for {:?}", name)
            }
            EncodeError::ForbiddenTransferEncoding { status_code } => {
                write!(
                    f,
                    "Transfer-Encoding not allowed for {} response (RFC 7230 Section 3.3.1)",
                    status_code
                )
            }
        }
    }
}

impl std::error::Error for EncodeError {}
