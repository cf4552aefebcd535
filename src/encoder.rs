use crate::error::EncodeError;
use crate::request::Request;
use crate::response::{Response, status_has_body};
use crate::syntax::{is_field_value, is_request_target, is_token};

/// `Expect: 100-continue` への中間レスポンス
pub const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// ボディの区切り方
///
/// `None` 以外を指定した場合、メッセージ側の Content-Length と
/// Transfer-Encoding ヘッダーは無視され、この指定に置き換えられる
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// ヘッダーをそのまま出力する
    None,
    /// `Content-Length: n`
    ContentLength(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// 接続を閉じてボディを終端する (`Connection: close` を付与)
    CloseDelimited,
}

/// リクエストラインとヘッダーをエンコード
///
/// ボディは含まない。`Chunked` の場合は続けて [`encode_chunk`] と
/// [`encode_last_chunk`] で送る
pub fn encode_request_head(request: &Request, framing: BodyFraming) -> Result<Vec<u8>, EncodeError> {
    if !is_token(request.method.as_bytes()) {
        return Err(EncodeError::InvalidMethod);
    }
    if !is_request_target(request.uri.as_bytes()) {
        return Err(EncodeError::InvalidRequestTarget);
    }
    let minor = version_minor(&request.version)?;
    // RFC 7230 Section 5.4
    if minor >= 1 && !request.has_header("Host") {
        return Err(EncodeError::MissingHostHeader);
    }

    let mut buf = Vec::new();

    // Request line: METHOD SP URI SP VERSION CRLF
    buf.extend_from_slice(request.method.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(request.uri.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(request.version.as_bytes());
    buf.extend_from_slice(b"\r\n");

    write_head_fields(&mut buf, &request.headers, framing)?;
    Ok(buf)
}

/// ステータスラインとヘッダーをエンコード
pub fn encode_response_head(
    response: &Response,
    framing: BodyFraming,
) -> Result<Vec<u8>, EncodeError> {
    version_minor(&response.version)?;
    let status_code = response.status_code;
    if !(100..=999).contains(&status_code) {
        return Err(EncodeError::InvalidStatusCode(status_code));
    }
    if !is_field_value(response.reason_phrase.as_bytes()) {
        return Err(EncodeError::InvalidReasonPhrase);
    }
    let transfer_encoding = match framing {
        BodyFraming::Chunked => true,
        BodyFraming::None => response.has_header("Transfer-Encoding"),
        BodyFraming::ContentLength(_) | BodyFraming::CloseDelimited => false,
    };
    if transfer_encoding && ((100..200).contains(&status_code) || status_code == 204) {
        return Err(EncodeError::ForbiddenTransferEncoding { status_code });
    }

    let mut buf = Vec::new();

    // Status line: VERSION SP STATUS-CODE SP REASON-PHRASE CRLF
    buf.extend_from_slice(response.version.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(status_code.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(response.reason_phrase.as_bytes());
    buf.extend_from_slice(b"\r\n");

    write_head_fields(&mut buf, &response.headers, framing)?;
    Ok(buf)
}

/// リクエスト全体をエンコード (Content-Length で区切る)
///
/// トレーラーは送られない。
/// ボディが空でもフレーミング用のヘッダーがあれば `Content-Length: 0` に置き換える
pub fn encode_request(request: &Request) -> Result<Vec<u8>, EncodeError> {
    let framed = request.has_header("Content-Length") || request.has_header("Transfer-Encoding");
    let framing = if request.body.is_empty() && !framed {
        BodyFraming::None
    } else {
        BodyFraming::ContentLength(request.body.len() as u64)
    };
    let mut buf = encode_request_head(request, framing)?;
    buf.extend_from_slice(&request.body);
    Ok(buf)
}

/// レスポンス全体をエンコード (Content-Length で区切る)
///
/// 1xx / 204 / 304 の場合はボディを送らない
pub fn encode_response(response: &Response) -> Result<Vec<u8>, EncodeError> {
    if !response.status_has_body() {
        return encode_response_head(response, BodyFraming::None);
    }
    let framing = BodyFraming::ContentLength(response.body.len() as u64);
    let mut buf = encode_response_head(response, framing)?;
    buf.extend_from_slice(&response.body);
    Ok(buf)
}

/// Chunked Transfer Encoding 用のチャンクをエンコード
///
/// 空のデータは終端チャンクと区別できないため何も出力しない
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    if data.is_empty() {
        return buf;
    }
    // チャンクサイズ (16進数)
    buf.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    buf
}

/// 終端チャンクとトレーラーをエンコード
pub fn encode_last_chunk(trailers: &[(String, String)]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = b"0\r\n".to_vec();
    write_fields(&mut buf, trailers, |_| true)?;
    buf.extend_from_slice(b"\r\n");
    Ok(buf)
}

/// `HTTP/1.x` の x を返す
fn version_minor(version: &str) -> Result<u8, EncodeError> {
    match version.as_bytes() {
        [b'H', b'T', b'T', b'P', b'/', b'1', b'.', d @ b'0'..=b'9'] => Ok(d - b'0'),
        _ => Err(EncodeError::InvalidVersion),
    }
}

fn write_head_fields(
    buf: &mut Vec<u8>,
    headers: &[(String, String)],
    framing: BodyFraming,
) -> Result<(), EncodeError> {
    let replace = framing != BodyFraming::None;
    write_fields(buf, headers, |name| {
        !(replace
            && (name.eq_ignore_ascii_case("Content-Length")
                || name.eq_ignore_ascii_case("Transfer-Encoding")))
    })?;

    match framing {
        BodyFraming::None => {}
        BodyFraming::ContentLength(size) => {
            buf.extend_from_slice(b"Content-Length: ");
            buf.extend_from_slice(size.to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        BodyFraming::Chunked => buf.extend_from_slice(b"Transfer-Encoding: chunked\r\n"),
        BodyFraming::CloseDelimited => {
            let has_close = headers.iter().any(|(name, value)| {
                name.eq_ignore_ascii_case("Connection")
                    && value
                        .split(',')
                        .any(|token| token.trim().eq_ignore_ascii_case("close"))
            });
            if !has_close {
                buf.extend_from_slice(b"Connection: close\r\n");
            }
        }
    }

    // End of headers
    buf.extend_from_slice(b"\r\n");
    Ok(())
}

fn write_fields(
    buf: &mut Vec<u8>,
    fields: &[(String, String)],
    keep: impl Fn(&str) -> bool,
) -> Result<(), EncodeError> {
    for (name, value) in fields {
        if !is_token(name.as_bytes()) {
            return Err(EncodeError::InvalidFieldName(name.clone()));
        }
        if !is_field_value(value.as_bytes()) {
            return Err(EncodeError::InvalidFieldValue(name.clone()));
        }
        if !keep(name) {
            continue;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    Ok(())
}

/// ステータスコードとリクエストメソッドからボディを送るか判定
///
/// HEAD への応答と 1xx / 204 / 304 はボディを持たない
pub fn response_has_body(request_method: &str, status_code: u16) -> bool {
    request_method != "HEAD" && status_has_body(status_code)
}

impl Request {
    /// リクエストをバイト列にエンコード
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_request(self)
    }
}

impl Response {
    /// レスポンスをバイト列にエンコード
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_response(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_replaces_user_headers() {
        let response = Response::new(200, "OK")
            .header("Content-Length", "999")
            .header("Transfer-Encoding", "gzip")
            .header("Server", "t");
        let head = encode_response_head(&response, BodyFraming::Chunked).unwrap();
        assert_eq!(
            head,
            b"HTTP/1.1 200 OK\r\nServer: t\r\nTransfer-Encoding: chunked\r\n\r\n"
        );
    }

    #[test]
    fn close_delimited_adds_connection_close_once() {
        let response = Response::with_version("HTTP/1.0", 200, "OK");
        let head = encode_response_head(&response, BodyFraming::CloseDelimited).unwrap();
        assert_eq!(head, b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n");

        let response = response.header("Connection", "close");
        let head = encode_response_head(&response, BodyFraming::CloseDelimited).unwrap();
        assert_eq!(head, b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n");
    }

    #[test]
    fn rejects_injection() {
        let request = Request::new("GET", "/").header("Host", "a\r\nX-Evil: 1");
        assert_eq!(
            encode_request_head(&request, BodyFraming::None),
            Err(EncodeError::InvalidFieldValue("Host".to_string()))
        );
        let request = Request::new("GET", "/ HTTP/1.1").header("Host", "a");
        assert_eq!(
            encode_request_head(&request, BodyFraming::None),
            Err(EncodeError::InvalidRequestTarget)
        );
        let response = Response::new(200, "OK\r\n");
        assert_eq!(
            encode_response_head(&response, BodyFraming::None),
            Err(EncodeError::InvalidReasonPhrase)
        );
    }

    #[test]
    fn host_required_for_http11() {
        let request = Request::new("GET", "/");
        assert_eq!(request.encode(), Err(EncodeError::MissingHostHeader));
        let request = Request::with_version("GET", "/", "HTTP/1.0");
        assert_eq!(request.encode().unwrap(), b"GET / HTTP/1.0\r\n\r\n");
    }

    #[test]
    fn one_shot_request_replaces_framing_headers() {
        let request = Request::new("POST", "/")
            .header("Host", "a")
            .header("Transfer-Encoding", "chunked");
        assert_eq!(
            request.encode().unwrap(),
            b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 0\r\n\r\n"
        );
        let request = Request::new("GET", "/").header("Host", "a");
        assert_eq!(request.encode().unwrap(), b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
    }

    #[test]
    fn chunked_forbidden_for_no_content() {
        let response = Response::new(204, "No Content");
        assert_eq!(
            encode_response_head(&response, BodyFraming::Chunked),
            Err(EncodeError::ForbiddenTransferEncoding { status_code: 204 })
        );
    }

    #[test]
    fn chunks() {
        assert_eq!(encode_chunk(b"hello world!!!!!"), b"10\r\nhello world!!!!!\r\n");
        assert!(encode_chunk(b"").is_empty());
        let trailers = vec![("Digest".to_string(), "x".to_string())];
        assert_eq!(encode_last_chunk(&trailers).unwrap(), b"0\r\nDigest: x\r\n\r\n");
        assert_eq!(encode_last_chunk(&[]).unwrap(), b"0\r\n\r\n");
    }

    #[test]
    fn body_by_method_and_status() {
        assert!(!response_has_body("HEAD", 200));
        assert!(!response_has_body("GET", 304));
        assert!(response_has_body("GET", 200));
    }
}
