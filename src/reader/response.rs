//! レスポンストークナイザー

use crate::syntax::is_field_vchar;
use crate::token::{Code, View};

use super::core::{BodyType, Core, Dispatch, Hooks, State, Step, scan};
use super::{Tokenizer, version_token};

/// ステータスラインの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Version,
    SpAfterVersion,
    StatusCode,
    SpAfterStatusCode,
    ReasonPhrase,
    Crlf,
}

/// レスポンスのボディの有無に関わるリクエストメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestMethod {
    Head,
    Connect,
    Other,
}

#[derive(Debug, Clone)]
struct ResponseHooks {
    line: Line,
    status_code: u16,
    method: Option<RequestMethod>,
    use_another_connection: bool,
}

impl Hooks for ResponseHooks {
    fn start_line(&mut self, rest: &[u8], scanned: &mut usize, state: &mut State) -> Step {
        match self.line {
            Line::Version => {
                let step = version_token(rest);
                if matches!(step, Step::Token { .. }) {
                    self.line = Line::SpAfterVersion;
                }
                step
            }
            Line::SpAfterVersion => sp(rest, &mut self.line, Line::StatusCode),
            Line::StatusCode => {
                // status-code = 3DIGIT
                let digits = rest.iter().take(3).take_while(|b| b.is_ascii_digit()).count();
                if digits < rest.len().min(3) {
                    return Step::Fail(Code::ErrorInvalidData);
                }
                if digits < 3 {
                    return Step::Pending;
                }
                let status_code = rest[..3]
                    .iter()
                    .fold(0u16, |acc, &b| acc * 10 + (b - b'0') as u16);
                if status_code < 100 {
                    return Step::Fail(Code::ErrorInvalidData);
                }
                self.status_code = status_code;
                self.line = Line::SpAfterStatusCode;
                Step::number(Code::StatusCode, 3, status_code)
            }
            Line::SpAfterStatusCode => sp(rest, &mut self.line, Line::ReasonPhrase),
            Line::ReasonPhrase => {
                // reason-phrase = *( HTAB / SP / VCHAR / obs-text )
                match scan(rest, scanned, b'\r', is_field_vchar) {
                    Ok(Some(i)) => {
                        self.line = Line::Crlf;
                        Step::bytes(Code::ReasonPhrase, i, i)
                    }
                    Ok(None) => Step::Pending,
                    Err(code) => Step::Fail(code),
                }
            }
            Line::Crlf => match rest {
                [] | [b'\r'] => Step::Pending,
                [b'\r', b'\n', ..] => {
                    self.line = Line::Version;
                    *state = State::FieldName;
                    Step::token(Code::Skip, 2)
                }
                _ => Step::Fail(Code::ErrorInvalidData),
            },
        }
    }

    fn expected_start_line(&self) -> Code {
        match self.line {
            Line::Version => Code::Version,
            Line::StatusCode => Code::StatusCode,
            Line::ReasonPhrase => Code::ReasonPhrase,
            Line::SpAfterVersion | Line::SpAfterStatusCode | Line::Crlf => Code::Skip,
        }
    }

    fn on_field_name(&mut self, _name: &[u8]) {}

    /// RFC 7230 Section 3.3.3 の優先順位でボディの扱いを決める
    fn on_end_of_headers(&mut self, body_type: BodyType) -> Result<Dispatch, Code> {
        let status_code = self.status_code;
        if (100..200).contains(&status_code) {
            // 101 の後は HTTP ではなくなる
            if status_code == 101 {
                self.use_another_connection = true;
            }
            return Ok(Dispatch::NoBody);
        }
        if status_code == 204 || status_code == 304 {
            return Ok(Dispatch::NoBody);
        }

        match self.method.ok_or(Code::ErrorSetMethod)? {
            RequestMethod::Head => return Ok(Dispatch::NoBody),
            RequestMethod::Connect if (200..300).contains(&status_code) => {
                // トンネルに切り替わる
                self.use_another_connection = true;
                return Ok(Dispatch::NoBody);
            }
            RequestMethod::Connect | RequestMethod::Other => {}
        }

        match body_type {
            BodyType::ChunkedEncodingRead => Ok(Dispatch::Chunked),
            BodyType::ContentLengthRead => Ok(Dispatch::ContentLength),
            BodyType::NoBody | BodyType::RandomEncodingRead => {
                self.use_another_connection = true;
                Ok(Dispatch::UntilClose)
            }
            BodyType::ReadingContentLength | BodyType::ReadingEncoding => {
                if cfg!(debug_assertions) {
                    unreachable!("framing header value is resolved before end of headers");
                }
                Err(Code::ErrorInvalidData)
            }
        }
    }

    fn on_end_of_message(&mut self) -> State {
        // 1xx の後には同じリクエストへの最終レスポンスが続く
        if !(100..200).contains(&self.status_code) {
            self.method = None;
        }
        self.status_code = 0;
        if self.use_another_connection {
            State::UseAnotherConnection
        } else {
            State::StartLine
        }
    }
}

fn sp(rest: &[u8], line: &mut Line, next: Line) -> Step {
    match rest.first() {
        None => Step::Pending,
        Some(b' ') => {
            *line = next;
            Step::token(Code::Skip, 1)
        }
        Some(_) => Step::Fail(Code::ErrorInvalidData),
    }
}

/// HTTP レスポンスのトークナイザー
///
/// クライアント側でサーバーからのレスポンスを読む際に使用。
/// ボディの有無はリクエストメソッドに依存するため、
/// ヘッダー終端までに [`ResponseReader::set_method`] を呼ぶ必要がある。
/// 呼んでいない場合は `error_set_method` を報告して止まる。
#[derive(Debug, Clone)]
pub struct ResponseReader {
    core: Core,
    hooks: ResponseHooks,
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseReader {
    /// 新しいトークナイザーを作成
    pub fn new() -> Self {
        Self {
            core: Core::new(),
            hooks: ResponseHooks {
                line: Line::Version,
                status_code: 0,
                method: None,
                use_another_connection: false,
            },
        }
    }

    /// 初期状態に戻す
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 対応するリクエストのメソッドを設定
    ///
    /// 1xx レスポンスの間は保持され、最終レスポンスの終端で破棄される
    pub fn set_method(&mut self, method: impl AsRef<[u8]>) {
        self.hooks.method = Some(match method.as_ref() {
            b"HEAD" => RequestMethod::Head,
            b"CONNECT" => RequestMethod::Connect,
            _ => RequestMethod::Other,
        });
    }

    /// 接続が閉じられたことを通知
    ///
    /// 接続が閉じるまで続くボディを終端させる。それ以外の状態では何もしない
    pub fn puteof(&mut self) {
        self.core.puteof();
    }
}

impl Tokenizer for ResponseReader {
    fn set_buffer(&mut self, buf: &[u8]) {
        self.core.set_buffer(&mut self.hooks, buf);
    }

    fn next(&mut self, buf: &[u8]) {
        self.core.next(&mut self.hooks, buf);
    }

    fn code(&self) -> Code {
        self.core.code()
    }

    fn token_size(&self) -> usize {
        self.core.token_size()
    }

    fn parsed_count(&self) -> usize {
        self.core.parsed_count()
    }

    fn expected_token(&self) -> Code {
        self.core.expected_token(&self.hooks)
    }

    fn view<'a>(&self, buf: &'a [u8]) -> View<'a> {
        self.core.view(buf)
    }
}
