//! リクエストトークナイザー

use crate::syntax::{is_request_target_char, is_tchar};
use crate::token::{Code, Payload, View};

use super::core::{BodyType, Core, Dispatch, Hooks, State, Step, scan};
use super::{Tokenizer, version_token};

/// リクエストラインの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Method,
    SpAfterMethod,
    RequestTarget,
    SpAfterRequestTarget,
    Version,
    Crlf,
}

#[derive(Debug, Clone)]
struct RequestHooks {
    line: Line,
    version: u8,
    has_host: bool,
}

impl Hooks for RequestHooks {
    fn start_line(&mut self, rest: &[u8], scanned: &mut usize, state: &mut State) -> Step {
        match self.line {
            Line::Method => {
                let step = delimited(rest, scanned, is_tchar, Code::Method);
                if matches!(step, Step::Token { .. }) {
                    self.line = Line::SpAfterMethod;
                }
                step
            }
            Line::SpAfterMethod => sp(rest, &mut self.line, Line::RequestTarget),
            Line::RequestTarget => {
                let step = delimited(rest, scanned, is_request_target_char, Code::RequestTarget);
                if matches!(step, Step::Token { .. }) {
                    self.line = Line::SpAfterRequestTarget;
                }
                step
            }
            Line::SpAfterRequestTarget => sp(rest, &mut self.line, Line::Version),
            Line::Version => {
                let step = version_token(rest);
                if let Step::Token {
                    payload: Payload::Number(version),
                    ..
                } = step
                {
                    self.version = version as u8;
                    self.line = Line::Crlf;
                }
                step
            }
            Line::Crlf => match rest {
                [] | [b'\r'] => Step::Pending,
                [b'\r', b'\n', ..] => {
                    self.line = Line::Method;
                    *state = State::FieldName;
                    Step::token(Code::Skip, 2)
                }
                _ => Step::Fail(Code::ErrorInvalidData),
            },
        }
    }

    fn expected_start_line(&self) -> Code {
        match self.line {
            Line::Method => Code::Method,
            Line::RequestTarget => Code::RequestTarget,
            Line::Version => Code::Version,
            Line::SpAfterMethod | Line::SpAfterRequestTarget | Line::Crlf => Code::Skip,
        }
    }

    fn on_field_name(&mut self, name: &[u8]) {
        if name.eq_ignore_ascii_case(b"host") {
            self.has_host = true;
        }
    }

    fn on_end_of_headers(&mut self, body_type: BodyType) -> Result<Dispatch, Code> {
        // RFC 7230 Section 5.4: HTTP/1.1 リクエストには Host が必須
        if self.version >= 1 && !self.has_host {
            return Err(Code::ErrorNoHost);
        }
        match body_type {
            BodyType::NoBody => Ok(Dispatch::NoBody),
            BodyType::ContentLengthRead => Ok(Dispatch::ContentLength),
            BodyType::ChunkedEncodingRead => Ok(Dispatch::Chunked),
            // RFC 7230 Section 3.3.3: リクエストで chunked が最後でなければ 400
            BodyType::RandomEncodingRead => Err(Code::ErrorInvalidData),
            BodyType::ReadingContentLength | BodyType::ReadingEncoding => {
                if cfg!(debug_assertions) {
                    unreachable!("framing header value is resolved before end of headers");
                }
                Err(Code::ErrorInvalidData)
            }
        }
    }

    fn on_end_of_message(&mut self) -> State {
        self.version = 0;
        self.has_host = false;
        State::StartLine
    }
}

/// SP で区切られたトークン (1 文字以上)
fn delimited(rest: &[u8], scanned: &mut usize, allowed: fn(u8) -> bool, code: Code) -> Step {
    match scan(rest, scanned, b' ', allowed) {
        Ok(Some(0)) => Step::Fail(Code::ErrorInvalidData),
        Ok(Some(i)) => Step::bytes(code, i, i),
        Ok(None) => Step::Pending,
        Err(code) => Step::Fail(code),
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

/// HTTP リクエストのトークナイザー
///
/// サーバー側でクライアントからのリクエストを読む際に使用。
/// `end_of_message` の後は次のリクエストの先頭に戻る。
#[derive(Debug, Clone)]
pub struct RequestReader {
    core: Core,
    hooks: RequestHooks,
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestReader {
    /// 新しいトークナイザーを作成
    pub fn new() -> Self {
        Self {
            core: Core::new(),
            hooks: RequestHooks {
                line: Line::Method,
                version: 0,
                has_host: false,
            },
        }
    }

    /// 初期状態に戻す
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Tokenizer for RequestReader {
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
