//! リクエストとレスポンスで共有するトークナイザー本体
//!
//! ヘッダーセクション、ボディ、トレーラーの状態遷移を扱う。
//! スタートラインとボディの有無の判定は [`Hooks`] で方向ごとに差し替える。

use crate::number::{NumberError, hex_digit, parse_decimal};
use crate::syntax::{is_field_vchar, is_ows, is_tchar};
use crate::token::{Code, Payload, View};
use crate::transfer_encoding::{ChunkedPosition, classify};

/// どのフレーミングヘッダーを確定したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyType {
    NoBody,
    /// Content-Length の値を待っている
    ReadingContentLength,
    ContentLengthRead,
    /// Transfer-Encoding の値を待っている
    ReadingEncoding,
    ChunkedEncodingRead,
    /// chunked で終わらない Transfer-Encoding (接続が閉じるまでがボディ)
    RandomEncodingRead,
}

/// ヘッダー名と値を読むセクション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Headers,
    Trailers,
}

/// パース位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// スタートライン ([`Hooks`] 側の状態に委譲)
    StartLine,
    FieldName,
    FieldColon,
    FieldOws,
    FieldValue,
    FieldCrlf,
    ChunkSize,
    ChunkExt,
    ChunkSizeCrlf,
    ChunkData,
    ChunkDataCrlf,
    /// Content-Length で区切られたボディ
    Body,
    /// 接続が閉じるまで続くボディ
    BodyUntilClose,
    EndOfBody,
    EndOfMessage,
    UseAnotherConnection,
    Errored(Code),
}

/// ヘッダー終端後のボディの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    NoBody,
    ContentLength,
    Chunked,
    UntilClose,
}

/// 1 ステップの結果
///
/// `Token` の範囲は呼び出し時点の未消費バイト列の先頭からの相対位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Token {
        code: Code,
        size: usize,
        payload: Payload,
    },
    /// トークンを出さずに状態だけ進めた
    Again,
    /// データ不足
    Pending,
    /// 状態を変えずにコードだけ報告する
    Wait(Code),
    /// エラー状態へ遷移する
    Fail(Code),
}

impl Step {
    pub(crate) fn token(code: Code, size: usize) -> Self {
        Step::Token {
            code,
            size,
            payload: Payload::None,
        }
    }

    pub(crate) fn bytes(code: Code, size: usize, end: usize) -> Self {
        Step::Token {
            code,
            size,
            payload: Payload::Bytes { start: 0, end },
        }
    }

    pub(crate) fn number(code: Code, size: usize, number: u16) -> Self {
        Step::Token {
            code,
            size,
            payload: Payload::Number(number),
        }
    }
}

/// 方向ごとの差分
pub(crate) trait Hooks {
    /// スタートラインを 1 トークン分進める
    ///
    /// `scanned` は読み途中のトークンのうち検証済みのバイト数 ([`scan`] に渡す)。
    /// スタートラインを読み終えたら `state` を [`State::FieldName`] にする
    fn start_line(&mut self, rest: &[u8], scanned: &mut usize, state: &mut State) -> Step;

    /// スタートラインで次に出るトークン
    fn expected_start_line(&self) -> Code;

    /// ヘッダー名 (トレーラーは除く) を確定した
    fn on_field_name(&mut self, name: &[u8]);

    /// ヘッダー終端でボディの扱いを決める
    fn on_end_of_headers(&mut self, body_type: BodyType) -> Result<Dispatch, Code>;

    /// メッセージ終端の次の状態
    fn on_end_of_message(&mut self) -> State;
}

#[derive(Debug, Clone)]
pub(crate) struct Core {
    state: State,
    section: Section,
    body_type: BodyType,
    /// Content-Length の残り、またはチャンクの残り
    body_size: u64,
    idx: usize,
    token_size: usize,
    /// 読み途中のトークンのうち検証済みのバイト数
    scanned: usize,
    code: Code,
    payload: Payload,
    buf_len: usize,
    eof: bool,
}

impl Core {
    pub(crate) fn new() -> Self {
        Self {
            state: State::StartLine,
            section: Section::Headers,
            body_type: BodyType::NoBody,
            body_size: 0,
            idx: 0,
            token_size: 0,
            scanned: 0,
            code: Code::ErrorInsufficientData,
            payload: Payload::None,
            buf_len: 0,
            eof: false,
        }
    }

    pub(crate) fn code(&self) -> Code {
        self.code
    }

    pub(crate) fn token_size(&self) -> usize {
        self.token_size
    }

    pub(crate) fn parsed_count(&self) -> usize {
        self.idx + self.token_size
    }

    pub(crate) fn view<'a>(&self, buf: &'a [u8]) -> View<'a> {
        debug_assert_eq!(buf.len(), self.buf_len, "buffer differs from set_buffer()");
        View::new(buf, self.payload)
    }

    pub(crate) fn expected_token<H: Hooks>(&self, hooks: &H) -> Code {
        match self.state {
            State::Errored(code) => code,
            State::UseAnotherConnection => Code::ErrorUseAnotherConnection,
            State::StartLine => hooks.expected_start_line(),
            State::FieldName => Code::FieldName,
            State::FieldValue => Code::FieldValue,
            State::FieldColon
            | State::FieldOws
            | State::FieldCrlf
            | State::ChunkSize
            | State::ChunkExt
            | State::ChunkSizeCrlf
            | State::ChunkDataCrlf => Code::Skip,
            State::ChunkData | State::Body | State::BodyUntilClose => Code::BodyChunk,
            State::EndOfBody => Code::EndOfBody,
            State::EndOfMessage => Code::EndOfMessage,
        }
    }

    pub(crate) fn set_buffer<H: Hooks>(&mut self, hooks: &mut H, buf: &[u8]) {
        self.buf_len = buf.len();
        self.idx = 0;
        self.token_size = 0;
        self.advance(hooks, buf);
    }

    pub(crate) fn next<H: Hooks>(&mut self, hooks: &mut H, buf: &[u8]) {
        debug_assert_eq!(buf.len(), self.buf_len, "buffer differs from set_buffer()");
        self.idx += self.token_size;
        self.token_size = 0;
        self.advance(hooks, buf);
    }

    /// 接続終了を通知する
    pub(crate) fn puteof(&mut self) {
        self.eof = true;
        if self.code == Code::ErrorInsufficientData
            && self.state == State::BodyUntilClose
            && self.idx == self.buf_len
        {
            self.state = State::EndOfMessage;
            self.code = Code::EndOfBody;
        }
    }

    fn advance<H: Hooks>(&mut self, hooks: &mut H, buf: &[u8]) {
        self.code = Code::ErrorInsufficientData;
        self.payload = Payload::None;

        loop {
            let rest = &buf[self.idx..];
            let step = match self.state {
                State::StartLine => hooks.start_line(rest, &mut self.scanned, &mut self.state),
                State::FieldName => self.field_name(hooks, rest),
                State::FieldColon => self.field_colon(rest),
                State::FieldOws => self.field_ows(rest),
                State::FieldValue => self.field_value(rest),
                State::FieldCrlf => self.crlf(rest, State::FieldName),
                State::ChunkSize => self.chunk_size(rest),
                State::ChunkExt => self.chunk_ext(rest),
                State::ChunkSizeCrlf => {
                    let next = if self.body_size == 0 {
                        State::FieldName
                    } else {
                        State::ChunkData
                    };
                    self.crlf(rest, next)
                }
                State::ChunkData => self.body(rest, State::ChunkDataCrlf),
                State::ChunkDataCrlf => self.crlf(rest, State::ChunkSize),
                State::Body => self.body(rest, State::EndOfBody),
                State::BodyUntilClose => self.body_until_close(rest),
                State::EndOfBody => {
                    self.state = State::EndOfMessage;
                    Step::token(Code::EndOfBody, 0)
                }
                State::EndOfMessage => {
                    self.section = Section::Headers;
                    self.body_type = BodyType::NoBody;
                    self.body_size = 0;
                    self.state = hooks.on_end_of_message();
                    Step::token(Code::EndOfMessage, 0)
                }
                State::UseAnotherConnection => Step::Wait(Code::ErrorUseAnotherConnection),
                State::Errored(code) => Step::Wait(code),
            };

            if matches!(step, Step::Token { .. } | Step::Again | Step::Fail(_)) {
                self.scanned = 0;
            }
            match step {
                Step::Token {
                    code,
                    size,
                    payload,
                } => {
                    self.code = code;
                    self.token_size = size;
                    self.payload = match payload {
                        Payload::Bytes { start, end } => Payload::Bytes {
                            start: self.idx + start,
                            end: self.idx + end,
                        },
                        other => other,
                    };
                    return;
                }
                Step::Again => continue,
                Step::Pending => return,
                Step::Wait(code) => {
                    self.code = code;
                    return;
                }
                Step::Fail(code) => {
                    self.state = State::Errored(code);
                    self.code = code;
                    return;
                }
            }
        }
    }

    fn field_name<H: Hooks>(&mut self, hooks: &mut H, rest: &[u8]) -> Step {
        match rest {
            [] => return Step::Pending,
            [b'\r'] => return Step::Pending,
            [b'\r', b'\n', ..] => return self.end_of_section(hooks),
            [b'\r', ..] => return Step::Fail(Code::ErrorInvalidData),
            _ => {}
        }

        // 先頭の空白 (obs-fold) もここで拒否される
        let i = match scan(rest, &mut self.scanned, b':', is_tchar) {
            Ok(Some(0)) | Err(_) => return Step::Fail(Code::ErrorInvalidData),
            Ok(Some(i)) => i,
            Ok(None) => return Step::Pending,
        };
        let name = &rest[..i];
        if self.section == Section::Headers {
            if let Err(code) = self.commit_field_name(name) {
                return Step::Fail(code);
            }
            hooks.on_field_name(name);
        }
        self.state = State::FieldColon;
        Step::bytes(Code::FieldName, i, i)
    }

    fn end_of_section<H: Hooks>(&mut self, hooks: &mut H) -> Step {
        if self.section == Section::Trailers {
            self.state = State::EndOfBody;
            return Step::token(Code::Skip, 2);
        }

        let dispatch = match hooks.on_end_of_headers(self.body_type) {
            Ok(dispatch) => dispatch,
            Err(Code::ErrorSetMethod) => return Step::Wait(Code::ErrorSetMethod),
            Err(code) => return Step::Fail(code),
        };
        self.state = match dispatch {
            Dispatch::NoBody => State::EndOfBody,
            Dispatch::ContentLength if self.body_size == 0 => State::EndOfBody,
            Dispatch::ContentLength => State::Body,
            Dispatch::Chunked => {
                self.body_size = 0;
                State::ChunkSize
            }
            Dispatch::UntilClose => State::BodyUntilClose,
        };
        Step::token(Code::EndOfHeaders, 2)
    }

    /// フレーミングに関わるヘッダー名を記録する
    ///
    /// RFC 7230 Section 3.3.3: Transfer-Encoding があれば Content-Length は無視する
    fn commit_field_name(&mut self, name: &[u8]) -> Result<(), Code> {
        debug_assert!(
            !matches!(
                self.body_type,
                BodyType::ReadingContentLength | BodyType::ReadingEncoding
            ),
            "READING_* body type must be resolved by the previous field value"
        );

        if name.eq_ignore_ascii_case(b"content-length") {
            match self.body_type {
                BodyType::NoBody => self.body_type = BodyType::ReadingContentLength,
                BodyType::ContentLengthRead => return Err(Code::ErrorInvalidContentLength),
                _ => {}
            }
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            match self.body_type {
                // chunked は最後のコーディングでなければならない
                BodyType::ChunkedEncodingRead => return Err(Code::ErrorInvalidTransferEncoding),
                _ => {
                    self.body_type = BodyType::ReadingEncoding;
                    self.body_size = 0;
                }
            }
        }
        Ok(())
    }

    fn commit_field_value(&mut self, value: &[u8]) -> Result<(), Code> {
        match self.body_type {
            BodyType::ReadingContentLength => match parse_decimal::<u64>(value) {
                Ok(size) => {
                    self.body_size = size;
                    self.body_type = BodyType::ContentLengthRead;
                }
                Err(NumberError::Invalid) => return Err(Code::ErrorInvalidContentLength),
                Err(NumberError::Overflow) => return Err(Code::ErrorContentLengthOverflow),
            },
            BodyType::ReadingEncoding => match classify(value) {
                ChunkedPosition::FoundAtEnd => self.body_type = BodyType::ChunkedEncodingRead,
                ChunkedPosition::NotFound => self.body_type = BodyType::RandomEncodingRead,
                ChunkedPosition::Invalid => return Err(Code::ErrorInvalidTransferEncoding),
            },
            _ => {}
        }
        Ok(())
    }

    fn field_colon(&mut self, rest: &[u8]) -> Step {
        match rest.first() {
            None => Step::Pending,
            Some(b':') => {
                self.state = State::FieldOws;
                Step::token(Code::Skip, 1)
            }
            Some(_) => Step::Fail(Code::ErrorInvalidData),
        }
    }

    fn field_ows(&mut self, rest: &[u8]) -> Step {
        let n = rest.iter().take_while(|&&b| is_ows(b)).count();
        if n == rest.len() {
            return Step::Pending;
        }
        self.state = State::FieldValue;
        if n == 0 {
            Step::Again
        } else {
            Step::token(Code::Skip, n)
        }
    }

    fn field_value(&mut self, rest: &[u8]) -> Step {
        let i = match scan(rest, &mut self.scanned, b'\r', is_field_vchar) {
            Ok(Some(i)) => i,
            Ok(None) => return Step::Pending,
            Err(code) => return Step::Fail(code),
        };
        let end = rest[..i]
            .iter()
            .rposition(|&b| !is_ows(b))
            .map_or(0, |p| p + 1);
        if self.section == Section::Headers {
            if let Err(code) = self.commit_field_value(&rest[..end]) {
                return Step::Fail(code);
            }
        }
        self.state = State::FieldCrlf;
        Step::bytes(Code::FieldValue, i, end)
    }

    fn crlf(&mut self, rest: &[u8], next: State) -> Step {
        match rest {
            [] | [b'\r'] => Step::Pending,
            [b'\r', b'\n', ..] => {
                self.state = next;
                Step::token(Code::Skip, 2)
            }
            _ => Step::Fail(Code::ErrorInvalidData),
        }
    }

    /// チャンクサイズは `body_size` に 1 桁ずつ積み上げる
    fn chunk_size(&mut self, rest: &[u8]) -> Step {
        for (i, &b) in rest.iter().enumerate().skip(self.scanned) {
            let Some(digit) = hex_digit(b) else {
                if i == 0 {
                    return Step::Fail(Code::ErrorInvalidData);
                }
                if self.body_size == 0 {
                    // last-chunk の後はトレーラー
                    self.section = Section::Trailers;
                }
                self.state = State::ChunkExt;
                return Step::token(Code::Skip, i);
            };
            // 区切りを待たずにオーバーフローを検出する
            match self
                .body_size
                .checked_mul(16)
                .and_then(|size| size.checked_add(u64::from(digit)))
            {
                Some(size) => self.body_size = size,
                None => return Step::Fail(Code::ErrorChunkSizeOverflow),
            }
        }
        self.scanned = rest.len();
        Step::Pending
    }

    /// chunk-ext は中身を解釈せず、文字種と CRLF 終端だけを検証する
    fn chunk_ext(&mut self, rest: &[u8]) -> Step {
        match rest.first() {
            None => Step::Pending,
            Some(b'\r') => {
                self.state = State::ChunkSizeCrlf;
                Step::Again
            }
            Some(b';' | b' ' | b'\t') => {
                match scan(rest, &mut self.scanned, b'\r', is_field_vchar) {
                    Ok(Some(i)) => {
                        self.state = State::ChunkSizeCrlf;
                        Step::token(Code::Skip, i)
                    }
                    Ok(None) => Step::Pending,
                    Err(code) => Step::Fail(code),
                }
            }
            Some(_) => Step::Fail(Code::ErrorInvalidData),
        }
    }

    fn body(&mut self, rest: &[u8], next: State) -> Step {
        let n = self.body_size.min(rest.len() as u64) as usize;
        if n == 0 {
            return Step::Pending;
        }
        self.body_size -= n as u64;
        if self.body_size == 0 {
            self.state = next;
        }
        Step::bytes(Code::BodyChunk, n, n)
    }

    fn body_until_close(&mut self, rest: &[u8]) -> Step {
        if !rest.is_empty() {
            return Step::bytes(Code::BodyChunk, rest.len(), rest.len());
        }
        if self.eof {
            self.state = State::EndOfMessage;
            return Step::token(Code::EndOfBody, 0);
        }
        Step::Pending
    }
}

/// `stop` までのバイトを `allowed` で検証し、`stop` の位置を返す
///
/// 見つからなければ検証済みの長さを `scanned` に記録して `None` を返す。
/// 次の呼び出しは `scanned` から再開するため、1 バイトあたりの処理量は一定
pub(crate) fn scan(
    rest: &[u8],
    scanned: &mut usize,
    stop: u8,
    allowed: fn(u8) -> bool,
) -> Result<Option<usize>, Code> {
    for (i, &b) in rest.iter().enumerate().skip(*scanned) {
        if b == stop {
            return Ok(Some(i));
        }
        if !allowed(b) {
            return Err(Code::ErrorInvalidData);
        }
    }
    *scanned = rest.len();
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_resumes_after_validated_bytes() {
        let mut scanned = 0;
        assert_eq!(scan(b"abc", &mut scanned, b':', is_tchar), Ok(None));
        assert_eq!(scanned, 3);

        // 検証済みの範囲は読み直さない
        let rest = b"\x00\x00\x00de:";
        assert_eq!(scan(rest, &mut scanned, b':', is_tchar), Ok(Some(5)));

        let mut scanned = 3;
        assert_eq!(
            scan(b"abc d:", &mut scanned, b':', is_tchar),
            Err(Code::ErrorInvalidData)
        );
    }

    #[test]
    fn scan_finds_stop_at_start() {
        let mut scanned = 0;
        assert_eq!(scan(b"\r\n", &mut scanned, b'\r', is_field_vchar), Ok(Some(0)));
        assert_eq!(scanned, 0);
    }
}
