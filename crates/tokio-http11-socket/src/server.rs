//! サーバー側ソケット
//!
//! ## 使い方
//!
//! ```ignore
//! use tokio_http11_socket::{Response, ServerSocket};
//!
//! let mut socket = ServerSocket::new(stream);
//! while let Some(request) = socket.receive_request().await? {
//!     if socket.incoming_request_continue_required() {
//!         socket.write_response_continue().await?;
//!     }
//!     let mut body = Vec::new();
//!     while let Some(part) = socket.receive_body_part().await? {
//!         body.extend_from_slice(&part);
//!     }
//!     socket.receive_trailers().await?;
//!
//!     let response = Response::new(200, "OK").body(body);
//!     socket.write_response(&response).await?;
//!     if !socket.is_open() {
//!         break;
//!     }
//! }
//! ```

use http11_tokenizer::{
    BodyFraming, Code, Request, RequestReader, Response, encode_response_head, response_has_body,
    token,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::SocketConfig;
use crate::error::{Error, Result};
use crate::inbound::{Inbound, ReadState, utf8};
use crate::log::{debug, warning};
use crate::outbound::{BodyWriter, Outbound, WriteState};

/// 受信中のリクエストのうち、レスポンスの書き方に関わる情報
#[derive(Debug, Clone)]
struct Exchange {
    method: String,
    /// HTTP/1.1 以降か
    native_stream: bool,
    keep_alive: bool,
    expects_continue: bool,
}

/// サーバー側の HTTP ソケット
///
/// リクエストを読み、対応するレスポンスを書く。
/// レスポンスを書き終え、リクエストを最後まで読むと次のリクエストを受け取れる
pub struct ServerSocket<S> {
    stream: S,
    inbound: Inbound<RequestReader>,
    outbound: Outbound,
    read_state: ReadState,
    exchange: Option<Exchange>,
    open: bool,
}

impl<S> ServerSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// デフォルト設定でソケットを作成
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, SocketConfig::default())
    }

    /// 設定を指定してソケットを作成
    pub fn with_config(stream: S, config: SocketConfig) -> Self {
        Self {
            stream,
            inbound: Inbound::new(RequestReader::new(), config),
            outbound: Outbound::new(),
            read_state: ReadState::Empty,
            exchange: None,
            open: true,
        }
    }

    /// 次のリクエストにこの接続を使えるか
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// 読み取り側の状態
    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    /// 書き込み側の状態
    pub fn write_state(&self) -> WriteState {
        self.outbound.state()
    }

    /// 相手が chunked のレスポンスを受け取れるか (HTTP/1.1 以降)
    pub fn write_response_native_stream(&self) -> bool {
        self.exchange.as_ref().is_some_and(|e| e.native_stream)
    }

    /// 下位のストリームへの参照
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// 下位のストリームを取り出す
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// リクエストのヘッダーまでを読む
    ///
    /// メッセージの境界で接続が閉じられた場合は `None`。
    /// 前のレスポンスを書き終えていて、前のリクエストのボディが残っている場合は読み捨てる
    pub async fn receive_request(&mut self) -> Result<Option<Request>> {
        if !self.open {
            return Err(Error::ConnectionClosed);
        }
        if self.read_state == ReadState::MessageReady
            && self.outbound.state() == WriteState::Finished
        {
            self.skip_message().await?;
            self.finish_exchange();
        }
        assert!(
            self.read_state == ReadState::Empty && self.outbound.state() == WriteState::Empty,
            "previous exchange is not finished"
        );

        let mut request = Request::new("", "");
        let mut name = String::new();
        loop {
            let code = match self.inbound.peek(&mut self.stream).await {
                Ok(code) => code,
                Err(Error::ConnectionClosed) if self.inbound.is_drained() => {
                    debug!("peer closed between requests");
                    self.open = false;
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(e)),
            };
            match code {
                Code::Method => request.method = self.text(utf8(self.inbound.value::<token::Method>()))?,
                Code::RequestTarget => {
                    request.uri = self.text(utf8(self.inbound.value::<token::RequestTarget>()))?
                }
                Code::Version => {
                    request.version = format!("HTTP/1.{}", self.inbound.value::<token::Version>())
                }
                Code::FieldName => name = self.text(utf8(self.inbound.value::<token::FieldName>()))?,
                Code::FieldValue => {
                    let value = self.text(utf8(self.inbound.value::<token::FieldValue>()))?;
                    request.headers.push((std::mem::take(&mut name), value));
                }
                Code::EndOfHeaders => {
                    self.inbound.consume();
                    break;
                }
                _ => {}
            }
            self.inbound.consume();
        }

        let keep_alive = request.is_keep_alive();
        if !keep_alive {
            debug!("request is not keep-alive");
        }
        self.exchange = Some(Exchange {
            method: request.method.clone(),
            native_stream: request.version != "HTTP/1.0",
            keep_alive,
            expects_continue: request.expects_continue(),
        });
        self.read_state = ReadState::MessageReady;
        self.absorb_end();
        Ok(Some(request))
    }

    /// ボディの断片を読む
    ///
    /// ボディの終わり (トレーラーがあればその手前) で `None`。
    /// 先にレスポンスを書き終えていて、リクエストも読み終えた後は常に `None`
    pub async fn receive_body_part(&mut self) -> Result<Option<Vec<u8>>> {
        if self.read_state != ReadState::MessageReady {
            return Ok(None);
        }
        loop {
            match self.peek().await? {
                Code::BodyChunk => {
                    let part = self.inbound.value::<token::BodyChunk>().to_vec();
                    self.inbound.consume();
                    return Ok(Some(part));
                }
                Code::FieldName => return Ok(None),
                Code::EndOfMessage => {
                    self.inbound.consume();
                    self.finish_read();
                    return Ok(None);
                }
                _ => self.inbound.consume(),
            }
        }
    }

    /// トレーラーを読んでメッセージを読み終える
    ///
    /// 残っているボディは読み捨てる
    pub async fn receive_trailers(&mut self) -> Result<Vec<(String, String)>> {
        let mut trailers = Vec::new();
        if self.read_state != ReadState::MessageReady {
            return Ok(trailers);
        }
        let mut name = String::new();
        loop {
            match self.peek().await? {
                Code::FieldName => name = self.text(utf8(self.inbound.value::<token::FieldName>()))?,
                Code::FieldValue => {
                    let value = self.text(utf8(self.inbound.value::<token::FieldValue>()))?;
                    trailers.push((std::mem::take(&mut name), value));
                }
                Code::EndOfMessage => {
                    self.inbound.consume();
                    self.finish_read();
                    return Ok(trailers);
                }
                _ => {}
            }
            self.inbound.consume();
        }
    }

    /// `Expect: 100-continue` に応える必要があるか
    pub fn incoming_request_continue_required(&self) -> bool {
        self.read_state == ReadState::MessageReady
            && self.outbound.state() == WriteState::Empty
            && self.exchange.as_ref().is_some_and(|e| e.expects_continue)
    }

    /// `100 Continue` を書く
    ///
    /// # Panics
    ///
    /// すでにレスポンスを書き始めている場合
    pub async fn write_response_continue(&mut self) -> Result<()> {
        self.outbound.write_continue(&mut self.stream).await
    }

    /// ステータスラインとヘッダーを書く
    ///
    /// HTTP/1.1 の相手には chunked、HTTP/1.0 の相手には接続終了で区切ったボディを送る。
    /// `response.body` は使わない
    pub async fn write_response_metadata(&mut self, response: &Response) -> Result<()> {
        self.close_if_continue_pending();
        let has_body = self.has_body(response.status_code);
        let (framing, body) = if !has_body {
            (BodyFraming::None, BodyWriter::Discard)
        } else if self.write_response_native_stream() {
            (BodyFraming::Chunked, BodyWriter::Chunked)
        } else {
            self.close_after_response();
            (BodyFraming::CloseDelimited, BodyWriter::Raw)
        };
        let head = self.head(response, framing)?;
        self.outbound
            .write_metadata(&mut self.stream, &head, body)
            .await
    }

    /// ボディの断片を書く
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.outbound.write(&mut self.stream, data).await
    }

    /// トレーラーを書く (chunked の場合のみ送られる)
    pub async fn write_trailers(&mut self, trailers: &[(String, String)]) -> Result<()> {
        self.outbound.write_trailers(&mut self.stream, trailers).await
    }

    /// レスポンスを書き終える
    pub async fn end(&mut self) -> Result<()> {
        self.outbound.end(&mut self.stream).await?;
        self.after_response().await
    }

    /// レスポンス全体を Content-Length で区切って書く
    pub async fn write_response(&mut self, response: &Response) -> Result<()> {
        self.close_if_continue_pending();
        let bytes = if self.has_body(response.status_code) {
            let framing = BodyFraming::ContentLength(response.body.len() as u64);
            let mut bytes = self.head(response, framing)?;
            bytes.extend_from_slice(&response.body);
            bytes
        } else {
            self.head(response, BodyFraming::None)?
        };
        self.outbound.write_message(&mut self.stream, &bytes).await?;
        self.after_response().await
    }

    /// 100-continue を待っている相手はボディを送ってこない可能性があるため、
    /// 最終レスポンスの後に接続を閉じる
    fn close_if_continue_pending(&mut self) {
        if self.incoming_request_continue_required() {
            debug!("final response without 100-continue");
            self.close_after_response();
        }
    }

    fn has_body(&self, status_code: u16) -> bool {
        let method = self.exchange.as_ref().map_or("", |e| e.method.as_str());
        response_has_body(method, status_code)
    }

    fn must_close(&self) -> bool {
        !self.open || !self.exchange.as_ref().is_some_and(|e| e.keep_alive)
    }

    fn close_after_response(&mut self) {
        if let Some(exchange) = &mut self.exchange {
            exchange.keep_alive = false;
        }
    }

    /// 接続を閉じる場合は `Connection: close` を付ける
    fn head(&self, response: &Response, framing: BodyFraming) -> Result<Vec<u8>> {
        if !self.must_close() || framing == BodyFraming::CloseDelimited {
            return Ok(encode_response_head(response, framing)?);
        }
        let mut head = Response::with_version(
            &response.version,
            response.status_code,
            &response.reason_phrase,
        );
        head.headers = response.headers.clone();
        let has_close = head
            .get_headers("Connection")
            .iter()
            .any(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")));
        if !has_close {
            head.headers
                .push(("Connection".to_string(), "close".to_string()));
        }
        Ok(encode_response_head(&head, framing)?)
    }

    async fn after_response(&mut self) -> Result<()> {
        if self.must_close() {
            debug!("closing connection after response");
            self.open = false;
            self.stream.shutdown().await?;
            return Ok(());
        }
        self.finish_exchange();
        Ok(())
    }

    async fn peek(&mut self) -> Result<Code> {
        match self.inbound.peek(&mut self.stream).await {
            Ok(code) => Ok(code),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 読み取りに失敗した接続は再利用しない
    fn fail(&mut self, e: Error) -> Error {
        if self.open {
            warning!("request stream failed: {}", e);
        }
        self.open = false;
        e
    }

    fn text(&mut self, result: Result<String>) -> Result<String> {
        result.map_err(|e| self.fail(e))
    }

    /// 読み取りなしで得られる終端トークンを消費する
    fn absorb_end(&mut self) {
        while let Some(code) = self.inbound.peek_buffered() {
            match code {
                Code::Skip | Code::EndOfBody => self.inbound.consume(),
                Code::EndOfMessage => {
                    self.inbound.consume();
                    self.finish_read();
                    return;
                }
                _ => return,
            }
        }
    }

    async fn skip_message(&mut self) -> Result<()> {
        loop {
            if self.peek().await? == Code::EndOfMessage {
                self.inbound.consume();
                self.finish_read();
                return Ok(());
            }
            self.inbound.consume();
        }
    }

    fn finish_read(&mut self) {
        self.read_state = ReadState::Finished;
        self.finish_exchange();
    }

    fn finish_exchange(&mut self) {
        if self.read_state == ReadState::Finished && self.outbound.state() == WriteState::Finished
        {
            self.read_state = ReadState::Empty;
            self.outbound.reset();
            self.exchange = None;
        }
    }
}
