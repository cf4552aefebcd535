//! クライアント側ソケット
//!
//! ## 使い方
//!
//! ```ignore
//! use tokio_http11_socket::{ClientSocket, Request};
//!
//! let mut socket = ClientSocket::new(stream);
//! let request = Request::new("GET", "/").header("Host", "example.com");
//! socket.write_request(&request).await?;
//!
//! let response = loop {
//!     let response = socket.receive_response().await?;
//!     if !response.is_informational() {
//!         break response;
//!     }
//! };
//! let mut body = Vec::new();
//! while let Some(part) = socket.receive_body_part().await? {
//!     body.extend_from_slice(&part);
//! }
//! ```

use std::collections::VecDeque;

use http11_tokenizer::{
    BodyFraming, Code, Request, Response, ResponseReader, encode_request, encode_request_head,
    token,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::SocketConfig;
use crate::error::{Error, Result};
use crate::inbound::{Inbound, ReadState, utf8};
use crate::log::{debug, warning};
use crate::outbound::{BodyWriter, Outbound, WriteState};

/// クライアント側の HTTP ソケット
///
/// リクエストの送信とレスポンスの受信は独立しているため、
/// レスポンスを待たずに次のリクエストを送れる (パイプライン)
pub struct ClientSocket<S> {
    stream: S,
    inbound: Inbound<ResponseReader>,
    outbound: Outbound,
    read_state: ReadState,
    /// レスポンス待ちのリクエストのメソッド (送信順)
    pending_methods: VecDeque<String>,
    /// 受信中のレスポンスが 1xx か
    informational: bool,
    keep_alive: bool,
    open: bool,
}

impl<S> ClientSocket<S>
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
            inbound: Inbound::new(ResponseReader::new(), config),
            outbound: Outbound::new(),
            read_state: ReadState::Empty,
            pending_methods: VecDeque::new(),
            informational: false,
            keep_alive: true,
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

    /// 下位のストリームへの参照
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// 下位のストリームを取り出す
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// リクエスト全体を Content-Length で区切って書く
    pub async fn write_request(&mut self, request: &Request) -> Result<()> {
        let bytes = encode_request(request)?;
        self.begin_request(request);
        self.outbound.write_message(&mut self.stream, &bytes).await
    }

    /// リクエストラインとヘッダーを書く
    ///
    /// Content-Length ヘッダーがあればボディをそのまま送り、
    /// なければ HTTP/1.1 では chunked で送る。
    /// HTTP/1.0 で Content-Length がない場合はボディを送れない
    pub async fn write_request_metadata(&mut self, request: &Request) -> Result<()> {
        let (framing, body) = if request.has_header("Content-Length") {
            (BodyFraming::None, BodyWriter::Raw)
        } else if request.version != "HTTP/1.0" {
            (BodyFraming::Chunked, BodyWriter::Chunked)
        } else {
            (BodyFraming::None, BodyWriter::Discard)
        };
        let head = encode_request_head(request, framing)?;
        self.begin_request(request);
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

    /// リクエストを書き終える
    pub async fn end(&mut self) -> Result<()> {
        self.outbound.end(&mut self.stream).await
    }

    /// レスポンスのヘッダーまでを読む
    ///
    /// 1xx レスポンスもそのまま返すため、最終レスポンスまで繰り返し呼ぶ。
    /// 前のレスポンスのボディが残っている場合は読み捨てる
    ///
    /// # Panics
    ///
    /// レスポンス待ちのリクエストがない場合
    pub async fn receive_response(&mut self) -> Result<Response> {
        if !self.open {
            return Err(Error::ConnectionClosed);
        }
        if self.read_state == ReadState::MessageReady {
            self.skip_message().await?;
        }
        let Some(method) = self.pending_methods.front() else {
            panic!("receive_response called without a pending request");
        };
        self.inbound.set_method(method);

        let mut response = Response::new(0, "");
        let mut name = String::new();
        loop {
            match self.peek().await? {
                Code::Version => {
                    response.version = format!("HTTP/1.{}", self.inbound.value::<token::Version>())
                }
                Code::StatusCode => {
                    response.status_code = self.inbound.value::<token::StatusCode>()
                }
                Code::ReasonPhrase => {
                    response.reason_phrase =
                        self.text(utf8(self.inbound.value::<token::ReasonPhrase>()))?
                }
                Code::FieldName => name = self.text(utf8(self.inbound.value::<token::FieldName>()))?,
                Code::FieldValue => {
                    let value = self.text(utf8(self.inbound.value::<token::FieldValue>()))?;
                    response.headers.push((std::mem::take(&mut name), value));
                }
                Code::EndOfHeaders => {
                    self.inbound.consume();
                    break;
                }
                Code::ErrorUseAnotherConnection => {
                    return Err(self.fail(Error::Protocol(Code::ErrorUseAnotherConnection)));
                }
                _ => {}
            }
            self.inbound.consume();
        }

        self.informational = response.is_informational();
        if !self.informational && !response.is_keep_alive() {
            debug!("response is not keep-alive");
            self.keep_alive = false;
        }
        self.read_state = ReadState::MessageReady;
        self.absorb_end();
        Ok(response)
    }

    /// ボディの断片を読む
    ///
    /// ボディの終わり (トレーラーがあればその手前) で `None`
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

    /// トレーラーを読んでレスポンスを読み終える
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

    fn begin_request(&mut self, request: &Request) {
        if self.outbound.state() == WriteState::Finished {
            self.outbound.reset();
        }
        if !request.is_keep_alive() {
            self.keep_alive = false;
        }
        self.pending_methods.push_back(request.method.clone());
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
            warning!("response stream failed: {}", e);
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
        if self.informational {
            self.read_state = ReadState::Empty;
        } else {
            self.read_state = ReadState::Finished;
            self.pending_methods.pop_front();
            if !self.keep_alive {
                self.open = false;
            }
        }
        // 101 や CONNECT への 2xx、接続終了で区切ったボディの後
        if self.inbound.peek_buffered() == Some(Code::ErrorUseAnotherConnection) {
            debug!("connection can not carry another response");
            self.open = false;
        }
    }
}
