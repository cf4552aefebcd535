//! 受信側: バッファとトークナイザーの組
//!
//! バッファは [`Inbound`] が所有し、トークナイザーが消費済みと報告した
//! 先頭部分だけを捨てて次の読み取りを追加する。

use http11_tokenizer::token::Kind;
use http11_tokenizer::{Code, RequestReader, ResponseReader, Tokenizer};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::SocketConfig;
use crate::error::{Error, Result};
use crate::log::{debug, warning};

/// 読み取り側の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// メッセージを待っている
    Empty,
    /// ヘッダーまで読んだ (ボディかトレーラーが残っている)
    MessageReady,
    /// メッセージ終端まで読んだ
    Finished,
}

/// 接続終了の通知を受け取れるトークナイザー
pub(crate) trait Reader: Tokenizer {
    fn puteof(&mut self) {}
}

impl Reader for RequestReader {}

impl Reader for ResponseReader {
    fn puteof(&mut self) {
        ResponseReader::puteof(self);
    }
}

pub(crate) struct Inbound<R> {
    reader: R,
    buf: Vec<u8>,
    /// 現在のトークンを処理済みか
    consumed: bool,
    eof: bool,
    config: SocketConfig,
}

impl<R: Reader> Inbound<R> {
    pub(crate) fn new(reader: R, config: SocketConfig) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            consumed: false,
            eof: false,
            config,
        }
    }

    /// 現在のトークンの値
    pub(crate) fn value<K: Kind>(&self) -> K::Value<'_> {
        self.reader.value::<K>(&self.buf)
    }

    /// 現在のトークンを処理済みにする
    pub(crate) fn consume(&mut self) {
        self.consumed = true;
    }

    /// 未消費のバイトが残っていないか
    pub(crate) fn is_drained(&self) -> bool {
        self.buf.len() == self.reader.parsed_count()
    }

    /// 未処理のトークンを得る (必要なら読み取る)
    ///
    /// `error_use_another_connection` 以外のエラーは `Error::Protocol` になる
    pub(crate) async fn peek<S>(&mut self, stream: &mut S) -> Result<Code>
    where
        S: AsyncRead + Unpin,
    {
        loop {
            if let Some(code) = self.peek_buffered() {
                if code.is_error() && code != Code::ErrorUseAnotherConnection {
                    warning!("protocol error: {}", code);
                    return Err(Error::Protocol(code));
                }
                return Ok(code);
            }
            if !self.fill(stream).await? {
                debug!("peer closed in the middle of a message");
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// 読み取りなしで得られる未処理のトークン
    pub(crate) fn peek_buffered(&mut self) -> Option<Code> {
        if self.consumed {
            self.reader.next(&self.buf);
            self.consumed = false;
        }
        match self.reader.code() {
            Code::ErrorInsufficientData => None,
            code => Some(code),
        }
    }

    /// 消費済みの部分を捨てて読み取りを追加する
    ///
    /// 接続が閉じられて新しいトークンが得られない場合は `false`
    async fn fill<S>(&mut self, stream: &mut S) -> Result<bool>
    where
        S: AsyncRead + Unpin,
    {
        let consumed = self.reader.parsed_count();
        self.buf.drain(..consumed);
        if self.eof {
            return Ok(false);
        }
        if self.buf.len() >= self.config.max_buffer_size {
            let expected = self.reader.expected_token();
            warning!("header section too large: expected={}", expected);
            return Err(Error::HeaderSectionTooLarge { expected });
        }

        let start = self.buf.len();
        let size = self
            .config
            .read_chunk_size
            .min(self.config.max_buffer_size - start);
        self.buf.resize(start + size, 0);
        let result = match self.config.read_timeout {
            Some(timeout) => {
                tokio::time::timeout(timeout, stream.read(&mut self.buf[start..])).await
            }
            None => Ok(stream.read(&mut self.buf[start..]).await),
        };
        let n = match result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                self.buf.truncate(start);
                return Err(e.into());
            }
            Err(e) => {
                self.buf.truncate(start);
                return Err(e.into());
            }
        };
        self.buf.truncate(start + n);

        self.reader.set_buffer(&self.buf);
        if n == 0 {
            self.eof = true;
            self.reader.puteof();
            return Ok(self.reader.code() != Code::ErrorInsufficientData);
        }
        Ok(true)
    }
}

impl Inbound<ResponseReader> {
    /// 対応するリクエストのメソッドを設定する
    ///
    /// `error_set_method` で止まっていた場合はそこから再開する
    pub(crate) fn set_method(&mut self, method: &str) {
        self.reader.set_method(method);
        if self.reader.code() == Code::ErrorSetMethod {
            self.consumed = true;
        }
    }
}

/// ヘッダー名と値を文字列にする
pub(crate) fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
}
