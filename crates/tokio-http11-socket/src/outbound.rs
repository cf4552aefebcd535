//! 送信側の状態機械
//!
//! 書き込み順序 (メタデータ、ボディ、トレーラー、終端) を強制する。
//! 順序違反は呼び出し側のバグなので panic する。

use http11_tokenizer::{CONTINUE_RESPONSE, encode_chunk, encode_last_chunk};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::log::debug;

/// 書き込み側の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// 何も書いていない
    Empty,
    /// `100 Continue` を書いた
    ContinueIssued,
    /// スタートラインとヘッダーを書いた
    MetadataIssued,
    /// トレーラーを書いた (残りは終端のみ)
    TrailersIssued,
    /// メッセージを書き終えた
    Finished,
}

/// ボディの書き方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyWriter {
    /// ボディを持たないメッセージ
    Discard,
    /// そのまま書く (Content-Length 指定済み、または接続終了で区切る)
    Raw,
    Chunked,
}

#[derive(Debug)]
pub(crate) struct Outbound {
    state: WriteState,
    body: BodyWriter,
}

impl Outbound {
    pub(crate) fn new() -> Self {
        Self {
            state: WriteState::Empty,
            body: BodyWriter::Discard,
        }
    }

    pub(crate) fn state(&self) -> WriteState {
        self.state
    }

    pub(crate) fn reset(&mut self) {
        self.state = WriteState::Empty;
        self.body = BodyWriter::Discard;
    }

    fn assert_can_start(&self) {
        assert!(
            matches!(self.state, WriteState::Empty | WriteState::ContinueIssued),
            "message metadata already written"
        );
    }

    pub(crate) async fn write_continue<S>(&mut self, stream: &mut S) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        assert!(
            self.state == WriteState::Empty,
            "100-continue must precede any other write"
        );
        stream.write_all(CONTINUE_RESPONSE).await?;
        stream.flush().await?;
        debug!("100-continue issued");
        self.state = WriteState::ContinueIssued;
        Ok(())
    }

    /// スタートラインとヘッダーを書く
    pub(crate) async fn write_metadata<S>(
        &mut self,
        stream: &mut S,
        head: &[u8],
        body: BodyWriter,
    ) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        self.assert_can_start();
        stream.write_all(head).await?;
        stream.flush().await?;
        self.state = WriteState::MetadataIssued;
        self.body = body;
        Ok(())
    }

    /// ボディまで含めたメッセージを一度に書く
    pub(crate) async fn write_message<S>(&mut self, stream: &mut S, message: &[u8]) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        self.assert_can_start();
        stream.write_all(message).await?;
        stream.flush().await?;
        self.state = WriteState::Finished;
        Ok(())
    }

    pub(crate) async fn write<S>(&mut self, stream: &mut S, data: &[u8]) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        assert!(
            self.state == WriteState::MetadataIssued,
            "body written outside of message body"
        );
        match self.body {
            BodyWriter::Discard => return Ok(()),
            BodyWriter::Raw => stream.write_all(data).await?,
            BodyWriter::Chunked => stream.write_all(&encode_chunk(data)).await?,
        }
        stream.flush().await?;
        Ok(())
    }

    /// トレーラーを書く
    ///
    /// chunked 以外ではトレーラーを送れないため捨てる
    pub(crate) async fn write_trailers<S>(
        &mut self,
        stream: &mut S,
        trailers: &[(String, String)],
    ) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        assert!(
            self.state == WriteState::MetadataIssued,
            "trailers written outside of message body"
        );
        if self.body == BodyWriter::Chunked {
            stream.write_all(&encode_last_chunk(trailers)?).await?;
        } else if !trailers.is_empty() {
            debug!("trailers dropped: message is not chunked");
        }
        self.state = WriteState::TrailersIssued;
        Ok(())
    }

    pub(crate) async fn end<S>(&mut self, stream: &mut S) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        assert!(
            matches!(
                self.state,
                WriteState::MetadataIssued | WriteState::TrailersIssued
            ),
            "end called before message metadata"
        );
        if self.body == BodyWriter::Chunked && self.state == WriteState::MetadataIssued {
            stream.write_all(&encode_last_chunk(&[])?).await?;
        }
        stream.flush().await?;
        self.state = WriteState::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn chunked_body_and_trailers() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut outbound = Outbound::new();

        outbound
            .write_metadata(&mut server, b"HEAD\r\n\r\n", BodyWriter::Chunked)
            .await
            .unwrap();
        outbound.write(&mut server, b"abc").await.unwrap();
        outbound.write(&mut server, b"").await.unwrap();
        let trailers = vec![("X-Sum".to_string(), "1".to_string())];
        outbound.write_trailers(&mut server, &trailers).await.unwrap();
        outbound.end(&mut server).await.unwrap();
        assert_eq!(outbound.state(), WriteState::Finished);
        drop(server);

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        assert_eq!(wire, b"HEAD\r\n\r\n3\r\nabc\r\n0\r\nX-Sum: 1\r\n\r\n");
    }

    #[tokio::test]
    async fn discard_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut outbound = Outbound::new();

        outbound
            .write_metadata(&mut server, b"H\r\n\r\n", BodyWriter::Discard)
            .await
            .unwrap();
        outbound.write(&mut server, b"ignored").await.unwrap();
        outbound.end(&mut server).await.unwrap();
        drop(server);

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        assert_eq!(wire, b"H\r\n\r\n");
    }

    #[tokio::test]
    #[should_panic(expected = "body written outside of message body")]
    async fn body_before_metadata_panics() {
        let (_client, mut server) = tokio::io::duplex(64);
        let mut outbound = Outbound::new();
        let _ = outbound.write(&mut server, b"x").await;
    }

    #[tokio::test]
    #[should_panic(expected = "100-continue must precede any other write")]
    async fn continue_after_metadata_panics() {
        let (_client, mut server) = tokio::io::duplex(4096);
        let mut outbound = Outbound::new();
        outbound
            .write_metadata(&mut server, b"H\r\n\r\n", BodyWriter::Raw)
            .await
            .unwrap();
        let _ = outbound.write_continue(&mut server).await;
    }
}
