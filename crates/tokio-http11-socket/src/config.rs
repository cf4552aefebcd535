//! ソケット設定

use std::time::Duration;

/// ソケットの読み取り設定
///
/// ```
/// use std::time::Duration;
/// use tokio_http11_socket::SocketConfig;
///
/// let config = SocketConfig::default()
///     .max_buffer_size(16 * 1024)
///     .read_timeout(Duration::from_secs(30));
/// assert_eq!(config.read_chunk_size, 8 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// 未消費のまま保持できる最大バイト数
    ///
    /// 1 トークン (ヘッダー行など) がこれを超えると
    /// [`Error::HeaderSectionTooLarge`](crate::Error::HeaderSectionTooLarge) になる
    pub max_buffer_size: usize,
    /// 1 回の読み取りで要求するバイト数
    pub read_chunk_size: usize,
    /// 1 回の読み取りのタイムアウト
    pub read_timeout: Option<Duration>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 64 * 1024,
            read_chunk_size: 8 * 1024,
            read_timeout: None,
        }
    }
}

impl SocketConfig {
    /// 最大バッファサイズを設定
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// 読み取りサイズを設定
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// 読み取りタイムアウトを設定
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}
