use crate::request::{find, find_all, is_keep_alive};

/// HTTP レスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP バージョン (HTTP/1.1 等)
    pub version: String,
    /// ステータスコード (200, 404, etc.)
    pub status_code: u16,
    /// ステータスフレーズ (OK, Not Found, etc.)
    pub reason_phrase: String,
    /// ヘッダー (受信順、重複を保持)
    pub headers: Vec<(String, String)>,
    /// ボディ
    pub body: Vec<u8>,
}

impl Response {
    /// 新しいレスポンスを作成 (HTTP/1.1)
    pub fn new(status_code: u16, reason_phrase: &str) -> Self {
        Self::with_version("HTTP/1.1", status_code, reason_phrase)
    }

    /// カスタムバージョンでレスポンスを作成
    pub fn with_version(version: &str, status_code: u16, reason_phrase: &str) -> Self {
        Self {
            version: version.to_string(),
            status_code,
            reason_phrase: reason_phrase.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// ヘッダーを追加 (ビルダーパターン)
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// ボディを設定 (ビルダーパターン)
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// ヘッダーを取得 (大文字小文字を区別しない)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find(&self.headers, name)
    }

    /// 指定した名前のヘッダーをすべて取得
    pub fn get_headers(&self, name: &str) -> Vec<&str> {
        find_all(&self.headers, name)
    }

    /// ヘッダーが存在するか確認
    pub fn has_header(&self, name: &str) -> bool {
        find(&self.headers, name).is_some()
    }

    /// キープアライブ接続かどうかを判定
    pub fn is_keep_alive(&self) -> bool {
        is_keep_alive(&self.version, &self.headers)
    }

    /// ステータスコードが情報レスポンス (1xx) か確認
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status_code)
    }

    /// ステータスコード上ボディを持ちうるか確認
    ///
    /// 1xx, 204, 304 はボディを持たない (RFC 7230 Section 3.3.3)
    pub fn status_has_body(&self) -> bool {
        status_has_body(self.status_code)
    }
}

pub(crate) fn status_has_body(status_code: u16) -> bool {
    !((100..200).contains(&status_code) || status_code == 204 || status_code == 304)
}
