/// HTTP リクエスト
///
/// トークナイザーの出力を集めたもの、またはエンコーダーの入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP メソッド (GET, POST, etc.)
    pub method: String,
    /// リクエストターゲット
    pub uri: String,
    /// HTTP バージョン (デフォルト: HTTP/1.1)
    pub version: String,
    /// ヘッダー (受信順、重複を保持)
    pub headers: Vec<(String, String)>,
    /// ボディ
    pub body: Vec<u8>,
}

impl Request {
    /// 新しいリクエストを作成 (HTTP/1.1)
    pub fn new(method: &str, uri: &str) -> Self {
        Self::with_version(method, uri, "HTTP/1.1")
    }

    /// カスタムバージョンでリクエストを作成
    pub fn with_version(method: &str, uri: &str, version: &str) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
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
    ///
    /// HTTP/1.1 ではデフォルトでキープアライブ
    /// HTTP/1.0 では Connection: keep-alive が必要
    pub fn is_keep_alive(&self) -> bool {
        is_keep_alive(&self.version, &self.headers)
    }

    /// `Expect: 100-continue` を送ってきたか確認
    ///
    /// RFC 7231 Section 5.1.1: HTTP/1.0 クライアントからの 100-continue は無視する
    pub fn expects_continue(&self) -> bool {
        self.version != "HTTP/1.0"
            && self
                .get_headers("Expect")
                .iter()
                .any(|v| v.trim().eq_ignore_ascii_case("100-continue"))
    }
}

pub(crate) fn find<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub(crate) fn find_all<'a>(fields: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Connection ヘッダーはカンマ区切りのトークンリストとして扱う (RFC 7230 Section 6.1)
pub(crate) fn is_keep_alive(version: &str, fields: &[(String, String)]) -> bool {
    let mut has_keep_alive = false;
    for value in find_all(fields, "Connection") {
        for token in value.split(',') {
            let token = token.trim();
            if token.eq_ignore_ascii_case("close") {
                return false;
            }
            if token.eq_ignore_ascii_case("keep-alive") {
                has_keep_alive = true;
            }
        }
    }
    has_keep_alive || version != "HTTP/1.0"
}
