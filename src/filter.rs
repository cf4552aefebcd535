//! トークンフィルター
//!
//! トークナイザーの出力を書き換えずに、特定のトークンを `skip` として読ませる。
//!
//! ```rust
//! use http11_tokenizer::filter::{DropFields, Filtered};
//! use http11_tokenizer::{Code, RequestReader, Tokenizer};
//!
//! let buf = b"GET / HTTP/1.1\r\nHost: a\r\nCookie: secret\r\n\r\n";
//! let mut reader = Filtered::new(RequestReader::new(), DropFields::new(["cookie"]));
//! reader.set_buffer(buf);
//!
//! let mut names = Vec::new();
//! while reader.code() != Code::EndOfMessage {
//!     if reader.code() == Code::FieldName {
//!         names.push(reader.value::<http11_tokenizer::token::FieldName>(buf).to_vec());
//!     }
//!     reader.next(buf);
//! }
//! assert_eq!(names, vec![b"Host".to_vec()]);
//! ```

use crate::reader::Tokenizer;
use crate::token::{Code, View};

/// トークンを抑止するかを決める
pub trait TokenFilter {
    /// `code` をそのまま返すか、抑止する場合は [`Code::Skip`] を返す
    ///
    /// `bytes` は値を持つトークンの値で、それ以外は空
    fn filter(&mut self, code: Code, bytes: &[u8]) -> Code;
}

impl<F: TokenFilter + ?Sized> TokenFilter for &mut F {
    fn filter(&mut self, code: Code, bytes: &[u8]) -> Code {
        (**self).filter(code, bytes)
    }
}

/// 前のフィルターの結果を次のフィルターに渡す
impl<A: TokenFilter, B: TokenFilter> TokenFilter for (A, B) {
    fn filter(&mut self, code: Code, bytes: &[u8]) -> Code {
        let code = self.0.filter(code, bytes);
        self.1.filter(code, bytes)
    }
}

/// 指定した名前のヘッダー (トレーラーを含む) を取り除く
#[derive(Debug, Clone, Default)]
pub struct DropFields {
    names: Vec<String>,
    drop_value: bool,
}

impl DropFields {
    /// 取り除くヘッダー名 (大文字小文字を区別しない) を指定して作成
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            drop_value: false,
        }
    }

    fn matches(&self, name: &[u8]) -> bool {
        self.names
            .iter()
            .any(|n| n.as_bytes().eq_ignore_ascii_case(name))
    }
}

impl TokenFilter for DropFields {
    fn filter(&mut self, code: Code, bytes: &[u8]) -> Code {
        match code {
            Code::FieldName => {
                self.drop_value = self.matches(bytes);
                if self.drop_value { Code::Skip } else { code }
            }
            Code::FieldValue if self.drop_value => {
                self.drop_value = false;
                Code::Skip
            }
            _ => code,
        }
    }
}

/// フィルターを通したトークナイザー
///
/// 抑止されたトークンは同じ `token_size` の `skip` として見える
#[derive(Debug, Clone)]
pub struct Filtered<T, F> {
    inner: T,
    filter: F,
    code: Code,
}

impl<T: Tokenizer, F: TokenFilter> Filtered<T, F> {
    /// トークナイザーにフィルターを被せる
    pub fn new(inner: T, filter: F) -> Self {
        let code = inner.code();
        Self {
            inner,
            filter,
            code,
        }
    }

    /// 元のトークナイザーへの参照
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// 元のトークナイザーへの可変参照
    ///
    /// `ResponseReader::set_method` を呼ぶ場合などに使う
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// フィルターへの可変参照
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// トークナイザーとフィルターに分解する
    pub fn into_inner(self) -> (T, F) {
        (self.inner, self.filter)
    }

    fn apply(&mut self, buf: &[u8]) {
        let code = self.inner.code();
        self.code = if code.is_error() || code == Code::Skip {
            code
        } else {
            self.filter.filter(code, self.inner.view(buf).bytes())
        };
    }
}

impl<T: Tokenizer, F: TokenFilter> Tokenizer for Filtered<T, F> {
    fn set_buffer(&mut self, buf: &[u8]) {
        self.inner.set_buffer(buf);
        self.apply(buf);
    }

    fn next(&mut self, buf: &[u8]) {
        self.inner.next(buf);
        self.apply(buf);
    }

    fn code(&self) -> Code {
        self.code
    }

    fn token_size(&self) -> usize {
        self.inner.token_size()
    }

    fn parsed_count(&self) -> usize {
        self.inner.parsed_count()
    }

    fn expected_token(&self) -> Code {
        self.inner.expected_token()
    }

    fn view<'a>(&self, buf: &'a [u8]) -> View<'a> {
        self.inner.view(buf)
    }
}
