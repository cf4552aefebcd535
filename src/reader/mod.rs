//! ゼロコピー HTTP/1.x トークナイザー
//!
//! 呼び出し側が所有するバッファを 1 トークンずつ読み進める。
//! トークナイザーは内部でバッファリングしない。
//!
//! ## バッファの扱い
//!
//! - [`Tokenizer::set_buffer`] に渡すバッファは、前回のバッファの未消費部分
//!   (先頭から [`Tokenizer::parsed_count`] バイトより後ろ) から始まっていなければならない
//! - [`Tokenizer::next`] と [`Tokenizer::value`] には、直近に `set_buffer` に渡したバッファを渡す
//! - トークンの値は次にトークナイザーを進めるまでしか有効ではない
//!
//! ## 使い方
//!
//! ```rust
//! use http11_tokenizer::{Code, RequestReader, Tokenizer, token};
//!
//! let buf = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let mut reader = RequestReader::new();
//! reader.set_buffer(buf);
//!
//! assert_eq!(reader.code(), Code::Method);
//! assert_eq!(reader.value::<token::Method>(buf), b"GET");
//!
//! while reader.code() != Code::EndOfMessage {
//!     assert!(!reader.code().is_error());
//!     reader.next(buf);
//! }
//! assert_eq!(reader.parsed_count(), buf.len());
//! ```

mod core;
mod request;
mod response;

pub use request::RequestReader;
pub use response::ResponseReader;

use crate::token::{Code, Kind, View};

use self::core::Step;

/// トークナイザーの共通操作
pub trait Tokenizer {
    /// 次のバッファを設定してパースを再開する
    ///
    /// 現在のトークンは消費済みとして扱う。
    /// `buf` は前回のバッファの未消費部分から始まっていなければならない。
    fn set_buffer(&mut self, buf: &[u8]);

    /// 現在のトークンを消費して次のトークンをパースする
    ///
    /// データ不足の状態で呼んでも、バッファが変わらなければ結果も変わらない
    fn next(&mut self, buf: &[u8]);

    /// 現在のトークン種別
    fn code(&self) -> Code;

    /// 現在のトークンが占めるバイト数
    ///
    /// ヘッダー値の場合は末尾の OWS を含む
    fn token_size(&self) -> usize;

    /// 現在のバッファで消費済みのバイト数 (現在のトークンを含む)
    fn parsed_count(&self) -> usize;

    /// 次に出るはずのトークン種別
    ///
    /// エラー状態では保持しているエラーコードを返す
    fn expected_token(&self) -> Code;

    #[doc(hidden)]
    fn view<'a>(&self, buf: &'a [u8]) -> View<'a>;

    /// 現在のトークンの値を取得
    ///
    /// # Panics
    ///
    /// `K` が現在のトークン種別と一致しない場合
    fn value<'a, K: Kind>(&self, buf: &'a [u8]) -> K::Value<'a> {
        assert!(
            self.code() == K::CODE,
            "token value of another kind requested"
        );
        K::project(self.view(buf))
    }
}

/// `HTTP/1.x` をパース
///
/// 8 バイト固定長なので区切り文字を待たない
pub(crate) fn version_token(rest: &[u8]) -> Step {
    const PREFIX: &[u8] = b"HTTP/1.";

    let n = rest.len().min(PREFIX.len());
    if rest[..n] != PREFIX[..n] {
        return Step::Fail(Code::ErrorInvalidData);
    }
    match rest.get(PREFIX.len()) {
        None => Step::Pending,
        Some(&d @ b'0'..=b'9') => Step::number(Code::Version, PREFIX.len() + 1, (d - b'0') as u16),
        Some(_) => Step::Fail(Code::ErrorInvalidData),
    }
}
