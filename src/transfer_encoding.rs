//! Transfer-Encoding の chunked 判定 (RFC 7230 Section 3.3.1)
//!
//! ## 使い方
//!
//! ```rust
//! use http11_tokenizer::transfer_encoding::{ChunkedPosition, classify};
//!
//! assert_eq!(classify(b"gzip, chunked"), ChunkedPosition::FoundAtEnd);
//! assert_eq!(classify(b"gzip"), ChunkedPosition::NotFound);
//! assert_eq!(classify(b"chunked, gzip"), ChunkedPosition::Invalid);
//! ```

use crate::syntax::is_ows;

/// Transfer-Encoding 中の chunked の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkedPosition {
    /// chunked を含まない
    NotFound,
    /// chunked が最後以外にある、または 2 回以上現れる
    Invalid,
    /// chunked が最後の要素
    FoundAtEnd,
}

/// Transfer-Encoding ヘッダー値を判定
///
/// カンマ区切りの要素として chunked を大文字小文字を区別せずに探す。
/// 他のトークンの一部 (`xchunked` など) は chunked とみなさない。
/// chunked の後ろに許されるのは OWS と空要素 (末尾のカンマ) だけ。
pub fn classify(value: &[u8]) -> ChunkedPosition {
    let mut elements = value.split(|&b| b == b',').map(trim_ows);

    if !elements
        .by_ref()
        .any(|element| element.eq_ignore_ascii_case(b"chunked"))
    {
        return ChunkedPosition::NotFound;
    }

    // chunked より後ろの要素がすべて空であること
    if elements.all(|element| element.is_empty()) {
        ChunkedPosition::FoundAtEnd
    } else {
        ChunkedPosition::Invalid
    }
}

fn trim_ows(mut s: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = s {
        if !is_ows(*first) {
            break;
        }
        s = rest;
    }
    while let [rest @ .., last] = s {
        if !is_ows(*last) {
            break;
        }
        s = rest;
    }
    s
}
