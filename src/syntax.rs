//! RFC 7230 の文字クラス
//!
//! トークナイザーとエンコーダーの両方で使う。

/// トークン文字か確認 (RFC 7230 Section 3.2.6 tchar)
pub(crate) fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// OWS (SP / HTAB) か確認
pub(crate) fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// ヘッダー値に許可される文字か確認
///
/// field-content = VCHAR / obs-text / SP / HTAB
pub(crate) fn is_field_vchar(b: u8) -> bool {
    matches!(b, b'\t' | 0x20..=0x7E | 0x80..=0xFF)
}

/// RFC 3986 で除外されている文字および request-target で許可されない文字
///
/// request-target にはフラグメントが含まれないため "#" も拒否する
const RFC3986_EXCLUDED: &[u8] = b"\"#<>\\^`{|}";

/// request-target に許可される文字か確認
///
/// VCHAR のうち RFC 3986 除外文字以外と obs-text
pub(crate) fn is_request_target_char(b: u8) -> bool {
    match b {
        0x21..=0x7E => !RFC3986_EXCLUDED.contains(&b),
        0x80..=0xFF => true,
        _ => false,
    }
}

/// バイト列がトークンか確認
pub(crate) fn is_token(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(|&b| is_tchar(b))
}

/// バイト列が有効なヘッダー値か確認 (前後の OWS は呼び出し側で除去済み)
pub(crate) fn is_field_value(s: &[u8]) -> bool {
    s.iter().all(|&b| is_field_vchar(b))
}

/// バイト列が有効な request-target か確認
pub(crate) fn is_request_target(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(|&b| is_request_target_char(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tchar() {
        assert!(is_token(b"Content-Length"));
        assert!(is_token(b"X_custom.header~1"));
        assert!(!is_token(b""));
        assert!(!is_token(b"Head er"));
        assert!(!is_token(b"Header:"));
        assert!(!is_token(b"(comment)"));
    }

    #[test]
    fn field_value() {
        assert!(is_field_value(b"text/html; charset=utf-8"));
        assert!(is_field_value(b"a\tb"));
        assert!(is_field_value(&[0x80, 0xFF]));
        assert!(!is_field_value(b"a\r\nb"));
        assert!(!is_field_value(&[0x00]));
        assert!(!is_field_value(&[0x7F]));
    }

    #[test]
    fn request_target() {
        assert!(is_request_target(b"/"));
        assert!(is_request_target(b"/path?query=1&x=%20"));
        assert!(is_request_target(b"http://example.com:8080/a"));
        assert!(is_request_target(b"example.com:443"));
        assert!(is_request_target(b"*"));
        assert!(!is_request_target(b""));
        assert!(!is_request_target(b"/a b"));
        assert!(!is_request_target(b"/a#frag"));
        assert!(!is_request_target(b"/<script>"));
    }
}
