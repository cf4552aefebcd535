//! 数値パーサー (Content-Length / チャンクサイズ用)
//!
//! ## 使い方
//!
//! ```rust
//! use http11_tokenizer::number::{NumberError, parse_decimal, parse_hex};
//!
//! assert_eq!(parse_decimal::<u64>(b"0042"), Ok(42));
//! assert_eq!(parse_hex::<u64>(b"1A"), Ok(26));
//! assert_eq!(parse_decimal::<u8>(b"256"), Err(NumberError::Overflow));
//! assert_eq!(parse_decimal::<u64>(b"4x"), Err(NumberError::Invalid));
//! ```

use core::fmt;

/// 数値パースエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    /// 数字以外の文字を含む
    Invalid,
    /// 型の最大値を超えた
    Overflow,
}

impl fmt::Display for NumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberError::Invalid => write!(f, "invalid number"),
            NumberError::Overflow => write!(f, "number overflow"),
        }
    }
}

impl std::error::Error for NumberError {}

/// 符号なし整数型
pub trait Unsigned: Copy + sealed::Sealed {
    #[doc(hidden)]
    const ZERO: Self;
    #[doc(hidden)]
    fn checked_push(self, base: u8, digit: u8) -> Option<Self>;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Unsigned for $t {
                const ZERO: Self = 0;

                fn checked_push(self, base: u8, digit: u8) -> Option<Self> {
                    self.checked_mul(base as $t)?.checked_add(digit as $t)
                }
            }
        )*
    };
}

impl_unsigned!(u8, u16, u32, u64, u128, usize);

/// 10 進数文字列をパース
///
/// 先頭の 0 は読み飛ばす。0 を除いた残りが空なら 0 を返す。
/// 空文字列も `Ok(0)` になるが、これはヘッダー値が空にならないことを前提にした簡略化であり、
/// 汎用の 10 進数パーサーとしての仕様ではない。
pub fn parse_decimal<T: Unsigned>(input: &[u8]) -> Result<T, NumberError> {
    parse_with(input, 10, |b| match b {
        b'0'..=b'9' => Some(b - b'0'),
        _ => None,
    })
}

/// 16 進数文字列をパース (大文字小文字を区別しない)
///
/// 空文字列の扱いは [`parse_decimal`] と同じ
pub fn parse_hex<T: Unsigned>(input: &[u8]) -> Result<T, NumberError> {
    parse_with(input, 16, hex_digit)
}

/// 16 進数字の値
pub(crate) fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn parse_with<T: Unsigned>(
    input: &[u8],
    base: u8,
    digit: impl Fn(u8) -> Option<u8>,
) -> Result<T, NumberError> {
    let start = input
        .iter()
        .position(|&b| b != b'0')
        .unwrap_or(input.len());

    let mut value = T::ZERO;
    for &b in &input[start..] {
        let d = digit(b).ok_or(NumberError::Invalid)?;
        value = value.checked_push(base, d).ok_or(NumberError::Overflow)?;
    }
    Ok(value)
}
