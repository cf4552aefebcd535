//! トークン定義
//!
//! トークナイザーが生成するトークンの種別 ([`Code`]) と、
//! [`Tokenizer::value`](crate::Tokenizer::value) で値を取り出すための型マーカー。
//!
//! トークンはメモリを所有しない。値は直近に渡したバッファのスライスで、
//! 次にトークナイザーを進めるまでしか有効ではない。

use core::fmt;

/// トークンの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// レスポンスのトークナイザーに `set_method()` が必要
    ///
    /// 終端状態ではない。`set_method()` を呼んでから `next()` で再開する
    ErrorSetMethod,
    /// この接続ではこれ以上メッセージを読み取れない
    ErrorUseAnotherConnection,
    /// データ不足
    ///
    /// 終端状態ではない。データを追加して `set_buffer()` を呼ぶ
    ErrorInsufficientData,
    /// 不正なデータ
    ErrorInvalidData,
    /// HTTP/1.1 リクエストに Host ヘッダーがない
    ErrorNoHost,
    /// 不正な Content-Length (数値でない、または重複)
    ErrorInvalidContentLength,
    /// Content-Length のオーバーフロー
    ErrorContentLengthOverflow,
    /// 不正な Transfer-Encoding
    ErrorInvalidTransferEncoding,
    /// チャンクサイズのオーバーフロー
    ErrorChunkSizeOverflow,
    /// 意味を持たないバイト列 (区切り文字など)
    Skip,
    /// メソッド
    Method,
    /// リクエストターゲット
    RequestTarget,
    /// HTTP バージョン
    Version,
    /// ステータスコード
    StatusCode,
    /// ステータスフレーズ
    ReasonPhrase,
    /// ヘッダー名 (トレーラーを含む)
    FieldName,
    /// ヘッダー値 (トレーラーを含む)
    FieldValue,
    /// ボディの断片
    BodyChunk,
    /// ヘッダー終端
    EndOfHeaders,
    /// ボディ終端
    EndOfBody,
    /// メッセージ終端
    EndOfMessage,
}

impl Code {
    /// エラーコードか確認
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Code::ErrorSetMethod
                | Code::ErrorUseAnotherConnection
                | Code::ErrorInsufficientData
                | Code::ErrorInvalidData
                | Code::ErrorNoHost
                | Code::ErrorInvalidContentLength
                | Code::ErrorContentLengthOverflow
                | Code::ErrorInvalidTransferEncoding
                | Code::ErrorChunkSizeOverflow
        )
    }

    /// これ以上パースを続けられないエラーか確認
    ///
    /// `ErrorInsufficientData` と `ErrorSetMethod` は待ち状態なので含まない
    pub fn is_fatal(self) -> bool {
        self.is_error() && !matches!(self, Code::ErrorInsufficientData | Code::ErrorSetMethod)
    }

    /// 名前を取得
    pub fn as_str(self) -> &'static str {
        match self {
            Code::ErrorSetMethod => "error_set_method",
            Code::ErrorUseAnotherConnection => "error_use_another_connection",
            Code::ErrorInsufficientData => "error_insufficient_data",
            Code::ErrorInvalidData => "error_invalid_data",
            Code::ErrorNoHost => "error_no_host",
            Code::ErrorInvalidContentLength => "error_invalid_content_length",
            Code::ErrorContentLengthOverflow => "error_content_length_overflow",
            Code::ErrorInvalidTransferEncoding => "error_invalid_transfer_encoding",
            Code::ErrorChunkSizeOverflow => "error_chunk_size_overflow",
            Code::Skip => "skip",
            Code::Method => "method",
            Code::RequestTarget => "request_target",
            Code::Version => "version",
            Code::StatusCode => "status_code",
            Code::ReasonPhrase => "reason_phrase",
            Code::FieldName => "field_name",
            Code::FieldValue => "field_value",
            Code::BodyChunk => "body_chunk",
            Code::EndOfHeaders => "end_of_headers",
            Code::EndOfBody => "end_of_body",
            Code::EndOfMessage => "end_of_message",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// トークンの値 (内部表現)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Payload {
    None,
    /// 現在のバッファ内の範囲
    Bytes { start: usize, end: usize },
    Number(u16),
}

/// 値の取り出し元
///
/// [`Kind::project`] に渡される
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    bytes: &'a [u8],
    number: u16,
}

impl<'a> View<'a> {
    pub(crate) fn new(buf: &'a [u8], payload: Payload) -> Self {
        match payload {
            Payload::None => Self {
                bytes: &[],
                number: 0,
            },
            Payload::Bytes { start, end } => Self {
                bytes: &buf[start..end],
                number: 0,
            },
            Payload::Number(number) => Self { bytes: &[], number },
        }
    }

    /// バイト列の値 (値を持たないトークンでは空)
    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// 値を持つトークンの型マーカー
pub trait Kind: sealed::Sealed {
    /// 対応するトークン種別
    const CODE: Code;
    /// 値の型
    type Value<'a>;

    #[doc(hidden)]
    fn project<'a>(view: View<'a>) -> Self::Value<'a>;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! bytes_kind {
    ($($(#[$doc:meta])* $name:ident => $code:ident,)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl Kind for $name {
                const CODE: Code = Code::$code;
                type Value<'a> = &'a [u8];

                fn project<'a>(view: View<'a>) -> &'a [u8] {
                    view.bytes
                }
            }
        )*
    };
}

bytes_kind! {
    /// メソッド (`&[u8]`)
    Method => Method,
    /// リクエストターゲット (`&[u8]`)
    RequestTarget => RequestTarget,
    /// ステータスフレーズ (`&[u8]`)
    ReasonPhrase => ReasonPhrase,
    /// ヘッダー名 (`&[u8]`)
    FieldName => FieldName,
    /// ヘッダー値 (`&[u8]`、末尾の OWS は除去済み)
    FieldValue => FieldValue,
    /// ボディの断片 (`&[u8]`)
    BodyChunk => BodyChunk,
}

/// HTTP バージョン (`u8`、`HTTP/1.x` の x)
#[derive(Debug, Clone, Copy)]
pub struct Version;

impl sealed::Sealed for Version {}

impl Kind for Version {
    const CODE: Code = Code::Version;
    type Value<'a> = u8;

    fn project<'a>(view: View<'a>) -> u8 {
        view.number as u8
    }
}

/// ステータスコード (`u16`)
#[derive(Debug, Clone, Copy)]
pub struct StatusCode;

impl sealed::Sealed for StatusCode {}

impl Kind for StatusCode {
    const CODE: Code = Code::StatusCode;
    type Value<'a> = u16;

    fn project<'a>(view: View<'a>) -> u16 {
        view.number
    }
}
