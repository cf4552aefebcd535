//! PBT テスト共通ユーティリティ
//!
//! トークナイザーに渡すワイヤー形式のメッセージと、
//! 期待されるトークンの値を組にして生成する。

use proptest::prelude::*;

// ========================================
// 文字種
// ========================================

/// token (tchar 1 文字以上)
pub fn token() -> impl Strategy<Value = String> {
    "[!#$%&'*+.^_`|~0-9A-Za-z-]{1,16}".prop_map(|s| s)
}

/// ヘッダー名 (フレーミングに関わる名前とは重ならない)
pub fn field_name() -> impl Strategy<Value = String> {
    "X-[A-Za-z0-9-]{1,12}".prop_map(|s| s)
}

/// ヘッダー値 (前後に OWS を含まない)
pub fn field_value() -> impl Strategy<Value = String> {
    "([!-~]([ \t!-~]{0,24}[!-~])?)?".prop_map(|s| s)
}

/// OWS (0-2 文字)
pub fn ows() -> impl Strategy<Value = String> {
    "[ \t]{0,2}".prop_map(|s| s)
}

pub fn request_target() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/".to_string()),
        Just("*".to_string()),
        "/[A-Za-z0-9/_.~?=&%+-]{1,32}".prop_map(|s| s),
        "http://example\\.com/[a-z]{0,8}".prop_map(|s| s),
    ]
}

pub fn body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..256)
}

// ========================================
// メッセージ生成
// ========================================

/// ボディの区切り方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    None,
    ContentLength,
    Chunked,
}

pub fn framing() -> impl Strategy<Value = Framing> {
    prop_oneof![
        Just(Framing::None),
        Just(Framing::ContentLength),
        Just(Framing::Chunked),
    ]
}

/// ヘッダー 1 行 (名前、値、値の前後の OWS)
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub leading: String,
    pub trailing: String,
}

pub fn field() -> impl Strategy<Value = Field> {
    (field_name(), field_value(), ows(), ows()).prop_map(|(name, value, leading, trailing)| {
        Field {
            name,
            value,
            leading,
            trailing,
        }
    })
}

pub fn fields() -> impl Strategy<Value = Vec<Field>> {
    proptest::collection::vec(field(), 0..6)
}

/// 生成したメッセージと、トークナイザーが返すはずの値
#[derive(Debug, Clone)]
pub struct MessageCase {
    /// スタートラインの各要素 (メソッド、ターゲット / ステータスコード、フレーズ)
    pub start_line: Vec<String>,
    /// ヘッダー (フレーミング用のヘッダーを含む、OWS 除去済み)
    pub fields: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub trailers: Vec<(String, String)>,
    pub wire: Vec<u8>,
}

/// ボディ部分の組み立て方
#[derive(Debug, Clone)]
pub struct BodyPlan {
    pub framing: Framing,
    pub body: Vec<u8>,
    /// ボディを分割する大きさの繰り返しパターン
    pub chunk_sizes: Vec<usize>,
    pub with_extension: bool,
    pub trailers: Vec<Field>,
}

pub fn body_plan(framing: impl Strategy<Value = Framing>) -> impl Strategy<Value = BodyPlan> {
    (
        framing,
        body(),
        proptest::collection::vec(1usize..48, 1..6),
        any::<bool>(),
        fields(),
    )
        .prop_map(|(framing, body, chunk_sizes, with_extension, trailers)| BodyPlan {
            framing,
            body,
            chunk_sizes,
            with_extension,
            trailers,
        })
}

/// ヘッダーセクション以降を組み立てる
fn finish_message(
    mut wire: Vec<u8>,
    start_line: Vec<String>,
    head: Vec<Field>,
    plan: BodyPlan,
) -> MessageCase {
    let BodyPlan {
        framing,
        body,
        chunk_sizes,
        with_extension,
        trailers,
    } = plan;
    let mut fields: Vec<(String, String)> = Vec::new();
    for f in &head {
        wire.extend_from_slice(
            format!("{}:{}{}{}\r\n", f.name, f.leading, f.value, f.trailing).as_bytes(),
        );
        fields.push((f.name.clone(), f.value.clone()));
    }

    let (body, trailers) = match framing {
        Framing::None => (Vec::new(), Vec::new()),
        Framing::ContentLength => {
            let value = body.len().to_string();
            wire.extend_from_slice(format!("Content-Length: {}\r\n", value).as_bytes());
            fields.push(("Content-Length".to_string(), value));
            (body, Vec::new())
        }
        Framing::Chunked => {
            wire.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
            fields.push(("Transfer-Encoding".to_string(), "chunked".to_string()));
            (body, trailers)
        }
    };
    wire.extend_from_slice(b"\r\n");

    match framing {
        Framing::None => {}
        Framing::ContentLength => wire.extend_from_slice(&body),
        Framing::Chunked => {
            let mut rest = &body[..];
            for &size in chunk_sizes.iter().cycle() {
                if rest.is_empty() {
                    break;
                }
                let (chunk, tail) = rest.split_at(size.min(rest.len()));
                wire.extend_from_slice(format!("{:X}", chunk.len()).as_bytes());
                if with_extension {
                    wire.extend_from_slice(b";name=\"v\"");
                }
                wire.extend_from_slice(b"\r\n");
                wire.extend_from_slice(chunk);
                wire.extend_from_slice(b"\r\n");
                rest = tail;
            }
            wire.extend_from_slice(b"0\r\n");
            for f in &trailers {
                wire.extend_from_slice(
                    format!("{}:{}{}{}\r\n", f.name, f.leading, f.value, f.trailing).as_bytes(),
                );
            }
            wire.extend_from_slice(b"\r\n");
        }
    }

    MessageCase {
        start_line,
        fields,
        body,
        trailers: trailers
            .into_iter()
            .map(|f| (f.name, f.value))
            .collect(),
        wire,
    }
}

/// 妥当なリクエスト
///
/// HTTP/1.1 の場合は先頭に Host を含む
pub fn request_case() -> impl Strategy<Value = MessageCase> {
    (
        token(),
        request_target(),
        0u8..=1,
        fields(),
        body_plan(framing()),
    )
        .prop_map(|(method, target, minor, mut head, plan)| {
            let wire = format!("{} {} HTTP/1.{}\r\n", method, target, minor).into_bytes();
            if minor == 1 {
                head.insert(
                    0,
                    Field {
                        name: "Host".to_string(),
                        value: "example.com".to_string(),
                        leading: " ".to_string(),
                        trailing: String::new(),
                    },
                );
            }
            finish_message(wire, vec![method, target], head, plan)
        })
}

/// ボディを持つステータスコード
pub fn status_code_with_body() -> impl Strategy<Value = u16> {
    (200u16..=599).prop_filter("no body", |s| *s != 204 && *s != 304)
}

/// 妥当なレスポンス (GET への応答、Content-Length か chunked で区切る)
pub fn response_case() -> impl Strategy<Value = MessageCase> {
    (
        status_code_with_body(),
        "[A-Za-z ]{0,24}".prop_map(|s| s),
        fields(),
        body_plan(prop_oneof![
            Just(Framing::ContentLength),
            Just(Framing::Chunked)
        ]),
    )
        .prop_map(|(status, reason, head, plan)| {
            let wire = format!("HTTP/1.1 {} {}\r\n", status, reason).into_bytes();
            finish_message(wire, vec![status.to_string(), reason], head, plan)
        })
}
