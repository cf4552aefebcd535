//! エンコーダーのプロパティテスト (encoder.rs)
//!
//! エンコードしたメッセージをトークナイザーで読み、同じ値が得られることを確認する。

use http11_tokenizer::{
    BodyFraming, Code, Request, RequestReader, Response, ResponseReader, Tokenizer,
    encode_chunk, encode_last_chunk, encode_response_head, token,
};
use pbt::{body, field_name, field_value, request_target};
use proptest::prelude::*;

type Fields = Vec<(String, String)>;

fn field_list() -> impl Strategy<Value = Fields> {
    proptest::collection::vec((field_name(), field_value()), 0..6)
}

/// メッセージ 1 つ分を読んでヘッダー、ボディ、トレーラーを返す
fn read_message<T: Tokenizer>(
    reader: &mut T,
    buf: &[u8],
) -> Result<(Fields, Vec<u8>, Fields), Code> {
    let mut headers = Vec::new();
    let mut body = Vec::new();
    let mut trailers = Vec::new();
    let mut in_body = false;
    let mut name = String::new();
    reader.set_buffer(buf);
    loop {
        match reader.code() {
            Code::FieldName => {
                name = String::from_utf8_lossy(reader.value::<token::FieldName>(buf)).into_owned()
            }
            Code::FieldValue => {
                let value =
                    String::from_utf8_lossy(reader.value::<token::FieldValue>(buf)).into_owned();
                let fields = if in_body { &mut trailers } else { &mut headers };
                fields.push((std::mem::take(&mut name), value));
            }
            Code::EndOfHeaders => in_body = true,
            Code::BodyChunk => body.extend_from_slice(reader.value::<token::BodyChunk>(buf)),
            Code::EndOfMessage => return Ok((headers, body, trailers)),
            code if code.is_error() => return Err(code),
            _ => {}
        }
        reader.next(buf);
    }
}

proptest! {
    #[test]
    fn prop_request_content_length(
        method in pbt::token(),
        uri in request_target(),
        headers in field_list(),
        data in body(),
    ) {
        let mut request = Request::new(&method, &uri).header("Host", "example.com");
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        let request = request.body(data.clone());
        let wire = request.encode().unwrap();

        let mut reader = RequestReader::new();
        let (read_headers, read_body, trailers) = read_message(&mut reader, &wire).unwrap();
        prop_assert_eq!(reader.parsed_count(), wire.len());
        prop_assert_eq!(&read_headers[..headers.len() + 1], &request.headers[..]);
        if data.is_empty() {
            prop_assert_eq!(read_headers.len(), headers.len() + 1);
        } else {
            prop_assert_eq!(
                &read_headers[headers.len() + 1],
                &("Content-Length".to_string(), data.len().to_string())
            );
        }
        prop_assert_eq!(read_body, data);
        prop_assert!(trailers.is_empty());
    }
}

proptest! {
    #[test]
    fn prop_chunked_response(
        status in 200u16..=599,
        headers in field_list(),
        chunks in proptest::collection::vec(body(), 0..5),
        trailers in field_list(),
    ) {
        prop_assume!(status != 204 && status != 304);
        let mut response = Response::new(status, "Status");
        response.headers = headers.clone();

        let mut wire = encode_response_head(&response, BodyFraming::Chunked).unwrap();
        for chunk in &chunks {
            wire.extend_from_slice(&encode_chunk(chunk));
        }
        wire.extend_from_slice(&encode_last_chunk(&trailers).unwrap());

        let mut reader = ResponseReader::new();
        reader.set_method("GET");
        let (read_headers, read_body, read_trailers) = read_message(&mut reader, &wire).unwrap();
        prop_assert_eq!(&read_headers[..headers.len()], &headers[..]);
        prop_assert_eq!(
            &read_headers[headers.len()],
            &("Transfer-Encoding".to_string(), "chunked".to_string())
        );
        prop_assert_eq!(read_body, chunks.concat());
        prop_assert_eq!(read_trailers, trailers);
    }
}

proptest! {
    #[test]
    fn prop_head_response_is_not_framed(status in 200u16..=599, length in any::<u32>()) {
        let response = Response::new(status, "OK").header("Content-Length", &length.to_string());
        let wire = encode_response_head(&response, BodyFraming::None).unwrap();

        let mut reader = ResponseReader::new();
        reader.set_method("HEAD");
        let (_, read_body, _) = read_message(&mut reader, &wire).unwrap();
        prop_assert!(read_body.is_empty());
        prop_assert_eq!(reader.parsed_count(), wire.len());
    }
}
