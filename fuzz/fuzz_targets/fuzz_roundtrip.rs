#![no_main]

use arbitrary::Arbitrary;
use http11_tokenizer::{Code, Request, RequestReader, Tokenizer, token};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut request = Request::new(&input.method, &input.uri).header("Host", "fuzz");
    for (name, value) in &input.headers {
        request = request.header(name, value);
    }
    let request = request.body(input.body);

    // エンコーダーが受け付けたメッセージはトークナイザーも受け付ける
    let Ok(wire) = request.encode() else {
        return;
    };

    let mut reader = RequestReader::new();
    reader.set_buffer(&wire);
    let mut body = Vec::new();
    loop {
        match reader.code() {
            Code::Method => assert_eq!(reader.value::<token::Method>(&wire), input.method.as_bytes()),
            Code::BodyChunk => body.extend_from_slice(reader.value::<token::BodyChunk>(&wire)),
            Code::EndOfMessage => break,
            code => assert!(!code.is_error(), "{}: {:?}", code, request),
        }
        reader.next(&wire);
    }
    assert_eq!(reader.parsed_count(), wire.len());
    assert_eq!(body, request.body);
});
