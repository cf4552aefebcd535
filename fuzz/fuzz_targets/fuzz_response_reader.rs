#![no_main]

use arbitrary::Arbitrary;
use http11_tokenizer::{Code, ResponseReader, Tokenizer, token};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Method {
    Get,
    Head,
    Connect,
}

#[derive(Debug, Arbitrary)]
struct Input {
    methods: Vec<Method>,
    piece: u8,
    eof: bool,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut methods = input.methods.iter().map(|m| match m {
        Method::Get => "GET",
        Method::Head => "HEAD",
        Method::Connect => "CONNECT",
    });
    let piece = input.piece as usize % 64 + 1;

    let mut reader = ResponseReader::new();
    let mut buf = Vec::new();
    let mut fed = 0;
    loop {
        let consumed = reader.parsed_count();
        buf.drain(..consumed);
        let end = (fed + piece).min(input.data.len());
        buf.extend_from_slice(&input.data[fed..end]);
        fed = end;

        reader.set_buffer(&buf);
        loop {
            match reader.code() {
                Code::ErrorSetMethod => match methods.next() {
                    Some(method) => reader.set_method(method),
                    None => return,
                },
                Code::ErrorInsufficientData => break,
                Code::StatusCode => {
                    let status = reader.value::<token::StatusCode>(&buf);
                    assert!((100..=999).contains(&status));
                }
                Code::BodyChunk => {
                    assert!(!reader.value::<token::BodyChunk>(&buf).is_empty());
                }
                code if code.is_fatal() => {
                    let parsed = reader.parsed_count();
                    reader.next(&buf);
                    assert_eq!(reader.code(), code);
                    assert_eq!(reader.parsed_count(), parsed);
                    return;
                }
                _ => {}
            }
            assert!(reader.parsed_count() <= buf.len());
            reader.next(&buf);
        }

        if fed == input.data.len() {
            if !input.eof {
                return;
            }
            reader.puteof();
            while !reader.code().is_error() {
                reader.next(&buf);
            }
            return;
        }
    }
});
