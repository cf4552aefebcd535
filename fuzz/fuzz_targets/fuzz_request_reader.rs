#![no_main]

use http11_tokenizer::{Code, RequestReader, Tokenizer};
use libfuzzer_sys::fuzz_target;

/// 最後のコードと消費バイト数
fn drive(data: &[u8], piece: usize) -> (Code, usize) {
    let mut reader = RequestReader::new();
    let mut buf = Vec::new();
    let mut fed = 0;
    let mut total = 0;
    loop {
        let consumed = reader.parsed_count();
        total += consumed;
        buf.drain(..consumed);
        let end = (fed + piece).min(data.len());
        buf.extend_from_slice(&data[fed..end]);
        fed = end;

        reader.set_buffer(&buf);
        while !reader.code().is_error() {
            assert!(reader.parsed_count() <= buf.len());
            reader.next(&buf);
        }

        let code = reader.code();
        if code.is_fatal() {
            // エラー状態から抜けない
            let parsed = reader.parsed_count();
            reader.next(&buf);
            assert_eq!(reader.code(), code);
            assert_eq!(reader.parsed_count(), parsed);
            return (code, total + parsed);
        }
        if fed == data.len() {
            return (code, total + reader.parsed_count());
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // 先頭 1 バイトを分割サイズに使う
    let piece = data[0] as usize % 32 + 1;
    let data = &data[1..];

    let whole = drive(data, data.len().max(1));
    let split = drive(data, piece);
    assert_eq!(whole, split);
});
