//! レスポンストークナイザーのテスト
//!
//! ボディの有無がステータスコードとリクエストメソッドで決まることと、
//! 接続を再利用できない場合に `error_use_another_connection` になることを確認する。

use http11_tokenizer::{Code, ResponseReader, Tokenizer, token};

fn value_of(reader: &ResponseReader, buf: &[u8]) -> Vec<u8> {
    match reader.code() {
        Code::Version => vec![reader.value::<token::Version>(buf)],
        Code::StatusCode => reader
            .value::<token::StatusCode>(buf)
            .to_string()
            .into_bytes(),
        Code::ReasonPhrase => reader.value::<token::ReasonPhrase>(buf).to_vec(),
        Code::FieldName => reader.value::<token::FieldName>(buf).to_vec(),
        Code::FieldValue => reader.value::<token::FieldValue>(buf).to_vec(),
        Code::BodyChunk => reader.value::<token::BodyChunk>(buf).to_vec(),
        _ => Vec::new(),
    }
}

/// 待ち状態かエラーまでのトークン種別を集める (skip は除く)
fn codes(reader: &mut ResponseReader, buf: &[u8]) -> Vec<Code> {
    let mut codes = Vec::new();
    loop {
        let code = reader.code();
        if code != Code::Skip {
            codes.push(code);
        }
        if code.is_error() {
            return codes;
        }
        reader.next(buf);
    }
}

fn read_with_method(method: &str, buf: &[u8]) -> Vec<Code> {
    let mut reader = ResponseReader::new();
    reader.set_method(method);
    reader.set_buffer(buf);
    codes(&mut reader, buf)
}

#[test]
fn status_line() {
    let buf = b"HTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\nabc";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");
    reader.set_buffer(buf);
    let mut tokens = Vec::new();
    while reader.code() != Code::EndOfMessage {
        if reader.code() != Code::Skip {
            tokens.push((reader.code(), value_of(&reader, buf)));
        }
        reader.next(buf);
    }
    assert_eq!(
        tokens,
        vec![
            (Code::Version, vec![1]),
            (Code::StatusCode, b"404".to_vec()),
            (Code::ReasonPhrase, b"Not Found".to_vec()),
            (Code::FieldName, b"Content-Length".to_vec()),
            (Code::FieldValue, b"3".to_vec()),
            (Code::EndOfHeaders, vec![]),
            (Code::BodyChunk, b"abc".to_vec()),
            (Code::EndOfBody, vec![]),
        ]
    );
}

#[test]
fn empty_reason_phrase() {
    let buf = b"HTTP/1.0 200 \r\n\r\n";
    let mut reader = ResponseReader::new();
    reader.set_buffer(buf);
    while reader.code() != Code::ReasonPhrase {
        assert!(!reader.code().is_error());
        reader.next(buf);
    }
    assert_eq!(reader.value::<token::ReasonPhrase>(buf), b"");
}

#[test]
fn invalid_status_line() {
    for buf in [
        &b"HTTP/1.1 20 OK\r\n\r\n"[..],
        b"HTTP/1.1 2000 OK\r\n\r\n",
        b"HTTP/1.1 099 OK\r\n\r\n",
        b"HTTP/2.0 200 OK\r\n\r\n",
        b"HTTP/1.1 200 O\x00K\r\n\r\n",
    ] {
        let mut reader = ResponseReader::new();
        reader.set_method("GET");
        reader.set_buffer(buf);
        assert_eq!(
            codes(&mut reader, buf).last(),
            Some(&Code::ErrorInvalidData),
            "{:?}",
            buf
        );
    }
}

#[test]
fn method_is_required_before_end_of_headers() {
    let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
    let mut reader = ResponseReader::new();
    reader.set_buffer(buf);
    assert_eq!(
        codes(&mut reader, buf),
        vec![
            Code::Version,
            Code::StatusCode,
            Code::ReasonPhrase,
            Code::FieldName,
            Code::FieldValue,
            Code::ErrorSetMethod,
        ]
    );
    let parsed = reader.parsed_count();

    // 待ち状態なので何度呼んでも変わらない
    reader.next(buf);
    assert_eq!(reader.code(), Code::ErrorSetMethod);
    assert_eq!(reader.parsed_count(), parsed);

    reader.set_method("GET");
    reader.next(buf);
    assert_eq!(reader.code(), Code::EndOfHeaders);
    reader.next(buf);
    assert_eq!(reader.value::<token::BodyChunk>(buf), b"ok");
}

#[test]
fn no_body_for_informational_and_no_content() {
    for status in ["100 Continue", "204 No Content", "304 Not Modified"] {
        let buf = format!("HTTP/1.1 {}\r\nContent-Length: 10\r\n\r\n", status);
        let codes = read_with_method("GET", buf.as_bytes());
        assert_eq!(
            codes[codes.len() - 4..],
            [
                Code::EndOfHeaders,
                Code::EndOfBody,
                Code::EndOfMessage,
                Code::ErrorInsufficientData
            ],
            "{}",
            status
        );
    }
}

#[test]
fn status_decides_before_method() {
    // 1xx / 204 / 304 はメソッドを待たない
    let buf = b"HTTP/1.1 304 Not Modified\r\n\r\n";
    let mut reader = ResponseReader::new();
    reader.set_buffer(buf);
    assert_eq!(
        codes(&mut reader, buf),
        vec![
            Code::Version,
            Code::StatusCode,
            Code::ReasonPhrase,
            Code::EndOfHeaders,
            Code::EndOfBody,
            Code::EndOfMessage,
            Code::ErrorInsufficientData,
        ]
    );
}

#[test]
fn head_response_has_no_body() {
    let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nHTTP/1.1 200 OK\r\n";
    let mut reader = ResponseReader::new();
    reader.set_method("HEAD");
    reader.set_buffer(buf);
    let codes = codes(&mut reader, buf);
    assert_eq!(
        codes[5..],
        [
            Code::EndOfHeaders,
            Code::EndOfBody,
            Code::EndOfMessage,
            Code::Version,
            Code::StatusCode,
            Code::ReasonPhrase,
            Code::ErrorInsufficientData,
        ]
    );
}

#[test]
fn method_is_cleared_after_final_response() {
    let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");
    reader.set_buffer(buf);
    let codes = codes(&mut reader, buf);
    assert_eq!(codes.iter().filter(|&&c| c == Code::EndOfMessage).count(), 1);
    assert_eq!(codes.last(), Some(&Code::ErrorSetMethod));
}

#[test]
fn method_is_kept_across_informational_responses() {
    let buf = b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 103 Early Hints\r\nLink: </a>\r\n\r\n\
                HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
    let mut reader = ResponseReader::new();
    reader.set_method("POST");
    reader.set_buffer(buf);
    let mut statuses = Vec::new();
    let mut body = Vec::new();
    let mut messages = 0;
    while messages < 3 {
        match reader.code() {
            Code::StatusCode => statuses.push(reader.value::<token::StatusCode>(buf)),
            Code::BodyChunk => body.extend_from_slice(reader.value::<token::BodyChunk>(buf)),
            Code::EndOfMessage => messages += 1,
            code => assert!(!code.is_error(), "{}", code),
        }
        reader.next(buf);
    }
    assert_eq!(statuses, vec![100, 103, 200]);
    assert_eq!(body, b"ok");
}

#[test]
fn switching_protocols_ends_the_connection() {
    let buf = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n\x81\x05hello";
    let codes = read_with_method("GET", buf);
    assert_eq!(
        codes[codes.len() - 4..],
        [
            Code::EndOfHeaders,
            Code::EndOfBody,
            Code::EndOfMessage,
            Code::ErrorUseAnotherConnection
        ]
    );
}

#[test]
fn successful_connect_ends_the_connection() {
    let buf = b"HTTP/1.1 200 Connection Established\r\n\r\n\x16\x03\x01";
    let mut reader = ResponseReader::new();
    reader.set_method("CONNECT");
    reader.set_buffer(buf);
    let codes = codes(&mut reader, buf);
    assert_eq!(codes.last(), Some(&Code::ErrorUseAnotherConnection));
    assert!(!codes.contains(&Code::BodyChunk));

    // 終端状態なので以降も変わらない
    let parsed = reader.parsed_count();
    reader.next(buf);
    assert_eq!(reader.code(), Code::ErrorUseAnotherConnection);
    assert_eq!(reader.parsed_count(), parsed);
    assert_eq!(reader.expected_token(), Code::ErrorUseAnotherConnection);
    assert_eq!(&buf[parsed..], b"\x16\x03\x01");
}

#[test]
fn failed_connect_has_a_body() {
    let buf = b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 1\r\n\r\nx";
    let codes = read_with_method("CONNECT", buf);
    assert!(codes.contains(&Code::BodyChunk));
    assert!(!codes.contains(&Code::ErrorUseAnotherConnection));
    assert_eq!(codes.last(), Some(&Code::ErrorInsufficientData));
}

#[test]
fn body_until_close() {
    let input = b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\nfirst";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");

    let mut buf = input.to_vec();
    reader.set_buffer(&buf);
    let mut body = Vec::new();
    while reader.code() != Code::ErrorInsufficientData {
        if reader.code() == Code::BodyChunk {
            body.extend_from_slice(reader.value::<token::BodyChunk>(&buf));
        }
        reader.next(&buf);
    }
    assert_eq!(reader.expected_token(), Code::BodyChunk);

    let consumed = reader.parsed_count();
    buf.drain(..consumed);
    buf.extend_from_slice(b" second");
    reader.set_buffer(&buf);
    assert_eq!(reader.code(), Code::BodyChunk);
    body.extend_from_slice(reader.value::<token::BodyChunk>(&buf));
    reader.next(&buf);
    assert_eq!(reader.code(), Code::ErrorInsufficientData);
    assert_eq!(body, b"first second");

    reader.puteof();
    assert_eq!(reader.code(), Code::EndOfBody);
    reader.next(&buf);
    assert_eq!(reader.code(), Code::EndOfMessage);
    reader.next(&buf);
    assert_eq!(reader.code(), Code::ErrorUseAnotherConnection);
}

#[test]
fn eof_in_the_middle_of_a_length_delimited_body() {
    let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");
    reader.set_buffer(buf);
    while reader.code() != Code::ErrorInsufficientData {
        reader.next(buf);
    }
    reader.puteof();
    assert_eq!(reader.code(), Code::ErrorInsufficientData);
    assert_eq!(reader.expected_token(), Code::BodyChunk);
}

#[test]
fn unknown_transfer_coding_reads_until_close() {
    let buf = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\nContent-Length: 2\r\n\r\nabcdef";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");
    reader.set_buffer(buf);
    let mut body = Vec::new();
    while reader.code() != Code::ErrorInsufficientData {
        if reader.code() == Code::BodyChunk {
            body.extend_from_slice(reader.value::<token::BodyChunk>(buf));
        }
        reader.next(buf);
    }
    assert_eq!(body, b"abcdef");
    reader.puteof();
    assert_eq!(reader.code(), Code::EndOfBody);
}

#[test]
fn chunked_response_with_trailers() {
    let buf = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                3\r\nabc\r\n0\r\nServer-Timing: db;dur=1\r\n\r\n";
    let mut reader = ResponseReader::new();
    reader.set_method("GET");
    reader.set_buffer(buf);
    let mut trailer = None;
    let mut in_body = false;
    while reader.code() != Code::EndOfMessage {
        match reader.code() {
            Code::EndOfHeaders => in_body = true,
            Code::FieldValue if in_body => {
                trailer = Some(reader.value::<token::FieldValue>(buf).to_vec())
            }
            code => assert!(!code.is_error(), "{}", code),
        }
        reader.next(buf);
    }
    assert_eq!(trailer, Some(b"db;dur=1".to_vec()));
}

#[test]
fn response_framing_errors() {
    let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999999999999999\r\n\r\n";
    assert_eq!(
        read_with_method("GET", buf).last(),
        Some(&Code::ErrorContentLengthOverflow)
    );
    let buf = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked, gzip, chunked\r\n\r\n";
    assert_eq!(
        read_with_method("GET", buf).last(),
        Some(&Code::ErrorInvalidTransferEncoding)
    );
    let buf = b"HTTP/1.1 200 OK\r\nX: a\r\n  folded\r\n\r\n";
    assert_eq!(
        read_with_method("GET", buf).last(),
        Some(&Code::ErrorInvalidData)
    );
}
