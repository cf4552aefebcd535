//! Transfer-Encoding 判定のプロパティテスト (transfer_encoding.rs)

use http11_tokenizer::transfer_encoding::{ChunkedPosition, classify};
use pbt::ows;
use proptest::prelude::*;

/// chunked 以外のコーディング
fn coding() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("gzip".to_string()),
        Just("deflate".to_string()),
        Just("compress".to_string()),
        Just("identity".to_string()),
        Just("xchunked".to_string()),
        Just("chunkedx".to_string()),
        "[a-z]{1,10}".prop_filter("not chunked", |s| s != "chunked"),
    ]
}

/// 大文字小文字を混ぜた chunked
fn chunked() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), 7).prop_map(|upper| {
        "chunked"
            .chars()
            .zip(upper)
            .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

fn join(codings: &[String], sep: &str) -> String {
    codings.join(&format!("{},", sep))
}

proptest! {
    #[test]
    fn prop_without_chunked(codings in proptest::collection::vec(coding(), 1..5), sep in ows()) {
        prop_assert_eq!(classify(join(&codings, &sep).as_bytes()), ChunkedPosition::NotFound);
    }
}

proptest! {
    #[test]
    fn prop_chunked_at_end(
        mut codings in proptest::collection::vec(coding(), 0..5),
        last in chunked(),
        sep in ows(),
        tail in prop_oneof![Just(""), Just(","), Just(" , "), Just("\t")],
    ) {
        codings.push(last);
        let value = format!("{}{}", join(&codings, &sep), tail);
        prop_assert_eq!(classify(value.as_bytes()), ChunkedPosition::FoundAtEnd);
    }
}

proptest! {
    #[test]
    fn prop_chunked_not_at_end(
        before in proptest::collection::vec(coding(), 0..3),
        after in proptest::collection::vec(coding(), 1..3),
        name in chunked(),
    ) {
        let mut codings = before;
        codings.push(name);
        codings.extend(after);
        prop_assert_eq!(classify(join(&codings, "").as_bytes()), ChunkedPosition::Invalid);
    }
}

proptest! {
    #[test]
    fn prop_chunked_twice(
        first in chunked(),
        middle in proptest::collection::vec(coding(), 0..3),
        second in chunked(),
    ) {
        let mut codings = vec![first];
        codings.extend(middle);
        codings.push(second);
        prop_assert_eq!(classify(join(&codings, " ").as_bytes()), ChunkedPosition::Invalid);
    }
}
