//! Adapters between item streams and byte-chunk streams.
//!
//! Both directions are single-pass and hold at most one item (plus one
//! partially received frame) in memory at a time.

use std::pin::Pin;

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tracing::trace;

use crate::codec::{Frame, TransferCodec, TransferItem};
use crate::error::ProtocolError;

/// Encode a stream of items into wire chunks, ending with the end marker.
///
/// An error from `items` (or from encoding) is passed through and ends the
/// output without an end marker, so the receiver sees a truncated stream.
pub fn encode_stream<S, E>(items: S) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<TransferItem, E>>,
    E: From<ProtocolError>,
{
    stream::unfold(Some(Box::pin(items)), |state| async move {
        let mut items = state?;
        match items.next().await {
            Some(Ok(item)) => {
                let encoded = TransferCodec::encode_item(&item).map_err(E::from);
                let next = encoded.is_ok().then_some(items);
                Some((encoded, next))
            }
            Some(Err(e)) => Some((Err(e), None)),
            None => Some((Ok(TransferCodec::encode_end()), None)),
        }
    })
}

struct Decoder<S> {
    chunks: Pin<Box<S>>,
    buf: BytesMut,
    done: bool,
}

/// Decode wire chunks into items.
///
/// Chunk boundaries are arbitrary. The stream ends cleanly at the end
/// marker; anything after it is never read. Input that stops before the
/// marker yields [`ProtocolError::Truncated`].
pub fn decode_stream<S, E>(chunks: S) -> impl Stream<Item = Result<TransferItem, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: From<ProtocolError>,
{
    let decoder = Decoder {
        chunks: Box::pin(chunks),
        buf: BytesMut::new(),
        done: false,
    };
    stream::unfold(decoder, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match TransferCodec::decode(&state.buf) {
                Ok(Some((Frame::Item(item), used))) => {
                    state.buf.advance(used);
                    trace!(kind = %item.kind, hash = %item.hash.short_hex(), "decoded item");
                    return Some((Ok(item), state));
                }
                Ok(Some((Frame::End, _))) => return None,
                Ok(None) => {}
                Err(e) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => state.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    return Some((Err(ProtocolError::Truncated.into()), state));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolResult;
    use futures::TryStreamExt;
    use yan_store::{Object, StoredObject, Tree};
    use yan_types::Blob;

    fn items() -> Vec<TransferItem> {
        let objects: Vec<StoredObject> = vec![
            Blob::from("one").to_stored_object().unwrap(),
            Blob::from("two").to_stored_object().unwrap(),
            Tree::new().to_stored_object().unwrap(),
        ];
        objects.into_iter().map(TransferItem::from_object).collect()
    }

    async fn encode_all(items: Vec<TransferItem>) -> Vec<u8> {
        let chunks: Vec<Bytes> =
            encode_stream(stream::iter(items.into_iter().map(Ok::<_, ProtocolError>)))
                .try_collect()
                .await
                .unwrap();
        chunks.concat()
    }

    async fn decode_chunks(chunks: Vec<Vec<u8>>) -> ProtocolResult<Vec<TransferItem>> {
        decode_stream(stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))))
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn roundtrip_single_chunk() {
        let wire = encode_all(items()).await;
        assert_eq!(wire.last(), Some(&0));
        assert_eq!(decode_chunks(vec![wire]).await.unwrap(), items());
    }

    #[tokio::test]
    async fn roundtrip_byte_at_a_time() {
        let wire = encode_all(items()).await;
        let chunks = wire.into_iter().map(|b| vec![b]).collect();
        assert_eq!(decode_chunks(chunks).await.unwrap(), items());
    }

    #[tokio::test]
    async fn empty_stream_is_only_the_marker() {
        let wire = encode_all(Vec::new()).await;
        assert_eq!(wire, vec![0]);
        assert!(decode_chunks(vec![wire]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_marker_is_truncated() {
        let mut wire = encode_all(items()).await;
        wire.pop();
        assert!(matches!(
            decode_chunks(vec![wire]).await,
            Err(ProtocolError::Truncated)
        ));
    }

    #[tokio::test]
    async fn cut_mid_item_is_truncated() {
        let wire = encode_all(items()).await;
        let cut = wire[..wire.len() / 2].to_vec();
        assert!(matches!(
            decode_chunks(vec![cut]).await,
            Err(ProtocolError::Truncated)
        ));
    }

    #[tokio::test]
    async fn trailing_bytes_after_marker_are_ignored() {
        let mut wire = encode_all(items()).await;
        wire.extend_from_slice(&[9, 9, 9]);
        assert_eq!(decode_chunks(vec![wire]).await.unwrap(), items());
    }

    #[tokio::test]
    async fn unknown_type_stops_decoding() {
        let mut wire = encode_all(items()[..1].to_vec()).await;
        wire.pop();
        wire.push(42);
        let decoded: Vec<ProtocolResult<TransferItem>> =
            decode_stream(stream::iter(vec![Ok::<_, ProtocolError>(Bytes::from(wire))]))
                .collect()
                .await;
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].is_ok());
        assert!(matches!(decoded[1], Err(ProtocolError::UnknownItemType(42))));
    }

    #[tokio::test]
    async fn source_error_ends_encoding_without_marker() {
        let source = stream::iter(vec![
            Ok(items()[0].clone()),
            Err(ProtocolError::Truncated),
            Ok(items()[1].clone()),
        ]);
        let out: Vec<Result<Bytes, ProtocolError>> = encode_stream(source).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }

    proptest::proptest! {
        #[test]
        fn any_chunking_decodes_the_same(splits in proptest::collection::vec(1usize..40, 0..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let wire = rt.block_on(encode_all(items()));
            let mut chunks = Vec::new();
            let mut rest = &wire[..];
            for size in splits {
                if rest.is_empty() {
                    break;
                }
                let (head, tail) = rest.split_at(size.min(rest.len()));
                chunks.push(head.to_vec());
                rest = tail;
            }
            chunks.push(rest.to_vec());
            let decoded = rt.block_on(decode_chunks(chunks)).unwrap();
            proptest::prop_assert_eq!(decoded, items());
        }
    }
}
