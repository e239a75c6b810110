use crate::domain::CartItem;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use shared::{Error, Result};
use std::collections::HashSet;

/// Payload format version. Bump when the layout changes.
pub const PAYLOAD_VERSION: u8 = 0x01;

const HEADER_LEN: usize = 1 + 4;
// product_id length prefix + quantity; an item is never smaller than this
const MIN_ITEM_LEN: usize = 4 + 4;

/// Encode the ordered item list of a cart.
///
/// Format:
/// - [version: u8][item_count: u32]
/// - per item: [product_id_len: u32][product_id bytes][quantity: u32]
///
/// All integers are big-endian.
pub fn encode(items: &[CartItem]) -> Bytes {
    let mut buf = BytesMut::with_capacity(
        HEADER_LEN
            + items
                .iter()
                .map(|item| MIN_ITEM_LEN + item.product_id.len())
                .sum::<usize>(),
    );

    buf.put_u8(PAYLOAD_VERSION);
    buf.put_u32(items.len() as u32);
    for item in items {
        debug_assert!(item.quantity > 0, "zero quantity items are never stored");
        let product_id = item.product_id.as_bytes();
        buf.put_u32(product_id.len() as u32);
        buf.put_slice(product_id);
        buf.put_u32(item.quantity as u32);
    }

    buf.freeze()
}

/// Decode a payload produced by [`encode`].
///
/// Any deviation from the format, including truncation and trailing bytes,
/// is reported as `Error::CorruptPayload`. Partial carts are never returned.
pub fn decode(raw: &[u8]) -> Result<Vec<CartItem>> {
    let mut buf = raw;

    if buf.remaining() < HEADER_LEN {
        return Err(corrupt(format!(
            "expected at least {} header bytes, got {}",
            HEADER_LEN,
            buf.remaining()
        )));
    }

    let version = buf.get_u8();
    if version != PAYLOAD_VERSION {
        return Err(corrupt(format!("unknown payload version 0x{:02X}", version)));
    }

    let count = buf.get_u32() as usize;
    // Cap the allocation by what the remaining bytes could possibly hold
    let mut items = Vec::with_capacity(count.min(buf.remaining() / MIN_ITEM_LEN));
    let mut seen = HashSet::with_capacity(items.capacity());

    for index in 0..count {
        if buf.remaining() < 4 {
            return Err(corrupt(format!("item {}: missing product_id length", index)));
        }
        let id_len = buf.get_u32() as usize;
        if buf.remaining() < id_len {
            return Err(corrupt(format!(
                "item {}: expected {} product_id bytes, got {}",
                index,
                id_len,
                buf.remaining()
            )));
        }
        let id_bytes = buf.copy_to_bytes(id_len);
        let product_id = String::from_utf8(id_bytes.to_vec())
            .map_err(|e| corrupt(format!("item {}: invalid product_id UTF-8: {}", index, e)))?;
        if product_id.is_empty() {
            return Err(corrupt(format!("item {}: empty product_id", index)));
        }

        if buf.remaining() < 4 {
            return Err(corrupt(format!("item {}: missing quantity", index)));
        }
        let quantity = buf.get_u32();
        if quantity == 0 || quantity > i32::MAX as u32 {
            return Err(corrupt(format!(
                "item {}: quantity {} out of range",
                index, quantity
            )));
        }

        if !seen.insert(product_id.clone()) {
            return Err(corrupt(format!(
                "item {}: duplicate product_id '{}'",
                index, product_id
            )));
        }

        items.push(CartItem::new(product_id, quantity as i32));
    }

    if buf.has_remaining() {
        return Err(corrupt(format!(
            "{} trailing bytes after {} items",
            buf.remaining(),
            count
        )));
    }

    Ok(items)
}

fn corrupt(msg: String) -> Error {
    Error::CorruptPayload(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CartItem> {
        vec![
            CartItem::new("OLJCESPC7Z", 2),
            CartItem::new("66VCHSJNUP", 1),
            CartItem::new("1YMWWN1N4O", 17),
        ]
    }

    #[test]
    fn test_encode_decode_preserves_order() {
        let items = sample();
        let decoded = decode(&encode(&items)).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn test_reencoding_valid_payload_is_identical() {
        let payload = encode(&sample());
        let reencoded = encode(&decode(&payload).unwrap());
        assert_eq!(payload, reencoded);
    }

    #[test]
    fn test_empty_cart_payload() {
        let payload = encode(&[]);
        assert_eq!(payload.as_ref(), &[PAYLOAD_VERSION, 0, 0, 0, 0]);
        assert!(decode(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let payload = encode(&sample());
        for len in 0..payload.len() {
            let result = decode(&payload[..len]);
            assert!(
                matches!(result, Err(Error::CorruptPayload(_))),
                "truncation at {} bytes was accepted",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut payload = encode(&sample()).to_vec();
        payload.push(0);
        assert!(matches!(decode(&payload), Err(Error::CorruptPayload(_))));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut payload = encode(&sample()).to_vec();
        payload[0] = 0x7F;
        let err = decode(&payload).unwrap_err();
        assert!(matches!(err, Error::CorruptPayload(ref msg) if msg.contains("0x7F")));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(PAYLOAD_VERSION);
        buf.put_u32(1);
        buf.put_u32(4);
        buf.put_slice(b"SKU1");
        buf.put_u32(0);
        assert!(matches!(decode(&buf), Err(Error::CorruptPayload(_))));
    }

    #[test]
    fn test_duplicate_product_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(PAYLOAD_VERSION);
        buf.put_u32(2);
        for _ in 0..2 {
            buf.put_u32(4);
            buf.put_slice(b"SKU1");
            buf.put_u32(1);
        }
        assert!(matches!(decode(&buf), Err(Error::CorruptPayload(_))));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(PAYLOAD_VERSION);
        buf.put_u32(1);
        buf.put_u32(2);
        buf.put_slice(&[0xC3, 0x28]);
        buf.put_u32(1);
        assert!(matches!(decode(&buf), Err(Error::CorruptPayload(_))));
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let mut buf = BytesMut::new();
        buf.put_u8(PAYLOAD_VERSION);
        buf.put_u32(u32::MAX);
        assert!(matches!(decode(&buf), Err(Error::CorruptPayload(_))));
    }
}
