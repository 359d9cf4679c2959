// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use protograph::{Error, ProtoReader, ProtoWriter, WireType};

fn next_header(reader: &mut ProtoReader) -> Option<(u32, WireType)> {
    reader
        .read_field_header()
        .unwrap()
        .map(|header| (header.tag, header.wire_type))
}

#[test]
fn scalars_follow_the_announced_wire_type() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::Varint).unwrap();
    writer.write_i32(150).unwrap();
    writer.write_field_header(2, WireType::SignedVarint).unwrap();
    writer.write_i32(-1).unwrap();
    writer.write_field_header(3, WireType::Fixed32).unwrap();
    writer.write_i32(1).unwrap();
    writer.write_field_header(4, WireType::LengthDelimited).unwrap();
    writer.write_string("hi").unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(
        bytes,
        vec![0x08, 0x96, 0x01, 0x10, 0x01, 0x1D, 0x01, 0x00, 0x00, 0x00, 0x22, 0x02, b'h', b'i']
    );

    let mut reader = ProtoReader::new(&bytes);
    assert_eq!(next_header(&mut reader), Some((1, WireType::Varint)));
    assert_eq!(reader.read_i32().unwrap(), 150);
    // zigzag is invisible on the wire
    assert_eq!(next_header(&mut reader), Some((2, WireType::Varint)));
    reader.hint(WireType::SignedVarint);
    assert_eq!(reader.read_i32().unwrap(), -1);
    assert_eq!(next_header(&mut reader), Some((3, WireType::Fixed32)));
    assert_eq!(reader.read_i32().unwrap(), 1);
    assert_eq!(next_header(&mut reader), Some((4, WireType::LengthDelimited)));
    assert_eq!(reader.read_string().unwrap(), "hi");
    assert_eq!(next_header(&mut reader), None);
}

#[test]
fn negative_int32_is_sign_extended() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::Varint).unwrap();
    writer.write_i32(-1).unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len(), 11);
    assert_eq!(bytes[10], 0x01);

    let mut reader = ProtoReader::new(&bytes);
    next_header(&mut reader);
    assert_eq!(reader.read_i32().unwrap(), -1);
}

#[test]
fn long_sub_item_prefix_is_backpatched() {
    let text = "x".repeat(200);
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    let token = writer.start_sub_item().unwrap();
    writer.write_field_header(2, WireType::LengthDelimited).unwrap();
    writer.write_string(&text).unwrap();
    writer.end_sub_item(token).unwrap();
    let bytes = writer.finish().unwrap();
    // 203 content bytes need a two byte prefix
    assert_eq!(bytes.len(), 206);
    assert_eq!(&bytes[..4], &[0x0A, 0xCB, 0x01, 0x12]);

    let mut reader = ProtoReader::new(&bytes);
    assert_eq!(next_header(&mut reader), Some((1, WireType::LengthDelimited)));
    let token = reader.start_sub_item().unwrap();
    assert_eq!(reader.depth(), 1);
    assert_eq!(next_header(&mut reader), Some((2, WireType::LengthDelimited)));
    assert_eq!(reader.read_string().unwrap(), text);
    assert_eq!(next_header(&mut reader), None);
    reader.end_sub_item(token).unwrap();
    assert_eq!(next_header(&mut reader), None);
}

#[test]
fn sub_items_close_in_lifo_order() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    let outer = writer.start_sub_item().unwrap();
    writer.write_field_header(2, WireType::LengthDelimited).unwrap();
    let inner = writer.start_sub_item().unwrap();
    assert_eq!(inner.depth(), 2);

    let err = writer.end_sub_item(outer).unwrap_err();
    assert!(err.is_bounds());
    writer.end_sub_item(inner).unwrap();
    // the outer region can no longer be closed, so the output is incomplete
    assert!(writer.finish().unwrap_err().is_bounds());
}

#[test]
fn abandoned_writer_rejects_everything() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::Varint).unwrap();
    writer.write_i32(7).unwrap();
    writer.abandon();
    assert!(writer.is_abandoned());
    assert!(writer.is_empty());
    assert!(matches!(
        writer.write_field_header(2, WireType::Varint),
        Err(Error::InvalidState(_))
    ));
    assert!(writer.finish().is_err());
}

#[test]
fn header_without_value_is_rejected() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::Varint).unwrap();
    assert!(matches!(
        writer.write_field_header(2, WireType::Varint),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        ProtoWriter::new().write_field_header(0, WireType::Varint),
        Err(Error::NotAllowed(_))
    ));
}

#[test]
fn groups_are_terminated_by_end_markers() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::StartGroup).unwrap();
    let token = writer.start_sub_item().unwrap();
    writer.write_field_header(2, WireType::Varint).unwrap();
    writer.write_i32(5).unwrap();
    writer.end_sub_item(token).unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes, vec![0x0B, 0x10, 0x05, 0x0C]);

    let mut reader = ProtoReader::new(&bytes);
    assert_eq!(next_header(&mut reader), Some((1, WireType::StartGroup)));
    let token = reader.start_sub_item().unwrap();
    assert_eq!(next_header(&mut reader), Some((2, WireType::Varint)));
    assert_eq!(reader.read_i32().unwrap(), 5);
    assert_eq!(next_header(&mut reader), None);
    reader.end_sub_item(token).unwrap();
    assert_eq!(next_header(&mut reader), None);
}

#[test]
fn unterminated_group_is_a_format_error() {
    let mut reader = ProtoReader::new(&[0x0B, 0x10, 0x05]);
    next_header(&mut reader);
    let _token = reader.start_sub_item().unwrap();
    next_header(&mut reader);
    reader.read_i32().unwrap();
    assert!(matches!(reader.read_field_header(), Err(Error::Format(_))));
}

#[test]
fn packed_payload() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(4, WireType::LengthDelimited).unwrap();
    let token = writer.start_packed(WireType::Varint).unwrap();
    for value in [3, 270, 86942] {
        writer.write_i32(value).unwrap();
    }
    assert!(writer.write_field_header(5, WireType::Varint).is_err());
    writer.end_sub_item(token).unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes, vec![0x22, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05]);

    let mut reader = ProtoReader::new(&bytes);
    assert_eq!(next_header(&mut reader), Some((4, WireType::LengthDelimited)));
    let token = reader.start_sub_item().unwrap();
    let mut values = Vec::new();
    while reader.has_more() {
        reader.set_wire_type(WireType::Varint);
        values.push(reader.read_i32().unwrap());
    }
    reader.end_sub_item(token).unwrap();
    assert_eq!(values, vec![3, 270, 86942]);

    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    assert!(matches!(
        writer.start_packed(WireType::LengthDelimited),
        Err(Error::NotAllowed(_))
    ));
}

#[test]
fn reads_never_cross_a_sub_item_boundary() {
    // the inner varint needs three bytes but the sub-item only has two
    let bytes = [0x0A, 0x02, 0x08, 0x96, 0x01];
    let mut reader = ProtoReader::new(&bytes);
    next_header(&mut reader);
    let _token = reader.start_sub_item().unwrap();
    assert_eq!(reader.remaining(), 2);
    assert_eq!(next_header(&mut reader), Some((1, WireType::Varint)));
    let err = reader.read_i32().unwrap_err();
    assert!(err.is_bounds(), "{}", err);
}

#[test]
fn crossing_a_limit_at_the_end_of_input_is_a_bounds_error() {
    // the inner prefix claims five bytes, past both the outer limit and the input
    let bytes = [0x0A, 0x02, 0x12, 0x05];
    let mut reader = ProtoReader::new(&bytes);
    next_header(&mut reader);
    let _outer = reader.start_sub_item().unwrap();
    assert_eq!(next_header(&mut reader), Some((2, WireType::LengthDelimited)));
    let err = reader.start_sub_item().unwrap_err();
    assert!(matches!(err, Error::OutOfBounds(4, 5, 4)), "{}", err);

    let mut reader = ProtoReader::new(&bytes);
    next_header(&mut reader);
    let _outer = reader.start_sub_item().unwrap();
    next_header(&mut reader);
    assert!(reader.skip_field().unwrap_err().is_bounds());

    // a varint cut off where the sub-item and the input both end
    let bytes = [0x0A, 0x02, 0x08, 0x96];
    let mut reader = ProtoReader::new(&bytes);
    next_header(&mut reader);
    let _outer = reader.start_sub_item().unwrap();
    assert_eq!(next_header(&mut reader), Some((1, WireType::Varint)));
    let err = reader.read_i32().unwrap_err();
    assert!(err.is_bounds(), "{}", err);
}

#[test]
fn truncated_root_input_is_a_format_error() {
    let mut reader = ProtoReader::new(&[0x0A, 0x05, b'a']);
    next_header(&mut reader);
    assert!(matches!(reader.start_sub_item(), Err(Error::Format(_))));

    let mut reader = ProtoReader::new(&[0x0D, 0x01, 0x02]);
    next_header(&mut reader);
    assert!(matches!(reader.read_u32(), Err(Error::Format(_))));
}

#[test]
fn malformed_headers() {
    for bytes in [&[0x00][..], &[0x0E][..], &[0x0F][..], &[0x0C][..]] {
        let mut reader = ProtoReader::new(bytes);
        assert!(
            matches!(reader.read_field_header(), Err(Error::Format(_))),
            "{:?}",
            bytes
        );
    }
}

#[test]
fn reading_the_wrong_wire_type() {
    let mut reader = ProtoReader::new(&[0x08, 0x01]);
    next_header(&mut reader);
    assert!(matches!(reader.read_string(), Err(Error::SchemaMismatch(_))));
}

#[test]
fn skip_every_wire_type() {
    let mut writer = ProtoWriter::new();
    writer.write_field_header(1, WireType::Fixed64).unwrap();
    writer.write_u64(7).unwrap();
    writer.write_field_header(2, WireType::Fixed32).unwrap();
    writer.write_u32(9).unwrap();
    writer.write_field_header(3, WireType::LengthDelimited).unwrap();
    writer.write_bytes(&[1, 2, 3]).unwrap();
    writer.write_field_header(4, WireType::StartGroup).unwrap();
    let token = writer.start_sub_item().unwrap();
    writer.write_field_header(1, WireType::Varint).unwrap();
    writer.write_i32(1).unwrap();
    writer.end_sub_item(token).unwrap();
    writer.write_field_header(5, WireType::Varint).unwrap();
    writer.write_i32(42).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = ProtoReader::new(&bytes);
    let mut found = None;
    while let Some((tag, _)) = next_header(&mut reader) {
        if tag == 5 {
            found = Some(reader.read_i32().unwrap());
        } else {
            reader.skip_field().unwrap();
        }
    }
    assert_eq!(found, Some(42));
    assert_eq!(reader.position(), bytes.len());
}

#[test]
fn nesting_depth_is_limited() {
    let mut writer = ProtoWriter::with_max_depth(2);
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    let _outer = writer.start_sub_item().unwrap();
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    let _inner = writer.start_sub_item().unwrap();
    writer.write_field_header(1, WireType::LengthDelimited).unwrap();
    assert!(matches!(
        writer.start_sub_item(),
        Err(Error::DepthExceed(_))
    ));

    let bytes = [0x0A, 0x04, 0x0A, 0x02, 0x0A, 0x00];
    let mut reader = ProtoReader::with_max_depth(&bytes, 2);
    next_header(&mut reader);
    let _a = reader.start_sub_item().unwrap();
    next_header(&mut reader);
    let _b = reader.start_sub_item().unwrap();
    next_header(&mut reader);
    assert!(matches!(reader.start_sub_item(), Err(Error::DepthExceed(_))));
}

#[test]
fn peeking_does_not_consume() {
    let bytes = [0x08, 0x96, 0x01, 0x15, 0x01, 0x00, 0x00, 0x00];
    let mut reader = ProtoReader::new(&bytes);
    let peeked = reader.peek_field_header().unwrap().unwrap();
    assert_eq!((peeked.tag, peeked.wire_type), (1, WireType::Varint));
    assert_eq!(reader.position(), 0);
    assert_eq!(next_header(&mut reader), Some((1, WireType::Varint)));
    assert_eq!(reader.read_i32().unwrap(), 150);

    let peeked = reader.peek_field_header().unwrap().unwrap();
    assert_eq!(peeked.tag, 2);
    assert_eq!(peeked.wire_type, WireType::Fixed32);
    reader.read_field_header().unwrap();
    reader.skip_field().unwrap();
    assert!(reader.peek_field_header().unwrap().is_none());
    assert!(!reader.has_more());
}
