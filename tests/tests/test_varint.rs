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

use protograph_core::error::Error;
use protograph_core::varint::{
    decode_varint, decode_varint32, encode_varint, unzigzag32, unzigzag64, varint_len, zigzag32,
    zigzag64,
};
use rand::Rng;

#[test]
fn encode_known_values() {
    let mut max = vec![0xFF; 9];
    max.push(0x01);
    let cases: Vec<(u64, Vec<u8>)> = vec![
        (0, vec![0x00]),
        (1, vec![0x01]),
        (127, vec![0x7F]),
        (128, vec![0x80, 0x01]),
        (150, vec![0x96, 0x01]),
        (300, vec![0xAC, 0x02]),
        (16_384, vec![0x80, 0x80, 0x01]),
        (u64::MAX, max),
    ];
    for (value, expected) in cases {
        let mut out = Vec::new();
        let used = encode_varint(value, &mut out);
        assert_eq!(out, expected, "encoding of {}", value);
        assert_eq!(used, expected.len());
        assert_eq!(varint_len(value), expected.len());
    }
}

#[test]
fn decode_stops_at_terminator() {
    assert_eq!(decode_varint(&[0xAC, 0x02, 0x7F]).unwrap(), (300, 2));
    assert_eq!(decode_varint(&[0x00, 0x01]).unwrap(), (0, 1));
}

#[test]
fn decode_rejects_bad_input() {
    assert!(matches!(decode_varint(&[]), Err(Error::Format(_))));
    assert!(matches!(decode_varint(&[0x80, 0x80]), Err(Error::Format(_))));
    let mut overflow = vec![0xFF; 9];
    overflow.push(0x02);
    assert!(matches!(decode_varint(&overflow), Err(Error::Format(_))));
    let too_long = vec![0x80; 11];
    assert!(matches!(decode_varint(&too_long), Err(Error::Format(_))));
}

#[test]
fn decode_varint32_sign_extension() {
    let mut bytes = Vec::new();
    encode_varint(-1i64 as u64, &mut bytes);
    assert_eq!(bytes.len(), 10);
    assert_eq!(decode_varint32(&bytes, true).unwrap(), (u32::MAX, 10));
    assert!(decode_varint32(&bytes, false).is_err());

    let mut bytes = Vec::new();
    encode_varint(i32::MIN as i64 as u64, &mut bytes);
    let (value, used) = decode_varint32(&bytes, true).unwrap();
    assert_eq!(value as i32, i32::MIN);
    assert_eq!(used, 10);

    // the fifth byte may only carry the top four bits
    assert!(decode_varint32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F], false).is_err());
    assert_eq!(
        decode_varint32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], false).unwrap(),
        (u32::MAX, 5)
    );
}

#[test]
fn zigzag_mapping() {
    let cases = [
        (0, 0u32),
        (-1, 1),
        (1, 2),
        (-2, 3),
        (i32::MAX, 0xFFFF_FFFE),
        (i32::MIN, 0xFFFF_FFFF),
    ];
    for (n, z) in cases {
        assert_eq!(zigzag32(n), z);
        assert_eq!(unzigzag32(z), n);
    }
    assert_eq!(zigzag64(i64::MIN), u64::MAX);
    assert_eq!(zigzag64(-3), 5);

    let mut rng = rand::thread_rng();
    for _ in 0..1000 {
        let n: i64 = rng.gen();
        assert_eq!(unzigzag64(zigzag64(n)), n);
        let mut out = Vec::new();
        let used = encode_varint(n as u64, &mut out);
        assert_eq!(used, varint_len(n as u64));
        assert_eq!(decode_varint(&out).unwrap(), (n as u64, used));
    }
}
