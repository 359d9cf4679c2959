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

//! Base-128 varints, zigzag mapping and fixed-width little-endian primitives.
//!
//! Everything here is stateless. The cursors in [`crate::buffer`] layer bounds
//! checking and wire-type dispatch on top of these functions.

use crate::error::Error;
use crate::types::{MAX_VARINT32_LEN, MAX_VARINT64_LEN};
use byteorder::{ByteOrder, LittleEndian};

/// Appends the varint encoding of `value` to `out`, returning the number of bytes written.
#[inline(always)]
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out.len() - start
}

/// Encodes `value` into a stack buffer, returning the buffer and the used length.
#[inline(always)]
pub fn encode_varint_array(mut value: u64) -> ([u8; MAX_VARINT64_LEN], usize) {
    let mut buf = [0u8; MAX_VARINT64_LEN];
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    (buf, i + 1)
}

/// Number of bytes [`encode_varint`] emits for `value`.
#[inline(always)]
pub fn varint_len(value: u64) -> usize {
    // 1 byte per started group of 7 bits, at least one byte
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decodes a 64-bit varint from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed. Fails when the input ends
/// before a terminating byte, when more than ten bytes carry the continuation bit,
/// or when the tenth byte sets bits above bit 63.
#[inline(always)]
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize), Error> {
    if let Some(&b0) = bytes.first() {
        if b0 < 0x80 {
            return Ok((b0 as u64, 1));
        }
    }
    decode_varint_slow(bytes)
}

#[cold]
fn decode_varint_slow(bytes: &[u8]) -> Result<(u64, usize), Error> {
    let mut value = 0u64;
    for (i, &b) in bytes.iter().take(MAX_VARINT64_LEN).enumerate() {
        if i == MAX_VARINT64_LEN - 1 && b > 0x01 {
            return Err(Error::format("varint overflows 64 bits"));
        }
        value |= ((b & 0x7F) as u64) << (7 * i);
        if b < 0x80 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() < MAX_VARINT64_LEN {
        Err(Error::format("truncated varint"))
    } else {
        Err(Error::format("varint is longer than 10 bytes"))
    }
}

/// Decodes a 32-bit varint from the start of `bytes`.
///
/// At most five bytes are accepted, and the fifth may only carry the top four
/// bits. When `allow_sign_extension` is set, the ten-byte form that other
/// implementations emit for negative `int32` values is accepted as well: the
/// five extra bytes must be the sign-extension pattern `ff ff ff ff 01`.
pub fn decode_varint32(bytes: &[u8], allow_sign_extension: bool) -> Result<(u32, usize), Error> {
    if let Some(&b0) = bytes.first() {
        if b0 < 0x80 {
            return Ok((b0 as u32, 1));
        }
    }
    let mut value = 0u32;
    for (i, &b) in bytes.iter().take(MAX_VARINT32_LEN).enumerate() {
        if i == MAX_VARINT32_LEN - 1 {
            if b & 0x80 != 0 {
                if !allow_sign_extension {
                    return Err(Error::format("varint is longer than 5 bytes for a 32-bit value"));
                }
                value |= ((b & 0x0F) as u32) << 28;
                let tail = bytes
                    .get(MAX_VARINT32_LEN..MAX_VARINT64_LEN)
                    .ok_or_else(|| Error::format("truncated varint"))?;
                if tail != [0xFF, 0xFF, 0xFF, 0xFF, 0x01] {
                    return Err(Error::format("varint overflows 32 bits"));
                }
                return Ok((value, MAX_VARINT64_LEN));
            }
            if b > 0x0F {
                return Err(Error::format("varint overflows 32 bits"));
            }
        }
        value |= ((b & 0x7F) as u32) << (7 * i);
        if b < 0x80 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::format("truncated varint"))
}

/// Maps a signed 32-bit value onto an unsigned one so small magnitudes stay small.
#[inline(always)]
pub fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline(always)]
pub fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Maps a signed 64-bit value onto an unsigned one so small magnitudes stay small.
#[inline(always)]
pub fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline(always)]
pub fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[inline(always)]
pub fn write_fixed32(value: u32, out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

#[inline(always)]
pub fn write_fixed64(value: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Reads a little-endian `fixed32`. `bytes` must hold at least four bytes.
#[inline(always)]
pub fn read_fixed32(bytes: &[u8]) -> Result<u32, Error> {
    if bytes.len() < 4 {
        return Err(Error::format("truncated fixed32"));
    }
    Ok(LittleEndian::read_u32(bytes))
}

/// Reads a little-endian `fixed64`. `bytes` must hold at least eight bytes.
#[inline(always)]
pub fn read_fixed64(bytes: &[u8]) -> Result<u64, Error> {
    if bytes.len() < 8 {
        return Err(Error::format("truncated fixed64"));
    }
    Ok(LittleEndian::read_u64(bytes))
}
