// src/transport/codec.rs

use super::Frame;
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Bytes preceding every payload: message type (i32 BE) + payload length (u32 BE).
const HEADER_LEN: usize = 8;

/// Largest payload accepted in either direction unless configured otherwise.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
  #[error("Frame of {size} bytes exceeds the {max} byte limit")]
  FrameTooLarge { size: usize, max: usize },
}

/// Length-prefixed framing used by the TCP transport.
///
/// Wire layout: `[type: i32 BE][length: u32 BE][payload]`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
  max_frame_size: usize,
  // Header of the frame whose body is still arriving.
  pending: Option<(i32, usize)>,
}

impl Default for FrameCodec {
  fn default() -> Self {
    Self::new()
  }
}

impl FrameCodec {
  pub fn new() -> Self {
    Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
  }

  pub fn with_max_frame_size(max_frame_size: usize) -> Self {
    Self {
      max_frame_size: max_frame_size.min(u32::MAX as usize),
      pending: None,
    }
  }

  pub fn max_frame_size(&self) -> usize {
    self.max_frame_size
  }
}

impl Encoder<Frame> for FrameCodec {
  type Error = CodecError;

  fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
    let size = item.payload.len();
    if size > self.max_frame_size {
      return Err(CodecError::FrameTooLarge {
        size,
        max: self.max_frame_size,
      });
    }
    dst.reserve(HEADER_LEN + size);
    dst.put_i32(item.message_type);
    dst.put_u32(size as u32);
    dst.put_slice(&item.payload);
    Ok(())
  }
}

impl Decoder for FrameCodec {
  type Item = Frame;
  type Error = CodecError;

  fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
    let (message_type, size) = match self.pending {
      Some(header) => header,
      None => {
        if src.len() < HEADER_LEN {
          src.reserve(HEADER_LEN - src.len());
          return Ok(None);
        }
        let message_type = src.get_i32();
        let size = src.get_u32() as usize;
        if size > self.max_frame_size {
          return Err(CodecError::FrameTooLarge {
            size,
            max: self.max_frame_size,
          });
        }
        self.pending = Some((message_type, size));
        (message_type, size)
      }
    };

    if src.len() < size {
      src.reserve(size - src.len());
      return Ok(None);
    }

    self.pending = None;
    let payload = src.split_to(size).freeze();
    Ok(Some(Frame { message_type, payload }))
  }
}
