use bytes::{BufMut, Bytes, BytesMut};

pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const CRLF: &[u8] = &[CR, LF];

macro_rules! build_matching_kind_and_frame_enums {
    ($($name:ident$(($type:ty))? = $value:expr),*) => {

        /// The leading wire byte of a frame, plus `Undefined` for bytes that
        /// match no known frame kind. `Undefined` is a parse-time signal only;
        /// it never appears in a fully decoded [`Frame`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum FrameKind {
            $(
                $name,
            )*
            Undefined,
        }

        impl FrameKind {
            pub fn from_u8(value: u8) -> FrameKind {
                match value {
                    $(
                        $value => FrameKind::$name,
                    )*
                    _ => FrameKind::Undefined,
                }
            }

            /// The wire byte of this kind; `Undefined` has none.
            pub fn as_u8(self) -> Option<u8> {
                match self {
                    $(
                        FrameKind::$name => Some($value),
                    )*
                    FrameKind::Undefined => None,
                }
            }
        }

        #[derive(Debug, PartialEq)]
        #[repr(u8)]
        pub enum Frame {
            $(
                $name $(($type))? = $value,
            )*
        }
    };
}

// https://redis.io/docs/reference/protocol-spec/#resp-protocol-description
build_matching_kind_and_frame_enums! {
    Array(Vec<Frame>) = b'*',
    BigNumber(Bytes) = b'(',
    Boolean(bool) = b'#',
    BulkError(Bytes) = b'!',
    BulkString(Bytes) = b'$',
    Integer(i64) = b':',
    Null = b'_',
    SimpleError(Bytes) = b'-',
    SimpleString(Bytes) = b'+'
}

impl FrameKind {
    /// Simple kinds carry a single CRLF-terminated line with CR and LF
    /// forbidden inside.
    pub fn is_simple(self) -> bool {
        matches!(
            self,
            FrameKind::SimpleString | FrameKind::SimpleError | FrameKind::BigNumber
        )
    }

    /// Bulk kinds are length-prefixed and binary safe.
    pub fn is_bulk(self) -> bool {
        matches!(self, FrameKind::BulkString | FrameKind::BulkError)
    }

    pub fn is_aggregate(self) -> bool {
        matches!(self, FrameKind::Array)
    }
}

impl Frame {
    pub fn prefix(&self) -> u8 {
        // SAFETY: Because `Self` is marked `repr(u8)`, its layout is a `repr(C)` `union`
        // between `repr(C)` structs, each of which has the `u8` discriminant as its first
        // field, so we can read the discriminant without offsetting the pointer.
        unsafe { *<*const _>::from(self).cast::<u8>() }
    }

    pub fn kind(&self) -> FrameKind {
        FrameKind::from_u8(self.prefix())
    }

    /// A default-valued frame of the given kind: integers are 0, booleans
    /// false, strings and aggregates empty. `Undefined` has no frame.
    pub fn make(kind: FrameKind) -> Option<Frame> {
        match kind {
            FrameKind::Array => Some(Frame::Array(Vec::new())),
            FrameKind::BigNumber => Some(Frame::BigNumber(Bytes::new())),
            FrameKind::Boolean => Some(Frame::Boolean(false)),
            FrameKind::BulkError => Some(Frame::BulkError(Bytes::new())),
            FrameKind::BulkString => Some(Frame::BulkString(Bytes::new())),
            FrameKind::Integer => Some(Frame::Integer(0)),
            FrameKind::Null => Some(Frame::Null),
            FrameKind::SimpleError => Some(Frame::SimpleError(Bytes::new())),
            FrameKind::SimpleString => Some(Frame::SimpleString(Bytes::new())),
            FrameKind::Undefined => None,
        }
    }

    pub fn simple_error(message: &str) -> Frame {
        Frame::SimpleError(Bytes::copy_from_slice(message.as_bytes()))
    }

    /// Serializes the frame to its wire form. Encoding never fails, and
    /// re-decoding the result yields an equal frame.
    pub fn as_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.freeze()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.prefix());
        match self {
            Frame::Array(items) => {
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for item in items {
                    item.encode_into(buf);
                }
            }
            Frame::BigNumber(s) | Frame::SimpleError(s) | Frame::SimpleString(s) => {
                buf.put_slice(s);
                buf.put_slice(CRLF);
            }
            Frame::Boolean(v) => {
                buf.put_u8(if *v { b't' } else { b'f' });
                buf.put_slice(CRLF);
            }
            Frame::BulkError(b) | Frame::BulkString(b) => {
                buf.put_slice(b.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(b);
                buf.put_slice(CRLF);
            }
            Frame::Integer(n) => {
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            Frame::Null => {
                buf.put_slice(CRLF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! encode_tests {
        ($($name:ident: $frame:expr => $bytes:expr),* $(,)?) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(&$bytes[..], $frame.as_bytes().as_ref());
                }
            )*
        };
    }

    encode_tests! {
        encode_integer: Frame::Integer(25) => b":25\r\n",
        encode_negative_integer: Frame::Integer(-25) => b":-25\r\n",
        encode_simple_string: Frame::SimpleString("hello".into()) => b"+hello\r\n",
        encode_simple_error: Frame::SimpleError("err".into()) => b"-err\r\n",
        encode_big_number: Frame::BigNumber("3492890328409238509324850943".into()) => b"(3492890328409238509324850943\r\n",
        encode_bulk_string: Frame::BulkString("hel\rlo".into()) => b"$6\r\nhel\rlo\r\n",
        encode_empty_bulk_string: Frame::BulkString(Bytes::new()) => b"$0\r\n\r\n",
        encode_bulk_error: Frame::BulkError("oops".into()) => b"!4\r\noops\r\n",
        encode_true: Frame::Boolean(true) => b"#t\r\n",
        encode_false: Frame::Boolean(false) => b"#f\r\n",
        encode_null: Frame::Null => b"_\r\n",
        encode_empty_array: Frame::Array(vec![]) => b"*0\r\n",
        encode_nested_array: Frame::Array(vec![
            Frame::Integer(1),
            Frame::Array(vec![Frame::SimpleString("Three".into())]),
        ]) => b"*2\r\n:1\r\n*1\r\n+Three\r\n",
    }

    #[test]
    fn kind_matches_wire_byte() {
        let frame = Frame::BulkString("PING".into());
        assert_eq!(b'$', frame.prefix());
        assert_eq!(FrameKind::BulkString, frame.kind());
        assert_eq!(Some(b'$'), FrameKind::BulkString.as_u8());
    }

    #[test]
    fn unknown_wire_byte_is_undefined() {
        assert_eq!(FrameKind::Undefined, FrameKind::from_u8(b'?'));
        assert_eq!(None, FrameKind::Undefined.as_u8());
        assert_eq!(None, Frame::make(FrameKind::Undefined));
    }

    #[test]
    fn make_builds_default_values() {
        assert_eq!(Some(Frame::Integer(0)), Frame::make(FrameKind::Integer));
        assert_eq!(Some(Frame::Boolean(false)), Frame::make(FrameKind::Boolean));
        assert_eq!(
            Some(Frame::BulkString(Bytes::new())),
            Frame::make(FrameKind::BulkString)
        );
        assert_eq!(Some(Frame::Null), Frame::make(FrameKind::Null));
        assert_eq!(Some(Frame::Array(vec![])), Frame::make(FrameKind::Array));
    }

    #[test]
    fn classification_predicates() {
        assert!(FrameKind::SimpleString.is_simple());
        assert!(FrameKind::SimpleError.is_simple());
        assert!(FrameKind::BigNumber.is_simple());
        assert!(FrameKind::BulkString.is_bulk());
        assert!(FrameKind::BulkError.is_bulk());
        assert!(FrameKind::Array.is_aggregate());
        assert!(!FrameKind::Integer.is_simple());
        assert!(!FrameKind::Null.is_bulk());
        assert!(!FrameKind::Boolean.is_aggregate());
    }
}
