// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt;

/// Convenience type for fallible operations done while parsing headers.
pub type ParseResult<T> = Result<T, ParseError>;

/// The reason a buffer was rejected by a codec.
///
/// These describe the *data*, never the environment: a caller receiving one
/// should skip the input or wait for more of it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ParseError {
    /// There are insufficient bytes in the buffer to read the intended
    /// header.
    TooSmall,
    /// The version nibble did not name the expected protocol.
    BadVersion,
    /// A field in the header had an illegal value for the target datatype.
    IllegalValue,
    /// The stored checksum does not agree with the header contents.
    BadChecksum,
    /// A DHCP options area did not begin with the magic cookie.
    BadCookie,
    /// An option record extends past the end of its buffer.
    MalformedOption,
    /// A fixed-width text field has no NUL terminator.
    Unterminated,
    /// A value does not fit into the length field that must describe it.
    TooLarge,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::TooSmall => "buffer too small for header",
            ParseError::BadVersion => "unexpected protocol version",
            ParseError::IllegalValue => "illegal field value",
            ParseError::BadChecksum => "checksum mismatch",
            ParseError::BadCookie => "missing DHCP magic cookie",
            ParseError::MalformedOption => "malformed option record",
            ParseError::Unterminated => "text field is not NUL-terminated",
            ParseError::TooLarge => "value exceeds its length field",
        };

        f.write_str(msg)
    }
}

impl core::error::Error for ParseError {}
