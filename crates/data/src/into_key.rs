// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use cb_events::{BatchId, Participant, RequestId};

/// Anything that can be turned into a store key. Segments joined with "/" form a path.
pub trait IntoKey {
    fn into_key(self) -> Vec<u8>;
}

impl IntoKey for Vec<u8> {
    fn into_key(self) -> Vec<u8> {
        self
    }
}

impl IntoKey for &Vec<u8> {
    fn into_key(self) -> Vec<u8> {
        self.clone()
    }
}

impl IntoKey for &[u8] {
    fn into_key(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl IntoKey for Vec<String> {
    fn into_key(self) -> Vec<u8> {
        self.join("/").into_bytes()
    }
}

impl<'a> IntoKey for Vec<&'a str> {
    fn into_key(self) -> Vec<u8> {
        self.join("/").into_bytes()
    }
}

impl IntoKey for String {
    fn into_key(self) -> Vec<u8> {
        self.into_bytes()
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl<'a> IntoKey for &'a str {
    fn into_key(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl IntoKey for BatchId {
    fn into_key(self) -> Vec<u8> {
        self.value().to_string().into_bytes()
    }
}

impl IntoKey for &Participant {
    fn into_key(self) -> Vec<u8> {
        format!("{self:#x}").into_bytes()
    }
}

impl IntoKey for &RequestId {
    fn into_key(self) -> Vec<u8> {
        format!("{:#x}", self.as_b256()).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_ids_render_as_readable_segments() {
        assert_eq!(BatchId::new(12).into_key(), b"12".to_vec());
        let who = Participant::repeat_byte(0x11);
        assert_eq!(
            String::from_utf8((&who).into_key()).unwrap(),
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(vec!["a", "b"].into_key(), b"a/b".to_vec());
    }
}
