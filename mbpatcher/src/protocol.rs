// SPDX-FileCopyrightText: 2026 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Messages for asking the boot-time daemon for its version. Only the message
//! encoding lives here. Moving the bytes is up to the caller.

use prost::Message;
use thiserror::Error;

#[allow(clippy::all)]
#[allow(clippy::nursery)]
#[allow(clippy::pedantic)]
pub mod daemon {
    include!(concat!(env!("OUT_DIR"), "/mbpatcher.daemon.rs"));
}

pub use daemon::{GetVersionRequest, GetVersionResponse};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to decode {0} message")]
    Decode(&'static str, #[source] prost::DecodeError),
}

type Result<T> = std::result::Result<T, Error>;

pub fn encode_get_version_request() -> Vec<u8> {
    GetVersionRequest {}.encode_to_vec()
}

pub fn decode_get_version_request(data: &[u8]) -> Result<GetVersionRequest> {
    GetVersionRequest::decode(data).map_err(|e| Error::Decode("GetVersionRequest", e))
}

pub fn encode_get_version_response(version: &str) -> Vec<u8> {
    GetVersionResponse {
        version: version.to_owned(),
    }
    .encode_to_vec()
}

/// Decode the daemon's reply and return the version string it contains.
pub fn decode_get_version_response(data: &[u8]) -> Result<String> {
    let response = GetVersionResponse::decode(data)
        .map_err(|e| Error::Decode("GetVersionResponse", e))?;

    Ok(response.version)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn version_exchange() {
        let request = encode_get_version_request();
        assert!(request.is_empty());
        decode_get_version_request(&request).unwrap();

        let response = encode_get_version_response("8.0.0");
        assert_eq!(decode_get_version_response(&response).unwrap(), "8.0.0");
    }

    #[test]
    fn empty_and_truncated_responses() {
        // Proto3 omits empty strings, so an empty message is an empty version.
        assert_eq!(decode_get_version_response(&[]).unwrap(), "");
        assert_eq!(
            decode_get_version_response(&encode_get_version_response("")).unwrap(),
            "",
        );
        // Field 1, length-delimited, truncated payload.
        assert_matches!(
            decode_get_version_response(&[0x0a, 0x05, b'8']),
            Err(Error::Decode("GetVersionResponse", _))
        );
    }
}
