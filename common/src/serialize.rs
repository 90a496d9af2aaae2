// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use thiserror::Error;

/// Errors that can occur while creating or loading a save state.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode or decode state: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("failed to (de)compress state: {0}")]
    Io(#[from] std::io::Error),
    #[error("state is compressed, but compression support is not enabled")]
    CompressionUnsupported,
}

/// Serialize an object that can be loaded with [deserialize].
/// It is (optionally zstd-compressed) bincode.
#[cfg(feature = "zstd")]
pub fn serialize<T: serde::Serialize>(
    thing: &T,
    with_zstd: bool,
) -> Result<Vec<u8>, SerializeError> {
    if with_zstd {
        let mut dest = vec![];
        let mut writer = zstd::stream::Encoder::new(&mut dest, 3)?;
        bincode::serialize_into(&mut writer, thing)?;
        writer.finish()?;
        Ok(dest)
    } else {
        Ok(bincode::serialize(thing)?)
    }
}

/// Deserialize an object that was made with [serialize].
/// It is (optionally zstd-compressed) bincode.
#[cfg(feature = "zstd")]
pub fn deserialize<T: serde::de::DeserializeOwned>(
    state: &[u8],
    with_zstd: bool,
) -> Result<T, SerializeError> {
    if with_zstd {
        let decoder = zstd::stream::Decoder::new(state)?;
        Ok(bincode::deserialize_from(decoder)?)
    } else {
        Ok(bincode::deserialize(state)?)
    }
}

/// Serialize an object that can be loaded with [deserialize].
/// Compression is not available in this build and the flag is ignored.
#[cfg(not(feature = "zstd"))]
pub fn serialize<T: serde::Serialize>(
    thing: &T,
    _with_zstd: bool,
) -> Result<Vec<u8>, SerializeError> {
    Ok(bincode::serialize(thing)?)
}

/// Deserialize an object that was made with [serialize].
#[cfg(not(feature = "zstd"))]
pub fn deserialize<T: serde::de::DeserializeOwned>(
    state: &[u8],
    with_zstd: bool,
) -> Result<T, SerializeError> {
    if with_zstd {
        return Err(SerializeError::CompressionUnsupported);
    }
    Ok(bincode::deserialize(state)?)
}
