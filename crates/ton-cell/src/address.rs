//! TON message addresses.
//!
//! Only the two forms contract messages use are modelled: `addr_none` and
//! the standard internal address without anycast.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

use crate::{CellError, CellResult};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// TON message address.
///
/// # Example
///
/// ```
/// use ton_cell::MsgAddress;
///
/// let addr = MsgAddress::from_string(
///     "0:1212121212121212121212121212121212121212121212121212121212121212",
/// ).unwrap();
/// assert_eq!(
///     addr.to_user_friendly(true, false).unwrap(),
///     "EQASEhISEhISEhISEhISEhISEhISEhISEhISEhISEhISEuHS",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MsgAddress {
    /// No address (addr_none$00).
    #[default]
    Null,

    /// Standard internal address (addr_std$10).
    Internal {
        /// Workchain ID (-1 for masterchain, 0 for basechain).
        workchain: i32,
        /// 256-bit account ID.
        address: [u8; 32],
    },
}

impl MsgAddress {
    /// Serialized size of an internal address: 2 + 1 + 8 + 256 bits.
    pub const STD_BITS: usize = 267;

    /// Build an internal address.
    pub fn internal(workchain: i32, address: [u8; 32]) -> Self {
        MsgAddress::Internal { workchain, address }
    }

    /// Parse an address from a string.
    ///
    /// Supported formats:
    /// - Raw: `"workchain:hex_address"` (e.g. `"0:abc123..."`)
    /// - User-friendly: 48 characters of base64 (URL-safe or standard)
    ///   carrying a flag byte, the workchain, the account ID and a CRC16
    pub fn from_string(s: &str) -> CellResult<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Err(CellError::InvalidAddress("empty address".into()));
        }

        if let Some((workchain_str, address_str)) = s.split_once(':') {
            let workchain: i32 = workchain_str.parse().map_err(|_| {
                CellError::InvalidAddress(format!("Invalid workchain: {}", workchain_str))
            })?;

            if address_str.len() != 64 {
                return Err(CellError::InvalidAddress(format!(
                    "Address hex must be 64 characters, got {}",
                    address_str.len()
                )));
            }

            let address_bytes = hex_decode(address_str)?;
            let mut address = [0u8; 32];
            address.copy_from_slice(&address_bytes);

            return Ok(MsgAddress::Internal { workchain, address });
        }

        if s.len() == 48 {
            return Self::from_user_friendly(s);
        }

        Err(CellError::InvalidAddress(format!(
            "Unrecognized address format: {}",
            s
        )))
    }

    /// Parse a user-friendly address.
    ///
    /// Format: 1 byte tag + 1 byte workchain + 32 bytes address + 2 bytes CRC16
    fn from_user_friendly(s: &str) -> CellResult<Self> {
        let bytes = if s.contains(['-', '_']) {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected_crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        let actual_crc = crc16_xmodem(&bytes[..34]);
        if expected_crc != actual_crc {
            return Err(CellError::InvalidAddress(format!(
                "CRC16 mismatch: expected {:04x}, got {:04x}",
                expected_crc, actual_crc
            )));
        }

        let tag = bytes[0] & !TAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(CellError::InvalidAddress(format!(
                "Unknown address tag: {:02x}",
                bytes[0]
            )));
        }

        let workchain = bytes[1] as i8 as i32;
        let mut address = [0u8; 32];
        address.copy_from_slice(&bytes[2..34]);

        Ok(MsgAddress::Internal { workchain, address })
    }

    /// Raw `"workchain:hex"` form; empty for the null address.
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex_encode(address))
            }
        }
    }

    /// User-friendly URL-safe base64 form. None for the null address.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        let MsgAddress::Internal { workchain, address } = self else {
            return None;
        };

        let mut data = Vec::with_capacity(36);
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if testnet {
            tag |= TAG_TESTNET;
        }
        data.push(tag);
        data.push(*workchain as i8 as u8);
        data.extend_from_slice(address);

        let crc = crc16_xmodem(&data);
        data.extend_from_slice(&crc.to_be_bytes());

        Some(URL_SAFE_NO_PAD.encode(&data))
    }

    /// Workchain ID (if internal address).
    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            MsgAddress::Null => None,
        }
    }

    /// The 256-bit account ID (if internal address).
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            MsgAddress::Null => None,
        }
    }

    /// Check if this is a null address.
    pub fn is_null(&self) -> bool {
        matches!(self, MsgAddress::Null)
    }
}

impl std::fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

impl std::str::FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> CellResult<Self> {
        Self::from_string(s)
    }
}

fn hex_decode(s: &str) -> CellResult<Vec<u8>> {
    if !s.is_ascii() || !s.len().is_multiple_of(2) {
        return Err(CellError::InvalidAddress(format!("Invalid hex: {}", s)));
    }

    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| CellError::InvalidAddress(format!("Invalid hex: {}", &s[i..i + 2])))
        })
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    CRC16.checksum(data)
}
