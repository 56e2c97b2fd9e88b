//! TEP-64 content cells and NFT royalty parameters.

use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::error::{ContractError, ContractResult};

/// Layout byte of on-chain (dictionary) content.
pub const ONCHAIN_CONTENT_PREFIX: u8 = 0x00;

/// Layout byte of off-chain (URI) content.
pub const OFFCHAIN_CONTENT_PREFIX: u8 = 0x01;

/// Build off-chain content: the layout byte followed by the URI as a snake
/// string.
pub fn build_offchain_content(uri: &str) -> ContractResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u8(OFFCHAIN_CONTENT_PREFIX)?;
    builder.store_string_tail(uri)?;
    Ok(builder.build()?)
}

/// Read the URI back from an off-chain content cell.
pub fn parse_offchain_content(cell: &Cell) -> ContractResult<String> {
    let mut slice = CellSlice::new(cell);
    let prefix = slice.load_u8()?;
    if prefix != OFFCHAIN_CONTENT_PREFIX {
        return Err(ContractError::InvalidContent(prefix));
    }
    Ok(slice.load_string_tail()?)
}

/// NFT royalty: `numerator / denominator` of each sale goes to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoyaltyParams {
    pub numerator: u16,
    pub denominator: u16,
    pub destination: MsgAddress,
}

impl RoyaltyParams {
    /// Encode as `numerator:uint16 denominator:uint16 destination:MsgAddress`.
    pub fn to_cell(&self) -> ContractResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u16(self.numerator)?;
        builder.store_u16(self.denominator)?;
        builder.store_address(&self.destination)?;
        Ok(builder.build()?)
    }

    /// Decode a royalty cell.
    pub fn from_cell(cell: &Cell) -> ContractResult<Self> {
        let mut slice = CellSlice::new(cell);
        Ok(Self {
            numerator: slice.load_u16()?,
            denominator: slice.load_u16()?,
            destination: slice.load_address()?,
        })
    }

    /// Royalty share in basis points, if the denominator is non-zero.
    pub fn basis_points(&self) -> Option<u32> {
        if self.denominator == 0 {
            return None;
        }
        Some(self.numerator as u32 * 10_000 / self.denominator as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offchain_prefix() {
        let cell = build_offchain_content("https://example.com/collection.json").unwrap();
        assert_eq!(cell.data()[0], 0x01);
        assert_eq!(
            parse_offchain_content(&cell).unwrap(),
            "https://example.com/collection.json"
        );
    }

    #[test]
    fn test_long_uri_snakes() {
        let uri = format!("https://example.com/{}", "a".repeat(200));
        let cell = build_offchain_content(&uri).unwrap();
        assert_eq!(cell.reference_count(), 1);
        assert_eq!(parse_offchain_content(&cell).unwrap(), uri);
    }

    #[test]
    fn test_onchain_prefix_rejected() {
        let mut builder = CellBuilder::new();
        builder.store_u8(ONCHAIN_CONTENT_PREFIX).unwrap();
        let cell = builder.build().unwrap();
        assert!(matches!(
            parse_offchain_content(&cell),
            Err(ContractError::InvalidContent(0x00))
        ));
    }

    #[test]
    fn test_royalty_roundtrip() {
        let royalty = RoyaltyParams {
            numerator: 5,
            denominator: 100,
            destination: MsgAddress::internal(0, [4; 32]),
        };
        let cell = royalty.to_cell().unwrap();
        assert_eq!(cell.bit_len(), 32 + 267);
        assert_eq!(RoyaltyParams::from_cell(&cell).unwrap(), royalty);
        assert_eq!(royalty.basis_points(), Some(500));
    }
}
