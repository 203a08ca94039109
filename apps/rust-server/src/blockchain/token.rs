// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential token contract ABI and event extraction.

use alloy::{
    primitives::{Address, Log},
    sol,
    sol_types::SolEvent,
};

use super::client::ChainError;
use super::types::Handle;

// Encrypted values (`euint64`, `externalEuint64`) are ABI-encoded as bytes32 handles.
sol! {
    #[sol(rpc)]
    interface IConfidentialToken {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function confidentialBalanceOf(address account) external view returns (bytes32);

        function getUserPendingConversions(address user) external view returns (uint256[] memory);
        function getConversionInfo(uint256 conversionId)
            external
            view
            returns (address requester, bytes32 handle, bool isPending, uint256 timestamp);
        function getConversionHandles(uint256 conversionId) external view returns (bytes32[] memory);

        function prepareConvertToPlain(bytes32 encryptedAmount, bytes calldata inputProof) external returns (uint256);
        function finalizeConversion(bytes32 handle, uint64 cleartextAmount, bytes calldata decryptionProof) external;
        function cancelConversion(uint256 conversionId) external;

        function convertToConfidential(uint256 amount) external;
        function transfer(address to, uint256 amount) external returns (bool);
        function confidentialTransfer(address to, bytes32 encryptedAmount, bytes calldata inputProof) external returns (bytes32);
        function mint() external;
        function mintTo(address to) external;

        event ConversionRequested(uint256 indexed conversionId, address indexed requester, bytes32 handle);
    }
}

/// Extract the handle from the `ConversionRequested` event emitted by `token`.
///
/// A `prepareConvertToPlain` receipt carries exactly one such event; when
/// several are present the first one wins.
pub fn conversion_requested_handle(logs: &[Log], token: Address) -> Result<Handle, ChainError> {
    let mut events = logs.iter().filter(|log| {
        log.address == token
            && log.data.topics().first()
                == Some(&IConfidentialToken::ConversionRequested::SIGNATURE_HASH)
    });

    let log = events.next().ok_or(ChainError::EventNotFound)?;
    if events.next().is_some() {
        tracing::warn!("Multiple ConversionRequested events in receipt, using the first");
    }

    let event = IConfidentialToken::ConversionRequested::decode_log_data(&log.data)
        .map_err(|e| ChainError::Contract(format!("Malformed ConversionRequested event: {e}")))?;

    Ok(Handle::from(event.handle))
}

#[cfg(test)]
pub(crate) fn conversion_requested_log(
    token: Address,
    id: u64,
    requester: Address,
    handle: alloy::primitives::B256,
) -> Log {
    let event = IConfidentialToken::ConversionRequested {
        conversionId: alloy::primitives::U256::from(id),
        requester,
        handle,
    };
    Log {
        address: token,
        data: event.encode_log_data(),
    }
}
