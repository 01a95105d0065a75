//! Contract interfaces for the note protocol.
//!
//! Inline `sol!` definitions cover only the functions and events the
//! monitor touches.

use alloy::sol;

sol! {
    /// Note manager: collateral accounting, minting and liquidation.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IVaultManager {
        event Liquidate(uint256 indexed id, address indexed from, uint256 indexed to, uint256 amount);

        function collatRatio(uint256 id) external view returns (uint256);
        function getTotalValue(uint256 id) external view returns (uint256);
        function getVaultsValues(uint256 id) external view returns (uint256 exoValue, uint256 keroValue);
        function getVaults(uint256 id) external view returns (address[] memory);

        function mintDyad(uint256 id, uint256 amount, address to) external;
        function burnDyad(uint256 id, uint256 amount) external;
        function withdraw(uint256 id, address vault, uint256 amount, address to) external;
        function liquidate(uint256 id, uint256 to, uint256 amount) external returns (address[] memory, uint256[] memory);
    }
}

sol! {
    /// Stablecoin ledger of minted debt per note.
    #[sol(rpc)]
    interface IDyad {
        function mintedDyad(uint256 id) external view returns (uint256);
    }
}

sol! {
    /// Collateral vault.
    #[sol(rpc)]
    interface IVault {
        function asset() external view returns (address);
        function getUsdValue(uint256 id) external view returns (uint256);
    }
}

sol! {
    /// Kerosene vault with its deterministic asset price (8 decimals).
    #[sol(rpc)]
    interface IKeroseneVault {
        function assetPrice() external view returns (uint256);
    }
}

sol! {
    /// LP staking factory holding merkle-distributed KERO rewards.
    #[sol(rpc)]
    interface IDyadLPStakingFactory {
        function noteIdToTotalClaimed(uint256 noteId) external view returns (uint256);
        function claimToVault(uint256 noteId, uint256 amount, bytes32[] calldata proof) external returns (uint256);
    }
}

sol! {
    /// Curve stable-swap NG pool (subset).
    #[sol(rpc)]
    interface ICurveStableSwapNG {
        function get_balances() external view returns (uint256[] memory);
        function coins(uint256 i) external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256, U256};
    use alloy::sol_types::{SolCall, SolEvent};

    #[test]
    fn test_selectors() {
        // collatRatio(uint256)
        assert_eq!(
            IVaultManager::collatRatioCall::SELECTOR[..],
            alloy::primitives::keccak256("collatRatio(uint256)")[..4]
        );
        // liquidate(uint256,uint256,uint256)
        assert_eq!(
            IVaultManager::liquidateCall::SIGNATURE,
            "liquidate(uint256,uint256,uint256)"
        );
        assert_eq!(
            IDyadLPStakingFactory::claimToVaultCall::SIGNATURE,
            "claimToVault(uint256,uint256,bytes32[])"
        );
    }

    #[test]
    fn test_liquidate_event_signature() {
        assert_eq!(
            IVaultManager::Liquidate::SIGNATURE,
            "Liquidate(uint256,address,uint256,uint256)"
        );
    }

    #[test]
    fn test_claim_encoding() {
        let call = IDyadLPStakingFactory::claimToVaultCall {
            noteId: U256::from(7u64),
            amount: U256::from(1_000u64),
            proof: vec![B256::repeat_byte(1), B256::repeat_byte(2)],
        };
        let encoded = call.abi_encode();
        // selector + 3 head words + length + 2 proof words
        assert_eq!(encoded.len(), 4 + 32 * 6);

        let mint = IVaultManager::mintDyadCall {
            id: U256::from(7u64),
            amount: U256::from(1u64),
            to: Address::ZERO,
        };
        assert_eq!(mint.abi_encode().len(), 4 + 32 * 3);
    }
}
