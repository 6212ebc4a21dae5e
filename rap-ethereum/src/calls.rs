//! Call data for the contract calls the planner emits itself.
//!
//! Swap and bridge routes arrive fully encoded inside the quote; only approvals, revocations and
//! native asset (un)wrapping are encoded here.
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

// ERC20 approval surface, from EIP-20: https://eips.ethereum.org/EIPS/eip-20
sol! {
    function approve(address _spender, uint256 _value) public returns (bool success);
}

// ERC721 operator approval, from EIP-721: https://eips.ethereum.org/EIPS/eip-721
sol! {
    function setApprovalForAll(address _operator, bool _approved) external;
}

// WETH9-style wrapped native token
sol! {
    function deposit() public payable;
    function withdraw(uint256 wad) public;
}

/// Encode approve(address,uint256) call
pub fn encode_approve(spender: Address, value: U256) -> Bytes {
    approveCall { _spender: spender, _value: value }
        .abi_encode()
        .into()
}

/// Encode approve(spender, 0), clearing an ERC20 allowance
pub fn encode_revoke_erc20(spender: Address) -> Bytes {
    encode_approve(spender, U256::ZERO)
}

/// Encode setApprovalForAll(operator, false), clearing an ERC721 operator approval
pub fn encode_revoke_erc721(operator: Address) -> Bytes {
    setApprovalForAllCall { _operator: operator, _approved: false }
        .abi_encode()
        .into()
}

/// Encode deposit() call. The amount travels as the transaction value.
pub fn encode_wrap() -> Bytes {
    depositCall {}.abi_encode().into()
}

/// Encode withdraw(uint256) call
pub fn encode_unwrap(amount: U256) -> Bytes {
    withdrawCall { wad: amount }
        .abi_encode()
        .into()
}
