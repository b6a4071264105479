// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted payroll contract interface.

use alloy::{
    primitives::{keccak256, B256},
    sol,
};

// Define the payroll interface using alloy's sol! macro.
// Encrypted inputs (`externalEuint128`) travel as bytes32 handles plus a proof.
sol! {
    #[sol(rpc)]
    interface IEncryptedPayroll {
        event StreamCreated(address indexed employee, uint64 startBlock, uint64 cliffBlock);
        event WithdrawalReady(address indexed employee, bytes32 claimableHandle);
        event SalaryWithdrawn(address indexed employee, uint256 amount);

        function createStream(
            address employee,
            bytes32 encryptedSalary,
            bytes inputProof,
            uint64 startBlock,
            uint64 cliffBlock
        ) external;
        function requestWithdrawal() external returns (bytes32);
        function submitWithdrawal(uint256 amount) external;
        function pauseStream(address employee) external;
        function resumeStream(address employee) external;
        function cancelStream(address employee) external;

        function streams(address employee) external view returns (
            bytes32 salaryPerBlock,
            uint64 startBlock,
            uint64 cliffBlock,
            bytes32 claimedAmount,
            bool isPaused,
            bool exists
        );
        function getStreamCount() external view returns (uint256);
        function getEmployees(uint256 offset, uint256 limit) external view returns (address[]);
        function hasRole(bytes32 role, address account) external view returns (bool);
        function grantRole(bytes32 role, address account) external;
        function revokeRole(bytes32 role, address account) external;
    }

    /// Oracle comparing an employee's encrypted salary against income tiers.
    #[sol(rpc)]
    interface IIncomeOracle {
        function requestAttestation() external;
    }
}

/// Role allowed to create and administer streams.
pub fn hr_role() -> B256 {
    keccak256("HR_ROLE")
}

/// OpenZeppelin `DEFAULT_ADMIN_ROLE`.
pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;

    #[test]
    fn hr_role_differs_from_admin_role() {
        assert_eq!(hr_role(), keccak256(b"HR_ROLE"));
        assert_ne!(hr_role(), DEFAULT_ADMIN_ROLE);
    }

    #[test]
    fn role_calls_encode_role_and_account() {
        use alloy::primitives::Address;
        use alloy::sol_types::SolCall;

        let call = IEncryptedPayroll::grantRoleCall {
            role: hr_role(),
            account: Address::repeat_byte(0x11),
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], IEncryptedPayroll::grantRoleCall::SELECTOR.as_slice());
        assert_eq!(&data[4..36], hr_role().as_slice());
        assert_eq!(
            IEncryptedPayroll::revokeRoleCall::SIGNATURE,
            "revokeRole(bytes32,address)"
        );
        assert_eq!(IIncomeOracle::requestAttestationCall::SIGNATURE, "requestAttestation()");
    }

    #[test]
    fn withdrawal_ready_signature() {
        assert_eq!(
            IEncryptedPayroll::WithdrawalReady::SIGNATURE,
            "WithdrawalReady(address,bytes32)"
        );
    }
}
