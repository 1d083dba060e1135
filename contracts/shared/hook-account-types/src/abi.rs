//! Solidity ABI definitions for accounts, shells and the registry.

use alloy_sol_types::sol;

sol! {
    /// A single external call inside a batch.
    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address target;
        uint256 value;
        bytes callData;
        bool allowFailure;
    }

    /// EIP-712 primary type signed by an account admin.
    #[derive(Debug, PartialEq, Eq)]
    struct Hooks {
        Call[] calls;
        bytes32 nonce;
    }

    event AdminChanged(address previousAdmin, address newAdmin);
    event Upgraded(address indexed implementation);
    event TrustedExecutorUpdated(address previousExecutor, address newExecutor);
    event AccountCreated(address indexed owner, address indexed account);

    error InvalidSignature();
    error NonceAlreadyUsed(bytes32 nonce);
    error OnlyTrustedExecutor(address caller);
    error OnlyAdmin(address caller);
    error OnlySelf(address caller);
    error AlreadyInitialized(address account);
    error InvalidInitialization();
    error InvalidImplementation(address implementation);

    /// Entry points served by the hook engine (reached through an account shell).
    interface IHookAccount {
        function initialize(address implementation, address admin, address trustedExecutor, Call[] calls) external payable;
        function executeHooks(Call[] calls, bytes32 nonce, bytes signature) external payable;
        function executeHooks(Call[] calls, bytes32 nonce, uint8 v, bytes32 r, bytes32 s) external payable;
        function trustedExecuteHooks(Call[] calls) external payable;
        function updateTrustedExecutor(address trustedExecutor) external;
        function updateImplementation(address newImplementation) external;
        function revokeNonce(bytes32 nonce) external;

        function domainSeparator() external view returns (bytes32);
        function hashHooks(Call[] calls, bytes32 nonce) external view returns (bytes32);
        function trustedExecutor() external view returns (address);
        function admin() external view returns (address);
        function implementation() external view returns (address);
        function nonces(bytes32 nonce) external view returns (bool);
    }

    /// Paths the transparent shell serves itself when called by the admin.
    interface IAccountShell {
        function admin() external view returns (address);
        function upgradeTo(address newImplementation) external;
    }

    interface IAccountRegistry {
        function addressFor(address owner) external view returns (address);
        function accountImplementation() external view returns (address);
        function executeHooks(Call[] calls, bytes32 nonce, address owner, bytes signature) external payable;
        function executeHooks(Call[] calls, bytes32 nonce, address owner, uint8 v, bytes32 r, bytes32 s) external payable;
    }
}
