//! Typed call surfaces of the on-chain stack. The orchestrator only touches
//! constructors, initializers and public state; the contracts' internal
//! business logic lives on chain.

use alloy::sol;

sol! {
    /// Dispute metadata locked in when a fork is proposed.
    #[derive(Debug, PartialEq, Eq)]
    struct DisputeData {
        address disputeContract;
        bytes32 disputeContent;
        bool isL1;
    }

    /// Static configuration for a freshly spawned instance.
    #[derive(Debug, PartialEq, Eq)]
    struct DeploymentConfig {
        bytes32 genesisRoot;
        string trustedSequencerURL;
        string networkName;
        string version;
        address verifier;
        address minter;
        string tokenName;
        string tokenSymbol;
        uint256 arbitrationFee;
        address chainIdManager;
        uint256 forkPreparationTime;
        address hardAssetManager;
        uint64 lastVerifiedBatch;
        bytes32 lastMainnetExitRoot;
        bytes32 lastRollupExitRoot;
        address parentZkEvm;
        address parentBridge;
        address parentForkonomicToken;
        address parentGlobalExitRoot;
    }

    /// Rollup initialization parameters.
    #[derive(Debug, PartialEq, Eq)]
    struct ZkEvmInitParams {
        address admin;
        address trustedSequencer;
        uint64 pendingStateTimeout;
        address trustedAggregator;
        uint64 trustedAggregatorTimeout;
        uint64 chainID;
        uint64 forkID;
        uint64 lastBatchSequenced;
    }

    /// The content-addressed deployer-of-deployers. Every implementation is
    /// deployed through it with create2 so addresses are predictable.
    interface IStackDeployer {
        function owner() external view returns (address);
        function deployDeterministic(
            uint256 amount,
            bytes32 salt,
            bytes memory initBytecode
        ) external payable;
        function deployDeterministicAndCall(
            uint256 amount,
            bytes32 salt,
            bytes memory initBytecode,
            bytes memory dataCall
        ) external payable;
    }

    interface IForkingManager {
        function zkEVM() external view returns (address);
        function bridge() external view returns (address);
        function forkonomicToken() external view returns (address);
        function globalExitRoot() external view returns (address);
        function arbitrationFee() external view returns (uint256);
        function forkPreparationTime() external view returns (uint256);
        function reservedChainIdForFork1() external view returns (uint64);
        function reservedChainIdForFork2() external view returns (uint64);
        function executionTimeForProposal() external view returns (uint256);
        function getChildren() external view returns (address, address);
        function spawnInstance(
            address proxyAdmin,
            address zkEvmImplementation,
            address bridgeImplementation,
            address forkonomicTokenImplementation,
            address globalExitRootImplementation,
            DeploymentConfig memory deploymentConfig,
            ZkEvmInitParams memory zkEvmInitParams
        ) external;
        function initiateFork(DisputeData memory disputeData) external;
        function executeFork() external;
    }

    /// Shared surface of every forkable component.
    interface IForkableStructure {
        function getChildren() external view returns (address, address);
    }

    interface IForkableZkEvm {
        function chainID() external view returns (uint64);
        function trustedSequencer() external view returns (address);
    }

    interface IForkonomicToken {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }

    interface IForkableBridge {
        function claimAsset(
            bytes32[32] calldata smtProof,
            uint32 index,
            bytes32 mainnetExitRoot,
            bytes32 rollupExitRoot,
            uint32 originNetwork,
            address originTokenAddress,
            uint32 destinationNetwork,
            address destinationAddress,
            uint256 amount,
            bytes calldata metadata
        ) external;
        function claimMessage(
            bytes32[32] calldata smtProof,
            uint32 index,
            bytes32 mainnetExitRoot,
            bytes32 rollupExitRoot,
            uint32 originNetwork,
            address originAddress,
            uint32 destinationNetwork,
            address destinationAddress,
            uint256 amount,
            bytes calldata metadata
        ) external;
    }

    interface IProxyAdmin {
        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
    }

    interface IL1GlobalChainInfoPublisher {
        function updateL2ChainInfo(
            address bridge,
            address l2ChainInfo,
            address gasTokenAddress,
            address gasTokenNetwork
        ) external;
    }
}
