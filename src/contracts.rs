//! Centralized Contract Definitions
//!
//! Solidity interfaces used for read-only trade simulation, defined with
//! alloy's `sol!` macro. Each is annotated with `#[sol(rpc)]` so contract
//! instances can be called through any alloy Provider.

use alloy::sol;

// ── Multicall3 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}

// ── Balancer V2 ──────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IBalancerQueries {
        struct SingleSwap {
            bytes32 poolId;
            uint8 kind;
            address assetIn;
            address assetOut;
            uint256 amount;
            bytes userData;
        }

        struct FundManagement {
            address sender;
            bool fromInternalBalance;
            address recipient;
            bool toInternalBalance;
        }

        function querySwap(SingleSwap memory singleSwap, FundManagement memory funds) external returns (uint256);
    }
}

// ── Balancer V3 ──────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IBalancerV3Router {
        function querySwapSingleTokenExactIn(address pool, address tokenIn, address tokenOut, uint256 exactAmountIn, address sender, bytes memory userData) external returns (uint256 amountCalculated);
        function queryRemoveLiquiditySingleTokenExactIn(address pool, uint256 exactBptAmountIn, address tokenOut, address sender, bytes memory userData) external returns (uint256 amountOut);
        function queryAddLiquidityUnbalanced(address pool, uint256[] memory exactAmountsIn, address sender, bytes memory userData) external returns (uint256 bptAmountOut);
    }
}
