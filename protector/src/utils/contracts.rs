use alloy::sol;

// Liquidation protection callback contract (deployed on Sepolia)
sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    contract ProtectionCallbackContract {
        constructor(address callbackSender, address collateralToken, address collateralTokenPriceFeed) payable;

        function calculateCollateralNeeded(address user, address lendingPool, uint256 targetHealthFactor) public view returns (uint256);
    }
);

// Reactive monitoring contract (deployed on Kopli)
sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    contract ProtectionReactiveContract {
        constructor(address lendingPool, address protectionManager, address uniswapPair, address user, uint256 healthFactorThreshold, uint256 targetHealthFactor) payable;
    }
);

// --------- ERC20 ---------
sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface Erc20Contract {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
);

// Aave Pool Contract
sol!(
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface LendingPoolContract {
        function getUserAccountData(address user) external view returns (uint256 totalCollateralETH, uint256 totalDebtETH, uint256 availableBorrowsETH, uint256 currentLiquidationThreshold, uint256 ltv, uint256 healthFactor);
    }
);
