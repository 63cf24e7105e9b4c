//! Chain read access used by the aggregator. [`RpcSource`] talks to a
//! JSON-RPC node through alloy, tests plug in their own implementation.

use std::future::Future;

use alloy::{
    primitives::{Address, U256},
    providers::{DynProvider, Provider},
};
use tally_common::erc20::IERC20;

use crate::alloy::StringExt;

pub trait BalanceSource: Send + Sync + 'static {
    type Contract: TokenContract;

    fn native_balance(&self, owner: Address) -> impl Future<Output = crate::Result<U256>> + Send;

    /// Binds a handle to a token contract, no request is made here.
    fn contract(&self, address: Address) -> Self::Contract;
}

pub trait TokenContract: Clone + Send + Sync + 'static {
    fn decimals(&self) -> impl Future<Output = crate::Result<u8>> + Send;

    fn balance_of(&self, owner: Address) -> impl Future<Output = crate::Result<U256>> + Send;
}

pub struct RpcSource {
    provider: DynProvider,
}

impl RpcSource {
    pub fn new(rpc_url: &str) -> crate::Result<Self> {
        Ok(Self {
            provider: rpc_url.to_dyn_provider()?,
        })
    }
}

impl BalanceSource for RpcSource {
    type Contract = Erc20Handle;

    async fn native_balance(&self, owner: Address) -> crate::Result<U256> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(|error| crate::Error::NativeBalanceFailed {
                address: owner,
                error: Box::new(error),
            })
    }

    fn contract(&self, address: Address) -> Erc20Handle {
        Erc20Handle {
            instance: IERC20::new(address, self.provider.clone()),
        }
    }
}

#[derive(Clone)]
pub struct Erc20Handle {
    instance: IERC20::IERC20Instance<DynProvider>,
}

impl Erc20Handle {
    fn call_failed(
        &self,
        method: &'static str,
    ) -> impl FnOnce(alloy::contract::Error) -> crate::Error {
        let contract = *self.instance.address();
        move |error| crate::Error::ContractCallFailed {
            contract,
            method,
            error: Box::new(error),
        }
    }
}

impl TokenContract for Erc20Handle {
    async fn decimals(&self) -> crate::Result<u8> {
        self.instance
            .decimals()
            .call()
            .await
            .map_err(self.call_failed("decimals"))
    }

    async fn balance_of(&self, owner: Address) -> crate::Result<U256> {
        self.instance
            .balanceOf(owner)
            .call()
            .await
            .map_err(self.call_failed("balanceOf"))
    }
}
