use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse as _};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::TransportError;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::VaultConfig;
use crate::contracts::{IZenithVault, IERC20};
use crate::error::VaultError;
use crate::traits::vault_provider::{VaultReader, VaultWriter};

/// JSON-RPC backed reader for the token/vault pair
#[derive(Clone)]
pub struct RpcVaultReader {
    provider: DynProvider,
    token: Address,
    vault: Address,
    decimals_cache: DashMap<Address, u8>,
}

impl RpcVaultReader {
    /// Read-only connection with no signing account
    pub fn new(config: &VaultConfig) -> Result<Self, VaultError> {
        let url = parse_url(&config.rpc_url)?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self::with_provider(provider, config))
    }

    fn with_provider(provider: DynProvider, config: &VaultConfig) -> Self {
        Self {
            provider,
            token: config.token_address,
            vault: config.vault_address,
            decimals_cache: DashMap::new(),
        }
    }

    fn token_contract(&self) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(self.token, self.provider.clone())
    }

    fn vault_contract(&self) -> IZenithVault::IZenithVaultInstance<DynProvider> {
        IZenithVault::new(self.vault, self.provider.clone())
    }
}

#[async_trait]
impl VaultReader for RpcVaultReader {
    async fn chain_id(&self) -> Result<u64, VaultError> {
        self.provider.get_chain_id().await.map_err(map_transport_error)
    }

    async fn vault_deployed(&self) -> Result<bool, VaultError> {
        let code = self
            .provider
            .get_code_at(self.vault)
            .await
            .map_err(map_transport_error)?;
        Ok(!code.is_empty())
    }

    async fn token_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.token_contract()
            .balanceOf(account)
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn token_decimals(&self) -> Result<u8, VaultError> {
        if let Some(decimals) = self.decimals_cache.get(&self.token) {
            return Ok(*decimals);
        }

        let decimals = self
            .token_contract()
            .decimals()
            .call()
            .await
            .map_err(map_contract_error)?;

        self.decimals_cache.insert(self.token, decimals);
        Ok(decimals)
    }

    async fn allowance(&self, owner: Address) -> Result<U256, VaultError> {
        self.token_contract()
            .allowance(owner, self.vault)
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn share_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.vault_contract()
            .balanceOf(account)
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn total_assets(&self) -> Result<U256, VaultError> {
        self.vault_contract()
            .totalAssets()
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn total_supply(&self) -> Result<U256, VaultError> {
        self.vault_contract()
            .totalSupply()
            .call()
            .await
            .map_err(map_contract_error)
    }

    async fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError> {
        self.vault_contract()
            .convertToAssets(shares)
            .call()
            .await
            .map_err(map_contract_error)
    }
}

/// Reader plus a signing account.
///
/// With `PRIVATE_KEY` set transactions are signed locally; otherwise they go
/// out as `eth_sendTransaction` for the node or wallet behind the endpoint
/// to sign.
pub struct RpcVaultSigner {
    reader: RpcVaultReader,
    account: Address,
}

impl RpcVaultSigner {
    pub async fn connect(config: &VaultConfig) -> Result<Self, VaultError> {
        let url = parse_url(&config.rpc_url)?;

        if let Some(key) = &config.private_key {
            let signer: PrivateKeySigner = key
                .trim()
                .parse()
                .map_err(|e| VaultError::Config(format!("invalid PRIVATE_KEY: {}", e)))?;
            let account = signer.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased();

            info!("Using local signer {}", account);
            return Ok(Self {
                reader: RpcVaultReader::with_provider(provider, config),
                account,
            });
        }

        let provider = ProviderBuilder::new().connect_http(url).erased();
        let account = match config.account {
            Some(account) => account,
            None => {
                let accounts = provider.get_accounts().await.map_err(map_transport_error)?;
                debug!("Node exposes {} accounts", accounts.len());
                accounts.first().copied().ok_or(VaultError::NotConnected)?
            }
        };

        info!("Using node-managed account {}", account);
        Ok(Self {
            reader: RpcVaultReader::with_provider(provider, config),
            account,
        })
    }
}

#[async_trait]
impl VaultReader for RpcVaultSigner {
    async fn chain_id(&self) -> Result<u64, VaultError> {
        self.reader.chain_id().await
    }

    async fn vault_deployed(&self) -> Result<bool, VaultError> {
        self.reader.vault_deployed().await
    }

    async fn token_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.reader.token_balance_of(account).await
    }

    async fn token_decimals(&self) -> Result<u8, VaultError> {
        self.reader.token_decimals().await
    }

    async fn allowance(&self, owner: Address) -> Result<U256, VaultError> {
        self.reader.allowance(owner).await
    }

    async fn share_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.reader.share_balance_of(account).await
    }

    async fn total_assets(&self) -> Result<U256, VaultError> {
        self.reader.total_assets().await
    }

    async fn total_supply(&self) -> Result<U256, VaultError> {
        self.reader.total_supply().await
    }

    async fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError> {
        self.reader.convert_to_assets(shares).await
    }
}

#[async_trait]
impl VaultWriter for RpcVaultSigner {
    fn account(&self) -> Address {
        self.account
    }

    async fn approve_vault(&self, amount: U256) -> Result<TxHash, VaultError> {
        let token = self.reader.token_contract();
        let pending = token
            .approve(self.reader.vault, amount)
            .from(self.account)
            .send()
            .await
            .map_err(map_contract_error)?;
        confirm(pending).await
    }

    async fn deposit(&self, assets: U256) -> Result<TxHash, VaultError> {
        let vault = self.reader.vault_contract();
        let pending = vault
            .deposit(assets, self.account)
            .from(self.account)
            .send()
            .await
            .map_err(map_contract_error)?;
        confirm(pending).await
    }

    async fn redeem(&self, shares: U256) -> Result<TxHash, VaultError> {
        let vault = self.reader.vault_contract();
        let pending = vault
            .redeem(shares, self.account, self.account)
            .from(self.account)
            .send()
            .await
            .map_err(map_contract_error)?;
        confirm(pending).await
    }

    async fn simulate_yield(&self, amount: U256) -> Result<TxHash, VaultError> {
        let vault = self.reader.vault_contract();
        let pending = vault
            .simulateYield(amount)
            .from(self.account)
            .send()
            .await
            .map_err(map_contract_error)?;
        confirm(pending).await
    }
}

async fn confirm(pending: PendingTransactionBuilder<Ethereum>) -> Result<TxHash, VaultError> {
    let tx_hash = *pending.tx_hash();
    debug!("Waiting for receipt of {}", tx_hash);

    let receipt = pending.get_receipt().await.map_err(map_pending_error)?;
    if !receipt.status() {
        return Err(VaultError::reverted());
    }

    info!("Transaction {} mined in block {:?}", tx_hash, receipt.block_number);
    Ok(receipt.transaction_hash)
}

fn parse_url(rpc_url: &str) -> Result<Url, VaultError> {
    rpc_url
        .parse()
        .map_err(|e| VaultError::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))
}

fn map_transport_error(err: TransportError) -> VaultError {
    match err.as_error_resp() {
        Some(payload) => VaultError::from_rpc_payload(
            payload.code,
            &payload.message,
            payload.data.as_deref().map(|data| data.get()),
        ),
        None => VaultError::Rpc(err.to_string()),
    }
}

fn map_contract_error(err: alloy::contract::Error) -> VaultError {
    match err {
        alloy::contract::Error::TransportError(err) => map_transport_error(err),
        alloy::contract::Error::PendingTransactionError(err) => map_pending_error(err),
        other => VaultError::Rpc(other.to_string()),
    }
}

fn map_pending_error(err: PendingTransactionError) -> VaultError {
    match err {
        PendingTransactionError::TransportError(err) => map_transport_error(err),
        other => VaultError::Rpc(other.to_string()),
    }
}
