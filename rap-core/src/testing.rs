//! Scripted chain and signer fakes plus fixtures for engine tests.
//!
//! `mockall` covers single-call expectations elsewhere; multi-action runs need a chain that
//! keeps state between calls (pending nonce, broadcast history), which these fakes provide.
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use alloy_primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use rap_common::{
    models::{
        asset::Asset,
        intent::{RapIntent, SwapParameters},
        quote::{CrosschainQuote, Quote, QuoteRequest, QuoteResponse, SwapType},
        transaction::{BlockTag, SignedTransaction, TransactionReceipt, TransactionRequest},
        ChainId, Nonce,
    },
    traits::{ChainRpc, Signer},
    EstimateGasError, RpcError, SignerError,
};

pub(crate) const USER: Address = address!("0x5B38Da6a701c568545dCfcB03FcB875f56beddC4");
pub(crate) const ROUTER: Address = address!("0x00000000009726632680FB29d3F7A9734E3010E2");
pub(crate) const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub(crate) const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
pub(crate) const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// How the fake chain answers `wait_for_confirmation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConfirmationMode {
    Success,
    Reverted,
    /// Never resolves; drives confirmation timeouts.
    Hang,
}

#[derive(Debug)]
struct ChainState {
    pending_nonce: HashMap<(Address, ChainId), Nonce>,
    nonce_reads: usize,
    nonce_read_error: Option<RpcError>,
    stall_nonce_reads: bool,
    balances: HashMap<(Address, ChainId), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    allowance_error: Option<RpcError>,
    estimates: HashMap<Address, Result<u64, EstimateGasError>>,
    estimate_calls: Vec<TransactionRequest>,
    broadcast_failures: VecDeque<RpcError>,
    broadcast_attempts: Vec<SignedTransaction>,
    sent: Vec<SignedTransaction>,
    confirmation: ConfirmationMode,
    confirmation_requests: Vec<TxHash>,
    known: HashSet<TxHash>,
    unknown_polls_before_ack: usize,
    ack_polls: usize,
}

pub(crate) struct FakeChain {
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                pending_nonce: HashMap::new(),
                nonce_reads: 0,
                nonce_read_error: None,
                stall_nonce_reads: false,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                allowance_error: None,
                estimates: HashMap::new(),
                estimate_calls: Vec::new(),
                broadcast_failures: VecDeque::new(),
                broadcast_attempts: Vec::new(),
                sent: Vec::new(),
                confirmation: ConfirmationMode::Success,
                confirmation_requests: Vec::new(),
                known: HashSet::new(),
                unknown_polls_before_ack: 0,
                ack_polls: 0,
            }),
        }
    }

    pub(crate) fn with_pending_nonce(
        self,
        address: Address,
        chain_id: ChainId,
        nonce: Nonce,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .pending_nonce
            .insert((address, chain_id), nonce);
        self
    }

    pub(crate) fn with_nonce_read_error(self, error: RpcError) -> Self {
        self.state.lock().unwrap().nonce_read_error = Some(error);
        self
    }

    pub(crate) fn with_stalled_nonce_reads(self) -> Self {
        self.state.lock().unwrap().stall_nonce_reads = true;
        self
    }

    pub(crate) fn with_balance(self, address: Address, chain_id: ChainId, balance: U256) -> Self {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((address, chain_id), balance);
        self
    }

    pub(crate) fn with_allowance(
        self,
        owner: Address,
        spender: Address,
        token: Address,
        amount: U256,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((owner, spender, token), amount);
        self
    }

    pub(crate) fn with_allowance_error(self, error: RpcError) -> Self {
        self.state.lock().unwrap().allowance_error = Some(error);
        self
    }

    /// Scripts the `estimate_gas` answer for calls to `to`. Unscripted targets estimate 100k.
    pub(crate) fn with_estimate(self, to: Address, result: Result<u64, EstimateGasError>) -> Self {
        self.state
            .lock()
            .unwrap()
            .estimates
            .insert(to, result);
        self
    }

    /// Queues broadcast failures, consumed one per `send_raw_transaction` call.
    pub(crate) fn with_broadcast_failures(self, failures: Vec<RpcError>) -> Self {
        self.state
            .lock()
            .unwrap()
            .broadcast_failures
            .extend(failures);
        self
    }

    pub(crate) fn with_confirmation(self, mode: ConfirmationMode) -> Self {
        self.state.lock().unwrap().confirmation = mode;
        self
    }

    pub(crate) fn with_unknown_polls_before_ack(self, polls: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .unknown_polls_before_ack = polls;
        self
    }

    pub(crate) fn nonce_reads(&self) -> usize {
        self.state.lock().unwrap().nonce_reads
    }

    pub(crate) fn estimate_calls(&self) -> Vec<TransactionRequest> {
        self.state
            .lock()
            .unwrap()
            .estimate_calls
            .clone()
    }

    /// Every transaction handed to `send_raw_transaction`, failed attempts included.
    pub(crate) fn broadcast_attempts(&self) -> Vec<SignedTransaction> {
        self.state
            .lock()
            .unwrap()
            .broadcast_attempts
            .clone()
    }

    /// Transactions the node accepted.
    pub(crate) fn sent(&self) -> Vec<SignedTransaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn confirmation_requests(&self) -> Vec<TxHash> {
        self.state
            .lock()
            .unwrap()
            .confirmation_requests
            .clone()
    }

    pub(crate) fn ack_polls(&self) -> usize {
        self.state.lock().unwrap().ack_polls
    }
}

#[async_trait]
impl ChainRpc for FakeChain {
    async fn get_transaction_count(
        &self,
        address: Address,
        chain_id: ChainId,
        _tag: BlockTag,
    ) -> Result<Nonce, RpcError> {
        let (stall, answer) = {
            let mut state = self.state.lock().unwrap();
            state.nonce_reads += 1;
            let answer = match state.nonce_read_error.clone() {
                Some(err) => Err(err),
                None => Ok(state
                    .pending_nonce
                    .get(&(address, chain_id))
                    .copied()
                    .unwrap_or_default()),
            };
            (state.stall_nonce_reads, answer)
        };
        if stall {
            std::future::pending::<()>().await;
        }
        answer
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, EstimateGasError> {
        let mut state = self.state.lock().unwrap();
        state.estimate_calls.push(tx.clone());
        state
            .estimates
            .get(&tx.to)
            .cloned()
            .unwrap_or(Ok(100_000))
    }

    async fn get_balance(
        &self,
        address: Address,
        chain_id: ChainId,
        _tag: BlockTag,
    ) -> Result<U256, RpcError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&(address, chain_id))
            .copied()
            .unwrap_or_default())
    }

    async fn get_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
        _chain_id: ChainId,
    ) -> Result<U256, RpcError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = state.allowance_error.clone() {
            return Err(err);
        }
        Ok(state
            .allowances
            .get(&(owner, spender, token))
            .copied()
            .unwrap_or_default())
    }

    async fn send_raw_transaction(
        &self,
        _chain_id: ChainId,
        tx: &SignedTransaction,
    ) -> Result<TxHash, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.broadcast_attempts.push(tx.clone());
        if let Some(err) = state.broadcast_failures.pop_front() {
            return Err(err);
        }
        state.sent.push(tx.clone());
        state.known.insert(tx.hash);
        Ok(tx.hash)
    }

    async fn wait_for_confirmation(
        &self,
        _chain_id: ChainId,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, RpcError> {
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.confirmation_requests.push(tx_hash);
            state.confirmation
        };
        match mode {
            ConfirmationMode::Success => {
                Ok(TransactionReceipt { tx_hash, block_number: 1, success: true, gas_used: 50_000 })
            }
            ConfirmationMode::Reverted => Ok(TransactionReceipt {
                tx_hash,
                block_number: 1,
                success: false,
                gas_used: 50_000,
            }),
            ConfirmationMode::Hang => std::future::pending().await,
        }
    }

    async fn is_transaction_known(
        &self,
        _chain_id: ChainId,
        tx_hash: TxHash,
    ) -> Result<bool, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.ack_polls += 1;
        Ok(state.ack_polls > state.unknown_polls_before_ack && state.known.contains(&tx_hash))
    }
}

/// Signer whose transaction hash is derived from the request it signed.
pub(crate) struct FakeSigner {
    address: Address,
    watch_only: bool,
    reject: bool,
    signed: Mutex<Vec<TransactionRequest>>,
}

impl FakeSigner {
    pub(crate) fn new(address: Address) -> Self {
        Self { address, watch_only: false, reject: false, signed: Mutex::new(Vec::new()) }
    }

    pub(crate) fn watch_only(address: Address) -> Self {
        Self { watch_only: true, ..Self::new(address) }
    }

    pub(crate) fn rejecting(address: Address) -> Self {
        Self { reject: true, ..Self::new(address) }
    }

    pub(crate) fn signed(&self) -> Vec<TransactionRequest> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Signer for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn is_watch_only(&self) -> bool {
        self.watch_only
    }

    async fn sign_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<SignedTransaction, SignerError> {
        if self.reject {
            return Err(SignerError::Rejected("user denied transaction signature".into()));
        }
        self.signed.lock().unwrap().push(tx.clone());
        let raw = Bytes::from(serde_json::to_vec(tx).unwrap());
        Ok(SignedTransaction {
            chain_id: tx.chain_id,
            nonce: tx.nonce.unwrap(),
            hash: keccak256(&raw),
            raw,
            private: tx.private,
        })
    }
}

pub(crate) fn eth(chain_id: ChainId) -> Asset {
    Asset::native(chain_id, "ETH")
}

pub(crate) fn usdc(chain_id: ChainId) -> Asset {
    Asset::new(USDC, chain_id, "USDC", 6)
}

pub(crate) fn dai(chain_id: ChainId) -> Asset {
    Asset::new(DAI, chain_id, "DAI", 18)
}

pub(crate) fn quote(sell: &Asset, buy: &Asset, sell_amount: U256) -> Quote {
    Quote {
        from: USER,
        chain_id: sell.chain_id,
        sell_token_address: sell.address,
        buy_token_address: buy.address,
        sell_amount,
        buy_amount: sell_amount * U256::from(2u64),
        to: ROUTER,
        data: Bytes::from_static(&[0x12, 0x34, 0x56, 0x78]),
        value: if sell.is_native_asset() { sell_amount } else { U256::ZERO },
        allowance_target: ROUTER,
        swap_type: SwapType::Normal,
        default_gas_limit: None,
        trade_amount_usd: 1_000.0,
        source: "0x".to_string(),
        slippage_bps: 50,
    }
}

pub(crate) fn swap_intent(sell: Asset, buy: Asset, sell_amount: U256) -> RapIntent {
    let quote = quote(&sell, &buy, sell_amount);
    RapIntent::Swap(SwapParameters {
        quote: QuoteResponse::Quote(quote),
        chain_id: sell.chain_id,
        asset_to_sell: sell,
        asset_to_buy: buy,
        sell_amount,
    })
}

pub(crate) fn crosschain_quote(sell: &Asset, buy: &Asset, sell_amount: U256) -> CrosschainQuote {
    CrosschainQuote {
        quote: Quote { swap_type: SwapType::CrossChain, ..quote(sell, buy, sell_amount) },
        to_chain_id: buy.chain_id,
        bridge: "across".to_string(),
        requires_wrapped_input: false,
    }
}

pub(crate) fn crosschain_intent(sell: Asset, buy: Asset, sell_amount: U256) -> RapIntent {
    let quote = crosschain_quote(&sell, &buy, sell_amount);
    RapIntent::CrosschainSwap(SwapParameters {
        quote: QuoteResponse::CrosschainQuote(quote),
        chain_id: sell.chain_id,
        asset_to_sell: sell,
        asset_to_buy: buy,
        sell_amount,
    })
}

/// Quote a provider would answer `request` with: native in, native out, 2.1M gas suggested.
pub(crate) fn claim_bridge_quote(request: &QuoteRequest) -> CrosschainQuote {
    let sell = eth(request.chain_id);
    let buy = eth(request.to_chain_id);
    let mut quote = crosschain_quote(&sell, &buy, request.sell_amount);
    quote.quote.from = request.from;
    quote.quote.slippage_bps = request.slippage_bps;
    quote.quote.default_gas_limit = Some(2_100_000);
    quote
}
