#![allow(dead_code)]

use mm_lib::config::SystemConfig;
use mm_lib::decoder::{plain, Decoder};
use mm_lib::handler::{Processed, Processor};
use mm_lib::error::ErrorCode;
use mm_lib::operation::{AdminAction, MarketParams, Operation, PriceAttestation, VoteParams};
use mm_lib::oracle::{DisabledOracle, PriceOracle};
use mm_lib::service::worker_pool::WorkerPool;
use mm_lib::store::{MemoryStore, Store};
use mm_lib::types::{Market, OracleSigner, Output, System, Transfer};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub const MEMBERS: [&str; 4] = ["m1", "m2", "m3", "m4"];
pub const THRESHOLD: usize = 3;
pub const FEE_ASSET: &str = "xin";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn system() -> System {
    System::new(&SystemConfig {
        members: MEMBERS.iter().map(|m| m.to_string()).collect(),
        threshold: THRESHOLD,
        genesis_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        legacy_version_floor: 2,
    })
}

pub fn processor(store: Arc<MemoryStore>) -> Processor {
    processor_with_oracle(store, Arc::new(DisabledOracle))
}

pub fn processor_with_oracle(store: Arc<MemoryStore>, oracle: Arc<dyn PriceOracle>) -> Processor {
    Processor::new(Arc::new(system()), store, Decoder::new(2, None), oracle)
}

/// Takes attested prices at face value once at least one signer is
/// registered.
pub struct TrustingOracle;

impl PriceOracle for TrustingOracle {
    fn verify(
        &self,
        attestation: &PriceAttestation,
        signers: &[OracleSigner],
    ) -> Result<Decimal, ErrorCode> {
        if signers.is_empty() {
            return Err(ErrorCode::InvalidArgument);
        }
        Ok(attestation.price)
    }
}

pub fn market_params(asset_id: &str, ctoken_asset_id: &str, price: &str) -> MarketParams {
    MarketParams {
        symbol: asset_id.to_uppercase(),
        asset_id: asset_id.to_string(),
        ctoken_asset_id: ctoken_asset_id.to_string(),
        init_exchange_rate: Decimal::ONE,
        reserve_factor: dec("0.1"),
        liquidation_incentive: dec("0.1"),
        borrow_cap: Decimal::ZERO,
        collateral_factor: dec("0.75"),
        close_factor: dec("0.5"),
        base_rate: dec("0.1"),
        multiplier: dec("0.5"),
        jump_multiplier: Decimal::ZERO,
        kink: Decimal::ZERO,
        price: dec(price),
    }
}

pub fn memo(operation: &Operation, follow_id: &str) -> String {
    plain::encode(operation.kind(), follow_id, &operation.encode_params().unwrap()).unwrap()
}

/// Feeds hand-built outputs through a processor backed by a memory store.
/// Outputs share one timestamp unless the clock is advanced.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub processor: Processor,
    next_id: i64,
    clock_secs: i64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_processor(processor)
    }

    pub fn with_oracle(oracle: Arc<dyn PriceOracle>) -> Self {
        Self::with_processor(|store| processor_with_oracle(store, oracle))
    }

    /// Liquidity checks run on a two-thread worker pool.
    pub fn with_worker_pool() -> Self {
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        Self::with_processor(|store| processor(store).with_worker_pool(pool))
    }

    fn with_processor(build: impl FnOnce(Arc<MemoryStore>) -> Processor) -> Self {
        let store = Arc::new(MemoryStore::new());
        Harness {
            processor: build(Arc::clone(&store)),
            store,
            next_id: 0,
            clock_secs: 3600,
        }
    }

    pub fn advance(&mut self, secs: i64) {
        self.clock_secs += secs;
    }

    /// Timestamp the next output will carry.
    pub fn now(&self) -> DateTime<Utc> {
        system().genesis_time + Duration::seconds(self.clock_secs)
    }

    pub fn raw_output(&mut self, sender: &str, asset_id: &str, amount: &str, memo: String) -> Output {
        self.next_id += 1;
        let id = self.next_id;
        Output {
            id,
            trace_id: format!("00000000-0000-4000-8000-{:012}", id),
            sender: sender.to_string(),
            asset_id: asset_id.to_string(),
            amount: dec(amount),
            memo,
            created_at: self.now(),
        }
    }

    pub fn output(&mut self, sender: &str, asset_id: &str, amount: &str, operation: &Operation) -> Output {
        let follow_id = format!("follow-{}", self.next_id + 1);
        let memo = memo(operation, &follow_id);
        self.raw_output(sender, asset_id, amount, memo)
    }

    pub fn submit(
        &mut self,
        sender: &str,
        asset_id: &str,
        amount: &str,
        operation: Operation,
    ) -> (Output, Processed) {
        let output = self.output(sender, asset_id, amount, &operation);
        let processed = self.processor.process(&output).unwrap();
        (output, processed)
    }

    pub fn propose(&mut self, proposer: &str, action: AdminAction) -> (Output, Processed) {
        self.submit(proposer, FEE_ASSET, "0.0001", Operation::ProposalMake(action))
    }

    pub fn vote(&mut self, voter: &str, trace_id: &str) -> (Output, Processed) {
        self.submit(
            voter,
            FEE_ASSET,
            "0.0001",
            Operation::ProposalVote(VoteParams {
                trace_id: trace_id.to_string(),
            }),
        )
    }

    /// Makes a proposal and votes it through with exactly the threshold.
    pub fn pass(&mut self, action: AdminAction) -> String {
        let (proposal, processed) = self.propose("m1", action);
        assert_eq!(processed, Processed::Applied);
        for voter in &MEMBERS[..THRESHOLD] {
            self.vote(voter, &proposal.trace_id);
        }
        proposal.trace_id
    }

    pub fn add_market(&mut self, asset_id: &str, ctoken_asset_id: &str, price: &str) {
        self.pass(AdminAction::UpsertMarket(market_params(
            asset_id,
            ctoken_asset_id,
            price,
        )));
        assert!(self.store.find_market(asset_id).unwrap().is_some());
    }

    pub fn market(&self, asset_id: &str) -> Market {
        self.store.find_market(asset_id).unwrap().unwrap()
    }

    pub fn transfers(&self, output: &Output) -> Vec<Transfer> {
        self.store.list_transfers(output.id).unwrap()
    }

    /// The single transfer `output` produced to `asset_id`.
    pub fn transfer_of(&self, output: &Output, asset_id: &str) -> Transfer {
        let matching: Vec<Transfer> = self
            .transfers(output)
            .into_iter()
            .filter(|t| t.asset_id == asset_id)
            .collect();
        assert_eq!(matching.len(), 1, "transfers of {}: {:?}", asset_id, matching);
        matching.into_iter().next().unwrap()
    }
}
