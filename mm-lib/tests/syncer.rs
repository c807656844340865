mod common;

use common::{dec, market_params, memo, processor, Harness, FEE_ASSET};
use mm_lib::config::SyncerConfig;
use mm_lib::handler::Processed;
use mm_lib::operation::{AdminAction, Operation, VoteParams};
use mm_lib::store::{MemoryStore, Store};
use mm_lib::syncer::{EventSource, Syncer};
use mm_lib::types::Output;

use std::sync::{atomic::Ordering, Arc};

fn config(batch_size: i64) -> SyncerConfig {
    SyncerConfig {
        batch_size,
        poll_interval_ms: 10,
        backoff_min_ms: 10,
        backoff_max_ms: 100,
    }
}

/// Builds outputs with a scratch harness and feeds them to a store that only
/// sees them through the syncer.
fn outputs() -> Vec<Output> {
    let mut scratch = Harness::new();
    let mut outputs = Vec::new();

    let make = Operation::ProposalMake(AdminAction::UpsertMarket(market_params("usdt", "cusdt", "1")));
    let proposal = scratch.output("m1", FEE_ASSET, "0.0001", &make);
    let trace_id = proposal.trace_id.clone();
    outputs.push(proposal);
    for voter in ["m1", "m2", "m3"] {
        let vote = Operation::ProposalVote(VoteParams {
            trace_id: trace_id.clone(),
        });
        outputs.push(scratch.output(voter, FEE_ASSET, "0.0001", &vote));
    }
    outputs.push(scratch.raw_output("u1", "usdt", "1", "not an instruction".into()));
    outputs.push(scratch.raw_output("u1", "usdt", "100", memo(&Operation::Supply, "s1")));
    outputs
}

fn syncer(store: &Arc<MemoryStore>, batch_size: i64) -> Syncer {
    Syncer::new(
        config(batch_size),
        Arc::clone(store) as Arc<dyn EventSource>,
        Arc::clone(store) as Arc<dyn Store>,
        Arc::new(processor(Arc::clone(store))),
    )
}

#[tokio::test]
async fn syncs_in_batches_and_advances_checkpoint() {
    let store = Arc::new(MemoryStore::new());
    for output in outputs() {
        store.push_output(output).unwrap();
    }
    let syncer = syncer(&store, 4);

    let first = syncer.sync_once().await.unwrap();
    assert_eq!(first.applied, 4);
    assert_eq!(store.checkpoint().unwrap(), 4);

    let second = syncer.sync_once().await.unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.applied, 1);
    assert_eq!(store.checkpoint().unwrap(), 6);
    assert_eq!(syncer.last_output_id().load(Ordering::Relaxed), 6);

    let market = store.find_market("usdt").unwrap().unwrap();
    assert_eq!(market.total_cash, dec("100"));

    let idle = syncer.sync_once().await.unwrap();
    assert_eq!(idle.total(), 0);
}

#[tokio::test]
async fn failed_output_holds_the_checkpoint() {
    let store = Arc::new(MemoryStore::new());
    for output in outputs() {
        store.push_output(output).unwrap();
    }
    let syncer = syncer(&store, 10);

    // the proposal commits, then the first vote fails
    let source: Arc<dyn EventSource> = Arc::clone(&store) as Arc<dyn EventSource>;
    let first_batch = source.list(0, 1).await.unwrap();
    assert_eq!(first_batch.len(), 1);

    let processor = processor(Arc::clone(&store));
    assert_eq!(processor.process(&first_batch[0]).unwrap(), Processed::Applied);
    store.save_checkpoint(first_batch[0].id).unwrap();

    store.fail_next_commits(1).unwrap();
    assert!(syncer.sync_once().await.is_err());
    assert_eq!(store.checkpoint().unwrap(), 1);

    let resumed = syncer.sync_once().await.unwrap();
    assert_eq!(resumed.total(), 5);
    assert_eq!(store.checkpoint().unwrap(), 6);
    assert!(store.find_market("usdt").unwrap().is_some());
}

#[tokio::test]
async fn replays_outputs_before_a_stale_checkpoint() {
    let store = Arc::new(MemoryStore::new());
    for output in outputs() {
        store.push_output(output).unwrap();
    }
    let syncer = syncer(&store, 10);
    syncer.sync_once().await.unwrap();
    let transfers = store.transfers().unwrap();

    // a crash between commit and checkpoint write
    store.save_checkpoint(3).unwrap();
    let replayed = syncer.sync_once().await.unwrap();
    assert_eq!(replayed.replayed, 2);
    assert_eq!(replayed.skipped, 1);
    assert_eq!(store.transfers().unwrap(), transfers);
}
