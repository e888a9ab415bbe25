//! Ordered parallel stage under load.
//!
//! A producer and a consumer run as separate tasks while the transform
//! sleeps for random amounts of time, so completions arrive scrambled.
//! The consumer must still see every sequence number exactly once and in
//! order, no more than `degree_of_parallelism` transforms may run at once,
//! and no more than `capacity + degree_of_parallelism` blocks may be in
//! flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use pcx_stage::ordered_stage;
use pcx_types::{Block, CancelToken, PipelineConfig};
use rand::{Rng, SeedableRng};

const ITEMS: u64 = 600;

fn tagged(n: u64) -> Block {
    Block::new(n.to_le_bytes().to_vec())
}

fn tag(block: &Block) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&block.payload()[..8]);
    u64::from_le_bytes(raw)
}

async fn run(config: PipelineConfig, seed: u64) {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let emitted = Arc::new(AtomicU64::new(0));

    let (mut input, mut output) = {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        let rng = std::sync::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed));
        ordered_stage(config, CancelToken::new(), move |block: Block| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            let delay = rng.lock().unwrap().gen_range(0..800);
            std::thread::sleep(Duration::from_micros(delay));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(block)
        })
    };

    let producer = {
        let emitted = Arc::clone(&emitted);
        tokio::spawn(async move {
            let limit = config.max_outstanding() as u64;
            for n in 0..ITEMS {
                let sequence = input.submit(tagged(n)).await.unwrap();
                assert_eq!(sequence, n);
                // The consumer records an emission just after its slot is
                // released, so one extra block can be counted here.
                let done = emitted.load(Ordering::SeqCst);
                let in_flight = sequence + 1 - done;
                assert!(in_flight <= limit + 1, "{in_flight} in flight");
            }
            input.complete();
        })
    };

    let mut expected = 0;
    while let Some((sequence, block)) = output.next_output().await.unwrap() {
        assert_eq!(sequence, expected);
        assert_eq!(tag(&block), expected);
        expected += 1;
        emitted.store(expected, Ordering::SeqCst);
    }

    producer.await.unwrap();
    assert_eq!(expected, ITEMS);
    assert!(peak.load(Ordering::SeqCst) <= config.degree_of_parallelism);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_workers_small_queue() {
    run(PipelineConfig::with_parallelism(8).capacity(2), 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn few_workers_large_queue() {
    run(PipelineConfig::with_parallelism(2).capacity(64), 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_worker_single_slot() {
    run(PipelineConfig::with_parallelism(1).capacity(1), 3).await;
}

#[tokio::test]
async fn current_thread_runtime_keeps_order() {
    run(PipelineConfig::with_parallelism(4).capacity(4), 4).await;
}
