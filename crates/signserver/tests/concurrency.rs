//! Per-worker isolation: a slow signer on one worker never holds up another
//! worker, reloads publish atomically, and an in-flight request keeps the
//! configuration it was admitted under.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::Result;
use signserver::config::properties::{INCLUDE_CERTIFICATE_LEVELS, KEY_SEED};
use signserver::signing::Secp256k1Signer;
use signserver::{
    CryptoSigner, KeyProvider, SignRequest, SignServerError, SigningDispatcher, StatusReporter,
    WorkerConfig, WorkerId, WorkerRegistry, WorkerType,
};

const SLOW: WorkerId = WorkerId::new(1);
const FAST: WorkerId = WorkerId::new(2);

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }
}

/// Counts calls and, when gated, parks inside `sign` until the gate opens.
struct ProbeSigner {
    inner: Secp256k1Signer,
    gate: Option<Arc<Gate>>,
    calls: Arc<AtomicUsize>,
}

impl CryptoSigner for ProbeSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        self.inner.sign(data)
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.inner.public_key_bytes()
    }

    fn algorithm(&self) -> &str {
        self.inner.algorithm()
    }
}

#[derive(Default)]
struct ProbeProvider {
    gate: Arc<Gate>,
    calls: Arc<AtomicUsize>,
}

impl KeyProvider for ProbeProvider {
    fn activate(&self, worker_name: &str, config: &WorkerConfig) -> Result<Arc<dyn CryptoSigner>> {
        let seed = config
            .get(KEY_SEED)
            .ok_or_else(|| anyhow::anyhow!("no seed"))?;
        Ok(Arc::new(ProbeSigner {
            inner: Secp256k1Signer::from_seed(seed)?,
            gate: (worker_name == "Slow").then(|| self.gate.clone()),
            calls: self.calls.clone(),
        }))
    }
}

fn setup() -> (Arc<ProbeProvider>, Arc<WorkerRegistry>) {
    let provider = Arc::new(ProbeProvider::default());
    let registry = Arc::new(WorkerRegistry::new(provider.clone()));
    registry.add(SLOW, WorkerType::DocumentSigner, "Slow", true).unwrap();
    registry.add(FAST, WorkerType::DocumentSigner, "Fast", true).unwrap();
    (provider, registry)
}

async fn wait_for_calls(calls: &AtomicUsize, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while calls.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("signer was never reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_worker_does_not_block_other_workers() {
    let (provider, registry) = setup();
    let dispatcher = SigningDispatcher::new(registry.clone());

    let slow = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move {
            dispatcher
                .process(&SLOW.into(), SignRequest::new(1, b"slow".to_vec()))
                .await
        }
    });
    wait_for_calls(&provider.calls, 1).await;

    let fast = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.process(&FAST.into(), SignRequest::new(2, b"fast".to_vec())),
    )
    .await
    .expect("fast worker was blocked by slow worker")
    .unwrap();
    assert_eq!(fast.request_id, 2);

    // No lock on the slow worker is held while its signer runs.
    registry.configs().set(SLOW, "NOTE", "busy").unwrap();
    registry.reload(SLOW).unwrap();
    assert!(StatusReporter::new(registry.clone()).status(&SLOW.into()).unwrap().is_healthy());
    assert!(!slow.is_finished());

    provider.gate.open();
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.request_id, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn in_flight_request_keeps_its_admitted_configuration() {
    let (provider, registry) = setup();
    let dispatcher = SigningDispatcher::new(registry.clone());

    let in_flight = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move {
            dispatcher
                .process(&SLOW.into(), SignRequest::new(7, b"doc".to_vec()))
                .await
        }
    });
    wait_for_calls(&provider.calls, 1).await;

    registry.configs().set(SLOW, INCLUDE_CERTIFICATE_LEVELS, "2").unwrap();
    registry.reload(SLOW).unwrap();
    provider.gate.open();

    let admitted = in_flight.await.unwrap().unwrap();
    assert_eq!(admitted.request_id, 7);

    let refused = dispatcher
        .process(&SLOW.into(), SignRequest::new(8, b"doc".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(refused, SignServerError::Misconfigured { .. }));
}

#[tokio::test]
async fn misconfigured_worker_never_reaches_the_signer() {
    let (provider, registry) = setup();
    let dispatcher = SigningDispatcher::new(registry.clone());

    registry.configs().set(FAST, INCLUDE_CERTIFICATE_LEVELS, "2").unwrap();
    registry.reload(FAST).unwrap();

    for request_id in 0..5 {
        let error = dispatcher
            .process(&FAST.into(), SignRequest::new(request_id, b"doc".to_vec()))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Worker is misconfigured"));
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn readers_never_observe_a_half_applied_reload() {
    let (_provider, registry) = setup();
    let broken = vec![
        "Missing required property: KEY_SEED.".to_string(),
        "INCLUDE_CERTIFICATE_LEVELS is not supported.".to_string(),
    ];

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..200 {
                let configs = registry.configs();
                if round % 2 == 0 {
                    configs.set(FAST, INCLUDE_CERTIFICATE_LEVELS, "2").unwrap();
                    configs.remove(FAST, KEY_SEED).unwrap();
                } else {
                    configs.remove(FAST, INCLUDE_CERTIFICATE_LEVELS).unwrap();
                    configs.set(FAST, KEY_SEED, "seed").unwrap();
                }
                registry.reload(FAST).unwrap();
            }
        });

        for _ in 0..2 {
            scope.spawn(|| {
                let reporter = StatusReporter::new(registry.clone());
                for _ in 0..500 {
                    let errors = reporter.status(&FAST.into()).unwrap().fatal_errors;
                    assert!(
                        errors.is_empty() || errors == broken,
                        "observed partial state: {errors:?}"
                    );
                }
            });
        }
    });
}
