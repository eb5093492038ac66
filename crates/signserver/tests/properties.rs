//! Property-based checks of validation determinism and request-id echo.

use std::sync::Arc;

use proptest::prelude::*;
use signserver::config::properties::{
    CERTIFICATE_SUBJECT, INCLUDE_CERTIFICATE_LEVELS, KEY_SEED, SIGNING_ALGORITHM,
};
use signserver::{
    SeedKeyProvider, SignRequest, SigningDispatcher, WorkerConfig, WorkerId, WorkerRegistry,
    WorkerType, validate,
};

fn property_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        SIGNING_ALGORITHM,
        KEY_SEED,
        CERTIFICATE_SUBJECT,
        INCLUDE_CERTIFICATE_LEVELS,
        "UNRELATED",
    ])
}

fn property_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("rsa".to_string()),
        Just("secp256k1".to_string()),
        Just("CN=Signer".to_string()),
        "-?[0-9]{1,3}",
        "[a-zA-Z=, ]{0,12}",
    ]
}

fn config() -> impl Strategy<Value = WorkerConfig> {
    prop::collection::vec((property_name(), property_value()), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect())
}

fn worker_type() -> impl Strategy<Value = WorkerType> {
    prop::sample::select(WorkerType::ALL.to_vec())
}

proptest! {
    #[test]
    fn validation_is_deterministic(config in config(), worker_type in worker_type()) {
        let capabilities = worker_type.capabilities();
        let first = validate(&config, capabilities);
        let second = validate(&config.clone(), capabilities);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unsupported_property_adds_exactly_one_error(
        config in config(),
        value in "[0-9]{1,2}",
    ) {
        let capabilities = WorkerType::DocumentSigner.capabilities();
        let mut base = config;
        base.remove(INCLUDE_CERTIFICATE_LEVELS);
        let before = validate(&base, capabilities);

        let mut broken = base.clone();
        broken.set(INCLUDE_CERTIFICATE_LEVELS, &value);
        let after = validate(&broken, capabilities);

        let expected = "INCLUDE_CERTIFICATE_LEVELS is not supported.".to_string();
        prop_assert_eq!(after.iter().filter(|e| **e == expected).count(), 1);
        prop_assert_eq!(after.len(), before.len() + 1);

        broken.remove(INCLUDE_CERTIFICATE_LEVELS);
        prop_assert_eq!(validate(&broken, capabilities), before);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn request_id_is_echoed(request_id in any::<i32>(), payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let registry = Arc::new(WorkerRegistry::new(Arc::new(SeedKeyProvider)));
        let id = WorkerId::new(5678);
        registry.add(id, WorkerType::DetachedSigner, "Signer", true).unwrap();
        let dispatcher = SigningDispatcher::new(registry);

        let response = runtime
            .block_on(dispatcher.process(&id.into(), SignRequest::new(request_id, payload)))
            .unwrap();
        prop_assert_eq!(response.request_id, request_id);
    }
}
