#[cfg(test)]
mod tests {
    use crate::config::{Settings, StrategyDocument};
    use crate::errors::{ControllerError, StrategyError};
    use crate::strategy::{ExecutorSpec, HttpMethod};
    use serde_json::json;
    use std::time::Duration;

    fn parse(document: serde_json::Value) -> StrategyDocument {
        StrategyDocument::parse(&document.to_string(), &Settings::default()).unwrap()
    }

    #[test]
    fn test_missing_strategies_is_fatal() {
        let err = StrategyDocument::parse(r#"{ "settings": {} }"#, &Settings::default()).unwrap_err();
        assert!(matches!(err, ControllerError::ConfigError { .. }));
        assert!(err.to_string().contains("'strategies'"));
    }

    #[test]
    fn test_strategies_not_a_list_is_fatal() {
        let err = StrategyDocument::parse(r#"{ "strategies": {} }"#, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("must be a list"));
    }

    #[test]
    fn test_invalid_document_is_fatal() {
        assert!(StrategyDocument::parse("[1, 2]", &Settings::default()).is_err());
        assert!(StrategyDocument::parse("{ broken", &Settings::default()).is_err());
    }

    #[test]
    fn test_parse_in_process_and_http() {
        let document = parse(json!({
            "context": { "params": { "lookback": 20 }, "secrets": { "api_key": "ctx" } },
            "strategies": [
                {
                    "id": "pairs",
                    "interval_sec": 60,
                    "params": { "z": 2.0 },
                    "secrets": { "token": "abc" },
                    "executor": { "type": "python", "module": "algorithms.dummy_test", "entry_name": "DummyTest" }
                },
                {
                    "id": "remote",
                    "interval_sec": 5,
                    "enabled": false,
                    "executor": {
                        "type": "HTTP",
                        "url": "http://localhost:8080/tick",
                        "method": "get",
                        "timeout_sec": 1.5,
                        "headers": { "X-Api-Key": "k" },
                        "payload": { "id": "{{strategy_id}}" }
                    }
                }
            ]
        }));

        assert!(document.rejected.is_empty());
        assert_eq!(document.strategies.len(), 2);
        assert_eq!(document.enabled().count(), 1);
        assert_eq!(document.context.params["lookback"], 20);
        assert_eq!(document.context.secrets["api_key"], "ctx");

        let pairs = document.get("pairs").unwrap();
        assert_eq!(pairs.interval_sec, 60);
        assert!(pairs.enabled);
        assert_eq!(pairs.params["z"], 2.0);
        assert_eq!(pairs.secrets["token"], "abc");
        assert_eq!(
            pairs.executor,
            ExecutorSpec::in_process("algorithms.dummy_test", "DummyTest")
        );

        let remote = document.get("remote").unwrap();
        assert!(!remote.enabled);
        let ExecutorSpec::Http(spec) = &remote.executor else {
            panic!("expected http executor");
        };
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.timeout, Duration::from_millis(1500));
        assert_eq!(spec.headers["X-Api-Key"], "k");
        assert_eq!(spec.payload_template, Some(json!({"id": "{{strategy_id}}"})));
    }

    #[test]
    fn test_http_defaults_from_settings() {
        let settings = Settings {
            http_timeout_secs: 7.0,
            ..Settings::default()
        };
        let text = json!({
            "strategies": [
                { "id": "r", "interval_sec": 1, "executor": { "type": "http", "url": "https://example.com/" } }
            ]
        })
        .to_string();
        let document = StrategyDocument::parse(&text, &settings).unwrap();
        let ExecutorSpec::Http(spec) = &document.strategies[0].executor else {
            panic!("expected http executor");
        };
        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.timeout, Duration::from_secs(7));
        assert!(spec.headers.is_empty());
        assert!(spec.payload_template.is_none());
    }

    #[test]
    fn test_missing_interval_disables_only_that_strategy() {
        let document = parse(json!({
            "strategies": [
                { "id": "broken", "executor": { "type": "python", "module": "m", "entry": "e" } },
                { "id": "fine", "interval_sec": 1, "executor": { "type": "python", "module": "m", "entry": "e" } }
            ]
        }));

        assert_eq!(document.strategies.len(), 1);
        assert_eq!(document.strategies[0].id, "fine");
        assert_eq!(
            document.rejected,
            vec![StrategyError::MissingField {
                id: "broken".to_string(),
                field: "interval_sec".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejected_descriptors() {
        let document = parse(json!({
            "strategies": [
                "not an object",
                { "interval_sec": 1, "executor": { "type": "python", "module": "m", "entry": "e" } },
                { "id": "zero", "interval_sec": 0, "executor": { "type": "python", "module": "m", "entry": "e" } },
                { "id": "frac", "interval_sec": 1.5, "executor": { "type": "python", "module": "m", "entry": "e" } },
                { "id": "grpc", "interval_sec": 1, "executor": { "type": "grpc" } },
                { "id": "mixed", "interval_sec": 1, "executor": { "type": "python", "module": "m", "entry": "e", "url": "http://x" } },
                { "id": "two", "interval_sec": 1, "executor": { "type": "python", "module": "m", "entry": "e", "class": "C" } },
                { "id": "noentry", "interval_sec": 1, "executor": { "type": "python", "module": "m" } },
                { "id": "nourl", "interval_sec": 1, "executor": { "type": "http" } },
                { "id": "ftp", "interval_sec": 1, "executor": { "type": "http", "url": "ftp://x/" } },
                { "id": "put", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "method": "PUT" } },
                { "id": "hdr", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "headers": { "bad name": "v" } } },
                { "id": "httpmod", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "module": "m" } },
                { "id": "secret", "interval_sec": 1, "secrets": { "k": 1 }, "executor": { "type": "python", "module": "m", "entry": "e" } },
                { "id": "ok", "interval_sec": 1, "executor": { "type": "in_process", "module": "m", "function": "f" } },
                { "id": "ok", "interval_sec": 2, "executor": { "type": "python", "module": "m", "entry": "e" } }
            ]
        }));

        assert_eq!(document.strategies.len(), 1);
        assert_eq!(document.strategies[0].interval_sec, 1);
        assert_eq!(
            document.strategies[0].executor,
            ExecutorSpec::in_process("m", "f")
        );

        let rejected = &document.rejected;
        assert_eq!(rejected.len(), 15);
        assert_eq!(rejected[0], StrategyError::NotAnObject { index: 0 });
        assert_eq!(
            rejected[1],
            StrategyError::MissingField {
                id: "strategies[1]".to_string(),
                field: "id".to_string(),
            }
        );
        assert!(matches!(&rejected[2], StrategyError::InvalidField { field, .. } if field == "interval_sec"));
        assert!(matches!(&rejected[3], StrategyError::InvalidField { field, .. } if field == "interval_sec"));
        assert_eq!(
            rejected[4],
            StrategyError::UnknownExecutorType {
                id: "grpc".to_string(),
                kind: "grpc".to_string(),
            }
        );
        assert!(matches!(&rejected[5], StrategyError::AmbiguousExecutor { id, .. } if id == "mixed"));
        assert!(matches!(&rejected[6], StrategyError::AmbiguousExecutor { id, .. } if id == "two"));
        assert!(matches!(&rejected[7], StrategyError::MissingField { field, .. } if field == "executor.entry"));
        assert!(matches!(&rejected[8], StrategyError::MissingField { field, .. } if field == "executor.url"));
        assert!(matches!(&rejected[9], StrategyError::InvalidField { field, .. } if field == "executor.url"));
        assert!(matches!(&rejected[10], StrategyError::InvalidField { field, .. } if field == "executor.method"));
        assert!(matches!(&rejected[11], StrategyError::InvalidField { field, .. } if field == "executor.headers"));
        assert!(matches!(&rejected[12], StrategyError::AmbiguousExecutor { id, .. } if id == "httpmod"));
        assert!(matches!(&rejected[13], StrategyError::InvalidField { field, .. } if field == "secrets"));
        assert_eq!(rejected[14], StrategyError::DuplicateId { id: "ok".to_string() });
    }

    #[test]
    fn test_unrepresentable_timeout_disables_only_that_strategy() {
        let document = parse(json!({
            "strategies": [
                { "id": "huge", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "timeout_sec": 1e30 } },
                { "id": "negative", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "timeout_sec": -1 } },
                { "id": "zero", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "timeout_sec": 0 } },
                { "id": "fine", "interval_sec": 1, "executor": { "type": "http", "url": "http://x/", "timeout_sec": 30 } }
            ]
        }));

        assert_eq!(document.strategies.len(), 1);
        assert_eq!(document.strategies[0].id, "fine");
        assert_eq!(document.rejected.len(), 3);
        for rejected in &document.rejected {
            assert!(
                matches!(rejected, StrategyError::InvalidField { field, .. } if field == "executor.timeout_sec"),
                "{:?}",
                rejected
            );
        }
    }

    #[test]
    fn test_invalid_default_timeout_is_fatal() {
        let settings = Settings {
            http_timeout_secs: 1e30,
            ..Settings::default()
        };
        let err = StrategyDocument::parse(r#"{ "strategies": [] }"#, &settings).unwrap_err();
        assert!(matches!(err, ControllerError::ConfigError { .. }));
    }
}
