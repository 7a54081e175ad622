use droidpilot::daemon::bridge::{BridgeError, EngineBridge, EngineConfig, NativeEngine};
use std::sync::Arc;

/// Panics in every call
struct FaultyEngine;

impl NativeEngine for FaultyEngine {
    fn start(&self, _config: &EngineConfig) -> Result<(), String> {
        panic!("fault in start");
    }

    fn stop(&self) -> Result<(), String> {
        panic!("fault in stop");
    }

    fn status(&self) -> String {
        panic!("{}", String::from("fault in status"));
    }

    fn send_message(&self, _message: &str) -> String {
        panic!("fault in send_message");
    }

    fn version(&self) -> String {
        panic!("fault in version");
    }
}

/// Answers with payloads that are not JSON documents
struct GarbledEngine;

impl NativeEngine for GarbledEngine {
    fn start(&self, _config: &EngineConfig) -> Result<(), String> {
        Ok(())
    }

    fn stop(&self) -> Result<(), String> {
        Ok(())
    }

    fn status(&self) -> String {
        "running=yes".to_string()
    }

    fn send_message(&self, _message: &str) -> String {
        "{\"success\":".to_string()
    }

    fn version(&self) -> String {
        "0.0.1".to_string()
    }
}

fn assert_fault<T: std::fmt::Debug>(result: Result<T, BridgeError>, expected: &'static str) {
    match result {
        Err(BridgeError::Fault { call, message }) => {
            assert_eq!(call, expected);
            assert_eq!(message, format!("fault in {expected}"));
        }
        other => panic!("Expected a fault in {expected}, got {other:?}"),
    }
}

#[test]
fn test_every_call_is_fault_isolated() {
    let bridge = EngineBridge::new(Arc::new(FaultyEngine));

    assert_fault(bridge.start(&EngineConfig::default()), "start");
    assert_fault(bridge.stop(), "stop");
    assert_fault(bridge.status(), "status");
    assert_fault(bridge.send_message("hi"), "send_message");
    assert_fault(bridge.version(), "version");

    // The bridge stays usable after repeated faults
    assert_fault(bridge.version(), "version");
}

#[test]
fn test_non_json_payloads_are_malformed() {
    let bridge = EngineBridge::new(Arc::new(GarbledEngine));

    assert!(matches!(
        bridge.status(),
        Err(BridgeError::Malformed { call: "status", .. })
    ));
    assert!(matches!(
        bridge.send_message("hi"),
        Err(BridgeError::Malformed { call: "send_message", .. })
    ));
    assert_eq!(bridge.version().unwrap(), "0.0.1");
}

#[test]
fn test_status_json_folds_errors_into_document() {
    let faulty = EngineBridge::new(Arc::new(FaultyEngine));
    let doc: serde_json::Value = serde_json::from_str(&faulty.status_json()).unwrap();
    assert_eq!(doc["running"], false);
    assert!(doc["error"]
        .as_str()
        .unwrap()
        .starts_with("native fault in status"));

    let garbled = EngineBridge::new(Arc::new(GarbledEngine));
    let doc: serde_json::Value = serde_json::from_str(&garbled.status_json()).unwrap();
    assert!(doc["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed status payload"));
}
