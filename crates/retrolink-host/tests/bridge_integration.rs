//! End-to-end exercise of the bridge and the host loop with many
//! concurrent submitters, without any sockets involved.

use serde_json::json;
use tokio::sync::mpsc;

use retrolink_host::bridge::{bridge_channel, PendingRequest};
use retrolink_host::runtime::HostRuntime;
use retrolink_host::testing::{MachineCall, MockMachine};

/// Pumps frames on a blocking task until the receiver closes, mimicking the
/// emulator's real-time loop.
fn spawn_host_pump(rx: mpsc::Receiver<PendingRequest>) -> std::thread::JoinHandle<MockMachine> {
    std::thread::spawn(move || {
        let mut runtime = HostRuntime::new(rx);
        let mut machine = MockMachine::new();
        loop {
            runtime.process_frame(&mut machine);
            if runtime.is_closed() && runtime.pending_releases() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        machine
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_each_get_their_own_result() {
    let (bridge, rx) = bridge_channel(64);
    let pump = spawn_host_pump(rx);

    let mut handles = Vec::new();
    for code in 65..85 {
        let bridge = bridge.clone();
        handles.push(tokio::spawn(async move {
            let result = bridge
                .submit("keyboard.key_press".into(), json!({"key": code}))
                .await
                .unwrap();
            (code, result)
        }));
    }

    for handle in handles {
        let (code, result) = handle.await.unwrap();
        // Each submitter sees the echo of its own key, not anyone else's.
        assert_eq!(result["key_code"], code);
        assert_eq!(result["status"], "ok");
    }

    drop(bridge);
    let machine = pump.join().unwrap();
    let presses = machine
        .calls
        .iter()
        .filter(|c| matches!(c, MachineCall::KeyPressed(..)))
        .count();
    assert_eq!(presses, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sequential_submissions_apply_in_order() {
    let (bridge, rx) = bridge_channel(8);
    let pump = spawn_host_pump(rx);

    bridge
        .submit("keyboard.matrix".into(), json!({"row": 7, "col": 4}))
        .await
        .unwrap();
    bridge
        .submit(
            "keyboard.matrix".into(),
            json!({"row": 7, "col": 4, "pressed": false}),
        )
        .await
        .unwrap();

    drop(bridge);
    let machine = pump.join().unwrap();

    let matrix_calls: Vec<_> = machine
        .calls
        .iter()
        .filter_map(|c| match c {
            MachineCall::MatrixSet(pos, pressed) => Some((pos.row, pos.col, *pressed)),
            _ => None,
        })
        .collect();
    assert_eq!(matrix_calls, vec![(7, 4, true), (7, 4, false)]);
}

#[tokio::test]
async fn test_undrained_queue_rejects_with_server_busy() {
    // Capacity 1 and no pump: the second submission must bounce.
    let (bridge, _rx) = bridge_channel(1);

    let bridge2 = bridge.clone();
    let _held = tokio::spawn(async move {
        bridge2
            .submit("keyboard.type".into(), json!({"text": "hello"}))
            .await
    });
    tokio::task::yield_now().await;

    let err = bridge
        .submit("machine.ping".into(), json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_tool_travels_back_as_method_not_found() {
    let (bridge, rx) = bridge_channel(8);
    let pump = spawn_host_pump(rx);

    let err = bridge
        .submit("tape.rewind".into(), json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32601);

    drop(bridge);
    pump.join().unwrap();
}
