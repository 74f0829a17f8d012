// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end coordinator scenarios, driven directly through the event
//! channel (no TCP involved).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use dfs_controller::{Config, Controller, Event};
use dfs_protocol::{ClientRequest, ControllerReply, StoreControlMessage};

fn config(cport: u16, r: u16, timeout_ms: u64) -> Config {
    Config {
        cport,
        replication_factor: r,
        timeout_ms,
        rebalance_period_ms: 60_000,
    }
}

/// Joins a fake Store, returning its port's command receiver so the test
/// can assert on what the coordinator sends it.
fn join_store(controller: &Controller, port: u16) -> mpsc::UnboundedReceiver<String> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    controller
        .events()
        .send(Event::StoreJoined { port, commands: cmd_tx })
        .unwrap();
    cmd_rx
}

async fn client_request(controller: &Controller, req: ClientRequest) -> (ControllerReply, mpsc::UnboundedReceiver<ControllerReply>) {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    controller
        .events()
        .send(Event::ClientRequest { req, reply: reply_tx })
        .unwrap();
    let reply = timeout(Duration::from_secs(1), reply_rx.recv())
        .await
        .expect("reply within 1s")
        .expect("reply channel not closed");
    (reply, reply_rx)
}

#[tokio::test]
async fn startup_without_quorum_is_gated() {
    let controller = Controller::spawn(config(0, 3, 1000));
    let _rx = join_store(&controller, 8001);

    let (reply, _rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "a".to_string(),
            size: 4,
        },
    )
    .await;
    assert_eq!(reply, ControllerReply::ErrorNotEnoughDstores);
}

#[tokio::test]
async fn successful_store_then_list() {
    let controller = Controller::spawn(config(0, 2, 1000));
    let _s1 = join_store(&controller, 8001);
    let _s2 = join_store(&controller, 8002);

    let (reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    let ports = match reply {
        ControllerReply::StoreTo(ports) => ports,
        other => panic!("expected StoreTo, got {other:?}"),
    };
    assert_eq!(ports, vec![8001, 8002]);

    for port in ports {
        controller
            .events()
            .send(Event::StoreAck {
                port,
                msg: StoreControlMessage::StoreAck {
                    name: "hello".to_string(),
                },
            })
            .unwrap();
    }

    let completion = timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .expect("completion within 1s")
        .unwrap();
    assert_eq!(completion, ControllerReply::StoreComplete);

    let (reply, _rx) = client_request(&controller, ClientRequest::List).await;
    assert_eq!(reply, ControllerReply::List(vec!["hello".to_string()]));
}

#[tokio::test]
async fn duplicate_store_is_rejected_and_index_unchanged() {
    let controller = Controller::spawn(config(0, 2, 1000));
    let _s1 = join_store(&controller, 8001);
    let _s2 = join_store(&controller, 8002);

    let (_reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    for port in [8001u16, 8002] {
        controller
            .events()
            .send(Event::StoreAck {
                port,
                msg: StoreControlMessage::StoreAck {
                    name: "hello".to_string(),
                },
            })
            .unwrap();
    }
    timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let (reply, _rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 9,
        },
    )
    .await;
    assert_eq!(reply, ControllerReply::ErrorFileAlreadyExists);
}

#[tokio::test]
async fn store_timeout_frees_the_name_for_reuse() {
    let controller = Controller::spawn(config(0, 2, 50));
    let _s1 = join_store(&controller, 8001);
    let _s2 = join_store(&controller, 8002);

    let (_reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    // Only one of the two targets acks; the op should time out silently.
    controller
        .events()
        .send(Event::StoreAck {
            port: 8001,
            msg: StoreControlMessage::StoreAck {
                name: "hello".to_string(),
            },
        })
        .unwrap();

    let nothing = timeout(Duration::from_millis(300), client_rx.recv()).await;
    assert!(nothing.is_err(), "no completion message should ever arrive");

    let (reply, _rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    assert!(matches!(reply, ControllerReply::StoreTo(_)));
}

#[tokio::test]
async fn load_after_store_round_trips_to_a_connected_replica() {
    let controller = Controller::spawn(config(0, 2, 1000));
    let _s1 = join_store(&controller, 8001);
    let _s2 = join_store(&controller, 8002);

    let (_reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    for port in [8001u16, 8002] {
        controller
            .events()
            .send(Event::StoreAck {
                port,
                msg: StoreControlMessage::StoreAck {
                    name: "hello".to_string(),
                },
            })
            .unwrap();
    }
    timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let (reply, _rx) = client_request(
        &controller,
        ClientRequest::Load {
            name: "hello".to_string(),
        },
    )
    .await;
    match reply {
        ControllerReply::LoadFrom { port, size } => {
            assert!(port == 8001 || port == 8002);
            assert_eq!(size, 5);
        }
        other => panic!("expected LoadFrom, got {other:?}"),
    }
}

#[tokio::test]
async fn remove_after_store_completes_and_clears_the_list() {
    let controller = Controller::spawn(config(0, 2, 1000));
    let mut s1 = join_store(&controller, 8001);
    let mut s2 = join_store(&controller, 8002);

    let (_reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "hello".to_string(),
            size: 5,
        },
    )
    .await;
    for port in [8001u16, 8002] {
        controller
            .events()
            .send(Event::StoreAck {
                port,
                msg: StoreControlMessage::StoreAck {
                    name: "hello".to_string(),
                },
            })
            .unwrap();
    }
    timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let (_reply, mut client_rx) = client_request(
        &controller,
        ClientRequest::Remove {
            name: "hello".to_string(),
        },
    )
    .await;

    // The Controller must have sent REMOVE hello to both replicas.
    let cmd1 = timeout(Duration::from_secs(1), s1.recv()).await.unwrap().unwrap();
    let cmd2 = timeout(Duration::from_secs(1), s2.recv()).await.unwrap().unwrap();
    assert_eq!(cmd1, "REMOVE hello");
    assert_eq!(cmd2, "REMOVE hello");

    for port in [8001u16, 8002] {
        controller
            .events()
            .send(Event::StoreAck {
                port,
                msg: StoreControlMessage::RemoveAck {
                    name: "hello".to_string(),
                },
            })
            .unwrap();
    }
    let completion = timeout(Duration::from_secs(1), client_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completion, ControllerReply::RemoveComplete);

    let (reply, _rx) = client_request(&controller, ClientRequest::List).await;
    assert_eq!(reply, ControllerReply::List(vec![]));
}

#[tokio::test]
async fn membership_loss_removes_port_from_future_placement() {
    let controller = Controller::spawn(config(0, 1, 1000));
    let _s1 = join_store(&controller, 8001);

    controller.events().send(Event::StoreLeft { port: 8001 }).unwrap();

    let (reply, _rx) = client_request(
        &controller,
        ClientRequest::Store {
            name: "a".to_string(),
            size: 1,
        },
    )
    .await;
    assert_eq!(reply, ControllerReply::ErrorNotEnoughDstores);
}
