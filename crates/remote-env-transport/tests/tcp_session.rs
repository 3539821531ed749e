//! End-to-end sessions over real sockets.

use std::time::Duration;

use remote_env_core::{
    ChannelProvider, ClientConfig, Credentials, MasterService, RpcError, StatusCode,
    StepOutcome, WorkerService,
    outcome::Info,
    types::{InitialStateRequest, StartGameRequest, StartGameResponse, StepRequest},
};
use remote_env_session::{EnvError, RemoteEnv};
use remote_env_transport::{
    MemoryProvider, RpcRequest, RpcResponse, Services, TcpChannelProvider, serve,
    protocol::{decode_frame, encode_frame},
    tcp::TcpChannel,
};
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};
use tokio_test::{assert_err, assert_ok};

async fn spawn_services(services: Services) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(serve(listener, services));
    address
}

/// Master and worker on separate listeners, backed by one simulated service.
async fn spawn_cluster(provider: &MemoryProvider) -> (String, String) {
    let worker_address = spawn_services(
        Services::new().with_worker(provider.open_worker("worker").unwrap()),
    )
    .await;
    let master_address = spawn_services(
        Services::new().with_master(provider.open_master("master").unwrap()),
    )
    .await;
    (master_address, worker_address)
}

fn config(master_address: &str) -> ClientConfig {
    ClientConfig::new("alice", "tok123")
        .master_address("default", master_address)
        .ready_timeout(Some(Duration::from_secs(5)))
}

#[tokio::test]
async fn test_episode_over_tcp() {
    let provider = MemoryProvider::new();
    provider.set_episode_length(3);
    let (master_address, worker_address) = spawn_cluster(&provider).await;
    provider.assign("g1", &worker_address);

    let mut env = assert_ok!(
        RemoteEnv::connect(config(&master_address), TcpChannelProvider::default()).await
    );
    let observation = assert_ok!(env.reset().await);
    assert_eq!(observation, json!({ "steps": 0 }));
    assert_eq!(env.session_id(), Some("g1"));

    let mut steps = 0;
    loop {
        let outcome = assert_ok!(env.step(steps % 19).await);
        steps += 1;
        assert_eq!(outcome.observation, json!({ "steps": steps }));
        if outcome.done {
            break;
        }
    }
    assert_eq!(steps, 3);
    assert!(!env.is_active());
    assert!(!provider.is_session_live("g1"));

    env.close().await;
}

#[tokio::test]
async fn test_fatal_status_crosses_the_wire() {
    let provider = MemoryProvider::new();
    let (master_address, worker_address) = spawn_cluster(&provider).await;
    provider.assign("g1", &worker_address);

    let mut env = assert_ok!(
        RemoteEnv::connect(config(&master_address), TcpChannelProvider::default()).await
    );
    assert_ok!(env.reset().await);

    provider.push_failure(RpcError::failed_precondition("session expired"));
    let err = assert_err!(env.step(0).await);
    assert!(matches!(err, EnvError::Rpc(_)));
    assert_eq!(err.status_code(), Some(StatusCode::FailedPrecondition));
}

#[tokio::test]
async fn test_scripted_result_over_tcp() {
    let provider = MemoryProvider::new();
    let (master_address, worker_address) = spawn_cluster(&provider).await;
    provider.assign("g1", &worker_address);
    provider.push_outcome(StepOutcome::new(json!([0, 0]), 0.0, false, Info::new()));
    provider.push_outcome(StepOutcome::new(json!([1, 1]), 1.0, true, Info::new()));

    let mut env = assert_ok!(
        RemoteEnv::connect(config(&master_address), TcpChannelProvider::default()).await
    );
    assert_eq!(assert_ok!(env.reset().await), json!([0, 0]));

    let outcome = assert_ok!(env.step(3).await);
    assert_eq!(outcome.observation, json!([1, 1]));
    assert!(outcome.done);
    assert!(!env.is_active());
}

#[tokio::test]
async fn test_missing_service_is_unimplemented() {
    let provider = MemoryProvider::new();
    let address = spawn_services(
        Services::new().with_master(provider.open_master("master").unwrap()),
    )
    .await;

    let channel = assert_ok!(TcpChannel::connect(&address, Duration::from_millis(10)).await);
    let response = assert_ok!(
        channel
            .call(&RpcRequest::GetEnvResult(InitialStateRequest::new(
                "v2.3",
                "g1",
                &Credentials::new("alice", "tok123"),
            )))
            .await
    );
    let err = assert_err!(response.into_env_result());
    assert_eq!(err.code(), Some(StatusCode::Unimplemented));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_channel_reconnects_after_peer_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        // First connection is dropped mid-request, later ones are answered.
        let mut accepted = 0;
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            accepted += 1;
            let (read, mut writer) = stream.into_split();
            let mut reader = BufReader::new(read);
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                continue;
            }
            if accepted == 1 {
                continue;
            }
            let request: RpcRequest = decode_frame(&line).unwrap();
            assert!(matches!(request, RpcRequest::StartGame(_)));
            let response = RpcResponse::GameStarted(StartGameResponse {
                session_id: "g2".to_string(),
                worker_address: "w:2".to_string(),
            });
            writer
                .write_all(encode_frame(&response).unwrap().as_bytes())
                .await
                .unwrap();
        }
    });

    let provider = TcpChannelProvider::default();
    let master = assert_ok!(provider.connect_master(&address).await);
    let request = StartGameRequest::new("v2.3", &Credentials::new("alice", "tok123"));

    let err = assert_err!(master.start_game(request.clone()).await);
    assert!(!err.is_fatal());

    let assignment = assert_ok!(master.start_game(request).await);
    assert_eq!(assignment.session_id, "g2");
    master.close().await;
}

#[tokio::test]
async fn test_closed_channel_rejects_requests() {
    let provider = MemoryProvider::new();
    let (_, worker_address) = spawn_cluster(&provider).await;

    let worker = assert_ok!(
        TcpChannelProvider::default()
            .connect_worker(&worker_address)
            .await
    );
    worker.close().await;
    worker.close().await;

    let request = StepRequest::new("v2.3", "g1", &Credentials::new("alice", "tok123"), 0);
    assert!(matches!(
        worker.step(&request).await,
        Err(RpcError::ChannelClosed)
    ));
}

#[tokio::test]
async fn test_unresolvable_host_fails_fast() {
    let connect = TcpChannel::connect("no-such-host.invalid:50051", Duration::from_millis(50));

    let result = assert_ok!(tokio::time::timeout(Duration::from_secs(10), connect).await);
    assert!(result.is_err());
}
