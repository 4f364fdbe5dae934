//! End-to-end tests over a real TCP connection, speaking raw protocol bytes
//! and asserting on the exact reply encoding.

use std::sync::Arc;
use std::time::Duration;

use oxidis::config::Config;
use oxidis::pubsub;
use oxidis::resp::RespValue;
use oxidis::server;
use oxidis::storage::memory::MemoryBackend;
use oxidis::store;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn start_server(config: Config) {
    let store = store::shared(Box::new(MemoryBackend::new()));
    let broker = pubsub::shared();
    let config = Arc::new(config);
    tokio::spawn(async move {
        let _ = server::run_server(store, config, broker).await;
    });
}

fn config_on(port: u16) -> Config {
    Config {
        port,
        ..Config::default()
    }
}

async fn connect(port: u16) -> TcpStream {
    for attempt in 0..50 {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => return stream,
            Err(_) if attempt < 49 => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(e) => panic!("failed to connect to test server: {e}"),
        }
    }
    unreachable!()
}

fn encode(parts: &[&str]) -> Vec<u8> {
    RespValue::array(parts.iter().map(|p| RespValue::bulk(*p)).collect()).serialize()
}

async fn send(stream: &mut TcpStream, parts: &[&str]) {
    stream.write_all(&encode(parts)).await.unwrap();
}

async fn expect(stream: &mut TcpStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for reply")
        .unwrap();
    assert_eq!(
        buf,
        expected,
        "reply mismatch: got {:?}, wanted {:?}",
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected)
    );
}

async fn roundtrip(stream: &mut TcpStream, parts: &[&str], expected: &[u8]) {
    send(stream, parts).await;
    expect(stream, expected).await;
}

#[tokio::test]
async fn string_round_trip() {
    let port = 17480;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SET", "k", "value"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["GET", "k"], b"$5\r\nvalue\r\n").await;
    roundtrip(&mut conn, &["GET", "missing"], b"$-1\r\n").await;
    roundtrip(&mut conn, &["DEL", "k"], b":1\r\n").await;
    roundtrip(&mut conn, &["GET", "k"], b"$-1\r\n").await;
}

#[tokio::test]
async fn conditional_set_and_option_conflicts() {
    let port = 17481;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SET", "k", "old"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["SET", "k", "new", "NX"], b"$-1\r\n").await;
    roundtrip(
        &mut conn,
        &["SET", "k", "new", "NX", "XX"],
        b"-ERR invalid options sent to 'set' command\r\n",
    )
    .await;
    // Neither refused write touched the stored value.
    roundtrip(&mut conn, &["GET", "k"], b"$3\r\nold\r\n").await;
    roundtrip(&mut conn, &["SET", "other", "v", "XX"], b"$-1\r\n").await;
    roundtrip(&mut conn, &["EXISTS", "other"], b":0\r\n").await;
}

#[tokio::test]
async fn ttl_lifecycle() {
    let port = 17482;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SET", "k", "v", "EX", "100"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["PERSIST", "k"], b":1\r\n").await;
    roundtrip(&mut conn, &["EXPIRETIME", "k"], b":-1\r\n").await;
    roundtrip(&mut conn, &["PERSIST", "k"], b":0\r\n").await;
    roundtrip(&mut conn, &["EXPIRETIME", "nosuch"], b":-2\r\n").await;

    // An expiry in the past removes the key on its next read.
    roundtrip(&mut conn, &["PEXPIREAT", "k", "1000"], b":1\r\n").await;
    roundtrip(&mut conn, &["GET", "k"], b"$-1\r\n").await;
    roundtrip(&mut conn, &["EXISTS", "k"], b":0\r\n").await;
}

#[tokio::test]
async fn list_operations() {
    let port = 17483;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["RPUSH", "k", "a", "b"], b":2\r\n").await;
    roundtrip(&mut conn, &["LPUSH", "k", "c"], b":3\r\n").await;
    roundtrip(&mut conn, &["LINDEX", "k", "0"], b"$1\r\nc\r\n").await;
    roundtrip(&mut conn, &["LINDEX", "k", "-1"], b"$1\r\nb\r\n").await;
    roundtrip(
        &mut conn,
        &["LINDEX", "k", "5"],
        b"-ERR index out of range\r\n",
    )
    .await;
    roundtrip(&mut conn, &["LPOP", "k"], b"$1\r\nc\r\n").await;
    roundtrip(&mut conn, &["LLEN", "k"], b":2\r\n").await;
    roundtrip(
        &mut conn,
        &["LPUSHX", "nosuch", "x"],
        b"-ERR key does not exist\r\n",
    )
    .await;

    // Popping the last element deletes the key.
    roundtrip(&mut conn, &["RPOP", "k"], b"$1\r\nb\r\n").await;
    roundtrip(&mut conn, &["RPOP", "k"], b"$1\r\na\r\n").await;
    roundtrip(&mut conn, &["EXISTS", "k"], b":0\r\n").await;
    roundtrip(&mut conn, &["RPOP", "k"], b"$-1\r\n").await;
}

#[tokio::test]
async fn set_membership() {
    let port = 17484;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SADD", "k", "m", "m"], b":1\r\n").await;
    roundtrip(&mut conn, &["SADD", "k", "m"], b":0\r\n").await;
    roundtrip(&mut conn, &["SMEMBERS", "k"], b"*1\r\n$1\r\nm\r\n").await;
    roundtrip(&mut conn, &["SMEMBERS", "nosuch"], b"*0\r\n").await;
}

#[tokio::test]
async fn type_mismatch_is_an_error() {
    let port = 17485;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SET", "k", "v"], b"+OK\r\n").await;
    roundtrip(
        &mut conn,
        &["LPUSH", "k", "a"],
        b"-ERR value stored at key is not a list\r\n",
    )
    .await;
    roundtrip(&mut conn, &["GET", "k"], b"$1\r\nv\r\n").await;
}

#[tokio::test]
async fn copy_semantics() {
    let port = 17486;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["SET", "a", "src"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["SET", "b", "dst"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["COPY", "a", "b"], b":0\r\n").await;
    roundtrip(&mut conn, &["GET", "b"], b"$3\r\ndst\r\n").await;
    roundtrip(&mut conn, &["COPY", "a", "b", "REPLACE"], b":1\r\n").await;
    roundtrip(&mut conn, &["GET", "b"], b"$3\r\nsrc\r\n").await;
    // COPY is a copy, not a move: the source stays.
    roundtrip(&mut conn, &["GET", "a"], b"$3\r\nsrc\r\n").await;
}

#[tokio::test]
async fn unknown_command() {
    let port = 17487;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["FOO", "bar"], b"-ERR Invalid command: FOO\r\n").await;
}

#[tokio::test]
async fn protocol_error_keeps_connection_alive() {
    let port = 17488;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    conn.write_all(b"!bogus\r\n").await.unwrap();
    expect(
        &mut conn,
        b"-ERR Protocol error: unknown frame type byte '!'\r\n",
    )
    .await;

    // Same connection still serves commands.
    roundtrip(&mut conn, &["SET", "k", "v"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["GET", "k"], b"$1\r\nv\r\n").await;
}

#[tokio::test]
async fn pipelined_commands_in_one_write() {
    let port = 17489;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    let mut batch = encode(&["SET", "k", "v"]);
    batch.extend_from_slice(&encode(&["GET", "k"]));
    conn.write_all(&batch).await.unwrap();
    expect(&mut conn, b"+OK\r\n$1\r\nv\r\n").await;
}

#[tokio::test]
async fn publish_subscribe_fanout() {
    let port = 17490;
    start_server(config_on(port));
    let mut alice = connect(port).await;
    let mut bob = connect(port).await;
    let mut publisher = connect(port).await;

    let sub_ack = b"*3\r\n$9\r\nsubscribe\r\n$2\r\nch\r\n:1\r\n";
    roundtrip(&mut alice, &["SUBSCRIBE", "ch"], sub_ack).await;
    roundtrip(&mut bob, &["SUBSCRIBE", "ch"], sub_ack).await;

    roundtrip(&mut publisher, &["PUBLISH", "ch", "hi"], b":2\r\n").await;
    let message = b"*3\r\n$7\r\nmessage\r\n$2\r\nch\r\n$2\r\nhi\r\n";
    expect(&mut alice, message).await;
    expect(&mut bob, message).await;

    // The reply to UNSUBSCRIBE is written before the out-of-band ack.
    send(&mut alice, &["UNSUBSCRIBE", "ch"]).await;
    expect(&mut alice, b"+OK\r\n").await;
    expect(&mut alice, b"*3\r\n$11\r\nunsubscribe\r\n$2\r\nch\r\n:1\r\n").await;

    roundtrip(&mut publisher, &["PUBLISH", "ch", "again"], b":1\r\n").await;
    expect(&mut bob, b"*3\r\n$7\r\nmessage\r\n$2\r\nch\r\n$5\r\nagain\r\n").await;
}

#[tokio::test]
async fn disconnected_subscriber_stops_counting() {
    let port = 17491;
    start_server(config_on(port));
    let mut subscriber = connect(port).await;
    let mut publisher = connect(port).await;

    roundtrip(
        &mut subscriber,
        &["SUBSCRIBE", "ch"],
        b"*3\r\n$9\r\nsubscribe\r\n$2\r\nch\r\n:1\r\n",
    )
    .await;
    drop(subscriber);

    // Give the server a moment to observe the disconnect.
    tokio::time::sleep(Duration::from_millis(200)).await;
    roundtrip(&mut publisher, &["PUBLISH", "ch", "hi"], b":0\r\n").await;
}

#[tokio::test]
async fn auth_gate() {
    let port = 17492;
    let config = Config {
        requirepass: Some("integration-secret-01".to_string()),
        ..config_on(port)
    };
    start_server(config);
    let mut conn = connect(port).await;

    roundtrip(
        &mut conn,
        &["SET", "k", "v"],
        b"-NOAUTH Authentication required.\r\n",
    )
    .await;
    roundtrip(&mut conn, &["AUTH", "nope"], b"-ERR wrong password\r\n").await;
    roundtrip(
        &mut conn,
        &["AUTH", "integration-secret-01"],
        b"+OK\r\n",
    )
    .await;
    roundtrip(&mut conn, &["SET", "k", "v"], b"+OK\r\n").await;
    roundtrip(&mut conn, &["GET", "k"], b"$1\r\nv\r\n").await;
}

#[tokio::test]
async fn hash_family() {
    let port = 17493;
    start_server(config_on(port));
    let mut conn = connect(port).await;

    roundtrip(&mut conn, &["HSET", "h", "f", "v"], b":1\r\n").await;
    roundtrip(&mut conn, &["HGET", "h", "f"], b"$1\r\nv\r\n").await;
    roundtrip(&mut conn, &["HGETALL", "h"], b"*2\r\n$1\r\nf\r\n$1\r\nv\r\n").await;
    roundtrip(&mut conn, &["HDEL", "h", "f"], b":1\r\n").await;
    roundtrip(&mut conn, &["EXISTS", "h"], b":0\r\n").await;
    roundtrip(&mut conn, &["HGET", "h", "f"], b"$-1\r\n").await;
}
