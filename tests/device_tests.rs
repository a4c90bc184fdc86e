//! End-to-end device tests: each variant relaying between real sockets.

use std::time::{Duration, Instant};

use driveshaft::prelude::*;

/// Devices bind on their engine thread, so the endpoint may not exist the
/// instant `start` returns.
fn connect_retry(socket: &mut Socket, addr: &str) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match socket.connect(addr) {
            Ok(()) => return,
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => panic!("connect to {addr} failed: {e}"),
        }
    }
}

fn fast_interval<S: DeviceStrategy>(device: &mut Device<S>) {
    driveshaft::dev_tracing::init_tracing();
    device.set_poll_interval(Duration::from_millis(5)).unwrap();
}

#[test]
fn broker_routes_request_and_reply() {
    let ctx = Context::new();
    let mut broker = BrokerDevice::new(&ctx);
    fast_interval(&mut broker);
    broker
        .frontend_setup()
        .unwrap()
        .bind("inproc://broker-clients")
        .unwrap();
    broker
        .backend_setup()
        .unwrap()
        .bind("inproc://broker-workers")
        .unwrap();
    broker.start().unwrap();

    let mut client = Socket::new(&ctx, SocketKind::Dealer);
    connect_retry(&mut client, "inproc://broker-clients");
    let mut worker = Socket::new(&ctx, SocketKind::Dealer);
    connect_retry(&mut worker, "inproc://broker-workers");

    client
        .send_message(Message::new().push_str("job-42"))
        .unwrap();

    // the worker sees the client identity prepended by the ROUTER frontend
    let request = worker.recv_message_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(request.len(), 2);
    let identity = request.frames()[0].clone();
    assert_eq!(request.parse_frame_str(1).unwrap(), "job-42");

    // echoing the identity routes the reply back to the same client
    worker
        .send_message(Message::new().push(identity).push_str("done"))
        .unwrap();
    let reply = client.recv_message_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(reply.len(), 1);
    assert_eq!(reply.parse_frame_str(0).unwrap(), "done");

    broker.close().unwrap();
}

#[test]
fn forwarder_bridges_publisher_to_subscriber() {
    let ctx = Context::new();
    let mut forwarder = ForwarderDevice::new(&ctx);
    fast_interval(&mut forwarder);
    forwarder
        .frontend_setup()
        .unwrap()
        .bind("inproc://fwd-upstream")
        .unwrap();
    forwarder
        .backend_setup()
        .unwrap()
        .bind("inproc://fwd-downstream")
        .unwrap();
    forwarder.start().unwrap();

    let mut subscriber = Socket::new(&ctx, SocketKind::Sub);
    subscriber.subscribe(&b"weather"[..]).unwrap();
    connect_retry(&mut subscriber, "inproc://fwd-downstream");
    let mut publisher = Socket::new(&ctx, SocketKind::Pub);
    connect_retry(&mut publisher, "inproc://fwd-upstream");

    // publications are dropped until the whole chain is joined up, so
    // publish until one makes it through
    let deadline = Instant::now() + Duration::from_secs(2);
    let delivered = loop {
        publisher
            .send_message(Message::new().push_str("weather").push_str("sunny"))
            .unwrap();
        match subscriber.recv_message_timeout(Duration::from_millis(20)) {
            Ok(msg) => break msg,
            Err(e) if e.is_transient() && Instant::now() < deadline => continue,
            Err(e) => panic!("subscriber never got a publication: {e}"),
        }
    };
    assert_eq!(delivered.parse_frame_str(0).unwrap(), "weather");
    assert_eq!(delivered.parse_frame_str(1).unwrap(), "sunny");

    forwarder.close().unwrap();
}

#[test]
fn queue_relays_pipeline_messages_in_order() {
    let ctx = Context::new();
    let mut queue = QueueDevice::new(&ctx);
    fast_interval(&mut queue);
    queue
        .frontend_setup()
        .unwrap()
        .bind("inproc://queue-in")
        .unwrap();
    queue
        .backend_setup()
        .unwrap()
        .bind("inproc://queue-out")
        .unwrap();
    queue.start().unwrap();

    let mut producer = Socket::new(&ctx, SocketKind::Push);
    connect_retry(&mut producer, "inproc://queue-in");
    let mut consumer = Socket::new(&ctx, SocketKind::Pull);
    connect_retry(&mut consumer, "inproc://queue-out");

    for i in 0..10u32 {
        producer
            .send_message(Message::new().push(i.to_string()))
            .unwrap();
    }
    for i in 0..10u32 {
        let msg = consumer
            .recv_message_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(msg.parse_frame_str(0).unwrap(), i.to_string());
    }

    queue.close().unwrap();
}

#[test]
fn queue_delivers_blocked_backlog_without_new_traffic() {
    let ctx = Context::new();
    let mut queue = QueueDevice::new(&ctx);
    fast_interval(&mut queue);
    queue
        .frontend_setup()
        .unwrap()
        .bind("inproc://backlog-in")
        .unwrap();
    queue
        .backend_setup()
        .unwrap()
        .bind("inproc://backlog-out")
        .unwrap();
    queue.start().unwrap();

    let mut producer = Socket::new(&ctx, SocketKind::Push);
    connect_retry(&mut producer, "inproc://backlog-in");

    // room for exactly one message downstream, so the second relay blocks
    // and is retained inside the device
    let mut consumer = Socket::new(&ctx, SocketKind::Pull);
    consumer
        .set_option(SocketOption::RecvHighWaterMark(1))
        .unwrap();
    connect_retry(&mut consumer, "inproc://backlog-out");

    producer
        .send_message(Message::new().push_str("first"))
        .unwrap();
    producer
        .send_message(Message::new().push_str("second"))
        .unwrap();

    let msg = consumer
        .recv_message_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(msg.parse_frame_str(0).unwrap(), "first");

    // no further traffic arrives; draining alone must release the backlog
    let msg = consumer
        .recv_message_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(msg.parse_frame_str(0).unwrap(), "second");

    queue.close().unwrap();
}

#[test]
fn gateway_wraps_and_unwraps_stream_traffic() {
    let ctx = Context::new();
    let mut gateway = StreamGatewayDevice::new(&ctx);
    fast_interval(&mut gateway);
    gateway
        .frontend_setup()
        .unwrap()
        .bind("inproc://gw-edge")
        .unwrap();
    gateway
        .backend_setup()
        .unwrap()
        .bind("inproc://gw-service")
        .unwrap();
    gateway.start().unwrap();

    let mut service = Socket::new(&ctx, SocketKind::Dealer);
    connect_retry(&mut service, "inproc://gw-service");
    let mut client = Socket::new(&ctx, SocketKind::Pair);
    connect_retry(&mut client, "inproc://gw-edge");

    client
        .send_message(Message::new().push_str("hello"))
        .unwrap();

    // envelope: [connection identity] [empty] [gateway endpoint] [payload]
    let request = service
        .recv_message_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(request.len(), 4);
    let identity = request.frames()[0].clone();
    assert!(request.frames()[1].is_empty());
    assert_eq!(request.parse_frame_str(2).unwrap(), "inproc://gw-edge");
    assert_eq!(request.parse_frame_str(3).unwrap(), "hello");

    service
        .send_message(
            Message::new()
                .push(identity)
                .push_empty()
                .push_str("welcome"),
        )
        .unwrap();

    // the reply comes back as one raw unit, envelope stripped
    let reply = client.recv_message_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(reply.len(), 1);
    assert_eq!(reply.parse_frame_str(0).unwrap(), "welcome");

    gateway.close().unwrap();
}

#[test]
fn start_without_endpoints_is_rejected() {
    fn rejected<S: DeviceStrategy>(mut device: Device<S>) {
        assert!(matches!(device.start(), Err(DriveshaftError::NoEndpoint)));
    }

    let ctx = Context::new();
    rejected(BrokerDevice::new(&ctx));
    rejected(ForwarderDevice::new(&ctx));
    rejected(QueueDevice::new(&ctx));
    rejected(StreamGatewayDevice::new(&ctx));
}

#[test]
fn start_twice_is_rejected() {
    let ctx = Context::new();
    let mut queue = QueueDevice::new(&ctx);
    fast_interval(&mut queue);
    queue
        .frontend_setup()
        .unwrap()
        .bind("inproc://twice-in")
        .unwrap();
    queue
        .backend_setup()
        .unwrap()
        .bind("inproc://twice-out")
        .unwrap();
    queue.start().unwrap();

    assert!(matches!(
        queue.start(),
        Err(DriveshaftError::InvalidState(_))
    ));
    queue.close().unwrap();
}

#[test]
fn launch_failure_surfaces_at_join() {
    let ctx = Context::new();
    let mut taken = Socket::new(&ctx, SocketKind::Pair);
    taken.bind("inproc://launch-taken").unwrap();

    let mut broker = BrokerDevice::new(&ctx);
    fast_interval(&mut broker);
    broker
        .frontend_setup()
        .unwrap()
        .bind("inproc://launch-taken")
        .unwrap();
    broker
        .backend_setup()
        .unwrap()
        .bind("inproc://launch-workers")
        .unwrap();
    broker.start().unwrap();

    assert!(broker.join_timeout(Duration::from_secs(2)).unwrap());
    assert!(matches!(
        broker.join(),
        Err(DriveshaftError::AddrInUse(_))
    ));
}

#[test]
fn close_stops_engine_promptly_and_is_idempotent() {
    driveshaft::dev_tracing::init_tracing();
    let ctx = Context::new();
    let mut queue = QueueDevice::new(&ctx);
    let interval = Duration::from_millis(50);
    queue.set_poll_interval(interval).unwrap();
    queue
        .frontend_setup()
        .unwrap()
        .bind("inproc://close-in")
        .unwrap();
    queue
        .backend_setup()
        .unwrap()
        .bind("inproc://close-out")
        .unwrap();
    queue.start().unwrap();
    assert!(queue.is_running());

    // the poll interval bounds stop latency: a few intervals must suffice
    queue.stop();
    assert!(queue.join_timeout(interval * 3).unwrap());
    queue.close().unwrap();
    queue.close().unwrap();
    assert!(!queue.is_running());
}

#[test]
fn context_terminate_unwinds_device() {
    let ctx = Context::new();
    let mut broker = BrokerDevice::new(&ctx);
    fast_interval(&mut broker);
    broker
        .frontend_setup()
        .unwrap()
        .bind("inproc://term-clients")
        .unwrap();
    broker
        .backend_setup()
        .unwrap()
        .bind("inproc://term-workers")
        .unwrap();
    broker.start().unwrap();

    ctx.terminate();
    assert!(broker.join_timeout(Duration::from_secs(2)).unwrap());
    // termination is a clean engine exit
    broker.join().unwrap();
}
