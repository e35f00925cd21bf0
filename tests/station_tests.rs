//! Integration tests for the station client against a scripted controller

use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rs_dcc::hal::{MockEvent, MockTransport};
use rs_dcc::{
    CommandConfig, Config, ConnectionState, DccCommand, DccError, FunctionState,
    HandshakeConfig, LocoAddress, LocoDirection, Power, SensorConfig, Station, Transport,
    TurnoutAddress, TurnoutDirection,
};

fn fast_config() -> Config {
    Config::default()
        .with_handshake(
            HandshakeConfig::default()
                .with_ready_window_ms(100)
                .with_grace_ms(5)
                .with_poll_ms(5),
        )
        .with_command(
            CommandConfig::default()
                .with_settle_ms(1)
                .with_post_success_delay_ms(1)
                .with_sensor_query_delay_ms(0),
        )
        .with_sensors(SensorConfig::default().with_wait_poll_ms(5))
}

fn open_station(mock: &MockTransport) -> Station<MockTransport> {
    let station = Station::new(mock.clone(), fast_config());
    station.open("COM3").unwrap();
    mock.clear_log();
    station
}

/// Replies to sensor queries with `report`, everything else with `200 Ok`.
fn sensor_controller(report: &'static str) -> MockTransport {
    MockTransport::ready().with_responder(move |cmd| {
        if cmd.starts_with("getS88") {
            format!("{report}\r\n200 Ok\r\n")
        } else {
            "200 Ok\r\n".to_string()
        }
    })
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[test]
fn open_with_ready_greeting() {
    let mock = MockTransport::ready();
    let station = Station::new(mock.clone(), fast_config());
    assert_eq!(station.state(), ConnectionState::Closed);

    station.open("COM3").unwrap();
    assert_eq!(station.state(), ConnectionState::Ready);
    assert!(station.is_ready());

    let settings = mock.last_settings().unwrap();
    assert_eq!(settings.port, "COM3");
    assert_eq!(settings.baud_rate, 115_200);
}

#[test]
fn greeting_arriving_late_within_window() {
    let mock = MockTransport::ready().with_greeting_delay(Duration::from_millis(30));
    let station = Station::new(mock, fast_config());
    station.open("COM3").unwrap();
    assert!(station.is_ready());
}

#[test]
fn greeting_after_window_fails() {
    let mock = MockTransport::ready().with_greeting_delay(Duration::from_millis(400));
    let station = Station::new(mock, fast_config());
    let err = station.open("COM3").unwrap_err();
    assert!(matches!(err, DccError::NoResponse { .. }));
    assert_eq!(station.state(), ConnectionState::Failed);
}

#[test]
fn silent_controller_fails() {
    let station = Station::new(MockTransport::new(), fast_config());
    let err = station.open("COM3").unwrap_err();
    match err {
        DccError::NoResponse { greeting } => assert!(greeting.is_empty()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_port_reported_without_retry() {
    let mock = MockTransport::ready().failing_open();
    let station = Station::new(mock.clone(), fast_config());
    let err = station.open("COM7").unwrap_err();
    assert!(matches!(err, DccError::PortUnavailable { ref port, .. } if port == "COM7"));
    assert_eq!(station.state(), ConnectionState::Failed);
    assert_eq!(mock.open_count(), 0);
}

#[test]
fn open_default_uses_configured_port() {
    let mock = MockTransport::ready();
    let config = fast_config().with_serial(rs_dcc::SerialConfig::default().with_port("/dev/ttyACM0"));
    let station = Station::new(mock.clone(), config);
    station.open_default().unwrap();
    assert_eq!(mock.last_settings().unwrap().port, "/dev/ttyACM0");
}

#[test]
fn close_then_commands_rejected() {
    let mock = MockTransport::ready();
    let station = open_station(&mock);
    station.close();
    station.close();

    assert_eq!(station.state(), ConnectionState::Closed);
    assert!(!station.ping());
    assert_eq!(mock.bytes_written(), 0);
}

#[test]
fn stop_sends_power_off_then_closes() {
    let mock = MockTransport::ready();
    let station = open_station(&mock);
    station.start_polling(Duration::from_secs(10)).unwrap();
    mock.clear_log();

    station.stop();

    assert_eq!(mock.writes(), vec!["setPower(0)"]);
    assert!(!station.is_polling());
    assert_eq!(station.state(), ConnectionState::Closed);
    assert!(!mock.is_open());
}

#[test]
fn stop_without_open_writes_nothing() {
    let mock = MockTransport::ready();
    let station = Station::new(mock.clone(), fast_config());
    station.stop();
    assert_eq!(mock.bytes_written(), 0);
    assert_eq!(station.state(), ConnectionState::Closed);
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn command_wire_forms() {
    let mock = MockTransport::ready();
    let station = open_station(&mock);
    let loco = LocoAddress::new(33);

    assert!(station.ping());
    assert!(station.set_power(Power::On));
    assert!(station.set_loco_speed(loco, 400));
    assert!(station.set_loco_speed_step(loco, 400, 2));
    assert!(station.set_loco_direction(loco, LocoDirection::Reverse));
    assert!(station.set_loco_function(loco, 0, FunctionState::On));
    assert!(station.set_loco_config(loco, 3));
    assert!(station.set_turnout(TurnoutAddress::new(1).unwrap(), TurnoutDirection::Straight));

    assert_eq!(
        mock.writes(),
        vec![
            "setPing()",
            "setPower(1)",
            "setLocoSpeed(49185,400,0)",
            "setLocoSpeed(49185,400,2)",
            "setLocoDirection(49185,2)",
            "setLocoFunction(49185,0,1)",
            "setLocoConfig(49185,3)",
            "setTurnout(14336,0)",
        ]
    );
}

#[test]
fn every_command_is_crlf_terminated() {
    let mock = MockTransport::ready();
    let station = open_station(&mock);
    station.execute(&DccCommand::Ping);
    assert_eq!(mock.bytes_written(), "setPing()\r\n".len());
}

#[test]
fn loco_config_raw_and_decoded() {
    let mock = MockTransport::ready().respond_with("@CV,49162,8,129,\r\n200 Ok\r\n");
    let station = open_station(&mock);

    let raw = station.get_loco_config(LocoAddress::new(10), 8);
    assert_eq!(raw, "@CV,49162,8,129,\r\n200 Ok\r\n");

    let decoded = station.read_loco_config(LocoAddress::new(10), 8).unwrap();
    assert_eq!(decoded.field, 8);
    assert_eq!(decoded.value, 129);
    assert_eq!(mock.writes(), vec!["getLocoConfig(49162,8)"; 2]);
}

#[test]
fn exchange_reports_reply_error() {
    let mock = MockTransport::ready().respond_with("300 Error\r\n");
    let station = open_station(&mock);

    let exchange = station.exchange("setPing()", Duration::ZERO).unwrap();
    assert!(!exchange.success);
    assert!(matches!(
        exchange.into_result(),
        Err(DccError::ReplyError { .. })
    ));
}

#[test]
fn exchange_not_open() {
    let station = Station::new(MockTransport::ready(), fast_config());
    assert!(matches!(
        station.exchange("setPing()", Duration::ZERO),
        Err(DccError::NotOpen)
    ));
}

#[test]
fn post_success_delay_held_only_on_success() {
    let mock = MockTransport::ready();
    let station = open_station(&mock);
    let started = Instant::now();
    station.send_command("setPing()", Duration::from_millis(50));
    assert!(started.elapsed() >= Duration::from_millis(50));

    let failing = MockTransport::ready().respond_with("300 Error\r\n");
    let station = open_station(&failing);
    let started = Instant::now();
    station.send_command("setPing()", Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(1));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_senders_never_interleave() {
    let mock = MockTransport::ready();
    let config = fast_config().with_command(
        CommandConfig::default()
            .with_lock_timeout_ms(10_000)
            .with_lock_poll_ms(1)
            .with_settle_ms(1)
            .with_post_success_delay_ms(1),
    );
    let station = Arc::new(Station::new(mock.clone(), config));
    station.open("COM3").unwrap();
    mock.clear_log();

    let handles: Vec<_> = (0..8u16)
        .map(|i| {
            let station = Arc::clone(&station);
            thread::spawn(move || {
                for speed in 0..5 {
                    assert!(station.set_loco_speed(LocoAddress::new(i + 1), speed));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let events = mock.events();
    assert_eq!(events.len(), 8 * 5 * 3);
    for triple in events.chunks(3) {
        assert!(matches!(triple[0], MockEvent::Write(_)), "{triple:?}");
        assert_eq!(triple[1], MockEvent::ReadLine);
        assert_eq!(triple[2], MockEvent::Drain);
    }
}

#[test]
fn busy_line_drops_command() {
    let mock = MockTransport::ready();
    let config = fast_config().with_command(
        CommandConfig::default()
            .with_lock_timeout_ms(20)
            .with_lock_poll_ms(2)
            .with_settle_ms(1)
            .with_post_success_delay_ms(300),
    );
    let station = Arc::new(Station::new(mock.clone(), config));
    station.open("COM3").unwrap();
    mock.clear_log();

    let holder = {
        let station = Arc::clone(&station);
        thread::spawn(move || station.set_power(Power::On))
    };
    thread::sleep(Duration::from_millis(50));

    let err = station.exchange("setPing()", Duration::ZERO).unwrap_err();
    assert!(matches!(err, DccError::LockTimeout { timeout_ms: 20 }));
    assert!(holder.join().unwrap());
    assert_eq!(mock.writes(), vec!["setPower(1)"]);
}

// ============================================================================
// Sensors
// ============================================================================

#[test]
fn sensor_bank_indexing() {
    let mock = sensor_controller("@S88,0,FF,0A");
    let station = open_station(&mock);

    assert_eq!(station.get_sensor_bank(2), Some(255));
    assert_eq!(station.get_sensor_bank(3), Some(10));
    assert_eq!(mock.writes(), vec!["getS88(2)", "getS88(3)"]);
}

#[test]
fn read_bit_from_cache() {
    let mock = sensor_controller("@S88,0A");
    let station = open_station(&mock);
    station.refresh_one(1);
    mock.clear_log();

    assert!(station.read_bit(1, 2));
    assert!(!station.read_bit(1, 1));
    assert_eq!(mock.bytes_written(), 0);
}

#[test]
fn refresh_all_fills_every_device() {
    let mock = sensor_controller("@S88,01,02,04");
    let config = fast_config().with_sensors(SensorConfig::default().with_device_count(3));
    let station = Station::new(mock.clone(), config);
    station.open("COM3").unwrap();
    mock.clear_log();

    station.refresh_all();
    assert_eq!(mock.writes(), vec!["getS88(1)", "getS88(2)", "getS88(3)"]);
    assert_eq!(station.sensor_snapshot(), vec![Some(1), Some(2), Some(4)]);
}

#[test]
fn wait_returns_once_bit_arrives() {
    let arrived = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&arrived);
    let mock = MockTransport::ready().with_responder(move |cmd| {
        if !cmd.starts_with("getS88") {
            return "200 Ok\r\n".to_string();
        }
        if flag.load(std::sync::atomic::Ordering::SeqCst) {
            "@S88,0004\r\n200 Ok\r\n".to_string()
        } else {
            "@S88,0000\r\n200 Ok\r\n".to_string()
        }
    });
    let station = Arc::new(open_station(&mock));

    let waiter = {
        let station = Arc::clone(&station);
        thread::spawn(move || station.wait_until_bit_set(1, 3, Duration::from_secs(5)))
    };
    thread::sleep(Duration::from_millis(40));
    arrived.store(true, std::sync::atomic::Ordering::SeqCst);

    assert!(waiter.join().unwrap());
}

#[test]
fn wait_times_out_without_panicking() {
    let mock = sensor_controller("@S88,0000");
    let station = open_station(&mock);
    let started = Instant::now();
    assert!(!station.wait_until_bit_set(1, 1, Duration::from_millis(50)));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(2));
}

/// Log output collected by a scoped subscriber.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn wait_timeout_is_logged() {
    let mock = sensor_controller("@S88,0000");
    let station = open_station(&mock);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let arrived = tracing::subscriber::with_default(subscriber, || {
        station.wait_until_bit_set(1, 3, Duration::from_millis(20))
    });

    assert!(!arrived);
    let output = logs.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("sensor not arrived"), "{output}");
    assert!(output.contains("sensor 1:3 not set before deadline"), "{output}");
}

#[test]
fn wait_with_poller_reads_cache_only() {
    let mock = sensor_controller("@S88,0001");
    let station = open_station(&mock);
    station.start_polling(Duration::from_secs(10)).unwrap();
    mock.clear_log();

    assert!(station.wait_until_bit_set(1, 1, Duration::from_millis(200)));
    assert_eq!(mock.bytes_written(), 0);
    station.stop_polling();
}

// ============================================================================
// Polling
// ============================================================================

#[test]
fn polling_refreshes_periodically() {
    let mock = sensor_controller("@S88,0001");
    let station = open_station(&mock);

    station.start_polling(Duration::from_millis(10)).unwrap();
    thread::sleep(Duration::from_millis(80));
    station.stop_polling();

    let queries = mock.writes().iter().filter(|w| *w == "getS88(1)").count();
    assert!(queries >= 3, "only {queries} refreshes");
    assert_eq!(station.sensor_reading(1), Some(1));
}

#[test]
fn no_refresh_after_stop_polling() {
    let mock = sensor_controller("@S88,0001");
    let station = open_station(&mock);

    station.start_polling(Duration::from_millis(5)).unwrap();
    thread::sleep(Duration::from_millis(30));
    station.stop_polling();

    let after_stop = mock.writes().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(mock.writes().len(), after_stop);
}

#[test]
fn restart_polling_keeps_single_poller() {
    let mock = sensor_controller("@S88,0001");
    let station = open_station(&mock);

    station.start_polling(Duration::from_secs(10)).unwrap();
    station.start_polling(Duration::from_secs(10)).unwrap();
    assert!(station.is_polling());

    // Each start does one immediate refresh; the long interval means no ticks.
    assert_eq!(mock.writes(), vec!["getS88(1)", "getS88(1)"]);
    station.stop_polling();
    station.stop_polling();
    assert!(!station.is_polling());
}

#[test]
fn polling_survives_failed_refresh() {
    let mock = MockTransport::ready().respond_with("300 Error\r\n");
    let station = open_station(&mock);

    station.start_polling(Duration::from_millis(5)).unwrap();
    thread::sleep(Duration::from_millis(40));
    assert!(station.is_polling());
    assert_eq!(station.sensor_reading(1), None);
    assert!(mock.writes().len() >= 2);
    station.stop_polling();
}
