//! Test support utilities - only compiled in test builds.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use crate::channel::{Endpoint, NotifyChannel};
use crate::device::{
    AmbientAdapter, AmbientSample, BuzzerAdapter, ClockAdapter, ClockSample, DeviceBank,
    LedAdapter, MotionAdapter, MotionSample, SystemControl,
};
use crate::error::DeviceError;

/// Initializes test logging once per process.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mock_failure() -> DeviceError {
    DeviceError::Command("mock failure".to_owned())
}

struct LoopbackEndpoint {
    tx: Sender<Vec<u8>>,
    rx: Mutex<Receiver<Vec<u8>>>,
    closed: AtomicBool,
    close_count: AtomicUsize,
}

impl LoopbackEndpoint {
    fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
        }
    }
}

/// In-process [`NotifyChannel`] for worker and timer tests.
pub struct LoopbackChannel {
    main: LoopbackEndpoint,
    app: LoopbackEndpoint,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self {
            main: LoopbackEndpoint::new(),
            app: LoopbackEndpoint::new(),
        }
    }

    fn endpoint(&self, endpoint: Endpoint) -> &LoopbackEndpoint {
        match endpoint {
            Endpoint::Main => &self.main,
            Endpoint::App => &self.app,
        }
    }

    /// How many times `close` was called on `endpoint`.
    pub fn close_count(&self, endpoint: Endpoint) -> usize {
        self.endpoint(endpoint).close_count.load(Ordering::SeqCst)
    }
}

impl NotifyChannel for LoopbackChannel {
    fn send(
        &self,
        endpoint: Endpoint,
        payload: &[u8],
        _priority: u32,
    ) -> Result<(), crate::error::ChannelError> {
        let ep = self.endpoint(endpoint);
        if ep.closed.load(Ordering::Acquire) {
            return Err(crate::error::ChannelError::Closed);
        }
        ep.tx
            .send(payload.to_vec())
            .map_err(|_| crate::error::ChannelError::Closed)
    }

    fn receive(
        &self,
        endpoint: Endpoint,
        buf: &mut [u8],
    ) -> Result<usize, crate::error::ChannelError> {
        let ep = self.endpoint(endpoint);
        if ep.closed.load(Ordering::Acquire) {
            return Err(crate::error::ChannelError::Closed);
        }
        let msg = ep
            .rx
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| crate::error::ChannelError::Closed)?;
        // Wakeups posted by close() carry no data.
        if ep.closed.load(Ordering::Acquire) {
            return Err(crate::error::ChannelError::Closed);
        }
        let n = msg.len().min(buf.len());
        buf[..n].copy_from_slice(&msg[..n]);
        Ok(n)
    }

    fn close(&self, endpoint: Endpoint) {
        let ep = self.endpoint(endpoint);
        ep.close_count.fetch_add(1, Ordering::SeqCst);
        if !ep.closed.swap(true, Ordering::AcqRel) {
            // Wake a blocked receiver.
            let _ = ep.tx.send(vec![0]);
        }
    }
}

pub struct MockLed {
    pub state: Arc<Mutex<bool>>,
    pub writes: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl LedAdapter for MockLed {
    fn read(&mut self) -> Result<bool, DeviceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(mock_failure());
        }
        Ok(*self.state.lock().unwrap())
    }

    fn write(&mut self, on: bool) -> Result<(), DeviceError> {
        *self.state.lock().unwrap() = on;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockBuzzer {
    pub state: Arc<Mutex<bool>>,
    pub writes: Arc<AtomicUsize>,
}

impl BuzzerAdapter for MockBuzzer {
    fn read(&mut self) -> Result<bool, DeviceError> {
        Ok(*self.state.lock().unwrap())
    }

    fn write(&mut self, on: bool) -> Result<(), DeviceError> {
        *self.state.lock().unwrap() = on;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockMotion {
    pub sample: Arc<Mutex<MotionSample>>,
    pub fail: Arc<AtomicBool>,
}

impl MotionAdapter for MockMotion {
    fn read(&mut self) -> Result<MotionSample, DeviceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(mock_failure());
        }
        Ok(*self.sample.lock().unwrap())
    }
}

pub struct MockClock {
    pub sample: Arc<Mutex<ClockSample>>,
    pub fail: Arc<AtomicBool>,
}

impl ClockAdapter for MockClock {
    fn read(&mut self) -> Result<ClockSample, DeviceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(mock_failure());
        }
        Ok(*self.sample.lock().unwrap())
    }
}

pub struct MockAmbient {
    pub sample: Arc<Mutex<AmbientSample>>,
    pub fail: Arc<AtomicBool>,
}

impl AmbientAdapter for MockAmbient {
    fn read(&mut self) -> Result<AmbientSample, DeviceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(mock_failure());
        }
        Ok(*self.sample.lock().unwrap())
    }
}

/// Records reboot requests and reports failure so cycles keep running.
pub struct MockSystem {
    pub reboots: Arc<AtomicUsize>,
}

impl SystemControl for MockSystem {
    fn reboot(&mut self) -> Result<(), DeviceError> {
        self.reboots.fetch_add(1, Ordering::SeqCst);
        Err(mock_failure())
    }
}

/// Shared handles into a [`mock_bank`] for observing and steering mocks.
pub struct MockHandles {
    pub led_state: Arc<Mutex<bool>>,
    pub led_writes: Arc<AtomicUsize>,
    pub led_fail: Arc<AtomicBool>,
    pub buzzer_state: Arc<Mutex<bool>>,
    pub buzzer_writes: Arc<AtomicUsize>,
    pub motion: Arc<Mutex<MotionSample>>,
    pub motion_fail: Arc<AtomicBool>,
    pub clock: Arc<Mutex<ClockSample>>,
    pub clock_fail: Arc<AtomicBool>,
    pub ambient: Arc<Mutex<AmbientSample>>,
    pub ambient_fail: Arc<AtomicBool>,
    pub reboots: Arc<AtomicUsize>,
}

/// A fully mocked device bank plus handles to observe it.
pub fn mock_bank() -> (DeviceBank, MockHandles) {
    let handles = MockHandles {
        led_state: Arc::new(Mutex::new(false)),
        led_writes: Arc::new(AtomicUsize::new(0)),
        led_fail: Arc::new(AtomicBool::new(false)),
        buzzer_state: Arc::new(Mutex::new(false)),
        buzzer_writes: Arc::new(AtomicUsize::new(0)),
        motion: Arc::new(Mutex::new(MotionSample::default())),
        motion_fail: Arc::new(AtomicBool::new(false)),
        clock: Arc::new(Mutex::new(ClockSample::default())),
        clock_fail: Arc::new(AtomicBool::new(false)),
        ambient: Arc::new(Mutex::new(AmbientSample::default())),
        ambient_fail: Arc::new(AtomicBool::new(false)),
        reboots: Arc::new(AtomicUsize::new(0)),
    };

    let bank = DeviceBank {
        led: Box::new(MockLed {
            state: Arc::clone(&handles.led_state),
            writes: Arc::clone(&handles.led_writes),
            fail: Arc::clone(&handles.led_fail),
        }),
        buzzer: Box::new(MockBuzzer {
            state: Arc::clone(&handles.buzzer_state),
            writes: Arc::clone(&handles.buzzer_writes),
        }),
        motion: Box::new(MockMotion {
            sample: Arc::clone(&handles.motion),
            fail: Arc::clone(&handles.motion_fail),
        }),
        clock: Box::new(MockClock {
            sample: Arc::clone(&handles.clock),
            fail: Arc::clone(&handles.clock_fail),
        }),
        ambient: Box::new(MockAmbient {
            sample: Arc::clone(&handles.ambient),
            fail: Arc::clone(&handles.ambient_fail),
        }),
        system: Box::new(MockSystem {
            reboots: Arc::clone(&handles.reboots),
        }),
    };

    (bank, handles)
}
