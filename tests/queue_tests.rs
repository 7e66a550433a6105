//! Motion queue backend tests.
//!
//! The stepper backend is driven with mock pins; the bounded FIFO is
//! exercised across threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

use gcode_motion::axis::N_AXES;
use gcode_motion::config::MOTOR_COUNT;
use gcode_motion::error::QueueError;
use gcode_motion::motion::{Instruction, MotionSegment};
use gcode_motion::queue::{BoundedQueue, MotionQueue, StepperChannel, StepperQueue, TraceQueue};
use gcode_motion::sink::SharedBuffer;

// =============================================================================
// Test doubles
// =============================================================================

/// Output pin counting rising edges, optionally failing every write.
#[derive(Clone, Default)]
struct CountingPin {
    highs: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingPin {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn highs(&self) -> usize {
        self.highs.load(Ordering::SeqCst)
    }
}

impl ErrorType for CountingPin {
    type Error = ErrorKind;
}

impl OutputPin for CountingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.highs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Output pin whose driver panics on the first rising edge.
struct PanickingPin;

impl ErrorType for PanickingPin {
    type Error = ErrorKind;
}

impl OutputPin for PanickingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        panic!("step line shorted");
    }
}

/// Delay that really sleeps, so motion takes wall-clock time.
struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

fn segment(steps: &[i32], velocity: f32) -> Instruction {
    let mut all = [0; MOTOR_COUNT];
    all[..steps.len()].copy_from_slice(steps);
    Instruction::Move(MotionSegment {
        steps: all,
        v0: velocity,
        v1: velocity,
        target: [0.0; N_AXES],
        feedrate: 10.0,
    })
}

fn pulses(count: usize) -> Vec<PinTransaction> {
    (0..count)
        .flat_map(|_| [PinTransaction::set(State::High), PinTransaction::set(State::Low)])
        .collect()
}

// =============================================================================
// Bounded FIFO
// =============================================================================

#[test]
fn full_queue_blocks_producer_until_pop() {
    let queue = Arc::new(BoundedQueue::<u32, 2>::new());
    assert_eq!(queue.capacity(), 2);
    queue.push(1).unwrap();
    queue.push(2).unwrap();

    let pushed = Arc::new(AtomicBool::new(false));
    let producer = {
        let queue = Arc::clone(&queue);
        let pushed = Arc::clone(&pushed);
        thread::spawn(move || {
            queue.push(3).unwrap();
            pushed.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!pushed.load(Ordering::SeqCst));
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.pop(), Some(1));
    producer.join().unwrap();
    assert!(pushed.load(Ordering::SeqCst));
    assert_eq!(queue.pop(), Some(2));
    assert_eq!(queue.pop(), Some(3));
}

#[test]
fn close_wakes_blocked_producer() {
    let queue = Arc::new(BoundedQueue::<u32, 1>::new());
    queue.push(1).unwrap();

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.push(2))
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(queue.close(true), 1);
    assert_eq!(producer.join().unwrap(), Err(QueueError::Shutdown));
    assert_eq!(queue.pop(), None);
}

#[test]
fn wait_drained_returns_after_task_done() {
    let queue = Arc::new(BoundedQueue::<u32, 4>::new());
    queue.push(7).unwrap();

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let item = queue.pop();
            thread::sleep(Duration::from_millis(20));
            queue.task_done();
            item
        })
    };
    queue.wait_drained().unwrap();
    assert_eq!(consumer.join().unwrap(), Some(7));
    assert!(queue.is_empty());
}

// =============================================================================
// Stepper backend
// =============================================================================

#[test]
fn stepper_pin_sequence() {
    let mut step = PinMock::new(&[pulses(2), pulses(3), pulses(1)].concat());
    let mut dir = PinMock::new(&[
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
    ]);
    let mut enable = PinMock::new(&[
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
    ]);

    let queue = StepperQueue::start(
        vec![StepperChannel::new(step.clone(), dir.clone())],
        Some(enable.clone()),
        NoopDelay::new(),
    )
    .unwrap();

    queue.enqueue(Instruction::MotorsEnable(true)).unwrap();
    queue.enqueue(segment(&[2], 1000.0)).unwrap();
    queue.enqueue(segment(&[-3], 1000.0)).unwrap();
    queue.enqueue(Instruction::Dwell(5)).unwrap();
    // Same direction again: no DIR write
    queue.enqueue(segment(&[-1], 1000.0)).unwrap();
    queue.enqueue(Instruction::MotorsEnable(false)).unwrap();
    queue.wait_queue_empty().unwrap();
    queue.shutdown(true);

    step.done();
    dir.done();
    enable.done();
}

#[test]
fn flush_shutdown_runs_everything() {
    let step = CountingPin::default();
    let dir = CountingPin::default();
    let queue = StepperQueue::start(
        vec![StepperChannel::new(step.clone(), dir.clone())],
        None::<CountingPin>,
        NoopDelay::new(),
    )
    .unwrap();

    for _ in 0..10 {
        queue.enqueue(segment(&[25], 5000.0)).unwrap();
    }
    queue.shutdown(true);

    assert_eq!(step.highs(), 250);
    assert_eq!(dir.highs(), 1);
}

#[test]
fn immediate_shutdown_stops_mid_segment() {
    let step = CountingPin::default();
    let queue = StepperQueue::start(
        vec![StepperChannel::new(step.clone(), CountingPin::default())],
        None::<CountingPin>,
        SleepDelay,
    )
    .unwrap();

    // 1000 steps at 1000 steps/s: one second each
    queue.enqueue(segment(&[1000], 1000.0)).unwrap();
    queue.enqueue(segment(&[1000], 1000.0)).unwrap();
    thread::sleep(Duration::from_millis(50));
    queue.shutdown(false);

    assert!(step.highs() < 1000);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn enqueue_after_shutdown_fails() {
    let queue = StepperQueue::start(
        Vec::<StepperChannel<CountingPin, CountingPin>>::new(),
        None::<CountingPin>,
        NoopDelay::new(),
    )
    .unwrap();
    queue.shutdown(true);
    // Idempotent
    queue.shutdown(false);
    assert_eq!(queue.enqueue(Instruction::Dwell(1)), Err(QueueError::Shutdown));
}

#[test]
fn pin_failure_surfaces_as_backend_fault() {
    let queue = StepperQueue::start(
        vec![StepperChannel::new(CountingPin::failing(), CountingPin::failing())],
        None::<CountingPin>,
        NoopDelay::new(),
    )
    .unwrap();

    queue.enqueue(segment(&[3], 1000.0)).unwrap();
    assert!(matches!(
        queue.wait_queue_empty(),
        Err(QueueError::BackendFault(_))
    ));
    assert!(matches!(
        queue.enqueue(Instruction::Dwell(1)),
        Err(QueueError::BackendFault(_))
    ));
}

#[test]
fn pin_types_differ_per_role() {
    let mut step = PinMock::new(&pulses(4));
    let dir = CountingPin::default();
    let enable = CountingPin::default();
    let queue = StepperQueue::start(
        vec![StepperChannel::new(step.clone(), dir.clone())],
        Some(enable.clone()),
        NoopDelay::new(),
    )
    .unwrap();

    queue.enqueue(Instruction::MotorsEnable(true)).unwrap();
    queue.enqueue(segment(&[4], 1000.0)).unwrap();
    queue.shutdown(true);

    step.done();
    assert_eq!(dir.highs(), 1);
    assert_eq!(enable.highs(), 1);
}

#[test]
fn more_channels_than_motors_rejected() {
    let channels: Vec<_> = (0..=MOTOR_COUNT)
        .map(|_| StepperChannel::new(CountingPin::default(), CountingPin::default()))
        .collect();
    let result = StepperQueue::start(channels, None::<CountingPin>, NoopDelay::new());
    let error = result.err().unwrap();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn panicking_driver_surfaces_as_backend_fault() {
    let queue = StepperQueue::start(
        vec![StepperChannel::new(PanickingPin, CountingPin::default())],
        None::<CountingPin>,
        NoopDelay::new(),
    )
    .unwrap();

    queue.enqueue(segment(&[3], 1000.0)).unwrap();
    match queue.wait_queue_empty() {
        Err(QueueError::BackendFault(msg)) => assert!(msg.contains("step line shorted")),
        other => panic!("expected backend fault, got {:?}", other),
    }
    assert!(matches!(
        queue.enqueue(Instruction::Dwell(1)),
        Err(QueueError::BackendFault(_))
    ));
    queue.shutdown(false);
}

// =============================================================================
// Trace backend
// =============================================================================

#[test]
fn trace_numbers_instructions() {
    let out = SharedBuffer::new();
    let queue = TraceQueue::new(out.clone(), 2);
    queue.enqueue(segment(&[100, -50], 100.0)).unwrap();
    queue.enqueue(Instruction::Dwell(250)).unwrap();
    queue.shutdown(true);

    let text = out.contents();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("    1 move    100    -50 |"));
    assert!(lines[0].contains("1.000s"));
    assert_eq!(lines[1], "    2 dwell 250 ms");
    assert_eq!(queue.enqueue(Instruction::Dwell(1)), Err(QueueError::Shutdown));
}
