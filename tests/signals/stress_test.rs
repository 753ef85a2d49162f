/*!
 * Stress Tests
 * Concurrent senders against waiting threads
 */

use crate::support::{spawn_group, user};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signal_kernel::signals::{SignalConsumer, SignalDelivery, SignalMasking, SignalStateManager};
use signal_kernel::{
    MaskHow, Sender, Signal, SignalConfig, SignalError, SignalInfo, SignalManager, SignalSet,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SENDERS: usize = 4;
const PER_SENDER: usize = 250;
const RT_SPREAD: u32 = 8;

#[test]
fn test_no_realtime_signal_lost() {
    let manager = SignalManager::builder()
        .with_config(SignalConfig::unlimited())
        .build();
    let tids = spawn_group(&manager, user(1000, 100), 3);
    let tgid = tids[0];
    let set: SignalSet = (0..RT_SPREAD).map(|i| Signal::realtime(i).unwrap()).collect();
    for tid in &tids {
        manager.set_blocked_mask(*tid, MaskHow::Block, set).unwrap();
    }

    let total = SENDERS * PER_SENDER;
    let received = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = tids
        .iter()
        .map(|&tid| {
            let manager = manager.clone();
            let received = Arc::clone(&received);
            thread::spawn(move || {
                let mut got = Vec::new();
                while received.load(Ordering::SeqCst) < total {
                    match manager.wait_for_signal_blocking(tid, set, Some(Duration::from_millis(20))) {
                        Ok(info) => {
                            got.push(info.signal);
                            received.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(SignalError::TimedOut) => {}
                        Err(e) => panic!("waiter {} failed: {}", tid, e),
                    }
                }
                got
            })
        })
        .collect();

    let senders: Vec<_> = (0..SENDERS)
        .map(|seed| {
            let manager = manager.clone();
            let tids = tids.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                let mut sent = Vec::with_capacity(PER_SENDER);
                for i in 0..PER_SENDER {
                    let rt = Signal::realtime(rng.gen_range(0..RT_SPREAD)).unwrap();
                    let info = SignalInfo::queued(rt, 1, 1000, i);
                    if rng.gen_bool(0.5) {
                        manager.send_to_group(Sender::Kernel, tgid, info).unwrap();
                    } else {
                        let target = tids[rng.gen_range(0..tids.len())];
                        manager.send_to_thread(Sender::Kernel, target, info).unwrap();
                    }
                    sent.push(rt);
                }
                sent
            })
        })
        .collect();

    let mut sent_counts = BTreeMap::new();
    for sender in senders {
        for signal in sender.join().unwrap() {
            *sent_counts.entry(signal.number()).or_insert(0usize) += 1;
        }
    }
    let mut got_counts = BTreeMap::new();
    for waiter in waiters {
        for signal in waiter.join().unwrap() {
            *got_counts.entry(signal.number()).or_insert(0usize) += 1;
        }
    }

    assert_eq!(got_counts, sent_counts);
    assert_eq!(manager.queued_by(1000), 0);
    assert_eq!(manager.stats().total_signals_delivered, total as u64);
}

#[test]
fn test_legacy_storm_coalesces() {
    let manager = SignalManager::new();
    let tids = spawn_group(&manager, user(1000, 100), 2);
    let usr1 = SignalSet::single(Signal::SIGUSR1);
    for tid in &tids {
        manager.set_blocked_mask(*tid, MaskHow::Block, usr1).unwrap();
    }

    let senders: Vec<_> = (0..SENDERS)
        .map(|_| {
            let manager = manager.clone();
            let tgid = tids[0];
            thread::spawn(move || {
                for pid in 0..PER_SENDER {
                    manager
                        .send_to_group(
                            Sender::Kernel,
                            tgid,
                            SignalInfo::user(Signal::SIGUSR1, pid as u32, 1000),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    let stats = manager.stats();
    assert_eq!(stats.total_signals_queued, 1);
    assert_eq!(
        stats.total_signals_queued + stats.total_signals_coalesced,
        (SENDERS * PER_SENDER) as u64
    );

    let now = Some(Duration::ZERO);
    assert!(manager.wait_for_signal_blocking(tids[1], usr1, now).is_ok());
    assert_eq!(
        manager.wait_for_signal_blocking(tids[0], usr1, now),
        Err(SignalError::TimedOut)
    );
}

#[test]
fn test_concurrent_fatal_sends_exit_once() {
    let manager = SignalManager::new();
    let tids = spawn_group(&manager, user(1000, 100), 4);
    let tgid = tids[0];

    let senders: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                manager.send_to_group(Sender::Kernel, tgid, SignalInfo::kernel(Signal::SIGTERM))
            })
        })
        .collect();
    for sender in senders {
        assert_eq!(sender.join().unwrap(), Ok(()));
    }

    assert_eq!(manager.stats().group_exits, 1);
    for tid in &tids {
        let decision = manager.consume_next_deliverable(*tid).unwrap();
        assert_eq!(decision.signal(), Some(Signal::SIGTERM));
        manager.exit_thread(*tid, 0).unwrap();
    }
    assert!(manager.group_snapshot(tgid).unwrap().is_dead());
}
