/*!
 * Property Tests
 * Mask, pending-set and quota invariants under generated send sequences
 */

use crate::support::{spawn_group, user};
use proptest::prelude::*;
use signal_kernel::signals::{SignalConsumer, SignalDelivery, SignalMasking};
use signal_kernel::{
    MaskHow, PendingTarget, Sender, Signal, SignalConfig, SignalError, SignalInfo,
    SignalManager, SignalSet,
};
use std::time::Duration;

/// Signals whose raise has side effects on other pending signals
fn has_side_effects(signal: Signal) -> bool {
    signal == Signal::SIGKILL || signal == Signal::SIGCONT || signal.is_stop_class()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_kill_and_stop_never_blocked(bits in any::<u64>(), how in 0u8..3) {
        let manager = SignalManager::new();
        let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
        let how = match how {
            0 => MaskHow::Block,
            1 => MaskHow::Unblock,
            _ => MaskHow::SetAll,
        };

        manager.set_blocked_mask(tgid, how, SignalSet::from_bits(bits)).unwrap();
        let mask = manager.get_blocked_mask(tgid).unwrap();
        prop_assert!(!mask.contains(Signal::SIGKILL));
        prop_assert!(!mask.contains(Signal::SIGSTOP));
        if how == MaskHow::SetAll {
            prop_assert_eq!(mask, SignalSet::from_bits(bits) - SignalSet::unblockable());
        }
    }

    #[test]
    fn prop_blocked_sends_all_stay_pending(
        sends in prop::collection::vec((1u32..=64, 0usize..3), 0..40)
    ) {
        let manager = SignalManager::new();
        let tids = spawn_group(&manager, user(1000, 100), 2);
        for tid in &tids {
            manager.set_blocked_mask(*tid, MaskHow::SetAll, SignalSet::full()).unwrap();
        }

        let mut expected = SignalSet::empty();
        for (number, target) in sends {
            let signal = Signal::from_number(number).unwrap();
            if has_side_effects(signal) {
                continue;
            }
            let info = SignalInfo::user(signal, 1, 1000);
            match target {
                0 => manager.send_to_group(Sender::Kernel, tids[0], info).unwrap(),
                n => manager.send_to_thread(Sender::Kernel, tids[n - 1], info).unwrap(),
            }
            expected.insert(signal);
        }

        prop_assert_eq!(manager.get_pending(PendingTarget::Group(tids[0])).unwrap(), expected);
        for tid in &tids {
            let own = manager.get_pending(PendingTarget::Thread(*tid)).unwrap();
            prop_assert!((own - expected).is_empty());
        }
    }

    #[test]
    fn prop_realtime_values_fifo(values in prop::collection::vec(any::<usize>(), 1..30)) {
        let manager = SignalManager::new();
        let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
        let rt = Signal::realtime(5).unwrap();
        let set = SignalSet::single(rt);
        manager.set_blocked_mask(tgid, MaskHow::Block, set).unwrap();

        for value in &values {
            manager
                .send_to_group(Sender::Kernel, tgid, SignalInfo::queued(rt, 9, 1000, *value))
                .unwrap();
        }
        let mut received = Vec::new();
        for _ in 0..values.len() {
            let info = manager
                .wait_for_signal_blocking(tgid, set, Some(Duration::ZERO))
                .unwrap();
            received.push(info.payload);
        }
        let expected: Vec<_> = values
            .iter()
            .map(|v| signal_kernel::signals::SigPayload::Value(*v))
            .collect();
        prop_assert_eq!(received, expected);
    }

    #[test]
    fn prop_quota_charges_released(quota in 1usize..8, sends in 1usize..20) {
        let manager = SignalManager::builder()
            .with_config(SignalConfig::strict(quota))
            .build();
        let tgid = spawn_group(&manager, user(1000, 100), 1)[0];
        let set: SignalSet = (0..4).map(|i| Signal::realtime(i).unwrap()).collect();
        manager.set_blocked_mask(tgid, MaskHow::Block, set).unwrap();

        let mut accepted = 0;
        for i in 0..sends {
            let rt = Signal::realtime((i % 4) as u32).unwrap();
            match manager.send_to_group(Sender::Kernel, tgid, SignalInfo::queued(rt, 9, 1000, i)) {
                Ok(()) => accepted += 1,
                Err(SignalError::QueueFull { uid, .. }) => prop_assert_eq!(uid, 1000),
                Err(e) => return Err(TestCaseError::fail(format!("unexpected {:?}", e))),
            }
        }
        prop_assert_eq!(accepted, sends.min(quota));
        prop_assert_eq!(manager.queued_by(1000), accepted);

        for _ in 0..accepted {
            manager.wait_for_signal_blocking(tgid, set, Some(Duration::ZERO)).unwrap();
        }
        prop_assert_eq!(manager.queued_by(1000), 0);
    }
}
