/*!
 * Shared fixtures for the signal integration tests
 */

use parking_lot::Mutex;
use signal_kernel::signals::{
    ChildEvent, ParentNotifier, RunState, SignalStateManager,
};
use signal_kernel::{Credentials, ProcessIdentity, SignalConfig, SignalManager, Tgid, Tid};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Parent that remembers every report in order
#[derive(Default)]
pub struct RecordingParent {
    events: Mutex<Vec<(Tgid, ChildEvent, i32)>>,
}

impl RecordingParent {
    pub fn events(&self) -> Vec<(Tgid, ChildEvent, i32)> {
        self.events.lock().clone()
    }
}

impl ParentNotifier for RecordingParent {
    fn notify_parent(&self, child: Tgid, event: ChildEvent, status: i32) {
        self.events.lock().push((child, event, status));
    }
}

pub fn user(uid: u32, pgid: u32) -> ProcessIdentity {
    ProcessIdentity::new(pgid, pgid, Credentials::user(uid))
}

pub fn manager_with_parent(config: SignalConfig) -> (SignalManager, Arc<RecordingParent>) {
    let parent = Arc::new(RecordingParent::default());
    let manager = SignalManager::builder()
        .with_config(config)
        .with_notifier(parent.clone())
        .build();
    (manager, parent)
}

/// Create a group with `threads` live threads; the leader comes first
pub fn spawn_group(manager: &SignalManager, identity: ProcessIdentity, threads: usize) -> Vec<Tid> {
    let leader = manager.create_group(identity);
    let mut tids = vec![leader];
    for _ in 1..threads {
        tids.push(manager.spawn_thread(leader).unwrap());
    }
    tids
}

/// Poll until `tid` reaches `state`; panics after five seconds
pub fn wait_for_state(manager: &SignalManager, tgid: Tgid, tid: Tid, state: RunState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = manager.group_snapshot(tgid).unwrap();
        if snapshot.thread(tid).is_some_and(|t| t.run_state == state) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "thread {} never reached {:?}: {:?}",
            tid,
            state,
            snapshot.thread(tid)
        );
        thread::sleep(Duration::from_millis(1));
    }
}
