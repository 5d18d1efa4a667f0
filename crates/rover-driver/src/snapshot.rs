//! 共享快照存储
//!
//! 单生产者（采集线程）、多消费者（命令分发）。锁只在拷贝期间持有，
//! 读者总是拿到某一次完整发布的快照，不会看到新旧字段混合。

use crate::state::Snapshot;
use parking_lot::Mutex;

/// 互斥保护的当前快照
#[derive(Debug)]
pub struct SnapshotStore<T> {
    current: Mutex<T>,
}

impl<T: Snapshot> SnapshotStore<T> {
    /// 创建存储，初始值为无效快照
    pub fn new() -> Self {
        Self {
            current: Mutex::new(T::invalid()),
        }
    }

    /// 覆盖当前快照
    pub fn publish(&self, snapshot: T) {
        *self.current.lock() = snapshot;
    }

    /// 拷贝出当前快照
    pub fn read(&self) -> T {
        self.current.lock().clone()
    }
}

impl<T: Snapshot> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
