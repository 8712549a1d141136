// roomba_remote/src/state.rs

//! 状态广播中心 (`StateHub`)。
//!
//! 每一个需要被 UI 或其他任务观察的状态（连接状态、传感器快照、视频流标志、帧率、日志……）
//! 都由一个 `StateHub<T>` 持有。它保存"当前值"，并把每一次更新推送给所有订阅者。
//!
//! 订阅者的实现方式：
//! - 每个订阅者拥有一条独立的 `tokio::sync::watch` 通道，登记在以 `Uuid` 为键的 `DashMap` 中；
//! - 通道只缓存一个待取值，慢订阅者只会错过中间值（最新值优先），不会拖慢其他订阅者；
//! - 订阅时当前值被标记为"未读"，因此新订阅者的第一次 `next()` 必定立即拿到订阅时刻的值；
//! - `Subscription` 被丢弃时自动注销，不影响其他订阅者和存储的当前值；
//! - `StateHub` 的最后一个句柄被丢弃时，所有通道随之关闭，订阅者的 `next()` 返回 `None`。

use dashmap::DashMap;
use futures_util::Stream;
use log::debug;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::watch;
use uuid::Uuid;

struct HubInner<T> {
    /// 当前值。更新与订阅都在此锁内完成，保证同一个 hub 内的投递顺序。
    current: Mutex<T>,
    /// 订阅者 ID -> 该订阅者的单值通道。
    subscribers: DashMap<Uuid, watch::Sender<T>>,
    /// 便于日志区分的名称。
    name: &'static str,
}

/// 当前值 + 多订阅者通知的状态容器。
pub struct StateHub<T> {
    inner: Arc<HubInner<T>>,
}

impl<T> Clone for StateHub<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + Sync + 'static> StateHub<T> {
    /// 以初始值创建一个状态中心。
    pub fn new(name: &'static str, initial_value: T) -> Self {
        Self {
            inner: Arc::new(HubInner {
                current: Mutex::new(initial_value),
                subscribers: DashMap::new(),
                name,
            }),
        }
    }

    /// 替换当前值并推送给每一个仍然打开的订阅。
    ///
    /// 复杂度为订阅者数量；从不等待慢订阅者。已关闭的订阅在此顺便清理。
    pub fn update(&self, value: T) {
        let mut current = self.inner.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = value;
        self.inner.subscribers.retain(|_, sender| sender.send(current.clone()).is_ok());
    }

    /// 基于当前值原地修改并广播，返回修改后的值。
    pub fn modify<F>(&self, f: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let mut current = self.inner.current.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut current);
        let snapshot = current.clone();
        self.inner.subscribers.retain(|_, sender| sender.send(snapshot.clone()).is_ok());
        snapshot
    }

    /// 仅当新值与当前值不同时才替换并广播，返回是否发生了变化。
    pub fn update_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let mut current = self.inner.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == value {
            return false;
        }
        *current = value;
        self.inner.subscribers.retain(|_, sender| sender.send(current.clone()).is_ok());
        true
    }

    /// 读取当前值的副本。
    pub fn current(&self) -> T {
        self.inner.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 创建一个新的订阅：首先立即交付当前值，然后是之后的每一次更新。
    pub fn subscribe(&self) -> Subscription<T> {
        let current = self.inner.current.lock().unwrap_or_else(PoisonError::into_inner);
        let (sender, mut receiver) = watch::channel(current.clone());
        receiver.mark_changed();
        let id = Uuid::new_v4();
        self.inner.subscribers.insert(id, sender);
        drop(current);
        debug!("[状态中心:{}] 新订阅 {}，当前订阅数: {}", self.inner.name, id, self.inner.subscribers.len());
        Subscription { id, receiver, hub: Arc::downgrade(&self.inner) }
    }

    /// 当前登记的订阅数量。
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// 一个独立、可随时取消（丢弃即取消）的值序列。
pub struct Subscription<T> {
    id: Uuid,
    receiver: watch::Receiver<T>,
    hub: Weak<HubInner<T>>,
}

impl<T: Clone> Subscription<T> {
    /// 等待下一个值；状态中心被销毁后返回 `None`。
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// 等待第一个满足条件的值。
    pub async fn wait_for<P>(&mut self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        loop {
            let value = self.next().await?;
            if predicate(&value) {
                return Some(value);
            }
        }
    }

    /// 本订阅最近一次看到（或待取）的值，不消耗通知。
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 转换为 `Stream`，便于与 `futures_util` 组合子配合使用。
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures_util::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|value| (value, subscription))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.subscribers.remove(&self.id);
            debug!("[状态中心:{}] 订阅 {} 已注销", hub.name, self.id);
        }
    }
}
