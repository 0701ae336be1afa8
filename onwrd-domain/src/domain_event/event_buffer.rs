use std::fmt;
use std::ops::Deref;
use std::slice::Iter;

/// 聚合内未抽取事件的有序缓冲区
///
/// - `raise` 追加事件，保持产生顺序；
/// - `drain` 一次性取出全部事件并清空缓冲区。
///
/// 缓冲区只属于一个聚合实例，`drain` 需要 `&mut self`，因此在编译期即保证
/// 不会有并发调用方观察到"取出一半"的状态。
pub struct EventBuffer<E> {
    events: Vec<E>,
}

impl<E> EventBuffer<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// 追加一个事件
    pub fn raise(&mut self, event: E) {
        self.events.push(event);
    }

    /// 取出全部事件并清空缓冲区
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    /// 获取当前事件的不可变引用
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, E> {
        self.events.iter()
    }
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for EventBuffer<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for EventBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.events.iter()).finish()
    }
}

impl<E: PartialEq> PartialEq for EventBuffer<E> {
    fn eq(&self, other: &Self) -> bool {
        self.events == other.events
    }
}

impl<E> Deref for EventBuffer<E> {
    type Target = [E];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}

impl<'a, E> IntoIterator for &'a EventBuffer<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl<E> Extend<E> for EventBuffer<E> {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}
