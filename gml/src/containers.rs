//! Containers shared between the threads of a frame.
//!
//! [`SharedVec`] and [`ClassVec`] are filled by worker threads concurrently,
//! and the owner reads and clears them between frames.
//!
//! The sim/render containers ([`SimRenderList`], [`SimRenderVec`],
//! [`RenderList`] and [`RenderMap`]) keep a second view of their items for
//! the render step. Changes made by the simulation step only become visible
//! to the render step once the render step takes them in, with `delay_add`
//! and `add_delayed` for additions and `delay_delete` and `delete_delayed`
//! for removals. Both steps take `&mut self`, so the container is handed
//! between them, for example behind a [`Mutex`].

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Clears in a row that leave the container under half full before its
/// memory is shrunk.
const SHRINK_AFTER_CLEARS: u32 = 10;

/// Shrinks a vector that has been cleared while mostly empty too many times
/// in a row, so one busy frame doesn't keep the memory reserved forever.
#[derive(Debug, Default)]
struct ShrinkPolicy {
    small_clears: u32,
}

impl ShrinkPolicy {
    fn clear<T>(&mut self, items: &mut Vec<T>) {
        let len = items.len();
        let half = items.capacity() / 2;
        items.clear();
        if len >= half {
            self.small_clears = 0;
        } else {
            self.small_clears += 1;
            if self.small_clears >= SHRINK_AFTER_CLEARS {
                items.shrink_to(half);
                self.small_clears = 0;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoning is ignored: every operation leaves the vector valid.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A vector that any thread can push into.
#[derive(Debug, Default)]
pub struct SharedVec<T> {
    items: Mutex<Vec<T>>,
    shrink: ShrinkPolicy,
}

impl<T> SharedVec<T> {
    #[allow(missing_docs)]
    pub fn new() -> SharedVec<T> {
        SharedVec {
            items: Mutex::new(Vec::new()),
            shrink: ShrinkPolicy::default(),
        }
    }

    /// Appends `value`. Pushes from different threads are ordered by who
    /// got the lock first.
    pub fn push(&self, value: T) {
        lock(&self.items).push(value);
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The items, in the order they were pushed. Exclusive access means no
    /// thread is pushing.
    pub fn items(&mut self) -> &mut [T] {
        self.items
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut_slice()
    }

    /// Removes every item, shrinking the allocation after enough clears of
    /// a mostly empty vector.
    pub fn clear(&mut self) {
        let items = self.items.get_mut().unwrap_or_else(PoisonError::into_inner);
        self.shrink.clear(items);
    }

    #[allow(missing_docs)]
    pub fn capacity(&mut self) -> usize {
        self.items
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity()
    }
}

/// A vector of per-index slots that threads can claim by index. Claiming an
/// index past the end fills the gap with default values.
#[derive(Debug, Default)]
pub struct ClassVec<T> {
    items: Mutex<Vec<T>>,
    shrink: ShrinkPolicy,
}

/// Access to one slot of a [`ClassVec`]. Other threads wait in
/// [`ClassVec::acquire`] until this is dropped.
pub struct ClassVecSlot<'a, T> {
    items: MutexGuard<'a, Vec<T>>,
    index: usize,
}

impl<T> Deref for ClassVecSlot<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.items[self.index]
    }
}

impl<T> DerefMut for ClassVecSlot<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.items[self.index]
    }
}

impl<T: Default> ClassVec<T> {
    #[allow(missing_docs)]
    pub fn new() -> ClassVec<T> {
        ClassVec {
            items: Mutex::new(Vec::new()),
            shrink: ShrinkPolicy::default(),
        }
    }

    /// Locks the vector and returns the slot at `index`, growing the vector
    /// if needed. Dropping the slot releases it.
    pub fn acquire(&self, index: usize) -> ClassVecSlot<'_, T> {
        let mut items = lock(&self.items);
        if items.len() <= index {
            items.resize_with(index + 1, T::default);
        }
        ClassVecSlot { items, index }
    }

    /// Appends `value` after the last slot.
    pub fn push(&self, value: T) {
        lock(&self.items).push(value);
    }

    /// One past the highest index acquired or pushed to.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every slot, in index order.
    pub fn items(&mut self) -> &mut [T] {
        self.items
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut_slice()
    }

    /// Removes every slot, shrinking like [`SharedVec::clear`].
    pub fn clear(&mut self) {
        let items = self.items.get_mut().unwrap_or_else(PoisonError::into_inner);
        self.shrink.clear(items);
    }
}

/// Bounded double-ended queue that overwrites from the other end when full.
#[derive(Debug)]
pub struct CircularQueue<T> {
    /// Invariant: the slots from `offset` to `(offset + len) % slots.len()`
    /// (possibly wrapping) are Some, the rest are None.
    slots: Box<[Option<T>]>,
    offset: usize,
    len: usize,
}

impl<T> CircularQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> CircularQueue<T> {
        assert!(capacity > 0, "circular queues need room for at least one item");
        CircularQueue {
            slots: (0..capacity).map(|_| None).collect(),
            offset: 0,
            len: 0,
        }
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, i: usize) -> usize {
        (self.offset + i) % self.slots.len()
    }

    /// Appends `value`, dropping the front item if the queue is full.
    pub fn push_back(&mut self, value: T) {
        if self.len == self.capacity() {
            self.pop_front();
        }
        let i = self.slot(self.len);
        self.slots[i] = Some(value);
        self.len += 1;
    }

    /// Prepends `value`, dropping the back item if the queue is full.
    pub fn push_front(&mut self, value: T) {
        if self.len == self.capacity() {
            self.pop_back();
        }
        self.offset = self.slot(self.capacity() - 1);
        self.slots[self.offset] = Some(value);
        self.len += 1;
    }

    /// Removes the oldest item.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.offset].take();
        self.offset = self.slot(1);
        self.len -= 1;
        value
    }

    /// Removes the newest item.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let i = self.slot(self.len - 1);
        self.len -= 1;
        self.slots[i].take()
    }

    /// The `i`th item from the front.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.slots[self.slot(i)].as_ref()
    }

    /// The items from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(|i| self.get(i))
    }

    #[allow(missing_docs)]
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }
}

/// Additions on their way to the render view, and the view itself.
#[derive(Debug)]
struct RenderStages<T> {
    /// Added by the simulation step, not yet seen by the render step.
    pre_add: BTreeSet<T>,
    /// Taken in by the render step, not yet visible.
    add: BTreeSet<T>,
    render: BTreeSet<T>,
}

impl<T> Default for RenderStages<T> {
    fn default() -> Self {
        RenderStages {
            pre_add: BTreeSet::new(),
            add: BTreeSet::new(),
            render: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> RenderStages<T> {
    fn delay_add(&mut self) {
        self.add.append(&mut self.pre_add);
    }

    fn add_delayed(&mut self, mut on_add: impl FnMut(&T)) {
        for item in core::mem::take(&mut self.add) {
            on_add(&item);
            self.render.insert(item);
        }
    }

    /// Removes `item` from whichever stage it's in. Returns true if it was
    /// visible to the render step.
    fn remove(&mut self, item: &T) -> Option<bool> {
        if self.render.remove(item) {
            Some(true)
        } else if self.add.remove(item) || self.pre_add.remove(item) {
            Some(false)
        } else {
            None
        }
    }

    /// Removes `item` if the render step has taken it in. Items still
    /// waiting in `pre_add` are left alone.
    fn remove_taken(&mut self, item: &T) -> Option<bool> {
        if self.render.remove(item) {
            Some(true)
        } else if self.add.remove(item) {
            Some(false)
        } else {
            None
        }
    }

    fn clear(&mut self) {
        self.pre_add.clear();
        self.add.clear();
        self.render.clear();
    }
}

/// Removes every staged removal that the render step has taken in, calling
/// `on_remove` for the ones that were visible. The rest stay staged.
fn delete_taken<T: Ord + Clone>(
    stages: &mut RenderStages<T>,
    post_delete: &mut BTreeSet<T>,
    mut on_remove: impl FnMut(&T),
) {
    post_delete.retain(|item| match stages.remove_taken(item) {
        Some(visible) => {
            if visible {
                on_remove(item);
            }
            false
        }
        None => true,
    });
}

/// A list owned by the simulation step, with a render view that lags
/// behind it.
///
/// The simulation step pushes and erases in order. The render step sees the
/// items as a set, which only changes when it calls [`SimRenderList::delay_add`]
/// and [`SimRenderList::add_delayed`], or when erased items are deleted. Items
/// must be unique.
#[derive(Debug)]
pub struct SimRenderList<T> {
    sim: Vec<T>,
    stages: RenderStages<T>,
    erased: Vec<T>,
    post_delete: BTreeSet<T>,
}

impl<T> Default for SimRenderList<T> {
    fn default() -> Self {
        SimRenderList {
            sim: Vec::new(),
            stages: RenderStages::default(),
            erased: Vec::new(),
            post_delete: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SimRenderList<T> {
    #[allow(missing_docs)]
    pub fn new() -> SimRenderList<T> {
        SimRenderList::default()
    }

    /// Appends `item` to the simulation list and stages it for the render
    /// view.
    pub fn push(&mut self, item: T) {
        self.stages.pre_add.insert(item.clone());
        self.sim.push(item);
    }

    /// Removes the item at `index` from the simulation list. It stays in the
    /// render view until it's deleted.
    pub fn erase_synced(&mut self, index: usize) -> T {
        let item = self.sim.remove(index);
        self.erased.push(item.clone());
        item
    }

    /// Erases every item for which `keep` returns false, in order.
    pub fn retain_synced(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let erased = &mut self.erased;
        self.sim.retain(|item| {
            let kept = keep(item);
            if !kept {
                erased.push(item.clone());
            }
            kept
        });
    }

    /// Returns true if there are erased items waiting to be deleted.
    pub fn can_delete_synced(&self) -> bool {
        !self.erased.is_empty()
    }

    /// Deletes the erased items from every stage of the render view right
    /// away. Called from the simulation step, while the render step isn't
    /// iterating.
    pub fn delete_erased_synced(&mut self) {
        for item in self.erased.drain(..) {
            let removed = self.stages.remove(&item);
            debug_assert!(removed.is_some(), "erased an item that was never pushed");
        }
    }

    /// Items in the simulation list.
    pub fn len(&self) -> usize {
        self.sim.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.sim.is_empty()
    }

    /// The simulation list, in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.sim.iter()
    }

    /// Takes in the items pushed since the last call. They become visible
    /// at the next [`SimRenderList::add_delayed`].
    pub fn delay_add(&mut self) {
        self.stages.delay_add();
    }

    /// Makes the items taken in by [`SimRenderList::delay_add`] visible.
    pub fn add_delayed(&mut self) {
        self.stages.add_delayed(|_| {});
    }

    /// Returns true if there are pushed items the render step hasn't taken
    /// in yet.
    pub fn can_delay_add(&self) -> bool {
        !self.stages.pre_add.is_empty()
    }

    /// Takes in the erased items, to be deleted at the next
    /// [`SimRenderList::delete_delayed`].
    pub fn delay_delete(&mut self) {
        self.post_delete.extend(self.erased.drain(..));
    }

    /// Deletes the taken in erased items from the render view. Items the
    /// render step hasn't taken in yet stay until it has.
    pub fn delete_delayed(&mut self) {
        delete_taken(&mut self.stages, &mut self.post_delete, |_| {});
    }

    /// Items visible to the render step.
    pub fn render_len(&self) -> usize {
        self.stages.render.len()
    }

    #[allow(missing_docs)]
    pub fn render_is_empty(&self) -> bool {
        self.stages.render.is_empty()
    }

    /// The items visible to the render step, in ascending order.
    pub fn render_iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.stages.render.iter()
    }

    /// Empties both views and drops every pending change.
    pub fn clear(&mut self) {
        self.sim.clear();
        self.stages.clear();
        self.erased.clear();
        self.post_delete.clear();
    }
}

/// A vector owned by the simulation step, with a render view that catches up
/// at every [`SimRenderVec::update`]. Erasing doesn't keep the order.
#[derive(Debug)]
pub struct SimRenderVec<T> {
    sim: Vec<T>,
    render: BTreeSet<T>,
    added: BTreeSet<T>,
    erased: BTreeSet<T>,
}

impl<T> Default for SimRenderVec<T> {
    fn default() -> Self {
        SimRenderVec {
            sim: Vec::new(),
            render: BTreeSet::new(),
            added: BTreeSet::new(),
            erased: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SimRenderVec<T> {
    #[allow(missing_docs)]
    pub fn new() -> SimRenderVec<T> {
        SimRenderVec::default()
    }

    #[allow(missing_docs)]
    pub fn push(&mut self, item: T) {
        self.added.insert(item.clone());
        self.sim.push(item);
    }

    /// Puts `item` at `index`, moving the item there to the end.
    pub fn insert(&mut self, index: usize, item: T) {
        self.added.insert(item.clone());
        if index < self.sim.len() {
            let moved = core::mem::replace(&mut self.sim[index], item);
            self.sim.push(moved);
        } else {
            self.sim.push(item);
        }
    }

    /// Removes the item at `index`, replacing it with the last one.
    pub fn erase(&mut self, index: usize) -> T {
        let item = self.sim.swap_remove(index);
        self.erased.insert(item.clone());
        item
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.sim.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.sim.is_empty()
    }

    #[allow(missing_docs)]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.sim.iter()
    }

    /// Applies the additions and then the removals made since the last
    /// update to the render view.
    pub fn update(&mut self) {
        self.render.append(&mut self.added);
        for item in core::mem::take(&mut self.erased) {
            self.render.remove(&item);
        }
    }

    #[allow(missing_docs)]
    pub fn render_len(&self) -> usize {
        self.render.len()
    }

    #[allow(missing_docs)]
    pub fn render_is_empty(&self) -> bool {
        self.render.is_empty()
    }

    /// The items visible to the render step, in ascending order.
    pub fn render_iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.render.iter()
    }
}

/// A set that only exists for the render step. Items enter and leave it
/// through `on_add` and `on_remove` callbacks, so the render step can keep
/// its own bookkeeping in sync.
///
/// Besides the staged set, the list has a queue of items for one-off
/// processing: [`RenderList::enqueue`]d items are handed to the render step
/// by [`RenderList::delay`] and processed by [`RenderList::execute`], unless
/// they were [`RenderList::dequeue`]d first.
#[derive(Debug)]
pub struct RenderList<T> {
    stages: RenderStages<T>,
    removed_synced: Vec<T>,
    erased: Vec<T>,
    post_delete: BTreeSet<T>,
    sim_queue: Vec<T>,
    shared_queue: Vec<T>,
    dequeued: Vec<T>,
}

impl<T> Default for RenderList<T> {
    fn default() -> Self {
        RenderList {
            stages: RenderStages::default(),
            removed_synced: Vec::new(),
            erased: Vec::new(),
            post_delete: BTreeSet::new(),
            sim_queue: Vec::new(),
            shared_queue: Vec::new(),
            dequeued: Vec::new(),
        }
    }
}

impl<T: Ord + Clone> RenderList<T> {
    #[allow(missing_docs)]
    pub fn new() -> RenderList<T> {
        RenderList::default()
    }

    /// Stages `item` for the render set.
    pub fn push(&mut self, item: T) {
        self.stages.pre_add.insert(item);
    }

    /// Stages `item` for removal by [`RenderList::remove_erased_synced`].
    pub fn erase_remove_synced(&mut self, item: T) {
        self.removed_synced.push(item);
    }

    /// Removes the staged items from every stage right away, calling
    /// `on_remove` for the ones that were visible.
    pub fn remove_erased_synced(&mut self, mut on_remove: impl FnMut(&T)) {
        for item in self.removed_synced.drain(..) {
            match self.stages.remove(&item) {
                Some(true) => on_remove(&item),
                Some(false) => {}
                None => debug_assert!(false, "removed an item that was never pushed"),
            }
        }
    }

    #[allow(missing_docs)]
    pub fn delay_add(&mut self) {
        self.stages.delay_add();
    }

    /// Makes the taken in items visible, calling `on_add` for each.
    pub fn add_delayed(&mut self, on_add: impl FnMut(&T)) {
        self.stages.add_delayed(on_add);
    }

    /// Stages `item` for removal by the render step.
    pub fn erase(&mut self, item: T) {
        self.erased.push(item);
    }

    #[allow(missing_docs)]
    pub fn delay_delete(&mut self) {
        self.post_delete.extend(self.erased.drain(..));
    }

    /// Removes the taken in removals that the render step has seen, calling
    /// `on_remove` for the ones that were visible.
    pub fn delete_delayed(&mut self, on_remove: impl FnMut(&T)) {
        delete_taken(&mut self.stages, &mut self.post_delete, on_remove);
    }

    #[allow(missing_docs)]
    pub fn render_len(&self) -> usize {
        self.stages.render.len()
    }

    /// The visible items, in ascending order.
    pub fn render_iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.stages.render.iter()
    }

    /// Queues `item` for [`RenderList::execute`].
    pub fn enqueue(&mut self, item: T) {
        self.sim_queue.push(item);
    }

    /// Hands the queued items to the render step.
    pub fn delay(&mut self) {
        self.shared_queue.append(&mut self.sim_queue);
    }

    /// Processes the handed over items with `on_add`.
    pub fn execute(&mut self, mut on_add: impl FnMut(&T)) {
        for item in self.shared_queue.drain(..) {
            on_add(&item);
        }
    }

    /// Marks `item` as gone: it's dropped from the queue at the next
    /// [`RenderList::clean`] and passed to `on_remove` at the next
    /// [`RenderList::destroy`].
    pub fn dequeue(&mut self, item: T) {
        self.dequeued.push(item);
    }

    /// Hands the queued items over and drops the dequeued ones from them.
    pub fn clean(&mut self) {
        self.delay();
        let dequeued = &self.dequeued;
        self.shared_queue.retain(|item| !dequeued.contains(item));
    }

    /// Calls `on_remove` for every dequeued item.
    pub fn destroy(&mut self, mut on_remove: impl FnMut(&T)) {
        for item in self.dequeued.drain(..) {
            on_remove(&item);
        }
    }

    /// Removes everything, calling `on_remove` for the visible items.
    pub fn clear(&mut self, mut on_remove: impl FnMut(&T)) {
        for item in &self.stages.render {
            on_remove(item);
        }
        self.stages.clear();
        self.removed_synced.clear();
        self.erased.clear();
        self.post_delete.clear();
    }
}

/// A map for the render step, with the same staging as [`RenderList`]: new
/// entries become visible at [`RenderMap::add_delayed`], erased ones
/// disappear at [`RenderMap::delete_delayed`].
#[derive(Debug)]
pub struct RenderMap<K, V> {
    pre_add: BTreeMap<K, V>,
    add: BTreeMap<K, V>,
    render: BTreeMap<K, V>,
    erased: BTreeSet<K>,
    post_delete: BTreeSet<K>,
}

impl<K, V> Default for RenderMap<K, V> {
    fn default() -> Self {
        RenderMap {
            pre_add: BTreeMap::new(),
            add: BTreeMap::new(),
            render: BTreeMap::new(),
            erased: BTreeSet::new(),
            post_delete: BTreeSet::new(),
        }
    }
}

impl<K: Ord, V> RenderMap<K, V> {
    #[allow(missing_docs)]
    pub fn new() -> RenderMap<K, V> {
        RenderMap::default()
    }

    /// Stages `value` for `key`, replacing a value staged earlier.
    pub fn push(&mut self, key: K, value: V) {
        self.pre_add.insert(key, value);
    }

    #[allow(missing_docs)]
    pub fn delay_add(&mut self) {
        self.add.append(&mut self.pre_add);
    }

    #[allow(missing_docs)]
    pub fn add_delayed(&mut self) {
        self.render.append(&mut self.add);
    }

    /// Stages `key` for removal.
    pub fn erase(&mut self, key: K) {
        self.erased.insert(key);
    }

    #[allow(missing_docs)]
    pub fn delay_delete(&mut self) {
        self.post_delete.append(&mut self.erased);
    }

    /// Removes the taken in keys that are visible or about to be. Keys still
    /// waiting to be taken in stay staged.
    pub fn delete_delayed(&mut self) {
        let RenderMap { add, render, post_delete, .. } = self;
        post_delete.retain(|key| render.remove(key).is_none() && add.remove(key).is_none());
    }

    /// The entries visible to the render step.
    pub fn render_map(&self) -> &BTreeMap<K, V> {
        &self.render
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{
        CircularQueue, ClassVec, RenderList, RenderMap, SharedVec, SimRenderList, SimRenderVec,
    };

    #[test]
    fn shared_vec_collects_pushes_from_all_threads() {
        let mut vec = SharedVec::new();
        thread::scope(|s| {
            for t in 0..4 {
                let vec = &vec;
                s.spawn(move || {
                    for i in 0..100 {
                        vec.push(t * 100 + i);
                    }
                });
            }
        });
        assert_eq!(400, vec.len());
        vec.items().sort_unstable();
        assert!(vec.items().iter().copied().eq(0..400));
    }

    #[test]
    fn repeated_small_clears_shrink() {
        let mut vec = SharedVec::new();
        for i in 0..1000 {
            vec.push(i);
        }
        vec.clear();
        let big = vec.capacity();
        for _ in 0..9 {
            vec.push(0);
            vec.clear();
        }
        assert_eq!(big, vec.capacity());
        vec.push(0);
        vec.clear();
        assert!(vec.capacity() < big);
    }

    #[test]
    fn class_vec_grows_to_the_acquired_index() {
        let vec = ClassVec::<u32>::new();
        thread::scope(|s| {
            for t in 0..4 {
                let vec = &vec;
                s.spawn(move || {
                    for _ in 0..50 {
                        *vec.acquire(t * 3) += 1;
                    }
                });
            }
        });
        let mut vec = vec;
        assert_eq!(10, vec.len());
        assert_eq!(&[50, 0, 0, 50, 0, 0, 50, 0, 0, 50], vec.items());
        vec.clear();
        assert!(vec.is_empty());
    }

    #[test]
    fn circular_queue_overwrites_the_far_end() {
        let mut queue = CircularQueue::new(3);
        for i in 1..=4 {
            queue.push_back(i);
        }
        assert_eq!(vec![2, 3, 4], queue.iter().copied().collect::<Vec<_>>());
        queue.push_front(9);
        assert_eq!(vec![9, 2, 3], queue.iter().copied().collect::<Vec<_>>());
        assert_eq!(Some(3), queue.pop_back());
        assert_eq!(Some(9), queue.pop_front());
        assert_eq!(Some(&2), queue.get(0));
        assert_eq!(1, queue.len());
        queue.clear();
        assert_eq!(None, queue.pop_front());
    }

    #[test]
    fn sim_render_list_additions_become_visible_in_two_steps() {
        let mut list = SimRenderList::new();
        list.push(3);
        list.push(1);
        assert_eq!(2, list.len());
        assert!(list.can_delay_add());
        assert!(list.render_is_empty());

        list.delay_add();
        assert!(!list.can_delay_add());
        assert!(list.render_is_empty());
        list.push(2);
        list.add_delayed();
        assert_eq!(vec![1, 3], list.render_iter().copied().collect::<Vec<_>>());

        list.delay_add();
        list.add_delayed();
        assert_eq!(vec![1, 2, 3], list.render_iter().copied().collect::<Vec<_>>());
        assert_eq!(vec![3, 1, 2], list.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn sim_render_list_synced_deletes_reach_every_stage() {
        let mut list = SimRenderList::new();
        for i in 0..4 {
            list.push(i);
        }
        list.delay_add();
        list.add_delayed();
        list.push(10);
        list.delay_add();
        list.push(20);

        assert_eq!(1, list.erase_synced(1));
        list.retain_synced(|&i| i != 10 && i != 20 && i != 3);
        assert!(list.can_delete_synced());
        // Erased items stay visible until they're deleted.
        assert_eq!(4, list.render_len());
        list.delete_erased_synced();
        assert!(!list.can_delete_synced());

        list.delay_add();
        list.add_delayed();
        assert_eq!(vec![0, 2], list.iter().copied().collect::<Vec<_>>());
        assert_eq!(vec![0, 2], list.render_iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn sim_render_list_delayed_deletes_wait_for_the_render_view() {
        let mut list = SimRenderList::new();
        list.push('a');
        list.delay_add();
        list.add_delayed();
        list.push('b');

        list.retain_synced(|_| false);
        list.delay_delete();
        list.delete_delayed();
        // 'b' was never taken in by the render step, so it's still staged.
        assert!(list.render_is_empty());
        list.delay_add();
        list.add_delayed();
        assert_eq!(vec!['b'], list.render_iter().copied().collect::<Vec<_>>());
        list.delete_delayed();
        assert!(list.render_is_empty());
        assert!(list.is_empty());
    }

    #[test]
    fn sim_render_vec_updates_its_render_view() {
        let mut vec = SimRenderVec::new();
        vec.push(5);
        vec.push(6);
        vec.insert(0, 7);
        assert_eq!(vec![7, 6, 5], vec.iter().copied().collect::<Vec<_>>());
        assert!(vec.render_is_empty());
        vec.update();
        assert_eq!(3, vec.render_len());

        assert_eq!(7, vec.erase(0));
        assert_eq!(vec![5, 6], vec.iter().copied().collect::<Vec<_>>());
        assert_eq!(3, vec.render_len());
        vec.update();
        assert_eq!(vec![5, 6], vec.render_iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn render_list_reports_visibility_changes() {
        let mut list = RenderList::new();
        let mut added = Vec::new();
        let mut removed = Vec::new();
        list.push(1);
        list.push(2);
        list.delay_add();
        list.add_delayed(|&i| added.push(i));
        list.push(3);

        list.erase_remove_synced(1);
        list.erase_remove_synced(3);
        list.remove_erased_synced(|&i| removed.push(i));
        // 3 was never visible, so only 1 is reported.
        assert_eq!(vec![1, 2], added);
        assert_eq!(vec![1], removed);

        list.erase(2);
        list.delay_delete();
        list.delete_delayed(|&i| removed.push(i));
        assert_eq!(vec![1, 2], removed);
        assert_eq!(0, list.render_len());
    }

    #[test]
    fn render_list_queue_skips_dequeued_items() {
        let mut list = RenderList::new();
        list.enqueue("smoke");
        list.enqueue("spark");
        list.dequeue("spark");
        list.clean();
        let mut executed = Vec::new();
        list.execute(|&item| executed.push(item));
        assert_eq!(vec!["smoke"], executed);

        let mut destroyed = Vec::new();
        list.destroy(|&item| destroyed.push(item));
        assert_eq!(vec!["spark"], destroyed);
    }

    #[test]
    fn render_map_stages_entries() {
        let mut map = RenderMap::new();
        map.push(1, "one");
        map.push(2, "two");
        map.delay_add();
        map.push(3, "three");
        map.add_delayed();
        assert_eq!(vec![1, 2], map.render_map().keys().copied().collect::<Vec<_>>());

        map.erase(1);
        map.erase(3);
        map.delay_delete();
        map.delete_delayed();
        assert_eq!(vec![2], map.render_map().keys().copied().collect::<Vec<_>>());
        map.delay_add();
        map.add_delayed();
        assert_eq!(Some(&"three"), map.render_map().get(&3));
        map.delete_delayed();
        assert!(map.render_map().get(&3).is_none());
    }
}
